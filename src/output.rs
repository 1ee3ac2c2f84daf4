//! Terminal rendering for daemon responses and streamed events.

use crate::ipc::protocol::{Event, Response, SessionStatus};
use crate::orchestrator::CaptureState;
use owo_colors::OwoColorize;

/// Renders a one-shot command response.
pub fn render_response(response: &Response) {
    match response {
        Response::Ok => println!("{}", "ok".green()),
        Response::Status { sessions } => render_status(sessions),
        Response::Error { message } => eprintln!("{} {}", "error:".red().bold(), message),
    }
}

/// Renders the per-target status table.
pub fn render_status(sessions: &[SessionStatus]) {
    if sessions.is_empty() {
        println!("no sessions");
        return;
    }
    for session in sessions {
        let state = match session.state {
            CaptureState::Idle => format!("{}", "idle".dimmed()),
            CaptureState::Starting => format!("{}", "starting".yellow()),
            CaptureState::Listening => format!("{}", "listening".green().bold()),
            CaptureState::Error => format!("{}", "error".red().bold()),
        };
        println!("target {:>6}  {}", session.target, state);
    }
}

/// Renders one streamed event for `follow` mode.
pub fn render_event(event: &Event) {
    match event {
        Event::Transcript { target, text, .. } => {
            if text.trim().is_empty() {
                return;
            }
            println!("{} {}", format!("[{target}]").dimmed(), text);
        }
        Event::State { target, state } => {
            eprintln!("{} state: {}", format!("[{target}]").dimmed(), state);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_paths_do_not_panic() {
        render_response(&Response::Ok);
        render_response(&Response::Error {
            message: "x".to_string(),
        });
        render_status(&[SessionStatus {
            target: 1,
            state: CaptureState::Listening,
        }]);
        render_status(&[]);
        render_event(&Event::Transcript {
            target: 1,
            text: "hello".to_string(),
            emitted_at_ms: 0,
        });
        render_event(&Event::Transcript {
            target: 1,
            text: "   ".to_string(),
            emitted_at_ms: 0,
        });
        render_event(&Event::State {
            target: 1,
            state: CaptureState::Error,
        });
    }
}
