use anyhow::Result;
use clap::{CommandFactory, Parser};
use tabscribe::cli::{Cli, Commands};
use tabscribe::config::Config;
use tabscribe::daemon::run_daemon;
use tabscribe::ipc::client::{follow_events, send_command};
use tabscribe::ipc::protocol::Command;
use tabscribe::output::{render_event, render_response};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Daemon => {
            let config = load_config(cli.config.as_deref());
            run_daemon(config, cli.socket, cli.quiet).await?;
        }
        Commands::Toggle { target } => {
            let response = send_command(cli.socket, Command::Toggle { target }).await?;
            render_response(&response);
        }
        Commands::Stop { target } => {
            let response = send_command(cli.socket, Command::Stop { target }).await?;
            render_response(&response);
        }
        Commands::TargetRemoved { target } => {
            let response = send_command(cli.socket, Command::TargetRemoved { target }).await?;
            render_response(&response);
        }
        Commands::Status => {
            let response = send_command(cli.socket, Command::Status).await?;
            render_response(&response);
        }
        Commands::Follow => {
            if !cli.quiet {
                eprintln!("tabscribe: following live transcripts (ctrl-c to stop)");
            }
            follow_events(cli.socket, |event| render_event(&event)).await?;
        }
        Commands::Shutdown => {
            let response = send_command(cli.socket, Command::Shutdown).await?;
            render_response(&response);
        }
        Commands::Completions { shell } => {
            clap_complete::generate(
                shell,
                &mut Cli::command(),
                "tabscribe",
                &mut std::io::stdout(),
            );
        }
    }

    Ok(())
}

fn load_config(path: Option<&std::path::Path>) -> Config {
    let config = match path {
        Some(path) => Config::load_or_default(path),
        None => Config::load_or_default(&Config::default_path()),
    };
    config.with_env_overrides()
}
