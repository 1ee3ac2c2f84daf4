//! System capture backend using CPAL (Cross-Platform Audio Library).
//!
//! Stands in for the browser/OS capture surface when tabscribe runs as a
//! plain daemon: the "target" maps to the default loopback/monitor input
//! device, and the loopback fix is realized literally by replaying captured
//! samples on the default output device.

use crate::capture::media::{AudioOutput, MediaHost, MediaStream};
use crate::error::{Result, TabscribeError};
use crate::messages::{MediaHandle, TargetId};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Run a closure with stderr temporarily redirected to /dev/null.
///
/// Suppresses noisy ALSA/JACK/PipeWire messages that CPAL triggers while
/// probing audio backends.
///
/// # Safety
/// Uses `libc::dup`/`libc::dup2` to save and restore file descriptor 2
/// (stderr). Safe as long as no other thread is concurrently manipulating
/// fd 2.
fn with_suppressed_stderr<F, R>(f: F) -> R
where
    F: FnOnce() -> R,
{
    unsafe {
        let saved_fd = libc::dup(2);
        let devnull = libc::open(c"/dev/null".as_ptr(), libc::O_WRONLY);
        if saved_fd >= 0 && devnull >= 0 {
            libc::dup2(devnull, 2);
            libc::close(devnull);
        }

        let result = f();

        if saved_fd >= 0 {
            libc::dup2(saved_fd, 2);
            libc::close(saved_fd);
        }

        result
    }
}

/// Wrapper for cpal::Stream to make it Send.
///
/// SAFETY: the stream is only touched from the capture worker thread that
/// owns its `MediaStream`/`AudioOutput`; it never crosses thread boundaries
/// after construction.
struct SendableStream(cpal::Stream);

unsafe impl Send for SendableStream {}

/// Host backend over the system's default audio devices.
pub struct SystemMediaHost {
    input_device: Option<String>,
}

impl SystemMediaHost {
    /// Creates a host using the default input device, or a named one.
    pub fn new(input_device: Option<String>) -> Self {
        Self { input_device }
    }

    fn find_input_device(&self) -> Result<cpal::Device> {
        with_suppressed_stderr(|| {
            let host = cpal::default_host();

            if let Some(ref name) = self.input_device {
                let devices = host
                    .input_devices()
                    .map_err(|e| TabscribeError::AudioCapture {
                        message: format!("Failed to enumerate devices: {}", e),
                    })?;
                for device in devices {
                    if device.name().is_ok_and(|n| &n == name) {
                        return Ok(device);
                    }
                }
                return Err(TabscribeError::AudioCapture {
                    message: format!("Audio input device not found: {}", name),
                });
            }

            host.default_input_device()
                .ok_or_else(|| TabscribeError::MediaPermissionDenied {
                    message: "no default input device available".to_string(),
                })
        })
    }
}

impl MediaHost for SystemMediaHost {
    fn request_media_handle(&self, target: TargetId) -> Result<MediaHandle> {
        // Probe the device up front so a missing/busy device fails at
        // handle-request time, before any capture state exists.
        let device = self.find_input_device()?;
        let name = device.name().unwrap_or_else(|_| "default".to_string());
        Ok(MediaHandle::new(format!("{name}#{target}")))
    }

    fn open_stream(&self, _handle: &MediaHandle) -> Result<Box<dyn MediaStream>> {
        let device = self.find_input_device()?;
        CpalMediaStream::open(device).map(|s| Box::new(s) as Box<dyn MediaStream>)
    }

    fn open_loopback(&self) -> Result<Box<dyn AudioOutput>> {
        let device = with_suppressed_stderr(|| {
            cpal::default_host().default_output_device().ok_or_else(|| {
                TabscribeError::Loopback {
                    message: "no default output device available".to_string(),
                }
            })
        })?;
        CpalLoopbackOutput::open(device).map(|o| Box::new(o) as Box<dyn AudioOutput>)
    }
}

/// Live capture at the device's native config, mixed to mono f32.
///
/// Resampling to the engine rate happens downstream in the capture worker.
struct CpalMediaStream {
    stream: Option<SendableStream>,
    buffer: Arc<Mutex<Vec<f32>>>,
    sample_rate: u32,
}

impl CpalMediaStream {
    fn open(device: cpal::Device) -> Result<Self> {
        let default_config =
            device
                .default_input_config()
                .map_err(|e| TabscribeError::AudioCapture {
                    message: format!("Failed to query default input config: {}", e),
                })?;

        let sample_rate = default_config.sample_rate().0;
        let channels = default_config.channels() as usize;
        let stream_config: cpal::StreamConfig = default_config.clone().into();

        let err_callback = |err| {
            eprintln!("tabscribe: audio stream error: {}", err);
        };

        let buffer = Arc::new(Mutex::new(Vec::new()));

        let stream = match default_config.sample_format() {
            cpal::SampleFormat::F32 => {
                let buffer = Arc::clone(&buffer);
                device
                    .build_input_stream(
                        &stream_config,
                        move |data: &[f32], _: &cpal::InputCallbackInfo| {
                            push_mono(&buffer, data, channels);
                        },
                        err_callback,
                        None,
                    )
                    .map_err(|e| TabscribeError::AudioCapture {
                        message: format!("Failed to build f32 input stream: {}", e),
                    })?
            }
            cpal::SampleFormat::I16 => {
                let buffer = Arc::clone(&buffer);
                device
                    .build_input_stream(
                        &stream_config,
                        move |data: &[i16], _: &cpal::InputCallbackInfo| {
                            let floats: Vec<f32> =
                                data.iter().map(|&s| s as f32 / 32768.0).collect();
                            push_mono(&buffer, &floats, channels);
                        },
                        err_callback,
                        None,
                    )
                    .map_err(|e| TabscribeError::AudioCapture {
                        message: format!("Failed to build i16 input stream: {}", e),
                    })?
            }
            fmt => {
                return Err(TabscribeError::AudioCapture {
                    message: format!("Unsupported input sample format: {:?}", fmt),
                });
            }
        };

        stream.play().map_err(|e| TabscribeError::AudioCapture {
            message: format!("Failed to start audio stream: {}", e),
        })?;

        Ok(Self {
            stream: Some(SendableStream(stream)),
            buffer,
            sample_rate,
        })
    }
}

/// Mix interleaved frames to mono and append to the shared buffer.
fn push_mono(buffer: &Arc<Mutex<Vec<f32>>>, data: &[f32], channels: usize) {
    let Ok(mut buf) = buffer.lock() else {
        return;
    };
    if channels <= 1 {
        buf.extend_from_slice(data);
    } else {
        buf.extend(
            data.chunks_exact(channels)
                .map(|frame| frame.iter().sum::<f32>() / channels as f32),
        );
    }
}

impl MediaStream for CpalMediaStream {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn read_samples(&mut self) -> Result<Vec<f32>> {
        let mut buffer = self.buffer.lock().map_err(|e| TabscribeError::AudioCapture {
            message: format!("Failed to lock audio buffer: {}", e),
        })?;
        Ok(std::mem::take(&mut *buffer))
    }

    fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            if let Err(e) = stream.0.pause() {
                eprintln!("tabscribe: failed to stop audio stream: {}", e);
            }
        }
    }
}

impl Drop for CpalMediaStream {
    fn drop(&mut self) {
        self.close();
    }
}

/// Playback route that replays captured samples on the default output
/// device, compensating the capture-induced mute.
struct CpalLoopbackOutput {
    stream: Option<SendableStream>,
    queue: Arc<Mutex<VecDeque<f32>>>,
    output_rate: u32,
}

impl CpalLoopbackOutput {
    fn open(device: cpal::Device) -> Result<Self> {
        let default_config =
            device
                .default_output_config()
                .map_err(|e| TabscribeError::Loopback {
                    message: format!("Failed to query default output config: {}", e),
                })?;

        let output_rate = default_config.sample_rate().0;
        let output_channels = default_config.channels() as usize;
        let stream_config: cpal::StreamConfig = default_config.clone().into();

        let queue: Arc<Mutex<VecDeque<f32>>> = Arc::new(Mutex::new(VecDeque::new()));

        let err_callback = |err| {
            eprintln!("tabscribe: loopback stream error: {}", err);
        };

        let stream = match default_config.sample_format() {
            cpal::SampleFormat::F32 => {
                let queue = Arc::clone(&queue);
                let channels = output_channels;
                device
                    .build_output_stream(
                        &stream_config,
                        move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                            let Ok(mut q) = queue.lock() else {
                                data.fill(0.0);
                                return;
                            };
                            for frame in data.chunks_exact_mut(channels.max(1)) {
                                // Mono queue fanned out to every channel;
                                // silence when the queue runs dry.
                                let sample = q.pop_front().unwrap_or(0.0);
                                frame.fill(sample);
                            }
                        },
                        err_callback,
                        None,
                    )
                    .map_err(|e| TabscribeError::Loopback {
                        message: format!("Failed to build output stream: {}", e),
                    })?
            }
            fmt => {
                return Err(TabscribeError::Loopback {
                    message: format!("Unsupported output sample format: {:?}", fmt),
                });
            }
        };

        stream.play().map_err(|e| TabscribeError::Loopback {
            message: format!("Failed to start output stream: {}", e),
        })?;

        Ok(Self {
            stream: Some(SendableStream(stream)),
            queue,
            output_rate,
        })
    }
}

impl AudioOutput for CpalLoopbackOutput {
    fn play(&mut self, samples: &[f32], sample_rate: u32) -> Result<()> {
        // Rate-match to the output device with the same linear resampler
        // the pipeline uses.
        let resampled = crate::audio::resample(samples.to_vec(), sample_rate, self.output_rate);
        let mut queue = self.queue.lock().map_err(|e| TabscribeError::Loopback {
            message: format!("Failed to lock loopback queue: {}", e),
        })?;
        queue.extend(resampled);

        // Bound the queue to ~2s of audio so a stalled device cannot grow
        // it without limit.
        let cap = self.output_rate as usize * 2;
        while queue.len() > cap {
            queue.pop_front();
        }
        Ok(())
    }

    fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            if let Err(e) = stream.0.pause() {
                eprintln!("tabscribe: failed to stop loopback stream: {}", e);
            }
        }
    }
}

impl Drop for CpalLoopbackOutput {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_device_that_does_not_exist_is_an_error() {
        let host = SystemMediaHost::new(Some("NonExistentDevice12345".to_string()));
        let result = host.request_media_handle(TargetId(1));
        assert!(result.is_err());
    }

    #[test]
    #[ignore] // Requires audio hardware
    fn default_devices_open_and_close() {
        let host = SystemMediaHost::new(None);
        let handle = host.request_media_handle(TargetId(1)).expect("handle");

        let mut stream = host.open_stream(&handle).expect("input stream");
        assert!(stream.sample_rate() > 0);
        let _ = stream.read_samples();
        stream.close();

        let mut output = host.open_loopback().expect("output stream");
        output.play(&[0.0; 480], 48000).expect("play");
        output.close();
    }
}
