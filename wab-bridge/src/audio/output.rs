//! Audio output using cpal
//!
//! Manages the output device and its callback-driven stream. The
//! `cpal::Stream` handle is not `Send` on every platform, so it lives on a
//! dedicated audio thread; the endpoint talks to that thread through a
//! command channel and to the device callback through the schedule ring.
//!
//! The playback clock is the number of frames the device callback has
//! rendered. A stream that has not been started (waiting for a user gesture)
//! therefore reports a clock that stands still, like a suspended web audio
//! context.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, FromSample, Host, Sample, SampleFormat, SizedSample, Stream, StreamConfig};
use tracing::{debug, error, info, warn};
use wab_common::config::{AudioConfig, UnlockConfig};

use super::endpoint::{AudioEndpoint, OutputPlatform};
use super::scheduler::{schedule_queue, FrameClock, ScheduleSender, ScheduledBuffer, Scheduler};
use super::types::StereoBuffer;
use crate::error::{Error, Result};

/// Opens cpal output endpoints.
#[derive(Debug, Clone)]
pub struct CpalPlatform {
    /// Requested device name (None = default device)
    device: Option<String>,
    preferred_sample_rate: u32,
    /// Fixed device buffer size in frames (None = device default)
    buffer_frames: Option<u32>,
    schedule_capacity: usize,
    /// Build the stream paused; the first unlock starts it
    start_suspended: bool,
}

impl CpalPlatform {
    pub fn from_config(audio: &AudioConfig, unlock: &UnlockConfig) -> Self {
        Self {
            device: audio.device.clone(),
            preferred_sample_rate: audio.preferred_sample_rate,
            buffer_frames: audio.output_buffer_frames,
            schedule_capacity: audio.schedule_capacity,
            start_suspended: unlock.require_gesture,
        }
    }

    /// List available audio output devices.
    pub fn list_devices() -> Result<Vec<String>> {
        let host = cpal::default_host();

        let devices: Vec<String> = host
            .output_devices()
            .map_err(|e| Error::AudioOutput(format!("Failed to enumerate devices: {}", e)))?
            .filter_map(|device| device.name().ok())
            .collect();

        debug!("Found {} output devices", devices.len());
        Ok(devices)
    }

    pub fn requested_device(&self) -> Option<&str> {
        self.device.as_deref()
    }

    pub fn starts_suspended(&self) -> bool {
        self.start_suspended
    }
}

impl OutputPlatform for CpalPlatform {
    fn name(&self) -> &str {
        "cpal"
    }

    fn open_endpoint(&self) -> Result<Arc<dyn AudioEndpoint>> {
        Ok(Arc::new(CpalEndpoint::open(self.clone())?))
    }
}

enum StreamCommand {
    Resume,
    Shutdown,
}

/// Handed back by the audio thread once the stream exists
struct StreamInfo {
    device_name: String,
    sample_rate: u32,
    channels: u16,
    sample_format: SampleFormat,
    clock: Arc<FrameClock>,
    sender: ScheduleSender,
}

/// Live cpal output stream.
pub struct CpalEndpoint {
    name: String,
    sample_rate: f64,
    clock: Arc<FrameClock>,
    sender: ScheduleSender,
    commands: Mutex<mpsc::Sender<StreamCommand>>,
    suspended: AtomicBool,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl CpalEndpoint {
    /// Open the device and build the stream on a new audio thread.
    ///
    /// Returns once the stream has been built (or has failed to build).
    ///
    /// # Errors
    /// - [`Error::NoDevice`]: requested and default devices unavailable
    /// - [`Error::UnknownStreamFormat`]: no usable configuration or sample format
    /// - [`Error::OutputStream`]: stream could not be built or started
    pub fn open(platform: CpalPlatform) -> Result<Self> {
        let start_suspended = platform.start_suspended;
        let (ready_tx, ready_rx) = mpsc::sync_channel::<Result<StreamInfo>>(1);
        let (command_tx, command_rx) = mpsc::channel::<StreamCommand>();

        let thread = thread::Builder::new()
            .name("wab-audio-output".to_string())
            .spawn(move || run_output_thread(platform, ready_tx, command_rx))
            .map_err(|e| Error::AudioOutput(format!("Failed to spawn audio thread: {}", e)))?;

        let info = match ready_rx.recv() {
            Ok(Ok(info)) => info,
            Ok(Err(e)) => {
                let _ = thread.join();
                return Err(e);
            }
            Err(_) => {
                let _ = thread.join();
                return Err(Error::AudioOutput(
                    "Audio thread exited during startup".to_string(),
                ));
            }
        };

        info!(
            "Audio output ready: device={}, sample_rate={}, channels={}, format={:?}",
            info.device_name, info.sample_rate, info.channels, info.sample_format
        );

        Ok(Self {
            name: info.device_name,
            sample_rate: info.sample_rate as f64,
            clock: info.clock,
            sender: info.sender,
            commands: Mutex::new(command_tx),
            suspended: AtomicBool::new(start_suspended),
            thread: Mutex::new(Some(thread)),
        })
    }

    /// Whether the stream is still waiting for its first unlock
    pub fn is_suspended(&self) -> bool {
        self.suspended.load(Ordering::SeqCst)
    }

    fn send_command(&self, command: StreamCommand) {
        let commands = self.commands.lock().unwrap_or_else(PoisonError::into_inner);
        if commands.send(command).is_err() {
            warn!("Audio output thread is gone, command dropped");
        }
    }
}

impl AudioEndpoint for CpalEndpoint {
    fn name(&self) -> &str {
        &self.name
    }

    fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    fn current_time(&self) -> f64 {
        self.clock.seconds()
    }

    fn schedule(&self, buffer: StereoBuffer, start_time: f64) {
        self.sender.send(ScheduledBuffer { buffer, start_time });
    }

    fn unlock(&self) {
        self.schedule(StereoBuffer::silence(1, self.sample_rate), 0.0);
        if self.suspended.swap(false, Ordering::SeqCst) {
            self.send_command(StreamCommand::Resume);
        }
    }
}

impl Drop for CpalEndpoint {
    fn drop(&mut self) {
        // Ensure stream is stopped on drop
        self.send_command(StreamCommand::Shutdown);
        let handle = self
            .thread
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                error!("Audio output thread panicked");
            }
        }
    }
}

/// Audio thread body: owns the stream until shutdown
fn run_output_thread(
    platform: CpalPlatform,
    ready: SyncSender<Result<StreamInfo>>,
    commands: Receiver<StreamCommand>,
) {
    let (stream, info) = match open_stream(&platform) {
        Ok(opened) => opened,
        Err(e) => {
            error!("Failed to open audio output: {}", e);
            let _ = ready.send(Err(e));
            return;
        }
    };
    if ready.send(Ok(info)).is_err() {
        return;
    }

    for command in commands.iter() {
        match command {
            StreamCommand::Resume => match stream.play() {
                Ok(()) => info!("Audio output resumed"),
                Err(e) => error!("Failed to resume audio stream: {}", e),
            },
            StreamCommand::Shutdown => break,
        }
    }

    if let Err(e) = stream.pause() {
        debug!("Failed to pause stream on shutdown: {}", e);
    }
    drop(stream);
    info!("Audio output thread stopped");
}

fn open_stream(platform: &CpalPlatform) -> Result<(Stream, StreamInfo)> {
    let host = cpal::default_host();
    let device = select_device(&host, platform.device.as_deref())?;
    let device_name = device.name().unwrap_or_else(|_| "Unknown".to_string());

    let (mut config, sample_format) = best_config(&device, platform.preferred_sample_rate)?;

    // Apply requested buffer size if provided
    if let Some(size) = platform.buffer_frames {
        config.buffer_size = cpal::BufferSize::Fixed(size);
        debug!("Using requested buffer size: {} frames", size);
    } else {
        debug!("Using device default buffer size");
    }

    let sample_rate = config.sample_rate.0;
    let clock = Arc::new(FrameClock::new(sample_rate as f64));
    let (sender, scheduler) = schedule_queue(platform.schedule_capacity, Arc::clone(&clock));

    let stream = match sample_format {
        SampleFormat::F32 => build_stream::<f32>(&device, &config, scheduler)?,
        SampleFormat::I16 => build_stream::<i16>(&device, &config, scheduler)?,
        SampleFormat::U16 => build_stream::<u16>(&device, &config, scheduler)?,
        sample_format => {
            return Err(Error::UnknownStreamFormat(format!(
                "Unsupported sample format: {:?}",
                sample_format
            )));
        }
    };

    if platform.start_suspended {
        stream
            .pause()
            .map_err(|e| Error::OutputStream(format!("Failed to pause stream: {}", e)))?;
        info!("Audio output suspended until the first user gesture");
    } else {
        stream
            .play()
            .map_err(|e| Error::OutputStream(format!("Failed to start stream: {}", e)))?;
    }

    let info = StreamInfo {
        device_name,
        sample_rate,
        channels: config.channels,
        sample_format,
        clock,
        sender,
    };
    Ok((stream, info))
}

/// Find the requested device, falling back to the default output device
fn select_device(host: &Host, device_name: Option<&str>) -> Result<Device> {
    if let Some(name) = device_name {
        let mut devices = host
            .output_devices()
            .map_err(|e| Error::AudioOutput(format!("Failed to enumerate devices: {}", e)))?;

        if let Some(dev) = devices.find(|d| d.name().ok().as_deref() == Some(name)) {
            info!("Found requested audio device: {}", name);
            return Ok(dev);
        }
        warn!(
            "Requested device '{}' not found, falling back to default device",
            name
        );
    }

    let dev = host.default_output_device().ok_or(Error::NoDevice)?;
    info!(
        "Using default audio device: {}",
        dev.name().unwrap_or_else(|_| "Unknown".to_string())
    );
    Ok(dev)
}

/// Get the best supported configuration for playback.
///
/// Prefers stereo f32 at `preferred_rate`, otherwise the device default.
fn best_config(device: &Device, preferred_rate: u32) -> Result<(StreamConfig, SampleFormat)> {
    match device.supported_output_configs() {
        Ok(mut supported_configs) => {
            let preferred = supported_configs.find(|config| {
                config.channels() == 2
                    && config.min_sample_rate().0 <= preferred_rate
                    && config.max_sample_rate().0 >= preferred_rate
                    && config.sample_format() == SampleFormat::F32
            });

            if let Some(supported_config) = preferred {
                let sample_format = supported_config.sample_format();
                let config = supported_config
                    .with_sample_rate(cpal::SampleRate(preferred_rate))
                    .config();
                return Ok((config, sample_format));
            }
        }
        Err(e) => warn!("Failed to get device configs: {}", e),
    }

    // Fallback: use default config
    let supported_config = device
        .default_output_config()
        .map_err(|e| Error::UnknownStreamFormat(format!("Failed to get default config: {}", e)))?;

    let sample_format = supported_config.sample_format();
    let config = supported_config.config();
    Ok((config, sample_format))
}

/// Build the device stream; the callback renders scheduled blocks
fn build_stream<T>(device: &Device, config: &StreamConfig, mut scheduler: Scheduler) -> Result<Stream>
where
    T: SizedSample + FromSample<f32>,
{
    let channels = config.channels as usize;
    let mut mix: Vec<f32> = Vec::new();

    device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                if mix.len() != data.len() {
                    mix.resize(data.len(), 0.0);
                }
                scheduler.render(&mut mix, channels);

                for (out, sample) in data.iter_mut().zip(mix.iter()) {
                    // Clamp to prevent wrap-around in integer formats
                    *out = T::from_sample(sample.clamp(-1.0, 1.0));
                }
            },
            move |err| {
                error!("Audio stream error: {}", err);
            },
            None, // No timeout
        )
        .map_err(|e| Error::OutputStream(format!("Failed to build stream: {}", e)))
}
