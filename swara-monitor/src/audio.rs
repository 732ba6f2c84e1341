//! # Audio Capture Module
//!
//! Real-time microphone capture with CPAL. Samples from the device callback
//! are cut into fixed-size frames and handed to the analysis thread over a
//! bounded channel.

use anyhow::{Result, anyhow};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::SupportedStreamConfigRange;
use crossbeam_channel::Sender;
use log::{error, info, trace};
use swara_core::AudioFrame;

/// Samples per analysis frame (~46 ms at 44.1 kHz).
pub const BUFFER_SIZE: usize = 2048;

/// Preferred capture rate.
pub const TARGET_SAMPLE_RATE: u32 = 44_100;

/// Starts capture from the default input device.
///
/// Frames are dropped when the channel is full, so a slow consumer never
/// blocks the audio callback.
///
/// # Returns
/// * `Ok((stream, sample_rate))` - the running stream and its sample rate.
///   Capture stops when the stream is dropped.
/// * `Err(e)` - no device, no mono f32 format, or the stream failed to start
pub fn start_audio_capture(sender: Sender<AudioFrame>) -> Result<(cpal::Stream, u32)> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or_else(|| anyhow!("No input device available"))?;

    info!("Using audio input device: {}", device.name()?);

    let configs = device.supported_input_configs()?.collect::<Vec<_>>();
    let supported_config = find_supported_config(configs, TARGET_SAMPLE_RATE)
        .ok_or_else(|| anyhow!("No suitable mono f32 input format found"))?;

    let sample_rate = clamp_rate(&supported_config, TARGET_SAMPLE_RATE);
    let config: cpal::StreamConfig = supported_config
        .with_sample_rate(cpal::SampleRate(sample_rate))
        .into();

    info!("Selected sample rate: {sample_rate} Hz");

    let err_fn = |err| error!("An error occurred on the audio stream: {err}");

    let mut audio_buffer = Vec::with_capacity(BUFFER_SIZE * 2);

    let stream = device.build_input_stream(
        &config,
        move |data: &[f32], _: &cpal::InputCallbackInfo| {
            audio_buffer.extend_from_slice(data);

            while audio_buffer.len() >= BUFFER_SIZE {
                let samples = audio_buffer[..BUFFER_SIZE].to_vec();
                if sender.try_send(AudioFrame::new(samples, sample_rate)).is_err() {
                    trace!("analysis is behind, dropping a frame");
                }
                audio_buffer.drain(..BUFFER_SIZE);
            }
        },
        err_fn,
        None,
    )?;

    stream.play()?;

    Ok((stream, sample_rate))
}

/// Picks the mono f32 configuration whose rate range is closest to `target_rate`.
fn find_supported_config(
    configs: Vec<SupportedStreamConfigRange>,
    target_rate: u32,
) -> Option<SupportedStreamConfigRange> {
    configs
        .into_iter()
        .filter(|c| c.channels() == 1 && c.sample_format() == cpal::SampleFormat::F32)
        .min_by_key(|c| rate_distance(c.min_sample_rate().0, c.max_sample_rate().0, target_rate))
}

/// Distance from `target` to the range `[min, max]`; zero when inside it.
fn rate_distance(min: u32, max: u32, target: u32) -> u32 {
    if target < min {
        min - target
    } else {
        target.saturating_sub(max)
    }
}

fn clamp_rate(config: &SupportedStreamConfigRange, target: u32) -> u32 {
    target.clamp(config.min_sample_rate().0, config.max_sample_rate().0)
}
