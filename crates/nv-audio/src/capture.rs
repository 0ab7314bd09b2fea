use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use nv_core::frame::Chunk;
use nv_core::traits::AudioSource;
use rtrb::{Consumer, Producer, RingBuffer};

use crate::error::AudioError;

/// Longest wait for one full chunk before `read_chunk` fails.
const READ_TIMEOUT: Duration = Duration::from_millis(500);
/// Poll interval while waiting for the ring buffer to fill.
const POLL_INTERVAL: Duration = Duration::from_millis(2);

/// Audio capture via cpal.
///
/// The cpal stream lives on its own keeper thread and writes interleaved f32
/// samples into a lock-free ring buffer (2 seconds). `read_chunk` blocks until
/// a full chunk is available.
///
/// # Example
/// ```no_run
/// use nv_audio::capture::MicSource;
/// use nv_core::traits::AudioSource;
/// let mut mic = MicSource::open_default(1024).unwrap();
/// let chunk = mic.read_chunk().unwrap();
/// ```
pub struct MicSource {
    consumer: Consumer<f32>,
    sample_rate: u32,
    channels: u16,
    chunk_frames: usize,
    chunk: Vec<f32>,
    stop: Arc<AtomicBool>,
    keeper: Option<thread::JoinHandle<()>>,
}

impl MicSource {
    /// Start capturing from the default input device, `chunk_frames` frames per chunk.
    ///
    /// # Errors
    /// Returns an error if no device is available, its sample format is unsupported
    /// or the stream fails to start.
    pub fn open_default(chunk_frames: usize) -> Result<Self> {
        let stop = Arc::new(AtomicBool::new(false));
        let (ready_tx, ready_rx) = flume::bounded::<Result<(u32, u16, Consumer<f32>)>>(1);

        let keeper_stop = Arc::clone(&stop);
        let keeper = thread::Builder::new()
            .name("nv-capture".to_string())
            .spawn(move || {
                let stream = match build_stream() {
                    Ok((stream, rate, channels, consumer)) => {
                        let _ = ready_tx.send(Ok((rate, channels, consumer)));
                        stream
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                while !keeper_stop.load(Ordering::Relaxed) {
                    thread::park_timeout(Duration::from_millis(100));
                }
                drop(stream);
                log::debug!("Capture stream fermé");
            })
            .context("Failed to spawn capture thread")?;

        let (sample_rate, channels, consumer) = ready_rx
            .recv()
            .map_err(|_| AudioError::StreamError("capture thread exited".into()))??;

        log::info!("Capture micro : {sample_rate} Hz, {channels} canal(aux)");

        Ok(Self {
            consumer,
            sample_rate,
            channels,
            chunk_frames,
            chunk: Vec::with_capacity(chunk_frames * usize::from(channels)),
            stop,
            keeper: Some(keeper),
        })
    }
}

/// Build and start the default input stream on the calling thread.
fn build_stream() -> Result<(cpal::Stream, u32, u16, Consumer<f32>)> {
    let host = cpal::default_host();
    let device = host.default_input_device().ok_or(AudioError::NoInputDevice)?;
    let config = device
        .default_input_config()
        .map_err(|e| AudioError::StreamError(e.to_string()))?;
    let sample_rate = config.sample_rate().0;
    let channels = config.channels();

    // Ring buffer: 2 seconds of audio @ sample_rate
    let buf_size = sample_rate as usize * usize::from(channels) * 2;
    let (producer, consumer) = RingBuffer::new(buf_size);

    let on_error = |err| log::error!("Audio stream error: {err}");
    let stream_config: cpal::StreamConfig = config.clone().into();
    let stream = match config.sample_format() {
        cpal::SampleFormat::F32 => {
            let mut producer = producer;
            device.build_input_stream(
                &stream_config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| { push_frames(&mut producer, data, channels, |s| s); },
                on_error,
                None,
            )
        }
        cpal::SampleFormat::I16 => {
            let mut producer = producer;
            device.build_input_stream(
                &stream_config,
                move |data: &[i16], _: &cpal::InputCallbackInfo| {
                    push_frames(&mut producer, data, channels, |s| f32::from(s) / 32768.0);
                },
                on_error,
                None,
            )
        }
        other => return Err(AudioError::UnsupportedFormat(format!("{other:?}")).into()),
    }
    .map_err(|e| AudioError::StreamError(e.to_string()))?;

    stream
        .play()
        .map_err(|e| AudioError::StreamError(e.to_string()))?;

    Ok((stream, sample_rate, channels, consumer))
}

/// Push whole interleaved frames that fit in the ring; the rest of the block is dropped.
///
/// Returns the number of samples pushed, always a multiple of `channels`.
fn push_frames<T: Copy>(
    producer: &mut Producer<f32>,
    data: &[T],
    channels: u16,
    convert: impl Fn(T) -> f32,
) -> usize {
    let channels = usize::from(channels.max(1));
    let fit = data.len().min(producer.slots());
    let n = fit - fit % channels;
    for &s in &data[..n] {
        // slots() garantit la place
        let _ = producer.push(convert(s));
    }
    n
}

impl AudioSource for MicSource {
    fn read_chunk(&mut self) -> Result<Option<Chunk<'_>>> {
        let needed = self.chunk_frames * usize::from(self.channels);
        let deadline = Instant::now() + READ_TIMEOUT;
        while self.consumer.slots() < needed {
            if self.consumer.is_abandoned() {
                return Err(AudioError::StreamError("capture stream closed".into()).into());
            }
            if Instant::now() >= deadline {
                return Err(AudioError::Timeout(READ_TIMEOUT.as_millis() as u64).into());
            }
            thread::sleep(POLL_INTERVAL);
        }

        let read = self
            .consumer
            .read_chunk(needed)
            .map_err(|e| AudioError::StreamError(e.to_string()))?;
        let (first, second) = read.as_slices();
        self.chunk.clear();
        self.chunk.extend_from_slice(first);
        self.chunk.extend_from_slice(second);
        read.commit_all();

        Ok(Some(Chunk::interleaved(&self.chunk, self.channels)))
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn channels(&self) -> u16 {
        self.channels
    }
}

impl Drop for MicSource {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(keeper) = self.keeper.take() {
            keeper.thread().unpark();
            let _ = keeper.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_ring_keeps_frames_aligned() {
        let (mut producer, mut consumer) = RingBuffer::<f32>::new(5);
        let stereo = [1.0f32, -1.0, 2.0, -2.0, 3.0, -3.0, 4.0, -4.0];
        assert_eq!(push_frames(&mut producer, &stereo, 2, |s| s), 4);
        assert_eq!(producer.slots(), 1);
        // One free slot is less than a frame: nothing is pushed
        assert_eq!(push_frames(&mut producer, &stereo, 2, |s| s), 0);

        let mut drained = Vec::new();
        while let Ok(v) = consumer.pop() {
            drained.push(v);
        }
        assert_eq!(drained, vec![1.0, -1.0, 2.0, -2.0]);

        assert_eq!(push_frames(&mut producer, &stereo, 2, |s| s), 4);
        assert_eq!(consumer.pop().ok(), Some(1.0));
    }

    #[test]
    fn i16_samples_are_scaled() {
        let (mut producer, mut consumer) = RingBuffer::<f32>::new(4);
        let pushed =
            push_frames(&mut producer, &[16384i16, -32768], 1, |s| f32::from(s) / 32768.0);
        assert_eq!(pushed, 2);
        assert_eq!(consumer.pop().ok(), Some(0.5));
        assert_eq!(consumer.pop().ok(), Some(-1.0));
    }
}
