//! Real-time audio output using cpal
//! Works with JACK, ALSA, OpenSL ES (Android/Termux), etc.
//!
//! The render callback never takes part in chain mutations: it loads
//! whatever routing graph is currently published and pulls one block
//! through it. Input audio is fed through a lock-free ring buffer of
//! interleaved stereo frames; an underrun renders silence.

use crate::graph::RoutingGraph;
use arc_swap::ArcSwap;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use ringbuf::traits::{Consumer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};
use std::sync::Arc;
use tracing::{error, info};

use crate::plugin_host::{HostError, HostResult};

/// Seconds of interleaved stereo input the ring buffer can hold
const RING_SECONDS: usize = 2;

pub struct AudioEngine {
    sample_rate: u32,
    /// Feed side of the input ring (interleaved stereo frames)
    producer: HeapProd<f32>,
    _stream: cpal::Stream,
}

impl AudioEngine {
    /// Open the default output device and start rendering the
    /// currently published graph
    pub fn new(graph: Arc<ArcSwap<RoutingGraph>>) -> HostResult<Self> {
        // Get the default audio host (JACK/ALSA/OpenSL ES/etc)
        let host = cpal::default_host();
        info!("Audio host: {:?}", host.id());

        // Get default output device
        let device = host
            .default_output_device()
            .ok_or_else(|| HostError::Audio("No audio output device found".to_string()))?;
        info!(
            "Audio device: {}",
            device
                .name()
                .unwrap_or_else(|_| "<unnamed>".to_string())
        );

        // Get default output config
        let config = device
            .default_output_config()
            .map_err(|e| HostError::Audio(e.to_string()))?;
        info!("Audio config: {:?}", config);

        let sample_rate = config.sample_rate().0;
        let channels = config.channels() as usize;

        // Ring buffer: control side writes input frames, callback reads
        let ring = HeapRb::<f32>::new(sample_rate as usize * 2 * RING_SECONDS);
        let (producer, consumer) = ring.split();

        // Build the output stream
        let stream = match config.sample_format() {
            cpal::SampleFormat::F32 => {
                Self::build_stream::<f32>(&device, &config.into(), graph, consumer, channels)
            }
            cpal::SampleFormat::I16 => {
                Self::build_stream::<i16>(&device, &config.into(), graph, consumer, channels)
            }
            cpal::SampleFormat::U16 => {
                Self::build_stream::<u16>(&device, &config.into(), graph, consumer, channels)
            }
            _ => return Err(HostError::Audio("Unsupported sample format".to_string())),
        }?;

        // Start audio stream
        stream.play().map_err(|e| HostError::Audio(e.to_string()))?;
        info!("Audio stream started at {} Hz", sample_rate);

        Ok(Self {
            sample_rate,
            producer,
            _stream: stream,
        })
    }

    fn build_stream<T>(
        device: &cpal::Device,
        config: &cpal::StreamConfig,
        graph: Arc<ArcSwap<RoutingGraph>>,
        mut consumer: HeapCons<f32>,
        channels: usize,
    ) -> HostResult<cpal::Stream>
    where
        T: cpal::SizedSample + cpal::FromSample<f32>,
    {
        // Scratch buffers reused across callbacks
        let mut interleaved: Vec<f32> = Vec::new();
        let mut left: Vec<f32> = Vec::new();
        let mut right: Vec<f32> = Vec::new();

        let stream = device
            .build_output_stream(
                config,
                move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                    let frames = data.len() / channels.max(1);
                    interleaved.resize(frames * 2, 0.0);
                    left.resize(frames, 0.0);
                    right.resize(frames, 0.0);

                    // Pull input frames; anything missing is silence
                    let read = consumer.pop_slice(&mut interleaved);
                    interleaved[read..].fill(0.0);
                    for i in 0..frames {
                        left[i] = interleaved[i * 2];
                        right[i] = interleaved[i * 2 + 1];
                    }

                    // The published graph is always complete; a rebuild
                    // swaps the whole Arc underneath us between blocks
                    let current = graph.load();
                    current.process_block(&mut left, &mut right);

                    for (i, frame) in data.chunks_mut(channels).enumerate() {
                        match frame.len() {
                            1 => frame[0] = T::from_sample((left[i] + right[i]) * 0.5),
                            _ => {
                                frame[0] = T::from_sample(left[i]);
                                frame[1] = T::from_sample(right[i]);
                                for channel in frame.iter_mut().skip(2) {
                                    *channel = T::from_sample(0.0);
                                }
                            }
                        }
                    }
                },
                |err| error!("Audio stream error: {}", err),
                None,
            )
            .map_err(|e| HostError::Audio(e.to_string()))?;

        Ok(stream)
    }

    /// Feed interleaved stereo frames into the chain.
    /// Returns how many samples were accepted (ring may be full).
    pub fn push_input(&mut self, samples: &[f32]) -> usize {
        self.producer.push_slice(samples)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}
