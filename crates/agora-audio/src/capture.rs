use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::StreamConfig;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::audio::ToBinary;
use crate::device;
use crate::error::CaptureError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Idle,
    Recording,
    Finalizing,
}

/// The input-device collaborator.
///
/// `open` requests exclusive device access and starts delivering mono f32
/// chunks on the channel. The returned handle holds the device lock for the
/// lifetime of the recording; dropping it stops capture and closes the
/// channel's sending side.
pub trait CaptureBackend {
    type Stream;

    fn open(&self, chunks: UnboundedSender<Vec<f32>>) -> Result<Self::Stream, CaptureError>;
}

struct Live<S> {
    stream: S,
    chunks: UnboundedReceiver<Vec<f32>>,
}

/// Microphone capture state machine: `Idle → Recording → Finalizing → Idle`.
///
/// Exactly one finished PCM16 buffer comes out of each recording; `stop`
/// while idle is a no-op. The device lock is the stream handle itself, so
/// dropping the recorder mid-recording releases it too.
pub struct Recorder<B: CaptureBackend> {
    backend: B,
    state: CaptureState,
    live: Option<Live<B::Stream>>,
}

impl<B: CaptureBackend> Recorder<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            state: CaptureState::Idle,
            live: None,
        }
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    /// Requests exclusive access to the input device and begins
    /// accumulating chunks.
    pub fn start(&mut self) -> Result<(), CaptureError> {
        if self.state == CaptureState::Recording {
            return Err(CaptureError::AlreadyRecording);
        }
        let (tx, rx) = mpsc::unbounded_channel();
        let stream = self.backend.open(tx)?;
        self.live = Some(Live { stream, chunks: rx });
        self.state = CaptureState::Recording;
        tracing::debug!("recording started");
        Ok(())
    }

    /// Finishes the recording and yields the concatenated buffer.
    ///
    /// Suspends until the final chunk is flushed: the stream handle is
    /// dropped first (releasing the device lock), then the channel is
    /// drained to the end in arrival order.
    pub async fn stop(&mut self) -> Result<Option<Vec<u8>>, CaptureError> {
        let Some(live) = self.live.take() else {
            return Ok(None);
        };
        self.state = CaptureState::Finalizing;

        let Live { stream, mut chunks } = live;
        drop(stream);

        let mut samples: Vec<f32> = Vec::new();
        while let Some(chunk) = chunks.recv().await {
            samples.extend(chunk);
        }
        self.state = CaptureState::Idle;
        tracing::debug!("recording finished: {} samples", samples.len());
        Ok(Some(samples.as_slice().to_binary()))
    }
}

/// Production backend on the default cpal host.
pub struct CpalBackend {
    device_name: Option<String>,
}

impl CpalBackend {
    pub fn new(device_name: Option<String>) -> Self {
        Self { device_name }
    }
}

impl CaptureBackend for CpalBackend {
    type Stream = cpal::Stream;

    fn open(&self, chunks: UnboundedSender<Vec<f32>>) -> Result<cpal::Stream, CaptureError> {
        let device = device::get_or_default_input(self.device_name.clone())
            .map_err(|e| CaptureError::DeviceUnavailable(e.to_string()))?;
        let config = device
            .default_input_config()
            .map_err(|e| CaptureError::DeviceUnavailable(e.to_string()))?;
        let config = StreamConfig {
            channels: config.channels(),
            sample_rate: config.sample_rate(),
            buffer_size: cpal::BufferSize::Default,
        };
        let channel_count = config.channels as usize;

        let data_fn = move |data: &[f32], _: &cpal::InputCallbackInfo| {
            let mono = if channel_count > 1 {
                data.chunks(channel_count)
                    .map(|frame| frame.iter().sum::<f32>() / channel_count as f32)
                    .collect::<Vec<f32>>()
            } else {
                data.to_vec()
            };
            // A closed channel means the recorder is finalizing; late chunks
            // are dropped.
            let _ = chunks.send(mono);
        };

        let stream = device
            .build_input_stream(
                &config,
                data_fn,
                move |err| tracing::error!("input stream error: {}", err),
                None,
            )
            .map_err(|e| CaptureError::Stream(e.to_string()))?;
        stream
            .play()
            .map_err(|e| CaptureError::Stream(e.to_string()))?;
        Ok(stream)
    }
}
