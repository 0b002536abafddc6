mod config;
mod whiteboard;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{FrameCount, StreamConfig};
use ringbuf::traits::{Consumer, Producer, Split};
use rubato::Resampler;
use tokio::io::AsyncBufReadExt;
use tokio::sync::mpsc;
use tracing_subscriber::fmt::time::ChronoLocal;

use agora_audio::capture::{CpalBackend, Recorder};
use agora_audio::{audio, device};
use agora_client::ConnectionManager;
use agora_core::reducer::{Reducer, Signal};
use agora_core::{SessionController, VisualDispatcher};
use agora_types::audio::{CAPTURE_AUDIO_FORMAT, PCM16_SAMPLE_RATE};
use agora_types::{EventKind, ServerEvent, Session};

use crate::config::{Config, OUTPUT_CHUNK_SIZE, OUTPUT_LATENCY_MS, RESAMPLE_CHUNK_SIZE};
use crate::whiteboard::TerminalWhiteboard;

/// Inputs to the projection task: reducer signals plus the explicit reset
/// command from the prompt.
#[derive(Debug)]
enum UiInput {
    Signal(Signal),
    Reset,
}

#[derive(Parser)]
struct Cli {
    /// The topic for this tutoring session
    topic: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    // --- 1. Load Configuration ---
    let config = Config::from_env().context("Failed to load application configuration")?;

    // --- 2. Initialize Logging ---
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(ChronoLocal::rfc_3339())
        .init();

    tracing::info!("Configuration loaded successfully. Starting tutor client...");

    // --- 3. Parse Command-Line Arguments ---
    let args = Cli::parse();

    // --- 4. Session Identity ---
    let session = match config.user_id {
        Some(user_id) => Session::resume(user_id, &args.topic),
        None => Session::new(&args.topic),
    };
    tracing::info!(
        "session {} for user {} on topic '{}'",
        session.session_id(),
        session.user_id(),
        session.topic()
    );

    // --- 5. Connection Manager ---
    let mut client_config = agora_client::Config::builder().with_base_url(&config.server_url);
    if let Some(token) = &config.auth_token {
        client_config = client_config.with_auth_token(token);
    }
    let manager = Arc::new(ConnectionManager::new(client_config.build()));

    // --- 6. Channels Between Callbacks and Tasks ---
    // Connection-level events feeding the session controller.
    let (controller_tx, controller_rx) = mpsc::channel::<ServerEvent>(32);
    // Everything the projection task folds over.
    let (ui_tx, mut ui_rx) = mpsc::channel::<UiInput>(1024);
    // Base64 payloads for the playback task.
    let (audio_tx, audio_rx) = mpsc::channel::<String>(100);

    for kind in [
        EventKind::ConnectionStatus,
        EventKind::SessionInitialized,
        EventKind::Error,
    ] {
        let tx = controller_tx.clone();
        manager.subscribe(kind, move |event| {
            if let Err(e) = tx.try_send(event.clone()) {
                tracing::warn!("failed to forward event to controller: {:?}", e);
            }
        });
    }

    for kind in [
        EventKind::ConnectionStatus,
        EventKind::SessionInitialized,
        EventKind::Transcript,
        EventKind::SessionStatus,
        EventKind::Error,
    ] {
        let tx = ui_tx.clone();
        manager.subscribe(kind, move |event| {
            let _ = tx.try_send(UiInput::Signal(Signal::Server(event.clone())));
        });
    }

    let dispatcher = Arc::new(VisualDispatcher::new());
    dispatcher.attach(Arc::new(TerminalWhiteboard::new()));
    {
        let dispatcher = dispatcher.clone();
        manager.subscribe(EventKind::Visual, move |event| {
            if let ServerEvent::Visual(visual) = event {
                dispatcher.dispatch(visual);
            }
        });
    }

    {
        let tx = audio_tx.clone();
        manager.subscribe(EventKind::AudioResponse, move |event| {
            if let ServerEvent::AudioResponse(audio) = event {
                if let Err(e) = tx.try_send(audio.payload().to_string()) {
                    tracing::warn!("failed to forward audio response: {:?}", e);
                }
            }
        });
    }

    // --- 7. Session Controller ---
    let controller = Arc::new(SessionController::new(manager.clone(), session));
    let controller_handle = tokio::spawn(controller.clone().run(controller_rx));

    // --- 8. Projections ---
    // Folds signals into readiness/status/transcript and renders the deltas.
    let reducer_handle = tokio::spawn(async move {
        let mut reducer = Reducer::new();
        let mut last_status = reducer.status();
        let mut last_readiness = reducer.readiness();
        let mut printed_entries = 0usize;

        while let Some(input) = ui_rx.recv().await {
            match input {
                UiInput::Signal(signal) => reducer.apply(&signal, chrono::Utc::now()),
                UiInput::Reset => {
                    reducer.reset();
                    printed_entries = 0;
                    println!("--- session reset ---");
                }
            }

            if reducer.readiness() != last_readiness {
                last_readiness = reducer.readiness();
                tracing::info!("connection: {:?}", last_readiness);
            }
            if reducer.status() != last_status {
                last_status = reducer.status();
                tracing::info!("status: {:?}", last_status);
            }
            for entry in &reducer.transcript()[printed_entries..] {
                println!("[{:?}] {}", entry.speaker(), entry.text());
            }
            printed_entries = reducer.transcript().len();
        }
    });

    // --- 9. Playback of Tutor Speech ---
    // The stream handle must stay on this task: cpal streams are not Send.
    let playback_stream = setup_playback(&config, ui_tx.clone(), audio_rx);
    if playback_stream.is_none() {
        tracing::warn!("audio playback disabled; transcripts only");
    }

    // --- 10. Connect and Run the Prompt Loop ---
    manager
        .connect()
        .await
        .context("Failed to connect to tutoring backend")?;

    let mut recorder = Recorder::new(CpalBackend::new(config.input_device.clone()));

    println!("Connected. Type a question and press enter.");
    println!("Commands: /record, /stop, /reset, /quit");

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("failed to read stdin")? else {
                    break;
                };
                let line = line.trim();
                match line {
                    "" => {}
                    "/quit" => break,
                    "/reset" => {
                        let _ = ui_tx.send(UiInput::Reset).await;
                    }
                    "/record" => match recorder.start() {
                        Ok(()) => {
                            let _ = ui_tx.send(UiInput::Signal(Signal::CaptureStarted)).await;
                        }
                        Err(e) => tracing::error!("could not start recording: {}", e),
                    },
                    "/stop" => match recorder.stop().await {
                        // Stopping an idle recorder is a no-op.
                        Ok(None) => {}
                        Ok(Some(buffer)) => {
                            let _ = ui_tx.send(UiInput::Signal(Signal::CaptureStopped)).await;
                            match controller.send_audio(buffer, CAPTURE_AUDIO_FORMAT).await {
                                Ok(()) => {
                                    let _ = ui_tx.send(UiInput::Signal(Signal::InputSent)).await;
                                }
                                Err(e) => tracing::error!("audio send failed: {}", e),
                            }
                        }
                        Err(e) => tracing::error!("could not stop recording: {}", e),
                    },
                    text => match controller.send_text(text).await {
                        Ok(()) => {
                            let _ = ui_tx.send(UiInput::Signal(Signal::InputSent)).await;
                        }
                        Err(e) => tracing::error!("text send failed: {}", e),
                    },
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Received Ctrl-C, shutting down...");
                break;
            }
        }
    }

    manager.close().await;
    controller_handle.abort();
    reducer_handle.abort();
    drop(playback_stream);
    tracing::info!("Shutting down...");
    Ok(())
}

/// Builds the playback path: a task decoding/resampling `audio_response`
/// payloads into a ring buffer, and an output stream draining it. The output
/// callback watches for silence transitions and reports speaking state to
/// the projection task.
fn setup_playback(
    config: &Config,
    ui_tx: mpsc::Sender<UiInput>,
    mut audio_rx: mpsc::Receiver<String>,
) -> Option<cpal::Stream> {
    let output = match device::get_or_default_output(config.output_device.clone()) {
        Ok(device) => device,
        Err(e) => {
            tracing::warn!("no audio output device: {}", e);
            return None;
        }
    };
    let default_config = match output.default_output_config() {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!("no default output config: {}", e);
            return None;
        }
    };
    let output_config = StreamConfig {
        channels: default_config.channels(),
        sample_rate: default_config.sample_rate(),
        buffer_size: cpal::BufferSize::Fixed(FrameCount::from(OUTPUT_CHUNK_SIZE as u32)),
    };
    let channel_count = output_config.channels as usize;
    let output_sample_rate = output_config.sample_rate.0 as f64;
    tracing::info!("Output stream config: {:?}", &output_config);

    let buffer = audio::shared_buffer(output_sample_rate as usize * OUTPUT_LATENCY_MS / 1000);
    let (mut producer, mut consumer) = buffer.split();

    let mut resampler =
        match audio::create_resampler(PCM16_SAMPLE_RATE, output_sample_rate, RESAMPLE_CHUNK_SIZE) {
            Ok(resampler) => resampler,
            Err(e) => {
                tracing::warn!("could not create playback resampler: {}", e);
                return None;
            }
        };

    // Decode base64 PCM16 payloads, resample to the device rate, and push
    // the result into the ring buffer.
    tokio::spawn(async move {
        while let Some(payload) = audio_rx.recv().await {
            let samples = audio::decode_pcm16(&payload);
            let chunk_size = resampler.input_frames_next();
            for chunk in audio::split_for_chunks(&samples, chunk_size) {
                if let Ok(resampled) = resampler.process(&[chunk.as_slice()], None) {
                    if let Some(resampled) = resampled.first() {
                        for sample in resampled {
                            if producer.try_push(*sample).is_err() {
                                tracing::warn!("playback buffer full, dropping samples");
                                break;
                            }
                        }
                    }
                }
            }
        }
    });

    // The output callback fills frames from the ring buffer and reports
    // silence transitions as playback signals.
    let mut was_speaking = false;
    let output_data_fn = move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
        let mut silence = 0usize;
        let mut sample_index = 0usize;
        while sample_index < data.len() {
            let sample = consumer.try_pop().unwrap_or(0.0);
            if sample == 0.0 {
                silence += 1;
            }
            // Left channel (ch 0).
            data[sample_index] = sample;
            sample_index += 1;
            // Right channel (ch 1), if present.
            if channel_count > 1 && sample_index < data.len() {
                data[sample_index] = sample;
                sample_index += 1;
            }
            // Remaining channels stay untouched.
            sample_index += channel_count.saturating_sub(2);
        }

        let speaking = silence < data.len() / channel_count.max(1);
        if speaking != was_speaking {
            was_speaking = speaking;
            let signal = if speaking {
                Signal::PlaybackStarted
            } else {
                Signal::PlaybackFinished
            };
            if let Err(e) = ui_tx.try_send(UiInput::Signal(signal)) {
                tracing::warn!("failed to send playback signal: {:?}", e);
            }
        }
    };

    let stream = match output.build_output_stream(
        &output_config,
        output_data_fn,
        move |err| tracing::error!("An error occurred on output stream: {}", err),
        None,
    ) {
        Ok(stream) => stream,
        Err(e) => {
            tracing::warn!("could not build output stream: {}", e);
            return None;
        }
    };
    if let Err(e) = stream.play() {
        tracing::warn!("could not start output stream: {}", e);
        return None;
    }
    Some(stream)
}
