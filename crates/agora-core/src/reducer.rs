use chrono::{DateTime, Utc};

use agora_types::{ConversationalStatus, ServerEvent, TranscriptEntry};

/// One element of the event stream the reducer folds over: either a server
/// event or a local capture/send/playback notification.
#[derive(Debug, Clone)]
pub enum Signal {
    Server(ServerEvent),
    CaptureStarted,
    CaptureStopped,
    InputSent,
    PlaybackStarted,
    PlaybackFinished,
}

/// Connection readiness as seen by the UI.
///
/// `Reconnecting` is distinct from `NeverConnected` so an outage mid-session
/// never looks like a fresh page load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Readiness {
    #[default]
    NeverConnected,
    Connected,
    Ready,
    Reconnecting,
    Failed,
}

/// Folds the event stream into the three UI-visible projections: readiness,
/// conversational status, and the transcript.
///
/// `apply` is a total function over (signal, timestamp) pairs: it reads no
/// clocks and keeps no hidden inputs, so replaying a recorded log always
/// reproduces identical projections. Events are applied strictly in arrival
/// order with no buffering or deduplication; duplicate transcript delivery
/// therefore produces duplicate entries.
#[derive(Debug, Default)]
pub struct Reducer {
    readiness: Readiness,
    status: ConversationalStatus,
    transcript: Vec<TranscriptEntry>,
    next_entry_id: u64,
}

impl Reducer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn readiness(&self) -> Readiness {
        self.readiness
    }

    pub fn status(&self) -> ConversationalStatus {
        self.status
    }

    pub fn transcript(&self) -> &[TranscriptEntry] {
        &self.transcript
    }

    /// Clears the derived projections. Only an explicit session reset calls
    /// this; reconnects never do.
    pub fn reset(&mut self) {
        self.status = ConversationalStatus::Idle;
        self.transcript.clear();
        self.next_entry_id = 0;
    }

    pub fn apply(&mut self, signal: &Signal, at: DateTime<Utc>) {
        match signal {
            Signal::CaptureStarted => self.status = ConversationalStatus::Listening,
            // Still listening as far as the UI is concerned: the finished
            // buffer has not been sent yet.
            Signal::CaptureStopped => {}
            Signal::InputSent => self.status = ConversationalStatus::Thinking,
            Signal::PlaybackStarted => self.status = ConversationalStatus::Speaking,
            Signal::PlaybackFinished => self.status = ConversationalStatus::Idle,
            Signal::Server(event) => self.apply_server_event(event, at),
        }
    }

    fn apply_server_event(&mut self, event: &ServerEvent, at: DateTime<Utc>) {
        match event {
            ServerEvent::ConnectionStatus(status) => {
                if status.connected() {
                    self.readiness = Readiness::Connected;
                } else {
                    if self.readiness != Readiness::NeverConnected {
                        self.readiness = Readiness::Reconnecting;
                    }
                    // An outage must never leave the UI stuck in Thinking.
                    self.status = ConversationalStatus::Idle;
                }
            }
            ServerEvent::SessionInitialized(_) => self.readiness = Readiness::Ready,
            ServerEvent::Transcript(t) => {
                self.next_entry_id += 1;
                self.transcript.push(TranscriptEntry::new(
                    self.next_entry_id,
                    t.speaker(),
                    t.text(),
                    at,
                ));
                self.status = ConversationalStatus::Idle;
            }
            ServerEvent::SessionStatus(status) => {
                if status.is_complete() {
                    self.status = ConversationalStatus::Idle;
                }
            }
            ServerEvent::Error(e) => {
                if e.is_transport() && self.readiness == Readiness::Reconnecting {
                    self.readiness = Readiness::Failed;
                }
                self.status = ConversationalStatus::Idle;
            }
            // Speaking is driven by the playback surface, not by the
            // arrival of the audio payload.
            ServerEvent::AudioResponse(_) | ServerEvent::Visual(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agora_types::Speaker;
    use agora_types::events::{
        ConnectionStatusEvent, ErrorEvent, SessionInitializedEvent, SessionStatusEvent,
        TranscriptEvent,
    };
    use chrono::TimeZone;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn transcript(speaker: Speaker, text: &str) -> Signal {
        Signal::Server(ServerEvent::Transcript(TranscriptEvent::new(speaker, text)))
    }

    fn connection(up: bool) -> Signal {
        Signal::Server(ServerEvent::ConnectionStatus(ConnectionStatusEvent::new(up)))
    }

    #[test]
    fn capture_send_transcript_trace() {
        let mut reducer = Reducer::new();
        let log = vec![
            Signal::CaptureStarted,
            Signal::CaptureStopped,
            Signal::InputSent,
            transcript(Speaker::Tutor, "Let's start with the cell."),
            transcript(Speaker::Student, "Okay."),
        ];

        let mut trace = vec![reducer.status()];
        for signal in &log {
            reducer.apply(signal, at());
            trace.push(reducer.status());
        }

        // Idle until capture starts, Listening through the stop, Thinking
        // once the input is on the wire, Idle from the first transcript on.
        assert_eq!(
            trace,
            vec![
                ConversationalStatus::Idle,
                ConversationalStatus::Listening,
                ConversationalStatus::Listening,
                ConversationalStatus::Thinking,
                ConversationalStatus::Idle,
                ConversationalStatus::Idle,
            ]
        );
        assert_eq!(reducer.transcript().len(), 2);
    }

    #[test]
    fn replaying_a_log_is_deterministic() {
        let log = vec![
            (connection(true), at()),
            (
                Signal::Server(ServerEvent::SessionInitialized(
                    SessionInitializedEvent::new("s", "u"),
                )),
                at(),
            ),
            (Signal::InputSent, at()),
            (transcript(Speaker::Tutor, "Consider the chromosome."), at()),
            (Signal::PlaybackStarted, at()),
            (Signal::PlaybackFinished, at()),
            (transcript(Speaker::Student, "Go on."), at()),
        ];

        let mut first = Reducer::new();
        let mut second = Reducer::new();
        for (signal, ts) in &log {
            first.apply(signal, *ts);
        }
        for (signal, ts) in &log {
            second.apply(signal, *ts);
        }

        assert_eq!(first.transcript(), second.transcript());
        assert_eq!(first.status(), second.status());
        assert_eq!(first.readiness(), second.readiness());
    }

    #[test]
    fn text_turn_ends_idle_with_one_entry() {
        let mut reducer = Reducer::new();
        reducer.apply(&Signal::InputSent, at());
        reducer.apply(&transcript(Speaker::Tutor, "Let's start with..."), at());
        reducer.apply(
            &Signal::Server(ServerEvent::SessionStatus(SessionStatusEvent::with_status(
                "complete",
            ))),
            at(),
        );

        assert_eq!(reducer.status(), ConversationalStatus::Idle);
        assert_eq!(reducer.transcript().len(), 1);
        assert_eq!(reducer.transcript()[0].text(), "Let's start with...");
    }

    #[test]
    fn non_terminal_status_events_do_not_change_the_status() {
        let mut reducer = Reducer::new();
        reducer.apply(&Signal::InputSent, at());
        reducer.apply(
            &Signal::Server(ServerEvent::SessionStatus(SessionStatusEvent::with_status(
                "transcribing",
            ))),
            at(),
        );
        assert_eq!(reducer.status(), ConversationalStatus::Thinking);
    }

    #[test]
    fn disconnect_never_leaves_the_ui_thinking() {
        let mut reducer = Reducer::new();
        reducer.apply(&connection(true), at());
        reducer.apply(&Signal::InputSent, at());
        assert_eq!(reducer.status(), ConversationalStatus::Thinking);

        reducer.apply(&connection(false), at());
        assert_eq!(reducer.status(), ConversationalStatus::Idle);
        assert_eq!(reducer.readiness(), Readiness::Reconnecting);
    }

    #[test]
    fn exhausted_reconnects_mark_the_session_failed() {
        let mut reducer = Reducer::new();
        reducer.apply(&connection(true), at());
        reducer.apply(&connection(false), at());
        reducer.apply(
            &Signal::Server(ServerEvent::Error(ErrorEvent::transport(
                "reconnection attempts exhausted",
            ))),
            at(),
        );
        assert_eq!(reducer.readiness(), Readiness::Failed);
    }

    #[test]
    fn duplicate_transcripts_produce_duplicate_entries() {
        // Known-open weak point: no deduplication on network redelivery.
        let mut reducer = Reducer::new();
        reducer.apply(&transcript(Speaker::Tutor, "Mitosis has phases."), at());
        reducer.apply(&transcript(Speaker::Tutor, "Mitosis has phases."), at());
        assert_eq!(reducer.transcript().len(), 2);
        assert_ne!(reducer.transcript()[0].id(), reducer.transcript()[1].id());
    }

    #[test]
    fn reset_clears_transcript_and_status() {
        let mut reducer = Reducer::new();
        reducer.apply(&Signal::CaptureStarted, at());
        reducer.apply(&transcript(Speaker::Student, "hello"), at());
        reducer.reset();
        assert!(reducer.transcript().is_empty());
        assert_eq!(reducer.status(), ConversationalStatus::Idle);
    }
}
