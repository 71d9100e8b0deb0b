//! Question playback
//!
//! [`TextSpeaker`] renders utterances as text and reports completion after a
//! simulated reading time. It is the fallback when no voice is configured;
//! the spoken engine lives in `speech::vits`.

use crate::integration::config::SpeechConfig;
use crate::session::{EventSink, SessionEvent, Ticket};
use crate::{CoachError, Result};
use parking_lot::Mutex;
use std::io::Write;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::debug;

/// One playback request
#[derive(Clone, Debug, PartialEq)]
pub struct Utterance {
    pub text: String,
    /// Playback rate (1.0 = normal)
    pub rate: f32,
    /// BCP-47 language tag
    pub language: String,
}

impl Utterance {
    pub fn new(text: impl Into<String>, config: &SpeechConfig) -> Self {
        Self {
            text: normalize_whitespace(&text.into()),
            rate: config.rate,
            language: config.language.clone(),
        }
    }
}

/// A text-to-speech capability.
///
/// `speak` must return quickly; completion is reported later with
/// [`SessionEvent::UtteranceFinished`] or [`SessionEvent::UtteranceFailed`]
/// carrying the same ticket. Callers never issue a second utterance before
/// the first one has reported.
pub trait SpeechOutput: Send {
    fn speak(&mut self, utterance: Ticket, request: Utterance, sink: &EventSink) -> Result<()>;
}

impl<T: SpeechOutput + ?Sized> SpeechOutput for Box<T> {
    fn speak(&mut self, utterance: Ticket, request: Utterance, sink: &EventSink) -> Result<()> {
        (**self).speak(utterance, request, sink)
    }
}

/// Writes each utterance to a text sink and reports completion after the
/// simulated reading time
pub struct TextSpeaker<W: Write + Send + 'static> {
    out: Arc<Mutex<W>>,
    pace_ms_per_char: u64,
}

impl<W: Write + Send + 'static> TextSpeaker<W> {
    pub fn new(out: W, pace_ms_per_char: u64) -> Self {
        Self::shared(Arc::new(Mutex::new(out)), pace_ms_per_char)
    }

    /// Speak into a writer the front end also prints to
    pub fn shared(out: Arc<Mutex<W>>, pace_ms_per_char: u64) -> Self {
        Self {
            out,
            pace_ms_per_char,
        }
    }

    /// Shared handle to the underlying writer
    pub fn writer(&self) -> Arc<Mutex<W>> {
        Arc::clone(&self.out)
    }
}

impl<W: Write + Send + 'static> SpeechOutput for TextSpeaker<W> {
    fn speak(&mut self, utterance: Ticket, request: Utterance, sink: &EventSink) -> Result<()> {
        {
            let mut out = self.out.lock();
            writeln!(out, "🔊 {}", request.text)
                .and_then(|_| out.flush())
                .map_err(|e| CoachError::SynthesisError(e.to_string()))?;
        }

        let duration = reading_time(&request.text, request.rate, self.pace_ms_per_char);
        debug!("Utterance {} reads for {:?}", utterance, duration);

        if duration.is_zero() {
            sink.emit(SessionEvent::UtteranceFinished { utterance });
        } else {
            let sink = sink.clone();
            thread::spawn(move || {
                thread::sleep(duration);
                sink.emit(SessionEvent::UtteranceFinished { utterance });
            });
        }
        Ok(())
    }
}

/// Simulated playback time for `text` at `rate`
pub fn reading_time(text: &str, rate: f32, pace_ms_per_char: u64) -> Duration {
    if pace_ms_per_char == 0 || rate <= 0.0 {
        return Duration::ZERO;
    }
    let chars = text.chars().filter(|c| !c.is_whitespace()).count() as f64;
    Duration::from_millis((chars * pace_ms_per_char as f64 / rate as f64).round() as u64)
}

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;

    #[test]
    fn test_reading_time_scales_with_rate() {
        let normal = reading_time("abcd", 1.0, 100);
        let fast = reading_time("abcd", 2.0, 100);
        assert_eq!(normal, Duration::from_millis(400));
        assert_eq!(fast, Duration::from_millis(200));
        assert_eq!(reading_time("abcd", 1.0, 0), Duration::ZERO);
    }

    #[test]
    fn test_utterance_normalizes_whitespace() {
        let utterance = Utterance::new("  Tell me\n about   yourself ", &SpeechConfig::default());
        assert_eq!(utterance.text, "Tell me about yourself");
        assert_eq!(utterance.language, "ja-JP");
    }

    #[test]
    fn test_text_speaker_reports_completion() {
        let (tx, rx) = unbounded();
        let sink = EventSink::new(tx);
        let mut speaker = TextSpeaker::new(Vec::new(), 0);

        speaker
            .speak(4, Utterance::new("Why this role?", &SpeechConfig::default()), &sink)
            .unwrap();

        assert_eq!(
            rx.try_recv().unwrap(),
            SessionEvent::UtteranceFinished { utterance: 4 }
        );
        let written = String::from_utf8(speaker.writer().lock().clone()).unwrap();
        assert!(written.contains("Why this role?"));
    }

    #[test]
    fn test_boxed_speaker_shares_console() {
        let (tx, rx) = unbounded();
        let sink = EventSink::new(tx);
        let console = Arc::new(Mutex::new(Vec::new()));
        let mut speaker: Box<dyn SpeechOutput> =
            Box::new(TextSpeaker::shared(Arc::clone(&console), 0));

        speaker
            .speak(2, Utterance::new("Any questions for us?", &SpeechConfig::default()), &sink)
            .unwrap();

        assert_eq!(
            rx.try_recv().unwrap(),
            SessionEvent::UtteranceFinished { utterance: 2 }
        );
        let written = String::from_utf8(console.lock().clone()).unwrap();
        assert!(written.contains("Any questions for us?"));
    }

    #[test]
    fn test_text_speaker_delayed_completion() {
        let (tx, rx) = unbounded();
        let sink = EventSink::new(tx);
        let mut speaker = TextSpeaker::new(Vec::new(), 1);

        speaker
            .speak(9, Utterance::new("Hello", &SpeechConfig::default()), &sink)
            .unwrap();

        let event = rx.recv_timeout(Duration::from_secs(1)).unwrap();
        assert_eq!(event, SessionEvent::UtteranceFinished { utterance: 9 });
    }
}
