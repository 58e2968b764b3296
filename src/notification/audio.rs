use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use rodio::{Decoder, OutputStream, OutputStreamBuilder, Sink, Source};
use tracing::{debug, info, warn};

use crate::alarm::interval::Interval;

/// Error type for starting alarm playback
#[derive(Debug, thiserror::Error)]
pub enum PlaybackError {
    #[error("no audio output available: {0}")]
    NoDevice(String),
    #[error("could not open sound {path}: {source}")]
    SourceError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not decode sound {path}: {message}")]
    DecodeError { path: PathBuf, message: String },
    #[error("playback refused")]
    Refused,
}

/// Something that can loop the alarm sound
pub trait AudioOutput {
    /// Start (or restart) the looping sound from the beginning
    fn play(&mut self) -> Result<(), PlaybackError>;
    fn set_volume(&mut self, volume: f32);
    /// Pause and rewind
    fn stop(&mut self);
    /// Whether the sound source can be found at all
    fn source_available(&self) -> bool {
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioState {
    Idle,
    Fading,
    Full,
    Stopped,
    /// Playback was refused; waiting for `retry`
    Blocked,
}

/// Looping alarm sound with a linear fade-in
pub struct AudioChannel {
    output: Box<dyn AudioOutput>,
    state: AudioState,
    volume: f32,
    step: f32,
    steps_to_full: u32,
    steps_done: u32,
    fade_interval_ms: i64,
    fade: Option<Interval>,
}

impl AudioChannel {
    pub fn new(output: Box<dyn AudioOutput>, step: f32, fade_interval_ms: u64) -> Self {
        let step = if step > 0.0 && step.is_finite() {
            step.min(1.0)
        } else {
            1.0
        };
        // Float noise must not add a step: 0.02 reaches full volume after 50
        let steps_to_full = ((1.0 / f64::from(step)) - 1e-4).ceil().max(1.0) as u32;
        AudioChannel {
            output,
            state: AudioState::Idle,
            volume: 1.0,
            step,
            steps_to_full,
            steps_done: 0,
            fade_interval_ms: i64::try_from(fade_interval_ms).unwrap_or(i64::MAX),
            fade: None,
        }
    }

    pub fn state(&self) -> AudioState {
        self.state
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn source_available(&self) -> bool {
        self.output.source_available()
    }

    /// Time from silence to full volume
    pub fn ramp_ms(&self) -> i64 {
        i64::from(self.steps_to_full) * self.fade_interval_ms
    }

    pub fn next_deadline(&self) -> Option<i64> {
        self.fade.as_ref().map(Interval::next_due)
    }

    /// Start playback at volume 0 and begin the fade. Returns false when the
    /// output refuses, leaving the channel `Blocked`.
    pub fn start(&mut self, now_ms: i64) -> bool {
        self.fade = None;
        self.steps_done = 0;
        self.volume = 0.0;
        self.output.set_volume(0.0);
        match self.output.play() {
            Ok(()) => {
                self.state = AudioState::Fading;
                self.fade = Some(Interval::starting_at(now_ms, self.fade_interval_ms));
                debug!(ramp_ms = self.ramp_ms(), "alarm sound started");
                true
            }
            Err(e) => {
                warn!(error = %e, "alarm sound blocked");
                self.state = AudioState::Blocked;
                false
            }
        }
    }

    /// Retry after a refusal; the fade restarts from silence
    pub fn retry(&mut self, now_ms: i64) -> bool {
        self.start(now_ms)
    }

    /// Apply every fade step that came due
    pub fn advance(&mut self, now_ms: i64) {
        let Some(fade) = self.fade.as_mut() else {
            return;
        };
        let ticks = fade.ticks(now_ms);
        if ticks == 0 {
            return;
        }
        self.steps_done = self.steps_done.saturating_add(ticks);
        if self.steps_done >= self.steps_to_full {
            self.volume = 1.0;
            self.state = AudioState::Full;
            self.fade = None;
            info!("alarm sound at full volume");
        } else {
            self.volume = (self.steps_done as f32 * self.step).min(1.0);
        }
        self.output.set_volume(self.volume);
    }

    /// Silence and rewind; volume is reset to 1.0 for the next play
    pub fn stop(&mut self) {
        self.fade = None;
        self.steps_done = 0;
        self.output.stop();
        self.volume = 1.0;
        self.output.set_volume(1.0);
        self.state = AudioState::Stopped;
    }
}

/// Sound output through the default audio device
pub struct RodioOutput {
    path: PathBuf,
    stream: Option<OutputStream>,
    sink: Option<Sink>,
    volume: f32,
}

impl RodioOutput {
    /// The device is opened lazily on first play
    pub fn new(path: impl Into<PathBuf>) -> Self {
        RodioOutput {
            path: path.into(),
            stream: None,
            sink: None,
            volume: 1.0,
        }
    }

    fn open_stream(&mut self) -> Result<&OutputStream, PlaybackError> {
        if self.stream.is_none() {
            let mut stream = OutputStreamBuilder::open_default_stream()
                .map_err(|e| PlaybackError::NoDevice(e.to_string()))?;
            stream.log_on_drop(false);
            self.stream = Some(stream);
        }
        self.stream
            .as_ref()
            .ok_or_else(|| PlaybackError::NoDevice("stream closed".into()))
    }
}

impl AudioOutput for RodioOutput {
    fn play(&mut self) -> Result<(), PlaybackError> {
        self.stop();
        let file = File::open(&self.path).map_err(|e| PlaybackError::SourceError {
            path: self.path.clone(),
            source: e,
        })?;
        let decoder =
            Decoder::new(BufReader::new(file)).map_err(|e| PlaybackError::DecodeError {
                path: self.path.clone(),
                message: e.to_string(),
            })?;
        let volume = self.volume;
        let stream = self.open_stream()?;
        let sink = Sink::connect_new(stream.mixer());
        sink.set_volume(volume);
        sink.append(decoder.repeat_infinite());
        sink.play();
        self.sink = Some(sink);
        Ok(())
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume;
        if let Some(sink) = &self.sink {
            sink.set_volume(volume);
        }
    }

    fn stop(&mut self) {
        // A fresh sink is built on the next play, which rewinds the loop
        if let Some(sink) = self.sink.take() {
            sink.stop();
        }
    }

    fn source_available(&self) -> bool {
        self.path.is_file()
    }
}
