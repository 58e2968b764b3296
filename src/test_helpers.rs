//! Fakes shared by unit tests

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use crate::alarm::clock::ManualClock;
use crate::io::database::Database;
use crate::io::store::{MemoryStore, Store, StoreError};
use crate::notification::{
    AudioChannel, AudioOutput, DesktopBackend, DesktopChannel, DesktopNotification,
    NotificationDispatcher, Notifier, NotifyError, Overlay, Permission, PlaybackError, Surface,
    VisualChannel,
};

// ---------------------------------------------------------------------------
// Audio
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct OutputState {
    refuse: bool,
    playing: bool,
    plays: u32,
    volumes: Vec<f32>,
}

/// Audio output that records volumes and can refuse playback
#[derive(Debug, Clone, Default)]
pub struct FakeOutput(Rc<RefCell<OutputState>>);

impl FakeOutput {
    pub fn refusing() -> Self {
        let output = FakeOutput::default();
        output.0.borrow_mut().refuse = true;
        output
    }

    pub fn allow(&self) {
        self.0.borrow_mut().refuse = false;
    }

    pub fn is_playing(&self) -> bool {
        self.0.borrow().playing
    }

    pub fn plays(&self) -> u32 {
        self.0.borrow().plays
    }

    pub fn volumes(&self) -> Vec<f32> {
        self.0.borrow().volumes.clone()
    }

    pub fn last_volume(&self) -> Option<f32> {
        self.0.borrow().volumes.last().copied()
    }
}

impl AudioOutput for FakeOutput {
    fn play(&mut self) -> Result<(), PlaybackError> {
        let mut state = self.0.borrow_mut();
        if state.refuse {
            return Err(PlaybackError::Refused);
        }
        state.playing = true;
        state.plays += 1;
        Ok(())
    }

    fn set_volume(&mut self, volume: f32) {
        self.0.borrow_mut().volumes.push(volume);
    }

    fn stop(&mut self) {
        self.0.borrow_mut().playing = false;
    }
}

// ---------------------------------------------------------------------------
// Visual
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceEvent {
    Show(Overlay),
    Hide,
    Flash(bool),
    Vibrate,
    Title(String),
    SoundPrompt(bool),
}

#[derive(Debug, Clone, Default)]
pub struct RecordingSurface(Rc<RefCell<Vec<SurfaceEvent>>>);

impl RecordingSurface {
    pub fn events(&self) -> Vec<SurfaceEvent> {
        self.0.borrow().clone()
    }

    pub fn count(&self, pred: impl Fn(&SurfaceEvent) -> bool) -> usize {
        self.0.borrow().iter().filter(|e| pred(e)).count()
    }

    pub fn last_title(&self) -> Option<String> {
        self.0.borrow().iter().rev().find_map(|e| match e {
            SurfaceEvent::Title(t) => Some(t.clone()),
            _ => None,
        })
    }
}

impl Surface for RecordingSurface {
    fn show_overlay(&mut self, overlay: &Overlay) {
        self.0.borrow_mut().push(SurfaceEvent::Show(overlay.clone()));
    }

    fn hide_overlay(&mut self) {
        self.0.borrow_mut().push(SurfaceEvent::Hide);
    }

    fn set_flash(&mut self, on: bool) {
        self.0.borrow_mut().push(SurfaceEvent::Flash(on));
    }

    fn vibrate(&mut self) {
        self.0.borrow_mut().push(SurfaceEvent::Vibrate);
    }

    fn set_title(&mut self, title: &str) {
        self.0.borrow_mut().push(SurfaceEvent::Title(title.to_string()));
    }

    fn set_sound_prompt(&mut self, visible: bool) {
        self.0.borrow_mut().push(SurfaceEvent::SoundPrompt(visible));
    }
}

// ---------------------------------------------------------------------------
// Desktop
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct BackendState {
    permission: Permission,
    on_request: Permission,
    requests: u32,
    sent: Vec<DesktopNotification>,
}

/// Notification backend with a scripted permission answer
#[derive(Debug, Clone)]
pub struct FakeBackend(Rc<RefCell<BackendState>>);

impl FakeBackend {
    pub fn new(permission: Permission, on_request: Permission) -> Self {
        FakeBackend(Rc::new(RefCell::new(BackendState {
            permission,
            on_request,
            requests: 0,
            sent: Vec::new(),
        })))
    }

    pub fn sent(&self) -> Vec<DesktopNotification> {
        self.0.borrow().sent.clone()
    }

    pub fn requests(&self) -> u32 {
        self.0.borrow().requests
    }
}

impl DesktopBackend for FakeBackend {
    fn permission(&self) -> Permission {
        self.0.borrow().permission
    }

    fn request_permission(&mut self) -> Permission {
        let mut state = self.0.borrow_mut();
        state.requests += 1;
        state.permission = state.on_request;
        state.permission
    }

    fn send(&mut self, notification: &DesktopNotification) -> Result<(), NotifyError> {
        self.0.borrow_mut().sent.push(notification.clone());
        Ok(())
    }
}

/// Dispatcher wired to fakes, with the 0.02 / 60 ms fade and "TaskFlow" title
pub fn dispatcher_with(
    clock: &Arc<ManualClock>,
    output: &FakeOutput,
    surface: &RecordingSurface,
    backend: &FakeBackend,
) -> NotificationDispatcher {
    NotificationDispatcher::new(
        VisualChannel::new(Box::new(surface.clone()), "TaskFlow", 30),
        AudioChannel::new(Box::new(output.clone()), 0.02, 60),
        DesktopChannel::new(Box::new(backend.clone()), "taskflow-alarm"),
        clock.clone(),
        5,
    )
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct RecordingNotifier {
    pub delivered: Vec<(String, String)>,
}

impl Notifier for RecordingNotifier {
    fn deliver(&mut self, title: &str, message: &str) {
        self.delivered.push((title.to_string(), message.to_string()));
    }
}

/// Memory store whose reads or writes can be switched to fail
#[derive(Debug, Default)]
pub struct FlakyStore {
    inner: MemoryStore,
    pub fail_reads: bool,
    pub fail_writes: bool,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Store for FlakyStore {
    fn snapshot(&self) -> Result<&Database, StoreError> {
        if self.fail_reads {
            return Err(StoreError::Unavailable("reads disabled".into()));
        }
        self.inner.snapshot()
    }

    fn apply(
        &mut self,
        change: &mut dyn FnMut(&mut Database) -> Result<(), StoreError>,
    ) -> Result<(), StoreError> {
        if self.fail_writes {
            return Err(StoreError::Unavailable("writes disabled".into()));
        }
        self.inner.apply(change)
    }
}
