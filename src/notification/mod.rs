//! Alarm delivery: terminal overlay, looping sound and OS notifications.
//!
//! Each channel owns its own timers; the dispatcher advances them from the
//! daemon loop and tears all of them down on `stop`.

pub mod audio;
pub mod desktop;
pub mod terminal;
pub mod visual;

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::alarm::clock::Clock;
use crate::io::store::Store;
use crate::util::time::format_local_hm;

pub use audio::{AudioChannel, AudioOutput, AudioState, PlaybackError, RodioOutput};
pub use desktop::{
    DesktopBackend, DesktopChannel, DesktopNotification, NotifyError, NotifySendBackend,
    Permission,
};
pub use terminal::TerminalSurface;
pub use visual::{Overlay, Surface, VisualChannel};

/// Setting key caching whether OS notifications are allowed
pub const PERMISSION_SETTING: &str = "notificationPermission";

/// Receives fired alarms
pub trait Notifier {
    fn deliver(&mut self, title: &str, message: &str);
}

pub struct NotificationDispatcher {
    visual: VisualChannel,
    audio: AudioChannel,
    desktop: DesktopChannel,
    clock: Arc<dyn Clock>,
    snooze_minutes: u32,
    ringing: bool,
}

impl NotificationDispatcher {
    pub fn new(
        visual: VisualChannel,
        audio: AudioChannel,
        desktop: DesktopChannel,
        clock: Arc<dyn Clock>,
        snooze_minutes: u32,
    ) -> Self {
        NotificationDispatcher {
            visual,
            audio,
            desktop,
            clock,
            snooze_minutes,
            ringing: false,
        }
    }

    /// Check the sound source and settle the notification permission
    pub fn init(&mut self, store: &mut dyn Store) -> Permission {
        if !self.audio.source_available() {
            warn!("alarm sound not found; alarms will be silent");
        }
        let (permission, fresh_grant) = self.desktop.ensure_permission();
        let granted = permission == Permission::Granted;
        if let Err(e) = store.save_setting(PERMISSION_SETTING, granted.into()) {
            warn!(error = %e, "could not save notification permission");
        }
        if fresh_grant {
            self.desktop
                .notify("Notifications enabled", "You will be notified when alarms go off.");
        }
        debug!(permission = permission.as_str(), "notification dispatcher ready");
        permission
    }

    pub fn is_ringing(&self) -> bool {
        self.ringing
    }

    pub fn audio_state(&self) -> AudioState {
        self.audio.state()
    }

    pub fn volume(&self) -> f32 {
        self.audio.volume()
    }

    pub fn ramp_ms(&self) -> i64 {
        self.audio.ramp_ms()
    }

    pub fn permission(&self) -> Permission {
        self.desktop.permission()
    }

    pub fn visual(&self) -> &VisualChannel {
        &self.visual
    }

    /// Send a plain OS notification if permission allows
    pub fn notify_desktop(&mut self, title: &str, body: &str) -> bool {
        self.desktop.notify(title, body)
    }

    /// Service every running channel timer
    pub fn advance(&mut self) {
        let now = self.clock.now_ms();
        self.audio.advance(now);
        self.visual.advance(now);
    }

    pub fn next_deadline(&self) -> Option<i64> {
        [self.audio.next_deadline(), self.visual.next_deadline()]
            .into_iter()
            .flatten()
            .min()
    }

    /// Silence everything. Safe to call at any time, any number of times.
    pub fn stop(&mut self) {
        self.audio.stop();
        self.visual.stop();
        if self.ringing {
            info!("alarm stopped");
        }
        self.ringing = false;
    }

    /// Retry blocked playback after user interaction. The fade restarts.
    pub fn enable_sound(&mut self) -> bool {
        let now = self.clock.now_ms();
        let started = self.audio.retry(now);
        if started {
            self.visual.set_sound_prompt(false);
            info!("alarm sound enabled");
        }
        started
    }
}

impl Notifier for NotificationDispatcher {
    fn deliver(&mut self, title: &str, message: &str) {
        let now = self.clock.now_ms();
        self.ringing = true;

        self.visual.show(
            now,
            &Overlay {
                title: title.to_string(),
                message: message.to_string(),
                time: format_local_hm(now),
                snooze_minutes: self.snooze_minutes,
            },
        );

        if self.audio.start(now) {
            self.visual.set_sound_prompt(false);
        } else {
            self.visual.set_sound_prompt(true);
        }

        self.desktop.notify(title, message);
    }
}
