use crate::alarm::interval::Interval;

pub const FLASH_PERIOD_MS: i64 = 500;
pub const VIBRATION_PERIOD_MS: i64 = 1_000;
pub const BLINK_PERIOD_MS: i64 = 1_000;
pub const ATTENTION_TITLE: &str = "⏰ ATTENTION!!!";

/// Content of the alarm overlay
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Overlay {
    pub title: String,
    pub message: String,
    /// Local `HH:MM` the alarm fired at
    pub time: String,
    pub snooze_minutes: u32,
}

/// Where the visual alarm is drawn. Implementations swallow their own I/O errors.
pub trait Surface {
    fn show_overlay(&mut self, overlay: &Overlay);
    fn hide_overlay(&mut self);
    fn set_flash(&mut self, on: bool);
    fn vibrate(&mut self);
    fn set_title(&mut self, title: &str);
    /// The "enable sound" affordance shown while audio is blocked
    fn set_sound_prompt(&mut self, visible: bool);
}

pub fn alarm_title(title: &str) -> String {
    format!("🚨 ALARM: {}", title)
}

/// Overlay plus the flash, vibration and title blink timers
pub struct VisualChannel {
    surface: Box<dyn Surface>,
    original_title: String,
    blink_ms: i64,
    overlay_visible: bool,
    prompt_visible: bool,
    flash: Option<Interval>,
    flash_on: bool,
    vibration: Option<Interval>,
    blink: Option<Interval>,
    blink_until: i64,
    blink_alt: bool,
    alarm_title: String,
    title_changed: bool,
}

impl VisualChannel {
    pub fn new(
        surface: Box<dyn Surface>,
        original_title: impl Into<String>,
        blink_secs: u64,
    ) -> Self {
        VisualChannel {
            surface,
            original_title: original_title.into(),
            blink_ms: i64::try_from(blink_secs.saturating_mul(1_000)).unwrap_or(i64::MAX),
            overlay_visible: false,
            prompt_visible: false,
            flash: None,
            flash_on: false,
            vibration: None,
            blink: None,
            blink_until: 0,
            blink_alt: false,
            alarm_title: String::new(),
            title_changed: false,
        }
    }

    pub fn overlay_visible(&self) -> bool {
        self.overlay_visible
    }

    pub fn prompt_visible(&self) -> bool {
        self.prompt_visible
    }

    pub fn is_blinking(&self) -> bool {
        self.blink.is_some()
    }

    pub fn is_flashing(&self) -> bool {
        self.flash.is_some()
    }

    /// Show the overlay and start the attention timers. A newer alarm
    /// replaces the overlay of an older one.
    pub fn show(&mut self, now_ms: i64, overlay: &Overlay) {
        self.surface.show_overlay(overlay);
        self.overlay_visible = true;

        self.flash = Some(Interval::starting_at(now_ms, FLASH_PERIOD_MS));
        self.flash_on = true;
        self.surface.set_flash(true);

        self.surface.vibrate();
        self.vibration = Some(Interval::starting_at(now_ms, VIBRATION_PERIOD_MS));

        self.alarm_title = alarm_title(&overlay.title);
        self.blink = Some(Interval::starting_at(now_ms, BLINK_PERIOD_MS));
        self.blink_until = now_ms.saturating_add(self.blink_ms);
        self.blink_alt = false;
        self.surface.set_title(&self.alarm_title);
        self.title_changed = true;
    }

    pub fn set_sound_prompt(&mut self, visible: bool) {
        if self.prompt_visible != visible {
            self.surface.set_sound_prompt(visible);
            self.prompt_visible = visible;
        }
    }

    pub fn advance(&mut self, now_ms: i64) {
        if let Some(flash) = self.flash.as_mut() {
            if flash.ticks(now_ms) % 2 == 1 {
                self.flash_on = !self.flash_on;
                self.surface.set_flash(self.flash_on);
            }
        }
        if let Some(vibration) = self.vibration.as_mut() {
            if vibration.fire(now_ms) {
                self.surface.vibrate();
            }
        }
        if self.blink.is_some() && now_ms >= self.blink_until {
            self.blink = None;
            self.restore_title();
        } else if let Some(blink) = self.blink.as_mut() {
            if blink.ticks(now_ms) % 2 == 1 {
                self.blink_alt = !self.blink_alt;
                let title = if self.blink_alt {
                    ATTENTION_TITLE
                } else {
                    self.alarm_title.as_str()
                };
                self.surface.set_title(title);
            }
        }
    }

    pub fn next_deadline(&self) -> Option<i64> {
        let blink_end = self.blink.map(|_| self.blink_until);
        [
            self.flash.map(|i| i.next_due()),
            self.vibration.map(|i| i.next_due()),
            self.blink.map(|i| i.next_due()),
            blink_end,
        ]
        .into_iter()
        .flatten()
        .min()
    }

    /// Clear every timer and undo every visible change
    pub fn stop(&mut self) {
        self.flash = None;
        self.vibration = None;
        self.blink = None;
        if self.flash_on {
            self.surface.set_flash(false);
            self.flash_on = false;
        }
        if self.overlay_visible {
            self.surface.hide_overlay();
            self.overlay_visible = false;
        }
        self.set_sound_prompt(false);
        self.restore_title();
    }

    fn restore_title(&mut self) {
        if self.title_changed {
            self.surface.set_title(&self.original_title);
            self.title_changed = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{RecordingSurface, SurfaceEvent};

    fn overlay() -> Overlay {
        Overlay {
            title: "Standup".into(),
            message: "Task reminder!".into(),
            time: "09:00".into(),
            snooze_minutes: 5,
        }
    }

    fn channel(surface: &RecordingSurface) -> VisualChannel {
        VisualChannel::new(Box::new(surface.clone()), "TaskFlow", 30)
    }

    #[test]
    fn show_starts_every_attention_timer() {
        let surface = RecordingSurface::default();
        let mut visual = channel(&surface);
        visual.show(0, &overlay());
        assert!(visual.overlay_visible());
        assert!(visual.is_flashing());
        assert!(visual.is_blinking());
        assert_eq!(visual.next_deadline(), Some(FLASH_PERIOD_MS));
        assert_eq!(surface.last_title().as_deref(), Some("🚨 ALARM: Standup"));
        assert_eq!(surface.count(|e| matches!(e, SurfaceEvent::Vibrate)), 1);
    }

    #[test]
    fn title_alternates_then_restores() {
        let surface = RecordingSurface::default();
        let mut visual = channel(&surface);
        visual.show(0, &overlay());

        visual.advance(1_000);
        assert_eq!(surface.last_title().as_deref(), Some(ATTENTION_TITLE));
        visual.advance(2_000);
        assert_eq!(surface.last_title().as_deref(), Some("🚨 ALARM: Standup"));

        visual.advance(30_000);
        assert!(!visual.is_blinking());
        assert_eq!(surface.last_title().as_deref(), Some("TaskFlow"));
        // Flash and vibration keep going until stopped
        assert!(visual.is_flashing());
    }

    #[test]
    fn vibration_repeats_every_second() {
        let surface = RecordingSurface::default();
        let mut visual = channel(&surface);
        visual.show(0, &overlay());
        for t in 1..=3 {
            visual.advance(t * 1_000);
        }
        assert_eq!(surface.count(|e| matches!(e, SurfaceEvent::Vibrate)), 4);
    }

    #[test]
    fn stop_is_total_and_idempotent() {
        let surface = RecordingSurface::default();
        let mut visual = channel(&surface);
        visual.show(0, &overlay());
        visual.set_sound_prompt(true);
        visual.advance(500);

        visual.stop();
        assert!(!visual.overlay_visible());
        assert!(!visual.prompt_visible());
        assert!(!visual.is_flashing());
        assert!(!visual.is_blinking());
        assert_eq!(visual.next_deadline(), None);
        assert_eq!(surface.last_title().as_deref(), Some("TaskFlow"));

        let events = surface.events().len();
        visual.stop();
        assert_eq!(surface.events().len(), events);
    }
}
