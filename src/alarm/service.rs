use std::sync::Arc;

use tracing::info;

use crate::alarm::clock::Clock;
use crate::alarm::scheduler::{AlarmScheduler, Fired};
use crate::io::store::Store;
use crate::model::alarm::Alarm;
use crate::model::config::AlarmConfig;
use crate::model::task::Task;
use crate::notification::{NotificationDispatcher, Permission};
use crate::util::time::format_local_hm;

/// The scheduler, the dispatcher and the store they share.
///
/// Owned by the daemon loop; nothing in here is global.
pub struct AlarmService {
    store: Box<dyn Store>,
    scheduler: AlarmScheduler,
    dispatcher: NotificationDispatcher,
    clock: Arc<dyn Clock>,
    snooze_minutes: u32,
    auto_minutes_before: u32,
}

impl AlarmService {
    pub fn new(
        store: Box<dyn Store>,
        clock: Arc<dyn Clock>,
        dispatcher: NotificationDispatcher,
        config: &AlarmConfig,
    ) -> Self {
        AlarmService {
            store,
            scheduler: AlarmScheduler::new(clock.clone(), config.poll_interval_ms),
            dispatcher,
            clock,
            snooze_minutes: config.snooze_minutes,
            auto_minutes_before: config.auto_minutes_before,
        }
    }

    /// Dispatcher first (sound check, permission), then the scheduler
    pub fn init(&mut self) {
        self.dispatcher.init(self.store.as_mut());
        self.scheduler.init(self.store.as_ref());
    }

    /// Run due channel timers, then poll for due alarms
    pub fn advance(&mut self) -> Vec<Fired> {
        self.dispatcher.advance();
        self.scheduler
            .tick(self.store.as_mut(), &mut self.dispatcher)
    }

    /// Earliest instant at which `advance` has work to do
    pub fn next_deadline(&self) -> Option<i64> {
        [
            self.scheduler.next_deadline(),
            self.dispatcher.next_deadline(),
        ]
        .into_iter()
        .flatten()
        .min()
    }

    pub fn stop_alarm(&mut self) {
        self.dispatcher.stop();
    }

    /// Silence the ringing alarm and ring again later. `None` uses the
    /// configured snooze length.
    pub fn snooze_alarm(&mut self, minutes: Option<u32>) -> Option<Alarm> {
        let minutes = minutes.unwrap_or(self.snooze_minutes);
        self.dispatcher.stop();
        let alarm = self.scheduler.snooze(self.store.as_mut(), minutes)?;
        if self.dispatcher.permission() == Permission::Granted {
            self.dispatcher.notify_desktop(
                "Snooze on",
                &format!(
                    "Alarm will ring again at {}",
                    format_local_hm(alarm.alarm_time)
                ),
            );
        }
        Some(alarm)
    }

    pub fn enable_sound(&mut self) -> bool {
        self.dispatcher.enable_sound()
    }

    pub fn schedule(
        &mut self,
        task_id: &str,
        alarm_time: i64,
        title: &str,
        message: &str,
    ) -> Option<Alarm> {
        self.scheduler
            .schedule(self.store.as_mut(), task_id, alarm_time, title, message)
    }

    pub fn schedule_auto(&mut self, task: &Task) -> Option<Alarm> {
        self.scheduler
            .schedule_auto(self.store.as_mut(), task, self.auto_minutes_before)
    }

    pub fn cancel(&mut self, alarm_id: &str) -> bool {
        self.scheduler.cancel(self.store.as_mut(), alarm_id)
    }

    pub fn cancel_all_for_task(&mut self, task_id: &str) -> bool {
        self.scheduler.cancel_all_for_task(self.store.as_mut(), task_id)
    }

    /// Re-read the store after another process changed it
    pub fn resync(&mut self) -> bool {
        self.scheduler.resync(self.store.as_mut())
    }

    pub fn shutdown(&mut self) {
        self.scheduler.shutdown();
        self.dispatcher.stop();
        info!("alarm service shut down");
    }

    pub fn now_ms(&self) -> i64 {
        self.clock.now_ms()
    }

    pub fn active(&self) -> &[Alarm] {
        self.scheduler.active()
    }

    pub fn dispatcher(&self) -> &NotificationDispatcher {
        &self.dispatcher
    }

    pub fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }
}
