/// A repeating deadline: the handle for a periodic timer.
///
/// Owners poll it with the current time; dropping it (or replacing the
/// owning `Option` with `None`) cancels the timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    period_ms: i64,
    next_due: i64,
}

impl Interval {
    /// First tick one period after `now`
    pub fn starting_at(now_ms: i64, period_ms: i64) -> Self {
        let period_ms = period_ms.max(1);
        Interval {
            period_ms,
            next_due: now_ms + period_ms,
        }
    }

    pub fn period_ms(&self) -> i64 {
        self.period_ms
    }

    pub fn next_due(&self) -> i64 {
        self.next_due
    }

    /// Number of periods that elapsed up to `now`; advances the deadline past `now`
    pub fn ticks(&mut self, now_ms: i64) -> u32 {
        if now_ms < self.next_due {
            return 0;
        }
        let elapsed = (now_ms - self.next_due) / self.period_ms + 1;
        self.next_due += elapsed * self.period_ms;
        u32::try_from(elapsed).unwrap_or(u32::MAX)
    }

    /// True once when at least one period elapsed. Missed periods are not replayed.
    pub fn fire(&mut self, now_ms: i64) -> bool {
        self.ticks(now_ms) > 0
    }
}
