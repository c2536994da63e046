//! Scales the render loop's poll timeout to how long the terminal has
//! been idle: bursts of input get a responsive 60fps, a motionless
//! terminal backs off to 1fps so tfm doesn't spin a CPU core for nothing.

use std::time::Duration;

/// `(idle_threshold, fps, poll_timeout_ms)`, ordered by ascending idle
/// threshold. The table is monotone non-increasing in fps/timeout as
/// idle time grows -- see the `monotone` test.
const TABLE: &[(Duration, u32, u64)] = &[
    (Duration::from_millis(0), 60, 16),
    (Duration::from_millis(500), 30, 33),
    (Duration::from_secs(2), 15, 66),
    (Duration::from_secs(5), 5, 200),
    (Duration::from_secs(10), 1, 1000),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FpsSetting {
    pub fps: u32,
    pub poll_timeout: Duration,
}

/// Looks up the setting for the given idle duration: the last table row
/// whose threshold is `<= idle`.
pub fn setting_for_idle(idle: Duration) -> FpsSetting {
    let mut chosen = TABLE[0];
    for &(threshold, fps, timeout_ms) in TABLE {
        if idle >= threshold {
            chosen = (threshold, fps, timeout_ms);
        } else {
            break;
        }
    }
    FpsSetting { fps: chosen.1, poll_timeout: Duration::from_millis(chosen.2) }
}

/// Tracks the last-activity instant and exposes the fps setting for
/// "now". `touch()` resets the idle clock on any input event.
pub struct AdaptiveScheduler {
    last_activity: std::time::Instant,
}

impl Default for AdaptiveScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl AdaptiveScheduler {
    pub fn new() -> Self {
        Self { last_activity: std::time::Instant::now() }
    }

    pub fn touch(&mut self) {
        self.last_activity = std::time::Instant::now();
    }

    pub fn current_setting(&self) -> FpsSetting {
        setting_for_idle(self.last_activity.elapsed())
    }
}
