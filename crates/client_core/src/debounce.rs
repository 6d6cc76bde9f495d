//! Text input whose committed value trails the raw value by a quiet period.

use crate::fanout::Epoch;

#[derive(Debug, Clone, Default)]
pub struct DebouncedInput {
    raw: String,
    committed: String,
    timer_epoch: Epoch,
}

impl DebouncedInput {
    /// Records a keystroke and returns the epoch the caller should arm a
    /// timer with. Only the timer carrying the latest epoch commits.
    pub fn input(&mut self, value: impl Into<String>) -> Epoch {
        self.raw = value.into();
        self.timer_epoch = self.timer_epoch.next();
        self.timer_epoch
    }

    /// Called when a timer fires. Commits and returns the raw value if the
    /// timer is current and the value changed since the last commit.
    pub fn elapsed(&mut self, epoch: Epoch) -> Option<&str> {
        if epoch != self.timer_epoch || self.raw == self.committed {
            return None;
        }
        self.committed.clone_from(&self.raw);
        Some(&self.committed)
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn committed(&self) -> &str {
        &self.committed
    }

    pub fn clear(&mut self) {
        self.raw.clear();
        self.committed.clear();
        self.timer_epoch = self.timer_epoch.next();
    }
}
