/// Latest elapsed-time value reported by the server.
///
/// Nothing here counts on its own; the display only moves when a new
/// `TIMER_UPDATE` arrives.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimerTracker {
    elapsed: Option<u64>,
}

impl TimerTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the stored value.
    pub fn update(&mut self, elapsed_secs: u64) {
        self.elapsed = Some(elapsed_secs);
    }

    /// Seconds from the last update, if any has arrived.
    pub fn elapsed(&self) -> Option<u64> {
        self.elapsed
    }

    /// `m:ss` for the last update, `0:00` before the first one.
    pub fn display(&self) -> String {
        format_elapsed(self.elapsed.unwrap_or(0))
    }

    pub fn clear(&mut self) {
        self.elapsed = None;
    }
}

/// Format seconds as minutes and zero-padded seconds.
pub fn format_elapsed(secs: u64) -> String {
    format!("{}:{:02}", secs / 60, secs % 60)
}
