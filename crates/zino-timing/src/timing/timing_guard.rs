use super::ServerTiming;
use crate::SharedString;
use std::time::Duration;

/// A guard which stops the timer of a metric when it is dropped.
///
/// The timer is looked up by name, so the same rules as [`ServerTiming::stop`] apply.
#[derive(Debug)]
#[must_use = "the timer is stopped as soon as the guard is dropped"]
pub struct TimingGuard<'a> {
    /// Server timing the metric belongs to.
    timing: &'a ServerTiming,
    /// Metric name.
    name: SharedString,
    /// A flag to indicate whether the timer has been stopped.
    stopped: bool,
}

impl<'a> TimingGuard<'a> {
    /// Creates a new instance.
    #[inline]
    pub(crate) fn new(timing: &'a ServerTiming, name: SharedString) -> Self {
        Self {
            timing,
            name,
            stopped: false,
        }
    }

    /// Returns the metric name.
    #[inline]
    pub fn name(&self) -> &str {
        self.name.as_ref()
    }

    /// Stops the timer and returns the measured duration.
    pub fn stop(mut self) -> Option<Duration> {
        self.stopped = true;
        self.timing.stop(&self.name)
    }
}

impl Drop for TimingGuard<'_> {
    fn drop(&mut self) {
        if !self.stopped {
            self.timing.stop(&self.name);
        }
    }
}
