use super::{prefix_mode::Position, timing_config::DEFAULT_PRECISION};
use crate::{SharedString, helper};
use std::{
    borrow::Cow,
    fmt,
    time::{Duration, Instant},
};

/// A metric of the performance timing.
#[derive(Debug, Clone)]
pub struct TimingMetric {
    /// Metric name.
    name: SharedString,
    /// Optional description.
    description: Option<SharedString>,
    /// Timing duration. A zero value means that it does not exist.
    duration: Duration,
    /// Start time of a running timer.
    start_time: Option<Instant>,
}

impl TimingMetric {
    /// Creates a new instance. An empty description is treated as absent.
    #[inline]
    pub fn new(
        name: SharedString,
        description: Option<SharedString>,
        duration: Option<Duration>,
    ) -> Self {
        Self {
            name,
            description: description.filter(|s| !s.is_empty()),
            duration: duration.unwrap_or_default(),
            start_time: None,
        }
    }

    /// Creates a new instance with a timer started now.
    #[inline]
    pub fn started(name: SharedString, description: Option<SharedString>) -> Self {
        let mut metric = Self::new(name, description, None);
        metric.start_time = Some(Instant::now());
        metric
    }

    /// Returns the name.
    #[inline]
    pub fn name(&self) -> &str {
        self.name.as_ref()
    }

    /// Returns the description.
    #[inline]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns the timing duration.
    #[inline]
    pub fn duration(&self) -> Option<Duration> {
        let duration = self.duration;
        (duration > Duration::ZERO).then_some(duration)
    }

    /// Returns `true` if the timer has been started but not stopped.
    #[inline]
    pub fn is_running(&self) -> bool {
        self.start_time.is_some()
    }

    /// Stops the running timer and records the elapsed time as the duration.
    /// Returns `None` if the timer is not running.
    pub(crate) fn stop(&mut self) -> Option<Duration> {
        let start_time = self.start_time.take()?;
        let duration = start_time.elapsed();
        self.duration = duration;
        Some(duration)
    }

    /// Writes the metric as a `;`-separated list of the name, `desc` and `dur`.
    pub(crate) fn write_to(
        &self,
        f: &mut fmt::Formatter,
        position: Position,
        precision: usize,
    ) -> fmt::Result {
        let name = self.name();
        if let Position::Index { index, width } = position {
            write!(f, "{index:0width$}_{name}")?;
        } else {
            f.write_str(name)?;
        }

        let description = match (position, self.description()) {
            (Position::Ordinal(ordinal), Some(description)) => {
                Some(Cow::Owned(format!("{ordinal}: {description}")))
            }
            (Position::Ordinal(ordinal), None) => Some(Cow::Owned(ordinal.to_string())),
            (_, description) => description.map(Cow::Borrowed),
        };
        if let Some(description) = description {
            let description = helper::quote_string(&description);
            write!(f, ";desc={description}")?;
        }

        if let Some(duration) = self.duration() {
            let duration_millis = duration.as_secs_f64() * 1000.0;
            write!(f, ";dur={duration_millis:.precision$}")?;
        }
        Ok(())
    }
}

impl fmt::Display for TimingMetric {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.write_to(f, Position::Unmarked, DEFAULT_PRECISION)
    }
}
