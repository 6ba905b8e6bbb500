use super::{PrefixMode, TimingConfig, TimingGuard, TimingMetric};
use crate::{SharedString, TomlTable, error::Error};
use http::header::{HeaderName, HeaderValue};
use parking_lot::Mutex;
use smallvec::SmallVec;
use std::{
    fmt,
    time::{Duration, Instant},
};

/// Name of the `server-timing` header.
pub const HEADER_NAME: HeaderName = HeaderName::from_static("server-timing");

/// Metrics and rendering settings guarded by the lock.
#[derive(Debug, Clone)]
struct TimingState {
    /// Server timing metrics in the registration order.
    metrics: SmallVec<[TimingMetric; 4]>,
    /// Ordering prefix mode.
    prefix_mode: PrefixMode,
    /// Number of fraction digits for the duration in milliseconds.
    precision: usize,
}

/// Performance metrics for the request-response cycle.
/// See [the spec](https://w3c.github.io/server-timing).
///
/// All the methods take `&self`, so an instance can be shared by the tasks
/// handling the same request. Metrics are rendered in the registration order.
///
/// A zero duration is not rendered, which means that a measurement of zero length
/// can not be told apart from a metric without any duration.
#[derive(Debug)]
pub struct ServerTiming {
    /// Shared state.
    state: Mutex<TimingState>,
}

impl ServerTiming {
    /// Creates a new instance.
    #[inline]
    pub fn new() -> Self {
        Self::with_config(&TimingConfig::default())
    }

    /// Creates a new instance with the settings.
    pub fn with_config(config: &TimingConfig) -> Self {
        let state = TimingState {
            metrics: SmallVec::new(),
            prefix_mode: config.prefix_mode(),
            precision: config.precision(),
        };
        Self {
            state: Mutex::new(state),
        }
    }

    /// Creates a new instance with the `[server-timing]` table of an application config.
    pub fn from_config(config: &TomlTable) -> Result<Self, Error> {
        let timing_config = TimingConfig::from_app_config(config)?;
        Ok(Self::with_config(&timing_config))
    }

    /// Enables the ordering prefix in the [`PrefixMode::Index`] mode.
    ///
    /// The prefix only affects the rendering, so the metrics recorded before
    /// the call are prefixed as well.
    #[inline]
    pub fn enable_prefix(self) -> Self {
        self.with_prefix_mode(PrefixMode::Index)
    }

    /// Sets the ordering prefix mode.
    #[inline]
    pub fn with_prefix_mode(mut self, prefix_mode: PrefixMode) -> Self {
        self.state.get_mut().prefix_mode = prefix_mode;
        self
    }

    /// Sets the ordering prefix mode of a shared instance.
    #[inline]
    pub fn set_prefix_mode(&self, prefix_mode: PrefixMode) {
        self.state.lock().prefix_mode = prefix_mode;
    }

    /// Returns the ordering prefix mode.
    #[inline]
    pub fn prefix_mode(&self) -> PrefixMode {
        self.state.lock().prefix_mode
    }

    /// Pushes an entry into the list of metrics.
    #[inline]
    pub fn push(&self, metric: TimingMetric) {
        self.state.lock().metrics.push(metric);
    }

    /// Records a metric entry with an optional description and an optional duration.
    pub fn record(
        &self,
        name: impl Into<SharedString>,
        description: Option<SharedString>,
        duration: Option<Duration>,
    ) {
        let metric = TimingMetric::new(name.into(), description, duration);
        self.push(metric);
    }

    /// Adds a metric without any duration. An empty description is omitted.
    #[inline]
    pub fn add_flag(&self, name: impl Into<SharedString>, description: impl Into<SharedString>) {
        self.record(name, Some(description.into()), None);
    }

    /// Adds a metric with a known duration.
    #[inline]
    pub fn add(
        &self,
        name: impl Into<SharedString>,
        description: impl Into<SharedString>,
        duration: Duration,
    ) {
        self.record(name, Some(description.into()), Some(duration));
    }

    /// Adds a metric and starts its timer.
    /// Existing metrics with the same name are not checked.
    pub fn start(&self, name: impl Into<SharedString>, description: impl Into<SharedString>) {
        let name = name.into();
        tracing::trace!(metric_name = %name, "start the server timing metric");
        self.push(TimingMetric::started(name, Some(description.into())));
    }

    /// Stops the timer of the first metric with the name, and records the elapsed time
    /// as its duration.
    ///
    /// It is a no-op returning `None` if there is no such metric, or the first one
    /// is not running. Later metrics with the same name are never considered.
    pub fn stop(&self, name: &str) -> Option<Duration> {
        let mut state = self.state.lock();
        let Some(metric) = state.metrics.iter_mut().find(|metric| metric.name() == name) else {
            drop(state);
            tracing::debug!(metric_name = name, "no server timing metric to stop");
            return None;
        };
        let duration = metric.stop();
        drop(state);
        if duration.is_none() {
            tracing::debug!(metric_name = name, "server timing metric is not running");
        }
        duration
    }

    /// Adds a metric and starts its timer, returning a guard which stops it on drop.
    pub fn start_guard(
        &self,
        name: impl Into<SharedString>,
        description: impl Into<SharedString>,
    ) -> TimingGuard<'_> {
        let name = name.into();
        self.start(name.clone(), description);
        TimingGuard::new(self, name)
    }

    /// Records the `total` metric as the time elapsed since `start_time`.
    #[inline]
    pub fn record_total(&self, start_time: Instant) {
        self.record("total", None, Some(start_time.elapsed()));
    }

    /// Returns the number of metrics.
    #[inline]
    pub fn len(&self) -> usize {
        self.state.lock().metrics.len()
    }

    /// Returns `true` if there are no metrics.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.state.lock().metrics.is_empty()
    }

    /// Returns a snapshot of the metrics in the registration order.
    pub fn metrics(&self) -> Vec<TimingMetric> {
        self.state.lock().metrics.to_vec()
    }

    /// Removes all the metrics. The settings are kept.
    #[inline]
    pub fn clear(&self) {
        self.state.lock().metrics.clear();
    }

    /// Renders the metrics as a value of the `server-timing` header.
    pub fn header_value(&self) -> Result<HeaderValue, Error> {
        HeaderValue::try_from(self.to_string()).map_err(|err| {
            tracing::warn!("fail to render the server timing metrics as a header value");
            Error::with_source("invalid `server-timing` header value", err)
        })
    }
}

impl Default for ServerTiming {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for ServerTiming {
    fn clone(&self) -> Self {
        Self {
            state: Mutex::new(self.state.lock().clone()),
        }
    }
}

impl fmt::Display for ServerTiming {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let state = self.state.lock();
        let count = state.metrics.len();
        for (index, metric) in state.metrics.iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            let position = state.prefix_mode.position(index, count);
            metric.write_to(f, position, state.precision)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{HEADER_NAME, ServerTiming};
    use crate::{PrefixMode, TimingConfig, TimingMetric, TomlTable};
    use std::{
        sync::Arc,
        thread,
        time::{Duration, Instant},
    };

    #[test]
    fn it_formats_server_timing() {
        let timing = ServerTiming::new();
        assert!(timing.is_empty());
        assert_eq!(timing.to_string(), "");

        timing.add_flag("missedCache", "");
        assert_eq!(timing.to_string(), "missedCache");

        let timing = ServerTiming::new();
        timing.add_flag("missedCache", "Cache missed");
        assert_eq!(timing.to_string(), r#"missedCache;desc="Cache missed""#);

        let timing = ServerTiming::new();
        timing.add_flag("missedCache", r#"Cache missed: "3""#);
        assert_eq!(timing.to_string(), r#"missedCache;desc="Cache missed: \"3\"""#);

        let timing = ServerTiming::new();
        timing.add_flag("missedCache", "");
        timing.add("cache", "Cache Read", Duration::from_micros(23200));
        assert_eq!(
            timing.to_string(),
            r#"missedCache, cache;desc="Cache Read";dur=23.20"#,
        );
        assert_eq!(timing.to_string(), timing.to_string());
        assert_eq!(timing.len(), 2);
    }

    #[test]
    fn it_joins_flags() {
        let timing = ServerTiming::new();
        for name in ["miss", "hit", "stale"] {
            timing.add_flag(name, "");
        }
        assert_eq!(timing.to_string(), "miss, hit, stale");
    }

    #[test]
    fn it_measures_started_metrics() {
        let timing = ServerTiming::new();
        timing.start("db", "Database");
        thread::sleep(Duration::from_millis(10));
        assert!(timing.stop("db").is_some());

        let output = timing.to_string();
        let parts = output.split(';').collect::<Vec<_>>();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "db");
        assert_eq!(parts[1], r#"desc="Database""#);

        let (key, value) = parts[2].split_once('=').unwrap();
        assert_eq!(key, "dur");
        assert!(value.parse::<f64>().unwrap() > 10.0);
    }

    #[test]
    fn it_ignores_unknown_or_stopped_metrics() {
        let timing = ServerTiming::new();
        timing.add("cache", "Cache Read", Duration::from_millis(5));
        let output = timing.to_string();

        assert_eq!(timing.stop("db"), None);
        assert_eq!(timing.stop("cache"), None);
        assert_eq!(timing.to_string(), output);

        timing.start("db", "");
        assert!(timing.stop("db").is_some());
        let output = timing.to_string();
        assert_eq!(timing.stop("db"), None);
        assert_eq!(timing.to_string(), output);
    }

    #[test]
    fn it_stops_the_first_match_only() {
        let timing = ServerTiming::new();
        timing.start("db", "first");
        timing.start("db", "second");
        assert!(timing.stop("db").is_some());

        let metrics = timing.metrics();
        assert!(!metrics[0].is_running());
        assert!(metrics[0].duration().is_some());
        assert!(metrics[1].is_running());
        assert!(metrics[1].duration().is_none());
    }

    #[test]
    fn it_preserves_registration_order() {
        let timing = ServerTiming::new();
        timing.start("db", "");
        timing.add_flag("miss", "");
        timing.add("cache", "", Duration::from_millis(1));
        timing.stop("db");

        let names = timing
            .metrics()
            .iter()
            .map(|metric| metric.name().to_owned())
            .collect::<Vec<_>>();
        assert_eq!(names, ["db", "miss", "cache"]);
        assert!(timing.to_string().starts_with("db;dur="));
    }

    #[test]
    fn it_formats_index_prefix() {
        let timing = ServerTiming::new();
        timing.add_flag("miss", "Cache missed");
        let timing = timing.enable_prefix().enable_prefix();
        timing.add("cache", "", Duration::from_micros(1500));
        assert_eq!(timing.prefix_mode(), PrefixMode::Index);
        assert_eq!(
            timing.to_string(),
            r#"0_miss;desc="Cache missed", 1_cache;dur=1.50"#,
        );

        for i in 0..10 {
            timing.add_flag(format!("m{i}"), "");
        }
        let output = timing.to_string();
        assert!(output.starts_with(r#"00_miss;desc="Cache missed", 01_cache"#));
        assert!(output.ends_with("11_m9"));
    }

    #[test]
    fn it_formats_description_prefix() {
        let timing = ServerTiming::new().with_prefix_mode(PrefixMode::Description);
        timing.add_flag("miss", "Cache missed");
        timing.add("cache", "", Duration::from_millis(2));
        assert_eq!(
            timing.to_string(),
            r#"miss;desc="1: Cache missed", cache;desc="2";dur=2.00"#,
        );

        timing.set_prefix_mode(PrefixMode::None);
        assert_eq!(timing.to_string(), r#"miss;desc="Cache missed", cache;dur=2.00"#);
    }

    #[test]
    fn it_applies_config() {
        let config = r#"
            [server-timing]
            prefix = "index"
            precision = 3
        "#
        .parse::<TomlTable>()
        .unwrap();
        let timing = ServerTiming::from_config(&config).unwrap();
        timing.add("db", "", Duration::from_micros(2463));
        assert_eq!(timing.to_string(), "0_db;dur=2.463");

        let timing = ServerTiming::with_config(&TimingConfig::new(PrefixMode::None, 0));
        timing.add("db", "", Duration::from_micros(2463));
        assert_eq!(timing.to_string(), "db;dur=2");

        let config = "[server-timing]\nprefix = \"alpha\"".parse::<TomlTable>().unwrap();
        assert!(ServerTiming::from_config(&config).is_err());
    }

    #[test]
    fn it_records_metrics() {
        let timing = ServerTiming::new();
        timing.record("enc", None, Some(Duration::from_millis(3)));
        timing.push(TimingMetric::new("miss".into(), Some("Cache".into()), None));
        timing.record_total(Instant::now() - Duration::from_millis(20));

        let output = timing.to_string();
        assert!(output.starts_with(r#"enc;dur=3.00, miss;desc="Cache", total;dur="#));

        let snapshot = timing.clone();
        timing.clear();
        assert!(timing.is_empty());
        assert_eq!(snapshot.len(), 3);
    }

    #[test]
    fn it_stops_guards() {
        let timing = ServerTiming::new();
        {
            let _guard = timing.start_guard("render", "Template");
            thread::sleep(Duration::from_millis(1));
        }
        let guard = timing.start_guard("upload", "");
        assert_eq!(guard.name(), "upload");
        assert!(guard.stop().is_some());

        let metrics = timing.metrics();
        assert_eq!(metrics.len(), 2);
        assert!(metrics.iter().all(|metric| !metric.is_running()));
        assert!(metrics[0].duration().unwrap() >= Duration::from_millis(1));
    }

    #[test]
    fn it_builds_header_value() {
        let timing = ServerTiming::new();
        timing.add("cache", "Cache Read", Duration::from_micros(23200));
        let header_value = timing.header_value().unwrap();
        assert_eq!(header_value, r#"cache;desc="Cache Read";dur=23.20"#);
        assert_eq!(HEADER_NAME.as_str(), "server-timing");

        timing.add_flag("bad\nname", "");
        assert!(timing.header_value().is_err());
    }

    #[test]
    fn it_records_from_multiple_threads() {
        let timing = Arc::new(ServerTiming::new());
        let handles = (0..8)
            .map(|i| {
                let timing = Arc::clone(&timing);
                thread::spawn(move || {
                    let name = format!("task{i}");
                    timing.start(name.clone(), "");
                    timing.add_flag(format!("flag{i}"), "");
                    timing.stop(&name);
                    timing.to_string()
                })
            })
            .collect::<Vec<_>>();
        for handle in handles {
            handle.join().unwrap();
        }

        let metrics = timing.metrics();
        assert_eq!(metrics.len(), 16);
        assert!(metrics.iter().all(|metric| !metric.is_running()));
        assert_eq!(timing.to_string().split(", ").count(), 16);
    }
}
