use super::PrefixMode;
use crate::{TomlTable, error::Error, extension::TomlTableExt};

/// Default number of fraction digits for the `dur` parameter.
pub(crate) const DEFAULT_PRECISION: usize = 2;

/// Maximum number of fraction digits for the `dur` parameter.
const MAX_PRECISION: usize = 6;

/// Settings of the server timing metrics.
///
/// The settings are read from the `[server-timing]` table of the application config:
///
/// ```toml
/// [server-timing]
/// prefix = "index"
/// precision = 2
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimingConfig {
    /// Ordering prefix mode.
    prefix_mode: PrefixMode,
    /// Number of fraction digits for the duration in milliseconds.
    precision: usize,
}

impl TimingConfig {
    /// Creates a new instance. The precision is capped at 6 fraction digits.
    #[inline]
    pub fn new(prefix_mode: PrefixMode, precision: usize) -> Self {
        Self {
            prefix_mode,
            precision: precision.min(MAX_PRECISION),
        }
    }

    /// Loads the settings from the `[server-timing]` table of an application config.
    /// The defaults are used if the table does not exist.
    pub fn from_app_config(config: &TomlTable) -> Result<Self, Error> {
        config
            .get_table("server-timing")
            .map(Self::from_table)
            .transpose()
            .map(Option::unwrap_or_default)
    }

    /// Loads the settings from a table. Missing keys keep their defaults.
    pub fn from_table(config: &TomlTable) -> Result<Self, Error> {
        let mut timing_config = Self::default();
        if let Some(prefix) = config.get_str("prefix") {
            timing_config.prefix_mode = prefix.parse::<PrefixMode>().map_err(|err| {
                tracing::warn!(prefix, "fail to parse the server timing prefix mode");
                err.wrap("fail to load the server timing config")
            })?;
        }
        if let Some(value) = config.get("precision") {
            let precision = config
                .get_u8("precision")
                .map(usize::from)
                .filter(|&precision| precision <= MAX_PRECISION);
            if let Some(precision) = precision {
                timing_config.precision = precision;
            } else {
                tracing::warn!(
                    precision = %value,
                    "server timing precision should be an integer in the range 0..=6",
                );
                let message = format!("invalid server timing precision `{value}`");
                return Err(Error::new(message).wrap("fail to load the server timing config"));
            }
        }
        Ok(timing_config)
    }

    /// Returns the ordering prefix mode.
    #[inline]
    pub fn prefix_mode(&self) -> PrefixMode {
        self.prefix_mode
    }

    /// Returns the number of fraction digits for the duration in milliseconds.
    #[inline]
    pub fn precision(&self) -> usize {
        self.precision
    }
}

impl Default for TimingConfig {
    #[inline]
    fn default() -> Self {
        Self {
            prefix_mode: PrefixMode::None,
            precision: DEFAULT_PRECISION,
        }
    }
}
