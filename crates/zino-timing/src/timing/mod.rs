//! HTTP headers for performance metrics.

mod prefix_mode;
mod server_timing;
mod timing_config;
mod timing_guard;
mod timing_metric;

pub use prefix_mode::PrefixMode;
pub use server_timing::{HEADER_NAME, ServerTiming};
pub use timing_config::TimingConfig;
pub use timing_guard::TimingGuard;
pub use timing_metric::TimingMetric;
