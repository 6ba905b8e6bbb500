#![cfg_attr(docsrs, feature(doc_auto_cfg))]
#![doc = include_str!("../README.md")]
#![doc(html_favicon_url = "https://zino.cc/assets/zino-logo.png")]
#![doc(html_logo_url = "https://zino.cc/assets/zino-logo.svg")]

mod helper;

pub mod error;
pub mod extension;
pub mod timing;

#[doc(no_inline)]
pub use timing::{PrefixMode, ServerTiming, TimingConfig, TimingGuard, TimingMetric};

/// An allocation-optimized string.
pub type SharedString = std::borrow::Cow<'static, str>;

/// A TOML table.
pub type TomlTable = toml::Table;
