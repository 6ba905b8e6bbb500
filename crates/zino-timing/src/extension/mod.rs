//! Extension traits for reading settings.

mod toml_table;

pub use toml_table::TomlTableExt;
