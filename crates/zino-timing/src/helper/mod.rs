/// Helper utilities.
mod quote;

pub(crate) use quote::quote_string;
