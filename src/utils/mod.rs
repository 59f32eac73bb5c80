//! Utility functions shared across layers.
//!
//! - [`alias_codec`] - Base-62 alias encoding and custom alias validation
//! - [`target_url`] - Target URL validation and normalization
//! - [`timeout`] - Deadlines for store and cache calls

pub mod alias_codec;
pub mod target_url;
pub mod timeout;
