//! Shared static-asset publishing domain primitives.
//!
//! This crate owns the custom-resource contract, entry selection, destination
//! key layout, media-type inference and archive decoding. It intentionally
//! excludes AWS SDK and Lambda runtime concerns.

pub mod archive;
pub mod contract;
pub mod discovery;
pub mod media_types;
pub mod patterns;
pub mod storage_keys;
