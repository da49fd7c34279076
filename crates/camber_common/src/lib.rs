//! Shared foundational types used across the Camber build toolchain.
//!
//! This crate provides the mtime fingerprint used as the cache key for
//! compiled mesh artifacts throughout the pipeline.

#![warn(missing_docs)]

pub mod fingerprint;

pub use fingerprint::{Fingerprint, FingerprintError};
