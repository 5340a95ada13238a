//! Common types shared throughout the cache simulation engine.
//!
//! This module provides the fundamental building blocks used by every other
//! component. It includes:
//! 1. **Access Kinds:** Classification of memory operations (Load/Store/Invalidate).
//! 2. **Error Handling:** Configuration and trace-replay error types.

/// Memory access and cache type definitions.
pub mod data;

/// Error types.
pub mod error;

pub use data::{AccessKind, CacheType};
pub use error::{ConfigError, TraceError};
