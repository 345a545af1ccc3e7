//! Background Tasks Module
//!
//! Work scheduled off the request path.
//!
//! # Tasks
//! - Cache write-back: persists a computed value after its caller has
//!   already returned

mod writeback;

pub use writeback::spawn_cache_write;
