//! Background Tasks Module
//!
//! # Tasks
//! - Cache cleanup: purges expired entries at the configured interval

mod cleanup;

pub use cleanup::{spawn_cleanup_every, spawn_cleanup_task};
