//! Periodic maintenance spawned from `main.rs`.
//!
//! Tasks run until their [`CancellationToken`] fires at shutdown.
//!
//! [`CancellationToken`]: tokio_util::sync::CancellationToken

pub mod session_sweeper;
