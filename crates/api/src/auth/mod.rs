//! Authentication: token codec, password verification, session registry,
//! revocation list, login limiter, and the gate that composes them.

pub mod durable;
pub mod gate;
pub mod jwt;
pub mod limiter;
pub mod password;
pub mod revocation;
pub mod session;
