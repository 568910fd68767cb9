//! `{ "data": ... }` envelope for successful JSON bodies.
//!
//! Token responses from login and refresh are returned bare, matching what
//! OAuth-style clients expect.

use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct DataResponse<T: Serialize> {
    pub data: T,
}
