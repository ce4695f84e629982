//! Shared session state
//!
//! The scan loop and the background lookup tasks hold the same
//! [`SharedSession`] handle. Every mutation goes through the write lock and
//! readers take a cloned snapshot.

pub mod state;

pub use state::{CardInfo, SessionState, SharedSession};
