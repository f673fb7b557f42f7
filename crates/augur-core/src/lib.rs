//! Core types and trait definitions for the Augur reading store.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! All other crates depend on it.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod batch;
pub mod error;
pub mod method;
pub mod persona;
pub mod reading;
pub mod store;
pub mod user;
pub mod validate;

pub use error::{Error, Result};
pub use method::DivinationMethod;
pub use user::UserId;
