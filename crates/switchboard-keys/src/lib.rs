//! # Switchboard Keys
//!
//! Credential lifecycle for the completion gateway: the narrow `KeyStore`
//! contract the gateway consumes, plus an in-memory, env-seeded
//! implementation.
//!
//! The gateway never persists keys itself; everything goes through this
//! boundary. No transactional guarantee holds across two calls, so the
//! gateway's rotation rollback stays best-effort.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod store;

pub use store::{InMemoryKeyStore, KeyStore, DEFAULT_ENV_PREFIX};
