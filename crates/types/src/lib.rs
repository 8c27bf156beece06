#![forbid(unsafe_code)]
#![deny(missing_docs)]

//! # Animica Core Types
//!
//! This crate is the foundational library for the Animica node, containing
//! the canonical object model, the deterministic wire codec, domain-separated
//! hashing, bech32m addresses, and the unified error enums.
//!
//! ## Architectural Role
//!
//! As the base crate, `animica-types` has minimal dependencies and is itself a
//! dependency for almost every other crate in the workspace. This structure
//! prevents circular dependencies and provides a stable, canonical definition
//! for shared types like `Block`, `Transaction`, `Address`, and the various
//! error enums.

/// The maximum encoded size in bytes accepted for a single wire object.
pub const MAX_WIRE_OBJECT_BYTES: usize = 1024 * 1024; // 1 MiB

/// A top-level, crate-wide `Result` type alias with a default error type.
pub type Result<T, E = crate::error::CoreError> = std::result::Result<T, E>;

/// Bech32m address encoding with an HRP scoped to the chain.
pub mod address;
/// Core application-level data structures like `Block`, `Transaction`, and `Address`.
pub mod app;
/// The clock seam used by time-dependent components.
pub mod clock;
/// The canonical, deterministic CBOR codec for consensus-critical objects.
pub mod codec;
/// Shared configuration structures and environment overrides.
pub mod config;
/// A unified set of all error types used across the workspace.
pub mod error;
/// Domain-separated SHA3-256 hashing and merkle helpers.
pub mod hash;
/// A prelude containing useful extension traits like `OptionExt`.
pub mod prelude;
