//! Ballroom Core: shared vocabulary for the dance-floor protocol
//!
//! Layer 1 of the ballroom workspace. Nothing in here is async; it holds the
//! types every other crate agrees on:
//!
//! - [`Role`], [`DancerId`] and the role-indexed [`PerRole`] container
//! - [`RELEASER`], the fixed role that hands the floor back after a dance
//! - [`BallroomError`], the single error type, and its [`Result`] alias
//! - [`BallroomConfig`] with file/env/CLI layering and validation
//!
//! # Example
//!
//! ```rust
//! use ballroom_core::{BallroomConfig, DancerId, Role};
//!
//! let config = BallroomConfig::default();
//! assert!(config.validate().is_ok());
//!
//! let first_follower = DancerId::new(Role::Follower, 0);
//! assert_eq!(first_follower.to_string(), "a");
//! ```

#![deny(missing_docs)]
#![forbid(unsafe_code)]

pub mod config;
pub mod errors;
pub mod role;

pub use config::{BallroomConfig, ConfigValidator, ValidationError};
pub use errors::{BallroomError, Result, WaitStage};
pub use role::{DancerId, PerRole, Role, RELEASER};
