//! Test helpers shared across the compose-loader workspace.
//!
//! - [`env`]: guards for process environment variables.
//! - [`figment`]: running code inside a `figment::Jail`.
//! - [`project`]: temporary on-disk compose projects.

pub mod env;
pub mod figment;
pub mod project;
