//! Error types produced by the compose loading pipeline.

mod constructors;
mod conversions;
mod types;

pub use types::{ComposeError, ServiceRef};

#[cfg(test)]
mod tests;
