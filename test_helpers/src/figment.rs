//! Running loader code inside a [`figment::Jail`].
//!
//! A jail gives a test a private working directory and environment that are
//! reset afterwards. Loader errors are not figment errors, so
//! [`figment_error`] bridges them for use with `?` inside the closure.

use anyhow::{Result, anyhow};

/// Run `f` inside a jail and return its value.
///
/// # Errors
///
/// Returns the closure's error, converted to `anyhow::Error`.
///
/// # Examples
///
/// ```
/// use compose_loader_test_helpers::figment::with_jail;
///
/// let name = with_jail(|jail| {
///     jail.set_env("COMPOSE_PROJECT_NAME", "jailed");
///     Ok(std::env::var("COMPOSE_PROJECT_NAME").unwrap_or_default())
/// })
/// .unwrap_or_default();
/// assert_eq!(name, "jailed");
/// ```
pub fn with_jail<F, T>(f: F) -> Result<T>
where
    F: FnOnce(&mut figment::Jail) -> figment::error::Result<T>,
{
    let mut output = None;
    figment::Jail::try_with(|jail| {
        output = Some(f(jail)?);
        Ok(())
    })
    .map_err(|err| anyhow!(err.to_string()))?;
    output.ok_or_else(|| anyhow!("jail closure returned no value"))
}

/// Turn any displayable error into a [`figment::Error`].
#[expect(
    clippy::needless_pass_by_value,
    reason = "used as a `map_err` argument, which passes errors by value"
)]
#[must_use]
pub fn figment_error<E: ToString>(err: E) -> figment::Error {
    figment::Error::from(err.to_string())
}
