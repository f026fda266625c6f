//! Guards for tests that change process environment variables.
//!
//! The loader reads `HOME` when expanding `~` and the `COMPOSE_*` variables
//! when gathering project options. Tests that set either go through this
//! module so that every mutation, and its restoration, happens under one
//! global re-entrant lock.
//!
//! Guards restore the previous value (or remove the variable) on drop.
//! Several guards for the same key restore in LIFO order. Hold an
//! [`EnvScope`] when a test needs the lock for its whole duration.
//!
//! # Examples
//!
//! ```
//! use compose_loader_test_helpers::env;
//!
//! let _home = env::set_var("HOME", "/home/tester");
//! assert_eq!(std::env::var("HOME").ok().as_deref(), Some("/home/tester"));
//! ```

use std::env;
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::sync::LazyLock;

use parking_lot::{ReentrantMutex, ReentrantMutexGuard};

/// Prefix of the variables read by the compose loader.
pub const COMPOSE_PREFIX: &str = "COMPOSE_";

static ENV_MUTEX: LazyLock<ReentrantMutex<()>> = LazyLock::new(ReentrantMutex::default);

/// # Safety
///
/// Callers must hold `ENV_MUTEX`.
unsafe fn env_set_var(key: &str, value: &OsStr) {
    unsafe { env::set_var(key, value) };
}

/// # Safety
///
/// Callers must hold `ENV_MUTEX`.
unsafe fn env_remove_var(key: &str) {
    unsafe { env::remove_var(key) };
}

/// Restores one variable to the value it had before the guard was made.
#[must_use = "dropping restores the prior value"]
pub struct EnvVarGuard {
    key: String,
    original: Option<OsString>,
}

impl fmt::Debug for EnvVarGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvVarGuard")
            .field("key", &self.key)
            .field("had_original", &self.original.is_some())
            .finish_non_exhaustive()
    }
}

impl Drop for EnvVarGuard {
    fn drop(&mut self) {
        let _lock = ENV_MUTEX.lock();
        match self.original.take() {
            // SAFETY: `ENV_MUTEX` is held.
            Some(value) => unsafe { env_set_var(&self.key, &value) },
            // SAFETY: `ENV_MUTEX` is held.
            None => unsafe { env_remove_var(&self.key) },
        }
    }
}

fn mutate<F>(key: String, mutator: F, _lock: &ReentrantMutexGuard<'static, ()>) -> EnvVarGuard
where
    F: FnOnce(&str),
{
    let original = env::var_os(&key);
    mutator(&key);
    EnvVarGuard { key, original }
}

/// The global lock, held for the guard's lifetime.
#[must_use = "dropping releases the environment lock"]
pub struct EnvVarLock {
    guard: ReentrantMutexGuard<'static, ()>,
}

impl EnvVarLock {
    /// Set `key` while this lock is held.
    pub fn set_var(&self, key: impl Into<String>, value: impl AsRef<OsStr>) -> EnvVarGuard {
        // SAFETY: the lock is held by `self`.
        mutate(key.into(), |k| unsafe { env_set_var(k, value.as_ref()) }, &self.guard)
    }

    /// Remove `key` while this lock is held.
    pub fn remove_var(&self, key: impl Into<String>) -> EnvVarGuard {
        // SAFETY: the lock is held by `self`.
        mutate(key.into(), |k| unsafe { env_remove_var(k) }, &self.guard)
    }
}

/// Keeps the global lock and a set of guards alive together.
///
/// Guards are restored before the lock is released.
#[must_use = "dropping releases the environment lock and restores guards"]
pub struct EnvScope {
    guards: Vec<EnvVarGuard>,
    _lock: EnvVarLock,
}

impl EnvScope {
    /// Take the lock, then let `builder` create guards under it.
    pub fn new_with<F>(builder: F) -> Self
    where
        F: FnOnce(&EnvVarLock) -> Vec<EnvVarGuard>,
    {
        let lock = lock();
        let guards = builder(&lock);
        Self { guards, _lock: lock }
    }
}

impl Drop for EnvScope {
    fn drop(&mut self) {
        drop(std::mem::take(&mut self.guards));
    }
}

/// Set `key` to `value` until the guard is dropped.
pub fn set_var(key: impl Into<String>, value: impl AsRef<OsStr>) -> EnvVarGuard {
    lock().set_var(key, value)
}

/// Remove `key` until the guard is dropped.
pub fn remove_var(key: impl Into<String>) -> EnvVarGuard {
    lock().remove_var(key)
}

/// Acquire the global environment lock.
pub fn lock() -> EnvVarLock {
    EnvVarLock {
        guard: ENV_MUTEX.lock(),
    }
}

/// Hold the lock with every `COMPOSE_*` variable removed and `vars` set.
///
/// # Examples
///
/// ```
/// use compose_loader_test_helpers::env;
///
/// let _scope = env::compose_scope(&[("COMPOSE_PROJECT_NAME", "shop")]);
/// assert_eq!(std::env::var("COMPOSE_PROJECT_NAME").ok().as_deref(), Some("shop"));
/// assert!(std::env::var("COMPOSE_FILE").is_err());
/// ```
pub fn compose_scope(vars: &[(&str, &str)]) -> EnvScope {
    EnvScope::new_with(|lock| {
        let existing: Vec<String> = env::vars_os()
            .filter_map(|(key, _)| key.into_string().ok())
            .filter(|key| key.starts_with(COMPOSE_PREFIX))
            .collect();
        let mut guards: Vec<EnvVarGuard> = existing.into_iter().map(|key| lock.remove_var(key)).collect();
        guards.extend(vars.iter().map(|(key, value)| lock.set_var(*key, value)));
        guards
    })
}
