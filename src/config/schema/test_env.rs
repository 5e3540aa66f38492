use std::sync::{LazyLock, Mutex, MutexGuard};

/// Serializes tests that touch `POIETIC_*` variables.
pub(crate) static ENV_LOCK: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

/// Takes `ENV_LOCK`, recovering it if an earlier test panicked while holding it.
pub(crate) fn lock_env() -> MutexGuard<'static, ()> {
    ENV_LOCK
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}

/// Restores a variable to its prior value when dropped.
pub(crate) struct EnvVarGuard {
    key: &'static str,
    previous: Option<String>,
}

impl EnvVarGuard {
    pub(crate) fn set(key: &'static str, value: &str) -> Self {
        let guard = Self::capture(key);
        // SAFETY: callers hold ENV_LOCK, so no other test mutates the
        // environment concurrently.
        unsafe { std::env::set_var(key, value) };
        guard
    }

    pub(crate) fn unset(key: &'static str) -> Self {
        let guard = Self::capture(key);
        // SAFETY: see `set`.
        unsafe { std::env::remove_var(key) };
        guard
    }

    fn capture(key: &'static str) -> Self {
        Self {
            key,
            previous: std::env::var(key).ok(),
        }
    }
}

impl Drop for EnvVarGuard {
    fn drop(&mut self) {
        // SAFETY: the owning test still holds ENV_LOCK.
        unsafe {
            match &self.previous {
                Some(value) => std::env::set_var(self.key, value),
                None => std::env::remove_var(self.key),
            }
        }
    }
}
