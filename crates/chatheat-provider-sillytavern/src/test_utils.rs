//! Environment helpers for store tests
//!
//! Discovery reads process-wide environment variables, so tests that touch
//! them take [`ENV_MUTEX`] first and restore values through [`EnvVarGuard`].

use once_cell::sync::Lazy;
use std::env;

/// Serializes environment variable changes across tests
pub static ENV_MUTEX: Lazy<tokio::sync::Mutex<()>> = Lazy::new(|| tokio::sync::Mutex::new(()));

/// Restores every variable it touched when dropped, panics included
#[derive(Default)]
pub struct EnvVarGuard {
    saved: Vec<(String, Option<String>)>,
}

impl EnvVarGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: &str, value: &str) {
        self.saved.push((key.to_string(), env::var(key).ok()));
        // SAFETY: callers hold ENV_MUTEX
        unsafe {
            env::set_var(key, value);
        }
    }

    #[allow(dead_code)]
    pub fn remove(&mut self, key: &str) {
        self.saved.push((key.to_string(), env::var(key).ok()));
        // SAFETY: callers hold ENV_MUTEX
        unsafe {
            env::remove_var(key);
        }
    }
}

impl Drop for EnvVarGuard {
    fn drop(&mut self) {
        for (key, value) in self.saved.iter().rev() {
            unsafe {
                match value {
                    Some(v) => env::set_var(key, v),
                    None => env::remove_var(key),
                }
            }
        }
    }
}
