//! Filesystem adapters for wagate.
//!
//! Implements the `DocumentStore` port over plain JSON files and resolves
//! the data directory that holds them, `config.toml` and the SQLite database.

pub mod documents;

use std::path::PathBuf;

pub use documents::FileDocumentStore;

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "WAGATE_DATA_DIR";

/// Resolve the data directory from environment or platform defaults.
///
/// Priority:
/// 1. `WAGATE_DATA_DIR` environment variable
/// 2. `~/.wagate` under the user's home directory
/// 3. `./.wagate` as a last resort
pub fn resolve_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        return PathBuf::from(dir);
    }

    if let Some(home) = dirs::home_dir() {
        return home.join(".wagate");
    }

    PathBuf::from(".wagate")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_data_dir_from_env() {
        // SAFETY: This test is single-threaded and restores the env var immediately.
        unsafe {
            std::env::set_var(DATA_DIR_ENV, "/tmp/test-wagate");
        }
        let dir = resolve_data_dir();
        assert_eq!(dir, PathBuf::from("/tmp/test-wagate"));
        unsafe {
            std::env::remove_var(DATA_DIR_ENV);
        }
    }
}
