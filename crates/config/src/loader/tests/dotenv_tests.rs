//! `.env` loading tests.
//!
//! Each test runs in a fresh temporary working directory so the `.env` that
//! `dotenvy` discovers is the one the test wrote. Variables a `.env` sets are
//! scoped with `temp_env` so they do not outlive the test.

use std::fs;
use std::path::{Path, PathBuf};

use serial_test::serial;
use tempfile::TempDir;

use super::env_lock;
use crate::loader::builder::ConfigLoader;
use crate::loader::error::ConfigError;

const BROKEN_LINE: &str = "THIS LINE HAS NO EQUALS";

/// Switches the working directory for its lifetime.
struct WorkDir {
    dir: TempDir,
    previous: PathBuf,
}

impl WorkDir {
    fn with_dotenv(contents: Option<&str>) -> Self {
        let dir = TempDir::new().unwrap();
        if let Some(contents) = contents {
            fs::write(dir.path().join(".env"), contents).unwrap();
        }
        let previous = std::env::current_dir().unwrap();
        std::env::set_current_dir(dir.path()).unwrap();
        Self { dir, previous }
    }

    fn dotenv_path(&self) -> &Path {
        self.dir.path()
    }
}

impl Drop for WorkDir {
    fn drop(&mut self) {
        let _ = std::env::set_current_dir(&self.previous);
    }
}

#[test]
#[serial]
fn test_dotenv_feeds_env_layer() {
    let _lock = env_lock().lock().unwrap();
    let _dir = WorkDir::with_dotenv(Some(
        "TM1_ADDRESS=tm1.example.com\nTM1_PORT=8010\nTM1_SSL=false\n",
    ));

    temp_env::with_vars(
        [
            ("DOTENV_DISABLED", None::<&str>),
            ("TM1_ADDRESS", None),
            ("TM1_PORT", None),
            ("TM1_SSL", None),
        ],
        || {
            let config = ConfigLoader::new()
                .load_dotenv()
                .unwrap()
                .from_env()
                .unwrap()
                .build()
                .unwrap();
            assert_eq!(config.connection.address.as_deref(), Some("tm1.example.com"));
            assert_eq!(config.connection.port, Some(8010));
            assert!(!config.connection.ssl);
        },
    );
}

#[test]
#[serial]
fn test_process_env_wins_over_dotenv() {
    let _lock = env_lock().lock().unwrap();
    let _dir = WorkDir::with_dotenv(Some("TM1_ADDRESS=from-dotenv\n"));

    temp_env::with_vars(
        [("DOTENV_DISABLED", None), ("TM1_ADDRESS", Some("from-env"))],
        || {
            let config = ConfigLoader::new()
                .load_dotenv()
                .unwrap()
                .from_env()
                .unwrap()
                .build()
                .unwrap();
            assert_eq!(config.connection.address.as_deref(), Some("from-env"));
        },
    );
}

#[test]
#[serial]
fn test_missing_dotenv_is_ignored() {
    let _lock = env_lock().lock().unwrap();
    let _dir = WorkDir::with_dotenv(None);

    temp_env::with_var("DOTENV_DISABLED", None::<&str>, || {
        assert!(ConfigLoader::new().load_dotenv().is_ok());
    });
}

#[test]
#[serial]
fn test_parse_error_hides_line_contents() {
    let _lock = env_lock().lock().unwrap();
    let secret = "apple-pie-secret";
    let _dir = WorkDir::with_dotenv(Some(&format!("TM1_PASSWORD={secret}\n{BROKEN_LINE}")));

    temp_env::with_vars(
        [("DOTENV_DISABLED", None::<&str>), ("TM1_PASSWORD", None)],
        || {
            let err = ConfigLoader::new().load_dotenv().err().unwrap();
            assert!(matches!(err, ConfigError::DotenvParse { .. }));
            let message = err.to_string();
            assert!(!message.contains(secret));
            assert!(!message.contains(BROKEN_LINE));
            assert!(message.contains("DOTENV_DISABLED"));
        },
    );
}

#[test]
#[serial]
fn test_dotenv_disabled_values() {
    let _lock = env_lock().lock().unwrap();
    let dir = WorkDir::with_dotenv(Some(BROKEN_LINE));
    assert!(dir.dotenv_path().join(".env").exists());

    for (value, skipped) in [("1", true), ("true", true), ("false", false), ("0", false)] {
        temp_env::with_var("DOTENV_DISABLED", Some(value), || {
            let result = ConfigLoader::new().load_dotenv();
            assert_eq!(result.is_ok(), skipped, "DOTENV_DISABLED={value}");
        });
    }
}

#[cfg(unix)]
#[test]
#[serial]
fn test_unreadable_dotenv_is_io_error() {
    use std::os::unix::fs::PermissionsExt;

    let _lock = env_lock().lock().unwrap();
    let dir = WorkDir::with_dotenv(Some("TM1_ADDRESS=tm1.example.com\n"));
    let path = dir.dotenv_path().join(".env");
    fs::set_permissions(&path, fs::Permissions::from_mode(0o000)).unwrap();

    let result = temp_env::with_vars(
        [("DOTENV_DISABLED", None::<&str>), ("TM1_ADDRESS", None)],
        || ConfigLoader::new().load_dotenv().map(|_| ()),
    );
    fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();

    // Root can read the file regardless of mode.
    if let Err(err) = result {
        assert!(matches!(err, ConfigError::DotenvIo { .. }), "unexpected error: {err}");
    }
}
