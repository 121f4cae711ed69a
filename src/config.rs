//! Extension configuration
//!
//! Configuration is read from YAML and may be overridden from the
//! environment:
//!
//! ```yaml
//! batch_size: 3
//! shared_memory:
//!   directory: /dev/shm
//!   attach_policy: attach_existing
//!   access: read_only
//! logging:
//!   filter: info,framelink=debug
//! ```
//!
//! | Variable | Overrides |
//! |----------|-----------|
//! | `FRAMELINK_BATCH_SIZE` | `batch_size` |
//! | `FRAMELINK_SHM_DIR` | `shared_memory.directory` |
//! | `FRAMELINK_LOG` | `logging.filter` |

use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::{ExtensionError, Result};

/// Environment variable overriding the batch size
pub const ENV_BATCH_SIZE: &str = "FRAMELINK_BATCH_SIZE";
/// Environment variable overriding the shared memory directory
pub const ENV_SHM_DIR: &str = "FRAMELINK_SHM_DIR";
/// Environment variable overriding the log filter
pub const ENV_LOG: &str = "FRAMELINK_LOG";

/// Directory named regions resolve under on POSIX systems
pub const DEFAULT_SHM_DIRECTORY: &str = "/dev/shm";

/// Top-level extension configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtensionConfig {
    /// Number of samples per inference call (>= 1)
    pub batch_size: usize,

    /// Shared memory attach settings
    pub shared_memory: SharedMemoryConfig,

    /// Log output settings
    pub logging: LoggingConfig,
}

impl Default for ExtensionConfig {
    fn default() -> Self {
        Self {
            batch_size: 1,
            shared_memory: SharedMemoryConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl ExtensionConfig {
    /// Parse and validate a YAML document
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml_ng::from_str(yaml)
            .map_err(|e| ExtensionError::config_error("ExtensionConfig deserialization", e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a YAML file, apply environment overrides and validate
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::load_with(path, |key| std::env::var(key).ok())
    }

    /// Load a YAML file, apply overrides from `lookup` and validate
    pub fn load_with<P, F>(path: P, lookup: F) -> Result<Self>
    where
        P: AsRef<Path>,
        F: Fn(&str) -> Option<String>,
    {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|e| {
            ExtensionError::config_error(path.display().to_string(), e.to_string())
        })?;

        let mut config: Self = serde_yaml_ng::from_str(&yaml).map_err(|e| {
            ExtensionError::config_error(path.display().to_string(), e.to_string())
        })?;
        config.apply_overrides(lookup)?;
        config.validate()?;

        debug!(path = %path.display(), batch_size = config.batch_size, "Loaded configuration");
        Ok(config)
    }

    /// Apply `FRAMELINK_*` overrides from the process environment
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_BATCH_SIZE) {
            self.batch_size = value.trim().parse().map_err(|_| {
                ExtensionError::config_error(ENV_BATCH_SIZE, format!("'{value}' is not an integer"))
            })?;
        }
        if let Some(dir) = lookup(ENV_SHM_DIR) {
            self.shared_memory.directory = PathBuf::from(dir);
        }
        if let Some(filter) = lookup(ENV_LOG) {
            self.logging.filter = filter;
        }
        Ok(())
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(ExtensionError::config_error("batch_size", "must be at least 1"));
        }
        if self.shared_memory.directory.as_os_str().is_empty() {
            return Err(ExtensionError::config_error(
                "shared_memory.directory",
                "must not be empty",
            ));
        }
        Ok(())
    }

    /// Batch size as a non-zero value
    pub fn batch_size(&self) -> Result<NonZeroUsize> {
        NonZeroUsize::new(self.batch_size)
            .ok_or_else(|| ExtensionError::config_error("batch_size", "must be at least 1"))
    }
}

/// How named regions are attached
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SharedMemoryConfig {
    /// Directory named regions resolve under (POSIX only)
    pub directory: PathBuf,

    /// Attach-only or create-if-missing
    pub attach_policy: AttachPolicy,

    /// Mapping access mode
    pub access: AccessMode,
}

impl Default for SharedMemoryConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from(DEFAULT_SHM_DIRECTORY),
            attach_policy: AttachPolicy::default(),
            access: AccessMode::default(),
        }
    }
}

impl SharedMemoryConfig {
    /// Settings rooted at a custom directory
    pub fn in_directory(directory: impl Into<PathBuf>) -> Self {
        Self { directory: directory.into(), ..Self::default() }
    }

    pub fn with_policy(mut self, attach_policy: AttachPolicy) -> Self {
        self.attach_policy = attach_policy;
        self
    }

    pub fn with_access(mut self, access: AccessMode) -> Self {
        self.access = access;
        self
    }
}

/// Creation-vs-attach policy for named regions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttachPolicy {
    /// Fail if the region does not exist
    #[default]
    AttachExisting,
    /// Create the region with the requested size if it does not exist
    CreateIfMissing,
}

/// Mapping access mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessMode {
    #[default]
    ReadOnly,
    ReadWrite,
}

/// Log output settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive string
    pub filter: String,
    /// Emit ANSI colors
    pub ansi: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { filter: "info".to_string(), ansi: true }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_are_valid() {
        let config = ExtensionConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.batch_size, 1);
        assert_eq!(config.shared_memory.directory, PathBuf::from("/dev/shm"));
        assert_eq!(config.shared_memory.attach_policy, AttachPolicy::AttachExisting);
        assert_eq!(config.shared_memory.access, AccessMode::ReadOnly);
    }

    #[test]
    fn parses_full_document() {
        let yaml = r#"
batch_size: 3
shared_memory:
  directory: /tmp/regions
  attach_policy: create_if_missing
  access: read_write
logging:
  filter: debug
  ansi: false
"#;
        let config = ExtensionConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.batch_size, 3);
        assert_eq!(config.shared_memory.directory, PathBuf::from("/tmp/regions"));
        assert_eq!(config.shared_memory.attach_policy, AttachPolicy::CreateIfMissing);
        assert_eq!(config.shared_memory.access, AccessMode::ReadWrite);
        assert_eq!(config.logging.filter, "debug");
        assert!(!config.logging.ansi);
    }

    #[test]
    fn partial_document_keeps_defaults() {
        let config = ExtensionConfig::from_yaml_str("batch_size: 5\n").unwrap();
        assert_eq!(config.batch_size, 5);
        assert_eq!(config.shared_memory, SharedMemoryConfig::default());
    }

    #[test]
    fn zero_batch_size_is_rejected() {
        let err = ExtensionConfig::from_yaml_str("batch_size: 0\n").unwrap_err();
        assert!(matches!(err, ExtensionError::Config { .. }));
    }

    #[test]
    fn malformed_yaml_is_a_config_error() {
        let err = ExtensionConfig::from_yaml_str("batch_size: [1, 2").unwrap_err();
        assert!(matches!(err, ExtensionError::Config { .. }));
    }

    #[test]
    fn overrides_replace_file_values() {
        let env: HashMap<&str, &str> = [
            (ENV_BATCH_SIZE, "4"),
            (ENV_SHM_DIR, "/run/shm"),
            (ENV_LOG, "trace"),
        ]
        .into_iter()
        .collect();

        let mut config = ExtensionConfig::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string())).unwrap();

        assert_eq!(config.batch_size, 4);
        assert_eq!(config.shared_memory.directory, PathBuf::from("/run/shm"));
        assert_eq!(config.logging.filter, "trace");
    }

    #[test]
    fn non_numeric_batch_override_fails() {
        let mut config = ExtensionConfig::default();
        let err = config
            .apply_overrides(|key| (key == ENV_BATCH_SIZE).then(|| "many".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains("many"));
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("extension.yaml");
        std::fs::write(&path, "batch_size: 2\n").unwrap();

        let config = ExtensionConfig::load_with(&path, |_| None).unwrap();
        assert_eq!(config.batch_size, 2);
        assert_eq!(config.shared_memory, SharedMemoryConfig::default());
    }

    #[test]
    fn load_applies_overrides_after_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("extension.yaml");
        std::fs::write(&path, "batch_size: 2\nlogging:\n  filter: warn\n").unwrap();

        let config = ExtensionConfig::load_with(&path, |key| {
            (key == ENV_BATCH_SIZE).then(|| "6".to_string())
        })
        .unwrap();
        assert_eq!(config.batch_size, 6);
        assert_eq!(config.logging.filter, "warn");
    }

    #[test]
    fn override_to_zero_batch_size_fails_validation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("extension.yaml");
        std::fs::write(&path, "batch_size: 2\n").unwrap();

        let err = ExtensionConfig::load_with(&path, |key| {
            (key == ENV_BATCH_SIZE).then(|| "0".to_string())
        })
        .unwrap_err();
        assert!(matches!(err, ExtensionError::Config { .. }));
    }

    #[test]
    fn load_missing_file_is_a_config_error() {
        let err = ExtensionConfig::load("/definitely/not/here.yaml").unwrap_err();
        assert!(matches!(err, ExtensionError::Config { .. }));
    }
}
