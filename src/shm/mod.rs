//! Named shared memory regions
//!
//! The client places sample bytes into a named region and sends only
//! `(offset, length)` references. [`BufferManager`] resolves the name to a
//! platform mapping and returns a [`RegionHandle`] owned by the session.
//!
//! ## Platform Resolution
//!
//! - **POSIX**: the name is a file under the configured directory
//!   (`/dev/shm` by default), mapped with `memmap2`
//! - **Windows**: the name is a named file mapping (e.g. `Local\buf0`),
//!   mapped with `MapViewOfFile`
//!
//! Every read goes through [`RegionHandle::slice`], which is the only place
//! offsets are checked against the region size.
//!
//! ```rust,no_run
//! use framelink::config::SharedMemoryConfig;
//! use framelink::shm::BufferManager;
//!
//! # fn main() -> framelink::Result<()> {
//! let manager = BufferManager::new(SharedMemoryConfig::default());
//! let mut region = manager.attach("buf0", 1024)?;
//!
//! let frame = region.slice(0, 100)?;
//! assert_eq!(frame.len(), 100);
//!
//! region.release();
//! # Ok(())
//! # }
//! ```

mod region;

#[cfg(unix)]
mod posix;
#[cfg(unix)]
use self::posix as platform;

#[cfg(windows)]
mod win32;
#[cfg(windows)]
use self::win32 as platform;

pub use region::RegionHandle;

use tracing::{debug, info};

use crate::config::SharedMemoryConfig;
use crate::{ExtensionError, Result};

/// Attaches named regions according to the configured policy
#[derive(Debug, Clone, Default)]
pub struct BufferManager {
    config: SharedMemoryConfig,
}

impl BufferManager {
    pub fn new(config: SharedMemoryConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SharedMemoryConfig {
        &self.config
    }

    /// Attach the region `name`, which must be exactly `size_bytes` long
    ///
    /// Missing regions are created only under
    /// [`AttachPolicy::CreateIfMissing`](crate::config::AttachPolicy).
    pub fn attach(&self, name: &str, size_bytes: u64) -> Result<RegionHandle> {
        if name.is_empty() {
            return Err(ExtensionError::resource_unavailable(name, "region name is empty"));
        }

        let size = usize::try_from(size_bytes)
            .ok()
            .filter(|size| *size > 0)
            .ok_or_else(|| {
                ExtensionError::resource_unavailable(
                    name,
                    format!("unsupported region size {size_bytes}"),
                )
            })?;

        debug!(
            region = name,
            size,
            policy = ?self.config.attach_policy,
            access = ?self.config.access,
            "Attaching shared memory region"
        );

        let mapping = platform::Mapping::open(&self.config, name, size)?;

        info!(region = name, size, "Attached shared memory region");
        Ok(RegionHandle::new(name.to_string(), size, self.config.access, mapping))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::config::{AccessMode, AttachPolicy};
    use proptest::prelude::*;
    use std::path::Path;

    fn seed_region(dir: &Path, name: &str, bytes: &[u8]) {
        std::fs::write(dir.join(name), bytes).unwrap();
    }

    fn manager_in(dir: &Path) -> BufferManager {
        BufferManager::new(SharedMemoryConfig::in_directory(dir))
    }

    #[test]
    fn attaches_existing_region_and_reads_slices() {
        let dir = tempfile::tempdir().unwrap();
        let bytes: Vec<u8> = (0..=255u8).cycle().take(1024).collect();
        seed_region(dir.path(), "buf0", &bytes);

        let region = manager_in(dir.path()).attach("buf0", 1024).unwrap();

        assert_eq!(region.name(), "buf0");
        assert_eq!(region.size(), 1024);
        assert_eq!(region.slice(0, 100).unwrap(), &bytes[0..100]);
        assert_eq!(region.slice(924, 100).unwrap(), &bytes[924..1024]);
    }

    #[test]
    fn out_of_range_reference_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        seed_region(dir.path(), "buf0", &[0u8; 1024]);
        let region = manager_in(dir.path()).attach("buf0", 1024).unwrap();

        let err = region.slice(1000, 100).unwrap_err();
        assert!(matches!(err, ExtensionError::OutOfBounds { offset: 1000, length: 100, size: 1024 }));

        let err = region.slice(u64::MAX, 2).unwrap_err();
        assert!(matches!(err, ExtensionError::OutOfBounds { .. }));
    }

    #[test]
    fn missing_region_is_unavailable_without_create_policy() {
        let dir = tempfile::tempdir().unwrap();
        let err = manager_in(dir.path()).attach("absent", 64).unwrap_err();

        assert!(matches!(err, ExtensionError::ResourceUnavailable { .. }));
        assert!(!dir.path().join("absent").exists());
    }

    #[test]
    fn create_policy_creates_region_with_requested_size() {
        let dir = tempfile::tempdir().unwrap();
        let config = SharedMemoryConfig::in_directory(dir.path())
            .with_policy(AttachPolicy::CreateIfMissing);

        let region = BufferManager::new(config).attach("fresh", 4096).unwrap();

        assert_eq!(region.size(), 4096);
        assert_eq!(std::fs::metadata(dir.path().join("fresh")).unwrap().len(), 4096);
        assert!(region.slice(0, 4096).unwrap().iter().all(|b| *b == 0));
    }

    #[test]
    fn size_must_match_existing_region() {
        let dir = tempfile::tempdir().unwrap();
        seed_region(dir.path(), "buf0", &[0u8; 512]);

        let err = manager_in(dir.path()).attach("buf0", 1024).unwrap_err();
        assert!(matches!(
            err,
            ExtensionError::SizeMismatch { expected: 1024, actual: 512, .. }
        ));
    }

    #[test]
    fn names_with_path_components_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager_in(dir.path());

        for name in ["", "../escape", "nested/buf", "."] {
            let err = manager.attach(name, 16).unwrap_err();
            assert!(
                matches!(err, ExtensionError::ResourceUnavailable { .. }),
                "{name:?} should be rejected"
            );
        }
    }

    #[test]
    fn zero_size_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        seed_region(dir.path(), "buf0", &[]);

        let err = manager_in(dir.path()).attach("buf0", 0).unwrap_err();
        assert!(matches!(err, ExtensionError::ResourceUnavailable { .. }));
    }

    #[test]
    fn release_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        seed_region(dir.path(), "buf0", &[7u8; 64]);
        let mut region = manager_in(dir.path()).attach("buf0", 64).unwrap();

        assert!(region.is_attached());
        assert!(region.release());
        assert!(!region.release());
        assert!(!region.is_attached());

        let err = region.slice(0, 1).unwrap_err();
        assert!(matches!(err, ExtensionError::ResourceUnavailable { .. }));
    }

    #[test]
    fn read_write_mapping_is_visible_to_readers() {
        let dir = tempfile::tempdir().unwrap();
        let writer_config = SharedMemoryConfig::in_directory(dir.path())
            .with_policy(AttachPolicy::CreateIfMissing)
            .with_access(AccessMode::ReadWrite);

        let mut writer = BufferManager::new(writer_config).attach("buf0", 256).unwrap();
        writer.write(10, b"frame").unwrap();

        let reader = manager_in(dir.path()).attach("buf0", 256).unwrap();
        assert_eq!(reader.slice(10, 5).unwrap(), b"frame");
    }

    #[test]
    fn read_only_mapping_refuses_writes() {
        let dir = tempfile::tempdir().unwrap();
        seed_region(dir.path(), "buf0", &[0u8; 32]);
        let mut region = manager_in(dir.path()).attach("buf0", 32).unwrap();

        assert!(region.write(0, b"x").is_err());
    }

    proptest! {
        #[test]
        fn slices_match_exactly_when_in_bounds(
            size in 1usize..2048,
            offset in 0u64..4096,
            length in 0u64..4096,
        ) {
            let dir = tempfile::tempdir().unwrap();
            let bytes: Vec<u8> = (0..size).map(|i| (i % 251) as u8).collect();
            seed_region(dir.path(), "region", &bytes);
            let region = manager_in(dir.path()).attach("region", size as u64).unwrap();

            let in_bounds = offset + length <= size as u64;
            match region.slice(offset, length) {
                Ok(slice) => {
                    prop_assert!(in_bounds);
                    prop_assert_eq!(slice, &bytes[offset as usize..(offset + length) as usize]);
                }
                Err(ExtensionError::OutOfBounds { .. }) => prop_assert!(!in_bounds),
                Err(other) => prop_assert!(false, "unexpected error {other}"),
            }
        }
    }
}
