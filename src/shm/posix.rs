//! File-backed mappings under a shared memory directory

use memmap2::{Mmap, MmapMut, MmapOptions};
use std::fs::{File, OpenOptions};
use std::io::ErrorKind;
use tracing::{debug, trace};

use crate::config::{AccessMode, AttachPolicy, SharedMemoryConfig};
use crate::{ExtensionError, Result};

enum View {
    ReadOnly(Mmap),
    ReadWrite(MmapMut),
}

pub(super) struct Mapping {
    view: View,
    _file: File,
}

impl Mapping {
    pub(super) fn open(config: &SharedMemoryConfig, name: &str, size: usize) -> Result<Self> {
        validate_name(name)?;
        let path = config.directory.join(name);
        trace!(path = %path.display(), "Resolving region path");

        let create = config.attach_policy == AttachPolicy::CreateIfMissing;
        let writable = config.access == AccessMode::ReadWrite;

        let file = OpenOptions::new()
            .read(true)
            .write(writable || create)
            .create(create)
            .truncate(false)
            .open(&path)
            .map_err(|e| {
                let reason = if e.kind() == ErrorKind::NotFound {
                    format!("no region at {}", path.display())
                } else {
                    format!("failed to open {}", path.display())
                };
                ExtensionError::resource_unavailable_with_source(name, reason, e)
            })?;

        let actual = file
            .metadata()
            .map_err(|e| ExtensionError::resource_unavailable_with_source(name, "failed to stat region", e))?
            .len();

        if actual == 0 && create {
            file.set_len(size as u64).map_err(|e| {
                ExtensionError::resource_unavailable_with_source(name, "failed to size new region", e)
            })?;
            debug!(region = name, size, "Created shared memory region");
        } else if actual != size as u64 {
            return Err(ExtensionError::SizeMismatch {
                name: name.to_string(),
                expected: size as u64,
                actual,
            });
        }

        let mut options = MmapOptions::new();
        options.len(size);

        // SAFETY: the mapping is shared with the producer process by contract.
        // Readers only ever copy bytes out through bounds-checked slices.
        let view = unsafe {
            match config.access {
                AccessMode::ReadOnly => options.map(&file).map(View::ReadOnly),
                AccessMode::ReadWrite => options.map_mut(&file).map(View::ReadWrite),
            }
        }
        .map_err(|e| ExtensionError::resource_unavailable_with_source(name, "mmap failed", e))?;

        Ok(Self { view, _file: file })
    }

    pub(super) fn bytes(&self) -> &[u8] {
        match &self.view {
            View::ReadOnly(map) => &map[..],
            View::ReadWrite(map) => &map[..],
        }
    }

    pub(super) fn bytes_mut(&mut self) -> Option<&mut [u8]> {
        match &mut self.view {
            View::ReadOnly(_) => None,
            View::ReadWrite(map) => Some(&mut map[..]),
        }
    }
}

/// Names must stay inside the configured directory
fn validate_name(name: &str) -> Result<()> {
    if name == "." || name == ".." || name.contains(['/', '\\', '\0']) {
        return Err(ExtensionError::resource_unavailable(
            name,
            "region name must not contain path components",
        ));
    }
    Ok(())
}
