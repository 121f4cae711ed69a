//! Attached region handle

use std::ops::Range;
use tracing::debug;

use super::platform::Mapping;
use crate::config::AccessMode;
use crate::{ExtensionError, Result};

/// A mapped region owned by exactly one session
///
/// The mapping stays valid until [`release`](Self::release) is called or
/// the handle is dropped, whichever comes first.
pub struct RegionHandle {
    name: String,
    size: usize,
    access: AccessMode,
    mapping: Option<Mapping>,
}

impl RegionHandle {
    pub(super) fn new(name: String, size: usize, access: AccessMode, mapping: Mapping) -> Self {
        Self { name, size, access, mapping: Some(mapping) }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Negotiated size in bytes
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn access(&self) -> AccessMode {
        self.access
    }

    pub fn is_attached(&self) -> bool {
        self.mapping.is_some()
    }

    /// Borrow `length` bytes starting at `offset`
    ///
    /// Fails with [`ExtensionError::OutOfBounds`] unless
    /// `offset + length <= size`. No bytes are copied.
    pub fn slice(&self, offset: u64, length: u64) -> Result<&[u8]> {
        let mapping = self.mapping()?;
        let range = checked_range(offset, length, self.size)?;
        Ok(&mapping.bytes()[range])
    }

    /// Copy `data` into the region at `offset` (read-write mappings only)
    pub fn write(&mut self, offset: u64, data: &[u8]) -> Result<()> {
        let Self { name, size, mapping, .. } = self;
        let range = checked_range(offset, data.len() as u64, *size)?;

        let mapping = mapping
            .as_mut()
            .ok_or_else(|| ExtensionError::resource_unavailable(name.as_str(), "region has been released"))?;
        let bytes = mapping
            .bytes_mut()
            .ok_or_else(|| ExtensionError::resource_unavailable(name.as_str(), "region is mapped read-only"))?;

        bytes[range].copy_from_slice(data);
        Ok(())
    }

    /// Unmap the region. Returns `false` if it was already released.
    pub fn release(&mut self) -> bool {
        match self.mapping.take() {
            Some(mapping) => {
                drop(mapping);
                debug!(region = %self.name, "Released shared memory region");
                true
            }
            None => false,
        }
    }

    fn mapping(&self) -> Result<&Mapping> {
        self.mapping
            .as_ref()
            .ok_or_else(|| ExtensionError::resource_unavailable(self.name.as_str(), "region has been released"))
    }
}

impl Drop for RegionHandle {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for RegionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegionHandle")
            .field("name", &self.name)
            .field("size", &self.size)
            .field("access", &self.access)
            .field("attached", &self.is_attached())
            .finish()
    }
}

fn checked_range(offset: u64, length: u64, size: usize) -> Result<Range<usize>> {
    let end = offset
        .checked_add(length)
        .filter(|end| *end <= size as u64)
        .ok_or_else(|| ExtensionError::out_of_bounds(offset, length, size))?;
    // end <= size, so both bounds fit in usize
    Ok(offset as usize..end as usize)
}
