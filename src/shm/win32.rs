//! Named file mappings

use std::ptr::NonNull;
use tracing::debug;
use windows::Win32::Foundation::{CloseHandle, HANDLE, INVALID_HANDLE_VALUE};
use windows::Win32::System::Memory::{
    CreateFileMappingW, FILE_MAP, FILE_MAP_ALL_ACCESS, FILE_MAP_READ, MEMORY_BASIC_INFORMATION,
    MEMORY_MAPPED_VIEW_ADDRESS, MapViewOfFile, OpenFileMappingW, PAGE_READWRITE, UnmapViewOfFile,
    VirtualQuery,
};
use windows::core::PCWSTR;

use crate::config::{AccessMode, AttachPolicy, SharedMemoryConfig};
use crate::{ExtensionError, Result};

pub(super) struct Mapping {
    handle: HANDLE,
    base: NonNull<u8>,
    len: usize,
    writable: bool,
}

// SAFETY: the view stays mapped until Drop and the handle is a kernel object
unsafe impl Send for Mapping {}
unsafe impl Sync for Mapping {}

impl Mapping {
    pub(super) fn open(config: &SharedMemoryConfig, name: &str, size: usize) -> Result<Self> {
        let wide_name = wide_string(name);
        let access: FILE_MAP = match config.access {
            AccessMode::ReadOnly => FILE_MAP_READ,
            AccessMode::ReadWrite => FILE_MAP_ALL_ACCESS,
        };

        let opened =
            unsafe { OpenFileMappingW(access.0, false, PCWSTR::from_raw(wide_name.as_ptr())) };

        let (handle, created) = match (opened, config.attach_policy) {
            (Ok(handle), _) => (handle, false),
            (Err(_), AttachPolicy::CreateIfMissing) => {
                let size64 = size as u64;
                let handle = unsafe {
                    CreateFileMappingW(
                        INVALID_HANDLE_VALUE,
                        None,
                        PAGE_READWRITE,
                        (size64 >> 32) as u32,
                        size64 as u32,
                        PCWSTR::from_raw(wide_name.as_ptr()),
                    )
                }
                .map_err(|e| ExtensionError::windows_api_error("CreateFileMappingW", e))?;
                debug!(region = name, size, "Created named file mapping");
                (handle, true)
            }
            (Err(e), AttachPolicy::AttachExisting) => {
                return Err(ExtensionError::resource_unavailable(
                    name,
                    format!("OpenFileMappingW failed: {e}"),
                ));
            }
        };

        // An existing mapping is viewed whole so that its real size can be
        // compared below instead of failing inside MapViewOfFile.
        let view_len = if created { size } else { 0 };
        let view = unsafe { MapViewOfFile(handle, access, 0, 0, view_len) };
        let Some(base) = NonNull::new(view.Value as *mut u8) else {
            let win_err = windows::core::Error::from_thread();
            unsafe {
                let _ = CloseHandle(handle);
            }
            return Err(ExtensionError::windows_api_error("MapViewOfFile", win_err));
        };

        let mapping = Self { handle, base, len: size, writable: config.access == AccessMode::ReadWrite };

        // Views are page-granular, so the mapping must cover at least the
        // announced size.
        let actual = mapping.region_size();
        if actual < size {
            return Err(ExtensionError::SizeMismatch {
                name: name.to_string(),
                expected: size as u64,
                actual: actual as u64,
            });
        }

        Ok(mapping)
    }

    pub(super) fn bytes(&self) -> &[u8] {
        unsafe { std::slice::from_raw_parts(self.base.as_ptr(), self.len) }
    }

    pub(super) fn bytes_mut(&mut self) -> Option<&mut [u8]> {
        if !self.writable {
            return None;
        }
        Some(unsafe { std::slice::from_raw_parts_mut(self.base.as_ptr(), self.len) })
    }

    fn region_size(&self) -> usize {
        let mut info = MEMORY_BASIC_INFORMATION::default();
        let written = unsafe {
            VirtualQuery(
                Some(self.base.as_ptr() as *const std::ffi::c_void),
                &mut info,
                std::mem::size_of::<MEMORY_BASIC_INFORMATION>(),
            )
        };
        if written == 0 { 0 } else { info.RegionSize }
    }
}

impl Drop for Mapping {
    fn drop(&mut self) {
        unsafe {
            let _ = UnmapViewOfFile(MEMORY_MAPPED_VIEW_ADDRESS {
                Value: self.base.as_ptr() as *mut std::ffi::c_void,
            });
            let _ = CloseHandle(self.handle);
        }
    }
}

fn wide_string(s: &str) -> Vec<u16> {
    s.encode_utf16().chain(std::iter::once(0)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unique_name(tag: &str) -> String {
        format!("Local\\framelink-{tag}-{}", std::process::id())
    }

    #[test]
    fn smaller_existing_mapping_is_a_size_mismatch() {
        let name = unique_name("mismatch");
        let create = SharedMemoryConfig::default()
            .with_policy(AttachPolicy::CreateIfMissing)
            .with_access(AccessMode::ReadWrite);
        let _owner = Mapping::open(&create, &name, 4096).unwrap();

        let err = Mapping::open(&SharedMemoryConfig::default(), &name, 1 << 20).err().unwrap();
        match err {
            ExtensionError::SizeMismatch { expected, actual, .. } => {
                assert_eq!(expected, 1 << 20);
                assert!(actual < expected);
            }
            other => panic!("Expected SizeMismatch, got {other:?}"),
        }
    }

    #[test]
    fn existing_mapping_attaches_at_announced_size() {
        let name = unique_name("attach");
        let create = SharedMemoryConfig::default()
            .with_policy(AttachPolicy::CreateIfMissing)
            .with_access(AccessMode::ReadWrite);
        let mut owner = Mapping::open(&create, &name, 4096).unwrap();
        owner.bytes_mut().unwrap()[..3].copy_from_slice(&[7, 8, 9]);

        let reader = Mapping::open(&SharedMemoryConfig::default(), &name, 4096).unwrap();
        assert_eq!(reader.bytes().len(), 4096);
        assert_eq!(&reader.bytes()[..3], &[7, 8, 9]);
    }
}
