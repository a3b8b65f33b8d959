//! Memory-mapped peripheral window over `/dev/mem`
//!
//! The only place in the crate that holds a raw pointer into the register
//! window. Everything else reaches the hardware through [`RegisterBus`].

use std::fs::OpenOptions;
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::AsRawFd;
use std::ptr::NonNull;

use super::registers::WINDOW_LEN;
use super::RegisterBus;
use crate::error::HardwareError;

/// Physical memory device
pub const DEV_MEM: &str = "/dev/mem";

/// Shared read/write mapping of the peripheral window
pub struct MmioBus {
    base: NonNull<u8>,
    len: usize,
    phys: u64,
}

// The mapping is process-wide device memory; every access is a single
// volatile load or store.
unsafe impl Send for MmioBus {}
unsafe impl Sync for MmioBus {}

impl MmioBus {
    /// Map `WINDOW_LEN` bytes of physical memory starting at `phys`
    pub fn open(phys: u64) -> Result<Self, HardwareError> {
        let page = page_size();
        if phys % page as u64 != 0 {
            return Err(HardwareError::UnalignedBase(phys));
        }
        let offset = libc::off_t::try_from(phys).map_err(|_| HardwareError::Map {
            base: phys,
            source: std::io::Error::from_raw_os_error(libc::EOVERFLOW),
        })?;

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_SYNC)
            .open(DEV_MEM)
            .map_err(|source| HardwareError::Open {
                path: DEV_MEM.to_string(),
                source,
            })?;

        // SAFETY: a fresh shared mapping; the kernel validates the range
        let ptr = unsafe {
            libc::mmap(
                std::ptr::null_mut(),
                WINDOW_LEN,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_SHARED,
                file.as_raw_fd(),
                offset,
            )
        };
        if ptr == libc::MAP_FAILED {
            return Err(HardwareError::Map {
                base: phys,
                source: std::io::Error::last_os_error(),
            });
        }
        // The mapping outlives the descriptor, which closes here
        drop(file);

        let base = NonNull::new(ptr.cast::<u8>()).ok_or_else(|| HardwareError::Map {
            base: phys,
            source: std::io::Error::from_raw_os_error(libc::EFAULT),
        })?;

        tracing::debug!("Mapped {:#x} bytes of peripheral space at {:#010x}", WINDOW_LEN, phys);

        Ok(Self {
            base,
            len: WINDOW_LEN,
            phys,
        })
    }

    /// Physical address of the window
    pub fn physical_base(&self) -> u64 {
        self.phys
    }

    fn register(&self, offset: usize) -> *mut u32 {
        assert!(
            offset % 4 == 0 && offset + 4 <= self.len,
            "register offset {:#x} outside window",
            offset
        );
        // SAFETY: bounds and alignment checked above
        unsafe { self.base.as_ptr().add(offset).cast::<u32>() }
    }
}

impl RegisterBus for MmioBus {
    fn read32(&self, offset: usize) -> u32 {
        // SAFETY: aligned, in-bounds pointer into a live device mapping
        unsafe { self.register(offset).read_volatile() }
    }

    fn write32(&self, offset: usize, value: u32) {
        // SAFETY: aligned, in-bounds pointer into a live device mapping
        unsafe { self.register(offset).write_volatile(value) }
    }
}

impl Drop for MmioBus {
    fn drop(&mut self) {
        // SAFETY: unmapping exactly what `open` mapped
        unsafe {
            libc::munmap(self.base.as_ptr().cast(), self.len);
        }
    }
}

fn page_size() -> usize {
    // SAFETY: sysconf has no preconditions
    let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    if size > 0 {
        size as usize
    } else {
        4096
    }
}
