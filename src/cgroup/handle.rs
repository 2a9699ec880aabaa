use std::io;
use std::path::Path;

/// Maps a cgroup directory to the 64-bit id the kernel reports for it.
pub trait HandleResolver {
    /// Resolves the id of the directory at `path`.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the id cannot be determined for this directory.
    fn resolve(&self, path: &Path) -> io::Result<u64>;
}

/// Resolves ids through `name_to_handle_at(2)`.
///
/// The 8 handle bytes are read in host byte order, which is the order the kernel
/// uses for cgroup ids handed to eBPF programs.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileHandleResolver;

/// Resolves ids from the directory inode number.
///
/// On cgroup v2 the inode number of a cgroup directory is its cgroup id.
#[derive(Debug, Default, Clone, Copy)]
pub struct InodeResolver;

impl HandleResolver for InodeResolver {
    fn resolve(&self, path: &Path) -> io::Result<u64> {
        use std::os::unix::fs::MetadataExt;
        Ok(std::fs::metadata(path)?.ino())
    }
}

#[cfg(target_os = "linux")]
impl HandleResolver for FileHandleResolver {
    fn resolve(&self, path: &Path) -> io::Result<u64> {
        sys::name_to_handle_id(path)
    }
}

#[cfg(not(target_os = "linux"))]
impl HandleResolver for FileHandleResolver {
    fn resolve(&self, _path: &Path) -> io::Result<u64> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "name_to_handle_at is only available on linux",
        ))
    }
}

#[cfg(target_os = "linux")]
mod sys {
    use std::ffi::CString;
    use std::io;
    use std::os::unix::ffi::OsStrExt;
    use std::path::Path;

    const MAX_HANDLE_SZ: usize = 128;
    const CGROUP_HANDLE_LEN: usize = std::mem::size_of::<u64>();

    /// `struct file_handle` with room for the largest handle the kernel returns.
    #[repr(C)]
    struct FileHandle {
        handle_bytes: libc::c_uint,
        handle_type: libc::c_int,
        f_handle: [u8; MAX_HANDLE_SZ],
    }

    pub(super) fn name_to_handle_id(path: &Path) -> io::Result<u64> {
        let c_path = CString::new(path.as_os_str().as_bytes())
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidInput, err))?;

        let mut handle = FileHandle {
            handle_bytes: MAX_HANDLE_SZ as libc::c_uint,
            handle_type: 0,
            f_handle: [0; MAX_HANDLE_SZ],
        };
        let mut mount_id: libc::c_int = 0;

        // SAFETY: `c_path` is a valid NUL terminated string, `handle` is a
        // `struct file_handle` whose `handle_bytes` matches its buffer size and
        // `mount_id` is a valid `int` location. All outlive the call.
        let ret = unsafe {
            libc::syscall(
                libc::SYS_name_to_handle_at,
                libc::AT_FDCWD,
                c_path.as_ptr(),
                &mut handle as *mut FileHandle,
                &mut mount_id as *mut libc::c_int,
                0 as libc::c_int,
            )
        };
        if ret != 0 {
            return Err(io::Error::last_os_error());
        }

        let len = handle.handle_bytes as usize;
        if len != CGROUP_HANDLE_LEN {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("expected a {CGROUP_HANDLE_LEN} byte handle, got {len} bytes"),
            ));
        }

        let mut raw = [0u8; CGROUP_HANDLE_LEN];
        raw.copy_from_slice(&handle.f_handle[..CGROUP_HANDLE_LEN]);
        Ok(u64::from_ne_bytes(raw))
    }
}
