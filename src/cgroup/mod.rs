//! Resolution of cgroup ids to cgroup directory paths.
//!
//! Kernel event data identifies a cgroup by a 64-bit id. The only way to map such
//! an id back to a directory is to ask the kernel for the handle of every
//! directory in the hierarchy, so [`CgroupPathResolver`] keeps the mapping in a
//! cache and rebuilds it from a full tree walk when a lookup misses.
//!
//! # Key Components
//!
//! - [`CgroupPathResolver`] — the cache backed resolver and label decoder.
//! - [`HandleResolver`] — directory to id, via `name_to_handle_at(2)` or inode numbers.
//! - [`TreeWalker`] — enumerates the directories of the hierarchy.
//! - [`PointSearch`] — optional single id lookup tried before a full walk.
//!
//! # Platform Requirements
//!
//! - Linux with the cgroup hierarchy mounted, by default at `/sys/fs/cgroup`.
mod cache;
mod error;
mod handle;
mod resolver;
mod search;
mod walk;

pub use cache::{CacheEntry, CgroupCache, UNKNOWN_CGROUP_PREFIX};
pub use error::{Error, Result};
pub use handle::{FileHandleResolver, HandleResolver, InodeResolver};
pub use resolver::{
    CgroupPathResolver, CgroupPathResolverBuilder, DEFAULT_CGROUP_ROOT, Resolution,
    ResolutionSource,
};
pub use search::{FindCommand, PointSearch};
pub use walk::{FsWalker, TreeWalker};
