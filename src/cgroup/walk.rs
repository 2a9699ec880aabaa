use std::path::Path;

use walkdir::WalkDir;

use super::{Error, Result};

/// Enumerates the directories of a cgroup hierarchy.
pub trait TreeWalker {
    /// Calls `visit` for `root` and every directory below it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Walk`] for the first directory that cannot be read. Directories
    /// visited before the failure have already been passed to `visit`.
    fn walk(&self, root: &Path, visit: &mut dyn FnMut(&Path)) -> Result<()>;
}

/// Walks the real filesystem without following symlinks.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsWalker;

impl TreeWalker for FsWalker {
    fn walk(&self, root: &Path, visit: &mut dyn FnMut(&Path)) -> Result<()> {
        for entry in WalkDir::new(root).follow_links(false) {
            let entry = entry.map_err(|err| Error::Walk {
                path: err.path().unwrap_or(root).to_path_buf(),
                source: err.into(),
            })?;
            if !entry.file_type().is_dir() {
                continue;
            }
            visit(entry.path());
        }
        Ok(())
    }
}
