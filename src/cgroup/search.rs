use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

use super::{Error, Result};

/// Looks up the directory of a single cgroup id without enumerating the whole tree.
pub trait PointSearch {
    /// Searches `root` for the directory whose id is `id`.
    ///
    /// Returns `Ok(None)` if the search ran and found nothing.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Search`] if the search could not run and
    /// [`Error::UnexpectedSearchOutput`] if its result is not a path below `root`.
    fn find(&self, root: &Path, id: u64) -> Result<Option<PathBuf>>;
}

/// Runs `find <root> -inum <id> -quit`, relying on cgroup ids being inode numbers.
#[derive(Debug, Clone)]
pub struct FindCommand {
    program: PathBuf,
}

impl Default for FindCommand {
    fn default() -> Self {
        Self {
            program: PathBuf::from("find"),
        }
    }
}

impl FindCommand {
    /// Uses `program` instead of the `find` found on `PATH`.
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl PointSearch for FindCommand {
    fn find(&self, root: &Path, id: u64) -> Result<Option<PathBuf>> {
        let output = Command::new(&self.program)
            .arg(root)
            .arg("-inum")
            .arg(id.to_string())
            .arg("-quit")
            .output()
            .map_err(|source| Error::Search { id, source })?;

        let found = parse_find_output(&String::from_utf8_lossy(&output.stdout), root, id);
        if output.status.success() {
            return found;
        }

        // `find` exits non-zero when any subdirectory is unreadable, even after a match.
        match found {
            Ok(Some(path)) => Ok(Some(path)),
            _ => Err(Error::Search {
                id,
                source: io::Error::other(format!(
                    "`{}` exited with {}: {}",
                    self.program.display(),
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                )),
            }),
        }
    }
}

/// Takes the first line of `find` output and checks that it lies below `root`.
fn parse_find_output(stdout: &str, root: &Path, id: u64) -> Result<Option<PathBuf>> {
    let Some(line) = stdout.lines().map(str::trim_end).find(|line| !line.is_empty()) else {
        return Ok(None);
    };

    let path = PathBuf::from(line);
    if path == root || !path.starts_with(root) {
        return Err(Error::UnexpectedSearchOutput {
            id,
            output: stdout.to_owned(),
        });
    }

    Ok(Some(path))
}
