use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use crate::decoder::{self, Decoder, DecoderConfig};

use super::{ContainerID, Error, Result};

const LOG_TARGET: &str = "container resolver";

/// Label emitted for processes that are not (or no longer) known to run in a docker container.
pub const NOT_A_CONTAINER: &str = "not-a-docker-container";

/// Cgroup path prefix of processes running inside a docker container.
pub const DOCKER_CGROUP_PREFIX: &str = "/docker/";

pub const DEFAULT_PROC_ROOT: &str = "/proc";

/// Docker membership of a process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Membership {
    Container(ContainerID),
    NotAContainer,
}

impl Membership {
    pub fn label(&self) -> &str {
        match self {
            Membership::Container(id) => id.as_ref(),
            Membership::NotAContainer => NOT_A_CONTAINER,
        }
    }
}

/// Determines membership from the lines of a `/proc/<pid>/cgroup` record.
///
/// Each line has the form `<hierarchy-id>:<controller-list>:<cgroup-path>`. Lines
/// with fewer than three fields and lines in the root cgroup (`/`) are skipped; the
/// first remaining line decides the outcome. Cgroup paths are kernel byte strings,
/// so lines are split as bytes and invalid UTF-8 is replaced in the returned id.
///
/// # Arguments
///
/// * `reader` - Buffered reader over the record.
/// * `origin` - Path of the record, used in error messages.
///
/// # Returns
///
/// `Ok(None)` if no line qualifies.
///
/// # Errors
///
/// Returns [`Error::ReadLine`] if reading a line fails.
pub fn parse_membership<R: BufRead>(mut reader: R, origin: &Path) -> Result<Option<Membership>> {
    let mut line = Vec::with_capacity(256);

    loop {
        line.clear();
        let read = reader
            .read_until(b'\n', &mut line)
            .map_err(|source| Error::ReadLine {
                path: origin.to_path_buf(),
                source,
            })?;
        if read == 0 {
            return Ok(None);
        }

        let mut end = line.len();
        while end > 0 && matches!(line[end - 1], b'\n' | b'\r') {
            end -= 1;
        }
        let mut fields = line[..end].splitn(3, |&b| b == b':');
        let (Some(_), Some(_), Some(cgroup_path)) = (fields.next(), fields.next(), fields.next())
        else {
            continue;
        };
        if cgroup_path == b"/" {
            continue;
        }

        if !cgroup_path.starts_with(DOCKER_CGROUP_PREFIX.as_bytes()) {
            return Ok(Some(Membership::NotAContainer));
        }

        let last_segment = cgroup_path.rsplit(|&b| b == b'/').next().unwrap_or_default();
        let id = ContainerID::new(String::from_utf8_lossy(last_segment));
        return Ok(Some(Membership::Container(id)));
    }
}

/// Resolves a process id to the id of the docker container running it.
#[derive(Debug, Clone)]
pub struct ContainerIDFromPIDResolver {
    proc_root: PathBuf,
}

impl Default for ContainerIDFromPIDResolver {
    fn default() -> Self {
        Self::new(DEFAULT_PROC_ROOT)
    }
}

impl ContainerIDFromPIDResolver {
    /// Creates a resolver reading process records below `proc_root`.
    pub fn new(proc_root: impl Into<PathBuf>) -> Self {
        Self {
            proc_root: proc_root.into(),
        }
    }

    /// Resolves the docker membership of `pid`.
    ///
    /// A record that cannot be opened, e.g. because the process exited, means
    /// [`Membership::NotAContainer`].
    ///
    /// # Errors
    ///
    /// - [`decoder::Error::ContainerIdNotFound`] if the record has no qualifying line.
    /// - [`decoder::Error::Container`] if the record cannot be read.
    pub fn resolve(&self, pid: u32) -> decoder::Result<Membership> {
        let path = self.proc_root.join(pid.to_string()).join("cgroup");
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(err) => {
                log::debug!(
                    target: LOG_TARGET,
                    "failed to open `{}`, marking pid {pid} as not a container: {err}",
                    path.display()
                );
                return Ok(Membership::NotAContainer);
            }
        };

        match parse_membership(BufReader::new(file), &path)? {
            Some(membership) => Ok(membership),
            None => Err(decoder::Error::ContainerIdNotFound { pid, path }),
        }
    }
}

impl Decoder for ContainerIDFromPIDResolver {
    fn decode(&mut self, input: &[u8], _config: &DecoderConfig) -> decoder::Result<Vec<u8>> {
        let pid: u32 = decoder::parse_integer(input)?;
        Ok(self.resolve(pid)?.label().as_bytes().to_vec())
    }
}
