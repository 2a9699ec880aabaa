//! Container membership of processes.
//!
//! [`ContainerIDFromPIDResolver`] reads `/proc/<pid>/cgroup` and reports the docker
//! container a process belongs to.
use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

mod error;
mod pid;

pub use error::{Error, Result};
pub use pid::{
    ContainerIDFromPIDResolver, DEFAULT_PROC_ROOT, DOCKER_CGROUP_PREFIX, Membership,
    NOT_A_CONTAINER, parse_membership,
};

/// The id of a container, taken verbatim from its cgroup path.
///
/// # Examples
///
/// ```
/// # use cgroup_labels::container::ContainerID;
/// let container_id = ContainerID::new("abc123");
/// assert_eq!(container_id.as_ref(), "abc123");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContainerID(Arc<str>);

impl ContainerID {
    pub fn new(src: impl AsRef<str>) -> Self {
        Self(src.as_ref().into())
    }
}

impl AsRef<str> for ContainerID {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for ContainerID {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContainerID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
