//! Runtime configuration read from environment variables.
use std::path::PathBuf;

use crate::cgroup::{
    CgroupPathResolver, DEFAULT_CGROUP_ROOT, FileHandleResolver, FindCommand, InodeResolver,
};
use crate::container::{ContainerIDFromPIDResolver, DEFAULT_PROC_ROOT};
use crate::decoder::DecoderSet;

/// Name under which the cgroup path decoder is registered.
pub const CGROUP_DECODER: &str = "cgroup";
/// Name under which the docker container id decoder is registered.
pub const CONTAINER_ID_DECODER: &str = "docker_container_id_from_pid";

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid value `{value}` for environment variable `{name}`, expected {expected}")]
    InvalidValue {
        name: &'static str,
        value: String,
        expected: &'static str,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

/// How cgroup directories are mapped to ids during a refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleStrategy {
    FileHandle,
    Inode,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub cgroup_root: PathBuf,
    pub proc_root: PathBuf,
    pub point_search: bool,
    pub cache_unknown: bool,
    pub handle_strategy: HandleStrategy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cgroup_root: PathBuf::from(DEFAULT_CGROUP_ROOT),
            proc_root: PathBuf::from(DEFAULT_PROC_ROOT),
            point_search: false,
            cache_unknown: true,
            handle_strategy: HandleStrategy::FileHandle,
        }
    }
}

impl Config {
    /// Reads the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidValue`] if a boolean or strategy variable holds an
    /// unrecognized value.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from `lookup`, which maps a variable name to its value.
    ///
    /// When running inside a container, `ROOTFS_MOUNT_PATH` points at the host root
    /// and the default cgroup and proc roots are taken below it.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let rootfs = lookup("ROOTFS_MOUNT_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("/"));

        let cgroup_root = lookup("CGROUP_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|| rootfs.join("sys/fs/cgroup"));
        let proc_root = lookup("PROC_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|| rootfs.join("proc"));

        let point_search =
            parse_bool("CGROUP_POINT_SEARCH", lookup("CGROUP_POINT_SEARCH"), false)?;
        let cache_unknown =
            parse_bool("CGROUP_CACHE_UNKNOWN", lookup("CGROUP_CACHE_UNKNOWN"), true)?;
        let handle_strategy = match lookup("CGROUP_HANDLE_STRATEGY").as_deref() {
            None | Some("file-handle") => HandleStrategy::FileHandle,
            Some("inode") => HandleStrategy::Inode,
            Some(other) => {
                return Err(Error::InvalidValue {
                    name: "CGROUP_HANDLE_STRATEGY",
                    value: other.to_owned(),
                    expected: "`file-handle` or `inode`",
                });
            }
        };

        Ok(Self {
            cgroup_root,
            proc_root,
            point_search,
            cache_unknown,
            handle_strategy,
        })
    }

    pub fn cgroup_resolver(&self) -> CgroupPathResolver {
        let mut builder = CgroupPathResolver::builder()
            .root(&self.cgroup_root)
            .cache_unknown(self.cache_unknown);
        builder = match self.handle_strategy {
            HandleStrategy::FileHandle => builder.handle_resolver(FileHandleResolver),
            HandleStrategy::Inode => builder.handle_resolver(InodeResolver),
        };
        if self.point_search {
            builder = builder.point_search(FindCommand::default());
        }
        builder.build()
    }

    pub fn container_resolver(&self) -> ContainerIDFromPIDResolver {
        ContainerIDFromPIDResolver::new(&self.proc_root)
    }

    /// Registers both resolvers under [`CGROUP_DECODER`] and [`CONTAINER_ID_DECODER`].
    pub fn decoder_set(&self) -> DecoderSet {
        let mut set = DecoderSet::default();
        set.register(CGROUP_DECODER, self.cgroup_resolver());
        set.register(CONTAINER_ID_DECODER, self.container_resolver());
        set
    }
}

fn parse_bool(name: &'static str, value: Option<String>, default: bool) -> Result<bool> {
    let Some(value) = value else {
        return Ok(default);
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(Error::InvalidValue {
            name,
            value,
            expected: "a boolean",
        }),
    }
}
