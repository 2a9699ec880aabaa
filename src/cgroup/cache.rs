use std::collections::HashMap;

/// Prefix of the label emitted for a cgroup id that no directory resolves to.
pub const UNKNOWN_CGROUP_PREFIX: &str = "unknown_cgroup_id:";

/// A resolved cgroup id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheEntry {
    /// Absolute path of the cgroup directory.
    Path(String),
    /// A refresh completed and still found no directory with this id.
    Unknown,
}

impl CacheEntry {
    /// Renders the label value for this entry.
    pub fn label(&self, id: u64) -> String {
        match self {
            CacheEntry::Path(path) => path.clone(),
            CacheEntry::Unknown => format!("{UNKNOWN_CGROUP_PREFIX}{id}"),
        }
    }
}

/// In-memory cgroup id to path mapping.
#[derive(Debug, Default)]
pub struct CgroupCache {
    entries: HashMap<u64, CacheEntry>,
}

impl CgroupCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: u64) -> Option<&CacheEntry> {
        self.entries.get(&id)
    }

    pub fn insert_path(&mut self, id: u64, path: impl Into<String>) {
        self.entries.insert(id, CacheEntry::Path(path.into()));
    }

    pub fn mark_unknown(&mut self, id: u64) {
        self.entries.insert(id, CacheEntry::Unknown);
    }

    /// Replaces every entry, sentinels included, with a completed snapshot.
    pub fn replace(&mut self, snapshot: HashMap<u64, String>) {
        self.entries = snapshot
            .into_iter()
            .map(|(id, path)| (id, CacheEntry::Path(path)))
            .collect();
    }

    /// Adds the entries of a partial snapshot without dropping existing ones.
    pub fn merge(&mut self, snapshot: HashMap<u64, String>) {
        self.entries.extend(
            snapshot
                .into_iter()
                .map(|(id, path)| (id, CacheEntry::Path(path))),
        );
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(u64, String)> for CgroupCache {
    fn from_iter<I: IntoIterator<Item = (u64, String)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(id, path)| (id, CacheEntry::Path(path)))
                .collect(),
        }
    }
}
