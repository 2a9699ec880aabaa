use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::decoder::{self, Decoder, DecoderConfig};
use crate::error::ResultOkLogExt;

use super::cache::{CacheEntry, CgroupCache};
use super::handle::{FileHandleResolver, HandleResolver};
use super::search::PointSearch;
use super::walk::{FsWalker, TreeWalker};
use super::{Error, Result};

const LOG_TARGET: &str = "cgroup resolver";

/// Where the cgroup hierarchy is mounted unless configured otherwise.
pub const DEFAULT_CGROUP_ROOT: &str = "/sys/fs/cgroup";

/// How a [`Resolution`] was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionSource {
    /// Served from the cache, sentinels included.
    Cache,
    /// Found by the point search fast path.
    PointSearch,
    /// Found by a full refresh of the mapping.
    Refresh,
    /// Not found by a refresh; the label is the unknown sentinel.
    Unknown,
}

/// The label value for a cgroup id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub label: String,
    pub source: ResolutionSource,
}

/// Resolves cgroup ids to the paths of their cgroup directories.
///
/// Lookups are served from a cache. A miss first tries the optional point search
/// and then rebuilds the whole mapping from a tree walk. Ids that are still
/// missing afterwards are cached as `unknown_cgroup_id:<id>` so that repeated
/// lookups do not walk the tree again.
pub struct CgroupPathResolver {
    root: PathBuf,
    cache: CgroupCache,
    handles: Box<dyn HandleResolver + Send>,
    walker: Box<dyn TreeWalker + Send>,
    point_search: Option<Box<dyn PointSearch + Send>>,
    cache_unknown: bool,
    refresh_count: u64,
}

impl std::fmt::Debug for CgroupPathResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CgroupPathResolver")
            .field("root", &self.root)
            .field("cached", &self.cache.len())
            .field("point_search", &self.point_search.is_some())
            .field("cache_unknown", &self.cache_unknown)
            .field("refresh_count", &self.refresh_count)
            .finish()
    }
}

impl Default for CgroupPathResolver {
    fn default() -> Self {
        CgroupPathResolverBuilder::default().build()
    }
}

impl CgroupPathResolver {
    /// Creates a resolver for the hierarchy mounted at `root` with the default
    /// handle resolver and walker and without point search.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        CgroupPathResolverBuilder::default().root(root).build()
    }

    pub fn builder() -> CgroupPathResolverBuilder {
        CgroupPathResolverBuilder::default()
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the cached entry for `id` without touching the filesystem.
    pub fn cached(&self, id: u64) -> Option<&CacheEntry> {
        self.cache.get(id)
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    /// Number of full refreshes started by this resolver.
    pub fn refresh_count(&self) -> u64 {
        self.refresh_count
    }

    /// Resolves `id` to its label value.
    ///
    /// Never fails: refresh and search failures are logged and the lookup falls back
    /// to the cache contents, ending with the unknown sentinel.
    pub fn resolve(&mut self, id: u64) -> Resolution {
        if let Some(entry) = self.cache.get(id) {
            return Resolution {
                label: entry.label(id),
                source: ResolutionSource::Cache,
            };
        }

        log::debug!(target: LOG_TARGET, "cache miss for cgroup id {id}");

        if let Some(path) = self.point_search(id) {
            let label = path.to_string_lossy().into_owned();
            self.cache.insert_path(id, label.clone());
            return Resolution {
                label,
                source: ResolutionSource::PointSearch,
            };
        }

        self.refresh().ok_warn(LOG_TARGET);

        if let Some(entry) = self.cache.get(id) {
            return Resolution {
                label: entry.label(id),
                source: ResolutionSource::Refresh,
            };
        }

        log::debug!(target: LOG_TARGET, "cgroup id {id} not found below `{}`", self.root.display());
        if self.cache_unknown {
            self.cache.mark_unknown(id);
        }
        Resolution {
            label: CacheEntry::Unknown.label(id),
            source: ResolutionSource::Unknown,
        }
    }

    /// Rebuilds the id to path mapping from a walk of the whole hierarchy.
    ///
    /// A completed walk replaces the cache. A walk that aborts merges what it found
    /// into the cache and keeps every existing entry.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RefreshFailed`] if the walk aborted. Directories whose
    /// handle cannot be resolved are logged and skipped without failing the walk.
    pub fn refresh(&mut self) -> Result<()> {
        self.refresh_count += 1;

        let mut snapshot = HashMap::new();
        let handles = &self.handles;
        let mut visit = |path: &Path| match handles.resolve(path) {
            Ok(id) => {
                snapshot.insert(id, path.to_string_lossy().into_owned());
            }
            Err(source) => log::warn!(
                target: LOG_TARGET,
                "{}",
                Error::Handle {
                    path: path.to_path_buf(),
                    source
                }
            ),
        };
        let outcome = self.walker.walk(&self.root, &mut visit);

        match outcome {
            Ok(()) => {
                log::debug!(
                    target: LOG_TARGET,
                    "refreshed cgroup mapping below `{}`: {} entries",
                    self.root.display(),
                    snapshot.len()
                );
                self.cache.replace(snapshot);
                Ok(())
            }
            Err(err) => {
                let discovered = snapshot.len();
                self.cache.merge(snapshot);
                Err(Error::RefreshFailed {
                    discovered,
                    source: Box::new(err),
                })
            }
        }
    }

    fn point_search(&self, id: u64) -> Option<PathBuf> {
        let search = self.point_search.as_ref()?;
        match search.find(&self.root, id) {
            Ok(Some(path)) => Some(path),
            Ok(None) => {
                log::trace!(target: LOG_TARGET, "point search found no cgroup with id {id}");
                None
            }
            Err(err) => {
                log::warn!(target: LOG_TARGET, "{err}, falling back to full refresh");
                None
            }
        }
    }
}

impl Decoder for CgroupPathResolver {
    fn decode(&mut self, input: &[u8], _config: &DecoderConfig) -> decoder::Result<Vec<u8>> {
        let id: u64 = decoder::parse_integer(input)?;
        Ok(self.resolve(id).label.into_bytes())
    }
}

/// Builds a [`CgroupPathResolver`].
pub struct CgroupPathResolverBuilder {
    root: PathBuf,
    cache: CgroupCache,
    handles: Box<dyn HandleResolver + Send>,
    walker: Box<dyn TreeWalker + Send>,
    point_search: Option<Box<dyn PointSearch + Send>>,
    cache_unknown: bool,
}

impl Default for CgroupPathResolverBuilder {
    fn default() -> Self {
        Self {
            root: PathBuf::from(DEFAULT_CGROUP_ROOT),
            cache: CgroupCache::new(),
            handles: Box::new(FileHandleResolver),
            walker: Box::new(FsWalker),
            point_search: None,
            cache_unknown: true,
        }
    }
}

impl CgroupPathResolverBuilder {
    /// Sets the mount point of the cgroup hierarchy.
    pub fn root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    /// Seeds the cache, e.g. with entries known from a previous run.
    pub fn cache(mut self, cache: CgroupCache) -> Self {
        self.cache = cache;
        self
    }

    pub fn handle_resolver(mut self, handles: impl HandleResolver + Send + 'static) -> Self {
        self.handles = Box::new(handles);
        self
    }

    pub fn walker(mut self, walker: impl TreeWalker + Send + 'static) -> Self {
        self.walker = Box::new(walker);
        self
    }

    /// Enables the point search fast path tried before a full refresh.
    pub fn point_search(mut self, search: impl PointSearch + Send + 'static) -> Self {
        self.point_search = Some(Box::new(search));
        self
    }

    /// Controls whether ids missing after a refresh are cached as unknown.
    ///
    /// When disabled, every lookup of a missing id walks the tree again.
    pub fn cache_unknown(mut self, cache_unknown: bool) -> Self {
        self.cache_unknown = cache_unknown;
        self
    }

    pub fn build(self) -> CgroupPathResolver {
        CgroupPathResolver {
            root: self.root,
            cache: self.cache,
            handles: self.handles,
            walker: self.walker,
            point_search: self.point_search,
            cache_unknown: self.cache_unknown,
            refresh_count: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cgroup::handle::InodeResolver;
    use std::io;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    const ROOT: &str = "/sys/fs/cgroup";

    /// Serves a fixed list of directories and optionally aborts after some of them.
    #[derive(Clone, Default)]
    struct FakeWalker {
        dirs: Arc<Mutex<Vec<PathBuf>>>,
        fail_after: Option<usize>,
        walks: Arc<AtomicUsize>,
    }

    impl FakeWalker {
        fn with_dirs(dirs: &[&str]) -> Self {
            Self {
                dirs: Arc::new(Mutex::new(dirs.iter().map(PathBuf::from).collect())),
                ..Self::default()
            }
        }

        fn set_dirs(&self, dirs: &[&str]) {
            *self.dirs.lock().unwrap() = dirs.iter().map(PathBuf::from).collect();
        }

        fn walks(&self) -> usize {
            self.walks.load(Ordering::SeqCst)
        }
    }

    impl TreeWalker for FakeWalker {
        fn walk(&self, root: &Path, visit: &mut dyn FnMut(&Path)) -> Result<()> {
            self.walks.fetch_add(1, Ordering::SeqCst);
            for (i, dir) in self.dirs.lock().unwrap().iter().enumerate() {
                if self.fail_after == Some(i) {
                    return Err(Error::Walk {
                        path: root.join("broken"),
                        source: io::Error::from(io::ErrorKind::PermissionDenied),
                    });
                }
                visit(dir);
            }
            Ok(())
        }
    }

    /// Resolves ids from the trailing number of the directory name, e.g. `/x/cg-12` -> 12.
    struct SuffixHandles;

    impl HandleResolver for SuffixHandles {
        fn resolve(&self, path: &Path) -> io::Result<u64> {
            path.file_name()
                .and_then(|name| name.to_str())
                .and_then(|name| name.rsplit('-').next())
                .and_then(|id| id.parse().ok())
                .ok_or_else(|| io::Error::from(io::ErrorKind::Unsupported))
        }
    }

    struct FakeSearch {
        result: Option<PathBuf>,
        fail: bool,
        calls: Arc<AtomicUsize>,
    }

    impl PointSearch for FakeSearch {
        fn find(&self, _root: &Path, id: u64) -> Result<Option<PathBuf>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(Error::Search {
                    id,
                    source: io::Error::from(io::ErrorKind::NotFound),
                });
            }
            Ok(self.result.clone())
        }
    }

    fn resolver_with(walker: &FakeWalker) -> CgroupPathResolver {
        CgroupPathResolver::builder()
            .root(ROOT)
            .handle_resolver(SuffixHandles)
            .walker(walker.clone())
            .build()
    }

    fn decode(resolver: &mut CgroupPathResolver, input: &str) -> String {
        let out = resolver
            .decode(input.as_bytes(), &DecoderConfig::default())
            .unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_decode_cached_id_does_not_walk() {
        let walker = FakeWalker::default();
        let mut resolver = CgroupPathResolver::builder()
            .handle_resolver(SuffixHandles)
            .walker(walker.clone())
            .cache([(6, "cgroup_six".to_owned())].into_iter().collect())
            .build();

        assert_eq!(decode(&mut resolver, "6"), "cgroup_six");
        assert_eq!(walker.walks(), 0);
        assert_eq!(resolver.refresh_count(), 0);
    }

    #[test]
    fn test_decode_unknown_id_is_cached_as_sentinel() {
        let walker = FakeWalker::default();
        let mut resolver = CgroupPathResolver::builder()
            .handle_resolver(SuffixHandles)
            .walker(walker.clone())
            .cache([(7, "cgroup_seven".to_owned())].into_iter().collect())
            .build();

        assert_eq!(decode(&mut resolver, "6"), "unknown_cgroup_id:6");
        assert_eq!(resolver.cached(6), Some(&CacheEntry::Unknown));
        assert_eq!(walker.walks(), 1);

        assert_eq!(decode(&mut resolver, "6"), "unknown_cgroup_id:6");
        assert_eq!(walker.walks(), 1);
    }

    #[test]
    fn test_decode_twice_walks_once() {
        let walker = FakeWalker::with_dirs(&["/sys/fs/cgroup", "/sys/fs/cgroup/pod-42"]);
        let mut resolver = resolver_with(&walker);

        let first = resolver.resolve(42);
        let second = resolver.resolve(42);

        assert_eq!(first.label, "/sys/fs/cgroup/pod-42");
        assert_eq!(first.source, ResolutionSource::Refresh);
        assert_eq!(second.label, "/sys/fs/cgroup/pod-42");
        assert_eq!(second.source, ResolutionSource::Cache);
        assert_eq!(walker.walks(), 1);
    }

    #[test]
    fn test_refresh_merges_partial_results() {
        let walker = FakeWalker {
            fail_after: Some(2),
            ..FakeWalker::with_dirs(&[
                "/sys/fs/cgroup/a-1",
                "/sys/fs/cgroup/b-2",
                "/sys/fs/cgroup/c-3",
            ])
        };
        let mut resolver = CgroupPathResolver::builder()
            .handle_resolver(SuffixHandles)
            .walker(walker.clone())
            .cache([(9, "/sys/fs/cgroup/old-9".to_owned())].into_iter().collect())
            .build();

        let err = resolver.refresh().unwrap_err();
        assert!(matches!(err, Error::RefreshFailed { discovered: 2, .. }));

        assert!(resolver.cached(1).is_some());
        assert!(resolver.cached(2).is_some());
        assert!(resolver.cached(3).is_none());
        assert!(resolver.cached(9).is_some());
    }

    #[test]
    fn test_failed_refresh_degrades_to_unknown() {
        let walker = FakeWalker {
            fail_after: Some(1),
            ..FakeWalker::with_dirs(&["/sys/fs/cgroup/a-1", "/sys/fs/cgroup/b-2"])
        };
        let mut resolver = resolver_with(&walker);

        assert_eq!(decode(&mut resolver, "1"), "/sys/fs/cgroup/a-1");
        assert_eq!(decode(&mut resolver, "2"), "unknown_cgroup_id:2");
        assert_eq!(walker.walks(), 2);
    }

    #[test]
    fn test_refresh_replaces_on_success() {
        let walker = FakeWalker::with_dirs(&["/sys/fs/cgroup/a-1", "/sys/fs/cgroup/b-2"]);
        let mut resolver = resolver_with(&walker);
        resolver.refresh().unwrap();
        assert_eq!(resolver.cache_len(), 2);

        walker.set_dirs(&["/sys/fs/cgroup/a-1"]);
        resolver.refresh().unwrap();

        assert!(resolver.cached(1).is_some());
        assert!(resolver.cached(2).is_none());
        assert_eq!(resolver.cache_len(), 1);
    }

    #[test]
    fn test_refresh_skips_unresolvable_directories() {
        let walker = FakeWalker::with_dirs(&[
            "/sys/fs/cgroup/a-1",
            "/sys/fs/cgroup/no_handle",
            "/sys/fs/cgroup/c-3",
        ]);
        let mut resolver = resolver_with(&walker);

        resolver.refresh().unwrap();

        assert_eq!(resolver.cache_len(), 2);
        assert_eq!(
            resolver.cached(3),
            Some(&CacheEntry::Path("/sys/fs/cgroup/c-3".into()))
        );
    }

    #[test]
    fn test_point_search_hit_skips_refresh() {
        let walker = FakeWalker::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let mut resolver = CgroupPathResolver::builder()
            .handle_resolver(SuffixHandles)
            .walker(walker.clone())
            .point_search(FakeSearch {
                result: Some(PathBuf::from("/sys/fs/cgroup/found")),
                fail: false,
                calls: Arc::clone(&calls),
            })
            .build();

        let resolution = resolver.resolve(5);
        assert_eq!(resolution.label, "/sys/fs/cgroup/found");
        assert_eq!(resolution.source, ResolutionSource::PointSearch);
        assert_eq!(walker.walks(), 0);

        assert_eq!(resolver.resolve(5).source, ResolutionSource::Cache);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_point_search_failure_falls_back_to_refresh() {
        let walker = FakeWalker::with_dirs(&["/sys/fs/cgroup/x-5"]);
        let mut resolver = CgroupPathResolver::builder()
            .handle_resolver(SuffixHandles)
            .walker(walker.clone())
            .point_search(FakeSearch {
                result: None,
                fail: true,
                calls: Arc::new(AtomicUsize::new(0)),
            })
            .build();

        let resolution = resolver.resolve(5);
        assert_eq!(resolution.label, "/sys/fs/cgroup/x-5");
        assert_eq!(resolution.source, ResolutionSource::Refresh);
        assert_eq!(walker.walks(), 1);
    }

    #[test]
    fn test_without_unknown_caching_every_miss_walks() {
        let walker = FakeWalker::default();
        let mut resolver = CgroupPathResolver::builder()
            .handle_resolver(SuffixHandles)
            .walker(walker.clone())
            .cache_unknown(false)
            .build();

        assert_eq!(decode(&mut resolver, "6"), "unknown_cgroup_id:6");
        assert_eq!(decode(&mut resolver, "6"), "unknown_cgroup_id:6");
        assert!(resolver.cached(6).is_none());
        assert_eq!(walker.walks(), 2);
    }

    #[test]
    fn test_decode_malformed_input() {
        let walker = FakeWalker::default();
        let mut resolver = resolver_with(&walker);

        let err = resolver
            .decode(b"not-a-number", &DecoderConfig::default())
            .unwrap_err();
        assert!(matches!(err, decoder::Error::MalformedInput { .. }));
        assert_eq!(walker.walks(), 0);
    }

    #[test]
    fn test_resolve_real_tree_by_inode() {
        let dir = tempfile::tempdir().unwrap();
        let pod = dir.path().join("kubepods.slice/pod.slice");
        std::fs::create_dir_all(&pod).unwrap();
        let id = InodeResolver.resolve(&pod).unwrap();

        let mut resolver = CgroupPathResolver::builder()
            .root(dir.path())
            .handle_resolver(InodeResolver)
            .build();

        let resolution = resolver.resolve(id);
        assert_eq!(resolution.label, pod.to_string_lossy());
        assert_eq!(resolution.source, ResolutionSource::Refresh);

        std::fs::remove_dir(&pod).unwrap();
        resolver.refresh().unwrap();
        assert!(resolver.cached(id).is_none());
    }
}
