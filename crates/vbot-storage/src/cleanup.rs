//! Expiry sweep for the temp directory.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::StorageResult;

/// Sweep settings.
#[derive(Debug, Clone)]
pub struct CleanupConfig {
    pub root: PathBuf,
    /// Files older than this are removed
    pub ttl: Duration,
    pub interval: Duration,
}

impl CleanupConfig {
    pub fn new(root: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self {
            root: root.into(),
            ttl,
            interval: Duration::from_secs(120),
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }
}

/// What a sweep removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupStats {
    pub files_removed: usize,
    pub dirs_removed: usize,
}

/// Delete a file or a directory tree. Missing paths are ignored.
pub async fn delete_path(path: &Path) -> StorageResult<()> {
    let meta = match tokio::fs::symlink_metadata(path).await {
        Ok(meta) => meta,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e.into()),
    };
    let result = if meta.is_dir() {
        tokio::fs::remove_dir_all(path).await
    } else {
        tokio::fs::remove_file(path).await
    };
    match result {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
        _ => Ok(()),
    }
}

/// Remove files under `root` last modified more than `ttl` ago, then any
/// directories left empty. `root` itself is kept.
pub async fn cleanup_expired_files(root: &Path, ttl: Duration) -> StorageResult<CleanupStats> {
    let mut stats = CleanupStats::default();
    if !tokio::fs::try_exists(root).await.unwrap_or(false) {
        return Ok(stats);
    }

    let now = SystemTime::now();
    let mut dirs = Vec::new();
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) => {
                debug!("Skipping {}: {}", dir.display(), e);
                continue;
            }
        };
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let Ok(meta) = entry.metadata().await else {
                continue;
            };
            if meta.is_dir() {
                pending.push(path.clone());
                dirs.push(path);
                continue;
            }

            let expired = meta
                .modified()
                .ok()
                .and_then(|m| now.duration_since(m).ok())
                .is_some_and(|age| age > ttl);
            if expired {
                match tokio::fs::remove_file(&path).await {
                    Ok(()) => stats.files_removed += 1,
                    Err(e) => debug!("Failed to remove {}: {}", path.display(), e),
                }
            }
        }
    }

    // Deepest first so parents are empty by the time they are checked.
    dirs.sort_by_key(|d| std::cmp::Reverse(d.components().count()));
    for dir in dirs {
        if tokio::fs::remove_dir(&dir).await.is_ok() {
            stats.dirs_removed += 1;
        }
    }

    Ok(stats)
}

/// Sweep every `interval` until `shutdown` flips to true.
///
/// `on_tick` runs after each sweep; the API uses it to purge expired
/// in-memory job records on the same schedule.
pub async fn run_periodic_cleanup<F, Fut>(
    config: CleanupConfig,
    mut shutdown: watch::Receiver<bool>,
    on_tick: F,
) where
    F: Fn() -> Fut,
    Fut: Future<Output = ()>,
{
    info!(
        "Starting temp cleanup for {} (ttl={:?}, interval={:?})",
        config.root.display(),
        config.ttl,
        config.interval
    );
    let mut ticker = tokio::time::interval(config.interval);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match cleanup_expired_files(&config.root, config.ttl).await {
                    Ok(stats) if stats != CleanupStats::default() => info!(
                        "Cleanup removed {} files and {} directories",
                        stats.files_removed, stats.dirs_removed
                    ),
                    Ok(_) => {}
                    Err(e) => warn!("Cleanup sweep failed: {}", e),
                }
                on_tick().await;
            }
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    info!("Temp cleanup stopped");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_fresh_files_survive() {
        let root = tempfile::tempdir().unwrap();
        let job = root.path().join("job1");
        tokio::fs::create_dir_all(&job).await.unwrap();
        tokio::fs::write(job.join("a.mp4"), b"x").await.unwrap();

        let stats = cleanup_expired_files(root.path(), Duration::from_secs(900)).await.unwrap();
        assert_eq!(stats, CleanupStats::default());
        assert!(job.join("a.mp4").exists());
    }

    #[tokio::test]
    async fn test_expired_files_and_empty_dirs_removed() {
        let root = tempfile::tempdir().unwrap();
        let job = root.path().join("job1").join("nested");
        tokio::fs::create_dir_all(&job).await.unwrap();
        tokio::fs::write(job.join("a.mp4"), b"x").await.unwrap();
        tokio::fs::write(root.path().join("loose.tmp"), b"x").await.unwrap();

        tokio::time::sleep(Duration::from_millis(20)).await;
        let stats = cleanup_expired_files(root.path(), Duration::from_millis(1)).await.unwrap();

        assert_eq!(stats.files_removed, 2);
        assert_eq!(stats.dirs_removed, 2);
        assert!(root.path().exists());
        assert!(!root.path().join("job1").exists());
    }

    #[tokio::test]
    async fn test_missing_root_is_noop() {
        let root = tempfile::tempdir().unwrap();
        let stats = cleanup_expired_files(&root.path().join("nope"), Duration::ZERO)
            .await
            .unwrap();
        assert_eq!(stats, CleanupStats::default());
    }

    #[tokio::test]
    async fn test_delete_path() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("d");
        tokio::fs::create_dir_all(dir.join("e")).await.unwrap();
        tokio::fs::write(dir.join("e").join("f"), b"x").await.unwrap();

        delete_path(&dir).await.unwrap();
        assert!(!dir.exists());
        delete_path(&dir).await.unwrap();
    }

    #[tokio::test]
    async fn test_periodic_cleanup_ticks_and_stops() {
        let root = tempfile::tempdir().unwrap();
        let ticks = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = watch::channel(false);

        let config = CleanupConfig::new(root.path(), Duration::from_secs(60))
            .with_interval(Duration::from_millis(10));
        let counter = ticks.clone();
        let handle = tokio::spawn(async move {
            run_periodic_cleanup(config, rx, move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                }
            })
            .await;
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        tx.send(true).unwrap();
        handle.await.unwrap();
        assert!(ticks.load(Ordering::SeqCst) >= 2);
    }
}
