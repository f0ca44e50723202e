//! Scratch space for strategy attempts.
//!
//! Every attempt that touches the filesystem does so inside a [`TempScope`]:
//! one randomly named directory under the OS temp root that is removed — with
//! everything in it — when the scope is dropped, on every exit path (normal
//! return, `?` propagation, or panic). Deletion failures are swallowed;
//! deleting an already-deleted scope is a no-op.
//!
//! Path uniqueness across concurrent operations comes from the random
//! directory name, so no locking is involved anywhere in the engine. This is
//! the only place cleanup logic lives: pipelines never delete temp files
//! themselves.

use crate::error::PdfMillError;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use tempfile::TempDir;

/// Directory-name prefix shared by every scope.
///
/// A filesystem scan for this prefix after an operation completes must come
/// back empty; the hygiene tests rely on it.
pub const SCRATCH_PREFIX: &str = "pdfmill-";

/// A self-cleaning directory owning every temp path of one unit of work.
pub struct TempScope {
    dir: TempDir,
    seq: AtomicU32,
}

impl TempScope {
    /// Create a fresh scope under the OS temp root.
    pub fn new() -> Result<Self, PdfMillError> {
        let dir = tempfile::Builder::new()
            .prefix(SCRATCH_PREFIX)
            .tempdir()
            .map_err(|source| PdfMillError::ScratchSetupFailed { source })?;
        Ok(Self {
            dir,
            seq: AtomicU32::new(0),
        })
    }

    /// Root directory of this scope.
    ///
    /// Handed to tools that name their own output files; everything under it
    /// is deleted when the scope drops.
    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    /// Allocate a fresh, unique path inside the scope.
    ///
    /// Nothing is created on disk; the path is simply reserved by the
    /// sequence number so two allocations never collide even for equal names.
    pub fn allocate(&self, name: &str) -> PathBuf {
        let n = self.seq.fetch_add(1, Ordering::Relaxed);
        self.dir.path().join(format!("{n:02}-{name}"))
    }

    /// Write `bytes` to a freshly allocated path and return that path.
    pub async fn write(&self, name: &str, bytes: &[u8]) -> Result<PathBuf, PdfMillError> {
        let path = self.allocate(name);
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|source| PdfMillError::ScratchSetupFailed { source })?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocated_paths_are_unique_even_for_equal_names() {
        let scope = TempScope::new().unwrap();
        let a = scope.allocate("input.pdf");
        let b = scope.allocate("input.pdf");
        assert_ne!(a, b);
        assert!(a.starts_with(scope.dir()));
        assert!(b.starts_with(scope.dir()));
    }

    #[test]
    fn concurrent_scopes_do_not_collide() {
        let a = TempScope::new().unwrap();
        let b = TempScope::new().unwrap();
        assert_ne!(a.dir(), b.dir());
        for scope in [&a, &b] {
            let name = scope.dir().file_name().unwrap().to_string_lossy();
            assert!(name.starts_with(SCRATCH_PREFIX), "got: {name}");
        }
    }

    #[tokio::test]
    async fn everything_is_removed_on_drop() {
        let scope = TempScope::new().unwrap();
        let root = scope.dir().to_path_buf();
        let file = scope.write("payload.bin", b"0123456789").await.unwrap();
        assert!(file.exists());

        drop(scope);
        assert!(!file.exists());
        assert!(!root.exists());
    }

    #[test]
    fn cleanup_runs_on_the_error_path_too() {
        fn doomed(root_out: &mut PathBuf) -> Result<(), PdfMillError> {
            let scope = TempScope::new()?;
            *root_out = scope.dir().to_path_buf();
            std::fs::write(scope.allocate("x"), b"x")
                .map_err(|source| PdfMillError::ScratchSetupFailed { source })?;
            Err(PdfMillError::Internal("simulated failure".into()))
        }

        let mut root = PathBuf::new();
        assert!(doomed(&mut root).is_err());
        assert!(!root.exists());
    }

    #[test]
    fn double_deletion_is_quiet() {
        let scope = TempScope::new().unwrap();
        std::fs::remove_dir_all(scope.dir()).unwrap();
        drop(scope); // must not panic
    }
}
