
use tempfile::TempDir;

/// Create a temp base directory for an isolated installation.
pub(crate) fn setup_base_dir() -> TempDir {
    TempDir::new().unwrap()
}
