//! Database backup: recursive zip of the data directory.

use crate::error::SupervisorResult;

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use stackbox_config::DirectoryLayout;
use tracing::info;

#[derive(Debug, Clone, Serialize)]
pub struct BackupReport {
    pub archive: PathBuf,
    pub files: usize,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Archive the database data directory into config-backups/, named by
/// UTC timestamp so successive backups never collide.
///
/// Callers must ensure the database is in a consistent on-disk state
/// first; the command surface requires it to be running and uses the
/// server's own online-consistent files.
pub(crate) fn backup_database(layout: &DirectoryLayout) -> SupervisorResult<BackupReport> {
    let created_at = chrono::Utc::now();
    let archive = layout
        .backup_dir()
        .join(format!("db-backup-{}.zip", created_at.format("%Y%m%dT%H%M%SZ")));

    let file = std::fs::File::create(&archive)?;
    let mut zip = zip::ZipWriter::new(file);
    let options = zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated);

    let data_dir = layout.database_data();
    let mut files = 0usize;
    add_dir_recursive(&mut zip, options, &data_dir, &data_dir, &mut files)?;
    zip.finish()?;

    info!(archive = %archive.display(), files, "Database backup written");

    Ok(BackupReport {
        archive,
        files,
        created_at,
    })
}

fn add_dir_recursive(
    zip: &mut zip::ZipWriter<std::fs::File>,
    options: zip::write::SimpleFileOptions,
    root: &Path,
    dir: &Path,
    files: &mut usize,
) -> SupervisorResult<()> {
    for entry in std::fs::read_dir(dir)?.flatten() {
        let path = entry.path();
        // Archive names are relative to the data directory
        let name = path
            .strip_prefix(root)
            .unwrap_or(&path)
            .to_string_lossy()
            .replace('\\', "/");

        if path.is_dir() {
            zip.add_directory(format!("{name}/"), options)?;
            add_dir_recursive(zip, options, root, &path, files)?;
        } else if path.is_file() {
            zip.start_file(&name, options)?;
            let content = std::fs::read(&path)?;
            zip.write_all(&content)?;
            *files += 1;
        }
    }
    Ok(())
}
