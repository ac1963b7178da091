//! First-run preparation: directory tree, default service configs, and
//! database data directory initialization.
//!
//! Everything here is idempotent. Apart from the machine-owned FastCGI
//! include, existing files are never rewritten, so user edits to the
//! generated configs survive.

use crate::error::SupervisorResult;

use std::path::{Path, PathBuf};

use serde::Serialize;
use stackbox_config::{DirectoryLayout, StackConfig};
use tracing::info;

/// What a bootstrap pass actually did.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BootstrapReport {
    pub created_directories: Vec<PathBuf>,
    pub written_files: Vec<PathBuf>,
}

/// Create the directory tree and any missing generated files.
pub fn create_directory_structure(
    config: &StackConfig,
    layout: &DirectoryLayout,
) -> SupervisorResult<BootstrapReport> {
    let mut report = BootstrapReport {
        created_directories: layout.ensure()?,
        ..Default::default()
    };

    for version in &config.interpreter.versions {
        let dir = layout.interpreter_dir(version);
        if !dir.exists() {
            std::fs::create_dir_all(&dir)?;
            report.created_directories.push(dir);
        }
    }

    if ensure_web_server_config(config, layout)? {
        report.written_files.push(layout.config_dir().join("httpd.conf"));
    }
    report.written_files.push(write_fastcgi_config(config, layout)?);
    if ensure_database_config(config, layout)? {
        report.written_files.push(layout.config_dir().join("my.cnf"));
    }
    if ensure_welcome_page(layout)? {
        report.written_files.push(layout.document_root().join("index.html"));
    }

    Ok(report)
}

/// Write the default web server config if none exists. Returns whether
/// a file was written.
pub(crate) fn ensure_web_server_config(
    config: &StackConfig,
    layout: &DirectoryLayout,
) -> SupervisorResult<bool> {
    let path = layout.config_dir().join("httpd.conf");
    if path.exists() {
        return Ok(false);
    }

    let content = format!(
        r#"ServerRoot "{server_root}"
PidFile "{logs}/httpd.pid"
Listen {port}

LoadModule dir_module modules/mod_dir.so
LoadModule mime_module modules/mod_mime.so
LoadModule rewrite_module modules/mod_rewrite.so
LoadModule authz_core_module modules/mod_authz_core.so
LoadModule authz_host_module modules/mod_authz_host.so
LoadModule access_compat_module modules/mod_access_compat.so
LoadModule proxy_module modules/mod_proxy.so
LoadModule proxy_fcgi_module modules/mod_proxy_fcgi.so

ServerName localhost:{port}
DocumentRoot "{docroot}"

<Directory "{docroot}">
    Options Indexes FollowSymLinks
    AllowOverride All
    Require all granted
    DirectoryIndex index.html index.htm index.php
</Directory>

# Hand .php scripts to the active interpreter's FastCGI listener
Include "{config_dir}/fastcgi-active.conf"

TypesConfig conf/mime.types
AddType text/html .html .htm

ErrorLog "{logs}/web-server-error.log"
CustomLog "{logs}/web-server-access.log" common

ServerTokens Prod
ServerSignature Off
"#,
        server_root = unix_path(&layout.web_server_root()),
        logs = unix_path(&layout.log_dir()),
        port = config.web_server.port,
        docroot = unix_path(&layout.document_root()),
        config_dir = unix_path(&layout.config_dir()),
    );

    write_new(&path, &content)?;
    Ok(true)
}

/// Write the FastCGI handler include for the currently active
/// interpreter. Unlike the main config this file is rewritten on every
/// web server start, so switching versions takes effect on the next
/// start without clobbering user edits to httpd.conf.
pub(crate) fn write_fastcgi_config(
    config: &StackConfig,
    layout: &DirectoryLayout,
) -> SupervisorResult<PathBuf> {
    let path = layout.config_dir().join("fastcgi-active.conf");

    let fcgi_port = config
        .interpreter
        .port_for(&config.interpreter.active)
        .unwrap_or(config.interpreter.fastcgi_base_port);

    let content = format!(
        "# Generated on every web server start; do not edit.\n\
         # Interpreter {version} via FastCGI.\n\
         <FilesMatch \"\\.php$\">\n    \
         SetHandler \"proxy:fcgi://127.0.0.1:{fcgi_port}\"\n\
         </FilesMatch>\n",
        version = config.interpreter.active,
    );

    std::fs::write(&path, content)?;
    Ok(path)
}

/// Write the default database config if none exists.
pub(crate) fn ensure_database_config(
    config: &StackConfig,
    layout: &DirectoryLayout,
) -> SupervisorResult<bool> {
    let path = layout.config_dir().join("my.cnf");
    if path.exists() {
        return Ok(false);
    }

    let content = format!(
        r#"[mysqld]
port={port}
basedir={basedir}
datadir={datadir}
default-storage-engine=InnoDB
sql-mode="STRICT_TRANS_TABLES,NO_ZERO_DATE,NO_ZERO_IN_DATE,ERROR_FOR_DIVISION_BY_ZERO"
max_connections=100
table_open_cache=2000
tmp_table_size=16M
thread_cache_size=10
key_buffer_size=8M
sort_buffer_size=256K
skip-networking=false
bind-address=127.0.0.1

[mysql]
default-character-set=utf8mb4

[client]
port={port}
default-character-set=utf8mb4
"#,
        port = config.database.port,
        basedir = unix_path(&layout.database_root()),
        datadir = unix_path(&layout.database_data()),
    );

    write_new(&path, &content)?;
    Ok(true)
}

/// Populate the database data directory on first start by running the
/// server binary in initialize mode. A data directory with any content
/// is left alone.
pub(crate) async fn ensure_database_initialized(
    executable: &Path,
    layout: &DirectoryLayout,
) -> SupervisorResult<bool> {
    let data_dir = layout.database_data();
    if std::fs::read_dir(&data_dir)?.next().is_some() {
        return Ok(false);
    }

    info!(datadir = %data_dir.display(), "Initializing empty database data directory");

    let output = tokio::process::Command::new(executable)
        .arg("--initialize-insecure")
        .arg(format!("--basedir={}", layout.database_root().display()))
        .arg(format!("--datadir={}", data_dir.display()))
        .output()
        .await?;

    if output.status.success() {
        info!("Database data directory initialized");
        Ok(true)
    } else {
        Err(std::io::Error::other(format!(
            "database initialization failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        ))
        .into())
    }
}

fn ensure_welcome_page(layout: &DirectoryLayout) -> SupervisorResult<bool> {
    let path = layout.document_root().join("index.html");
    if path.exists() {
        return Ok(false);
    }
    write_new(
        &path,
        "<!DOCTYPE html>\n<html>\n<head><title>StackBox</title></head>\n\
         <body><h1>StackBox is running</h1></body>\n</html>\n",
    )?;
    Ok(true)
}

fn write_new(path: &Path, content: &str) -> SupervisorResult<()> {
    std::fs::write(path, content)?;
    info!(path = %path.display(), "Wrote default file");
    Ok(())
}

fn unix_path(path: &Path) -> String {
    path.display().to_string().replace('\\', "/")
}
