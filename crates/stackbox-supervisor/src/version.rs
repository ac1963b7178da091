//! Best-effort version probing of the bundled binaries.
//!
//! Only the diagnostics surface calls this; routine status reads never
//! spawn anything.

use std::path::Path;
use std::time::Duration;

use stackbox_config::ServiceKind;
use tracing::debug;

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Run the binary's version flag and pull the version number out of
/// whatever banner it prints. `None` when the binary is absent, hangs,
/// or prints something unrecognized.
pub async fn probe_version(executable: &Path, kind: ServiceKind) -> Option<String> {
    let flag = match kind {
        ServiceKind::WebServer => "-v",
        ServiceKind::Database => "--version",
        ServiceKind::Interpreter => "-v",
    };

    let result = tokio::time::timeout(
        PROBE_TIMEOUT,
        tokio::process::Command::new(executable).arg(flag).output(),
    )
    .await;

    let output = match result {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => {
            debug!(executable = %executable.display(), error = %e, "Version probe failed");
            return None;
        }
        Err(_) => {
            debug!(executable = %executable.display(), "Version probe timed out");
            return None;
        }
    };

    let banner = String::from_utf8_lossy(&output.stdout);
    parse_version_output(kind, &banner)
}

/// Extract the version number from a binary's banner line.
///
/// Banners look like `Server version: Apache/2.4.58 (Unix)`,
/// `mysqld  Ver 8.0.36 for Linux ...`, `PHP 8.2.15 (cli) ...`.
pub(crate) fn parse_version_output(kind: ServiceKind, banner: &str) -> Option<String> {
    match kind {
        ServiceKind::WebServer => token_after(banner, "Apache/"),
        ServiceKind::Database => token_after(banner, "Ver "),
        ServiceKind::Interpreter => token_after(banner, "PHP "),
    }
}

fn token_after(banner: &str, marker: &str) -> Option<String> {
    let rest = &banner[banner.find(marker)? + marker.len()..];
    let token: String = rest
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    (!token.is_empty()).then_some(token)
}
