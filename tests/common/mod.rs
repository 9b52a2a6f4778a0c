#![allow(dead_code)]

use server_warden::{DaemonConfig, Supervisor};
use std::fs;
use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

pub const EXECUTABLE: &str = "ragemp-server";

/// A server that prints a line and then idles until signalled.
pub const SLEEPER: &str = "#!/bin/sh\necho booting\nexec sleep 30\n";

/// A server that ignores SIGTERM.
pub const STUBBORN: &str = "#!/bin/sh\ntrap '' TERM\necho stubborn\nwhile true; do sleep 1; done\n";

/// A server that exits immediately.
pub const CRASHER: &str = "#!/bin/sh\necho crashing\nexit 3\n";

/// Writes `base/id/ragemp-server` with `script` as an executable shell script.
pub fn install_server(base: &Path, id: &str, script: &str) {
    let dir = base.join(id);
    fs::create_dir_all(&dir).unwrap();
    let exe = dir.join(EXECUTABLE);
    fs::write(&exe, script).unwrap();
    fs::set_permissions(&exe, fs::Permissions::from_mode(0o755)).unwrap();
}

/// Builds a zip at `path` from `(name, contents, unix_mode)` entries.
/// Names ending in `/` become directories.
pub fn write_template(path: &Path, entries: &[(&str, &[u8], u32)]) {
    let file = fs::File::create(path).unwrap();
    let mut zip = ZipWriter::new(file);
    for (name, contents, mode) in entries {
        let options = SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Stored)
            .unix_permissions(*mode);
        if name.ends_with('/') {
            zip.add_directory(*name, options).unwrap();
        } else {
            zip.start_file(*name, options).unwrap();
            zip.write_all(contents).unwrap();
        }
    }
    zip.finish().unwrap();
}

/// A supervisor rooted in fresh temporary servers and templates directories.
pub struct Fixture {
    pub root: TempDir,
    pub supervisor: Supervisor,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_stop_timeout(Duration::from_secs(5))
    }

    pub fn with_stop_timeout(graceful: Duration) -> Self {
        let root = tempfile::tempdir().unwrap();
        let servers = root.path().join("servers");
        let templates = root.path().join("templates");
        fs::create_dir_all(&servers).unwrap();
        fs::create_dir_all(&templates).unwrap();

        let config = DaemonConfig {
            servers_path: servers,
            templates_path: templates,
            stop_timeout_secs: graceful.as_secs().max(1),
            kill_timeout_secs: 5,
            ..DaemonConfig::default()
        };

        Self {
            root,
            supervisor: Supervisor::new(config),
        }
    }

    pub fn servers(&self) -> &Path {
        &self.supervisor.config().servers_path
    }

    pub fn templates(&self) -> &Path {
        &self.supervisor.config().templates_path
    }

    /// Writes a minimal default template containing an executable sleeper.
    pub fn install_default_template(&self) {
        write_template(
            &self.templates().join("default.zip"),
            &[
                (EXECUTABLE, SLEEPER.as_bytes(), 0o644),
                ("conf.json", b"{\"maxplayers\": 10}\n", 0o644),
                ("resources/", b"", 0o755),
                ("resources/readme.txt", b"hello\n", 0o644),
            ],
        );
    }
}

/// Polls `check` until it holds or `timeout` elapses.
pub async fn eventually<F: Fn() -> bool>(timeout: Duration, check: F) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    check()
}
