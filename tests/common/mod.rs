//! Shared helpers for integration tests.
//!
//! [`FakeFfmpeg`] writes a small shell script standing in for ffmpeg so the
//! runner and progress monitor can be exercised without a real binary.

#![allow(dead_code)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use ffstage::Runner;
use tempfile::TempDir;

/// A throwaway executable named `ffmpeg` running the given shell body.
pub struct FakeFfmpeg {
    dir: TempDir,
    path: PathBuf,
}

impl FakeFfmpeg {
    pub fn new(body: &str) -> Self {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let path = dir.path().join("ffmpeg");
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("failed to write script");
        let mut perms = std::fs::metadata(&path)
            .expect("failed to stat script")
            .permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&path, perms).expect("failed to chmod script");
        Self { dir, path }
    }

    /// A script that writes `stream` to stderr and exits with `code`.
    pub fn emitting(stream: &str, code: i32) -> Self {
        Self::new(&format!("printf '%s' '{stream}' >&2\nexit {code}"))
    }

    /// Like [`new`](Self::new), but first writes the script's arguments to
    /// `args.txt` next to it. See [`recorded_args`](Self::recorded_args).
    pub fn recording(body: &str) -> Self {
        Self::new(&format!("echo \"$@\" > \"$(dirname \"$0\")/args.txt\"\n{body}"))
    }

    /// Arguments seen by the last [`recording`](Self::recording) run.
    pub fn recorded_args(&self) -> String {
        std::fs::read_to_string(self.sidecar("args.txt"))
            .expect("script did not record its arguments")
            .trim()
            .to_string()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A file inside the script's directory, for scripts that record things.
    pub fn sidecar(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    pub fn runner(&self) -> Runner {
        Runner::new(&self.path)
    }
}
