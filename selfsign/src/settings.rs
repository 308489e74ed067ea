// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Run-time configuration threaded through every step.

use {
    selfsign_windows::RelaunchWait,
    std::path::{Path, PathBuf},
};

/// Timestamp server used when signing.
pub const DEFAULT_TIMESTAMP_URL: &str = "http://timestamp.digicert.com";

pub const MAKECERT_EXE: &str = "makecert.exe";
pub const PVK2PFX_EXE: &str = "pvk2pfx.exe";
pub const SIGNTOOL_EXE: &str = "signtool.exe";
pub const CERTUTIL_EXE: &str = "certutil.exe";

/// Settings for a run of the program.
#[derive(Clone, Debug)]
pub struct Settings {
    /// Directory holding certificate artifacts and extracted tools.
    pub work_dir: PathBuf,

    /// URL of the timestamp server passed to signtool.
    pub timestamp_url: String,

    /// Whether to acquire elevation before doing anything.
    pub elevate: bool,

    /// How long to wait on an elevated child.
    pub elevation_wait: RelaunchWait,
}

impl Settings {
    /// Construct an instance with default values operating in `work_dir`.
    pub fn new(work_dir: impl AsRef<Path>) -> Self {
        Self {
            work_dir: work_dir.as_ref().to_path_buf(),
            timestamp_url: DEFAULT_TIMESTAMP_URL.to_string(),
            elevate: true,
            elevation_wait: RelaunchWait::Forever,
        }
    }

    /// Resolve a work directory relative file name.
    pub fn path(&self, name: impl AsRef<Path>) -> PathBuf {
        self.work_dir.join(name)
    }

    /// Resolve the location of each external tool.
    pub fn tool_paths(&self) -> ToolPaths {
        ToolPaths::resolve(&self.work_dir)
    }
}

/// Locations of the external tools.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ToolPaths {
    pub makecert: PathBuf,
    pub pvk2pfx: PathBuf,
    pub signtool: PathBuf,
    pub certutil: PathBuf,
}

impl ToolPaths {
    /// Tools bundled with the program live in the work directory.
    ///
    /// `certutil.exe` ships with Windows. A copy in the work directory takes
    /// precedence over one found on `PATH`.
    pub fn resolve(work_dir: &Path) -> Self {
        let local_certutil = work_dir.join(CERTUTIL_EXE);

        let certutil = if local_certutil.exists() {
            local_certutil
        } else {
            which::which(CERTUTIL_EXE).unwrap_or_else(|_| PathBuf::from(CERTUTIL_EXE))
        };

        Self {
            makecert: work_dir.join(MAKECERT_EXE),
            pvk2pfx: work_dir.join(PVK2PFX_EXE),
            signtool: work_dir.join(SIGNTOOL_EXE),
            certutil,
        }
    }
}
