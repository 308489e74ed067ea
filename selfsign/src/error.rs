// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use {
    selfsign_windows::{ElevationError, ToolError, ToolInvocation},
    std::path::PathBuf,
    thiserror::Error,
};

/// Unified error type for the program.
///
/// The `Display` form names the operation that failed. Every error is fatal.
#[derive(Debug, Error)]
pub enum SelfSignError {
    #[error("elevation check")]
    ElevationQuery(#[source] ElevationError),

    #[error("elevated relaunch")]
    Relaunch(#[source] ElevationError),

    #[error("waiting {0} seconds for elevated relaunch")]
    RelaunchStillRunning(u64),

    #[error("resolving work directory")]
    WorkDir(#[source] std::io::Error),

    #[error("resolving target executable")]
    CurrentExe(#[source] std::io::Error),

    #[error("locating embedded payload {0}")]
    PayloadMissing(String),

    #[error("extracting empty embedded payload {0}")]
    PayloadEmpty(String),

    #[error("extracting {}", .path.display())]
    Extract {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("removing {}", .path.display())]
    RemoveArtifact {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{invocation}")]
    Tool {
        invocation: String,
        #[source]
        source: ToolError,
    },

    #[error("copying {} to {}", .from.display(), .to.display())]
    Copy {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl SelfSignError {
    /// Construct a [SelfSignError::Tool] from a failed invocation.
    pub fn tool(invocation: &ToolInvocation, source: ToolError) -> Self {
        Self::Tool {
            invocation: invocation.to_string(),
            source,
        }
    }

    /// The platform error code associated with the failure.
    ///
    /// Exit status for tool failures, raw OS error for I/O failures, 0 if neither applies.
    pub fn code(&self) -> i32 {
        match self {
            Self::ElevationQuery(e) | Self::Relaunch(e) => e.code(),
            Self::RelaunchStillRunning(_) | Self::PayloadMissing(_) | Self::PayloadEmpty(_) => 0,
            Self::WorkDir(e) | Self::CurrentExe(e) => e.raw_os_error().unwrap_or(0),
            Self::Extract { source, .. }
            | Self::RemoveArtifact { source, .. }
            | Self::Copy { source, .. } => source.raw_os_error().unwrap_or(0),
            Self::Tool { source, .. } => source.code(),
        }
    }

    /// The single line printed to stderr before exiting.
    pub fn diagnostic(&self) -> String {
        format!("{} failed GetLastEroor()={}", self, self.code())
    }
}

pub type Result<T, E = SelfSignError> = std::result::Result<T, E>;
