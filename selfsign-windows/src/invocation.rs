// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Structured invocation of external command line tools.

Tools are never run through a shell. An invocation is a program path plus an
ordered list of arguments, which removes any quoting concerns from callers.
*/

use {
    log::{debug, info, warn},
    std::{
        ffi::{OsStr, OsString},
        fmt::{Display, Formatter},
        path::{Path, PathBuf},
    },
    thiserror::Error,
};

/// Error running an external tool.
#[derive(Debug, Error)]
pub enum ToolError {
    /// The process could not be started or waited on.
    #[error("failed to launch {program}: {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The process ran but did not exit successfully.
    #[error("{program} exited with {}", describe_code(.code))]
    Exit { program: String, code: Option<i32> },
}

fn describe_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {}", code),
        None => "no exit status".to_string(),
    }
}

impl ToolError {
    /// The best available platform code for this failure.
    ///
    /// This is the exit status for a tool that ran or the raw OS error for a
    /// tool that could not be launched.
    pub fn code(&self) -> i32 {
        match self {
            Self::Launch { source, .. } => source.raw_os_error().unwrap_or(0),
            Self::Exit { code, .. } => code.unwrap_or(0),
        }
    }
}

/// Describes a single execution of an external program.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ToolInvocation {
    program: PathBuf,
    args: Vec<OsString>,
    cwd: Option<PathBuf>,
}

impl ToolInvocation {
    pub fn new(program: impl AsRef<Path>) -> Self {
        Self {
            program: program.as_ref().to_path_buf(),
            args: vec![],
            cwd: None,
        }
    }

    /// Append a single argument.
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    /// Append several arguments, preserving their order.
    pub fn args(mut self, args: impl IntoIterator<Item = impl AsRef<OsStr>>) -> Self {
        self.args.extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    /// Set the working directory the process is started in.
    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.cwd = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn get_args(&self) -> &[OsString] {
        &self.args
    }

    pub fn get_current_dir(&self) -> Option<&Path> {
        self.cwd.as_deref()
    }

    /// The file name of the program, for messages.
    pub fn program_name(&self) -> String {
        self.program
            .file_name()
            .unwrap_or_else(|| self.program.as_os_str())
            .to_string_lossy()
            .to_string()
    }

    /// Arguments as lossy UTF-8 strings.
    pub fn args_lossy(&self) -> Vec<String> {
        self.args
            .iter()
            .map(|a| a.to_string_lossy().to_string())
            .collect()
    }
}

impl Display for ToolInvocation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.program_name())?;

        for arg in self.args_lossy() {
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, " \"{}\"", arg)?;
            } else {
                write!(f, " {}", arg)?;
            }
        }

        Ok(())
    }
}

/// The result of a finished tool execution.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ToolOutput {
    /// Exit code. `None` if the process was terminated without one.
    pub code: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl ToolOutput {
    /// Construct an instance describing a process that exited with `code`.
    pub fn exited(code: i32) -> Self {
        Self {
            code: Some(code),
            ..Default::default()
        }
    }

    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Lines of stdout followed by lines of stderr.
    pub fn lines(&self) -> Vec<String> {
        let stdout = String::from_utf8_lossy(&self.stdout);
        let stderr = String::from_utf8_lossy(&self.stderr);

        stdout
            .lines()
            .chain(stderr.lines())
            .map(|l| l.to_string())
            .collect()
    }
}

/// Something capable of executing a [ToolInvocation].
pub trait ToolRunner {
    /// Execute the invocation and wait for it to finish.
    ///
    /// A process that runs and exits with a non-zero status is not an error
    /// here: the status is reported in the returned [ToolOutput].
    fn run(&self, invocation: &ToolInvocation) -> Result<ToolOutput, ToolError>;

    /// Execute the invocation and turn a non-zero exit into an error.
    fn run_checked(&self, invocation: &ToolInvocation) -> Result<ToolOutput, ToolError> {
        let output = self.run(invocation)?;

        if output.success() {
            Ok(output)
        } else {
            Err(ToolError::Exit {
                program: invocation.program_name(),
                code: output.code,
            })
        }
    }
}

/// A [ToolRunner] that spawns real processes via `duct`.
#[derive(Clone, Copy, Debug, Default)]
pub struct DuctRunner;

impl ToolRunner for DuctRunner {
    fn run(&self, invocation: &ToolInvocation) -> Result<ToolOutput, ToolError> {
        info!("running {}", invocation);

        let mut expression = duct::cmd(invocation.program(), invocation.get_args())
            .stdout_capture()
            .stderr_capture()
            .unchecked();

        if let Some(cwd) = invocation.get_current_dir() {
            expression = expression.dir(cwd);
        }

        let output = expression.run().map_err(|source| ToolError::Launch {
            program: invocation.program_name(),
            source,
        })?;

        let output = ToolOutput {
            code: output.status.code(),
            stdout: output.stdout,
            stderr: output.stderr,
        };

        for line in output.lines() {
            if output.success() {
                debug!("{}", line);
            } else {
                warn!("{}", line);
            }
        }

        Ok(output)
    }
}
