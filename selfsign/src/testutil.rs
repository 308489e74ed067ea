// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use {
    crate::settings::{Settings, ToolPaths},
    selfsign_windows::{ToolError, ToolInvocation, ToolOutput, ToolRunner},
    std::{
        cell::{Cell, RefCell},
        path::{Path, PathBuf},
    },
};

/// A [ToolRunner] standing in for the Windows SDK tools.
///
/// `makecert.exe` writes its `-sv` key and certificate output with content
/// unique to each invocation. `pvk2pfx.exe` writes the concatenation of its
/// inputs. Other tools only record that they ran.
#[derive(Default)]
pub struct FakeToolRunner {
    calls: RefCell<Vec<(String, Vec<String>)>>,
    failures: RefCell<Vec<(String, String, i32)>>,
    generation: Cell<usize>,
}

impl FakeToolRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make invocations of `program` having `arg` exit with `code`.
    pub fn fail_when(&self, program: &str, arg: &str, code: i32) {
        self.failures
            .borrow_mut()
            .push((program.to_string(), arg.to_string(), code));
    }

    /// All recorded invocations as program file name and arguments.
    pub fn calls(&self) -> Vec<(String, Vec<String>)> {
        self.calls.borrow().clone()
    }

    /// Names of programs invoked, in order.
    pub fn programs(&self) -> Vec<String> {
        self.calls.borrow().iter().map(|(p, _)| p.clone()).collect()
    }

    pub fn count(&self, program: &str) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|(p, _)| p == program)
            .count()
    }

    pub fn clear(&self) {
        self.calls.borrow_mut().clear();
    }

    fn value_after(args: &[String], flag: &str) -> Option<String> {
        args.iter()
            .position(|a| a == flag)
            .and_then(|i| args.get(i + 1))
            .cloned()
    }

    fn simulate(&self, cwd: &Path, program: &str, args: &[String]) -> std::io::Result<()> {
        match program {
            "makecert.exe" => {
                let generation = self.generation.get() + 1;
                self.generation.set(generation);

                if let Some(key) = Self::value_after(args, "-sv") {
                    std::fs::write(cwd.join(&key), format!("key {} #{}", key, generation))?;
                }
                if let Some(cert) = args.last() {
                    std::fs::write(cwd.join(cert), format!("cert {} #{}", cert, generation))?;
                }
            }
            "pvk2pfx.exe" => {
                let pvk = Self::value_after(args, "-pvk").unwrap_or_default();
                let spc = Self::value_after(args, "-spc").unwrap_or_default();
                let pfx = Self::value_after(args, "-pfx").unwrap_or_default();

                let mut data = std::fs::read(cwd.join(pvk))?;
                data.extend(std::fs::read(cwd.join(spc))?);
                std::fs::write(cwd.join(pfx), data)?;
            }
            _ => {}
        }

        Ok(())
    }
}

impl ToolRunner for FakeToolRunner {
    fn run(&self, invocation: &ToolInvocation) -> Result<ToolOutput, ToolError> {
        let program = invocation.program_name();
        let args = invocation.args_lossy();

        self.calls.borrow_mut().push((program.clone(), args.clone()));

        if let Some((_, _, code)) = self
            .failures
            .borrow()
            .iter()
            .find(|(p, a, _)| p == &program && args.contains(a))
        {
            return Ok(ToolOutput::exited(*code));
        }

        let cwd = invocation
            .get_current_dir()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));

        self.simulate(&cwd, &program, &args)
            .map_err(|source| ToolError::Launch { program, source })?;

        Ok(ToolOutput::exited(0))
    }
}

/// Settings for a work directory, with elevation disabled.
pub fn test_settings(work_dir: &Path) -> Settings {
    let mut settings = Settings::new(work_dir);
    settings.elevate = false;

    settings
}

/// Tool locations that do not depend on the host.
pub fn test_tools(work_dir: &Path) -> ToolPaths {
    ToolPaths {
        makecert: work_dir.join("makecert.exe"),
        pvk2pfx: work_dir.join("pvk2pfx.exe"),
        signtool: work_dir.join("signtool.exe"),
        certutil: PathBuf::from("certutil.exe"),
    }
}
