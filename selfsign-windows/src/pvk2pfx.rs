// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Interface to `pvk2pfx.exe`. */

use {
    crate::ToolInvocation,
    std::path::{Path, PathBuf},
};

/// Represents a conversion of a `.pvk` key and `.cer` certificate into a `.pfx` file.
#[derive(Clone, Debug)]
pub struct Pvk2Pfx {
    private_key: PathBuf,
    certificate: PathBuf,
    output: PathBuf,
}

impl Pvk2Pfx {
    pub fn new(
        private_key: impl AsRef<Path>,
        certificate: impl AsRef<Path>,
        output: impl AsRef<Path>,
    ) -> Self {
        Self {
            private_key: private_key.as_ref().to_path_buf(),
            certificate: certificate.as_ref().to_path_buf(),
            output: output.as_ref().to_path_buf(),
        }
    }

    pub fn args(&self) -> Vec<String> {
        vec![
            "-pvk".to_string(),
            self.private_key.display().to_string(),
            "-spc".to_string(),
            self.certificate.display().to_string(),
            "-pfx".to_string(),
            self.output.display().to_string(),
        ]
    }

    pub fn invocation(&self, program: impl AsRef<Path>) -> ToolInvocation {
        ToolInvocation::new(program).args(self.args())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args() {
        let convert = Pvk2Pfx::new("selfsign-spc.pvk", "selfsign-spc.cer", "selfsign.pfx");
        assert_eq!(
            convert.invocation("pvk2pfx.exe").args_lossy(),
            vec![
                "-pvk",
                "selfsign-spc.pvk",
                "-spc",
                "selfsign-spc.cer",
                "-pfx",
                "selfsign.pfx"
            ]
        );
    }
}
