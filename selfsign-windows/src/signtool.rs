// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Signing files with `signtool.exe`. */

use {
    crate::ToolInvocation,
    std::path::{Path, PathBuf},
};

/// Builder for `signtool.exe sign` using a key container file.
#[derive(Clone, Debug)]
pub struct SigntoolSign {
    pfx: PathBuf,
    subject_name: Option<String>,
    additional_certificates: Vec<PathBuf>,
    verbose: bool,
    file_digest_algorithm: Option<String>,
    timestamp_url: Option<String>,
    files: Vec<PathBuf>,
}

impl SigntoolSign {
    /// Sign with the key and certificate in the `.pfx` at `pfx` (`/f`).
    pub fn new(pfx: impl AsRef<Path>) -> Self {
        Self {
            pfx: pfx.as_ref().to_path_buf(),
            subject_name: None,
            additional_certificates: vec![],
            verbose: false,
            file_digest_algorithm: None,
            timestamp_url: None,
            files: vec![],
        }
    }

    /// `/v`
    pub fn verbose(&mut self) -> &mut Self {
        self.verbose = true;
        self
    }

    /// Only use a certificate whose subject contains `name` (`/n`).
    pub fn subject_name(&mut self, name: impl ToString) -> &mut Self {
        self.subject_name = Some(name.to_string());
        self
    }

    /// Embed the certificates of another file in the signature (`/ac`).
    pub fn additional_certificate(&mut self, path: impl AsRef<Path>) -> &mut Self {
        self.additional_certificates.push(path.as_ref().to_path_buf());
        self
    }

    /// `/fd`
    pub fn file_digest_algorithm(&mut self, algorithm: impl ToString) -> &mut Self {
        self.file_digest_algorithm = Some(algorithm.to_string());
        self
    }

    /// Timestamp the signature with an Authenticode timestamp server (`/t`).
    pub fn timestamp_url(&mut self, url: impl ToString) -> &mut Self {
        self.timestamp_url = Some(url.to_string());
        self
    }

    pub fn sign_file(&mut self, path: impl AsRef<Path>) -> &mut Self {
        self.files.push(path.as_ref().to_path_buf());
        self
    }

    pub fn args(&self) -> Vec<String> {
        let mut args = vec!["sign".to_string()];

        if self.verbose {
            args.push("/v".into());
        }

        args.extend(["/f".to_string(), self.pfx.display().to_string()]);

        if let Some(name) = &self.subject_name {
            args.extend(["/n".to_string(), name.clone()]);
        }

        args.extend(
            self.additional_certificates
                .iter()
                .flat_map(|p| ["/ac".to_string(), p.display().to_string()]),
        );

        if let Some(algorithm) = &self.file_digest_algorithm {
            args.extend(["/fd".to_string(), algorithm.clone()]);
        }

        if let Some(url) = &self.timestamp_url {
            args.extend(["/t".to_string(), url.clone()]);
        }

        args.extend(self.files.iter().map(|p| p.display().to_string()));

        args
    }

    /// Resolve the invocation of `signtool.exe` at `program`.
    pub fn invocation(&self, program: impl AsRef<Path>) -> ToolInvocation {
        ToolInvocation::new(program).args(self.args())
    }
}
