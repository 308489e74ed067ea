// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Interface to `makecert.exe`. */

use {
    crate::{CertificateStore, StoreLocation, ToolInvocation},
    std::path::{Path, PathBuf},
};

/// Value for the `-cy` flag.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CertificateType {
    /// A certificate authority.
    Authority,
    /// An end-entity certificate.
    End,
}

impl CertificateType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Authority => "authority",
            Self::End => "end",
        }
    }
}

/// Value for the `-sky` flag.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum KeySpec {
    Signature,
    Exchange,
}

impl KeySpec {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Signature => "signature",
            Self::Exchange => "exchange",
        }
    }
}

/// Represents an invocation of `makecert.exe` to create a key pair and certificate.
#[derive(Clone, Debug)]
pub struct MakeCert {
    subject: String,
    certificate_path: PathBuf,
    self_signed: bool,
    exportable: bool,
    store: Option<(CertificateStore, StoreLocation)>,
    algorithm: Option<String>,
    certificate_type: Option<CertificateType>,
    key_spec: Option<KeySpec>,
    issuer: Option<(PathBuf, PathBuf)>,
    private_key_path: Option<PathBuf>,
}

impl MakeCert {
    /// Construct a new instance writing a certificate for `subject` to `certificate_path`.
    ///
    /// `subject` is an X.500 name such as `CN=Example`.
    pub fn new(subject: impl ToString, certificate_path: impl AsRef<Path>) -> Self {
        Self {
            subject: subject.to_string(),
            certificate_path: certificate_path.as_ref().to_path_buf(),
            self_signed: false,
            exportable: false,
            store: None,
            algorithm: None,
            certificate_type: None,
            key_spec: None,
            issuer: None,
            private_key_path: None,
        }
    }

    /// Create a self-signed certificate.
    ///
    /// Activates the `-r` flag.
    pub fn self_signed(&mut self) -> &mut Self {
        self.self_signed = true;
        self
    }

    /// Mark the private key as exportable.
    ///
    /// Activates the `-pe` flag.
    pub fn exportable(&mut self) -> &mut Self {
        self.exportable = true;
        self
    }

    /// Also install the certificate into a system store.
    ///
    /// Corresponds to the `-ss` and `-sr` flags.
    pub fn store(&mut self, store: CertificateStore, location: StoreLocation) -> &mut Self {
        self.store = Some((store, location));
        self
    }

    /// Set the signature algorithm. Passed to `-a`.
    pub fn algorithm(&mut self, algorithm: impl ToString) -> &mut Self {
        self.algorithm = Some(algorithm.to_string());
        self
    }

    pub fn certificate_type(&mut self, value: CertificateType) -> &mut Self {
        self.certificate_type = Some(value);
        self
    }

    pub fn key_spec(&mut self, value: KeySpec) -> &mut Self {
        self.key_spec = Some(value);
        self
    }

    /// Sign the new certificate with an issuer certificate and its private key.
    ///
    /// Corresponds to the `-ic` and `-iv` flags.
    pub fn issuer(
        &mut self,
        certificate: impl AsRef<Path>,
        private_key: impl AsRef<Path>,
    ) -> &mut Self {
        self.issuer = Some((
            certificate.as_ref().to_path_buf(),
            private_key.as_ref().to_path_buf(),
        ));
        self
    }

    /// Write the subject's private key to a `.pvk` file. Passed to `-sv`.
    pub fn private_key_file(&mut self, path: impl AsRef<Path>) -> &mut Self {
        self.private_key_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Arguments to pass to `makecert.exe`.
    pub fn args(&self) -> Vec<String> {
        let mut args = vec![];

        if self.self_signed {
            args.push("-r".to_string());
        }

        if self.exportable {
            args.push("-pe".to_string());
        }

        args.push("-n".to_string());
        args.push(self.subject.clone());

        if let Some((store, location)) = &self.store {
            args.push("-ss".to_string());
            args.push(store.as_str().to_string());
            args.push("-sr".to_string());
            args.push(location.as_str().to_string());
        }

        if let Some(algorithm) = &self.algorithm {
            args.push("-a".to_string());
            args.push(algorithm.clone());
        }

        if let Some(value) = &self.certificate_type {
            args.push("-cy".to_string());
            args.push(value.as_str().to_string());
        }

        if let Some(value) = &self.key_spec {
            args.push("-sky".to_string());
            args.push(value.as_str().to_string());
        }

        if let Some((certificate, key)) = &self.issuer {
            args.push("-ic".to_string());
            args.push(certificate.display().to_string());
            args.push("-iv".to_string());
            args.push(key.display().to_string());
        }

        if let Some(path) = &self.private_key_path {
            args.push("-sv".to_string());
            args.push(path.display().to_string());
        }

        args.push(self.certificate_path.display().to_string());

        args
    }

    /// Resolve the invocation of `makecert.exe` at `program`.
    pub fn invocation(&self, program: impl AsRef<Path>) -> ToolInvocation {
        ToolInvocation::new(program).args(self.args())
    }
}
