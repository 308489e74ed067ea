// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Interface to `certutil.exe` certificate store manipulation. */

use {
    crate::{CertificateStore, ToolInvocation},
    std::path::{Path, PathBuf},
};

/// The store operation to perform.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum StoreOperation {
    /// `-addstore`: add a certificate to a store.
    Add,
    /// `-delstore`: remove a certificate from a store.
    Delete,
}

impl StoreOperation {
    pub fn as_flag(&self) -> &'static str {
        match self {
            Self::Add => "-addstore",
            Self::Delete => "-delstore",
        }
    }
}

/// Represents an invocation of `certutil.exe -addstore` or `-delstore`.
#[derive(Clone, Debug)]
pub struct CertUtilStore {
    operation: StoreOperation,
    store: CertificateStore,
    certificate: PathBuf,
    user: bool,
}

impl CertUtilStore {
    pub fn new(
        operation: StoreOperation,
        store: CertificateStore,
        certificate: impl AsRef<Path>,
    ) -> Self {
        Self {
            operation,
            store,
            certificate: certificate.as_ref().to_path_buf(),
            user: false,
        }
    }

    /// Add `certificate` to `store`.
    pub fn add(store: CertificateStore, certificate: impl AsRef<Path>) -> Self {
        Self::new(StoreOperation::Add, store, certificate)
    }

    /// Remove `certificate` from `store`.
    pub fn delete(store: CertificateStore, certificate: impl AsRef<Path>) -> Self {
        Self::new(StoreOperation::Delete, store, certificate)
    }

    /// Operate on the current user's stores instead of the machine's.
    ///
    /// Activates the `-user` flag.
    pub fn user(mut self) -> Self {
        self.user = true;
        self
    }

    pub fn args(&self) -> Vec<String> {
        let mut args = vec![];

        if self.user {
            args.push("-user".to_string());
        }

        args.push(self.operation.as_flag().to_string());
        args.push(self.store.as_str().to_string());
        args.push(self.certificate.display().to_string());

        args
    }

    pub fn invocation(&self, program: impl AsRef<Path>) -> ToolInvocation {
        ToolInvocation::new(program).args(self.args())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_add() {
        let op = CertUtilStore::add(CertificateStore::Root, "selfsign-ca.cer").user();

        assert_eq!(
            op.args(),
            vec!["-user", "-addstore", "Root", "selfsign-ca.cer"]
        );
    }

    #[test]
    fn test_machine_delete() {
        let op = CertUtilStore::delete(CertificateStore::TrustedPublisher, "ca.cer");

        assert_eq!(
            op.invocation("certutil.exe").args_lossy(),
            vec!["-delstore", "trustedpublisher", "ca.cer"]
        );
    }
}
