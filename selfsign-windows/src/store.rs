// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/// A named Windows certificate store.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CertificateStore {
    /// Intermediate certification authorities.
    Ca,
    /// Personal certificates.
    My,
    /// Trusted root certification authorities.
    Root,
    /// Trusted publishers.
    TrustedPublisher,
}

impl CertificateStore {
    /// The store name as understood by `certutil.exe` and `makecert.exe`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ca => "CA",
            Self::My => "My",
            Self::Root => "Root",
            Self::TrustedPublisher => "trustedpublisher",
        }
    }
}

/// Which registry hive a certificate store lives in.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum StoreLocation {
    CurrentUser,
    LocalMachine,
}

impl StoreLocation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CurrentUser => "CurrentUser",
            Self::LocalMachine => "LocalMachine",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_names() {
        assert_eq!(CertificateStore::Root.as_str(), "Root");
        assert_eq!(
            CertificateStore::TrustedPublisher.as_str(),
            "trustedpublisher"
        );
        assert_eq!(CertificateStore::Ca.as_str(), "CA");
        assert_eq!(StoreLocation::CurrentUser.as_str(), "CurrentUser");
    }
}
