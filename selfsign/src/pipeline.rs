// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Provisioning of the certificate authority and code signing certificate.

Each step is guarded by the presence of the files it produces, so running the
pipeline repeatedly in the same work directory only regenerates what is
missing. Regenerating a pair always deletes both halves first so a key and
certificate from different generations are never combined.
*/

use {
    crate::{
        error::{Result, SelfSignError},
        settings::{Settings, ToolPaths},
    },
    log::{debug, info},
    selfsign_windows::{
        CertUtilStore, CertificateStore, CertificateType, KeySpec, MakeCert, Pvk2Pfx,
        StoreLocation, ToolInvocation, ToolRunner,
    },
    std::path::Path,
};

pub const CA_KEY: &str = "selfsign-ca.pvk";
pub const CA_CERTIFICATE: &str = "selfsign-ca.cer";
pub const SPC_KEY: &str = "selfsign-spc.pvk";
pub const SPC_CERTIFICATE: &str = "selfsign-spc.cer";
pub const SIGNING_CONTAINER: &str = "selfsign.pfx";

pub const CA_SUBJECT: &str = "CN=Self Sign CA";
pub const SPC_SUBJECT: &str = "CN=Code selfsign SPC";

/// Stores the certificate authority is imported into.
const TRUST_STORES: [CertificateStore; 2] =
    [CertificateStore::Root, CertificateStore::TrustedPublisher];

/// Whether a pipeline step invoked its tool.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum StepOutcome {
    Ran,
    Skipped,
}

/// What [provision] did.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ProvisionReport {
    pub certificate_authority: StepOutcome,
    pub leaf_certificate: StepOutcome,
    pub signing_container: StepOutcome,
}

/// Delete a file, treating its absence as success.
pub fn remove_if_present(path: &Path) -> Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => {
            debug!("removed {}", path.display());
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(SelfSignError::RemoveArtifact {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Run an invocation in the work directory, failing on a non-zero exit.
fn run_checked(
    settings: &Settings,
    runner: &dyn ToolRunner,
    invocation: ToolInvocation,
) -> Result<()> {
    let invocation = invocation.current_dir(&settings.work_dir);

    runner
        .run_checked(&invocation)
        .map_err(|e| SelfSignError::tool(&invocation, e))?;

    Ok(())
}

fn pair_present(settings: &Settings, key: &str, certificate: &str) -> bool {
    settings.path(key).exists() && settings.path(certificate).exists()
}

/// Create the self-signed certificate authority unless its key and certificate exist.
pub fn create_certificate_authority(
    settings: &Settings,
    tools: &ToolPaths,
    runner: &dyn ToolRunner,
) -> Result<StepOutcome> {
    if pair_present(settings, CA_KEY, CA_CERTIFICATE) {
        info!("certificate authority {} exists", CA_CERTIFICATE);
        return Ok(StepOutcome::Skipped);
    }

    info!("creating certificate authority {}", CA_SUBJECT);
    remove_if_present(&settings.path(CA_KEY))?;
    remove_if_present(&settings.path(CA_CERTIFICATE))?;

    let invocation = MakeCert::new(CA_SUBJECT, CA_CERTIFICATE)
        .self_signed()
        .exportable()
        .store(CertificateStore::Ca, StoreLocation::CurrentUser)
        .algorithm("sha256")
        .certificate_type(CertificateType::Authority)
        .key_spec(KeySpec::Signature)
        .private_key_file(CA_KEY)
        .invocation(&tools.makecert);

    run_checked(settings, runner, invocation)?;

    Ok(StepOutcome::Ran)
}

/// Import the certificate authority into the current user's trusted stores.
///
/// Any previously imported copy is removed first. Removal failures are
/// expected when nothing was imported before and are ignored.
pub fn import_certificate_authority(
    settings: &Settings,
    tools: &ToolPaths,
    runner: &dyn ToolRunner,
) -> Result<()> {
    for store in TRUST_STORES {
        let invocation = CertUtilStore::delete(store, CA_CERTIFICATE)
            .user()
            .invocation(&tools.certutil)
            .current_dir(&settings.work_dir);

        match runner.run(&invocation) {
            Ok(output) if output.success() => {
                debug!("removed prior certificate authority from {}", store.as_str());
            }
            Ok(_) => {
                debug!("no prior certificate authority in {}", store.as_str());
            }
            Err(e) => {
                debug!("ignoring failure of {}: {}", invocation, e);
            }
        }
    }

    for store in TRUST_STORES {
        info!("importing {} into {}", CA_CERTIFICATE, store.as_str());

        let invocation = CertUtilStore::add(store, CA_CERTIFICATE)
            .user()
            .invocation(&tools.certutil);

        run_checked(settings, runner, invocation)?;
    }

    Ok(())
}

/// Create the code signing certificate unless its key and certificate exist.
///
/// A newly created certificate invalidates any existing signing container.
pub fn create_leaf_certificate(
    settings: &Settings,
    tools: &ToolPaths,
    runner: &dyn ToolRunner,
) -> Result<StepOutcome> {
    if pair_present(settings, SPC_KEY, SPC_CERTIFICATE) {
        info!("code signing certificate {} exists", SPC_CERTIFICATE);
        return Ok(StepOutcome::Skipped);
    }

    info!("creating code signing certificate {}", SPC_SUBJECT);
    remove_if_present(&settings.path(SPC_KEY))?;
    remove_if_present(&settings.path(SPC_CERTIFICATE))?;

    let invocation = MakeCert::new(SPC_SUBJECT, SPC_CERTIFICATE)
        .exportable()
        .algorithm("sha256")
        .certificate_type(CertificateType::End)
        .key_spec(KeySpec::Signature)
        .issuer(CA_CERTIFICATE, CA_KEY)
        .private_key_file(SPC_KEY)
        .invocation(&tools.makecert);

    run_checked(settings, runner, invocation)?;

    remove_if_present(&settings.path(SIGNING_CONTAINER))?;

    Ok(StepOutcome::Ran)
}

/// Convert the code signing key and certificate to a `.pfx` unless it exists.
pub fn build_signing_container(
    settings: &Settings,
    tools: &ToolPaths,
    runner: &dyn ToolRunner,
) -> Result<StepOutcome> {
    if settings.path(SIGNING_CONTAINER).exists() {
        info!("signing container {} exists", SIGNING_CONTAINER);
        return Ok(StepOutcome::Skipped);
    }

    info!("creating signing container {}", SIGNING_CONTAINER);

    let invocation =
        Pvk2Pfx::new(SPC_KEY, SPC_CERTIFICATE, SIGNING_CONTAINER).invocation(&tools.pvk2pfx);

    run_checked(settings, runner, invocation)?;

    Ok(StepOutcome::Ran)
}

/// Run all provisioning steps in order.
pub fn provision(
    settings: &Settings,
    tools: &ToolPaths,
    runner: &dyn ToolRunner,
) -> Result<ProvisionReport> {
    let certificate_authority = create_certificate_authority(settings, tools, runner)?;
    import_certificate_authority(settings, tools, runner)?;
    let leaf_certificate = create_leaf_certificate(settings, tools, runner)?;
    let signing_container = build_signing_container(settings, tools, runner)?;

    Ok(ProvisionReport {
        certificate_authority,
        leaf_certificate,
        signing_container,
    })
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::testutil::{test_settings, test_tools, FakeToolRunner},
        anyhow::Result,
    };

    #[test]
    fn test_first_run_creates_everything() -> Result<()> {
        let temp_dir = tempfile::tempdir()?;
        let settings = test_settings(temp_dir.path());
        let tools = test_tools(temp_dir.path());
        let runner = FakeToolRunner::new();

        let report = provision(&settings, &tools, &runner)?;

        assert_eq!(
            report,
            ProvisionReport {
                certificate_authority: StepOutcome::Ran,
                leaf_certificate: StepOutcome::Ran,
                signing_container: StepOutcome::Ran,
            }
        );
        assert_eq!(
            runner.programs(),
            vec![
                "makecert.exe",
                "certutil.exe",
                "certutil.exe",
                "certutil.exe",
                "certutil.exe",
                "makecert.exe",
                "pvk2pfx.exe"
            ]
        );
        for name in [CA_KEY, CA_CERTIFICATE, SPC_KEY, SPC_CERTIFICATE, SIGNING_CONTAINER] {
            assert!(temp_dir.path().join(name).is_file(), "{} exists", name);
        }

        Ok(())
    }

    #[test]
    fn test_second_run_is_idempotent() -> Result<()> {
        let temp_dir = tempfile::tempdir()?;
        let settings = test_settings(temp_dir.path());
        let tools = test_tools(temp_dir.path());
        let runner = FakeToolRunner::new();

        provision(&settings, &tools, &runner)?;
        let container = std::fs::read(temp_dir.path().join(SIGNING_CONTAINER))?;
        runner.clear();

        let report = provision(&settings, &tools, &runner)?;

        assert_eq!(report.certificate_authority, StepOutcome::Skipped);
        assert_eq!(report.leaf_certificate, StepOutcome::Skipped);
        assert_eq!(report.signing_container, StepOutcome::Skipped);
        assert_eq!(runner.count("makecert.exe"), 0);
        assert_eq!(runner.count("pvk2pfx.exe"), 0);
        // The import step always runs.
        assert_eq!(runner.count("certutil.exe"), 4);
        assert_eq!(
            std::fs::read(temp_dir.path().join(SIGNING_CONTAINER))?,
            container
        );

        Ok(())
    }

    #[test]
    fn test_missing_leaf_certificate_cascades() -> Result<()> {
        let temp_dir = tempfile::tempdir()?;
        let settings = test_settings(temp_dir.path());
        let tools = test_tools(temp_dir.path());
        let runner = FakeToolRunner::new();

        provision(&settings, &tools, &runner)?;
        let old_key = std::fs::read(temp_dir.path().join(SPC_KEY))?;
        let old_container = std::fs::read(temp_dir.path().join(SIGNING_CONTAINER))?;
        let ca_certificate = std::fs::read(temp_dir.path().join(CA_CERTIFICATE))?;

        std::fs::remove_file(temp_dir.path().join(SPC_CERTIFICATE))?;
        runner.clear();

        let report = provision(&settings, &tools, &runner)?;

        assert_eq!(report.certificate_authority, StepOutcome::Skipped);
        assert_eq!(report.leaf_certificate, StepOutcome::Ran);
        assert_eq!(report.signing_container, StepOutcome::Ran);
        assert_eq!(runner.count("makecert.exe"), 1);
        assert_eq!(runner.count("pvk2pfx.exe"), 1);

        assert_ne!(std::fs::read(temp_dir.path().join(SPC_KEY))?, old_key);
        assert_ne!(
            std::fs::read(temp_dir.path().join(SIGNING_CONTAINER))?,
            old_container
        );
        assert_eq!(
            std::fs::read(temp_dir.path().join(CA_CERTIFICATE))?,
            ca_certificate
        );

        Ok(())
    }

    #[test]
    fn test_lone_placeholder_regenerates_pair() -> Result<()> {
        let temp_dir = tempfile::tempdir()?;
        let settings = test_settings(temp_dir.path());
        let tools = test_tools(temp_dir.path());
        let runner = FakeToolRunner::new();

        std::fs::write(temp_dir.path().join(CA_CERTIFICATE), b"")?;

        assert_eq!(
            create_certificate_authority(&settings, &tools, &runner)?,
            StepOutcome::Ran
        );

        assert_eq!(
            std::fs::read_to_string(temp_dir.path().join(CA_CERTIFICATE))?,
            "cert selfsign-ca.cer #1"
        );
        assert_eq!(
            std::fs::read_to_string(temp_dir.path().join(CA_KEY))?,
            "key selfsign-ca.pvk #1"
        );

        Ok(())
    }

    #[test]
    fn test_container_alone_is_rebuilt() -> Result<()> {
        let temp_dir = tempfile::tempdir()?;
        let settings = test_settings(temp_dir.path());
        let tools = test_tools(temp_dir.path());
        let runner = FakeToolRunner::new();

        provision(&settings, &tools, &runner)?;
        std::fs::remove_file(temp_dir.path().join(SIGNING_CONTAINER))?;
        runner.clear();

        let report = provision(&settings, &tools, &runner)?;

        assert_eq!(report.leaf_certificate, StepOutcome::Skipped);
        assert_eq!(report.signing_container, StepOutcome::Ran);
        assert_eq!(runner.count("makecert.exe"), 0);

        Ok(())
    }

    #[test]
    fn test_invocations_match_tool_syntax() -> Result<()> {
        let temp_dir = tempfile::tempdir()?;
        let settings = test_settings(temp_dir.path());
        let tools = test_tools(temp_dir.path());
        let runner = FakeToolRunner::new();

        provision(&settings, &tools, &runner)?;
        let calls = runner.calls();

        assert_eq!(
            calls[0].1,
            vec![
                "-r",
                "-pe",
                "-n",
                "CN=Self Sign CA",
                "-ss",
                "CA",
                "-sr",
                "CurrentUser",
                "-a",
                "sha256",
                "-cy",
                "authority",
                "-sky",
                "signature",
                "-sv",
                "selfsign-ca.pvk",
                "selfsign-ca.cer"
            ]
        );
        assert_eq!(
            calls[1].1,
            vec!["-user", "-delstore", "Root", "selfsign-ca.cer"]
        );
        assert_eq!(
            calls[2].1,
            vec!["-user", "-delstore", "trustedpublisher", "selfsign-ca.cer"]
        );
        assert_eq!(
            calls[3].1,
            vec!["-user", "-addstore", "Root", "selfsign-ca.cer"]
        );
        assert_eq!(
            calls[4].1,
            vec!["-user", "-addstore", "trustedpublisher", "selfsign-ca.cer"]
        );
        assert_eq!(
            calls[5].1,
            vec![
                "-pe",
                "-n",
                "CN=Code selfsign SPC",
                "-a",
                "sha256",
                "-cy",
                "end",
                "-sky",
                "signature",
                "-ic",
                "selfsign-ca.cer",
                "-iv",
                "selfsign-ca.pvk",
                "-sv",
                "selfsign-spc.pvk",
                "selfsign-spc.cer"
            ]
        );
        assert_eq!(
            calls[6].1,
            vec![
                "-pvk",
                "selfsign-spc.pvk",
                "-spc",
                "selfsign-spc.cer",
                "-pfx",
                "selfsign.pfx"
            ]
        );

        Ok(())
    }

    #[test]
    fn test_delete_failures_are_ignored() -> Result<()> {
        let temp_dir = tempfile::tempdir()?;
        let settings = test_settings(temp_dir.path());
        let tools = test_tools(temp_dir.path());
        let runner = FakeToolRunner::new();
        runner.fail_when("certutil.exe", "-delstore", 0x80092004u32 as i32);

        provision(&settings, &tools, &runner)?;

        Ok(())
    }

    #[test]
    fn test_add_failure_is_fatal() -> Result<()> {
        let temp_dir = tempfile::tempdir()?;
        let settings = test_settings(temp_dir.path());
        let tools = test_tools(temp_dir.path());
        let runner = FakeToolRunner::new();
        runner.fail_when("certutil.exe", "trustedpublisher", 5);

        let err = provision(&settings, &tools, &runner).unwrap_err();

        assert_eq!(err.code(), 5);
        assert_eq!(
            err.diagnostic(),
            "certutil.exe -user -addstore trustedpublisher selfsign-ca.cer failed GetLastEroor()=5"
        );
        // Nothing after the failed import runs.
        assert_eq!(runner.count("makecert.exe"), 1);
        assert_eq!(runner.count("pvk2pfx.exe"), 0);

        Ok(())
    }

    #[test]
    fn test_generation_failure_is_fatal() -> Result<()> {
        let temp_dir = tempfile::tempdir()?;
        let settings = test_settings(temp_dir.path());
        let tools = test_tools(temp_dir.path());
        let runner = FakeToolRunner::new();
        runner.fail_when("makecert.exe", "end", 1);

        let err = provision(&settings, &tools, &runner).unwrap_err();

        assert!(matches!(err, SelfSignError::Tool { .. }));
        assert!(!temp_dir.path().join(SIGNING_CONTAINER).exists());
        assert_eq!(runner.count("pvk2pfx.exe"), 0);

        Ok(())
    }

    #[test]
    fn test_remove_if_present() -> Result<()> {
        let temp_dir = tempfile::tempdir()?;
        let path = temp_dir.path().join("file");

        remove_if_present(&path)?;
        std::fs::write(&path, b"data")?;
        remove_if_present(&path)?;
        assert!(!path.exists());

        Ok(())
    }
}
