// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Signing a copy of the target executable. */

use {
    crate::{
        error::{Result, SelfSignError},
        pipeline::{SIGNING_CONTAINER, SPC_CERTIFICATE},
        settings::{Settings, ToolPaths},
    },
    log::info,
    selfsign_windows::{SigntoolSign, ToolRunner},
    std::path::{Path, PathBuf},
};

/// Suffix replacing the extension of the signed copy.
pub const SIGNED_SUFFIX: &str = ".signed.exe";

/// Subject name substring the signing certificate must match.
pub const SIGNING_SUBJECT: &str = "SPC";

/// Derive the path of the signed copy of `target`.
///
/// One trailing extension is stripped and [SIGNED_SUFFIX] appended. A name
/// consisting only of a leading dot and suffix, such as `.exe`, has no
/// extension and is kept whole.
pub fn signed_output_path(target: &Path) -> PathBuf {
    let mut name = target.with_extension("").into_os_string();
    name.push(SIGNED_SUFFIX);

    PathBuf::from(name)
}

/// Copy `target` next to itself and sign the copy.
///
/// The original file is never modified. Returns the path of the signed copy.
pub fn sign(
    settings: &Settings,
    tools: &ToolPaths,
    runner: &dyn ToolRunner,
    target: &Path,
) -> Result<PathBuf> {
    let output = signed_output_path(target);

    info!("copying {} to {}", target.display(), output.display());
    std::fs::copy(target, &output).map_err(|source| SelfSignError::Copy {
        from: target.to_path_buf(),
        to: output.clone(),
        source,
    })?;

    // The copy may be relative to the process directory, while signtool runs in
    // the work directory.
    let sign_path = if output.is_absolute() {
        output.clone()
    } else {
        std::env::current_dir()
            .map_err(SelfSignError::WorkDir)?
            .join(&output)
    };

    let invocation = SigntoolSign::new(SIGNING_CONTAINER)
        .verbose()
        .subject_name(SIGNING_SUBJECT)
        .additional_certificate(SPC_CERTIFICATE)
        .file_digest_algorithm("SHA256")
        .timestamp_url(&settings.timestamp_url)
        .sign_file(&sign_path)
        .invocation(&tools.signtool)
        .current_dir(&settings.work_dir);

    runner
        .run_checked(&invocation)
        .map_err(|e| SelfSignError::tool(&invocation, e))?;

    Ok(output)
}
