// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Extraction of helper tools embedded in the executable. */

use {
    crate::error::{Result, SelfSignError},
    log::{info, warn},
    std::{
        io::Write,
        path::{Path, PathBuf},
    },
};

/// A blob embedded in the executable at build time.
#[derive(Clone, Copy, Debug)]
pub struct EmbeddedPayload {
    /// Symbolic name of the payload. e.g. `makecert_exe`.
    pub label: &'static str,
    pub data: &'static [u8],
}

include!(concat!(env!("OUT_DIR"), "/payloads.rs"));

/// Labels extracted before provisioning, in extraction order.
pub const TOOL_LABELS: &[&str] = &["pvk2pfx_exe", "makecert_exe", "signtool_exe"];

/// Outcome of [extract].
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Extraction {
    /// The payload was written to the path.
    Written(PathBuf),
    /// A file already existed at the path and was left alone.
    Present(PathBuf),
}

/// Derive the file name a payload label is extracted to.
///
/// A label whose 4th-from-last character is `_` gets a dotted suffix instead:
/// `makecert_exe` becomes `makecert.exe`.
pub fn payload_file_name(label: &str) -> String {
    let mut name = label.to_string();

    if name.len() >= 4 && name.is_char_boundary(name.len() - 4) {
        let index = name.len() - 4;
        if name.as_bytes()[index] == b'_' {
            name.replace_range(index..index + 1, ".");
        }
    }

    name
}

/// Write the payload with `label` into `work_dir` unless a file with its name exists.
///
/// Presence alone gates extraction. An existing file is never inspected or
/// replaced, regardless of its content.
pub fn extract(label: &str, payloads: &[EmbeddedPayload], work_dir: &Path) -> Result<Extraction> {
    let path = work_dir.join(payload_file_name(label));

    if path.exists() {
        info!("{} already present; not extracting", path.display());
        return Ok(Extraction::Present(path));
    }

    let payload = payloads
        .iter()
        .find(|p| p.label == label)
        .ok_or_else(|| SelfSignError::PayloadMissing(label.to_string()))?;

    if payload.data.is_empty() {
        warn!(
            "{} was not bundled at build time; place it in {}",
            label,
            work_dir.display()
        );
        return Err(SelfSignError::PayloadEmpty(label.to_string()));
    }

    info!(
        "extracting {} ({} bytes) to {}",
        label,
        payload.data.len(),
        path.display()
    );

    let write = || -> std::io::Result<()> {
        let mut fh = std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)?;
        fh.write_all(payload.data)?;
        fh.sync_all()
    };

    write().map_err(|source| SelfSignError::Extract {
        path: path.clone(),
        source,
    })?;

    Ok(Extraction::Written(path))
}

/// Extract every bundled tool.
pub fn extract_tools(payloads: &[EmbeddedPayload], work_dir: &Path) -> Result<Vec<Extraction>> {
    TOOL_LABELS
        .iter()
        .map(|label| extract(label, payloads, work_dir))
        .collect()
}
