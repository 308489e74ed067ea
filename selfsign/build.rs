// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::{
    io::Write,
    path::{Path, PathBuf},
};

/// Labels of bundled tools and the file names they are read from.
const PAYLOADS: &[(&str, &str)] = &[
    ("pvk2pfx_exe", "pvk2pfx.exe"),
    ("makecert_exe", "makecert.exe"),
    ("signtool_exe", "signtool.exe"),
];

fn main() {
    let manifest_dir =
        PathBuf::from(std::env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR not set"));
    let out_dir = PathBuf::from(std::env::var("OUT_DIR").expect("OUT_DIR not set"));

    // Allow SELFSIGN_PAYLOAD_DIR to point at a directory holding the SDK tools.
    let payload_dir = match std::env::var("SELFSIGN_PAYLOAD_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(_) => manifest_dir.join("payloads"),
    };
    println!("cargo:rerun-if-env-changed=SELFSIGN_PAYLOAD_DIR");

    let mut fh = std::fs::File::create(out_dir.join("payloads.rs"))
        .expect("unable to create payloads.rs");

    writeln!(fh, "pub static EMBEDDED_PAYLOADS: &[EmbeddedPayload] = &[")
        .expect("write failed");

    for (label, filename) in PAYLOADS {
        let path = payload_dir.join(filename);
        println!("cargo:rerun-if-changed={}", path.display());

        writeln!(fh, "    EmbeddedPayload {{").expect("write failed");
        writeln!(fh, "        label: {:?},", label).expect("write failed");
        writeln!(fh, "        data: {},", payload_expression(&path)).expect("write failed");
        writeln!(fh, "    }},").expect("write failed");
    }

    writeln!(fh, "];").expect("write failed");
}

fn payload_expression(path: &Path) -> String {
    if path.is_file() {
        format!("include_bytes!({:?})", path.display().to_string())
    } else {
        println!(
            "cargo:warning={} not found; bundling an empty payload",
            path.display()
        );
        "&[]".to_string()
    }
}
