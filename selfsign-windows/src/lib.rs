// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Windows primitives for producing and applying self-signed code signing certificates.

Certificate generation, PKCS #12 conversion and Authenticode signing are
performed by the Windows SDK tools `makecert.exe`, `pvk2pfx.exe` and
`signtool.exe` and by the system `certutil.exe`. This crate provides typed
builders for their command lines, a [ToolRunner] abstraction to execute them
and helpers for process elevation.
*/

mod certutil;
pub use certutil::{CertUtilStore, StoreOperation};
mod elevation;
pub use elevation::{
    is_elevated, quote_windows_argument, relaunch_elevated, windows_command_line,
    ElevationError, RelaunchStatus, RelaunchWait,
};
mod invocation;
pub use invocation::{DuctRunner, ToolError, ToolInvocation, ToolOutput, ToolRunner};
mod makecert;
pub use makecert::{CertificateType, KeySpec, MakeCert};
mod pvk2pfx;
pub use pvk2pfx::Pvk2Pfx;
mod signtool;
pub use signtool::SigntoolSign;
mod store;
pub use store::{CertificateStore, StoreLocation};
