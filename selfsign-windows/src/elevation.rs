// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Detecting and acquiring administrative privileges.

Modifying the trusted root certificate store requires an elevated process.
[is_elevated] tests the current process token and [relaunch_elevated] starts
the current executable again through the `runas` shell verb.
*/

use {
    std::{ffi::OsString, path::Path, time::Duration},
    thiserror::Error,
};

/// Error when querying or acquiring elevation.
#[derive(Debug, Error)]
pub enum ElevationError {
    #[error("querying process token group membership: {0}")]
    PrivilegeQuery(std::io::Error),

    #[error("launching elevated process: {0}")]
    Launch(std::io::Error),

    #[error("waiting on elevated process: {0}")]
    Wait(std::io::Error),

    #[error("elevation is only supported on Windows")]
    Unsupported,
}

impl ElevationError {
    /// The raw OS error code of the underlying failure, or 0.
    pub fn code(&self) -> i32 {
        match self {
            Self::PrivilegeQuery(e) | Self::Launch(e) | Self::Wait(e) => {
                e.raw_os_error().unwrap_or(0)
            }
            Self::Unsupported => 0,
        }
    }
}

/// How long to wait for an elevated child process.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RelaunchWait {
    /// Block until the child exits.
    Forever,
    /// Wait at most this long.
    Bounded(Duration),
}

/// Outcome of waiting on an elevated child process.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RelaunchStatus {
    /// The child exited with the given status.
    Exited(i32),
    /// A bounded wait elapsed before the child exited.
    StillRunning,
}

const BACKSLASH: u16 = b'\\' as u16;
const QUOTE: u16 = b'"' as u16;
const SPACE: u16 = b' ' as u16;

/// Quote one UTF-16 argument so `CommandLineToArgvW` and the MSVC runtime parse it back verbatim.
///
/// Code units are copied as is, so arguments that are not valid Unicode survive.
pub fn quote_windows_argument(arg: &[u16]) -> Vec<u16> {
    let needs_quotes = arg.is_empty()
        || arg
            .iter()
            .any(|&c| matches!(c, 0x09 | 0x0a | 0x0b | SPACE | QUOTE));

    if !needs_quotes {
        return arg.to_vec();
    }

    let mut quoted = Vec::with_capacity(arg.len() + 2);
    quoted.push(QUOTE);

    let mut backslashes = 0;
    for &c in arg {
        match c {
            BACKSLASH => {
                backslashes += 1;
            }
            QUOTE => {
                // Backslashes preceding a quote are escaped along with the quote.
                quoted.extend(std::iter::repeat(BACKSLASH).take(backslashes * 2 + 1));
                quoted.push(QUOTE);
                backslashes = 0;
            }
            _ => {
                quoted.extend(std::iter::repeat(BACKSLASH).take(backslashes));
                quoted.push(c);
                backslashes = 0;
            }
        }
    }

    // Trailing backslashes must not escape the closing quote.
    quoted.extend(std::iter::repeat(BACKSLASH).take(backslashes * 2));
    quoted.push(QUOTE);

    quoted
}

/// Build the UTF-16 parameters string for a process from its arguments.
///
/// The result is not NUL terminated.
pub fn windows_command_line<A: AsRef<[u16]>>(args: &[A]) -> Vec<u16> {
    let mut line = vec![];

    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            line.push(SPACE);
        }
        line.extend(quote_windows_argument(arg.as_ref()));
    }

    line
}

#[cfg(windows)]
mod imp {
    use {
        super::{ElevationError, RelaunchStatus, RelaunchWait},
        std::{ffi::OsStr, os::windows::ffi::OsStrExt, path::Path, ptr::null_mut},
        winapi::{
            shared::{
                minwindef::{BOOL, DWORD},
                winerror::WAIT_TIMEOUT,
            },
            um::{
                handleapi::CloseHandle,
                processthreadsapi::GetExitCodeProcess,
                securitybaseapi::{AllocateAndInitializeSid, CheckTokenMembership, FreeSid},
                shellapi::{
                    ShellExecuteExW, SEE_MASK_FLAG_NO_UI, SEE_MASK_NOCLOSEPROCESS,
                    SEE_MASK_NO_CONSOLE, SHELLEXECUTEINFOW,
                },
                synchapi::WaitForSingleObject,
                winbase::{INFINITE, WAIT_OBJECT_0},
                winnt::{
                    DOMAIN_ALIAS_RID_ADMINS, DOMAIN_ALIAS_RID_SYSTEM_OPS, HANDLE, PSID,
                    SECURITY_BUILTIN_DOMAIN_RID, SECURITY_NT_AUTHORITY, SID_IDENTIFIER_AUTHORITY,
                },
                winuser::SW_HIDE,
            },
        },
    };

    struct OwnedSid(PSID);

    impl Drop for OwnedSid {
        fn drop(&mut self) {
            if !self.0.is_null() {
                unsafe {
                    FreeSid(self.0);
                }
            }
        }
    }

    struct OwnedHandle(HANDLE);

    impl Drop for OwnedHandle {
        fn drop(&mut self) {
            if !self.0.is_null() {
                unsafe {
                    CloseHandle(self.0);
                }
            }
        }
    }

    fn wide(s: &OsStr) -> Vec<u16> {
        s.encode_wide().chain(std::iter::once(0)).collect()
    }

    /// Whether the current thread's token is a member of a builtin alias group.
    fn builtin_alias_membership(rid: DWORD) -> Result<bool, ElevationError> {
        let mut authority = SID_IDENTIFIER_AUTHORITY {
            Value: SECURITY_NT_AUTHORITY,
        };
        let mut sid = OwnedSid(null_mut());

        unsafe {
            if AllocateAndInitializeSid(
                &mut authority,
                2,
                SECURITY_BUILTIN_DOMAIN_RID,
                rid,
                0,
                0,
                0,
                0,
                0,
                0,
                &mut sid.0,
            ) == 0
            {
                return Err(ElevationError::PrivilegeQuery(
                    std::io::Error::last_os_error(),
                ));
            }

            let mut member: BOOL = 0;
            if CheckTokenMembership(null_mut(), sid.0, &mut member) == 0 {
                return Err(ElevationError::PrivilegeQuery(
                    std::io::Error::last_os_error(),
                ));
            }

            Ok(member != 0)
        }
    }

    pub fn is_elevated() -> Result<bool, ElevationError> {
        Ok(builtin_alias_membership(DOMAIN_ALIAS_RID_ADMINS)?
            || builtin_alias_membership(DOMAIN_ALIAS_RID_SYSTEM_OPS)?)
    }

    pub fn relaunch_elevated(
        exe: &Path,
        parameters: &[u16],
        cwd: Option<&Path>,
        wait: RelaunchWait,
    ) -> Result<RelaunchStatus, ElevationError> {
        let verb = wide(OsStr::new("runas"));
        let file = wide(exe.as_os_str());
        let parameters = parameters
            .iter()
            .copied()
            .chain(std::iter::once(0))
            .collect::<Vec<u16>>();
        let directory = cwd.map(|p| wide(p.as_os_str()));

        unsafe {
            let mut info: SHELLEXECUTEINFOW = std::mem::zeroed();
            info.cbSize = std::mem::size_of::<SHELLEXECUTEINFOW>() as DWORD;
            info.fMask = SEE_MASK_NOCLOSEPROCESS | SEE_MASK_FLAG_NO_UI | SEE_MASK_NO_CONSOLE;
            info.lpVerb = verb.as_ptr();
            info.lpFile = file.as_ptr();
            info.lpParameters = parameters.as_ptr();
            info.lpDirectory = directory
                .as_ref()
                .map(|d| d.as_ptr())
                .unwrap_or(std::ptr::null());
            info.nShow = SW_HIDE;

            if ShellExecuteExW(&mut info) == 0 {
                return Err(ElevationError::Launch(std::io::Error::last_os_error()));
            }

            if info.hProcess.is_null() {
                return Err(ElevationError::Launch(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    "no process handle for elevated process",
                )));
            }

            let process = OwnedHandle(info.hProcess);

            let timeout = match wait {
                RelaunchWait::Forever => INFINITE,
                RelaunchWait::Bounded(duration) => {
                    duration.as_millis().min((INFINITE - 1) as u128) as DWORD
                }
            };

            match WaitForSingleObject(process.0, timeout) {
                WAIT_OBJECT_0 => {}
                WAIT_TIMEOUT => return Ok(RelaunchStatus::StillRunning),
                _ => return Err(ElevationError::Wait(std::io::Error::last_os_error())),
            }

            let mut exit_code: DWORD = 0;
            if GetExitCodeProcess(process.0, &mut exit_code) == 0 {
                return Err(ElevationError::Wait(std::io::Error::last_os_error()));
            }

            Ok(RelaunchStatus::Exited(exit_code as i32))
        }
    }
}

/// Whether the current process runs as a member of Administrators or System Operators.
#[cfg(windows)]
pub fn is_elevated() -> Result<bool, ElevationError> {
    imp::is_elevated()
}

/// Whether the current process runs as a member of Administrators or System Operators.
#[cfg(not(windows))]
pub fn is_elevated() -> Result<bool, ElevationError> {
    Err(ElevationError::Unsupported)
}

/// Run `exe` with `args` through the `runas` verb and wait for it.
///
/// The child runs in `cwd` if given. Its window is hidden.
#[cfg(windows)]
pub fn relaunch_elevated(
    exe: &Path,
    args: &[OsString],
    cwd: Option<&Path>,
    wait: RelaunchWait,
) -> Result<RelaunchStatus, ElevationError> {
    use std::os::windows::ffi::OsStrExt;

    let args = args
        .iter()
        .map(|a| a.encode_wide().collect::<Vec<u16>>())
        .collect::<Vec<_>>();

    imp::relaunch_elevated(exe, &windows_command_line(&args), cwd, wait)
}

/// Run `exe` with `args` through the `runas` verb and wait for it.
#[cfg(not(windows))]
pub fn relaunch_elevated(
    _exe: &Path,
    _args: &[OsString],
    _cwd: Option<&Path>,
    _wait: RelaunchWait,
) -> Result<RelaunchStatus, ElevationError> {
    Err(ElevationError::Unsupported)
}
