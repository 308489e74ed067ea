// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use {
    crate::{
        error::{Result, SelfSignError},
        logging, pipeline,
        resources::{self, EMBEDDED_PAYLOADS},
        settings::{Settings, DEFAULT_TIMESTAMP_URL},
        signer,
    },
    clap::{value_parser, Arg, ArgAction, ArgMatches, Command},
    log::{info, warn},
    selfsign_windows::{DuctRunner, RelaunchStatus, RelaunchWait},
    std::{
        ffi::OsString,
        path::{Path, PathBuf},
        time::Duration,
    },
};

const SELFSIGN_ABOUT: &str = "\
Create a self-signed code signing certificate and sign an executable with it.

The following files are created in the work directory (the current directory
by default) and reused by later runs:

selfsign-ca.pvk, selfsign-ca.cer
   A self-signed certificate authority. It is imported into the current
   user's Root and trustedpublisher certificate stores on every run.

selfsign-spc.pvk, selfsign-spc.cer
   A code signing certificate issued by the certificate authority.

selfsign.pfx
   The code signing key and certificate in the form consumed by signtool.

Delete a file to have it regenerated. Regenerating the code signing
certificate also regenerates selfsign.pfx.

makecert.exe, pvk2pfx.exe and signtool.exe are extracted into the work
directory unless files with those names already exist there.

TARGET is copied to a file with its extension replaced by `.signed.exe` and
the copy is signed. The original file is left untouched. Without TARGET, this
program signs a copy of itself.

Importing into the trusted root store requires administrative privileges. If
the process is not elevated, it relaunches itself through the `runas` verb
and exits with the exit code of the elevated process.
";

pub fn command() -> Command {
    Command::new("selfsign")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Sign an executable with a self-signed code signing certificate")
        .long_about(SELFSIGN_ABOUT)
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .action(ArgAction::Count)
                .help("Increase logging verbosity. Can be specified multiple times"),
        )
        .arg(
            Arg::new("work_dir")
                .long("work-dir")
                .value_name("DIR")
                .env("SELFSIGN_WORK_DIR")
                .value_parser(value_parser!(PathBuf))
                .help("Directory holding certificates and extracted tools"),
        )
        .arg(
            Arg::new("timestamp_url")
                .long("timestamp-url")
                .value_name("URL")
                .env("SELFSIGN_TIMESTAMP_URL")
                .default_value(DEFAULT_TIMESTAMP_URL)
                .help("URL of timestamp server to use when signing"),
        )
        .arg(
            Arg::new("no_elevate")
                .long("no-elevate")
                .action(ArgAction::SetTrue)
                .help("Do not check for or acquire administrative privileges"),
        )
        .arg(
            Arg::new("elevation_timeout")
                .long("elevation-timeout")
                .value_name("SECONDS")
                .value_parser(value_parser!(u64))
                .help("Give up waiting on the elevated process after this many seconds"),
        )
        .arg(
            Arg::new("target")
                .value_name("TARGET")
                .value_parser(value_parser!(PathBuf))
                .help("Executable to copy and sign (default: this program)"),
        )
}

/// Resolve [Settings] from parsed arguments.
///
/// A relative work directory is resolved against `cwd`.
pub fn settings_from_args(args: &ArgMatches, cwd: &Path) -> Settings {
    let work_dir = match args.get_one::<PathBuf>("work_dir") {
        Some(p) if p.is_absolute() => p.clone(),
        Some(p) => cwd.join(p),
        None => cwd.to_path_buf(),
    };

    let mut settings = Settings::new(work_dir);

    if let Some(url) = args.get_one::<String>("timestamp_url") {
        settings.timestamp_url = url.clone();
    }

    settings.elevate = !args.get_flag("no_elevate");

    if let Some(seconds) = args.get_one::<u64>("elevation_timeout") {
        settings.elevation_wait = RelaunchWait::Bounded(Duration::from_secs(*seconds));
    }

    settings
}

/// Resolve the exit code of this process from the outcome of an elevated relaunch.
///
/// The child's exit code becomes ours. A child outliving a bounded wait is fatal.
fn relaunch_exit_code(status: RelaunchStatus, wait: RelaunchWait) -> Result<i32> {
    match status {
        RelaunchStatus::Exited(code) => Ok(code),
        RelaunchStatus::StillRunning => {
            let seconds = match wait {
                RelaunchWait::Bounded(duration) => duration.as_secs(),
                RelaunchWait::Forever => 0,
            };

            Err(SelfSignError::RelaunchStillRunning(seconds))
        }
    }
}

/// Start this executable again with elevated privileges and wait for it.
fn relaunch(settings: &Settings, cwd: &Path) -> Result<i32> {
    let exe = std::env::current_exe().map_err(SelfSignError::CurrentExe)?;
    let args = std::env::args_os().skip(1).collect::<Vec<OsString>>();

    info!("relaunching {} with administrative privileges", exe.display());

    let status =
        selfsign_windows::relaunch_elevated(&exe, &args, Some(cwd), settings.elevation_wait)
            .map_err(SelfSignError::Relaunch)?;

    relaunch_exit_code(status, settings.elevation_wait)
}

/// Extract tools, provision certificates and sign `target`.
fn run_privileged(settings: &Settings, target: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(&settings.work_dir).map_err(SelfSignError::WorkDir)?;

    resources::extract_tools(EMBEDDED_PAYLOADS, &settings.work_dir)?;

    let tools = settings.tool_paths();
    let runner = DuctRunner;

    let report = pipeline::provision(settings, &tools, &runner)?;
    info!("provisioning finished: {:?}", report);

    signer::sign(settings, &tools, &runner, target)
}

pub fn run_cli() -> Result<i32> {
    let matches = command().get_matches();

    logging::init(logging::level_from_verbosity(matches.get_count("verbose")));

    let cwd = std::env::current_dir().map_err(SelfSignError::WorkDir)?;
    let settings = settings_from_args(&matches, &cwd);

    if settings.elevate {
        if !selfsign_windows::is_elevated().map_err(SelfSignError::ElevationQuery)? {
            return relaunch(&settings, &cwd);
        }
    } else {
        warn!("not checking for administrative privileges");
    }

    let target = match matches.get_one::<PathBuf>("target") {
        Some(p) => p.clone(),
        None => std::env::current_exe().map_err(SelfSignError::CurrentExe)?,
    };

    let output = run_privileged(&settings, &target)?;
    println!("signed: \"{}\"", output.display());

    Ok(0)
}
