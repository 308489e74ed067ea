// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

mod cli;
mod error;
mod logging;
mod pipeline;
mod resources;
mod settings;
mod signer;
#[cfg(test)]
mod testutil;

fn main() {
    let exit_code = match cli::run_cli() {
        Ok(code) => code,
        Err(err) => {
            let mut source = std::error::Error::source(&err);
            while let Some(cause) = source {
                log::debug!("caused by: {}", cause);
                source = cause.source();
            }

            eprintln!("{}", err.diagnostic());
            1
        }
    };

    std::process::exit(exit_code)
}
