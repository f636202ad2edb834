//! Verb dispatch and process exit status

use crate::challenge::ChallengeSource;
use crate::cli::{HARDWARE_USAGE, HELLO_USAGE, HardwareCommand, HelloCommand};
use crate::commands::{self, Console};
use crate::config::Config;
use crate::error::Error;
use crate::hello::PlatformApi;
use crate::hid::DeviceProvider;

use std::io::{BufRead, Write};
use std::process::ExitCode;

use tracing::debug;

/// Version string baked in at compile time through `FIT_BUILD_VERSION`
pub const BUILD_VERSION: &str = match option_env!("FIT_BUILD_VERSION") {
    Some(version) => version,
    None => "dev",
};

/// Runs one verb against the backends it is handed
#[derive(Debug, Clone, Copy)]
pub struct Dispatcher {
    version: &'static str,
}

impl Dispatcher {
    pub fn new(version: &'static str) -> Self {
        Self { version }
    }

    pub fn version(&self) -> &'static str {
        self.version
    }

    /// Run a `fit` verb; `None` prints the usage text
    pub fn run_hardware<P, C, R, W>(
        &self,
        config: &Config,
        command: Option<HardwareCommand>,
        provider: &P,
        challenges: &mut C,
        input: &mut R,
        out: &mut W,
    ) -> anyhow::Result<()>
    where
        P: DeviceProvider,
        C: ChallengeSource,
        R: BufRead,
        W: Write,
    {
        let mut console = Console::new(config, out);
        let Some(command) = command else {
            console.line(HARDWARE_USAGE)?;
            return Ok(());
        };
        debug!(verb = command.verb(), "dispatching");

        match command {
            HardwareCommand::List => commands::list::run(provider, &mut console),
            HardwareCommand::Auth(args) => {
                commands::auth::run(provider, challenges, &args, input, &mut console)
            }
            HardwareCommand::AddPasskey(args) => {
                commands::add_passkey::run(provider, challenges, &args, input, &mut console)
            }
            HardwareCommand::SetPin(args) => {
                commands::set_pin::run(provider, &args, input, &mut console)
            }
            HardwareCommand::Reset(args) => {
                commands::reset::run(provider, &args, input, &mut console)
            }
            HardwareCommand::Info(args) => commands::info::run(provider, &args, input, &mut console),
            HardwareCommand::Version => Ok(console.line(self.version)?),
        }
    }

    /// Run a `fit-hello` verb; `None` prints the usage text
    pub fn run_hello<P, C, W>(
        &self,
        config: &Config,
        command: Option<HelloCommand>,
        api: &mut P,
        challenges: &mut C,
        out: &mut W,
    ) -> anyhow::Result<()>
    where
        P: PlatformApi,
        C: ChallengeSource,
        W: Write,
    {
        let mut console = Console::new(config, out);
        let Some(command) = command else {
            console.line(HELLO_USAGE)?;
            return Ok(());
        };
        debug!(verb = command.verb(), "dispatching");

        match command {
            HelloCommand::List(args) => commands::hello::list(api, &args, &mut console),
            HelloCommand::Test(args) => commands::hello::test(api, &args, &mut console),
            HelloCommand::Auth(args) => {
                commands::hello::auth(api, challenges, &args, &mut console)
            }
            HelloCommand::AddPasskey(args) => {
                commands::hello::add_passkey(api, challenges, &args, &mut console)
            }
            HelloCommand::DeletePasskey(args) => {
                commands::hello::delete_passkey(api, &args, &mut console)
            }
            HelloCommand::Version => Ok(console.line(self.version)?),
        }
    }
}

/// True when the OS random source failed anywhere in the chain
pub fn is_randomness_failure(err: &anyhow::Error) -> bool {
    err.chain()
        .any(|cause| cause.downcast_ref::<Error>().is_some_and(Error::is_randomness))
}

/// Map a command result to the process exit status
///
/// Errors print their context chain on stderr and exit 1. A failed random
/// source aborts the process.
pub fn finish(result: anyhow::Result<()>) -> ExitCode {
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) if is_randomness_failure(&err) => {
            eprintln!("{err:#}");
            std::process::abort()
        }
        Err(err) => {
            eprintln!("{err:#}");
            ExitCode::FAILURE
        }
    }
}
