use fit::challenge::OsChallenge;
use fit::cli::{self, HARDWARE_USAGE, HardwareCli, Invocation};
use fit::dispatch::{BUILD_VERSION, Dispatcher, finish};
use fit::hid::UsbProvider;
use fit::logging;

use std::io;
use std::process::ExitCode;

use tracing::warn;

fn main() -> ExitCode {
    let (cli, ignored) = match cli::parse::<HardwareCli, _, _>(std::env::args_os()) {
        Invocation::Run(cli, ignored) => (cli, ignored),
        Invocation::Usage => {
            println!("{HARDWARE_USAGE}");
            return ExitCode::SUCCESS;
        }
        Invocation::Invalid(e) => {
            let _ = e.print();
            return ExitCode::from(2);
        }
    };
    logging::init(cli.global.verbose);
    for arg in &ignored {
        warn!(%arg, "ignoring unknown argument");
    }

    let config = cli.global.config();
    let provider = UsbProvider::new();
    let mut input = io::stdin().lock();
    let mut out = io::stdout().lock();
    finish(Dispatcher::new(BUILD_VERSION).run_hardware(
        &config,
        cli.command,
        &provider,
        &mut OsChallenge,
        &mut input,
        &mut out,
    ))
}
