#[cfg(not(windows))]
fn main() {
    println!("fit-hello: Windows-only binary (stub on non-Windows platforms)");
}

#[cfg(windows)]
fn main() -> std::process::ExitCode {
    use fit::challenge::OsChallenge;
    use fit::cli::{self, HELLO_USAGE, HelloCli, Invocation};
    use fit::dispatch::{BUILD_VERSION, Dispatcher, finish};
    use fit::hello::WindowsHello;
    use fit::logging;

    use std::process::ExitCode;

    use tracing::warn;

    let (cli, ignored) = match cli::parse::<HelloCli, _, _>(std::env::args_os()) {
        Invocation::Run(cli, ignored) => (cli, ignored),
        Invocation::Usage => {
            println!("{HELLO_USAGE}");
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
    let mut api = WindowsHello::new();
    let mut out = std::io::stdout().lock();
    finish(Dispatcher::new(BUILD_VERSION).run_hello(
        &config,
        cli.command,
        &mut api,
        &mut OsChallenge,
        &mut out,
    ))
}
