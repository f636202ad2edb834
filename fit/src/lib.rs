#![warn(unused_extern_crates)]

//! # fit
//!
//! FIDO2 diagnostics for external security keys and Windows Hello.
//!
//! Two binaries share this library:
//!
//! - `fit` talks CTAP2 to security keys over USB HID
//! - `fit-hello` drives the Windows WebAuthn API (Windows only)
//!
//! ## Architecture
//!
//! - **Selection**: turns `--device`/`--path` and the credential flags into
//!   one device and at most one credential id
//! - **Backends**: [`HidBackend`] and [`HelloBackend`] behind the
//!   [`Backend`] trait
//! - **Commands**: one module per verb, generic over device source,
//!   challenge source and output
//! - **Output**: text for people, indented JSON with `--json`
//!
//! ## Example
//!
//! ```no_run
//! use fit::challenge::OsChallenge;
//! use fit::cli::{self, HardwareCli, Invocation};
//! use fit::dispatch::{BUILD_VERSION, Dispatcher};
//! use fit::hid::UsbProvider;
//!
//! # fn main() -> anyhow::Result<()> {
//! if let Invocation::Run(cli, _) = cli::parse::<HardwareCli, _, _>(["fit", "list", "--json"]) {
//!     let config = cli.global.config();
//!     let mut out = std::io::stdout();
//!     Dispatcher::new(BUILD_VERSION).run_hardware(
//!         &config,
//!         cli.command,
//!         &UsbProvider::new(),
//!         &mut OsChallenge,
//!         &mut std::io::stdin().lock(),
//!         &mut out,
//!     )?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod challenge;
pub mod cli;
pub mod client_data;
pub mod commands;
pub mod config;
pub mod dispatch;
pub mod encoding;
pub mod error;
pub mod hello;
pub mod hid;
pub mod logging;
pub mod output;
pub mod selection;

pub use backend::Backend;
pub use config::{Config, OutputMode};
pub use dispatch::Dispatcher;
pub use error::{Error, Result};
pub use hello::{HelloBackend, PlatformApi};
pub use hid::{DeviceProvider, HidBackend};
