//! Command line surface of `fit` and `fit-hello`
//!
//! Every flag is optional at the parser level. Commands check for their
//! required flags themselves and print a usage line when one is missing,
//! so that a forgotten `--rp` is not an error exit.

use crate::config::{Config, OutputMode};
use crate::selection::{CredentialSelector, DeviceSelector};

use std::ffi::OsString;

use clap::error::{ContextKind, ContextValue, ErrorKind};
use clap::{Args, Parser, Subcommand};

pub const HARDWARE_USAGE: &str = "\
Usage: fit <command> [arguments]

Commands:
  list            Lists attached FIDO2 devices.
  auth --rp RP_ID [--pin PIN] [--cred-id-hex HEX|--cred-id-b64 B64URL|--cred-index N] [--create] [--device N|--path PATH]
                Performs a challenge/response (assertion). If --create is set, it will create a transient
                credential (non-resident) first, then assert using that credential.
  add-passkey --rp RP_ID [--user USER] [--display NAME] [--resident|--no-resident] [--pin PIN] [--device N|--path PATH]
                Creates a new passkey (discoverable credential) on a FIDO2 security key.
  set-pin --new NEW [--old OLD] [--device N|--path PATH]
                Sets the device PIN (initial if --old omitted, otherwise changes PIN).
  reset [--device N|--path PATH]
                Performs a factory reset on a FIDO2 device.
  info [--pin PIN] [--device N|--path PATH]
                Displays device information / non-destructive diagnostics.
  version         Prints the build version.

Global flags:
  --json          Output machine-readable JSON where applicable.
  --verbose       Log protocol details to stderr.";

pub const HELLO_USAGE: &str = "\
Usage: fit-hello <command> [arguments]

Commands (Windows Hello):
  list [--rp RP]         List Windows Hello platform credentials (filter by RP).
  test [--rp RP]         Show diagnostic info and list credentials (subset).
  auth --rp RP [--cred-id-hex HEX|--cred-id-b64 B64URL|--cred-index N|--device]
                         Perform an assertion. If no allow list and --device set, Windows selector opens for external keys.
  add-passkey --rp RP [--user USER] [--display NAME] [--device] [--resident|--no-resident]
                         Create a new passkey. --device prefers external security keys.
  delete-passkey [--rp RP] (--cred-id-hex HEX|--cred-id-b64 B64URL|--cred-index N)
                         Delete a Windows Hello platform credential.
  version                Print build version.

Global:
  --json                 Output JSON where applicable.
  --verbose              Log diagnostics to stderr.";

pub const AUTH_USAGE: &str = "Usage: auth --rp RP_ID [--pin PIN] [--cred-id-hex HEX|--cred-id-b64 B64URL|--cred-index N] [--create] [--device N|--path PATH]";
pub const ADD_PASSKEY_USAGE: &str = "Usage: add-passkey --rp RP_ID [--user USER] [--display NAME] [--resident|--no-resident] [--pin PIN] [--device N|--path PATH]";
pub const SET_PIN_USAGE: &str = "Usage: set-pin --new NEW [--old OLD] [--device N|--path PATH]";
pub const HELLO_AUTH_USAGE: &str =
    "Usage: auth --rp RP [--cred-id-hex HEX|--cred-id-b64 B64URL|--cred-index N|--device]";
pub const HELLO_ADD_PASSKEY_USAGE: &str =
    "Usage: add-passkey --rp RP [--user USER] [--display NAME] [--device] [--resident|--no-resident]";
pub const DELETE_PASSKEY_USAGE: &str =
    "Usage: delete-passkey [--rp RP] (--cred-id-hex HEX|--cred-id-b64 B64URL|--cred-index N)";

/// Flags accepted before or after every verb
#[derive(Debug, Clone, Default, Args)]
pub struct GlobalArgs {
    /// Output machine-readable JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Log protocol details to stderr
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,
}

impl GlobalArgs {
    pub fn config(&self) -> Config {
        let output = if self.json {
            OutputMode::Json
        } else {
            OutputMode::Text
        };
        Config::new().with_output(output).with_verbose(self.verbose)
    }
}

#[derive(Debug, Clone, Default, Args)]
pub struct DeviceArgs {
    /// Device index from `list`; a bare `--device` selects nothing
    #[arg(long = "device", value_name = "N", num_args = 0..=1, allow_negative_numbers = true)]
    pub index: Option<i64>,

    /// Device path from `list`
    #[arg(long, value_name = "PATH")]
    pub path: Option<String>,
}

impl DeviceArgs {
    pub fn selector(&self) -> DeviceSelector {
        DeviceSelector {
            index: self.index,
            path: self.path.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, Args)]
pub struct CredentialArgs {
    /// Credential id as hex
    #[arg(long, value_name = "HEX")]
    pub cred_id_hex: Option<String>,

    /// Credential id as unpadded base64url
    #[arg(long, value_name = "B64URL")]
    pub cred_id_b64: Option<String>,

    /// Index into the credentials enumerated for the RP
    #[arg(long, value_name = "N", allow_hyphen_values = true)]
    pub cred_index: Option<i64>,
}

impl CredentialArgs {
    pub fn selector(&self, platform_selector: bool) -> CredentialSelector {
        CredentialSelector {
            hex: self.cred_id_hex.clone(),
            b64: self.cred_id_b64.clone(),
            index: self.cred_index,
            platform_selector,
        }
    }
}

#[derive(Debug, Clone, Default, Args)]
pub struct AuthArgs {
    #[arg(long)]
    pub rp: Option<String>,

    #[arg(long)]
    pub pin: Option<String>,

    #[command(flatten)]
    pub credential: CredentialArgs,

    /// Mint a transient credential first
    #[arg(long)]
    pub create: bool,

    #[command(flatten)]
    pub device: DeviceArgs,
}

#[derive(Debug, Clone, Default, Args)]
pub struct AddPasskeyArgs {
    #[arg(long)]
    pub rp: Option<String>,

    #[arg(long)]
    pub user: Option<String>,

    #[arg(long)]
    pub display: Option<String>,

    /// Discoverable credential (the default); `--no-resident` wins
    #[arg(long)]
    pub resident: bool,

    #[arg(long)]
    pub no_resident: bool,

    #[arg(long)]
    pub pin: Option<String>,

    #[command(flatten)]
    pub device: DeviceArgs,
}

impl AddPasskeyArgs {
    pub fn resident_key(&self) -> bool {
        !self.no_resident
    }
}

#[derive(Debug, Clone, Default, Args)]
pub struct SetPinArgs {
    #[arg(long)]
    pub new: Option<String>,

    #[arg(long)]
    pub old: Option<String>,

    #[command(flatten)]
    pub device: DeviceArgs,
}

#[derive(Debug, Clone, Default, Args)]
pub struct InfoArgs {
    /// Also report resident key counts
    #[arg(long)]
    pub pin: Option<String>,

    #[command(flatten)]
    pub device: DeviceArgs,
}

#[derive(Debug, Clone, Subcommand)]
pub enum HardwareCommand {
    /// List attached FIDO2 devices
    List,
    /// Challenge/response with a security key
    Auth(AuthArgs),
    /// Create a passkey on a security key
    AddPasskey(AddPasskeyArgs),
    /// Set or change the device PIN
    SetPin(SetPinArgs),
    /// Factory reset a security key
    Reset(DeviceArgs),
    /// Non-destructive diagnostics
    Info(InfoArgs),
    /// Print the build version
    Version,
}

impl HardwareCommand {
    /// Verb name for logs; arguments may carry a PIN and are left out
    pub fn verb(&self) -> &'static str {
        match self {
            HardwareCommand::List => "list",
            HardwareCommand::Auth(_) => "auth",
            HardwareCommand::AddPasskey(_) => "add-passkey",
            HardwareCommand::SetPin(_) => "set-pin",
            HardwareCommand::Reset(_) => "reset",
            HardwareCommand::Info(_) => "info",
            HardwareCommand::Version => "version",
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "fit", disable_help_subcommand = true, disable_version_flag = true)]
pub struct HardwareCli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Option<HardwareCommand>,
}

#[derive(Debug, Clone, Default, Args)]
pub struct RpFilterArgs {
    #[arg(long)]
    pub rp: Option<String>,
}

#[derive(Debug, Clone, Default, Args)]
pub struct HelloAuthArgs {
    #[arg(long)]
    pub rp: Option<String>,

    #[command(flatten)]
    pub credential: CredentialArgs,

    /// Let Windows offer external security keys
    #[arg(long)]
    pub device: bool,
}

#[derive(Debug, Clone, Default, Args)]
pub struct HelloAddPasskeyArgs {
    #[arg(long)]
    pub rp: Option<String>,

    #[arg(long)]
    pub user: Option<String>,

    #[arg(long)]
    pub display: Option<String>,

    /// Prefer an external security key
    #[arg(long)]
    pub device: bool,

    #[arg(long)]
    pub resident: bool,

    #[arg(long)]
    pub no_resident: bool,
}

impl HelloAddPasskeyArgs {
    pub fn resident_key(&self) -> bool {
        !self.no_resident
    }
}

#[derive(Debug, Clone, Default, Args)]
pub struct DeletePasskeyArgs {
    #[arg(long)]
    pub rp: Option<String>,

    #[command(flatten)]
    pub credential: CredentialArgs,
}

#[derive(Debug, Clone, Subcommand)]
pub enum HelloCommand {
    /// List Windows Hello platform credentials
    List(RpFilterArgs),
    /// Platform diagnostics
    Test(RpFilterArgs),
    /// Perform an assertion
    Auth(HelloAuthArgs),
    /// Create a passkey
    AddPasskey(HelloAddPasskeyArgs),
    /// Delete a platform credential
    DeletePasskey(DeletePasskeyArgs),
    /// Print the build version
    Version,
}

impl HelloCommand {
    pub fn verb(&self) -> &'static str {
        match self {
            HelloCommand::List(_) => "list",
            HelloCommand::Test(_) => "test",
            HelloCommand::Auth(_) => "auth",
            HelloCommand::AddPasskey(_) => "add-passkey",
            HelloCommand::DeletePasskey(_) => "delete-passkey",
            HelloCommand::Version => "version",
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "fit-hello", disable_help_subcommand = true, disable_version_flag = true)]
pub struct HelloCli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Option<HelloCommand>,
}

/// What to do with a command line
#[derive(Debug)]
pub enum Invocation<T> {
    /// Parsed command and the unknown arguments that were dropped
    Run(T, Vec<String>),
    /// Unknown or missing verb, or a help request
    Usage,
    /// A flag value failed to parse
    Invalid(clap::Error),
}

/// Parse a command line, dropping arguments no verb knows
///
/// Handlers validate their own flags, so an unrecognized flag or stray
/// value is removed and parsing retried rather than rejecting the line.
pub fn parse<T, I, S>(args: I) -> Invocation<T>
where
    T: Parser,
    I: IntoIterator<Item = S>,
    S: Into<OsString> + Clone,
{
    let mut args: Vec<OsString> = args.into_iter().map(Into::into).collect();
    let mut ignored = Vec::new();
    loop {
        let e = match T::try_parse_from(&args) {
            Ok(cli) => return Invocation::Run(cli, ignored),
            Err(e) => e,
        };
        match e.kind() {
            ErrorKind::UnknownArgument => match unknown_position(&e, &args) {
                Some(position) => {
                    let arg = args.remove(position);
                    ignored.push(arg.to_string_lossy().into_owned());
                }
                None => return Invocation::Usage,
            },
            ErrorKind::DisplayHelp
            | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
            | ErrorKind::DisplayVersion
            | ErrorKind::MissingSubcommand
            | ErrorKind::InvalidSubcommand => return Invocation::Usage,
            _ => return Invocation::Invalid(e),
        }
    }
}

/// Index of the token clap rejected; the program name is never a candidate
fn unknown_position(e: &clap::Error, args: &[OsString]) -> Option<usize> {
    let Some(ContextValue::String(rejected)) = e.get(ContextKind::InvalidArg) else {
        return None;
    };
    let with_value = format!("{rejected}=");
    args.iter().skip(1).position(|arg| {
        let arg = arg.to_string_lossy();
        arg == rejected.as_str() || arg.starts_with(&with_value)
    })
    .map(|i| i + 1)
}
