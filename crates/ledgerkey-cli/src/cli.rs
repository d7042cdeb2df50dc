//! Argument parsing and command dispatch.
//!
//! `login` and `logout` are registration hooks: each takes a parent
//! command and returns it with the subcommand attached, so other command
//! trees can mount them too.

use std::path::PathBuf;

use anyhow::{anyhow, Context};
use clap::{Arg, ArgMatches, Args, Command, FromArgMatches};
use ledgerkey_core::api::HttpSessionClient;
use ledgerkey_core::auth::{Outcome, ADMIN_USERNAME};
use ledgerkey_core::config::{self, ConfigFile, ConfigOverrides};
use ledgerkey_core::session::{run_session_command, SessionCommand};
use ledgerkey_core::SessionError;

use crate::reader::TerminalPasswordReader;

const LOGIN: &str = "login";
const LOGOUT: &str = "logout";
const USERNAME: &str = "username";

/// Exit status for every fatal error
const EXIT_FAILURE: u8 = 1;

/// CLI-level error: bad configuration or a failed session command.
#[derive(Debug)]
pub enum CliError {
    Failure(anyhow::Error),
    Session(SessionError),
}

impl CliError {
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Failure(_) => EXIT_FAILURE,
            Self::Session(err) => u8::try_from(err.exit_code()).unwrap_or(EXIT_FAILURE),
        }
    }

    pub fn display_message(&self) -> String {
        match self {
            Self::Failure(err) => format!("{err:#}"),
            Self::Session(err) => err.to_string(),
        }
    }
}

impl From<SessionError> for CliError {
    fn from(err: SessionError) -> Self {
        Self::Session(err)
    }
}

impl From<anyhow::Error> for CliError {
    fn from(err: anyhow::Error) -> Self {
        Self::Failure(err)
    }
}

/// Connection flags shared by every subcommand.
#[derive(Args, Debug, Clone, Default)]
pub struct ConnectionArgs {
    /// Config file (default is ~/.config/ledgerkey/config.json)
    #[arg(long, global = true, env = "LEDGERKEY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Service host address
    #[arg(short = 'a', long, global = true, env = "LEDGERKEY_ADDRESS")]
    pub address: Option<String>,

    /// Service port number
    #[arg(short = 'p', long, global = true, env = "LEDGERKEY_PORT")]
    pub port: Option<u16>,

    /// Use authentication
    #[arg(
        short = 's',
        long,
        global = true,
        env = "LEDGERKEY_AUTH",
        num_args = 0..=1,
        default_missing_value = "true"
    )]
    pub auth: Option<bool>,

    /// Enable mutual TLS
    #[arg(
        short = 'm',
        long,
        global = true,
        env = "LEDGERKEY_MTLS",
        num_args = 0..=1,
        default_missing_value = "true"
    )]
    pub mtls: Option<bool>,

    /// Name used to verify the server certificate
    #[arg(long, global = true, env = "LEDGERKEY_SERVERNAME")]
    pub servername: Option<String>,

    /// Client certificate file path
    #[arg(long, global = true, env = "LEDGERKEY_CERTIFICATE")]
    pub certificate: Option<PathBuf>,

    /// Client private key path
    #[arg(long, global = true, env = "LEDGERKEY_PKEY")]
    pub pkey: Option<PathBuf>,

    /// Trusted certificate authority bundle
    #[arg(long, global = true, env = "LEDGERKEY_CLIENTCAS")]
    pub clientcas: Option<PathBuf>,

    /// Where the session token is stored
    #[arg(long, global = true, env = "LEDGERKEY_TOKEN_FILE")]
    pub token_file: Option<PathBuf>,
}

impl ConnectionArgs {
    fn into_overrides(self) -> ConfigOverrides {
        ConfigOverrides {
            address: self.address,
            port: self.port,
            auth: self.auth,
            mtls: self.mtls,
            servername: self.servername,
            certificate: self.certificate,
            pkey: self.pkey,
            clientcas: self.clientcas,
            token_file: self.token_file,
        }
    }
}

/// The full command tree.
pub fn build() -> Command {
    let root = Command::new("ledgerkey")
        .about("Command-line client for the ledger service")
        .version(env!("CARGO_PKG_VERSION"))
        .subcommand_required(true)
        .arg_required_else_help(true);
    let root = ConnectionArgs::augment_args(root);
    logout(login(root))
}

/// Register `login <username>` under `parent`.
pub fn login(parent: Command) -> Command {
    parent.subcommand(
        Command::new(LOGIN)
            .visible_alias("l")
            .about(format!(
                "Login using the specified username and password (admin username is {})",
                ADMIN_USERNAME
            ))
            .arg(
                Arg::new(USERNAME)
                    .required(true)
                    .help("User to log in as (you will be prompted for password)"),
            ),
    )
}

/// Register `logout` under `parent`.
pub fn logout(parent: Command) -> Command {
    parent.subcommand(
        Command::new(LOGOUT)
            .visible_alias("x")
            .about("Logout and remove the stored session token"),
    )
}

/// Turn parsed arguments into a session command.
fn session_command(matches: &ArgMatches) -> Result<SessionCommand, CliError> {
    match matches.subcommand() {
        Some((LOGIN, sub)) => {
            let username = sub
                .get_one::<String>(USERNAME)
                .cloned()
                .ok_or_else(|| anyhow!("login requires a username"))?;
            Ok(SessionCommand::Login { username })
        }
        Some((LOGOUT, _)) => Ok(SessionCommand::Logout),
        Some((other, _)) => Err(anyhow!("unknown command: {}", other).into()),
        None => Err(anyhow!("no command given").into()),
    }
}

/// Resolve options, then run the selected command in a session.
pub async fn run(matches: &ArgMatches) -> Result<Outcome, CliError> {
    let command = session_command(matches)?;

    let args = ConnectionArgs::from_arg_matches(matches)
        .context("Failed to read connection flags")?;
    let file = ConfigFile::load(args.config.as_deref())?;
    let options = config::resolve(file, args.into_overrides())?;

    let client = HttpSessionClient::new();
    let outcome =
        run_session_command(&client, &options, &TerminalPasswordReader, command).await?;
    Ok(outcome)
}
