use std::path::PathBuf;
use std::time::Duration;

use blynk_client::{Client, ClientConfig};
use blynk_transport::{Endpoint, TlsConfig, DEFAULT_PORT, DEFAULT_TLS_PORT};
use clap::{Args, Subcommand};

use crate::exit::{client_error, transport_error, CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod notify;
pub mod read;
pub mod run;
pub mod version;
pub mod write;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Write a value to a pin.
    Write(WriteArgs),
    /// Request pin values and print the first reply.
    Read(ReadArgs),
    /// Send a push notification.
    Notify(TextArgs),
    /// Post a tweet.
    Tweet(TextArgs),
    /// Send an email.
    Email(EmailArgs),
    /// Stay connected, answer pin reads and print inbound hardware frames.
    Run(RunArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub async fn run(command: Command, conn: &ConnectionArgs, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Write(args) => write::run(args, conn, format).await,
        Command::Read(args) => read::run(args, conn, format).await,
        Command::Notify(args) => notify::notify(args, conn, format).await,
        Command::Tweet(args) => notify::tweet(args, conn, format).await,
        Command::Email(args) => notify::email(args, conn, format).await,
        Command::Run(args) => run::run(args, conn, format).await,
        Command::Version(args) => version::run(args),
    }
}

/// Broker connection flags shared by every networked subcommand.
#[derive(Args, Debug, Clone)]
pub struct ConnectionArgs {
    /// Broker host.
    #[arg(long, default_value = blynk_client::DEFAULT_SERVER, global = true)]
    pub server: String,
    /// Broker port. Default: 80, or 443 with --tls.
    #[arg(long, global = true)]
    pub port: Option<u16>,
    /// Device auth token.
    #[arg(long, env = "BLYNK_TOKEN", hide_env_values = true, global = true)]
    pub token: Option<String>,
    /// Connect over TLS (requires --ca-file).
    #[arg(long, global = true)]
    pub tls: bool,
    /// PEM file with the trusted root certificate.
    #[arg(long, value_name = "PATH", global = true)]
    pub ca_file: Option<PathBuf>,
    /// Keepalive interval (e.g. 10s, 500ms).
    #[arg(long, default_value = "10s", global = true)]
    pub heartbeat: String,
    /// Response and read timeout (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s", global = true)]
    pub timeout: String,
}

impl ConnectionArgs {
    pub fn timeout(&self) -> CliResult<Duration> {
        parse_duration(&self.timeout)
    }

    pub fn client_config(&self) -> CliResult<ClientConfig> {
        let token = self
            .token
            .clone()
            .filter(|token| !token.is_empty())
            .ok_or_else(|| CliError::new(USAGE, "an auth token is required (--token or BLYNK_TOKEN)"))?;

        let tls = match (self.tls, &self.ca_file) {
            (true, Some(path)) => Some(
                TlsConfig::from_pem_file(path)
                    .map_err(|err| transport_error("failed loading --ca-file", err))?,
            ),
            (true, None) => return Err(CliError::new(USAGE, "--tls requires --ca-file")),
            (false, _) => None,
        };
        let default_port = if tls.is_some() {
            DEFAULT_TLS_PORT
        } else {
            DEFAULT_PORT
        };

        let mut config = ClientConfig::new(token);
        config.endpoint = Endpoint::new(self.server.clone(), self.port.unwrap_or(default_port));
        config.tls = tls;
        config.heartbeat = parse_duration(&self.heartbeat)?;
        config.response_timeout = self.timeout()?;
        Ok(config)
    }

    /// Build a client and bring its session up.
    pub async fn connect(&self) -> CliResult<Client> {
        let client = Client::new(self.client_config()?);
        client
            .connect()
            .await
            .map_err(|err| client_error("connect failed", err))?;
        Ok(client)
    }
}

#[derive(Args, Debug)]
pub struct WriteArgs {
    /// Pin number.
    pub pin: u32,
    /// Value to write. With --digital: 1/0, on/off or true/false.
    pub value: String,
    /// Write a digital pin instead of a virtual one.
    #[arg(long)]
    pub digital: bool,
}

#[derive(Args, Debug)]
pub struct ReadArgs {
    /// Pin numbers.
    #[arg(required = true)]
    pub pins: Vec<u32>,
    /// Read a digital pin instead of virtual ones (first pin only).
    #[arg(long)]
    pub digital: bool,
}

#[derive(Args, Debug)]
pub struct TextArgs {
    /// Message text.
    pub text: String,
}

#[derive(Args, Debug)]
pub struct EmailArgs {
    /// Recipient address.
    pub to: String,
    /// Subject line.
    pub subject: String,
    /// Message body.
    pub body: String,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Answer broker reads of a virtual pin with a fixed value (PIN=VALUE, repeatable).
    #[arg(long = "reader", value_name = "PIN=VALUE", value_parser = parse_pin_value)]
    pub readers: Vec<(u32, String)>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    if millis {
        Ok(Duration::from_millis(value))
    } else {
        Ok(Duration::from_secs(value))
    }
}

fn parse_pin_value(input: &str) -> Result<(u32, String), String> {
    let (pin, value) = input
        .split_once('=')
        .ok_or_else(|| format!("expected PIN=VALUE, got {input:?}"))?;
    let pin = pin
        .trim()
        .parse()
        .map_err(|_| format!("invalid pin number: {pin:?}"))?;
    Ok((pin, value.to_string()))
}
