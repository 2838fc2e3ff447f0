mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::{Command, ConnectionArgs};
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "blynk", version, about = "Blynk hardware client CLI")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "info", global = true)]
    log_level: LogLevel,

    #[command(flatten)]
    connection: ConnectionArgs,

    #[command(subcommand)]
    command: Command,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = cmd::run(cli.command, &cli.connection, format).await;

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_write_subcommand() {
        let cli = Cli::try_parse_from(["blynk", "--token", "abc", "write", "9", "7.654"])
            .expect("write args should parse");

        let Command::Write(args) = cli.command else {
            panic!("expected write");
        };
        assert_eq!(args.pin, 9);
        assert_eq!(args.value, "7.654");
        assert!(!args.digital);
        assert_eq!(cli.connection.token.as_deref(), Some("abc"));
    }

    #[test]
    fn connection_flags_are_global() {
        let cli = Cli::try_parse_from([
            "blynk",
            "read",
            "1",
            "2",
            "--server",
            "127.0.0.1",
            "--port",
            "8080",
            "--timeout",
            "3s",
        ])
        .expect("read args should parse");

        let Command::Read(args) = cli.command else {
            panic!("expected read");
        };
        assert_eq!(args.pins, vec![1, 2]);
        assert_eq!(cli.connection.server, "127.0.0.1");
        assert_eq!(cli.connection.port, Some(8080));
        assert_eq!(cli.connection.timeout, "3s");
    }

    #[test]
    fn read_requires_a_pin() {
        let err = Cli::try_parse_from(["blynk", "read"]).expect_err("missing pins should fail");
        assert_eq!(
            err.kind(),
            clap::error::ErrorKind::MissingRequiredArgument
        );
    }

    #[test]
    fn parses_email_and_run() {
        let cli = Cli::try_parse_from(["blynk", "email", "a@b.c", "leak", "water detected"])
            .expect("email args should parse");
        assert!(matches!(cli.command, Command::Email(_)));

        let cli = Cli::try_parse_from(["blynk", "run", "--reader", "10=21.5", "--reader", "11=on"])
            .expect("run args should parse");
        let Command::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(
            args.readers,
            vec![(10, "21.5".to_string()), (11, "on".to_string())]
        );
    }

    #[test]
    fn rejects_bad_reader_pair() {
        let err = Cli::try_parse_from(["blynk", "run", "--reader", "ten"])
            .expect_err("bad reader should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn parses_log_and_format_flags() {
        let cli = Cli::try_parse_from([
            "blynk",
            "--format",
            "json",
            "--log-format",
            "json",
            "--log-level",
            "debug",
            "version",
            "--extended",
        ])
        .expect("version args should parse");
        assert_eq!(cli.format, Some(OutputFormat::Json));
        assert_eq!(cli.log_format, LogFormat::Json);
        assert_eq!(cli.log_level, LogLevel::Debug);
    }
}
