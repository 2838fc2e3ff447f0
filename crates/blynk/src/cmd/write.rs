use crate::cmd::{ConnectionArgs, WriteArgs};
use crate::exit::{client_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_sent, OutputFormat, SentOutput};

pub async fn run(args: WriteArgs, conn: &ConnectionArgs, format: OutputFormat) -> CliResult<i32> {
    let digital = if args.digital {
        Some(parse_level(&args.value)?)
    } else {
        None
    };

    let client = conn.connect().await?;
    let sent = match digital {
        Some(high) => client.digital_write(args.pin, high).await,
        None => client.virtual_write(args.pin, &args.value).await,
    };
    client.disconnect().await;
    let message_id = sent.map_err(|err| client_error("write failed", err))?;

    let (action, prefix) = if args.digital { ("digital-write", 'D') } else { ("virtual-write", 'V') };
    print_sent(
        &SentOutput {
            action,
            message_id,
            target: format!("{prefix}{}={}", args.pin, args.value),
        },
        format,
    );
    Ok(SUCCESS)
}

fn parse_level(value: &str) -> CliResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "on" | "true" | "high" => Ok(true),
        "0" | "off" | "false" | "low" => Ok(false),
        other => Err(CliError::new(
            USAGE,
            format!("invalid digital level {other:?} (expected 1/0, on/off, true/false)"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digital_levels() {
        assert!(parse_level("1").unwrap());
        assert!(parse_level("ON").unwrap());
        assert!(!parse_level("false").unwrap());
        assert_eq!(parse_level("2").unwrap_err().code, USAGE);
    }
}
