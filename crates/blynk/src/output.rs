use std::io::IsTerminal;
use std::time::{SystemTime, UNIX_EPOCH};

use blynk_frame::Response;
use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

#[derive(Clone, Debug, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Pretty
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct FrameOutput<'a> {
    kind: &'static str,
    command: String,
    message_id: u16,
    status: u16,
    values: &'a [String],
    timestamp: String,
}

/// Outcome of a command that sent one frame.
#[derive(Serialize)]
pub struct SentOutput<'a> {
    pub action: &'a str,
    pub message_id: u16,
    pub target: String,
}

pub fn print_frame(frame: &Response, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = FrameOutput {
                kind: "frame",
                command: frame.command.to_string(),
                message_id: frame.message_id,
                status: frame.status,
                values: &frame.values,
                timestamp: now_unix_seconds(),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["COMMAND", "ID", "STATUS", "VALUES"])
                .add_row(vec![
                    frame.command.to_string(),
                    frame.message_id.to_string(),
                    frame.status.to_string(),
                    values_preview(&frame.values),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "{} id={} values={}",
                frame.command,
                frame.message_id,
                values_preview(&frame.values)
            );
        }
    }
}

pub fn print_sent(sent: &SentOutput<'_>, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(sent).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["ACTION", "ID", "TARGET"])
                .add_row(vec![
                    sent.action.to_string(),
                    sent.message_id.to_string(),
                    sent.target.clone(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!("{} id={} {}", sent.action, sent.message_id, sent.target);
        }
    }
}

/// Body fields joined with spaces; the wire separator is not printable.
fn values_preview(values: &[String]) -> String {
    values.join(" ")
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}

#[cfg(test)]
mod tests {
    use blynk_frame::Command;

    use super::*;

    #[test]
    fn frame_json_shape() {
        let values = vec!["vw".to_string(), "5".to_string(), "42".to_string()];
        let out = FrameOutput {
            kind: "frame",
            command: Command::Hardware.to_string(),
            message_id: 3,
            status: 7,
            values: &values,
            timestamp: "0".to_string(),
        };
        let json: serde_json::Value = serde_json::to_value(&out).unwrap();
        assert_eq!(json["command"], "HARDWARE");
        assert_eq!(json["values"][2], "42");
    }

    #[test]
    fn preview_joins_fields() {
        assert_eq!(
            values_preview(&["vw".to_string(), "1".to_string()]),
            "vw 1"
        );
    }
}
