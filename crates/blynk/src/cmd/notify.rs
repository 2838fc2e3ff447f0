use blynk_client::Client;

use crate::cmd::{ConnectionArgs, EmailArgs, TextArgs};
use crate::exit::{client_error, CliResult, SUCCESS};
use crate::output::{print_sent, OutputFormat, SentOutput};

pub async fn notify(args: TextArgs, conn: &ConnectionArgs, format: OutputFormat) -> CliResult<i32> {
    let client = conn.connect().await?;
    let sent = client.notify(&args.text).await;
    finish(client, sent, "notify", args.text, format).await
}

pub async fn tweet(args: TextArgs, conn: &ConnectionArgs, format: OutputFormat) -> CliResult<i32> {
    let client = conn.connect().await?;
    let sent = client.tweet(&args.text).await;
    finish(client, sent, "tweet", args.text, format).await
}

pub async fn email(args: EmailArgs, conn: &ConnectionArgs, format: OutputFormat) -> CliResult<i32> {
    let client = conn.connect().await?;
    let sent = client.email(&args.to, &args.subject, &args.body).await;
    finish(client, sent, "email", args.to, format).await
}

async fn finish(
    client: Client,
    sent: blynk_client::Result<u16>,
    action: &str,
    target: String,
    format: OutputFormat,
) -> CliResult<i32> {
    client.disconnect().await;
    let message_id = sent.map_err(|err| client_error(&format!("{action} failed"), err))?;
    print_sent(
        &SentOutput {
            action,
            message_id,
            target,
        },
        format,
    );
    Ok(SUCCESS)
}
