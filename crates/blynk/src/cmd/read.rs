use crate::cmd::{ConnectionArgs, ReadArgs};
use crate::exit::{client_error, CliResult, SUCCESS};
use crate::output::{print_frame, OutputFormat};

pub async fn run(args: ReadArgs, conn: &ConnectionArgs, format: OutputFormat) -> CliResult<i32> {
    let timeout = conn.timeout()?;
    let client = conn.connect().await?;

    let result = async {
        match (args.digital, args.pins.first()) {
            (true, Some(&pin)) => client.digital_read(pin).await?,
            _ => client.virtual_read(&args.pins).await?,
        };
        client.next_hardware(timeout).await
    }
    .await;
    client.disconnect().await;

    let frame = result.map_err(|err| client_error("read failed", err))?;
    print_frame(&frame, format);
    Ok(SUCCESS)
}
