use tracing::info;

use crate::cmd::{ConnectionArgs, RunArgs};
use crate::exit::{client_error, CliError, CliResult, INTERNAL, SUCCESS};
use crate::output::{print_frame, OutputFormat};

pub async fn run(args: RunArgs, conn: &ConnectionArgs, format: OutputFormat) -> CliResult<i32> {
    let client = conn.connect().await?;

    for (pin, value) in args.readers {
        client.register_reader(pin, move |_| value.clone());
    }
    client.on_hardware(move |frame| print_frame(frame, format));

    let runner = client.clone();
    let mut processing = tokio::spawn(async move { runner.run().await });

    let finished = tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            signal.map_err(|err| {
                CliError::new(INTERNAL, format!("signal handler setup failed: {err}"))
            })?;
            None
        }
        joined = &mut processing => Some(joined),
    };

    let joined = match finished {
        Some(joined) => joined,
        None => {
            info!("interrupted, stopping");
            client.stop().await;
            processing.await
        }
    };

    match joined {
        Ok(result) => result.map_err(|err| client_error("session ended", err))?,
        Err(err) => {
            return Err(CliError::new(
                INTERNAL,
                format!("processing task failed: {err}"),
            ))
        }
    }
    Ok(SUCCESS)
}
