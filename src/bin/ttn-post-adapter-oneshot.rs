//! "Oneshot" version of the TTN post adapter.
//!
//! This executable handles one event, given as JSON text on the command
//! line, and prints the response JSON. It makes real outbound calls.

use lambda_runtime::Error;
use std::env;

use ttn_post_adapter::{Adapter, InboundRequest};

#[tokio::main]
async fn main() -> Result<(), Error> {
    let mut args = env::args();
    args.next(); // skip argv[0]

    let json_text = args.next().ok_or_else(|| -> Error {
        "first argument should be the event JSON (path, body, queryStringParameters, headers)"
            .into()
    })?;
    let request: InboundRequest = serde_json::from_str(&json_text)?;

    let adapter = Adapter::init().await?;
    let result = adapter.dispatch(request).await?;

    serde_json::to_writer(std::io::stdout().lock(), &result)?;
    Ok(())
}
