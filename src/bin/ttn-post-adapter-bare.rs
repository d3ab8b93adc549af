//! "Bare" version of the TTN post adapter.
//!
//! This executable takes the raw event JSON (`path`, `body`,
//! `queryStringParameters`, `headers`) and returns `{statusCode, body}`,
//! which makes it easy to poke at locally. The cloud deployment uses the
//! "proxy event" version, which speaks API Gateway's proxy protocol.

use lambda_runtime::{run, service_fn, Error, LambdaEvent};

use ttn_post_adapter::{Adapter, InboundRequest, RelayResponse};

#[tokio::main]
async fn main() -> Result<(), Error> {
    let adapter = Adapter::init().await?;
    let ref_adapter = &adapter;

    run(service_fn(|event: LambdaEvent<InboundRequest>| async move {
        let (request, _context) = event.into_parts();
        let response: RelayResponse = ref_adapter.dispatch(request).await?;
        Ok::<_, Error>(response)
    }))
    .await?;
    Ok(())
}
