//! "Proxy event" version of the TTN post adapter.
//!
//! This executable defines a server that expects to be interacted with
//! according to AWS API Gateway's "proxy event" protocol. This is what the
//! TTN HTTP integration actually talks to, with the destination in the path
//! and its settings in the query string.

use lambda_http::{run, service_fn, Body, Error, Request, Response};

use ttn_post_adapter::{Adapter, InboundRequest};

#[tokio::main]
async fn main() -> Result<(), Error> {
    let adapter = Adapter::init().await?;
    let ref_adapter = &adapter;

    run(service_fn(|req: Request| async move {
        let request = InboundRequest::try_from(&req)?;
        let result = ref_adapter.dispatch(request).await?;

        let response = Response::builder()
            .status(result.status_code)
            .header("Content-Type", "application/json")
            .body(Body::from(result.body))?;
        Ok::<_, Error>(response)
    }))
    .await?;
    Ok(())
}
