use std::time::Duration;

use artifact_probe::{CallContext, HttpClient, RequestDescriptor, RetryPolicy};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let client = HttpClient::from_env()?;
    let ctx = CallContext::new().with_timeout(Duration::from_secs(30));

    let request = RequestDescriptor::get("/v2/_catalog").header("Accept", "application/json")?;
    let mut backoff = client.create_backoff(&ctx, Duration::from_secs(10));

    let catalog: Option<serde_json::Value> = client
        .retry_json(&ctx, &request, &mut backoff, RetryPolicy::new(5))
        .await?;

    println!("{catalog:?}");
    Ok(())
}
