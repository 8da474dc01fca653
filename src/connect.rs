use anyhow::Context;
use subxt::{OnlineClient, PolkadotConfig};

/// Opens a websocket connection to `url`. The client is returned once the
/// node's metadata and runtime version have been fetched, so it is ready to
/// query. Failures are not retried.
pub async fn connect(url: &str) -> anyhow::Result<OnlineClient<PolkadotConfig>> {
    tracing::debug!(url, "connecting");
    let api = OnlineClient::<PolkadotConfig>::from_url(url)
        .await
        .with_context(|| format!("failed to connect to substrate node {}", url))?;
    println!("Connected to substrate node: {}", url);
    Ok(api)
}
