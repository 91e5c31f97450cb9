//! JSON-over-HTTP POST primitive.

use serde::Serialize;
use tracing::debug;

use crate::error::BridgeResult;

/// Status and body of a JSON POST.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonReply {
    pub status: u16,
    /// Parsed body. Only read for HTTP 200; `None` otherwise or when the body
    /// is not JSON.
    pub data: Option<serde_json::Value>,
}

/// POST `body` as JSON to `url`.
pub async fn post_json<T: Serialize + ?Sized>(
    client: &reqwest::Client,
    url: &str,
    body: &T,
) -> BridgeResult<JsonReply> {
    let response = client.post(url).json(body).send().await?;
    let status = response.status().as_u16();

    let data = if status == 200 {
        match response.json::<serde_json::Value>().await {
            Ok(value) => Some(value),
            Err(e) => {
                debug!(url = %url, error = %e, "Response body is not JSON");
                None
            }
        }
    } else {
        None
    };

    debug!(url = %url, status, "JSON POST completed");
    Ok(JsonReply { status, data })
}
