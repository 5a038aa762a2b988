//! Notification egress shared by the network functions

use reqwest::header::CONTENT_TYPE;
use tracing::warn;

/// POSTs one notification body to one subscriber.
///
/// Transport failures are logged and swallowed; successful responses are
/// drained and closed. No retry, no effect on other recipients.
pub(crate) async fn post_notification(client: reqwest::Client, url: String, body: Vec<u8>) {
    match client
        .post(&url)
        .header(CONTENT_TYPE, "application/json")
        .body(body)
        .send()
        .await
    {
        Ok(resp) => {
            let _ = resp.bytes().await;
        }
        Err(e) => warn!("Error notifying subscriber {url}: {e}"),
    }
}
