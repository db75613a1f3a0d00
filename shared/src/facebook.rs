//! Outbound posting to the Facebook Send API.

use reqwest::redirect::Policy;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info};

use crate::{Error, Result};

/// Body of a send-message request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostParams {
    pub message: Value,
    pub recipient: Value,
}

impl PostParams {
    /// Pick `message` and `recipient` out of an action parameter object.
    pub fn from_params(params: &Value) -> Self {
        Self {
            message: params["message"].clone(),
            recipient: params["recipient"].clone(),
        }
    }
}

/// Successful post outcome.
///
/// `text` carries the HTTP status code; callers log and match on that name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostResult {
    pub text: u16,
    pub url: String,
    pub params: PostParams,
}

/// Client for the channel's send-message endpoint.
#[derive(Debug, Clone)]
pub struct FacebookClient {
    http_client: reqwest::Client,
}

impl FacebookClient {
    /// Create a client. Redirects are not followed; a 3xx is a failed post.
    pub fn new() -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .redirect(Policy::none())
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { http_client })
    }

    /// Post `params` to `destination_url`, authenticated with `access_token`.
    ///
    /// Single attempt; retrying is up to the caller.
    pub async fn post(
        &self,
        params: &PostParams,
        destination_url: &str,
        access_token: &str,
    ) -> Result<PostResult> {
        let url = Url::parse(destination_url)
            .ok()
            .filter(|url| matches!(url.scheme(), "http" | "https"))
            .ok_or_else(|| Error::InvalidUri(destination_url.to_string()))?;

        let response = self
            .http_client
            .post(url)
            .query(&[("access_token", access_token)])
            .json(params)
            .send()
            .await
            .map_err(|e| {
                error!("Facebook post to {} failed: {}", destination_url, e);
                Error::Transport(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let reason = status.canonical_reason().unwrap_or("Unknown").to_string();
            error!("Facebook post returned {}", status);
            return Err(Error::HttpStatus {
                code: status.as_u16(),
                reason,
            });
        }

        info!("Facebook post delivered with status {}", status.as_u16());
        Ok(PostResult {
            text: status.as_u16(),
            url: destination_url.to_string(),
            params: params.clone(),
        })
    }
}
