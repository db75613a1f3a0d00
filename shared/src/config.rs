//! Configuration management for the connector actions.

use std::env;

use crate::{Error, Result};

/// Graph API endpoint replies are posted to unless overridden.
pub const DEFAULT_FACEBOOK_POST_URL: &str = "https://graph.facebook.com/v2.6/me/messages";

/// Action configuration, loaded once per cold start and passed to constructors.
#[derive(Debug, Clone)]
pub struct Config {
    /// Action platform API host, with or without scheme
    pub api_host: String,
    /// Action platform API key (`user:password`)
    pub api_key: Option<String>,
    /// Namespace the action is deployed in
    pub namespace: String,
    /// Package holding the credential store annotations
    pub package_name: String,
    /// Channel send-message endpoint
    pub facebook_post_url: String,
    /// Function the receive webhook dispatches events to
    pub pipeline_function: Option<String>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let action_name = required("__OW_ACTION_NAME")?;

        Ok(Self {
            api_host: required("__OW_API_HOST")?,
            api_key: env::var("__OW_API_KEY").ok(),
            namespace: required("__OW_NAMESPACE")?,
            package_name: package_from_action_name(&action_name)?,
            facebook_post_url: env::var("FACEBOOK_POST_URL")
                .unwrap_or_else(|_| DEFAULT_FACEBOOK_POST_URL.to_string()),
            pipeline_function: env::var("PIPELINE_FUNCTION_NAME").ok(),
        })
    }

    /// Base URL of the action platform API, defaulting to https.
    pub fn api_base_url(&self) -> String {
        let host = self.api_host.trim_end_matches('/');
        if host.starts_with("http://") || host.starts_with("https://") {
            host.to_string()
        } else {
            format!("https://{}", host)
        }
    }
}

fn required(name: &str) -> Result<String> {
    env::var(name).map_err(|_| Error::Config(format!("{} not set", name)))
}

/// Extract the package from a fully qualified action name (`/namespace/package/action`).
pub fn package_from_action_name(action_name: &str) -> Result<String> {
    match action_name.split('/').collect::<Vec<_>>().as_slice() {
        ["", _namespace, package, _action] if !package.is_empty() => Ok(package.to_string()),
        _ => Err(Error::Config(format!(
            "Action name '{}' is not of the form /namespace/package/action",
            action_name
        ))),
    }
}
