//! Facebook Post Lambda - Sends a reply to a Facebook Messenger user.
//!
//! This Lambda:
//! 1. Resolves the namespace's auth document from the credential store
//! 2. Validates the post parameters against the resolved page access token
//! 3. Posts `{message, recipient}` to the Send API

use lambda_runtime::{service_fn, Error, LambdaEvent};
use serde_json::{json, Value};
use shared::{validate_outbound, Config, CredentialResolver, FacebookClient, PostParams, PostResult};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Application state
struct AppState {
    config: Config,
    resolver: CredentialResolver,
    facebook: FacebookClient,
}

impl AppState {
    fn new(config: Config) -> shared::Result<Self> {
        Ok(Self {
            resolver: CredentialResolver::new(&config),
            facebook: FacebookClient::new()?,
            config,
        })
    }
}

/// Check a post parameter object. Fails on the first missing field.
fn validate_parameters(params: &Value) -> shared::Result<()> {
    validate_outbound(params)
}

/// Resolve credentials, validate and post to the configured Send API URL.
async fn post_action(state: &AppState, mut params: Value) -> shared::Result<PostResult> {
    let auth = state
        .resolver
        .resolve(&state.config.namespace, &state.config.package_name)
        .await?;

    let Some(fields) = params.as_object_mut() else {
        return Err(shared::Error::Validation(
            "Parameters must be a JSON object.".to_string(),
        ));
    };
    // Only the credential store's token is trusted.
    match auth.page_access_token() {
        Some(token) => fields.insert("page_access_token".to_string(), json!(token)),
        None => fields.remove("page_access_token"),
    };

    validate_parameters(&params)?;

    let access_token = params["page_access_token"].as_str().unwrap_or_default();
    state
        .facebook
        .post(
            &PostParams::from_params(&params),
            &state.config.facebook_post_url,
            access_token,
        )
        .await
}

async fn handler(state: Arc<AppState>, event: LambdaEvent<Value>) -> Result<Value, Error> {
    let (params, _context) = event.into_parts();

    match post_action(&state, params).await {
        Ok(result) => {
            info!("Posted reply with status {}", result.text);
            Ok(serde_json::to_value(result)?)
        }
        Err(e) => {
            error!("{}: {}", e.name(), e);
            Err(e.into())
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    let state = Arc::new(AppState::new(Config::from_env()?)?);

    lambda_runtime::run(service_fn(move |event| {
        let state = Arc::clone(&state);
        async move { handler(state, event).await }
    }))
    .await
}
