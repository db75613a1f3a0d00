//! Normalize Facebook for Conversation Lambda.
//!
//! Turns an inbound `{provider, facebook}` event into dialog engine input:
//! `{conversation: {input: {text}}, raw_input_data}`. The workspace id in the
//! context key comes from the namespace's auth document.

use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use serde_json::Value;
use shared::{normalize_for_conversation, validate_inbound, Config, CredentialResolver, NormalizedInput};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const ERROR_NO_WORKSPACE_ID: &str = "auth.conversation.workspace_id not found.";

struct AppState {
    config: Config,
    resolver: CredentialResolver,
}

/// Check that the parameters carry Facebook data from the Facebook provider.
fn validate_parameters(params: &Value) -> shared::Result<()> {
    validate_inbound(params)
}

async fn normalize_action(state: &AppState, params: &Value) -> shared::Result<NormalizedInput> {
    validate_parameters(params)?;

    let auth = state
        .resolver
        .resolve(&state.config.namespace, &state.config.package_name)
        .await?;
    let workspace_id = auth
        .workspace_id()
        .ok_or_else(|| shared::Error::Validation(ERROR_NO_WORKSPACE_ID.to_string()))?;

    normalize_for_conversation(params, workspace_id)
}

async fn handler(state: Arc<AppState>, event: LambdaEvent<Value>) -> Result<Value, Error> {
    let (params, _context) = event.into_parts();

    match normalize_action(&state, &params).await {
        Ok(normalized) => {
            info!(
                "Normalized event for {}",
                normalized.raw_input_data.cloudant_context_key
            );
            Ok(serde_json::to_value(normalized)?)
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

    let config = Config::from_env()?;
    let state = Arc::new(AppState {
        resolver: CredentialResolver::new(&config),
        config,
    });

    run(service_fn(move |event| {
        let state = Arc::clone(&state);
        async move { handler(state, event).await }
    }))
    .await
}
