//! Facebook Receive Lambda - Webhook endpoint for Facebook Messenger.
//!
//! Answers the subscription handshake on GET. On POST it checks the
//! `X-Hub-Signature-256` header against the page's app secret, splits the
//! delivery into messaging events and hands each one to the pipeline
//! function as an async invocation.

use aws_sdk_lambda::primitives::Blob;
use aws_sdk_lambda::types::InvocationType;
use lambda_http::http::Method;
use lambda_http::{run, service_fn, Body, Error, Request, RequestExt, Response};
use serde_json::{json, Value};
use shared::http::{error_response, json_response, text_response, ApiResponse};
use shared::webhook::{messaging_events, verify_signature, verify_subscription, SubscriptionQuery, SIGNATURE_HEADER};
use shared::{Config, CredentialResolver};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

/// Application state
struct AppState {
    config: Config,
    resolver: CredentialResolver,
    lambda_client: aws_sdk_lambda::Client,
    pipeline_function: String,
}

impl AppState {
    /// Events have nowhere to go without a pipeline function, so one is required.
    fn new(config: Config, lambda_client: aws_sdk_lambda::Client) -> shared::Result<Self> {
        let pipeline_function = config
            .pipeline_function
            .clone()
            .filter(|name| !name.is_empty())
            .ok_or_else(|| shared::Error::Config("PIPELINE_FUNCTION_NAME not set".to_string()))?;

        Ok(Self {
            resolver: CredentialResolver::new(&config),
            lambda_client,
            pipeline_function,
            config,
        })
    }

    /// Invoke the pipeline function asynchronously with one event's parameters.
    async fn dispatch(&self, params: &Value) -> shared::Result<()> {
        self.lambda_client
            .invoke()
            .function_name(&self.pipeline_function)
            .invocation_type(InvocationType::Event)
            .payload(Blob::new(serde_json::to_vec(params)?))
            .send()
            .await
            .map_err(|e| {
                error!("Failed to invoke {}: {}", self.pipeline_function, e);
                shared::Error::Transport(format!("Failed to invoke pipeline: {}", e))
            })?;

        debug!("Dispatched event to {}", self.pipeline_function);
        Ok(())
    }
}

/// What arrived at the webhook.
enum Delivery<'a> {
    Subscribe(SubscriptionQuery),
    Events {
        signature: Option<&'a str>,
        body: &'a [u8],
    },
}

#[derive(Debug, PartialEq)]
enum Outcome {
    Challenge(String),
    Accepted(usize),
}

async fn receive(state: &AppState, delivery: Delivery<'_>) -> shared::Result<Outcome> {
    let auth = state
        .resolver
        .resolve(&state.config.namespace, &state.config.package_name)
        .await?;

    match delivery {
        Delivery::Subscribe(query) => {
            let token = auth.verification_token().ok_or_else(|| {
                shared::Error::Validation("auth.facebook.verification_token not found.".to_string())
            })?;
            let challenge = verify_subscription(&query, token)?;
            info!("Webhook subscription verified");
            Ok(Outcome::Challenge(challenge))
        }
        Delivery::Events { signature, body } => {
            let app_secret = auth.app_secret().ok_or_else(|| {
                shared::Error::Validation("auth.facebook.app_secret not found.".to_string())
            })?;
            let signature = signature.ok_or_else(|| {
                shared::Error::Signature(format!("{} header missing", SIGNATURE_HEADER))
            })?;
            verify_signature(body, signature, app_secret)?;

            let payload: Value = serde_json::from_slice(body)?;
            let events = messaging_events(&payload)?;

            // A failed dispatch fails the delivery so Facebook redelivers it.
            for params in &events {
                state.dispatch(params).await?;
            }
            info!("Dispatched {} messaging events", events.len());
            Ok(Outcome::Accepted(events.len()))
        }
    }
}

async fn handler(state: Arc<AppState>, event: Request) -> Result<Response<Body>, Error> {
    let delivery = match *event.method() {
        Method::GET => {
            let query = event.query_string_parameters();
            Delivery::Subscribe(SubscriptionQuery {
                mode: query.first("hub.mode").map(String::from),
                verify_token: query.first("hub.verify_token").map(String::from),
                challenge: query.first("hub.challenge").map(String::from),
            })
        }
        Method::POST => Delivery::Events {
            signature: event
                .headers()
                .get(SIGNATURE_HEADER)
                .and_then(|v| v.to_str().ok()),
            body: event.body().as_ref(),
        },
        _ => return text_response(405, "Method not allowed"),
    };

    match receive(&state, delivery).await {
        Ok(Outcome::Challenge(challenge)) => text_response(200, challenge),
        Ok(Outcome::Accepted(count)) => {
            json_response(200, &ApiResponse::success(json!({ "events": count })))
        }
        Err(e) => {
            warn!("Webhook rejected: {}", e);
            error_response(&e)
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
    let state = Arc::new(AppState::new(
        Config::from_env()?,
        aws_sdk_lambda::Client::new(&aws_config),
    )?);

    run(service_fn(move |event| {
        let state = Arc::clone(&state);
        async move { handler(state, event).await }
    }))
    .await
}
