//! Normalize Conversation for Facebook Lambda.
//!
//! Turns a dialog engine reply into parameters for the Facebook post action.

use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use serde_json::Value;
use shared::conversation_to_facebook;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

async fn handler(event: LambdaEvent<Value>) -> Result<Value, Error> {
    let (params, _context) = event.into_parts();

    match conversation_to_facebook(&params) {
        Ok(reply) => {
            info!("Normalized dialog reply for Facebook");
            Ok(serde_json::to_value(reply)?)
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

    run(service_fn(handler)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use lambda_runtime::Context;
    use serde_json::json;

    #[tokio::test]
    async fn test_handler_builds_post_params() {
        let payload = json!({
            "conversation": { "output": { "text": ["Hello, World!"] } },
            "raw_input_data": {
                "facebook": { "sender": { "id": "user_id" }, "recipient": { "id": "page_id" } },
                "provider": "facebook",
                "cloudant_context_key": "facebook_user_id_ws_page_id"
            }
        });

        let result = handler(LambdaEvent::new(payload, Context::default()))
            .await
            .unwrap();
        assert_eq!(result["recipient"], json!({ "id": "user_id" }));
        assert_eq!(result["message"], json!({ "text": "Hello, World!" }));
    }

    #[tokio::test]
    async fn test_handler_surfaces_message_text() {
        let err = handler(LambdaEvent::new(json!({}), Context::default()))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Facebook JSON data is missing.");
    }
}
