//! Dialog engine reply → Facebook post parameters.

use serde::Serialize;
use serde_json::Value;

use crate::normalize::ERROR_NO_SENDER_ID;
use crate::validation::{is_present, validate, CONVERSATION_REPLY_RULES};
use crate::{Error, Result};

pub const ERROR_EMPTY_OUTPUT: &str = "Conversation output text is empty.";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recipient {
    pub id: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawOutputData {
    pub conversation: Value,
}

/// Parameters for the Facebook post action, built from a dialog engine reply.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FacebookReply {
    pub recipient: Recipient,
    pub message: Value,
    pub raw_input_data: Value,
    pub raw_output_data: RawOutputData,
}

/// Turn `{conversation, raw_input_data}` into post parameters.
///
/// The reply goes to whoever sent the inbound message. A channel-specific
/// `output.facebook` object is sent as-is; otherwise the output text lines
/// are joined with spaces.
pub fn conversation_to_facebook(params: &Value) -> Result<FacebookReply> {
    validate(params, CONVERSATION_REPLY_RULES)?;

    let sender_id = params
        .pointer("/raw_input_data/facebook/sender/id")
        .filter(|id| is_present(id))
        .cloned()
        .ok_or_else(|| Error::Validation(ERROR_NO_SENDER_ID.to_string()))?;

    let output = &params["conversation"]["output"];
    let message = match output.get("facebook") {
        Some(custom) if custom.is_object() => custom.clone(),
        _ => serde_json::json!({ "text": output_text(output)? }),
    };

    Ok(FacebookReply {
        recipient: Recipient { id: sender_id },
        message,
        raw_input_data: params["raw_input_data"].clone(),
        raw_output_data: RawOutputData {
            conversation: params["conversation"].clone(),
        },
    })
}

fn output_text(output: &Value) -> Result<String> {
    let text = match output.get("text") {
        Some(Value::Array(lines)) => lines
            .iter()
            .filter_map(Value::as_str)
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join(" "),
        Some(Value::String(line)) => line.clone(),
        _ => String::new(),
    };

    if text.is_empty() {
        return Err(Error::Validation(ERROR_EMPTY_OUTPUT.to_string()));
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::{ERROR_NO_CONVERSATION_OUTPUT, ERROR_NO_FACEBOOK_DATA};
    use serde_json::json;

    fn reply_params() -> Value {
        json!({
            "conversation": {
                "output": { "text": ["Hello", "there!"] },
                "context": { "conversation_id": "c-1" }
            },
            "raw_input_data": {
                "facebook": {
                    "sender": { "id": "user_id" },
                    "recipient": { "id": "page_id" },
                    "message": { "text": "hi" }
                },
                "provider": "facebook",
                "cloudant_context_key": "facebook_user_id_ws_page_id"
            }
        })
    }

    #[test]
    fn test_reply_goes_to_sender() {
        let params = reply_params();
        let reply = conversation_to_facebook(&params).unwrap();

        assert_eq!(
            serde_json::to_value(&reply).unwrap(),
            json!({
                "recipient": { "id": "user_id" },
                "message": { "text": "Hello there!" },
                "raw_input_data": params["raw_input_data"],
                "raw_output_data": { "conversation": params["conversation"] }
            })
        );
    }

    #[test]
    fn test_custom_facebook_output_sent_verbatim() {
        let mut params = reply_params();
        let attachment = json!({ "attachment": { "type": "template" } });
        params["conversation"]["output"]["facebook"] = attachment.clone();

        let reply = conversation_to_facebook(&params).unwrap();
        assert_eq!(reply.message, attachment);
    }

    #[test]
    fn test_missing_facebook_data() {
        let mut params = reply_params();
        params["raw_input_data"]
            .as_object_mut()
            .unwrap()
            .remove("facebook");
        let err = conversation_to_facebook(&params).unwrap_err();
        assert_eq!(err.to_string(), ERROR_NO_FACEBOOK_DATA);
    }

    #[test]
    fn test_missing_output() {
        let mut params = reply_params();
        params["conversation"].as_object_mut().unwrap().remove("output");
        let err = conversation_to_facebook(&params).unwrap_err();
        assert_eq!(err.to_string(), ERROR_NO_CONVERSATION_OUTPUT);
    }

    #[test]
    fn test_empty_output_text() {
        let mut params = reply_params();
        params["conversation"]["output"]["text"] = json!([]);
        let err = conversation_to_facebook(&params).unwrap_err();
        assert_eq!(err.name(), "AssertionError");
        assert_eq!(err.to_string(), ERROR_EMPTY_OUTPUT);
    }
}
