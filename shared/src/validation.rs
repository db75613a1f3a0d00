//! Ordered assertion rules over action parameter objects.
//!
//! Rules run in declaration order and the first failing rule decides the
//! error, so reordering a rule set changes what callers see.

use serde_json::Value;

use crate::{Error, Result};

/// Provider name the Facebook channel tags its events with.
pub const FACEBOOK_PROVIDER: &str = "facebook";

pub const ERROR_BAD_PROVIDER: &str = "Provider not supplied or isn't Facebook.";
pub const ERROR_NO_FACEBOOK_DATA: &str = "Facebook JSON data is missing.";
pub const ERROR_NO_PAGE_ACCESS_TOKEN: &str = "auth.facebook.page_access_token not found.";
pub const ERROR_NO_RECIPIENT_ID: &str = "Recepient id not provided.";
pub const ERROR_NO_MESSAGE: &str = "Message object not provided.";
pub const ERROR_NO_CONVERSATION_OUTPUT: &str = "Conversation output is missing.";

/// A single named-field assertion.
#[derive(Debug, Clone, Copy)]
pub struct Rule {
    check: fn(&Value) -> bool,
    message: &'static str,
}

impl Rule {
    pub const fn new(check: fn(&Value) -> bool, message: &'static str) -> Self {
        Self { check, message }
    }

    fn holds(&self, params: &Value) -> bool {
        (self.check)(params)
    }
}

/// Checks on an inbound `{provider, facebook}` parameter object.
pub const INBOUND_RULES: &[Rule] = &[
    Rule::new(provider_is_facebook, ERROR_BAD_PROVIDER),
    Rule::new(has_facebook_data, ERROR_NO_FACEBOOK_DATA),
];

/// Checks on an outbound post parameter object.
pub const OUTBOUND_RULES: &[Rule] = &[
    Rule::new(has_page_access_token, ERROR_NO_PAGE_ACCESS_TOKEN),
    Rule::new(has_recipient_id, ERROR_NO_RECIPIENT_ID),
    Rule::new(has_message, ERROR_NO_MESSAGE),
];

/// Checks on a dialog engine reply headed back to Facebook.
pub const CONVERSATION_REPLY_RULES: &[Rule] = &[
    Rule::new(has_raw_facebook_data, ERROR_NO_FACEBOOK_DATA),
    Rule::new(has_conversation_output, ERROR_NO_CONVERSATION_OUTPUT),
];

/// Run `rules` in order, failing with the message of the first one violated.
pub fn validate(params: &Value, rules: &[Rule]) -> Result<()> {
    match rules.iter().find(|rule| !rule.holds(params)) {
        Some(rule) => Err(Error::Validation(rule.message.to_string())),
        None => Ok(()),
    }
}

/// Validate an inbound Facebook parameter object.
pub fn validate_inbound(params: &Value) -> Result<()> {
    validate(params, INBOUND_RULES)
}

/// Validate an outbound post parameter object.
pub fn validate_outbound(params: &Value) -> Result<()> {
    validate(params, OUTBOUND_RULES)
}

fn provider_is_facebook(params: &Value) -> bool {
    params.get("provider").and_then(Value::as_str) == Some(FACEBOOK_PROVIDER)
}

fn has_facebook_data(params: &Value) -> bool {
    params.get("facebook").is_some_and(Value::is_object)
}

fn has_page_access_token(params: &Value) -> bool {
    params
        .get("page_access_token")
        .and_then(Value::as_str)
        .is_some_and(|token| !token.is_empty())
}

fn has_recipient_id(params: &Value) -> bool {
    params.pointer("/recipient/id").is_some_and(is_present)
}

fn has_message(params: &Value) -> bool {
    params.get("message").is_some_and(Value::is_object)
}

fn has_raw_facebook_data(params: &Value) -> bool {
    params
        .pointer("/raw_input_data/facebook")
        .is_some_and(Value::is_object)
}

fn has_conversation_output(params: &Value) -> bool {
    params
        .pointer("/conversation/output")
        .is_some_and(Value::is_object)
}

/// Non-null, and non-empty when a string.
pub(crate) fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.is_empty(),
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn inbound() -> Value {
        json!({
            "facebook": {
                "sender": { "id": "user_id" },
                "recipient": { "id": "page_id" },
                "message": { "text": "hello, world!" }
            },
            "provider": "facebook"
        })
    }

    fn outbound() -> Value {
        json!({
            "page_access_token": "token",
            "message": { "text": "Hello, World!" },
            "recipient": { "id": "sender" }
        })
    }

    fn message_of(result: Result<()>) -> String {
        let err = result.unwrap_err();
        assert_eq!(err.name(), "AssertionError");
        err.to_string()
    }

    #[test]
    fn test_valid_params_pass() {
        assert!(validate_inbound(&inbound()).is_ok());
        assert!(validate_outbound(&outbound()).is_ok());
    }

    #[test]
    fn test_missing_provider() {
        let mut params = inbound();
        params.as_object_mut().unwrap().remove("provider");
        assert_eq!(message_of(validate_inbound(&params)), ERROR_BAD_PROVIDER);
    }

    #[test]
    fn test_wrong_provider() {
        let mut params = inbound();
        params["provider"] = json!("slack");
        assert_eq!(message_of(validate_inbound(&params)), ERROR_BAD_PROVIDER);
    }

    #[test]
    fn test_missing_facebook_data() {
        let mut params = inbound();
        params.as_object_mut().unwrap().remove("facebook");
        assert_eq!(message_of(validate_inbound(&params)), ERROR_NO_FACEBOOK_DATA);
    }

    #[test]
    fn test_provider_checked_before_data() {
        assert_eq!(message_of(validate_inbound(&json!({}))), ERROR_BAD_PROVIDER);
    }

    #[test]
    fn test_missing_page_access_token() {
        let mut params = outbound();
        params["page_access_token"] = json!("");
        assert_eq!(
            message_of(validate_outbound(&params)),
            "auth.facebook.page_access_token not found."
        );
    }

    #[test]
    fn test_missing_recipient() {
        let mut params = outbound();
        params.as_object_mut().unwrap().remove("recipient");
        assert_eq!(
            message_of(validate_outbound(&params)),
            "Recepient id not provided."
        );
    }

    #[test]
    fn test_missing_message() {
        let mut params = outbound();
        params.as_object_mut().unwrap().remove("message");
        assert_eq!(
            message_of(validate_outbound(&params)),
            "Message object not provided."
        );
    }

    #[test]
    fn test_first_failure_wins() {
        assert_eq!(
            message_of(validate_outbound(&json!({}))),
            ERROR_NO_PAGE_ACCESS_TOKEN
        );
        assert_eq!(
            message_of(validate_outbound(&json!({ "page_access_token": "t" }))),
            ERROR_NO_RECIPIENT_ID
        );
    }

    #[test]
    fn test_numeric_recipient_id_is_present() {
        let mut params = outbound();
        params["recipient"]["id"] = json!(12345);
        assert!(validate_outbound(&params).is_ok());
    }
}
