//! Facebook event classification and normalization to conversation input.
//!
//! A raw messaging event is decoded once into a [`FacebookEvent`]; nothing
//! downstream looks at the raw JSON shape again.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::context::derive_context_key;
use crate::validation::{validate_inbound, FACEBOOK_PROVIDER};
use crate::{Error, Result};

pub const ERROR_NO_SENDER_ID: &str = "Facebook sender id not provided.";
pub const ERROR_NO_PAGE_ID: &str = "Facebook recipient id not provided.";

/// The closed set of event shapes the pipeline understands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    /// Free-text message
    Text(String),
    /// Button click
    Postback {
        payload: String,
        title: Option<String>,
    },
    /// Anything else (attachments, reads, deliveries, ...)
    Unrecognized,
}

/// A decoded Facebook messaging event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FacebookEvent {
    pub sender_id: Option<String>,
    pub recipient_id: Option<String>,
    pub kind: EventKind,
}

#[derive(Debug, Default, Deserialize)]
struct RawEvent {
    #[serde(default)]
    sender: Option<Participant>,
    #[serde(default)]
    recipient: Option<Participant>,
    #[serde(default)]
    message: Option<RawMessage>,
    #[serde(default)]
    postback: Option<RawPostback>,
}

#[derive(Debug, Deserialize)]
struct Participant {
    #[serde(default)]
    id: Value,
}

#[derive(Debug, Deserialize)]
struct RawMessage {
    #[serde(default)]
    text: Value,
}

#[derive(Debug, Deserialize)]
struct RawPostback {
    #[serde(default)]
    payload: Value,
    #[serde(default)]
    title: Value,
}

impl FacebookEvent {
    /// Decode a raw messaging event.
    pub fn from_value(event: &Value) -> Result<Self> {
        let raw = RawEvent::deserialize(event)?;

        let sender_id = raw.sender.and_then(|p| id_string(&p.id));
        let recipient_id = raw.recipient.and_then(|p| id_string(&p.id));

        let text = raw.message.and_then(|m| non_empty_str(m.text));
        let kind = match (text, raw.postback) {
            (Some(text), _) => EventKind::Text(text),
            (None, Some(postback)) => match non_empty_str(postback.payload) {
                Some(payload) => EventKind::Postback {
                    payload,
                    title: non_empty_str(postback.title),
                },
                None => EventKind::Unrecognized,
            },
            (None, None) => EventKind::Unrecognized,
        };

        Ok(Self {
            sender_id,
            recipient_id,
            kind,
        })
    }
}

fn non_empty_str(value: Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s),
        _ => None,
    }
}

fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Text handed to the dialog engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CanonicalInput {
    pub text: String,
}

/// `{conversation: {input: {text}}}`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversationInput {
    pub input: CanonicalInput,
}

/// Original payload plus routing key, passed downstream unmodified.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawInputEnvelope {
    pub facebook: Value,
    pub provider: String,
    pub cloudant_context_key: String,
}

/// Result of the Facebook → conversation normalize action.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedInput {
    pub conversation: ConversationInput,
    pub raw_input_data: RawInputEnvelope,
}

/// Extract canonical input from a decoded event.
///
/// Message text wins over a postback; the postback title is not used.
pub fn normalize_event(event: &FacebookEvent) -> Result<CanonicalInput> {
    let text = match &event.kind {
        EventKind::Text(text) => text,
        EventKind::Postback { payload, .. } => payload,
        EventKind::Unrecognized => return Err(Error::UnsupportedEvent),
    };

    Ok(CanonicalInput { text: text.clone() })
}

/// Normalize inbound `{provider, facebook}` parameters for the dialog engine.
pub fn normalize_for_conversation(params: &Value, workspace_id: &str) -> Result<NormalizedInput> {
    validate_inbound(params)?;

    let raw_event = &params["facebook"];
    let event = FacebookEvent::from_value(raw_event)?;
    let input = normalize_event(&event)?;

    // Ids only matter once the event is known to be one we handle.
    let sender_id = event
        .sender_id
        .as_deref()
        .ok_or_else(|| Error::Validation(ERROR_NO_SENDER_ID.to_string()))?;
    let recipient_id = event
        .recipient_id
        .as_deref()
        .ok_or_else(|| Error::Validation(ERROR_NO_PAGE_ID.to_string()))?;

    Ok(NormalizedInput {
        conversation: ConversationInput { input },
        raw_input_data: RawInputEnvelope {
            facebook: raw_event.clone(),
            provider: FACEBOOK_PROVIDER.to_string(),
            cloudant_context_key: derive_context_key(
                FACEBOOK_PROVIDER,
                sender_id,
                workspace_id,
                recipient_id,
            ),
        },
    })
}
