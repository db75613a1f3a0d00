//! Shared library for the conversation connector actions.
//!
//! This crate holds the pieces every action uses: credential resolution,
//! parameter validation, Facebook event normalization and the outbound
//! Send API client.

pub mod config;
pub mod context;
pub mod credentials;
pub mod error;
pub mod facebook;
pub mod http;
pub mod normalize;
pub mod reply;
pub mod validation;
pub mod webhook;

pub use config::{Config, DEFAULT_FACEBOOK_POST_URL};
pub use context::derive_context_key;
pub use credentials::{AuthDocument, CredentialResolver, CredentialStoreLocation};
pub use error::{Error, Result};
pub use facebook::{FacebookClient, PostParams, PostResult};
pub use normalize::{
    normalize_event, normalize_for_conversation, CanonicalInput, EventKind, FacebookEvent,
    NormalizedInput,
};
pub use reply::{conversation_to_facebook, FacebookReply};
pub use validation::{validate_inbound, validate_outbound, FACEBOOK_PROVIDER};
