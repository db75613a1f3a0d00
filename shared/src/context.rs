//! Conversation context keys.

/// Build the key that correlates one conversation thread across turns.
///
/// Fields are joined with `_` in a fixed order. Ids are not escaped, so ids
/// that themselves contain `_` can produce colliding keys.
pub fn derive_context_key(
    provider: &str,
    sender_id: &str,
    workspace_id: &str,
    recipient_id: &str,
) -> String {
    format!(
        "{}_{}_{}_{}",
        provider, sender_id, workspace_id, recipient_id
    )
}
