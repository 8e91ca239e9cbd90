//! Interaction id generation.

use chrono::Utc;
use rand::Rng;
use uuid::Uuid;

/// Replace non-alphanumerics with `_` and cap the length.
pub fn sanitize_prefix(prefix: &str, max_len: usize) -> String {
    prefix
        .chars()
        .map(|ch| if ch.is_ascii_alphanumeric() { ch } else { '_' })
        .take(max_len)
        .collect()
}

/// Generate an upper-case interaction id.
///
/// The default form is an opaque UUID, optionally behind a sanitized prefix.
/// `readable` ids (`PREFIX_YYYYmmddHHMMSS_ABCD`) are for demos and tests;
/// two of them generated in the same second may collide.
pub fn generate_id(prefix: Option<&str>, readable: bool, max_prefix_len: usize) -> String {
    let prefix = prefix
        .map(|prefix| sanitize_prefix(prefix, max_prefix_len).to_ascii_uppercase())
        .filter(|prefix| !prefix.is_empty());

    let body = if readable {
        let suffix: u16 = rand::thread_rng().gen();
        format!("{}_{:04X}", Utc::now().format("%Y%m%d%H%M%S"), suffix)
    } else {
        Uuid::new_v4().simple().to_string().to_ascii_uppercase()
    };

    match prefix {
        Some(prefix) => format!("{}_{}", prefix, body),
        None => body,
    }
}
