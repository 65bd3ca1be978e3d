//! Credential scrubbing for text that ends up in logs or user-facing errors.
//!
//! Provider error bodies and transport errors can echo request URLs or
//! headers. Everything routed through [`redact_secrets`] has URL credentials
//! and long key-shaped tokens replaced before it is logged or persisted.

use once_cell::sync::Lazy;
use regex::Regex;

/// URLs with embedded `user:password@` credentials.
static URL_WITH_CREDS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(https?://)[^:@\s]+:[^@\s]+@").unwrap());

/// Bearer tokens in echoed headers.
static BEARER_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(bearer\s+)[A-Za-z0-9._~+/=-]{8,}").unwrap());

/// Query-string keys (`?key=...`, `&api_key=...`).
static QUERY_KEY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)([?&](?:key|api_key|apikey)=)[^&\s]+").unwrap());

/// Long runs of key alphabet characters (Groq `gsk_...`, OpenRouter `sk-or-...`,
/// Google `AIza...`).
static POTENTIAL_KEY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:^|[^A-Za-z0-9_-])([A-Za-z0-9_-]{32,})(?:[^A-Za-z0-9_-]|$)").unwrap()
});

/// Replace anything that looks like a credential with a placeholder.
#[must_use]
pub fn redact_secrets(message: &str) -> String {
    let redacted = URL_WITH_CREDS.replace_all(message, "$1[REDACTED]@");
    let redacted = BEARER_TOKEN.replace_all(&redacted, "$1[REDACTED]");
    let redacted = QUERY_KEY.replace_all(&redacted, "$1[REDACTED]");

    POTENTIAL_KEY
        .replace_all(&redacted, |caps: &regex::Captures<'_>| {
            let whole = &caps[0];
            let key = &caps[1];
            whole.replacen(key, "[REDACTED_KEY]", 1)
        })
        .into_owned()
}
