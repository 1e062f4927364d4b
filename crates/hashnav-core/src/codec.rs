#![forbid(unsafe_code)]

//! Fragment codec: `NavigationState` <-> URL fragment text.
//!
//! # Grammar
//!
//! ```text
//! fragment   := entry ("|" entry)*
//! entry      := elementId ["/" state] ["?" params]
//! params     := pair ("&" pair)*
//! pair       := key "=" value
//! state      := token          ; absent => "visible"
//! ```
//!
//! Decoding is lenient: empty ids are skipped, a state ends at the next
//! `/`, pairs missing a key or a value (or carrying a malformed percent
//! escape) are dropped. Encoding is
//! minimal: the `"visible"` state is never written.
//!
//! ```
//! use hashnav_core::codec::{decode, encode};
//! use hashnav_core::state::{ElementState, NavigationState};
//!
//! let state = decode("#about-container|contact-form/visible?ref=nav");
//! let expected = NavigationState::new()
//!     .with("about-container", ElementState::visible())
//!     .with("contact-form", ElementState::visible().with_param("ref", "nav"));
//! assert_eq!(state, expected);
//! assert_eq!(encode(&state), "about-container|contact-form?ref=nav");
//! ```

use crate::state::{ElementState, NavigationState, Parameters, VISIBLE};

const ENTRY_SEPARATOR: char = '|';
const STATE_SEPARATOR: char = '/';
const QUERY_SEPARATOR: char = '?';
const PAIR_SEPARATOR: char = '&';
const KV_SEPARATOR: char = '=';

/// Parse a fragment (with or without the leading `#`).
#[must_use]
pub fn decode(fragment: &str) -> NavigationState {
    let body = fragment.strip_prefix('#').unwrap_or(fragment);
    let mut state = NavigationState::new();
    if body.is_empty() {
        return state;
    }

    for entry in body.split(ENTRY_SEPARATOR) {
        let (head, query) = match entry.split_once(QUERY_SEPARATOR) {
            Some((head, query)) => (head, Some(query)),
            None => (entry, None),
        };
        let mut segments = head.split(STATE_SEPARATOR);
        let id = segments.next().unwrap_or_default();
        let explicit_state = segments.next();
        if id.is_empty() {
            continue;
        }

        let state_name = explicit_state
            .filter(|s| !s.is_empty())
            .unwrap_or(VISIBLE);
        let parameters = query.map(decode_params).unwrap_or_default();
        state.insert(
            id,
            ElementState::new(state_name).with_parameters(parameters),
        );
    }
    state
}

/// Serialize a state into its minimal fragment form (no leading `#`).
#[must_use]
pub fn encode(state: &NavigationState) -> String {
    let mut out = String::new();
    for (index, (id, entry)) in state.iter().enumerate() {
        if index > 0 {
            out.push(ENTRY_SEPARATOR);
        }
        out.push_str(id);
        if !entry.is_visible() {
            out.push(STATE_SEPARATOR);
            out.push_str(&entry.state);
        }
        if !entry.parameters.is_empty() {
            out.push(QUERY_SEPARATOR);
            encode_params(&entry.parameters, &mut out);
        }
    }
    out
}

fn decode_params(query: &str) -> Parameters {
    let mut parameters = Parameters::new();
    for pair in query.split(PAIR_SEPARATOR) {
        let Some((key, value)) = pair.split_once(KV_SEPARATOR) else {
            continue;
        };
        if key.is_empty() || value.is_empty() {
            continue;
        }
        let (Some(key), Some(value)) = (percent_decode(key), percent_decode(value)) else {
            continue;
        };
        parameters.insert(key, value);
    }
    parameters
}

fn encode_params(parameters: &Parameters, out: &mut String) {
    for (index, (key, value)) in parameters.iter().enumerate() {
        if index > 0 {
            out.push(PAIR_SEPARATOR);
        }
        percent_encode_into(key, out);
        out.push(KV_SEPARATOR);
        percent_encode_into(value, out);
    }
}

/// `encodeURIComponent` unreserved set.
fn is_unreserved(byte: u8) -> bool {
    byte.is_ascii_alphanumeric()
        || matches!(
            byte,
            b'-' | b'_' | b'.' | b'!' | b'~' | b'*' | b'\'' | b'(' | b')'
        )
}

fn percent_encode_into(raw: &str, out: &mut String) {
    const HEX: &[u8; 16] = b"0123456789ABCDEF";
    for &byte in raw.as_bytes() {
        if is_unreserved(byte) {
            out.push(char::from(byte));
        } else {
            out.push('%');
            out.push(char::from(HEX[usize::from(byte >> 4)]));
            out.push(char::from(HEX[usize::from(byte & 0x0F)]));
        }
    }
}

/// Percent-encode a component the way `encodeURIComponent` does.
#[must_use]
pub fn percent_encode(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    percent_encode_into(raw, &mut out);
    out
}

/// Decode `%XX` escapes. Returns `None` for a truncated or non-hex escape
/// or when the decoded bytes are not UTF-8.
#[must_use]
pub fn percent_decode(encoded: &str) -> Option<String> {
    let bytes = encoded.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hi = hex_value(*bytes.get(i + 1)?)?;
            let lo = hex_value(*bytes.get(i + 2)?)?;
            out.push((hi << 4) | lo);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}

fn hex_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}
