#![forbid(unsafe_code)]

//! JSON shapes exchanged with JavaScript.
//!
//! JS values cross the boundary as JSON text (`JSON.stringify` on the way
//! in, `JSON.parse` on the way out), so everything here is plain
//! `serde_json` and testable off the browser.
//!
//! Accepted navigation maps:
//!
//! ```text
//! { "about": "visible" }
//! { "viewer": { "state": "open", "parameters": { "page": 3 } } }
//! { "contact": {} }                       // state defaults to "visible"
//! ```

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;
use tracing::Level;

use hashnav_core::config::EngineConfig;
use hashnav_core::state::{ElementState, NavigationState, Parameters, VISIBLE};

/// Constructor options: engine configuration plus frontend settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebOptions {
    #[serde(flatten)]
    pub engine: EngineConfig,
    /// Console log level (`error`, `warn`, `info`, `debug`, `trace`).
    #[serde(default)]
    pub log_level: Option<String>,
}

impl WebOptions {
    /// Parse options JSON; `null`/empty input yields the defaults.
    pub fn from_json(raw: &str) -> Result<Self, String> {
        let raw = raw.trim();
        if raw.is_empty() || raw == "null" {
            return Ok(Self::default());
        }
        serde_json::from_str(raw).map_err(|e| format!("invalid navigator options: {e}"))
    }

    /// Console level; `warn` when unset or unrecognised.
    #[must_use]
    pub fn console_level(&self) -> Level {
        self.log_level
            .as_deref()
            .and_then(|l| l.parse().ok())
            .unwrap_or(Level::WARN)
    }
}

/// Convert a JSON object of scalars into handler parameters. Nulls, arrays
/// and nested objects are dropped.
pub fn parameters_from_json(raw: &str) -> Result<Parameters, String> {
    let raw = raw.trim();
    if raw.is_empty() || raw == "null" {
        return Ok(Parameters::new());
    }
    let map: IndexMap<String, Value> =
        serde_json::from_str(raw).map_err(|e| format!("parameters must be an object: {e}"))?;
    Ok(scalars(map))
}

/// Parse a navigation map (see module docs).
pub fn state_from_json(raw: &str) -> Result<NavigationState, String> {
    let map: IndexMap<String, Value> = serde_json::from_str(raw)
        .map_err(|e| format!("navigation map must be an object: {e}"))?;
    let mut state = NavigationState::new();
    for (id, value) in map {
        if id.is_empty() {
            continue;
        }
        let entry = match value {
            Value::String(name) => ElementState::new(non_empty_state(Some(name))),
            Value::Null => ElementState::visible(),
            Value::Object(mut fields) => {
                let name = match fields.remove("state") {
                    Some(Value::String(name)) => Some(name),
                    _ => None,
                };
                let parameters = match fields.remove("parameters") {
                    Some(Value::Object(params)) => scalars(params.into_iter().collect()),
                    _ => Parameters::new(),
                };
                ElementState::new(non_empty_state(name)).with_parameters(parameters)
            }
            other => return Err(format!("invalid entry for `{id}`: {other}")),
        };
        state.insert(id, entry);
    }
    Ok(state)
}

/// JSON text for a navigation state, in `{ id: { state, parameters } }` form.
pub fn state_to_json(state: &NavigationState) -> Result<String, String> {
    serde_json::to_string(state).map_err(|e| e.to_string())
}

fn non_empty_state(name: Option<String>) -> String {
    name.filter(|n| !n.is_empty())
        .unwrap_or_else(|| VISIBLE.to_owned())
}

fn scalars(map: IndexMap<String, Value>) -> Parameters {
    map.into_iter()
        .filter_map(|(key, value)| {
            let value = match value {
                Value::String(s) => s,
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                _ => return None,
            };
            Some((key, value))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn options_flatten_engine_config() {
        let opts = WebOptions::from_json(
            r#"{"fallbackFragment":"home","loadTimeoutMs":800,"logLevel":"debug"}"#,
        )
        .unwrap();
        assert_eq!(opts.engine.fallback_fragment, "home");
        assert_eq!(opts.engine.load_timeout_ms, 800);
        assert_eq!(opts.console_level(), Level::DEBUG);

        let opts = WebOptions::from_json("null").unwrap();
        assert_eq!(opts, WebOptions::default());
        assert_eq!(opts.console_level(), Level::WARN);
        assert!(WebOptions::from_json("[1]").is_err());
    }

    #[test]
    fn navigation_map_shapes() {
        let state = state_from_json(
            r#"{"about":"hidden","viewer":{"state":"open","parameters":{"page":3,"fit":true,"skip":null}},"contact":{},"blank":""}"#,
        )
        .unwrap();
        let expected = NavigationState::new()
            .with("about", ElementState::new("hidden"))
            .with(
                "viewer",
                ElementState::new("open")
                    .with_param("page", "3")
                    .with_param("fit", "true"),
            )
            .with("contact", ElementState::visible())
            .with("blank", ElementState::visible());
        assert_eq!(state, expected);
    }

    #[test]
    fn navigation_map_rejects_non_objects() {
        assert!(state_from_json("[]").is_err());
        assert!(state_from_json(r#"{"a":[1]}"#).is_err());
    }

    #[test]
    fn parameters_keep_order() {
        let params = parameters_from_json(r#"{"z":"1","a":2}"#).unwrap();
        let keys: Vec<_> = params.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["z", "a"]);
        assert!(parameters_from_json("undefined").is_err());
        assert!(parameters_from_json("").unwrap().is_empty());
    }

    #[test]
    fn state_json_shape() {
        let state = NavigationState::single("a", ElementState::new("hidden"));
        assert_eq!(
            state_to_json(&state).unwrap(),
            r#"{"a":{"state":"hidden","parameters":{}}}"#
        );
    }
}
