#![forbid(unsafe_code)]

//! Navigation state: the decoded form of a URL fragment.
//!
//! A [`NavigationState`] maps element ids to the [`ElementState`] requested
//! for them. Entries keep fragment (insertion) order for display and
//! re-encoding, but equality ignores order: two states naming the same
//! elements with the same states and parameters are equal.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// The state implied when a fragment entry names no state.
pub const VISIBLE: &str = "visible";

/// Handler parameters, in fragment order.
pub type Parameters = IndexMap<String, String>;

/// Requested state for a single element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementState {
    /// State name handed to the element's handler.
    #[serde(default = "visible_state")]
    pub state: String,
    /// Caller-supplied parameters.
    #[serde(default)]
    pub parameters: Parameters,
}

fn visible_state() -> String {
    VISIBLE.to_owned()
}

impl ElementState {
    /// Create an entry with the given state and no parameters.
    #[must_use]
    pub fn new(state: impl Into<String>) -> Self {
        Self {
            state: state.into(),
            parameters: Parameters::new(),
        }
    }

    /// Shorthand for `ElementState::new("visible")`.
    #[must_use]
    pub fn visible() -> Self {
        Self::new(VISIBLE)
    }

    /// Add one parameter.
    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    /// Replace all parameters.
    #[must_use]
    pub fn with_parameters(mut self, parameters: Parameters) -> Self {
        self.parameters = parameters;
        self
    }

    /// Whether this entry requests the implicit `"visible"` state.
    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.state == VISIBLE
    }
}

impl Default for ElementState {
    fn default() -> Self {
        Self::visible()
    }
}

/// Ordered mapping `element id -> requested state`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NavigationState {
    entries: IndexMap<String, ElementState>,
}

impl NavigationState {
    /// Create an empty state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// State with a single entry.
    #[must_use]
    pub fn single(id: impl Into<String>, entry: ElementState) -> Self {
        let mut state = Self::new();
        state.insert(id, entry);
        state
    }

    /// Insert or replace an entry.
    ///
    /// Replacing keeps the original position, like a JS `Map`.
    pub fn insert(&mut self, id: impl Into<String>, entry: ElementState) -> Option<ElementState> {
        self.entries.insert(id.into(), entry)
    }

    /// Builder form of [`Self::insert`].
    #[must_use]
    pub fn with(mut self, id: impl Into<String>, entry: ElementState) -> Self {
        self.insert(id, entry);
        self
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&ElementState> {
        self.entries.get(id)
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Id of the first entry in fragment order.
    #[must_use]
    pub fn first_id(&self) -> Option<&str> {
        self.entries.keys().next().map(String::as_str)
    }

    /// Iterate entries in fragment order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ElementState)> + '_ {
        self.entries.iter().map(|(id, entry)| (id.as_str(), entry))
    }

    /// Iterate element ids in fragment order.
    pub fn ids(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.keys().map(String::as_str)
    }

    /// Copy of the entries accepted by `keep`, order preserved.
    #[must_use]
    pub fn filtered(&self, mut keep: impl FnMut(&str, &ElementState) -> bool) -> Self {
        self.entries
            .iter()
            .filter(|(id, entry)| keep(id, entry))
            .map(|(id, entry)| (id.clone(), entry.clone()))
            .collect()
    }

    /// Remove every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Whether this state survives an encode/decode round trip unchanged.
    ///
    /// Element ids must be non-empty, must not start with `#` and must not
    /// contain the entry, state or query delimiters. States must be
    /// non-empty and free of the same delimiters. Parameter keys and
    /// values must be non-empty (any characters, they are percent-encoded).
    #[must_use]
    pub fn is_canonical(&self) -> bool {
        self.entries.iter().all(|(id, entry)| {
            !id.is_empty()
                && !id.starts_with('#')
                && !id.contains(['|', '/', '?'])
                && !entry.state.is_empty()
                && !entry.state.contains(['|', '/', '?'])
                && entry
                    .parameters
                    .iter()
                    .all(|(key, value)| !key.is_empty() && !value.is_empty())
        })
    }
}

impl FromIterator<(String, ElementState)> for NavigationState {
    fn from_iter<T: IntoIterator<Item = (String, ElementState)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a NavigationState {
    type Item = (&'a String, &'a ElementState);
    type IntoIter = indexmap::map::Iter<'a, String, ElementState>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
