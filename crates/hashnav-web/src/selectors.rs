#![forbid(unsafe_code)]

//! CSS selectors derived from [`DomConventions`].

use hashnav_core::config::DomConventions;

/// `[attr]`
#[must_use]
pub fn has_attr(attr: &str) -> String {
    format!("[{attr}]")
}

/// `[attr="value"]` with the value escaped as a CSS string.
#[must_use]
pub fn attr_equals(attr: &str, value: &str) -> String {
    format!("[{attr}=\"{}\"]", escape_css_string(value))
}

/// Every navigable element.
#[must_use]
pub fn navigable(dom: &DomConventions) -> String {
    has_attr(&dom.handler_attr)
}

/// Elements whose handler is one of `handlers`; `None` if there are none
/// (an empty selector list is a syntax error for `closest`).
#[must_use]
pub fn container(dom: &DomConventions, handlers: &[String]) -> Option<String> {
    if handlers.is_empty() {
        return None;
    }
    let parts: Vec<String> = handlers
        .iter()
        .map(|h| attr_equals(&dom.handler_attr, h))
        .collect();
    Some(parts.join(", "))
}

/// Tab markers not hidden by the hidden class.
#[must_use]
pub fn visible_tab_marker(dom: &DomConventions) -> String {
    format!("{}:not(.{})", has_attr(&dom.parent_tab_attr), dom.hidden_class)
}

fn escape_css_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '"' | '\\' => {
                out.push('\\');
                out.push(ch);
            }
            '\n' => out.push_str("\\a "),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn default_selectors() {
        let dom = DomConventions::default();
        assert_eq!(navigable(&dom), "[data-nav-handler]");
        assert_eq!(visible_tab_marker(&dom), "[data-parent-tab]:not(.nav-hidden)");
        let handlers = vec![
            "handleVerticalContainerNavigation".to_owned(),
            "handleHorizontalContainerNavigation".to_owned(),
        ];
        assert_eq!(
            container(&dom, &handlers).as_deref(),
            Some(
                "[data-nav-handler=\"handleVerticalContainerNavigation\"], \
                 [data-nav-handler=\"handleHorizontalContainerNavigation\"]"
            )
        );
    }

    #[test]
    fn no_container_handlers_means_no_selector() {
        assert_eq!(container(&DomConventions::default(), &[]), None);
    }

    #[test]
    fn attribute_values_are_escaped() {
        assert_eq!(attr_equals("data-x", r#"a"b\c"#), r#"[data-x="a\"b\\c"]"#);
    }
}
