#![forbid(unsafe_code)]

//! Browser console output for `tracing` events.
//!
//! [`EventFields`] and [`format_event`] are target-independent; the
//! `ConsoleLayer` that writes to `console.*` only exists on `wasm32`.

use std::fmt;

use tracing::Level;
use tracing::field::{Field, Visit};

/// Message and fields of one event, in recording order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct EventFields {
    pub message: String,
    pub fields: Vec<(String, String)>,
}

impl Visit for EventFields {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_owned();
        } else {
            self.fields.push((field.name().to_owned(), value.to_owned()));
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        let text = format!("{value:?}");
        if field.name() == "message" {
            self.message = text;
        } else {
            self.fields.push((field.name().to_owned(), text));
        }
    }
}

/// One console line: `[hashnav] LEVEL target (span): message k=v ...`.
#[must_use]
pub fn format_event(level: Level, target: &str, span: Option<&str>, event: &EventFields) -> String {
    let mut line = format!("[hashnav] {level} {target}");
    if let Some(span) = span {
        line.push_str(" (");
        line.push_str(span);
        line.push(')');
    }
    line.push_str(": ");
    line.push_str(&event.message);
    for (key, value) in &event.fields {
        line.push(' ');
        line.push_str(key);
        line.push('=');
        line.push_str(value);
    }
    line
}

#[cfg(target_arch = "wasm32")]
pub use layer::{ConsoleLayer, install};

#[cfg(target_arch = "wasm32")]
mod layer {
    use super::{EventFields, format_event};
    use tracing::{Level, Metadata, Subscriber};
    use tracing_subscriber::Layer;
    use tracing_subscriber::layer::{Context, SubscriberExt};
    use tracing_subscriber::registry::LookupSpan;
    use wasm_bindgen::JsValue;
    use web_sys::console;

    /// Forwards events at or above `max_level` to `console.*`.
    #[derive(Debug, Clone, Copy)]
    pub struct ConsoleLayer {
        max_level: Level,
    }

    impl ConsoleLayer {
        #[must_use]
        pub fn new(max_level: Level) -> Self {
            Self { max_level }
        }
    }

    impl<S> Layer<S> for ConsoleLayer
    where
        S: Subscriber + for<'a> LookupSpan<'a>,
    {
        fn enabled(&self, metadata: &Metadata<'_>, _ctx: Context<'_, S>) -> bool {
            *metadata.level() <= self.max_level
        }

        fn on_event(&self, event: &tracing::Event<'_>, ctx: Context<'_, S>) {
            let metadata = event.metadata();
            let mut fields = EventFields::default();
            event.record(&mut fields);
            let span = ctx.event_span(event);
            let line = format_event(
                *metadata.level(),
                metadata.target(),
                span.as_ref().map(|s| s.name()),
                &fields,
            );
            let line = JsValue::from_str(&line);
            match *metadata.level() {
                Level::ERROR => console::error_1(&line),
                Level::WARN => console::warn_1(&line),
                Level::INFO => console::info_1(&line),
                _ => console::debug_1(&line),
            }
        }
    }

    /// Install the console layer as the global subscriber. Returns `false`
    /// if a subscriber is already set.
    pub fn install(max_level: Level) -> bool {
        let subscriber = tracing_subscriber::registry().with(ConsoleLayer::new(max_level));
        tracing::subscriber::set_global_default(subscriber).is_ok()
    }
}
