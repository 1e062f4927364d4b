#![forbid(unsafe_code)]

//! `hashnav-core` keeps page regions in sync with the URL fragment.
//!
//! Design goals:
//! - **Host-independent**: the page is reached only through the
//!   [`document::Document`] trait; `hashnav-web` binds it to the browser DOM,
//!   [`document::MemoryDocument`] keeps it in memory.
//! - **Fail soft**: a broken handler, a malformed config or an unknown id
//!   is logged and skipped; only a missing primary target aborts a cycle.
//! - **No blocking / no threads**: the content loader is awaited by the host
//!   between [`engine::NavigationEngine::begin_cycle`] and
//!   [`engine::NavigationEngine::finish_cycle`].
//!
//! ```
//! use hashnav_core::auth::SharedAuth;
//! use hashnav_core::config::EngineConfig;
//! use hashnav_core::document::{MemoryDocument, MemoryNode};
//! use hashnav_core::engine::NavigationEngine;
//! use hashnav_core::state::Parameters;
//!
//! let doc = MemoryDocument::new();
//! doc.add(MemoryNode::new("about").handler("showPage"));
//!
//! let mut engine = NavigationEngine::new(doc, SharedAuth::new(false), EngineConfig::default());
//! engine.register_handler("showPage", |_id: &str, _state: &str, _params: &Parameters| Ok(true));
//! engine.rediscover();
//!
//! let report = engine.handle_fragment_change("#about");
//! assert!(report.is_committed());
//! assert!(engine.is_element_in_state("about", "visible"));
//! ```

pub mod auth;
pub mod cascade;
pub mod codec;
pub mod config;
pub mod dispatch;
pub mod document;
pub mod engine;
pub mod error;
pub mod logging;
pub mod reconcile;
pub mod registry;
pub mod state;

pub use auth::{AuthSource, SharedAuth};
pub use config::{EngineConfig, NavConfig};
pub use document::{Document, MemoryDocument};
pub use engine::{CycleReport, CycleStart, LoadOutcome, NavigationEngine, PendingCycle, Startup};
pub use error::{HandlerError, NavError};
pub use registry::HandlerRegistry;
pub use state::{ElementState, NavigationState, Parameters};
