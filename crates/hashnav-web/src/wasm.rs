#![forbid(unsafe_code)]

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use hashnav_core::auth::SharedAuth;
use hashnav_core::codec;
use hashnav_core::engine::{CycleReport, CycleStart, LoadOutcome, NavigationEngine, Startup};
use hashnav_core::error::HandlerError;
use hashnav_core::state::{ElementState, NavigationState, Parameters};
use js_sys::{Array, Function, Object, Promise};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::{JsFuture, spawn_local};
use web_time::Instant;

use crate::console;
use crate::guard::{self, Busy};
use crate::convert::{self, WebOptions};
use crate::dom::WebDocument;

type Engine = NavigationEngine<WebDocument, SharedAuth>;
type EventCallback = Closure<dyn FnMut(web_sys::Event)>;

const GLOBAL_LOADER: &str = "loadContainerContent";

struct Shared {
    engine: RefCell<Engine>,
    auth: SharedAuth,
    window: web_sys::Window,
    loader: RefCell<Option<Function>>,
    load_timeout_ms: i32,
    hashchange: RefCell<Option<EventCallback>>,
}

impl Shared {
    fn location_fragment(&self) -> String {
        self.window
            .location()
            .hash()
            .map(|h| h.trim_start_matches('#').to_owned())
            .unwrap_or_default()
    }
}

/// Fragment-driven navigator for the current page.
///
/// ```js
/// const nav = new HashNavigator({ fallbackFragment: "home", logLevel: "info" });
/// nav.registerHandler("handleVerticalContainerNavigation", (id, state, params) => { ... });
/// nav.setContentLoader(async (state) => { ... });
/// nav.start();
/// ```
#[wasm_bindgen]
pub struct HashNavigator {
    shared: Rc<Shared>,
}

#[wasm_bindgen]
impl HashNavigator {
    /// Create a navigator. `options` is an optional plain object with the
    /// engine configuration (`containerHandlers`, `fallbackFragment`,
    /// `loadTimeoutMs`, `dom`) and `logLevel`.
    #[wasm_bindgen(constructor)]
    pub fn new(options: Option<JsValue>) -> Result<HashNavigator, JsValue> {
        let options = match options.filter(|o| !o.is_undefined() && !o.is_null()) {
            Some(value) => WebOptions::from_json(&stringify(&value)?).map_err(js_error)?,
            None => WebOptions::default(),
        };
        if !console::install(options.console_level()) {
            tracing::debug!("global subscriber already installed, console layer skipped");
        }

        let window = web_sys::window().ok_or_else(|| js_error("no window"))?;
        let document = window.document().ok_or_else(|| js_error("no document"))?;
        let auth = SharedAuth::new(false);
        let load_timeout_ms = i32::try_from(options.engine.load_timeout_ms).unwrap_or(i32::MAX);
        let page = WebDocument::new(window.clone(), document, options.engine.dom.clone());
        let engine = NavigationEngine::new(page, auth.clone(), options.engine);

        let shared = Rc::new(Shared {
            engine: RefCell::new(engine),
            auth: auth.clone(),
            window,
            loader: RefCell::new(None),
            load_timeout_ms,
            hashchange: RefCell::new(None),
        });

        let weak = Rc::downgrade(&shared);
        auth.on_change(move |authenticated| {
            if let Some(shared) = weak.upgrade() {
                auth_changed(&shared, authenticated);
            }
        });

        Ok(Self { shared })
    }

    /// Register a handler `(elementId, state, parameters) => boolean`.
    /// Returning `false` reports the state as not applied; throwing is a
    /// handler failure.
    #[wasm_bindgen(js_name = registerHandler)]
    pub fn register_handler(&self, name: String, handler: Function) -> Result<(), JsValue> {
        let mut engine = guard::write(&self.shared.engine).map_err(busy)?;
        engine.register_handler(name, move |id: &str, state: &str, params: &Parameters| {
            let params = parameters_to_js(params).map_err(|e| HandlerError::new(js_message(&e)))?;
            let result = handler
                .call3(&JsValue::NULL, &JsValue::from_str(id), &JsValue::from_str(state), &params)
                .map_err(|e| HandlerError::new(js_message(&e)))?;
            Ok(result.as_bool() != Some(false))
        });
        Ok(())
    }

    /// Set (or clear) the dynamic-content loader `(state) => Promise`.
    /// Without one, a global `loadContainerContent` is used when present.
    #[wasm_bindgen(js_name = setContentLoader)]
    pub fn set_content_loader(&self, loader: Option<Function>) {
        *self.shared.loader.borrow_mut() = loader;
    }

    /// Update the authentication flag consulted for protected elements.
    #[wasm_bindgen(js_name = setAuthenticated)]
    pub fn set_authenticated(&self, authenticated: bool) {
        self.shared.auth.set(authenticated);
    }

    /// Discover elements, listen for `hashchange` and run the first cycle.
    pub fn start(&self) -> Result<(), JsValue> {
        self.listen()?;
        let startup = guard::write(&self.shared.engine).map_err(busy)?.init();
        match startup {
            Startup::Initial(start) => spawn_local(complete(Rc::clone(&self.shared), start)),
            Startup::AutoNavigated(fragment) => {
                tracing::debug!(fragment = %fragment, "waiting for default navigation");
            }
            Startup::AlreadyInitialized => {}
        }
        Ok(())
    }

    /// Navigate a single element. Returns the fragment written.
    pub fn navigate(
        &self,
        id: String,
        state: Option<String>,
        parameters: Option<JsValue>,
    ) -> Result<String, JsValue> {
        let parameters = match parameters.filter(|p| !p.is_undefined() && !p.is_null()) {
            Some(value) => convert::parameters_from_json(&stringify(&value)?).map_err(js_error)?,
            None => Parameters::new(),
        };
        let state = state
            .filter(|s| !s.is_empty())
            .map_or_else(ElementState::visible, ElementState::new);
        Ok(self.write_fragment(&NavigationState::single(id, state.with_parameters(parameters))))
    }

    /// Navigate several elements at once. Returns the fragment written.
    #[wasm_bindgen(js_name = navigateMultiple)]
    pub fn navigate_multiple(&self, states: JsValue) -> Result<String, JsValue> {
        let state = convert::state_from_json(&stringify(&states)?).map_err(js_error)?;
        Ok(self.write_fragment(&state))
    }

    /// Last committed state as `{ id: { state, parameters } }`.
    #[wasm_bindgen(js_name = getCurrentState)]
    pub fn get_current_state(&self) -> Result<JsValue, JsValue> {
        let engine = guard::read(&self.shared.engine).map_err(busy)?;
        state_to_js(engine.current_state())
    }

    #[wasm_bindgen(js_name = isElementInState)]
    pub fn is_element_in_state(&self, id: &str, state: &str) -> Result<bool, JsValue> {
        let engine = guard::read(&self.shared.engine).map_err(busy)?;
        Ok(engine.is_element_in_state(id, state))
    }

    /// Re-scan the page after new navigable elements were injected.
    /// Returns the number of elements registered.
    pub fn rediscover(&self) -> Result<u32, JsValue> {
        let report = guard::write(&self.shared.engine).map_err(busy)?.rediscover();
        Ok(u32::try_from(report.registered.len()).unwrap_or(u32::MAX))
    }

    /// Stop listening for `hashchange` and drop the content loader.
    pub fn destroy(&self) {
        if let Some(callback) = self.shared.hashchange.borrow_mut().take() {
            let listener: &Function = callback.as_ref().unchecked_ref();
            guard::warn_on_err(
                self.shared
                    .window
                    .remove_event_listener_with_callback("hashchange", listener),
                "removeEventListener",
            );
        }
        *self.shared.loader.borrow_mut() = None;
    }
}

impl HashNavigator {
    fn listen(&self) -> Result<(), JsValue> {
        let mut slot = self.shared.hashchange.borrow_mut();
        if slot.is_some() {
            return Ok(());
        }
        let weak: Weak<Shared> = Rc::downgrade(&self.shared);
        let callback = EventCallback::wrap(Box::new(move |_event: web_sys::Event| {
            let Some(shared) = weak.upgrade() else {
                return;
            };
            let fragment = shared.location_fragment();
            spawn_local(run_cycle(shared, fragment));
        }));
        self.shared
            .window
            .add_event_listener_with_callback("hashchange", callback.as_ref().unchecked_ref())?;
        *slot = Some(callback);
        Ok(())
    }

    fn write_fragment(&self, state: &NavigationState) -> String {
        let fragment = codec::encode(state);
        if let Err(err) = self.shared.window.location().set_hash(&fragment) {
            tracing::warn!(fragment = %fragment, error = ?err, "failed to write location hash");
        }
        fragment
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Cycle driving
// ─────────────────────────────────────────────────────────────────────────────

async fn run_cycle(shared: Rc<Shared>, fragment: String) {
    let start = match guard::write(&shared.engine) {
        Ok(mut engine) => engine.begin_cycle(&fragment),
        Err(_) => {
            tracing::warn!(fragment = %fragment, "navigator busy, fragment change dropped");
            return;
        }
    };
    complete(shared, start).await;
}

async fn complete(shared: Rc<Shared>, start: CycleStart) {
    let pending = match start {
        CycleStart::Cleared(report) => return settled(&shared, &report),
        CycleStart::Pending(pending) => pending,
    };

    let outcome = load_content(&shared, pending.load_request()).await;

    // No borrow is held across the await above.
    let report = match guard::write(&shared.engine) {
        Ok(mut engine) => engine.finish_cycle(pending, outcome),
        Err(_) => {
            tracing::warn!(generation = pending.generation(), "navigator busy, cycle dropped");
            return;
        }
    };
    settled(&shared, &report);
}

fn settled(shared: &Shared, report: &CycleReport) {
    // A redirect is applied through the location hash; the follow-up cycle
    // arrives as its own hashchange.
    tracing::debug!(
        generation = report.generation,
        status = ?report.status,
        redirected = report.redirected_to.is_some(),
        location = %shared.location_fragment(),
        "navigation cycle settled"
    );
}

async fn load_content(shared: &Shared, request: &NavigationState) -> LoadOutcome {
    let Some(loader) = shared.loader.borrow().clone().or_else(|| global_loader(shared)) else {
        return LoadOutcome::Skipped;
    };
    let argument = match state_to_js(request) {
        Ok(value) => value,
        Err(err) => return LoadOutcome::Failed(js_message(&err)),
    };
    let returned = match loader.call1(&JsValue::NULL, &argument) {
        Ok(value) => value,
        Err(err) => return LoadOutcome::Failed(js_message(&err)),
    };

    let started = Instant::now();
    let sentinel = Object::new();
    let timer = Cell::new(None);
    let timeout = Promise::new(&mut |resolve, _reject| {
        match shared
            .window
            .set_timeout_with_callback_and_timeout_and_arguments_1(
                &resolve,
                shared.load_timeout_ms,
                &sentinel,
            ) {
            Ok(handle) => timer.set(Some(handle)),
            Err(err) => tracing::warn!(error = ?err, "failed to arm content load timeout"),
        }
    });
    let race = Promise::race(&Array::of2(&Promise::resolve(&returned), &timeout));
    let result = JsFuture::from(race).await;
    if let Some(handle) = timer.get() {
        shared.window.clear_timeout_with_handle(handle);
    }

    let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    match result {
        Ok(value) if Object::is(&value, &sentinel) => LoadOutcome::TimedOut,
        Ok(_) => {
            tracing::debug!(elapsed_ms, entries = request.len(), "dynamic content loaded");
            LoadOutcome::Loaded
        }
        Err(err) => LoadOutcome::Failed(js_message(&err)),
    }
}

/// The page-level `loadContainerContent` function, if one is defined.
fn global_loader(shared: &Shared) -> Option<Function> {
    js_sys::Reflect::get(&shared.window, &JsValue::from_str(GLOBAL_LOADER))
        .ok()
        .and_then(|value| value.dyn_into::<Function>().ok())
}

fn auth_changed(shared: &Shared, authenticated: bool) {
    let redirect = match guard::write(&shared.engine) {
        Ok(mut engine) => engine.on_auth_changed(authenticated),
        Err(_) => {
            tracing::warn!(authenticated, "navigator busy, auth change not applied");
            return;
        }
    };
    if let Some(fragment) = redirect {
        tracing::debug!(fragment = %fragment, "redirected after auth change");
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// JS value helpers
// ─────────────────────────────────────────────────────────────────────────────

fn stringify(value: &JsValue) -> Result<String, JsValue> {
    js_sys::JSON::stringify(value)?
        .as_string()
        .ok_or_else(|| js_error("value is not JSON-serializable"))
}

fn state_to_js(state: &NavigationState) -> Result<JsValue, JsValue> {
    let json = convert::state_to_json(state).map_err(js_error)?;
    js_sys::JSON::parse(&json)
}

fn parameters_to_js(parameters: &Parameters) -> Result<JsValue, JsValue> {
    let object = Object::new();
    for (key, value) in parameters {
        js_sys::Reflect::set(&object, &JsValue::from_str(key), &JsValue::from_str(value))?;
    }
    Ok(object.into())
}

fn js_message(value: &JsValue) -> String {
    if let Some(err) = value.dyn_ref::<js_sys::Error>() {
        return String::from(err.message());
    }
    value.as_string().unwrap_or_else(|| format!("{value:?}"))
}

fn js_error(message: impl AsRef<str>) -> JsValue {
    js_sys::Error::new(message.as_ref()).into()
}

fn busy(err: Busy) -> JsValue {
    js_error(err.to_string())
}
