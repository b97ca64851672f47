//! Browser binding: runs the engine against the live document with browser
//! timers.

use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::time::Duration;

use gloo::events::EventListener;
use gloo::timers::callback::{Interval, Timeout};
use tracing::{debug, warn};
use wasm_bindgen::JsCast as _;
use wasm_bindgen::prelude::*;
use web_sys::{Document, HtmlElement, Window};

use crate::engine::render::{Element, Node};
use crate::engine::{Chooser, Engine, Fragment, Phase, Schedule, Surface, TimerSet, Wake};
use crate::error::SurfaceError;
use crate::payload::Payload;

/// Global the storefront assigns the payload to.
const PAYLOAD_GLOBAL: &str = "wooNotifications";

thread_local! {
    static DRIVER: RefCell<Option<Shared>> = const { RefCell::new(None) };
}

type Shared = Rc<RefCell<WebDriver>>;

struct WebDriver {
    engine: Engine<DomSurface, MathRandom>,
    ticker: Option<Interval>,
    timeouts: TimerSet<Timeout>,
    _unload: Option<EventListener>,
}

/// Draws notifications into the document body.
pub struct DomSurface {
    document: Document,
}

impl DomSurface {
    pub const fn new(document: Document) -> Self {
        Self { document }
    }

    fn build(&self, element: &Element) -> Result<web_sys::Element, JsValue> {
        let node = self.document.create_element(element.tag)?;
        for (name, value) in &element.attributes {
            node.set_attribute(name, value)?;
        }
        for child in &element.children {
            match child {
                Node::Element(inner) => {
                    node.append_child(&self.build(inner)?)?;
                }
                Node::Text(text) => {
                    node.append_child(&self.document.create_text_node(text))?;
                }
            }
        }
        Ok(node)
    }
}

impl Surface for DomSurface {
    type Handle = web_sys::Element;

    fn set_root_property(&mut self, name: &str, value: &str) -> Result<(), SurfaceError> {
        let root = self
            .document
            .document_element()
            .and_then(|root| root.dyn_into::<HtmlElement>().ok())
            .ok_or_else(|| SurfaceError::Dom("document has no root element".to_string()))?;
        root.style().set_property(name, value).map_err(dom_error)
    }

    fn attach(&mut self, fragment: &Fragment) -> Result<Self::Handle, SurfaceError> {
        let body = self
            .document
            .body()
            .ok_or_else(|| SurfaceError::Dom("document has no body".to_string()))?;
        let node = self.build(&fragment.root).map_err(dom_error)?;
        body.append_child(&node).map_err(dom_error)?;
        Ok(node)
    }

    fn set_phase(&mut self, handle: &Self::Handle, phase: Phase) -> Result<(), SurfaceError> {
        let classes = handle.class_list();
        let (add, remove) = phase.class_delta();
        for class in remove {
            classes.remove_1(class).map_err(dom_error)?;
        }
        for class in add {
            classes.add_1(class).map_err(dom_error)?;
        }
        Ok(())
    }

    fn detach(&mut self, handle: Self::Handle) -> Result<(), SurfaceError> {
        handle.remove();
        Ok(())
    }
}

/// `Math.random` backed picks.
pub struct MathRandom;

impl Chooser for MathRandom {
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    fn pick(&mut self, len: usize) -> usize {
        let scaled = (js_sys::Math::random() * len as f64).floor() as usize;
        scaled.min(len.saturating_sub(1))
    }
}

/// Module entry point. Waits for the document when it is still loading.
///
/// # Errors
///
/// Fails only when there is no window or document to attach to.
#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
    let document = window
        .document()
        .ok_or_else(|| JsValue::from_str("no document"))?;

    if document.ready_state() == "loading" {
        EventListener::once(&document, "DOMContentLoaded", move |_| boot(&window)).forget();
    } else {
        boot(&window);
    }
    Ok(())
}

fn boot(window: &Window) {
    let Some(document) = window.document() else {
        return;
    };
    let payload = read_payload(window);
    let Some(engine) = Engine::start(payload, DomSurface::new(document), MathRandom) else {
        return;
    };

    let shared = Rc::new(RefCell::new(WebDriver {
        engine,
        ticker: None,
        timeouts: TimerSet::new(),
        _unload: None,
    }));
    let weak = Rc::downgrade(&shared);
    let unload = EventListener::new(window, "beforeunload", move |_| {
        if let Some(shared) = weak.upgrade() {
            shared.borrow_mut().engine.teardown();
            pump(&shared);
            let released: Vec<Timeout> = shared.borrow_mut().timeouts.drain().collect();
            drop(released);
        }
    });
    shared.borrow_mut()._unload = Some(unload);
    pump(&shared);
    DRIVER.with(|slot| *slot.borrow_mut() = Some(shared));
}

fn read_payload(window: &Window) -> Option<Payload> {
    let raw = js_sys::Reflect::get(window, &JsValue::from_str(PAYLOAD_GLOBAL)).ok()?;
    if raw.is_undefined() || raw.is_null() {
        debug!("no payload on the page");
        return None;
    }
    let json = js_sys::JSON::stringify(&raw).ok().map(String::from)?;
    serde_json::from_str(&json)
        .map_err(|err| warn!(error = %err, "ignoring malformed payload"))
        .ok()
}

/// Arms browser timers for everything the engine queued.
fn pump(shared: &Shared) {
    let schedules = shared.borrow_mut().engine.take_schedules();
    for schedule in schedules {
        match schedule {
            Schedule::Once { delay, wake } => {
                let weak = Rc::downgrade(shared);
                shared.borrow_mut().timeouts.insert_with(|key| {
                    Timeout::new(millis(delay), move || fire(&weak, Some(key), wake))
                });
            }
            Schedule::Every { period, wake } => {
                let weak = Rc::downgrade(shared);
                let interval = Interval::new(millis(period), move || fire(&weak, None, wake));
                shared.borrow_mut().ticker = Some(interval);
            }
            Schedule::CancelRepeating => {
                // Dropping the interval clears it.
                shared.borrow_mut().ticker = None;
            }
        }
    }
}

/// Runs a fired timer. One-shot timers pass their key so the spent
/// `Timeout` is released once the wake has been handled.
fn fire(weak: &Weak<RefCell<WebDriver>>, key: Option<u64>, wake: Wake) {
    let Some(shared) = weak.upgrade() else {
        return;
    };
    let spent = key.and_then(|key| shared.borrow_mut().timeouts.complete(key));
    shared.borrow_mut().engine.handle(wake);
    pump(&shared);
    drop(spent);
}

fn millis(duration: Duration) -> u32 {
    u32::try_from(duration.as_millis()).unwrap_or(u32::MAX)
}

fn dom_error(err: JsValue) -> SurfaceError {
    SurfaceError::Dom(format!("{err:?}"))
}
