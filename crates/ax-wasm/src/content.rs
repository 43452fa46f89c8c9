//! Content script entry point and the live-DOM implementations of the page
//! capabilities.

use std::cell::RefCell;
use std::rc::Rc;

use ax_core::page::selectors::{AD_SHOWING_SELECTOR, AD_VIDEO_SELECTOR, MAIN_VIDEO_SELECTORS, PLAYER_ELEMENT_ID};
use ax_core::page::{Activation, AdStateProbe, BlockReply, PageDom, PageEngine, SiteProfile, VideoHandle};
use serde_json::{json, Value};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::spawn_local;
use web_sys::{
    Document, Element, HtmlElement, HtmlMediaElement, MutationObserver, MutationObserverInit,
};

use crate::chrome;

// =============================================================================
// DOM Capabilities
// =============================================================================

#[derive(Clone)]
pub struct WebPage {
    document: Document,
}

impl WebPage {
    pub fn new(document: Document) -> Self {
        Self { document }
    }

    fn query(&self, selector: &str) -> Option<Element> {
        self.document.query_selector(selector).ok().flatten()
    }

    fn query_video(&self, selector: &str) -> Option<WebVideo> {
        self.query(selector)
            .and_then(|element| element.dyn_into::<HtmlMediaElement>().ok())
            .map(WebVideo)
    }
}

impl PageDom for WebPage {
    fn remove_all(&self, selector: &str) -> usize {
        let Ok(nodes) = self.document.query_selector_all(selector) else {
            return 0;
        };

        let mut removed = 0;
        for index in 0..nodes.length() {
            if let Some(element) = nodes.get(index).and_then(|node| node.dyn_into::<Element>().ok()) {
                element.remove();
                removed += 1;
            }
        }
        removed
    }

    fn click_first(&self, selector: &str) -> bool {
        match self.query(selector).and_then(|element| element.dyn_into::<HtmlElement>().ok()) {
            Some(element) => {
                element.click();
                true
            }
            None => false,
        }
    }
}

impl AdStateProbe for WebPage {
    type Video = WebVideo;

    fn ad_showing(&self) -> bool {
        self.query(AD_SHOWING_SELECTOR).is_some()
    }

    fn main_video(&self) -> Option<WebVideo> {
        MAIN_VIDEO_SELECTORS
            .iter()
            .find_map(|selector| self.query_video(selector))
    }

    fn ad_video(&self) -> Option<WebVideo> {
        self.query_video(AD_VIDEO_SELECTOR)
    }

    /// Uses the player element's own `getDuration`/`seekTo` API.
    fn seek_player_to_end(&self) -> bool {
        let Some(player) = self.document.get_element_by_id(PLAYER_ELEMENT_ID) else {
            return false;
        };
        let player: JsValue = player.into();

        let duration = chrome::method(&player, "getDuration")
            .and_then(|get_duration| get_duration.call0(&player).ok())
            .and_then(|value| value.as_f64())
            .filter(|duration| duration.is_finite() && *duration > 0.0);
        let (Some(duration), Some(seek_to)) = (duration, chrome::method(&player, "seekTo")) else {
            return false;
        };

        seek_to
            .call2(&player, &JsValue::from_f64(duration), &JsValue::TRUE)
            .is_ok()
    }
}

pub struct WebVideo(HtmlMediaElement);

impl VideoHandle for WebVideo {
    fn muted(&self) -> bool {
        self.0.muted()
    }

    fn set_muted(&self, muted: bool) {
        self.0.set_muted(muted);
    }

    fn current_time(&self) -> f64 {
        self.0.current_time()
    }

    fn set_current_time(&self, seconds: f64) {
        self.0.set_current_time(seconds);
    }

    fn duration(&self) -> f64 {
        self.0.duration()
    }

    fn paused(&self) -> bool {
        self.0.paused()
    }

    fn play(&self) {
        // The returned promise rejects under autoplay restrictions.
        let _ = self.0.play();
    }

    fn set_playback_rate(&self, rate: f64) {
        self.0.set_playback_rate(rate);
    }
}

// =============================================================================
// Activation
// =============================================================================

type Engine = PageEngine<WebPage, WebPage>;

/// Ask the background whether this page should be blocked and start the
/// engine accordingly. Call once from the content script.
#[wasm_bindgen]
pub fn start_content() {
    crate::logger::init(log::LevelFilter::Warn);

    let Some(window) = web_sys::window() else {
        return;
    };
    let Some(document) = window.document() else {
        return;
    };
    let location = window.location();
    let host = location.hostname().unwrap_or_default();
    let activation = Rc::new(RefCell::new(Activation::new()));

    let runtime = chrome::lookup(&["chrome", "runtime"]).filter(|runtime| chrome::method(runtime, "sendMessage").is_some());
    let Some(runtime) = runtime else {
        start_when_ready(document, host, activation, BlockReply::NoExtension);
        return;
    };

    let url = location.href().unwrap_or_default();
    spawn_local(async move {
        let reply = ask_background(&runtime, &url).await;
        start_when_ready(document, host, activation, reply);
    });
}

async fn ask_background(runtime: &JsValue, url: &str) -> BlockReply {
    let message = match chrome::from_json(&json!({ "type": "SHOULD_BLOCK_PAGE", "url": url })) {
        Ok(message) => message,
        Err(_) => return BlockReply::Failed,
    };

    match chrome::call_async(runtime, "sendMessage", &[message]).await {
        Ok(response) => {
            let decision = chrome::to_json(&response)
                .ok()
                .and_then(|response| response.get("shouldBlock").and_then(Value::as_bool));
            BlockReply::Answered(decision)
        }
        Err(e) => {
            log::debug!("SHOULD_BLOCK_PAGE failed: {}", e);
            BlockReply::Failed
        }
    }
}

fn start_when_ready(document: Document, host: String, activation: Rc<RefCell<Activation>>, reply: BlockReply) {
    if !reply.should_activate() {
        return;
    }

    if document.ready_state() == "loading" {
        let target = document.clone();
        let callback = Closure::once_into_js(move || init_engine(&document, &host, &activation));
        let _ = target.add_event_listener_with_callback("DOMContentLoaded", callback.unchecked_ref());
    } else {
        init_engine(&document, &host, &activation);
    }
}

fn init_engine(document: &Document, host: &str, activation: &RefCell<Activation>) {
    if !activation.borrow_mut().begin() {
        return;
    }

    let page = WebPage::new(document.clone());
    let profile = SiteProfile::for_host(host);
    let engine: Engine = match profile {
        SiteProfile::VideoSite => PageEngine::with_probe(page.clone(), profile, page),
        SiteProfile::Generic => PageEngine::new(page, profile),
    };
    let poll_ms = engine.poll_interval().as_millis() as i32;
    let engine = Rc::new(RefCell::new(engine));

    run(&engine);
    observe_mutations(document, Rc::clone(&engine));
    poll(poll_ms, engine);
}

fn run(engine: &RefCell<Engine>) {
    if let Ok(mut engine) = engine.try_borrow_mut() {
        engine.run(js_sys::Date::now());
    }
}

fn observe_mutations(document: &Document, engine: Rc<RefCell<Engine>>) {
    let Some(root) = document
        .document_element()
        .or_else(|| document.body().map(Into::into))
    else {
        return;
    };

    let callback = Closure::<dyn FnMut(js_sys::Array, MutationObserver)>::new(
        move |_records: js_sys::Array, _observer: MutationObserver| run(&engine),
    );
    let observer = match MutationObserver::new(callback.as_ref().unchecked_ref()) {
        Ok(observer) => observer,
        Err(e) => {
            log::warn!("MutationObserver unavailable: {}", chrome::describe(e));
            return;
        }
    };

    let options = MutationObserverInit::new();
    options.set_child_list(true);
    options.set_subtree(true);
    if let Err(e) = observer.observe_with_options(&root, &options) {
        log::warn!("Failed to observe document: {}", chrome::describe(e));
        return;
    }
    callback.forget();
}

fn poll(interval_ms: i32, engine: Rc<RefCell<Engine>>) {
    let Some(window) = web_sys::window() else {
        return;
    };
    let callback = Closure::<dyn FnMut()>::new(move || run(&engine));
    if window
        .set_interval_with_callback_and_timeout_and_arguments_0(callback.as_ref().unchecked_ref(), interval_ms)
        .is_ok()
    {
        callback.forget();
    }
}
