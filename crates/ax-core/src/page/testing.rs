//! In-memory page and video fakes for the page engine tests.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use super::dom::{AdStateProbe, PageDom, VideoHandle};

#[derive(Debug, Default)]
pub struct FakeVideoState {
    pub muted: bool,
    pub current_time: f64,
    pub duration: f64,
    pub paused: bool,
    pub playback_rate: f64,
    pub play_calls: usize,
    pub seeks: Vec<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct FakeVideo(Rc<RefCell<FakeVideoState>>);

impl FakeVideo {
    pub fn with<R>(&self, f: impl FnOnce(&mut FakeVideoState) -> R) -> R {
        f(&mut self.0.borrow_mut())
    }
}

impl VideoHandle for FakeVideo {
    fn muted(&self) -> bool {
        self.0.borrow().muted
    }

    fn set_muted(&self, muted: bool) {
        self.0.borrow_mut().muted = muted;
    }

    fn current_time(&self) -> f64 {
        self.0.borrow().current_time
    }

    fn set_current_time(&self, seconds: f64) {
        let mut state = self.0.borrow_mut();
        state.current_time = seconds;
        state.seeks.push(seconds);
    }

    fn duration(&self) -> f64 {
        self.0.borrow().duration
    }

    fn paused(&self) -> bool {
        self.0.borrow().paused
    }

    fn play(&self) {
        let mut state = self.0.borrow_mut();
        state.paused = false;
        state.play_calls += 1;
    }

    fn set_playback_rate(&self, rate: f64) {
        self.0.borrow_mut().playback_rate = rate;
    }
}

/// Selector-count model of a document plus a scripted player.
#[derive(Debug, Default)]
pub struct FakePage {
    elements: RefCell<HashMap<String, usize>>,
    clickable: RefCell<HashSet<String>>,
    clicks: Cell<usize>,
    ad_showing: Cell<bool>,
    main_video: RefCell<Option<FakeVideo>>,
    ad_video: RefCell<Option<FakeVideo>>,
    player_seeks: Cell<usize>,
}

impl FakePage {
    pub fn insert(&self, selector: &str, count: usize) {
        *self.elements.borrow_mut().entry(selector.to_string()).or_default() += count;
    }

    pub fn count(&self, selector: &str) -> usize {
        self.elements.borrow().get(selector).copied().unwrap_or(0)
    }

    pub fn make_clickable(&self, selector: &str) {
        self.clickable.borrow_mut().insert(selector.to_string());
    }

    pub fn click_count(&self) -> usize {
        self.clicks.get()
    }

    pub fn set_ad_showing(&self, showing: bool) {
        self.ad_showing.set(showing);
    }

    pub fn set_main_video(&self, video: Option<FakeVideo>) {
        *self.main_video.borrow_mut() = video;
    }

    pub fn set_ad_video(&self, video: Option<FakeVideo>) {
        *self.ad_video.borrow_mut() = video;
    }

    pub fn player_seeks(&self) -> usize {
        self.player_seeks.get()
    }
}

impl PageDom for FakePage {
    fn remove_all(&self, selector: &str) -> usize {
        self.elements.borrow_mut().remove(selector).unwrap_or(0)
    }

    fn click_first(&self, selector: &str) -> bool {
        if self.clickable.borrow().contains(selector) {
            self.clicks.set(self.clicks.get() + 1);
            true
        } else {
            false
        }
    }
}

impl AdStateProbe for FakePage {
    type Video = FakeVideo;

    fn ad_showing(&self) -> bool {
        self.ad_showing.get()
    }

    fn main_video(&self) -> Option<FakeVideo> {
        self.main_video.borrow().clone()
    }

    fn ad_video(&self) -> Option<FakeVideo> {
        self.ad_video.borrow().clone()
    }

    fn seek_player_to_end(&self) -> bool {
        self.player_seeks.set(self.player_seeks.get() + 1);
        true
    }
}
