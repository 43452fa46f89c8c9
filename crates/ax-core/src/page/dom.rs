//! Capabilities the page engine needs from the hosting document.
//!
//! Everything is `&self`: implementations wrap live DOM handles (or test
//! fakes with interior mutability), and a missing element is a normal
//! outcome rather than an error.

/// Structural access to the page.
pub trait PageDom {
    /// Remove every element matching `selector`. Returns how many were removed.
    fn remove_all(&self, selector: &str) -> usize;

    /// Click the first element matching `selector`, if any.
    fn click_first(&self, selector: &str) -> bool;
}

/// A playable media element.
pub trait VideoHandle {
    fn muted(&self) -> bool;
    fn set_muted(&self, muted: bool);
    fn current_time(&self) -> f64;
    fn set_current_time(&self, seconds: f64);
    /// Media duration in seconds; `NaN` while unknown.
    fn duration(&self) -> f64;
    fn paused(&self) -> bool;
    fn play(&self);
    fn set_playback_rate(&self, rate: f64);
}

/// Detects in-stream ads on a video player.
///
/// The detection heuristic lives entirely behind this trait so it can change
/// with the hosting site's markup without touching the restoration logic.
pub trait AdStateProbe {
    type Video: VideoHandle;

    /// Is the player currently showing an ad?
    fn ad_showing(&self) -> bool;

    /// The page's main video element.
    fn main_video(&self) -> Option<Self::Video>;

    /// The video element currently playing the ad, if it can be told apart.
    fn ad_video(&self) -> Option<Self::Video>;

    /// Ask the player itself to seek to the end of the current media.
    fn seek_player_to_end(&self) -> bool;
}

impl<T: PageDom + ?Sized> PageDom for std::rc::Rc<T> {
    fn remove_all(&self, selector: &str) -> usize {
        (**self).remove_all(selector)
    }

    fn click_first(&self, selector: &str) -> bool {
        (**self).click_first(selector)
    }
}

impl<T: AdStateProbe + ?Sized> AdStateProbe for std::rc::Rc<T> {
    type Video = T::Video;

    fn ad_showing(&self) -> bool {
        (**self).ad_showing()
    }

    fn main_video(&self) -> Option<Self::Video> {
        (**self).main_video()
    }

    fn ad_video(&self) -> Option<Self::Video> {
        (**self).ad_video()
    }

    fn seek_player_to_end(&self) -> bool {
        (**self).seek_player_to_end()
    }
}
