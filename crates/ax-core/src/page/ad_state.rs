//! In-stream video ad state machine
//!
//! `NoAd -> AdShowing -> NoAd`. Entering `AdShowing` captures the main
//! video's mute state and position; leaving it restores them. While the ad
//! shows, the ad video is pushed to its end, sped up and muted, the skip
//! control is clicked (and clicked once more after a short delay) and ad
//! overlays are stripped.
//!
//! `tick` is safe to call as often as the caller likes: every call re-reads
//! the probe and only acts on the difference from the recorded phase.

use super::dom::{AdStateProbe, PageDom, VideoHandle};
use super::selectors::{AD_OVERLAY_SELECTORS, SKIP_BUTTON_SELECTORS};

/// Distance from the ad's end that the ad video is seeked to.
pub const AD_END_MARGIN_SECS: f64 = 0.1;
/// Playback rate applied to ad videos.
pub const AD_PLAYBACK_RATE: f64 = 16.0;
pub const NORMAL_PLAYBACK_RATE: f64 = 1.0;
/// Delay before the skip control is clicked a second time.
pub const SKIP_RETRY_DELAY_MS: f64 = 300.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AdPhase {
    #[default]
    NoAd,
    AdShowing,
}

/// What a single `tick` observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdTransition {
    /// No ad before, none now
    Idle,
    /// An ad just started
    Started,
    /// An ad is still showing
    Showing,
    /// The ad ended and playback was restored
    Ended,
    /// The main video vanished mid-ad; state dropped without restoring
    Reset,
}

/// Main video state captured when an ad starts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackBaseline {
    pub muted: bool,
    pub current_time: f64,
}

impl PlaybackBaseline {
    pub fn capture<V: VideoHandle>(video: &V) -> Self {
        Self {
            muted: video.muted(),
            current_time: video.current_time(),
        }
    }

    /// Restore onto `video`, resuming it at normal speed.
    ///
    /// The position is only restored while it still lies inside the media.
    pub fn restore<V: VideoHandle>(&self, video: &V) {
        resume(video);
        video.set_muted(self.muted);

        let position = self.current_time;
        if position.is_finite() && position >= 0.0 && position < video.duration() {
            video.set_current_time(position);
        }
    }
}

fn resume<V: VideoHandle>(video: &V) {
    if video.paused() {
        video.play();
    }
    video.set_playback_rate(NORMAL_PLAYBACK_RATE);
}

/// Per-page ad state.
#[derive(Debug, Clone, Default)]
pub struct AdSession {
    phase: AdPhase,
    baseline: Option<PlaybackBaseline>,
    skip_clicked: bool,
    skip_retry_at: Option<f64>,
}

impl AdSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> AdPhase {
        self.phase
    }

    pub fn baseline(&self) -> Option<PlaybackBaseline> {
        self.baseline
    }

    /// Re-evaluate the player. `now_ms` is a monotonic timestamp in milliseconds.
    pub fn tick<P, D>(&mut self, probe: &P, dom: &D, now_ms: f64) -> AdTransition
    where
        P: AdStateProbe + ?Sized,
        D: PageDom + ?Sized,
    {
        let showing = probe.ad_showing();
        let main_video = probe.main_video();

        match (self.phase, showing) {
            (AdPhase::AdShowing, _) if main_video.is_none() => {
                log::debug!("main video gone while ad showing, resetting");
                self.reset();
                AdTransition::Reset
            }
            (AdPhase::NoAd, false) => AdTransition::Idle,
            (AdPhase::NoAd, true) => {
                self.reset();
                self.phase = AdPhase::AdShowing;
                self.baseline = main_video.as_ref().map(PlaybackBaseline::capture);
                log::debug!("ad started, baseline {:?}", self.baseline);
                self.neutralize(probe, dom, now_ms);
                AdTransition::Started
            }
            (AdPhase::AdShowing, true) => {
                self.neutralize(probe, dom, now_ms);
                AdTransition::Showing
            }
            (AdPhase::AdShowing, false) => {
                if let Some(video) = main_video.as_ref() {
                    match self.baseline {
                        Some(baseline) => baseline.restore(video),
                        None => resume(video),
                    }
                }
                log::debug!("ad ended");
                self.reset();
                AdTransition::Ended
            }
        }
    }

    fn reset(&mut self) {
        *self = Self::default();
    }

    fn neutralize<P, D>(&mut self, probe: &P, dom: &D, now_ms: f64)
    where
        P: AdStateProbe + ?Sized,
        D: PageDom + ?Sized,
    {
        let mut forced_to_end = false;
        if let Some(ad) = probe.ad_video() {
            let duration = ad.duration();
            if duration.is_finite() && duration > 0.0 {
                let target = (duration - AD_END_MARGIN_SECS).max(0.0);
                if ad.current_time() < target {
                    ad.set_current_time(target);
                }
                forced_to_end = true;
            }
            ad.set_playback_rate(AD_PLAYBACK_RATE);
            ad.set_muted(true);
        }

        self.click_skip(dom, now_ms);

        if !forced_to_end {
            probe.seek_player_to_end();
        }

        for selector in AD_OVERLAY_SELECTORS {
            dom.remove_all(selector);
        }
    }

    fn click_skip<D: PageDom + ?Sized>(&mut self, dom: &D, now_ms: f64) {
        if !self.skip_clicked {
            if click_any_skip(dom) {
                self.skip_clicked = true;
                self.skip_retry_at = Some(now_ms + SKIP_RETRY_DELAY_MS);
            }
            return;
        }

        if let Some(retry_at) = self.skip_retry_at {
            if now_ms >= retry_at {
                self.skip_retry_at = None;
                click_any_skip(dom);
            }
        }
    }
}

fn click_any_skip<D: PageDom + ?Sized>(dom: &D) -> bool {
    SKIP_BUTTON_SELECTORS.iter().any(|selector| dom.click_first(selector))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::testing::{FakePage, FakeVideo};

    fn playing_video(current_time: f64, duration: f64) -> FakeVideo {
        let video = FakeVideo::default();
        video.with(|v| {
            v.muted = false;
            v.current_time = current_time;
            v.duration = duration;
            v.paused = false;
            v.playback_rate = 1.0;
        });
        video
    }

    #[test]
    fn test_restores_playback_after_ad() {
        let page = FakePage::default();
        let video = playing_video(120.0, 600.0);
        page.set_main_video(Some(video.clone()));

        let mut session = AdSession::new();
        assert_eq!(session.tick(&page, &page, 0.0), AdTransition::Idle);

        // The player reuses the main element for the ad.
        page.set_ad_showing(true);
        page.set_ad_video(Some(video.clone()));
        assert_eq!(session.tick(&page, &page, 10.0), AdTransition::Started);
        assert_eq!(session.phase(), AdPhase::AdShowing);
        assert_eq!(
            session.baseline(),
            Some(PlaybackBaseline { muted: false, current_time: 120.0 })
        );
        video.with(|v| {
            assert!(v.muted);
            assert_eq!(v.playback_rate, AD_PLAYBACK_RATE);
            assert!((v.current_time - (600.0 - AD_END_MARGIN_SECS)).abs() < 1e-9);
        });

        // Ad over: content reloaded into the element, paused.
        page.set_ad_showing(false);
        page.set_ad_video(None);
        video.with(|v| {
            v.duration = 600.0;
            v.paused = true;
        });
        assert_eq!(session.tick(&page, &page, 20.0), AdTransition::Ended);
        assert_eq!(session.phase(), AdPhase::NoAd);
        video.with(|v| {
            assert!(!v.muted);
            assert!(!v.paused);
            assert_eq!(v.play_calls, 1);
            assert_eq!(v.playback_rate, NORMAL_PLAYBACK_RATE);
            assert!((v.current_time - 120.0).abs() < 1e-9);
        });
    }

    #[test]
    fn test_restores_muted_baseline() {
        let page = FakePage::default();
        let video = playing_video(30.0, 100.0);
        video.with(|v| v.muted = true);
        page.set_main_video(Some(video.clone()));
        page.set_ad_showing(true);

        let mut session = AdSession::new();
        session.tick(&page, &page, 0.0);
        video.with(|v| v.muted = false);

        page.set_ad_showing(false);
        session.tick(&page, &page, 1.0);
        video.with(|v| assert!(v.muted));
    }

    #[test]
    fn test_position_past_duration_not_restored() {
        let page = FakePage::default();
        let video = playing_video(500.0, 600.0);
        page.set_main_video(Some(video.clone()));
        page.set_ad_showing(true);

        let mut session = AdSession::new();
        session.tick(&page, &page, 0.0);

        page.set_ad_showing(false);
        video.with(|v| {
            v.duration = 200.0;
            v.current_time = 0.0;
            v.seeks.clear();
        });
        session.tick(&page, &page, 1.0);
        video.with(|v| {
            assert!(v.seeks.is_empty());
            assert_eq!(v.current_time, 0.0);
        });
    }

    #[test]
    fn test_zero_position_is_restored() {
        let page = FakePage::default();
        let video = playing_video(0.0, 300.0);
        page.set_main_video(Some(video.clone()));
        page.set_ad_showing(true);

        let mut session = AdSession::new();
        session.tick(&page, &page, 0.0);
        video.with(|v| v.current_time = 15.0);

        page.set_ad_showing(false);
        session.tick(&page, &page, 1.0);
        video.with(|v| assert_eq!(v.current_time, 0.0));
    }

    #[test]
    fn test_unknown_duration_skips_position_restore() {
        let page = FakePage::default();
        let video = playing_video(42.0, 300.0);
        page.set_main_video(Some(video.clone()));
        page.set_ad_showing(true);

        let mut session = AdSession::new();
        session.tick(&page, &page, 0.0);

        page.set_ad_showing(false);
        video.with(|v| {
            v.duration = f64::NAN;
            v.current_time = 3.0;
        });
        session.tick(&page, &page, 1.0);
        video.with(|v| {
            assert_eq!(v.current_time, 3.0);
            assert_eq!(v.playback_rate, NORMAL_PLAYBACK_RATE);
        });
    }

    #[test]
    fn test_main_video_removed_resets_without_restore() {
        let page = FakePage::default();
        let video = playing_video(120.0, 600.0);
        page.set_main_video(Some(video.clone()));
        page.set_ad_showing(true);

        let mut session = AdSession::new();
        assert_eq!(session.tick(&page, &page, 0.0), AdTransition::Started);

        page.set_main_video(None);
        assert_eq!(session.tick(&page, &page, 1.0), AdTransition::Reset);
        assert_eq!(session.phase(), AdPhase::NoAd);
        assert_eq!(session.baseline(), None);

        // A fresh video on the next page is left alone.
        let next = playing_video(5.0, 50.0);
        page.set_main_video(Some(next.clone()));
        page.set_ad_showing(false);
        assert_eq!(session.tick(&page, &page, 2.0), AdTransition::Idle);
        next.with(|v| {
            assert!(v.seeks.is_empty());
            assert_eq!(v.play_calls, 0);
        });
    }

    #[test]
    fn test_skip_clicked_then_retried_once() {
        let page = FakePage::default();
        page.set_main_video(Some(playing_video(10.0, 100.0)));
        page.set_ad_showing(true);
        page.make_clickable(".ytp-ad-skip-button-modern");

        let mut session = AdSession::new();
        session.tick(&page, &page, 0.0);
        assert_eq!(page.click_count(), 1);

        session.tick(&page, &page, SKIP_RETRY_DELAY_MS / 2.0);
        assert_eq!(page.click_count(), 1);

        session.tick(&page, &page, SKIP_RETRY_DELAY_MS + 1.0);
        assert_eq!(page.click_count(), 2);

        session.tick(&page, &page, SKIP_RETRY_DELAY_MS * 4.0);
        assert_eq!(page.click_count(), 2);
    }

    #[test]
    fn test_skip_clicked_when_it_appears_later() {
        let page = FakePage::default();
        page.set_main_video(Some(playing_video(10.0, 100.0)));
        page.set_ad_showing(true);

        let mut session = AdSession::new();
        session.tick(&page, &page, 0.0);
        assert_eq!(page.click_count(), 0);

        page.make_clickable(".ytp-ad-skip-button");
        session.tick(&page, &page, 5000.0);
        assert_eq!(page.click_count(), 1);
    }

    #[test]
    fn test_player_seek_fallback_without_ad_video() {
        let page = FakePage::default();
        page.set_main_video(Some(playing_video(10.0, 100.0)));
        page.set_ad_showing(true);

        let mut session = AdSession::new();
        session.tick(&page, &page, 0.0);
        assert_eq!(page.player_seeks(), 1);

        // With a seekable ad video the player API is left alone.
        page.set_ad_video(Some(playing_video(1.0, 15.0)));
        session.tick(&page, &page, 1.0);
        assert_eq!(page.player_seeks(), 1);
    }

    #[test]
    fn test_overlays_stripped_while_showing() {
        let page = FakePage::default();
        page.set_main_video(Some(playing_video(10.0, 100.0)));
        page.insert(".ytp-ad-overlay-container", 2);
        page.set_ad_showing(true);

        let mut session = AdSession::new();
        session.tick(&page, &page, 0.0);
        assert_eq!(page.count(".ytp-ad-overlay-container"), 0);
    }

    #[test]
    fn test_repeated_ticks_are_stable() {
        let page = FakePage::default();
        let video = playing_video(60.0, 600.0);
        page.set_main_video(Some(video.clone()));
        page.set_ad_showing(true);

        let mut session = AdSession::new();
        session.tick(&page, &page, 0.0);
        for n in 1..20 {
            assert_eq!(session.tick(&page, &page, n as f64), AdTransition::Showing);
        }
        assert_eq!(
            session.baseline(),
            Some(PlaybackBaseline { muted: false, current_time: 60.0 })
        );
    }
}
