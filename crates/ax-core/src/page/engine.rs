//! Scan-and-strip loop run by the content script.

use std::time::Duration;

use super::ad_state::{AdPhase, AdSession, AdTransition};
use super::dom::{AdStateProbe, PageDom};
use super::selectors::{GENERIC_AD_SELECTORS, VIDEO_SITE_AD_SELECTORS};
use crate::allowlist::hostname_matches_allowlist;

/// Host (and subdomains) that gets the in-stream ad handling.
pub const VIDEO_SITE_DOMAIN: &str = "youtube.com";

pub const GENERIC_POLL_INTERVAL: Duration = Duration::from_millis(1000);
pub const VIDEO_SITE_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Which rule set a page gets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SiteProfile {
    Generic,
    VideoSite,
}

impl SiteProfile {
    pub fn for_host(host: &str) -> Self {
        let host = host.to_ascii_lowercase();
        if hostname_matches_allowlist(&host, &[VIDEO_SITE_DOMAIN]) {
            Self::VideoSite
        } else {
            Self::Generic
        }
    }

    pub fn poll_interval(self) -> Duration {
        match self {
            Self::Generic => GENERIC_POLL_INTERVAL,
            Self::VideoSite => VIDEO_SITE_POLL_INTERVAL,
        }
    }

    /// Selectors stripped on every run.
    pub fn selectors(self) -> impl Iterator<Item = &'static str> {
        let site: &'static [&'static str] = match self {
            Self::Generic => &[],
            Self::VideoSite => VIDEO_SITE_AD_SELECTORS,
        };
        GENERIC_AD_SELECTORS.iter().chain(site.iter()).copied()
    }
}

/// Outcome of one engine run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanReport {
    pub removed: usize,
    /// Ad state transition, on pages with a player probe
    pub ad: Option<AdTransition>,
}

/// Strips ad elements and drives the ad state machine for one page.
pub struct PageEngine<D, P> {
    dom: D,
    probe: Option<P>,
    profile: SiteProfile,
    ads: AdSession,
}

impl<D: PageDom, P: AdStateProbe> PageEngine<D, P> {
    /// Engine that only strips elements.
    pub fn new(dom: D, profile: SiteProfile) -> Self {
        Self {
            dom,
            probe: None,
            profile,
            ads: AdSession::new(),
        }
    }

    /// Engine that also watches the video player through `probe`.
    pub fn with_probe(dom: D, profile: SiteProfile, probe: P) -> Self {
        Self {
            dom,
            probe: Some(probe),
            profile,
            ads: AdSession::new(),
        }
    }

    pub fn profile(&self) -> SiteProfile {
        self.profile
    }

    pub fn poll_interval(&self) -> Duration {
        self.profile.poll_interval()
    }

    pub fn ad_phase(&self) -> AdPhase {
        self.ads.phase()
    }

    /// One idempotent pass. Called on every DOM mutation and on each poll.
    pub fn run(&mut self, now_ms: f64) -> ScanReport {
        let removed = self
            .profile
            .selectors()
            .map(|selector| self.dom.remove_all(selector))
            .sum::<usize>();

        if removed > 0 {
            log::debug!("removed {} ad elements", removed);
        }

        let ad = self
            .probe
            .as_ref()
            .map(|probe| self.ads.tick(probe, &self.dom, now_ms));

        ScanReport { removed, ad }
    }
}
