//! Static selector lists for ad-bearing elements.

/// Ad containers removed on every page.
pub const GENERIC_AD_SELECTORS: &[&str] = &[
    r#"iframe[src*="doubleclick"]"#,
    r#"iframe[src*="googlesyndication"]"#,
    r#"iframe[src*="adservice"]"#,
    r#"[class*="ad-banner"]"#,
    r#"[class*="ad-container"]"#,
    r#"[id^="ads-"]"#,
    r#"[id^="ad-"]"#,
    "[data-ad-name]",
    ".adsbygoogle",
    ".sponsored",
    ".ad-slot",
    ".advertisement",
    ".ad-unit",
    ".sticky-ad",
    ".ad-placeholder",
];

/// Ad modules removed on the video site.
pub const VIDEO_SITE_AD_SELECTORS: &[&str] = &[
    ".video-ads",
    ".ytp-ad-module",
    ".ytp-ad-player-overlay",
    ".ytp-ad-image-overlay",
    ".ytp-ad-text-overlay",
    "ytd-promoted-video-renderer",
    "ytd-display-ad-renderer",
    ".ytp-ad-preview-container",
    ".ytp-ad-progress",
];

/// Overlay and text elements stripped while an in-stream ad is showing.
pub const AD_OVERLAY_SELECTORS: &[&str] = &[
    ".ytp-ad-player-overlay",
    ".ytp-ad-player-overlay-layout",
    ".ytp-ad-image-overlay",
    ".ytp-ad-text-overlay",
    ".ytp-ad-overlay-container",
];

/// Skip controls, tried in order.
pub const SKIP_BUTTON_SELECTORS: &[&str] = &[
    ".ytp-ad-skip-button",
    ".ytp-ad-skip-button-modern",
    ".ytp-skip-ad-button",
];

/// Player element carrying the ad marker class.
pub const AD_SHOWING_SELECTOR: &str = ".html5-video-player.ad-showing";

/// Video element inside a player that is showing an ad.
pub const AD_VIDEO_SELECTOR: &str = ".ad-showing video";

/// The player's main video element, most specific first.
pub const MAIN_VIDEO_SELECTORS: &[&str] = &["#movie_player video.html5-main-video", "video.html5-main-video", "video"];

/// Id of the player element exposing the player API.
pub const PLAYER_ELEMENT_ID: &str = "movie_player";
