//! Now-playing display formatting for the control plane's UI.
//!
//! Builds the one/two/three-line display records shown on zone screens and
//! in the control plane's remotes from the track description the streaming
//! host attaches to play and preload commands.

use serde::{Deserialize, Serialize};

use crate::messages::TrackInfo;

/// Single-line display rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OneLine {
    pub line1: String,
}

/// Two-line display rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TwoLine {
    pub line1: String,
    pub line2: String,
}

/// Three-line display rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreeLine {
    pub line1: String,
    pub line2: String,
    pub line3: String,
}

/// Display metadata attached to a slot play request.
///
/// Line contents depend on what the host supplied: music tracks render as
/// name/artists/album, podcast episodes as name/show, and payloads without
/// a track name fall back to "Unknown".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NowPlayingDisplay {
    pub is_seek_allowed: bool,
    pub is_pause_allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub one_line: OneLine,
    pub two_line: TwoLine,
    pub three_line: ThreeLine,
}

impl NowPlayingDisplay {
    /// Builds display metadata from a host track description.
    ///
    /// `artwork_base_url` resolves bare cover-image ids; covers that are
    /// already absolute URLs pass through unchanged. Without a base URL,
    /// bare ids produce no image rather than a broken link.
    #[must_use]
    pub fn from_track(info: &TrackInfo, artwork_base_url: Option<&str>) -> Self {
        let image_url = info
            .covers
            .as_deref()
            .and_then(|covers| covers.first())
            .and_then(|cover| resolve_cover(cover, artwork_base_url));

        let (one_line, two_line, three_line) = match info.name.as_deref() {
            Some(name) if info.album_name.is_some() || info.show_name.is_none() => {
                let artists = info.artists.as_deref().unwrap_or_default();
                (
                    OneLine {
                        line1: format!("{} - {}", name, artists.join("/")),
                    },
                    TwoLine {
                        line1: name.to_string(),
                        line2: artists.join(" / "),
                    },
                    ThreeLine {
                        line1: name.to_string(),
                        line2: artists.join(" / "),
                        line3: info.album_name.clone().unwrap_or_default(),
                    },
                )
            }
            Some(name) => {
                // show_name is present here: album-less episode rendering.
                let show = info.show_name.as_deref().unwrap_or_default();
                (
                    OneLine {
                        line1: format!("{name} - {show}"),
                    },
                    TwoLine {
                        line1: name.to_string(),
                        line2: show.to_string(),
                    },
                    ThreeLine {
                        line1: name.to_string(),
                        line2: show.to_string(),
                        line3: String::new(),
                    },
                )
            }
            None => (
                OneLine {
                    line1: "Unknown".to_string(),
                },
                TwoLine {
                    line1: "Unknown".to_string(),
                    line2: String::new(),
                },
                ThreeLine {
                    line1: "Unknown".to_string(),
                    line2: String::new(),
                    line3: String::new(),
                },
            ),
        };

        Self {
            is_seek_allowed: true,
            is_pause_allowed: true,
            image_url,
            one_line,
            two_line,
            three_line,
        }
    }
}

fn resolve_cover(cover: &str, artwork_base_url: Option<&str>) -> Option<String> {
    if cover.starts_with("http://") || cover.starts_with("https://") {
        return Some(cover.to_string());
    }
    artwork_base_url.map(|base| format!("{}/{}", base.trim_end_matches('/'), cover))
}
