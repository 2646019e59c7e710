//! Picking the search-results sub-frame out of a page's iframes.

use serde::Deserialize;

use crate::error::Result;

pub const SEARCH_FRAME_NAME: &str = "searchIframe";

/// Lists every iframe on the page as a JSON array of `{id, name, src}`.
pub const LIST_FRAMES_JS: &str = r#"
    JSON.stringify(Array.from(document.querySelectorAll('iframe')).map(f => ({
        id: f.id || '',
        name: f.name || '',
        src: f.src || ''
    })))
"#;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct FrameInfo {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub src: String,
}

type FrameStrategy = fn(&FrameInfo) -> bool;

fn by_name(frame: &FrameInfo) -> bool {
    frame.name == SEARCH_FRAME_NAME
}

fn by_id(frame: &FrameInfo) -> bool {
    frame.id == SEARCH_FRAME_NAME
}

fn by_src(frame: &FrameInfo) -> bool {
    frame.src.contains("search") || frame.src.contains("place")
}

/// Frame matchers, tried in order across all frames.
pub const FRAME_STRATEGIES: &[(&str, FrameStrategy)] = &[
    ("name", by_name),
    ("id", by_id),
    ("src", by_src),
];

pub fn parse_frame_list(json: &str) -> Result<Vec<FrameInfo>> {
    Ok(serde_json::from_str(json)?)
}

/// First frame accepted by [`FRAME_STRATEGIES`] that has a loadable `src`.
pub fn locate_search_frame(frames: &[FrameInfo]) -> Option<(&'static str, &FrameInfo)> {
    FRAME_STRATEGIES.iter().find_map(|(label, strategy)| {
        frames
            .iter()
            .find(|f| !f.src.is_empty() && strategy(f))
            .map(|f| (*label, f))
    })
}
