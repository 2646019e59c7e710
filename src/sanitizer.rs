//! Business-name isolation from concatenated list-row text.
//!
//! A search row's text runs the name straight into the address, badges and
//! button labels ("스타벅스 강남점서울 강남구 ..."). Cutting at the first
//! known noise word is a best-effort approximation, not a parser.

use once_cell::sync::Lazy;

/// Region names and UI labels that never start a business name.
pub static NOISE_KEYWORDS: Lazy<Vec<&'static str>> = Lazy::new(|| {
    vec![
        "예약", "광고", "영업", "리뷰", "서울", "부산", "대구", "인천", "광주", "대전", "울산",
        "세종", "경기", "강원", "충북", "충남", "전북", "전남", "경북", "경남", "제주",
        "네이버페이", "톡톡", "별점", "현재", "위치", "거리", "출발", "도착", "상세주소", "저장",
        "더보기",
    ]
});

const MIN_NAME_CHARS: usize = 2;
const FALLBACK_CHARS: usize = 10;
const DISPLAY_MAX_CHARS: usize = 30;

/// Byte offset of the earliest noise keyword in `raw`, if any.
fn first_noise_offset(raw: &str) -> Option<usize> {
    NOISE_KEYWORDS.iter().filter_map(|kw| raw.find(kw)).min()
}

fn take_chars(s: &str, n: usize) -> &str {
    match s.char_indices().nth(n) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Cuts `raw` at the earliest noise keyword.
///
/// When the remaining prefix has fewer than two characters the first ten
/// characters of the raw text are used instead.
pub fn sanitize_name(raw: &str) -> String {
    let cut = first_noise_offset(raw).unwrap_or(raw.len());
    let name = raw[..cut].trim();
    if name.chars().count() < MIN_NAME_CHARS {
        return take_chars(raw, FALLBACK_CHARS).trim().to_string();
    }
    name.to_string()
}

/// [`sanitize_name`] capped at thirty characters with a trailing ellipsis.
pub fn display_name(raw: &str) -> String {
    let name = sanitize_name(raw);
    if name.chars().count() > DISPLAY_MAX_CHARS {
        format!("{}...", take_chars(&name, DISPLAY_MAX_CHARS))
    } else {
        name
    }
}
