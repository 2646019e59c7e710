//! Turns matched result rows into [`PlaceRecord`]s.
//!
//! Both the container lookup and every field lookup are ranked lists of small
//! strategies tried in order; the first hit wins and a miss leaves the field
//! empty. Nothing here touches the browser: extraction runs over an HTML
//! snapshot, so the same snapshot always yields the same records.

use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

use crate::error::Result;
use crate::record::{Field, PlaceRecord};
use crate::sanitizer::sanitize_name;
use crate::scope::parse_selector;

type AncestorStrategy = for<'a> fn(ElementRef<'a>) -> Option<ElementRef<'a>>;

/// Ways to find the row container around a matched element, in order.
pub const ANCESTOR_STRATEGIES: &[(&str, AncestorStrategy)] = &[
    ("nearest li", nearest_list_item),
    ("item/place/list div", nearest_item_div),
    ("result block", nearest_result_block),
];

pub const ADDRESS_SELECTORS: &[&str] =
    &[".LDgIH", ".addr", ".jibun", "[class*='addr']", "[class*='address']"];
pub const CATEGORY_SELECTORS: &[&str] =
    &[".KCMnt", ".category", "[class*='category']", "[class*='type']"];
pub const RATING_SELECTORS: &[&str] = &[".orXYY", ".rating", "[class*='rating']", "[class*='star']"];
pub const REVIEW_SELECTORS: &[&str] = &[".MVx6e", ".review", "[class*='review']", "[class*='count']"];
pub const PHONE_SELECTORS: &[&str] =
    &[".xlx7Q", ".phone", ".tel", "[class*='phone']", "[class*='tel']"];

fn selectors_for(field: Field) -> &'static [&'static str] {
    match field {
        Field::Address => ADDRESS_SELECTORS,
        Field::Category => CATEGORY_SELECTORS,
        Field::Rating => RATING_SELECTORS,
        Field::ReviewCount => REVIEW_SELECTORS,
        Field::Phone => PHONE_SELECTORS,
    }
}

static FIELD_PROBES: Lazy<Vec<(Field, Vec<Selector>)>> = Lazy::new(|| {
    Field::ALL
        .iter()
        .map(|&field| {
            let compiled = selectors_for(field)
                .iter()
                .filter_map(|s| Selector::parse(s).ok())
                .collect();
            (field, compiled)
        })
        .collect()
});

fn class_contains(el: &ElementRef<'_>, needles: &[&str]) -> bool {
    el.value()
        .attr("class")
        .is_some_and(|class| needles.iter().any(|n| class.contains(n)))
}

fn ancestor_elements(el: ElementRef<'_>) -> impl Iterator<Item = ElementRef<'_>> {
    el.ancestors().filter_map(ElementRef::wrap)
}

fn nearest_list_item(el: ElementRef<'_>) -> Option<ElementRef<'_>> {
    ancestor_elements(el).find(|a| a.value().name() == "li")
}

fn nearest_item_div(el: ElementRef<'_>) -> Option<ElementRef<'_>> {
    ancestor_elements(el)
        .find(|a| a.value().name() == "div" && class_contains(a, &["item", "place", "list"]))
}

fn nearest_result_block(el: ElementRef<'_>) -> Option<ElementRef<'_>> {
    ancestor_elements(el)
        .find(|a| class_contains(a, &["CHC5F", "search"]) || a.value().attr("data-id").is_some())
}

/// Collapsed text content of an element.
pub fn text_of(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

/// First ancestor found by [`ANCESTOR_STRATEGIES`].
pub fn find_container(el: ElementRef<'_>) -> Option<ElementRef<'_>> {
    ANCESTOR_STRATEGIES.iter().find_map(|(label, strategy)| {
        let found = strategy(el);
        if found.is_some() {
            debug!("container found via {}", label);
        }
        found
    })
}

/// First non-empty text among `selectors` inside `container`.
///
/// Only the first element of each selector is inspected, mirroring a
/// `querySelector` probe.
pub fn probe_field(container: ElementRef<'_>, selectors: &[Selector]) -> Option<String> {
    selectors.iter().find_map(|sel| {
        container
            .select(sel)
            .next()
            .map(text_of)
            .filter(|text| !text.is_empty())
    })
}

/// Builds a record from one matched row.
///
/// Returns `None` when the row has no text at all; such rows are skipped.
pub fn extract_record(element: ElementRef<'_>, index: usize, query: &str) -> Option<PlaceRecord> {
    let rank = index + 1;
    let raw_text = text_of(element);
    if raw_text.is_empty() {
        debug!("row {} has no text, skipping", rank);
        return None;
    }

    let name = match sanitize_name(&raw_text) {
        n if n.is_empty() => format!("장소 {rank}"),
        n => n,
    };

    let mut record = PlaceRecord {
        rank,
        name,
        search_query: query.to_string(),
        raw_text,
        ..Default::default()
    };

    if let Some(container) = find_container(element) {
        for (field, selectors) in FIELD_PROBES.iter() {
            if let Some(value) = probe_field(container, selectors) {
                *field.slot(&mut record) = value;
            }
        }
    } else {
        debug!("row {} has no recognizable container", rank);
    }

    Some(record)
}

/// Extracts up to `limit` records for `selector` from an HTML snapshot.
pub fn extract_all(html: &str, selector: &str, limit: usize, query: &str) -> Result<Vec<PlaceRecord>> {
    let selector = parse_selector(selector)?;
    let document = Html::parse_document(html);

    let mut records = Vec::new();
    for (index, element) in document.select(&selector).take(limit).enumerate() {
        match extract_record(element, index, query) {
            Some(record) => {
                debug!("{}. {}", record.rank, record.name);
                records.push(record);
            }
            None => warn!("❌ row {} skipped", index + 1),
        }
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROWS: &str = r#"
        <ul>
          <li class="UEzoS">
            <div class="CHC5F">
              <span class="TYaxT">스타벅스 강남점</span>
              <span class="KCMnt">카페</span>
            </div>
            <div class="LDgIH">서울 강남구 역삼동 123</div>
            <span class="orXYY">별점4.5</span>
            <span class="MVx6e">리뷰 1,234</span>
            <span class="xlx7Q">02-123-4567</span>
          </li>
          <li class="UEzoS">
            <div class="CHC5F"><span class="TYaxT">블루보틀 삼청</span></div>
            <div class="addr"></div>
            <div class="jibun">서울 종로구 삼청동 1</div>
          </li>
          <li class="UEzoS"><span class="TYaxT">   </span></li>
        </ul>
    "#;

    #[test]
    fn test_extracts_all_fields_from_list_item() {
        let records = extract_all(ROWS, ".TYaxT", 10, "강남 카페").unwrap();
        let first = &records[0];
        assert_eq!(first.rank, 1);
        assert_eq!(first.name, "스타벅스 강남점");
        assert_eq!(first.address, "서울 강남구 역삼동 123");
        assert_eq!(first.category, "카페");
        assert_eq!(first.rating, "별점4.5");
        assert_eq!(first.review_count, "리뷰 1,234");
        assert_eq!(first.phone, "02-123-4567");
        assert_eq!(first.search_query, "강남 카페");
    }

    #[test]
    fn test_empty_field_text_falls_through_to_next_selector() {
        let records = extract_all(ROWS, ".TYaxT", 10, "q").unwrap();
        assert_eq!(records[1].address, "서울 종로구 삼청동 1");
        assert_eq!(records[1].rating, "");
        assert_eq!(records[1].phone, "");
    }

    #[test]
    fn test_blank_rows_are_skipped_and_ranks_follow_dom_order() {
        let records = extract_all(ROWS, ".TYaxT", 10, "q").unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].rank, 1);
        assert_eq!(records[1].rank, 2);
    }

    #[test]
    fn test_limit_is_respected() {
        let records = extract_all(ROWS, ".TYaxT", 1, "q").unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn test_container_falls_back_to_item_div_then_data_id() {
        let html = r#"
            <div class="place_item"><b class="nm">국수집</b><i class="category">면요리</i></div>
            <section data-id="42"><b class="nm">만두집</b><i class="tel">031-000-0000</i></section>
        "#;
        let records = extract_all(html, ".nm", 10, "q").unwrap();
        assert_eq!(records[0].category, "면요리");
        assert_eq!(records[1].phone, "031-000-0000");
    }

    #[test]
    fn test_row_without_container_keeps_name_only() {
        let records = extract_all("<p class='nm'>외딴집</p>", ".nm", 10, "q").unwrap();
        assert_eq!(records[0].name, "외딴집");
        assert!(records[0].address.is_empty());
    }

    #[test]
    fn test_extraction_is_idempotent() {
        let a = extract_all(ROWS, "li", 10, "q").unwrap();
        let b = extract_all(ROWS, "li", 10, "q").unwrap();
        assert_eq!(a, b);
    }
}
