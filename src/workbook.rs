//! Excel export: every row, one sheet per keyword, and a summary sheet.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use rust_xlsxwriter::{Workbook, Worksheet};
use tracing::info;

use crate::error::Result;
use crate::processor::{summarize, CSV_HEADER};
use crate::record::PlaceRecord;

pub const ALL_ROWS_SHEET: &str = "전체_데이터";
pub const SUMMARY_SHEET: &str = "요약_통계";

const SUMMARY_HEADER: [&str; 5] = ["search_keyword", "total_places", "avg_rating", "avg_reviews", "categories"];
const SHEET_NAME_CHARS: usize = 30;

/// Sheet name for `keyword`: forbidden characters replaced, cut to 30
/// characters, and suffixed when it collides with a name in `taken`.
pub fn sheet_name(keyword: &str, taken: &mut HashSet<String>) -> String {
    let cleaned: String = keyword
        .chars()
        .map(|c| if matches!(c, '[' | ']' | ':' | '*' | '?' | '/' | '\\') { '_' } else { c })
        .collect();
    let cleaned = cleaned.trim_matches('\'').trim();
    let base: String = if cleaned.is_empty() {
        "키워드".to_string()
    } else {
        cleaned.chars().take(SHEET_NAME_CHARS).collect()
    };

    let mut name = base.clone();
    let mut n = 2;
    while taken.contains(&name.to_lowercase()) {
        let stem: String = base.chars().take(SHEET_NAME_CHARS - 4).collect();
        name = format!("{stem}_{n}");
        n += 1;
    }
    taken.insert(name.to_lowercase());
    name
}

fn write_header(sheet: &mut Worksheet, header: &[&str]) -> Result<()> {
    for (col, title) in header.iter().enumerate() {
        sheet.write_string(0, col as u16, *title)?;
    }
    Ok(())
}

fn write_text_or_number(sheet: &mut Worksheet, row: u32, col: u16, value: &str) -> Result<()> {
    match value.parse::<f64>() {
        Ok(n) => sheet.write_number(row, col, n)?,
        Err(_) => sheet.write_string(row, col, value)?,
    };
    Ok(())
}

fn write_records<'a>(
    sheet: &mut Worksheet,
    rows: impl Iterator<Item = (&'a str, &'a PlaceRecord)>,
) -> Result<()> {
    write_header(sheet, &CSV_HEADER)?;
    for (i, (keyword, record)) in rows.enumerate() {
        let row = i as u32 + 1;
        sheet.write_string(row, 0, keyword)?;
        sheet.write_number(row, 1, record.rank as f64)?;
        sheet.write_string(row, 2, &record.name)?;
        sheet.write_string(row, 3, &record.address)?;
        sheet.write_string(row, 4, &record.category)?;
        write_text_or_number(sheet, row, 5, &record.rating)?;
        write_text_or_number(sheet, row, 6, &record.review_count)?;
        sheet.write_string(row, 7, &record.phone)?;
        sheet.write_string(row, 8, record.search_location.as_deref().unwrap_or_default())?;
    }
    Ok(())
}

/// Lays out the workbook without saving it.
pub fn build_workbook(results: &BTreeMap<String, Vec<PlaceRecord>>) -> Result<Workbook> {
    let mut workbook = Workbook::new();
    let mut taken: HashSet<String> = [ALL_ROWS_SHEET, SUMMARY_SHEET]
        .iter()
        .map(|s| s.to_lowercase())
        .collect();

    let all_rows = results
        .iter()
        .flat_map(|(keyword, records)| records.iter().map(move |r| (keyword.as_str(), r)));
    write_records(workbook.add_worksheet().set_name(ALL_ROWS_SHEET)?, all_rows)?;

    for (keyword, records) in results {
        let name = sheet_name(keyword, &mut taken);
        let sheet = workbook.add_worksheet().set_name(&name)?;
        write_records(sheet, records.iter().map(|r| (keyword.as_str(), r)))?;
    }

    if results.values().any(|records| !records.is_empty()) {
        let sheet = workbook.add_worksheet().set_name(SUMMARY_SHEET)?;
        write_header(sheet, &SUMMARY_HEADER)?;
        for (i, summary) in summarize(results).iter().enumerate() {
            let row = i as u32 + 1;
            sheet.write_string(row, 0, &summary.keyword)?;
            sheet.write_number(row, 1, summary.total_places as f64)?;
            if let Some(rating) = summary.avg_rating {
                sheet.write_number(row, 2, rating)?;
            }
            if let Some(reviews) = summary.avg_reviews {
                sheet.write_number(row, 3, reviews)?;
            }
            sheet.write_string(row, 4, summary.categories.join(", "))?;
        }
    }

    Ok(workbook)
}

pub fn write_xlsx(path: &Path, results: &BTreeMap<String, Vec<PlaceRecord>>) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let mut workbook = build_workbook(results)?;
    workbook.save(path)?;
    info!("📊 wrote {} keyword sheets to {}", results.len(), path.display());
    Ok(())
}
