use std::path::Path;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use uuid::Uuid;

use crate::model::ScheduleItem;

/// Try parsing a timestamp string with several common formats.
fn parse_start(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    for fmt in &[
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M",
        "%d/%m/%Y %H:%M",
        "%d-%m-%Y %H:%M",
    ] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.and_utc());
        }
    }
    // Date-only columns land at midnight.
    for fmt in &["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y"] {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return d.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
        }
    }
    None
}

/// Detect delimiter by checking the first line for common separators.
fn detect_delimiter(first_line: &str) -> u8 {
    let semicolons = first_line.matches(';').count();
    let commas = first_line.matches(',').count();
    let tabs = first_line.matches('\t').count();

    if semicolons >= commas && semicolons >= tabs {
        b';'
    } else if tabs >= commas {
        b'\t'
    } else {
        b','
    }
}

/// Normalize a header string to a canonical column key.
fn normalize_header(h: &str) -> String {
    h.trim().to_lowercase().replace([' ', '-', '_'], "")
}

/// Map a normalized header to our column index:
///   0 = label, 1 = start, 2 = duration, 3 = end, 4 = product, 5 = resource
fn header_to_col(normalized: &str) -> Option<usize> {
    match normalized {
        "label" | "task" | "name" | "operation" | "op" | "activity" => Some(0),

        "start" | "starttime" | "startdate" | "begin" | "from" => Some(1),

        "duration" | "durationminutes" | "minutes" | "mins" | "length" => Some(2),

        "end" | "endtime" | "enddate" | "finish" | "to" => Some(3),

        "product" | "productkey" | "order" | "ordernumber" | "job" => Some(4),

        "resource" | "resourcekey" | "workcenter" | "machine" | "line" => Some(5),

        _ => None,
    }
}

/// Import schedule items from a CSV file.
///
/// Auto-detects delimiter (comma, semicolon, tab) and matches column headers
/// flexibly (e.g. "Start Time", "Work Center"). Duration may come from a
/// minutes column or be derived from an end timestamp. Rows with an invalid
/// start keep the item as a zero-duration marker instead of dropping it.
/// Returns `(items, skipped_count)` on success.
pub fn import_csv(path: &Path) -> Result<(Vec<ScheduleItem>, usize), String> {
    let content =
        std::fs::read_to_string(path).map_err(|e| format!("Failed to read file: {}", e))?;
    let first_line = content.lines().next().unwrap_or("");
    let delimiter = detect_delimiter(first_line);

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| format!("Failed to read CSV headers: {}", e))?
        .clone();
    let col_map: Vec<Option<usize>> = headers
        .iter()
        .map(|h| header_to_col(&normalize_header(h)))
        .collect();

    let has_label = col_map.iter().any(|c| *c == Some(0));
    let has_start = col_map.iter().any(|c| *c == Some(1));
    if !has_label || !has_start {
        let found: Vec<&str> = headers.iter().collect();
        return Err(format!(
            "CSV is missing required columns. Found headers: {:?}. \
             Need columns for: label, start time.",
            found
        ));
    }

    let mut items: Vec<ScheduleItem> = Vec::new();
    let mut skipped = 0usize;

    for (i, result) in reader.records().enumerate() {
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                eprintln!("Skipping CSV row {}: {}", i + 2, e);
                skipped += 1;
                continue;
            }
        };

        let mut fields: [Option<String>; 6] = Default::default();
        for (col_idx, field) in record.iter().enumerate() {
            if let Some(Some(target)) = col_map.get(col_idx) {
                fields[*target] = Some(field.trim().to_string());
            }
        }
        let [label, start, duration, end, product, resource] = fields;

        let label = match label {
            Some(l) if !l.is_empty() => l,
            _ => {
                skipped += 1;
                continue;
            }
        };

        let start_time = start.as_deref().and_then(parse_start);
        if start_time.is_none() {
            eprintln!(
                "Row {}: invalid start '{}', keeping '{}' as a zero-duration marker",
                i + 2,
                start.as_deref().unwrap_or(""),
                label
            );
        }

        let duration_minutes = duration
            .as_deref()
            .and_then(|d| d.parse::<i64>().ok())
            .or_else(|| {
                let end_time = end.as_deref().and_then(parse_start)?;
                Some((end_time - start_time?).num_minutes())
            })
            .unwrap_or(0);

        let mut item = ScheduleItem {
            id: Uuid::new_v4(),
            product_key: product.filter(|s| !s.is_empty()),
            resource_key: resource.filter(|s| !s.is_empty()),
            label,
            start_time,
            duration_minutes,
            resource_id: None,
            tool_id: None,
        };
        if start_time.is_none() {
            item.duration_minutes = 0;
        }
        items.push(item);
    }

    if items.is_empty() && skipped > 0 {
        return Err(format!("No valid items found in CSV ({} rows skipped)", skipped));
    }
    if items.is_empty() {
        return Err("CSV file is empty or has no data rows".to_string());
    }

    Ok((items, skipped))
}
