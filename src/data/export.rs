use serde_json::{json, Map, Value as JsonValue};

use crate::data::column_store::{CellValue, ColumnStore};
use crate::error::GridResult;

/// Quote a CSV field if it contains a comma, quote, or newline; embedded
/// quotes are doubled.
pub fn escape_csv_field(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Render a rectangular cell range as CSV. No header row; the caller
/// prepends one if wanted.
pub fn range_to_csv(cells: &[Vec<String>]) -> String {
    let mut out = String::new();
    for row in cells {
        let escaped: Vec<String> = row.iter().map(|c| escape_csv_field(c)).collect();
        out.push_str(&escaped.join(","));
        out.push('\n');
    }
    // trailing newline is dropped so ranges concatenate cleanly
    if out.ends_with('\n') {
        out.pop();
    }
    out
}

/// Render a rectangular cell range as TSV. Tabs embedded in cells are
/// replaced with spaces.
pub fn range_to_tsv(cells: &[Vec<String>]) -> String {
    cells
        .iter()
        .map(|row| {
            row.iter()
                .map(|c| c.replace('\t', " "))
                .collect::<Vec<_>>()
                .join("\t")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Materialize the current view (display columns in order) as a string
/// matrix for the range exporters.
pub fn view_to_matrix(
    store: &ColumnStore,
    view: &[u32],
    display_columns: &[u32],
) -> GridResult<Vec<Vec<String>>> {
    let mut rows = Vec::with_capacity(view.len());
    for &row in view {
        let mut cells = Vec::with_capacity(display_columns.len());
        for &col in display_columns {
            cells.push(store.cell_text(col as usize, row as usize)?);
        }
        rows.push(cells);
    }
    Ok(rows)
}

/// Export the current view as a CSV string with a header line.
pub fn view_to_csv(
    store: &ColumnStore,
    view: &[u32],
    display_columns: &[u32],
    column_names: &[String],
) -> GridResult<String> {
    let mut out = column_names
        .iter()
        .map(|n| escape_csv_field(n))
        .collect::<Vec<_>>()
        .join(",");
    let body = range_to_csv(&view_to_matrix(store, view, display_columns)?);
    if !body.is_empty() {
        out.push('\n');
        out.push_str(&body);
    }
    Ok(out)
}

/// Export the current view as a JSON array of objects keyed by column name.
pub fn view_to_json(
    store: &ColumnStore,
    view: &[u32],
    display_columns: &[u32],
    column_names: &[String],
) -> GridResult<JsonValue> {
    let mut rows = Vec::with_capacity(view.len());
    for &row in view {
        let mut obj = Map::new();
        for (&col, name) in display_columns.iter().zip(column_names) {
            let value = match store.value_at(col as usize, row as usize)? {
                CellValue::Number(n) => json!(n),
                CellValue::Bool(b) => json!(b),
                CellValue::Text(s) => json!(s),
                CellValue::Null => JsonValue::Null,
            };
            obj.insert(name.clone(), value);
        }
        rows.push(JsonValue::Object(obj));
    }
    Ok(JsonValue::Array(rows))
}
