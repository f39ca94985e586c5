use common::store::ResultSet;
use serde_json::Value;

/// widest a cell may render before truncation
const MAX_COLUMN_WIDTH: usize = 32;

fn truncate_value(value: &str, max_width: usize) -> String {
    if value.chars().count() <= max_width {
        value.to_string()
    } else {
        let take = max_width.saturating_sub(3);
        format!("{}...", value.chars().take(take).collect::<String>())
    }
}

fn cell_text(value: &Value) -> String {
    let text = match value {
        Value::Null => "NULL".to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    truncate_value(&text.replace('\n', " "), MAX_COLUMN_WIDTH)
}

/// aligned text table of the first `max_rows` rows
pub fn render_table(result: &ResultSet, max_rows: usize) -> String {
    if result.columns.is_empty() {
        return "(no columns)".to_string();
    }

    let headers: Vec<String> = result
        .columns
        .iter()
        .map(|c| truncate_value(c, MAX_COLUMN_WIDTH))
        .collect();
    let rows: Vec<Vec<String>> = result
        .rows
        .iter()
        .take(max_rows)
        .map(|row| row.iter().map(cell_text).collect())
        .collect();

    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in &rows {
        for (idx, cell) in row.iter().enumerate() {
            if let Some(width) = widths.get_mut(idx) {
                *width = (*width).max(cell.chars().count());
            }
        }
    }

    let format_line = |cells: &[String]| -> String {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
            .collect::<Vec<_>>()
            .join(" | ")
            .trim_end()
            .to_string()
    };

    let mut lines = Vec::with_capacity(rows.len() + 3);
    lines.push(format_line(&headers));
    lines.push(
        widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("-+-"),
    );
    for row in &rows {
        lines.push(format_line(row));
    }

    let shown = rows.len();
    let total = result.len();
    if shown < total {
        lines.push(format!("({} of {} rows)", shown, total));
    } else {
        lines.push(format!("({} row{})", total, if total == 1 { "" } else { "s" }));
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn result() -> ResultSet {
        ResultSet {
            columns: vec!["id".into(), "status".into()],
            rows: vec![
                vec![json!(1), json!("Unknown")],
                vec![json!(2), Value::Null],
            ],
        }
    }

    #[test]
    fn test_render_aligned_table() {
        let rendered = render_table(&result(), 10);
        let lines: Vec<&str> = rendered.lines().collect();

        assert_eq!(lines[0], "id | status");
        assert_eq!(lines[1], "---+--------");
        assert_eq!(lines[2], "1  | Unknown");
        assert_eq!(lines[3], "2  | NULL");
        assert_eq!(lines[4], "(2 rows)");
    }

    #[test]
    fn test_render_caps_rows() {
        let rendered = render_table(&result(), 1);
        assert!(rendered.ends_with("(1 of 2 rows)"));
        assert!(!rendered.contains("NULL"));
    }

    #[test]
    fn test_render_empty_result_keeps_header() {
        let empty = ResultSet {
            columns: vec!["id".into()],
            rows: vec![],
        };
        let rendered = render_table(&empty, 10);
        assert!(rendered.starts_with("id"));
        assert!(rendered.ends_with("(0 rows)"));
    }

    #[test]
    fn test_long_values_truncated() {
        let long = "x".repeat(40);
        let cell = cell_text(&json!(long));
        assert_eq!(cell.chars().count(), MAX_COLUMN_WIDTH);
        assert!(cell.ends_with("..."));
    }
}
