// src/core/table.rs
use serde::{Deserialize, Serialize};

/// Stand-in for missing, padded or `nan` cells.
pub const EMPTY_CELL: &str = "-";

/// Stand-in for spreadsheet-inferred headers such as `Unnamed: 3`.
pub const UNNAMED_COLUMN: &str = "Insert Column Name";

/// A rectangular grid of cell strings. Row 0 is the header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    rows: Vec<Vec<String>>,
}

impl Table {
    /// Build a table from a header and data rows, padding or truncating every
    /// data row to the header width. Cell text is taken as-is.
    pub fn new(header: Vec<String>, data: Vec<Vec<String>>) -> Self {
        let width = header.len();
        let mut rows = Vec::with_capacity(data.len() + 1);
        rows.push(header);
        for mut row in data {
            row.resize(width, EMPTY_CELL.to_string());
            rows.push(row);
        }
        Self { rows }
    }

    /// A header with `empty_rows` blank data rows, for fill-in forms.
    pub fn blank_form(header: &[&str], empty_rows: usize) -> Self {
        let header: Vec<String> = header.iter().map(|h| h.to_string()).collect();
        let data = vec![vec![String::new(); header.len()]; empty_rows];
        Self { rows: std::iter::once(header).chain(data).collect() }
    }

    pub fn header(&self) -> &[String] {
        &self.rows[0]
    }

    pub fn data_rows(&self) -> &[Vec<String>] {
        &self.rows[1..]
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn column_count(&self) -> usize {
        self.rows[0].len()
    }

    /// Drop trailing columns whose data cells are all [`EMPTY_CELL`].
    /// At least one column is always kept.
    pub fn prune_empty_trailing_columns(&mut self) {
        if self.rows.len() < 2 {
            return;
        }
        let mut width = self.column_count();
        while width > 1
            && self.rows[1..]
                .iter()
                .all(|row| row[width - 1] == EMPTY_CELL)
        {
            width -= 1;
        }
        for row in &mut self.rows {
            row.truncate(width);
        }
    }

    /// Canonical pipe-table markdown: header, `---` separator, data rows.
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        let line = |cells: &[String]| format!("| {} |\n", cells.join(" | "));
        out.push_str(&line(self.header()));
        let sep: Vec<String> = vec!["---".to_string(); self.column_count()];
        out.push_str(&line(&sep));
        for row in self.data_rows() {
            out.push_str(&line(row));
        }
        out
    }
}

/// A line takes part in a table run when it has at least two `|`.
pub fn is_table_line(line: &str) -> bool {
    line.bytes().filter(|&b| b == b'|').count() >= 2
}

/// Only `|`, `-`, `:` and whitespace, with at least one `-`.
fn is_separator_shaped(line: &str) -> bool {
    line.chars()
        .all(|c| matches!(c, '|' | '-' | ':') || c.is_whitespace())
        && line.contains('-')
}

/// Header/body separator such as `| --- | :---: |`. Right after the header
/// any dash row counts (`|-|-|`); further down a row needs `--`, so a row of
/// `-` placeholders stays data.
fn is_separator_row(line: &str, position: usize) -> bool {
    is_separator_shaped(line) && (position == 1 || line.contains("--"))
}

fn split_cells(line: &str) -> Vec<String> {
    let line = line.trim();
    let line = line.strip_prefix('|').unwrap_or(line);
    let line = line.strip_suffix('|').unwrap_or(line);
    line.split('|').map(normalize_cell).collect()
}

fn normalize_cell(raw: &str) -> String {
    let cell = raw.trim();
    if cell.eq_ignore_ascii_case("nan") {
        EMPTY_CELL.to_string()
    } else if cell.starts_with("Unnamed") {
        UNNAMED_COLUMN.to_string()
    } else {
        cell.to_string()
    }
}

/// Parse a run of pipe-delimited lines into a [`Table`].
///
/// Returns `None` when fewer than two rows survive separator stripping; the
/// caller then renders the lines as plain paragraphs.
pub fn parse_table<S: AsRef<str>>(lines: &[S]) -> Option<Table> {
    let mut rows = lines
        .iter()
        .map(|l| l.as_ref())
        .filter(|l| !l.trim().is_empty())
        .enumerate()
        .filter(|(i, l)| !is_separator_row(l, *i))
        .map(|(_, l)| split_cells(l));

    let header = rows.next()?;
    let data: Vec<Vec<String>> = rows.collect();
    if data.is_empty() {
        return None;
    }
    Some(Table::new(header, data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn parses_simple_table() {
        let t = parse_table(&["| A | B |", "| --- | --- |", "| x | y |"]).unwrap();
        assert_eq!(t.header(), ["A", "B"]);
        assert_eq!(t.data_rows(), [vec!["x".to_string(), "y".to_string()]]);
    }

    #[test]
    fn short_row_is_padded() {
        let t = parse_table(&["| A | B |", "|---|---|", "| x |"]).unwrap();
        assert_eq!(t.data_rows()[0], vec!["x", EMPTY_CELL]);
    }

    #[test]
    fn long_row_is_truncated() {
        let t = parse_table(&["| A | B |", "| x | y | z |"]).unwrap();
        assert_eq!(t.data_rows()[0], vec!["x", "y"]);
    }

    #[test]
    fn nan_cells_become_placeholder() {
        let t = parse_table(&["| A | B |", "| NaN | nan |", "| nAn | ok |"]).unwrap();
        assert_eq!(t.data_rows()[0], vec![EMPTY_CELL, EMPTY_CELL]);
        assert_eq!(t.data_rows()[1], vec![EMPTY_CELL, "ok"]);
    }

    #[test]
    fn unnamed_headers_get_label() {
        let t = parse_table(&["| Name | Unnamed: 1 |", "| a | b |"]).unwrap();
        assert_eq!(t.header(), ["Name", UNNAMED_COLUMN]);
    }

    #[test]
    fn header_only_is_not_a_table() {
        assert!(parse_table(&["| A | B |"]).is_none());
        assert!(parse_table(&["| A | B |", "| --- | --- |"]).is_none());
        assert!(parse_table::<&str>(&[]).is_none());
    }

    #[test]
    fn placeholder_row_is_not_a_separator() {
        let t = parse_table(&["| A | B |", "| --- | --- |", "| - | - |"]).unwrap();
        assert_eq!(t.data_rows(), [vec![EMPTY_CELL.to_string(), EMPTY_CELL.to_string()]]);
    }

    #[test]
    fn single_dash_separator_after_header() {
        let t = parse_table(&["| A | B |", "|-|-|", "| x | y |"]).unwrap();
        assert_eq!(t.rows(), [vec!["A", "B"], vec!["x", "y"]]);

        let t = parse_table(&["| A | B |", "| :-: | -: |", "| x | y |"]).unwrap();
        assert_eq!(t.data_rows().len(), 1);
    }

    #[test]
    fn prunes_trailing_placeholder_columns() {
        let mut t = parse_table(&["| A | B | C |", "| x | nan | |", "| y | - |"]).unwrap();
        // "C" holds "" then a padded "-", so it is not all-placeholder.
        t.prune_empty_trailing_columns();
        assert_eq!(t.column_count(), 3);

        let mut t = parse_table(&["| A | B | C |", "| x | nan |", "| y |"]).unwrap();
        t.prune_empty_trailing_columns();
        assert_eq!(t.header(), ["A"]);
        assert_eq!(t.data_rows()[1], vec!["y"]);
    }

    #[test]
    fn prune_keeps_one_column() {
        let mut t = parse_table(&["| A | B |", "| --- | --- |", "| - | - |"]).unwrap();
        t.prune_empty_trailing_columns();
        assert_eq!(t.column_count(), 1);
    }

    #[test]
    fn is_table_line_needs_two_pipes() {
        assert!(is_table_line("| a |"));
        assert!(!is_table_line("a | b"));
        assert!(!is_table_line("plain"));
    }

    fn cell() -> impl Strategy<Value = String> {
        "[A-Za-z0-9][A-Za-z0-9 ]{0,8}[A-Za-z0-9]|[A-Za-z0-9]"
            .prop_filter("nan/Unnamed are normalized", |s| {
                !s.eq_ignore_ascii_case("nan") && !s.starts_with("Unnamed")
            })
    }

    proptest! {
        #[test]
        fn prop_rows_match_header_width(
            header in prop::collection::vec(cell(), 1..6),
            data in prop::collection::vec(prop::collection::vec(cell(), 0..9), 1..6),
        ) {
            let mut lines = vec![format!("| {} |", header.join(" | "))];
            lines.push("| --- |".to_string());
            for row in &data {
                lines.push(format!("|{}|", row.iter().map(|c| format!(" {c} ")).collect::<Vec<_>>().join("|")));
            }
            let table = parse_table(&lines).unwrap();
            for row in table.rows() {
                prop_assert_eq!(row.len(), header.len());
            }
        }

        #[test]
        fn prop_single_line_is_never_a_table(line in "\\|[a-z |]{0,20}\\|") {
            prop_assert!(parse_table(&[line]).is_none());
        }

        #[test]
        fn prop_markdown_round_trip(
            header in prop::collection::vec(cell(), 1..5),
            data in prop::collection::vec(prop::collection::vec(cell(), 1..5), 1..5),
        ) {
            let table = Table::new(header, data);
            let markdown = table.to_markdown();
            let lines: Vec<&str> = markdown.lines().collect();
            let reparsed = parse_table(&lines).unwrap();
            prop_assert_eq!(&reparsed, &table);
            let again = reparsed.to_markdown();
            prop_assert_eq!(parse_table(&again.lines().collect::<Vec<_>>()).unwrap(), reparsed);
        }
    }
}
