//! Block structure shared by the wiki grammars: lists, tables, paragraphs.

use std::fmt::Write;

/// Builds nested `<ul>`/`<ol>` lists from marker strings such as `*`, `**`,
/// `*#`.
///
/// Each open level holds an open `<li>`. A new item keeps the levels whose
/// markers match, closes the rest, and opens whatever is missing. Jumping
/// more than one level deeper opens intermediate levels with empty items.
#[derive(Debug, Default)]
pub(super) struct ListBuilder {
    levels: Vec<char>,
}

impl ListBuilder {
    pub(super) fn is_open(&self) -> bool {
        !self.levels.is_empty()
    }

    pub(super) fn depth(&self) -> usize {
        self.levels.len()
    }

    /// Start a new item with the given markers.
    pub(super) fn item(&mut self, markers: &str, out: &mut String) {
        let markers: Vec<char> = markers.chars().collect();
        let common = self
            .levels
            .iter()
            .zip(&markers)
            .take_while(|(a, b)| a == b)
            .count();

        if common == markers.len() && self.levels.len() >= markers.len() {
            while self.levels.len() > markers.len() {
                self.close_level(out);
            }
            out.push_str("</li>\n<li>");
            return;
        }

        while self.levels.len() > common {
            self.close_level(out);
        }
        for &marker in &markers[common..] {
            out.push_str(list_tag(marker, true));
            out.push_str("\n<li>");
            self.levels.push(marker);
        }
    }

    /// Close every open level.
    pub(super) fn finish(&mut self, out: &mut String) {
        while self.is_open() {
            self.close_level(out);
        }
    }

    fn close_level(&mut self, out: &mut String) {
        if let Some(marker) = self.levels.pop() {
            out.push_str("</li>\n");
            out.push_str(list_tag(marker, false));
        }
    }
}

fn list_tag(marker: char, open: bool) -> &'static str {
    match (marker == '#', open) {
        (true, true) => "<ol>",
        (true, false) => "</ol>",
        (false, true) => "<ul>",
        (false, false) => "</ul>",
    }
}

/// A table cell.
#[derive(Debug)]
pub(super) struct Cell {
    pub header: bool,
    pub html: String,
}

/// Accumulates table rows.
#[derive(Debug, Default)]
pub(super) struct TableBuilder {
    rows: Vec<Vec<Cell>>,
}

impl TableBuilder {
    pub(super) fn is_open(&self) -> bool {
        !self.rows.is_empty()
    }

    pub(super) fn push_row(&mut self, cells: Vec<Cell>) {
        self.rows.push(cells);
    }

    /// Append a cell to the last row, starting a row when none exists.
    pub(super) fn push_cell(&mut self, cell: Cell) {
        match self.rows.last_mut() {
            Some(row) => row.push(cell),
            None => self.rows.push(vec![cell]),
        }
    }

    /// Render and reset. Empty rows are dropped.
    pub(super) fn finish(&mut self, out: &mut String) {
        let rows = std::mem::take(&mut self.rows);
        out.push_str("<table>\n");
        for row in rows.into_iter().filter(|row| !row.is_empty()) {
            out.push_str("<tr>");
            for cell in row {
                let tag = if cell.header { "th" } else { "td" };
                write!(out, "<{tag}>{}</{tag}>", cell.html.trim()).unwrap();
            }
            out.push_str("</tr>\n");
        }
        out.push_str("</table>");
    }
}

/// Split a table row on `separator`, ignoring separators inside `[[...]]`
/// and `{{...}}`.
pub(super) fn split_cells<'a>(row: &'a str, separator: &str) -> Vec<&'a str> {
    let mut cells = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    let mut i = 0;

    while i < row.len() {
        let rest = &row[i..];
        if rest.starts_with("[[") || rest.starts_with("{{") {
            depth += 1;
            i += 2;
        } else if (rest.starts_with("]]") || rest.starts_with("}}")) && depth > 0 {
            depth -= 1;
            i += 2;
        } else if depth == 0 && rest.starts_with(separator) {
            cells.push(&row[start..i]);
            i += separator.len();
            start = i;
        } else {
            i += super::inline::char_len_at(row, i);
        }
    }
    cells.push(&row[start..]);
    cells
}

/// Wrap rendered inline content in a paragraph.
pub(super) fn paragraph(inline_html: &str, out: &mut String) {
    write!(out, "<p>{inline_html}\n</p>").unwrap();
}
