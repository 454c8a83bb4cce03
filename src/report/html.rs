//! Minimal, tolerant HTML extraction for the daily reports.
//!
//! The reports are machine-generated but not uniform across generator
//! versions, so extraction scans for tag blocks case-insensitively instead of
//! relying on a full DOM: attribute order, whitespace and harmless markup
//! noise inside cells must not matter. Everything here is pure and testable
//! offline against fixture strings.

/// One `<table>` as rows of plain-text cells. Cell text is tag-stripped,
/// entity-decoded and whitespace-collapsed.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub rows: Vec<Vec<String>>,
}

/// Extract every `<table>` block in document order.
pub fn extract_tables(html: &str) -> Vec<Table> {
    let lower = html.to_ascii_lowercase();
    let mut tables = Vec::new();
    let mut at = 0;

    while let Some((_, body_start)) = tag_open(&lower, at, "table") {
        let body_end = lower[body_start..]
            .find("</table")
            .map(|i| body_start + i)
            .unwrap_or(lower.len());
        tables.push(parse_table(
            &html[body_start..body_end],
            &lower[body_start..body_end],
        ));
        at = body_end + 1;
        if at >= lower.len() {
            break;
        }
    }
    tables
}

/// Plain text of every `<tag>…</tag>` block, e.g. all `<h3>` headings.
pub fn extract_tag_texts(html: &str, tag: &str) -> Vec<String> {
    let lower = html.to_ascii_lowercase();
    let close = format!("</{tag}");
    let mut texts = Vec::new();
    let mut at = 0;

    while let Some((_, body_start)) = tag_open(&lower, at, tag) {
        let body_end = lower[body_start..]
            .find(&close)
            .map(|i| body_start + i)
            .unwrap_or(lower.len());
        texts.push(cell_text(&html[body_start..body_end]));
        at = body_end + 1;
        if at >= lower.len() {
            break;
        }
    }
    texts
}

// ---------------------------------------------------------------------------
// Block scanning
// ---------------------------------------------------------------------------

/// Find the next `<tag …>` at or after `from` in the lowercased document.
/// Returns (start of `<`, index just past the closing `>`).
fn tag_open(lower: &str, from: usize, tag: &str) -> Option<(usize, usize)> {
    let needle = format!("<{tag}");
    let mut at = from;
    while let Some(rel) = lower.get(at..)?.find(&needle) {
        let start = at + rel;
        let after = start + needle.len();
        // Must be a real tag boundary, not a prefix of a longer tag name.
        match lower.as_bytes().get(after) {
            Some(b'>') | Some(b' ') | Some(b'\t') | Some(b'\n') | Some(b'\r') | Some(b'/') => {
                let gt = lower[after..].find('>')?;
                return Some((start, after + gt + 1));
            }
            _ => at = after,
        }
    }
    None
}

fn parse_table(raw: &str, lower: &str) -> Table {
    let mut rows = Vec::new();
    let mut at = 0;

    while let Some((_, row_start)) = tag_open(lower, at, "tr") {
        let row_end = [
            lower[row_start..].find("</tr"),
            tag_open(lower, row_start, "tr").map(|(s, _)| s - row_start),
        ]
        .into_iter()
        .flatten()
        .min()
        .map(|i| row_start + i)
        .unwrap_or(lower.len());

        rows.push(parse_row(&raw[row_start..row_end], &lower[row_start..row_end]));
        // row_end may sit on the next `<tr`; do not step past it
        at = row_end.max(row_start + 1);
        if at >= lower.len() {
            break;
        }
    }
    Table { rows }
}

fn parse_row(raw: &str, lower: &str) -> Vec<String> {
    let mut cells = Vec::new();
    let mut at = 0;

    loop {
        let td = tag_open(lower, at, "td");
        let th = tag_open(lower, at, "th");
        let (_, cell_start) = match (td, th) {
            (Some(a), Some(b)) => {
                if a.0 < b.0 {
                    a
                } else {
                    b
                }
            }
            (Some(a), None) => a,
            (None, Some(b)) => b,
            (None, None) => break,
        };

        let cell_end = ["</td", "</th", "<td", "<th"]
            .iter()
            .filter_map(|m| lower[cell_start..].find(m))
            .min()
            .map(|i| cell_start + i)
            .unwrap_or(lower.len());

        cells.push(cell_text(&raw[cell_start..cell_end]));
        at = cell_end;
        if at >= lower.len() {
            break;
        }
    }
    cells
}

// ---------------------------------------------------------------------------
// Text normalisation
// ---------------------------------------------------------------------------

/// Strip residual markup, decode common entities, collapse whitespace.
fn cell_text(fragment: &str) -> String {
    let stripped = strip_tags(fragment);
    let decoded = decode_entities(&stripped);
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn strip_tags(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_tag = false;
    for c in s.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => {
                in_tag = false;
                // tag boundaries must not glue adjacent words together
                out.push(' ');
            }
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out
}

fn decode_entities(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if c != '&' {
            out.push(c);
            continue;
        }
        let rest = &s[i..];
        let end = match rest.find(';') {
            Some(e) if e <= 10 => e,
            _ => {
                out.push('&');
                continue;
            }
        };
        let entity = &rest[1..end];
        let decoded = match entity {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            "nbsp" => Some(' '),
            _ => entity
                .strip_prefix("#x")
                .or_else(|| entity.strip_prefix("#X"))
                .and_then(|h| u32::from_str_radix(h, 16).ok())
                .or_else(|| entity.strip_prefix('#').and_then(|d| d.parse().ok()))
                .and_then(char::from_u32),
        };
        match decoded {
            Some(ch) => {
                out.push(ch);
                // skip the entity body
                for _ in 0..end {
                    chars.next();
                }
            }
            None => out.push('&'),
        }
    }
    out
}
