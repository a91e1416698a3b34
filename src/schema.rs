//! Free-text column declarations.
//!
//! Two caller-selected grammars turn the table form's text into columns:
//!
//! ```text
//! Lines:   id (pk)            Commas:  id (pk), name, created_at
//!          name
//!          email VARCHAR(255)
//! ```
//!
//! Parsing never fails. Primary-key markers and type keywords are stripped,
//! whatever remains is the column name.

use serde::{Deserialize, Serialize};

use crate::model::Column;

const PK_MARKERS: [&str; 2] = ["(pk)", "(key)"];

const TYPE_KEYWORDS: [&str; 10] = [
    "VARCHAR",
    "INT",
    "STRING",
    "TIMESTAMP",
    "DATE",
    "NUMBER",
    "DECIMAL",
    "FLOAT",
    "BOOLEAN",
    "BIGINT",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Grammar {
    /// One column per line.
    #[default]
    Lines,
    /// Comma-separated entries.
    Commas,
}

impl Grammar {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "lines" | "line" => Some(Self::Lines),
            "commas" | "comma" | "csv" => Some(Self::Commas),
            _ => None,
        }
    }

    fn entries(self, text: &str) -> std::str::Split<'_, char> {
        match self {
            Self::Lines => text.split('\n'),
            Self::Commas => text.split(','),
        }
    }

    fn separator(self) -> &'static str {
        match self {
            Self::Lines => "\n",
            Self::Commas => ", ",
        }
    }

    fn is_residual(self, c: char) -> bool {
        match self {
            Self::Lines => c == ',' || c == ';',
            Self::Commas => c == ';',
        }
    }
}

/// Parse column declarations in declaration order.
///
/// A name declared twice keeps its first position and takes the later
/// declaration's primary-key flag.
pub fn parse(text: &str, grammar: Grammar) -> Vec<Column> {
    let mut columns: Vec<Column> = Vec::new();

    for entry in grammar.entries(text) {
        let Some(column) = parse_entry(entry, grammar) else {
            continue;
        };
        match columns.iter_mut().find(|c| c.name == column.name) {
            Some(existing) => existing.is_pk = column.is_pk,
            None => columns.push(column),
        }
    }

    columns
}

/// Reconstruct clean declaration text for the table form.
pub fn render(columns: &[Column], grammar: Grammar) -> String {
    columns
        .iter()
        .map(|c| {
            if c.is_pk {
                format!("{} (pk)", c.name).trim_start().to_string()
            } else {
                c.name.clone()
            }
        })
        .collect::<Vec<_>>()
        .join(grammar.separator())
}

fn parse_entry(entry: &str, grammar: Grammar) -> Option<Column> {
    let cleaned: String = entry.chars().filter(|c| !grammar.is_residual(*c)).collect();
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        return None;
    }

    let (rest, is_pk) = strip_pk_markers(cleaned);
    let name = strip_type_keyword(&rest).trim().to_string();

    Some(Column { name, is_pk })
}

/// Remove every primary-key marker, case-insensitively.
fn strip_pk_markers(text: &str) -> (String, bool) {
    let mut out = text.to_string();
    let mut found = false;

    loop {
        // ASCII lowercasing keeps byte offsets aligned with `out`.
        let lower = out.to_ascii_lowercase();
        let hit = PK_MARKERS
            .iter()
            .filter_map(|m| lower.find(m).map(|at| (at, m.len())))
            .min_by_key(|(at, _)| *at);

        match hit {
            Some((at, len)) => {
                out.replace_range(at..at + len, " ");
                found = true;
            }
            None => break,
        }
    }

    (out, found)
}

/// Cut the text at the first type keyword that follows the name.
fn strip_type_keyword(text: &str) -> &str {
    let mut tokens = token_spans(text);
    // The first token is always part of the name.
    tokens.next();

    for (start, token) in tokens {
        if is_type_keyword(token) {
            return &text[..start];
        }
    }

    text
}

fn is_type_keyword(token: &str) -> bool {
    let (base, rest) = match token.find('(') {
        Some(at) => token.split_at(at),
        None => (token, ""),
    };
    if !rest.is_empty() && !rest.ends_with(')') {
        return false;
    }
    TYPE_KEYWORDS.iter().any(|k| k.eq_ignore_ascii_case(base))
}

/// Whitespace-separated tokens with their byte offsets.
fn token_spans(text: &str) -> impl Iterator<Item = (usize, &str)> {
    let mut spans = Vec::new();
    let mut start = None;

    for (i, c) in text.char_indices() {
        match (c.is_whitespace(), start) {
            (true, Some(s)) => {
                spans.push((s, &text[s..i]));
                start = None;
            }
            (false, None) => start = Some(i),
            _ => {}
        }
    }
    if let Some(s) = start {
        spans.push((s, &text[s..]));
    }

    spans.into_iter()
}
