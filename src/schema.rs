//! Column naming, type inference, and the stored schema model.
//!
//! This module owns the [`Schema`] struct (ordered, normalized column
//! definitions), the [`ColumnType`] enum mirroring the store's declared types,
//! and the inference engine that scans a raw column to decide between text,
//! integer, and real storage.
//!
//! ## Responsibilities
//!
//! - Column-name normalization to lowercase snake case (`[a-z0-9_]` only)
//! - Name collision resolution (last occurrence wins)
//! - Missing-value detection (empty and placeholder tokens)
//! - Numeric detection, zero-filling, and integer narrowing with a real
//!   fallback for values outside the `i64` range

use std::{collections::HashMap, fmt, sync::LazyLock};

use itertools::Itertools;
use log::{debug, warn};
use regex::Regex;
use serde::{Serialize, Serializer};

use crate::data::Cell;

static NAME_SEPARATORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9]+").expect("separator pattern compiles"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
    Real,
    Text,
}

impl ColumnType {
    pub fn as_sql(&self) -> &'static str {
        match self {
            ColumnType::Integer => "INTEGER",
            ColumnType::Real => "REAL",
            ColumnType::Text => "TEXT",
        }
    }

    /// Maps a declared column type back onto a [`ColumnType`] using SQLite's
    /// affinity rules.
    pub fn from_declared(declared: &str) -> Self {
        let upper = declared.to_ascii_uppercase();
        if upper.contains("INT") {
            ColumnType::Integer
        } else if upper.contains("REAL") || upper.contains("FLOA") || upper.contains("DOUB") {
            ColumnType::Real
        } else {
            ColumnType::Text
        }
    }

    pub fn is_numeric(&self) -> bool {
        !matches!(self, ColumnType::Text)
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

impl Serialize for ColumnType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_sql())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnMeta {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Schema {
    pub columns: Vec<ColumnMeta>,
}

impl Schema {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn headers(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }
}

/// A header after normalization, remembering which source column feeds it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedHeader {
    pub name: String,
    pub source_index: usize,
    pub source_name: String,
}

/// Normalizes a raw column name: trims it, treats every run of characters
/// outside ASCII letters and digits as a word break, lowercases, and joins the
/// words with single underscores.
///
/// `"School Name"`, `" school_name "` and `"SCHOOL-NAME!"` all become
/// `"school_name"`.
pub fn normalize_column_name(raw: &str) -> String {
    NAME_SEPARATORS
        .split(raw.trim())
        .filter(|word| !word.is_empty())
        .map(|word| word.to_ascii_lowercase())
        .join("_")
}

/// Normalizes every header, assigning `column_{n}` to names that normalize to
/// nothing. When several headers share a normalized name only the last one is
/// kept.
pub fn normalize_headers(headers: &[String]) -> Vec<NormalizedHeader> {
    let names = headers
        .iter()
        .enumerate()
        .map(|(idx, raw)| {
            let name = normalize_column_name(raw);
            if name.is_empty() {
                generated_column_name(idx)
            } else {
                name
            }
        })
        .collect::<Vec<_>>();

    for duplicate in names.iter().duplicates() {
        let sources = headers
            .iter()
            .zip(&names)
            .filter(|(_, name)| *name == duplicate)
            .map(|(raw, _)| format!("'{raw}'"))
            .join(", ");
        warn!("Columns {sources} all normalize to '{duplicate}'; keeping the last one");
    }

    let last_position: HashMap<&str, usize> = names
        .iter()
        .enumerate()
        .map(|(idx, name)| (name.as_str(), idx))
        .collect();

    names
        .iter()
        .enumerate()
        .filter(|(idx, name)| last_position.get(name.as_str()) == Some(idx))
        .map(|(idx, name)| NormalizedHeader {
            name: name.clone(),
            source_index: idx,
            source_name: headers[idx].clone(),
        })
        .collect()
}

fn generated_column_name(index: usize) -> String {
    format!("column_{}", index + 1)
}

pub fn is_missing_token(value: &str) -> bool {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return true;
    }
    matches!(
        trimmed.to_ascii_lowercase().as_str(),
        "na" | "n/a" | "null" | "none" | "nan" | "missing"
    )
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    Missing,
    Number { value: f64, integer: Option<i64> },
    Text,
}

fn classify(value: &str) -> Token {
    if is_missing_token(value) {
        return Token::Missing;
    }
    let trimmed = value.trim();
    if has_redundant_leading_zero(trimmed) {
        return Token::Text;
    }
    if !trimmed
        .chars()
        .all(|ch| ch.is_ascii_digit() || matches!(ch, '+' | '-' | '.' | 'e' | 'E'))
    {
        return Token::Text;
    }
    match trimmed.parse::<f64>() {
        Ok(value) if value.is_finite() => Token::Number {
            value,
            integer: integral_value(trimmed, value),
        },
        _ => Token::Text,
    }
}

fn has_redundant_leading_zero(value: &str) -> bool {
    let digits = value.trim_start_matches(['+', '-']);
    let mut chars = digits.chars();
    matches!(
        (chars.next(), chars.next()),
        (Some('0'), Some(next)) if next.is_ascii_digit()
    )
}

fn integral_value(token: &str, value: f64) -> Option<i64> {
    if let Ok(int) = token.parse::<i64>() {
        return Some(int);
    }
    // 2^63 is exactly representable, so the upper comparison is strict.
    if value.fract() == 0.0
        && value >= -9_223_372_036_854_775_808.0
        && value < 9_223_372_036_854_775_808.0
    {
        return Some(value as i64);
    }
    None
}

#[derive(Debug, Default)]
struct TypeCandidate {
    present: usize,
    numeric: usize,
    integral: usize,
    overflow: usize,
    unclassified: usize,
}

impl TypeCandidate {
    fn update(&mut self, token: &Token) {
        match token {
            Token::Missing => {}
            Token::Text => {
                self.present += 1;
                self.unclassified += 1;
            }
            Token::Number { value, integer } => {
                self.present += 1;
                self.numeric += 1;
                if value.fract() == 0.0 {
                    self.integral += 1;
                    if integer.is_none() {
                        self.overflow += 1;
                    }
                }
            }
        }
    }

    fn decide(&self) -> (ColumnType, bool) {
        if self.present == 0 || self.unclassified > 0 {
            return (ColumnType::Text, false);
        }
        if self.integral == self.numeric {
            if self.overflow == 0 {
                return (ColumnType::Integer, false);
            }
            return (ColumnType::Real, true);
        }
        (ColumnType::Real, false)
    }
}

/// The stored form of one column after inference.
#[derive(Debug, Clone, PartialEq)]
pub struct InferredColumn {
    pub column_type: ColumnType,
    pub cells: Vec<Cell>,
    /// Set when every value was integral but at least one did not fit `i64`,
    /// so the column stayed real.
    pub narrowing_fallback: bool,
}

/// What a numeric column stores for a missing value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MissingNumbers {
    #[default]
    ZeroFill,
    /// Keep the gap as null. Used for coordinate columns, where zero is a
    /// real place on the map.
    Null,
}

/// Infers the storage type of one column and converts its values.
///
/// Numeric columns have missing values replaced by zero; text columns keep
/// them as null.
pub fn infer_column<'a, I>(values: I) -> InferredColumn
where
    I: IntoIterator<Item = &'a str>,
{
    infer_column_with(values, MissingNumbers::ZeroFill)
}

/// Same as [`infer_column`] with an explicit policy for missing numbers.
pub fn infer_column_with<'a, I>(values: I, missing: MissingNumbers) -> InferredColumn
where
    I: IntoIterator<Item = &'a str>,
{
    let raw = values.into_iter().collect::<Vec<_>>();
    let tokens = raw.iter().map(|value| classify(value)).collect::<Vec<_>>();

    let mut candidate = TypeCandidate::default();
    for token in &tokens {
        candidate.update(token);
    }
    let (column_type, narrowing_fallback) = candidate.decide();
    debug!(
        "Inferred {column_type} from {} present of {} value(s)",
        candidate.present,
        tokens.len()
    );

    let cells = raw
        .iter()
        .zip(&tokens)
        .map(|(value, token)| match (column_type, token) {
            (ColumnType::Text, Token::Missing) => Cell::Null,
            (ColumnType::Text, _) => Cell::Text((*value).to_string()),
            (_, Token::Missing) if missing == MissingNumbers::Null => Cell::Null,
            (ColumnType::Integer, Token::Number { integer: Some(i), .. }) => Cell::Integer(*i),
            (ColumnType::Integer, _) => Cell::Integer(0),
            (ColumnType::Real, Token::Number { value, .. }) => Cell::Real(*value),
            (ColumnType::Real, _) => Cell::Real(0.0),
        })
        .collect();

    InferredColumn {
        column_type,
        cells,
        narrowing_fallback,
    }
}
