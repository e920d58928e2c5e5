//! Card records, the color vocabulary, and the sheet column map.
//!
//! Rows come back from the store as loose name→value mappings; everything
//! downstream works on [`CardRecord`] values built by an explicit,
//! validated mapping step so unmappable rows are rejected at the edge.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Header name of the card name column.
pub const COL_CARD_NAME: &str = "Card Name";
/// Header name of the color column.
pub const COL_COLOR: &str = "Color";
/// Header name of the reservation column.
pub const COL_RESERVED: &str = "Reserved";

/// Columns every usable sheet must carry.
pub const REQUIRED_COLUMNS: [&str; 3] = [COL_CARD_NAME, COL_COLOR, COL_RESERVED];

/// The closed color vocabulary.
///
/// Categories outside this set are rejected at the HTTP boundary before
/// any service call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    /// White.
    White,
    /// Blue.
    Blue,
    /// Black.
    Black,
    /// Red.
    Red,
    /// Green.
    Green,
}

/// All valid colors, in WUBRG order.
pub const ALL_COLORS: [Color; 5] = [
    Color::White,
    Color::Blue,
    Color::Black,
    Color::Red,
    Color::Green,
];

impl Color {
    /// Returns the lowercase name of the color.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::White => "white",
            Self::Blue => "blue",
            Self::Black => "black",
            Self::Red => "red",
            Self::Green => "green",
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Color {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "white" => Ok(Self::White),
            "blue" => Ok(Self::Blue),
            "black" => Ok(Self::Black),
            "red" => Ok(Self::Red),
            "green" => Ok(Self::Green),
            other => Err(Error::InvalidInput(format!(
                "invalid color '{other}'; valid colors are: white, blue, black, red, green"
            ))),
        }
    }
}

/// One row of the external sheet, after the validated mapping step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardRecord {
    /// Display name of the card.
    pub name: String,
    /// Raw color value as stored in the sheet (compared case-insensitively).
    pub color: String,
    /// The holder recorded in the reservation column, if any.
    pub reserved_by: Option<String>,
}

impl CardRecord {
    /// Builds a record from a raw row mapping.
    ///
    /// Returns `None` when the row has no usable name; a blank reservation
    /// cell maps to `None` (unreserved).
    #[must_use]
    pub fn from_row(row: &HashMap<String, String>) -> Option<Self> {
        let name = row.get(COL_CARD_NAME).map(|v| v.trim()).unwrap_or_default();
        if name.is_empty() {
            return None;
        }
        let color = row.get(COL_COLOR).cloned().unwrap_or_default();
        let reserved_by = row
            .get(COL_RESERVED)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .map(str::to_string);
        Some(Self {
            name: name.to_string(),
            color,
            reserved_by,
        })
    }

    /// Whether the record is held by anyone.
    #[must_use]
    pub fn is_reserved(&self) -> bool {
        self.holder().is_some()
    }

    /// The trimmed holder identifier, if the record is held.
    #[must_use]
    pub fn holder(&self) -> Option<&str> {
        self.reserved_by
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }

    /// Whether the record is held by the given user (case-insensitive).
    #[must_use]
    pub fn is_held_by(&self, user: &str) -> bool {
        self.holder()
            .is_some_and(|holder| holder.eq_ignore_ascii_case(user.trim()))
    }

    /// Whether the record's color matches the given color (case-insensitive).
    #[must_use]
    pub fn color_matches(&self, color: Color) -> bool {
        self.color.trim().eq_ignore_ascii_case(color.as_str())
    }
}

/// Mapping from header names to their 1-based column positions.
///
/// Rebuilt from the header row on every store read; construction fails
/// unless every required column is present.
#[derive(Debug, Clone)]
pub struct ColumnMap {
    columns: HashMap<String, u32>,
    reserved: u32,
}

impl ColumnMap {
    /// Builds the map from an ordered header row.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedSheet`] listing any required columns that
    /// are missing from the headers.
    pub fn from_headers(headers: &[String]) -> Result<Self> {
        let mut columns = HashMap::with_capacity(headers.len());
        for (index, header) in headers.iter().enumerate() {
            let position = u32::try_from(index).unwrap_or(u32::MAX).saturating_add(1);
            columns.entry(header.trim().to_string()).or_insert(position);
        }

        let missing: Vec<String> = REQUIRED_COLUMNS
            .iter()
            .filter(|col| !columns.contains_key(**col))
            .map(|col| (*col).to_string())
            .collect();
        if !missing.is_empty() {
            return Err(Error::MalformedSheet { missing });
        }

        // Presence checked above.
        let reserved = columns[COL_RESERVED];
        Ok(Self { columns, reserved })
    }

    /// The 1-based position of the given column, if present.
    #[must_use]
    pub fn position(&self, column: &str) -> Option<u32> {
        self.columns.get(column).copied()
    }

    /// The 1-based position of the reservation column.
    #[must_use]
    pub fn reserved_column(&self) -> u32 {
        self.reserved
    }
}
