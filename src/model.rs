/// Shared data types for the flood mapping service.
///
/// These types cross module boundaries: date ranges flow from the HTTP
/// layer into imagery queries, messages and layer kinds flow from the
/// pipeline into the map presenter.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Date format used by the date pickers and the platform date filters.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

// ---------------------------------------------------------------------------
// Date ranges
// ---------------------------------------------------------------------------

/// Calendar date interval used to filter imagery.
///
/// Matches the platform's `filterDate` convention: `start` is inclusive
/// and `end` is exclusive, both taken at 00:00 UTC. A one-day window is
/// therefore `2024-01-23 .. 2024-01-24`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// Parses two `YYYY-MM-DD` strings into a range.
    pub fn parse(start: &str, end: &str) -> Result<Self, chrono::ParseError> {
        Ok(Self {
            start: NaiveDate::parse_from_str(start.trim(), DATE_FORMAT)?,
            end: NaiveDate::parse_from_str(end.trim(), DATE_FORMAT)?,
        })
    }

    /// True when an acquisition timestamp falls inside the range.
    pub fn contains(&self, acquired: DateTime<Utc>) -> bool {
        let day = acquired.date_naive();
        self.start <= day && day < self.end
    }

    /// A range whose end is not after its start can never match a scene.
    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    pub fn start_str(&self) -> String {
        self.start.format(DATE_FORMAT).to_string()
    }

    pub fn end_str(&self) -> String {
        self.end.format(DATE_FORMAT).to_string()
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {}", self.start_str(), self.end_str())
    }
}

// ---------------------------------------------------------------------------
// User-facing messages
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageLevel {
    Error,
    Warning,
}

/// A message shown in the page banner after a render pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub level: MessageLevel,
    pub text: String,
}

impl Message {
    pub fn error(text: impl Into<String>) -> Self {
        Self { level: MessageLevel::Error, text: text.into() }
    }

    pub fn warning(text: impl Into<String>) -> Self {
        Self { level: MessageLevel::Warning, text: text.into() }
    }
}

// ---------------------------------------------------------------------------
// Map layers
// ---------------------------------------------------------------------------

/// The layers a render pass can produce, in presentation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerKind {
    Aoi,
    PreFloodRgb,
    PostFloodRgb,
    PermanentWater,
    FloodExtent,
}

impl LayerKind {
    /// Title shown in the layer control.
    pub fn title(&self) -> &'static str {
        match self {
            LayerKind::Aoi => "AOI",
            LayerKind::PreFloodRgb => "Pre-flood RGB",
            LayerKind::PostFloodRgb => "Post-flood RGB",
            LayerKind::PermanentWater => "Permanent Water",
            LayerKind::FloodExtent => "Flood Extent",
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
