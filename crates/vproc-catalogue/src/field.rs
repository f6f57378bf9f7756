//! Updatable catalogue fields.

use std::fmt;
use std::str::FromStr;

use crate::error::CatalogueError;

/// Columns of `videos` that may be changed after insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoField {
    LanguageId,
    Quality,
    Name,
    VideoPath,
}

impl VideoField {
    /// Column name in the `videos` table.
    pub fn column(&self) -> &'static str {
        match self {
            VideoField::LanguageId => "language_id",
            VideoField::Quality => "quality",
            VideoField::Name => "name",
            VideoField::VideoPath => "video_path",
        }
    }

    fn accepts(&self, value: &FieldValue) -> bool {
        match self {
            VideoField::LanguageId | VideoField::Quality => matches!(value, FieldValue::Int(_)),
            VideoField::Name | VideoField::VideoPath => matches!(value, FieldValue::Text(_)),
        }
    }

    /// Reject values whose type does not match the column.
    pub fn check(&self, value: &FieldValue) -> Result<(), CatalogueError> {
        if self.accepts(value) {
            Ok(())
        } else {
            Err(CatalogueError::invalid_field(format!(
                "{} does not accept {}",
                self.column(),
                value
            )))
        }
    }
}

impl FromStr for VideoField {
    type Err = CatalogueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "language_id" => Ok(VideoField::LanguageId),
            "quality" => Ok(VideoField::Quality),
            "name" => Ok(VideoField::Name),
            "video_path" => Ok(VideoField::VideoPath),
            other => Err(CatalogueError::invalid_field(other)),
        }
    }
}

impl fmt::Display for VideoField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

/// New value for an updatable field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Int(i32),
    Text(String),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Int(v) => write!(f, "integer {}", v),
            FieldValue::Text(v) => write!(f, "text {:?}", v),
        }
    }
}

impl From<i32> for FieldValue {
    fn from(v: i32) -> Self {
        FieldValue::Int(v)
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::Text(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Text(v.to_string())
    }
}
