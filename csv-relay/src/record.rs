use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::csv::{Header, Row};
use crate::error::RelayError;

/// Synthetic field holding the wall-clock time the row was processed.
/// Always the first field of the emitted object.
pub const DATE_STAMP_FIELD: &str = "functionDateStamp";

/// One row mapped against the header: ordered name/value pairs.
///
/// Serializes as a JSON object with the fields in insertion order and
/// every value a string. Upstream producers of this format built the
/// object by string concatenation without escaping; serializing through
/// serde_json keeps the field order and fixes the escaping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    fields: Vec<(String, String)>,
}

impl Record {
    /// Pair header names with row values positionally, date stamp first.
    ///
    /// With fewer values than names, trailing header fields are omitted;
    /// with more, the extra values are dropped. Both are accepted lossy
    /// outcomes of this format: callers log them but do not fail.
    pub fn from_row(header: &Header, row: Row, date_stamp: String) -> Result<Record, RelayError> {
        if row.is_empty() {
            return Err(RelayError::EmptyRow);
        }

        let mut fields = Vec::with_capacity(header.len() + 1);
        fields.push((DATE_STAMP_FIELD.to_string(), date_stamp));
        for (name, value) in header.names().iter().zip(row) {
            fields.push((name.clone(), value));
        }
        Ok(Record { fields })
    }

    pub fn fields(&self) -> &[(String, String)] {
        &self.fields
    }

    pub fn to_json(&self) -> Result<String, RelayError> {
        Ok(serde_json::to_string(self)?)
    }
}

impl Serialize for Record {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}
