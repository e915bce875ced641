//! Line protocol spoken by the sensor board.
//!
//! Every line is one reading set: `KEY:VALUE` fields separated by commas, for
//! example `TEMP:36.5°C,HUM:40%,FLAME:No fire`. There is no framing, checksum
//! or escaping. The parser is forgiving: fragments without a colon are dropped
//! and everything else is kept in order.

use serde::{Deserialize, Serialize};

/// Separator between fields on a line.
pub const FIELD_SEPARATOR: char = ',';

/// Separator between a key and its value inside a field.
pub const KEY_VALUE_SEPARATOR: char = ':';

/// One parsed `(key, value)` pair from an incoming line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorReading {
    /// Sensor key, e.g. `TEMP`
    pub key: String,
    /// Raw value as sent by the device, e.g. `36.5°C`
    pub raw_value: String,
}

impl SensorReading {
    pub fn new(key: impl Into<String>, raw_value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            raw_value: raw_value.into(),
        }
    }

    /// Render the reading back as a `KEY:VALUE` field.
    pub fn to_field(&self) -> String {
        format!("{}{}{}", self.key, KEY_VALUE_SEPARATOR, self.raw_value)
    }
}

/// Split a line into readings.
///
/// Fragments are split on the first `:` only, so values may themselves
/// contain colons. Keys and values are trimmed. Never fails.
pub fn parse_line(text: &str) -> Vec<SensorReading> {
    text.split(FIELD_SEPARATOR)
        .filter_map(|fragment| fragment.split_once(KEY_VALUE_SEPARATOR))
        .map(|(key, value)| SensorReading::new(key.trim(), value.trim()))
        .collect()
}

/// Render readings as the field list written to the session log.
pub fn to_fields(readings: &[SensorReading]) -> Vec<String> {
    readings.iter().map(SensorReading::to_field).collect()
}
