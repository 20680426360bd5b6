//! Text encoding of schedule lists for the `schedules` column.
//!
//! The column holds a JSON array such as
//! `[{"time":"08:00 AM","days":[1,3,5]}]`. Decoding never fails: anything that
//! is not a well-formed list of schedules with weekday indices in 0..=6 reads
//! back as an empty list.

use log::warn;

use crate::schedule::Schedule;

/// Encode schedules as a JSON array
pub fn encode_schedules(schedules: &[Schedule]) -> String {
    // Vec<Schedule> holds only strings and small integers, serialization cannot fail
    serde_json::to_string(schedules).unwrap_or_else(|_| "[]".to_string())
}

/// Decode a JSON array of schedules, returning an empty list on malformed input
pub fn decode_schedules(text: &str) -> Vec<Schedule> {
    if text.trim().is_empty() {
        return Vec::new();
    }

    // Out-of-range weekdays fail inside Schedule's deserializer
    match serde_json::from_str::<Option<Vec<Schedule>>>(text) {
        Ok(schedules) => schedules.unwrap_or_default(),
        Err(e) => {
            warn!("Discarding malformed schedules column: {}", e);
            Vec::new()
        }
    }
}

/// Decode an optional column value; NULL reads as no schedules
pub fn decode_optional_schedules(text: Option<&str>) -> Vec<Schedule> {
    text.map(decode_schedules).unwrap_or_default()
}
