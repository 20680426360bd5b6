use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::schedule::Schedule;

/// Id carried by a record that has not been stored yet
pub const UNSET_ID: i64 = 0;

/// One pill and its alarm schedules, as stored in the `medicines` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Medicine {
    /// Row id; `UNSET_ID` until the store assigns one
    #[serde(default)]
    pub id: i64,
    pub name: String,
    pub instructions: String,
    /// Opaque reference to an image owned elsewhere; deleting the record leaves it alone
    #[serde(default)]
    pub image_ref: Option<String>,
    #[serde(default)]
    pub schedules: Vec<Schedule>,
    #[serde(default)]
    pub advice: Option<String>,
}

impl Medicine {
    /// New unsaved record with no image, schedules or advice
    pub fn new(name: impl Into<String>, instructions: impl Into<String>) -> Self {
        Self {
            id: UNSET_ID,
            name: name.into(),
            instructions: instructions.into(),
            image_ref: None,
            schedules: Vec::new(),
            advice: None,
        }
    }

    pub fn with_image(mut self, image_ref: impl Into<String>) -> Self {
        self.image_ref = Some(image_ref.into());
        self
    }

    pub fn with_schedule(mut self, schedule: Schedule) -> Self {
        self.schedules.push(schedule);
        self
    }

    pub fn with_advice(mut self, advice: impl Into<String>) -> Self {
        self.advice = Some(advice.into());
        self
    }

    /// Whether the store has assigned this record an id
    pub fn is_stored(&self) -> bool {
        self.id > UNSET_ID
    }

    /// Earliest alarm time of day across all schedules, in minutes since midnight
    pub fn earliest_minute(&self) -> Option<u32> {
        self.schedules
            .iter()
            .filter_map(Schedule::minutes_since_midnight)
            .min()
    }

    /// Next dose strictly after `after`, across all schedules
    pub fn next_dose(&self, after: NaiveDateTime) -> Option<NaiveDateTime> {
        self.schedules
            .iter()
            .filter_map(|s| s.next_occurrence(after))
            .min()
    }
}

/// Sort into display order: earliest alarm time first, unscheduled records last,
/// ties by id
pub fn sort_for_display(medicines: &mut [Medicine]) {
    medicines.sort_by_key(|m| (m.earliest_minute().unwrap_or(u32::MAX), m.id));
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn stored(id: i64, times: &[&str]) -> Medicine {
        let mut m = Medicine::new(format!("m{}", id), "");
        m.id = id;
        for t in times {
            m = m.with_schedule(Schedule::new(*t, [1]).unwrap());
        }
        m
    }

    #[test]
    fn test_new_is_unset() {
        let m = Medicine::new("Aspirin", "Take with food");
        assert_eq!(m.id, UNSET_ID);
        assert!(!m.is_stored());
        assert!(m.schedules.is_empty());
    }

    #[test]
    fn test_sort_for_display() {
        let mut list = vec![
            stored(1, &[]),
            stored(2, &["09:00 PM"]),
            stored(3, &["09:00 PM", "07:30 AM"]),
            stored(4, &["08:00 AM"]),
            stored(5, &["07:30 AM"]),
        ];
        sort_for_display(&mut list);
        let ids: Vec<i64> = list.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![3, 5, 4, 2, 1]);
    }

    #[test]
    fn test_next_dose_takes_earliest_schedule() {
        // Monday 2024-01-01 10:00
        let now = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();
        let m = Medicine::new("Aspirin", "")
            .with_schedule(Schedule::new("08:00 AM", [2]).unwrap())
            .with_schedule(Schedule::new("09:00 PM", [1]).unwrap());
        assert_eq!(
            m.next_dose(now),
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(21, 0, 0)
        );
        assert_eq!(Medicine::new("x", "").next_dose(now), None);
    }

    #[test]
    fn test_json_defaults_optional_fields() {
        let m: Medicine =
            serde_json::from_str(r#"{"name":"Aspirin","instructions":"Take with food"}"#).unwrap();
        assert_eq!(m, Medicine::new("Aspirin", "Take with food"));
    }
}
