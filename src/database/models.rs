use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Storage format for tracker dates
pub const TRACKER_DATE_FORMAT: &str = "%d-%m-%Y";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Habit {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Tracker {
    pub id: i64,
    pub habit_id: i64,
    pub date: String,
    pub status: i64,
}

/// Habit row together with every tracker attached to it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HabitWithTrackers {
    #[serde(flatten)]
    pub habit: Habit,
    pub tracker: Vec<Tracker>,
}

/// Validated input for inserting a habit
#[derive(Debug, Clone)]
pub struct NewHabit {
    pub title: String,
    pub description: Option<String>,
}

/// Rows removed by a user purge
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PurgeSummary {
    pub habits: u64,
    pub trackers: u64,
}

/// Render a date the way tracker rows store it
pub fn tracker_date(date: NaiveDate) -> String {
    date.format(TRACKER_DATE_FORMAT).to_string()
}

/// Today's local date in tracker format
pub fn today() -> String {
    tracker_date(chrono::Local::now().date_naive())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn formats_day_month_year() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 7).unwrap();
        assert_eq!(tracker_date(date), "07-03-2026");
    }

    #[test]
    fn habit_with_trackers_flattens_habit_fields() {
        let full = HabitWithTrackers {
            habit: Habit {
                id: 3,
                user_id: 42,
                title: "Running".to_string(),
                description: None,
            },
            tracker: vec![Tracker {
                id: 9,
                habit_id: 3,
                date: "07-03-2026".to_string(),
                status: 0,
            }],
        };

        assert_eq!(
            serde_json::to_value(&full).unwrap(),
            json!({
                "id": 3,
                "user_id": 42,
                "title": "Running",
                "description": null,
                "tracker": [{ "id": 9, "habit_id": 3, "date": "07-03-2026", "status": 0 }]
            })
        );
    }
}
