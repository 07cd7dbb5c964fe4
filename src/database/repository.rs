use sqlx::SqlitePool;
use tracing::debug;

use super::models::{Habit, HabitWithTrackers, NewHabit, PurgeSummary, Tracker};
use super::DatabaseError;

const HABIT_COLUMNS: &str = "id, user_id, title, description";
const TRACKER_COLUMNS: &str = "id, habit_id, date, COALESCE(status, 0) AS status";

/// Queries over the `habits` and `trackers` tables.
///
/// Multi-table writes run inside a single transaction so a failure leaves no
/// habit without its seed tracker and no orphaned trackers.
#[derive(Clone)]
pub struct HabitRepository {
    pool: SqlitePool,
}

impl HabitRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Habit `id` if it belongs to `user_id`
    pub async fn find_owned(&self, user_id: i64, id: i64) -> Result<Option<Habit>, DatabaseError> {
        let sql = format!("SELECT {HABIT_COLUMNS} FROM habits WHERE user_id = ? AND id = ?");
        let habit = sqlx::query_as::<_, Habit>(&sql)
            .bind(user_id)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(habit)
    }

    /// Same as [`find_owned`](Self::find_owned) but missing rows become `NotFound`
    pub async fn find_owned_404(&self, user_id: i64, id: i64) -> Result<Habit, DatabaseError> {
        self.find_owned(user_id, id)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("habit {} not found", id)))
    }

    /// All trackers of a habit. Not filtered by owner; callers check the habit first.
    pub async fn trackers_for(&self, habit_id: i64) -> Result<Vec<Tracker>, DatabaseError> {
        let sql = format!("SELECT {TRACKER_COLUMNS} FROM trackers WHERE habit_id = ? ORDER BY id");
        let trackers = sqlx::query_as::<_, Tracker>(&sql)
            .bind(habit_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(trackers)
    }

    pub async fn find_with_trackers(&self, user_id: i64, id: i64) -> Result<HabitWithTrackers, DatabaseError> {
        let habit = self.find_owned_404(user_id, id).await?;
        let tracker = self.trackers_for(habit.id).await?;
        Ok(HabitWithTrackers { habit, tracker })
    }

    /// Insert a habit and its first tracker (status 0, dated `date`) atomically
    pub async fn create_with_tracker(
        &self,
        user_id: i64,
        new_habit: NewHabit,
        date: &str,
    ) -> Result<Habit, DatabaseError> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            "INSERT INTO habits (user_id, title, description) VALUES (?, ?, ?) RETURNING {HABIT_COLUMNS}"
        );
        let habit = sqlx::query_as::<_, Habit>(&sql)
            .bind(user_id)
            .bind(&new_habit.title)
            .bind(&new_habit.description)
            .fetch_one(&mut *tx)
            .await?;

        sqlx::query("INSERT INTO trackers (habit_id, date, status) VALUES (?, ?, 0)")
            .bind(habit.id)
            .bind(date)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        debug!("Created habit {} for user {}", habit.id, user_id);
        Ok(habit)
    }

    /// Replace title and description of an owned habit, returning the refreshed row
    pub async fn update(
        &self,
        user_id: i64,
        id: i64,
        title: &str,
        description: &str,
    ) -> Result<Habit, DatabaseError> {
        let sql = format!(
            "UPDATE habits SET title = ?, description = ? WHERE id = ? AND user_id = ? RETURNING {HABIT_COLUMNS}"
        );
        sqlx::query_as::<_, Habit>(&sql)
            .bind(title)
            .bind(description)
            .bind(id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("habit {} not found", id)))
    }

    /// Owner of the habit a tracker belongs to
    pub async fn tracker_owner(&self, tracker_id: i64) -> Result<Option<i64>, DatabaseError> {
        let owner = sqlx::query_scalar::<_, i64>(
            "SELECT h.user_id FROM trackers t JOIN habits h ON h.id = t.habit_id WHERE t.id = ?",
        )
        .bind(tracker_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(owner)
    }

    /// Set a tracker's status after checking that `user_id` owns its habit.
    ///
    /// Unknown trackers are `NotFound`; trackers of someone else's habit are `Conflict`
    /// and stay untouched.
    pub async fn set_tracker_status(
        &self,
        user_id: i64,
        tracker_id: i64,
        status: bool,
    ) -> Result<Tracker, DatabaseError> {
        let owner = self
            .tracker_owner(tracker_id)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("tracker {} not found", tracker_id)))?;

        if owner != user_id {
            return Err(DatabaseError::Conflict("Wrong tracker id".to_string()));
        }

        let sql = format!("UPDATE trackers SET status = ? WHERE id = ? RETURNING {TRACKER_COLUMNS}");
        sqlx::query_as::<_, Tracker>(&sql)
            .bind(i64::from(status))
            .bind(tracker_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("tracker {} not found", tracker_id)))
    }

    /// Delete an owned habit and its trackers atomically, returning the deleted id
    pub async fn delete_owned(&self, user_id: i64, id: i64) -> Result<i64, DatabaseError> {
        let mut tx = self.pool.begin().await?;

        let owned = sqlx::query_scalar::<_, i64>("SELECT id FROM habits WHERE user_id = ? AND id = ?")
            .bind(user_id)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("habit {} not found", id)))?;

        sqlx::query("DELETE FROM trackers WHERE habit_id = ?")
            .bind(owned)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM habits WHERE id = ?")
            .bind(owned)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        debug!("Deleted habit {} for user {}", owned, user_id);
        Ok(owned)
    }

    /// Every habit of a user with its trackers, ordered by habit id.
    ///
    /// Trackers are loaded with one query per habit.
    pub async fn list_owned(&self, user_id: i64) -> Result<Vec<HabitWithTrackers>, DatabaseError> {
        let sql = format!("SELECT {HABIT_COLUMNS} FROM habits WHERE user_id = ? ORDER BY id");
        let habits = sqlx::query_as::<_, Habit>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        let mut out = Vec::with_capacity(habits.len());
        for habit in habits {
            let tracker = self.trackers_for(habit.id).await?;
            out.push(HabitWithTrackers { habit, tracker });
        }
        Ok(out)
    }

    /// Remove every habit and tracker owned by `user_id` in one transaction
    pub async fn purge_user(&self, user_id: i64) -> Result<PurgeSummary, DatabaseError> {
        let mut tx = self.pool.begin().await?;

        let trackers = sqlx::query(
            "DELETE FROM trackers WHERE habit_id IN (SELECT id FROM habits WHERE user_id = ?)",
        )
        .bind(user_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        let habits = sqlx::query("DELETE FROM habits WHERE user_id = ?")
            .bind(user_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        tx.commit().await?;

        Ok(PurgeSummary { habits, trackers })
    }
}
