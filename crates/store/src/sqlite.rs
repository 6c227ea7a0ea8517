//! SQLite class store.
//!
//! Uses a single SQLite database with five tables:
//! - `students`: cohort flag and team-member tag
//! - `hubble_measurements`: one row per (student, galaxy) with five measured values
//! - `classes`: classes with unique name and join code
//! - `students_classes`: enrollments, at most one per student
//! - `class_sequence`: the single-row counter for generated class names
//!
//! Foreign keys are enforced, so enrollments always reference real rows.

use async_trait::async_trait;
use chrono::Utc;
use classbatch_core::{
    ClassEnrollment, ClassId, ClassStore, EducatorId, EligibilityFilter, NewClass, StoreError,
    StoreTransaction, StudentId,
};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, Sqlite, SqlitePool, Transaction};
use std::str::FromStr;
use tracing::{debug, info};

use crate::admission::{AdmissionStore, Measurement, StudentRecord};

/// A production SQLite class store.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (or create) the database at `url` and run migrations.
    ///
    /// Pass `"sqlite::memory:"` for an in-process ephemeral database (useful
    /// for tests). In-memory databases use a single pooled connection that is
    /// never recycled, since every connection would otherwise see its own
    /// empty database.
    pub async fn open(url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let in_memory = url.contains(":memory:");
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| StoreError::Connection(format!("Invalid SQLite URL: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .pragma("foreign_keys", "ON");

        let mut pool_options = SqlitePoolOptions::new().max_connections(max_connections.max(1));
        if in_memory {
            pool_options = pool_options
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        }

        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(|e| StoreError::Connection(format!("Failed to open SQLite: {e}")))?;

        let store = Self { pool };
        store.run_migrations().await?;
        info!("SQLite class store initialized at {url}");
        Ok(store)
    }

    /// Create from an existing pool (useful for testing).
    pub async fn from_pool(pool: SqlitePool) -> Result<Self, StoreError> {
        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Run schema migrations: tables, then indexes.
    async fn run_migrations(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS students (
                id           INTEGER PRIMARY KEY,
                seed         INTEGER NOT NULL DEFAULT 0,
                team_member  TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::MigrationFailed(format!("students table: {e}")))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS hubble_measurements (
                student_id       INTEGER NOT NULL REFERENCES students(id),
                galaxy_id        INTEGER NOT NULL,
                rest_wave_value  REAL,
                obs_wave_value   REAL,
                est_dist_value   REAL,
                velocity_value   REAL,
                ang_size_value   REAL,
                last_modified    TEXT NOT NULL,
                PRIMARY KEY (student_id, galaxy_id)
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::MigrationFailed(format!("hubble_measurements table: {e}")))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS classes (
                id             INTEGER PRIMARY KEY AUTOINCREMENT,
                name           TEXT UNIQUE NOT NULL,
                code           TEXT UNIQUE NOT NULL,
                educator_id    INTEGER NOT NULL,
                expected_size  INTEGER NOT NULL DEFAULT 0,
                test           INTEGER NOT NULL DEFAULT 0,
                created        TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::MigrationFailed(format!("classes table: {e}")))?;

        // UNIQUE(student_id): a student belongs to at most one class
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS students_classes (
                student_id  INTEGER NOT NULL UNIQUE REFERENCES students(id),
                class_id    INTEGER NOT NULL REFERENCES classes(id),
                PRIMARY KEY (student_id, class_id)
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::MigrationFailed(format!("students_classes table: {e}")))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS class_sequence (
                id          INTEGER PRIMARY KEY CHECK (id = 1),
                next_value  INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::MigrationFailed(format!("class_sequence table: {e}")))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_students_classes_class ON students_classes(class_id)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::MigrationFailed(format!("class_id index: {e}")))?;

        debug!("SQLite migrations complete");
        Ok(())
    }

    /// Build the eligibility query for `filter`.
    ///
    /// `?1` is the required measurement count; disallowed team members are
    /// bound from `?2` onwards.
    fn eligibility_sql(filter: &EligibilityFilter) -> String {
        let seed_clause = if filter.require_seed {
            "AND s.seed = 1"
        } else {
            ""
        };

        let team_clause = if filter.excluded_team_members.is_empty() {
            String::new()
        } else {
            let params: Vec<String> = (0..filter.excluded_team_members.len())
                .map(|i| format!("?{}", i + 2))
                .collect();
            format!(
                "AND (s.team_member IS NULL OR s.team_member NOT IN ({}))",
                params.join(", ")
            )
        };

        format!(
            r#"
            SELECT s.id AS student_id
            FROM students s
            JOIN hubble_measurements m ON m.student_id = s.id
            WHERE m.rest_wave_value IS NOT NULL
              AND m.obs_wave_value IS NOT NULL
              AND m.est_dist_value IS NOT NULL
              AND m.velocity_value IS NOT NULL
              AND m.ang_size_value IS NOT NULL
              {seed_clause}
              {team_clause}
              AND NOT EXISTS (
                  SELECT 1 FROM students_classes sc WHERE sc.student_id = s.id
              )
            GROUP BY s.id
            HAVING COUNT(*) >= ?1
            ORDER BY s.id
            "#
        )
    }

    fn count_column(row: &sqlx::sqlite::SqliteRow, column: &str) -> Result<usize, StoreError> {
        let value: i64 = row
            .try_get(column)
            .map_err(|e| StoreError::QueryFailed(format!("{column} column: {e}")))?;
        usize::try_from(value)
            .map_err(|_| StoreError::QueryFailed(format!("{column} column is negative: {value}")))
    }
}

#[async_trait]
impl ClassStore for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn eligible_students(
        &self,
        filter: &EligibilityFilter,
    ) -> Result<Vec<StudentId>, StoreError> {
        let sql = Self::eligibility_sql(filter);
        debug!(sql = %sql, "Eligibility query");

        let mut query = sqlx::query(&sql).bind(i64::from(filter.required_measurements));
        for member in &filter.excluded_team_members {
            query = query.bind(member);
        }

        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("Eligibility query: {e}")))?;

        rows.iter()
            .map(|row| {
                row.try_get::<i64, _>("student_id")
                    .map(StudentId)
                    .map_err(|e| StoreError::QueryFailed(format!("student_id column: {e}")))
            })
            .collect()
    }

    async fn classes_with_prefix(&self, prefix: &str) -> Result<Vec<ClassEnrollment>, StoreError> {
        // substr() comparison instead of LIKE so `%` and `_` in prefixes stay literal
        let rows = sqlx::query(
            r#"
            SELECT c.id, c.name, COUNT(sc.student_id) AS enrolled
            FROM classes c
            LEFT JOIN students_classes sc ON sc.class_id = c.id
            WHERE substr(c.name, 1, length(?1)) = ?1
            GROUP BY c.id, c.name
            ORDER BY c.id
            "#,
        )
        .bind(prefix)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::QueryFailed(format!("Class registry query: {e}")))?;

        rows.iter()
            .map(|row| {
                let id: i64 = row
                    .try_get("id")
                    .map_err(|e| StoreError::QueryFailed(format!("id column: {e}")))?;
                let name: String = row
                    .try_get("name")
                    .map_err(|e| StoreError::QueryFailed(format!("name column: {e}")))?;
                Ok(ClassEnrollment {
                    id: ClassId(id),
                    name,
                    enrolled: Self::count_column(row, "enrolled")?,
                })
            })
            .collect()
    }

    async fn stored_sequence(&self) -> Result<Option<u64>, StoreError> {
        let row = sqlx::query("SELECT next_value FROM class_sequence WHERE id = 1")
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("Sequence query: {e}")))?;

        row.map(|row| {
            let value: i64 = row
                .try_get("next_value")
                .map_err(|e| StoreError::QueryFailed(format!("next_value column: {e}")))?;
            u64::try_from(value)
                .map_err(|_| StoreError::QueryFailed(format!("negative sequence value {value}")))
        })
        .transpose()
    }

    async fn begin(&self) -> Result<Box<dyn StoreTransaction>, StoreError> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StoreError::TransactionFailed(format!("BEGIN failed: {e}")))?;
        Ok(Box::new(SqliteTransaction { tx }))
    }
}

/// A write transaction on the SQLite store.
struct SqliteTransaction {
    tx: Transaction<'static, Sqlite>,
}

#[async_trait]
impl StoreTransaction for SqliteTransaction {
    async fn create_class(&mut self, class: &NewClass) -> Result<ClassId, StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO classes (name, code, educator_id, expected_size, test, created)
            VALUES (?1, ?2, ?3, ?4, 1, ?5)
            "#,
        )
        .bind(&class.name)
        .bind(&class.code)
        .bind(class.educator_id.0)
        .bind(class.expected_size as i64)
        .bind(Utc::now().to_rfc3339())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| StoreError::WriteFailed(format!("INSERT class {:?}: {e}", class.name)))?;

        Ok(ClassId(result.last_insert_rowid()))
    }

    async fn enroll(
        &mut self,
        class_id: ClassId,
        students: &[StudentId],
    ) -> Result<(), StoreError> {
        for student in students {
            sqlx::query("INSERT INTO students_classes (student_id, class_id) VALUES (?1, ?2)")
                .bind(student.0)
                .bind(class_id.0)
                .execute(&mut *self.tx)
                .await
                .map_err(|e| {
                    StoreError::WriteFailed(format!(
                        "INSERT enrollment of student {student} into class {class_id}: {e}"
                    ))
                })?;
        }
        Ok(())
    }

    async fn advance_sequence(&mut self, next: u64) -> Result<(), StoreError> {
        let next = i64::try_from(next)
            .map_err(|_| StoreError::WriteFailed(format!("sequence {next} out of range")))?;
        sqlx::query(
            r#"
            INSERT INTO class_sequence (id, next_value) VALUES (1, ?1)
            ON CONFLICT(id) DO UPDATE SET next_value = MAX(next_value, excluded.next_value)
            "#,
        )
        .bind(next)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| StoreError::WriteFailed(format!("UPDATE class_sequence: {e}")))?;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx
            .commit()
            .await
            .map_err(|e| StoreError::TransactionFailed(format!("COMMIT failed: {e}")))
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        self.tx
            .rollback()
            .await
            .map_err(|e| StoreError::TransactionFailed(format!("ROLLBACK failed: {e}")))
    }
}

#[async_trait]
impl AdmissionStore for SqliteStore {
    async fn add_student(&self, student: &StudentRecord) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO students (id, seed, team_member) VALUES (?1, ?2, ?3)")
            .bind(student.id.0)
            .bind(student.seed)
            .bind(&student.team_member)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::WriteFailed(format!("INSERT student {}: {e}", student.id)))?;
        Ok(())
    }

    async fn record_measurement(&self, m: &Measurement) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO hubble_measurements (
                student_id, galaxy_id, rest_wave_value, obs_wave_value,
                est_dist_value, velocity_value, ang_size_value, last_modified
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT(student_id, galaxy_id) DO UPDATE SET
                rest_wave_value = excluded.rest_wave_value,
                obs_wave_value = excluded.obs_wave_value,
                est_dist_value = excluded.est_dist_value,
                velocity_value = excluded.velocity_value,
                ang_size_value = excluded.ang_size_value,
                last_modified = excluded.last_modified
            "#,
        )
        .bind(m.student_id.0)
        .bind(m.galaxy_id)
        .bind(m.rest_wave_value)
        .bind(m.obs_wave_value)
        .bind(m.est_dist_value)
        .bind(m.velocity_value)
        .bind(m.ang_size_value)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            StoreError::WriteFailed(format!(
                "INSERT measurement ({}, {}): {e}",
                m.student_id, m.galaxy_id
            ))
        })?;
        Ok(())
    }

    async fn add_class(
        &self,
        name: &str,
        code: &str,
        educator_id: EducatorId,
    ) -> Result<ClassId, StoreError> {
        let result = sqlx::query(
            "INSERT INTO classes (name, code, educator_id, created) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(name)
        .bind(code)
        .bind(educator_id.0)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::WriteFailed(format!("INSERT class {name:?}: {e}")))?;
        Ok(ClassId(result.last_insert_rowid()))
    }

    async fn add_enrollment(
        &self,
        student: StudentId,
        class_id: ClassId,
    ) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO students_classes (student_id, class_id) VALUES (?1, ?2)")
            .bind(student.0)
            .bind(class_id.0)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::WriteFailed(format!("INSERT enrollment: {e}")))?;
        Ok(())
    }

    async fn enrollments(&self) -> Result<Vec<(StudentId, ClassId)>, StoreError> {
        let rows = sqlx::query(
            "SELECT student_id, class_id FROM students_classes ORDER BY student_id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::QueryFailed(format!("Enrollment listing: {e}")))?;

        rows.iter()
            .map(|row| {
                let student: i64 = row
                    .try_get("student_id")
                    .map_err(|e| StoreError::QueryFailed(format!("student_id column: {e}")))?;
                let class: i64 = row
                    .try_get("class_id")
                    .map_err(|e| StoreError::QueryFailed(format!("class_id column: {e}")))?;
                Ok((StudentId(student), ClassId(class)))
            })
            .collect()
    }
}
