use chrono::Utc;
use sqlx::SqlitePool;

/// Runs a single, consolidated migration for the current schema.
///
/// Creates the catalogue (curricula, languages, subjects), the topic label
/// tree, authored content, and study plans with their sessions.
#[allow(clippy::too_many_lines)]
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    async fn is_applied(pool: &SqlitePool, version: i64) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?1")
            .bind(version)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
            ",
    )
    .execute(pool)
    .await?;

    // Version 1: full schema.
    if is_applied(pool, 1).await? {
        tracing::debug!("schema up to date");
        return Ok(());
    }

    let mut tx = pool.begin().await?;

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS curricula (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL
            );
        ",
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS languages (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                code TEXT NOT NULL
            );
        ",
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS subjects (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                curriculum_id INTEGER NOT NULL,
                language_id INTEGER NOT NULL,
                level TEXT NOT NULL CHECK (level IN ('SL', 'HL', 'OTHER')),
                FOREIGN KEY (curriculum_id) REFERENCES curricula(id) ON DELETE CASCADE,
                FOREIGN KEY (language_id) REFERENCES languages(id) ON DELETE CASCADE
            );
        ",
    )
    .execute(&mut *tx)
    .await?;

    // No foreign key on parent_id: labels may arrive before their parent.
    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS labels (
                id INTEGER PRIMARY KEY,
                description TEXT NOT NULL,
                numbering TEXT,
                subject_id INTEGER NOT NULL,
                parent_id INTEGER,
                FOREIGN KEY (subject_id) REFERENCES subjects(id) ON DELETE CASCADE
            );
        ",
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS content_items (
                id INTEGER PRIMARY KEY,
                kind TEXT NOT NULL CHECK (kind IN ('recipe', 'slide')),
                title TEXT NOT NULL,
                subject_id INTEGER NOT NULL,
                topic_id INTEGER,
                curriculum_id INTEGER,
                language_id INTEGER,
                status TEXT NOT NULL,
                FOREIGN KEY (subject_id) REFERENCES subjects(id) ON DELETE CASCADE,
                FOREIGN KEY (topic_id) REFERENCES labels(id) ON DELETE SET NULL,
                FOREIGN KEY (curriculum_id) REFERENCES curricula(id) ON DELETE SET NULL,
                FOREIGN KEY (language_id) REFERENCES languages(id) ON DELETE SET NULL
            );
        ",
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS study_plans (
                id INTEGER PRIMARY KEY,
                student_id INTEGER NOT NULL UNIQUE,
                name TEXT NOT NULL,
                config TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
        ",
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS scheduled_sessions (
                id INTEGER PRIMARY KEY,
                plan_id INTEGER NOT NULL,
                subject_name TEXT NOT NULL,
                subject_color TEXT NOT NULL,
                subject_local_id INTEGER NOT NULL CHECK (subject_local_id >= 0),
                start_time TEXT NOT NULL,
                end_time TEXT NOT NULL,
                FOREIGN KEY (plan_id) REFERENCES study_plans(id) ON DELETE CASCADE
            );
        ",
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r"
            CREATE INDEX IF NOT EXISTS idx_labels_subject_parent
                ON labels(subject_id, parent_id);
        ",
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r"
            CREATE INDEX IF NOT EXISTS idx_content_kind_topic
                ON content_items(kind, topic_id);
        ",
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r"
            CREATE INDEX IF NOT EXISTS idx_sessions_plan_start
                ON scheduled_sessions(plan_id, start_time);
        ",
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r"
            INSERT INTO schema_migrations (version, applied_at)
            VALUES (?1, ?2)
            ON CONFLICT(version) DO NOTHING
        ",
    )
    .bind(1_i64)
    .bind(Utc::now())
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    tracing::info!(version = 1, "applied schema migration");

    Ok(())
}
