//! Database repository implementation

use chrono::Utc;
use sqlx::{Row, SqlitePool};
use tracing::info;

use crate::error::DbError;
use crate::models::*;

/// Database connection and operations
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Create a new database connection
    pub async fn new(database_url: &str) -> Result<Self, DbError> {
        info!("Connecting to database: {}", database_url);

        let pool = SqlitePool::connect(database_url).await?;
        let db = Self { pool };
        db.run_migrations().await?;
        Ok(db)
    }

    /// Get the underlying pool for advanced usage
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Run database migrations
    async fn run_migrations(&self) -> Result<(), DbError> {
        info!("Running database migrations");

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                email TEXT NOT NULL UNIQUE,
                full_name TEXT NOT NULL,
                password_hash TEXT NOT NULL,
                is_active INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_users_email ON users(email)
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS tasks (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                description TEXT,
                status TEXT NOT NULL DEFAULT 'pending',
                owner_id INTEGER NOT NULL REFERENCES users(id),
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_tasks_owner ON tasks(owner_id)
            "#,
        )
        .execute(&self.pool)
        .await?;

        info!("Database migrations completed");
        Ok(())
    }

    // ==================== User Operations ====================

    /// Insert a new user
    pub async fn insert_user(&self, user: NewUser) -> Result<User, DbError> {
        let now = Utc::now();

        // Check if the email is already registered
        let existing = self.get_user_by_email(&user.email).await?;
        if existing.is_some() {
            return Err(DbError::Duplicate(format!(
                "Email '{}' already registered",
                user.email
            )));
        }

        let result = sqlx::query(
            r#"
            INSERT INTO users (email, full_name, password_hash, is_active, created_at)
            VALUES (?, ?, ?, 1, ?)
            RETURNING id
            "#,
        )
        .bind(&user.email)
        .bind(&user.full_name)
        .bind(&user.password_hash)
        .bind(now.to_rfc3339())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, &user.email))?;

        let id: i64 = result.get("id");

        Ok(User {
            id,
            email: user.email,
            full_name: user.full_name,
            password_hash: user.password_hash,
            is_active: true,
            created_at: now,
        })
    }

    /// Get a user by email
    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, DbError> {
        let result = sqlx::query(
            r#"
            SELECT id, email, full_name, password_hash, is_active, created_at
            FROM users
            WHERE email = ?
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        result.map(|row| User::try_from(&row).map_err(DbError::from)).transpose()
    }

    /// Get a user by ID
    pub async fn get_user_by_id(&self, id: i64) -> Result<Option<User>, DbError> {
        let result = sqlx::query(
            r#"
            SELECT id, email, full_name, password_hash, is_active, created_at
            FROM users
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        result.map(|row| User::try_from(&row).map_err(DbError::from)).transpose()
    }

    // ==================== Task Operations ====================

    /// Insert a new task
    pub async fn insert_task(&self, task: NewTask) -> Result<Task, DbError> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO tasks (title, description, status, owner_id, created_at, updated_at)
            VALUES (?, ?, 'pending', ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.owner_id)
        .bind(now.to_rfc3339())
        .bind(now.to_rfc3339())
        .fetch_one(&self.pool)
        .await?;

        let id: i64 = result.get("id");

        Ok(Task {
            id,
            title: task.title,
            description: task.description,
            status: TaskStatus::Pending,
            owner_id: task.owner_id,
            created_at: now,
            updated_at: now,
        })
    }

    /// Get a task by ID, scoped to its owner
    ///
    /// A task belonging to another user is reported as absent, not as forbidden.
    pub async fn get_task(&self, id: i64, owner_id: i64) -> Result<Option<Task>, DbError> {
        let result = sqlx::query(
            r#"
            SELECT id, title, description, status, owner_id, created_at, updated_at
            FROM tasks
            WHERE id = ? AND owner_id = ?
            "#,
        )
        .bind(id)
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await?;

        result.map(|row| Task::try_from(&row).map_err(DbError::from)).transpose()
    }

    /// List tasks for an owner, with optional title search and paging
    pub async fn list_tasks(
        &self,
        owner_id: i64,
        search: Option<&str>,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Task>, DbError> {
        let rows = match search {
            Some(term) => {
                // SQLite LIKE is case-insensitive for ASCII
                let pattern = format!("%{}%", term);
                sqlx::query(
                    r#"
                    SELECT id, title, description, status, owner_id, created_at, updated_at
                    FROM tasks
                    WHERE owner_id = ? AND title LIKE ?
                    ORDER BY created_at DESC
                    LIMIT ? OFFSET ?
                    "#,
                )
                .bind(owner_id)
                .bind(pattern)
                .bind(limit)
                .bind(offset)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(
                    r#"
                    SELECT id, title, description, status, owner_id, created_at, updated_at
                    FROM tasks
                    WHERE owner_id = ?
                    ORDER BY created_at DESC
                    LIMIT ? OFFSET ?
                    "#,
                )
                .bind(owner_id)
                .bind(limit)
                .bind(offset)
                .fetch_all(&self.pool)
                .await?
            }
        };

        rows.iter()
            .map(|row| Task::try_from(row).map_err(DbError::from))
            .collect()
    }

    /// Apply a partial update to a task, scoped to its owner
    ///
    /// Returns the updated task, or None if no such task exists for this owner.
    pub async fn update_task(
        &self,
        id: i64,
        owner_id: i64,
        update: UpdateTask,
    ) -> Result<Option<Task>, DbError> {
        let Some(existing) = self.get_task(id, owner_id).await? else {
            return Ok(None);
        };

        let title = update.title.unwrap_or(existing.title);
        let description = update.description.unwrap_or(existing.description);
        let status = update.status.unwrap_or(existing.status);
        let now = Utc::now();

        sqlx::query(
            r#"
            UPDATE tasks
            SET title = ?, description = ?, status = ?, updated_at = ?
            WHERE id = ? AND owner_id = ?
            "#,
        )
        .bind(&title)
        .bind(&description)
        .bind(status.as_str())
        .bind(now.to_rfc3339())
        .bind(id)
        .bind(owner_id)
        .execute(&self.pool)
        .await?;

        Ok(Some(Task {
            id,
            title,
            description,
            status,
            owner_id,
            created_at: existing.created_at,
            updated_at: now,
        }))
    }

    /// Delete a task, scoped to its owner
    pub async fn delete_task(&self, id: i64, owner_id: i64) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = ? AND owner_id = ?")
            .bind(id)
            .bind(owner_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

/// Map a UNIQUE constraint violation to a duplicate error
///
/// Two registrations of the same email can race past the existence
/// pre-check; the column constraint is the backstop.
fn map_unique_violation(e: sqlx::Error, email: &str) -> DbError {
    if let sqlx::Error::Database(db_err) = &e
        && db_err.is_unique_violation()
    {
        return DbError::Duplicate(format!("Email '{}' already registered", email));
    }
    DbError::Connection(e)
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_db() -> Database {
        Database::new("sqlite::memory:").await.unwrap()
    }

    fn new_user(email: &str) -> NewUser {
        NewUser {
            email: email.to_string(),
            full_name: "Test User".to_string(),
            password_hash: "$argon2id$fake".to_string(),
        }
    }

    #[tokio::test]
    async fn test_insert_and_get_user() {
        let db = test_db().await;

        let user = db.insert_user(new_user("a@x.com")).await.unwrap();
        assert!(user.is_active);

        let by_email = db.get_user_by_email("a@x.com").await.unwrap().unwrap();
        assert_eq!(by_email.id, user.id);

        let by_id = db.get_user_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(by_id.email, "a@x.com");
    }

    #[tokio::test]
    async fn test_duplicate_user() {
        let db = test_db().await;

        db.insert_user(new_user("a@x.com")).await.unwrap();
        let err = db.insert_user(new_user("a@x.com")).await.unwrap_err();
        assert!(matches!(err, DbError::Duplicate(_)));
    }

    #[tokio::test]
    async fn test_unique_violation_maps_to_duplicate() {
        let db = test_db().await;
        db.insert_user(new_user("a@x.com")).await.unwrap();

        // Hit the column constraint directly, as a racing insert would
        let err = sqlx::query(
            r#"
            INSERT INTO users (email, full_name, password_hash, is_active, created_at)
            VALUES ('a@x.com', 'B', 'hash', 1, '2024-01-01T00:00:00Z')
            "#,
        )
        .execute(db.pool())
        .await
        .unwrap_err();

        let mapped = map_unique_violation(err, "a@x.com");
        assert!(matches!(mapped, DbError::Duplicate(_)));
    }

    #[tokio::test]
    async fn test_task_crud_is_owner_scoped() {
        let db = test_db().await;
        let alice = db.insert_user(new_user("alice@x.com")).await.unwrap();
        let bob = db.insert_user(new_user("bob@x.com")).await.unwrap();

        let task = db
            .insert_task(NewTask {
                title: "Write report".to_string(),
                description: None,
                owner_id: alice.id,
            })
            .await
            .unwrap();
        assert_eq!(task.status, TaskStatus::Pending);

        // Owner sees it, others do not
        assert!(db.get_task(task.id, alice.id).await.unwrap().is_some());
        assert!(db.get_task(task.id, bob.id).await.unwrap().is_none());

        // Update through the wrong owner is a no-op
        let denied = db
            .update_task(task.id, bob.id, UpdateTask::default())
            .await
            .unwrap();
        assert!(denied.is_none());

        let updated = db
            .update_task(
                task.id,
                alice.id,
                UpdateTask {
                    status: Some(TaskStatus::Done),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.status, TaskStatus::Done);
        assert_eq!(updated.title, "Write report");

        assert!(!db.delete_task(task.id, bob.id).await.unwrap());
        assert!(db.delete_task(task.id, alice.id).await.unwrap());
        assert!(db.get_task(task.id, alice.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_tasks_search() {
        let db = test_db().await;
        let user = db.insert_user(new_user("a@x.com")).await.unwrap();

        for title in ["Buy milk", "Buy bread", "Walk the dog"] {
            db.insert_task(NewTask {
                title: title.to_string(),
                description: None,
                owner_id: user.id,
            })
            .await
            .unwrap();
        }

        let all = db.list_tasks(user.id, None, 0, 100).await.unwrap();
        assert_eq!(all.len(), 3);

        let buys = db.list_tasks(user.id, Some("buy"), 0, 100).await.unwrap();
        assert_eq!(buys.len(), 2);

        let paged = db.list_tasks(user.id, None, 1, 1).await.unwrap();
        assert_eq!(paged.len(), 1);
    }
}
