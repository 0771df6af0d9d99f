//! CRUD operations for [`User`] records.

use rusqlite::params;
use uuid::Uuid;

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::User;
use crate::row::{ts_col, uuid_col};

impl Database {
    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    /// Insert a new user. A duplicate email maps to [`StoreError::Conflict`].
    pub fn create_user(&self, user: &User) -> Result<()> {
        self.conn()
            .execute(
                "INSERT INTO users (id, name, email, password_hash, phone, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    user.id.to_string(),
                    user.name,
                    user.email,
                    user.password_hash,
                    user.phone,
                    user.created_at.to_rfc3339(),
                    user.updated_at.to_rfc3339(),
                ],
            )
            .map_err(|e| map_unique(e, "User already exists with this email"))?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    /// Fetch a single user by UUID.
    pub fn get_user(&self, id: Uuid) -> Result<User> {
        self.conn()
            .query_row(
                "SELECT id, name, email, password_hash, phone, created_at, updated_at
                 FROM users WHERE id = ?1",
                params![id.to_string()],
                row_to_user,
            )
            .map_err(not_found)
    }

    /// Look a user up by email (login path). Returns `None` when absent.
    pub fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        match self.conn().query_row(
            "SELECT id, name, email, password_hash, phone, created_at, updated_at
             FROM users WHERE email = ?1",
            params![email],
            row_to_user,
        ) {
            Ok(user) => Ok(Some(user)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(StoreError::Sqlite(e)),
        }
    }

    /// List users, newest first, with the total count for pagination.
    pub fn list_users(&self, limit: i64, offset: i64) -> Result<(Vec<User>, i64)> {
        let mut stmt = self.conn().prepare(
            "SELECT id, name, email, password_hash, phone, created_at, updated_at
             FROM users
             ORDER BY created_at DESC
             LIMIT ?1 OFFSET ?2",
        )?;
        let rows = stmt.query_map(params![limit, offset], row_to_user)?;

        let mut users = Vec::new();
        for row in rows {
            users.push(row?);
        }

        let total: i64 = self
            .conn()
            .query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;

        Ok((users, total))
    }

    // ------------------------------------------------------------------
    // Update
    // ------------------------------------------------------------------

    /// Update name and/or phone; returns the fresh record.
    pub fn update_user_profile(
        &self,
        id: Uuid,
        name: Option<&str>,
        phone: Option<&str>,
    ) -> Result<User> {
        let affected = self.conn().execute(
            "UPDATE users
             SET name  = COALESCE(?2, name),
                 phone = COALESCE(?3, phone),
                 updated_at = ?4
             WHERE id = ?1",
            params![
                id.to_string(),
                name,
                phone,
                chrono::Utc::now().to_rfc3339()
            ],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        self.get_user(id)
    }

    /// Replace the stored password hash.
    pub fn update_user_password(&self, id: Uuid, password_hash: &str) -> Result<()> {
        let affected = self.conn().execute(
            "UPDATE users SET password_hash = ?2, updated_at = ?3 WHERE id = ?1",
            params![
                id.to_string(),
                password_hash,
                chrono::Utc::now().to_rfc3339()
            ],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Delete
    // ------------------------------------------------------------------

    /// Delete a user account. Returns `true` if a row was deleted.
    pub fn delete_user(&self, id: Uuid) -> Result<bool> {
        let affected = self
            .conn()
            .execute("DELETE FROM users WHERE id = ?1", params![id.to_string()])?;
        Ok(affected > 0)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Map a `rusqlite::Row` to a [`User`].
fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: uuid_col(row, 0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        phone: row.get(4)?,
        created_at: ts_col(row, 5)?,
        updated_at: ts_col(row, 6)?,
    })
}

pub(crate) fn not_found(e: rusqlite::Error) -> StoreError {
    match e {
        rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
        other => StoreError::Sqlite(other),
    }
}

pub(crate) fn map_unique(e: rusqlite::Error, message: &str) -> StoreError {
    match &e {
        rusqlite::Error::SqliteFailure(err, _)
            if err.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            StoreError::Conflict(message.to_string())
        }
        _ => StoreError::Sqlite(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sample_user(email: &str) -> User {
        User {
            id: Uuid::new_v4(),
            name: "Asha".to_string(),
            email: email.to_string(),
            password_hash: "$2b$12$hash".to_string(),
            phone: "9876543210".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn create_and_fetch() {
        let db = Database::open_in_memory().unwrap();
        let user = sample_user("asha@example.com");
        db.create_user(&user).unwrap();

        let fetched = db.get_user(user.id).unwrap();
        assert_eq!(fetched.email, "asha@example.com");

        let by_email = db.find_user_by_email("asha@example.com").unwrap();
        assert!(by_email.is_some());
        assert!(db.find_user_by_email("nobody@example.com").unwrap().is_none());
    }

    #[test]
    fn duplicate_email_is_conflict() {
        let db = Database::open_in_memory().unwrap();
        db.create_user(&sample_user("dup@example.com")).unwrap();
        let err = db.create_user(&sample_user("dup@example.com")).unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[test]
    fn update_profile_and_password() {
        let db = Database::open_in_memory().unwrap();
        let user = sample_user("upd@example.com");
        db.create_user(&user).unwrap();

        let updated = db
            .update_user_profile(user.id, Some("Asha K"), None)
            .unwrap();
        assert_eq!(updated.name, "Asha K");
        assert_eq!(updated.phone, user.phone);

        db.update_user_password(user.id, "$2b$12$newhash").unwrap();
        assert_eq!(db.get_user(user.id).unwrap().password_hash, "$2b$12$newhash");
    }

    #[test]
    fn delete_is_idempotent() {
        let db = Database::open_in_memory().unwrap();
        let user = sample_user("del@example.com");
        db.create_user(&user).unwrap();

        assert!(db.delete_user(user.id).unwrap());
        assert!(!db.delete_user(user.id).unwrap());
        assert!(matches!(db.get_user(user.id), Err(StoreError::NotFound)));
    }
}
