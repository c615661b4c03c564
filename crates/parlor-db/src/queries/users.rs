use crate::models::UserRow;
use crate::{Database, StoreError};
use rusqlite::{Connection, OptionalExtension};

impl Database {
    pub fn create_user(
        &self,
        username: &str,
        password_hash: &str,
        email: Option<&str>,
    ) -> Result<UserRow, StoreError> {
        let username = username.trim();
        if username.is_empty() {
            return Err(StoreError::InvalidArgument(
                "username must not be empty".into(),
            ));
        }

        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO users (username, password_hash, email) VALUES (?1, ?2, ?3)",
                rusqlite::params![username, password_hash, email],
            )
            .map_err(|e| match StoreError::from(e) {
                StoreError::Conflict(_) => StoreError::Conflict("username already taken"),
                other => other,
            })?;

            let id = conn.last_insert_rowid();
            query_user_by_id(conn, id)?.ok_or(StoreError::NotFound("user"))
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>, StoreError> {
        self.with_conn(|conn| {
            let row = conn
                .prepare(
                    "SELECT id, username, password_hash, email, created_at, last_login
                     FROM users WHERE username = ?1",
                )?
                .query_row([username], map_user_row)
                .optional()?;
            Ok(row)
        })
    }

    pub fn get_user_by_id(&self, id: i64) -> Result<Option<UserRow>, StoreError> {
        self.with_conn(|conn| query_user_by_id(conn, id))
    }

    /// Stamp `last_login` at each successful login.
    pub fn touch_last_login(&self, user_id: i64) -> Result<(), StoreError> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE users SET last_login = datetime('now') WHERE id = ?1",
                [user_id],
            )?;
            if changed == 0 {
                return Err(StoreError::NotFound("user"));
            }
            Ok(())
        })
    }
}

fn query_user_by_id(conn: &Connection, id: i64) -> Result<Option<UserRow>, StoreError> {
    let row = conn
        .prepare(
            "SELECT id, username, password_hash, email, created_at, last_login
             FROM users WHERE id = ?1",
        )?
        .query_row([id], map_user_row)
        .optional()?;
    Ok(row)
}

fn map_user_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        username: row.get(1)?,
        password_hash: row.get(2)?,
        email: row.get(3)?,
        created_at: row.get(4)?,
        last_login: row.get(5)?,
    })
}

#[cfg(test)]
mod tests {
    use crate::{Database, StoreError};

    #[test]
    fn create_and_fetch_user() {
        let db = Database::open_in_memory().unwrap();
        let user = db.create_user("maya", "hash", Some("maya@example.com")).unwrap();
        assert_eq!(user.username, "maya");
        assert!(user.last_login.is_none());

        let by_name = db.get_user_by_username("maya").unwrap().unwrap();
        assert_eq!(by_name.id, user.id);
    }

    #[test]
    fn duplicate_username_is_conflict() {
        let db = Database::open_in_memory().unwrap();
        db.create_user("maya", "hash", None).unwrap();
        let err = db.create_user("maya", "other", None).unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[test]
    fn blank_username_rejected() {
        let db = Database::open_in_memory().unwrap();
        let err = db.create_user("   ", "hash", None).unwrap_err();
        assert!(matches!(err, StoreError::InvalidArgument(_)));
    }

    #[test]
    fn touch_last_login_stamps_timestamp() {
        let db = Database::open_in_memory().unwrap();
        let user = db.create_user("maya", "hash", None).unwrap();
        db.touch_last_login(user.id).unwrap();
        let after = db.get_user_by_id(user.id).unwrap().unwrap();
        assert!(after.last_login.is_some());

        let err = db.touch_last_login(user.id + 99).unwrap_err();
        assert!(matches!(err, StoreError::NotFound("user")));
    }
}
