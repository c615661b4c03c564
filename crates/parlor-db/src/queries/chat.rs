use crate::models::{MessageRow, RoomRow};
use crate::queries::require_user;
use crate::{Database, StoreError};
use rusqlite::{Connection, OptionalExtension};

impl Database {
    /// Get-or-create for the room keyed by an unordered user pair.
    ///
    /// The pair is canonicalized to (low, high) before lookup and insert, so
    /// (A,B) and (B,A) always resolve to the same row. Insert-or-ignore plus
    /// the UNIQUE constraint make concurrent first-contact calls race-free:
    /// whichever insert loses simply re-selects the winner's row.
    pub fn get_or_create_room(&self, user_a: i64, user_b: i64) -> Result<RoomRow, StoreError> {
        if user_a == user_b {
            return Err(StoreError::InvalidArgument(
                "a chat room requires two distinct users".into(),
            ));
        }
        let (lo, hi) = if user_a < user_b {
            (user_a, user_b)
        } else {
            (user_b, user_a)
        };

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            require_user(&tx, lo)?;
            require_user(&tx, hi)?;

            tx.execute(
                "INSERT INTO chat_rooms (user_a_id, user_b_id) VALUES (?1, ?2)
                 ON CONFLICT (user_a_id, user_b_id) DO NOTHING",
                [lo, hi],
            )?;

            let room = query_room_by_pair(&tx, lo, hi)?
                .ok_or_else(|| StoreError::Internal("room vanished after upsert".into()))?;
            tx.commit()?;
            Ok(room)
        })
    }

    /// Rooms a user participates in, most recent activity first.
    pub fn rooms_for_user(&self, user_id: i64) -> Result<Vec<RoomRow>, StoreError> {
        self.with_conn(|conn| {
            require_user(conn, user_id)?;
            let mut stmt = conn.prepare(
                "SELECT id, user_a_id, user_b_id, created_at, last_message_at
                 FROM chat_rooms
                 WHERE user_a_id = ?1 OR user_b_id = ?1
                 ORDER BY last_message_at DESC, id DESC",
            )?;
            let rows = stmt
                .query_map([user_id], map_room_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn send_message(
        &self,
        room_id: i64,
        sender_id: i64,
        text: &str,
    ) -> Result<MessageRow, StoreError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(StoreError::InvalidArgument(
                "message must not be empty".into(),
            ));
        }

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let room = query_room_by_id(&tx, room_id)?.ok_or(StoreError::NotFound("chat room"))?;
            if sender_id != room.user_a_id && sender_id != room.user_b_id {
                return Err(StoreError::PermissionDenied(
                    "sender is not a participant of this room",
                ));
            }

            tx.execute(
                "INSERT INTO messages (room_id, sender_id, message) VALUES (?1, ?2, ?3)",
                rusqlite::params![room_id, sender_id, text],
            )?;
            let id = tx.last_insert_rowid();
            tx.execute(
                "UPDATE chat_rooms SET last_message_at = datetime('now') WHERE id = ?1",
                [room_id],
            )?;

            let row = query_message(&tx, id)?.ok_or(StoreError::NotFound("message"))?;
            tx.commit()?;
            Ok(row)
        })
    }

    /// Messages in a room, oldest first; ties within one second break by
    /// insertion id.
    pub fn messages_for_room(&self, room_id: i64) -> Result<Vec<MessageRow>, StoreError> {
        self.with_conn(|conn| {
            if query_room_by_id(conn, room_id)?.is_none() {
                return Err(StoreError::NotFound("chat room"));
            }
            let mut stmt = conn.prepare(
                "SELECT id, room_id, sender_id, message, is_read, created_at
                 FROM messages
                 WHERE room_id = ?1
                 ORDER BY created_at, id",
            )?;
            let rows = stmt
                .query_map([room_id], map_message_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Flip everything the reader hasn't sent to read. Idempotent: a second
    /// call finds nothing left to flip.
    pub fn mark_read(&self, room_id: i64, reader_id: i64) -> Result<usize, StoreError> {
        self.with_conn_mut(|conn| {
            let room = query_room_by_id(conn, room_id)?.ok_or(StoreError::NotFound("chat room"))?;
            if reader_id != room.user_a_id && reader_id != room.user_b_id {
                return Err(StoreError::PermissionDenied(
                    "reader is not a participant of this room",
                ));
            }
            let changed = conn.execute(
                "UPDATE messages SET is_read = 1
                 WHERE room_id = ?1 AND sender_id != ?2 AND is_read = 0",
                [room_id, reader_id],
            )?;
            Ok(changed)
        })
    }

    /// Unread messages addressed to the user across all their rooms,
    /// computed fresh from the store on every call.
    pub fn unread_count(&self, user_id: i64) -> Result<i64, StoreError> {
        self.with_conn(|conn| {
            require_user(conn, user_id)?;
            let n: i64 = conn.query_row(
                "SELECT COUNT(*)
                 FROM messages m
                 JOIN chat_rooms r ON r.id = m.room_id
                 WHERE (r.user_a_id = ?1 OR r.user_b_id = ?1)
                   AND m.sender_id != ?1
                   AND m.is_read = 0",
                [user_id],
                |r| r.get(0),
            )?;
            Ok(n)
        })
    }
}

fn query_room_by_pair(conn: &Connection, lo: i64, hi: i64) -> Result<Option<RoomRow>, StoreError> {
    let row = conn
        .prepare(
            "SELECT id, user_a_id, user_b_id, created_at, last_message_at
             FROM chat_rooms WHERE user_a_id = ?1 AND user_b_id = ?2",
        )?
        .query_row([lo, hi], map_room_row)
        .optional()?;
    Ok(row)
}

fn query_room_by_id(conn: &Connection, id: i64) -> Result<Option<RoomRow>, StoreError> {
    let row = conn
        .prepare(
            "SELECT id, user_a_id, user_b_id, created_at, last_message_at
             FROM chat_rooms WHERE id = ?1",
        )?
        .query_row([id], map_room_row)
        .optional()?;
    Ok(row)
}

fn query_message(conn: &Connection, id: i64) -> Result<Option<MessageRow>, StoreError> {
    let row = conn
        .prepare(
            "SELECT id, room_id, sender_id, message, is_read, created_at
             FROM messages WHERE id = ?1",
        )?
        .query_row([id], map_message_row)
        .optional()?;
    Ok(row)
}

fn map_room_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RoomRow> {
    Ok(RoomRow {
        id: row.get(0)?,
        user_a_id: row.get(1)?,
        user_b_id: row.get(2)?,
        created_at: row.get(3)?,
        last_message_at: row.get(4)?,
    })
}

fn map_message_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<MessageRow> {
    Ok(MessageRow {
        id: row.get(0)?,
        room_id: row.get(1)?,
        sender_id: row.get(2)?,
        message: row.get(3)?,
        is_read: row.get(4)?,
        created_at: row.get(5)?,
    })
}

#[cfg(test)]
mod tests {
    use crate::{Database, StoreError};

    fn seed_user(db: &Database, name: &str) -> i64 {
        db.create_user(name, "hash", None).unwrap().id
    }

    #[test]
    fn room_pair_is_order_independent() {
        let db = Database::open_in_memory().unwrap();
        let a = seed_user(&db, "a");
        let b = seed_user(&db, "b");

        let forward = db.get_or_create_room(a, b).unwrap();
        let backward = db.get_or_create_room(b, a).unwrap();
        assert_eq!(forward.id, backward.id);

        // Existing row comes back unmodified.
        assert_eq!(forward.created_at, backward.created_at);
        assert_eq!(forward.last_message_at, backward.last_message_at);
        assert!(forward.user_a_id < forward.user_b_id);
    }

    #[test]
    fn room_with_self_rejected() {
        let db = Database::open_in_memory().unwrap();
        let a = seed_user(&db, "a");
        let err = db.get_or_create_room(a, a).unwrap_err();
        assert!(matches!(err, StoreError::InvalidArgument(_)));
    }

    #[test]
    fn room_with_unknown_user_rejected() {
        let db = Database::open_in_memory().unwrap();
        let a = seed_user(&db, "a");
        let err = db.get_or_create_room(a, a + 99).unwrap_err();
        assert!(matches!(err, StoreError::NotFound("user")));
    }

    #[test]
    fn messages_come_back_in_send_order() {
        let db = Database::open_in_memory().unwrap();
        let a = seed_user(&db, "a");
        let b = seed_user(&db, "b");
        let room = db.get_or_create_room(a, b).unwrap();

        db.send_message(room.id, a, "hi").unwrap();
        db.send_message(room.id, b, "hey").unwrap();
        db.send_message(room.id, a, "how are you?").unwrap();

        let messages = db.messages_for_room(room.id).unwrap();
        let texts: Vec<&str> = messages.iter().map(|m| m.message.as_str()).collect();
        assert_eq!(texts, ["hi", "hey", "how are you?"]);
        assert!(messages.iter().all(|m| !m.is_read));
    }

    #[test]
    fn outsider_cannot_send() {
        let db = Database::open_in_memory().unwrap();
        let a = seed_user(&db, "a");
        let b = seed_user(&db, "b");
        let outsider = seed_user(&db, "outsider");
        let room = db.get_or_create_room(a, b).unwrap();

        let err = db.send_message(room.id, outsider, "let me in").unwrap_err();
        assert!(matches!(err, StoreError::PermissionDenied(_)));
    }

    #[test]
    fn blank_message_rejected() {
        let db = Database::open_in_memory().unwrap();
        let a = seed_user(&db, "a");
        let b = seed_user(&db, "b");
        let room = db.get_or_create_room(a, b).unwrap();

        let err = db.send_message(room.id, a, "  \n ").unwrap_err();
        assert!(matches!(err, StoreError::InvalidArgument(_)));
    }

    #[test]
    fn mark_read_scenario() {
        let db = Database::open_in_memory().unwrap();
        let sender = seed_user(&db, "sender");
        let reader = seed_user(&db, "reader");
        let room = db.get_or_create_room(sender, reader).unwrap();

        db.send_message(room.id, sender, "hi").unwrap();
        db.send_message(room.id, sender, "there").unwrap();
        assert_eq!(db.unread_count(reader).unwrap(), 2);
        assert_eq!(db.unread_count(sender).unwrap(), 0);

        let flipped = db.mark_read(room.id, reader).unwrap();
        assert_eq!(flipped, 2);
        assert_eq!(db.unread_count(reader).unwrap(), 0);
        // Sender's view is unaffected: nothing was addressed to them.
        assert_eq!(db.unread_count(sender).unwrap(), 0);

        // Idempotent: nothing left to flip.
        assert_eq!(db.mark_read(room.id, reader).unwrap(), 0);
    }

    #[test]
    fn mark_read_spares_own_messages() {
        let db = Database::open_in_memory().unwrap();
        let a = seed_user(&db, "a");
        let b = seed_user(&db, "b");
        let room = db.get_or_create_room(a, b).unwrap();

        db.send_message(room.id, a, "from a").unwrap();
        db.send_message(room.id, b, "from b").unwrap();

        db.mark_read(room.id, a).unwrap();
        // a's own message stays unread from b's perspective.
        assert_eq!(db.unread_count(b).unwrap(), 1);
        assert_eq!(db.unread_count(a).unwrap(), 0);
    }

    #[test]
    fn rooms_list_requires_known_user() {
        let db = Database::open_in_memory().unwrap();
        let a = seed_user(&db, "a");
        let b = seed_user(&db, "b");
        db.get_or_create_room(a, b).unwrap();

        assert_eq!(db.rooms_for_user(a).unwrap().len(), 1);
        let err = db.rooms_for_user(b + 99).unwrap_err();
        assert!(matches!(err, StoreError::NotFound("user")));
    }
}
