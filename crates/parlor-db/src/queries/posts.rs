use crate::models::{CommentRow, PostRow};
use crate::queries::{require_post, require_user};
use crate::{Database, StoreError};
use rusqlite::{Connection, OptionalExtension};

/// Post columns plus per-viewer annotations, all in one query. ?1 is the
/// viewing user, whose liked/saved flags are computed against the join
/// tables rather than any cached state.
const POST_SELECT: &str = "
    SELECT p.id, p.author_id, u.username, p.content, p.image_url, p.video_url,
           p.likes_count,
           (SELECT COUNT(*) FROM comments c WHERE c.post_id = p.id),
           EXISTS(SELECT 1 FROM post_likes l WHERE l.post_id = p.id AND l.user_id = ?1),
           EXISTS(SELECT 1 FROM saved_posts s WHERE s.post_id = p.id AND s.user_id = ?1),
           p.created_at
    FROM posts p
    JOIN users u ON u.id = p.author_id";

impl Database {
    pub fn create_post(
        &self,
        author_id: i64,
        content: Option<&str>,
        image_url: Option<&str>,
        video_url: Option<&str>,
    ) -> Result<PostRow, StoreError> {
        let content = content.map(str::trim).filter(|c| !c.is_empty());
        if content.is_none() && image_url.is_none() && video_url.is_none() {
            return Err(StoreError::InvalidArgument(
                "post must have content or media".into(),
            ));
        }

        self.with_conn_mut(|conn| {
            require_user(conn, author_id)?;
            conn.execute(
                "INSERT INTO posts (author_id, content, image_url, video_url)
                 VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![author_id, content, image_url, video_url],
            )?;
            let id = conn.last_insert_rowid();
            query_post(conn, id, author_id)?.ok_or(StoreError::NotFound("post"))
        })
    }

    pub fn get_post(&self, post_id: i64, viewer_id: i64) -> Result<Option<PostRow>, StoreError> {
        self.with_conn(|conn| query_post(conn, post_id, viewer_id))
    }

    /// Feed: newest first, annotated for the requesting user.
    pub fn feed(&self, viewer_id: i64) -> Result<Vec<PostRow>, StoreError> {
        self.with_conn(|conn| {
            require_user(conn, viewer_id)?;
            let sql = format!("{POST_SELECT} ORDER BY p.created_at DESC, p.id DESC");
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([viewer_id], map_post_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn create_comment(
        &self,
        post_id: i64,
        author_id: i64,
        content: &str,
    ) -> Result<CommentRow, StoreError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(StoreError::InvalidArgument(
                "comment must not be empty".into(),
            ));
        }

        self.with_conn_mut(|conn| {
            require_post(conn, post_id)?;
            require_user(conn, author_id)?;
            conn.execute(
                "INSERT INTO comments (post_id, author_id, content) VALUES (?1, ?2, ?3)",
                rusqlite::params![post_id, author_id, content],
            )?;
            let id = conn.last_insert_rowid();
            query_comment(conn, id)?.ok_or(StoreError::NotFound("comment"))
        })
    }

    pub fn comments_for_post(&self, post_id: i64) -> Result<Vec<CommentRow>, StoreError> {
        self.with_conn(|conn| {
            require_post(conn, post_id)?;
            let mut stmt = conn.prepare(
                "SELECT c.id, c.post_id, c.author_id, u.username, c.content, c.created_at
                 FROM comments c
                 JOIN users u ON u.id = c.author_id
                 WHERE c.post_id = ?1
                 ORDER BY c.created_at, c.id",
            )?;
            let rows = stmt
                .query_map([post_id], map_comment_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Idempotent membership setter: a no-op call never moves `likes_count`,
    /// and the counter mutates only in the same transaction as the join row.
    /// The HTTP like/unlike endpoints both route through here.
    pub fn set_liked(
        &self,
        post_id: i64,
        user_id: i64,
        desired: bool,
    ) -> Result<bool, StoreError> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            require_post(&tx, post_id)?;
            require_user(&tx, user_id)?;

            if desired {
                let inserted = tx.execute(
                    "INSERT OR IGNORE INTO post_likes (post_id, user_id) VALUES (?1, ?2)",
                    [post_id, user_id],
                )?;
                if inserted > 0 {
                    tx.execute(
                        "UPDATE posts SET likes_count = likes_count + 1 WHERE id = ?1",
                        [post_id],
                    )?;
                }
            } else {
                let deleted = tx.execute(
                    "DELETE FROM post_likes WHERE post_id = ?1 AND user_id = ?2",
                    [post_id, user_id],
                )?;
                if deleted > 0 {
                    tx.execute(
                        "UPDATE posts SET likes_count = likes_count - 1 WHERE id = ?1",
                        [post_id],
                    )?;
                }
            }

            tx.commit()?;
            Ok(desired)
        })
    }

    /// Toggle save: removes the membership row if present, inserts it if not.
    /// Returns the resulting saved state.
    pub fn toggle_save(&self, post_id: i64, user_id: i64) -> Result<bool, StoreError> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            require_post(&tx, post_id)?;
            require_user(&tx, user_id)?;

            let existing: Option<i64> = tx
                .query_row(
                    "SELECT 1 FROM saved_posts WHERE post_id = ?1 AND user_id = ?2",
                    [post_id, user_id],
                    |r| r.get(0),
                )
                .optional()?;

            let saved = if existing.is_some() {
                tx.execute(
                    "DELETE FROM saved_posts WHERE post_id = ?1 AND user_id = ?2",
                    [post_id, user_id],
                )?;
                false
            } else {
                tx.execute(
                    "INSERT INTO saved_posts (post_id, user_id) VALUES (?1, ?2)",
                    [post_id, user_id],
                )?;
                true
            };

            tx.commit()?;
            Ok(saved)
        })
    }

    /// Reconciliation check: the denormalized `posts.likes_count` must always
    /// equal the join-table cardinality. Exposed so operators (and tests)
    /// can verify the invariant hasn't drifted.
    pub fn likes_row_count(&self, post_id: i64) -> Result<i64, StoreError> {
        self.with_conn(|conn| {
            let n: i64 = conn.query_row(
                "SELECT COUNT(*) FROM post_likes WHERE post_id = ?1",
                [post_id],
                |r| r.get(0),
            )?;
            Ok(n)
        })
    }
}

fn query_post(
    conn: &Connection,
    post_id: i64,
    viewer_id: i64,
) -> Result<Option<PostRow>, StoreError> {
    let sql = format!("{POST_SELECT} WHERE p.id = ?2");
    let row = conn
        .prepare(&sql)?
        .query_row([viewer_id, post_id], map_post_row)
        .optional()?;
    Ok(row)
}

fn query_comment(conn: &Connection, id: i64) -> Result<Option<CommentRow>, StoreError> {
    let row = conn
        .prepare(
            "SELECT c.id, c.post_id, c.author_id, u.username, c.content, c.created_at
             FROM comments c
             JOIN users u ON u.id = c.author_id
             WHERE c.id = ?1",
        )?
        .query_row([id], map_comment_row)
        .optional()?;
    Ok(row)
}

fn map_post_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<PostRow> {
    Ok(PostRow {
        id: row.get(0)?,
        author_id: row.get(1)?,
        author_username: row.get(2)?,
        content: row.get(3)?,
        image_url: row.get(4)?,
        video_url: row.get(5)?,
        likes_count: row.get(6)?,
        comments_count: row.get(7)?,
        liked: row.get(8)?,
        saved: row.get(9)?,
        created_at: row.get(10)?,
    })
}

fn map_comment_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<CommentRow> {
    Ok(CommentRow {
        id: row.get(0)?,
        post_id: row.get(1)?,
        author_id: row.get(2)?,
        author_username: row.get(3)?,
        content: row.get(4)?,
        created_at: row.get(5)?,
    })
}

#[cfg(test)]
mod tests {
    use crate::{Database, StoreError};

    fn seed_user(db: &Database, name: &str) -> i64 {
        db.create_user(name, "hash", None).unwrap().id
    }

    fn seed_post(db: &Database, author: i64) -> i64 {
        db.create_post(author, Some("hello"), None, None).unwrap().id
    }

    #[test]
    fn like_then_unlike_restores_count() {
        let db = Database::open_in_memory().unwrap();
        let author = seed_user(&db, "author");
        let fan = seed_user(&db, "fan");
        let post = seed_post(&db, author);

        let before = db.get_post(post, fan).unwrap().unwrap().likes_count;
        db.set_liked(post, fan, true).unwrap();
        assert_eq!(db.get_post(post, fan).unwrap().unwrap().likes_count, before + 1);

        db.set_liked(post, fan, false).unwrap();
        assert_eq!(db.get_post(post, fan).unwrap().unwrap().likes_count, before);
    }

    #[test]
    fn repeated_like_is_idempotent() {
        let db = Database::open_in_memory().unwrap();
        let author = seed_user(&db, "author");
        let fan = seed_user(&db, "fan");
        let post = seed_post(&db, author);

        db.set_liked(post, fan, true).unwrap();
        db.set_liked(post, fan, true).unwrap();
        let row = db.get_post(post, fan).unwrap().unwrap();
        assert_eq!(row.likes_count, 1);
        assert!(row.liked);

        // Unliking when not liked is also a no-op: never a negative count.
        db.set_liked(post, fan, false).unwrap();
        db.set_liked(post, fan, false).unwrap();
        assert_eq!(db.get_post(post, fan).unwrap().unwrap().likes_count, 0);
    }

    #[test]
    fn likes_count_matches_join_table() {
        let db = Database::open_in_memory().unwrap();
        let author = seed_user(&db, "author");
        let a = seed_user(&db, "a");
        let b = seed_user(&db, "b");
        let post = seed_post(&db, author);

        db.set_liked(post, a, true).unwrap();
        db.set_liked(post, b, true).unwrap();
        db.set_liked(post, a, false).unwrap();

        let row = db.get_post(post, author).unwrap().unwrap();
        assert_eq!(row.likes_count, db.likes_row_count(post).unwrap());
        assert_eq!(row.likes_count, 1);
    }

    #[test]
    fn toggle_save_flips_membership() {
        let db = Database::open_in_memory().unwrap();
        let author = seed_user(&db, "author");
        let post = seed_post(&db, author);

        assert!(db.toggle_save(post, author).unwrap());
        assert!(db.get_post(post, author).unwrap().unwrap().saved);
        assert!(!db.toggle_save(post, author).unwrap());
        assert!(!db.get_post(post, author).unwrap().unwrap().saved);
        assert!(db.toggle_save(post, author).unwrap());
    }

    #[test]
    fn toggle_save_on_missing_post_is_not_found() {
        let db = Database::open_in_memory().unwrap();
        let user = seed_user(&db, "someone");
        let err = db.toggle_save(42, user).unwrap_err();
        assert!(matches!(err, StoreError::NotFound("post")));
    }

    #[test]
    fn empty_post_rejected() {
        let db = Database::open_in_memory().unwrap();
        let author = seed_user(&db, "author");
        let err = db.create_post(author, Some("   "), None, None).unwrap_err();
        assert!(matches!(err, StoreError::InvalidArgument(_)));

        // Media-only posts are fine.
        db.create_post(author, None, Some("https://cdn/p.jpg"), None)
            .unwrap();
    }

    #[test]
    fn comments_append_in_order() {
        let db = Database::open_in_memory().unwrap();
        let author = seed_user(&db, "author");
        let post = seed_post(&db, author);

        db.create_comment(post, author, "first").unwrap();
        db.create_comment(post, author, "second").unwrap();
        let comments = db.comments_for_post(post).unwrap();
        assert_eq!(comments.len(), 2);
        assert_eq!(comments[0].content, "first");
        assert_eq!(comments[1].content, "second");
        assert_eq!(comments[0].author_username, "author");

        let err = db.create_comment(post, author, "  ").unwrap_err();
        assert!(matches!(err, StoreError::InvalidArgument(_)));

        let row = db.get_post(post, author).unwrap().unwrap();
        assert_eq!(row.comments_count, 2);
    }

    #[test]
    fn feed_is_newest_first() {
        let db = Database::open_in_memory().unwrap();
        let author = seed_user(&db, "author");
        let first = seed_post(&db, author);
        let second = seed_post(&db, author);

        let feed = db.feed(author).unwrap();
        assert_eq!(feed[0].id, second);
        assert_eq!(feed[1].id, first);
    }
}
