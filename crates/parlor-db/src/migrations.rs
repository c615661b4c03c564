use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("running migration v1 (initial schema)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id              INTEGER PRIMARY KEY,
                username        TEXT NOT NULL UNIQUE CHECK (length(username) > 0),
                password_hash   TEXT NOT NULL,
                email           TEXT,
                created_at      TEXT NOT NULL DEFAULT (datetime('now')),
                last_login      TEXT
            );

            CREATE TABLE posts (
                id              INTEGER PRIMARY KEY,
                author_id       INTEGER NOT NULL REFERENCES users(id),
                content         TEXT,
                image_url       TEXT,
                video_url       TEXT,
                likes_count     INTEGER NOT NULL DEFAULT 0,
                created_at      TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX idx_posts_created
                ON posts(created_at, id);

            CREATE TABLE comments (
                id              INTEGER PRIMARY KEY,
                post_id         INTEGER NOT NULL REFERENCES posts(id),
                author_id       INTEGER NOT NULL REFERENCES users(id),
                content         TEXT NOT NULL CHECK (length(content) > 0),
                created_at      TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX idx_comments_post
                ON comments(post_id, created_at);

            CREATE TABLE post_likes (
                post_id         INTEGER NOT NULL REFERENCES posts(id),
                user_id         INTEGER NOT NULL REFERENCES users(id),
                created_at      TEXT NOT NULL DEFAULT (datetime('now')),
                PRIMARY KEY (post_id, user_id)
            );

            CREATE TABLE saved_posts (
                post_id         INTEGER NOT NULL REFERENCES posts(id),
                user_id         INTEGER NOT NULL REFERENCES users(id),
                created_at      TEXT NOT NULL DEFAULT (datetime('now')),
                PRIMARY KEY (post_id, user_id)
            );

            CREATE TABLE polls (
                id              INTEGER PRIMARY KEY,
                post_id         INTEGER NOT NULL REFERENCES posts(id),
                author_id       INTEGER NOT NULL REFERENCES users(id),
                question        TEXT NOT NULL CHECK (length(question) > 0),
                created_at      TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE poll_options (
                id              INTEGER PRIMARY KEY,
                poll_id         INTEGER NOT NULL REFERENCES polls(id),
                option_text     TEXT NOT NULL CHECK (length(option_text) > 0),
                votes_count     INTEGER NOT NULL DEFAULT 0
            );

            CREATE INDEX idx_poll_options_poll
                ON poll_options(poll_id);

            CREATE TABLE poll_votes (
                id              INTEGER PRIMARY KEY,
                poll_id         INTEGER NOT NULL REFERENCES polls(id),
                option_id       INTEGER NOT NULL REFERENCES poll_options(id),
                user_id         INTEGER NOT NULL REFERENCES users(id),
                created_at      TEXT NOT NULL DEFAULT (datetime('now')),
                UNIQUE (poll_id, user_id)
            );

            -- The pair is canonicalized (user_a_id < user_b_id) before every
            -- lookup and insert, so one UNIQUE constraint covers both
            -- orderings of the same two users.
            CREATE TABLE chat_rooms (
                id              INTEGER PRIMARY KEY,
                user_a_id       INTEGER NOT NULL REFERENCES users(id),
                user_b_id       INTEGER NOT NULL REFERENCES users(id),
                created_at      TEXT NOT NULL DEFAULT (datetime('now')),
                last_message_at TEXT NOT NULL DEFAULT (datetime('now')),
                UNIQUE (user_a_id, user_b_id),
                CHECK (user_a_id < user_b_id)
            );

            CREATE TABLE messages (
                id              INTEGER PRIMARY KEY,
                room_id         INTEGER NOT NULL REFERENCES chat_rooms(id),
                sender_id       INTEGER NOT NULL REFERENCES users(id),
                message         TEXT NOT NULL CHECK (length(message) > 0),
                is_read         INTEGER NOT NULL DEFAULT 0,
                created_at      TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX idx_messages_room
                ON messages(room_id, created_at, id);

            CREATE INDEX idx_messages_unread
                ON messages(room_id, is_read) WHERE is_read = 0;

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
