use crate::models::{PollOptionRow, PollRow};
use crate::queries::{require_post, require_user};
use crate::{Database, StoreError};
use parlor_types::api::{PollOptionView, PollView};
use rusqlite::{Connection, OptionalExtension};

impl Database {
    /// Create a poll and its options in one transaction — a poll must never
    /// exist with zero options, so nothing is committed until every option
    /// row is in.
    pub fn create_poll(
        &self,
        post_id: i64,
        author_id: i64,
        question: &str,
        options: &[String],
    ) -> Result<i64, StoreError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(StoreError::InvalidArgument(
                "question must not be empty".into(),
            ));
        }
        let texts: Vec<&str> = options.iter().map(|o| o.trim()).collect();
        if texts.len() < 2 {
            return Err(StoreError::InvalidArgument(
                "at least 2 options required".into(),
            ));
        }
        if texts.iter().any(|t| t.is_empty()) {
            return Err(StoreError::InvalidArgument(
                "option text must not be empty".into(),
            ));
        }

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            require_post(&tx, post_id)?;
            require_user(&tx, author_id)?;

            tx.execute(
                "INSERT INTO polls (post_id, author_id, question) VALUES (?1, ?2, ?3)",
                rusqlite::params![post_id, author_id, question],
            )?;
            let poll_id = tx.last_insert_rowid();

            for text in &texts {
                tx.execute(
                    "INSERT INTO poll_options (poll_id, option_text) VALUES (?1, ?2)",
                    rusqlite::params![poll_id, text],
                )?;
            }

            tx.commit()?;
            Ok(poll_id)
        })
    }

    /// Record a vote: exactly once per (poll, user), never changed.
    ///
    /// The pre-check surfaces a friendly Conflict; under a concurrent race
    /// the UNIQUE(poll_id, user_id) constraint is the backstop that still
    /// lets exactly one insert through.
    pub fn cast_vote(&self, poll_id: i64, option_id: i64, user_id: i64) -> Result<(), StoreError> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            if query_poll(&tx, poll_id)?.is_none() {
                return Err(StoreError::NotFound("poll"));
            }
            require_user(&tx, user_id)?;

            let owner: Option<i64> = tx
                .query_row(
                    "SELECT poll_id FROM poll_options WHERE id = ?1",
                    [option_id],
                    |r| r.get(0),
                )
                .optional()?;
            match owner {
                None => return Err(StoreError::NotFound("poll option")),
                Some(p) if p != poll_id => {
                    return Err(StoreError::InvalidArgument(
                        "option does not belong to this poll".into(),
                    ));
                }
                Some(_) => {}
            }

            let already: Option<i64> = tx
                .query_row(
                    "SELECT 1 FROM poll_votes WHERE poll_id = ?1 AND user_id = ?2",
                    [poll_id, user_id],
                    |r| r.get(0),
                )
                .optional()?;
            if already.is_some() {
                return Err(StoreError::Conflict("user has already voted on this poll"));
            }

            tx.execute(
                "INSERT INTO poll_votes (poll_id, option_id, user_id) VALUES (?1, ?2, ?3)",
                rusqlite::params![poll_id, option_id, user_id],
            )?;
            tx.execute(
                "UPDATE poll_options SET votes_count = votes_count + 1 WHERE id = ?1",
                [option_id],
            )?;

            tx.commit()?;
            Ok(())
        })
    }

    /// Aggregate a poll from one viewer's perspective: total votes,
    /// per-option percentages, and which option (if any) the viewer picked.
    /// Options come back in creation order.
    pub fn fetch_poll(&self, poll_id: i64, viewer_id: Option<i64>) -> Result<PollView, StoreError> {
        self.with_conn(|conn| {
            let poll = query_poll(conn, poll_id)?.ok_or(StoreError::NotFound("poll"))?;

            let mut stmt = conn.prepare(
                "SELECT id, poll_id, option_text, votes_count
                 FROM poll_options WHERE poll_id = ?1 ORDER BY id",
            )?;
            let options = stmt
                .query_map([poll_id], |row| {
                    Ok(PollOptionRow {
                        id: row.get(0)?,
                        poll_id: row.get(1)?,
                        option_text: row.get(2)?,
                        votes_count: row.get(3)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;

            let voted_option: Option<i64> = match viewer_id {
                Some(uid) => query_voted_option(conn, poll_id, uid)?,
                None => None,
            };

            let total_votes: i64 = options.iter().map(|o| o.votes_count).sum();

            Ok(PollView {
                id: poll.id,
                question: poll.question,
                total_votes,
                user_has_voted: voted_option.is_some(),
                options: options
                    .into_iter()
                    .map(|o| PollOptionView {
                        user_voted: voted_option == Some(o.id),
                        percentage: percentage(o.votes_count, total_votes),
                        id: o.id,
                        text: o.option_text,
                        votes_count: o.votes_count,
                    })
                    .collect(),
            })
        })
    }
}

/// Per-option share of the vote, rounded independently. Defined as 0 when
/// the poll has no votes. Rounded percentages may not sum to exactly 100;
/// the client renders each option on its own, so no redistribution is done.
pub fn percentage(votes: i64, total: i64) -> i64 {
    if total <= 0 {
        return 0;
    }
    ((votes as f64 / total as f64) * 100.0).round() as i64
}

fn query_poll(conn: &Connection, id: i64) -> Result<Option<PollRow>, StoreError> {
    let row = conn
        .prepare(
            "SELECT id, post_id, author_id, question, created_at
             FROM polls WHERE id = ?1",
        )?
        .query_row([id], |row| {
            Ok(PollRow {
                id: row.get(0)?,
                post_id: row.get(1)?,
                author_id: row.get(2)?,
                question: row.get(3)?,
                created_at: row.get(4)?,
            })
        })
        .optional()?;
    Ok(row)
}

fn query_voted_option(
    conn: &Connection,
    poll_id: i64,
    user_id: i64,
) -> Result<Option<i64>, StoreError> {
    let row = conn
        .query_row(
            "SELECT option_id FROM poll_votes WHERE poll_id = ?1 AND user_id = ?2",
            [poll_id, user_id],
            |r| r.get(0),
        )
        .optional()?;
    Ok(row)
}

#[cfg(test)]
mod tests {
    use super::percentage;
    use crate::{Database, StoreError};

    fn seed_user(db: &Database, name: &str) -> i64 {
        db.create_user(name, "hash", None).unwrap().id
    }

    fn seed_post(db: &Database, author: i64) -> i64 {
        db.create_post(author, Some("poll host"), None, None).unwrap().id
    }

    fn opts(texts: &[&str]) -> Vec<String> {
        texts.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn poll_requires_two_options() {
        let db = Database::open_in_memory().unwrap();
        let author = seed_user(&db, "author");
        let post = seed_post(&db, author);

        let err = db
            .create_poll(post, author, "favorite?", &opts(&["only one"]))
            .unwrap_err();
        match err {
            StoreError::InvalidArgument(msg) => {
                assert_eq!(msg, "at least 2 options required")
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let err = db
            .create_poll(post, author, "   ", &opts(&["a", "b"]))
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidArgument(_)));
    }

    #[test]
    fn fresh_poll_round_trip() {
        let db = Database::open_in_memory().unwrap();
        let author = seed_user(&db, "author");
        let post = seed_post(&db, author);

        let poll_id = db
            .create_poll(post, author, "Which platform?", &opts(&["iOS", "Android"]))
            .unwrap();

        let view = db.fetch_poll(poll_id, Some(author)).unwrap();
        assert_eq!(view.question, "Which platform?");
        assert_eq!(view.total_votes, 0);
        assert!(!view.user_has_voted);

        let texts: Vec<&str> = view.options.iter().map(|o| o.text.as_str()).collect();
        assert_eq!(texts, ["iOS", "Android"]);
        for option in &view.options {
            assert_eq!(option.votes_count, 0);
            assert_eq!(option.percentage, 0);
            assert!(!option.user_voted);
        }
    }

    #[test]
    fn second_vote_is_rejected_and_count_moves_once() {
        let db = Database::open_in_memory().unwrap();
        let author = seed_user(&db, "author");
        let voter = seed_user(&db, "voter");
        let post = seed_post(&db, author);
        let poll_id = db
            .create_poll(post, author, "pick", &opts(&["a", "b"]))
            .unwrap();
        let view = db.fetch_poll(poll_id, None).unwrap();
        let first_option = view.options[0].id;
        let second_option = view.options[1].id;

        db.cast_vote(poll_id, first_option, voter).unwrap();
        let err = db.cast_vote(poll_id, first_option, voter).unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        // Changing to another option is rejected too: votes are final.
        let err = db.cast_vote(poll_id, second_option, voter).unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));

        let view = db.fetch_poll(poll_id, Some(voter)).unwrap();
        assert_eq!(view.total_votes, 1);
        assert!(view.user_has_voted);
        assert!(view.options[0].user_voted);
        assert!(!view.options[1].user_voted);
    }

    #[test]
    fn option_must_belong_to_poll() {
        let db = Database::open_in_memory().unwrap();
        let author = seed_user(&db, "author");
        let voter = seed_user(&db, "voter");
        let post = seed_post(&db, author);
        let first = db
            .create_poll(post, author, "first", &opts(&["a", "b"]))
            .unwrap();
        let second = db
            .create_poll(post, author, "second", &opts(&["c", "d"]))
            .unwrap();
        let foreign_option = db.fetch_poll(second, None).unwrap().options[0].id;

        let err = db.cast_vote(first, foreign_option, voter).unwrap_err();
        assert!(matches!(err, StoreError::InvalidArgument(_)));

        let err = db.cast_vote(first, 9999, voter).unwrap_err();
        assert!(matches!(err, StoreError::NotFound("poll option")));
    }

    #[test]
    fn aggregation_scenario_75_25() {
        let db = Database::open_in_memory().unwrap();
        let author = seed_user(&db, "author");
        let post = seed_post(&db, author);
        let poll_id = db
            .create_poll(post, author, "Which platform?", &opts(&["iOS", "Android"]))
            .unwrap();
        let view = db.fetch_poll(poll_id, None).unwrap();
        let (ios, android) = (view.options[0].id, view.options[1].id);

        for name in ["v1", "v2", "v3"] {
            let voter = seed_user(&db, name);
            db.cast_vote(poll_id, ios, voter).unwrap();
        }
        let v4 = seed_user(&db, "v4");
        db.cast_vote(poll_id, android, v4).unwrap();

        let view = db.fetch_poll(poll_id, Some(v4)).unwrap();
        assert_eq!(view.total_votes, 4);
        assert_eq!(view.options[0].votes_count, 3);
        assert_eq!(view.options[0].percentage, 75);
        assert_eq!(view.options[1].percentage, 25);
        assert!(view.user_has_voted);
        assert!(!view.options[0].user_voted);
        assert!(view.options[1].user_voted);

        // total_votes is exactly the sum of the per-option counters.
        let sum: i64 = view.options.iter().map(|o| o.votes_count).sum();
        assert_eq!(view.total_votes, sum);
    }

    #[test]
    fn percentages_round_independently() {
        assert_eq!(percentage(0, 0), 0);
        assert_eq!(percentage(1, 3), 33);
        assert_eq!(percentage(2, 3), 67);
        assert_eq!(percentage(1, 2), 50);

        // Three-way tie: 33 + 33 + 33 = 99, and that's by contract.
        let each = percentage(1, 3);
        assert_eq!(each * 3, 99);
    }
}
