use rusqlite::{params, Connection};

/// Record a user's vote on a post and keep the denormalized points total in
/// step with the ledger.
///
/// The existing-entry read happens before the transaction; a re-vote in the
/// same direction is a deliberate no-op rather than an error. Two concurrent
/// identical votes from the same user can therefore race past that check —
/// an acknowledged gap, inherited from the original contract.
///
/// `real_value` must already be normalized to +1 or -1. The write pair
/// (ledger row + points delta) commits atomically or not at all.
pub fn cast_vote(
    conn: &mut Connection,
    post_id: i64,
    user_id: i64,
    real_value: i64,
) -> Result<(), rusqlite::Error> {
    let existing: Result<i64, rusqlite::Error> = conn.query_row(
        "SELECT value FROM updoots WHERE post_id = ?1 AND user_id = ?2",
        params![post_id, user_id],
        |row| row.get(0),
    );

    match existing {
        // Changing an earlier vote: the old contribution is removed and the
        // new one added in a single delta, hence the factor of 2.
        Ok(previous) if previous != real_value => {
            let tx = conn.transaction()?;
            tx.execute(
                "UPDATE updoots SET value = ?1 WHERE post_id = ?2 AND user_id = ?3",
                params![real_value, post_id, user_id],
            )?;
            tx.execute(
                "UPDATE posts SET points = points + ?1 WHERE id = ?2",
                params![2 * real_value, post_id],
            )?;
            tx.commit()
        }
        // Same direction as before: nothing to do
        Ok(_) => Ok(()),
        // First vote on this post
        Err(rusqlite::Error::QueryReturnedNoRows) => {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO updoots (post_id, user_id, value) VALUES (?1, ?2, ?3)",
                params![post_id, user_id, real_value],
            )?;
            tx.execute(
                "UPDATE posts SET points = points + ?1 WHERE id = ?2",
                params![real_value, post_id],
            )?;
            tx.commit()
        }
        Err(e) => Err(e),
    }
}

/// The caller's current ledger value for a post, if any.
pub fn vote_status(
    conn: &Connection,
    post_id: i64,
    user_id: i64,
) -> Result<Option<i64>, rusqlite::Error> {
    let value: Result<i64, rusqlite::Error> = conn.query_row(
        "SELECT value FROM updoots WHERE post_id = ?1 AND user_id = ?2",
        params![post_id, user_id],
        |row| row.get(0),
    );

    match value {
        Ok(v) => Ok(Some(v)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e),
    }
}
