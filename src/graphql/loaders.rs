use async_graphql::dataloader::Loader;
use std::collections::HashMap;

use crate::graphql::types::User;
use crate::state::DbPool;

/// Batches user lookups by id so one feed page costs one users query
/// instead of one per post.
pub struct UserLoader {
    pool: DbPool,
}

impl UserLoader {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl Loader<i64> for UserLoader {
    type Value = User;
    type Error = String;

    async fn load(&self, keys: &[i64]) -> Result<HashMap<i64, Self::Value>, Self::Error> {
        let conn = self.pool.get().map_err(|e| e.to_string())?;

        let placeholders = vec!["?"; keys.len()].join(",");
        let sql = format!(
            "SELECT id, username, email, created_at FROM users WHERE id IN ({})",
            placeholders
        );

        let mut stmt = conn.prepare(&sql).map_err(|e| e.to_string())?;
        let users = stmt
            .query_map(rusqlite::params_from_iter(keys.iter()), |row| {
                Ok(User {
                    id: row.get(0)?,
                    username: row.get(1)?,
                    email: row.get(2)?,
                    created_at: row.get(3)?,
                })
            })
            .map_err(|e| e.to_string())?
            .map(|r| r.map(|u| (u.id, u)))
            .collect::<Result<HashMap<_, _>, _>>()
            .map_err(|e| e.to_string())?;

        Ok(users)
    }
}

/// Batches the caller's ledger lookups by (post_id, user_id) so resolving
/// voteStatus across a page is a single query.
pub struct UpdootLoader {
    pool: DbPool,
}

impl UpdootLoader {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl Loader<(i64, i64)> for UpdootLoader {
    type Value = i64;
    type Error = String;

    async fn load(
        &self,
        keys: &[(i64, i64)],
    ) -> Result<HashMap<(i64, i64), Self::Value>, Self::Error> {
        let conn = self.pool.get().map_err(|e| e.to_string())?;

        let clause = vec!["(post_id = ? AND user_id = ?)"; keys.len()].join(" OR ");
        let sql = format!("SELECT post_id, user_id, value FROM updoots WHERE {}", clause);

        let params: Vec<i64> = keys.iter().flat_map(|&(p, u)| [p, u]).collect();

        let mut stmt = conn.prepare(&sql).map_err(|e| e.to_string())?;
        let entries = stmt
            .query_map(rusqlite::params_from_iter(params.iter()), |row| {
                Ok(((row.get(0)?, row.get(1)?), row.get(2)?))
            })
            .map_err(|e| e.to_string())?
            .collect::<Result<HashMap<_, _>, _>>()
            .map_err(|e| e.to_string())?;

        Ok(entries)
    }
}
