use async_graphql::*;
use rusqlite::params;

use crate::db;
use crate::graphql::types::{PaginatedPosts, Post, User};
use crate::graphql::CallerSession;
use crate::state::DbPool;

/// GraphQL Query root
pub struct QueryRoot;

#[Object]
impl QueryRoot {
    /// The post feed, newest first. `cursor` is the createdAt of the last
    /// post from the previous page (epoch ms); `limit` is capped at 50.
    async fn posts(
        &self,
        ctx: &Context<'_>,
        limit: i64,
        cursor: Option<String>,
    ) -> Result<PaginatedPosts> {
        let pool = ctx.data::<DbPool>()?;
        let conn = pool.get()?;

        let cursor = cursor
            .map(|c| c.parse::<i64>())
            .transpose()
            .map_err(|_| Error::new("invalid cursor"))?;

        Ok(db::posts::list_posts(&conn, limit, cursor)?)
    }

    /// A single post by id, or null
    async fn post(&self, ctx: &Context<'_>, id: i64) -> Result<Option<Post>> {
        let pool = ctx.data::<DbPool>()?;
        let conn = pool.get()?;
        Ok(db::posts::find_post(&conn, id)?)
    }

    /// The currently signed-in user, or null
    async fn me(&self, ctx: &Context<'_>) -> Result<Option<User>> {
        let session = ctx.data::<CallerSession>()?;
        let Some(user_id) = session.user_id else {
            return Ok(None);
        };

        let pool = ctx.data::<DbPool>()?;
        let conn = pool.get()?;

        let user: Result<User, rusqlite::Error> = conn.query_row(
            "SELECT id, username, email, created_at FROM users WHERE id = ?1",
            params![user_id],
            |row| {
                Ok(User {
                    id: row.get(0)?,
                    username: row.get(1)?,
                    email: row.get(2)?,
                    created_at: row.get(3)?,
                })
            },
        );

        match user {
            Ok(u) => Ok(Some(u)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
