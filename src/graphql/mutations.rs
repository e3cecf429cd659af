use async_graphql::*;
use chrono::Utc;
use rusqlite::params;

use crate::auth::{password, session};
use crate::config::AuthConfig;
use crate::db;
use crate::graphql::types::{Post, PostInput, User, UserResponse, UsernamePasswordInput};
use crate::graphql::CallerSession;
use crate::state::DbPool;

/// GraphQL Mutation root
pub struct MutationRoot;

#[Object]
impl MutationRoot {
    /// Register a new account and sign the caller in
    async fn register(
        &self,
        ctx: &Context<'_>,
        options: UsernamePasswordInput,
    ) -> Result<UserResponse> {
        if let Some(errors) = validate_register(&options) {
            return Ok(errors);
        }

        let pool = ctx.data::<DbPool>()?;
        let hash = password::hash_password(&options.password)
            .map_err(|e| Error::new(format!("failed to hash password: {}", e)))?;

        let user = {
            let conn = pool.get()?;
            let created_at = Utc::now().timestamp_millis();
            let inserted = conn.execute(
                "INSERT INTO users (username, email, password_hash, created_at) \
                 VALUES (?1, ?2, ?3, ?4)",
                params![options.username, options.email, hash, created_at],
            );

            match inserted {
                Ok(_) => User {
                    id: conn.last_insert_rowid(),
                    username: options.username.clone(),
                    email: options.email.clone(),
                    created_at,
                },
                // Unique constraint on username/email
                Err(rusqlite::Error::SqliteFailure(e, _))
                    if e.code == rusqlite::ErrorCode::ConstraintViolation =>
                {
                    return Ok(UserResponse::error("username", "username already taken"));
                }
                Err(e) => return Err(e.into()),
            }
        };

        sign_in(ctx, pool, user.id)?;
        Ok(UserResponse::success(user))
    }

    /// Log in with a username or an email address
    async fn login(
        &self,
        ctx: &Context<'_>,
        username_or_email: String,
        password: String,
    ) -> Result<UserResponse> {
        let pool = ctx.data::<DbPool>()?;

        let column = if username_or_email.contains('@') {
            "email"
        } else {
            "username"
        };

        let found: Result<(User, String), rusqlite::Error> = {
            let conn = pool.get()?;
            conn.query_row(
                &format!(
                    "SELECT id, username, email, created_at, password_hash \
                     FROM users WHERE {} = ?1",
                    column
                ),
                params![username_or_email],
                |row| {
                    Ok((
                        User {
                            id: row.get(0)?,
                            username: row.get(1)?,
                            email: row.get(2)?,
                            created_at: row.get(3)?,
                        },
                        row.get(4)?,
                    ))
                },
            )
        };

        let (user, hash) = match found {
            Ok(pair) => pair,
            Err(rusqlite::Error::QueryReturnedNoRows) => {
                return Ok(UserResponse::error(
                    "usernameOrEmail",
                    "that username doesn't exist",
                ));
            }
            Err(e) => return Err(e.into()),
        };

        if !password::verify_password(&password, &hash) {
            return Ok(UserResponse::error("password", "incorrect password"));
        }

        sign_in(ctx, pool, user.id)?;
        Ok(UserResponse::success(user))
    }

    /// Destroy the caller's session and expire the cookie
    async fn logout(&self, ctx: &Context<'_>) -> Result<bool> {
        let caller = ctx.data::<CallerSession>()?;
        let auth = ctx.data::<AuthConfig>()?;

        if let Some(ref token) = caller.token {
            let pool = ctx.data::<DbPool>()?;
            session::delete_session(pool, token)?;
        }

        ctx.append_http_header("Set-Cookie", session::clear_cookie(&auth.cookie_name));
        Ok(true)
    }

    /// Cast or change a vote on a post. `value` of -1 means downvote;
    /// any other value means upvote. Returns success only, never the new
    /// total.
    async fn vote(&self, ctx: &Context<'_>, post_id: i64, value: i64) -> Result<bool> {
        let caller = ctx.data::<CallerSession>()?;
        let user_id = caller.user_id.ok_or_else(|| Error::new("not authenticated"))?;

        let is_updoot = value != -1;
        let real_value = if is_updoot { 1 } else { -1 };

        let pool = ctx.data::<DbPool>()?;
        let mut conn = pool.get()?;
        db::votes::cast_vote(&mut conn, post_id, user_id, real_value)?;

        Ok(true)
    }

    /// Create a post owned by the caller
    async fn create_post(&self, ctx: &Context<'_>, input: PostInput) -> Result<Post> {
        let caller = ctx.data::<CallerSession>()?;
        let user_id = caller.user_id.ok_or_else(|| Error::new("not authenticated"))?;

        let pool = ctx.data::<DbPool>()?;
        let conn = pool.get()?;
        Ok(db::posts::create_post(&conn, user_id, &input.title, &input.text)?)
    }

    /// Update a post's title and text. Null when the post does not exist or
    /// the caller does not own it.
    async fn update_post(
        &self,
        ctx: &Context<'_>,
        id: i64,
        title: String,
        text: String,
    ) -> Result<Option<Post>> {
        let caller = ctx.data::<CallerSession>()?;
        let user_id = caller.user_id.ok_or_else(|| Error::new("not authenticated"))?;

        let pool = ctx.data::<DbPool>()?;
        let conn = pool.get()?;
        Ok(db::posts::update_post(&conn, id, user_id, &title, &text)?)
    }

    /// Delete a post the caller owns. Always reports true, whether or not a
    /// row was actually removed; "not found" and "not owned" are not
    /// distinguished.
    async fn delete_post(&self, ctx: &Context<'_>, id: i64) -> Result<bool> {
        let caller = ctx.data::<CallerSession>()?;
        let Some(user_id) = caller.user_id else {
            // An anonymous caller owns nothing; nothing is removed
            return Ok(true);
        };

        let pool = ctx.data::<DbPool>()?;
        let conn = pool.get()?;
        db::posts::delete_post(&conn, id, user_id)?;
        Ok(true)
    }
}

/// Open a session for the user and attach the cookie to the HTTP response.
fn sign_in(ctx: &Context<'_>, pool: &DbPool, user_id: i64) -> Result<()> {
    let auth = ctx.data::<AuthConfig>()?;
    let token = session::create_session(pool, user_id, auth.session_hours)?;
    ctx.append_http_header(
        "Set-Cookie",
        session::session_cookie(&auth.cookie_name, &token, auth.session_hours),
    );
    Ok(())
}

fn validate_register(options: &UsernamePasswordInput) -> Option<UserResponse> {
    if !options.email.contains('@') {
        return Some(UserResponse::error("email", "invalid email"));
    }
    if options.username.chars().count() <= 2 {
        return Some(UserResponse::error(
            "username",
            "length must be greater than 2",
        ));
    }
    if options.username.contains('@') {
        return Some(UserResponse::error("username", "cannot include an @"));
    }
    if options.password.chars().count() <= 2 {
        return Some(UserResponse::error(
            "password",
            "length must be greater than 2",
        ));
    }
    None
}
