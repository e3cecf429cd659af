use axum::extract::FromRequestParts;
use axum::http::header;
use axum::http::request::Parts;
use rusqlite::params;

use crate::error::AppError;
use crate::graphql::CallerSession;
use crate::state::AppState;

/// Resolves the session cookie to a caller identity. Never rejects for a
/// missing or stale cookie; anonymous requests simply carry no user id (the
/// feed is public, and logout still needs the raw token to clear state).
impl FromRequestParts<AppState> for CallerSession {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(token) = extract_session_token(parts, &state.config.auth.cookie_name) else {
            return Ok(CallerSession::anonymous());
        };

        let conn = state.db.get()?;
        let user_id: Result<i64, rusqlite::Error> = conn.query_row(
            "SELECT u.id FROM sessions s \
             JOIN users u ON u.id = s.user_id \
             WHERE s.token = ?1 AND s.expires_at > datetime('now')",
            params![token],
            |row| row.get(0),
        );

        match user_id {
            Ok(id) => Ok(CallerSession {
                user_id: Some(id),
                token: Some(token),
            }),
            // Expired or unknown token: anonymous, but keep the token so a
            // logout can still expire the cookie
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(CallerSession {
                user_id: None,
                token: Some(token),
            }),
            Err(e) => Err(e.into()),
        }
    }
}

fn extract_session_token(parts: &Parts, cookie_name: &str) -> Option<String> {
    parts
        .headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|s| s.split(';'))
        .map(|s| s.trim())
        .find_map(|cookie| {
            let mut split = cookie.splitn(2, '=');
            let key = split.next()?.trim();
            let val = split.next()?.trim();
            if key == cookie_name {
                Some(val.to_string())
            } else {
                None
            }
        })
}
