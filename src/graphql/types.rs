use async_graphql::dataloader::DataLoader;
use async_graphql::*;
use serde::{Deserialize, Serialize};

use crate::graphql::loaders::{UpdootLoader, UserLoader};
use crate::graphql::CallerSession;

/// A forum user
#[derive(Clone, Debug, Serialize, Deserialize, SimpleObject)]
#[graphql(complex)]
pub struct User {
    pub id: i64,

    pub username: String,

    /// Only shown to the user themself; everyone else sees "".
    #[graphql(skip)]
    pub email: String,

    /// Epoch milliseconds
    #[graphql(skip)]
    pub created_at: i64,
}

#[ComplexObject]
impl User {
    async fn email(&self, ctx: &Context<'_>) -> Result<String> {
        let session = ctx.data::<CallerSession>()?;
        if session.user_id == Some(self.id) {
            Ok(self.email.clone())
        } else {
            Ok(String::new())
        }
    }

    async fn created_at(&self) -> String {
        self.created_at.to_string()
    }
}

/// A forum post with its denormalized vote total
#[derive(Clone, Debug, Serialize, Deserialize, SimpleObject)]
#[graphql(complex)]
pub struct Post {
    pub id: i64,

    pub creator_id: i64,

    pub title: String,

    pub text: String,

    /// Running sum of all ledger entries for this post
    pub points: i64,

    /// Epoch milliseconds; doubles as the feed pagination cursor
    #[graphql(skip)]
    pub created_at: i64,

    /// Epoch milliseconds
    #[graphql(skip)]
    pub updated_at: i64,
}

#[ComplexObject]
impl Post {
    /// The post body truncated for feed display
    async fn text_snippet(&self) -> String {
        snippet(&self.text)
    }

    /// The user who created this post, batched across one page response
    async fn creator(&self, ctx: &Context<'_>) -> Result<User> {
        let loader = ctx.data::<DataLoader<UserLoader>>()?;
        loader
            .load_one(self.creator_id)
            .await?
            .ok_or_else(|| Error::new(format!("creator {} not found", self.creator_id)))
    }

    /// The caller's own vote on this post (+1 / -1), null if they never
    /// voted or are not logged in
    async fn vote_status(&self, ctx: &Context<'_>) -> Result<Option<i64>> {
        let session = ctx.data::<CallerSession>()?;
        let Some(user_id) = session.user_id else {
            return Ok(None);
        };

        let loader = ctx.data::<DataLoader<UpdootLoader>>()?;
        Ok(loader.load_one((self.id, user_id)).await?)
    }

    async fn created_at(&self) -> String {
        self.created_at.to_string()
    }

    async fn updated_at(&self) -> String {
        self.updated_at.to_string()
    }
}

/// First 100 characters of the text, with an ellipsis marker when truncated.
/// Texts of 99 characters or fewer come back verbatim.
pub fn snippet(text: &str) -> String {
    if text.chars().count() > 99 {
        let cut: String = text.chars().take(100).collect();
        format!("{}...", cut)
    } else {
        text.to_string()
    }
}

/// One page of the post feed
#[derive(SimpleObject)]
pub struct PaginatedPosts {
    pub posts: Vec<Post>,

    /// True when another page exists past the last post's createdAt
    pub has_more: bool,
}

/// Input for creating a post
#[derive(InputObject)]
pub struct PostInput {
    pub title: String,
    pub text: String,
}

/// Input for registering a new user
#[derive(InputObject)]
pub struct UsernamePasswordInput {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// A validation failure tied to a specific input field
#[derive(Clone, SimpleObject)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &str, message: &str) -> Self {
        Self {
            field: field.to_string(),
            message: message.to_string(),
        }
    }
}

/// Result of register/login: field errors or the signed-in user
#[derive(SimpleObject)]
pub struct UserResponse {
    pub errors: Option<Vec<FieldError>>,
    pub user: Option<User>,
}

// Constructor names must not shadow the derived field resolvers (`user`,
// `errors`), or the derive's inherent impl collides with this one.
impl UserResponse {
    pub fn success(user: User) -> Self {
        Self {
            errors: None,
            user: Some(user),
        }
    }

    pub fn error(field: &str, message: &str) -> Self {
        Self {
            errors: Some(vec![FieldError::new(field, message)]),
            user: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snippet_returns_short_text_verbatim() {
        assert_eq!(snippet("hello"), "hello");
        assert_eq!(snippet(""), "");
    }

    #[test]
    fn snippet_boundary_99_chars_unchanged() {
        let text: String = "a".repeat(99);
        assert_eq!(snippet(&text), text);
    }

    #[test]
    fn snippet_boundary_100_chars_truncated() {
        let text: String = "a".repeat(100);
        let expected = format!("{}...", "a".repeat(100));
        assert_eq!(snippet(&text), expected);
    }

    #[test]
    fn snippet_long_text_cut_to_100() {
        let text: String = "b".repeat(250);
        let out = snippet(&text);
        assert!(out.ends_with("..."));
        assert_eq!(out.chars().count(), 103);
    }

    #[test]
    fn user_response_success_shape() {
        let resp = UserResponse::success(User {
            id: 1,
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            created_at: 0,
        });
        assert!(resp.errors.is_none());
        assert_eq!(resp.user.unwrap().username, "alice");
    }

    #[test]
    fn user_response_error_shape() {
        let resp = UserResponse::error("username", "username already taken");
        assert!(resp.user.is_none());
        let errors = resp.errors.unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "username");
    }
}
