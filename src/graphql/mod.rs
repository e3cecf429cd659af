pub mod loaders;
pub mod mutations;
pub mod queries;
pub mod schema;
pub mod types;

pub use schema::{build_schema, ForumSchema};

/// Caller identity for one GraphQL request, resolved from the session
/// cookie before execution. `user_id` is None for anonymous callers; `token`
/// is kept so logout can drop the backing session row.
#[derive(Debug, Clone, Default)]
pub struct CallerSession {
    pub user_id: Option<i64>,
    pub token: Option<String>,
}

impl CallerSession {
    pub fn anonymous() -> Self {
        Self::default()
    }
}
