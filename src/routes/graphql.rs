use async_graphql::dataloader::DataLoader;
use async_graphql::http::{playground_source, GraphQLPlaygroundConfig};
use axum::extract::State;
use axum::http::{HeaderName, HeaderValue};
use axum::response::{Html, IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;

use crate::graphql::loaders::{UpdootLoader, UserLoader};
use crate::graphql::CallerSession;
use crate::state::AppState;

/// GraphQL endpoint handler. Each request gets its own loader instances so
/// the batching caches never outlive one response.
async fn graphql_handler(
    State(state): State<AppState>,
    session: CallerSession,
    Json(req): Json<async_graphql::Request>,
) -> Response {
    let request = req
        .data(state.db.clone())
        .data(state.config.auth.clone())
        .data(session)
        .data(DataLoader::new(
            UserLoader::new(state.db.clone()),
            tokio::spawn,
        ))
        .data(DataLoader::new(
            UpdootLoader::new(state.db.clone()),
            tokio::spawn,
        ));

    let gql_response = state.graphql_schema.execute(request).await;

    // Cookie headers set by login/register/logout ride along on the GraphQL
    // response object and have to be copied onto the HTTP response.
    let headers: Vec<(String, Vec<u8>)> = gql_response
        .http_headers
        .iter()
        .map(|(name, value)| (name.to_string(), value.as_bytes().to_vec()))
        .collect();

    let mut response = Json(gql_response).into_response();
    for (name, value) in headers {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_bytes(&value),
        ) {
            response.headers_mut().append(name, value);
        }
    }

    response
}

/// GraphQL Playground UI (development tool)
async fn graphql_playground() -> impl IntoResponse {
    Html(playground_source(GraphQLPlaygroundConfig::new("/graphql")))
}

/// GraphQL router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/graphql", post(graphql_handler))
        .route("/graphql/playground", get(graphql_playground))
}
