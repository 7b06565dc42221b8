use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post, put},
    Router,
};

use crate::backend::storage::MAX_OBJECT_BYTES;
use crate::backend::{handlers, AppState};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/api/auth/signup", post(handlers::sign_up))
        .route("/api/auth/token", post(handlers::sign_in))
        .route("/api/auth/logout", post(handlers::sign_out))
        .route("/api/auth/user", get(handlers::current_user))
}

pub fn rest_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/rest/profiles/me",
            get(handlers::my_profile).patch(handlers::update_my_profile),
        )
        .route("/api/rest/wallet", get(handlers::wallet))
        .route(
            "/api/rest/expenses",
            get(handlers::list_expenses).post(handlers::create_expense),
        )
        .route(
            "/api/rest/expenses/:id",
            get(handlers::get_expense).delete(handlers::delete_expense),
        )
        .route(
            "/api/rest/expenses/:id/comments",
            get(handlers::list_comments).post(handlers::create_comment),
        )
        .route(
            "/api/rest/incomes",
            get(handlers::list_incomes).post(handlers::create_income),
        )
        .route("/api/rest/incomes/:id", delete(handlers::delete_income))
}

pub fn storage_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/storage/:bucket/:name",
            put(handlers::upload_object).layer(DefaultBodyLimit::max(MAX_OBJECT_BYTES + 1)),
        )
        .route("/api/storage/public/:bucket/:name", get(handlers::public_object))
}
