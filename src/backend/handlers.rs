// src/backend/handlers.rs
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::backend::auth::{self, AuthUser};
use crate::backend::storage::{self, Bucket};
use crate::backend::AppState;
use crate::database::db::queries;
use crate::database::models::{
    Comment, Credentials, Expense, Income, NewComment, NewExpense, NewIncome, Profile,
    ProfileUpdate, Session, User, Wallet, MAX_AMOUNT,
};
use crate::error::{PlatformError, PlatformResult};

#[derive(Debug, Serialize, Deserialize)]
pub struct StoredObject {
    pub bucket: String,
    pub name: String,
    pub public_url: String,
}

/* ========== auth ========== */

pub async fn sign_up(
    State(state): State<AppState>,
    Json(creds): Json<Credentials>,
) -> PlatformResult<(StatusCode, Json<User>)> {
    let user = auth::sign_up(&state, &creds).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn sign_in(
    State(state): State<AppState>,
    Json(creds): Json<Credentials>,
) -> PlatformResult<Json<Session>> {
    Ok(Json(auth::sign_in(&state, &creds).await?))
}

pub async fn sign_out(State(state): State<AppState>, caller: AuthUser) -> PlatformResult<StatusCode> {
    queries::delete_session(&state.db, &caller.token).await?;
    tracing::info!(user_id = %caller.user.id, "signed out");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn current_user(caller: AuthUser) -> Json<User> {
    Json(caller.user)
}

/* ========== profiles ========== */

pub async fn my_profile(caller: AuthUser) -> Json<Profile> {
    Json(caller.profile)
}

pub async fn update_my_profile(
    State(state): State<AppState>,
    caller: AuthUser,
    Json(update): Json<ProfileUpdate>,
) -> PlatformResult<Json<Profile>> {
    let profile = queries::update_profile(&state.db, &caller.user.id, &update)
        .await?
        .ok_or_else(|| PlatformError::NotFound("profile".into()))?;
    tracing::info!(user_id = %caller.user.id, "profile updated");
    Ok(Json(profile))
}

/* ========== wallet ========== */

pub async fn wallet(State(state): State<AppState>, _caller: AuthUser) -> PlatformResult<Json<Wallet>> {
    Ok(Json(queries::get_wallet(&state.db).await?))
}

/* ========== expenses ========== */

fn check_entry(label: &str, text: &str, amount: i64) -> PlatformResult<String> {
    let text = text.trim();
    if text.is_empty() {
        return Err(PlatformError::Validation(format!("{label} must not be empty")));
    }
    if amount <= 0 {
        return Err(PlatformError::Validation("amount must be greater than 0".into()));
    }
    if amount > MAX_AMOUNT {
        let msg = format!("amount must not exceed {MAX_AMOUNT}");
        return Err(PlatformError::Validation(msg));
    }
    Ok(text.to_string())
}

pub async fn list_expenses(
    State(state): State<AppState>,
    _caller: AuthUser,
) -> PlatformResult<Json<Vec<Expense>>> {
    Ok(Json(queries::list_expenses(&state.db).await?))
}

pub async fn get_expense(
    State(state): State<AppState>,
    _caller: AuthUser,
    Path(id): Path<i64>,
) -> PlatformResult<Json<Expense>> {
    queries::get_expense(&state.db, id)
        .await?
        .map(Json)
        .ok_or_else(|| PlatformError::NotFound(format!("expense {id}")))
}

pub async fn create_expense(
    State(state): State<AppState>,
    caller: AuthUser,
    Json(mut payload): Json<NewExpense>,
) -> PlatformResult<(StatusCode, Json<Expense>)> {
    caller.require_admin()?;
    payload.title = check_entry("title", &payload.title, payload.amount)?;

    let expense = queries::create_expense(&state.db, &payload, &caller.user.id).await?;
    tracing::info!(expense_id = expense.id, amount = expense.amount, "expense recorded");
    Ok((StatusCode::CREATED, Json(expense)))
}

pub async fn delete_expense(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(id): Path<i64>,
) -> PlatformResult<StatusCode> {
    caller.require_admin()?;
    if !queries::delete_expense(&state.db, id).await? {
        return Err(PlatformError::NotFound(format!("expense {id}")));
    }
    tracing::info!(expense_id = id, "expense deleted");
    Ok(StatusCode::NO_CONTENT)
}

/* ========== incomes ========== */

pub async fn list_incomes(
    State(state): State<AppState>,
    _caller: AuthUser,
) -> PlatformResult<Json<Vec<Income>>> {
    Ok(Json(queries::list_incomes(&state.db).await?))
}

pub async fn create_income(
    State(state): State<AppState>,
    caller: AuthUser,
    Json(mut payload): Json<NewIncome>,
) -> PlatformResult<(StatusCode, Json<Income>)> {
    caller.require_admin()?;
    payload.source = check_entry("source", &payload.source, payload.amount)?;

    let income = queries::create_income(&state.db, &payload, &caller.user.id).await?;
    tracing::info!(income_id = income.id, amount = income.amount, "income recorded");
    Ok((StatusCode::CREATED, Json(income)))
}

pub async fn delete_income(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(id): Path<i64>,
) -> PlatformResult<StatusCode> {
    caller.require_admin()?;
    if !queries::delete_income(&state.db, id).await? {
        return Err(PlatformError::NotFound(format!("income {id}")));
    }
    tracing::info!(income_id = id, "income deleted");
    Ok(StatusCode::NO_CONTENT)
}

/* ========== comments ========== */

pub async fn list_comments(
    State(state): State<AppState>,
    _caller: AuthUser,
    Path(expense_id): Path<i64>,
) -> PlatformResult<Json<Vec<Comment>>> {
    if queries::get_expense(&state.db, expense_id).await?.is_none() {
        return Err(PlatformError::NotFound(format!("expense {expense_id}")));
    }
    Ok(Json(queries::list_comments(&state.db, expense_id).await?))
}

// Any signed-in user may comment
pub async fn create_comment(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(expense_id): Path<i64>,
    Json(payload): Json<NewComment>,
) -> PlatformResult<(StatusCode, Json<Comment>)> {
    let content = payload.content.trim();
    if content.is_empty() {
        return Err(PlatformError::Validation("comment must not be empty".into()));
    }
    if queries::get_expense(&state.db, expense_id).await?.is_none() {
        return Err(PlatformError::NotFound(format!("expense {expense_id}")));
    }

    let comment = queries::create_comment(&state.db, expense_id, &caller.user.id, content).await?;
    tracing::info!(expense_id, comment_id = comment.id, "comment added");
    Ok((StatusCode::CREATED, Json(comment)))
}

/* ========== storage ========== */

pub async fn upload_object(
    State(state): State<AppState>,
    _caller: AuthUser,
    Path((bucket, name)): Path<(String, String)>,
    body: Bytes,
) -> PlatformResult<(StatusCode, Json<StoredObject>)> {
    let bucket: Bucket = bucket.parse()?;
    let name = state.storage.put(bucket, &name, &body).await?;

    Ok((
        StatusCode::CREATED,
        Json(StoredObject {
            bucket: bucket.to_string(),
            public_url: state.storage.public_url(bucket, &name),
            name,
        }),
    ))
}

pub async fn public_object(
    State(state): State<AppState>,
    Path((bucket, name)): Path<(String, String)>,
) -> PlatformResult<impl IntoResponse> {
    let bucket: Bucket = bucket.parse()?;
    let bytes = state.storage.get(bucket, &name).await?;
    Ok(([(header::CONTENT_TYPE, storage::content_type_for(&name))], bytes))
}
