use sqlx::{Pool, Sqlite};

use crate::database::models::{
    Comment, Expense, Income, NewExpense, NewIncome, Profile, ProfileUpdate, Role, User,
    UserRecord, Wallet,
};

/*
All SQL the platform runs lives here.
Balance bookkeeping is NOT done in this file: the triggers in
migrations/0001_init.sql adjust the wallet on every insert/delete.
 */

/*==========User & Session Queries=========== */

// Create a user together with its profile row
pub async fn create_user(
    pool: &Pool<Sqlite>,
    user_id: &str,
    email: &str,
    password_hash: &str,
    role: Role,
) -> Result<User, sqlx::Error> {
    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        INSERT INTO users (id, email, password_hash)
        VALUES (?, ?, ?)
        "#,
    )
    .bind(user_id)
    .bind(email)
    .bind(password_hash)
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        INSERT INTO profiles (id, email, role)
        VALUES (?, ?, ?)
        "#,
    )
    .bind(user_id)
    .bind(email)
    .bind(role.as_str())
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(User {
        id: user_id.to_string(),
        email: email.to_string(),
    })
}

pub async fn find_user_by_email(
    pool: &Pool<Sqlite>,
    email: &str,
) -> Result<Option<UserRecord>, sqlx::Error> {
    sqlx::query_as::<_, UserRecord>(
        "SELECT id, email, password_hash, created_at FROM users WHERE email = ?",
    )
    .bind(email)
    .fetch_optional(pool)
    .await
}

/// Tokens older than this stop resolving and are purged on the next sign-in.
pub const SESSION_TTL_DAYS: i64 = 30;

fn session_cutoff() -> String {
    format!("-{SESSION_TTL_DAYS} days")
}

pub async fn create_session(
    pool: &Pool<Sqlite>,
    token: &str,
    user_id: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "DELETE FROM sessions WHERE created_at < strftime('%Y-%m-%dT%H:%M:%fZ', 'now', ?)",
    )
    .bind(session_cutoff())
    .execute(pool)
    .await?;

    sqlx::query("INSERT INTO sessions (token, user_id) VALUES (?, ?)")
        .bind(token)
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn find_session_user(
    pool: &Pool<Sqlite>,
    token: &str,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(
        r#"
        SELECT u.id, u.email
        FROM sessions s
        JOIN users u ON u.id = s.user_id
        WHERE s.token = ?
          AND s.created_at >= strftime('%Y-%m-%dT%H:%M:%fZ', 'now', ?)
        "#,
    )
    .bind(token)
    .bind(session_cutoff())
    .fetch_optional(pool)
    .await
}

pub async fn delete_session(pool: &Pool<Sqlite>, token: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM sessions WHERE token = ?")
        .bind(token)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/*==========Profile Queries=========== */

pub async fn get_profile(pool: &Pool<Sqlite>, user_id: &str) -> Result<Option<Profile>, sqlx::Error> {
    sqlx::query_as::<_, Profile>(
        "SELECT id, email, username, role, avatar_url FROM profiles WHERE id = ?",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await
}

// Only the fields that are set get written
pub async fn update_profile(
    pool: &Pool<Sqlite>,
    user_id: &str,
    update: &ProfileUpdate,
) -> Result<Option<Profile>, sqlx::Error> {
    sqlx::query_as::<_, Profile>(
        r#"
        UPDATE profiles
        SET username   = COALESCE(?, username),
            avatar_url = COALESCE(?, avatar_url)
        WHERE id = ?
        RETURNING id, email, username, role, avatar_url
        "#,
    )
    .bind(update.username.as_deref())
    .bind(update.avatar_url.as_deref())
    .bind(user_id)
    .fetch_optional(pool)
    .await
}

/*==========Wallet Queries=========== */

pub async fn get_wallet(pool: &Pool<Sqlite>) -> Result<Wallet, sqlx::Error> {
    let wallet = sqlx::query_as::<_, Wallet>("SELECT current_balance FROM wallet WHERE id = 1")
        .fetch_optional(pool)
        .await?;
    Ok(wallet.unwrap_or_default())
}

/*==========Expense Queries=========== */

// Newest first
pub async fn list_expenses(pool: &Pool<Sqlite>) -> Result<Vec<Expense>, sqlx::Error> {
    sqlx::query_as::<_, Expense>(
        r#"
        SELECT id, title, amount, image_url, created_by, created_at
        FROM expenses
        ORDER BY created_at DESC, id DESC
        "#,
    )
    .fetch_all(pool)
    .await
}

pub async fn get_expense(pool: &Pool<Sqlite>, expense_id: i64) -> Result<Option<Expense>, sqlx::Error> {
    sqlx::query_as::<_, Expense>(
        r#"
        SELECT id, title, amount, image_url, created_by, created_at
        FROM expenses
        WHERE id = ?
        "#,
    )
    .bind(expense_id)
    .fetch_optional(pool)
    .await
}

/* Fails with "insufficient balance" when the wallet cannot cover the amount;
the guard trigger aborts the insert so nothing is written. */
pub async fn create_expense(
    pool: &Pool<Sqlite>,
    e: &NewExpense,
    created_by: &str,
) -> Result<Expense, sqlx::Error> {
    sqlx::query_as::<_, Expense>(
        r#"
        INSERT INTO expenses (title, amount, image_url, created_by)
        VALUES (?, ?, ?, ?)
        RETURNING id, title, amount, image_url, created_by, created_at
        "#,
    )
    .bind(&e.title)
    .bind(e.amount)
    .bind(e.image_url.as_deref())
    .bind(created_by)
    .fetch_one(pool)
    .await
}

pub async fn delete_expense(pool: &Pool<Sqlite>, expense_id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM expenses WHERE id = ?")
        .bind(expense_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/*==========Income Queries=========== */

pub async fn list_incomes(pool: &Pool<Sqlite>) -> Result<Vec<Income>, sqlx::Error> {
    sqlx::query_as::<_, Income>(
        r#"
        SELECT id, source, amount, created_by, created_at
        FROM incomes
        ORDER BY created_at DESC, id DESC
        "#,
    )
    .fetch_all(pool)
    .await
}

pub async fn create_income(
    pool: &Pool<Sqlite>,
    i: &NewIncome,
    created_by: &str,
) -> Result<Income, sqlx::Error> {
    sqlx::query_as::<_, Income>(
        r#"
        INSERT INTO incomes (source, amount, created_by)
        VALUES (?, ?, ?)
        RETURNING id, source, amount, created_by, created_at
        "#,
    )
    .bind(&i.source)
    .bind(i.amount)
    .bind(created_by)
    .fetch_one(pool)
    .await
}

// Refused by the guard trigger if the income was already spent
pub async fn delete_income(pool: &Pool<Sqlite>, income_id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM incomes WHERE id = ?")
        .bind(income_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/*==========Comment Queries=========== */

// Oldest first, reads like a conversation
pub async fn list_comments(pool: &Pool<Sqlite>, expense_id: i64) -> Result<Vec<Comment>, sqlx::Error> {
    sqlx::query_as::<_, Comment>(
        r#"
        SELECT c.id, c.expense_id, c.user_id, p.email AS author, c.content, c.created_at
        FROM comments c
        JOIN profiles p ON p.id = c.user_id
        WHERE c.expense_id = ?
        ORDER BY c.created_at ASC, c.id ASC
        "#,
    )
    .bind(expense_id)
    .fetch_all(pool)
    .await
}

pub async fn create_comment(
    pool: &Pool<Sqlite>,
    expense_id: i64,
    user_id: &str,
    content: &str,
) -> Result<Comment, sqlx::Error> {
    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO comments (expense_id, user_id, content)
        VALUES (?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(expense_id)
    .bind(user_id)
    .bind(content)
    .fetch_one(pool)
    .await?;

    sqlx::query_as::<_, Comment>(
        r#"
        SELECT c.id, c.expense_id, c.user_id, p.email AS author, c.content, c.created_at
        FROM comments c
        JOIN profiles p ON p.id = c.user_id
        WHERE c.id = ?
        "#,
    )
    .bind(id)
    .fetch_one(pool)
    .await
}

/// True when a statement was aborted by one of the wallet guard triggers.
pub fn is_insufficient_balance(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => db.message().contains("insufficient balance"),
        _ => false,
    }
}

/// True when a statement would push the balance past `MAX_AMOUNT`.
pub fn is_balance_limit(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => db.message().contains("balance limit exceeded"),
        _ => false,
    }
}

pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => db.message().contains("UNIQUE constraint failed"),
        _ => false,
    }
}
