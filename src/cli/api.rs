//! HTTP client for the platform. Every call returns `anyhow::Result`; a failed
//! call carries the platform's error message so it can be shown as-is.
//! Rejections by the platform are `ApiError`s, anything else is transport.

use anyhow::Result;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::backend::handlers::StoredObject;
use crate::database::models::{
    Comment, Credentials, Expense, Income, NewComment, NewExpense, NewIncome, Profile,
    ProfileUpdate, Session, User, Wallet,
};
use crate::error::ErrorBody;

/// The platform answered, but not with success.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

/// True only when the platform itself refused the token.
pub fn is_unauthorized(err: &anyhow::Error) -> bool {
    err.downcast_ref::<ApiError>()
        .is_some_and(|e| e.status == StatusCode::UNAUTHORIZED)
}

#[derive(Clone)]
pub struct Client {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl Client {
    pub fn new(base_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
        }
    }

    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token;
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let req = self.http.request(method, format!("{}{}", self.base_url, path));
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    // ============= Auth =============

    pub async fn sign_up(&self, email: &str, password: &str) -> Result<User> {
        let creds = Credentials { email: email.into(), password: password.into() };
        let resp = self.request(Method::POST, "/api/auth/signup").json(&creds).send().await?;
        json(resp).await
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
        let creds = Credentials { email: email.into(), password: password.into() };
        let resp = self.request(Method::POST, "/api/auth/token").json(&creds).send().await?;
        json(resp).await
    }

    pub async fn sign_out(&self) -> Result<()> {
        let resp = self.request(Method::POST, "/api/auth/logout").send().await?;
        empty(resp).await
    }

    pub async fn current_user(&self) -> Result<User> {
        let resp = self.request(Method::GET, "/api/auth/user").send().await?;
        json(resp).await
    }

    // ============= Profile & wallet =============

    pub async fn my_profile(&self) -> Result<Profile> {
        let resp = self.request(Method::GET, "/api/rest/profiles/me").send().await?;
        json(resp).await
    }

    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<Profile> {
        let resp = self
            .request(Method::PATCH, "/api/rest/profiles/me")
            .json(update)
            .send()
            .await?;
        json(resp).await
    }

    pub async fn wallet(&self) -> Result<Wallet> {
        let resp = self.request(Method::GET, "/api/rest/wallet").send().await?;
        json(resp).await
    }

    // ============= Expenses =============

    pub async fn list_expenses(&self) -> Result<Vec<Expense>> {
        let resp = self.request(Method::GET, "/api/rest/expenses").send().await?;
        json(resp).await
    }

    pub async fn create_expense(&self, req: &NewExpense) -> Result<Expense> {
        let resp = self.request(Method::POST, "/api/rest/expenses").json(req).send().await?;
        json(resp).await
    }

    pub async fn delete_expense(&self, id: i64) -> Result<()> {
        let resp = self
            .request(Method::DELETE, &format!("/api/rest/expenses/{id}"))
            .send()
            .await?;
        empty(resp).await
    }

    // ============= Incomes =============

    pub async fn list_incomes(&self) -> Result<Vec<Income>> {
        let resp = self.request(Method::GET, "/api/rest/incomes").send().await?;
        json(resp).await
    }

    pub async fn create_income(&self, req: &NewIncome) -> Result<Income> {
        let resp = self.request(Method::POST, "/api/rest/incomes").json(req).send().await?;
        json(resp).await
    }

    pub async fn delete_income(&self, id: i64) -> Result<()> {
        let resp = self
            .request(Method::DELETE, &format!("/api/rest/incomes/{id}"))
            .send()
            .await?;
        empty(resp).await
    }

    // ============= Comments =============

    pub async fn list_comments(&self, expense_id: i64) -> Result<Vec<Comment>> {
        let resp = self
            .request(Method::GET, &format!("/api/rest/expenses/{expense_id}/comments"))
            .send()
            .await?;
        json(resp).await
    }

    pub async fn create_comment(&self, expense_id: i64, req: &NewComment) -> Result<Comment> {
        let resp = self
            .request(Method::POST, &format!("/api/rest/expenses/{expense_id}/comments"))
            .json(req)
            .send()
            .await?;
        json(resp).await
    }

    // ============= Storage =============

    /// Uploads a JPEG and returns its public URL.
    pub async fn upload_jpeg(&self, bucket: &str, name: &str, bytes: Vec<u8>) -> Result<String> {
        let resp = self
            .request(Method::PUT, &format!("/api/storage/{bucket}/{name}"))
            .header(reqwest::header::CONTENT_TYPE, "image/jpeg")
            .body(bytes)
            .send()
            .await?;
        let stored: StoredObject = json(resp).await?;
        Ok(stored.public_url)
    }
}

async fn fail(resp: Response) -> anyhow::Error {
    let status = resp.status();
    let message = match resp.json::<ErrorBody>().await {
        Ok(body) => body.error,
        Err(_) => format!("request failed with status {status}"),
    };
    ApiError { status, message }.into()
}

async fn json<T: DeserializeOwned>(resp: Response) -> Result<T> {
    if !resp.status().is_success() {
        return Err(fail(resp).await);
    }
    Ok(resp.json::<T>().await?)
}

async fn empty(resp: Response) -> Result<()> {
    if !resp.status().is_success() {
        return Err(fail(resp).await);
    }
    Ok(())
}
