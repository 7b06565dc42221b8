//! Drives the terminal app's HTTP client against a live platform.

use budget_tracker::backend::{router, AppState};
use budget_tracker::cli::api::{self, ApiError, Client};
use budget_tracker::cli::session::SessionStore;
use budget_tracker::cli::state::App;
use budget_tracker::config::ServerConfig;
use budget_tracker::database::db::{connection, migrate};
use budget_tracker::database::models::{NewExpense, NewIncome, Session, User};
use reqwest::StatusCode;

const ADMIN: &str = "admin@home.id";
const VIEWER: &str = "kid@home.id";
const PASSWORD: &str = "secret123";

async fn spawn_platform(storage: &tempfile::TempDir) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let base_url = format!("http://{addr}");

    let pool = connection::memory_pool().await.unwrap();
    migrate::run_migrations(&pool).await.unwrap();
    let config = ServerConfig {
        database_url: "sqlite::memory:".into(),
        bind_addr: addr,
        storage_root: storage.path().to_path_buf(),
        public_base_url: base_url.clone(),
        admin_emails: vec![ADMIN.into()],
    };
    let app = router(AppState::new(pool, config));
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    base_url
}

async fn signed_in_client(base_url: &str, email: &str) -> (Client, Session) {
    let mut client = Client::new(base_url);
    client.sign_up(email, PASSWORD).await.unwrap();
    let session = client.sign_in(email, PASSWORD).await.unwrap();
    client.set_token(Some(session.access_token.clone()));
    (client, session)
}

#[tokio::test]
async fn platform_messages_reach_the_caller() {
    let dir = tempfile::tempdir().unwrap();
    let base_url = spawn_platform(&dir).await;
    let client = Client::new(&base_url);
    client.sign_up(VIEWER, PASSWORD).await.unwrap();

    let err = client.sign_in(VIEWER, "not-the-password").await.unwrap_err();
    assert_eq!(err.to_string(), "invalid login credentials");
    assert!(api::is_unauthorized(&err));

    let (viewer, _) = signed_in_client(&base_url, "other@home.id").await;
    let expense = NewExpense { title: "Snacks".into(), amount: 10, image_url: None };
    let err = viewer.create_expense(&expense).await.unwrap_err();
    assert_eq!(err.to_string(), "only administrators may do this");
    let api_err = err.downcast_ref::<ApiError>().unwrap();
    assert_eq!(api_err.status, StatusCode::FORBIDDEN);
    assert!(!api::is_unauthorized(&err));
}

#[tokio::test]
async fn transport_failures_are_not_rejections() {
    let client = Client::new("http://127.0.0.1:9");
    let err = client.current_user().await.unwrap_err();
    assert!(err.downcast_ref::<ApiError>().is_none());
    assert!(!api::is_unauthorized(&err));
}

#[tokio::test]
async fn admin_flow_over_http() {
    let dir = tempfile::tempdir().unwrap();
    let base_url = spawn_platform(&dir).await;
    let (admin, session) = signed_in_client(&base_url, ADMIN).await;

    assert!(admin.my_profile().await.unwrap().role.is_admin());
    admin
        .create_income(&NewIncome { source: "Salary".into(), amount: 1_000 })
        .await
        .unwrap();
    let url = admin
        .upload_jpeg("receipts", &format!("{}_1700000000000.jpg", session.user.id), vec![1, 2, 3])
        .await
        .unwrap();
    let expense = NewExpense { title: "Rice".into(), amount: 400, image_url: Some(url.clone()) };
    admin.create_expense(&expense).await.unwrap();

    assert_eq!(admin.wallet().await.unwrap().current_balance, 600);
    let listed = admin.list_expenses().await.unwrap();
    assert_eq!(listed[0].image_url.as_deref(), Some(url.as_str()));

    let body = reqwest::get(&url).await.unwrap().bytes().await.unwrap();
    assert_eq!(&body[..], &[1, 2, 3]);

    admin.sign_out().await.unwrap();
    let err = admin.wallet().await.unwrap_err();
    assert!(api::is_unauthorized(&err));
}

#[tokio::test]
async fn start_restores_an_accepted_session() {
    let dir = tempfile::tempdir().unwrap();
    let base_url = spawn_platform(&dir).await;
    let (_, session) = signed_in_client(&base_url, VIEWER).await;

    let path = dir.path().join("session.json");
    SessionStore::load(&path).set(Some(session)).unwrap();

    let mut app = App::new(Client::new(&base_url), SessionStore::load(&path));
    app.start().await;
    assert!(app.signed_in());
    assert_eq!(app.profile.as_ref().map(|p| p.email.as_str()), Some(VIEWER));
    assert!(app.alert.is_none());
}

#[tokio::test]
async fn start_discards_a_rejected_session() {
    let dir = tempfile::tempdir().unwrap();
    let base_url = spawn_platform(&dir).await;

    let path = dir.path().join("session.json");
    let stale = Session {
        access_token: "revoked-token".into(),
        user: User { id: "gone".into(), email: VIEWER.into() },
    };
    SessionStore::load(&path).set(Some(stale)).unwrap();

    let mut app = App::new(Client::new(&base_url), SessionStore::load(&path));
    app.start().await;
    app.sync_session().await;

    assert!(!path.exists());
    assert!(!app.signed_in());
}
