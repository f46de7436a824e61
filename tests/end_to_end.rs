use std::net::SocketAddr;

use workpilot::{
    app::build_app,
    client::{
        filter::local_today, ApiClient, ClientError, Dashboard, NoticeKind, Session, SessionStore,
        TaskFilter,
    },
    config::AppConfig,
    state::AppState,
    tasks::dto::TaskFields,
};

async fn spawn_server() -> String {
    let app = build_app(AppState::in_memory(AppConfig::for_tests()));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn today_str() -> String {
    let format = time::macros::format_description!("[year]-[month]-[day]");
    local_today().format(format).unwrap()
}

#[tokio::test]
async fn register_login_create_list_delete() {
    let base = spawn_server().await;
    let mut api = ApiClient::new(&base);

    api.register("Ann", "ann@example.com", "password123").await.unwrap();
    let login = api.login("ann@example.com", "password123").await.unwrap();
    api.set_token(Some(login.token));

    let mut dashboard = Dashboard::new();
    dashboard.open_create();
    let saved = dashboard
        .save(
            &api,
            TaskFields {
                title: Some("Buy milk".into()),
                priority: Some("low".into()),
                due_date: Some(today_str()),
                ..Default::default()
            },
        )
        .await;
    assert!(saved);
    assert!(!dashboard.is_loading());

    assert_eq!(dashboard.tasks().len(), 1);
    let stats = dashboard.stats();
    assert_eq!(stats.total, 1);
    assert_eq!(stats.low_priority, 1);
    dashboard.set_filter(TaskFilter::Today);
    assert_eq!(dashboard.visible(local_today()).len(), 1);

    let id = dashboard.tasks()[0].id;
    assert!(dashboard.delete(&api, id).await);
    assert!(dashboard.tasks().is_empty());
    assert!(api.list_tasks().await.unwrap().is_empty());

    let kinds: Vec<_> = dashboard.take_notices().into_iter().map(|n| n.kind).collect();
    assert_eq!(kinds, vec![NoticeKind::Success, NoticeKind::Success]);
}

#[tokio::test]
async fn edit_and_toggle_refresh_the_list() {
    let base = spawn_server().await;
    let mut api = ApiClient::new(&base);
    api.register("Ann", "ann@example.com", "password123").await.unwrap();
    let login = api.login("ann@example.com", "password123").await.unwrap();
    api.set_token(Some(login.token));

    let task = api
        .create_task(&TaskFields {
            title: Some("Draft report".into()),
            priority: Some("medium".into()),
            due_date: Some(today_str()),
            ..Default::default()
        })
        .await
        .unwrap();

    let mut dashboard = Dashboard::new();
    assert!(dashboard.refresh(&api).await);
    assert!(dashboard.open_edit(task.id));
    assert!(
        dashboard
            .save(
                &api,
                TaskFields {
                    priority: Some("HIGH".into()),
                    ..Default::default()
                },
            )
            .await
    );
    assert_eq!(dashboard.stats().high_priority, 1);

    assert!(dashboard.toggle(&api, task.id).await);
    assert_eq!(dashboard.stats().completed, 1);
    assert!(dashboard.toggle(&api, task.id).await);
    assert_eq!(dashboard.stats().completed, 0);
}

#[tokio::test]
async fn failed_save_surfaces_a_notice() {
    let base = spawn_server().await;
    let mut api = ApiClient::new(&base);
    api.register("Ann", "ann@example.com", "password123").await.unwrap();
    let login = api.login("ann@example.com", "password123").await.unwrap();
    api.set_token(Some(login.token));

    let mut dashboard = Dashboard::new();
    dashboard.open_create();
    let saved = dashboard
        .save(
            &api,
            TaskFields {
                title: Some("No due date".into()),
                priority: Some("low".into()),
                ..Default::default()
            },
        )
        .await;
    assert!(!saved);
    let notices = dashboard.take_notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].kind, NoticeKind::Error);
    assert!(notices[0].message.contains("Due date is required"));
}

#[tokio::test]
async fn api_errors_carry_status_and_message() {
    let base = spawn_server().await;
    let api = ApiClient::new(&base);
    api.register("Ann", "ann@example.com", "password123").await.unwrap();

    let err = api.register("Ann", "ann@example.com", "password123").await.unwrap_err();
    assert!(matches!(err, ClientError::Api { status: 400, .. }));

    let err = api.login("ann@example.com", "bad-password").await.unwrap_err();
    assert!(err.is_unauthorized());

    assert!(matches!(api.list_tasks().await, Err(ClientError::NotLoggedIn)));
}

#[tokio::test]
async fn session_restore_validates_the_stored_token() {
    let base = spawn_server().await;
    let dir = tempfile::tempdir().unwrap();
    let store = SessionStore::new(dir.path().join("session.json"));

    let api = ApiClient::new(&base);
    api.register("Ann", "ann@example.com", "password123").await.unwrap();
    let login = api.login("ann@example.com", "password123").await.unwrap();
    store.save(&Session::new(login.token.clone(), &login.user)).unwrap();

    let mut fresh = ApiClient::new(&base);
    let restored = store.restore(&mut fresh).await.unwrap().unwrap();
    assert_eq!(restored.user_id, login.user.id);
    assert_eq!(fresh.token(), Some(login.token.as_str()));

    let mut tampered = restored.clone();
    tampered.token.push('x');
    store.save(&tampered).unwrap();
    let mut other = ApiClient::new(&base);
    assert!(store.restore(&mut other).await.unwrap().is_none());
    assert!(other.token().is_none());
    assert!(store.load().unwrap().is_none());
}
