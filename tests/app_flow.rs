use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use pollsync::token::MemoryTokenStore;
use pollsync::{AppState, ClientError, Config, ConnectionStatus, Event, PushEvent};
use serde_json::{json, Value};
use tokio::time::timeout;

#[derive(Clone, Default)]
struct Server {
    create_requests: Arc<AtomicUsize>,
}

fn poll_json(id: u64, title: &str) -> Value {
    json!({
        "id": id,
        "title": title,
        "creator_id": 1,
        "creator_username": "ann",
        "is_active": true,
        "allow_multiple_votes": false,
        "created_at": "2024-05-01T12:00:00Z",
        "options": [
            { "id": id * 10 + 1, "poll_id": id, "text": "A", "vote_count": 2 },
            { "id": id * 10 + 2, "poll_id": id, "text": "B", "vote_count": 1 }
        ],
        "total_votes": 3,
        "total_likes": 4,
        "user_has_voted": false,
        "user_has_liked": false,
        "user_voted_options": []
    })
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        == Some("Bearer secret")
}

fn unauthorized() -> (StatusCode, Json<Value>) {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "detail": "Not authenticated" })),
    )
}

async fn list_polls() -> Json<Value> {
    Json(json!([
        poll_json(1, "first"),
        { "title": "no id" },
        poll_json(2, "second"),
        poll_json(42, "stale")
    ]))
}

async fn get_poll(Path(id): Path<u64>) -> Json<Value> {
    Json(poll_json(id, "fetched"))
}

async fn create_poll(
    State(server): State<Server>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    server.create_requests.fetch_add(1, Ordering::SeqCst);
    if !authorized(&headers) {
        return unauthorized();
    }
    let title = body["title"].as_str().unwrap_or_default();
    (StatusCode::OK, Json(poll_json(42, title)))
}

async fn vote(Path(id): Path<u64>, headers: HeaderMap) -> (StatusCode, Json<Value>) {
    if !authorized(&headers) {
        return unauthorized();
    }
    if id == 2 {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "detail": "Poll is closed" })),
        );
    }
    (StatusCode::OK, Json(json!({ "id": 1, "poll_id": id })))
}

async fn like(headers: HeaderMap) -> (StatusCode, Json<Value>) {
    if !authorized(&headers) {
        return unauthorized();
    }
    (StatusCode::OK, Json(json!({ "id": 1 })))
}

async fn login(Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    if body["password"] == "pw" {
        (StatusCode::OK, Json(json!({ "access_token": "secret", "token_type": "bearer" })))
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "detail": "Incorrect email or password" })),
        )
    }
}

async fn me(headers: HeaderMap) -> (StatusCode, Json<Value>) {
    if !authorized(&headers) {
        return unauthorized();
    }
    (
        StatusCode::OK,
        Json(json!({
            "id": 1,
            "email": "ann@example.com",
            "username": "ann",
            "is_active": true,
            "created_at": "2024-05-01T12:00:00Z"
        })),
    )
}

async fn push(ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(|mut socket| async move {
        let update = json!({ "type": "like_update", "data": { "poll_id": 1, "total_likes": 9 } });
        if socket.send(Message::Text(update.to_string().into())).await.is_err() {
            return;
        }
        while let Some(Ok(_)) = socket.recv().await {}
    })
}

async fn spawn_server() -> (String, Server) {
    let server = Server::default();
    let router = Router::new()
        .route("/polls", get(list_polls).post(create_poll))
        .route("/polls/{id}", get(get_poll))
        .route("/polls/{id}/vote", post(vote))
        .route("/polls/{id}/like", post(like).delete(like))
        .route("/auth/login", post(login))
        .route("/auth/me", get(me))
        .route("/ws", get(push))
        .with_state(server.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    (format!("http://{}", addr), server)
}

fn app(api_url: &str, token: Option<&str>) -> AppState {
    let config = Config {
        api_url: api_url.to_string(),
        ..Config::default()
    };
    let token_store = match token {
        Some(token) => MemoryTokenStore::with_token(token),
        None => MemoryTokenStore::new(),
    };
    AppState::new(config, Box::new(token_store), ConnectionStatus::new()).unwrap()
}

fn options(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn fetches_list_and_focuses_single_poll() {
    let (url, _) = spawn_server().await;
    let mut app = app(&url, None);

    app.fetch_polls().await.unwrap();
    let ids: Vec<_> = app.store().polls().iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![1, 2, 42]);
    assert!(!app.store().loading());

    app.fetch_poll(2).await.unwrap();
    assert_eq!(app.store().current().unwrap().id, 2);
    assert_eq!(app.store().polls()[1].title, "fetched");
}

#[tokio::test]
async fn vote_marks_viewer_without_touching_tally() {
    let (url, _) = spawn_server().await;
    let mut app = app(&url, Some("secret"));
    app.fetch_polls().await.unwrap();

    app.vote(1, 11).await.unwrap();
    let poll = app.store().get(1).unwrap();
    assert!(poll.user_has_voted);
    assert_eq!(poll.user_voted_options, vec![11]);
    assert_eq!(poll.total_votes, 3);
}

#[tokio::test]
async fn server_detail_is_surfaced_and_store_kept() {
    let (url, _) = spawn_server().await;
    let mut app = app(&url, Some("secret"));
    app.fetch_polls().await.unwrap();
    let before = app.store().polls().to_vec();

    match app.vote(2, 21).await {
        Err(ClientError::Request(message)) => assert_eq!(message, "Poll is closed"),
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(app.store().polls(), &before[..]);
}

#[tokio::test]
async fn unauthenticated_vote_is_rejected_locally() {
    let (url, _) = spawn_server().await;
    let mut app = app(&url, None);
    match app.vote(1, 11).await {
        Err(ClientError::Validation(message)) => {
            assert_eq!(message, "Please sign in to cast your vote.")
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn create_validation_runs_before_any_request() {
    let (url, server) = spawn_server().await;
    let mut anonymous = app(&url, None);

    let err = anonymous
        .create_poll("Lunch?", None, &options(&["Soup", "Salad"]), false)
        .await
        .unwrap_err();
    assert_eq!(err.user_message(), "You must be logged in to create a poll");

    let mut app = app(&url, Some("secret"));
    let err = app
        .create_poll("  ", None, &options(&["Soup", "Salad"]), false)
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Validation(_)));
    let err = app
        .create_poll("Lunch?", None, &options(&["Soup", "  "]), false)
        .await
        .unwrap_err();
    assert_eq!(err.user_message(), "At least 2 options are required");

    assert_eq!(server.create_requests.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn created_poll_replaces_stale_entry_at_front() {
    let (url, server) = spawn_server().await;
    let mut app = app(&url, Some("secret"));
    app.fetch_polls().await.unwrap();

    let id = app
        .create_poll("Lunch?", Some("today"), &options(&["Soup", "Salad"]), false)
        .await
        .unwrap();
    assert_eq!(id, 42);

    let polls = app.store().polls();
    assert_eq!(polls.iter().filter(|p| p.id == 42).count(), 1);
    assert_eq!(polls[0].id, 42);
    assert_eq!(polls[0].title, "Lunch?");
    assert_eq!(server.create_requests.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn like_without_push_channel_counts_locally() {
    let (url, _) = spawn_server().await;
    let mut app = app(&url, Some("secret"));
    app.fetch_polls().await.unwrap();
    app.fetch_poll(1).await.unwrap();

    app.like(1).await.unwrap();
    for poll in [app.store().get(1).unwrap(), app.store().current().unwrap()] {
        assert_eq!(poll.total_likes, 5);
        assert!(poll.user_has_liked);
    }

    app.unlike(1).await.unwrap();
    assert_eq!(app.store().get(1).unwrap().total_likes, 4);
    assert!(!app.store().get(1).unwrap().user_has_liked);
}

#[tokio::test]
async fn like_with_push_channel_waits_for_push_count() {
    let (url, _) = spawn_server().await;
    let mut app = app(&url, Some("secret"));
    app.fetch_polls().await.unwrap();

    app.connect(None).await;
    let event = timeout(Duration::from_secs(5), app.next_event()).await.unwrap();
    assert_eq!(event, Some(Event::Connected));
    assert!(app.is_connected());

    app.like(1).await.unwrap();
    let poll = app.store().get(1).unwrap();
    assert_eq!(poll.total_likes, 4);
    assert!(poll.user_has_liked);

    let event = timeout(Duration::from_secs(5), app.next_event()).await.unwrap();
    assert_eq!(
        event,
        Some(Event::Push(PushEvent::LikeUpdate { poll_id: 1, total_likes: 9 }))
    );
    assert_eq!(app.store().get(1).unwrap().total_likes, 9);

    app.disconnect().await;
    assert!(!app.is_connected());
    assert_eq!(app.process_events(), 1);
}

#[tokio::test]
async fn login_persists_token_and_logout_clears_it() {
    let (url, _) = spawn_server().await;
    let mut app = app(&url, None);
    assert!(!app.is_authenticated());

    match app.login("ann@example.com", "wrong").await {
        Err(ClientError::Request(message)) => assert_eq!(message, "Incorrect email or password"),
        other => panic!("unexpected {other:?}"),
    }
    assert!(!app.is_authenticated());

    app.login("ann@example.com", "pw").await.unwrap();
    assert_eq!(app.token(), Some("secret"));
    assert_eq!(app.user().unwrap().username, "ann");

    app.logout().unwrap();
    assert!(!app.is_authenticated());
    assert!(app.user().is_none());
}
