//! The HTTP client against a mock backend.

use std::time::Duration;

use bbforum::api::{ApiError, ForumApi, HttpForumApi};
use bbforum::config::ApiConfig;
use bbforum::models::{Message, TopicRef, User, UserUpdate};
use chrono::{TimeZone, Utc};
use serde_json::json;
use wiremock::matchers::{body_json, body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer, timeout_seconds: u64) -> HttpForumApi {
    HttpForumApi::new(&ApiConfig {
        base_url: server.uri(),
        timeout_seconds,
    })
    .expect("client")
}

#[tokio::test]
async fn get_topic_decodes_nested_messages() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/topic/7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 7,
            "title": "Rust",
            "date": 1_690_000_000_000i64,
            "messages": [{
                "id": 70,
                "content": "[b]hi[/b]",
                "date": 1_700_000_000_000i64,
                "author": {"id": 1, "username": "ann", "admin": false}
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let topic = client(&server, 5).get_topic(7).await.unwrap();
    assert_eq!(topic.title, "Rust");
    assert_eq!(topic.messages[0].author_name(), "ann");
    assert_eq!(topic.messages[0].date.timestamp_millis(), 1_700_000_000_000);
}

#[tokio::test]
async fn post_message_sends_topic_reference() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/message/"))
        .and(body_partial_json(json!({"content": "hello world", "topic": {"id": 7}})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": 71,
            "content": "hello world",
            "date": 1_700_000_000_500i64,
            "topic": {"id": 7}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let draft = Message {
        id: None,
        content: "hello world".into(),
        date: Utc.timestamp_millis_opt(1_700_000_000_500).unwrap(),
        author: Some(User::new("ann")),
        topic: Some(TopicRef { id: 7 }),
    };
    let posted = client(&server, 5).post_message(&draft).await.unwrap();
    assert_eq!(posted.id, Some(71));
}

#[tokio::test]
async fn update_user_patches_camel_case_body() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/api/user/4"))
        .and(body_json(json!({
            "username": "bobby",
            "isAdmin": true,
            "connectedUser": {"id": 1, "username": "root", "admin": true}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 4, "username": "bobby", "admin": true
        })))
        .expect(1)
        .mount(&server)
        .await;

    let admin = User {
        id: Some(1),
        username: "root".into(),
        password: Some("never sent".into()),
        admin: true,
    };
    let target = User {
        id: Some(4),
        username: "bob".into(),
        password: None,
        admin: false,
    };
    let update = UserUpdate::for_user(&target, Some("bobby".into()), Some(true)).acting_as(&admin);
    let saved = client(&server, 5).update_user(4, &update).await.unwrap();
    assert!(saved.admin);
}

#[tokio::test]
async fn deletes_accept_empty_responses() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/message/9"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/user/3"))
        .respond_with(ResponseTemplate::new(200).set_body_string("deleted"))
        .expect(1)
        .mount(&server)
        .await;

    let api = client(&server, 5);
    api.delete_message(9).await.unwrap();
    api.delete_user(3).await.unwrap();
}

#[tokio::test]
async fn login_posts_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/login"))
        .and(body_partial_json(json!({"username": "ann", "password": "pw"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 1, "username": "ann", "admin": false
        })))
        .mount(&server)
        .await;

    let user = client(&server, 5)
        .login(&User::with_password("ann", "pw"))
        .await
        .unwrap();
    assert_eq!(user.id, Some(1));
}

#[tokio::test]
async fn error_statuses_surface_as_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/topic/404"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/user"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let api = client(&server, 5);
    assert!(api.get_topic(404).await.unwrap_err().is_not_found());
    assert!(matches!(
        api.list_users().await,
        Err(ApiError::Status(500))
    ));
}

#[tokio::test]
async fn malformed_body_is_a_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/topic"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let err = client(&server, 5).list_topics().await.unwrap_err();
    assert!(matches!(err, ApiError::Decode(_)));
}

#[tokio::test]
async fn slow_backend_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/user"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .mount(&server)
        .await;

    let err = client(&server, 1).list_users().await.unwrap_err();
    assert!(matches!(err, ApiError::Timeout(d) if d == Duration::from_secs(1)));
}

#[tokio::test]
async fn stalled_body_times_out() {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let backend = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = [0u8; 1024];
        let _ = socket.read(&mut request).await;
        socket
            .write_all(
                b"HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 100\r\n\r\n[{",
            )
            .await
            .unwrap();
        // Headers are out; the rest of the body never comes.
        tokio::time::sleep(Duration::from_secs(30)).await;
    });

    let api = HttpForumApi::new(&ApiConfig {
        base_url: format!("http://{}/", addr),
        timeout_seconds: 1,
    })
    .unwrap();
    let started = std::time::Instant::now();
    let err = api.list_topics().await.unwrap_err();
    assert!(matches!(err, ApiError::Timeout(_)));
    assert!(started.elapsed() < Duration::from_secs(10));
    backend.abort();
}
