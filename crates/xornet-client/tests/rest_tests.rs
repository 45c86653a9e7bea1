// crates/xornet-client/tests/rest_tests.rs

use std::sync::Arc;
use std::time::Duration;

use reqwest::multipart::{Form, Part};
use reqwest::Method;
use serde_json::{json, Value};
use wiremock::matchers::{body_json, body_string_contains, header, header_regex, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};
use xornet_client::{ApiClient, ApiError, LoginForm, MemoryTokenHolder, TokenHolder, UsersService};
use xornet_core::{EntityId, FetchError, SharedStore, User};

fn api(server: &MockServer, token: Arc<MemoryTokenHolder>) -> Arc<ApiClient> {
    Arc::new(ApiClient::new(&server.uri(), token, Duration::from_secs(5)).unwrap())
}

fn user_json(uuid: &str, username: &str) -> Value {
    json!({ "uuid": uuid, "username": username, "is_admin": false })
}

#[tokio::test]
async fn authorization_is_unset_without_a_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/@me"))
        .and(header("authorization", "unset"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({ "error": "forbidden" })))
        .expect(1)
        .mount(&server)
        .await;

    let token = Arc::new(MemoryTokenHolder::new(None));
    let err = api(&server, token).get::<Value>("/users/@me").await.unwrap_err();

    match err {
        ApiError::Status { status, body } => {
            assert_eq!(status, 403);
            assert_eq!(body, json!({ "error": "forbidden" }));
        }
        other => panic!("expected status error, got {:?}", other),
    }
}

#[tokio::test]
async fn authorization_carries_the_stored_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/@me"))
        .and(header("authorization", "secret-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(user_json("u1", "alice")))
        .expect(1)
        .mount(&server)
        .await;

    let token = Arc::new(MemoryTokenHolder::new(Some("secret-token")));
    let user: User = api(&server, token).get("/users/@me").await.unwrap();
    assert_eq!(user.username, "alice");
}

#[tokio::test]
async fn non_json_error_body_becomes_null() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/machines/m1"))
        .respond_with(ResponseTemplate::new(500).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let token = Arc::new(MemoryTokenHolder::new(Some("t")));
    let err = api(&server, token)
        .request::<Value>(Method::DELETE, "/machines/m1", None)
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::Status { status: 500, body: Value::Null }));
}

#[tokio::test]
async fn empty_success_body_is_accepted() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/settings"))
        .and(body_json(json!({ "theme": "dark" })))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let token = Arc::new(MemoryTokenHolder::new(Some("t")));
    let api = api(&server, token);
    let () = api
        .send(Method::PUT, "/settings", &json!({ "theme": "dark" }))
        .await
        .unwrap();
}

#[tokio::test]
async fn login_stores_token_and_me() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/users/@login"))
        .and(body_json(json!({ "username": "alice", "password": "hunter2" })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "token": "fresh", "user": user_json("u1", "alice") })),
        )
        .mount(&server)
        .await;

    let token = Arc::new(MemoryTokenHolder::new(None));
    let users = UsersService::new(api(&server, token.clone()), token.clone(), SharedStore::new());

    let form = LoginForm {
        username: "alice".to_string(),
        password: "hunter2".to_string(),
    };
    let user = users.login(&form).await.unwrap();

    assert_eq!(user.uuid, EntityId::from("u1"));
    assert_eq!(token.get().as_deref(), Some("fresh"));
    assert_eq!(users.me_id(), Some(EntityId::from("u1")));
    assert_eq!(users.me().map(|u| u.username), Some("alice".to_string()));
}

#[tokio::test]
async fn failed_login_leaves_no_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/users/@login"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "error": "bad password" })))
        .mount(&server)
        .await;

    let token = Arc::new(MemoryTokenHolder::new(None));
    let users = UsersService::new(api(&server, token.clone()), token.clone(), SharedStore::new());

    let form = LoginForm {
        username: "alice".to_string(),
        password: "wrong".to_string(),
    };
    let err = users.login(&form).await.unwrap_err();

    assert!(matches!(err, ApiError::Status { status: 401, .. }));
    assert!(token.get().is_none());
    assert!(users.me().is_none());
}

#[tokio::test]
async fn concurrent_user_lookups_share_one_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/u2"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(user_json("u2", "bob"))
                .set_delay(Duration::from_millis(100)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let token = Arc::new(MemoryTokenHolder::new(Some("t")));
    let users = UsersService::new(api(&server, token.clone()), token, SharedStore::new());
    let id = EntityId::from("u2");

    // Cache miss kicks off the background fetch.
    assert!(users.user(&id).is_none());

    let (a, b, c) = futures::join!(users.ensure_user(&id), users.ensure_user(&id), users.ensure_user(&id));
    assert_eq!(a.unwrap().username, "bob");
    assert_eq!(b.unwrap().username, "bob");
    assert_eq!(c.unwrap().username, "bob");

    // Now cached: no further request.
    assert_eq!(users.user(&id).map(|u| u.username), Some("bob".to_string()));
}

#[tokio::test]
async fn failed_user_lookup_reports_the_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "error": "no such user" })))
        .expect(2)
        .mount(&server)
        .await;

    let token = Arc::new(MemoryTokenHolder::new(Some("t")));
    let users = UsersService::new(api(&server, token.clone()), token, SharedStore::new());
    let id = EntityId::from("missing");

    let err = users.ensure_user(&id).await.unwrap_err();
    assert!(matches!(err, FetchError::Rejected { status: 404, .. }));

    // The failure is not cached; a later lookup asks again.
    assert!(users.ensure_user(&id).await.is_err());
}

#[tokio::test]
async fn update_avatar_patches_me() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/@me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(user_json("u1", "alice")))
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/users/@avatar"))
        .and(body_json(json!({ "url": "https://cdn.test/a.png" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(user_json("u1", "alice")))
        .expect(1)
        .mount(&server)
        .await;

    let token = Arc::new(MemoryTokenHolder::new(Some("t")));
    let users = UsersService::new(api(&server, token.clone()), token, SharedStore::new());

    users.fetch_me().await.unwrap();
    let updated = users.update_avatar("https://cdn.test/a.png").await.unwrap();

    assert_eq!(
        updated.and_then(|u| u.avatar).as_deref(),
        Some("https://cdn.test/a.png")
    );
    assert_eq!(
        users.me().and_then(|u| u.avatar).as_deref(),
        Some("https://cdn.test/a.png")
    );
}

#[tokio::test]
async fn update_avatar_is_a_noop_when_logged_out() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/users/@avatar"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let token = Arc::new(MemoryTokenHolder::new(None));
    let users = UsersService::new(api(&server, token.clone()), token, SharedStore::new());

    assert!(users.update_avatar("https://cdn.test/a.png").await.unwrap().is_none());
}

#[tokio::test]
async fn logout_forgets_everything() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/@me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(user_json("u1", "alice")))
        .mount(&server)
        .await;

    let token = Arc::new(MemoryTokenHolder::new(Some("t")));
    let users = UsersService::new(api(&server, token.clone()), token.clone(), SharedStore::new());
    users.fetch_me().await.unwrap();
    assert_eq!(users.store().len(), 1);

    users.logout().unwrap();

    assert!(users.me().is_none());
    assert!(users.store().is_empty());
    assert!(token.get().is_none());
}

#[tokio::test]
async fn fetch_in_flight_at_logout_does_not_repopulate_the_store() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/u9"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(user_json("u9", "mallory"))
                .set_delay(Duration::from_millis(200)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let token = Arc::new(MemoryTokenHolder::new(Some("t")));
    let users = UsersService::new(api(&server, token.clone()), token, SharedStore::new());
    let id = EntityId::from("u9");

    assert!(users.user(&id).is_none());
    users.logout().unwrap();

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert!(users.store().is_empty());
    assert!(users.me().is_none());
}

#[tokio::test]
async fn multipart_upload_uses_form_content_type_and_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/users/@avatar"))
        .and(header("authorization", "upload-token"))
        .and(header_regex("content-type", "^multipart/form-data; boundary=.+$"))
        .and(body_string_contains("fake-png-bytes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(user_json("u1", "alice")))
        .expect(1)
        .mount(&server)
        .await;

    let token = Arc::new(MemoryTokenHolder::new(Some("upload-token")));
    let form = Form::new().part(
        "file",
        Part::bytes(b"fake-png-bytes".to_vec()).file_name("avatar.png"),
    );

    let user: User = api(&server, token)
        .request_multipart(Method::POST, "/users/@avatar", form)
        .await
        .unwrap();
    assert_eq!(user.username, "alice");
}

#[tokio::test]
async fn multipart_rejection_maps_to_status_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/users/@avatar"))
        .respond_with(ResponseTemplate::new(413).set_body_json(json!({ "error": "too large" })))
        .mount(&server)
        .await;

    let token = Arc::new(MemoryTokenHolder::new(None));
    let form = Form::new().text("note", "big");
    let err = api(&server, token)
        .request_multipart::<Value>(Method::POST, "/users/@avatar", form)
        .await
        .unwrap_err();

    match err {
        ApiError::Status { status, body } => {
            assert_eq!(status, 413);
            assert_eq!(body, json!({ "error": "too large" }));
        }
        other => panic!("expected status error, got {:?}", other),
    }
}
