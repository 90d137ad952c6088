//! HTTP-level tests driving the full router

use axum::http::{header, HeaderValue, StatusCode};
use axum_test::TestServer;
use serde_json::{json, Value};

use marvelverse::{api, config::Config, db};

async fn setup() -> TestServer {
    let pool = db::create_test_pool().await.unwrap();
    db::migrations::run_migrations(&pool).await.unwrap();
    let state = api::build_state(pool, &Config::default()).unwrap();
    TestServer::new(api::build_router(state)).unwrap()
}

fn cookie(token: &str) -> HeaderValue {
    HeaderValue::from_str(&format!("session={}", token)).unwrap()
}

fn location(response: &axum_test::TestResponse) -> String {
    response
        .header(header::LOCATION)
        .to_str()
        .unwrap()
        .to_string()
}

/// Sign up through the form and return the session token
async fn signup(server: &TestServer, username: &str) -> String {
    let response = server
        .post("/signup")
        .form(&[
            ("username", username),
            ("password1", "hunter22"),
            ("password2", "hunter22"),
            ("email", ""),
            ("firstname", "Test"),
            ("lastname", "User"),
        ])
        .await;
    response.assert_status(StatusCode::FOUND);
    assert_eq!(location(&response), "/");

    let set_cookie = response.header(header::SET_COOKIE);
    let set_cookie = set_cookie.to_str().unwrap();
    set_cookie
        .strip_prefix("session=")
        .and_then(|rest| rest.split(';').next())
        .unwrap()
        .to_string()
}

async fn create_entry(server: &TestServer, admin: &str, kind: &str, title: &str) -> i64 {
    let response = server
        .post(&format!("/admin/api/{}", kind))
        .add_header(header::COOKIE, cookie(admin))
        .json(&json!({ "title": title, "description": "", "image": null }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let body: Value = response.json();
    body["entry"]["id"].as_i64().unwrap()
}

#[tokio::test]
async fn test_health() {
    let server = setup().await;
    let response = server.get("/health").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_home_and_lists_render_for_anonymous_visitors() {
    let server = setup().await;

    let response = server.get("/").await;
    response.assert_status_ok();
    assert!(response.text().contains("/signup"));

    let response = server.get("/comics").await;
    response.assert_status_ok();
    assert!(response.text().contains("No comics yet."));
}

#[tokio::test]
async fn test_unknown_pages_are_404() {
    let server = setup().await;

    server.get("/villains").await.assert_status(StatusCode::NOT_FOUND);
    server.get("/characters/999").await.assert_status(StatusCode::NOT_FOUND);

    let response = server.get("/characters/abc").await;
    response.assert_status(StatusCode::NOT_FOUND);
    assert!(response.text().contains("Back to the home page"));
}

#[tokio::test]
async fn test_signup_validation_rerenders_form() {
    let server = setup().await;

    let response = server
        .post("/signup")
        .form(&[
            ("username", "peter"),
            ("password1", "one"),
            ("password2", "two"),
        ])
        .await;
    response.assert_status_ok();
    let text = response.text();
    assert!(text.contains("match"));
    assert!(text.contains("peter"));
}

#[tokio::test]
async fn test_signup_duplicate_username_rerenders_form() {
    let server = setup().await;
    signup(&server, "peter").await;

    let response = server
        .post("/signup")
        .form(&[
            ("username", "peter"),
            ("password1", "hunter22"),
            ("password2", "hunter22"),
        ])
        .await;
    response.assert_status_ok();
}

#[tokio::test]
async fn test_login_and_logout() {
    let server = setup().await;
    signup(&server, "natasha").await;

    server.get("/login").await.assert_status_ok();

    let response = server
        .post("/login")
        .form(&[("username", "natasha"), ("password", "wrong"), ("next", "/")])
        .await;
    response.assert_status_ok();
    assert!(response.text().contains("natasha"));

    let response = server
        .post("/login")
        .form(&[("username", "natasha"), ("password", "hunter22"), ("next", "/comics")])
        .await;
    response.assert_status(StatusCode::FOUND);
    assert_eq!(location(&response), "/comics");

    let response = server
        .post("/login")
        .form(&[("username", "natasha"), ("password", "hunter22"), ("next", "https://evil.test/")])
        .await;
    assert_eq!(location(&response), "/");

    let response = server.post("/logout").await;
    response.assert_status(StatusCode::FOUND);
    assert_eq!(location(&response), "/");
}

#[tokio::test]
async fn test_login_next_with_control_characters_goes_home() {
    let server = setup().await;
    let token = signup(&server, "wanda").await;

    for next in ["/\t/evil.test", "/\r\n/evil.test", "/profile\r\nSet-Cookie: x=1"] {
        let response = server
            .post("/login")
            .form(&[("username", "wanda"), ("password", "hunter22"), ("next", next)])
            .await;
        response.assert_status(StatusCode::FOUND);
        assert_eq!(location(&response), "/");

        let response = server
            .get("/login")
            .add_query_param("next", next)
            .add_header(header::COOKIE, cookie(&token))
            .await;
        response.assert_status(StatusCode::FOUND);
        assert_eq!(location(&response), "/");
    }
}

#[tokio::test]
async fn test_logout_ends_session() {
    let server = setup().await;
    let token = signup(&server, "clint").await;

    server
        .get("/profile")
        .add_header(header::COOKIE, cookie(&token))
        .await
        .assert_status_ok();

    server
        .get("/logout")
        .add_header(header::COOKIE, cookie(&token))
        .await
        .assert_status(StatusCode::FOUND);

    let response = server
        .get("/profile")
        .add_header(header::COOKIE, cookie(&token))
        .await;
    response.assert_status(StatusCode::FOUND);
}

#[tokio::test]
async fn test_profile_requires_login() {
    let server = setup().await;

    let response = server.get("/profile").await;
    response.assert_status(StatusCode::FOUND);
    assert_eq!(location(&response), "/login?next=%2Fprofile");

    let token = signup(&server, "wanda").await;
    let response = server
        .get("/profile")
        .add_header(header::COOKIE, cookie(&token))
        .await;
    response.assert_status_ok();
    let text = response.text();
    assert!(text.contains("wanda"));
    assert!(text.contains("Test User"));
    assert!(text.contains("gravatar.com"));
}

#[tokio::test]
async fn test_avatar_update() {
    let server = setup().await;

    server
        .post("/profile/avatar")
        .json(&json!({ "avatarUrl": "https://img.test/a.png" }))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    let token = signup(&server, "vision").await;
    let response = server
        .post("/profile/avatar")
        .add_header(header::COOKIE, cookie(&token))
        .json(&json!({ "avatarUrl": "https://img.test/a.png" }))
        .await;
    response.assert_status_ok();
    response.assert_json(&json!({ "success": true }));

    let response = server
        .get("/profile")
        .add_header(header::COOKIE, cookie(&token))
        .await;
    assert!(response.text().contains("https:&#x2F;&#x2F;img.test&#x2F;a.png"));
}

#[tokio::test]
async fn test_admin_api_requires_admin() {
    let server = setup().await;

    server
        .get("/admin/api/dashboard")
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    let admin = signup(&server, "fury").await;
    let member = signup(&server, "coulson").await;

    server
        .get("/admin/api/dashboard")
        .add_header(header::COOKIE, cookie(&member))
        .await
        .assert_status(StatusCode::FORBIDDEN);

    let response = server
        .get("/admin/api/dashboard")
        .add_header(header::COOKIE, cookie(&admin))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["counts"]["characters"], 0);
}

#[tokio::test]
async fn test_admin_catalog_crud() {
    let server = setup().await;
    let admin = signup(&server, "fury").await;

    let id = create_entry(&server, &admin, "characters", "Captain America").await;

    let response = server
        .get("/admin/api/characters")
        .add_query_param("q", "captain")
        .add_header(header::COOKIE, cookie(&admin))
        .await;
    let body: Value = response.json();
    assert_eq!(body["entries"].as_array().unwrap().len(), 1);

    let response = server
        .put(&format!("/admin/api/characters/{}", id))
        .add_header(header::COOKIE, cookie(&admin))
        .json(&json!({ "title": "Steve Rogers" }))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["entry"]["title"], "Steve Rogers");

    let response = server.get(&format!("/characters/{}", id)).await;
    response.assert_status_ok();
    assert!(response.text().contains("Steve Rogers"));

    server
        .delete(&format!("/admin/api/characters/{}", id))
        .add_header(header::COOKIE, cookie(&admin))
        .await
        .assert_status(StatusCode::NO_CONTENT);

    server
        .get(&format!("/characters/{}", id))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_appearances_link_detail_pages() {
    let server = setup().await;
    let admin = signup(&server, "fury").await;

    let thor = create_entry(&server, &admin, "characters", "Thor").await;
    let comic = create_entry(&server, &admin, "comics", "Journey into Mystery").await;

    let response = server
        .post("/admin/api/appearances/comics")
        .add_header(header::COOKIE, cookie(&admin))
        .json(&json!({ "character_id": thor, "work_id": comic }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let body: Value = response.json();
    assert_eq!(body["label"], "Thor in Journey into Mystery");

    let response = server.get(&format!("/characters/{}", thor)).await;
    assert!(response.text().contains(&format!("/comics/{}", comic)));

    let response = server.get(&format!("/comics/{}", comic)).await;
    assert!(response.text().contains(&format!("/characters/{}", thor)));

    server
        .post("/admin/api/appearances/comics")
        .add_header(header::COOKIE, cookie(&admin))
        .json(&json!({ "character_id": 999, "work_id": comic }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_comment_moderation_flow() {
    let server = setup().await;
    let admin = signup(&server, "fury").await;
    let member = signup(&server, "sam").await;
    let id = create_entry(&server, &admin, "series", "Falcon and Winter Soldier").await;
    let path = format!("/series/{}", id);

    let response = server
        .post(&format!("{}/comments", path))
        .form(&[("user_comment", "On your left")])
        .await;
    response.assert_status(StatusCode::FOUND);
    assert_eq!(location(&response), format!("/login?next=%2Fseries%2F{}", id));

    let response = server
        .post(&format!("{}/comments", path))
        .add_header(header::COOKIE, cookie(&member))
        .form(&[("user_comment", "   ")])
        .await;
    assert_eq!(location(&response), format!("{}?comment=empty", path));

    let response = server
        .post(&format!("{}/comments", path))
        .add_header(header::COOKIE, cookie(&member))
        .form(&[("user_comment", "On your left")])
        .await;
    response.assert_status(StatusCode::FOUND);
    assert_eq!(location(&response), format!("{}?comment=pending", path));

    // Hidden until approved
    let response = server.get(&path).await;
    assert!(!response.text().contains("On your left"));

    let response = server
        .get("/admin/api/comments/series")
        .add_query_param("active", "false")
        .add_header(header::COOKIE, cookie(&admin))
        .await;
    let body: Value = response.json();
    let pending = body["comments"].as_array().unwrap();
    assert_eq!(pending.len(), 1);
    let comment_id = pending[0]["id"].as_i64().unwrap();

    let response = server
        .post("/admin/api/comments/series/approve")
        .add_header(header::COOKIE, cookie(&admin))
        .json(&json!({ "ids": [comment_id, comment_id] }))
        .await;
    response.assert_json(&json!({ "approved": 1 }));

    let response = server.get(&path).await;
    let text = response.text();
    assert!(text.contains("On your left"));
    assert!(text.contains("sam"));

    let response = server.get("/").await;
    assert!(response.text().contains("On your left"));
}

#[tokio::test]
async fn test_comment_on_missing_entry_is_404() {
    let server = setup().await;
    let token = signup(&server, "sam").await;

    server
        .post("/comics/42/comments")
        .add_header(header::COOKIE, cookie(&token))
        .form(&[("user_comment", "hello")])
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_favorite_toggle() {
    let server = setup().await;
    let admin = signup(&server, "fury").await;
    let member = signup(&server, "carol").await;
    let id = create_entry(&server, &admin, "characters", "Goose").await;
    let path = format!("/characters/{}", id);

    let response = server.post(&format!("{}/favorite", path)).await;
    response.assert_status(StatusCode::FOUND);
    assert!(location(&response).starts_with("/login?next="));

    let response = server
        .post(&format!("{}/favorite", path))
        .add_header(header::COOKIE, cookie(&member))
        .await;
    response.assert_status(StatusCode::FOUND);
    assert_eq!(location(&response), path);

    let response = server
        .get(&path)
        .add_header(header::COOKIE, cookie(&member))
        .await;
    assert!(response.text().contains("Remove from favorites"));

    let response = server
        .get("/profile")
        .add_header(header::COOKIE, cookie(&member))
        .await;
    assert!(response.text().contains("Goose"));

    server
        .post(&format!("{}/favorite", path))
        .add_header(header::COOKIE, cookie(&member))
        .await
        .assert_status(StatusCode::FOUND);

    let response = server
        .get(&path)
        .add_header(header::COOKIE, cookie(&member))
        .await;
    assert!(response.text().contains("Add to favorites"));
}

#[tokio::test]
async fn test_cross_site_posts_are_rejected() {
    let server = setup().await;
    let token = signup(&server, "loki").await;

    server
        .post("/logout")
        .add_header(header::ORIGIN, HeaderValue::from_static("https://evil.test"))
        .await
        .assert_status(StatusCode::FORBIDDEN);

    server
        .post("/logout")
        .add_header(header::ORIGIN, HeaderValue::from_static("http://localhost:8080"))
        .await
        .assert_status(StatusCode::FOUND);

    // Avatar endpoint is exempt
    server
        .post("/profile/avatar")
        .add_header(header::ORIGIN, HeaderValue::from_static("https://evil.test"))
        .add_header(header::COOKIE, cookie(&token))
        .json(&json!({ "avatarUrl": "" }))
        .await
        .assert_status_ok();
}
