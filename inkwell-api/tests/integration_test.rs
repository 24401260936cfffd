/// Integration tests for the Inkwell API
///
/// Router-level tests run against a pool that never connects and cover what
/// is decided before the database is touched: authentication, validation,
/// routing and headers.
///
/// Tests marked `#[ignore]` need PostgreSQL:
/// cargo test --test integration_test -- --ignored

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::{expect_status, json_body, lazy_app, send, token_for, TestContext};
use inkwell_shared::models::comment::CommentStatus;
use serde_json::json;
use tower::ServiceExt;
use uuid::Uuid;

#[tokio::test]
async fn test_unknown_route_is_json_404() {
    let app = lazy_app();

    let body = expect_status(&app, "GET", "/api/nope", None, None, StatusCode::NOT_FOUND).await;
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn test_gated_route_without_token_is_401() {
    let app = lazy_app();

    for (method, uri) in [
        ("GET", "/api/comments"),
        ("GET", "/api/post/all"),
        ("GET", "/api/users/me"),
        ("GET", "/api/newsletter/subscribers"),
        ("DELETE", "/api/site-content/home/hero"),
    ] {
        expect_status(&app, method, uri, None, None, StatusCode::UNAUTHORIZED).await;
    }
}

#[tokio::test]
async fn test_token_with_wrong_signature_is_401() {
    let app = lazy_app();

    let forged = inkwell_shared::auth::jwt::create_token(
        &inkwell_shared::auth::jwt::Claims::new(Uuid::new_v4()),
        "some-other-secret-that-is-also-long-enough",
    )
    .unwrap();

    expect_status(&app, "GET", "/api/comments", Some(&forged), None, StatusCode::UNAUTHORIZED).await;
}

#[tokio::test]
async fn test_garbage_token_is_401() {
    let app = lazy_app();

    expect_status(
        &app,
        "GET",
        "/api/comments",
        Some("not.a.jwt"),
        None,
        StatusCode::UNAUTHORIZED,
    )
    .await;
}

#[tokio::test]
async fn test_like_with_invalid_identifier_is_422() {
    let app = lazy_app();

    let body = expect_status(
        &app,
        "POST",
        "/api/likes",
        None,
        Some(json!({"post_id": Uuid::new_v4(), "user_identifier": "bad id!"})),
        StatusCode::UNPROCESSABLE_ENTITY,
    )
    .await;

    assert_eq!(body["error"], "validation_error");
    assert_eq!(body["details"][0]["field"], "user_identifier");
}

#[tokio::test]
async fn test_comment_validation_is_422() {
    let app = lazy_app();

    let post_id = Uuid::new_v4();

    expect_status(
        &app,
        "POST",
        "/api/comments",
        None,
        Some(json!({"post_id": post_id, "user_identifier": "device-0001", "message": ""})),
        StatusCode::UNPROCESSABLE_ENTITY,
    )
    .await;

    expect_status(
        &app,
        "POST",
        "/api/comments",
        None,
        Some(json!({"post_id": post_id, "user_identifier": "device-0001", "message": "   "})),
        StatusCode::UNPROCESSABLE_ENTITY,
    )
    .await;

    expect_status(
        &app,
        "POST",
        "/api/comments",
        None,
        Some(json!({"post_id": post_id, "user_identifier": "short", "message": "Hi"})),
        StatusCode::UNPROCESSABLE_ENTITY,
    )
    .await;
}

#[tokio::test]
async fn test_malformed_json_is_400() {
    let app = lazy_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/likes")
                .header("content-type", "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_invalid_path_uuid_is_400() {
    let app = lazy_app();

    expect_status(
        &app,
        "GET",
        "/api/likes/count/not-a-uuid",
        None,
        None,
        StatusCode::BAD_REQUEST,
    )
    .await;
}

#[tokio::test]
async fn test_invalid_site_content_key_is_422() {
    let app = lazy_app();

    expect_status(
        &app,
        "GET",
        "/api/site-content/Home%20Page",
        None,
        None,
        StatusCode::UNPROCESSABLE_ENTITY,
    )
    .await;
}

#[tokio::test]
async fn test_security_headers_present() {
    let app = lazy_app();

    let response = send(&app, "GET", "/api/nope", None, None).await;
    let headers = response.headers();

    assert_eq!(headers["x-content-type-options"], "nosniff");
    assert_eq!(headers["x-frame-options"], "DENY");
    assert!(headers.contains_key("content-security-policy"));
    assert!(!headers.contains_key("strict-transport-security"));
}

#[tokio::test]
async fn test_health_reports_database_down() {
    let app = lazy_app();

    let response = send(&app, "GET", "/health", None, None).await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let body = json_body(response).await;
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["database"], "disconnected");
    assert_eq!(body["cache"], "disabled");
}

// Database-backed flows

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_like_flow_is_idempotent() {
    let ctx = TestContext::new().await.unwrap();
    let post = ctx.published_post().await;
    let post_id = post["id"].as_str().unwrap();

    let like = json!({"post_id": post_id, "user_identifier": "device-like-0001"});

    let first = expect_status(&ctx.app, "POST", "/api/likes", None, Some(like.clone()), StatusCode::OK).await;
    assert_eq!(first["liked"], true);
    assert_eq!(first["like_count"], 1);

    let second = expect_status(&ctx.app, "POST", "/api/likes", None, Some(like.clone()), StatusCode::OK).await;
    assert_eq!(second["like_count"], 1);

    let count = expect_status(
        &ctx.app,
        "GET",
        &format!("/api/likes/count/{}", post_id),
        None,
        None,
        StatusCode::OK,
    )
    .await;
    assert_eq!(count["like_count"], 1);

    let removed = expect_status(&ctx.app, "DELETE", "/api/likes", None, Some(like.clone()), StatusCode::OK).await;
    assert_eq!(removed["liked"], false);
    assert_eq!(removed["like_count"], 0);

    let again = expect_status(&ctx.app, "DELETE", "/api/likes", None, Some(like), StatusCode::OK).await;
    assert_eq!(again["like_count"], 0);
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_comment_moderation_flow() {
    let ctx = TestContext::new().await.unwrap();
    let post = ctx.published_post().await;
    let post_id = post["id"].as_str().unwrap();

    let root = expect_status(
        &ctx.app,
        "POST",
        "/api/comments",
        None,
        Some(json!({"post_id": post_id, "user_identifier": "device-0001", "message": "First!"})),
        StatusCode::CREATED,
    )
    .await;
    let root_id = root["id"].as_str().unwrap();

    let reply = expect_status(
        &ctx.app,
        "POST",
        "/api/comments",
        None,
        Some(json!({
            "post_id": post_id,
            "parent_id": root_id,
            "user_identifier": "device-0002",
            "message": "Reply"
        })),
        StatusCode::CREATED,
    )
    .await;
    assert_eq!(reply["parent_id"], root["id"]);

    let tree_uri = format!("/api/comments/post/{}", post_id);
    let tree = expect_status(&ctx.app, "GET", &tree_uri, None, None, StatusCode::OK).await;
    assert_eq!(tree["total"], 2);
    assert_eq!(tree["comments"][0]["replies"][0]["message"], "Reply");
    assert!(tree["comments"][0].get("user_identifier").is_none());

    // moderators only
    expect_status(
        &ctx.app,
        "PATCH",
        &format!("/api/comments/{}", root_id),
        None,
        Some(json!({"status": "rejected"})),
        StatusCode::UNAUTHORIZED,
    )
    .await;

    expect_status(
        &ctx.app,
        "PATCH",
        &format!("/api/comments/{}", root_id),
        Some(&ctx.moderator_token),
        Some(json!({"status": "rejected"})),
        StatusCode::OK,
    )
    .await;

    let tree = expect_status(&ctx.app, "GET", &tree_uri, None, None, StatusCode::OK).await;
    assert_eq!(tree["total"], 1);
    assert_eq!(tree["comments"][0]["message"], "Reply");

    let all = expect_status(
        &ctx.app,
        "GET",
        &format!("/api/comments?post_id={}", post_id),
        Some(&ctx.moderator_token),
        None,
        StatusCode::OK,
    )
    .await;
    assert_eq!(all["total"], 2);
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_reply_to_other_post_is_400() {
    let ctx = TestContext::new().await.unwrap();
    let first = ctx.published_post().await;
    let second = ctx.published_post().await;

    let root = expect_status(
        &ctx.app,
        "POST",
        "/api/comments",
        None,
        Some(json!({"post_id": first["id"], "user_identifier": "device-0001", "message": "Hi"})),
        StatusCode::CREATED,
    )
    .await;

    expect_status(
        &ctx.app,
        "POST",
        "/api/comments",
        None,
        Some(json!({
            "post_id": second["id"],
            "parent_id": root["id"],
            "user_identifier": "device-0001",
            "message": "Wrong thread"
        })),
        StatusCode::BAD_REQUEST,
    )
    .await;
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_delete_post_cascades_through_api() {
    let ctx = TestContext::new().await.unwrap();
    let post = ctx.published_post().await;
    let post_id = post["id"].as_str().unwrap();

    expect_status(
        &ctx.app,
        "POST",
        "/api/comments",
        None,
        Some(json!({"post_id": post_id, "user_identifier": "device-0001", "message": "Hi"})),
        StatusCode::CREATED,
    )
    .await;

    expect_status(
        &ctx.app,
        "DELETE",
        &format!("/api/post/{}", post_id),
        Some(&ctx.editor_token),
        None,
        StatusCode::NO_CONTENT,
    )
    .await;

    let (comments,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM comments WHERE post_id = $1")
        .bind(Uuid::parse_str(post_id).unwrap())
        .fetch_one(&ctx.db)
        .await
        .unwrap();
    assert_eq!(comments, 0);

    expect_status(
        &ctx.app,
        "GET",
        &format!("/api/comments/post/{}", post_id),
        None,
        None,
        StatusCode::NOT_FOUND,
    )
    .await;
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_role_checks() {
    let ctx = TestContext::new().await.unwrap();

    expect_status(
        &ctx.app,
        "POST",
        "/api/post",
        Some(&ctx.moderator_token),
        Some(json!({"title": "Nope", "content": "x"})),
        StatusCode::FORBIDDEN,
    )
    .await;

    expect_status(
        &ctx.app,
        "GET",
        "/api/users",
        Some(&ctx.editor_token),
        None,
        StatusCode::FORBIDDEN,
    )
    .await;

    expect_status(&ctx.app, "GET", "/api/users", Some(&ctx.admin_token), None, StatusCode::OK).await;

    let pending = common::create_user(
        &ctx.db,
        inkwell_shared::models::user::UserRole::Admin,
        inkwell_shared::models::user::UserStatus::Pending,
    )
    .await
    .unwrap();
    expect_status(
        &ctx.app,
        "GET",
        "/api/users/me",
        Some(&token_for(pending.id)),
        None,
        StatusCode::FORBIDDEN,
    )
    .await;
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_unpublished_post_is_hidden() {
    let ctx = TestContext::new().await.unwrap();

    let draft = expect_status(
        &ctx.app,
        "POST",
        "/api/post",
        Some(&ctx.editor_token),
        Some(json!({"title": format!("Draft {}", Uuid::new_v4().simple()), "content": "x"})),
        StatusCode::CREATED,
    )
    .await;
    let slug = draft["slug"].as_str().unwrap();

    expect_status(
        &ctx.app,
        "GET",
        &format!("/api/post/slug/{}", slug),
        None,
        None,
        StatusCode::NOT_FOUND,
    )
    .await;

    expect_status(
        &ctx.app,
        "POST",
        "/api/likes",
        None,
        Some(json!({"post_id": draft["id"], "user_identifier": "device-0001"})),
        StatusCode::NOT_FOUND,
    )
    .await;
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_pending_default_hides_new_comments() {
    let ctx = TestContext::with_config(|config| {
        config.comments.default_status = CommentStatus::Pending;
    })
    .await
    .unwrap();
    let post = ctx.published_post().await;
    let post_id = post["id"].as_str().unwrap();

    let created = expect_status(
        &ctx.app,
        "POST",
        "/api/comments",
        None,
        Some(json!({"post_id": post_id, "user_identifier": "device-0001", "message": "Held"})),
        StatusCode::CREATED,
    )
    .await;
    assert_eq!(created["status"], "pending");
    let comment_id = created["id"].as_str().unwrap();

    let tree_uri = format!("/api/comments/post/{}", post_id);
    let tree = expect_status(&ctx.app, "GET", &tree_uri, None, None, StatusCode::OK).await;
    assert_eq!(tree["total"], 0);

    expect_status(
        &ctx.app,
        "PATCH",
        &format!("/api/comments/{}", comment_id),
        Some(&ctx.moderator_token),
        Some(json!({"status": "approved"})),
        StatusCode::OK,
    )
    .await;

    let tree = expect_status(&ctx.app, "GET", &tree_uri, None, None, StatusCode::OK).await;
    assert_eq!(tree["total"], 1);
    assert_eq!(tree["comments"][0]["message"], "Held");
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_blank_title_and_name_are_422() {
    let ctx = TestContext::new().await.unwrap();

    let body = expect_status(
        &ctx.app,
        "POST",
        "/api/post",
        Some(&ctx.editor_token),
        Some(json!({"title": "   ", "slug": format!("blank-{}", Uuid::new_v4().simple()), "content": "x"})),
        StatusCode::UNPROCESSABLE_ENTITY,
    )
    .await;
    assert_eq!(body["details"][0]["field"], "title");

    let post = ctx.published_post().await;
    let body = expect_status(
        &ctx.app,
        "PUT",
        &format!("/api/post/{}", post["id"].as_str().unwrap()),
        Some(&ctx.editor_token),
        Some(json!({"title": " \t "})),
        StatusCode::UNPROCESSABLE_ENTITY,
    )
    .await;
    assert_eq!(body["details"][0]["field"], "title");

    let body = expect_status(
        &ctx.app,
        "POST",
        "/api/category",
        Some(&ctx.editor_token),
        Some(json!({"name": "  ", "slug": format!("blank-{}", Uuid::new_v4().simple())})),
        StatusCode::UNPROCESSABLE_ENTITY,
    )
    .await;
    assert_eq!(body["details"][0]["field"], "name");
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_admin_cannot_change_own_account() {
    let ctx = TestContext::new().await.unwrap();

    let second = common::create_user(
        &ctx.db,
        inkwell_shared::models::user::UserRole::Admin,
        inkwell_shared::models::user::UserStatus::Active,
    )
    .await
    .unwrap();
    let second_token = token_for(second.id);
    let uri = format!("/api/users/{}", second.id);

    expect_status(
        &ctx.app,
        "PATCH",
        &uri,
        Some(&second_token),
        Some(json!({"role": "editor"})),
        StatusCode::FORBIDDEN,
    )
    .await;
    expect_status(&ctx.app, "DELETE", &uri, Some(&second_token), None, StatusCode::FORBIDDEN).await;

    // another admin may demote it; the caller remains an active admin
    let demoted = expect_status(
        &ctx.app,
        "PATCH",
        &uri,
        Some(&ctx.admin_token),
        Some(json!({"role": "editor"})),
        StatusCode::OK,
    )
    .await;
    assert_eq!(demoted["role"], "editor");

    expect_status(&ctx.app, "GET", "/api/users", Some(&second_token), None, StatusCode::FORBIDDEN).await;
    expect_status(&ctx.app, "GET", "/api/users", Some(&ctx.admin_token), None, StatusCode::OK).await;
}
