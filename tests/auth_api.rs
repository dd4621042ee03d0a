mod common;

use actix_web::{test, web, App};
use common::test_state;
use pioneer_auth::auth::handlers::{login, logout, refresh, register, verify};
use serde_json::json;

macro_rules! test_app {
    ($state:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new($state.clone()))
                .route("/auth/register", web::post().to(register))
                .route("/auth/verify", web::post().to(verify))
                .route("/auth/login", web::post().to(login))
                .route("/auth/refresh", web::post().to(refresh))
                .route("/auth/logout", web::post().to(logout)),
        )
        .await
    };
}

#[actix_web::test]
async fn test_register_verify_login_refresh_logout() {
    let (state, mailer) = test_state();
    let app = test_app!(state);

    // Register: accepted, code goes out by email
    let response = test::TestRequest::post()
        .uri("/auth/register")
        .set_json(json!({"email": "a@x.com", "password": "Abcd1234!"}))
        .send_request(&app)
        .await;
    assert_eq!(response.status(), 202);
    let body: serde_json::Value = test::read_body_json(response).await;
    assert_eq!(body["email"], "a@x.com");
    assert!(body["message"].as_str().unwrap().contains("code"));

    // Verify with the delivered code
    let code = mailer.last_code().await;
    let response = test::TestRequest::post()
        .uri("/auth/verify")
        .set_json(json!({"email": "a@x.com", "code": code}))
        .send_request(&app)
        .await;
    assert_eq!(response.status(), 201);

    // Login returns the token pair wire shape
    let response = test::TestRequest::post()
        .uri("/auth/login")
        .set_json(json!({"email": "a@x.com", "password": "Abcd1234!"}))
        .send_request(&app)
        .await;
    assert_eq!(response.status(), 200);
    let pair: serde_json::Value = test::read_body_json(response).await;
    assert_eq!(pair["token_type"], "Bearer");
    assert_eq!(pair["expires_in"], 900);
    assert!(pair["access_token"].is_string());
    let refresh_token = pair["refresh_token"].as_str().unwrap().to_string();

    // Refresh rotates the token
    let response = test::TestRequest::post()
        .uri("/auth/refresh")
        .set_json(json!({"refresh_token": refresh_token}))
        .send_request(&app)
        .await;
    assert_eq!(response.status(), 200);
    let rotated: serde_json::Value = test::read_body_json(response).await;
    let new_refresh = rotated["refresh_token"].as_str().unwrap().to_string();
    assert_ne!(new_refresh, refresh_token);

    // The presented token is spent
    let response = test::TestRequest::post()
        .uri("/auth/refresh")
        .set_json(json!({"refresh_token": refresh_token}))
        .send_request(&app)
        .await;
    assert_eq!(response.status(), 401);

    // Logout, then the rotated token is dead too
    let response = test::TestRequest::post()
        .uri("/auth/logout")
        .set_json(json!({"refresh_token": new_refresh}))
        .send_request(&app)
        .await;
    assert_eq!(response.status(), 200);

    let response = test::TestRequest::post()
        .uri("/auth/refresh")
        .set_json(json!({"refresh_token": new_refresh}))
        .send_request(&app)
        .await;
    assert_eq!(response.status(), 401);
}

#[actix_web::test]
async fn test_register_conflict_for_existing_user() {
    let (state, mailer) = test_state();
    let app = test_app!(state);

    let response = test::TestRequest::post()
        .uri("/auth/register")
        .set_json(json!({"email": "a@x.com", "password": "Abcd1234!"}))
        .send_request(&app)
        .await;
    assert_eq!(response.status(), 202);

    let code = mailer.last_code().await;
    let response = test::TestRequest::post()
        .uri("/auth/verify")
        .set_json(json!({"email": "a@x.com", "code": code}))
        .send_request(&app)
        .await;
    assert_eq!(response.status(), 201);

    let response = test::TestRequest::post()
        .uri("/auth/register")
        .set_json(json!({"email": "a@x.com", "password": "Abcd1234!"}))
        .send_request(&app)
        .await;
    assert_eq!(response.status(), 409);
}

#[actix_web::test]
async fn test_register_missing_fields() {
    let (state, _mailer) = test_state();
    let app = test_app!(state);

    let response = test::TestRequest::post()
        .uri("/auth/register")
        .set_json(json!({"email": "a@x.com", "password": ""}))
        .send_request(&app)
        .await;
    assert_eq!(response.status(), 400);
}

#[actix_web::test]
async fn test_register_rate_limit_returns_429() {
    let (state, _mailer) = test_state();
    let app = test_app!(state);

    for _ in 0..3 {
        let response = test::TestRequest::post()
            .uri("/auth/register")
            .set_json(json!({"email": "a@x.com", "password": "Abcd1234!"}))
            .send_request(&app)
            .await;
        assert_eq!(response.status(), 202);
    }

    let response = test::TestRequest::post()
        .uri("/auth/register")
        .set_json(json!({"email": "a@x.com", "password": "Abcd1234!"}))
        .send_request(&app)
        .await;
    assert_eq!(response.status(), 429);
}

#[actix_web::test]
async fn test_verify_wrong_code_is_bad_request() {
    let (state, _mailer) = test_state();
    let app = test_app!(state);

    let response = test::TestRequest::post()
        .uri("/auth/register")
        .set_json(json!({"email": "a@x.com", "password": "Abcd1234!"}))
        .send_request(&app)
        .await;
    assert_eq!(response.status(), 202);

    let response = test::TestRequest::post()
        .uri("/auth/verify")
        .set_json(json!({"email": "a@x.com", "code": "zzzzzz"}))
        .send_request(&app)
        .await;
    assert_eq!(response.status(), 400);
}

#[actix_web::test]
async fn test_login_failures_share_status_and_message() {
    let (state, mailer) = test_state();
    let app = test_app!(state);

    let response = test::TestRequest::post()
        .uri("/auth/register")
        .set_json(json!({"email": "a@x.com", "password": "Abcd1234!"}))
        .send_request(&app)
        .await;
    assert_eq!(response.status(), 202);
    let code = mailer.last_code().await;
    let response = test::TestRequest::post()
        .uri("/auth/verify")
        .set_json(json!({"email": "a@x.com", "code": code}))
        .send_request(&app)
        .await;
    assert_eq!(response.status(), 201);

    let unknown = test::TestRequest::post()
        .uri("/auth/login")
        .set_json(json!({"email": "ghost@x.com", "password": "Abcd1234!"}))
        .send_request(&app)
        .await;
    assert_eq!(unknown.status(), 401);
    let unknown_body: serde_json::Value = test::read_body_json(unknown).await;

    let wrong = test::TestRequest::post()
        .uri("/auth/login")
        .set_json(json!({"email": "a@x.com", "password": "Wrong1234!"}))
        .send_request(&app)
        .await;
    assert_eq!(wrong.status(), 401);
    let wrong_body: serde_json::Value = test::read_body_json(wrong).await;

    // No account enumeration through the message text
    assert_eq!(unknown_body, wrong_body);
}

#[actix_web::test]
async fn test_logout_accepts_bearer_header_fallback() {
    let (state, mailer) = test_state();
    let app = test_app!(state);

    let response = test::TestRequest::post()
        .uri("/auth/register")
        .set_json(json!({"email": "a@x.com", "password": "Abcd1234!"}))
        .send_request(&app)
        .await;
    assert_eq!(response.status(), 202);
    let code = mailer.last_code().await;
    test::TestRequest::post()
        .uri("/auth/verify")
        .set_json(json!({"email": "a@x.com", "code": code}))
        .send_request(&app)
        .await;
    let login_response = test::TestRequest::post()
        .uri("/auth/login")
        .set_json(json!({"email": "a@x.com", "password": "Abcd1234!"}))
        .send_request(&app)
        .await;
    let pair: serde_json::Value = test::read_body_json(login_response).await;
    let refresh_token = pair["refresh_token"].as_str().unwrap().to_string();

    let response = test::TestRequest::post()
        .uri("/auth/logout")
        .insert_header(("Authorization", format!("Bearer {}", refresh_token)))
        .set_json(json!({}))
        .send_request(&app)
        .await;
    assert_eq!(response.status(), 200);

    let response = test::TestRequest::post()
        .uri("/auth/refresh")
        .set_json(json!({"refresh_token": refresh_token}))
        .send_request(&app)
        .await;
    assert_eq!(response.status(), 401);
}
