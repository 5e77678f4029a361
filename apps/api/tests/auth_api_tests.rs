// snapcart/apps/api/tests/auth_api_tests.rs
#[macro_use]
mod common;

use actix_web::http::StatusCode;
use actix_web::test::{self, TestRequest};
use chrono::{Duration, Utc};
use common::*;
use serde_json::json;
use snapcart_api::models::Role;

#[actix_web::test]
async fn signup_login_and_me() {
  let h = harness();
  let app = init_app!(h.state);

  let req = TestRequest::post().uri("/api/auth/signup").set_json(json!({
    "name": "Asha",
    "email": "Asha@Example.com",
    "password": "correct-horse",
  }));
  let resp = test::call_service(&app, req.to_request()).await;
  assert_eq!(resp.status(), StatusCode::CREATED);
  let access_cookie = resp
    .response()
    .cookies()
    .find(|c| c.name() == "access_token")
    .map(|c| c.into_owned())
    .expect("access cookie set");
  assert_eq!(access_cookie.http_only(), Some(true));
  let (_, body) = json_of(resp).await;
  assert_eq!(body["user"]["email"], "asha@example.com");
  assert_eq!(body["user"]["role"], "customer");
  assert!(body["user"].get("password_hash").is_none());
  assert_eq!(body["welcomeEmailSent"], true);
  assert_eq!(h.notifier.sent().len(), 1);

  let (status, body) = send!(
    app,
    TestRequest::post()
      .uri("/api/auth/login")
      .set_json(json!({ "email": "asha@example.com", "password": "wrong-password" }))
  );
  assert_eq!(status, StatusCode::UNAUTHORIZED);
  assert_eq!(body["error"], "Invalid email or password.");

  let (status, body) = send!(
    app,
    TestRequest::post()
      .uri("/api/auth/login")
      .set_json(json!({ "email": "ASHA@example.com", "password": "correct-horse" }))
  );
  assert_eq!(status, StatusCode::OK);
  let access = body["tokens"]["access_token"].as_str().expect("access token").to_string();

  let (status, body) = send!(app, TestRequest::get().uri("/api/auth/me").insert_header(bearer(&access)));
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["user"]["name"], "Asha");

  let (status, _) = send!(app, TestRequest::get().uri("/api/auth/me").cookie(access_cookie));
  assert_eq!(status, StatusCode::OK);

  let (status, _) = send!(app, TestRequest::get().uri("/api/auth/me"));
  assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn signup_rejections() {
  let h = harness();
  let app = init_app!(h.state);
  h.user(Role::Customer, "taken@example.com").await;

  let cases = [
    (json!({ "name": "A", "email": "taken@example.com", "password": "long-enough" }), StatusCode::CONFLICT),
    (json!({ "name": "A", "email": "new@example.com", "password": "short" }), StatusCode::BAD_REQUEST),
    (json!({ "name": "A", "email": "not-an-email", "password": "long-enough" }), StatusCode::BAD_REQUEST),
    (
      json!({ "name": "A", "email": "boss@example.com", "password": "long-enough", "role": "admin" }),
      StatusCode::FORBIDDEN,
    ),
    (
      json!({ "name": "A", "email": "shop@example.com", "password": "long-enough", "role": "seller" }),
      StatusCode::BAD_REQUEST,
    ),
  ];
  for (payload, expected) in cases {
    let (status, body) = send!(app, TestRequest::post().uri("/api/auth/signup").set_json(payload.clone()));
    assert_eq!(status, expected, "payload {} -> {}", payload, body);
    assert!(body["error"].is_string());
  }

  let (status, body) = send!(
    app,
    TestRequest::post().uri("/api/auth/signup").set_json(json!({
      "name": "Ravi",
      "email": "shop@example.com",
      "password": "long-enough",
      "role": "seller",
      "store_name": "Ravi Traders",
    }))
  );
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(body["user"]["role"], "seller");
  assert_eq!(body["user"]["store_name"], "Ravi Traders");
}

#[actix_web::test]
async fn signup_succeeds_when_welcome_email_fails() {
  let h = harness_with_failing_email();
  let app = init_app!(h.state);

  let (status, body) = send!(
    app,
    TestRequest::post().uri("/api/auth/signup").set_json(json!({
      "name": "Meera",
      "email": "meera@example.com",
      "password": "long-enough",
    }))
  );
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(body["welcomeEmailSent"], false);
}

#[actix_web::test]
async fn refresh_and_access_tokens_are_not_interchangeable() {
  let h = harness();
  let app = init_app!(h.state);
  let (user, access) = h.user(Role::Customer, "kiran@example.com").await;
  let pair = h.state.tokens.issue_pair(&user).expect("pair");

  let (status, _) = send!(
    app,
    TestRequest::get().uri("/api/auth/me").insert_header(bearer(&pair.refresh_token))
  );
  assert_eq!(status, StatusCode::UNAUTHORIZED);

  let (status, _) = send!(
    app,
    TestRequest::post()
      .uri("/api/auth/refresh")
      .set_json(json!({ "refresh_token": access }))
  );
  assert_eq!(status, StatusCode::UNAUTHORIZED);

  let (status, body) = send!(
    app,
    TestRequest::post()
      .uri("/api/auth/refresh")
      .set_json(json!({ "refresh_token": pair.refresh_token }))
  );
  assert_eq!(status, StatusCode::OK);
  let renewed = body["tokens"]["access_token"].as_str().expect("renewed token").to_string();

  let (status, _) = send!(app, TestRequest::get().uri("/api/auth/me").insert_header(bearer(&renewed)));
  assert_eq!(status, StatusCode::OK);
}

#[actix_web::test]
async fn deactivated_accounts_are_locked_out() {
  let h = harness();
  let app = init_app!(h.state);
  let (user, access) = h.user(Role::Customer, "gone@example.com").await;
  let (_, admin_access) = h.user(Role::Admin, "root@example.com").await;

  let (status, body) = send!(
    app,
    TestRequest::patch()
      .uri(&format!("/api/admin/users/{}/active", user.id))
      .insert_header(bearer(&admin_access))
      .set_json(json!({ "is_active": false }))
  );
  assert_eq!(status, StatusCode::OK, "{}", body);

  let (status, _) = send!(app, TestRequest::get().uri("/api/auth/me").insert_header(bearer(&access)));
  assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn otp_login_creates_then_reuses_customer() {
  let h = harness();
  let app = init_app!(h.state);
  let phone = "+919876543210";

  let (status, body) = send!(
    app,
    TestRequest::post()
      .uri("/api/auth/otp/request")
      .set_json(json!({ "phone": format!(" {} ", phone) }))
  );
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["phone"], phone);
  let sms = h.notifier.last_sms_to(phone).expect("otp sms sent");
  let code = sms[..4].to_string();
  let wrong = if code == "0000" { "1111" } else { "0000" };

  let (status, _) = send!(
    app,
    TestRequest::post()
      .uri("/api/auth/otp/verify")
      .set_json(json!({ "phone": phone, "code": "12345" }))
  );
  assert_eq!(status, StatusCode::BAD_REQUEST);

  let (status, body) = send!(
    app,
    TestRequest::post()
      .uri("/api/auth/otp/verify")
      .set_json(json!({ "phone": phone, "code": wrong }))
  );
  assert_eq!(status, StatusCode::UNAUTHORIZED);
  assert_eq!(body["error"], "Invalid OTP.");

  let (status, body) = send!(
    app,
    TestRequest::post()
      .uri("/api/auth/otp/verify")
      .set_json(json!({ "phone": phone, "code": code }))
  );
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["accountCreated"], true);
  assert_eq!(body["user"]["phone"], phone);
  let first_id = body["user"]["id"].clone();

  // The code is single use.
  let (status, _) = send!(
    app,
    TestRequest::post()
      .uri("/api/auth/otp/verify")
      .set_json(json!({ "phone": phone, "code": code }))
  );
  assert_eq!(status, StatusCode::UNAUTHORIZED);

  send!(app, TestRequest::post().uri("/api/auth/otp/request").set_json(json!({ "phone": phone })));
  let code = h.notifier.last_sms_to(phone).expect("second otp")[..4].to_string();
  let (status, body) = send!(
    app,
    TestRequest::post()
      .uri("/api/auth/otp/verify")
      .set_json(json!({ "phone": phone, "code": code }))
  );
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["accountCreated"], false);
  assert_eq!(body["user"]["id"], first_id);
}

#[actix_web::test]
async fn otp_session_burns_after_max_attempts() {
  let h = harness();
  let app = init_app!(h.state);
  let phone = "9123456780";

  let (status, _) = send!(app, TestRequest::post().uri("/api/auth/otp/request").set_json(json!({ "phone": "12ab" })));
  assert_eq!(status, StatusCode::BAD_REQUEST);

  send!(app, TestRequest::post().uri("/api/auth/otp/request").set_json(json!({ "phone": phone })));
  let code = h.notifier.last_sms_to(phone).expect("otp sms")[..4].to_string();
  let wrong = if code == "0000" { "1111" } else { "0000" };

  for _ in 0..5 {
    let (status, _) = send!(
      app,
      TestRequest::post()
        .uri("/api/auth/otp/verify")
        .set_json(json!({ "phone": phone, "code": wrong }))
    );
    assert_eq!(status, StatusCode::UNAUTHORIZED);
  }

  let (status, _) = send!(
    app,
    TestRequest::post()
      .uri("/api/auth/otp/verify")
      .set_json(json!({ "phone": phone, "code": code }))
  );
  assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn expired_otp_is_rejected_and_discarded() {
  let h = harness();
  let app = init_app!(h.state);
  let phone = "9988776655";

  let issued_at = Utc::now() - h.state.otp.ttl() - Duration::seconds(1);
  let session = h.state.otp.new_session(phone, "4321", issued_at);
  h.state.repos.otp.replace_otp_session(session).await.expect("store session");

  let (status, body) = send!(
    app,
    TestRequest::post()
      .uri("/api/auth/otp/verify")
      .set_json(json!({ "phone": phone, "code": "4321" }))
  );
  assert_eq!(status, StatusCode::UNAUTHORIZED);
  assert_eq!(body["error"], "OTP has expired. Request a new one.");
  assert!(h.state.repos.otp.find_otp_session(phone).await.expect("lookup").is_none());
  assert!(h.state.repos.users.find_user_by_phone(phone).await.expect("lookup").is_none());
}

#[actix_web::test]
async fn logout_expires_cookies() {
  let h = harness();
  let app = init_app!(h.state);

  let resp = test::call_service(&app, TestRequest::post().uri("/api/auth/logout").to_request()).await;
  assert_eq!(resp.status(), StatusCode::OK);
  let cleared: Vec<_> = resp.response().cookies().map(|c| (c.name().to_string(), c.value().to_string())).collect();
  assert!(cleared.contains(&("access_token".to_string(), String::new())));
  assert!(cleared.contains(&("refresh_token".to_string(), String::new())));
}
