use actix_web::{test, web, App, HttpResponse};
use uuid::Uuid;

use hrgate::auth::issue_access_token;
use hrgate::configuration::SecuritySettings;
use hrgate::middleware::{AuthContext, AuthGate, Capability};
use hrgate::store::Role;

fn test_settings() -> SecuritySettings {
    SecuritySettings {
        jwt_secret: "test-secret-key-at-least-32-characters-long".to_string(),
        cipher_key: String::new(),
        issuer: "hrgate-test".to_string(),
        reset_link_base_url: String::new(),
        access_token_expiry: 1800,
        refresh_token_expiry: 604_800,
        reset_token_expiry: 900,
        bcrypt_cost: 4,
        max_login_attempts: 5,
        lockout_duration: 300,
        secure_cookies: false,
    }
}

/// Echoes the identity the gate resolved.
async fn whoami(context: web::ReqData<AuthContext>) -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "subject_id": context.subject_id.to_string(),
        "role": context.role.as_str(),
    }))
}

/// A handler that layers a capability requirement on top of the gate.
async fn reports(
    context: web::ReqData<AuthContext>,
) -> Result<HttpResponse, hrgate::error::AuthError> {
    context.require(Capability::ViewReports)?;
    Ok(HttpResponse::Ok().finish())
}

macro_rules! gated_app {
    ($settings:expr) => {
        test::init_service(
            App::new().service(
                web::scope("")
                    .wrap(AuthGate::new($settings))
                    .route("/whoami", web::get().to(whoami))
                    .route("/reports", web::get().to(reports)),
            ),
        )
        .await
    };
}

#[actix_web::test]
async fn valid_token_reaches_handler_with_resolved_identity() {
    let settings = test_settings();
    let app = gated_app!(settings.clone());

    let subject_id = Uuid::new_v4();
    let token = issue_access_token(subject_id, Role::Manager, &settings).unwrap();

    let req = test::TestRequest::get()
        .uri("/whoami")
        .insert_header(("Authorization", format!("Bearer {}", token)))
        .to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(body["subject_id"], subject_id.to_string());
    assert_eq!(body["role"], "manager");
}

#[actix_web::test]
async fn missing_and_invalid_tokens_get_the_same_401() {
    let settings = test_settings();
    let app = gated_app!(settings.clone());

    let token = issue_access_token(Uuid::new_v4(), Role::Hr, &settings).unwrap();

    let cases = vec![
        test::TestRequest::get().uri("/whoami").to_request(),
        test::TestRequest::get()
            .uri("/whoami")
            .insert_header(("Authorization", "Basic abc123"))
            .to_request(),
        test::TestRequest::get()
            .uri("/whoami")
            .insert_header(("Authorization", "Bearer not.a.token"))
            .to_request(),
        test::TestRequest::get()
            .uri("/whoami")
            .insert_header(("Authorization", format!("Bearer {}X", token)))
            .to_request(),
    ];

    for req in cases {
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status().as_u16(), 401);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["code"], "UNAUTHENTICATED");
        assert_eq!(body["error"], "Authentication failed");
    }
}

#[actix_web::test]
async fn expired_token_is_rejected() {
    let settings = test_settings();
    let app = gated_app!(settings.clone());

    let mut stale = settings.clone();
    stale.access_token_expiry = -7200;
    let token = issue_access_token(Uuid::new_v4(), Role::Hr, &stale).unwrap();

    let req = test::TestRequest::get()
        .uri("/whoami")
        .insert_header(("Authorization", format!("Bearer {}", token)))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status().as_u16(), 401);
}

#[actix_web::test]
async fn capability_check_layers_on_top_of_the_gate() {
    let settings = test_settings();
    let app = gated_app!(settings.clone());

    let manager = issue_access_token(Uuid::new_v4(), Role::Manager, &settings).unwrap();
    let employee = issue_access_token(Uuid::new_v4(), Role::Employee, &settings).unwrap();

    let req = test::TestRequest::get()
        .uri("/reports")
        .insert_header(("Authorization", format!("Bearer {}", manager)))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status().as_u16(), 200);

    // Authenticated but not authorized: 403, not 401.
    let req = test::TestRequest::get()
        .uri("/reports")
        .insert_header(("Authorization", format!("Bearer {}", employee)))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 403);
}
