use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    response::Response,
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use api_ingress::ApiIngress;
use contacts::api::rest::dto::{ContactDto, MessageResponse};
use contacts::Contacts;
use db::{ConnectOpts, DbHandle};

/// Fresh in-memory database, migrated on first connect
fn create_test_db() -> Arc<DbHandle> {
    let db = DbHandle::new("sqlite::memory:", ConnectOpts::default())
        .expect("Failed to create test database handle")
        .with_on_connect(contacts::migrate);
    Arc::new(db)
}

/// Full HTTP stack (ingress middleware + contacts routes) over `db`
fn create_test_router(db: Arc<DbHandle>) -> Router {
    let module = Contacts::new(db);
    let routes = module.register_rest(Router::new());
    ApiIngress::default().build_router(routes, Some(Contacts::openapi()))
}

fn post_contact(body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/contacts")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get_contacts() -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri("/api/contacts")
        .body(Body::empty())
        .unwrap()
}

fn delete_contact(id: &str) -> Request<Body> {
    Request::builder()
        .method("DELETE")
        .uri(format!("/api/contacts/{id}"))
        .body(Body::empty())
        .unwrap()
}

async fn read_json<T: serde::de::DeserializeOwned>(response: Response) -> Result<T> {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
    Ok(serde_json::from_slice(&body)?)
}

#[tokio::test]
async fn test_rest_api_create_contact() -> Result<()> {
    let router = create_test_router(create_test_db());

    let response = router
        .oneshot(post_contact(&json!({
            "name": "Ann",
            "email": "Ann@Example.com",
            "phone": "555-1234",
            "message": "hi"
        })))
        .await?;
    assert_eq!(response.status(), StatusCode::CREATED);

    let raw: Value = read_json(response).await?;
    assert_eq!(raw["name"], "Ann");
    assert_eq!(raw["email"], "ann@example.com");
    assert_eq!(raw["phone"], "555-1234");
    assert_eq!(raw["message"], "hi");
    assert!(raw["id"].is_string());
    assert!(raw["createdAt"].is_string());

    Ok(())
}

#[tokio::test]
async fn test_rest_api_create_without_message_stores_null() -> Result<()> {
    let router = create_test_router(create_test_db());

    let response = router
        .oneshot(post_contact(&json!({
            "name": "Bob",
            "email": "bob@example.com",
            "phone": "555-0000"
        })))
        .await?;
    assert_eq!(response.status(), StatusCode::CREATED);

    let raw: Value = read_json(response).await?;
    assert!(raw["message"].is_null());

    Ok(())
}

#[tokio::test]
async fn test_rest_api_list_empty() -> Result<()> {
    let router = create_test_router(create_test_db());

    let response = router.oneshot(get_contacts()).await?;
    assert_eq!(response.status(), StatusCode::OK);

    let raw: Value = read_json(response).await?;
    assert_eq!(raw, json!([]));

    Ok(())
}

#[tokio::test]
async fn test_rest_api_list_newest_first() -> Result<()> {
    let router = create_test_router(create_test_db());

    for (name, email) in [
        ("First", "first@example.com"),
        ("Second", "second@example.com"),
        ("Third", "third@example.com"),
    ] {
        let response = router
            .clone()
            .oneshot(post_contact(
                &json!({"name": name, "email": email, "phone": "1"}),
            ))
            .await?;
        assert_eq!(response.status(), StatusCode::CREATED);
        tokio::time::sleep(Duration::from_millis(15)).await;
    }

    let response = router.oneshot(get_contacts()).await?;
    assert_eq!(response.status(), StatusCode::OK);

    let contacts: Vec<ContactDto> = read_json(response).await?;
    let names: Vec<&str> = contacts.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, ["Third", "Second", "First"]);

    Ok(())
}

#[tokio::test]
async fn test_rest_api_missing_fields() -> Result<()> {
    let router = create_test_router(create_test_db());

    let cases = [
        json!({}),
        json!({"email": "ann@example.com", "phone": "555"}),
        json!({"name": "Ann", "phone": "555"}),
        json!({"name": "Ann", "email": "ann@example.com"}),
        json!({"name": "", "email": "ann@example.com", "phone": "555"}),
        // Required check runs before the email check
        json!({"name": "Ann", "email": "not-an-email"}),
    ];

    for case in cases {
        let response = router.clone().oneshot(post_contact(&case)).await?;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{case}");
        let body: MessageResponse = read_json(response).await?;
        assert_eq!(
            body,
            MessageResponse::new("Name, email, and phone are required"),
            "{case}"
        );
    }

    // Nothing was stored
    let contacts: Vec<ContactDto> = read_json(router.oneshot(get_contacts()).await?).await?;
    assert!(contacts.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_rest_api_invalid_email() -> Result<()> {
    let router = create_test_router(create_test_db());

    for email in ["not-an-email", "a@b", "@b.com", "a b@c.com"] {
        let response = router
            .clone()
            .oneshot(post_contact(
                &json!({"name": "Ann", "email": email, "phone": "555"}),
            ))
            .await?;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{email}");
        let body: MessageResponse = read_json(response).await?;
        assert_eq!(body, MessageResponse::new("Invalid email format"), "{email}");
    }

    Ok(())
}

#[tokio::test]
async fn test_rest_api_malformed_body() -> Result<()> {
    let router = create_test_router(create_test_db());

    let request = Request::builder()
        .method("POST")
        .uri("/api/contacts")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let response = router.clone().oneshot(request).await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: MessageResponse = read_json(response).await?;
    assert_eq!(body.message, "Invalid request body");
    assert!(body.error.is_some());

    // Structured values cannot stand in for text
    let response = router
        .oneshot(post_contact(
            &json!({"name": {"first": "Ann"}, "email": "a@b.co", "phone": "1"}),
        ))
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: MessageResponse = read_json(response).await?;
    assert_eq!(body.message, "Invalid request body");

    Ok(())
}

#[tokio::test]
async fn test_rest_api_numeric_fields_are_stored_as_text() -> Result<()> {
    let router = create_test_router(create_test_db());

    let response = router
        .clone()
        .oneshot(post_contact(
            &json!({"name": 42, "email": "a@b.co", "phone": 5551234}),
        ))
        .await?;
    assert_eq!(response.status(), StatusCode::CREATED);
    let raw: Value = read_json(response).await?;
    assert_eq!(raw["name"], "42");
    assert_eq!(raw["phone"], "5551234");

    // Zero is as good as missing
    let response = router
        .oneshot(post_contact(&json!({"name": "Ann", "email": "a@b.co", "phone": 0})))
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: MessageResponse = read_json(response).await?;
    assert_eq!(body, MessageResponse::new("Name, email, and phone are required"));

    Ok(())
}

#[tokio::test]
async fn test_rest_api_delete_contact() -> Result<()> {
    let router = create_test_router(create_test_db());

    let response = router
        .clone()
        .oneshot(post_contact(
            &json!({"name": "Ann", "email": "ann@example.com", "phone": "555"}),
        ))
        .await?;
    let created: ContactDto = read_json(response).await?;
    let id = created.id.to_string();

    let response = router.clone().oneshot(delete_contact(&id)).await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body: MessageResponse = read_json(response).await?;
    assert_eq!(body, MessageResponse::new("Contact deleted successfully"));

    // Second delete of the same id
    let response = router.clone().oneshot(delete_contact(&id)).await?;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body: MessageResponse = read_json(response).await?;
    assert_eq!(body, MessageResponse::new("Contact not found"));

    let contacts: Vec<ContactDto> = read_json(router.oneshot(get_contacts()).await?).await?;
    assert!(contacts.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_rest_api_delete_unknown_ids() -> Result<()> {
    let router = create_test_router(create_test_db());

    let random = Uuid::new_v4().to_string();
    for id in [random.as_str(), "not-a-uuid", "123"] {
        let response = router.clone().oneshot(delete_contact(id)).await?;
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{id}");
        let body: MessageResponse = read_json(response).await?;
        assert_eq!(body.message, "Contact not found");
    }

    Ok(())
}

#[tokio::test]
async fn test_rest_api_store_unavailable() -> Result<()> {
    // Parent directory does not exist, so the pool can never open.
    let db = Arc::new(DbHandle::new(
        "sqlite:///nonexistent-contacts-dir/nested/contacts.db?mode=rwc",
        ConnectOpts::default(),
    )?);
    let router = create_test_router(db);

    let checks = [
        (get_contacts(), "Error fetching contacts"),
        (
            post_contact(&json!({"name": "Ann", "email": "ann@example.com", "phone": "555"})),
            "Error creating contact",
        ),
        (
            delete_contact(&Uuid::new_v4().to_string()),
            "Error deleting contact",
        ),
    ];

    for (request, message) in checks {
        let response = router.clone().oneshot(request).await?;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: MessageResponse = read_json(response).await?;
        assert_eq!(body.message, message);
        assert!(body.error.is_some_and(|e| !e.is_empty()));
    }

    Ok(())
}

#[tokio::test]
async fn test_validation_beats_store_failure() -> Result<()> {
    let db = Arc::new(DbHandle::new(
        "sqlite:///nonexistent-contacts-dir/nested/contacts.db?mode=rwc",
        ConnectOpts::default(),
    )?);
    let router = create_test_router(db);

    let response = router
        .oneshot(post_contact(&json!({"name": "Ann"})))
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    Ok(())
}

#[tokio::test]
async fn test_openapi_lists_contact_routes() -> Result<()> {
    let router = create_test_router(create_test_db());

    let request = Request::builder()
        .uri("/openapi.json")
        .body(Body::empty())
        .unwrap();
    let response = router.oneshot(request).await?;
    assert_eq!(response.status(), StatusCode::OK);

    let doc: Value = read_json(response).await?;
    assert!(doc["paths"]["/api/contacts"]["get"].is_object());
    assert!(doc["paths"]["/api/contacts"]["post"].is_object());
    assert!(doc["paths"]["/api/contacts/{id}"]["delete"].is_object());

    Ok(())
}
