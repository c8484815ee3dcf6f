//! API integration tests
//!
//! These tests run against a live server with a seeded admin account
//! (login "admin", password "admin"). Run with: cargo test -- --ignored

use reqwest::Client;
use serde_json::{json, Value};

const BASE_URL: &str = "http://localhost:8080/api/v1";

/// Helper to get an authenticated admin token
async fn get_auth_token(client: &Client) -> String {
    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({
            "login": "admin",
            "password": "admin"
        }))
        .send()
        .await
        .expect("Failed to send login request");

    let body: Value = response.json().await.expect("Failed to parse login response");
    body["token"].as_str().expect("No token in response").to_string()
}

/// Helper to create an equipment record, returning its id
async fn create_equipment(client: &Client, token: &str, name: &str, quantity: i32) -> i64 {
    let response = client
        .post(format!("{}/equipment", BASE_URL))
        .header("Authorization", format!("Bearer {}", token))
        .json(&json!({
            "name": name,
            "category": 0,
            "quantity": quantity,
            "price_per_day": "50.00"
        }))
        .send()
        .await
        .expect("Failed to create equipment");

    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.expect("Failed to parse response");
    body["id"].as_i64().expect("No id in response")
}

/// Helper to create a reservation for one equipment line
async fn create_reservation(
    client: &Client,
    token: &str,
    equipment_id: i64,
    quantity: i32,
    start: &str,
    end: &str,
) -> Value {
    let response = client
        .post(format!("{}/reservations", BASE_URL))
        .header("Authorization", format!("Bearer {}", token))
        .json(&json!({
            "start_date": start,
            "end_date": end,
            "equipment": [{"equipment_id": equipment_id, "quantity": quantity}]
        }))
        .send()
        .await
        .expect("Failed to create reservation");

    assert_eq!(response.status(), 201, "reservation creation should succeed");
    response.json().await.expect("Failed to parse response")
}

async fn transition(client: &Client, token: &str, id: i64, action: &str) -> reqwest::Response {
    client
        .post(format!("{}/reservations/{}/{}", BASE_URL, id, action))
        .header("Authorization", format!("Bearer {}", token))
        .json(&json!({}))
        .send()
        .await
        .expect("Failed to send transition request")
}

#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored
async fn test_health_check() {
    let client = Client::new();

    let response = client
        .get(format!("{}/health", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
#[ignore]
async fn test_login() {
    let client = Client::new();

    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({
            "login": "admin",
            "password": "admin"
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body["token"].is_string());
    assert_eq!(body["user"]["login"], "admin");
}

#[tokio::test]
#[ignore]
async fn test_login_invalid_credentials() {
    let client = Client::new();

    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({
            "login": "admin",
            "password": "wrong"
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 401);
}

#[tokio::test]
#[ignore]
async fn test_list_equipment_requires_auth() {
    let client = Client::new();

    let response = client
        .get(format!("{}/equipment", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 401);
}

#[tokio::test]
#[ignore]
async fn test_create_reservation_computes_pricing() {
    let client = Client::new();
    let token = get_auth_token(&client).await;
    let equipment_id = create_equipment(&client, &token, "Pricing camera", 5).await;

    let reservation = create_reservation(
        &client,
        &token,
        equipment_id,
        2,
        "2030-06-01",
        "2030-06-05",
    )
    .await;

    // 5 billed days (inclusive), 2 units at 50.00/day
    assert_eq!(reservation["status"], 0);
    assert_eq!(reservation["duration"], 5);
    assert_eq!(reservation["subtotal"], "500.00");
    assert_eq!(reservation["deposit"], "100.00");
    assert_eq!(reservation["total"], "600.00");
    assert!(reservation["number"]
        .as_str()
        .expect("number missing")
        .starts_with("RES-"));
}

#[tokio::test]
#[ignore]
async fn test_overlapping_reservations_share_capacity() {
    let client = Client::new();
    let token = get_auth_token(&client).await;
    let equipment_id = create_equipment(&client, &token, "Contended camera", 3).await;

    // First reservation takes 2 of 3 units and is approved
    let first = create_reservation(&client, &token, equipment_id, 2, "2030-07-01", "2030-07-10").await;
    let first_id = first["id"].as_i64().expect("no id");
    let approve = transition(&client, &token, first_id, "approve").await;
    assert!(approve.status().is_success());

    // Overlapping request for 2 more units must be refused
    let response = client
        .post(format!("{}/reservations", BASE_URL))
        .header("Authorization", format!("Bearer {}", token))
        .json(&json!({
            "start_date": "2030-07-05",
            "end_date": "2030-07-12",
            "equipment": [{"equipment_id": equipment_id, "quantity": 2}]
        }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 409);

    // But one remaining unit is still grantable
    let second = create_reservation(&client, &token, equipment_id, 1, "2030-07-05", "2030-07-12").await;
    let second_id = second["id"].as_i64().expect("no id");
    let approve = transition(&client, &token, second_id, "approve").await;
    assert!(approve.status().is_success());
}

#[tokio::test]
#[ignore]
async fn test_disjoint_reservations_do_not_contend() {
    let client = Client::new();
    let token = get_auth_token(&client).await;
    let equipment_id = create_equipment(&client, &token, "Sequential camera", 2).await;

    // Two back-to-back full-quantity reservations both get approved
    let first = create_reservation(&client, &token, equipment_id, 2, "2030-08-01", "2030-08-05").await;
    let second = create_reservation(&client, &token, equipment_id, 2, "2030-08-05", "2030-08-10").await;

    let approve = transition(&client, &token, first["id"].as_i64().unwrap(), "approve").await;
    assert!(approve.status().is_success());
    let approve = transition(&client, &token, second["id"].as_i64().unwrap(), "approve").await;
    assert!(approve.status().is_success());
}

#[tokio::test]
#[ignore]
async fn test_full_lifecycle_to_completed() {
    let client = Client::new();
    let token = get_auth_token(&client).await;
    let equipment_id = create_equipment(&client, &token, "Lifecycle camera", 1).await;

    let reservation = create_reservation(&client, &token, equipment_id, 1, "2030-09-01", "2030-09-03").await;
    let id = reservation["id"].as_i64().expect("no id");

    let response = transition(&client, &token, id, "approve").await;
    assert!(response.status().is_success());
    let body: Value = response.json().await.expect("parse");
    assert_eq!(body["status"], 1);

    let response = transition(&client, &token, id, "activate").await;
    assert!(response.status().is_success());
    let body: Value = response.json().await.expect("parse");
    assert_eq!(body["status"], 2);

    let response = transition(&client, &token, id, "complete").await;
    assert!(response.status().is_success());
    let body: Value = response.json().await.expect("parse");
    assert_eq!(body["status"], 3);

    // Completed is terminal
    let response = transition(&client, &token, id, "cancel").await;
    assert_eq!(response.status(), 422);
}

#[tokio::test]
#[ignore]
async fn test_reject_requires_reason() {
    let client = Client::new();
    let token = get_auth_token(&client).await;
    let equipment_id = create_equipment(&client, &token, "Rejected camera", 1).await;

    let reservation = create_reservation(&client, &token, equipment_id, 1, "2030-10-01", "2030-10-03").await;
    let id = reservation["id"].as_i64().expect("no id");

    let response = client
        .post(format!("{}/reservations/{}/reject", BASE_URL, id))
        .header("Authorization", format!("Bearer {}", token))
        .json(&json!({"reason": ""}))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 400);

    let response = client
        .post(format!("{}/reservations/{}/reject", BASE_URL, id))
        .header("Authorization", format!("Bearer {}", token))
        .json(&json!({"reason": "out for repair"}))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());
    let body: Value = response.json().await.expect("parse");
    assert_eq!(body["status"], 4);
    assert_eq!(body["rejection_reason"], "out for repair");
}

#[tokio::test]
#[ignore]
async fn test_availability_endpoint_reports_conflicts() {
    let client = Client::new();
    let token = get_auth_token(&client).await;
    let equipment_id = create_equipment(&client, &token, "Reported camera", 4).await;

    let reservation = create_reservation(&client, &token, equipment_id, 3, "2030-11-01", "2030-11-10").await;
    let id = reservation["id"].as_i64().expect("no id");
    let response = transition(&client, &token, id, "approve").await;
    assert!(response.status().is_success());

    let response = client
        .get(format!(
            "{}/equipment/{}/availability?start_date=2030-11-05&end_date=2030-11-08",
            BASE_URL, equipment_id
        ))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("parse");
    assert_eq!(body["quantity"], 4);
    assert_eq!(body["available"], 1);
    assert_eq!(body["conflicts"].as_array().map(|c| c.len()), Some(1));
}

#[tokio::test]
#[ignore]
async fn test_invalid_date_range_rejected() {
    let client = Client::new();
    let token = get_auth_token(&client).await;
    let equipment_id = create_equipment(&client, &token, "Backwards camera", 1).await;

    let response = client
        .post(format!("{}/reservations", BASE_URL))
        .header("Authorization", format!("Bearer {}", token))
        .json(&json!({
            "start_date": "2030-12-10",
            "end_date": "2030-12-01",
            "equipment": [{"equipment_id": equipment_id, "quantity": 1}]
        }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 400);
}

#[tokio::test]
#[ignore]
async fn test_shrinking_quantity_clamps_available() {
    let client = Client::new();
    let token = get_auth_token(&client).await;
    let equipment_id = create_equipment(&client, &token, "Shrinking camera", 10).await;

    // 10 of 10 units free; shrinking the stock must not trip the
    // available <= quantity constraint.
    let response = client
        .put(format!("{}/equipment/{}", BASE_URL, equipment_id))
        .header("Authorization", format!("Bearer {}", token))
        .json(&json!({"quantity": 5}))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("parse");
    assert_eq!(body["quantity"], 5);
    assert_eq!(body["available"], 5);
}

#[tokio::test]
#[ignore]
async fn test_user_deletion_cascades_to_reservations() {
    let client = Client::new();
    let token = get_auth_token(&client).await;
    let equipment_id = create_equipment(&client, &token, "Cascade camera", 2).await;

    let suffix = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("clock")
        .as_millis();
    let response = client
        .post(format!("{}/users", BASE_URL))
        .header("Authorization", format!("Bearer {}", token))
        .json(&json!({
            "login": format!("cascade_client_{}", suffix),
            "password": "secret-pass",
            "role": "client"
        }))
        .send()
        .await
        .expect("Failed to create user");
    assert_eq!(response.status(), 201);
    let user: Value = response.json().await.expect("parse");
    let user_id = user["id"].as_i64().expect("no id");

    // Admin books on the client's behalf, then approves
    let response = client
        .post(format!("{}/reservations", BASE_URL))
        .header("Authorization", format!("Bearer {}", token))
        .json(&json!({
            "user_id": user_id,
            "start_date": "2031-01-01",
            "end_date": "2031-01-10",
            "equipment": [{"equipment_id": equipment_id, "quantity": 2}]
        }))
        .send()
        .await
        .expect("Failed to create reservation");
    assert_eq!(response.status(), 201);
    let reservation: Value = response.json().await.expect("parse");
    let reservation_id = reservation["id"].as_i64().expect("no id");

    let response = transition(&client, &token, reservation_id, "approve").await;
    assert!(response.status().is_success());

    // Deleting the user cancels the reservation and releases the gear
    let response = client
        .delete(format!("{}/users/{}", BASE_URL, user_id))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Failed to delete user");
    assert!(response.status().is_success());

    let summary: Value = response.json().await.expect("parse");
    assert_eq!(summary["processed"], 1);
    assert_eq!(summary["cancelled"], 1);
    assert_eq!(summary["equipment_released"], 1);
    assert_eq!(summary["errors"].as_array().map(|e| e.len()), Some(0));

    let response = client
        .get(format!("{}/reservations/{}", BASE_URL, reservation_id))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Failed to fetch reservation");
    assert!(response.status().is_success());
    let body: Value = response.json().await.expect("parse");
    assert_eq!(body["status"], 5);
    assert_eq!(body["is_deleted"], true);
    assert_eq!(body["deletion_reason"], "user_deleted");

    // The formerly committed range is free again
    let response = client
        .get(format!(
            "{}/equipment/{}/availability?start_date=2031-01-01&end_date=2031-01-10",
            BASE_URL, equipment_id
        ))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Failed to send request");
    let body: Value = response.json().await.expect("parse");
    assert_eq!(body["available"], 2);
    assert_eq!(body["conflicts"].as_array().map(|c| c.len()), Some(0));
}

#[tokio::test]
#[ignore]
async fn test_expire_pass_is_idempotent() {
    let client = Client::new();
    let token = get_auth_token(&client).await;

    // Whatever the first run expires, a second run finds nothing left:
    // expired records are no longer commitment-holding.
    let response = client
        .post(format!("{}/admin/sweep?pass=expire", BASE_URL))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    let response = client
        .post(format!("{}/admin/sweep?pass=expire", BASE_URL))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());
    let second: Value = response.json().await.expect("parse");
    assert_eq!(second["processed"], 0);
    assert_eq!(second["expired"], 0);
}

#[tokio::test]
#[ignore]
async fn test_consistency_pass_reaches_fixed_point() {
    let client = Client::new();
    let token = get_auth_token(&client).await;

    let response = client
        .post(format!("{}/admin/sweep?pass=consistency", BASE_URL))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    // A second run finds no drift left to correct
    let response = client
        .post(format!("{}/admin/sweep?pass=consistency", BASE_URL))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());
    let second: Value = response.json().await.expect("parse");
    assert_eq!(second["processed"], 0);
    assert_eq!(second["corrected"], 0);
}

#[tokio::test]
#[ignore]
async fn test_sweep_endpoint() {
    let client = Client::new();
    let token = get_auth_token(&client).await;

    let response = client
        .post(format!("{}/admin/sweep", BASE_URL))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("parse");
    assert!(body["processed"].is_number());
    assert!(body["errors"].is_array());

    let response = client
        .post(format!("{}/admin/sweep?pass=bogus", BASE_URL))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 400);
}
