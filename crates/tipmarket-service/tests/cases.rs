//! Support case and refund integration tests.

mod common;

use common::TestHarness;
use serde_json::json;
use tipmarket_core::AccountId;

struct Dispute {
    buyer: AccountId,
    seller: AccountId,
    case_id: String,
}

/// Top up, purchase for 50, and open a case over the full amount.
async fn seed_dispute(harness: &TestHarness) -> Dispute {
    let buyer = AccountId::generate();
    let seller = AccountId::generate();

    harness.top_up(buyer, 100, "pay_seed").await;
    let purchase_id = harness.purchase(buyer, seller, 50).await;

    let response = harness
        .server
        .post("/v1/cases")
        .add_header("x-api-key", harness.service_api_key.as_str())
        .json(&json!({
            "buyer_id": buyer,
            "seller_id": seller,
            "purchase_id": purchase_id,
            "amount_in_dispute_credits": 50,
        }))
        .await;
    response.assert_status_ok();

    let body: serde_json::Value = response.json();
    assert_eq!(body["status"], "open");

    Dispute {
        buyer,
        seller,
        case_id: body["id"].as_str().unwrap().to_string(),
    }
}

// ============================================================================
// Lifecycle
// ============================================================================

#[tokio::test]
async fn case_opens_and_fetches() {
    let harness = TestHarness::new();
    let dispute = seed_dispute(&harness).await;

    let response = harness
        .server
        .get(&format!("/v1/cases/{}", dispute.case_id))
        .add_header("x-api-key", harness.service_api_key.as_str())
        .await;
    response.assert_status_ok();

    let body: serde_json::Value = response.json();
    assert_eq!(body["status"], "open");
    assert_eq!(body["amount_in_dispute_credits"], 50);
    assert_eq!(body["replies"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn replies_append_to_thread() {
    let harness = TestHarness::new();
    let dispute = seed_dispute(&harness).await;

    let response = harness
        .server
        .post(&format!("/v1/cases/{}/replies", dispute.case_id))
        .add_header("x-api-key", harness.service_api_key.as_str())
        .json(&json!({
            "author_id": dispute.buyer,
            "body": "The tip never arrived",
        }))
        .await;
    response.assert_status_ok();

    let body: serde_json::Value = response.json();
    let replies = body["replies"].as_array().unwrap();
    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0]["body"], "The tip never arrived");
}

#[tokio::test]
async fn status_transitions_enforced() {
    let harness = TestHarness::new();
    let dispute = seed_dispute(&harness).await;

    let response = harness
        .server
        .post(&format!("/v1/cases/{}/status", dispute.case_id))
        .add_header("x-admin-key", harness.admin_api_key.as_str())
        .json(&json!({ "status": "in_progress" }))
        .await;
    response.assert_status_ok();

    // Backward move is a conflict.
    let response = harness
        .server
        .post(&format!("/v1/cases/{}/status", dispute.case_id))
        .add_header("x-admin-key", harness.admin_api_key.as_str())
        .json(&json!({ "status": "open" }))
        .await;
    assert_eq!(response.status_code(), 409);

    let body: serde_json::Value = response.json();
    assert_eq!(body["error"]["code"], "conflict");
}

#[tokio::test]
async fn transition_requires_admin_key() {
    let harness = TestHarness::new();
    let dispute = seed_dispute(&harness).await;

    let response = harness
        .server
        .post(&format!("/v1/cases/{}/status", dispute.case_id))
        .add_header("x-api-key", harness.service_api_key.as_str())
        .json(&json!({ "status": "in_progress" }))
        .await;
    response.assert_status_unauthorized();
}

#[tokio::test]
async fn missing_case_is_not_found() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .get(&format!("/v1/cases/{}", uuid::Uuid::new_v4()))
        .add_header("x-api-key", harness.service_api_key.as_str())
        .await;
    response.assert_status_not_found();
}

// ============================================================================
// Refunds
// ============================================================================

#[tokio::test]
async fn refund_settles_both_sides_and_closes_case() {
    let harness = TestHarness::new();
    let dispute = seed_dispute(&harness).await;

    let response = harness
        .server
        .post(&format!("/v1/cases/{}/refund", dispute.case_id))
        .add_header("x-admin-key", harness.admin_api_key.as_str())
        .json(&json!({}))
        .await;
    response.assert_status_ok();

    let body: serde_json::Value = response.json();
    assert_eq!(body["case"]["status"], "refunded");

    assert_eq!(harness.balance_of(dispute.buyer).await, 100);
    assert_eq!(harness.balance_of(dispute.seller).await, 0);
}

#[tokio::test]
async fn second_refund_is_conflict() {
    let harness = TestHarness::new();
    let dispute = seed_dispute(&harness).await;

    harness
        .server
        .post(&format!("/v1/cases/{}/refund", dispute.case_id))
        .add_header("x-admin-key", harness.admin_api_key.as_str())
        .json(&json!({}))
        .await
        .assert_status_ok();

    let response = harness
        .server
        .post(&format!("/v1/cases/{}/refund", dispute.case_id))
        .add_header("x-admin-key", harness.admin_api_key.as_str())
        .json(&json!({}))
        .await;
    assert_eq!(response.status_code(), 409);

    // Balances unchanged by the second attempt.
    assert_eq!(harness.balance_of(dispute.buyer).await, 100);
    assert_eq!(harness.balance_of(dispute.seller).await, 0);
}

#[tokio::test]
async fn closed_case_cannot_refund() {
    let harness = TestHarness::new();
    let dispute = seed_dispute(&harness).await;

    harness
        .server
        .post(&format!("/v1/cases/{}/status", dispute.case_id))
        .add_header("x-admin-key", harness.admin_api_key.as_str())
        .json(&json!({ "status": "closed" }))
        .await
        .assert_status_ok();

    let response = harness
        .server
        .post(&format!("/v1/cases/{}/refund", dispute.case_id))
        .add_header("x-admin-key", harness.admin_api_key.as_str())
        .json(&json!({}))
        .await;
    assert_eq!(response.status_code(), 409);
}

#[tokio::test]
async fn partial_refund_amount_respected() {
    let harness = TestHarness::new();
    let dispute = seed_dispute(&harness).await;

    let response = harness
        .server
        .post(&format!("/v1/cases/{}/refund", dispute.case_id))
        .add_header("x-admin-key", harness.admin_api_key.as_str())
        .json(&json!({ "amount_credits": 20 }))
        .await;
    response.assert_status_ok();

    assert_eq!(harness.balance_of(dispute.buyer).await, 70);
    assert_eq!(harness.balance_of(dispute.seller).await, 30);
}
