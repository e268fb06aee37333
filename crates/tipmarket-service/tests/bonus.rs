//! Weekly bonus distribution integration tests.

mod common;

use chrono::{Duration, Utc};
use common::TestHarness;
use serde_json::json;
use tipmarket_core::AccountId;

/// An `as_of` one week ahead, so sales settled now fall inside the
/// run's previous complete week.
fn next_week() -> String {
    (Utc::now() + Duration::days(7)).to_rfc3339()
}

async fn seed_sales(harness: &TestHarness, counts: &[u64]) -> Vec<AccountId> {
    let buyer = AccountId::generate();
    harness.top_up(buyer, 100_000, "pay_week").await;

    let mut sellers = Vec::new();
    for &count in counts {
        let seller = AccountId::generate();
        for _ in 0..count {
            harness.purchase(buyer, seller, 10).await;
        }
        sellers.push(seller);
    }
    sellers
}

#[tokio::test]
async fn bonus_run_requires_admin_key() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .post("/v1/bonus/run")
        .add_header("x-api-key", harness.service_api_key.as_str())
        .json(&json!({}))
        .await;
    response.assert_status_unauthorized();
}

#[tokio::test]
async fn bonus_run_pays_top_three() {
    let harness = TestHarness::new();
    let sellers = seed_sales(&harness, &[5, 3, 2, 1]).await;

    let response = harness
        .server
        .post("/v1/bonus/run")
        .add_header("x-admin-key", harness.admin_api_key.as_str())
        .json(&json!({ "as_of": next_week() }))
        .await;
    response.assert_status_ok();

    let body: serde_json::Value = response.json();
    assert_eq!(body["total_paid_credits"], 850);

    let outcomes = body["outcomes"].as_array().unwrap();
    assert_eq!(outcomes.len(), 3);
    for (i, (sales, amount)) in [(5, 500), (3, 250), (2, 100)].iter().enumerate() {
        assert_eq!(outcomes[i]["seller_id"], sellers[i].to_string());
        assert_eq!(outcomes[i]["position"], i + 1);
        assert_eq!(outcomes[i]["sales_count"], *sales);
        assert_eq!(outcomes[i]["amount_credits"], *amount);
        assert_eq!(outcomes[i]["status"], "paid");
    }

    // Winner's balance includes sales income plus the bonus.
    assert_eq!(harness.balance_of(sellers[0]).await, 50 + 500);
    // Fourth seller got only sales income.
    assert_eq!(harness.balance_of(sellers[3]).await, 10);
}

#[tokio::test]
async fn repeated_run_pays_nothing() {
    let harness = TestHarness::new();
    let sellers = seed_sales(&harness, &[4, 2]).await;

    let run = json!({ "as_of": next_week() });

    harness
        .server
        .post("/v1/bonus/run")
        .add_header("x-admin-key", harness.admin_api_key.as_str())
        .json(&run)
        .await
        .assert_status_ok();

    let response = harness
        .server
        .post("/v1/bonus/run")
        .add_header("x-admin-key", harness.admin_api_key.as_str())
        .json(&run)
        .await;
    response.assert_status_ok();

    let body: serde_json::Value = response.json();
    assert_eq!(body["total_paid_credits"], 0);
    for outcome in body["outcomes"].as_array().unwrap() {
        assert_eq!(outcome["status"], "already_paid");
    }

    assert_eq!(harness.balance_of(sellers[0]).await, 40 + 500);
    assert_eq!(harness.balance_of(sellers[1]).await, 20 + 250);
}

#[tokio::test]
async fn week_rewards_listed_after_run() {
    let harness = TestHarness::new();
    seed_sales(&harness, &[3, 1]).await;

    let run = harness
        .server
        .post("/v1/bonus/run")
        .add_header("x-admin-key", harness.admin_api_key.as_str())
        .json(&json!({ "as_of": next_week() }))
        .await;
    run.assert_status_ok();
    let report: serde_json::Value = run.json();
    let week_start = report["week_start"].as_str().unwrap();

    let response = harness
        .server
        .get(&format!("/v1/bonus/weeks/{week_start}"))
        .add_header("x-admin-key", harness.admin_api_key.as_str())
        .await;
    response.assert_status_ok();

    let rewards: serde_json::Value = response.json();
    let rewards = rewards.as_array().unwrap();
    assert_eq!(rewards.len(), 2);
    assert_eq!(rewards[0]["position"], 1);
    assert_eq!(rewards[0]["amount_credits"], 500);
    assert_eq!(rewards[1]["position"], 2);
    assert_eq!(rewards[1]["amount_credits"], 250);
}

#[tokio::test]
async fn run_with_no_sales_is_noop() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .post("/v1/bonus/run")
        .add_header("x-admin-key", harness.admin_api_key.as_str())
        .json(&json!({}))
        .await;
    response.assert_status_ok();

    let body: serde_json::Value = response.json();
    assert_eq!(body["total_paid_credits"], 0);
    assert_eq!(body["outcomes"].as_array().unwrap().len(), 0);
}
