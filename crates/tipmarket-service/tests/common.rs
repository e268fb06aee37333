//! Common test utilities for tipmarket integration tests.

#![allow(dead_code)] // Some utilities are used by different test files

use std::sync::Arc;

use axum::Router;
use axum_test::TestServer;
use serde_json::json;
use tempfile::TempDir;

use tipmarket_core::AccountId;
use tipmarket_engine::SettlementEngine;
use tipmarket_service::{create_router, AppState, ServiceConfig};
use tipmarket_store::RocksStore;

/// Test harness containing everything needed for integration tests.
pub struct TestHarness {
    /// The test server for making HTTP requests.
    pub server: TestServer,
    /// Temporary directory for the database (kept alive for test duration).
    pub _temp_dir: TempDir,
    /// The service API key for platform requests.
    pub service_api_key: String,
    /// The admin API key for support/operational requests.
    pub admin_api_key: String,
}

impl TestHarness {
    /// Create a new test harness with a fresh database.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = RocksStore::open(temp_dir.path()).expect("Failed to open store");
        let engine = Arc::new(SettlementEngine::new(store));

        let service_api_key = "test-service-key".to_string();
        let admin_api_key = "test-admin-key".to_string();

        let config = ServiceConfig {
            listen_addr: "127.0.0.1:0".into(),
            data_dir: temp_dir.path().to_string_lossy().to_string(),
            service_api_key: Some(service_api_key.clone()),
            admin_api_key: Some(admin_api_key.clone()),
            cors_origins: vec!["*".into()],
            max_body_bytes: 1024 * 1024,
            request_timeout_seconds: 30,
        };

        let state = AppState::new(engine, config);
        let router: Router = create_router(state);

        let server = TestServer::new(router).expect("Failed to create test server");

        Self {
            server,
            _temp_dir: temp_dir,
            service_api_key,
            admin_api_key,
        }
    }

    /// Top up an account through the API and assert success.
    pub async fn top_up(&self, account_id: AccountId, amount_credits: i64, payment_ref: &str) {
        self.server
            .post("/v1/topups/confirm")
            .add_header("x-api-key", self.service_api_key.as_str())
            .json(&json!({
                "account_id": account_id,
                "amount_credits": amount_credits,
                "payment_ref": payment_ref,
            }))
            .await
            .assert_status_ok();
    }

    /// Complete a purchase through the API and assert success. Returns
    /// the generated purchase id.
    pub async fn purchase(
        &self,
        buyer_id: AccountId,
        seller_id: AccountId,
        price_credits: i64,
    ) -> String {
        let purchase_id = uuid::Uuid::new_v4().to_string();
        self.server
            .post("/v1/purchases/complete")
            .add_header("x-api-key", self.service_api_key.as_str())
            .json(&json!({
                "buyer_id": buyer_id,
                "seller_id": seller_id,
                "purchase_id": purchase_id,
                "price_credits": price_credits,
            }))
            .await
            .assert_status_ok();
        purchase_id
    }

    /// Fetch an account's balance in credits.
    pub async fn balance_of(&self, account_id: AccountId) -> i64 {
        let response = self
            .server
            .get(&format!("/v1/accounts/{account_id}/balance"))
            .add_header("x-api-key", self.service_api_key.as_str())
            .await;
        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        body["balance_credits"].as_i64().expect("balance_credits")
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
