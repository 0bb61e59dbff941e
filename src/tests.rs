//! Integration tests for the Memoria backend.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use serde_json::{json, Value};
use tempfile::TempDir;

use crate::config::Config;
use crate::db::{
    init_document_database, init_draft_database, DocumentStore, RecordStore, SqliteDocumentStore,
    SqliteKv,
};
use crate::drafts::DraftStore;
use crate::retry::RetryPolicy;
use crate::settings::{SettingsConfig, SettingsService};
use crate::{create_router, AppState};

/// Test fixture for integration tests.
struct TestFixture {
    client: Client,
    base_url: String,
    _temp_dir: TempDir,
}

impl TestFixture {
    async fn new() -> Self {
        Self::with_psk(Some("test-api-key".to_string())).await
    }

    async fn with_psk(psk: Option<String>) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("documents.sqlite");
        let drafts_path = temp_dir.path().join("drafts.sqlite");

        let config = Config {
            api_psk: psk.clone(),
            db_path: db_path.clone(),
            drafts_path: drafts_path.clone(),
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            log_level: "warn".to_string(),
            settings_ttl: Duration::from_secs(300),
            fetch_retry_attempts: 3,
            fetch_retry_delay: Duration::from_millis(50),
        };

        // Initialize databases
        let documents_pool = init_document_database(&db_path)
            .await
            .expect("Failed to init document DB");
        let drafts_pool = init_draft_database(&drafts_path)
            .await
            .expect("Failed to init draft DB");

        let documents: Arc<dyn DocumentStore> = Arc::new(SqliteDocumentStore::new(documents_pool));
        let records = Arc::new(RecordStore::new(documents.clone()));
        let drafts = Arc::new(DraftStore::new(Arc::new(SqliteKv::new(drafts_pool))));
        let settings = Arc::new(SettingsService::new(
            documents,
            SettingsConfig {
                ttl: config.settings_ttl,
                retry: RetryPolicy::fixed(config.fetch_retry_attempts, config.fetch_retry_delay),
            },
        ));

        let state = AppState {
            records,
            drafts,
            settings,
            config: Arc::new(config),
        };

        let app = create_router(state);

        // Bind to random port
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind");
        let addr = listener.local_addr().expect("Failed to get addr");
        let base_url = format!("http://{}", addr);

        // Spawn server
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Wait for server to start
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        let mut client_builder = Client::builder();
        if let Some(key) = psk {
            let mut headers = reqwest::header::HeaderMap::new();
            headers.insert("x-api-key", key.parse().unwrap());
            client_builder = client_builder.default_headers(headers);
        }

        TestFixture {
            client: client_builder.build().unwrap(),
            base_url,
            _temp_dir: temp_dir,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Create a record and return its id.
    async fn create_record(&self, record_type: &str, body: Value) -> String {
        let resp = self
            .client
            .post(self.url(&format!("/api/records/{}", record_type)))
            .json(&body)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        let body: Value = resp.json().await.unwrap();
        body["data"]["id"].as_str().unwrap().to_string()
    }
}

#[tokio::test]
async fn test_health_check() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .get(fixture.url("/health"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn test_auth_missing_psk() {
    let fixture = TestFixture::with_psk(Some("secret-key".to_string())).await;

    // Request without API key
    let client = Client::new();
    let resp = client
        .get(fixture.url("/api/admin/settings"))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 401);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_auth_invalid_psk() {
    let fixture = TestFixture::with_psk(Some("correct-key".to_string())).await;

    // Request with wrong API key
    let client = Client::new();
    let resp = client
        .get(fixture.url("/api/admin/settings"))
        .header("x-api-key", "wrong-key")
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 401);
}

#[tokio::test]
async fn test_auth_valid_psk() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .get(fixture.url("/api/admin/settings"))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], true);
}

#[tokio::test]
async fn test_record_crud() {
    let fixture = TestFixture::new().await;

    // Create record
    let create_resp = fixture
        .client
        .post(fixture.url("/api/records/profile"))
        .json(&json!({
            "createdBy": "u1",
            "title": "A Life Remembered",
            "summary": "First draft of the story"
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(create_resp.status(), 200);
    let create_body: Value = create_resp.json().await.unwrap();
    assert_eq!(create_body["success"], true);
    let record_id = create_body["data"]["id"].as_str().unwrap();
    assert_eq!(create_body["data"]["recordType"], "profile");
    assert_eq!(create_body["data"]["title"], "A Life Remembered");
    assert_eq!(create_body["data"]["createdBy"], "u1");
    let created_updated_at = create_body["data"]["updatedAt"].as_str().unwrap().to_string();

    // Get record
    let get_resp = fixture
        .client
        .get(fixture.url(&format!("/api/records/profile/{}", record_id)))
        .send()
        .await
        .unwrap();

    assert_eq!(get_resp.status(), 200);
    let get_body: Value = get_resp.json().await.unwrap();
    assert_eq!(get_body["data"]["title"], "A Life Remembered");

    // Update record (full content replace, creation metadata preserved)
    tokio::time::sleep(tokio::time::Duration::from_millis(20)).await;
    let update_resp = fixture
        .client
        .put(fixture.url(&format!("/api/records/profile/{}", record_id)))
        .json(&json!({
            "title": "A Life Remembered, Revised"
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(update_resp.status(), 200);
    let update_body: Value = update_resp.json().await.unwrap();
    assert_eq!(update_body["data"]["title"], "A Life Remembered, Revised");
    assert_eq!(update_body["data"]["createdBy"], "u1");
    // Full replace drops fields not present in the request
    assert!(update_body["data"]["summary"].is_null());
    assert_ne!(update_body["data"]["updatedAt"].as_str().unwrap(), created_updated_at);

    // Get non-existent record
    let missing_resp = fixture
        .client
        .get(fixture.url("/api/records/profile/non-existent-id"))
        .send()
        .await
        .unwrap();

    assert_eq!(missing_resp.status(), 404);
    let missing_body: Value = missing_resp.json().await.unwrap();
    assert_eq!(missing_body["success"], false);
    assert_eq!(missing_body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_draft_lifecycle() {
    let fixture = TestFixture::new().await;

    // Save draft
    let save_resp = fixture
        .client
        .put(fixture.url("/api/drafts/story/s1"))
        .json(&json!({
            "title": "Draft Title",
            "body": "Once upon a time"
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(save_resp.status(), 200);
    let save_body: Value = save_resp.json().await.unwrap();
    assert_eq!(save_body["data"]["id"], "s1");
    assert_eq!(save_body["data"]["title"], "Draft Title");
    assert!(save_body["data"]["lastSaved"].is_string());

    // Load draft - round trip
    let load_resp = fixture
        .client
        .get(fixture.url("/api/drafts/story/s1"))
        .send()
        .await
        .unwrap();

    assert_eq!(load_resp.status(), 200);
    let load_body: Value = load_resp.json().await.unwrap();
    assert_eq!(load_body["data"]["title"], "Draft Title");
    assert_eq!(load_body["data"]["body"], "Once upon a time");
    assert_eq!(load_body["data"]["lastSaved"], save_body["data"]["lastSaved"]);

    // Existence check is memory state, no storage read
    let exists_resp = fixture
        .client
        .get(fixture.url("/api/drafts/story/s1/exists"))
        .send()
        .await
        .unwrap();
    let exists_body: Value = exists_resp.json().await.unwrap();
    assert_eq!(exists_body["data"]["hasDraft"], true);

    // Discard draft
    let discard_resp = fixture
        .client
        .delete(fixture.url("/api/drafts/story/s1"))
        .send()
        .await
        .unwrap();
    assert_eq!(discard_resp.status(), 200);

    // Draft is gone
    let gone_resp = fixture
        .client
        .get(fixture.url("/api/drafts/story/s1"))
        .send()
        .await
        .unwrap();
    let gone_body: Value = gone_resp.json().await.unwrap();
    assert!(gone_body["data"].is_null());

    // Discarding again is a no-op, not an error
    let again_resp = fixture
        .client
        .delete(fixture.url("/api/drafts/story/s1"))
        .send()
        .await
        .unwrap();
    assert_eq!(again_resp.status(), 200);

    let gone_exists_resp = fixture
        .client
        .get(fixture.url("/api/drafts/story/s1/exists"))
        .send()
        .await
        .unwrap();
    let gone_exists_body: Value = gone_exists_resp.json().await.unwrap();
    assert_eq!(gone_exists_body["data"]["hasDraft"], false);
}

#[tokio::test]
async fn test_reconcile_local_newer() {
    let fixture = TestFixture::new().await;

    let record_id = fixture
        .create_record(
            "profile",
            json!({"createdBy": "u1", "title": "Old Title"}),
        )
        .await;

    // Draft saved after the record was written: the draft is newer.
    tokio::time::sleep(tokio::time::Duration::from_millis(20)).await;
    fixture
        .client
        .put(fixture.url(&format!("/api/drafts/profile/{}", record_id)))
        .json(&json!({"title": "Draft Title"}))
        .send()
        .await
        .unwrap();

    let resp = fixture
        .client
        .post(fixture.url(&format!("/api/records/profile/{}/reconcile", record_id)))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["outcome"], "localNewer");
    assert_eq!(body["data"]["record"]["id"], record_id.as_str());
    assert_eq!(body["data"]["record"]["title"], "Draft Title");
    // Identity and creation metadata come from the server record
    assert_eq!(body["data"]["record"]["createdBy"], "u1");
}

#[tokio::test]
async fn test_reconcile_remote_newer() {
    let fixture = TestFixture::new().await;

    let record_id = fixture
        .create_record(
            "profile",
            json!({"createdBy": "u1", "title": "Server v1", "summary": "Shared text"}),
        )
        .await;

    fixture
        .client
        .put(fixture.url(&format!("/api/drafts/profile/{}", record_id)))
        .json(&json!({"title": "Draft Title", "summary": "Shared text"}))
        .send()
        .await
        .unwrap();

    // Another editor updates the record after the draft was saved.
    tokio::time::sleep(tokio::time::Duration::from_millis(20)).await;
    fixture
        .client
        .put(fixture.url(&format!("/api/records/profile/{}", record_id)))
        .json(&json!({"title": "Server v2", "summary": "Shared text", "published": true}))
        .send()
        .await
        .unwrap();

    let resp = fixture
        .client
        .post(fixture.url(&format!("/api/records/profile/{}/reconcile", record_id)))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["outcome"], "remoteNewer");
    // Locally changed field overlaid on the newer server record
    assert_eq!(body["data"]["record"]["title"], "Draft Title");
    // Unchanged field and the other editor's publish flip survive
    assert_eq!(body["data"]["record"]["summary"], "Shared text");
    assert_eq!(body["data"]["record"]["published"], true);
}

#[tokio::test]
async fn test_reconcile_draft_only() {
    let fixture = TestFixture::new().await;

    // Draft for a record that has never been persisted server-side
    fixture
        .client
        .put(fixture.url("/api/drafts/story/new-story"))
        .json(&json!({"title": "Unpublished"}))
        .send()
        .await
        .unwrap();

    let resp = fixture
        .client
        .post(fixture.url("/api/records/story/new-story/reconcile"))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["outcome"], "draftOnly");
    assert_eq!(body["data"]["record"]["title"], "Unpublished");

    // Neither draft nor record: nothing to reconcile
    let missing_resp = fixture
        .client
        .post(fixture.url("/api/records/story/missing/reconcile"))
        .send()
        .await
        .unwrap();
    assert_eq!(missing_resp.status(), 404);
}

#[tokio::test]
async fn test_admin_settings_lifecycle() {
    let fixture = TestFixture::new().await;

    // First access lazily initializes the singleton document
    let init_resp = fixture
        .client
        .get(fixture.url("/api/admin/settings"))
        .send()
        .await
        .unwrap();
    assert_eq!(init_resp.status(), 200);
    let init_body: Value = init_resp.json().await.unwrap();
    assert_eq!(init_body["data"]["adminEmails"], json!([]));
    assert_eq!(init_body["data"]["updatedBy"], "system");

    // Add first admin; email is lower-cased
    let add_resp = fixture
        .client
        .post(fixture.url("/api/admin/admins"))
        .json(&json!({"email": "Alice@X.com", "addedBy": "bootstrap"}))
        .send()
        .await
        .unwrap();
    assert_eq!(add_resp.status(), 200);
    let add_body: Value = add_resp.json().await.unwrap();
    assert_eq!(add_body["data"]["adminEmails"], json!(["alice@x.com"]));
    assert_eq!(add_body["data"]["updatedBy"], "bootstrap");

    // Add second admin
    let add2_resp = fixture
        .client
        .post(fixture.url("/api/admin/admins"))
        .json(&json!({"email": "B@x.com", "addedBy": "alice@x.com"}))
        .send()
        .await
        .unwrap();
    let add2_body: Value = add2_resp.json().await.unwrap();
    assert_eq!(
        add2_body["data"]["adminEmails"],
        json!(["alice@x.com", "b@x.com"])
    );
    assert_eq!(add2_body["data"]["updatedBy"], "alice@x.com");

    // Duplicate is rejected without a write
    let dup_resp = fixture
        .client
        .post(fixture.url("/api/admin/admins"))
        .json(&json!({"email": "b@X.COM", "addedBy": "alice@x.com"}))
        .send()
        .await
        .unwrap();
    assert_eq!(dup_resp.status(), 409);
    let dup_body: Value = dup_resp.json().await.unwrap();
    assert_eq!(dup_body["error"]["code"], "DUPLICATE_ADMIN");

    // Membership check is case-insensitive and does not fetch
    let check_resp = fixture
        .client
        .get(fixture.url("/api/admin/admins/B@x.com"))
        .send()
        .await
        .unwrap();
    let check_body: Value = check_resp.json().await.unwrap();
    assert_eq!(check_body["data"]["isAdmin"], true);

    let check_missing_resp = fixture
        .client
        .get(fixture.url("/api/admin/admins/c@x.com"))
        .send()
        .await
        .unwrap();
    let check_missing_body: Value = check_missing_resp.json().await.unwrap();
    assert_eq!(check_missing_body["data"]["isAdmin"], false);

    // Remove the second admin
    let remove_resp = fixture
        .client
        .delete(fixture.url("/api/admin/admins/b@x.com"))
        .query(&[("updatedBy", "alice@x.com")])
        .send()
        .await
        .unwrap();
    assert_eq!(remove_resp.status(), 200);
    let remove_body: Value = remove_resp.json().await.unwrap();
    assert_eq!(remove_body["data"]["adminEmails"], json!(["alice@x.com"]));

    // The last admin cannot be removed
    let last_resp = fixture
        .client
        .delete(fixture.url("/api/admin/admins/alice@x.com"))
        .query(&[("updatedBy", "alice@x.com")])
        .send()
        .await
        .unwrap();
    assert_eq!(last_resp.status(), 409);
    let last_body: Value = last_resp.json().await.unwrap();
    assert_eq!(last_body["error"]["code"], "LAST_ADMIN");

    // Removing an unknown email is a not-found rejection
    let ghost_resp = fixture
        .client
        .delete(fixture.url("/api/admin/admins/ghost@x.com"))
        .query(&[("updatedBy", "alice@x.com")])
        .send()
        .await
        .unwrap();
    assert_eq!(ghost_resp.status(), 404);
}

#[tokio::test]
async fn test_notification_toggle() {
    let fixture = TestFixture::new().await;

    let enable_resp = fixture
        .client
        .put(fixture.url("/api/admin/notifications"))
        .json(&json!({"email": "Carol@x.com", "enabled": true, "updatedBy": "alice@x.com"}))
        .send()
        .await
        .unwrap();
    assert_eq!(enable_resp.status(), 200);
    let enable_body: Value = enable_resp.json().await.unwrap();
    assert_eq!(
        enable_body["data"]["notificationEmails"],
        json!(["carol@x.com"])
    );

    let disable_resp = fixture
        .client
        .put(fixture.url("/api/admin/notifications"))
        .json(&json!({"email": "carol@x.com", "enabled": false, "updatedBy": "alice@x.com"}))
        .send()
        .await
        .unwrap();
    let disable_body: Value = disable_resp.json().await.unwrap();
    assert_eq!(disable_body["data"]["notificationEmails"], json!([]));
}

#[tokio::test]
async fn test_validation_errors() {
    let fixture = TestFixture::new().await;

    // Create record without createdBy
    let resp = fixture
        .client
        .post(fixture.url("/api/records/profile"))
        .json(&json!({"createdBy": "", "title": "No author"}))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    // Add admin with empty email
    let resp2 = fixture
        .client
        .post(fixture.url("/api/admin/admins"))
        .json(&json!({"email": "   ", "addedBy": "alice@x.com"}))
        .send()
        .await
        .unwrap();

    assert_eq!(resp2.status(), 400);
    let body2: Value = resp2.json().await.unwrap();
    assert_eq!(body2["error"]["code"], "VALIDATION_ERROR");
}
