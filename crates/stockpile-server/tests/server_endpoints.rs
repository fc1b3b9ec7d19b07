use std::sync::Arc;

use reqwest::StatusCode;
use serde_json::{Value, json};
use stockpile_db_memory::InMemoryStore;
use stockpile_server::{AppConfig, AppState, DynCacheStore, LocalCache, build_app};
use tokio::task::JoinHandle;

async fn start_server_with_cache(
    cache: DynCacheStore,
) -> (String, tokio::sync::oneshot::Sender<()>, JoinHandle<()>) {
    let cfg = AppConfig::default();
    let state = AppState::new(Arc::new(InMemoryStore::new()), cache, &cfg);
    let app = build_app(state, &cfg);

    // Bind to an ephemeral port
    let listener = tokio::net::TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0))
        .await
        .expect("bind");
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = tokio::sync::oneshot::channel::<()>();

    let server = tokio::spawn(async move {
        let _ = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = rx.await;
            })
            .await;
    });

    (format!("http://{addr}"), tx, server)
}

async fn start_server() -> (String, tokio::sync::oneshot::Sender<()>, JoinHandle<()>) {
    start_server_with_cache(Arc::new(LocalCache::new())).await
}

#[tokio::test]
async fn pen_product_scenario() {
    let (base, shutdown_tx, handle) = start_server().await;
    let client = reqwest::Client::new();

    // POST /products
    let resp = client
        .post(format!("{base}/products"))
        .json(&json!({"name": "Pen", "price": 1.5, "stock": 100}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let location = resp
        .headers()
        .get("location")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let created: Value = resp.json().await.unwrap();
    let id = created["_id"].as_str().expect("generated id").to_string();
    assert_eq!(created["name"], "Pen");
    assert_eq!(created["price"], 1.5);
    assert_eq!(created["stock"], 100);
    assert!(created["createdAt"].is_string());
    assert_eq!(location.as_deref(), Some(format!("/products/{id}").as_str()));

    // GET /products twice: database, then cache
    let body: Value = client
        .get(format!("{base}/products"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["source"], "database");
    assert!(
        body["data"]
            .as_array()
            .unwrap()
            .iter()
            .any(|p| p["name"] == "Pen")
    );

    let body: Value = client
        .get(format!("{base}/products"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["source"], "cache");

    // PUT /products/{id}
    let resp = client
        .put(format!("{base}/products/{id}"))
        .json(&json!({"name": "Pen", "price": 2.0, "stock": 90}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["message"], "Product updated");

    // GET /products/{id} after the update misses the cache
    let body: Value = client
        .get(format!("{base}/products/{id}"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["source"], "database");
    assert_eq!(body["data"]["price"], 2.0);
    assert_eq!(body["data"]["stock"], 90);

    // DELETE /products/{id}
    let resp = client
        .delete(format!("{base}/products/{id}"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["message"], "Product deleted");

    let resp = client
        .get(format!("{base}/products/{id}"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Product not found");

    let _ = shutdown_tx.send(());
    let _ = handle.await;
}

#[tokio::test]
async fn error_responses() {
    let (base, shutdown_tx, handle) = start_server().await;
    let client = reqwest::Client::new();

    // Missing JSON content type
    let resp = client
        .post(format!("{base}/products"))
        .header("content-type", "text/plain")
        .body(r#"{"name":"Pen","price":1.5,"stock":100}"#)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    let body: Value = resp.json().await.unwrap();
    assert!(body["error"].is_string());

    // Malformed body
    let resp = client
        .post(format!("{base}/products"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    // Missing required field
    let resp = client
        .post(format!("{base}/products"))
        .json(&json!({"name": "Pen"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    // Failed validation
    let resp = client
        .post(format!("{base}/products"))
        .json(&json!({"name": "", "price": 1.0, "stock": 1}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("name"));

    // Unknown record on update and delete
    let resp = client
        .put(format!("{base}/products/missing"))
        .json(&json!({"name": "Pen", "price": 1.0, "stock": 1}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let resp = client
        .delete(format!("{base}/tasks/missing"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Task not found");

    // Unknown route
    let resp = client
        .get(format!("{base}/nowhere"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let _ = shutdown_tx.send(());
    let _ = handle.await;
}

#[tokio::test]
async fn tasks_cache_admin_and_health() {
    let (base, shutdown_tx, handle) = start_server().await;
    let client = reqwest::Client::new();

    // Service root lists endpoints
    let body: Value = client
        .get(format!("{base}/"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["name"], "stockpile-server");
    assert!(
        body["endpoints"]
            .as_array()
            .unwrap()
            .iter()
            .any(|e| e == "GET /cache/stats")
    );

    // Task defaults
    let resp = client
        .post(format!("{base}/tasks"))
        .json(&json!({"title": "Write docs"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let task: Value = resp.json().await.unwrap();
    assert_eq!(task["description"], "");
    assert_eq!(task["completed"], false);
    let id = task["_id"].as_str().unwrap().to_string();

    client
        .get(format!("{base}/tasks/{id}"))
        .send()
        .await
        .unwrap();
    client.get(format!("{base}/tasks")).send().await.unwrap();

    let body: Value = client
        .get(format!("{base}/cache/stats"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["totalKeys"], 2);
    assert_eq!(body["keys"], json!([format!("task:{id}"), "tasks:all"]));

    let resp = client
        .delete(format!("{base}/cache/clear"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = client
        .get(format!("{base}/cache/stats"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["totalKeys"], 0);

    // Health and request ids
    let resp = client
        .get(format!("{base}/health"))
        .header("x-request-id", "req-123")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get("x-request-id").unwrap().to_str().unwrap(),
        "req-123"
    );
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["database"]["status"], "connected");
    assert_eq!(body["cache"]["backend"], "local");

    let resp = client.get(format!("{base}/health")).send().await.unwrap();
    assert!(resp.headers().contains_key("x-request-id"));

    // Metrics exposition
    let resp = client.get(format!("{base}/metrics")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let _ = shutdown_tx.send(());
    let _ = handle.await;
}

#[tokio::test]
async fn cache_outage_degrades_health_and_admin_only() {
    use async_trait::async_trait;
    use std::time::Duration;
    use stockpile_server::{CacheError, CacheStore};

    struct DownCache;

    #[async_trait]
    impl CacheStore for DownCache {
        async fn get(&self, _: &str) -> Result<Option<Vec<u8>>, CacheError> {
            Err(CacheError::unavailable("down"))
        }
        async fn set_with_ttl(&self, _: &str, _: Vec<u8>, _: Duration) -> Result<(), CacheError> {
            Err(CacheError::unavailable("down"))
        }
        async fn delete(&self, _: &str) -> Result<(), CacheError> {
            Err(CacheError::unavailable("down"))
        }
        async fn delete_pattern(&self, _: &str) -> Result<u64, CacheError> {
            Err(CacheError::unavailable("down"))
        }
        async fn keys(&self, _: &str) -> Result<Vec<String>, CacheError> {
            Err(CacheError::unavailable("down"))
        }
        async fn flush_all(&self) -> Result<(), CacheError> {
            Err(CacheError::unavailable("down"))
        }
        async fn ping(&self) -> Result<(), CacheError> {
            Err(CacheError::unavailable("down"))
        }
        fn backend_name(&self) -> &'static str {
            "down"
        }
    }

    let (base, shutdown_tx, handle) = start_server_with_cache(Arc::new(DownCache)).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{base}/products"))
        .json(&json!({"name": "Pen", "price": 1.5, "stock": 100}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);

    let body: Value = client
        .get(format!("{base}/products"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["source"], "database");
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let resp = client
        .get(format!("{base}/cache/stats"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    let resp = client
        .delete(format!("{base}/cache/clear"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);

    let resp = client.get(format!("{base}/health")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["cache"]["status"], "disconnected");

    let _ = shutdown_tx.send(());
    let _ = handle.await;
}
