use std::sync::Arc;

use reqwest::StatusCode;
use serde_json::{Value, json};

use ravenpost_api::app::build_app;
use ravenpost_api::app::services::AppServices;
use ravenpost_infra::SqliteStore;

struct TestServer {
    base_url: String,
    client: reqwest::Client,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn(services: AppServices) -> Self {
        // Build app (same router as prod), but bind to an ephemeral port.
        let app = build_app(Arc::new(services));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            client: reqwest::Client::new(),
            handle,
        }
    }

    async fn in_memory() -> Self {
        Self::spawn(AppServices::in_memory()).await
    }

    async fn sqlite() -> Self {
        let store = SqliteStore::in_memory().await.expect("sqlite should open");
        Self::spawn(AppServices::Sqlite(store)).await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get(&self, path: &str) -> reqwest::Response {
        self.client.get(self.url(path)).send().await.unwrap()
    }

    async fn post(&self, path: &str, body: Value) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .json(&body)
            .send()
            .await
            .unwrap()
    }

    async fn put(&self, path: &str, body: Value) -> reqwest::Response {
        self.client
            .put(self.url(path))
            .json(&body)
            .send()
            .await
            .unwrap()
    }

    async fn delete(&self, path: &str) -> reqwest::Response {
        self.client.delete(self.url(path)).send().await.unwrap()
    }

    async fn create_supply(&self, name: &str, category: &str, price: f64) -> i64 {
        let res = self
            .post(
                "/supplies",
                json!({"name": name, "category": category, "price": price}),
            )
            .await;
        assert_eq!(res.status(), StatusCode::CREATED);
        let body: Value = res.json().await.unwrap();
        body["id"].as_i64().expect("created supply has an id")
    }

    async fn dispatch_count(&self) -> usize {
        let res = self.get("/dispatches").await;
        assert_eq!(res.status(), StatusCode::OK);
        let body: Value = res.json().await.unwrap();
        body.as_array().unwrap().len()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[tokio::test]
async fn liveness_and_health() {
    let srv = TestServer::in_memory().await;

    let res = srv.get("/").await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(
        res.text().await.unwrap(),
        "Raven Post is operational. The birds are restless."
    );

    let res = srv.get("/health").await;
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn responses_carry_request_id() {
    let srv = TestServer::in_memory().await;

    let res = srv
        .client
        .get(srv.url("/health"))
        .header("x-request-id", "trace-me")
        .send()
        .await
        .unwrap();
    assert_eq!(res.headers()["x-request-id"], "trace-me");

    let res = srv.get("/health").await;
    assert!(res.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn create_supply_returns_location_and_resource() {
    let srv = TestServer::in_memory().await;

    let res = srv
        .post(
            "/supplies",
            json!({"name": "Black Ink Scroll", "category": "Scrolls", "price": 5}),
        )
        .await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let location = res.headers()["location"].to_str().unwrap().to_string();
    let body: Value = res.json().await.unwrap();
    let id = body["id"].as_i64().unwrap();

    assert_eq!(location, format!("/supplies/{id}"));
    assert_eq!(body["name"], "Black Ink Scroll");
    assert_eq!(body["category"], "Scrolls");
    assert_eq!(body["price"].as_f64(), Some(5.0));

    let res = srv.get(&location).await;
    assert_eq!(res.status(), StatusCode::OK);
    let fetched: Value = res.json().await.unwrap();
    assert_eq!(fetched, body);

    // Repeated reads are identical.
    let again: Value = srv.get(&location).await.json().await.unwrap();
    assert_eq!(again, fetched);
}

#[tokio::test]
async fn created_supply_ids_are_unique() {
    let srv = TestServer::in_memory().await;

    let a = srv.create_supply("Night Raven", "Birds", 25.0).await;
    let b = srv.create_supply("Night Raven", "Birds", 25.0).await;
    assert_ne!(a, b);
}

#[tokio::test]
async fn invalid_supply_is_rejected() {
    let srv = TestServer::in_memory().await;

    let res = srv
        .post(
            "/supplies",
            json!({"name": "Wax Seal Kit", "category": "Seals", "price": 0}),
        )
        .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "validation_error");
    assert_eq!(body["message"], "price must be greater than 0");

    let res = srv.post("/supplies", json!({"category": "Seals", "price": 3})).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "name is required");

    let res = srv
        .client
        .post(srv.url("/supplies"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "invalid_body");

    let all: Value = srv.get("/supplies").await.json().await.unwrap();
    assert_eq!(all, json!([]));
}

#[tokio::test]
async fn missing_resources_are_404_with_empty_body() {
    let srv = TestServer::in_memory().await;

    for res in [
        srv.get("/supplies/999").await,
        srv.get("/dispatches/999").await,
        srv.delete("/supplies/999").await,
        srv.put(
            "/supplies/999",
            json!({"name": "Ghost", "category": "Birds", "price": 1}),
        )
        .await,
    ] {
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        assert!(res.bytes().await.unwrap().is_empty());
    }
}

#[tokio::test]
async fn non_numeric_ids_are_rejected() {
    let srv = TestServer::in_memory().await;

    let res = srv.get("/supplies/raven").await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "invalid_id");
}

#[tokio::test]
async fn replace_and_delete_supply() {
    let srv = TestServer::in_memory().await;
    let id = srv.create_supply("Cipher Sheet", "Scrolls", 8.0).await;

    // Validation comes before the existence check.
    let res = srv
        .put("/supplies/999", json!({"name": "", "category": "Scrolls", "price": 1}))
        .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = srv
        .put(
            &format!("/supplies/{id}"),
            json!({"name": "Cipher Sheet", "category": "Scrolls", "price": 9.5}),
        )
        .await;
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let body: Value = srv.get(&format!("/supplies/{id}")).await.json().await.unwrap();
    assert_eq!(body["price"].as_f64(), Some(9.5));

    let res = srv.delete(&format!("/supplies/{id}")).await;
    assert_eq!(res.status(), StatusCode::NO_CONTENT);
    let res = srv.get(&format!("/supplies/{id}")).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn list_supplies_filters() {
    let srv = TestServer::in_memory().await;
    srv.create_supply("Black Ink Scroll", "Scrolls", 5.0).await;
    srv.create_supply("Royal Parchment", "Scrolls", 12.0).await;
    srv.create_supply("Night Raven", "Birds", 25.0).await;
    srv.create_supply("War Raven", "Birds", 40.0).await;

    let names = |body: Value| -> Vec<String> {
        body.as_array()
            .unwrap()
            .iter()
            .map(|s| s["name"].as_str().unwrap().to_string())
            .collect()
    };

    let body: Value = srv.get("/supplies?q=raven").await.json().await.unwrap();
    assert_eq!(names(body), vec!["Night Raven", "War Raven"]);

    let body: Value = srv
        .get("/supplies?category=Scrolls&minPrice=6")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(names(body), vec!["Royal Parchment"]);

    let body: Value = srv
        .get("/supplies?q=&category=&maxPrice=25")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(body.as_array().unwrap().len(), 3);

    let res = srv.get("/supplies?minPrice=cheap").await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

async fn dispatch_scenario(srv: &TestServer) {
    let ink = srv.create_supply("Black Ink Scroll", "Scrolls", 5.0).await;
    let raven = srv.create_supply("Night Raven", "Birds", 25.0).await;

    let res = srv
        .post(
            "/dispatches",
            json!({"items": [{"supplyId": ink, "quantity": 3}, {"supplyId": raven, "quantity": 1}]}),
        )
        .await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let location = res.headers()["location"].to_str().unwrap().to_string();
    let created: Value = res.json().await.unwrap();
    assert_eq!(location, format!("/dispatches/{}", created["id"]));
    assert_eq!(created["totalCost"].as_f64(), Some(40.0));
    assert_eq!(created["items"].as_array().unwrap().len(), 2);
    assert_eq!(created["items"][0]["dispatchId"], created["id"]);

    let detail: Value = srv.get(&location).await.json().await.unwrap();
    let costs: Vec<f64> = detail["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["lineCost"].as_f64().unwrap())
        .collect();
    assert_eq!(costs, vec![15.0, 25.0]);
    assert_eq!(detail["items"][0]["supply"]["name"], "Black Ink Scroll");
    assert_eq!(detail["createdAt"], created["createdAt"]);

    let listed: Value = srv.get("/dispatches").await.json().await.unwrap();
    assert_eq!(listed[0]["itemCount"], 2);
    assert_eq!(listed[0]["totalCost"].as_f64(), Some(40.0));
    assert!(listed[0].get("items").is_none());

    let report: Value = srv.get("/reports/daily?date=today").await.json().await.unwrap();
    assert!(report["dispatchCount"].as_u64().unwrap() >= 1);
    assert!(report["totalRevenue"].as_f64().unwrap() >= 40.0);
    let top: Vec<i64> = report["topSupplies"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["supplyId"].as_i64().unwrap())
        .collect();
    assert_eq!(top, vec![ink, raven]);
    assert_eq!(report["topSupplies"][0]["quantity"], 3);
}

#[tokio::test]
async fn dispatch_flow_in_memory() {
    dispatch_scenario(&TestServer::in_memory().await).await;
}

#[tokio::test]
async fn dispatch_flow_sqlite() {
    dispatch_scenario(&TestServer::sqlite().await).await;
}

#[tokio::test]
async fn invalid_dispatches_persist_nothing() {
    let srv = TestServer::in_memory().await;
    let ink = srv.create_supply("Black Ink Scroll", "Scrolls", 5.0).await;

    let res = srv.post("/dispatches", json!({"items": []})).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "dispatch must contain at least one item");

    let res = srv
        .post(
            "/dispatches",
            json!({"items": [{"supplyId": ink, "quantity": 1}, {"supplyId": 4242, "quantity": 1}]}),
        )
        .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert!(body["message"].as_str().unwrap().contains("4242"));

    assert_eq!(srv.dispatch_count().await, 0);
}

#[tokio::test]
async fn referenced_supply_delete_conflicts() {
    let srv = TestServer::sqlite().await;
    let raven = srv.create_supply("Night Raven", "Birds", 25.0).await;
    let res = srv
        .post("/dispatches", json!({"items": [{"supplyId": raven, "quantity": 2}]}))
        .await;
    assert_eq!(res.status(), StatusCode::CREATED);

    let res = srv.delete(&format!("/supplies/{raven}")).await;
    assert_eq!(res.status(), StatusCode::CONFLICT);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "conflict");

    assert_eq!(srv.dispatch_count().await, 1);
}

#[tokio::test]
async fn daily_report_for_empty_day() {
    let srv = TestServer::in_memory().await;

    let res = srv.get("/reports/daily?date=2020-01-01").await;
    assert_eq!(res.status(), StatusCode::OK);
    let report: Value = res.json().await.unwrap();
    assert_eq!(report["date"], "2020-01-01T00:00:00Z");
    assert_eq!(report["dispatchCount"], 0);
    assert_eq!(report["totalRevenue"].as_f64(), Some(0.0));
    assert_eq!(report["topSupplies"], json!([]));

    let res = srv.get("/reports/daily?date=%2B262142-12-31").await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "validation_error");

    let res = srv.get("/reports/daily?date=yesterday").await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "use YYYY-MM-DD or 'today'");
}
