// verify-server/src/store/rest.rs
use async_trait::async_trait;
use common::models::identity::{Identity, NewIdentity};
use reqwest::{header, Client, Response, StatusCode};
use serde::Deserialize;

use super::{IdentityStore, StoreError};

const IDENTITY_COLUMNS: &str = "id,public_key_address,email,metadata,created_at";

/// Identity table behind a PostgREST-style API
///
/// The table carries a unique constraint on `public_key_address`, which the
/// API reports as HTTP 409 on a duplicate insert.
#[derive(Clone)]
pub struct RestIdentityStore {
    client: Client,
    table_url: String,
    service_key: String,
}

#[derive(Deserialize)]
struct StoreErrorBody {
    message: Option<String>,
}

impl RestIdentityStore {
    pub fn new(base_url: &str, service_key: &str, table: &str) -> Result<Self, StoreError> {
        let client = Client::builder().build()?;

        Ok(Self {
            client,
            table_url: format!("{}/rest/v1/{}", base_url.trim_end_matches('/'), table),
            service_key: service_key.to_string(),
        })
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .header("apikey", &self.service_key)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.service_key))
    }

    async fn backend_error(response: Response) -> StoreError {
        let status = response.status();
        let message = response
            .json::<StoreErrorBody>()
            .await
            .ok()
            .and_then(|body| body.message)
            .unwrap_or_else(|| format!("identity store returned {}", status));
        StoreError::Backend(message)
    }
}

#[async_trait]
impl IdentityStore for RestIdentityStore {
    async fn find_by_address(&self, address: &str) -> Result<Option<Identity>, StoreError> {
        let filter = format!("eq.{}", address);
        let response = self
            .authorized(self.client.get(&self.table_url))
            .query(&[("select", IDENTITY_COLUMNS), ("public_key_address", filter.as_str())])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::backend_error(response).await);
        }

        let mut rows: Vec<Identity> = response.json().await?;
        Ok(rows.pop())
    }

    async fn create(&self, record: NewIdentity) -> Result<Identity, StoreError> {
        let response = self
            .authorized(self.client.post(&self.table_url))
            .query(&[("select", IDENTITY_COLUMNS)])
            .header("Prefer", "return=representation")
            .json(&record)
            .send()
            .await?;

        match response.status() {
            StatusCode::CONFLICT => Err(StoreError::Conflict),
            status if status.is_success() => {
                let mut rows: Vec<Identity> = response.json().await?;
                rows.pop().ok_or_else(|| {
                    StoreError::Backend("identity store returned no row on insert".to_string())
                })
            }
            _ => Err(Self::backend_error(response).await),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer};
    use serde_json::{json, Value};
    use std::sync::Mutex;

    const SERVICE_KEY: &str = "service-role-key";

    #[derive(Default)]
    struct FakeTable {
        rows: Mutex<Vec<Value>>,
    }

    fn authorized(req: &HttpRequest) -> bool {
        req.headers().get("apikey").and_then(|v| v.to_str().ok()) == Some(SERVICE_KEY)
            && req
                .headers()
                .get("authorization")
                .and_then(|v| v.to_str().ok())
                == Some(&format!("Bearer {}", SERVICE_KEY)[..])
    }

    async fn select(
        req: HttpRequest,
        query: web::Query<std::collections::HashMap<String, String>>,
        table: web::Data<FakeTable>,
    ) -> HttpResponse {
        if !authorized(&req) {
            return HttpResponse::Unauthorized().json(json!({ "message": "Invalid API key" }));
        }
        let address = query
            .get("public_key_address")
            .and_then(|f| f.strip_prefix("eq."))
            .unwrap_or_default()
            .to_string();
        let rows: Vec<Value> = table
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|row| row["public_key_address"] == address.as_str())
            .cloned()
            .collect();
        HttpResponse::Ok().json(rows)
    }

    async fn insert(
        req: HttpRequest,
        body: web::Json<Value>,
        table: web::Data<FakeTable>,
    ) -> HttpResponse {
        if !authorized(&req) {
            return HttpResponse::Unauthorized().json(json!({ "message": "Invalid API key" }));
        }
        let mut rows = table.rows.lock().unwrap();
        if rows
            .iter()
            .any(|row| row["public_key_address"] == body["public_key_address"])
        {
            return HttpResponse::Conflict().json(json!({
                "code": "23505",
                "message": "duplicate key value violates unique constraint"
            }));
        }
        let row = json!({
            "id": uuid::Uuid::new_v4(),
            "public_key_address": body["public_key_address"],
            "email": body["email"],
            "metadata": body["metadata"],
            "created_at": chrono::Utc::now(),
        });
        rows.push(row.clone());
        HttpResponse::Created().json(vec![row])
    }

    fn start_fake_store() -> std::io::Result<(String, actix_web::dev::ServerHandle)> {
        let table = web::Data::new(FakeTable::default());
        let server = HttpServer::new(move || {
            App::new().app_data(table.clone()).service(
                web::resource("/rest/v1/wallet_identities")
                    .route(web::get().to(select))
                    .route(web::post().to(insert)),
            )
        })
        .workers(1)
        .bind(("127.0.0.1", 0))?;

        let addr = server.addrs()[0];
        let server = server.run();
        let handle = server.handle();
        actix_web::rt::spawn(server);
        Ok((format!("http://{}", addr), handle))
    }

    #[actix_web::test]
    async fn test_create_and_lookup_through_rest_api() {
        let (base_url, handle) = start_fake_store().unwrap();
        let store = RestIdentityStore::new(&base_url, SERVICE_KEY, "wallet_identities").unwrap();

        assert!(store.find_by_address("addr1").await.unwrap().is_none());

        let created = store
            .create(NewIdentity::for_address("addr1", "pw".into()))
            .await
            .unwrap();
        assert_eq!(created.email, "addr1@example.com");

        let found = store.find_by_address("addr1").await.unwrap().unwrap();
        assert_eq!(found.id, created.id);

        handle.stop(true).await;
    }

    #[actix_web::test]
    async fn test_duplicate_insert_maps_to_conflict() {
        let (base_url, handle) = start_fake_store().unwrap();
        let store = RestIdentityStore::new(&base_url, SERVICE_KEY, "wallet_identities").unwrap();

        store
            .create(NewIdentity::for_address("addr1", "pw".into()))
            .await
            .unwrap();
        let second = store
            .create(NewIdentity::for_address("addr1", "pw2".into()))
            .await;
        assert!(matches!(second, Err(StoreError::Conflict)));

        handle.stop(true).await;
    }

    #[actix_web::test]
    async fn test_rejected_key_surfaces_store_message() {
        let (base_url, handle) = start_fake_store().unwrap();
        let store = RestIdentityStore::new(&base_url, "wrong-key", "wallet_identities").unwrap();

        match store.find_by_address("addr1").await {
            Err(StoreError::Backend(message)) => assert_eq!(message, "Invalid API key"),
            other => panic!("expected backend error, got {:?}", other.map(|_| ())),
        }

        handle.stop(true).await;
    }
}
