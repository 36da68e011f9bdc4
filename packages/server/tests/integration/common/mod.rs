use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use ::common::storage::FileId;
use ::common::storage::filesystem::FilesystemBagStorage;
use ::common::storage::resolver::FilesystemFileResolver;
use reqwest::Client;
use serde_json::Value;

use bagit_server::activity::{AuditEventEmitter, TracingActivityPublisher};
use bagit_server::config::{
    AppConfig, AuditConfig, AuthConfig, CorsConfig, DatabaseConfig, ServerConfig,
};
use bagit_server::locks::KeyLocks;
use bagit_server::service::{BagConfig, BagLifecycleManager, BagManagerDeps};
use bagit_server::state::AppState;
use bagit_server::store::SeaOrmBagStore;
use bagit_server::utils::jwt;

const JWT_SECRET: &str = "test-secret-for-integration-tests";

pub mod routes {
    pub const BAGS: &str = "/api/v1/bags";
    pub const STORAGE: &str = "/api/v1/bags/storage";
    pub const HEALTH: &str = "/health";

    pub fn bag(bag_id: &str) -> String {
        format!("/api/v1/bags/{bag_id}")
    }

    pub fn file(file_id: i64) -> String {
        format!("/api/v1/bags/files/{file_id}")
    }

    pub fn file_content(file_id: i64) -> String {
        format!("/api/v1/bags/files/{file_id}/content")
    }

    pub fn file_validate(file_id: i64) -> String {
        format!("/api/v1/bags/files/{file_id}/validate")
    }
}

/// A running test server over a scratch data directory.
pub struct TestApp {
    pub addr: SocketAddr,
    pub client: Client,
    resolver: FilesystemFileResolver,
    data_dir: tempfile::TempDir,
}

/// Parsed HTTP response for test assertions.
pub struct TestResponse {
    pub status: u16,
    /// Raw response body as text.
    pub text: String,
    /// Parsed JSON body, or `Null` if the response is not valid JSON.
    pub body: Value,
}

impl TestApp {
    pub async fn spawn() -> Self {
        let data_dir = tempfile::tempdir().expect("Failed to create data dir");
        let db = bagit_server::database::init_db("sqlite::memory:")
            .await
            .expect("Failed to initialize database");

        let app_config = AppConfig {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                cors: CorsConfig {
                    allow_origins: vec![],
                    max_age: 3600,
                },
            },
            database: DatabaseConfig {
                url: "sqlite::memory:".to_string(),
            },
            auth: AuthConfig {
                jwt_secret: JWT_SECRET.to_string(),
            },
            storage: ::common::config::StorageAppConfig {
                data_dir: data_dir.path().to_path_buf(),
                max_payload_size: 1024 * 1024,
            },
            bag: Default::default(),
            audit: AuditConfig::default(),
        };

        let resolver = Arc::new(FilesystemFileResolver::new(data_dir.path()));
        let storage = FilesystemBagStorage::new(
            app_config.storage.data_dir.clone(),
            app_config.storage.max_payload_size,
            resolver.clone(),
        )
        .await
        .expect("Failed to initialize storage");

        let manager = BagLifecycleManager::new(
            BagManagerDeps {
                store: Arc::new(SeaOrmBagStore::new(db)),
                storage: Arc::new(storage),
                emitter: AuditEventEmitter::new(resolver.clone(), Arc::new(TracingActivityPublisher)),
            },
            BagConfig {
                default_hash: app_config.bag.default_hash,
                audit: app_config.audit,
            },
        );

        let state = AppState {
            manager,
            locks: KeyLocks::new(),
            config: app_config,
        };
        let app = bagit_server::build_router(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr,
            client: Client::new(),
            resolver: (*resolver).clone(),
            data_dir,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Token for `user_id`, signed with the server's secret.
    pub fn token(&self, user_id: &str) -> String {
        jwt::sign(user_id, JWT_SECRET, chrono::Duration::hours(1)).expect("Failed to sign token")
    }

    /// Write `content` to `relative` inside the user's file tree and return its id.
    pub async fn put_file(&self, user_id: &str, relative: &str, content: &[u8]) -> i64 {
        let path = self.source_path(user_id, relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, content).unwrap();
        self.file_id(user_id, relative).await.0
    }

    pub async fn file_id(&self, user_id: &str, relative: &str) -> FileId {
        self.resolver
            .file_id(user_id, relative)
            .await
            .expect("Failed to resolve file id")
    }

    pub fn source_path(&self, user_id: &str, relative: &str) -> PathBuf {
        self.data_dir.path().join(user_id).join("files").join(relative)
    }

    pub fn bag_path(&self, user_id: &str, bag_id: &str) -> PathBuf {
        self.data_dir.path().join(user_id).join("bagit").join(bag_id)
    }

    pub async fn post_with_token(&self, path: &str, body: &Value, token: &str) -> TestResponse {
        let res = self
            .client
            .post(self.url(path))
            .header("Authorization", format!("Bearer {token}"))
            .json(body)
            .send()
            .await
            .expect("Failed to send POST request");

        TestResponse::from_response(res).await
    }

    pub async fn post_without_token(&self, path: &str, body: &Value) -> TestResponse {
        let res = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .expect("Failed to send POST request");

        TestResponse::from_response(res).await
    }

    pub async fn get_with_token(&self, path: &str, token: &str) -> TestResponse {
        let res = self
            .client
            .get(self.url(path))
            .header("Authorization", format!("Bearer {token}"))
            .send()
            .await
            .expect("Failed to send GET request");

        TestResponse::from_response(res).await
    }

    pub async fn get_without_token(&self, path: &str) -> TestResponse {
        let res = self
            .client
            .get(self.url(path))
            .send()
            .await
            .expect("Failed to send GET request");

        TestResponse::from_response(res).await
    }

    pub async fn put_with_token(&self, path: &str, token: &str) -> TestResponse {
        let res = self
            .client
            .put(self.url(path))
            .header("Authorization", format!("Bearer {token}"))
            .send()
            .await
            .expect("Failed to send PUT request");

        TestResponse::from_response(res).await
    }

    pub async fn delete_with_token(&self, path: &str, token: &str) -> TestResponse {
        let res = self
            .client
            .delete(self.url(path))
            .header("Authorization", format!("Bearer {token}"))
            .send()
            .await
            .expect("Failed to send DELETE request");

        TestResponse::from_response(res).await
    }

    /// Bag a file via the API and return the response body.
    pub async fn create_bag(&self, token: &str, file_id: i64, hash_type: Option<&str>) -> Value {
        let mut body = serde_json::json!({ "file_id": file_id });
        if let Some(hash_type) = hash_type {
            body["hash_type"] = hash_type.into();
        }
        let res = self.post_with_token(routes::BAGS, &body, token).await;
        assert_eq!(res.status, 201, "create_bag failed: {}", res.text);
        res.body
    }
}

impl TestResponse {
    pub async fn from_response(res: reqwest::Response) -> Self {
        let status = res.status().as_u16();
        let text = res.text().await.unwrap_or_default();
        let body = serde_json::from_str(&text).unwrap_or(Value::Null);
        Self { status, text, body }
    }

    pub fn bag_id(&self) -> String {
        self.body["bag_id"]
            .as_str()
            .expect("response body should contain 'bag_id'")
            .to_string()
    }
}
