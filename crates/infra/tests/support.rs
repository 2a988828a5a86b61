#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use restsync_core::{EndpointRegistry, EntitySynchronizer};
use restsync_domain::{SyncConfig, TokenConfig, TokenConfigDocument};
use restsync_infra::{
    ApiGateway, CredentialManager, DbManager, FileRefreshStateStore, SqliteUpsertStore,
};
use serde_json::{json, Value};
use tempfile::TempDir;

/// Temporary workspace holding the database and the token configuration.
/// Files live until the value is dropped.
pub struct TestWorkspace {
    pub dir: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Self {
        Self { dir: TempDir::new().expect("temp dir should be created") }
    }

    pub fn db_path(&self) -> PathBuf {
        self.dir.path().join("sync.db")
    }

    pub fn token_path(&self) -> PathBuf {
        self.dir.path().join("token_config.json")
    }

    /// Create the destination tables. The sync never creates them itself.
    pub fn create_tables(&self, sql: &str) {
        let conn = rusqlite::Connection::open(self.db_path()).expect("db should open");
        conn.execute_batch(sql).expect("SQL batch execution should succeed");
    }

    pub fn write_token_config(&self, token_url: &str, refresh_token: &str) {
        let mut config = TokenConfig {
            token_url: token_url.to_string(),
            headers: [("Content-Type".to_string(), "application/x-www-form-urlencoded".to_string())]
                .into(),
            body: serde_json::Map::new(),
            extra: serde_json::Map::new(),
        };
        config.body.insert("grant_type".into(), json!("refresh_token"));
        config.body.insert("client_id".into(), json!("restsync-tests"));
        config.set_refresh_token(refresh_token);

        let mut document = TokenConfigDocument::new(config);
        document.extra.insert("comment".into(), json!("kept across rewrites"));
        let text = serde_json::to_string_pretty(&document).expect("token config serializes");
        std::fs::write(self.token_path(), text).expect("token config should be written");
    }

    pub fn read_token_document(&self) -> Value {
        let text = std::fs::read_to_string(self.token_path()).expect("token config readable");
        serde_json::from_str(&text).expect("token config is JSON")
    }

    pub fn sync_config(&self, api_base: &str) -> SyncConfig {
        let value = json!({
            "database": {"server": "local", "database": self.db_path().to_string_lossy()},
            "http": {"timeoutSeconds": 5},
            "apiEndpoints": [
                {"entity": "business", "api": format!("{api_base}/business/{{id}}")},
                {"entity": "settings", "api": format!("{api_base}/settings")}
            ],
            "tableMapping": {
                "business": {"id": "id", "name": "name", "timestamp": "timestamp"},
                "settings": {"id": "id", "theme": "theme"}
            }
        });
        let config: SyncConfig = serde_json::from_value(value).expect("sync config parses");
        config.validate().expect("sync config is valid");
        config
    }

    pub fn query_strings(&self, sql: &str) -> Vec<String> {
        query_strings(&self.db_path(), sql)
    }
}

impl Default for TestWorkspace {
    fn default() -> Self {
        Self::new()
    }
}

pub fn query_strings(db_path: &Path, sql: &str) -> Vec<String> {
    let conn = rusqlite::Connection::open(db_path).expect("db should open");
    let mut stmt = conn.prepare(sql).expect("query should prepare");
    let rows = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .expect("query should run")
        .collect::<rusqlite::Result<Vec<_>>>()
        .expect("rows should decode");
    rows
}

/// Wire the production components together the way the binary does.
pub fn build_synchronizer(config: &SyncConfig, token_path: &Path) -> EntitySynchronizer {
    let db = Arc::new(DbManager::new(&config.database).expect("db manager should be created"));
    let registry = Arc::new(EndpointRegistry::from_config(config).expect("registry builds"));
    let state = Arc::new(FileRefreshStateStore::new(token_path));
    let credentials =
        Arc::new(CredentialManager::new(state).expect("credential manager should be created"));
    let gateway = ApiGateway::from_config(Arc::clone(&registry), credentials, &config.http)
        .expect("gateway should be created");
    let store = SqliteUpsertStore::new(db);

    EntitySynchronizer::new(
        registry,
        Arc::new(gateway),
        Arc::new(store),
        Arc::new(config.table_mapping.clone()),
    )
}
