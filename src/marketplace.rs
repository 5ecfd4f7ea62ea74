//! Marketplace configuration rows. Created and edited by the admin CRUD
//! surface; read-only from the sync engine's side.

use crate::sync::SyncError;
use crate::util::db::Db;
use anyhow::Result;
use serde::Deserialize;
use sqlx::FromRow;

/// One configured external marketplace. The JSON blobs keep the shape the
/// admin surface writes: a polymorphic credential object and one CRUD
/// endpoint descriptor each for products and orders.
#[derive(Debug, Clone, FromRow)]
pub struct Marketplace {
    pub id: i32,
    pub image_url: String,
    pub title: String,
    pub owner: String,
    #[sqlx(rename = "baseURL")]
    pub base_url: String,
    #[sqlx(rename = "marketplaceDomain")]
    pub marketplace_domain: String,
    pub country: String,
    #[sqlx(rename = "baseAPIURL")]
    pub base_api_url: String,
    pub credentials: serde_json::Value,
    pub products_crud: serde_json::Value,
    pub orders_crud: serde_json::Value,
}

/// Credential blob, tagged by scheme. Anything other than the two known tags
/// means the marketplace cannot be synced.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum Credentials {
    #[serde(rename = "user_pass")]
    UserPass {
        #[serde(rename = "firstKey")]
        username: String,
        #[serde(rename = "secondKey")]
        password: String,
    },
    #[serde(rename = "pub_priv")]
    PubPriv {
        #[serde(rename = "firstKey")]
        public_key: String,
        #[serde(rename = "secondKey")]
        private_key: String,
    },
}

/// Remote sub-paths for one resource family (products or orders).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CrudEndpoints {
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub create: Option<String>,
    #[serde(default)]
    pub read: Option<String>,
    #[serde(default)]
    pub update: Option<String>,
    #[serde(default)]
    pub delete: Option<String>,
    #[serde(default)]
    pub count: Option<String>,
}

impl Marketplace {
    /// Parse the credential blob; unknown/missing tags and missing keys are
    /// `UnsupportedCredential` so the orchestrator can skip this marketplace.
    pub fn parsed_credentials(&self) -> Result<Credentials, SyncError> {
        serde_json::from_value(self.credentials.clone()).map_err(|_| {
            let tag = self
                .credentials
                .get("type")
                .and_then(|t| t.as_str())
                .unwrap_or("<missing>")
                .to_string();
            SyncError::UnsupportedCredential(tag)
        })
    }

    pub fn products_endpoints(&self) -> Result<CrudEndpoints, SyncError> {
        serde_json::from_value(self.products_crud.clone())
            .map_err(|e| SyncError::RemoteFetch {
                status: None,
                message: format!("invalid products_crud descriptor: {e}"),
            })
    }
}

/// Load the marketplace set, optionally narrowed to a single id. Reloaded on
/// every tick so admin edits take effect without a restart.
pub async fn load_marketplaces(db: &Db, only: Option<i32>) -> Result<Vec<Marketplace>> {
    let rows = sqlx::query_as::<_, Marketplace>(
        r#"SELECT id, image_url, title, owner, "baseURL", "marketplaceDomain",
                  country, "baseAPIURL", credentials, products_crud, orders_crud
           FROM marketplaces
           WHERE $1::int IS NULL OR id = $1
           ORDER BY id"#,
    )
    .bind(only)
    .fetch_all(&db.pool)
    .await?;
    Ok(rows)
}
