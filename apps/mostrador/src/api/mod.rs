use async_trait::async_trait;
use reqwest::StatusCode;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::model::{Product, ProductDraft};

/// Connection settings for the catalog service: a fixed base URL plus the
/// fixed basic-auth pair every request carries.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    base_url: Url,
    credentials: Credentials,
}

impl ApiConfig {
    pub fn new(server_addr: impl AsRef<str>) -> Result<Self, CatalogError> {
        let mut base = server_addr.as_ref().trim().to_string();
        if base.is_empty() {
            return Err(CatalogError::InvalidConfig(
                "catalog server address cannot be empty".into(),
            ));
        }
        if !base.contains("://") {
            let inferred_scheme = infer_scheme(&base);
            base = format!("{inferred_scheme}{base}");
        }
        let parsed = Url::parse(&base).map_err(|err| {
            CatalogError::InvalidConfig(format!("invalid catalog server url: {err}"))
        })?;
        Ok(Self {
            base_url: parsed,
            credentials: Credentials::default(),
        })
    }

    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.credentials = Credentials {
            username: username.into(),
            password: password.into(),
        };
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }
}

/// The basic-auth pair attached to every request.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Client facade for the product catalog. Cheap to clone; every clone talks
/// through the same backend.
#[derive(Clone)]
pub struct CatalogClient {
    config: Arc<ApiConfig>,
    backend: Arc<dyn CatalogBackend>,
}

impl CatalogClient {
    pub fn new(config: ApiConfig) -> Result<Self, CatalogError> {
        let backend = Arc::new(ReqwestCatalogBackend::new()?);
        Ok(Self {
            config: Arc::new(config),
            backend,
        })
    }

    #[cfg(test)]
    pub(crate) fn with_backend(config: ApiConfig, backend: Arc<dyn CatalogBackend>) -> Self {
        Self {
            config: Arc::new(config),
            backend,
        }
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    pub async fn list(&self) -> Result<Vec<Product>, CatalogError> {
        self.backend
            .list(self.config.base_url(), self.config.credentials())
            .await
    }

    pub async fn create(&self, draft: &ProductDraft) -> Result<Product, CatalogError> {
        self.backend
            .create(self.config.base_url(), self.config.credentials(), draft)
            .await
    }

    pub async fn update(&self, id: u64, draft: &ProductDraft) -> Result<Product, CatalogError> {
        self.backend
            .update(self.config.base_url(), self.config.credentials(), id, draft)
            .await
    }

    pub async fn delete(&self, id: u64) -> Result<(), CatalogError> {
        self.backend
            .delete(self.config.base_url(), self.config.credentials(), id)
            .await
    }
}

fn infer_scheme(base: &str) -> &'static str {
    let host = base
        .split('/')
        .next()
        .unwrap_or(base)
        .trim_start_matches('[')
        .split(']')
        .next()
        .unwrap_or(base)
        .to_ascii_lowercase();
    let private_prefix = host.starts_with("localhost")
        || host.starts_with("127.")
        || host == "0.0.0.0"
        || host == "::1"
        || host.starts_with("10.")
        || host.starts_with("192.168.");
    let rfc1918_172 = host
        .strip_prefix("172.")
        .and_then(|rest| rest.split('.').next())
        .and_then(|octet| octet.parse::<u8>().ok())
        .is_some_and(|octet| (16..32).contains(&octet));
    if private_prefix || rfc1918_172 {
        "http://"
    } else {
        "https://"
    }
}

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("invalid catalog configuration: {0}")]
    InvalidConfig(String),
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("unexpected http status {0}")]
    HttpStatus(StatusCode),
}

/// Seam between the client facade and the transport. Production uses the
/// reqwest backend; tests substitute a mock.
#[async_trait]
pub trait CatalogBackend: Send + Sync {
    async fn list(
        &self,
        base_url: &Url,
        auth: &Credentials,
    ) -> Result<Vec<Product>, CatalogError>;

    async fn create(
        &self,
        base_url: &Url,
        auth: &Credentials,
        draft: &ProductDraft,
    ) -> Result<Product, CatalogError>;

    async fn update(
        &self,
        base_url: &Url,
        auth: &Credentials,
        id: u64,
        draft: &ProductDraft,
    ) -> Result<Product, CatalogError>;

    async fn delete(
        &self,
        base_url: &Url,
        auth: &Credentials,
        id: u64,
    ) -> Result<(), CatalogError>;
}

pub struct ReqwestCatalogBackend {
    client: reqwest::Client,
}

impl ReqwestCatalogBackend {
    pub fn new() -> Result<Self, CatalogError> {
        // Conservative timeouts and no proxy so a dead local backend fails
        // fast instead of hanging the UI's completion events.
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(3))
            .timeout(Duration::from_secs(8))
            .no_proxy()
            .build()?;
        Ok(Self { client })
    }

    fn endpoint(base_url: &Url, path: &str) -> Result<Url, CatalogError> {
        base_url.join(path).map_err(|err| {
            CatalogError::InvalidConfig(format!("invalid catalog endpoint {path}: {err}"))
        })
    }
}

#[async_trait]
impl CatalogBackend for ReqwestCatalogBackend {
    async fn list(
        &self,
        base_url: &Url,
        auth: &Credentials,
    ) -> Result<Vec<Product>, CatalogError> {
        let endpoint = Self::endpoint(base_url, "productos")?;
        let response = self
            .client
            .get(endpoint)
            .basic_auth(&auth.username, Some(&auth.password))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(CatalogError::HttpStatus(response.status()));
        }
        Ok(response.json::<Vec<Product>>().await?)
    }

    async fn create(
        &self,
        base_url: &Url,
        auth: &Credentials,
        draft: &ProductDraft,
    ) -> Result<Product, CatalogError> {
        let endpoint = Self::endpoint(base_url, "productos")?;
        let response = self
            .client
            .post(endpoint)
            .basic_auth(&auth.username, Some(&auth.password))
            .json(draft)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(CatalogError::HttpStatus(response.status()));
        }
        Ok(response.json::<Product>().await?)
    }

    async fn update(
        &self,
        base_url: &Url,
        auth: &Credentials,
        id: u64,
        draft: &ProductDraft,
    ) -> Result<Product, CatalogError> {
        let endpoint = Self::endpoint(base_url, &format!("productos/{id}"))?;
        let response = self
            .client
            .put(endpoint)
            .basic_auth(&auth.username, Some(&auth.password))
            .json(draft)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(CatalogError::HttpStatus(response.status()));
        }
        Ok(response.json::<Product>().await?)
    }

    async fn delete(
        &self,
        base_url: &Url,
        auth: &Credentials,
        id: u64,
    ) -> Result<(), CatalogError> {
        let endpoint = Self::endpoint(base_url, &format!("productos/{id}"))?;
        let response = self
            .client
            .delete(endpoint)
            .basic_auth(&auth.username, Some(&auth.password))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(CatalogError::HttpStatus(response.status()));
        }
        Ok(())
    }
}
