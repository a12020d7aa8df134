//! HTTPS client for the Linode API v4.

use std::time::Duration;

use reqwest::header::AUTHORIZATION;
use reqwest::{Method, RequestBuilder, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;

use super::error::ApiError;
use super::types::{
    ConfigId, CreateInstanceRequest, InstanceConfig, InstanceConfigUpdate, InstanceId, Linode,
    Page, StackScriptFilter, Stackscript,
};
use super::{ApiFuture, ComputeApi};

/// Base URL of the public API.
pub const API_BASE: &str = "https://api.linode.com/v4";

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);
const PRODUCT: &str = env!("CARGO_PKG_NAME");
const VERSION: &str = env!("CARGO_PKG_VERSION");
const API_CLIENT: &str = "linode-api-client";

/// Composes the User-Agent sent with every request.
///
/// The result reads `<product>/<version> <api-client>/<version>`, preceded by
/// `prefix` and a space when one is supplied.
#[must_use]
pub fn user_agent(prefix: Option<&str>) -> String {
    let base = format!("{PRODUCT}/{VERSION} {API_CLIENT}/{VERSION}");
    match prefix.map(str::trim).filter(|value| !value.is_empty()) {
        Some(tag) => format!("{tag} {base}"),
        None => base,
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    errors: Vec<ErrorReason>,
}

#[derive(Deserialize)]
struct ErrorReason {
    reason: String,
    #[serde(default)]
    field: Option<String>,
}

/// Authenticated client for the Linode API.
#[derive(Clone, Debug)]
pub struct LinodeClient {
    http: reqwest::Client,
    token: String,
    base_url: String,
}

impl LinodeClient {
    /// Builds a client that authenticates with `token`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Transport`] when the HTTP stack cannot be
    /// initialised.
    pub fn new(token: impl Into<String>, ua_prefix: Option<&str>) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .user_agent(user_agent(ua_prefix))
            .build()?;
        Ok(Self {
            http,
            token: token.into(),
            base_url: API_BASE.to_owned(),
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}{path}", self.base_url))
            .header(AUTHORIZATION, format!("Bearer {}", self.token))
    }

    async fn check(response: Response) -> Result<Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.bytes().await?;
        Err(ApiError::Api {
            status: status.as_u16(),
            message: error_message(&body, status.canonical_reason()),
        })
    }

    async fn send_json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, ApiError> {
        let response = Self::check(request.send().await?).await?;
        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|err| ApiError::Decode {
            message: err.to_string(),
        })
    }

    async fn send_empty(request: RequestBuilder) -> Result<(), ApiError> {
        Self::check(request.send().await?).await?;
        Ok(())
    }

    async fn list_all<T: DeserializeOwned>(
        &self,
        path: &str,
        filter: Option<&str>,
    ) -> Result<Vec<T>, ApiError> {
        let mut items = Vec::new();
        let mut page = 1_u32;
        loop {
            let mut request = self
                .request(Method::GET, path)
                .query(&[("page", page)]);
            if let Some(value) = filter {
                request = request.header("X-Filter", value);
            }
            let envelope: Page<T> = Self::send_json(request).await?;
            items.extend(envelope.data);
            if envelope.page >= envelope.pages {
                return Ok(items);
            }
            page = envelope.page.saturating_add(1);
        }
    }
}

pub(super) fn config_body(config: Option<ConfigId>) -> serde_json::Value {
    config.map_or_else(|| json!({}), |id| json!({ "config_id": id }))
}

pub(super) fn error_message(body: &[u8], fallback: Option<&str>) -> String {
    let reasons = serde_json::from_slice::<ErrorBody>(body)
        .map(|parsed| {
            parsed
                .errors
                .into_iter()
                .map(|reason| match reason.field {
                    Some(field) => format!("[{field}] {}", reason.reason),
                    None => reason.reason,
                })
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();
    if reasons.is_empty() {
        let text = String::from_utf8_lossy(body).trim().to_owned();
        if text.is_empty() {
            return fallback.unwrap_or("unknown error").to_owned();
        }
        return text;
    }
    reasons.join("; ")
}

impl ComputeApi for LinodeClient {
    fn create_instance<'a>(
        &'a self,
        request: &'a CreateInstanceRequest,
    ) -> ApiFuture<'a, Linode> {
        Box::pin(async move {
            Self::send_json(self.request(Method::POST, "/linode/instances").json(request)).await
        })
    }

    fn get_instance(&self, id: InstanceId) -> ApiFuture<'_, Linode> {
        Box::pin(async move {
            Self::send_json(self.request(Method::GET, &format!("/linode/instances/{id}"))).await
        })
    }

    fn delete_instance(&self, id: InstanceId) -> ApiFuture<'_, ()> {
        Box::pin(async move {
            Self::send_empty(self.request(Method::DELETE, &format!("/linode/instances/{id}")))
                .await
        })
    }

    fn boot_instance(&self, id: InstanceId, config: Option<ConfigId>) -> ApiFuture<'_, ()> {
        Box::pin(async move {
            let request = self
                .request(Method::POST, &format!("/linode/instances/{id}/boot"))
                .json(&config_body(config));
            Self::send_empty(request).await
        })
    }

    fn shutdown_instance(&self, id: InstanceId) -> ApiFuture<'_, ()> {
        Box::pin(async move {
            Self::send_empty(
                self.request(Method::POST, &format!("/linode/instances/{id}/shutdown")),
            )
            .await
        })
    }

    fn reboot_instance(&self, id: InstanceId, config: Option<ConfigId>) -> ApiFuture<'_, ()> {
        Box::pin(async move {
            let request = self
                .request(Method::POST, &format!("/linode/instances/{id}/reboot"))
                .json(&config_body(config));
            Self::send_empty(request).await
        })
    }

    fn list_instance_configs(&self, id: InstanceId) -> ApiFuture<'_, Vec<InstanceConfig>> {
        Box::pin(async move {
            self.list_all(&format!("/linode/instances/{id}/configs"), None)
                .await
        })
    }

    fn update_instance_config<'a>(
        &'a self,
        id: InstanceId,
        config: ConfigId,
        update: &'a InstanceConfigUpdate,
    ) -> ApiFuture<'a, InstanceConfig> {
        Box::pin(async move {
            let request = self
                .request(
                    Method::PUT,
                    &format!("/linode/instances/{id}/configs/{config}"),
                )
                .json(update);
            Self::send_json(request).await
        })
    }

    fn list_stackscripts<'a>(
        &'a self,
        filter: &'a StackScriptFilter,
    ) -> ApiFuture<'a, Vec<Stackscript>> {
        Box::pin(async move {
            let encoded = serde_json::to_string(filter).map_err(|err| ApiError::Decode {
                message: err.to_string(),
            })?;
            self.list_all("/linode/stackscripts", Some(&encoded)).await
        })
    }

    fn get_stackscript(&self, id: u64) -> ApiFuture<'_, Stackscript> {
        Box::pin(async move {
            Self::send_json(self.request(Method::GET, &format!("/linode/stackscripts/{id}")))
                .await
        })
    }
}
