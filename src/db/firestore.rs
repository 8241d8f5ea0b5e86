use std::sync::Arc;

use reqwest::{RequestBuilder, StatusCode};
use serde_json::{json, Map, Value};
use tracing::debug;

use super::value::{decode_fields, encode_fields};
use crate::auth::SessionSource;
use crate::client::sdk_log::{LogLevel, SdkLog};
use crate::client::App;
use crate::error::{check_response, SdkError, SdkResult};

/// A document read from or written to the database.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Full resource name, `projects/.../documents/users/u1`.
    pub name: String,
    pub fields: Map<String, Value>,
    pub create_time: Option<String>,
    pub update_time: Option<String>,
}

impl Document {
    fn from_response(body: &Value) -> SdkResult<Self> {
        Ok(Document {
            name: body["name"]
                .as_str()
                .ok_or_else(|| SdkError::InvalidResponse("document without name".to_string()))?
                .to_string(),
            fields: decode_fields(&body["fields"])?,
            create_time: body["createTime"].as_str().map(str::to_string),
            update_time: body["updateTime"].as_str().map(str::to_string),
        })
    }

    /// Last path segment of the resource name.
    pub fn id(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or(&self.name)
    }
}

/// Document-database handle bound to an `App`. Requests carry the signed-in
/// user's ID token when there is one.
pub struct Database {
    app: App,
    session: Arc<dyn SessionSource>,
    log: Arc<dyn SdkLog>,
}

/// A document path is `collection/doc[/collection/doc...]`. Returns the
/// trimmed path and its percent-encoded form for use in request URLs.
fn validate_document_path(path: &str) -> SdkResult<(&str, String)> {
    let trimmed = path.trim_matches('/');
    let segments: Vec<&str> = trimmed.split('/').collect();
    if trimmed.is_empty()
        || segments.len() % 2 != 0
        || segments.iter().any(|s| s.is_empty() || *s == "." || *s == "..")
    {
        return Err(SdkError::InvalidPath(path.to_string()));
    }
    let encoded = segments
        .iter()
        .map(|s| urlencoding::encode(s))
        .collect::<Vec<_>>()
        .join("/");
    Ok((trimmed, encoded))
}

impl Database {
    pub fn new(app: App, session: Arc<dyn SessionSource>, log: Arc<dyn SdkLog>) -> Self {
        Database { app, session, log }
    }

    pub fn app(&self) -> &App {
        &self.app
    }

    /// The SDK log level governing this handle's request tracing.
    pub fn sdk_log_level(&self) -> LogLevel {
        self.log.log_level()
    }

    async fn authorize(&self, request: RequestBuilder) -> SdkResult<RequestBuilder> {
        match self.session.get_id_token(false).await {
            Ok(token) => Ok(request.bearer_auth(token)),
            Err(SdkError::NoCurrentUser) => Ok(request),
            Err(e) => Err(e),
        }
    }

    fn trace(&self, method: &str, path: &str) {
        if self.log.is_debug() {
            debug!(
                "Database {} '{}' on project '{}'",
                method,
                path,
                self.app.options().project_id
            );
        }
    }

    /// Fetch a document, `None` if it does not exist.
    pub async fn get_document(&self, path: &str) -> SdkResult<Option<Document>> {
        let (path, encoded) = validate_document_path(path)?;
        self.trace("GET", path);

        let url = format!("{}/{}", self.app.documents_root(), encoded);
        let resp = self.authorize(self.app.http().get(&url)).await?.send().await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let body = check_response(resp)
            .await?
            .json::<Value>()
            .await
            .map_err(|e| SdkError::InvalidResponse(e.to_string()))?;
        Document::from_response(&body).map(Some)
    }

    /// Create or overwrite a document with the fields of `data`, which must
    /// be a JSON object.
    pub async fn set_document(&self, path: &str, data: &Value) -> SdkResult<Document> {
        let (path, encoded) = validate_document_path(path)?;
        let fields = data
            .as_object()
            .ok_or_else(|| SdkError::UnsupportedValue("document data must be an object".to_string()))?;
        self.trace("PATCH", path);

        // The resource name carries the raw path; only the URL is encoded.
        let url = format!("{}/{}", self.app.documents_root(), encoded);
        let body = json!({
            "name": format!("{}/{}", self.app.documents_resource(), path),
            "fields": encode_fields(fields)?,
        });
        let resp = self
            .authorize(self.app.http().patch(&url).json(&body))
            .await?
            .send()
            .await?;
        let body = check_response(resp)
            .await?
            .json::<Value>()
            .await
            .map_err(|e| SdkError::InvalidResponse(e.to_string()))?;
        Document::from_response(&body)
    }

    pub async fn delete_document(&self, path: &str) -> SdkResult<()> {
        let (path, encoded) = validate_document_path(path)?;
        self.trace("DELETE", path);

        let url = format!("{}/{}", self.app.documents_root(), encoded);
        let resp = self.authorize(self.app.http().delete(&url)).await?.send().await?;
        check_response(resp).await?;
        Ok(())
    }
}
