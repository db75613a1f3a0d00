//! Credential resolution from the package-annotated credential store.
//!
//! The action platform keeps the credential store location as annotations on
//! the package the action belongs to. Resolution reads those annotations and
//! then fetches the auth document they point at. Nothing is cached: every
//! invocation resolves fresh credentials.

use reqwest::{RequestBuilder, Url};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, error, info};

use crate::{Config, Error, Result};

const ANNOTATION_URL: &str = "cloudant_url";
const ANNOTATION_DBNAME: &str = "cloudant_auth_dbname";
const ANNOTATION_KEY: &str = "cloudant_auth_key";

/// Auth document stored per namespace in the credential store.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthDocument {
    #[serde(default)]
    pub facebook: Option<FacebookAuth>,
    #[serde(default)]
    pub conversation: Option<ConversationAuth>,
}

/// Facebook channel secrets.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FacebookAuth {
    pub app_secret: Option<String>,
    pub verification_token: Option<String>,
    pub page_access_token: Option<String>,
}

/// Dialog engine secrets.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConversationAuth {
    pub workspace_id: Option<String>,
}

impl AuthDocument {
    /// Page access token, if present and non-empty.
    pub fn page_access_token(&self) -> Option<&str> {
        self.facebook
            .as_ref()
            .and_then(|fb| fb.page_access_token.as_deref())
            .filter(|token| !token.is_empty())
    }

    /// Webhook verify token, if present and non-empty.
    pub fn verification_token(&self) -> Option<&str> {
        self.facebook
            .as_ref()
            .and_then(|fb| fb.verification_token.as_deref())
            .filter(|token| !token.is_empty())
    }

    /// App secret used to sign webhook deliveries, if present and non-empty.
    pub fn app_secret(&self) -> Option<&str> {
        self.facebook
            .as_ref()
            .and_then(|fb| fb.app_secret.as_deref())
            .filter(|secret| !secret.is_empty())
    }

    /// Dialog engine workspace id, if present and non-empty.
    pub fn workspace_id(&self) -> Option<&str> {
        self.conversation
            .as_ref()
            .and_then(|convo| convo.workspace_id.as_deref())
            .filter(|id| !id.is_empty())
    }
}

/// Package metadata as returned by the action platform.
#[derive(Debug, Deserialize)]
struct PackageMetadata {
    #[serde(default)]
    annotations: Vec<Annotation>,
}

#[derive(Debug, Deserialize)]
struct Annotation {
    key: String,
    value: Value,
}

/// Where the auth document lives in the credential store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialStoreLocation {
    pub url: String,
    pub dbname: String,
    pub key: String,
}

impl CredentialStoreLocation {
    fn from_annotations(annotations: &[Annotation]) -> Result<Self> {
        let lookup = |name: &str| {
            annotations
                .iter()
                .find(|a| a.key == name)
                .and_then(|a| a.value.as_str())
                .map(String::from)
                .ok_or_else(|| {
                    Error::AuthLookup(format!("Package annotation '{}' not found.", name))
                })
        };

        Ok(Self {
            url: lookup(ANNOTATION_URL)?,
            dbname: lookup(ANNOTATION_DBNAME)?,
            key: lookup(ANNOTATION_KEY)?,
        })
    }
}

/// Client for resolving per-namespace credentials.
#[derive(Debug, Clone)]
pub struct CredentialResolver {
    http_client: reqwest::Client,
    api_base_url: String,
    api_key: Option<String>,
}

impl CredentialResolver {
    /// Create a new resolver for the configured action platform.
    pub fn new(config: &Config) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            api_base_url: config.api_base_url(),
            api_key: config.api_key.clone(),
        }
    }

    /// Resolve the auth document for a namespace/package pair.
    pub async fn resolve(&self, namespace: &str, package_name: &str) -> Result<AuthDocument> {
        let location = self.fetch_location(namespace, package_name).await?;
        self.fetch_auth_document(&location).await
    }

    /// Read the credential store location from the package annotations.
    pub async fn fetch_location(
        &self,
        namespace: &str,
        package_name: &str,
    ) -> Result<CredentialStoreLocation> {
        let url = format!(
            "{}/api/v1/namespaces/{}/packages/{}",
            self.api_base_url, namespace, package_name
        );
        debug!("Fetching package metadata for {}/{}", namespace, package_name);

        let mut request = self.http_client.get(&url);
        if let Some(api_key) = &self.api_key {
            let (user, password) = api_key.split_once(':').unwrap_or((api_key.as_str(), ""));
            request = request.basic_auth(user, Some(password));
        }

        let metadata: PackageMetadata = send_json(request, "Package metadata").await?;
        CredentialStoreLocation::from_annotations(&metadata.annotations)
    }

    /// Fetch the auth document stored at `location`.
    pub async fn fetch_auth_document(
        &self,
        location: &CredentialStoreLocation,
    ) -> Result<AuthDocument> {
        let raw_url = format!(
            "{}/{}/{}",
            location.url.trim_end_matches('/'),
            location.dbname,
            location.key
        );
        let mut url = Url::parse(&raw_url)
            .map_err(|e| Error::AuthLookup(format!("Invalid credential store URL: {}", e)))?;

        // Credentials embedded in the store URL travel as a basic auth header instead.
        let user = url.username().to_string();
        let password = url.password().map(String::from);
        let mut request = if user.is_empty() {
            self.http_client.get(url)
        } else {
            let _ = url.set_username("");
            let _ = url.set_password(None);
            self.http_client.get(url).basic_auth(user, password)
        };
        request = request.header("accept", "application/json");

        let document = send_json(request, "Credential store").await?;
        info!("Resolved auth document from {}", location.dbname);
        Ok(document)
    }
}

async fn send_json<T: serde::de::DeserializeOwned>(
    request: RequestBuilder,
    what: &str,
) -> Result<T> {
    let response = request.send().await.map_err(|e| {
        error!("{} lookup failed: {}", what, e);
        Error::AuthLookup(format!("{} lookup failed: {}", what, e))
    })?;

    let status = response.status();
    if !status.is_success() {
        error!("{} lookup returned {}", what, status);
        return Err(Error::AuthLookup(format!(
            "{} lookup returned status code {}",
            what,
            status.as_u16()
        )));
    }

    response
        .json()
        .await
        .map_err(|e| Error::AuthLookup(format!("Failed to parse {} response: {}", what, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_FACEBOOK_POST_URL;
    use httpmock::prelude::*;
    use serde_json::json;

    fn resolver_for(server: &MockServer) -> CredentialResolver {
        CredentialResolver::new(&Config {
            api_host: server.base_url(),
            api_key: Some("user:secret".to_string()),
            namespace: "ns".to_string(),
            package_name: "pipeline_pkg".to_string(),
            facebook_post_url: DEFAULT_FACEBOOK_POST_URL.to_string(),
            pipeline_function: None,
        })
    }

    fn annotations(cloudant_url: &str) -> Value {
        json!({
            "annotations": [
                { "key": "cloudant_url", "value": cloudant_url },
                { "key": "cloudant_auth_dbname", "value": "abc" },
                { "key": "cloudant_auth_key", "value": "123" }
            ]
        })
    }

    #[test]
    fn test_parse_auth_document() {
        let json = r#"{"_id":"123","facebook":{"app_secret":"s","verification_token":"v","page_access_token":"p"},"conversation":{"workspace_id":"w"}}"#;
        let doc: AuthDocument = serde_json::from_str(json).unwrap();
        assert_eq!(doc.page_access_token(), Some("p"));
        assert_eq!(doc.verification_token(), Some("v"));
        assert_eq!(doc.app_secret(), Some("s"));
        assert_eq!(doc.workspace_id(), Some("w"));
    }

    #[test]
    fn test_empty_secrets_are_absent() {
        let doc: AuthDocument =
            serde_json::from_str(r#"{"facebook":{"page_access_token":""}}"#).unwrap();
        assert_eq!(doc.page_access_token(), None);
        assert_eq!(doc.workspace_id(), None);
    }

    #[tokio::test]
    async fn test_resolve_reads_annotations_then_document() {
        let server = MockServer::start_async().await;
        let store_url = server.base_url();
        let metadata = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/api/v1/namespaces/ns/packages/pipeline_pkg")
                    .header("authorization", "Basic dXNlcjpzZWNyZXQ=");
                then.status(200).json_body(annotations(&store_url));
            })
            .await;
        let document = server
            .mock_async(|when, then| {
                when.method(GET).path("/abc/123");
                then.status(200)
                    .json_body(json!({ "conversation": { "workspace_id": "ws-1" } }));
            })
            .await;

        let auth = resolver_for(&server)
            .resolve("ns", "pipeline_pkg")
            .await
            .unwrap();

        metadata.assert_async().await;
        document.assert_async().await;
        assert_eq!(auth.workspace_id(), Some("ws-1"));
        assert!(auth.facebook.is_none());
    }

    #[tokio::test]
    async fn test_store_credentials_move_to_basic_auth() {
        let server = MockServer::start_async().await;
        let store_url = format!("http://admin:pw@{}", server.address());
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/v1/namespaces/ns/packages/pipeline_pkg");
                then.status(200).json_body(annotations(&store_url));
            })
            .await;
        let document = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/abc/123")
                    .header("authorization", "Basic YWRtaW46cHc=");
                then.status(200).json_body(json!({}));
            })
            .await;

        resolver_for(&server)
            .resolve("ns", "pipeline_pkg")
            .await
            .unwrap();
        document.assert_async().await;
    }

    #[tokio::test]
    async fn test_missing_annotation_fails() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/v1/namespaces/ns/packages/pipeline_pkg");
                then.status(200).json_body(json!({
                    "annotations": [{ "key": "cloudant_url", "value": "http://x" }]
                }));
            })
            .await;

        let err = resolver_for(&server)
            .resolve("ns", "pipeline_pkg")
            .await
            .unwrap_err();
        assert_eq!(err.name(), "AuthLookupError");
        assert_eq!(
            err.to_string(),
            "Package annotation 'cloudant_auth_dbname' not found."
        );
    }

    #[tokio::test]
    async fn test_non_success_status_fails() {
        let server = MockServer::start_async().await;
        let store_url = server.base_url();
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/v1/namespaces/ns/packages/pipeline_pkg");
                then.status(200).json_body(annotations(&store_url));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/abc/123");
                then.status(404).json_body(json!({ "error": "not_found" }));
            })
            .await;

        let err = resolver_for(&server)
            .resolve("ns", "pipeline_pkg")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::AuthLookup(_)));
        assert_eq!(
            err.to_string(),
            "Credential store lookup returned status code 404"
        );
    }
}
