use std::time::{Duration, Instant};

use bytes::Bytes;
use color_eyre::{Result, eyre::ensure};
use log::{debug, info, warn};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;

pub mod error;
use error::GenerationError;

use crate::session::{GenerationRequest, Generated, ModelCatalog};

pub const DEFAULT_BASE_URL: &str =
    "https://generate-image-with-user-key-koyy20262733-h775npmi.apn.leapcell.dev";
pub const GENERATE_ENDPOINT: &str = "generate-image-with-user-key";
const UNKNOWN_ERROR: &str = "unknown error";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub catalog: Duration,
    pub generation: Duration,
    pub image: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            catalog: Duration::from_secs(15),
            generation: Duration::from_secs(60 * 3),
            image: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    image_url: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    detail: Option<Value>,
}

impl ErrorResponse {
    fn detail_text(self) -> String {
        match self.detail {
            Some(Value::String(s)) => s,
            None | Some(Value::Null) => UNKNOWN_ERROR.into(),
            Some(other) => other.to_string(),
        }
    }
}

/// Talks to the image generation backend. Cheap to clone, clones share the connection pool.
#[derive(Debug, Clone)]
pub struct BackendClient {
    base_url: String,
    timeouts: Timeouts,
    client: Client,
}

impl BackendClient {
    pub fn new(base_url: impl AsRef<str>, timeouts: Timeouts) -> Self {
        Self {
            base_url: base_url.as_ref().trim_end_matches('/').to_string(),
            timeouts,
            client: Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Lists the models the backend offers. Any failure yields an empty catalog.
    pub async fn fetch_catalog(&self) -> ModelCatalog {
        match self.try_fetch_catalog().await {
            Ok(catalog) => {
                info!("Backend offers {} models", catalog.models().len());
                catalog
            }
            Err(e) => {
                warn!("Couldn't fetch the model catalog: {e:#}");
                ModelCatalog::default()
            }
        }
    }

    async fn try_fetch_catalog(&self) -> Result<ModelCatalog> {
        let url = self.url("");
        debug!("GET {url}");
        let resp = self
            .client
            .get(&url)
            .timeout(self.timeouts.catalog)
            .header("accept", "application/json")
            .send()
            .await?;

        let status = resp.status();
        let text = resp.text().await?;
        ensure!(
            status == StatusCode::OK,
            "Catalog request failed: {status} - {text}"
        );

        Ok(serde_json::from_str(&text)?)
    }

    /// Sends exactly one generation request, no retries.
    pub async fn generate(&self, req: &GenerationRequest) -> Result<Generated, GenerationError> {
        let url = self.url(GENERATE_ENDPOINT);
        debug!("POST {url}, model: {}", req.model);

        let start = Instant::now();
        let resp = self
            .client
            .post(&url)
            .timeout(self.timeouts.generation)
            .bearer_auth(req.api_key.expose())
            .json(&req.body())
            .send()
            .await?;
        let status = resp.status();
        let body = resp.bytes().await?;
        let elapsed = start.elapsed();
        info!("Backend answered {status} after {elapsed:.2?}");

        if status == StatusCode::OK {
            let GenerateResponse { image_url } = serde_json::from_slice(&body)?;
            Ok(Generated {
                image_url,
                model: req.model.clone(),
                elapsed,
            })
        } else {
            let error: ErrorResponse = serde_json::from_slice(&body)?;
            Err(GenerationError::Backend {
                status: status.as_u16(),
                detail: error.detail_text(),
            })
        }
    }

    /// Downloads the image a successful generation points to.
    pub async fn fetch_image(&self, image_url: &str) -> Result<Bytes, GenerationError> {
        debug!("GET {image_url}");
        let bytes = self
            .client
            .get(image_url)
            .timeout(self.timeouts.image)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        debug!("Fetched image, {} bytes", bytes.len());
        Ok(bytes)
    }
}

#[cfg(test)]
mod test {
    use mockito::Matcher;
    use serde_json::json;

    use super::*;
    use crate::session::{ApiKey, SessionInput};

    fn client(server: &mockito::Server) -> BackendClient {
        BackendClient::new(server.url(), Timeouts::default())
    }

    fn request(model: &str) -> GenerationRequest {
        SessionInput {
            api_key: ApiKey::new("sk-1"),
            prompt: "a red fox".into(),
            selected_model: Some(model.into()),
        }
        .validate(&ModelCatalog::new(vec!["flux-dev".into(), "flux-pro".into()]))
        .unwrap()
    }

    #[tokio::test]
    async fn catalog_in_backend_order() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"available_models": ["flux-dev", "flux-pro"]}"#)
            .create_async()
            .await;

        let catalog = client(&server).fetch_catalog().await;
        mock.assert_async().await;
        assert_eq!(catalog.models(), ["flux-dev", "flux-pro"]);
    }

    #[tokio::test]
    async fn trailing_slash_in_base_url() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/")
            .with_status(200)
            .with_body(r#"{"available_models": ["flux-dev"]}"#)
            .create_async()
            .await;

        let backend = BackendClient::new(format!("{}/", server.url()), Timeouts::default());
        assert_eq!(backend.base_url(), server.url());
        let catalog = backend.fetch_catalog().await;
        mock.assert_async().await;
        assert_eq!(catalog.models(), ["flux-dev"]);
    }

    #[tokio::test]
    async fn catalog_is_empty_on_failure() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/")
            .with_status(500)
            .with_body(r#"{"available_models": ["flux-dev"]}"#)
            .create_async()
            .await;
        assert!(client(&server).fetch_catalog().await.is_empty());

        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/")
            .with_status(200)
            .with_body("<html>not json</html>")
            .create_async()
            .await;
        assert!(client(&server).fetch_catalog().await.is_empty());

        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/")
            .with_status(200)
            .with_body(r#"{"version": "1"}"#)
            .create_async()
            .await;
        assert!(client(&server).fetch_catalog().await.is_empty());

        let unreachable = BackendClient::new("http://127.0.0.1:1", Timeouts::default());
        assert!(unreachable.fetch_catalog().await.is_empty());
    }

    #[tokio::test]
    async fn generate_success() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/generate-image-with-user-key")
            .match_header("authorization", "Bearer sk-1")
            .match_body(Matcher::Json(
                json!({"prompt": "a red fox", "model": "flux-dev"}),
            ))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"image_url": "http://x/img.png"}"#)
            .expect(1)
            .create_async()
            .await;

        let generated = client(&server).generate(&request("flux-dev")).await.unwrap();
        mock.assert_async().await;
        assert_eq!(generated.image_url, "http://x/img.png");
        assert_eq!(generated.model, "flux-dev");
        assert!(generated.caption().contains("flux-dev"));
    }

    #[tokio::test]
    async fn generate_backend_error() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/generate-image-with-user-key")
            .with_status(401)
            .with_header("content-type", "application/json")
            .with_body(r#"{"detail": "invalid key"}"#)
            .expect(1)
            .create_async()
            .await;

        let err = client(&server)
            .generate(&request("flux-pro"))
            .await
            .unwrap_err();
        mock.assert_async().await;
        assert_eq!(
            err,
            GenerationError::Backend {
                status: 401,
                detail: "invalid key".into()
            }
        );
        let msg = err.to_string();
        assert!(msg.contains("401"));
        assert!(msg.contains("invalid key"));
    }

    #[tokio::test]
    async fn backend_error_detail_fallbacks() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/generate-image-with-user-key")
            .with_status(500)
            .with_body("{}")
            .create_async()
            .await;
        let err = client(&server)
            .generate(&request("flux-dev"))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            GenerationError::Backend {
                status: 500,
                detail: "unknown error".into()
            }
        );

        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/generate-image-with-user-key")
            .with_status(422)
            .with_body(r#"{"detail": [{"msg": "field required"}]}"#)
            .create_async()
            .await;
        let err = client(&server)
            .generate(&request("flux-dev"))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            GenerationError::Backend {
                status: 422,
                detail: r#"[{"msg":"field required"}]"#.into()
            }
        );
    }

    #[tokio::test]
    async fn malformed_responses_are_transport_errors() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/generate-image-with-user-key")
            .with_status(200)
            .with_body(r#"{"url": "http://x/img.png"}"#)
            .create_async()
            .await;
        let err = client(&server)
            .generate(&request("flux-dev"))
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::Transport(ref m) if m.contains("image_url")));

        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/generate-image-with-user-key")
            .with_status(502)
            .with_body("Bad Gateway")
            .create_async()
            .await;
        let err = client(&server)
            .generate(&request("flux-dev"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), error::ErrorKind::Transport);
    }

    #[tokio::test]
    async fn connection_error_keeps_raw_description() {
        let backend = BackendClient::new("http://127.0.0.1:1", Timeouts::default());
        let err = backend.generate(&request("flux-dev")).await.unwrap_err();
        let GenerationError::Transport(raw) = &err else {
            panic!("expected transport error, got {err:?}");
        };
        assert!(!raw.is_empty());
        assert!(err.to_string().ends_with(raw.as_str()));
    }

    #[tokio::test]
    async fn fetch_image_bytes() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/img.png")
            .with_status(200)
            .with_body([1u8, 2, 3])
            .create_async()
            .await;
        let backend = client(&server);
        let bytes = backend
            .fetch_image(&format!("{}/img.png", server.url()))
            .await
            .unwrap();
        assert_eq!(&bytes[..], [1u8, 2, 3]);

        let _m = server
            .mock("GET", "/gone.png")
            .with_status(404)
            .create_async()
            .await;
        let err = backend
            .fetch_image(&format!("{}/gone.png", server.url()))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), error::ErrorKind::Transport);
    }
}
