use std::{fmt, time::Duration};

use serde::{Deserialize, Serialize};

use crate::GenerationError;

/// User supplied key, forwarded as bearer token. Never printed.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            f.write_str("ApiKey(<empty>)")
        } else {
            f.write_str("ApiKey(<redacted>)")
        }
    }
}

impl From<String> for ApiKey {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// The models the backend offers, in the order it lists them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelCatalog {
    #[serde(rename = "available_models", default)]
    models: Vec<String>,
}

impl ModelCatalog {
    pub fn new(models: Vec<String>) -> Self {
        Self { models }
    }

    pub fn models(&self) -> &[String] {
        &self.models
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    pub fn contains(&self, model: &str) -> bool {
        self.models.iter().any(|m| m == model)
    }

    pub fn first(&self) -> Option<&String> {
        self.models.first()
    }

    /// The explicit choice if the catalog still offers it, the first entry otherwise.
    pub fn effective_selection(&self, choice: Option<&str>) -> Option<&String> {
        choice
            .and_then(|c| self.models.iter().find(|m| *m == c))
            .or_else(|| self.first())
    }
}

/// Everything the form collected for one submit.
#[derive(Debug, Clone, Default)]
pub struct SessionInput {
    pub api_key: ApiKey,
    pub prompt: String,
    pub selected_model: Option<String>,
}

impl SessionInput {
    /// Checks model, key and prompt in that order, the first failure wins.
    pub fn validate(&self, catalog: &ModelCatalog) -> Result<GenerationRequest, GenerationError> {
        let model = self
            .selected_model
            .as_deref()
            .filter(|m| catalog.contains(m))
            .ok_or(GenerationError::MissingModel)?;

        if self.api_key.is_empty() {
            return Err(GenerationError::MissingKey);
        }

        if self.prompt.is_empty() {
            return Err(GenerationError::MissingPrompt);
        }

        Ok(GenerationRequest {
            api_key: self.api_key.clone(),
            prompt: self.prompt.clone(),
            model: model.to_string(),
        })
    }
}

/// A request that passed local validation.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub api_key: ApiKey,
    pub prompt: String,
    pub model: String,
}

impl GenerationRequest {
    pub fn body(&self) -> RequestBody<'_> {
        RequestBody {
            prompt: &self.prompt,
            model: &self.model,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RequestBody<'a> {
    pub prompt: &'a str,
    pub model: &'a str,
}

/// A successful generation as reported by the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct Generated {
    pub image_url: String,
    pub model: String,
    pub elapsed: Duration,
}

impl Generated {
    pub fn caption(&self) -> String {
        format!(
            "Model: {} | Elapsed: {:.2} s",
            self.model,
            self.elapsed.as_secs_f64()
        )
    }
}
