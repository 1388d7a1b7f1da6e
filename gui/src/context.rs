use std::time::Duration;

use color_eyre::Result;
use engine::{BackendClient, ModelCatalog, Timeouts, backend::DEFAULT_BASE_URL};
use iced::Task;
use serde::{Deserialize, Serialize};

use crate::message::{ContextMessage, Message};

pub mod generation;

pub use generation::Generation;

const DEFAULT_PROMPT: &str = "A hyper-realistic, cinematic shot...";

/// Settings read from `flux_studio.ron`. Keys are never part of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_base_url: String,
    pub default_prompt: String,
    pub catalog_timeout_secs: u64,
    pub generation_timeout_secs: u64,
    pub image_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        let timeouts = Timeouts::default();
        Self {
            api_base_url: DEFAULT_BASE_URL.into(),
            default_prompt: DEFAULT_PROMPT.into(),
            catalog_timeout_secs: timeouts.catalog.as_secs(),
            generation_timeout_secs: timeouts.generation.as_secs(),
            image_timeout_secs: timeouts.image.as_secs(),
        }
    }
}

impl Config {
    pub fn timeouts(&self) -> Timeouts {
        Timeouts {
            catalog: Duration::from_secs(self.catalog_timeout_secs),
            generation: Duration::from_secs(self.generation_timeout_secs),
            image: Duration::from_secs(self.image_timeout_secs),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CatalogState {
    #[default]
    Loading,
    Loaded(ModelCatalog),
}

/// State shared by all screens for the lifetime of the window.
pub struct Context {
    pub config: Config,
    pub backend: BackendClient,
    pub catalog: CatalogState,
    pub generation: Generation,
}

impl Context {
    pub fn from_config(config: Config) -> Self {
        let backend = BackendClient::new(&config.api_base_url, config.timeouts());
        Self {
            config,
            backend,
            catalog: CatalogState::Loading,
            generation: Generation::default(),
        }
    }

    /// The last fetched catalog, `None` while a fetch is in flight.
    pub fn catalog(&self) -> Option<&ModelCatalog> {
        match &self.catalog {
            CatalogState::Loading => None,
            CatalogState::Loaded(catalog) => Some(catalog),
        }
    }

    pub fn fetch_catalog(&mut self) -> Task<Message> {
        self.catalog = CatalogState::Loading;
        let backend = self.backend.clone();
        Task::perform(async move { backend.fetch_catalog().await }, |catalog| {
            ContextMessage::CatalogFetched(catalog).into()
        })
    }

    pub fn update(&mut self, message: ContextMessage) -> Result<Task<Message>> {
        use ContextMessage::*;
        match message {
            CatalogFetched(catalog) => {
                self.catalog = CatalogState::Loaded(catalog);
                Ok(Task::none())
            }
            Generated(res) => Ok(self.generation.finished(res, &self.backend)),
            ImageFetched { url, result } => {
                self.generation.image_fetched(url, result);
                Ok(Task::none())
            }
        }
    }
}

#[cfg(test)]
mod test {
    use engine::GenerationError;

    use super::*;

    #[test]
    fn catalog_replaces_loading_state() -> Result<()> {
        let mut ctx = Context::from_config(Config::default());
        assert!(ctx.catalog().is_none());

        let catalog = ModelCatalog::new(vec!["flux-dev".into(), "flux-pro".into()]);
        let _ = ctx.update(ContextMessage::CatalogFetched(catalog.clone()))?;
        assert_eq!(ctx.catalog(), Some(&catalog));

        let _ = ctx.fetch_catalog();
        assert_eq!(ctx.catalog, CatalogState::Loading);
        Ok(())
    }

    #[test]
    fn generation_result_lands_in_context() -> Result<()> {
        let mut ctx = Context::from_config(Config::default());
        ctx.generation.pending = true;

        let _ = ctx.update(ContextMessage::Generated(Err(GenerationError::Backend {
            status: 401,
            detail: "invalid key".into(),
        })))?;
        assert!(!ctx.generation.pending);
        assert!(matches!(
            ctx.generation.output,
            generation::Output::Failed(GenerationError::Backend { status: 401, .. })
        ));
        Ok(())
    }

    #[test]
    fn timeouts_come_from_config() {
        let cfg = Config {
            generation_timeout_secs: 5,
            ..Config::default()
        };
        assert_eq!(cfg.timeouts().generation, Duration::from_secs(5));
        assert_eq!(cfg.timeouts().catalog, Timeouts::default().catalog);
    }
}
