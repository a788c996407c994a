//! Application assembly: settings, store, modules, and the HTTP router.

use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use readinglist_kernel::{settings::Settings, InitCtx, ModuleRegistry};

use crate::modules::{self, books::store};

/// Immutable startup configuration plus every registered module.
///
/// Handlers reach shared state only through what is passed in here.
pub struct App {
    settings: Settings,
    registry: ModuleRegistry,
}

impl App {
    /// Open the configured book store and register modules against it.
    pub async fn bootstrap(settings: Settings) -> anyhow::Result<Self> {
        let store = store::open(&settings.database)
            .await
            .context("failed to open book store")?;
        Ok(Self::with_store(settings, store))
    }

    /// Assemble the application around an existing store.
    pub fn with_store(settings: Settings, store: Arc<dyn store::BookStore>) -> Self {
        let mut registry = ModuleRegistry::new();
        modules::register_all(&mut registry, store);
        Self { settings, registry }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// The complete HTTP router, middleware included.
    pub fn router(&self) -> Router {
        readinglist_http::build_router(&self.registry, &self.settings)
    }

    /// Initialize and start modules, serve until shutdown, then stop modules.
    pub async fn run(self) -> anyhow::Result<()> {
        let ctx = InitCtx {
            settings: &self.settings,
        };
        self.registry.init_modules(&ctx).await?;
        self.registry.start_modules(&ctx).await?;

        let served = readinglist_http::start_server(self.router(), &self.settings).await;

        self.registry.stop_modules().await?;
        served
    }
}
