use async_trait::async_trait;
use axum::Router;

use crate::settings::Settings;

/// What a module sees while the application boots: the resolved settings,
/// after CLI overrides.
pub struct InitCtx<'a> {
    pub settings: &'a Settings,
}

/// A feature area of the reading list service (books today), mounted at
/// `/v1/{name}` and driven through boot and shutdown by the
/// [`ModuleRegistry`](crate::ModuleRegistry).
#[async_trait]
pub trait Module: Sync + Send {
    /// Path segment under `/v1`; also the module's name in logs and errors.
    fn name(&self) -> &'static str;

    /// Runs once before the listener binds. An error aborts startup and is
    /// reported with the module's name.
    async fn init(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    /// Routes relative to the mount point, so `/` is `/v1/{name}`.
    fn routes(&self) -> Router {
        Router::new()
    }

    /// OpenAPI fragment with `paths` relative to the mount point and any
    /// `components.schemas` it references.
    fn openapi(&self) -> Option<serde_json::Value> {
        None
    }

    /// Runs after every module's `init` succeeded, just before serving.
    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    /// Runs after the server drained on Ctrl-C or SIGTERM, in reverse
    /// registration order.
    async fn stop(&self) -> anyhow::Result<()> {
        Ok(())
    }
}
