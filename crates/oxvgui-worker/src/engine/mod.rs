//! Document optimization engines and the endpoint that hosts them.

mod basic;

use std::sync::Arc;

pub use basic::BasicEngine;
use oxvgui_core::{Dimensions, JobsConfig};

use crate::TRACING_TARGET_ENDPOINT;
use crate::endpoint::Endpoint;
use crate::protocol::{OptimiseResult, WorkerRequest, WorkerResponse};

/// The document transformation consumed by [`OptimizerEndpoint`].
///
/// Calls are synchronous and CPU bound; the endpoint moves them off the
/// async runtime.
pub trait Engine: Send + Sync + 'static {
    /// Loads whatever the engine needs before its first call.
    fn initialize(&self) -> Result<(), String>;

    /// Validates `svg` and returns its intrinsic dimensions.
    fn dimensions(&self, svg: &str) -> Result<Dimensions, String>;

    /// Runs the configured jobs over `svg`.
    fn optimise(&self, svg: &str, jobs: &JobsConfig, pretty: bool)
    -> Result<OptimiseResult, String>;
}

/// Endpoint answering [`WorkerRequest`]s with an [`Engine`].
pub struct OptimizerEndpoint<G> {
    engine: Arc<G>,
}

impl<G: Engine> OptimizerEndpoint<G> {
    /// Creates an endpoint over `engine`.
    pub fn new(engine: G) -> Self {
        Self {
            engine: Arc::new(engine),
        }
    }

    /// Returns the hosted engine.
    pub fn engine(&self) -> &G {
        &self.engine
    }
}

impl<G: Engine> Endpoint for OptimizerEndpoint<G> {
    type Request = WorkerRequest;
    type Response = WorkerResponse;

    async fn initialize(&mut self) -> Result<(), String> {
        let engine = Arc::clone(&self.engine);
        run_blocking(move || engine.initialize()).await
    }

    async fn handle(&mut self, request: WorkerRequest) -> Result<WorkerResponse, String> {
        let engine = Arc::clone(&self.engine);
        tracing::debug!(
            target: TRACING_TARGET_ENDPOINT,
            action = request.action().as_ref(),
            bytes = request.data_len(),
            "Running engine"
        );

        match request {
            WorkerRequest::Inspect { data } => {
                run_blocking(move || engine.dimensions(&data))
                    .await
                    .map(WorkerResponse::Dimensions)
            }
            WorkerRequest::Optimize { data, settings } => {
                let jobs = settings.jobs_config().map_err(|e| e.to_string())?;
                let pretty = settings.pretty;
                run_blocking(move || engine.optimise(&data, &jobs, pretty))
                    .await
                    .map(WorkerResponse::Optimized)
            }
        }
    }
}

async fn run_blocking<T, F>(f: F) -> Result<T, String>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, String> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| format!("engine task failed: {e}"))?
}

#[cfg(test)]
mod tests {
    use oxvgui_core::Settings;

    use super::*;

    #[tokio::test]
    async fn test_inspect_reports_dimensions() {
        let mut endpoint = OptimizerEndpoint::new(BasicEngine::new());
        endpoint.initialize().await.unwrap();

        let response = endpoint
            .handle(WorkerRequest::Inspect {
                data: r#"<svg width="10" height="20"/>"#.into(),
            })
            .await
            .unwrap();

        assert_eq!(
            response,
            WorkerResponse::Dimensions(Dimensions::new(10.0, 20.0))
        );
    }

    #[tokio::test]
    async fn test_optimize_runs_enabled_jobs() {
        let mut endpoint = OptimizerEndpoint::new(BasicEngine::new());
        endpoint.initialize().await.unwrap();

        let settings = Settings::empty().with_job("removeComments", true);
        let response = endpoint
            .handle(WorkerRequest::Optimize {
                data: r#"<svg viewBox="0 0 4 3"><!-- note --><g/></svg>"#.into(),
                settings,
            })
            .await
            .unwrap();

        let WorkerResponse::Optimized(result) = response else {
            panic!("expected an optimization result");
        };
        assert_eq!(result.data, r#"<svg viewBox="0 0 4 3"><g/></svg>"#);
        assert_eq!(result.dimensions, Dimensions::new(4.0, 3.0));
    }

    #[tokio::test]
    async fn test_unknown_job_is_reported_as_an_error() {
        let mut endpoint = OptimizerEndpoint::new(BasicEngine::new());
        endpoint.initialize().await.unwrap();

        let err = endpoint
            .handle(WorkerRequest::Optimize {
                data: "<svg/>".into(),
                settings: Settings::empty().with_job("noSuchJob", true),
            })
            .await
            .unwrap_err();

        assert!(err.contains("noSuchJob"), "{err}");
    }
}
