//! Stub endpoints and engines for tests.
//!
//! Everything here records what it was asked to do so tests can assert on
//! call order.

use std::marker::PhantomData;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use oxvgui_core::{Dimensions, JobsConfig, Settings};

use crate::endpoint::Endpoint;
use crate::engine::Engine;
use crate::protocol::OptimiseResult;

/// Endpoint answering each string request with its uppercase form.
///
/// A request of the form `fail:<message>` is answered with the error
/// `<message>`. Clones share their call log.
#[derive(Debug, Clone, Default)]
pub struct ScriptedEndpoint {
    delay: Option<Duration>,
    handled: Arc<Mutex<Vec<String>>>,
    initializations: Arc<AtomicUsize>,
}

impl ScriptedEndpoint {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits `delay` before answering each request.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Requests handled so far, in order.
    pub fn handled(&self) -> Vec<String> {
        self.handled
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of times the endpoint was initialized.
    pub fn initializations(&self) -> usize {
        self.initializations.load(Ordering::SeqCst)
    }
}

impl Endpoint for ScriptedEndpoint {
    type Request = String;
    type Response = String;

    async fn initialize(&mut self) -> Result<(), String> {
        self.initializations.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn handle(&mut self, request: String) -> Result<String, String> {
        self.handled
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match request.strip_prefix("fail:") {
            Some(message) => Err(message.to_owned()),
            None => Ok(request.to_uppercase()),
        }
    }
}

/// Endpoint that never initializes.
pub struct FailingEndpoint<Req = String, Res = String> {
    reason: String,
    _marker: PhantomData<fn(Req) -> Res>,
}

impl<Req, Res> FailingEndpoint<Req, Res> {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            _marker: PhantomData,
        }
    }
}

impl<Req, Res> Endpoint for FailingEndpoint<Req, Res>
where
    Req: Send + 'static,
    Res: Send + 'static,
{
    type Request = Req;
    type Response = Res;

    async fn initialize(&mut self) -> Result<(), String> {
        Err(self.reason.clone())
    }

    async fn handle(&mut self, _request: Req) -> Result<Res, String> {
        Err(self.reason.clone())
    }
}

/// Engine with predictable output.
///
/// Optimizing appends the serialized engine configuration to the document,
/// see [`ScriptedEngine::output`]. Any document containing `fail` is
/// rejected. Clones share their call log.
#[derive(Debug, Clone, Default)]
pub struct ScriptedEngine {
    delay: Option<Duration>,
    optimised: Arc<Mutex<Vec<String>>>,
}

impl ScriptedEngine {
    /// Dimensions reported for every accepted document.
    pub const DIMENSIONS: Dimensions = Dimensions {
        width: 100.0,
        height: 50.0,
    };

    pub fn new() -> Self {
        Self::default()
    }

    /// Blocks for `delay` inside every optimization.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Documents optimized so far, in order.
    pub fn optimised(&self) -> Vec<String> {
        self.optimised
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The text produced for `svg` optimized with `settings`.
    pub fn output(svg: &str, settings: &Settings) -> String {
        let jobs = settings
            .jobs_config()
            .ok()
            .and_then(|jobs| serde_json::to_string(&jobs).ok())
            .unwrap_or_default();
        render(svg, &jobs, settings.pretty)
    }
}

fn render(svg: &str, jobs: &str, pretty: bool) -> String {
    let separator = if pretty { "\n" } else { "" };
    format!("{svg}{separator}<!-- {jobs} -->")
}

impl Engine for ScriptedEngine {
    fn initialize(&self) -> Result<(), String> {
        Ok(())
    }

    fn dimensions(&self, svg: &str) -> Result<Dimensions, String> {
        if svg.contains("fail") {
            return Err(format!("cannot read {svg}"));
        }
        Ok(Self::DIMENSIONS)
    }

    fn optimise(
        &self,
        svg: &str,
        jobs: &JobsConfig,
        pretty: bool,
    ) -> Result<OptimiseResult, String> {
        self.optimised
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(svg.to_owned());

        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }

        if svg.contains("fail") {
            return Err(format!("cannot optimise {svg}"));
        }

        let jobs = serde_json::to_string(jobs).map_err(|e| e.to_string())?;
        Ok(OptimiseResult {
            data: render(svg, &jobs, pretty),
            dimensions: Self::DIMENSIONS,
        })
    }
}
