//! In-process provider with scripted outcomes.
//!
//! Each model gets a queue of results consumed one per call. When a default
//! is set with [`ScriptedProvider::otherwise`], it answers once the queue is
//! drained; without one, the last scripted entry repeats. Unscripted models
//! get a 404 "model not found". Every call is logged so callers can assert
//! on exactly which models were tried and how often.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};

use aiscope_core::{GenerationRequest, ModelCatalogEntry};

use super::{GenerativeProvider, ProviderError};

type Scripted = Result<String, ProviderError>;

/// One recorded `generate_content` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptedCall {
    pub model: String,
    pub prompt: String,
    pub history_len: usize,
    pub attachments: Vec<String>,
}

/// Deterministic [`GenerativeProvider`] for tests and offline runs.
pub struct ScriptedProvider {
    scripts: Mutex<HashMap<String, VecDeque<Scripted>>>,
    default: Option<Scripted>,
    catalog: Result<Vec<ModelCatalogEntry>, ProviderError>,
    calls: Mutex<Vec<ScriptedCall>>,
    list_calls: AtomicU32,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self {
            scripts: Mutex::new(HashMap::new()),
            default: None,
            catalog: Ok(Vec::new()),
            calls: Mutex::new(Vec::new()),
            list_calls: AtomicU32::new(0),
        }
    }

    /// Queue results for `model`, consumed in order.
    pub fn script<I>(self, model: &str, results: I) -> Self
    where
        I: IntoIterator<Item = Scripted>,
    {
        self.scripts
            .lock()
            .entry(model.to_string())
            .or_default()
            .extend(results);
        self
    }

    /// Answer every call to `model` successfully with `text`.
    pub fn answer(self, model: &str, text: &str) -> Self {
        self.script(model, [Ok(text.to_string())])
    }

    /// Result returned once a model's queue is empty.
    pub fn otherwise(mut self, result: Scripted) -> Self {
        self.default = Some(result);
        self
    }

    /// Result of `list_models`.
    pub fn with_catalog(mut self, catalog: Result<Vec<ModelCatalogEntry>, ProviderError>) -> Self {
        self.catalog = catalog;
        self
    }

    /// All recorded calls, in order.
    pub fn calls(&self) -> Vec<ScriptedCall> {
        self.calls.lock().clone()
    }

    /// Models called, in order, one entry per call.
    pub fn called_models(&self) -> Vec<String> {
        self.calls.lock().iter().map(|c| c.model.clone()).collect()
    }

    pub fn calls_for(&self, model: &str) -> usize {
        self.calls.lock().iter().filter(|c| c.model == model).count()
    }

    /// Number of catalog queries made.
    pub fn list_calls(&self) -> u32 {
        self.list_calls.load(Ordering::SeqCst)
    }

    fn next_result(&self, model: &str) -> Scripted {
        let mut scripts = self.scripts.lock();
        match scripts.get_mut(model) {
            Some(queue) if queue.len() > 1 || self.default.is_some() => {
                queue.pop_front().unwrap_or_else(|| self.fallback(model))
            }
            // Without a default the last scripted entry sticks.
            Some(queue) => queue.front().cloned().unwrap_or_else(|| self.fallback(model)),
            None => self.fallback(model),
        }
    }

    fn fallback(&self, model: &str) -> Scripted {
        self.default.clone().unwrap_or_else(|| {
            Err(ProviderError::ApiError {
                status: 404,
                message: format!("models/{} is not found for API version v1beta", model),
            })
        })
    }
}

impl Default for ScriptedProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GenerativeProvider for ScriptedProvider {
    async fn generate_content(
        &self,
        model: &str,
        request: &GenerationRequest,
    ) -> Result<String, ProviderError> {
        self.calls.lock().push(ScriptedCall {
            model: model.to_string(),
            prompt: request.prompt.clone(),
            history_len: request.history.len(),
            attachments: request.attachments.iter().map(|f| f.name.clone()).collect(),
        });

        self.next_result(model)
    }

    async fn list_models(&self) -> Result<Vec<ModelCatalogEntry>, ProviderError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.catalog.clone()
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
