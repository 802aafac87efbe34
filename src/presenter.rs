//! Presenters: reshape persisted models into API-facing JSON.
//!
//! A [`Transformer`] maps one model to its outward representation; the
//! default envelopes wrap items and collections under a `data` key.

use serde_json::{Value, json};

/// Per-model transformation into an API representation.
pub trait Transformer<M>: Send + Sync {
    fn transform(&self, model: &M) -> Value;

    /// Wrap a single transformed model: `{"data": ..}`.
    fn item(&self, model: &M) -> Value {
        json!({ "data": self.transform(model) })
    }

    /// Wrap a transformed collection: `{"data": [..]}`.
    fn collection(&self, models: &[M]) -> Value {
        let data: Vec<Value> = models.iter().map(|m| self.transform(m)).collect();
        json!({ "data": data })
    }
}

/// Transformer built from a closure.
pub struct FnTransformer<F> {
    func: F,
}

impl<F> FnTransformer<F> {
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

impl<M, F> Transformer<M> for FnTransformer<F>
where
    F: Fn(&M) -> Value + Send + Sync,
{
    fn transform(&self, model: &M) -> Value {
        (self.func)(model)
    }
}
