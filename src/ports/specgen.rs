//! Spec generator port: turns a test intent into a structured test spec.

use std::future::Future;
use std::pin::Pin;

use super::{PortError, Tier};
use crate::model::{SystemModel, TestIntent, TestSpec};

/// Boxed future returned by [`SpecGenerator::generate`].
pub type SpecFuture<'a> = Pin<Box<dyn Future<Output = Result<TestSpec, PortError>> + Send + 'a>>;

/// Produces a [`TestSpec`] for an intent, usually by asking an LLM.
pub trait SpecGenerator: Send + Sync {
    /// Generates a spec for `intent` in the context of `model`, using a model of `tier`.
    ///
    /// # Errors
    ///
    /// Returns an error if the model call fails or its reply is not a valid spec.
    fn generate<'a>(
        &'a self,
        intent: &'a TestIntent,
        model: &'a SystemModel,
        tier: Tier,
    ) -> SpecFuture<'a>;
}
