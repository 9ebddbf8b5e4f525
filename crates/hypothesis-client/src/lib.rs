//! Client for the Hypothesis annotation API.
//!
//! ```text
//! AnnotationClientFactory ──(token, group)──▶ AnnotationClient ──▶ Hypothesis REST API
//! ```
//!
//! The bridge only ever talks to Hypothesis through the [`AnnotationClient`]
//! trait, so tests swap in an in-memory service. [`HypothesisClientFactory`]
//! is the production implementation; its clients share one connection pool.

mod client;
mod error;
mod model;

pub use client::{
    AnnotationClient, AnnotationClientFactory, HypothesisClient, HypothesisClientFactory,
};
pub use error::{AnnotationError, AnnotationResult};
pub use model::{timestamp, Annotation, Permissions, Selectors, Target};
