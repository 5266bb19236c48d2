//! Content-model abstraction.
//!
//! A [`ContentModel`] turns a prompt into a block of monologue text. The
//! generation loop treats an error or an empty response the same way: no
//! content yet, retry.

use async_trait::async_trait;

pub mod ollama;

pub use ollama::OllamaModel;

/// The content-generation backend trait.
#[async_trait]
pub trait ContentModel: Send + Sync {
    /// Backend identifier (e.g., "ollama").
    fn id(&self) -> &str;

    /// Run one completion. May fail or return an empty string; callers
    /// treat both as transient.
    async fn complete(&self, prompt: &str) -> anyhow::Result<String>;

    /// Verify the backend is usable before any worker starts. A probe
    /// failure is fatal to session startup.
    async fn probe(&self) -> anyhow::Result<()>;
}
