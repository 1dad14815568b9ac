//! Blueprint Core - Shared library for blueprint scaffolding CLIs
//!
//! This library resolves named blueprints from a versioned registry, locates
//! their template trees, and renders those trees into a target directory.
//!
//! # Architecture
//!
//! - **Version** ([`version`]) - semantic version parsing, ordering and bumping
//! - **Registry** ([`registry`]) - catalog loading from files or HTTP, lookup, persistence
//! - **Source** ([`source`]) - turning a blueprint into a local directory
//! - **Render** ([`render`]) - the template rendering engine and its helper catalog
//!
//! # Example Usage
//!
//! ```ignore
//! use blueprint_core::{registry, render};
//! use serde_json::json;
//!
//! let db = registry::load("registry.json").await?;
//! let blueprint = registry::find(&db, "rust-service")?;
//! let report = render::render_dir("templates/rust-service", "my-service", &json!({
//!     "Name": "my-service",
//! }))
//! .await?;
//! ```

pub mod cancel;
pub mod error;
pub mod fetch;
pub mod product;
pub mod registry;
pub mod render;
pub mod source;
pub mod version;

// Re-export main types for convenience
pub use cancel::CancelToken;
pub use error::{Error, ErrorKind, RenderFailure, Result};
pub use fetch::HttpFetcher;
pub use product::ProductConfig;
pub use registry::{Blueprint, Database};
pub use render::{
    render_dir, ContentPolicy, RenderOptions, RenderReport, RenderWarning, Renderer, TemplateSet,
};
pub use source::{materialize, BlueprintSource};
pub use version::Version;
