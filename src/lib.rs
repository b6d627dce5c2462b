//! Enlil - compiles declarative robotic deployments into container artifacts
//!
//! A deployment document declares areas, the robots inside them and the
//! images and packages each robot runs. This library loads the document into
//! validated entities, resolves `{{NAME}}` template variables per area and
//! robot, and renders a compose file plus one build context per package.
//!
//! # Example
//!
//! ```rust
//! use enlil::decode;
//!
//! let decoded = decode(r#"
//! areas:
//!   - id: zone1
//!     robots: [r1]
//! robots:
//!   - id: r1
//!     ros: melodic
//!     packages: [p1]
//! packages:
//!   - id: p1
//!     path: ./packages/
//!     command: roslaunch p1 p1.launch
//!     git: [repo1]
//! "#).unwrap();
//!
//! assert!(decoded.packages.contains("r1-p1"));
//! ```

pub mod decoder;
pub mod document;
pub mod error;
pub mod loader;
pub mod model;
pub mod render;
pub mod settings;

pub use decoder::{DecodedGraph, Decoder};
pub use document::Document;
pub use error::{format_yaml_error, ConfigError, ErrorCategory};
pub use loader::{EntityGraph, EntityPool, Loader};
pub use model::{Area, Entity, EntityKind, Image, Package, Robot};
pub use render::{ArtifactPlan, RenderError};
pub use settings::{Settings, SettingsError};

use thiserror::Error;

/// Errors that can occur anywhere in the compile pipeline
#[derive(Debug, Error)]
pub enum EnlilError {
    /// The document is not valid YAML or not shaped like a deployment
    #[error("invalid configuration document: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// The document violates a configuration rule
    #[error("{0}")]
    Config(#[from] ConfigError),

    /// The settings file could not be loaded
    #[error("settings error: {0}")]
    Settings(#[from] SettingsError),

    /// Artifacts could not be rendered or written
    #[error("render error: {0}")]
    Render(#[from] RenderError),

    /// The configuration file could not be read
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),
}

/// Parse and load a document into the validated, undecoded entity graph
pub fn load(source: &str) -> Result<EntityGraph, EnlilError> {
    let document = Document::from_str(source)?;
    Ok(loader::load(&document)?)
}

/// Parse, load and decode a document
pub fn decode(source: &str) -> Result<DecodedGraph, EnlilError> {
    let graph = load(source)?;
    Ok(decoder::decode(&graph)?)
}

/// Run the whole pipeline up to the in-memory artifacts
///
/// # Example
///
/// ```rust
/// use enlil::{plan, Settings};
///
/// let plan = plan(r#"
/// areas:
///   - id: zone1
///     robots: [r1]
/// robots:
///   - id: r1
///     ros: foxy
///     images: [talker]
/// images:
///   - id: talker
///     image: osrf/ros:foxy-desktop
/// "#, &Settings::default()).unwrap();
///
/// assert!(plan.compose.contains("image: osrf/ros:foxy-desktop"));
/// assert!(plan.packages.is_empty());
/// ```
pub fn plan(source: &str, settings: &Settings) -> Result<ArtifactPlan, EnlilError> {
    let decoded = decode(source)?;
    Ok(ArtifactPlan::build(&decoded, settings)?)
}
