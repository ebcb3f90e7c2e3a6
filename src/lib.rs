//! Rule-based procedural placement of meshes inside a [`volume::Volume`].
//!
//! A [`generator::Ruleset`] owns a volume and a tree of [`generator::rules::Rule`]. Each rule computes the
//! placement parameters of its children and recurses, until [`generator::model::MeshRule`] leaves emit
//! [`generator::model::MeshInstance`] into the ruleset output.

pub use glam;

/// Defines the [`generator::Ruleset`], its builder, its observers and the rules it runs
pub mod generator;
/// Defines the [`volume::Volume`] a ruleset generates content within, and the face angles used to walk it
pub mod volume;

/// Errors raised while configuring rules or templates
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum RulesError {
    /// A repeat rule was given a tile size that is not strictly positive and finite
    #[error("Invalid repeat size {0}, expected a finite value > 0")]
    InvalidRepeatSize(f32),
    /// A repeat rule was given a face size that is negative or not finite
    #[error("Invalid face size {0}, expected a finite value >= 0")]
    InvalidFaceSize(f32),
    /// A top/bottom rule was given a cap height that is not strictly positive and finite
    #[error("Invalid cap height {0}, expected a finite value > 0")]
    InvalidCapHeight(f32),
    /// A template was registered with a dimension that is not strictly positive and finite
    #[error("Invalid size {size} for template {id}, every dimension should be finite and > 0")]
    InvalidTemplateSize {
        /// Id of the rejected template
        id: String,
        /// Rejected size
        size: glam::Vec3,
    },
}

/// Errors raised while running a [`generator::Ruleset`]
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    /// `generate` was called on a ruleset without a root rule
    #[error("Failed to generate, no root rule is set on the ruleset")]
    NoRootRule,
    /// A mesh rule without any candidate template was processed
    #[error("Failed to generate, a mesh rule has no template to choose from")]
    NoTemplates,
    /// A mesh rule referenced a template unknown to the template source
    #[error("Failed to generate, unknown template {0}")]
    UnknownTemplate(String),
    /// A template source returned a size with a dimension that is not strictly positive and finite
    #[error("Failed to generate, template {0} has an invalid size")]
    InvalidTemplateSize(String),
    /// A repeat rule would emit more tiles than [`generator::rules::MAX_TILES_COUNT`]
    #[error("Failed to generate, a repeat rule exceeds the maximum of {0} tiles")]
    TooManyTiles(usize),
}
