use std::collections::HashMap;

use glam::Vec3;

use crate::RulesError;

/// Source of the intrinsic sizes of the mesh templates instanced by a [`super::model::MeshRule`].
///
/// This is the only thing the generator needs to know about the meshes: their local bounding size.
/// Lookups are expected to be synchronous and already warmed up by the asset layer.
pub trait TemplateSource {
    /// Returns the local `(width, height, depth)` of the template `id`, or `None` if it is unknown.
    ///
    /// Every dimension should be finite and strictly positive: a [`super::model::MeshRule`] fails with
    /// [`crate::GenerationError::InvalidTemplateSize`] on any other size.
    fn template_size(&self, id: &str) -> Option<Vec3>;
}

impl<S: TemplateSource + ?Sized> TemplateSource for &S {
    fn template_size(&self, id: &str) -> Option<Vec3> {
        (**self).template_size(id)
    }
}

impl<S: TemplateSource + ?Sized> TemplateSource for std::sync::Arc<S> {
    fn template_size(&self, id: &str) -> Option<Vec3> {
        (**self).template_size(id)
    }
}

/// A named mesh asset and its local bounding size
#[derive(Clone, Debug, PartialEq)]
pub struct MeshTemplate {
    id: String,
    size: Vec3,
}

impl MeshTemplate {
    /// Creates a [`MeshTemplate`]. Every dimension of `size` should be finite and strictly positive.
    pub fn new<I: Into<String>>(id: I, size: Vec3) -> Result<MeshTemplate, RulesError> {
        let id = id.into();
        if !size.is_finite() || size.cmple(Vec3::ZERO).any() {
            return Err(RulesError::InvalidTemplateSize { id, size });
        }
        Ok(Self { id, size })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn size(&self) -> Vec3 {
        self.size
    }
}

/// In-memory [`TemplateSource`]
#[derive(Clone, Debug, Default)]
pub struct TemplateLibrary {
    templates: HashMap<String, MeshTemplate>,
}

impl TemplateLibrary {
    /// Creates an empty library
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) the template `id` with the given `size`
    ///
    /// ### Example
    /// ```
    /// use ghx_proc_rules::{glam::Vec3, generator::template::{TemplateLibrary, TemplateSource}};
    ///
    /// let mut templates = TemplateLibrary::new();
    /// templates.insert("wall", Vec3::new(2., 2., 0.2)).unwrap();
    /// assert_eq!(templates.template_size("wall"), Some(Vec3::new(2., 2., 0.2)));
    /// assert!(templates.insert("broken", Vec3::new(1., 0., 1.)).is_err());
    /// ```
    pub fn insert<I: Into<String>>(&mut self, id: I, size: Vec3) -> Result<(), RulesError> {
        let template = MeshTemplate::new(id, size)?;
        self.templates.insert(template.id.clone(), template);
        Ok(())
    }

    /// Same as `insert` but returns the library to chain registrations
    pub fn with<I: Into<String>>(mut self, id: I, size: Vec3) -> Result<Self, RulesError> {
        self.insert(id, size)?;
        Ok(self)
    }

    pub fn get(&self, id: &str) -> Option<&MeshTemplate> {
        self.templates.get(id)
    }

    /// Number of registered templates
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

impl TemplateSource for TemplateLibrary {
    fn template_size(&self, id: &str) -> Option<Vec3> {
        self.templates.get(id).map(|template| template.size)
    }
}

impl TemplateSource for HashMap<String, Vec3> {
    fn template_size(&self, id: &str) -> Option<Vec3> {
        self.get(id).copied()
    }
}
