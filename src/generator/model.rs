use glam::{Mat4, Quat, Vec3};
use rand::{
    distributions::{Distribution, WeightedIndex},
    rngs::StdRng,
    SeedableRng,
};

#[cfg(feature = "debug-traces")]
use tracing::{trace, warn};

use super::{rules::PlacementParams, GenerationContext};
use crate::GenerationError;

/// Placement of an emitted mesh
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MeshTransform {
    /// World position of the mesh pivot
    pub position: Vec3,
    /// Rotation around the Y axis, in radians
    pub rotation_y: f32,
    /// Scale applied to the template local size
    pub scale: Vec3,
}

impl MeshTransform {
    /// Returns the scale, rotation, translation matrix of this transform
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(
            self.scale,
            Quat::from_rotation_y(self.rotation_y),
            self.position,
        )
    }
}

/// A placed reference to a mesh template, as produced by a [`MeshRule`].
///
/// Instances are never modified once emitted.
#[derive(Clone, Debug, PartialEq)]
pub struct MeshInstance {
    /// Id of the template, resolvable by the renderer
    pub template_id: String,
    pub transform: MeshTransform,
}

/// How a [`MeshRule`] chooses among its candidate templates.
///
/// Both heuristics are deterministic: identical placement parameters always yield the same template.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TemplateSelection {
    /// Always use the first candidate.
    #[default]
    First,
    /// Weighted random pick, from a random source seeded with this seed mixed with the placement position and angle.
    Seeded(u64),
}

#[derive(Clone, Debug, PartialEq)]
struct TemplateCandidate {
    id: String,
    weight: f32,
}

/// Leaf rule: instances one template, scaled to fill the space assigned by its parent.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshRule {
    candidates: Vec<TemplateCandidate>,
    selection: TemplateSelection,
}

impl MeshRule {
    /// Creates a [`MeshRule`] without any template. At least one should be added before processing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a candidate template with a weight of 1.0
    pub fn with_template<I: Into<String>>(mut self, id: I) -> Self {
        self.add_template(id);
        self
    }

    /// Adds a candidate template with the given weight. The `weight` value should be strictly superior to `0`. If it is not the case, the value will be overriden by `f32::MIN_POSITIVE`.
    ///
    /// Only used with [`TemplateSelection::Seeded`].
    pub fn with_weighted_template<I: Into<String>>(mut self, id: I, weight: f32) -> Self {
        let id = id.into();
        let mut checked_weight = weight;
        if !(checked_weight > 0.) || !checked_weight.is_finite() {
            #[cfg(feature = "debug-traces")]
            warn!(
                "Template {} had an invalid weight {}, weight overriden to f32::MIN_POSITIVE: {}",
                id,
                checked_weight,
                f32::MIN_POSITIVE
            );
            checked_weight = f32::MIN_POSITIVE;
        }
        self.candidates.push(TemplateCandidate {
            id,
            weight: checked_weight,
        });
        self
    }

    /// Adds a candidate template with a weight of 1.0
    pub fn add_template<I: Into<String>>(&mut self, id: I) {
        self.candidates.push(TemplateCandidate {
            id: id.into(),
            weight: 1.0,
        });
    }

    /// Specifies the [`TemplateSelection`] to use. Defaults to [`TemplateSelection::First`].
    pub fn with_selection(mut self, selection: TemplateSelection) -> Self {
        self.selection = selection;
        self
    }

    /// Ids of the candidate templates, in insertion order
    pub fn template_ids(&self) -> impl Iterator<Item = &str> {
        self.candidates.iter().map(|c| c.id.as_str())
    }

    pub fn templates_count(&self) -> usize {
        self.candidates.len()
    }

    /// Emits one [`MeshInstance`] at `params.position`, rotated by `params.angle` and scaled to fit.
    ///
    /// With a `fit_size`, the template is scaled to it on every axis. Without one, the template width is fitted to
    /// the available width and its height to the available height, while its depth is kept.
    pub fn process(
        &self,
        params: &PlacementParams,
        ctx: &mut GenerationContext,
    ) -> Result<(), GenerationError> {
        let template_id = self.select_template(params)?;
        let template_size = ctx
            .templates()
            .template_size(template_id)
            .ok_or_else(|| GenerationError::UnknownTemplate(template_id.to_string()))?;
        if !template_size.is_finite() || template_size.cmple(Vec3::ZERO).any() {
            return Err(GenerationError::InvalidTemplateSize(template_id.to_string()));
        }

        let scale = match params.fit_size {
            Some(fit_size) => fit_size / template_size,
            None => Vec3::new(
                params.available_space.x / template_size.x,
                params.available_space.y / template_size.y,
                1.,
            ),
        };

        #[cfg(feature = "debug-traces")]
        trace!(
            "Emit {} at {} with angle {} and scale {}",
            template_id,
            params.position,
            params.angle.value(),
            scale
        );

        ctx.add_mesh(MeshInstance {
            template_id: template_id.to_string(),
            transform: MeshTransform {
                position: params.position,
                rotation_y: params.angle.radians(),
                scale,
            },
        });
        Ok(())
    }

    fn select_template(&self, params: &PlacementParams) -> Result<&str, GenerationError> {
        let first = self.candidates.first().ok_or(GenerationError::NoTemplates)?;
        match self.selection {
            TemplateSelection::First => Ok(&first.id),
            TemplateSelection::Seeded(_) if self.candidates.len() == 1 => Ok(&first.id),
            TemplateSelection::Seeded(seed) => {
                let mut rng = StdRng::from_seed(placement_seed(seed, params));
                // Weights are sanitized on insertion, the distribution can only be built from positive weights.
                match WeightedIndex::new(self.candidates.iter().map(|c| c.weight)) {
                    Ok(distribution) => Ok(&self.candidates[distribution.sample(&mut rng)].id),
                    Err(_) => Ok(&first.id),
                }
            }
        }
    }
}

/// Seed of the random source of one placement: `seed`, then the position bits and the angle index
fn placement_seed(seed: u64, params: &PlacementParams) -> [u8; 32] {
    let mut bytes = [0; 32];
    bytes[..8].copy_from_slice(&seed.to_le_bytes());
    for (i, coord) in params.position.to_array().iter().enumerate() {
        bytes[8 + 4 * i..12 + 4 * i].copy_from_slice(&coord.to_bits().to_le_bytes());
    }
    bytes[20] = params.angle.index() as u8;
    bytes
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use glam::{Vec2, Vec3};

    use super::{MeshRule, TemplateSelection};
    use crate::{
        generator::{rules::PlacementParams, template::TemplateLibrary, GenerationContext},
        volume::{direction::FaceAngle, Volume},
        GenerationError,
    };

    fn templates() -> TemplateLibrary {
        TemplateLibrary::new()
            .with("wall", Vec3::new(2., 4., 0.5))
            .and_then(|t| t.with("window", Vec3::new(1., 1., 1.)))
            .and_then(|t| t.with("door", Vec3::new(1., 2., 1.)))
            .unwrap()
    }

    fn params(angle: FaceAngle, position: Vec3, available: Vec2) -> PlacementParams {
        PlacementParams {
            angle,
            position,
            available_space: available,
            fit_size: None,
        }
    }

    #[test]
    fn scales_template_to_available_space() {
        let volume = Volume::from_size(Vec3::splat(10.));
        let templates = templates();
        let mut output = Vec::new();
        let mut ctx = GenerationContext::new(&volume, &templates, &mut output);

        let rule = MeshRule::new().with_template("wall");
        let position = Vec3::new(1., 2., 3.);
        rule.process(
            &params(FaceAngle::Rot90, position, Vec2::new(3., 6.)),
            &mut ctx,
        )
        .unwrap();

        assert_eq!(output.len(), 1);
        let instance = &output[0];
        assert_eq!(instance.template_id, "wall");
        assert_eq!(instance.transform.position, position);
        assert_eq!(instance.transform.scale, Vec3::new(1.5, 1.5, 1.));
        assert_eq!(instance.transform.rotation_y, FaceAngle::Rot90.radians());
    }

    #[test]
    fn fit_size_overrides_available_space() {
        let volume = Volume::from_size(Vec3::splat(10.));
        let templates = templates();
        let mut output = Vec::new();
        let mut ctx = GenerationContext::new(&volume, &templates, &mut output);

        let mut fitted = params(FaceAngle::Rot0, Vec3::ZERO, Vec2::new(3., 6.));
        fitted.fit_size = Some(Vec3::new(4., 2., 1.));
        MeshRule::new()
            .with_template("wall")
            .process(&fitted, &mut ctx)
            .unwrap();

        assert_eq!(output[0].transform.scale, Vec3::new(2., 0.5, 2.));
    }

    #[test]
    fn first_selection_ignores_weights() {
        let volume = Volume::from_size(Vec3::splat(10.));
        let templates = templates();
        let mut output = Vec::new();
        let mut ctx = GenerationContext::new(&volume, &templates, &mut output);

        let rule = MeshRule::new()
            .with_weighted_template("window", 0.01)
            .with_weighted_template("door", 100.);
        for i in 0..5 {
            rule.process(
                &params(FaceAngle::Rot0, Vec3::X * i as f32, Vec2::ONE),
                &mut ctx,
            )
            .unwrap();
        }
        assert!(output.iter().all(|i| i.template_id == "window"));
    }

    #[test]
    fn seeded_selection_is_deterministic() {
        let volume = Volume::from_size(Vec3::splat(10.));
        let templates = templates();
        let rule = MeshRule::new()
            .with_template("window")
            .with_template("door")
            .with_selection(TemplateSelection::Seeded(42));

        let run = || {
            let mut output = Vec::new();
            let mut ctx = GenerationContext::new(&volume, &templates, &mut output);
            for i in 0..32 {
                rule.process(
                    &params(FaceAngle::Rot0, Vec3::X * i as f32, Vec2::ONE),
                    &mut ctx,
                )
                .unwrap();
            }
            output
        };
        let first_run = run();
        assert_eq!(first_run, run());
        assert!(first_run.iter().any(|i| i.template_id == "window"));
        assert!(first_run.iter().any(|i| i.template_id == "door"));
    }

    #[test]
    fn fails_without_templates() {
        let volume = Volume::from_size(Vec3::splat(10.));
        let templates = templates();
        let mut output = Vec::new();
        let mut ctx = GenerationContext::new(&volume, &templates, &mut output);

        let res = MeshRule::new().process(
            &params(FaceAngle::Rot0, Vec3::ZERO, Vec2::ONE),
            &mut ctx,
        );
        assert_eq!(res, Err(GenerationError::NoTemplates));

        let res = MeshRule::new().with_template("roof").process(
            &params(FaceAngle::Rot0, Vec3::ZERO, Vec2::ONE),
            &mut ctx,
        );
        assert_eq!(
            res,
            Err(GenerationError::UnknownTemplate("roof".to_string()))
        );
        assert!(output.is_empty());
    }

    #[test]
    fn rejects_degenerate_template_sizes() {
        let volume = Volume::from_size(Vec3::splat(10.));
        let templates = HashMap::from([
            ("flat".to_string(), Vec3::new(1., 1., 0.)),
            ("wall".to_string(), Vec3::ONE),
        ]);
        let mut output = Vec::new();
        let mut ctx = GenerationContext::new(&volume, &templates, &mut output);

        let mut fitted = params(FaceAngle::Rot0, Vec3::ZERO, Vec2::ONE);
        fitted.fit_size = Some(Vec3::ONE);
        assert_eq!(
            MeshRule::new().with_template("flat").process(&fitted, &mut ctx),
            Err(GenerationError::InvalidTemplateSize("flat".to_string()))
        );
        MeshRule::new()
            .with_template("wall")
            .process(&fitted, &mut ctx)
            .unwrap();
        assert_eq!(output.len(), 1);
        assert!(output[0].transform.scale.is_finite());
    }
}
