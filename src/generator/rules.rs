use glam::{Vec2, Vec3};

#[cfg(feature = "debug-traces")]
use tracing::{debug, trace};

use super::{model::MeshRule, GenerationContext};
use crate::{
    volume::direction::{FaceAngle, ALL_FACE_ANGLES},
    GenerationError, RulesError,
};

/// Width of the vertical strips processed by the edge rule of a [`FaceRule`], straddling each corner of the volume
pub const EDGE_WIDTH: f32 = 0.8;

/// Default height of the caps given to the top and bottom rules of a [`TopBottomRule`]
pub const DEFAULT_CAP_HEIGHT: f32 = 0.2;

/// Maximum number of tiles a single [`RepeatRule`] invocation may emit
pub const MAX_TILES_COUNT: usize = 1 << 20;

/// Parameters given by a parent rule to a child rule for one invocation.
///
/// Rules never store these: each invocation receives its own copy, so a same rule tree can be processed concurrently.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlacementParams {
    /// Face being processed
    pub angle: FaceAngle,
    /// World-space anchor of this invocation
    pub position: Vec3,
    /// Width and height of the 2D region to fill
    pub available_space: Vec2,
    /// Optional target bounding size
    pub fit_size: Option<Vec3>,
}

impl PlacementParams {
    /// Creates parameters without any fit size
    pub fn new(angle: FaceAngle, position: Vec3, available_space: Vec2) -> Self {
        Self {
            angle,
            position,
            available_space,
            fit_size: None,
        }
    }
}

/// A composable generation step.
///
/// Leaf rules emit meshes, composite rules compute new [`PlacementParams`] for their children and recurse.
///
/// ### Example
///
/// Wrap a volume with a 1x1 tiled wall.
/// ```
/// use ghx_proc_rules::generator::{model::MeshRule, rules::{FaceRule, Rule}};
///
/// let wall = Rule::repeat_y(1., Rule::repeat_x(1., MeshRule::new().with_template("wall")).unwrap()).unwrap();
/// let root = Rule::top_bottom(FaceRule::new().with_main(wall));
/// assert_eq!(root.count_nodes(), 5);
/// assert_eq!(root.depth(), 5);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub enum Rule {
    /// See [`MeshRule`]
    Mesh(MeshRule),
    /// Tiles its child horizontally, along the walking direction of the face. See [`RepeatRule`]
    RepeatX(RepeatRule),
    /// Tiles its child vertically, from the bottom of the volume. See [`RepeatRule`]
    RepeatY(RepeatRule),
    /// See [`FaceRule`]
    Face(FaceRule),
    /// See [`TopBottomRule`]
    TopBottom(TopBottomRule),
}

impl Rule {
    /// Creates a [`Rule::Mesh`]
    pub fn mesh(rule: MeshRule) -> Rule {
        Rule::Mesh(rule)
    }

    /// Creates a [`Rule::RepeatX`] tiling `child` every `repeat_size`.
    ///
    /// Returns [`RulesError::InvalidRepeatSize`] if `repeat_size` is not finite and strictly positive.
    pub fn repeat_x<R: Into<Rule>>(repeat_size: f32, child: R) -> Result<Rule, RulesError> {
        Ok(Rule::RepeatX(RepeatRule::new(repeat_size, child)?))
    }

    /// Creates a [`Rule::RepeatY`] tiling `child` every `repeat_size`.
    ///
    /// Returns [`RulesError::InvalidRepeatSize`] if `repeat_size` is not finite and strictly positive.
    pub fn repeat_y<R: Into<Rule>>(repeat_size: f32, child: R) -> Result<Rule, RulesError> {
        Ok(Rule::RepeatY(RepeatRule::new(repeat_size, child)?))
    }

    /// Creates a [`Rule::Face`]
    pub fn face(rule: FaceRule) -> Rule {
        Rule::Face(rule)
    }

    /// Creates a [`Rule::TopBottom`] delegating to `middle`
    pub fn top_bottom<R: Into<Rule>>(middle: R) -> Rule {
        Rule::TopBottom(TopBottomRule::new().with_middle(middle))
    }

    /// Runs this rule with `params`, appending the generated meshes to `ctx`.
    ///
    /// Calling `process` twice with the same parameters emits the same meshes twice.
    pub fn process(
        &self,
        params: &PlacementParams,
        ctx: &mut GenerationContext,
    ) -> Result<(), GenerationError> {
        match self {
            Rule::Mesh(rule) => rule.process(params, ctx),
            Rule::RepeatX(rule) => rule.process_x(params, ctx),
            Rule::RepeatY(rule) => rule.process_y(params, ctx),
            Rule::Face(rule) => rule.process(params, ctx),
            Rule::TopBottom(rule) => rule.process(params, ctx),
        }
    }

    /// Returns the direct children of this rule
    pub fn children(&self) -> Vec<&Rule> {
        match self {
            Rule::Mesh(_) => Vec::new(),
            Rule::RepeatX(rule) | Rule::RepeatY(rule) => vec![rule.repeated()],
            Rule::Face(rule) => rule.main().into_iter().chain(rule.edge()).collect(),
            Rule::TopBottom(rule) => rule
                .middle()
                .into_iter()
                .chain(rule.bottom())
                .chain(rule.top())
                .collect(),
        }
    }

    /// Number of rules in the tree rooted at this rule, this rule included
    pub fn count_nodes(&self) -> usize {
        1 + self
            .children()
            .iter()
            .map(|child| child.count_nodes())
            .sum::<usize>()
    }

    /// Length of the longest path from this rule to a leaf, this rule included
    pub fn depth(&self) -> usize {
        1 + self
            .children()
            .iter()
            .map(|child| child.depth())
            .max()
            .unwrap_or(0)
    }
}

impl From<MeshRule> for Rule {
    fn from(rule: MeshRule) -> Self {
        Rule::Mesh(rule)
    }
}

impl From<FaceRule> for Rule {
    fn from(rule: FaceRule) -> Self {
        Rule::Face(rule)
    }
}

impl From<TopBottomRule> for Rule {
    fn from(rule: TopBottomRule) -> Self {
        Rule::TopBottom(rule)
    }
}

/// Container rule tiling a child rule along one axis of the available space.
///
/// Only whole tiles are generated: the remainder of the span that cannot hold a full tile is left empty.
/// Used by both [`Rule::RepeatX`] and [`Rule::RepeatY`].
#[derive(Clone, Debug, PartialEq)]
pub struct RepeatRule {
    repeated: Box<Rule>,
    repeat_size: f32,
    face_size: Option<f32>,
}

impl RepeatRule {
    /// Creates a [`RepeatRule`] tiling `child` every `repeat_size`.
    ///
    /// Returns [`RulesError::InvalidRepeatSize`] if `repeat_size` is not finite and strictly positive.
    pub fn new<R: Into<Rule>>(repeat_size: f32, child: R) -> Result<RepeatRule, RulesError> {
        if !repeat_size.is_finite() || repeat_size <= 0. {
            return Err(RulesError::InvalidRepeatSize(repeat_size));
        }
        Ok(Self {
            repeated: Box::new(child.into()),
            repeat_size,
            face_size: None,
        })
    }

    /// Limits the span tiled on the repeat axis to `face_size` when it is smaller than the available space.
    pub fn with_face_size(mut self, face_size: f32) -> Result<RepeatRule, RulesError> {
        if !face_size.is_finite() || face_size < 0. {
            return Err(RulesError::InvalidFaceSize(face_size));
        }
        self.face_size = Some(face_size);
        Ok(self)
    }

    pub fn repeat_size(&self) -> f32 {
        self.repeat_size
    }

    pub fn face_size(&self) -> Option<f32> {
        self.face_size
    }

    /// The rule being repeated
    pub fn repeated(&self) -> &Rule {
        &self.repeated
    }

    /// Number of whole tiles that fit in `available` on the repeat axis.
    ///
    /// Only float rounding noise is absorbed (`3 * 0.1` fits in `0.3`), a span short of a whole tile never gets it.
    /// Returns [`GenerationError::TooManyTiles`] above [`MAX_TILES_COUNT`].
    pub fn tiles_count(&self, available: f32) -> Result<usize, GenerationError> {
        let span = match self.face_size {
            Some(face_size) => face_size.min(available),
            None => available,
        };
        if !(span > 0.) {
            return Ok(0);
        }
        let ratio = span / self.repeat_size;
        let nearest = ratio.round();
        let tolerance = 4. * f32::EPSILON * span.max(self.repeat_size);
        let count = if (nearest * self.repeat_size - span).abs() <= tolerance {
            nearest
        } else {
            ratio.floor()
        };
        if !(count <= MAX_TILES_COUNT as f32) {
            return Err(GenerationError::TooManyTiles(MAX_TILES_COUNT));
        }
        Ok(count as usize)
    }

    /// Tiles along the walking direction of `params.angle`, starting at `params.position`.
    ///
    /// Each child is given the center of its tile, an available space of `(repeat_size, available height)`, and the same angle and fit size.
    fn process_x(
        &self,
        params: &PlacementParams,
        ctx: &mut GenerationContext,
    ) -> Result<(), GenerationError> {
        let count = self.tiles_count(params.available_space.x)?;
        let direction = params.angle.walk_direction();

        #[cfg(feature = "debug-traces")]
        debug!(
            "RepeatX: {} tiles of {} along {} from {}",
            count, self.repeat_size, direction, params.position
        );

        for i in 0..count {
            let offset = i as f32 * self.repeat_size + self.repeat_size / 2.;
            let child_params = PlacementParams {
                angle: params.angle,
                position: params.position + direction * offset,
                available_space: Vec2::new(self.repeat_size, params.available_space.y),
                fit_size: params.fit_size,
            };
            self.repeated.process(&child_params, ctx)?;
        }
        Ok(())
    }

    /// Tiles along the Y axis, starting at the bottom of the volume. Only the X and Z components of `params.position` are used.
    ///
    /// Each child is given the center of its tile, an available space of `(available width, repeat_size)`, and the same angle and fit size.
    fn process_y(
        &self,
        params: &PlacementParams,
        ctx: &mut GenerationContext,
    ) -> Result<(), GenerationError> {
        let count = self.tiles_count(params.available_space.y)?;
        let start_y = ctx.volume().bottom() + self.repeat_size / 2.;

        #[cfg(feature = "debug-traces")]
        debug!(
            "RepeatY: {} tiles of {} from y {}",
            count, self.repeat_size, start_y
        );

        for i in 0..count {
            let child_params = PlacementParams {
                angle: params.angle,
                position: Vec3::new(
                    params.position.x,
                    start_y + i as f32 * self.repeat_size,
                    params.position.z,
                ),
                available_space: Vec2::new(params.available_space.x, self.repeat_size),
                fit_size: params.fit_size,
            };
            self.repeated.process(&child_params, ctx)?;
        }
        Ok(())
    }
}

/// Container rule covering the four vertical faces of the volume.
///
/// Faces are wound around the volume, each one starting at the corner where the previous one ends:
///
/// | angle | face       | leading corner   | walk | available space   |
/// |-------|------------|------------------|------|-------------------|
/// | 0     | `x = min`  | `(min.x, min.z)` | +Z   | (depth, height)   |
/// | 90    | `z = max`  | `(min.x, max.z)` | +X   | (width, height)   |
/// | 180   | `x = max`  | `(max.x, max.z)` | -Z   | (depth, height)   |
/// | 270   | `z = min`  | `(max.x, min.z)` | -X   | (width, height)   |
///
/// The main rule is given the leading corner of each face, at the vertical center of the volume. The edge rule is
/// given a strip of [`EDGE_WIDTH`] around each leading corner, offset outward by a quarter of [`EDGE_WIDTH`] on both horizontal axes.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FaceRule {
    main: Option<Box<Rule>>,
    edge: Option<Box<Rule>>,
}

impl FaceRule {
    /// Creates a [`FaceRule`] without children. Processing it does nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the rule covering each face
    pub fn with_main<R: Into<Rule>>(mut self, main: R) -> Self {
        self.main = Some(Box::new(main.into()));
        self
    }

    /// Sets the rule covering each corner strip
    pub fn with_edge<R: Into<Rule>>(mut self, edge: R) -> Self {
        self.edge = Some(Box::new(edge.into()));
        self
    }

    pub fn main(&self) -> Option<&Rule> {
        self.main.as_deref()
    }

    pub fn edge(&self) -> Option<&Rule> {
        self.edge.as_deref()
    }

    /// Processes the main rule on the four faces (0°, 90°, 180°, 270°), then the edge rule on the four corners, in the same order.
    pub fn process(
        &self,
        _params: &PlacementParams,
        ctx: &mut GenerationContext,
    ) -> Result<(), GenerationError> {
        let volume = *ctx.volume();
        let (min, max, center) = (volume.min(), volume.max(), volume.center());

        if let Some(main) = &self.main {
            for &angle in ALL_FACE_ANGLES {
                let corner = leading_corner(angle, min, max);
                let face_width = match angle {
                    FaceAngle::Rot0 | FaceAngle::Rot180 => volume.depth(),
                    FaceAngle::Rot90 | FaceAngle::Rot270 => volume.width(),
                };

                #[cfg(feature = "debug-traces")]
                trace!("Face {}: corner {}, width {}", angle.value(), corner, face_width);

                let face_params = PlacementParams::new(
                    angle,
                    Vec3::new(corner.x, center.y, corner.z),
                    Vec2::new(face_width, volume.height()),
                );
                main.process(&face_params, ctx)?;
            }
        }

        if let Some(edge) = &self.edge {
            let offset = EDGE_WIDTH / 4.;
            for &angle in ALL_FACE_ANGLES {
                let corner = leading_corner(angle, min, max);
                let outward = Vec3::new(
                    (corner.x - center.x).signum(),
                    0.,
                    (corner.z - center.z).signum(),
                );
                let edge_params = PlacementParams::new(
                    angle,
                    Vec3::new(
                        corner.x + outward.x * offset,
                        center.y,
                        corner.z + outward.z * offset,
                    ),
                    Vec2::new(EDGE_WIDTH, volume.height()),
                );
                edge.process(&edge_params, ctx)?;
            }
        }
        Ok(())
    }
}

/// Horizontal corner where the face identified by `angle` starts
fn leading_corner(angle: FaceAngle, min: Vec3, max: Vec3) -> Vec3 {
    match angle {
        FaceAngle::Rot0 => Vec3::new(min.x, 0., min.z),
        FaceAngle::Rot90 => Vec3::new(min.x, 0., max.z),
        FaceAngle::Rot180 => Vec3::new(max.x, 0., max.z),
        FaceAngle::Rot270 => Vec3::new(max.x, 0., min.z),
    }
}

/// Root rule: processes the middle band of the volume, then its optional bottom and top caps.
///
/// The caps are given the center of the bottom/top face, an available space of `(width, depth)`, the angle `0°`
/// and a fit size of `(width, cap_height, depth)`.
#[derive(Clone, Debug, PartialEq)]
pub struct TopBottomRule {
    middle: Option<Box<Rule>>,
    bottom: Option<Box<Rule>>,
    top: Option<Box<Rule>>,
    cap_height: f32,
}

impl Default for TopBottomRule {
    fn default() -> Self {
        Self {
            middle: None,
            bottom: None,
            top: None,
            cap_height: DEFAULT_CAP_HEIGHT,
        }
    }
}

impl TopBottomRule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the rule processed for the vertical faces, usually a [`FaceRule`]
    pub fn with_middle<R: Into<Rule>>(mut self, middle: R) -> Self {
        self.middle = Some(Box::new(middle.into()));
        self
    }

    pub fn with_bottom<R: Into<Rule>>(mut self, bottom: R) -> Self {
        self.bottom = Some(Box::new(bottom.into()));
        self
    }

    pub fn with_top<R: Into<Rule>>(mut self, top: R) -> Self {
        self.top = Some(Box::new(top.into()));
        self
    }

    /// Sets the height of the caps. Defaults to [`DEFAULT_CAP_HEIGHT`].
    pub fn with_cap_height(mut self, cap_height: f32) -> Result<Self, RulesError> {
        if !cap_height.is_finite() || cap_height <= 0. {
            return Err(RulesError::InvalidCapHeight(cap_height));
        }
        self.cap_height = cap_height;
        Ok(self)
    }

    pub fn middle(&self) -> Option<&Rule> {
        self.middle.as_deref()
    }

    pub fn bottom(&self) -> Option<&Rule> {
        self.bottom.as_deref()
    }

    pub fn top(&self) -> Option<&Rule> {
        self.top.as_deref()
    }

    pub fn cap_height(&self) -> f32 {
        self.cap_height
    }

    pub fn process(
        &self,
        params: &PlacementParams,
        ctx: &mut GenerationContext,
    ) -> Result<(), GenerationError> {
        if let Some(middle) = &self.middle {
            middle.process(params, ctx)?;
        }

        let volume = *ctx.volume();
        let center = volume.center();
        let caps = [
            (self.bottom.as_deref(), volume.bottom()),
            (self.top.as_deref(), volume.top()),
        ];
        for (cap, y) in caps {
            if let Some(cap) = cap {
                let cap_params = PlacementParams {
                    angle: FaceAngle::Rot0,
                    position: Vec3::new(center.x, y, center.z),
                    available_space: Vec2::new(volume.width(), volume.depth()),
                    fit_size: Some(Vec3::new(volume.width(), self.cap_height, volume.depth())),
                };
                cap.process(&cap_params, ctx)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use glam::{Vec2, Vec3};

    use super::{
        FaceRule, PlacementParams, RepeatRule, Rule, TopBottomRule, EDGE_WIDTH, MAX_TILES_COUNT,
    };
    use crate::{
        generator::{
            model::{MeshInstance, MeshRule},
            template::TemplateLibrary,
            GenerationContext,
        },
        volume::{direction::FaceAngle, Volume},
        GenerationError, RulesError,
    };

    fn templates() -> TemplateLibrary {
        TemplateLibrary::new()
            .with("tile", Vec3::ONE)
            .and_then(|t| t.with("cap", Vec3::new(2., 1., 2.)))
            .unwrap()
    }

    fn run(rule: &Rule, volume: &Volume, params: &PlacementParams) -> Vec<MeshInstance> {
        let templates = templates();
        let mut output = Vec::new();
        let mut ctx = GenerationContext::new(volume, &templates, &mut output);
        rule.process(params, &mut ctx).unwrap();
        output
    }

    fn tile() -> MeshRule {
        MeshRule::new().with_template("tile")
    }

    fn assert_vec3_eq(a: Vec3, b: Vec3) {
        assert!(a.abs_diff_eq(b, 1e-5), "{} != {}", a, b);
    }

    #[test]
    fn rejects_non_positive_repeat_sizes() {
        assert_eq!(
            RepeatRule::new(0., tile()),
            Err(RulesError::InvalidRepeatSize(0.))
        );
        assert!(Rule::repeat_x(-1., tile()).is_err());
        assert!(Rule::repeat_y(f32::NAN, tile()).is_err());
        assert!(RepeatRule::new(1., tile())
            .unwrap()
            .with_face_size(-2.)
            .is_err());
    }

    #[test]
    fn repeat_x_emits_whole_tiles_only() {
        let volume = Volume::from_size(Vec3::splat(10.));
        let rule = Rule::repeat_x(2., tile()).unwrap();
        let start = Vec3::new(1., 3., -2.);
        let params = PlacementParams::new(FaceAngle::Rot90, start, Vec2::new(7.5, 4.));

        let output = run(&rule, &volume, &params);
        assert_eq!(output.len(), 3);
        // First tile starts at the given position, children are placed at the center of their tile
        assert_vec3_eq(output[0].transform.position, start + Vec3::X);
        assert_vec3_eq(output[1].transform.position, start + Vec3::X * 3.);
        assert_vec3_eq(output[2].transform.position, start + Vec3::X * 5.);
        for instance in &output {
            assert_eq!(instance.transform.scale, Vec3::new(2., 4., 1.));
        }
    }

    #[test]
    fn repeat_x_follows_the_face_angle() {
        let volume = Volume::from_size(Vec3::splat(10.));
        let rule = Rule::repeat_x(1., tile()).unwrap();
        for (angle, direction) in [
            (FaceAngle::Rot0, Vec3::Z),
            (FaceAngle::Rot90, Vec3::X),
            (FaceAngle::Rot180, Vec3::NEG_Z),
            (FaceAngle::Rot270, Vec3::NEG_X),
        ] {
            let params = PlacementParams::new(angle, Vec3::ZERO, Vec2::new(2., 1.));
            let output = run(&rule, &volume, &params);
            assert_eq!(output.len(), 2);
            assert_vec3_eq(output[1].transform.position, direction * 1.5);
        }
    }

    #[test]
    fn repeat_counts_match_floor_of_span() {
        let rule = RepeatRule::new(0.1, tile()).unwrap();
        assert_eq!(rule.tiles_count(0.3), Ok(3));
        assert_eq!(rule.tiles_count(0.29), Ok(2));
        assert_eq!(rule.tiles_count(0.), Ok(0));
        assert_eq!(rule.tiles_count(-4.), Ok(0));

        let rule = RepeatRule::new(3., tile()).unwrap();
        assert_eq!(rule.tiles_count(2.9), Ok(0));
        assert_eq!(rule.tiles_count(9.), Ok(3));
        assert_eq!(rule.tiles_count(11.9), Ok(3));

        let capped = rule.clone().with_face_size(6.5).unwrap();
        assert_eq!(capped.tiles_count(11.9), Ok(2));
        assert_eq!(capped.tiles_count(3.), Ok(1));
    }

    #[test]
    fn span_just_short_of_a_tile_gets_no_extra_tile() {
        let rule = RepeatRule::new(1., tile()).unwrap();
        assert_eq!(rule.tiles_count(0.99995), Ok(0));
        assert_eq!(rule.tiles_count(4.9999), Ok(4));
        assert_eq!(rule.tiles_count(5.), Ok(5));

        let volume = Volume::from_size(Vec3::splat(10.));
        let params = PlacementParams::new(FaceAngle::Rot0, Vec3::ZERO, Vec2::new(2.9999, 1.));
        let rule = Rule::repeat_x(1., tile()).unwrap();
        assert_eq!(run(&rule, &volume, &params).len(), 2);
    }

    #[test]
    fn tiny_repeat_size_is_bounded() {
        let rule = RepeatRule::new(1e-30, tile()).unwrap();
        assert_eq!(
            rule.tiles_count(10.),
            Err(GenerationError::TooManyTiles(MAX_TILES_COUNT))
        );

        let volume = Volume::from_size(Vec3::splat(10.));
        let templates = templates();
        let mut output = Vec::new();
        let mut ctx = GenerationContext::new(&volume, &templates, &mut output);
        let params = PlacementParams::new(FaceAngle::Rot0, Vec3::ZERO, Vec2::new(10., 1.));
        assert_eq!(
            Rule::RepeatX(rule).process(&params, &mut ctx),
            Err(GenerationError::TooManyTiles(MAX_TILES_COUNT))
        );
        assert!(output.is_empty());
    }

    #[test]
    fn repeat_too_large_emits_nothing() {
        let volume = Volume::from_size(Vec3::splat(10.));
        let params = PlacementParams::new(FaceAngle::Rot0, Vec3::ZERO, Vec2::new(1., 1.));
        let rule = Rule::repeat_x(1.5, tile()).unwrap();
        assert!(run(&rule, &volume, &params).is_empty());
        let rule = Rule::repeat_y(1.5, tile()).unwrap();
        assert!(run(&rule, &volume, &params).is_empty());
    }

    #[test]
    fn repeat_y_is_anchored_to_the_volume_bottom() {
        let volume = Volume::new(Vec3::new(0., 4., 0.), Vec3::new(2., 6., 2.));
        let rule = Rule::repeat_y(2., tile()).unwrap();
        // The Y component of the position is ignored
        let params = PlacementParams::new(FaceAngle::Rot0, Vec3::new(1., 100., -1.), Vec2::new(3., 5.));

        let output = run(&rule, &volume, &params);
        assert_eq!(output.len(), 2);
        assert_vec3_eq(output[0].transform.position, Vec3::new(1., 2., -1.));
        assert_vec3_eq(output[1].transform.position, Vec3::new(1., 4., -1.));
        assert_eq!(output[0].transform.scale, Vec3::new(3., 2., 1.));
    }

    #[test]
    fn repeat_y_matches_centered_volume_anchor() {
        let volume = Volume::new(Vec3::ZERO, Vec3::new(1., 10., 1.));
        let rule = Rule::repeat_y(1., tile()).unwrap();
        let params = PlacementParams::new(FaceAngle::Rot0, Vec3::ZERO, Vec2::new(1., 10.));
        let output = run(&rule, &volume, &params);
        assert_eq!(output.len(), 10);
        // -height / 2 + repeat_size / 2
        assert_eq!(output[0].transform.position.y, -4.5);
    }

    #[test]
    fn face_rule_covers_each_face_once() {
        let volume = Volume::from_size(Vec3::new(4., 3., 2.));
        let rule = Rule::face(FaceRule::new().with_main(tile()).with_edge(tile()));
        let params = PlacementParams::new(FaceAngle::Rot0, volume.position(), Vec2::ZERO);

        let output = run(&rule, &volume, &params);
        assert_eq!(output.len(), 8);

        let angles: Vec<f32> = output.iter().map(|i| i.transform.rotation_y).collect();
        let expected: Vec<f32> = [0, 1, 2, 3, 0, 1, 2, 3]
            .iter()
            .map(|i| *i as f32 * std::f32::consts::FRAC_PI_2)
            .collect();
        assert_eq!(angles, expected);

        // Main: (depth, height) for 0/180 and (width, height) for 90/270, with a 1x1x1 template
        let main_scales: Vec<Vec3> = output[..4].iter().map(|i| i.transform.scale).collect();
        assert_eq!(
            main_scales,
            vec![
                Vec3::new(2., 3., 1.),
                Vec3::new(4., 3., 1.),
                Vec3::new(2., 3., 1.),
                Vec3::new(4., 3., 1.),
            ]
        );
        assert_vec3_eq(output[0].transform.position, Vec3::new(-2., 1.5, -1.));
        assert_vec3_eq(output[1].transform.position, Vec3::new(-2., 1.5, 1.));
        assert_vec3_eq(output[2].transform.position, Vec3::new(2., 1.5, 1.));
        assert_vec3_eq(output[3].transform.position, Vec3::new(2., 1.5, -1.));

        // Edges: fixed width strips, offset outward from the corners
        let offset = EDGE_WIDTH / 4.;
        for instance in &output[4..] {
            assert_eq!(instance.transform.scale, Vec3::new(EDGE_WIDTH, 3., 1.));
        }
        assert_vec3_eq(
            output[4].transform.position,
            Vec3::new(-2. - offset, 1.5, -1. - offset),
        );
        assert_vec3_eq(
            output[6].transform.position,
            Vec3::new(2. + offset, 1.5, 1. + offset),
        );
    }

    #[test]
    fn face_rule_skips_missing_children() {
        let volume = Volume::from_size(Vec3::splat(2.));
        let params = PlacementParams::new(FaceAngle::Rot0, volume.position(), Vec2::ZERO);

        assert!(run(&Rule::face(FaceRule::new()), &volume, &params).is_empty());
        assert_eq!(
            run(&Rule::face(FaceRule::new().with_edge(tile())), &volume, &params).len(),
            4
        );
    }

    #[test]
    fn top_bottom_forwards_to_middle_then_caps() {
        let volume = Volume::from_size(Vec3::new(4., 3., 2.));
        let params = PlacementParams::new(
            FaceAngle::Rot0,
            volume.position(),
            Vec2::new(volume.width(), volume.height()),
        );

        let forward_only = Rule::top_bottom(tile());
        let output = run(&forward_only, &volume, &params);
        assert_eq!(output.len(), 1);
        assert_eq!(output[0].transform.position, volume.position());

        let capped = Rule::from(
            TopBottomRule::new()
                .with_middle(FaceRule::new().with_main(tile()))
                .with_bottom(MeshRule::new().with_template("cap"))
                .with_top(MeshRule::new().with_template("cap"))
                .with_cap_height(0.5)
                .unwrap(),
        );
        let output = run(&capped, &volume, &params);
        assert_eq!(output.len(), 6);
        let bottom = &output[4];
        let top = &output[5];
        assert_eq!(bottom.template_id, "cap");
        assert_vec3_eq(bottom.transform.position, Vec3::new(0., 0., 0.));
        assert_vec3_eq(top.transform.position, Vec3::new(0., 3., 0.));
        assert_eq!(top.transform.scale, Vec3::new(2., 0.5, 1.));

        assert!(Rule::from(TopBottomRule::new()).children().is_empty());
        assert!(TopBottomRule::new().with_cap_height(0.).is_err());
    }
}
