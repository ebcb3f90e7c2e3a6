use std::fmt;

use glam::Vec3;

#[cfg(feature = "debug-traces")]
use tracing::warn;

/// Defines [`direction::FaceAngle`] and the walking directions of the volume faces
pub mod direction;

/// Axis-aligned box a [`crate::generator::Ruleset`] generates content within.
///
/// `position` anchors the box on its minimum horizontal corner and its vertical center:
/// the box spans `[x, x + width]`, `[y - height / 2, y + height / 2]` and `[z, z + depth]`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Volume {
    position: Vec3,
    width: f32,
    height: f32,
    depth: f32,
}

impl fmt::Display for Volume {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "( position: {} {} {}, size: {} {} {} )",
            self.position.x,
            self.position.y,
            self.position.z,
            self.width,
            self.height,
            self.depth
        )
    }
}

impl Default for Volume {
    fn default() -> Self {
        Self::new(Vec3::ZERO, Vec3::ZERO)
    }
}

impl Volume {
    /// Creates a new [`Volume`] anchored at `position` with the given `size` (width, height, depth).
    ///
    /// Negative or non-finite dimensions are clamped to `0.`
    pub fn new(position: Vec3, size: Vec3) -> Volume {
        let size = checked_size(size);
        Self {
            position,
            width: size.x,
            height: size.y,
            depth: size.z,
        }
    }

    /// Creates a new [`Volume`] of the given `size`, centered like after a call to [`Volume::resize`].
    ///
    /// ### Example
    /// ```
    /// use ghx_proc_rules::{glam::Vec3, volume::Volume};
    ///
    /// let volume = Volume::from_size(Vec3::new(4., 10., 2.));
    /// assert_eq!(volume.position(), Vec3::new(-2., 5., -1.));
    /// assert_eq!(volume.bottom(), 0.);
    /// assert_eq!(volume.top(), 10.);
    /// ```
    pub fn from_size(size: Vec3) -> Volume {
        let mut volume = Volume::default();
        volume.resize(size);
        volume
    }

    /// Replaces the box by a box of size `new_size`, horizontally centered on the origin and resting on `y = 0`.
    ///
    /// The new position is `(-width / 2, height / 2, -depth / 2)`.
    pub fn resize(&mut self, new_size: Vec3) {
        let size = checked_size(new_size);
        self.width = size.x;
        self.height = size.y;
        self.depth = size.z;
        self.position = Vec3::new(-size.x / 2., size.y / 2., -size.z / 2.);
    }

    /// Returns the anchor position of the volume
    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Size of the volume on the X axis
    pub fn width(&self) -> f32 {
        self.width
    }

    /// Size of the volume on the Y axis
    pub fn height(&self) -> f32 {
        self.height
    }

    /// Size of the volume on the Z axis
    pub fn depth(&self) -> f32 {
        self.depth
    }

    /// Returns `(width, height, depth)`
    pub fn size(&self) -> Vec3 {
        Vec3::new(self.width, self.height, self.depth)
    }

    /// Minimum corner of the box
    pub fn min(&self) -> Vec3 {
        Vec3::new(self.position.x, self.bottom(), self.position.z)
    }

    /// Maximum corner of the box
    pub fn max(&self) -> Vec3 {
        Vec3::new(
            self.position.x + self.width,
            self.top(),
            self.position.z + self.depth,
        )
    }

    /// Center of the box
    pub fn center(&self) -> Vec3 {
        Vec3::new(
            self.position.x + self.width / 2.,
            self.position.y,
            self.position.z + self.depth / 2.,
        )
    }

    /// Y coordinate of the bottom face
    pub fn bottom(&self) -> f32 {
        self.position.y - self.height / 2.
    }

    /// Y coordinate of the top face
    pub fn top(&self) -> f32 {
        self.position.y + self.height / 2.
    }

    /// Returns `true` if the volume encloses no space
    pub fn is_empty(&self) -> bool {
        self.width == 0. || self.height == 0. || self.depth == 0.
    }
}

fn checked_size(size: Vec3) -> Vec3 {
    let clamp = |v: f32| if v.is_finite() && v > 0. { v } else { 0. };
    let checked = Vec3::new(clamp(size.x), clamp(size.y), clamp(size.z));
    #[cfg(feature = "debug-traces")]
    if checked != size {
        warn!("Invalid volume size {}, clamped to {}", size, checked);
    }
    checked
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::Volume;

    #[test]
    fn resize_recenters_the_volume() {
        let mut volume = Volume::new(Vec3::new(3., 3., 3.), Vec3::ONE);
        volume.resize(Vec3::new(5., 10., 6.));
        assert_eq!(volume.position(), Vec3::new(-2.5, 5., -3.));
        assert_eq!(volume.size(), Vec3::new(5., 10., 6.));
        assert_eq!(volume.min(), Vec3::new(-2.5, 0., -3.));
        assert_eq!(volume.max(), Vec3::new(2.5, 10., 3.));
        assert_eq!(volume.center(), Vec3::new(0., 5., 0.));
    }

    #[test]
    fn invalid_dimensions_are_clamped() {
        let volume = Volume::new(Vec3::ZERO, Vec3::new(-1., f32::NAN, 2.));
        assert_eq!(volume.size(), Vec3::new(0., 0., 2.));
        assert!(volume.is_empty());
        assert!(!Volume::from_size(Vec3::ONE).is_empty());
    }
}
