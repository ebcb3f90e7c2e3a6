use std::f32::consts::FRAC_PI_2;

use glam::Vec3;

/// One of the four vertical faces of a volume, identified by a cardinal angle around the Y axis.
///
/// Angles are counter-clockwise when looking down the Y axis.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub enum FaceAngle {
    /// Angle of 0°
    #[default]
    Rot0,
    /// Angle of 90°
    Rot90,
    /// Angle of 180°
    Rot180,
    /// Angle of 270°
    Rot270,
}

impl FaceAngle {
    /// Returns the value of the angle in °(degrees).
    pub fn value(&self) -> u32 {
        match *self {
            FaceAngle::Rot0 => 0,
            FaceAngle::Rot90 => 90,
            FaceAngle::Rot180 => 180,
            FaceAngle::Rot270 => 270,
        }
    }

    /// Returns the value of the angle in radians.
    pub fn radians(&self) -> f32 {
        self.index() as f32 * FRAC_PI_2
    }

    /// Returns the index of the enum member in the enumeration.
    pub fn index(&self) -> u8 {
        match *self {
            FaceAngle::Rot0 => 0,
            FaceAngle::Rot90 => 1,
            FaceAngle::Rot180 => 2,
            FaceAngle::Rot270 => 3,
        }
    }

    /// Returns the [`FaceAngle`] matching `degrees`, normalized in [0, 360).
    ///
    /// Returns `None` if `degrees` is not a multiple of 90.
    ///
    /// ### Example
    /// ```
    /// use ghx_proc_rules::volume::direction::FaceAngle;
    ///
    /// assert_eq!(FaceAngle::from_degrees(-90), Some(FaceAngle::Rot270));
    /// assert_eq!(FaceAngle::from_degrees(450), Some(FaceAngle::Rot90));
    /// assert_eq!(FaceAngle::from_degrees(45), None);
    /// ```
    pub fn from_degrees(degrees: i32) -> Option<FaceAngle> {
        let normalized = degrees.rem_euclid(360);
        if normalized % 90 != 0 {
            return None;
        }
        Some(ALL_FACE_ANGLES[(normalized / 90) as usize])
    }

    #[inline]
    /// Returns a new [`FaceAngle`] equal to this angle rotated by `angle` counter-clockwise
    ///
    /// ### Example
    /// ```
    /// use ghx_proc_rules::volume::direction::FaceAngle;
    ///
    /// assert_eq!(FaceAngle::Rot90.rotated(FaceAngle::Rot180), FaceAngle::Rot270);
    /// ```
    pub fn rotated(&self, angle: FaceAngle) -> FaceAngle {
        ALL_FACE_ANGLES
            [(self.index() as usize + angle.index() as usize) % ALL_FACE_ANGLES.len()]
    }

    #[inline]
    /// Returns the next [`FaceAngle`]: this angle rotated by 90° counter-clockwise.
    pub fn next(&self) -> FaceAngle {
        self.rotated(FaceAngle::Rot90)
    }

    /// Returns the horizontal unit vector along which the face identified by this angle is walked.
    ///
    /// 0° walks toward +Z, 90° toward +X, 180° toward -Z and 270° toward -X.
    pub fn walk_direction(&self) -> Vec3 {
        match *self {
            FaceAngle::Rot0 => Vec3::Z,
            FaceAngle::Rot90 => Vec3::X,
            FaceAngle::Rot180 => Vec3::NEG_Z,
            FaceAngle::Rot270 => Vec3::NEG_X,
        }
    }
}

/// All the face angles, in processing order
pub const ALL_FACE_ANGLES: &[FaceAngle] = &[
    FaceAngle::Rot0,
    FaceAngle::Rot90,
    FaceAngle::Rot180,
    FaceAngle::Rot270,
];
