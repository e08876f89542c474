//! Contact data produced by the narrow phase

use crate::foundation::math::Vec3;

/// Which way a contact normal points
///
/// Pair tests do not share one convention: some report the normal from the
/// tested shape toward the other, some the reverse. The facing is recorded
/// with every contact so the response can always push the tested shape out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NormalFacing {
    /// Normal points from the tested shape toward the other shape
    SelfToOther,
    /// Normal points from the other shape toward the tested shape
    OtherToSelf,
}

/// A single collision result
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contact {
    /// World-space contact point
    pub point: Vec3,
    /// Contact normal, unit length on every supported pair
    pub normal: Vec3,
    /// Overlap along the normal; may be slightly negative for aggregated mesh contacts
    pub penetration_depth: f32,
    /// Direction convention of `normal`
    pub facing: NormalFacing,
}

impl Contact {
    /// Creates a contact
    pub fn new(point: Vec3, normal: Vec3, penetration_depth: f32, facing: NormalFacing) -> Self {
        Self {
            point,
            normal,
            penetration_depth,
            facing,
        }
    }

    /// Direction that moves the tested shape out of the other shape
    pub fn push_direction(&self) -> Vec3 {
        match self.facing {
            NormalFacing::SelfToOther => -self.normal,
            NormalFacing::OtherToSelf => self.normal,
        }
    }
}
