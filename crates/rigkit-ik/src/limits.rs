use crate::IkError;
use rigkit_math::*;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Rotation limit declared on a CCD link.
///
/// An out-of-range solve is recovered by clamping, never rejected; a link
/// without a limit skips the clamp entirely.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum JointLimit {
    None,
    /// Cone limit: the link may only swing about the axis encoded in the
    /// quaternion's vector part. The clamp keeps `w` and rescales the vector
    /// part onto that axis.
    Cone(Quat),
    /// Component-wise Euler bounds in radians, XYZ order.
    Euler { min: Vec3, max: Vec3 },
}

impl Default for JointLimit {
    fn default() -> Self {
        JointLimit::None
    }
}

impl JointLimit {
    /// Resolves the configured limit once at chain registration so the
    /// per-frame dispatch does no validation or normalization.
    pub(crate) fn resolve(&self) -> Result<ResolvedLimit, IkError> {
        match *self {
            JointLimit::None => Ok(ResolvedLimit::Free),
            JointLimit::Cone(q) => {
                let axis = Vec3::new(q.x, q.y, q.z);
                if axis.length_squared() < 1e-10 {
                    return Err(IkError::InvalidConeAxis);
                }
                Ok(ResolvedLimit::Cone(axis.normalize()))
            }
            JointLimit::Euler { min, max } => Ok(ResolvedLimit::Euler { min, max }),
        }
    }
}

#[derive(Debug, Copy, Clone)]
pub(crate) enum ResolvedLimit {
    Free,
    Cone(Vec3),
    Euler { min: Vec3, max: Vec3 },
}

impl ResolvedLimit {
    /// Clamps a freshly composed local rotation back inside the limit.
    pub(crate) fn apply(&self, rotation: Quat) -> Quat {
        match *self {
            ResolvedLimit::Free => rotation,
            ResolvedLimit::Cone(axis) => {
                let w = rotation.w.clamp(-1.0, 1.0);
                let s = (1.0 - w * w).sqrt();
                Quat::from_xyzw(axis.x * s, axis.y * s, axis.z * s, w)
            }
            ResolvedLimit::Euler { min, max } => {
                let (x, y, z) = rotation.to_euler(EulerRot::XYZ);
                Quat::from_euler(
                    EulerRot::XYZ,
                    x.clamp(min.x, max.x),
                    y.clamp(min.y, max.y),
                    z.clamp(min.z, max.z),
                )
            }
        }
    }
}
