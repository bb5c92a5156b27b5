mod ccd;
mod limits;
mod two_bone;

pub use ccd::*;
pub use limits::*;
pub use two_bone::*;

use rigkit_math::*;
use rigkit_scene::BoneId;
use thiserror::Error;

/// Per-frame solver inputs, owned by the rig driver and passed by reference
/// into both solvers. Only these values (and per-chain blend factors) change
/// between frames; chains themselves are configured once at rig load.
#[derive(Debug, Copy, Clone)]
pub struct IkContext {
    /// World position the effector should reach.
    pub target: Vec3,
    /// World position disambiguating the bend plane of two-bone chains.
    pub pole: Vec3,
    /// Frame-wide blend factor in [0, 1], multiplied into per-chain blends.
    pub blend: f32,
}

impl Default for IkContext {
    fn default() -> Self {
        Self {
            target: Vec3::ZERO,
            pole: Vec3::ZERO,
            blend: 1.0,
        }
    }
}

impl IkContext {
    pub fn new(target: Vec3, pole: Vec3) -> Self {
        Self {
            target,
            pole,
            blend: 1.0,
        }
    }
}

/// Configuration errors raised while registering chains.
///
/// These are fatal to the offending chain only; numerical degeneracies during
/// a solve are never surfaced as errors but clamped or skipped per frame.
#[derive(Debug, Error)]
pub enum IkError {
    #[error("no bone named \"{0}\" in skeleton")]
    BoneNotFound(String),
    #[error("{child} is not a child of {parent}")]
    NotAChain { parent: BoneId, child: BoneId },
    #[error("link {index} ({bone}) is not the parent of the preceding chain bone")]
    BrokenChain { index: usize, bone: BoneId },
    #[error("{0} and {1} coincide in the bind pose")]
    ZeroLengthBone(BoneId, BoneId),
    #[error("cone limit axis has (near) zero length")]
    InvalidConeAxis,
}
