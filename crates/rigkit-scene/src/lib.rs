mod skeleton;

pub use skeleton::*;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Index of a bone within its [`Skeleton`], resolved once from a bone name at
/// rig-load time. Solvers store these instead of names so no string lookup
/// happens per frame.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct BoneId(pub u32);

impl BoneId {
    #[inline]
    pub fn as_index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for BoneId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "BoneId({})", self.0)
    }
}
