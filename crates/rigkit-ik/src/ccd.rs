use crate::{limits::ResolvedLimit, IkContext, IkError, JointLimit};
use rigkit_math::*;
use rigkit_scene::{BoneId, Skeleton};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Angular error below which a link is considered aligned for a sweep.
const ANGLE_EPS: f32 = 1e-5;
const MIN_AXIS_LEN_SQ: f32 = 1e-10;

/// One link of a CCD chain, configured by bone name and resolved at
/// registration.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone)]
pub struct LinkDescriptor {
    pub bone: String,
    pub limit: JointLimit,
    pub enabled: bool,
}

impl LinkDescriptor {
    pub fn new<T: Into<String>>(bone: T) -> Self {
        Self {
            bone: bone.into(),
            limit: JointLimit::None,
            enabled: true,
        }
    }

    pub fn with_limit(mut self, limit: JointLimit) -> Self {
        self.limit = limit;
        self
    }
}

/// Construction-time description of one CCD solve task. Links are ordered
/// nearest-effector first and must form the parent path of the effector bone.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone)]
pub struct ChainDescriptor {
    pub effector: String,
    /// Handle bone supplying the desired world position, moved by the rig
    /// driver; typically parented to the skeleton root and not skinned.
    pub target: String,
    pub links: Vec<LinkDescriptor>,
    /// Full sweeps per update.
    pub iterations: usize,
    /// 1 applies this frame's solve fully, smaller values interpolate from
    /// the previous pose to damp sudden target jumps.
    pub blend: f32,
    /// Optional clamp on the per-step correction angle, radians.
    pub min_angle: Option<f32>,
    pub max_angle: Option<f32>,
}

impl Default for ChainDescriptor {
    fn default() -> Self {
        Self {
            effector: String::new(),
            target: String::new(),
            links: Vec::new(),
            iterations: 10,
            blend: 1.0,
            min_angle: None,
            max_angle: None,
        }
    }
}

#[derive(Debug, Clone)]
struct IkLink {
    bone: BoneId,
    limit: ResolvedLimit,
    enabled: bool,
}

/// A registered chain. Target/blend/enabled state may change between frames;
/// the link set is fixed for the session.
#[derive(Debug, Clone)]
pub struct IkChain {
    effector: BoneId,
    target: BoneId,
    links: Vec<IkLink>,
    iterations: usize,
    pub blend: f32,
    pub enabled: bool,
    min_angle: Option<f32>,
    max_angle: Option<f32>,
}

impl IkChain {
    pub fn effector(&self) -> BoneId {
        self.effector
    }

    pub fn target(&self) -> BoneId {
        self.target
    }

    pub fn link_bones(&self) -> impl Iterator<Item = BoneId> + '_ {
        self.links.iter().map(|link| link.bone)
    }

    pub fn set_link_enabled(&mut self, index: usize, enabled: bool) {
        if let Some(link) = self.links.get_mut(index) {
            link.enabled = enabled;
        }
    }
}

/// Cyclic coordinate descent solver over a set of independently configured
/// chains.
///
/// Every sweep walks the links from effector-adjacent to root-adjacent and
/// rotates each one to close the angle between link→effector and
/// link→target, under the link's rotation limit. World matrices are
/// re-propagated after every link write so later links in the same sweep
/// observe the updated pose; skipping that would not just be slower, it
/// would solve against stale positions.
#[derive(Debug, Clone, Default)]
pub struct CcdSolver {
    chains: Vec<IkChain>,
}

impl CcdSolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves and validates a chain against the skeleton. The links must
    /// form the exact ancestor path of the effector, nearest-effector first;
    /// a violation rejects this chain and leaves previously registered
    /// chains untouched.
    pub fn add_chain(
        &mut self,
        skeleton: &Skeleton,
        descriptor: &ChainDescriptor,
    ) -> Result<usize, IkError> {
        let lookup = |name: &str| {
            skeleton
                .bone_id(name)
                .ok_or_else(|| IkError::BoneNotFound(name.to_string()))
        };

        let effector = lookup(&descriptor.effector)?;
        let target = lookup(&descriptor.target)?;

        let mut links = Vec::with_capacity(descriptor.links.len());
        let mut child = effector;
        for (index, link) in descriptor.links.iter().enumerate() {
            let bone = lookup(&link.bone)?;
            if skeleton.parent_of(child) != Some(bone) {
                return Err(IkError::BrokenChain { index, bone });
            }
            child = bone;

            links.push(IkLink {
                bone,
                limit: link.limit.resolve()?,
                enabled: link.enabled,
            });
        }

        self.chains.push(IkChain {
            effector,
            target,
            links,
            iterations: descriptor.iterations,
            blend: descriptor.blend,
            enabled: true,
            min_angle: descriptor.min_angle,
            max_angle: descriptor.max_angle,
        });
        Ok(self.chains.len() - 1)
    }

    pub fn chains(&self) -> &[IkChain] {
        &self.chains
    }

    pub fn chain_mut(&mut self, id: usize) -> Option<&mut IkChain> {
        self.chains.get_mut(id)
    }

    /// Runs every enabled chain against the skeleton's current pose.
    pub fn update(&self, skeleton: &mut Skeleton, ctx: &IkContext) {
        for chain in &self.chains {
            Self::solve_chain(skeleton, chain, ctx);
        }
    }

    fn solve_chain(skeleton: &mut Skeleton, chain: &IkChain, ctx: &IkContext) {
        if !chain.enabled {
            return;
        }
        let blend = (chain.blend * ctx.blend).clamp(0.0, 1.0);
        if blend <= 0.0 {
            // Nothing of this frame's solve may be applied; leave the link
            // rotations bit-identical rather than slerping by zero.
            return;
        }

        skeleton.update();

        let saved: Option<Vec<Quat>> = if blend < 1.0 {
            Some(
                chain
                    .links
                    .iter()
                    .map(|link| skeleton.local_rotation(link.bone))
                    .collect(),
            )
        } else {
            None
        };

        for _ in 0..chain.iterations {
            for link in &chain.links {
                if !link.enabled {
                    continue;
                }

                let inverse = skeleton.world_matrix(link.bone).inverse();
                let to_effector =
                    inverse.transform_point3(skeleton.world_position(chain.effector));
                let to_target = inverse.transform_point3(skeleton.world_position(chain.target));
                if to_effector.length_squared() < MIN_AXIS_LEN_SQ
                    || to_target.length_squared() < MIN_AXIS_LEN_SQ
                {
                    continue;
                }
                let to_effector = to_effector.normalize();
                let to_target = to_target.normalize();

                let mut angle = to_effector.dot(to_target).clamp(-1.0, 1.0).acos();
                if angle < ANGLE_EPS {
                    continue;
                }
                if let Some(min) = chain.min_angle {
                    angle = angle.max(min);
                }
                if let Some(max) = chain.max_angle {
                    angle = angle.min(max);
                }

                // Parallel or antiparallel vectors leave no usable rotation
                // axis; skip the link for this sweep.
                let axis = to_effector.cross(to_target);
                if axis.length_squared() < MIN_AXIS_LEN_SQ {
                    continue;
                }
                let axis = axis.normalize();

                let rotated = (skeleton.local_rotation(link.bone)
                    * Quat::from_axis_angle(axis, angle))
                .normalize();
                skeleton.set_local_rotation(link.bone, link.limit.apply(rotated));
                skeleton.update();
            }
        }

        if let Some(saved) = saved {
            for (link, saved) in chain.links.iter().zip(saved) {
                if !link.enabled {
                    continue;
                }
                let solved = skeleton.local_rotation(link.bone);
                skeleton.set_local_rotation(link.bone, saved.slerp(solved, blend).normalize());
            }
            skeleton.update();
        }
    }
}
