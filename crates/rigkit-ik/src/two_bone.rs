use crate::{IkContext, IkError};
use rigkit_math::*;
use rigkit_scene::{BoneId, Skeleton};

const MIN_SEGMENT_LEN: f32 = 1e-6;
const MIN_AXIS_LEN_SQ: f32 = 1e-10;

/// Analytic pole-vector solver for a root/mid/end limb (shoulder, elbow,
/// hand). The bend angle comes from the law of cosines; the pole position
/// picks the bend plane, which would otherwise be a free degree of freedom.
///
/// Segment lengths and reference directions are captured from the bind pose
/// at construction and never recomputed from live positions, so repeated
/// solves cannot drift or stretch the limb. Each `solve` is O(1) and exact:
/// the end bone lands on the target whenever it is within reach, and on the
/// fully extended chain toward the target otherwise.
#[derive(Debug, Clone)]
pub struct TwoBoneChain {
    root: BoneId,
    mid: BoneId,
    end: BoneId,
    upper_len: f32,
    lower_len: f32,
    bind_upper_dir: Vec3,
    bind_lower_dir: Vec3,
    bind_root_rot: Quat,
    bind_mid_rot: Quat,
    bind_end_rot: Quat,
}

impl TwoBoneChain {
    /// Captures rest lengths and bind orientations. The three bones must form
    /// a parent chain and may not coincide in the bind pose. Call this with
    /// the skeleton still in its bind pose, before any solver has run.
    pub fn from_bones(
        skeleton: &Skeleton,
        root: BoneId,
        mid: BoneId,
        end: BoneId,
    ) -> Result<Self, IkError> {
        if skeleton.parent_of(mid) != Some(root) {
            return Err(IkError::NotAChain {
                parent: root,
                child: mid,
            });
        }
        if skeleton.parent_of(end) != Some(mid) {
            return Err(IkError::NotAChain {
                parent: mid,
                child: end,
            });
        }

        let root_pos = skeleton.world_position(root);
        let mid_pos = skeleton.world_position(mid);
        let end_pos = skeleton.world_position(end);

        let upper = mid_pos - root_pos;
        let lower = end_pos - mid_pos;
        let upper_len = upper.length();
        let lower_len = lower.length();
        if upper_len < MIN_SEGMENT_LEN {
            return Err(IkError::ZeroLengthBone(root, mid));
        }
        if lower_len < MIN_SEGMENT_LEN {
            return Err(IkError::ZeroLengthBone(mid, end));
        }

        Ok(Self {
            root,
            mid,
            end,
            upper_len,
            lower_len,
            bind_upper_dir: upper / upper_len,
            bind_lower_dir: lower / lower_len,
            bind_root_rot: skeleton.world_rotation(root),
            bind_mid_rot: skeleton.world_rotation(mid),
            bind_end_rot: skeleton.world_rotation(end),
        })
    }

    pub fn bones(&self) -> [BoneId; 3] {
        [self.root, self.mid, self.end]
    }

    pub fn reach(&self) -> f32 {
        self.upper_len + self.lower_len
    }

    /// Bends the limb so the end bone reaches `ctx.target` as closely as the
    /// segment lengths allow, with `ctx.pole` resolving the elbow swing.
    /// Writes local rotations onto the three bones and propagates matrices.
    pub fn solve(&self, skeleton: &mut Skeleton, ctx: &IkContext) {
        skeleton.update();

        let root_pos = skeleton.world_position(self.root);
        let to_target = ctx.target - root_pos;
        let mut dist = to_target.length();
        // A target sitting on the root has no direction; keep aiming along
        // the bind direction instead of normalizing a zero vector.
        let dir = if dist < MIN_SEGMENT_LEN {
            self.bind_upper_dir
        } else {
            to_target / dist
        };
        dist = dist.clamp(MIN_SEGMENT_LEN, self.reach());

        // Bend plane from the pole, projected perpendicular to the aim axis.
        // A pole collinear with root and target leaves the plane undefined;
        // fall back to a fixed perpendicular so the pose stays finite.
        let pole_vec = ctx.pole - root_pos;
        let mut bend = pole_vec - dir * pole_vec.dot(dir);
        if bend.length_squared() < MIN_AXIS_LEN_SQ {
            bend = any_perpendicular(dir);
        } else {
            bend = bend.normalize();
        }

        // Apex angle at the root via the law of cosines; the clamp covers
        // both out-of-reach and degenerate-triangle targets.
        let cos_root = ((self.upper_len * self.upper_len + dist * dist
            - self.lower_len * self.lower_len)
            / (2.0 * self.upper_len * dist))
            .clamp(-1.0, 1.0);
        let sin_root = (1.0 - cos_root * cos_root).sqrt();
        let upper_dir = (dir * cos_root + bend * sin_root).normalize();

        let mid_pos = root_pos + upper_dir * self.upper_len;
        let effective_target = root_pos + dir * dist;
        let lower = effective_target - mid_pos;
        let lower_dir = if lower.length_squared() < MIN_AXIS_LEN_SQ {
            upper_dir
        } else {
            lower.normalize()
        };

        // World rotations as deltas from the bind pose. The bend direction
        // anchors the twist so the limb does not spin about its own axis;
        // the hand continues the forearm axis toward the target.
        let upper_delta = look_rotation(upper_dir, bend, self.bind_upper_dir, FALLBACK_UP);
        let lower_delta = look_rotation(lower_dir, bend, self.bind_lower_dir, FALLBACK_UP);

        let root_world = (upper_delta * self.bind_root_rot).normalize();
        let mid_world = (lower_delta * self.bind_mid_rot).normalize();
        let end_world = (lower_delta * self.bind_end_rot).normalize();

        // Write back as local rotations by removing each parent's world
        // rotation; root first, so mid and end divide out the new frames.
        let root_parent_rot = match skeleton.parent_of(self.root) {
            Some(parent) => skeleton.world_rotation(parent),
            None => Quat::IDENTITY,
        };
        skeleton.set_local_rotation(self.root, root_parent_rot.conjugate() * root_world);
        skeleton.set_local_rotation(self.mid, root_world.conjugate() * mid_world);
        skeleton.set_local_rotation(self.end, mid_world.conjugate() * end_world);
        skeleton.update();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rigkit_scene::BoneDescriptor;

    const SQRT_2: f32 = std::f32::consts::SQRT_2;

    fn arm_skeleton() -> (Skeleton, TwoBoneChain) {
        let descriptor = BoneDescriptor {
            name: "shoulder".into(),
            child_bones: vec![BoneDescriptor {
                name: "elbow".into(),
                translation: Vec3::new(1.0, 0.0, 0.0),
                child_bones: vec![BoneDescriptor {
                    name: "hand".into(),
                    translation: Vec3::new(1.0, 0.0, 0.0),
                    ..Default::default()
                }],
                ..Default::default()
            }],
            ..Default::default()
        };

        let skeleton = Skeleton::from_descriptor(&descriptor);
        let chain = TwoBoneChain::from_bones(
            &skeleton,
            skeleton.bone_id("shoulder").unwrap(),
            skeleton.bone_id("elbow").unwrap(),
            skeleton.bone_id("hand").unwrap(),
        )
        .unwrap();

        (skeleton, chain)
    }

    fn solve(skeleton: &mut Skeleton, chain: &TwoBoneChain, target: Vec3, pole: Vec3) {
        chain.solve(skeleton, &IkContext::new(target, pole));
    }

    #[test]
    fn reaches_straight_ahead() {
        let (mut skeleton, chain) = arm_skeleton();
        let [_, mid, end] = chain.bones();

        solve(&mut skeleton, &chain, Vec3::new(2.0, 0.0, 0.0), Vec3::Y);

        assert!((skeleton.world_position(mid) - Vec3::new(1.0, 0.0, 0.0)).length() < 1e-4);
        assert!((skeleton.world_position(end) - Vec3::new(2.0, 0.0, 0.0)).length() < 1e-4);
    }

    #[test]
    fn bends_ninety_degrees_at_mid() {
        let (mut skeleton, chain) = arm_skeleton();
        let [root, mid, end] = chain.bones();

        let target = Vec3::new(0.0, SQRT_2, 0.0);
        solve(&mut skeleton, &chain, target, Vec3::Z);

        let end_pos = skeleton.world_position(end);
        assert!((end_pos - target).length() < 1e-4);

        let mid_pos = skeleton.world_position(mid);
        let to_root = (skeleton.world_position(root) - mid_pos).normalize();
        let to_end = (end_pos - mid_pos).normalize();
        assert!(to_root.dot(to_end).abs() < 1e-4);
    }

    #[test]
    fn clamps_out_of_reach_targets_to_full_extension() {
        let (mut skeleton, chain) = arm_skeleton();
        let [root, _, end] = chain.bones();

        let target = Vec3::new(3.0, 4.0, 0.0) * 2.0;
        solve(&mut skeleton, &chain, target, Vec3::Z);

        let root_pos = skeleton.world_position(root);
        let end_pos = skeleton.world_position(end);
        assert!(((end_pos - root_pos).length() - chain.reach()).abs() < 1e-4);
        // End sits on the ray from root through the target, never beyond.
        let expected = root_pos + (target - root_pos).normalize() * chain.reach();
        assert!((end_pos - expected).length() < 1e-4);
    }

    #[test]
    fn degenerate_pole_still_produces_finite_pose() {
        let (mut skeleton, chain) = arm_skeleton();
        let [root, mid, end] = chain.bones();

        // Pole collinear with root and target.
        let target = Vec3::new(1.2, 0.0, 0.0);
        solve(&mut skeleton, &chain, target, Vec3::new(3.0, 0.0, 0.0));

        for bone in [root, mid, end] {
            assert!(skeleton.world_position(bone).is_finite());
            assert!(skeleton.local_rotation(bone).is_finite());
        }
        assert!((skeleton.world_position(end) - target).length() < 1e-4);
    }

    #[test]
    fn solving_is_stateless_between_targets() {
        let (mut skeleton, chain) = arm_skeleton();
        let [_, _, end] = chain.bones();

        let first = Vec3::new(0.5, 1.0, 0.5);
        solve(&mut skeleton, &chain, first, Vec3::Y);
        let first_pos = skeleton.world_position(end);

        solve(&mut skeleton, &chain, Vec3::new(-1.0, 0.3, 0.8), Vec3::Y);
        solve(&mut skeleton, &chain, first, Vec3::Y);

        assert!((skeleton.world_position(end) - first_pos).length() < 1e-4);
    }

    #[test]
    fn rejects_bones_that_are_not_a_chain() {
        let (skeleton, _) = arm_skeleton();
        let shoulder = skeleton.bone_id("shoulder").unwrap();
        let hand = skeleton.bone_id("hand").unwrap();

        let result = TwoBoneChain::from_bones(&skeleton, shoulder, hand, shoulder);
        assert!(matches!(result, Err(IkError::NotAChain { .. })));
    }
}
