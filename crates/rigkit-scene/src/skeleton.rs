use crate::BoneId;
use rigkit_math::*;
use rigkit_utils::collections::TrackedStorage;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Construction-time description of a bone and its children. Skeletons are
/// built once from a descriptor tree at rig load time; bones are mutated
/// every frame afterwards but never destroyed during a session.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone)]
pub struct BoneDescriptor {
    pub name: String,
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
    pub child_bones: Vec<Self>,
}

impl Default for BoneDescriptor {
    fn default() -> Self {
        Self {
            name: Default::default(),
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
            child_bones: Default::default(),
        }
    }
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone)]
pub struct Bone {
    pub(crate) translation: Vec3,
    pub(crate) rotation: Quat,
    pub(crate) scale: Vec3,
    pub(crate) local_matrix: Mat4,
    pub world_matrix: Mat4,
    pub parent: Option<u32>,
    pub child_bones: Vec<u32>,
    pub name: String,
    pub changed: bool,
}

impl Default for Bone {
    fn default() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
            local_matrix: Mat4::IDENTITY,
            world_matrix: Mat4::IDENTITY,
            parent: None,
            child_bones: Vec::new(),
            name: String::new(),
            changed: true,
        }
    }
}

impl Bone {
    pub fn translation(&self) -> Vec3 {
        self.translation
    }

    pub fn rotation(&self) -> Quat {
        self.rotation
    }

    pub fn scale(&self) -> Vec3 {
        self.scale
    }

    pub fn set_translation<T: Into<[f32; 3]>>(&mut self, t: T) {
        self.translation = Vec3::from(t.into());
        self.changed = true;
    }

    /// Set rotation using an xyzw quaternion
    pub fn set_rotation<T: Into<[f32; 4]>>(&mut self, r: T) {
        self.rotation = Quat::from_array(r.into());
        self.changed = true;
    }

    pub fn set_scale<T: Into<[f32; 3]>>(&mut self, s: T) {
        self.scale = Vec3::from(s.into());
        self.changed = true;
    }

    pub(crate) fn update_matrix(&mut self) {
        self.local_matrix =
            Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation);
        self.changed = false;
    }
}

/// Skinning data attached to a skeleton: joint matrices derived from the
/// current pose relative to the bind pose.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Default)]
pub struct Skin {
    pub name: String,
    pub joint_bones: Vec<BoneId>,
    pub inverse_bind_matrices: Vec<Mat4>,
    pub joint_matrices: Vec<Mat4>,
}

/// Hierarchy of bones with an implicit root.
///
/// Local TRS components compose into world matrices top-down; `update`
/// propagates them and is the only world-matrix writer. Everything runs on
/// the frame thread, so readers in the same frame (including an IK solver
/// mid-sweep) call `update` before consulting world positions.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone)]
pub struct Skeleton {
    bones: TrackedStorage<Bone>,
    root: u32,
    pub skins: TrackedStorage<Skin>,
}

impl Default for Skeleton {
    fn default() -> Self {
        let mut bones = TrackedStorage::new();
        bones.push(Bone::default());

        Self {
            bones,
            root: 0,
            skins: TrackedStorage::new(),
        }
    }
}

impl Skeleton {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn root(&self) -> BoneId {
        BoneId(self.root)
    }

    pub fn len(&self) -> usize {
        self.bones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bones.is_empty()
    }

    /// Adds the descriptor (and its children, recursively) under `parent`.
    pub fn attach(&mut self, parent: BoneId, descriptor: &BoneDescriptor) -> BoneId {
        let mut bone = Bone {
            translation: descriptor.translation,
            rotation: descriptor.rotation,
            scale: descriptor.scale,
            parent: Some(parent.0),
            name: descriptor.name.clone(),
            ..Bone::default()
        };
        bone.update_matrix();
        bone.changed = true;

        let id = self.bones.push(bone) as u32;
        self.bones[parent.as_index()].child_bones.push(id);

        for child in &descriptor.child_bones {
            self.attach(BoneId(id), child);
        }

        BoneId(id)
    }

    pub fn from_descriptor(descriptor: &BoneDescriptor) -> Self {
        let mut skeleton = Self::new();
        skeleton.attach(skeleton.root(), descriptor);
        skeleton.update();
        skeleton
    }

    /// Name lookup, intended for setup only; per-frame code holds [`BoneId`]s.
    pub fn bone_id(&self, name: &str) -> Option<BoneId> {
        self.bones
            .iter()
            .find(|(_, bone)| bone.name == name)
            .map(|(id, _)| BoneId(id as u32))
    }

    pub fn get(&self, id: BoneId) -> Option<&Bone> {
        self.bones.get(id.as_index())
    }

    pub fn get_mut(&mut self, id: BoneId) -> Option<&mut Bone> {
        self.bones.get_mut(id.as_index())
    }

    pub fn parent_of(&self, id: BoneId) -> Option<BoneId> {
        self.bones.get(id.as_index())?.parent.map(BoneId)
    }

    pub fn iter(&self) -> impl Iterator<Item = (BoneId, &Bone)> {
        self.bones.iter().map(|(id, bone)| (BoneId(id as u32), bone))
    }

    pub fn world_matrix(&self, id: BoneId) -> Mat4 {
        self.bones[id.as_index()].world_matrix
    }

    pub fn world_position(&self, id: BoneId) -> Vec3 {
        self.bones[id.as_index()].world_matrix.w_axis.truncate()
    }

    pub fn world_rotation(&self, id: BoneId) -> Quat {
        let (_, rotation, _) = self.bones[id.as_index()]
            .world_matrix
            .to_scale_rotation_translation();
        rotation
    }

    pub fn local_rotation(&self, id: BoneId) -> Quat {
        self.bones[id.as_index()].rotation
    }

    pub fn set_local_rotation(&mut self, id: BoneId, rotation: Quat) {
        self.bones[id.as_index()].set_rotation(rotation);
    }

    pub fn set_local_translation(&mut self, id: BoneId, translation: Vec3) {
        self.bones[id.as_index()].set_translation(translation);
    }

    pub fn add_skin(&mut self, skin: Skin) -> usize {
        self.skins.push(skin)
    }

    /// Propagates local matrices into world matrices top-down and refreshes
    /// skin joint matrices. Returns whether anything had changed.
    pub fn update(&mut self) -> bool {
        if !self.bones.any_changed() {
            return false;
        }

        Self::traverse(self.root as usize, Mat4::IDENTITY, &mut self.bones);
        self.bones.reset_changed();
        self.update_skins();
        true
    }

    fn traverse(current: usize, accumulated: Mat4, bones: &mut TrackedStorage<Bone>) {
        if bones[current].changed {
            bones[current].update_matrix();
        }

        let world = accumulated * bones[current].local_matrix;
        bones[current].world_matrix = world;

        let child_count = bones[current].child_bones.len();
        for i in 0..child_count {
            let child = bones[current].child_bones[i] as usize;
            Self::traverse(child, world, bones);
        }
    }

    fn update_skins(&mut self) {
        if self.skins.is_empty() {
            return;
        }

        let root_inverse = self.bones[self.root as usize].world_matrix.inverse();
        let bones = &self.bones;
        for (_, skin) in self.skins.iter_mut() {
            for i in 0..skin.joint_bones.len() {
                let joint = skin.joint_bones[i];
                skin.joint_matrices[i] = root_inverse
                    * bones[joint.as_index()].world_matrix
                    * skin.inverse_bind_matrices[i];
            }
        }
    }
}

impl std::ops::Index<BoneId> for Skeleton {
    type Output = Bone;
    fn index(&self, id: BoneId) -> &Self::Output {
        &self.bones[id.as_index()]
    }
}

impl std::ops::IndexMut<BoneId> for Skeleton {
    fn index_mut(&mut self, id: BoneId) -> &mut Self::Output {
        &mut self.bones[id.as_index()]
    }
}
