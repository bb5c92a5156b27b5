use rigkit_ik::{CcdSolver, ChainDescriptor, IkContext, TwoBoneChain};
use rigkit_math::*;
use rigkit_scene::{BoneId, Skeleton};
use rigkit_utils::{log, Averager, Timer};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Names wiring a loaded skeleton to the solvers. Resolved once when the
/// driver is built; per-frame code never touches bone names again.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Default)]
pub struct RigDescriptor {
    pub shoulder: String,
    pub elbow: String,
    pub hand: String,
    /// Handle bone the driver moves to the pointer target each frame; the
    /// CCD chains aim their effectors at it.
    pub target_handle: String,
    pub chains: Vec<ChainDescriptor>,
}

/// Per-frame glue between pointer input and the solvers.
///
/// `update` runs the analytic arm solve before the CCD pass: both read bone
/// world matrices, and the CCD pass must observe the arm's new pose rather
/// than last frame's. CCD chains are not allowed to touch the arm bones, so
/// the two solvers never compete over the same joints; the driver rejects
/// overlapping chains at build time.
///
/// Configuration errors (unknown bone names, broken chains) are logged once
/// here and disable only the offending piece; the rest of the rig keeps
/// posing, and affected bones simply stay at their last valid orientation.
#[derive(Debug)]
pub struct RigDriver {
    skeleton: Skeleton,
    arm: Option<TwoBoneChain>,
    handle: Option<BoneId>,
    solver: CcdSolver,
    ctx: IkContext,
    timer: Timer,
    solve_time: Averager<f32>,
}

impl RigDriver {
    pub fn new(mut skeleton: Skeleton, descriptor: &RigDescriptor) -> Self {
        skeleton.update();

        let arm = Self::resolve_arm(&skeleton, descriptor);
        let handle = skeleton.bone_id(&descriptor.target_handle);
        if handle.is_none() {
            log::error(format!(
                "rig: no target handle bone named \"{}\"",
                descriptor.target_handle
            ));
        }

        let arm_bones = [
            descriptor.shoulder.as_str(),
            descriptor.elbow.as_str(),
            descriptor.hand.as_str(),
        ];
        let mut solver = CcdSolver::new();
        for chain in &descriptor.chains {
            let overlaps = arm_bones.contains(&chain.effector.as_str())
                || chain
                    .links
                    .iter()
                    .any(|link| arm_bones.contains(&link.bone.as_str()));
            if overlaps {
                log::warning(format!(
                    "rig: chain for \"{}\" overlaps the analytic arm bones, skipped",
                    chain.effector
                ));
                continue;
            }

            if let Err(e) = solver.add_chain(&skeleton, chain) {
                log::error(format!("rig: chain for \"{}\": {}", chain.effector, e));
            }
        }
        log::log(format!(
            "rig: {} bones, arm {}, {} ccd chain(s)",
            skeleton.len(),
            if arm.is_some() { "ok" } else { "disabled" },
            solver.chains().len()
        ));

        Self {
            skeleton,
            arm,
            handle,
            solver,
            ctx: IkContext::default(),
            timer: Timer::new(),
            solve_time: Averager::new(),
        }
    }

    fn resolve_arm(skeleton: &Skeleton, descriptor: &RigDescriptor) -> Option<TwoBoneChain> {
        let lookup = |name: &str| {
            let id = skeleton.bone_id(name);
            if id.is_none() {
                log::error(format!("rig: no arm bone named \"{}\"", name));
            }
            id
        };

        let shoulder = lookup(&descriptor.shoulder)?;
        let elbow = lookup(&descriptor.elbow)?;
        let hand = lookup(&descriptor.hand)?;

        match TwoBoneChain::from_bones(skeleton, shoulder, elbow, hand) {
            Ok(chain) => Some(chain),
            Err(e) => {
                log::error(format!("rig: arm chain: {}", e));
                None
            }
        }
    }

    /// World position the hand should track, typically the pointer position
    /// projected onto a plane in front of the figure.
    pub fn set_target(&mut self, target: Vec3) {
        self.ctx.target = target;
    }

    /// World position of the elbow hint.
    pub fn set_pole(&mut self, pole: Vec3) {
        self.ctx.pole = pole;
    }

    /// Frame-wide blend factor; 1 applies solves fully.
    pub fn set_blend(&mut self, blend: f32) {
        self.ctx.blend = blend.clamp(0.0, 1.0);
    }

    pub fn context(&self) -> &IkContext {
        &self.ctx
    }

    pub fn skeleton(&self) -> &Skeleton {
        &self.skeleton
    }

    pub fn skeleton_mut(&mut self) -> &mut Skeleton {
        &mut self.skeleton
    }

    pub fn solver(&self) -> &CcdSolver {
        &self.solver
    }

    pub fn solver_mut(&mut self) -> &mut CcdSolver {
        &mut self.solver
    }

    pub fn arm(&self) -> Option<&TwoBoneChain> {
        self.arm.as_ref()
    }

    /// Runs one frame: moves the target handle, solves the arm, runs the CCD
    /// pass and propagates world matrices for the renderer.
    pub fn update(&mut self) {
        self.timer.reset();

        if let Some(handle) = self.handle {
            let local = match self.skeleton.parent_of(handle) {
                Some(parent) => self
                    .skeleton
                    .world_matrix(parent)
                    .inverse()
                    .transform_point3(self.ctx.target),
                None => self.ctx.target,
            };
            self.skeleton.set_local_translation(handle, local);
        }
        self.skeleton.update();

        if let Some(arm) = &self.arm {
            arm.solve(&mut self.skeleton, &self.ctx);
        }
        self.solver.update(&mut self.skeleton, &self.ctx);
        self.skeleton.update();

        self.solve_time.add_sample(self.timer.elapsed_in_millis());
    }

    /// Rolling average of recent `update` times in milliseconds.
    pub fn average_solve_ms(&self) -> f32 {
        self.solve_time.get_average()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rigkit_ik::LinkDescriptor;
    use rigkit_scene::BoneDescriptor;

    fn bone(name: &str, translation: Vec3, children: Vec<BoneDescriptor>) -> BoneDescriptor {
        BoneDescriptor {
            name: name.into(),
            translation,
            child_bones: children,
            ..Default::default()
        }
    }

    /// Torso with one arm, a head chain for the CCD pass and two handles.
    fn figure() -> Skeleton {
        let mut skeleton = Skeleton::new();
        let root = skeleton.root();
        skeleton.attach(
            root,
            &bone(
                "spine",
                Vec3::ZERO,
                vec![
                    bone(
                        "shoulder",
                        Vec3::new(0.2, 1.4, 0.0),
                        vec![bone(
                            "elbow",
                            Vec3::new(0.4, 0.0, 0.0),
                            vec![bone("hand", Vec3::new(0.4, 0.0, 0.0), vec![])],
                        )],
                    ),
                    bone(
                        "neck",
                        Vec3::new(0.0, 1.5, 0.0),
                        vec![bone("head", Vec3::new(0.0, 0.2, 0.0), vec![])],
                    ),
                ],
            ),
        );
        skeleton.attach(root, &bone("hand_target", Vec3::ZERO, vec![]));
        skeleton.attach(root, &bone("look_target", Vec3::ZERO, vec![]));
        skeleton.update();
        skeleton
    }

    fn rig_descriptor() -> RigDescriptor {
        RigDescriptor {
            shoulder: "shoulder".into(),
            elbow: "elbow".into(),
            hand: "hand".into(),
            target_handle: "hand_target".into(),
            chains: vec![ChainDescriptor {
                effector: "head".into(),
                target: "look_target".into(),
                links: vec![LinkDescriptor::new("neck")],
                iterations: 10,
                ..Default::default()
            }],
        }
    }

    #[test]
    fn hand_tracks_the_target() {
        let mut driver = RigDriver::new(figure(), &rig_descriptor());

        let target = Vec3::new(0.6, 1.0, 0.3);
        driver.set_target(target);
        driver.set_pole(Vec3::new(0.3, 0.8, -0.5));
        driver.update();

        let hand = driver.skeleton().bone_id("hand").unwrap();
        assert!((driver.skeleton().world_position(hand) - target).length() < 1e-3);

        // The handle bone sits on the target for the CCD chains.
        let handle = driver.skeleton().bone_id("hand_target").unwrap();
        assert!((driver.skeleton().world_position(handle) - target).length() < 1e-4);
    }

    #[test]
    fn overlapping_ccd_chains_are_rejected() {
        let mut descriptor = rig_descriptor();
        descriptor.chains.push(ChainDescriptor {
            effector: "hand".into(),
            target: "hand_target".into(),
            links: vec![LinkDescriptor::new("elbow"), LinkDescriptor::new("shoulder")],
            ..Default::default()
        });

        let driver = RigDriver::new(figure(), &descriptor);
        // Only the head chain survives; the arm stays analytic.
        assert_eq!(driver.solver().chains().len(), 1);
        assert!(driver.arm().is_some());
    }

    #[test]
    fn misconfigured_pieces_disable_only_themselves() {
        let mut descriptor = rig_descriptor();
        descriptor.elbow = "no_such_bone".into();
        descriptor.chains.push(ChainDescriptor {
            effector: "also_missing".into(),
            target: "look_target".into(),
            ..Default::default()
        });

        let mut driver = RigDriver::new(figure(), &descriptor);
        assert!(driver.arm().is_none());
        assert_eq!(driver.solver().chains().len(), 1);

        // Updating without an arm must not panic and still moves the handle.
        driver.set_target(Vec3::new(0.0, 1.0, 1.0));
        driver.update();
        let handle = driver.skeleton().bone_id("hand_target").unwrap();
        assert!(
            (driver.skeleton().world_position(handle) - Vec3::new(0.0, 1.0, 1.0)).length() < 1e-4
        );
    }
}
