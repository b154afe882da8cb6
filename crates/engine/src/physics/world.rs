use std::fmt;

use glam::{Quat, Vec3};
use rapier3d::na::{Quaternion, UnitQuaternion};
use rapier3d::prelude::*;
use serde::Deserialize;
use tracing::{debug, info};

use super::hull::{ConvexShape, HullError};

const DEFAULT_GRAVITY: [f32; 3] = [0.0, -9.82, 0.0];
const DEFAULT_CONTACT_FRICTION: f32 = 0.25;
const DEFAULT_CONTACT_RESTITUTION: f32 = 0.25;
const DEFAULT_MAX_STEP_SECONDS: f32 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PhysicsSettings {
    pub gravity: [f32; 3],
    pub friction: f32,
    pub restitution: f32,
    /// Upper bound for a single step; longer frames are simulated short.
    pub max_step_seconds: f32,
}

impl Default for PhysicsSettings {
    fn default() -> Self {
        Self {
            gravity: DEFAULT_GRAVITY,
            friction: DEFAULT_CONTACT_FRICTION,
            restitution: DEFAULT_CONTACT_RESTITUTION,
            max_step_seconds: DEFAULT_MAX_STEP_SECONDS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BodyKind {
    /// Never moves.
    Static,
    /// Moved by the scene each frame; pushes dynamic bodies but ignores forces.
    Kinematic,
    /// Simulated under gravity and contacts.
    Dynamic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BodyHandle(RigidBodyHandle);

pub struct PhysicsWorld {
    settings: PhysicsSettings,
    gravity: Vector<Real>,
    integration_parameters: IntegrationParameters,
    pipeline: PhysicsPipeline,
    islands: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    query_pipeline: QueryPipeline,
}

impl fmt::Debug for PhysicsWorld {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PhysicsWorld")
            .field("settings", &self.settings)
            .field("bodies", &self.bodies.len())
            .field("colliders", &self.colliders.len())
            .finish()
    }
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new(PhysicsSettings::default())
    }
}

impl PhysicsWorld {
    pub fn new(settings: PhysicsSettings) -> Self {
        let [gx, gy, gz] = settings.gravity;
        Self {
            settings,
            gravity: vector![gx, gy, gz],
            integration_parameters: IntegrationParameters::default(),
            pipeline: PhysicsPipeline::new(),
            islands: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
        }
    }

    pub fn settings(&self) -> &PhysicsSettings {
        &self.settings
    }

    pub fn gravity(&self) -> Vec3 {
        Vec3::new(self.gravity.x, self.gravity.y, self.gravity.z)
    }

    pub fn set_gravity(&mut self, gravity: Vec3) {
        self.gravity = vector![gravity.x, gravity.y, gravity.z];
        self.settings.gravity = gravity.to_array();
        for (_, body) in self.bodies.iter_mut() {
            body.wake_up(true);
        }
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    pub fn collider_count(&self) -> usize {
        self.colliders.len()
    }

    /// Adds a body with no shapes. Shapes are attached with
    /// [`PhysicsWorld::add_convex_shape`]; a body without any stays inert.
    pub fn add_body(&mut self, kind: BodyKind, translation: Vec3, rotation: Quat) -> BodyHandle {
        let builder = match kind {
            BodyKind::Static => RigidBodyBuilder::fixed(),
            BodyKind::Kinematic => RigidBodyBuilder::kinematic_position_based(),
            BodyKind::Dynamic => RigidBodyBuilder::dynamic(),
        };
        let handle = self
            .bodies
            .insert(builder.position(to_isometry(translation, rotation)).build());
        debug!(?kind, x = translation.x, y = translation.y, z = translation.z, "body_added");
        BodyHandle(handle)
    }

    /// Attaches a convex collider to `body`, using the world's contact
    /// material. Returns the number of colliders on the body afterwards.
    pub fn add_convex_shape(
        &mut self,
        body: BodyHandle,
        shape: &ConvexShape,
    ) -> Result<usize, HullError> {
        let points = shape
            .vertices
            .iter()
            .map(|v| point![v.x, v.y, v.z])
            .collect::<Vec<_>>();
        let shared = SharedShape::convex_mesh(points.clone(), &shape.faces)
            .or_else(|| SharedShape::convex_hull(&points))
            .ok_or(HullError::Rejected)?;

        let collider = ColliderBuilder::new(shared)
            .friction(self.settings.friction)
            .restitution(self.settings.restitution)
            .build();
        self.colliders
            .insert_with_parent(collider, body.0, &mut self.bodies);

        Ok(self
            .bodies
            .get(body.0)
            .map(|rb| rb.colliders().len())
            .unwrap_or(0))
    }

    /// Removes a body together with its colliders. Returns `false` when the
    /// handle is unknown.
    pub fn remove_body(&mut self, body: BodyHandle) -> bool {
        let removed = self.bodies.remove(
            body.0,
            &mut self.islands,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            true,
        );
        removed.is_some()
    }

    pub fn body_kind(&self, body: BodyHandle) -> Option<BodyKind> {
        self.bodies.get(body.0).map(|rb| match rb.body_type() {
            RigidBodyType::Fixed => BodyKind::Static,
            RigidBodyType::Dynamic => BodyKind::Dynamic,
            RigidBodyType::KinematicPositionBased | RigidBodyType::KinematicVelocityBased => {
                BodyKind::Kinematic
            }
        })
    }

    /// Target pose for a kinematic body, reached during the next step.
    /// Returns `false` when the handle is unknown.
    pub fn set_kinematic_pose(
        &mut self,
        body: BodyHandle,
        translation: Vec3,
        rotation: Quat,
    ) -> bool {
        match self.bodies.get_mut(body.0) {
            Some(rb) => {
                rb.set_next_kinematic_position(to_isometry(translation, rotation));
                true
            }
            None => false,
        }
    }

    pub fn body_pose(&self, body: BodyHandle) -> Option<(Vec3, Quat)> {
        self.bodies.get(body.0).map(|rb| from_isometry(rb.position()))
    }

    /// Advances the simulation by `dt` seconds, clamped to the configured
    /// maximum step. Returns the simulated interval; non-positive or
    /// non-finite input steps nothing and returns zero.
    pub fn step(&mut self, dt: f32) -> f32 {
        if !dt.is_finite() || dt <= 0.0 {
            return 0.0;
        }
        let dt = dt.min(self.settings.max_step_seconds);
        self.integration_parameters.dt = dt;
        self.pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.islands,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            Some(&mut self.query_pipeline),
            &(),
            &(),
        );
        dt
    }

    pub fn log_summary(&self) {
        info!(
            bodies = self.bodies.len(),
            colliders = self.colliders.len(),
            gravity_y = self.gravity.y,
            "physics_world_ready"
        );
    }
}

fn to_isometry(translation: Vec3, rotation: Quat) -> Isometry<Real> {
    let rotation = UnitQuaternion::from_quaternion(Quaternion::new(
        rotation.w, rotation.x, rotation.y, rotation.z,
    ));
    Isometry::from_parts(
        Translation::new(translation.x, translation.y, translation.z),
        rotation,
    )
}

fn from_isometry(iso: &Isometry<Real>) -> (Vec3, Quat) {
    let t = iso.translation.vector;
    let q = iso.rotation.quaternion();
    (
        Vec3::new(t.x, t.y, t.z),
        Quat::from_xyzw(q.i, q.j, q.k, q.w),
    )
}
