// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

//! A thin layer over rapier2d. Every collider carries a [`ShapeTag`] in its user
//! data so that contacts can be resolved back to notes without holding references
//! into the engine's storage.

use std::fmt;

use parking_lot::Mutex;
use rapier2d::prelude::*;

/// Identifies a note body across the physics boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NoteId(u64);

impl NoteId {
    pub fn new(id: u64) -> NoteId {
        NoteId(id)
    }

    /// Returns the id that follows this one.
    pub(crate) fn next(&self) -> NoteId {
        NoteId(self.0 + 1)
    }
}

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "note#{}", self.0)
    }
}

/// The collision type of a collider.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShapeTag {
    /// A wall of the container.
    Wall,
    /// A ball belonging to the given note.
    Note(NoteId),
}

const TAG_BITS: u32 = 8;
const TAG_MASK: u128 = (1 << TAG_BITS) - 1;
const TAG_WALL: u128 = 1;
const TAG_NOTE: u128 = 2;

impl ShapeTag {
    fn to_user_data(self) -> u128 {
        match self {
            ShapeTag::Wall => TAG_WALL,
            ShapeTag::Note(id) => (u128::from(id.0) << TAG_BITS) | TAG_NOTE,
        }
    }

    fn from_user_data(user_data: u128) -> Option<ShapeTag> {
        match user_data & TAG_MASK {
            TAG_WALL => Some(ShapeTag::Wall),
            TAG_NOTE => Some(ShapeTag::Note(NoteId((user_data >> TAG_BITS) as u64))),
            _ => None,
        }
    }
}

/// A note that started touching a wall during the last step.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FirstContact {
    pub note: NoteId,
    /// The magnitude of the total impulse the solver applied to the pair.
    pub impulse: f32,
}

/// A body registered in a [`PhysicsWorld`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BodyHandle(RigidBodyHandle);

/// The material of a collider.
#[derive(Clone, Copy, Debug)]
pub struct Material {
    pub elasticity: f32,
}

/// Records the collider pairs that began touching while the pipeline steps.
struct ContactStarts {
    started: Mutex<Vec<(ColliderHandle, ColliderHandle)>>,
}

impl ContactStarts {
    fn new() -> Self {
        ContactStarts {
            started: Mutex::new(Vec::new()),
        }
    }

    fn drain(&self) -> Vec<(ColliderHandle, ColliderHandle)> {
        std::mem::take(&mut *self.started.lock())
    }
}

impl EventHandler for ContactStarts {
    fn handle_collision_event(
        &self,
        _bodies: &RigidBodySet,
        _colliders: &ColliderSet,
        event: CollisionEvent,
        _contact_pair: Option<&ContactPair>,
    ) {
        if let CollisionEvent::Started(h1, h2, _) = event {
            self.started.lock().push((h1, h2));
        }
    }

    fn handle_contact_force_event(
        &self,
        _dt: Real,
        _bodies: &RigidBodySet,
        _colliders: &ColliderSet,
        _contact_pair: &ContactPair,
        _total_force_magnitude: Real,
    ) {
    }
}

/// Owns every rapier2d structure needed to step a 2D world.
pub struct PhysicsWorld {
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
    contact_starts: ContactStarts,
}

impl PhysicsWorld {
    /// Creates an empty world. Positive gravity pulls towards positive y, which
    /// is down on screen.
    pub fn new(gravity: f32) -> PhysicsWorld {
        PhysicsWorld {
            gravity: vector![0.0, gravity],
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
            contact_starts: ContactStarts::new(),
        }
    }

    /// Adds an infinite mass body at the origin that turns at a constant rate.
    pub fn add_kinematic(&mut self, angular_velocity: f32) -> BodyHandle {
        let body = RigidBodyBuilder::kinematic_velocity_based()
            .angvel(angular_velocity)
            .build();
        BodyHandle(self.bodies.insert(body))
    }

    /// Attaches a segment with rounded ends of the given thickness to a body.
    pub fn add_segment(
        &mut self,
        body: BodyHandle,
        a: [f32; 2],
        b: [f32; 2],
        thickness: f32,
        material: Material,
        tag: ShapeTag,
    ) {
        let collider = ColliderBuilder::new(SharedShape::capsule(
            point![a[0], a[1]],
            point![b[0], b[1]],
            thickness,
        ))
        .friction(0.0)
        .restitution(material.elasticity)
        .restitution_combine_rule(CoefficientCombineRule::Multiply)
        .user_data(tag.to_user_data())
        .build();
        self.colliders
            .insert_with_parent(collider, body.0, &mut self.bodies);
    }

    /// Adds a dynamic ball at rest at the given position.
    pub fn add_ball(
        &mut self,
        position: [f32; 2],
        radius: f32,
        mass: f32,
        material: Material,
        tag: ShapeTag,
    ) -> BodyHandle {
        let body = RigidBodyBuilder::dynamic()
            .translation(vector![position[0], position[1]])
            .ccd_enabled(true)
            .build();
        let handle = self.bodies.insert(body);
        let collider = ColliderBuilder::ball(radius)
            .mass(mass)
            .friction(0.0)
            .restitution(material.elasticity)
            .restitution_combine_rule(CoefficientCombineRule::Multiply)
            .active_events(ActiveEvents::COLLISION_EVENTS)
            .user_data(tag.to_user_data())
            .build();
        self.colliders
            .insert_with_parent(collider, handle, &mut self.bodies);
        BodyHandle(handle)
    }

    /// Removes a body along with its colliders.
    pub fn remove_body(&mut self, body: BodyHandle) {
        self.bodies.remove(
            body.0,
            &mut self.islands,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            true,
        );
    }

    /// The body's current position.
    pub fn position(&self, body: BodyHandle) -> Option<[f32; 2]> {
        self.bodies.get(body.0).map(|body| {
            let translation = body.translation();
            [translation.x, translation.y]
        })
    }

    /// The body's current angle in radians, within (-π, π].
    pub fn angle(&self, body: BodyHandle) -> Option<f32> {
        self.bodies.get(body.0).map(|body| body.rotation().angle())
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    pub fn collider_count(&self) -> usize {
        self.colliders.len()
    }

    /// Advances the world by `dt` seconds. `on_first_contact` is called for every
    /// note that started touching a wall during this step, after the solver has
    /// run so that the reported impulse is the one that was applied.
    pub fn step<F>(&mut self, dt: f32, mut on_first_contact: F)
    where
        F: FnMut(FirstContact),
    {
        if dt.is_nan() || dt <= 0.0 {
            return;
        }

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
            None,
            &(),
            &self.contact_starts,
        );

        for (h1, h2) in self.contact_starts.drain() {
            let Some(note) = self.note_against_wall(h1, h2) else {
                continue;
            };
            let impulse = self
                .narrow_phase
                .contact_pair(h1, h2)
                .map(|pair| pair.total_impulse_magnitude())
                .unwrap_or(0.0);
            on_first_contact(FirstContact { note, impulse });
        }
    }

    /// Returns the note if exactly one collider of the pair is a note and the
    /// other is a wall.
    fn note_against_wall(&self, h1: ColliderHandle, h2: ColliderHandle) -> Option<NoteId> {
        let t1 = self.tag(h1)?;
        let t2 = self.tag(h2)?;
        match (t1, t2) {
            (ShapeTag::Note(id), ShapeTag::Wall) | (ShapeTag::Wall, ShapeTag::Note(id)) => Some(id),
            _ => None,
        }
    }

    fn tag(&self, collider: ColliderHandle) -> Option<ShapeTag> {
        self.colliders
            .get(collider)
            .and_then(|collider| ShapeTag::from_user_data(collider.user_data))
    }

    /// Teleports a body and stops it.
    #[cfg(test)]
    pub(crate) fn set_position(&mut self, body: BodyHandle, position: [f32; 2]) {
        if let Some(body) = self.bodies.get_mut(body.0) {
            body.set_translation(vector![position[0], position[1]], true);
            body.set_linvel(vector![0.0, 0.0], true);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const DT: f32 = 0.01;

    fn floor(world: &mut PhysicsWorld, elasticity: f32) -> BodyHandle {
        let floor = world.add_kinematic(0.0);
        world.add_segment(
            floor,
            [-1.0, 0.5],
            [1.0, 0.5],
            0.01,
            Material { elasticity },
            ShapeTag::Wall,
        );
        floor
    }

    #[test]
    fn test_shape_tag_user_data() {
        assert_eq!(
            Some(ShapeTag::Wall),
            ShapeTag::from_user_data(ShapeTag::Wall.to_user_data())
        );
        let note = ShapeTag::Note(NoteId::new(u64::MAX));
        assert_eq!(Some(note), ShapeTag::from_user_data(note.to_user_data()));
        // Untagged colliders have zero user data.
        assert_eq!(None, ShapeTag::from_user_data(0));
    }

    #[test]
    fn test_ball_falls() {
        let mut world = PhysicsWorld::new(5.0);
        let ball = world.add_ball(
            [0.0, 0.0],
            0.03,
            0.05,
            Material { elasticity: 0.9 },
            ShapeTag::Note(NoteId::new(0)),
        );
        for _ in 0..10 {
            world.step(DT, |_| panic!("no walls to touch"));
        }
        let [x, y] = world.position(ball).expect("ball should exist");
        assert!(x.abs() < 1e-6);
        assert!(y > 0.0, "ball should fall towards positive y, got {}", y);
    }

    #[test]
    fn test_zero_step_is_noop() {
        let mut world = PhysicsWorld::new(5.0);
        let ball = world.add_ball(
            [0.0, 0.0],
            0.03,
            0.05,
            Material { elasticity: 0.9 },
            ShapeTag::Note(NoteId::new(0)),
        );
        world.step(0.0, |_| {});
        world.step(f32::NAN, |_| {});
        assert_eq!(Some([0.0, 0.0]), world.position(ball));
    }

    #[test]
    fn test_first_contact_reported_once() {
        let mut world = PhysicsWorld::new(5.0);
        floor(&mut world, 0.0);
        let note = NoteId::new(7);
        world.add_ball([0.0, 0.0], 0.03, 0.05, Material { elasticity: 0.0 }, ShapeTag::Note(note));

        let mut contacts = Vec::new();
        for _ in 0..300 {
            world.step(DT, |contact| contacts.push(contact));
        }

        assert_eq!(1, contacts.len(), "contacts: {:?}", contacts);
        assert_eq!(note, contacts[0].note);
        assert!(contacts[0].impulse > 0.0);
    }

    #[test]
    fn test_note_collisions_are_not_wall_contacts() {
        let mut world = PhysicsWorld::new(0.0);
        let a = world.add_ball(
            [0.0, 0.0],
            0.03,
            0.05,
            Material { elasticity: 0.9 },
            ShapeTag::Note(NoteId::new(0)),
        );
        world.add_ball(
            [0.05, 0.0],
            0.03,
            0.05,
            Material { elasticity: 0.9 },
            ShapeTag::Note(NoteId::new(1)),
        );
        for _ in 0..10 {
            world.step(DT, |contact| panic!("unexpected contact {:?}", contact));
        }
        // The overlapping balls were pushed apart.
        let [x, _] = world.position(a).expect("ball should exist");
        assert!(x < 0.0);
    }

    #[test]
    fn test_remove_body() {
        let mut world = PhysicsWorld::new(5.0);
        floor(&mut world, 0.3);
        let ball = world.add_ball(
            [0.0, 0.0],
            0.03,
            0.05,
            Material { elasticity: 0.9 },
            ShapeTag::Note(NoteId::new(0)),
        );
        assert_eq!(2, world.body_count());
        assert_eq!(2, world.collider_count());

        world.remove_body(ball);
        assert_eq!(1, world.body_count());
        assert_eq!(1, world.collider_count());
        assert_eq!(None, world.position(ball));

        for _ in 0..100 {
            world.step(DT, |contact| panic!("removed ball touched {:?}", contact));
        }
    }

    #[test]
    fn test_kinematic_rotation() {
        let mut world = PhysicsWorld::new(5.0);
        let body = world.add_kinematic(0.5);
        for _ in 0..100 {
            world.step(DT, |_| {});
        }
        let angle = world.angle(body).expect("body should exist");
        assert!((angle - 0.5).abs() < 1e-3, "angle was {}", angle);
    }
}
