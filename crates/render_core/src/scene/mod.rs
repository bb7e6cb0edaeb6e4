//! # Scene
//!
//! Minimal scene provider consumed by the pipeline: a slot map of
//! renderable instances plus an optional skybox. The pipeline only ever
//! borrows the scene; it never mutates it.
//!
//! Every instance receives a picking id when it is added. Ids start at 1 so
//! that a cleared picking target (black, id 0) reads back as "nothing", and
//! wrap after [`MAX_PICK_ID`] since the id color only carries 24 bits.

pub mod bounds;
pub mod instance;
pub mod skybox;

pub use bounds::{Aabb, Frustum, Plane};
pub use instance::Instance;
pub use skybox::Skybox;

use slotmap::{new_key_type, SlotMap};

/// Largest picking id an RGB8 id color can carry
pub const MAX_PICK_ID: u32 = 0x00FF_FFFF;

new_key_type! {
    /// Stable handle to an instance in a [`Scene`]
    pub struct InstanceKey;
}

/// Instances and background for one view
#[derive(Debug)]
pub struct Scene {
    instances: SlotMap<InstanceKey, Instance>,
    next_id: u32,
    skybox: Option<Skybox>,
}

impl Scene {
    /// Empty scene without a skybox
    pub fn new() -> Self {
        Self {
            instances: SlotMap::with_key(),
            next_id: 1,
            skybox: None,
        }
    }

    /// Add an instance, assigning it the next picking id
    pub fn add(&mut self, mut instance: Instance) -> InstanceKey {
        instance.set_id(self.next_id);
        self.next_id = if self.next_id >= MAX_PICK_ID { 1 } else { self.next_id + 1 };
        log::trace!("Added instance {} (mesh '{}')", instance.id(), instance.mesh);
        self.instances.insert(instance)
    }

    /// Instance by key
    pub fn get(&self, key: InstanceKey) -> Option<&Instance> {
        self.instances.get(key)
    }

    /// Mutable instance by key
    pub fn get_mut(&mut self, key: InstanceKey) -> Option<&mut Instance> {
        self.instances.get_mut(key)
    }

    /// Remove an instance; its picking id is not reused
    pub fn remove(&mut self, key: InstanceKey) -> Option<Instance> {
        self.instances.remove(key)
    }

    /// Instance with the given picking id
    pub fn find_by_id(&self, id: u32) -> Option<(InstanceKey, &Instance)> {
        self.instances.iter().find(|(_, instance)| instance.id() == id)
    }

    /// All instances in slot order
    pub fn instances(&self) -> impl Iterator<Item = &Instance> {
        self.instances.values()
    }

    /// Number of instances
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    /// Whether the scene has no instances
    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Background skybox, if any
    pub fn skybox(&self) -> Option<&Skybox> {
        self.skybox.as_ref()
    }

    /// Replace the skybox
    pub fn set_skybox(&mut self, skybox: Option<Skybox>) {
        self.skybox = skybox;
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}
