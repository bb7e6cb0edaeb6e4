//! Client-side mirror of device state

use std::collections::{BTreeMap, HashMap};

use super::device::{
    BlendFunc, BufferId, BufferTarget, Capability, CullFace, DepthFunc, FramebufferId, FrontFace,
    PixelStore, PolygonMode, ProgramId, TextureId, VertexArrayId,
};
use crate::foundation::math::{UVec2, Vec4};

/// An indexed buffer binding point
///
/// Points order by target first, then by index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BindingPoint {
    /// Buffer target the point belongs to
    pub target: BufferTarget,
    /// Index within the target
    pub point: u32,
}

impl BindingPoint {
    /// Create a binding point
    pub const fn new(target: BufferTarget, point: u32) -> Self {
        Self { target, point }
    }
}

/// Cached configuration of one device context
///
/// Values start at the device's documented defaults. Capabilities are absent
/// until first referenced, at which point the device is asked for their
/// current state.
#[derive(Debug, Clone)]
pub struct DeviceState {
    /// Viewport size
    pub viewport: UVec2,
    /// Clear color
    pub clear_color: Vec4,
    /// Depth comparison function
    pub depth_func: DepthFunc,
    /// Depth write mask
    pub depth_mask: bool,
    /// Culled faces
    pub cull_face: CullFace,
    /// Front-face winding
    pub front_face: FrontFace,
    /// Rasterization mode per face selector
    pub polygon_mode: BTreeMap<CullFace, PolygonMode>,
    /// Blend function
    pub blend_func: BlendFunc,
    /// Pixel transfer parameters
    pub pixel_store: BTreeMap<PixelStore, i32>,
    /// Capability flags materialized on first use
    pub capabilities: HashMap<Capability, bool>,
    /// Current program
    pub program: ProgramId,
    /// Bound vertex array
    pub vertex_array: VertexArrayId,
    /// Bound framebuffer
    pub framebuffer: FramebufferId,
    /// Generic buffer target bindings
    pub buffer_targets: HashMap<BufferTarget, BufferId>,
    /// Indexed buffer bindings
    pub buffer_points: BTreeMap<BindingPoint, BufferId>,
    /// Index buffer captured by each vertex array
    pub element_buffers: HashMap<VertexArrayId, BufferId>,
    /// Active texture unit
    pub active_texture: u32,
    /// Texture bound to each unit
    pub texture_units: BTreeMap<u32, TextureId>,
}

impl DeviceState {
    /// State with every texture unit in `0..texture_units` holding no texture
    pub fn new(texture_units: u32) -> Self {
        let mut polygon_mode = BTreeMap::new();
        polygon_mode.insert(CullFace::FrontBack, PolygonMode::Fill);

        let mut pixel_store = BTreeMap::new();
        pixel_store.insert(PixelStore::UnpackAlignment, 4);
        pixel_store.insert(PixelStore::PackAlignment, 4);

        Self {
            viewport: UVec2::zeros(),
            clear_color: Vec4::zeros(),
            depth_func: DepthFunc::Less,
            depth_mask: true,
            cull_face: CullFace::Back,
            front_face: FrontFace::Ccw,
            polygon_mode,
            blend_func: BlendFunc::default(),
            pixel_store,
            capabilities: HashMap::new(),
            program: ProgramId::NONE,
            vertex_array: VertexArrayId::NONE,
            framebuffer: FramebufferId::NONE,
            buffer_targets: HashMap::new(),
            buffer_points: BTreeMap::new(),
            element_buffers: HashMap::new(),
            active_texture: 0,
            texture_units: (0..texture_units).map(|unit| (unit, TextureId::NONE)).collect(),
        }
    }

    /// Buffer bound to an indexed point, if any was recorded
    pub fn buffer_at(&self, point: BindingPoint) -> Option<BufferId> {
        self.buffer_points.get(&point).copied()
    }

    /// Texture bound to a unit, if the unit is known
    pub fn texture_at(&self, unit: u32) -> Option<TextureId> {
        self.texture_units.get(&unit).copied()
    }
}
