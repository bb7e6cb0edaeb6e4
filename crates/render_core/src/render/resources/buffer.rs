//! Buffer objects

use bytemuck::Pod;

use crate::render::context::{BufferId, BufferTarget, BufferUsage, Context};

/// A device buffer bound to one target
#[derive(Debug)]
pub struct Buffer {
    id: BufferId,
    target: BufferTarget,
    usage: BufferUsage,
    size: usize,
}

impl Buffer {
    /// Create an empty buffer
    pub fn new(ctx: &mut Context, target: BufferTarget, usage: BufferUsage) -> Self {
        let id = ctx.device_mut().create_buffer();
        log::trace!("Created {:?} buffer {:?}", target, id);
        Self { id, target, usage, size: 0 }
    }

    /// Create a buffer filled with `data`
    pub fn with_data<T: Pod>(ctx: &mut Context, target: BufferTarget, usage: BufferUsage, data: &[T]) -> Self {
        let mut buffer = Self::new(ctx, target, usage);
        buffer.upload(ctx, data);
        buffer
    }

    /// Device name
    pub fn id(&self) -> BufferId {
        self.id
    }

    /// Binding target
    pub fn target(&self) -> BufferTarget {
        self.target
    }

    /// Allocated size in bytes
    pub fn size(&self) -> usize {
        self.size
    }

    /// Bind to the buffer's target through the cache
    pub fn bind(&self, ctx: &mut Context) {
        ctx.bind_buffer(self.target, self.id);
    }

    /// Bind to an indexed point of the buffer's target through the cache
    pub fn bind_base(&self, ctx: &mut Context, point: u32) {
        ctx.bind_buffer_base(self.target, point, self.id);
    }

    /// Replace the contents, reallocating only when the size changes
    pub fn upload<T: Pod>(&mut self, ctx: &mut Context, data: &[T]) {
        let bytes: &[u8] = bytemuck::cast_slice(data);
        self.bind(ctx);
        if bytes.len() == self.size {
            ctx.device_mut().buffer_sub_data(self.target, 0, bytes);
        } else {
            ctx.device_mut().buffer_data(self.target, bytes, self.usage);
            self.size = bytes.len();
        }
    }

    /// Delete the device buffer
    pub fn destroy(self, ctx: &mut Context) {
        ctx.device_mut().delete_buffer(self.id);
        ctx.forget_buffer(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::UVec2;
    use crate::render::context::{BindingPoint, RecordingDevice};

    #[test]
    fn test_upload_reuses_storage() {
        let mut ctx = Context::new(Box::new(RecordingDevice::new()), UVec2::new(8, 8));
        let mut buffer = Buffer::new(&mut ctx, BufferTarget::Uniform, BufferUsage::Dynamic);

        buffer.upload(&mut ctx, &[1.0f32, 2.0, 3.0, 4.0]);
        buffer.upload(&mut ctx, &[5.0f32, 6.0, 7.0, 8.0]);
        assert_eq!(buffer.size(), 16);

        let device = ctx.device_as::<RecordingDevice>().unwrap();
        assert_eq!(device.call_count("buffer_data"), 1);
        assert_eq!(device.call_count("buffer_sub_data"), 1);
        assert_eq!(device.call_count("bind_buffer"), 1);

        let expected: &[u8] = bytemuck::cast_slice(&[5.0f32, 6.0, 7.0, 8.0]);
        assert_eq!(device.buffer_contents(buffer.id()).unwrap(), expected);
    }

    #[test]
    fn test_destroy_clears_cached_bindings() {
        let device = RecordingDevice::new().with_name_reuse();
        let mut ctx = Context::new(Box::new(device), UVec2::new(8, 8));
        let mut buffer = Buffer::new(&mut ctx, BufferTarget::Uniform, BufferUsage::Dynamic);
        buffer.upload(&mut ctx, &[1.0f32; 4]);
        buffer.bind_base(&mut ctx, 0);
        let old = buffer.id();
        buffer.destroy(&mut ctx);

        let point = BindingPoint::new(BufferTarget::Uniform, 0);
        assert_eq!(ctx.state().buffer_targets.get(&BufferTarget::Uniform), Some(&BufferId::NONE));
        assert_eq!(ctx.state().buffer_at(point), Some(BufferId::NONE));

        // the device hands the same name out again
        let mut buffer = Buffer::new(&mut ctx, BufferTarget::Uniform, BufferUsage::Dynamic);
        assert_eq!(buffer.id(), old);
        buffer.upload(&mut ctx, &[2.0f32; 4]);
        buffer.bind_base(&mut ctx, 0);

        let device = ctx.device_as::<RecordingDevice>().unwrap();
        let expected: &[u8] = bytemuck::cast_slice(&[2.0f32; 4]);
        assert_eq!(device.buffer_contents(old).unwrap(), expected);
        assert_eq!(device.call_count("bind_buffer_base"), 2);
    }
}
