//! GPU fences

use crate::render::context::{Context, FenceId};

/// A fence polled without blocking
///
/// An unplaced fence never reports completion.
#[derive(Debug, Default)]
pub struct Fence {
    id: Option<FenceId>,
}

impl Fence {
    /// An unplaced fence
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert the fence after all previously issued commands, replacing any earlier placement
    pub fn place(&mut self, ctx: &mut Context) {
        self.release(ctx);
        self.id = Some(ctx.device_mut().fence_sync());
    }

    /// Whether the commands before the fence have completed
    pub fn is_done(&self, ctx: &mut Context) -> bool {
        self.id.is_some_and(|id| ctx.device_mut().fence_signaled(id))
    }

    /// Whether the fence has been placed
    pub fn is_placed(&self) -> bool {
        self.id.is_some()
    }

    /// Delete the device fence
    pub fn release(&mut self, ctx: &mut Context) {
        if let Some(id) = self.id.take() {
            ctx.device_mut().delete_fence(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::UVec2;
    use crate::render::context::RecordingDevice;

    #[test]
    fn test_fence_lifecycle() {
        let mut ctx = Context::new(Box::new(RecordingDevice::new()), UVec2::new(8, 8));
        let mut fence = Fence::new();
        assert!(!fence.is_done(&mut ctx));

        fence.place(&mut ctx);
        assert!(fence.is_placed());
        assert!(!fence.is_done(&mut ctx));

        ctx.device_as_mut::<RecordingDevice>().unwrap().signal_fences();
        assert!(fence.is_done(&mut ctx));

        fence.release(&mut ctx);
        assert!(!fence.is_placed());
        assert_eq!(ctx.device_as::<RecordingDevice>().unwrap().live_fences(), 0);
    }
}
