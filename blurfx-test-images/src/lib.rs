pub mod expectations;
pub mod patterns;
pub mod shaders;

pub use expectations::{check_pixels, pixel_at, PixelExpectation};

/// A headless GPU context, or `None` on machines without a usable adapter.
///
/// GPU tests call this first and return early when it yields `None`.
pub fn headless_context() -> Option<blurfx::GpuContext> {
    let ctx = futures::executor::block_on(blurfx::GpuContext::try_new_headless());
    if ctx.is_none() {
        eprintln!("no GPU adapter available, skipping GPU test");
    }
    ctx
}
