//! Separable Gaussian blur for `wgpu` textures.
//!
//! [`BlurFilter`] blurs a texture in place with pairs of compute passes: a
//! horizontal pass into an intermediate texture and a vertical pass back into the
//! input. Kernels have nine taps and are either Gaussian or set explicitly.
//!
//! ```no_run
//! # async fn run() -> Result<(), blurfx::BlurError> {
//! let ctx = blurfx::GpuContext::try_new_headless().await.expect("no GPU adapter");
//! let format = blurfx::wgpu::TextureFormat::Rgba8Unorm;
//! let pixels = vec![255u8; 64 * 64 * 4];
//! let texture = blurfx::create_input_texture(&ctx.device, &ctx.queue, 64, 64, format, &pixels)?;
//!
//! let mut filter = blurfx::BlurFilter::new();
//! filter.set_gaussian_weights(2.0)?;
//! filter.init(&ctx.device, 64, 64, format)?;
//! filter.set_shader(blurfx::BlurShader::new(&ctx.device, format)?);
//! filter.blur_texture(&ctx.device, &ctx.queue, &texture, 3)?;
//!
//! let blurred = blurfx::read_texture(&ctx.device, &ctx.queue, &texture)?;
//! # let _ = blurred;
//! # Ok(())
//! # }
//! ```

pub use wgpu;

mod context;
mod error;
mod filter;
mod readback;
mod shader;
mod weights;

pub use context::GpuContext;
pub use error::BlurError;
pub use filter::{BlurConfig, BlurFilter, BlurTarget, BLUR_INPUT_USAGES, DEFAULT_SIGMA};
pub use readback::{create_input_texture, read_texture};
pub use shader::{
    storage_format_name, BlurShader, BlurShaderCache, DEFAULT_BLUR_WGSL, HORIZONTAL_ENTRY_POINT,
    VERTICAL_ENTRY_POINT, WORKGROUP_SIZE,
};
pub use weights::{BlurWeights, SamplingMode, Tap, Taps, KERNEL_TAPS, MAX_RADIUS};
