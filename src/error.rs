use thiserror::Error;

/// Errors that can occur when configuring or dispatching a blur.
#[derive(Debug, Clone, Error)]
pub enum BlurError {
    /// Gaussian sigma must be finite and strictly positive.
    #[error("Gaussian sigma must be a positive finite number, got {0}")]
    InvalidSigma(f32),
    /// The intermediate texture can't be zero-sized.
    #[error("Blur target must have non-zero dimensions, got {width}x{height}")]
    ZeroSize { width: u32, height: u32 },
    /// The format can't be used as both a filterable texture and a storage texture.
    #[error("Texture format {0:?} is not supported by the blur filter")]
    UnsupportedFormat(wgpu::TextureFormat),
    /// `init()` has not been called yet.
    #[error("Blur filter has not been initialized")]
    NotInitialized,
    /// `set_shader()` has not been called yet.
    #[error("No blur shader has been set")]
    ShaderNotSet,
    /// The installed shader writes a different storage format than the filter uses.
    #[error("Blur shader was compiled for {shader:?} but the filter uses {filter:?}")]
    ShaderFormatMismatch {
        shader: wgpu::TextureFormat,
        filter: wgpu::TextureFormat,
    },
    /// The input texture size differs from the size passed to `init()`.
    #[error("Input texture is {actual:?} but the filter was initialized for {expected:?}")]
    DimensionMismatch {
        expected: (u32, u32),
        actual: (u32, u32),
    },
    /// The input texture format differs from the format passed to `init()`.
    #[error("Input texture format is {actual:?} but the filter was initialized for {expected:?}")]
    FormatMismatch {
        expected: wgpu::TextureFormat,
        actual: wgpu::TextureFormat,
    },
    /// Only single-layer 2D textures can be blurred.
    #[error("Input texture must be a single-layer 2D texture, got {dimension:?} with {layers} layers")]
    NotSingleLayer2d {
        dimension: wgpu::TextureDimension,
        layers: u32,
    },
    /// The input texture lacks usages needed to sample from and store into it.
    #[error("Input texture is missing required usages {0:?}")]
    MissingUsage(wgpu::TextureUsages),
    /// A custom blur kernel does not declare a required entry point.
    #[error("Blur shader source does not declare entry point `{0}`")]
    MissingEntryPoint(&'static str),
    /// The WGSL source failed to compile. Contains the error message from wgpu/naga.
    #[error("Blur WGSL compilation failed: {0}")]
    ShaderCompilation(String),
    /// Pixel data does not cover the texture exactly.
    #[error("Expected {expected} bytes of pixel data, got {actual}")]
    PixelDataSize { expected: usize, actual: usize },
    /// Copying a texture back to the CPU failed.
    #[error("Texture readback failed: {0}")]
    Readback(String),
}
