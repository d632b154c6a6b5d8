/// GPU regression tests for the blur filter.
///
/// These tests use a headless device to blur test images in place, then read
/// the textures back and validate pixels. They return early on machines without
/// a GPU adapter.
///
/// Run with:   cargo test --test blur_regression
use std::sync::Arc;

use blurfx::wgpu;
use blurfx::{
    create_input_texture, read_texture, BlurError, BlurFilter, BlurShader, BlurShaderCache,
    GpuContext, SamplingMode,
};
use blurfx_test_images::{check_pixels, headless_context, patterns, pixel_at, PixelExpectation};

const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;
const BLACK: [u8; 4] = [0, 0, 0, 255];
const WHITE: [u8; 4] = [255, 255, 255, 255];

fn ready_filter(ctx: &GpuContext, width: u32, height: u32) -> BlurFilter {
    let mut filter = BlurFilter::new();
    filter.init(&ctx.device, width, height, FORMAT).unwrap();
    filter.set_shader(BlurShader::new(&ctx.device, FORMAT).unwrap());
    filter
}

fn blur_pixels(ctx: &GpuContext, filter: &BlurFilter, width: u32, height: u32, pixels: &[u8], blur_count: u32) -> Vec<u8> {
    let texture = create_input_texture(&ctx.device, &ctx.queue, width, height, FORMAT, pixels).unwrap();
    filter
        .blur_texture(&ctx.device, &ctx.queue, &texture, blur_count)
        .unwrap();
    read_texture(&ctx.device, &ctx.queue, &texture).unwrap()
}

fn assert_no_failures(failures: Vec<String>) {
    if !failures.is_empty() {
        panic!(
            "{} pixel expectation(s) failed:\n{}",
            failures.len(),
            failures.join("\n"),
        );
    }
}

#[test]
fn zero_blur_count_leaves_input_unchanged() {
    let Some(ctx) = headless_context() else { return };
    let filter = ready_filter(&ctx, 32, 24);

    let pixels = patterns::checkerboard(32, 24, 3, WHITE, BLACK);
    let output = blur_pixels(&ctx, &filter, 32, 24, &pixels, 0);
    assert_eq!(output, pixels);
}

#[test]
fn constant_image_stays_constant() {
    let Some(ctx) = headless_context() else { return };
    let filter = ready_filter(&ctx, 40, 40);

    let color = [100, 150, 200, 255];
    let output = blur_pixels(&ctx, &filter, 40, 40, &patterns::solid(40, 40, color), 3);

    let expectations = [(0, 0), (39, 0), (20, 20), (0, 39), (39, 39), (17, 5)]
        .into_iter()
        .map(|(x, y)| PixelExpectation::new(x, y, color, "constant"))
        .collect::<Vec<_>>();
    assert_no_failures(check_pixels(&output, 40, 40, &expectations));
}

#[test]
fn single_dot_spreads_symmetrically() {
    let Some(ctx) = headless_context() else { return };
    let filter = ready_filter(&ctx, 33, 33);

    let pixels = patterns::single_dot(33, 33, (16, 16), WHITE, BLACK);
    let output = blur_pixels(&ctx, &filter, 33, 33, &pixels, 1);

    let center = pixel_at(&output, 33, 16, 16);
    assert!(center[0] > 0 && center[0] < 255, "center {center:?}");

    let left = pixel_at(&output, 33, 15, 16);
    assert!(left[0] > 0, "left neighbour {left:?}");
    let expectations = vec![
        PixelExpectation::new(17, 16, left, "right_mirrors_left").with_tolerance(1),
        PixelExpectation::new(16, 15, left, "up_mirrors_left").with_tolerance(1),
        PixelExpectation::new(16, 17, left, "down_mirrors_left").with_tolerance(1),
        // Outside the 4-texel radius nothing changes.
        PixelExpectation::new(21, 16, BLACK, "beyond_radius").with_tolerance(0),
        PixelExpectation::new(0, 0, BLACK, "corner").with_tolerance(0),
    ];
    assert_no_failures(check_pixels(&output, 33, 33, &expectations));
}

#[test]
fn zero_radius_is_an_identity() {
    let Some(ctx) = headless_context() else { return };
    let mut filter = ready_filter(&ctx, 24, 24);
    filter.build_weight(0);

    let pixels = patterns::checkerboard(24, 24, 1, WHITE, BLACK);
    let output = blur_pixels(&ctx, &filter, 24, 24, &pixels, 2);

    let diff = output
        .iter()
        .zip(pixels.iter())
        .map(|(&a, &b)| (a as i16 - b as i16).abs())
        .max()
        .unwrap_or(0);
    assert!(diff <= 1, "max channel difference {diff}");
}

#[test]
fn linear_and_discrete_sampling_agree() {
    let Some(ctx) = headless_context() else { return };
    let mut filter = ready_filter(&ctx, 48, 32);
    let pixels = patterns::checkerboard(48, 32, 2, WHITE, [30, 60, 90, 255]);

    filter.set_sampling(SamplingMode::Linear);
    let linear = blur_pixels(&ctx, &filter, 48, 32, &pixels, 2);
    filter.set_sampling(SamplingMode::Discrete);
    let discrete = blur_pixels(&ctx, &filter, 48, 32, &pixels, 2);

    let diff = linear
        .iter()
        .zip(discrete.iter())
        .map(|(&a, &b)| (a as i16 - b as i16).abs())
        .max()
        .unwrap_or(0);
    assert!(diff <= 3, "max channel difference {diff}");
}

#[test]
fn explicit_weights_are_used() {
    let Some(ctx) = headless_context() else { return };
    let mut filter = ready_filter(&ctx, 16, 16);
    // Only the texel one step back contributes: each pass shifts by one texel.
    filter.set_weights([0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0]);

    let pixels = patterns::single_dot(16, 16, (5, 5), WHITE, BLACK);
    let output = blur_pixels(&ctx, &filter, 16, 16, &pixels, 1);

    let expectations = vec![
        PixelExpectation::new(6, 6, WHITE, "shifted_dot").with_tolerance(1),
        PixelExpectation::new(5, 5, BLACK, "original_dot").with_tolerance(1),
    ];
    assert_no_failures(check_pixels(&output, 16, 16, &expectations));
}

#[test]
fn init_resizes_intermediate_target() {
    let Some(ctx) = headless_context() else { return };
    let mut filter = BlurFilter::new();

    filter.init(&ctx.device, 16, 16, FORMAT).unwrap();
    let first = filter.blurred_output().unwrap();
    assert_eq!(first.size(), (16, 16));
    assert_eq!(first.texture().width(), 16);

    filter.init(&ctx.device, 40, 24, FORMAT).unwrap();
    let resized = filter.blurred_output().unwrap();
    assert_eq!(resized.size(), (40, 24));
    assert_eq!(resized.texture().width(), 40);
    assert_eq!(resized.texture().height(), 24);
    assert_eq!(filter.dimensions(), Some((40, 24)));

    filter
        .init(&ctx.device, 40, 24, wgpu::TextureFormat::Rgba16Float)
        .unwrap();
    let reformatted = filter.blurred_output().unwrap();
    assert_eq!(reformatted.format(), wgpu::TextureFormat::Rgba16Float);
    assert_eq!(reformatted.texture().format(), wgpu::TextureFormat::Rgba16Float);
}

#[test]
fn init_rejects_bad_targets_and_keeps_the_old_one() {
    let Some(ctx) = headless_context() else { return };
    let mut filter = BlurFilter::new();
    filter.init(&ctx.device, 8, 8, FORMAT).unwrap();

    assert!(matches!(
        filter.init(&ctx.device, 0, 8, FORMAT),
        Err(BlurError::ZeroSize { width: 0, height: 8 })
    ));
    assert!(matches!(
        filter.init(&ctx.device, 8, 8, wgpu::TextureFormat::Bgra8UnormSrgb),
        Err(BlurError::UnsupportedFormat(_))
    ));
    assert_eq!(filter.dimensions(), Some((8, 8)));
    assert_eq!(filter.format(), Some(FORMAT));
}

#[test]
fn blur_reports_misuse() {
    let Some(ctx) = headless_context() else { return };
    let pixels = patterns::solid(16, 16, WHITE);
    let texture = create_input_texture(&ctx.device, &ctx.queue, 16, 16, FORMAT, &pixels).unwrap();

    let mut filter = BlurFilter::new();
    assert!(matches!(
        filter.blur_texture(&ctx.device, &ctx.queue, &texture, 1),
        Err(BlurError::NotInitialized)
    ));

    filter.init(&ctx.device, 16, 16, FORMAT).unwrap();
    assert!(matches!(
        filter.blur_texture(&ctx.device, &ctx.queue, &texture, 1),
        Err(BlurError::ShaderNotSet)
    ));

    filter.set_shader(BlurShader::new(&ctx.device, wgpu::TextureFormat::Rgba16Float).unwrap());
    assert!(matches!(
        filter.blur_texture(&ctx.device, &ctx.queue, &texture, 1),
        Err(BlurError::ShaderFormatMismatch { .. })
    ));

    filter.set_shader(BlurShader::new(&ctx.device, FORMAT).unwrap());
    filter.init(&ctx.device, 20, 16, FORMAT).unwrap();
    assert!(matches!(
        filter.blur_texture(&ctx.device, &ctx.queue, &texture, 1),
        Err(BlurError::DimensionMismatch {
            expected: (20, 16),
            actual: (16, 16)
        })
    ));

    let sampled_only = ctx.device.create_texture(&wgpu::TextureDescriptor {
        label: Some("sampled_only"),
        size: wgpu::Extent3d {
            width: 20,
            height: 16,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: FORMAT,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    match filter.blur_texture(&ctx.device, &ctx.queue, &sampled_only, 1) {
        Err(BlurError::MissingUsage(missing)) => {
            assert_eq!(missing, wgpu::TextureUsages::STORAGE_BINDING)
        }
        other => panic!("expected MissingUsage, got {other:?}"),
    }
}

#[test]
fn layered_textures_are_rejected() {
    let Some(ctx) = headless_context() else { return };
    let filter = ready_filter(&ctx, 8, 8);
    let layered = ctx.device.create_texture(&wgpu::TextureDescriptor {
        label: Some("layered"),
        size: wgpu::Extent3d {
            width: 8,
            height: 8,
            depth_or_array_layers: 2,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: FORMAT,
        usage: blurfx::BLUR_INPUT_USAGES,
        view_formats: &[],
    });

    assert!(matches!(
        filter.blur_texture(&ctx.device, &ctx.queue, &layered, 1),
        Err(BlurError::NotSingleLayer2d {
            dimension: wgpu::TextureDimension::D2,
            layers: 2
        })
    ));
}

#[test]
fn format_mismatch_is_reported() {
    let Some(ctx) = headless_context() else { return };
    let filter = ready_filter(&ctx, 4, 4);
    let half_float = vec![0u8; 4 * 4 * 8];
    let texture = create_input_texture(
        &ctx.device,
        &ctx.queue,
        4,
        4,
        wgpu::TextureFormat::Rgba16Float,
        &half_float,
    )
    .unwrap();

    assert!(matches!(
        filter.blur_texture(&ctx.device, &ctx.queue, &texture, 1),
        Err(BlurError::FormatMismatch { .. })
    ));
}

#[test]
fn half_float_textures_blur() {
    let Some(ctx) = headless_context() else { return };
    let format = wgpu::TextureFormat::Rgba16Float;
    let mut filter = BlurFilter::new();
    filter.init(&ctx.device, 8, 8, format).unwrap();
    filter.set_shader(BlurShader::new(&ctx.device, format).unwrap());

    let zeros = vec![0u8; 8 * 8 * 8];
    let texture = create_input_texture(&ctx.device, &ctx.queue, 8, 8, format, &zeros).unwrap();
    filter
        .blur_texture(&ctx.device, &ctx.queue, &texture, 2)
        .unwrap();

    let output = read_texture(&ctx.device, &ctx.queue, &texture).unwrap();
    assert_eq!(output, zeros);
}

#[test]
fn custom_kernel_replaces_the_builtin_one() {
    let Some(ctx) = headless_context() else { return };
    let shader = futures::executor::block_on(BlurShader::from_wgsl(
        &ctx.device,
        FORMAT,
        blurfx_test_images::shaders::BOX_BLUR_WGSL,
    ))
    .unwrap();

    let mut filter = BlurFilter::new();
    filter.init(&ctx.device, 16, 4, FORMAT).unwrap();
    filter.set_shader(shader);

    let pixels = patterns::vertical_edge(16, 4, 8, BLACK, WHITE);
    let output = blur_pixels(&ctx, &filter, 16, 4, &pixels, 1);

    // A 3-tap box only reaches one texel across the edge.
    let expectations = vec![
        PixelExpectation::new(6, 2, BLACK, "left_untouched"),
        PixelExpectation::new(7, 2, [85, 85, 85, 255], "left_of_edge"),
        PixelExpectation::new(8, 2, [170, 170, 170, 255], "right_of_edge"),
        PixelExpectation::new(9, 2, WHITE, "right_untouched"),
    ];
    assert_no_failures(check_pixels(&output, 16, 4, &expectations));
}

#[test]
fn invalid_custom_kernels_are_rejected() {
    let Some(ctx) = headless_context() else { return };

    let missing = futures::executor::block_on(BlurShader::from_wgsl(
        &ctx.device,
        FORMAT,
        blurfx_test_images::shaders::HORIZONTAL_ONLY_WGSL,
    ));
    assert!(matches!(missing, Err(BlurError::MissingEntryPoint("blur_vertical"))));

    let broken = futures::executor::block_on(BlurShader::from_wgsl(
        &ctx.device,
        FORMAT,
        blurfx_test_images::shaders::BROKEN_BLUR_WGSL,
    ));
    assert!(matches!(broken, Err(BlurError::ShaderCompilation(_))));
}

#[test]
fn shader_cache_compiles_once_per_format() {
    let Some(ctx) = headless_context() else { return };
    let mut cache = BlurShaderCache::new();

    let first = cache.get_or_create(&ctx.device, FORMAT).unwrap();
    let second = cache.get_or_create(&ctx.device, FORMAT).unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(cache.len(), 1);

    cache
        .get_or_create(&ctx.device, wgpu::TextureFormat::Rgba16Float)
        .unwrap();
    assert_eq!(cache.len(), 2);

    assert!(cache
        .get_or_create(&ctx.device, wgpu::TextureFormat::Rgba32Float)
        .is_err());
    assert_eq!(cache.len(), 2);

    // Shared shaders can drive several filters.
    let mut filter = BlurFilter::new();
    filter.init(&ctx.device, 8, 8, FORMAT).unwrap();
    filter.set_shader(first);
    let output = blur_pixels(&ctx, &filter, 8, 8, &patterns::solid(8, 8, WHITE), 1);
    assert_eq!(pixel_at(&output, 8, 4, 4), WHITE);
}
