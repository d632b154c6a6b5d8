//! Custom kernel bodies for `BlurShader::from_wgsl`.

/// A 3-tap box blur that ignores the uploaded taps.
pub const BOX_BLUR_WGSL: &str = r#"
fn box_along(pixel: vec2<u32>, direction: vec2<i32>) {
    let size = textureDimensions(t_output);
    if (pixel.x >= size.x || pixel.y >= size.y) {
        return;
    }

    let max_coord = vec2<i32>(size) - vec2<i32>(1);
    let center = vec2<i32>(pixel);
    var color = vec4<f32>(0.0);
    for (var i = -1; i <= 1; i++) {
        let coord = clamp(center + direction * i, vec2<i32>(0), max_coord);
        color += textureLoad(t_input, coord, 0);
    }
    textureStore(t_output, center, color / 3.0);
}

@compute @workgroup_size(16, 16, 1)
fn blur_horizontal(@builtin(global_invocation_id) gid: vec3<u32>) {
    box_along(gid.xy, vec2<i32>(1, 0));
}

@compute @workgroup_size(16, 16, 1)
fn blur_vertical(@builtin(global_invocation_id) gid: vec3<u32>) {
    box_along(gid.xy, vec2<i32>(0, 1));
}
"#;

/// Declares both entry points but doesn't type-check.
pub const BROKEN_BLUR_WGSL: &str = r#"
@compute @workgroup_size(16, 16, 1)
fn blur_horizontal(@builtin(global_invocation_id) gid: vec3<u32>) {
    textureStore(t_output, gid.xy, undefined_color);
}

@compute @workgroup_size(16, 16, 1)
fn blur_vertical(@builtin(global_invocation_id) gid: vec3<u32>) {
}
"#;

/// Only the horizontal entry point.
pub const HORIZONTAL_ONLY_WGSL: &str = r#"
@compute @workgroup_size(16, 16, 1)
fn blur_horizontal(@builtin(global_invocation_id) gid: vec3<u32>) {
}
// fn blur_vertical() is intentionally missing
"#;
