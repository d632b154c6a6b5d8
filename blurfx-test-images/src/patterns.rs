//! RGBA8 test images, stored as tightly packed rows.

/// Every pixel set to `color`.
pub fn solid(width: u32, height: u32, color: [u8; 4]) -> Vec<u8> {
    color.repeat((width * height) as usize)
}

/// `background` everywhere except a single `dot` pixel at `(x, y)`.
pub fn single_dot(
    width: u32,
    height: u32,
    (x, y): (u32, u32),
    dot: [u8; 4],
    background: [u8; 4],
) -> Vec<u8> {
    let mut pixels = solid(width, height, background);
    let offset = ((y * width + x) * 4) as usize;
    pixels[offset..offset + 4].copy_from_slice(&dot);
    pixels
}

/// Alternating square cells of `cell` pixels, starting with `first` at the origin.
pub fn checkerboard(width: u32, height: u32, cell: u32, first: [u8; 4], second: [u8; 4]) -> Vec<u8> {
    let mut pixels = Vec::with_capacity((width * height * 4) as usize);
    for y in 0..height {
        for x in 0..width {
            let color = if (x / cell + y / cell) % 2 == 0 {
                first
            } else {
                second
            };
            pixels.extend_from_slice(&color);
        }
    }
    pixels
}

/// The left `split` columns are `left`, the rest are `right`.
pub fn vertical_edge(
    width: u32,
    height: u32,
    split: u32,
    left: [u8; 4],
    right: [u8; 4],
) -> Vec<u8> {
    let mut pixels = Vec::with_capacity((width * height * 4) as usize);
    for _ in 0..height {
        for x in 0..width {
            pixels.extend_from_slice(if x < split { &left } else { &right });
        }
    }
    pixels
}
