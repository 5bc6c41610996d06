//! Block pixelation sampled from the unannotated canvas

use tiny_skia::Pixmap;

use crate::domain::Bounds;

/// Number of blocks across and down for a region of `width` x `height`
pub fn block_grid(width: u32, height: u32, scale: f32) -> (u32, u32) {
    let scale = scale.max(1.0);
    (
        ((width as f32 / scale).floor() as u32).max(1),
        ((height as f32 / scale).floor() as u32).max(1),
    )
}

/// Pixelate `region` of `target`, averaging each block over `source`.
///
/// The region is downsampled to the block grid and expanded back with
/// nearest-neighbor, so every block is a flat color.
pub fn pixelate(target: &mut Pixmap, source: &Pixmap, region: Bounds, scale: f32) {
    let max_x = target.width().min(source.width()) as f32;
    let max_y = target.height().min(source.height()) as f32;
    let x0 = region.min_x.round().clamp(0.0, max_x) as u32;
    let y0 = region.min_y.round().clamp(0.0, max_y) as u32;
    let x1 = region.max_x.round().clamp(0.0, max_x) as u32;
    let y1 = region.max_y.round().clamp(0.0, max_y) as u32;
    if x1 <= x0 || y1 <= y0 {
        return;
    }
    let (width, height) = (x1 - x0, y1 - y0);
    let (cols, rows) = block_grid(width, height, scale);

    let stride = source.width() as usize;
    let src = source.pixels();
    let mut blocks = Vec::with_capacity((cols * rows) as usize);

    // Average each block
    for row in 0..rows {
        let by0 = y0 + row * height / rows;
        let by1 = y0 + (row + 1) * height / rows;
        for col in 0..cols {
            let bx0 = x0 + col * width / cols;
            let bx1 = x0 + (col + 1) * width / cols;

            let mut total = [0u64; 4];
            let mut count = 0u64;
            for py in by0..by1 {
                for px in bx0..bx1 {
                    let p = src[py as usize * stride + px as usize];
                    total[0] += p.red() as u64;
                    total[1] += p.green() as u64;
                    total[2] += p.blue() as u64;
                    total[3] += p.alpha() as u64;
                    count += 1;
                }
            }
            let count = count.max(1);
            let avg = tiny_skia::PremultipliedColorU8::from_rgba(
                (total[0] / count) as u8,
                (total[1] / count) as u8,
                (total[2] / count) as u8,
                (total[3] / count) as u8,
            );
            blocks.push(avg.unwrap_or(tiny_skia::PremultipliedColorU8::TRANSPARENT));
        }
    }

    // Expand back with nearest-neighbor
    let stride = target.width() as usize;
    let dst = target.pixels_mut();
    for py in y0..y1 {
        let row = ((py - y0) * rows / height).min(rows - 1);
        for px in x0..x1 {
            let col = ((px - x0) * cols / width).min(cols - 1);
            dst[py as usize * stride + px as usize] = blocks[(row * cols + col) as usize];
        }
    }
}
