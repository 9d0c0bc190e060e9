use image::{imageops, imageops::FilterType, Rgb, RgbImage};
use ndarray::Array4;

/// Square input edge of the YOLOv8 export.
pub const INPUT_SIZE: u32 = 640;

/// Padding color used by the ultralytics letterbox.
const PAD_VALUE: u8 = 114;

/// Geometry of a letterbox transform, needed to map boxes back onto the
/// original image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Letterbox {
    pub scale: f32,
    pub pad_x: f32,
    pub pad_y: f32,
    pub orig_width: u32,
    pub orig_height: u32,
}

impl Letterbox {
    pub fn new(orig_width: u32, orig_height: u32, target: u32) -> Self {
        let scale = (target as f32 / orig_width as f32).min(target as f32 / orig_height as f32);
        let (new_w, new_h) = scaled_size(orig_width, orig_height, scale, target);
        Self {
            scale,
            pad_x: ((target - new_w) / 2) as f32,
            pad_y: ((target - new_h) / 2) as f32,
            orig_width,
            orig_height,
        }
    }

    /// Map an `[x1, y1, x2, y2]` box from letterbox space to original pixels,
    /// clamped to the image bounds.
    pub fn unmap(&self, [x1, y1, x2, y2]: [f32; 4]) -> [f32; 4] {
        let max_x = self.orig_width as f32;
        let max_y = self.orig_height as f32;
        let ux = |x: f32| ((x - self.pad_x) / self.scale).clamp(0.0, max_x);
        let uy = |y: f32| ((y - self.pad_y) / self.scale).clamp(0.0, max_y);
        [ux(x1), uy(y1), ux(x2), uy(y2)]
    }
}

fn scaled_size(width: u32, height: u32, scale: f32, target: u32) -> (u32, u32) {
    let w = ((width as f32 * scale).round() as u32).clamp(1, target);
    let h = ((height as f32 * scale).round() as u32).clamp(1, target);
    (w, h)
}

/// Resize with preserved aspect ratio, center on a gray square canvas, and
/// produce a `[1, 3, H, W]` tensor scaled to `[0, 1]`.
pub fn letterbox(image: &RgbImage, target: u32) -> (Array4<f32>, Letterbox) {
    let geometry = Letterbox::new(image.width(), image.height(), target);
    let (new_w, new_h) = scaled_size(image.width(), image.height(), geometry.scale, target);

    let resized = imageops::resize(image, new_w, new_h, FilterType::Triangle);
    let mut canvas = RgbImage::from_pixel(target, target, Rgb([PAD_VALUE; 3]));
    imageops::overlay(
        &mut canvas,
        &resized,
        geometry.pad_x as i64,
        geometry.pad_y as i64,
    );

    let size = target as usize;
    let mut tensor = Array4::<f32>::zeros((1, 3, size, size));
    for (x, y, pixel) in canvas.enumerate_pixels() {
        for c in 0..3 {
            tensor[[0, c, y as usize, x as usize]] = pixel[c] as f32 / 255.0;
        }
    }

    (tensor, geometry)
}
