//! Client-side image work done before an upload: square avatar crops and
//! receipt downsizing. Output is always JPEG.

use std::io::Cursor;

use anyhow::{Context, Result};
use image::{imageops::FilterType, DynamicImage, GenericImageView, ImageOutputFormat};

pub const AVATAR_MAX_SIDE: u32 = 512;
pub const RECEIPT_MAX_SIDE: u32 = 1280;
const JPEG_QUALITY: u8 = 85;

pub const MIN_ZOOM: f32 = 1.0;
pub const MAX_ZOOM: f32 = 3.0;

/// Rectangle in source pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropArea {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CropArea {
    /// Square window for a 1:1 cropper. At zoom 1 the side is the image's
    /// shorter edge; higher zoom shrinks it. `pan_x`/`pan_y` in -1..=1 slide
    /// the window across the free space, 0 keeps it centred.
    pub fn square(img_width: u32, img_height: u32, zoom: f32, pan_x: f32, pan_y: f32) -> Self {
        let zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
        let short = img_width.min(img_height) as f32;
        let side = ((short / zoom).round() as u32).clamp(1, img_width.min(img_height).max(1));

        let offset = |slack: u32, pan: f32| -> u32 {
            let t = (pan.clamp(-1.0, 1.0) + 1.0) / 2.0;
            ((slack as f32 * t).round() as u32).min(slack)
        };

        Self {
            x: offset(img_width.saturating_sub(side), pan_x),
            y: offset(img_height.saturating_sub(side), pan_y),
            width: side,
            height: side,
        }
    }
}

pub fn decode(bytes: &[u8]) -> Result<DynamicImage> {
    image::load_from_memory(bytes).context("file is not a supported image")
}

fn encode_jpeg(img: &DynamicImage) -> Result<Vec<u8>> {
    // JPEG has no alpha channel
    let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
    let mut out = Vec::new();
    rgb.write_to(&mut Cursor::new(&mut out), ImageOutputFormat::Jpeg(JPEG_QUALITY))
        .context("failed to encode JPEG")?;
    Ok(out)
}

fn shrink(img: DynamicImage, max_side: u32) -> DynamicImage {
    if img.width() > max_side || img.height() > max_side {
        img.resize(max_side, max_side, FilterType::Lanczos3)
    } else {
        img
    }
}

pub fn crop_to_jpeg(img: &DynamicImage, area: CropArea, max_side: u32) -> Result<Vec<u8>> {
    let cropped = img.crop_imm(area.x, area.y, area.width, area.height);
    encode_jpeg(&shrink(cropped, max_side))
}

pub fn resize_to_jpeg(bytes: &[u8], max_side: u32) -> Result<Vec<u8>> {
    let img = decode(bytes)?;
    encode_jpeg(&shrink(img, max_side))
}

/// Cropper state for the avatar dialog.
pub struct Cropper {
    pub image: DynamicImage,
    pub zoom: f32,
    pub pan_x: f32,
    pub pan_y: f32,
}

impl Cropper {
    pub fn new(image: DynamicImage) -> Self {
        Self { image, zoom: MIN_ZOOM, pan_x: 0.0, pan_y: 0.0 }
    }

    pub fn zoom_by(&mut self, delta: f32) {
        // keep one decimal like a 0.1-step slider
        self.zoom = ((self.zoom + delta).clamp(MIN_ZOOM, MAX_ZOOM) * 10.0).round() / 10.0;
    }

    pub fn pan_by(&mut self, dx: f32, dy: f32) {
        self.pan_x = (self.pan_x + dx).clamp(-1.0, 1.0);
        self.pan_y = (self.pan_y + dy).clamp(-1.0, 1.0);
    }

    pub fn area(&self) -> CropArea {
        let (w, h) = self.image.dimensions();
        CropArea::square(w, h, self.zoom, self.pan_x, self.pan_y)
    }

    pub fn render(&self) -> Result<Vec<u8>> {
        crop_to_jpeg(&self.image, self.area(), AVATAR_MAX_SIDE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, RgbImage};

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(RgbImage::new(width, height));
        let mut out = Vec::new();
        img.write_to(&mut Cursor::new(&mut out), ImageFormat::Png).unwrap();
        out
    }

    #[test]
    fn zoom_one_is_centred_short_edge() {
        assert_eq!(
            CropArea::square(400, 200, 1.0, 0.0, 0.0),
            CropArea { x: 100, y: 0, width: 200, height: 200 }
        );
    }

    #[test]
    fn zoom_shrinks_the_window() {
        let a = CropArea::square(300, 300, 3.0, 0.0, 0.0);
        assert_eq!(a, CropArea { x: 100, y: 100, width: 100, height: 100 });
    }

    #[test]
    fn pan_reaches_the_edges() {
        assert_eq!(CropArea::square(400, 200, 1.0, -1.0, 0.0).x, 0);
        assert_eq!(CropArea::square(400, 200, 1.0, 1.0, 0.0).x, 200);
        // out-of-range pan and zoom are clamped
        let a = CropArea::square(400, 200, 10.0, 5.0, -5.0);
        assert_eq!(a.width, 67);
        assert_eq!(a.x + a.width, 400);
        assert_eq!(a.y, 0);
    }

    #[test]
    fn cropper_steps() {
        let mut c = Cropper::new(DynamicImage::ImageRgb8(RgbImage::new(10, 10)));
        for _ in 0..30 {
            c.zoom_by(0.1);
        }
        assert_eq!(c.zoom, MAX_ZOOM);
        c.zoom_by(-5.0);
        assert_eq!(c.zoom, MIN_ZOOM);
        c.pan_by(2.0, -0.5);
        assert_eq!((c.pan_x, c.pan_y), (1.0, -0.5));
    }

    #[test]
    fn avatar_is_square_jpeg_within_limit() {
        let img = decode(&png(1200, 800)).unwrap();
        let cropper = Cropper::new(img);
        let jpeg = cropper.render().unwrap();

        let out = decode(&jpeg).unwrap();
        assert_eq!(image::guess_format(&jpeg).unwrap(), ImageFormat::Jpeg);
        assert_eq!(out.dimensions(), (AVATAR_MAX_SIDE, AVATAR_MAX_SIDE));
    }

    #[test]
    fn receipts_keep_aspect_ratio() {
        let jpeg = resize_to_jpeg(&png(2560, 1280), RECEIPT_MAX_SIDE).unwrap();
        assert_eq!(decode(&jpeg).unwrap().dimensions(), (1280, 640));

        let small = resize_to_jpeg(&png(300, 200), RECEIPT_MAX_SIDE).unwrap();
        assert_eq!(decode(&small).unwrap().dimensions(), (300, 200));
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(decode(b"definitely not an image").is_err());
    }
}
