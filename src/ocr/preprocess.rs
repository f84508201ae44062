use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage, Luma};

/// Prepare a frame for OCR: grayscale, binarize at `threshold`, 3x3 median
/// denoise, then upscale 2x.
pub fn preprocess(image: &DynamicImage, threshold: u8) -> GrayImage {
    let gray = image.to_luma8();
    let binary = binarize(&gray, threshold);
    let denoised = median3x3(&binary);
    let (w, h) = denoised.dimensions();
    imageops::resize(&denoised, w * 2, h * 2, FilterType::Lanczos3)
}

/// Pixels darker than `threshold` become black, everything else white.
pub fn binarize(gray: &GrayImage, threshold: u8) -> GrayImage {
    let mut out = gray.clone();
    for pixel in out.pixels_mut() {
        pixel.0[0] = if pixel.0[0] < threshold { 0 } else { 255 };
    }
    out
}

/// Median over each pixel's 3x3 neighbourhood, edges clamped.
pub fn median3x3(gray: &GrayImage) -> GrayImage {
    let (w, h) = gray.dimensions();
    if w == 0 || h == 0 {
        return gray.clone();
    }
    GrayImage::from_fn(w, h, |x, y| {
        let mut window = [0u8; 9];
        let mut n = 0;
        for dy in -1i64..=1 {
            for dx in -1i64..=1 {
                let sx = (x as i64 + dx).clamp(0, w as i64 - 1) as u32;
                let sy = (y as i64 + dy).clamp(0, h as i64 - 1) as u32;
                window[n] = gray.get_pixel(sx, sy).0[0];
                n += 1;
            }
        }
        window.sort_unstable();
        Luma([window[4]])
    })
}
