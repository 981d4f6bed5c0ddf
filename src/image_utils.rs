use std::path::Path;

use image::{DynamicImage, GrayImage, Luma, RgbImage};
use ndarray::Array2;

use crate::error::Result;

/// ITU-R BT.601 weights in 14-bit fixed point, as OpenCV applies them.
const LUMA_SHIFT: u32 = 14;
const LUMA_R: u32 = 4899;
const LUMA_G: u32 = 9617;
const LUMA_B: u32 = 1868;

/// Luma conversion with the BT.601 weights, rounded in fixed point so the
/// result matches OpenCV's `BGR2GRAY` level for level.
pub fn rgb_to_gray(image: &RgbImage) -> GrayImage {
    let (width, height) = image.dimensions();
    let mut gray = GrayImage::new(width, height);

    for (x, y, pixel) in image.enumerate_pixels() {
        let lum = LUMA_R * pixel[0] as u32 + LUMA_G * pixel[1] as u32 + LUMA_B * pixel[2] as u32;
        let lum = (lum + (1 << (LUMA_SHIFT - 1))) >> LUMA_SHIFT;
        gray.put_pixel(x, y, Luma([lum.min(255) as u8]));
    }

    gray
}

pub fn gray_to_array(image: &GrayImage) -> Array2<f64> {
    let (width, height) = image.dimensions();
    let mut arr = Array2::zeros((height as usize, width as usize));

    for (x, y, pixel) in image.enumerate_pixels() {
        arr[[y as usize, x as usize]] = pixel[0] as f64;
    }

    arr
}

pub fn array_to_gray(arr: &Array2<f64>) -> GrayImage {
    let (height, width) = arr.dim();
    let mut image = GrayImage::new(width as u32, height as u32);

    for ((y, x), &value) in arr.indexed_iter() {
        image.put_pixel(x as u32, y as u32, Luma([value.round().clamp(0.0, 255.0) as u8]));
    }

    image
}

/// Grayscale raster of any decoded image. Alpha is dropped, 16-bit inputs are
/// reduced to 8 bits first.
pub fn to_gray_raster(image: &DynamicImage) -> Array2<f64> {
    match image {
        DynamicImage::ImageLuma8(gray) => gray_to_array(gray),
        other => gray_to_array(&rgb_to_gray(&other.to_rgb8())),
    }
}

pub fn load_gray_raster<P: AsRef<Path>>(path: P) -> Result<Array2<f64>> {
    let image = image::open(path)?;
    Ok(to_gray_raster(&image))
}
