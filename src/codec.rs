use image::{FilterType, GenericImage, RgbImage};
use ndarray::{ArrayD, IxDyn};

use crate::constants::codec;
use crate::error::{Result, StyleError};

/// Decodes image bytes to a [3, H, W] tensor in [0, 1], resizing the shorter
/// spatial side to the fixed decode resolution.
pub fn decode_image(bytes: &[u8]) -> Result<ArrayD<f32>> {
	decode_image_with_short_side(bytes, codec::SHORT_SIDE)
}

/// As `decode_image` with an explicit short-side target.
pub fn decode_image_with_short_side(bytes: &[u8], short_side: u32) -> Result<ArrayD<f32>> {
	if short_side == 0 {
		return Err(StyleError::InvalidParameter("short side target must be positive".into()));
	}
	let image = image::load_from_memory(bytes)?;
	let (width, height) = image.dimensions();
	let (new_width, new_height) = resize_dimensions(width, height, short_side);
	let resized = if (new_width, new_height) == (width, height) {
		image
	} else {
		image.resize_exact(new_width, new_height, FilterType::Triangle)
	};
	image_to_tensor(&resized.to_rgb())
}

/// Scales the longer side to preserve aspect ratio, rounding to the nearest
/// pixel. No cropping.
fn resize_dimensions(width: u32, height: u32, short_side: u32) -> (u32, u32) {
	if width <= height {
		let scaled = (f64::from(height) * f64::from(short_side) / f64::from(width)).round() as u32;
		(short_side, scaled.max(1))
	} else {
		let scaled = (f64::from(width) * f64::from(short_side) / f64::from(height)).round() as u32;
		(scaled.max(1), short_side)
	}
}

/// Converts an RGB image to a [3, H, W] float tensor in [0, 1].
pub fn image_to_tensor(image: &RgbImage) -> Result<ArrayD<f32>> {
	let (width, height) = image.dimensions();
	let (w, h) = (width as usize, height as usize);
	let plane = h * w;
	let mut data = vec![0.0f32; 3 * plane];
	for (x, y, pixel) in image.enumerate_pixels() {
		let idx = y as usize * w + x as usize;
		data[idx] = f32::from(pixel.data[0]) / 255.0;
		data[plane + idx] = f32::from(pixel.data[1]) / 255.0;
		data[2 * plane + idx] = f32::from(pixel.data[2]) / 255.0;
	}
	ArrayD::from_shape_vec(IxDyn(&[3, h, w]), data)
		.map_err(|_| StyleError::Shape("image tensor shape mismatch".into()))
}

/// Converts a [3, H, W] tensor to an RGB image, clamping values into [0, 1].
pub fn tensor_to_image(tensor: &ArrayD<f32>) -> Result<RgbImage> {
	let shape = tensor.shape();
	if shape.len() != 3 || shape[0] != 3 {
		return Err(StyleError::Shape(format!(
			"expected a [3, H, W] image tensor, got {:?}",
			shape
		)));
	}
	let (h, w) = (shape[1], shape[2]);
	let mut data = vec![0u8; 3 * h * w];
	for y in 0..h {
		for x in 0..w {
			for c in 0..3 {
				let value = tensor[[c, y, x]].max(0.0).min(1.0);
				data[(y * w + x) * 3 + c] = (value * 255.0).round() as u8;
			}
		}
	}
	RgbImage::from_raw(w as u32, h as u32, data)
		.ok_or_else(|| StyleError::Shape("image buffer size mismatch".into()))
}

/// Serializes a [3, H, W] tensor as JPEG suitable for chat delivery. Lossy by
/// design.
pub fn encode_jpeg(tensor: &ArrayD<f32>) -> Result<Vec<u8>> {
	let image = tensor_to_image(tensor)?;
	let (width, height) = image.dimensions();
	let mut out = Vec::new();
	image::jpeg::JPEGEncoder::new_with_quality(&mut out, codec::JPEG_QUALITY)
		.encode(&image, width, height, image::ColorType::RGB(8))?;
	Ok(out)
}

/// Serializes a [3, H, W] tensor as PNG (used for file output from the CLI).
pub fn encode_png(tensor: &ArrayD<f32>) -> Result<Vec<u8>> {
	let image = tensor_to_image(tensor)?;
	let (width, height) = image.dimensions();
	let mut out = Vec::new();
	image::png::PNGEncoder::new(&mut out).encode(&image, width, height, image::ColorType::RGB(8))?;
	Ok(out)
}
