use log::debug;
use ndarray::{ArrayD, Ix4, IxDyn};

use crate::adain;
use crate::codec;
use crate::coral;
use crate::error::{Result, StyleError};
use crate::network::StyleTransferNetwork;
use crate::ops;
use crate::validation;

/// Runs the full AdaIN pipeline on decoded [N, 3, H, W] image batches:
/// encode both images to relu4_1, re-statistic the content features with the
/// style features, blend by alpha, decode, and clamp into [0, 1]. The output
/// matches the content batch's spatial shape. Pure inference; the network is
/// never mutated.
pub fn style_transfer(
	network: &StyleTransferNetwork,
	content: &ArrayD<f32>,
	style: &ArrayD<f32>,
	alpha: f32,
) -> Result<ArrayD<f32>> {
	validation::validate_alpha(alpha)?;

	let content_feat = network.encoder().encode(content)?;
	let style_feat = network.encoder().encode(style)?;
	let blended = adain::stylize_features(&content_feat, &style_feat, alpha)?;
	let decoded = network.decoder().decode(&blended)?;

	// Ceiling-mode pooling rounds odd sizes up on the way down, so the
	// decoder can overshoot the content size by a few pixels.
	let mut output = crop_to_match(decoded, content)?;
	ops::clamp_unit(&mut output);
	Ok(output)
}

/// The inference entrypoint consumed by the delivery layer: bytes in, JPEG
/// bytes out. With `preserve_colors` the style image's palette is aligned to
/// the content image before any feature extraction.
pub fn process_images(
	network: &StyleTransferNetwork,
	content_bytes: &[u8],
	style_bytes: &[u8],
	alpha: f32,
	preserve_colors: bool,
) -> Result<Vec<u8>> {
	let image = stylize_image_bytes(network, content_bytes, style_bytes, alpha, preserve_colors)?;
	codec::encode_jpeg(&image)
}

/// As `process_images`, but stops at the stylized [3, H, W] tensor so the
/// caller can choose the output encoding.
pub fn stylize_image_bytes(
	network: &StyleTransferNetwork,
	content_bytes: &[u8],
	style_bytes: &[u8],
	alpha: f32,
	preserve_colors: bool,
) -> Result<ArrayD<f32>> {
	validation::validate_alpha(alpha)?;

	let content = codec::decode_image(content_bytes)?;
	let mut style = codec::decode_image(style_bytes)?;
	debug!(
		"stylizing {:?} content against {:?} style with {} (alpha {}, preserve colors {})",
		content.shape(),
		style.shape(),
		network,
		alpha,
		preserve_colors
	);

	if preserve_colors {
		style = coral::coral(&style, &content)?;
	}

	let content = add_batch_axis(content)?;
	let style = add_batch_axis(style)?;
	let output = style_transfer(network, &content, &style, alpha)?;
	drop_batch_axis(output)
}

fn add_batch_axis(image: ArrayD<f32>) -> Result<ArrayD<f32>> {
	let shape = image.shape().to_vec();
	if shape.len() != 3 {
		return Err(StyleError::Shape(format!(
			"expected a [3, H, W] image tensor, got {:?}",
			shape
		)));
	}
	image
		.into_shape(IxDyn(&[1, shape[0], shape[1], shape[2]]))
		.map_err(|_| StyleError::Shape("cannot add batch dimension".into()))
}

fn drop_batch_axis(batch: ArrayD<f32>) -> Result<ArrayD<f32>> {
	let shape = batch.shape().to_vec();
	if shape.len() != 4 || shape[0] != 1 {
		return Err(StyleError::Shape(format!(
			"expected a single-image [1, C, H, W] batch, got {:?}",
			shape
		)));
	}
	batch
		.into_shape(IxDyn(&[shape[1], shape[2], shape[3]]))
		.map_err(|_| StyleError::Shape("cannot drop batch dimension".into()))
}

fn crop_to_match(decoded: ArrayD<f32>, content: &ArrayD<f32>) -> Result<ArrayD<f32>> {
	let content_shape = content.shape().to_vec();
	if content_shape.len() != 4 {
		return Err(StyleError::Shape(format!(
			"expected a [N, 3, H, W] content batch, got {:?}",
			content_shape
		)));
	}
	let (target_h, target_w) = (content_shape[2], content_shape[3]);
	let decoded4 = decoded
		.into_dimensionality::<Ix4>()
		.map_err(|_| StyleError::Shape("decoded output is not 4-dimensional".into()))?;
	let (batch, chans, h, w) = decoded4.dim();
	if h < target_h || w < target_w {
		return Err(StyleError::Shape(format!(
			"decoded output {}x{} is smaller than the content {}x{}",
			h, w, target_h, target_w
		)));
	}
	if (h, w) == (target_h, target_w) {
		let shape = decoded4.dim();
		return decoded4
			.into_shape(IxDyn(&[shape.0, shape.1, shape.2, shape.3]))
			.map_err(|_| StyleError::Shape("decoded output shape mismatch".into()));
	}
	let cropped = decoded4.slice(s![.., .., 0..target_h, 0..target_w]).to_owned();
	cropped
		.into_shape(IxDyn(&[batch, chans, target_h, target_w]))
		.map_err(|_| StyleError::Shape("cropped output shape mismatch".into()))
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::decoder::{Decoder, DECODER_LAYERS};
	use crate::encoder::{VggEncoder, ENCODER_LAYERS};
	use crate::NetworkDescription;
	use indexmap::IndexMap;
	use ndarray::{ArrayD, IxDyn};
	use std::sync::Arc;

	fn zero_description(layers: &[(&str, usize, usize, usize)]) -> NetworkDescription {
		let mut parameters = IndexMap::new();
		for &(name, in_c, out_c, kernel) in layers {
			parameters.insert(
				format!("{}.weight", name),
				ArrayD::zeros(IxDyn(&[out_c, in_c, kernel, kernel])),
			);
			parameters.insert(format!("{}.bias", name), ArrayD::zeros(IxDyn(&[out_c])));
		}
		NetworkDescription::new(parameters)
	}

	fn zero_network() -> StyleTransferNetwork {
		let encoder = Arc::new(VggEncoder::from_weights(&zero_description(&ENCODER_LAYERS)).unwrap());
		let decoder = Decoder::from_weights(&zero_description(&DECODER_LAYERS)).unwrap();
		StyleTransferNetwork::new(encoder, decoder, "zero-initialized network")
	}

	#[test]
	fn output_matches_content_shape_even_for_odd_sizes() {
		let network = zero_network();
		// 12 is not divisible by 8, so the decoder overshoots and the
		// output must be cropped back.
		let content = ArrayD::zeros(IxDyn(&[1, 3, 12, 12]));
		let style = ArrayD::zeros(IxDyn(&[1, 3, 16, 16]));
		let output = style_transfer(&network, &content, &style, 1.0).unwrap();
		assert_eq!(output.shape(), &[1, 3, 12, 12]);
	}

	#[test]
	fn output_is_clamped_to_unit_range() {
		let network = zero_network();
		let content = ArrayD::from_elem(IxDyn(&[1, 3, 8, 8]), 0.75);
		let style = ArrayD::from_elem(IxDyn(&[1, 3, 8, 8]), 0.25);
		let output = style_transfer(&network, &content, &style, 0.5).unwrap();
		assert!(output.iter().all(|&v| v >= 0.0 && v <= 1.0));
	}

	#[test]
	fn invalid_alpha_fails_before_any_network_work() {
		let network = zero_network();
		let content = ArrayD::zeros(IxDyn(&[1, 3, 8, 8]));
		let style = ArrayD::zeros(IxDyn(&[1, 3, 8, 8]));
		match style_transfer(&network, &content, &style, 1.25) {
			Err(StyleError::InvalidParameter(_)) => {},
			other => panic!("expected invalid parameter error, got {:?}", other.map(|_| ())),
		}
	}

	#[test]
	fn pipeline_output_encodes_as_jpeg() {
		let network = zero_network();
		let content = crate::codec::encode_png(&ArrayD::from_elem(IxDyn(&[3, 10, 12]), 0.4)).unwrap();
		let style = crate::codec::encode_png(&ArrayD::from_elem(IxDyn(&[3, 12, 10]), 0.6)).unwrap();
		// Decode at a small working resolution here; process_images itself
		// (fixed 512 short side) is exercised in the integration tests.
		let content_t = crate::codec::decode_image_with_short_side(&content, 10).unwrap();
		let style_t = crate::codec::decode_image_with_short_side(&style, 10).unwrap();
		let content_b = add_batch_axis(content_t).unwrap();
		let style_b = add_batch_axis(style_t).unwrap();
		let output = style_transfer(&network, &content_b, &style_b, 1.0).unwrap();
		let image = drop_batch_axis(output).unwrap();
		let jpeg = crate::codec::encode_jpeg(&image).unwrap();
		assert!(crate::codec::decode_image_with_short_side(&jpeg, 10).is_ok());
	}
}
