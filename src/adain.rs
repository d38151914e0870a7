use ndarray::{Array2, ArrayD, Ix4, IxDyn, Zip};

use crate::constants::network;
use crate::error::{Result, StyleError};

/// Per-(sample, channel) mean and standard deviation over the spatial
/// dimensions of a [N, C, H, W] feature map. The variance gets a small
/// epsilon before the square root so constant channels stay finite.
pub fn calc_mean_std(feat: &ArrayD<f32>) -> Result<(Array2<f32>, Array2<f32>)> {
	let feat = feat
		.view()
		.into_dimensionality::<Ix4>()
		.map_err(|_| StyleError::Shape(format!("expected a [N, C, H, W] feature map, got {:?}", feat.shape())))?;
	let (batch, chans, height, width) = feat.dim();
	let count = height * width;
	if count == 0 {
		return Err(StyleError::Shape("feature map has no spatial extent".into()));
	}

	let mut mean = Array2::<f32>::zeros((batch, chans));
	let mut std = Array2::<f32>::zeros((batch, chans));
	let denom = if count > 1 { (count - 1) as f32 } else { 1.0 };

	for n in 0..batch {
		for c in 0..chans {
			let mut sum = 0.0f32;
			for y in 0..height {
				for x in 0..width {
					sum += feat[[n, c, y, x]];
				}
			}
			let channel_mean = sum / count as f32;

			let mut sq_sum = 0.0f32;
			for y in 0..height {
				for x in 0..width {
					let diff = feat[[n, c, y, x]] - channel_mean;
					sq_sum += diff * diff;
				}
			}
			mean[[n, c]] = channel_mean;
			std[[n, c]] = (sq_sum / denom + network::STATS_EPSILON).sqrt();
		}
	}
	Ok((mean, std))
}

/// Re-expresses the content features using the style features' per-channel
/// statistics: only the affine normalization parameters change, the spatial
/// arrangement is untouched.
pub fn adaptive_instance_normalization(content: &ArrayD<f32>, style: &ArrayD<f32>) -> Result<ArrayD<f32>> {
	let (content_mean, content_std) = calc_mean_std(content)?;
	let (style_mean, style_std) = calc_mean_std(style)?;

	let content4 = content
		.view()
		.into_dimensionality::<Ix4>()
		.map_err(|_| StyleError::Shape(format!("expected a [N, C, H, W] feature map, got {:?}", content.shape())))?;
	let (batch, chans, height, width) = content4.dim();
	if style.shape().len() != 4 || style.shape()[0] != batch || style.shape()[1] != chans {
		return Err(StyleError::Shape(format!(
			"content features {:?} and style features {:?} disagree in batch/channel dimensions",
			content.shape(),
			style.shape()
		)));
	}

	let mut output = content4.to_owned();
	for n in 0..batch {
		for c in 0..chans {
			let scale = style_std[[n, c]] / content_std[[n, c]];
			let shift = style_mean[[n, c]] - content_mean[[n, c]] * scale;
			for y in 0..height {
				for x in 0..width {
					output[[n, c, y, x]] = output[[n, c, y, x]] * scale + shift;
				}
			}
		}
	}
	output
		.into_shape(IxDyn(&[batch, chans, height, width]))
		.map_err(|_| StyleError::Shape("normalized feature shape mismatch".into()))
}

/// AdaIN followed by the alpha blend with the raw content features.
/// alpha = 1 is full style, alpha = 0 returns the content features unchanged.
pub fn stylize_features(content: &ArrayD<f32>, style: &ArrayD<f32>, alpha: f32) -> Result<ArrayD<f32>> {
	if !alpha.is_finite() || alpha < 0.0 || alpha > 1.0 {
		return Err(StyleError::InvalidParameter(format!(
			"alpha ({}) must lie in [0, 1]",
			alpha
		)));
	}
	let mut blended = adaptive_instance_normalization(content, style)?;
	Zip::from(&mut blended).and(content).apply(|out, &raw| {
		*out = alpha * *out + (1.0 - alpha) * raw;
	});
	Ok(blended)
}

#[cfg(test)]
mod tests {
	use super::*;
	use ndarray::{ArrayD, IxDyn};

	fn feature(shape: &[usize], f: impl Fn(usize) -> f32) -> ArrayD<f32> {
		let len = shape.iter().product();
		ArrayD::from_shape_vec(IxDyn(shape), (0..len).map(f).collect()).unwrap()
	}

	#[test]
	fn constant_map_has_zero_std_and_exact_mean() {
		let feat = feature(&[1, 2, 4, 4], |_| 3.25);
		let (mean, std) = calc_mean_std(&feat).unwrap();
		for c in 0..2 {
			assert!((mean[[0, c]] - 3.25).abs() < 1e-6);
			assert!(std[[0, c]] < 5e-3);
		}
	}

	#[test]
	fn mean_std_rejects_non_4d_input() {
		let feat = feature(&[2, 4, 4], |i| i as f32);
		match calc_mean_std(&feat) {
			Err(StyleError::Shape(_)) => {},
			other => panic!("expected shape error, got {:?}", other.map(|_| ())),
		}
	}

	#[test]
	fn self_normalization_is_identity() {
		let feat = feature(&[1, 3, 5, 5], |i| ((i * 37) % 101) as f32 / 101.0);
		let normalized = adaptive_instance_normalization(&feat, &feat).unwrap();
		for (a, b) in normalized.iter().zip(feat.iter()) {
			assert!((a - b).abs() < 1e-4, "{} vs {}", a, b);
		}
	}

	#[test]
	fn channel_mismatch_is_a_shape_error() {
		let content = feature(&[1, 4, 3, 3], |i| i as f32);
		let style = feature(&[1, 2, 3, 3], |i| i as f32);
		match adaptive_instance_normalization(&content, &style) {
			Err(StyleError::Shape(_)) => {},
			other => panic!("expected shape error, got {:?}", other.map(|_| ())),
		}
	}

	#[test]
	fn spatial_sizes_may_differ_between_content_and_style() {
		let content = feature(&[1, 2, 6, 6], |i| i as f32);
		let style = feature(&[1, 2, 3, 9], |i| (i % 7) as f32);
		let result = adaptive_instance_normalization(&content, &style).unwrap();
		assert_eq!(result.shape(), content.shape());
	}

	#[test]
	fn alpha_zero_returns_content_unchanged() {
		let content = feature(&[1, 2, 4, 4], |i| i as f32 / 10.0);
		let style = feature(&[1, 2, 4, 4], |i| (31 - i as i32) as f32);
		let blended = stylize_features(&content, &style, 0.0).unwrap();
		for (a, b) in blended.iter().zip(content.iter()) {
			assert!((a - b).abs() < 1e-6);
		}
	}

	#[test]
	fn alpha_outside_unit_interval_is_rejected() {
		let feat = feature(&[1, 1, 2, 2], |i| i as f32);
		assert!(stylize_features(&feat, &feat, -0.1).is_err());
		assert!(stylize_features(&feat, &feat, 1.5).is_err());
		assert!(stylize_features(&feat, &feat, std::f32::NAN).is_err());
	}

	#[test]
	fn normalization_matches_style_statistics() {
		let content = feature(&[1, 2, 8, 8], |i| ((i * 13) % 29) as f32);
		let style = feature(&[1, 2, 8, 8], |i| ((i * 7) % 11) as f32 * 0.5 + 2.0);
		let normalized = adaptive_instance_normalization(&content, &style).unwrap();
		let (norm_mean, norm_std) = calc_mean_std(&normalized).unwrap();
		let (style_mean, style_std) = calc_mean_std(&style).unwrap();
		for c in 0..2 {
			assert!((norm_mean[[0, c]] - style_mean[[0, c]]).abs() < 1e-2);
			assert!((norm_std[[0, c]] - style_std[[0, c]]).abs() / style_std[[0, c]] < 5e-2);
		}
	}
}
