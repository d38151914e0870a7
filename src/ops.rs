use indexmap::IndexMap;
use ndarray::{Array1, Array4, ArrayD, Ix1, Ix4};
use rayon::prelude::*;

use crate::error::{Result, StyleError};

/// A 2d convolution with its bias, stored in [out, in, kh, kw] layout.
#[derive(Clone, Debug)]
pub struct ConvLayer {
	weight: Array4<f32>,
	bias: Array1<f32>,
}

impl ConvLayer {
	pub fn new(weight: Array4<f32>, bias: Array1<f32>) -> Result<Self> {
		if weight.dim().0 != bias.len() {
			return Err(StyleError::Shape(format!(
				"bias length {} does not match {} output channels",
				bias.len(),
				weight.dim().0
			)));
		}
		Ok(ConvLayer { weight, bias })
	}

	/// Pulls `<name>.weight` and `<name>.bias` out of a layer-name keyed
	/// parameter map, checking them against the expected layer geometry.
	pub fn from_parameters(
		parameters: &IndexMap<String, ArrayD<f32>>,
		name: &str,
		in_channels: usize,
		out_channels: usize,
		kernel: usize,
	) -> Result<Self> {
		let weight = fetch_parameter(parameters, &format!("{}.weight", name))?
			.clone()
			.into_dimensionality::<Ix4>()
			.map_err(|_| StyleError::ModelLoad(format!("parameter {}.weight is not 4-dimensional", name)))?;
		let bias = fetch_parameter(parameters, &format!("{}.bias", name))?
			.clone()
			.into_dimensionality::<Ix1>()
			.map_err(|_| StyleError::ModelLoad(format!("parameter {}.bias is not 1-dimensional", name)))?;

		let expected = (out_channels, in_channels, kernel, kernel);
		if weight.dim() != expected {
			return Err(StyleError::ModelLoad(format!(
				"parameter {}.weight has shape {:?}, expected {:?}",
				name,
				weight.shape(),
				[out_channels, in_channels, kernel, kernel]
			)));
		}
		if bias.len() != out_channels {
			return Err(StyleError::ModelLoad(format!(
				"parameter {}.bias has length {}, expected {}",
				name,
				bias.len(),
				out_channels
			)));
		}
		Ok(ConvLayer { weight, bias })
	}

	pub fn in_channels(&self) -> usize {
		self.weight.dim().1
	}

	pub fn out_channels(&self) -> usize {
		self.weight.dim().0
	}

	/// Reflection-pad, convolve, and optionally apply ReLU.
	pub fn apply(&self, input: &Array4<f32>, pad: usize, activate: bool) -> Result<Array4<f32>> {
		let padded = reflection_pad(input, pad)?;
		let output = conv2d(&padded, &self.weight, &self.bias)?;
		Ok(if activate { relu(output) } else { output })
	}
}

fn fetch_parameter<'a>(parameters: &'a IndexMap<String, ArrayD<f32>>, key: &str) -> Result<&'a ArrayD<f32>> {
	parameters
		.get(key)
		.ok_or_else(|| StyleError::ModelLoad(format!("parameter {} is missing from the weight file", key)))
}

/// Valid (unpadded) convolution with stride 1, parallelized over output
/// channels.
pub fn conv2d(input: &Array4<f32>, weight: &Array4<f32>, bias: &Array1<f32>) -> Result<Array4<f32>> {
	let (batch, in_c, in_h, in_w) = input.dim();
	let (out_c, w_in_c, k_h, k_w) = weight.dim();
	if in_c != w_in_c {
		return Err(StyleError::Shape(format!(
			"convolution input has {} channels but the kernel expects {}",
			in_c, w_in_c
		)));
	}
	if bias.len() != out_c {
		return Err(StyleError::Shape(format!(
			"bias length {} does not match {} output channels",
			bias.len(),
			out_c
		)));
	}
	if in_h < k_h || in_w < k_w {
		return Err(StyleError::Shape(format!(
			"{}x{} input is smaller than the {}x{} kernel",
			in_h, in_w, k_h, k_w
		)));
	}
	let out_h = in_h - k_h + 1;
	let out_w = in_w - k_w + 1;

	let in_data = contiguous(input)?;
	let w_data = contiguous(weight)?;
	let mut out = vec![0.0f32; batch * out_c * out_h * out_w];

	for n in 0..batch {
		let in_base = n * in_c * in_h * in_w;
		let out_batch = &mut out[n * out_c * out_h * out_w..(n + 1) * out_c * out_h * out_w];
		out_batch
			.par_chunks_mut(out_h * out_w)
			.enumerate()
			.for_each(|(oc, plane)| {
				for value in plane.iter_mut() {
					*value = bias[oc];
				}
				let w_base = oc * in_c * k_h * k_w;
				for ic in 0..in_c {
					let in_chan = in_base + ic * in_h * in_w;
					let w_chan = w_base + ic * k_h * k_w;
					for ky in 0..k_h {
						for kx in 0..k_w {
							let w_val = w_data[w_chan + ky * k_w + kx];
							for oy in 0..out_h {
								let in_row = in_chan + (oy + ky) * in_w + kx;
								let out_row = oy * out_w;
								for ox in 0..out_w {
									plane[out_row + ox] += w_val * in_data[in_row + ox];
								}
							}
						}
					}
				}
			});
	}

	Array4::from_shape_vec((batch, out_c, out_h, out_w), out)
		.map_err(|_| StyleError::Shape("convolution output shape mismatch".into()))
}

/// Pads the two spatial dimensions by mirroring without repeating the border
/// row/column, matching the padding the networks were trained with.
pub fn reflection_pad(input: &Array4<f32>, pad: usize) -> Result<Array4<f32>> {
	if pad == 0 {
		return Ok(input.clone());
	}
	let (batch, chans, in_h, in_w) = input.dim();
	if in_h <= pad || in_w <= pad {
		return Err(StyleError::Shape(format!(
			"cannot reflection-pad a {}x{} map by {}",
			in_h, in_w, pad
		)));
	}
	let out_h = in_h + 2 * pad;
	let out_w = in_w + 2 * pad;

	let in_data = contiguous(input)?;
	let mut out = vec![0.0f32; batch * chans * out_h * out_w];

	let reflect = |i: isize, len: usize| -> usize {
		if i < 0 {
			(-i) as usize
		} else if (i as usize) < len {
			i as usize
		} else {
			2 * len - 2 - i as usize
		}
	};

	for n in 0..batch {
		for c in 0..chans {
			let in_plane = (n * chans + c) * in_h * in_w;
			let out_plane = (n * chans + c) * out_h * out_w;
			for y in 0..out_h {
				let src_y = reflect(y as isize - pad as isize, in_h);
				let in_row = in_plane + src_y * in_w;
				let out_row = out_plane + y * out_w;
				for x in 0..out_w {
					let src_x = reflect(x as isize - pad as isize, in_w);
					out[out_row + x] = in_data[in_row + src_x];
				}
			}
		}
	}

	Array4::from_shape_vec((batch, chans, out_h, out_w), out)
		.map_err(|_| StyleError::Shape("padding output shape mismatch".into()))
}

pub fn relu(mut input: Array4<f32>) -> Array4<f32> {
	input.mapv_inplace(|v| v.max(0.0));
	input
}

/// Max pooling with ceiling-mode output sizing, so odd spatial dimensions
/// keep their trailing row/column in a partial window.
pub fn max_pool2d(input: &Array4<f32>, size: usize, stride: usize) -> Result<Array4<f32>> {
	let (batch, chans, in_h, in_w) = input.dim();
	if size == 0 || stride == 0 {
		return Err(StyleError::InvalidParameter("pooling size and stride must be positive".into()));
	}
	if in_h < size || in_w < size {
		return Err(StyleError::Shape(format!(
			"{}x{} input is smaller than the {}x{} pooling window",
			in_h, in_w, size, size
		)));
	}
	let out_h = (in_h - size + stride - 1) / stride + 1;
	let out_w = (in_w - size + stride - 1) / stride + 1;

	let in_data = contiguous(input)?;
	let mut out = vec![0.0f32; batch * chans * out_h * out_w];

	for n in 0..batch {
		for c in 0..chans {
			let in_plane = (n * chans + c) * in_h * in_w;
			let out_plane = (n * chans + c) * out_h * out_w;
			for oy in 0..out_h {
				let y0 = oy * stride;
				let y1 = (y0 + size).min(in_h);
				for ox in 0..out_w {
					let x0 = ox * stride;
					let x1 = (x0 + size).min(in_w);
					let mut best = std::f32::NEG_INFINITY;
					for y in y0..y1 {
						let in_row = in_plane + y * in_w;
						for x in x0..x1 {
							best = best.max(in_data[in_row + x]);
						}
					}
					out[out_plane + oy * out_w + ox] = best;
				}
			}
		}
	}

	Array4::from_shape_vec((batch, chans, out_h, out_w), out)
		.map_err(|_| StyleError::Shape("pooling output shape mismatch".into()))
}

/// Nearest-neighbour spatial upsampling by an integer factor.
pub fn upsample_nearest(input: &Array4<f32>, factor: usize) -> Result<Array4<f32>> {
	if factor == 0 {
		return Err(StyleError::InvalidParameter("upsampling factor must be positive".into()));
	}
	if factor == 1 {
		return Ok(input.clone());
	}
	let (batch, chans, in_h, in_w) = input.dim();
	let out_h = in_h * factor;
	let out_w = in_w * factor;

	let in_data = contiguous(input)?;
	let mut out = vec![0.0f32; batch * chans * out_h * out_w];

	for n in 0..batch {
		for c in 0..chans {
			let in_plane = (n * chans + c) * in_h * in_w;
			let out_plane = (n * chans + c) * out_h * out_w;
			for y in 0..out_h {
				let in_row = in_plane + (y / factor) * in_w;
				let out_row = out_plane + y * out_w;
				for x in 0..out_w {
					out[out_row + x] = in_data[in_row + x / factor];
				}
			}
		}
	}

	Array4::from_shape_vec((batch, chans, out_h, out_w), out)
		.map_err(|_| StyleError::Shape("upsampling output shape mismatch".into()))
}

/// Clamps every element into [0, 1] before an image tensor is re-encoded.
pub fn clamp_unit(input: &mut ArrayD<f32>) {
	input.mapv_inplace(|v| v.max(0.0).min(1.0));
}

pub(crate) fn contiguous<'a, D: ndarray::Dimension>(array: &'a ndarray::Array<f32, D>) -> Result<&'a [f32]> {
	array
		.as_slice()
		.ok_or_else(|| StyleError::Shape("tensor is not in contiguous standard layout".into()))
}

#[cfg(test)]
mod tests {
	use super::*;
	use ndarray::arr1;

	fn plane(values: Vec<f32>, h: usize, w: usize) -> Array4<f32> {
		Array4::from_shape_vec((1, 1, h, w), values).unwrap()
	}

	#[test]
	fn identity_kernel_preserves_input() {
		let input = plane((0..9).map(|v| v as f32).collect(), 3, 3);
		let weight = Array4::from_shape_vec((1, 1, 1, 1), vec![1.0]).unwrap();
		let bias = arr1(&[0.0]);
		let output = conv2d(&input, &weight, &bias).unwrap();
		assert_eq!(output, input);
	}

	#[test]
	fn conv_applies_bias() {
		let input = plane(vec![0.0; 9], 3, 3);
		let weight = Array4::from_shape_vec((1, 1, 3, 3), vec![0.0; 9]).unwrap();
		let bias = arr1(&[2.5]);
		let output = conv2d(&input, &weight, &bias).unwrap();
		assert_eq!(output.dim(), (1, 1, 1, 1));
		assert_eq!(output[[0, 0, 0, 0]], 2.5);
	}

	#[test]
	fn conv_rejects_channel_mismatch() {
		let input = plane(vec![0.0; 9], 3, 3);
		let weight = Array4::from_shape_vec((1, 2, 3, 3), vec![0.0; 18]).unwrap();
		let bias = arr1(&[0.0]);
		assert!(conv2d(&input, &weight, &bias).is_err());
	}

	#[test]
	fn reflection_pad_mirrors_without_border_repeat() {
		let input = plane(vec![1.0, 2.0, 3.0, 4.0], 2, 2);
		let padded = reflection_pad(&input, 1).unwrap();
		assert_eq!(padded.dim(), (1, 1, 4, 4));
		// Row -1 reflects to row 1, column -1 reflects to column 1.
		assert_eq!(padded[[0, 0, 0, 0]], 4.0);
		assert_eq!(padded[[0, 0, 1, 1]], 1.0);
		assert_eq!(padded[[0, 0, 3, 3]], 1.0);
	}

	#[test]
	fn max_pool_uses_ceiling_mode() {
		let input = plane((0..25).map(|v| v as f32).collect(), 5, 5);
		let pooled = max_pool2d(&input, 2, 2).unwrap();
		// Odd input keeps a partial trailing window.
		assert_eq!(pooled.dim(), (1, 1, 3, 3));
		assert_eq!(pooled[[0, 0, 0, 0]], 6.0);
		assert_eq!(pooled[[0, 0, 2, 2]], 24.0);
	}

	#[test]
	fn upsample_nearest_duplicates_pixels() {
		let input = plane(vec![1.0, 2.0, 3.0, 4.0], 2, 2);
		let upsampled = upsample_nearest(&input, 2).unwrap();
		assert_eq!(upsampled.dim(), (1, 1, 4, 4));
		assert_eq!(upsampled[[0, 0, 0, 1]], 1.0);
		assert_eq!(upsampled[[0, 0, 3, 3]], 4.0);
	}

	#[test]
	fn relu_zeroes_negative_values() {
		let input = plane(vec![-1.0, 0.5, -0.25, 2.0], 2, 2);
		let output = relu(input);
		assert_eq!(output[[0, 0, 0, 0]], 0.0);
		assert_eq!(output[[0, 0, 1, 1]], 2.0);
	}
}
