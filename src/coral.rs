use nalgebra::{Matrix3, SymmetricEigen, Vector3};
use ndarray::{ArrayD, IxDyn};

use crate::constants::coral as coral_constants;
use crate::error::{Result, StyleError};
use crate::ops;

/// Correlation alignment in pixel space: re-colors `source` so its channel
/// mean and covariance match `target`. Both tensors are [3, H, W] in [0, 1];
/// spatial sizes may differ. Used to make the style image's palette resemble
/// the content image before feature extraction.
pub fn coral(source: &ArrayD<f32>, target: &ArrayD<f32>) -> Result<ArrayD<f32>> {
	let (source_data, source_shape) = flatten_pixels(source)?;
	let (target_data, _) = flatten_pixels(target)?;

	let source_stats = ChannelStats::compute(source_data)?;
	let target_stats = ChannelStats::compute(target_data)?;

	let source_norm = source_stats.standardize(source_data);
	let target_norm = target_stats.standardize(target_data);

	let source_cov = scatter_with_identity(&source_norm);
	let target_cov = scatter_with_identity(&target_norm);

	// Whitening then coloring: sqrt(cov_t) * sqrt(cov_s)^-1, both square
	// roots through the symmetric eigendecomposition.
	let whiten = matrix_sqrt(source_cov)?
		.try_inverse()
		.ok_or_else(|| StyleError::Numerical("source color covariance is singular".into()))?;
	let transform = matrix_sqrt(target_cov)? * whiten;

	let pixels = source_norm[0].len();
	let mut out = vec![0.0f32; 3 * pixels];
	for i in 0..pixels {
		let v = transform * Vector3::new(source_norm[0][i], source_norm[1][i], source_norm[2][i]);
		for c in 0..3 {
			out[c * pixels + i] = v[c] * target_stats.std[c] + target_stats.mean[c];
		}
	}
	if out.iter().any(|v| !v.is_finite()) {
		return Err(StyleError::Numerical("color alignment produced non-finite values".into()));
	}

	ArrayD::from_shape_vec(IxDyn(&source_shape), out)
		.map_err(|_| StyleError::Shape("aligned pixel tensor shape mismatch".into()))
}

/// Borrows a [3, H, W] tensor as three contiguous channel planes.
fn flatten_pixels(tensor: &ArrayD<f32>) -> Result<([&[f32]; 3], Vec<usize>)> {
	let shape = tensor.shape().to_vec();
	if shape.len() != 3 || shape[0] != 3 {
		return Err(StyleError::Shape(format!(
			"expected a [3, H, W] pixel tensor, got {:?}",
			shape
		)));
	}
	let pixels = shape[1] * shape[2];
	if pixels < 2 {
		return Err(StyleError::Shape("pixel tensor needs at least two pixels".into()));
	}
	let data = ops::contiguous(tensor)?;
	Ok(([&data[..pixels], &data[pixels..2 * pixels], &data[2 * pixels..]], shape))
}

struct ChannelStats {
	mean: [f32; 3],
	std: [f32; 3],
}

impl ChannelStats {
	fn compute(channels: [&[f32]; 3]) -> Result<Self> {
		let mut mean = [0.0f32; 3];
		let mut std = [0.0f32; 3];
		for c in 0..3 {
			let data = channels[c];
			let n = data.len() as f32;
			let m = data.iter().sum::<f32>() / n;
			let var = data.iter().map(|v| (v - m) * (v - m)).sum::<f32>() / (n - 1.0);
			let s = var.sqrt();
			if !s.is_finite() || s < coral_constants::DEGENERATE_STD {
				return Err(StyleError::Numerical(format!(
					"channel {} is degenerate (single-color image), cannot align colors",
					c
				)));
			}
			mean[c] = m;
			std[c] = s;
		}
		Ok(ChannelStats { mean, std })
	}

	fn standardize(&self, channels: [&[f32]; 3]) -> [Vec<f32>; 3] {
		let mut out = [Vec::new(), Vec::new(), Vec::new()];
		for c in 0..3 {
			out[c] = channels[c].iter().map(|v| (v - self.mean[c]) / self.std[c]).collect();
		}
		out
	}
}

/// Unnormalized channel scatter matrix of standardized pixels plus the
/// identity regularizer.
fn scatter_with_identity(channels: &[Vec<f32>; 3]) -> Matrix3<f32> {
	let mut m = Matrix3::identity() * coral_constants::IDENTITY_REGULARIZATION;
	for a in 0..3 {
		for b in a..3 {
			let dot = channels[a].iter().zip(channels[b].iter()).map(|(x, y)| x * y).sum::<f32>();
			m[(a, b)] += dot;
			if a != b {
				m[(b, a)] += dot;
			}
		}
	}
	m
}

/// Principal square root of a symmetric positive-definite matrix,
/// U * diag(sqrt(lambda)) * U^T.
fn matrix_sqrt(m: Matrix3<f32>) -> Result<Matrix3<f32>> {
	let eigen = SymmetricEigen::new(m);
	let mut roots = Vector3::zeros();
	for i in 0..3 {
		let lambda = eigen.eigenvalues[i];
		if !lambda.is_finite() || lambda <= 0.0 {
			return Err(StyleError::Numerical(format!(
				"color covariance is not positive definite (eigenvalue {})",
				lambda
			)));
		}
		roots[i] = lambda.sqrt();
	}
	Ok(eigen.eigenvectors * Matrix3::from_diagonal(&roots) * eigen.eigenvectors.transpose())
}
