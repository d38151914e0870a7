use ndarray::{Array4, ArrayD, IxDyn};

use crate::error::{Result, StyleError};
use crate::ops::{self, ConvLayer};
use crate::NetworkDescription;

/// Decoder convolutions in forward order, mirroring the encoder back down to
/// RGB: (name, in channels, out channels, kernel size).
pub const DECODER_LAYERS: [(&str, usize, usize, usize); 9] = [
	("dec4_1", 512, 256, 3),
	("dec3_4", 256, 256, 3),
	("dec3_3", 256, 256, 3),
	("dec3_2", 256, 256, 3),
	("dec3_1", 256, 128, 3),
	("dec2_2", 128, 128, 3),
	("dec2_1", 128, 64, 3),
	("dec1_2", 64, 64, 3),
	("dec1_1", 64, 3, 3),
];

#[derive(Clone, Debug)]
enum DecoderOp {
	/// Reflection pad by 1, 3x3 convolution, ReLU.
	ConvRelu(ConvLayer),
	/// Final reflection pad + convolution, left unactivated.
	Conv(ConvLayer),
	/// Nearest-neighbour 2x upsampling.
	Upsample,
}

/// The trainable half of a style transfer network: reconstructs an image
/// from a blended relu4_1 feature map, growing the spatial size back up
/// through three nearest-neighbour upsampling steps. One decoder instance
/// per artistic variant; all of them share the one frozen encoder.
#[derive(Clone, Debug)]
pub struct Decoder {
	ops: Vec<DecoderOp>,
}

impl Decoder {
	/// Builds the decoder from a layer-name keyed parameter map, validating
	/// every layer shape against the fixed architecture.
	pub fn from_weights(desc: &NetworkDescription) -> Result<Self> {
		let parameters = &desc.parameters;
		let conv = |index: usize| -> Result<ConvLayer> {
			let (name, in_c, out_c, kernel) = DECODER_LAYERS[index];
			ConvLayer::from_parameters(parameters, name, in_c, out_c, kernel)
		};

		let ops = vec![
			DecoderOp::ConvRelu(conv(0)?),
			DecoderOp::Upsample,
			DecoderOp::ConvRelu(conv(1)?),
			DecoderOp::ConvRelu(conv(2)?),
			DecoderOp::ConvRelu(conv(3)?),
			DecoderOp::ConvRelu(conv(4)?),
			DecoderOp::Upsample,
			DecoderOp::ConvRelu(conv(5)?),
			DecoderOp::ConvRelu(conv(6)?),
			DecoderOp::Upsample,
			DecoderOp::ConvRelu(conv(7)?),
			DecoderOp::Conv(conv(8)?),
		];

		if parameters.len() > 2 * DECODER_LAYERS.len() {
			log::warn!(
				"decoder weight file carries {} parameters, {} are used",
				parameters.len(),
				2 * DECODER_LAYERS.len()
			);
		}

		Ok(Decoder { ops })
	}

	/// Reconstructs an image batch from a [N, 512, H, W] feature map.
	pub fn decode(&self, input: &ArrayD<f32>) -> Result<ArrayD<f32>> {
		let features = batched_features(input)?;
		let mut current: Option<Array4<f32>> = None;
		for op in &self.ops {
			let source = match &current {
				Some(tensor) => tensor,
				None => &features,
			};
			let next = match op {
				DecoderOp::ConvRelu(layer) => layer.apply(source, 1, true)?,
				DecoderOp::Conv(layer) => layer.apply(source, 1, false)?,
				DecoderOp::Upsample => ops::upsample_nearest(source, 2)?,
			};
			current = Some(next);
		}
		let output = current.ok_or_else(|| StyleError::ModelLoad("decoder has no layers".into()))?;
		let shape = output.dim();
		output
			.into_shape(IxDyn(&[shape.0, shape.1, shape.2, shape.3]))
			.map_err(|_| StyleError::Shape("decoded image shape mismatch".into()))
	}
}

fn batched_features(input: &ArrayD<f32>) -> Result<Array4<f32>> {
	let expected = DECODER_LAYERS[0].1;
	let batched = input
		.view()
		.into_dimensionality::<ndarray::Ix4>()
		.map_err(|_| {
			StyleError::Shape(format!(
				"expected a [N, {}, H, W] feature map, got {:?}",
				expected,
				input.shape()
			))
		})?;
	if batched.dim().1 != expected {
		return Err(StyleError::Shape(format!(
			"expected {} feature channels, got {}",
			expected,
			batched.dim().1
		)));
	}
	Ok(batched.to_owned())
}
