use ndarray::{Array4, ArrayD, IxDyn};

use crate::constants::network;
use crate::error::{Result, StyleError};
use crate::ops::{self, ConvLayer};
use crate::NetworkDescription;

/// Convolution layers of the VGG-19 prefix in forward order:
/// (name, in channels, out channels, kernel size). The 1x1 stem re-projects
/// RGB before the first 3x3 block, as in the normalised VGG weights the
/// networks were trained against.
pub const ENCODER_LAYERS: [(&str, usize, usize, usize); 10] = [
	("conv0", 3, 3, 1),
	("conv1_1", 3, 64, 3),
	("conv1_2", 64, 64, 3),
	("conv2_1", 64, 128, 3),
	("conv2_2", 128, 128, 3),
	("conv3_1", 128, 256, 3),
	("conv3_2", 256, 256, 3),
	("conv3_3", 256, 256, 3),
	("conv3_4", 256, 256, 3),
	("conv4_1", 256, 512, 3),
];

#[derive(Clone, Debug)]
enum EncoderOp {
	/// 1x1 projection, no padding, no activation.
	Project(ConvLayer),
	/// Reflection pad by 1, 3x3 convolution, ReLU.
	ConvRelu(ConvLayer),
	/// 2x2 ceiling-mode max pooling.
	Pool,
}

#[derive(Clone, Debug)]
struct EncoderStage {
	name: &'static str,
	ops: Vec<EncoderOp>,
}

impl EncoderStage {
	fn run(&self, input: &Array4<f32>) -> Result<Array4<f32>> {
		let mut current: Option<Array4<f32>> = None;
		for op in &self.ops {
			let source = match &current {
				Some(tensor) => tensor,
				None => input,
			};
			let next = match op {
				EncoderOp::Project(layer) => layer.apply(source, 0, false)?,
				EncoderOp::ConvRelu(layer) => layer.apply(source, 1, true)?,
				EncoderOp::Pool => ops::max_pool2d(source, network::POOL_SIZE, network::POOL_SIZE)?,
			};
			current = Some(next);
		}
		current.ok_or_else(|| StyleError::ModelLoad(format!("encoder stage {} is empty", self.name)))
	}
}

/// The frozen feature extractor: a fixed-weight VGG-19 prefix cut at relu4_1,
/// organized as four stages whose outputs are the relu1_1 / relu2_1 /
/// relu3_1 / relu4_1 feature maps. Weights are loaded once and never
/// updated; there is no gradient path through this type.
#[derive(Clone, Debug)]
pub struct VggEncoder {
	stages: Vec<EncoderStage>,
}

impl VggEncoder {
	/// Builds the encoder from a layer-name keyed parameter map, validating
	/// every layer shape against the fixed architecture.
	pub fn from_weights(desc: &NetworkDescription) -> Result<Self> {
		let parameters = &desc.parameters;
		let conv = |index: usize| -> Result<ConvLayer> {
			let (name, in_c, out_c, kernel) = ENCODER_LAYERS[index];
			ConvLayer::from_parameters(parameters, name, in_c, out_c, kernel)
		};

		let stages = vec![
			EncoderStage {
				name: "relu1_1",
				ops: vec![EncoderOp::Project(conv(0)?), EncoderOp::ConvRelu(conv(1)?)],
			},
			EncoderStage {
				name: "relu2_1",
				ops: vec![EncoderOp::ConvRelu(conv(2)?), EncoderOp::Pool, EncoderOp::ConvRelu(conv(3)?)],
			},
			EncoderStage {
				name: "relu3_1",
				ops: vec![EncoderOp::ConvRelu(conv(4)?), EncoderOp::Pool, EncoderOp::ConvRelu(conv(5)?)],
			},
			EncoderStage {
				name: "relu4_1",
				ops: vec![
					EncoderOp::ConvRelu(conv(6)?),
					EncoderOp::ConvRelu(conv(7)?),
					EncoderOp::ConvRelu(conv(8)?),
					EncoderOp::Pool,
					EncoderOp::ConvRelu(conv(9)?),
				],
			},
		];

		if parameters.len() > 2 * ENCODER_LAYERS.len() {
			log::warn!(
				"encoder weight file carries {} parameters, {} are used",
				parameters.len(),
				2 * ENCODER_LAYERS.len()
			);
		}

		Ok(VggEncoder { stages })
	}

	/// Maps an image batch to its deepest (relu4_1, 512-channel) feature map.
	pub fn encode(&self, input: &ArrayD<f32>) -> Result<ArrayD<f32>> {
		let mut x = batched_image(input)?;
		for stage in &self.stages {
			x = stage.run(&x)?;
		}
		into_dyn(x)
	}

	/// Returns all four stage outputs, shallow to deep.
	pub fn encode_with_intermediate(&self, input: &ArrayD<f32>) -> Result<Vec<ArrayD<f32>>> {
		let mut x = batched_image(input)?;
		let mut features = Vec::with_capacity(self.stages.len());
		for stage in &self.stages {
			x = stage.run(&x)?;
			features.push(into_dyn(x.clone())?);
		}
		Ok(features)
	}

	pub fn stage_names(&self) -> Vec<&'static str> {
		self.stages.iter().map(|stage| stage.name).collect()
	}
}

fn batched_image(input: &ArrayD<f32>) -> Result<Array4<f32>> {
	let batched = input
		.view()
		.into_dimensionality::<ndarray::Ix4>()
		.map_err(|_| StyleError::Shape(format!("expected a [N, 3, H, W] image batch, got {:?}", input.shape())))?;
	if batched.dim().1 != network::CHANNELS {
		return Err(StyleError::Shape(format!(
			"expected {} image channels, got {}",
			network::CHANNELS,
			batched.dim().1
		)));
	}
	Ok(batched.to_owned())
}

fn into_dyn(x: Array4<f32>) -> Result<ArrayD<f32>> {
	let shape = x.dim();
	x.into_shape(IxDyn(&[shape.0, shape.1, shape.2, shape.3]))
		.map_err(|_| StyleError::Shape("feature map shape mismatch".into()))
}
