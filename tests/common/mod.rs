#![allow(dead_code)]

use std::sync::Arc;

use indexmap::IndexMap;
use ndarray::{ArrayD, IxDyn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use adain_rust::decoder::{Decoder, DECODER_LAYERS};
use adain_rust::encoder::{VggEncoder, ENCODER_LAYERS};
use adain_rust::{codec, NetworkDescription, StyleTransferNetwork};

/// He-scaled random weights keep activations alive through the deep ReLU
/// stacks, so stylized outputs are not degenerate zeros.
pub fn random_description(layers: &[(&str, usize, usize, usize)], seed: u64) -> NetworkDescription {
	let mut rng = StdRng::seed_from_u64(seed);
	let mut parameters = IndexMap::new();
	for &(name, in_c, out_c, kernel) in layers {
		let fan_in = (in_c * kernel * kernel) as f32;
		let scale = (2.0 / fan_in).sqrt();
		let weight: Vec<f32> = (0..out_c * in_c * kernel * kernel)
			.map(|_| (rng.gen::<f32>() - 0.5) * 2.0 * scale)
			.collect();
		parameters.insert(
			format!("{}.weight", name),
			ArrayD::from_shape_vec(IxDyn(&[out_c, in_c, kernel, kernel]), weight).unwrap(),
		);
		let bias: Vec<f32> = (0..out_c).map(|_| (rng.gen::<f32>() - 0.5) * 0.02).collect();
		parameters.insert(
			format!("{}.bias", name),
			ArrayD::from_shape_vec(IxDyn(&[out_c]), bias).unwrap(),
		);
	}
	NetworkDescription::new(parameters)
}

pub fn zero_description(layers: &[(&str, usize, usize, usize)]) -> NetworkDescription {
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

pub fn random_network(seed: u64) -> StyleTransferNetwork {
	StyleTransferNetwork::from_descriptions(
		&random_description(&ENCODER_LAYERS, seed),
		&random_description(&DECODER_LAYERS, seed.wrapping_add(1)),
		"randomly initialized test network",
	)
	.expect("synthetic weights must build a network")
}

pub fn shared_random_networks(seed: u64) -> (StyleTransferNetwork, StyleTransferNetwork) {
	let encoder = Arc::new(
		VggEncoder::from_weights(&random_description(&ENCODER_LAYERS, seed))
			.expect("synthetic encoder weights must load"),
	);
	let first = Decoder::from_weights(&random_description(&DECODER_LAYERS, seed.wrapping_add(1)))
		.expect("synthetic decoder weights must load");
	let second = Decoder::from_weights(&random_description(&DECODER_LAYERS, seed.wrapping_add(2)))
		.expect("synthetic decoder weights must load");
	(
		StyleTransferNetwork::new(Arc::clone(&encoder), first, "first test network"),
		StyleTransferNetwork::new(encoder, second, "second test network"),
	)
}

/// A reproducible photo-like test image, returned as PNG bytes.
pub fn test_image_bytes(height: usize, width: usize, seed: u64) -> Vec<u8> {
	codec::encode_png(&test_image_tensor(height, width, seed)).expect("synthetic image must encode")
}

pub fn test_image_tensor(height: usize, width: usize, seed: u64) -> ArrayD<f32> {
	let mut rng = StdRng::seed_from_u64(seed);
	let base: Vec<f32> = (0..3).map(|_| rng.gen::<f32>() * 0.5 + 0.25).collect();
	let mut data = Vec::with_capacity(3 * height * width);
	for c in 0..3 {
		for y in 0..height {
			for x in 0..width {
				let gradient = (x as f32 / width as f32 - y as f32 / height as f32) * 0.3;
				let noise = (rng.gen::<f32>() - 0.5) * 0.2;
				data.push((base[c] + gradient + noise).max(0.0).min(1.0));
			}
		}
	}
	ArrayD::from_shape_vec(IxDyn(&[3, height, width]), data).unwrap()
}

pub fn pixel_distance(a: &ArrayD<f32>, b: &ArrayD<f32>) -> f32 {
	assert_eq!(a.shape(), b.shape());
	let total: f32 = a.iter().zip(b.iter()).map(|(x, y)| (x - y).abs()).sum();
	total / a.len() as f32
}
