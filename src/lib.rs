#[macro_use]
extern crate ndarray;
#[macro_use]
extern crate serde_derive;

pub mod adain;
pub mod cli;
pub mod codec;
pub mod commands;
pub mod constants;
pub mod coral;
pub mod decoder;
pub mod encoder;
pub mod error;
pub mod logging;
pub mod model_converter;
pub mod network;
pub mod ops;
pub mod transfer;
pub mod validation;

use std::fs::File;
use std::io::Read;
use std::num::FpCategory;
use std::path::Path;

use bincode::{deserialize, serialize};
use byteorder::{BigEndian, ByteOrder};
use indexmap::IndexMap;
use ndarray::ArrayD;
use xz2::read::{XzDecoder, XzEncoder};

use crate::error::{Result, StyleError};

pub use crate::network::{DecoderVariant, ModelContext, StyleTransferNetwork};
pub use crate::transfer::{process_images, style_transfer};

/// Version tag written into every .stw weight container.
pub const WEIGHT_FORMAT_VERSION: u32 = 1;

/// A serialized parameter map keyed by layer name, the payload of one .stw
/// weight file. One file per network component (encoder or one decoder
/// variant); nothing here knows which. The architecture check happens when
/// a component is constructed from the map.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkDescription {
	pub format_version: u32,
	pub parameters: IndexMap<String, ArrayD<f32>>,
}

impl NetworkDescription {
	pub fn new(parameters: IndexMap<String, ArrayD<f32>>) -> Self {
		NetworkDescription {
			format_version: WEIGHT_FORMAT_VERSION,
			parameters,
		}
	}
}

/// Decompresses and deserialises a NetworkDescription from the byte format
/// used in .stw files.
pub fn network_from_bytes(data: &[u8]) -> Result<NetworkDescription> {
	let decompressed = XzDecoder::new(data)
		.bytes()
		.collect::<std::result::Result<Vec<_>, _>>()
		.map_err(|e| StyleError::Serialization(format!("{}", e)))?;
	let unshuffled = unshuffle(&decompressed, 4);
	let deserialized: NetworkDescription = deserialize(&unshuffled)
		.map_err(|e| StyleError::Serialization(format!("NetworkDescription decoding failed: {}", e)))?;
	if deserialized.format_version != WEIGHT_FORMAT_VERSION {
		return Err(StyleError::Serialization(format!(
			"unsupported weight format version {}",
			deserialized.format_version
		)));
	}
	Ok(deserialized)
}

/// Serialises and compresses a NetworkDescription into the byte format used
/// in .stw files. If `quantise` is true the least significant mantissa bits
/// are zeroed to improve compression.
pub fn network_to_bytes(mut desc: NetworkDescription, quantise: bool) -> Result<Vec<u8>> {
	for array in desc.parameters.values_mut() {
		for e in array.iter_mut() {
			if let FpCategory::Subnormal = e.classify() {
				*e = 0.0;
			}
			if quantise {
				let mut bytes = [0; 4];
				BigEndian::write_f32(&mut bytes, *e);
				bytes[2] &= 0xF0;
				bytes[3] &= 0x00;
				*e = BigEndian::read_f32(&bytes);
			}
		}
	}

	let serialized: Vec<u8> = serialize(&desc)
		.map_err(|e| StyleError::Serialization(format!("NetworkDescription encoding failed: {}", e)))?;
	let shuffled = shuffle(&serialized, 4);
	let compressed = XzEncoder::new(shuffled.as_slice(), 7)
		.bytes()
		.collect::<std::result::Result<Vec<_>, _>>()
		.map_err(|e| StyleError::Serialization(format!("{}", e)))?;
	Ok(compressed)
}

/// Reads and decodes one .stw weight file.
pub fn load_network_file(path: &Path) -> Result<NetworkDescription> {
	let mut file = File::open(path).map_err(|e| {
		StyleError::ModelLoad(format!("cannot open weight file {}: {}", path.display(), e))
	})?;
	let mut data = Vec::new();
	file.read_to_end(&mut data)?;
	network_from_bytes(&data)
}

/// Writes one .stw weight file.
pub fn save_network_file(desc: NetworkDescription, path: &Path, quantise: bool) -> Result<()> {
	let data = network_to_bytes(desc, quantise)?;
	std::fs::write(path, data)?;
	Ok(())
}

/// Shuffle f32 bytes so that all first bytes are contiguous etc.
/// Improves compression of floating point data.
fn shuffle(data: &[u8], stride: usize) -> Vec<u8> {
	let mut vec = Vec::with_capacity(data.len());
	for offset in 0..stride {
		for i in 0..(data.len() - offset + stride - 1) / stride {
			vec.push(data[offset + i * stride])
		}
	}
	debug_assert_eq!(vec.len(), data.len());
	vec
}

/// Inverts `shuffle()`
fn unshuffle(data: &[u8], stride: usize) -> Vec<u8> {
	let mut vec = vec![0; data.len()];
	let mut inc = 0;
	for offset in 0..stride {
		for i in 0..(data.len() - offset + stride - 1) / stride {
			vec[offset + i * stride] = data[inc];
			inc += 1;
		}
	}
	debug_assert_eq!(inc, data.len());
	vec
}

#[cfg(test)]
mod tests {
	use super::*;
	use ndarray::IxDyn;

	fn sample_description() -> NetworkDescription {
		let mut parameters = IndexMap::new();
		parameters.insert(
			"conv1_1.weight".to_string(),
			ArrayD::from_shape_vec(IxDyn(&[2, 3, 3, 3]), (0..54).map(|v| v as f32 * 0.01).collect()).unwrap(),
		);
		parameters.insert(
			"conv1_1.bias".to_string(),
			ArrayD::from_shape_vec(IxDyn(&[2]), vec![0.5, -0.5]).unwrap(),
		);
		NetworkDescription::new(parameters)
	}

	#[test]
	fn weight_container_round_trips() {
		let desc = sample_description();
		let bytes = network_to_bytes(desc.clone(), false).unwrap();
		let restored = network_from_bytes(&bytes).unwrap();
		assert_eq!(restored.format_version, WEIGHT_FORMAT_VERSION);
		assert_eq!(restored.parameters.len(), 2);
		let original = &desc.parameters["conv1_1.weight"];
		let decoded = &restored.parameters["conv1_1.weight"];
		assert_eq!(original, decoded);
	}

	#[test]
	fn quantised_container_stays_close() {
		let desc = sample_description();
		let bytes = network_to_bytes(desc.clone(), true).unwrap();
		let restored = network_from_bytes(&bytes).unwrap();
		for (key, original) in desc.parameters.iter() {
			let decoded = &restored.parameters[key];
			for (a, b) in original.iter().zip(decoded.iter()) {
				assert!((a - b).abs() < 1e-2, "{}: {} vs {}", key, a, b);
			}
		}
	}

	#[test]
	fn corrupt_container_is_a_serialization_error() {
		match network_from_bytes(&[0, 1, 2, 3]) {
			Err(StyleError::Serialization(_)) => {},
			other => panic!("expected serialization error, got {:?}", other.map(|_| ())),
		}
	}

	#[test]
	fn shuffle_round_trips() {
		let data: Vec<u8> = (0..23).collect();
		assert_eq!(unshuffle(&shuffle(&data, 4), 4), data);
	}
}
