//! Imports externally exported weights into the native .stw container.
//!
//! The original networks ship as PyTorch state dicts; exporting them with
//! numpy (`np.savez(path, **{k: v.numpy() for k, v in state_dict.items()})`)
//! yields an NPZ archive of little-endian f32 arrays keyed by layer name.
//! This module parses that archive, normalizes sequential parameter names
//! (`model.12.weight`) to the architecture's layer names, and validates the
//! result against the expected encoder or decoder geometry.

use std::io::{Cursor, Read};
use std::path::Path;

use byteorder::{ByteOrder, LittleEndian};
use indexmap::IndexMap;
use log::{info, warn};
use ndarray::{ArrayD, IxDyn};

use crate::decoder::{Decoder, DECODER_LAYERS};
use crate::encoder::{VggEncoder, ENCODER_LAYERS};
use crate::error::{Result, StyleError};
use crate::{save_network_file, NetworkDescription};

/// Sequential positions of the encoder convolutions inside the original
/// padding/activation/pooling stack.
const ENCODER_SEQUENTIAL_INDICES: [usize; 10] = [0, 2, 5, 9, 12, 16, 19, 22, 25, 29];
/// Likewise for the decoder stack.
const DECODER_SEQUENTIAL_INDICES: [usize; 9] = [1, 5, 8, 11, 14, 18, 21, 25, 28];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentKind {
	Encoder,
	Decoder,
}

impl ComponentKind {
	pub fn from_label(label: &str) -> Result<Self> {
		match label {
			"encoder" => Ok(ComponentKind::Encoder),
			"decoder" => Ok(ComponentKind::Decoder),
			_ => Err(StyleError::InvalidParameter(format!(
				"Unsupported component kind. Could not parse: {}",
				label
			))),
		}
	}

	fn layers(&self) -> &'static [(&'static str, usize, usize, usize)] {
		match self {
			ComponentKind::Encoder => &ENCODER_LAYERS,
			ComponentKind::Decoder => &DECODER_LAYERS,
		}
	}

	fn sequential_indices(&self) -> &'static [usize] {
		match self {
			ComponentKind::Encoder => &ENCODER_SEQUENTIAL_INDICES,
			ComponentKind::Decoder => &DECODER_SEQUENTIAL_INDICES,
		}
	}

	fn layer_name_for_index(&self, index: usize) -> Option<&'static str> {
		self.sequential_indices()
			.iter()
			.position(|&i| i == index)
			.map(|pos| self.layers()[pos].0)
	}

	fn has_layer(&self, name: &str) -> bool {
		self.layers().iter().any(|&(layer, _, _, _)| layer == name)
	}

	/// Construct the component once to run the full architecture check.
	fn validate(&self, desc: &NetworkDescription) -> Result<()> {
		match self {
			ComponentKind::Encoder => VggEncoder::from_weights(desc).map(|_| ()),
			ComponentKind::Decoder => Decoder::from_weights(desc).map(|_| ()),
		}
	}
}

/// Converts an NPZ weight export into a validated .stw weight file.
pub fn convert_npz_file(input: &Path, output: &Path, kind: ComponentKind, quantise: bool) -> Result<()> {
	let bytes = std::fs::read(input)?;
	let desc = convert_npz_bytes(&bytes, kind)?;
	let count = desc.parameters.len();
	save_network_file(desc, output, quantise)?;
	info!(
		"Converted {} parameters from {} into {}",
		count,
		input.display(),
		output.display()
	);
	Ok(())
}

/// Parses an NPZ archive and normalizes its parameter names for the given
/// component. Entries that do not belong to the architecture (e.g. VGG
/// layers beyond relu4_1 in a full encoder export) are skipped with a
/// warning.
pub fn convert_npz_bytes(bytes: &[u8], kind: ComponentKind) -> Result<NetworkDescription> {
	let raw = read_npz(bytes)?;
	let mut parameters = IndexMap::new();
	for (name, array) in raw {
		match canonical_name(&name, kind) {
			Some(canonical) => {
				if parameters.insert(canonical.clone(), array).is_some() {
					return Err(StyleError::Parse(format!(
						"archive contains duplicate entries for {}",
						canonical
					)));
				}
			},
			None => warn!("skipping unrecognised parameter {}", name),
		}
	}
	let desc = NetworkDescription::new(parameters);
	kind.validate(&desc)?;
	Ok(desc)
}

/// Maps a raw archive entry name to `<layer>.weight` / `<layer>.bias`.
/// Accepts semantic names, bare sequential indices ("12.weight") and
/// module-prefixed sequential indices ("model.12.weight").
fn canonical_name(raw: &str, kind: ComponentKind) -> Option<String> {
	let name = raw.trim_end_matches(".npy");
	let name = if name.starts_with("model.") { &name["model.".len()..] } else { name };

	let dot = name.rfind('.')?;
	let (base, field) = (&name[..dot], &name[dot + 1..]);
	if field != "weight" && field != "bias" {
		return None;
	}

	let layer = match base.parse::<usize>() {
		Ok(index) => kind.layer_name_for_index(index)?,
		Err(_) => {
			if !kind.has_layer(base) {
				return None;
			}
			kind.layers().iter().find(|&&(l, _, _, _)| l == base)?.0
		},
	};
	Some(format!("{}.{}", layer, field))
}

fn read_npz(bytes: &[u8]) -> Result<IndexMap<String, ArrayD<f32>>> {
	let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
		.map_err(|e| StyleError::Parse(format!("not a readable NPZ archive: {}", e)))?;
	let mut entries = IndexMap::new();
	for i in 0..archive.len() {
		let mut file = archive
			.by_index(i)
			.map_err(|e| StyleError::Parse(format!("corrupt NPZ entry: {}", e)))?;
		let name = file.name().to_string();
		let mut data = Vec::new();
		file.read_to_end(&mut data)?;
		let array = parse_npy(&data)
			.map_err(|e| StyleError::Parse(format!("entry {}: {}", name, e)))?;
		entries.insert(name, array);
	}
	if entries.is_empty() {
		return Err(StyleError::Parse("NPZ archive contains no arrays".into()));
	}
	Ok(entries)
}

/// Minimal NPY v1/v2 reader for C-ordered little-endian f32 arrays.
fn parse_npy(data: &[u8]) -> std::result::Result<ArrayD<f32>, String> {
	if data.len() < 10 || &data[..6] != b"\x93NUMPY" {
		return Err("missing NPY magic".into());
	}
	let major = data[6];
	let (header_start, header_len) = match major {
		1 => (10, LittleEndian::read_u16(&data[8..10]) as usize),
		2 => {
			if data.len() < 12 {
				return Err("truncated NPY header".into());
			}
			(12, LittleEndian::read_u32(&data[8..12]) as usize)
		},
		_ => return Err(format!("unsupported NPY version {}", major)),
	};
	if data.len() < header_start + header_len {
		return Err("truncated NPY header".into());
	}
	let header = std::str::from_utf8(&data[header_start..header_start + header_len])
		.map_err(|_| "NPY header is not valid UTF-8".to_string())?;

	if !header.contains("'descr': '<f4'") {
		return Err("only little-endian f32 arrays are supported".into());
	}
	if !header.contains("'fortran_order': False") {
		return Err("only C-ordered arrays are supported".into());
	}
	let shape = parse_shape(header)?;

	let count: usize = shape.iter().product();
	let payload = &data[header_start + header_len..];
	if payload.len() != count * 4 {
		return Err(format!(
			"payload holds {} bytes but the shape {:?} needs {}",
			payload.len(),
			shape,
			count * 4
		));
	}
	let mut values = Vec::with_capacity(count);
	for chunk in payload.chunks_exact(4) {
		values.push(LittleEndian::read_f32(chunk));
	}
	ArrayD::from_shape_vec(IxDyn(&shape), values).map_err(|_| "shape mismatch".to_string())
}

fn parse_shape(header: &str) -> std::result::Result<Vec<usize>, String> {
	let start = header.find("'shape':").ok_or_else(|| "NPY header has no shape".to_string())?;
	let open = header[start..]
		.find('(')
		.map(|o| start + o + 1)
		.ok_or_else(|| "malformed shape tuple".to_string())?;
	let close = header[open..]
		.find(')')
		.map(|c| open + c)
		.ok_or_else(|| "malformed shape tuple".to_string())?;
	header[open..close]
		.split(',')
		.map(str::trim)
		.filter(|part| !part.is_empty())
		.map(|part| {
			part.parse::<usize>()
				.map_err(|_| format!("bad shape component '{}'", part))
		})
		.collect()
}
