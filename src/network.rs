use std::fmt;
use std::path::Path;
use std::sync::Arc;

use log::info;

use crate::constants::file;
use crate::decoder::Decoder;
use crate::encoder::VggEncoder;
use crate::error::{Result, StyleError};
use crate::{load_network_file, NetworkDescription};

/// Selects which trained decoder is paired with the shared encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoderVariant {
	Generic,
	Picasso,
	VanGogh,
	Monet,
}

impl DecoderVariant {
	pub const ALL: [DecoderVariant; 4] = [
		DecoderVariant::Generic,
		DecoderVariant::Picasso,
		DecoderVariant::VanGogh,
		DecoderVariant::Monet,
	];

	/// Accepts labels: [generic, picasso, van_gogh, monet]
	pub fn from_label(label: &str) -> Result<Self> {
		match label {
			"generic" => Ok(DecoderVariant::Generic),
			"picasso" => Ok(DecoderVariant::Picasso),
			"van_gogh" => Ok(DecoderVariant::VanGogh),
			"monet" => Ok(DecoderVariant::Monet),
			_ => Err(StyleError::InvalidParameter(format!(
				"Unsupported decoder variant. Could not parse: {}",
				label
			))),
		}
	}

	pub fn label(&self) -> &'static str {
		match self {
			DecoderVariant::Generic => "generic",
			DecoderVariant::Picasso => "picasso",
			DecoderVariant::VanGogh => "van_gogh",
			DecoderVariant::Monet => "monet",
		}
	}

	pub fn weight_file(&self) -> &'static str {
		match self {
			DecoderVariant::Generic => file::DECODER_WEIGHTS,
			DecoderVariant::Picasso => file::DECODER_PICASSO_WEIGHTS,
			DecoderVariant::VanGogh => file::DECODER_VAN_GOGH_WEIGHTS,
			DecoderVariant::Monet => file::DECODER_MONET_WEIGHTS,
		}
	}

	fn description(&self) -> &'static str {
		match self {
			DecoderVariant::Generic => "decoder trained on a broad painting corpus",
			DecoderVariant::Picasso => "decoder fine-tuned on Picasso paintings",
			DecoderVariant::VanGogh => "decoder fine-tuned on van Gogh paintings",
			DecoderVariant::Monet => "decoder fine-tuned on Monet paintings",
		}
	}
}

impl fmt::Display for DecoderVariant {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "{}", self.label())
	}
}

/// One shared frozen encoder paired with one decoder. Immutable after
/// construction; inference never mutates it, so concurrent calls need no
/// locking.
#[derive(Clone, Debug)]
pub struct StyleTransferNetwork {
	encoder: Arc<VggEncoder>,
	decoder: Decoder,
	display: String,
}

impl StyleTransferNetwork {
	pub fn new(encoder: Arc<VggEncoder>, decoder: Decoder, display: &str) -> Self {
		StyleTransferNetwork {
			encoder,
			decoder,
			display: display.into(),
		}
	}

	/// Builds encoder and decoder directly from parameter maps. Used by the
	/// loading path and by tests that synthesize weights in memory.
	pub fn from_descriptions(
		encoder_desc: &NetworkDescription,
		decoder_desc: &NetworkDescription,
		display: &str,
	) -> Result<Self> {
		let encoder = Arc::new(VggEncoder::from_weights(encoder_desc)?);
		let decoder = Decoder::from_weights(decoder_desc)?;
		Ok(StyleTransferNetwork::new(encoder, decoder, display))
	}

	pub fn encoder(&self) -> &VggEncoder {
		&self.encoder
	}

	pub fn shared_encoder(&self) -> Arc<VggEncoder> {
		Arc::clone(&self.encoder)
	}

	pub fn decoder(&self) -> &Decoder {
		&self.decoder
	}
}

impl fmt::Display for StyleTransferNetwork {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "{}", self.display)
	}
}

/// All networks the process serves: the one frozen encoder plus every
/// decoder variant, loaded once at startup from a weights directory and
/// shared read-only across requests.
#[derive(Clone, Debug)]
pub struct ModelContext {
	generic: StyleTransferNetwork,
	picasso: StyleTransferNetwork,
	van_gogh: StyleTransferNetwork,
	monet: StyleTransferNetwork,
}

impl ModelContext {
	/// Loads the encoder and all decoder variants. Any missing or
	/// shape-mismatched weight file is fatal.
	pub fn load_from_dir(dir: &Path) -> Result<Self> {
		let encoder_desc = load_network_file(&dir.join(file::ENCODER_WEIGHTS))?;
		let encoder = Arc::new(VggEncoder::from_weights(&encoder_desc)?);
		info!("Loaded encoder weights from {}", dir.display());

		let load_variant = |variant: DecoderVariant| -> Result<StyleTransferNetwork> {
			let desc = load_network_file(&dir.join(variant.weight_file()))?;
			let decoder = Decoder::from_weights(&desc)?;
			info!("Loaded {} weights ({})", variant, variant.description());
			Ok(StyleTransferNetwork::new(
				Arc::clone(&encoder),
				decoder,
				variant.description(),
			))
		};

		Ok(ModelContext {
			generic: load_variant(DecoderVariant::Generic)?,
			picasso: load_variant(DecoderVariant::Picasso)?,
			van_gogh: load_variant(DecoderVariant::VanGogh)?,
			monet: load_variant(DecoderVariant::Monet)?,
		})
	}

	pub fn network(&self, variant: DecoderVariant) -> &StyleTransferNetwork {
		match variant {
			DecoderVariant::Generic => &self.generic,
			DecoderVariant::Picasso => &self.picasso,
			DecoderVariant::VanGogh => &self.van_gogh,
			DecoderVariant::Monet => &self.monet,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use tempfile::TempDir;

	#[test]
	fn variant_labels_round_trip() {
		for variant in DecoderVariant::ALL.iter() {
			assert_eq!(DecoderVariant::from_label(variant.label()).unwrap(), *variant);
		}
	}

	#[test]
	fn unknown_label_is_rejected() {
		match DecoderVariant::from_label("rembrandt") {
			Err(StyleError::InvalidParameter(msg)) => assert!(msg.contains("rembrandt")),
			other => panic!("expected invalid parameter error, got {:?}", other),
		}
	}

	#[test]
	fn missing_weight_files_fail_at_startup() {
		let dir = TempDir::new().expect("Failed to create temp dir");
		match ModelContext::load_from_dir(dir.path()) {
			Err(StyleError::ModelLoad(msg)) => assert!(msg.contains("vgg_normalised.stw")),
			other => panic!("expected model load error, got {:?}", other.map(|_| ())),
		}
	}
}
