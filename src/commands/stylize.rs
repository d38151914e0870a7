use std::fs;
use std::path::{Path, PathBuf};

use clap::ArgMatches;
use log::info;
use ndarray::ArrayD;

use crate::codec;
use crate::constants::{file, network};
use crate::error::{Result, StyleError};
use crate::logging;
use crate::network::{DecoderVariant, ModelContext};
use crate::transfer;
use crate::validation;

pub fn stylize(app_m: &ArgMatches) -> Result<()> {
	let alpha = parse_alpha(app_m)?;
	let variant = parse_variant(app_m)?;
	let preserve_colors = app_m.is_present("PRESERVE_COLOR");

	let content_path = required_image(app_m, "CONTENT_FILE")?;
	let style_path = required_image(app_m, "STYLE_FILE")?;
	let output_path = app_m
		.value_of("OUTPUT_FILE")
		.ok_or_else(|| StyleError::InvalidParameter("No output file given".to_string()))?;
	let output_path = validation::validate_output_path(output_path)?;
	let weights_dir = weights_dir(app_m)?;

	info!("Loading networks from {}...", weights_dir.display());
	let context = ModelContext::load_from_dir(&weights_dir)?;
	let network = context.network(variant);

	info!("Stylizing using {}...", network);
	let spinner = logging::create_spinner("Running style transfer...");

	let content_bytes = fs::read(&content_path)?;
	let style_bytes = fs::read(&style_path)?;
	let output = transfer::stylize_image_bytes(network, &content_bytes, &style_bytes, alpha, preserve_colors)?;

	spinner.set_message("Writing output file...");
	fs::write(&output_path, encode_for_path(&output_path, &output)?)?;

	spinner.finish_with_message("✓ Style transfer complete");
	info!("Output saved to: {}", output_path.display());
	Ok(())
}

fn required_image(app_m: &ArgMatches, name: &str) -> Result<PathBuf> {
	let value = app_m
		.value_of(name)
		.ok_or_else(|| StyleError::InvalidParameter(format!("No {} given", name.to_lowercase())))?;
	let path = validation::validate_input_file(value)?;
	validation::validate_image_extension(&path)?;
	Ok(path)
}

pub(crate) fn parse_alpha(app_m: &ArgMatches) -> Result<f32> {
	match app_m.value_of("ALPHA") {
		Some(value) => validation::parse_alpha(value),
		None => Ok(network::DEFAULT_ALPHA),
	}
}

pub(crate) fn parse_variant(app_m: &ArgMatches) -> Result<DecoderVariant> {
	DecoderVariant::from_label(app_m.value_of("VARIANT").unwrap_or("generic"))
}

pub(crate) fn weights_dir(app_m: &ArgMatches) -> Result<PathBuf> {
	validation::validate_directory(app_m.value_of("WEIGHTS_DIR").unwrap_or(file::DEFAULT_WEIGHTS_DIR))
}

/// JPEG unless the output path asks for PNG.
pub(crate) fn encode_for_path(path: &Path, tensor: &ArrayD<f32>) -> Result<Vec<u8>> {
	match path.extension().and_then(|e| e.to_str()).map(|e| e.to_lowercase()) {
		Some(ref ext) if ext == "png" => codec::encode_png(tensor),
		_ => codec::encode_jpeg(tensor),
	}
}
