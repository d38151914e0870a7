use std::fs;
use std::path::PathBuf;

use clap::ArgMatches;
use indicatif::ProgressBar;
use log::{info, warn};
use rayon::prelude::*;

use crate::codec;
use crate::error::{Result, StyleError};
use crate::network::StyleTransferNetwork;
use crate::transfer;
use crate::validation;
use crate::ModelContext;

use super::stylize::{parse_alpha, parse_variant, weights_dir};

pub fn batch(app_m: &ArgMatches) -> Result<()> {
	let alpha = parse_alpha(app_m)?;
	let variant = parse_variant(app_m)?;
	let preserve_colors = app_m.is_present("PRESERVE_COLOR");

	let content_dir = app_m
		.value_of("CONTENT_FOLDER")
		.ok_or_else(|| StyleError::InvalidParameter("No content folder given".to_string()))?;
	let content_dir = validation::validate_directory(content_dir)?;
	let style_path = app_m
		.value_of("STYLE_FILE")
		.ok_or_else(|| StyleError::InvalidParameter("No style file given".to_string()))?;
	let style_path = validation::validate_input_file(style_path)?;
	let output_dir = app_m
		.value_of("OUTPUT_FOLDER")
		.ok_or_else(|| StyleError::InvalidParameter("No output folder given".to_string()))?;
	fs::create_dir_all(output_dir)?;
	let output_dir = validation::validate_directory(output_dir)?;

	let files = collect_images(&content_dir)?;
	if files.is_empty() {
		info!("No images found in {}", content_dir.display());
		return Ok(());
	}

	let weights_dir = weights_dir(app_m)?;
	info!("Loading networks from {}...", weights_dir.display());
	let context = ModelContext::load_from_dir(&weights_dir)?;
	let network = context.network(variant);
	let style_bytes = fs::read(&style_path)?;

	info!("Stylizing {} images using {}...", files.len(), network);
	let progress = ProgressBar::new(files.len() as u64);

	let run = || {
		files
			.par_iter()
			.map(|path| {
				let result = stylize_one(network, &style_bytes, path, &output_dir, alpha, preserve_colors);
				progress.inc(1);
				if let Err(err) = &result {
					warn!("Failed to stylize {}: {}", path.display(), err);
				}
				result
			})
			.collect::<Vec<_>>()
	};

	let results = match parse_threads(app_m)? {
		Some(threads) => {
			let pool = rayon::ThreadPoolBuilder::new()
				.num_threads(threads)
				.build()
				.map_err(|e| StyleError::InvalidParameter(format!("cannot build thread pool: {}", e)))?;
			pool.install(run)
		},
		None => run(),
	};
	progress.finish();

	let failed = results.iter().filter(|r| r.is_err()).count();
	info!("Stylized {} of {} images", results.len() - failed, results.len());
	if failed == results.len() {
		return Err(StyleError::InvalidParameter("every image in the batch failed".to_string()));
	}
	Ok(())
}

fn collect_images(dir: &PathBuf) -> Result<Vec<PathBuf>> {
	let mut files = Vec::new();
	for entry in fs::read_dir(dir)? {
		let path = entry?.path();
		if path.is_file() && validation::validate_image_extension(&path).is_ok() {
			files.push(path);
		}
	}
	files.sort();
	Ok(files)
}

fn parse_threads(app_m: &ArgMatches) -> Result<Option<usize>> {
	match app_m.value_of("THREADS") {
		Some(value) => Ok(Some(validation::validate_positive_int(value, "threads")?)),
		None => Ok(None),
	}
}

fn stylize_one(
	network: &StyleTransferNetwork,
	style_bytes: &[u8],
	path: &PathBuf,
	output_dir: &PathBuf,
	alpha: f32,
	preserve_colors: bool,
) -> Result<PathBuf> {
	let content_bytes = fs::read(path)?;
	let output = transfer::stylize_image_bytes(network, &content_bytes, style_bytes, alpha, preserve_colors)?;
	let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("image");
	let out_path = output_dir.join(format!("{}_stylized.jpg", stem));
	fs::write(&out_path, codec::encode_jpeg(&output)?)?;
	Ok(out_path)
}
