use clap::ArgMatches;
use log::info;

use crate::error::{Result, StyleError};
use crate::logging;
use crate::model_converter::{convert_npz_file, ComponentKind};
use crate::validation;

pub fn convert(sub_m: &ArgMatches) -> Result<()> {
	let input = sub_m
		.value_of("INPUT_FILE")
		.ok_or_else(|| StyleError::InvalidParameter("No input file given".to_string()))?;
	let input = validation::validate_input_file(input)?;
	let output = sub_m
		.value_of("OUTPUT_FILE")
		.ok_or_else(|| StyleError::InvalidParameter("No output file given".to_string()))?;
	let output = validation::validate_output_path(output)?;
	let kind = sub_m
		.value_of("KIND")
		.ok_or_else(|| StyleError::InvalidParameter("No component kind given".to_string()))?;
	let kind = ComponentKind::from_label(kind)?;
	let quantise = sub_m.is_present("QUANTISE");

	info!("Converting {} as {:?} weights...", input.display(), kind);
	let spinner = logging::create_spinner("Converting weights...");
	convert_npz_file(&input, &output, kind, quantise)?;
	spinner.finish_with_message("✓ Conversion complete");
	Ok(())
}
