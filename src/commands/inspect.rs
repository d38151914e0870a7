use clap::ArgMatches;

use crate::error::{Result, StyleError};
use crate::load_network_file;
use crate::validation;

pub fn inspect(sub_m: &ArgMatches) -> Result<()> {
	let path = sub_m
		.value_of("WEIGHT_FILE")
		.ok_or_else(|| StyleError::InvalidParameter("No weight file given".to_string()))?;
	let path = validation::validate_input_file(path)?;
	let desc = load_network_file(&path)?;

	println!("{} (format v{})", path.display(), desc.format_version);
	let mut total = 0usize;
	for (name, array) in desc.parameters.iter() {
		total += array.len();
		println!("  {:<24} {:?}", name, array.shape());
	}
	println!("{} values in {} parameter arrays", total, desc.parameters.len());
	Ok(())
}
