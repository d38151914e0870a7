use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Result, StyleError};

/// Validates that the style blend factor lies in [0, 1].
pub fn validate_alpha(alpha: f32) -> Result<()> {
	if !alpha.is_finite() || alpha < 0.0 || alpha > 1.0 {
		return Err(StyleError::InvalidParameter(format!(
			"alpha ({}) must lie in [0, 1]",
			alpha
		)));
	}
	Ok(())
}

/// Parses and validates an alpha command-line argument.
pub fn parse_alpha(value: &str) -> Result<f32> {
	let parsed = value
		.parse::<f32>()
		.map_err(|_| StyleError::Parse(format!("alpha must be a number, got '{}'", value)))?;
	validate_alpha(parsed)?;
	Ok(parsed)
}

/// Validates that a file exists and is readable
pub fn validate_input_file(path: &str) -> Result<PathBuf> {
	let path = Path::new(path);

	if !path.exists() {
		return Err(StyleError::FileNotFound(path.to_path_buf()));
	}

	if !path.is_file() {
		return Err(StyleError::InvalidParameter(format!("{} is not a file", path.display())));
	}

	fs::metadata(path)?;

	Ok(path.to_path_buf())
}

/// Validates that the output path's parent directory exists
pub fn validate_output_path(path: &str) -> Result<PathBuf> {
	let path = Path::new(path);

	if let Some(parent) = path.parent() {
		if !parent.as_os_str().is_empty() && !parent.is_dir() {
			return Err(StyleError::InvalidParameter(format!(
				"Parent directory {} does not exist",
				parent.display()
			)));
		}
	}

	if path.exists() && !path.is_file() {
		return Err(StyleError::InvalidParameter(format!(
			"{} exists but is not a file",
			path.display()
		)));
	}

	Ok(path.to_path_buf())
}

/// Validates that a directory exists and is readable
pub fn validate_directory(path: &str) -> Result<PathBuf> {
	let path = Path::new(path);

	if !path.exists() {
		return Err(StyleError::FileNotFound(path.to_path_buf()));
	}

	if !path.is_dir() {
		return Err(StyleError::InvalidParameter(format!(
			"{} is not a directory",
			path.display()
		)));
	}

	Ok(path.to_path_buf())
}

/// Validates a positive integer parameter
pub fn validate_positive_int(value: &str, param_name: &str) -> Result<usize> {
	let parsed = value
		.parse::<usize>()
		.map_err(|_| StyleError::Parse(format!("{} must be a positive integer", param_name)))?;

	if parsed == 0 {
		return Err(StyleError::InvalidParameter(format!(
			"{} must be greater than 0",
			param_name
		)));
	}

	Ok(parsed)
}

/// Validates that an image file has a supported extension
pub fn validate_image_extension(path: &Path) -> Result<()> {
	let valid_extensions = ["png", "jpg", "jpeg", "gif", "bmp", "tiff", "webp"];

	let extension = path.extension().and_then(|e| e.to_str()).map(|e| e.to_lowercase());

	match extension {
		Some(ext) if valid_extensions.contains(&ext.as_str()) => Ok(()),
		Some(ext) => Err(StyleError::InvalidParameter(format!(
			"Unsupported image format: .{}. Supported formats: {}",
			ext,
			valid_extensions.join(", ")
		))),
		None => Err(StyleError::InvalidParameter(
			"File has no extension. Please specify an image file with a valid extension".to_string(),
		)),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::fs::File;
	use tempfile::TempDir;

	#[test]
	fn alpha_bounds_are_inclusive() {
		assert!(validate_alpha(0.0).is_ok());
		assert!(validate_alpha(1.0).is_ok());
		assert!(validate_alpha(0.37).is_ok());
		assert!(validate_alpha(-0.01).is_err());
		assert!(validate_alpha(1.01).is_err());
		assert!(validate_alpha(std::f32::INFINITY).is_err());
	}

	#[test]
	fn alpha_parses_from_strings() {
		assert_eq!(parse_alpha("0.5").unwrap(), 0.5);
		assert!(parse_alpha("1.5").is_err());
		assert!(parse_alpha("strong").is_err());
	}

	#[test]
	fn input_file_must_exist() {
		let dir = TempDir::new().expect("Failed to create temp dir for test");
		let file_path = dir.path().join("content.png");
		File::create(&file_path).expect("Failed to create test file");

		assert!(validate_input_file(file_path.to_str().expect("Path to str failed")).is_ok());
		assert!(validate_input_file("/nonexistent/content.png").is_err());
	}

	#[test]
	fn output_parent_must_exist() {
		let dir = TempDir::new().expect("Failed to create temp dir for test");
		let ok_path = dir.path().join("output.jpg");
		assert!(validate_output_path(ok_path.to_str().expect("Path to str failed")).is_ok());
		assert!(validate_output_path("/nonexistent/dir/output.jpg").is_err());
	}

	#[test]
	fn image_extensions_are_checked() {
		assert!(validate_image_extension(Path::new("photo.jpg")).is_ok());
		assert!(validate_image_extension(Path::new("photo.png")).is_ok());
		assert!(validate_image_extension(Path::new("weights.stw")).is_err());
		assert!(validate_image_extension(Path::new("no_extension")).is_err());
	}
}
