use std::error::Error as StdError;
use std::fmt;
use std::io;
use std::path::PathBuf;

#[derive(Debug)]
pub enum StyleError {
	Io(io::Error),
	Decode(image::ImageError),
	Shape(String),
	InvalidParameter(String),
	Numerical(String),
	ModelLoad(String),
	Serialization(String),
	Parse(String),
	FileNotFound(PathBuf),
}

impl fmt::Display for StyleError {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match self {
			StyleError::Io(err) => write!(f, "IO error: {}", err),
			StyleError::Decode(err) => write!(f, "Image decoding error: {}", err),
			StyleError::Shape(msg) => write!(f, "Tensor shape error: {}", msg),
			StyleError::InvalidParameter(msg) => write!(f, "Invalid parameter: {}", msg),
			StyleError::Numerical(msg) => write!(f, "Numerical error: {}", msg),
			StyleError::ModelLoad(msg) => write!(f, "Model loading error: {}", msg),
			StyleError::Serialization(msg) => write!(f, "Serialization error: {}", msg),
			StyleError::Parse(msg) => write!(f, "Parse error: {}", msg),
			StyleError::FileNotFound(path) => write!(f, "File not found: {}", path.display()),
		}
	}
}

impl StdError for StyleError {}

impl From<io::Error> for StyleError {
	fn from(err: io::Error) -> Self {
		StyleError::Io(err)
	}
}

impl From<image::ImageError> for StyleError {
	fn from(err: image::ImageError) -> Self {
		StyleError::Decode(err)
	}
}

pub type Result<T> = std::result::Result<T, StyleError>;
