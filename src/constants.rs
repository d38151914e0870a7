pub mod network {
	pub const CHANNELS: usize = 3;
	/// Channel widths at the four encoder taps, shallow to deep.
	pub const STAGE_CHANNELS: [usize; 4] = [64, 128, 256, 512];
	/// Added to the spatial variance before the square root.
	pub const STATS_EPSILON: f32 = 1e-5;
	pub const DEFAULT_ALPHA: f32 = 1.0;
	pub const CONV_KERNEL: usize = 3;
	pub const POOL_SIZE: usize = 2;
}

pub mod coral {
	/// Scale of the identity added to the channel covariance of the
	/// standardized pixels.
	pub const IDENTITY_REGULARIZATION: f32 = 1.0;
	/// Channel standard deviations below this are treated as degenerate.
	pub const DEGENERATE_STD: f32 = 1e-8;
}

pub mod codec {
	/// Shorter spatial side after the decode-time resize.
	pub const SHORT_SIDE: u32 = 512;
	pub const JPEG_QUALITY: u8 = 90;
}

pub mod file {
	pub const DEFAULT_WEIGHTS_DIR: &str = "model_weights";
	pub const STW_EXTENSION: &str = ".stw";
	pub const NPZ_EXTENSION: &str = ".npz";
	pub const ENCODER_WEIGHTS: &str = "vgg_normalised.stw";
	pub const DECODER_WEIGHTS: &str = "decoder.stw";
	pub const DECODER_PICASSO_WEIGHTS: &str = "decoder_picasso.stw";
	pub const DECODER_VAN_GOGH_WEIGHTS: &str = "decoder_van_gogh.stw";
	pub const DECODER_MONET_WEIGHTS: &str = "decoder_monet.stw";
}
