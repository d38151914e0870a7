use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

/// Initialize a plain stderr logger for CLI output. Verbosity follows
/// RUST_LOG, defaulting to info.
pub fn init_simple_logger() {
	let env = env_logger::Env::default().default_filter_or("info");
	let _ = env_logger::Builder::from_env(env).format_timestamp(None).try_init();
}

/// A spinner for long-running CLI work.
pub fn create_spinner(message: &str) -> ProgressBar {
	let spinner = ProgressBar::new_spinner();
	spinner.set_style(
		ProgressStyle::default_spinner()
			.template("{spinner:.green} {msg}")
			.unwrap_or_else(|_| ProgressStyle::default_spinner()),
	);
	spinner.set_message(message.to_string());
	spinner.enable_steady_tick(Duration::from_millis(100));
	spinner
}
