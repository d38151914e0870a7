extern crate adain_rust;
#[macro_use]
extern crate log;

use adain_rust::{cli, commands, logging};

fn main() {
	logging::init_simple_logger();

	let app_m = cli::build_cli();

	let result = match app_m.subcommand() {
		("batch", Some(sub_m)) => commands::batch(sub_m),
		("convert", Some(sub_m)) => commands::convert(sub_m),
		("inspect", Some(sub_m)) => commands::inspect(sub_m),
		_ => commands::stylize(&app_m),
	};

	if let Err(err) = result {
		error!("Error: {}", err);
		std::process::exit(1);
	}
}
