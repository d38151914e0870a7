use clap::{App, AppSettings, Arg, ArgMatches, SubCommand};

pub fn build_cli() -> ArgMatches<'static> {
	App::new("Rusty AdaIN")
		.version("v0.2.0")
		.author("ktheindifferent")
		.about("A convolutional neural network that repaints a photo in the style of another image")
		.settings(&[AppSettings::SubcommandsNegateReqs, AppSettings::VersionlessSubcommands])
		.arg(build_content_file_arg())
		.arg(build_style_file_arg())
		.arg(build_output_file_arg())
		.arg(build_alpha_arg())
		.arg(build_variant_arg())
		.arg(build_weights_dir_arg())
		.arg(build_preserve_color_arg())
		.subcommand(build_batch_subcommand())
		.subcommand(build_convert_subcommand())
		.subcommand(build_inspect_subcommand())
		.get_matches()
}

fn build_content_file_arg() -> Arg<'static, 'static> {
	Arg::with_name("CONTENT_FILE")
		.help("Sets the content image whose structure is preserved")
		.required(true)
		.index(1)
}

fn build_style_file_arg() -> Arg<'static, 'static> {
	Arg::with_name("STYLE_FILE")
		.help("Sets the style image whose texture and color statistics are transferred")
		.required(true)
		.index(2)
}

fn build_output_file_arg() -> Arg<'static, 'static> {
	Arg::with_name("OUTPUT_FILE")
		.help("Sets the output file to write/overwrite (.jpg or .png)")
		.required(true)
		.index(3)
}

fn build_alpha_arg() -> Arg<'static, 'static> {
	Arg::with_name("ALPHA")
		.help("Style strength between 0 (content unchanged) and 1 (full style). Default: 1.0")
		.short("a")
		.long("alpha")
		.value_name("ALPHA")
		.empty_values(false)
}

fn build_variant_arg() -> Arg<'static, 'static> {
	Arg::with_name("VARIANT")
		.help("Sets which decoder variant to pair with the shared encoder. Default: generic")
		.short("p")
		.long("parameters")
		.value_name("VARIANT")
		.possible_values(&["generic", "picasso", "van_gogh", "monet"])
		.empty_values(false)
}

fn build_weights_dir_arg() -> Arg<'static, 'static> {
	Arg::with_name("WEIGHTS_DIR")
		.help("Directory holding the .stw weight files. Default: model_weights")
		.short("w")
		.long("weights")
		.value_name("DIR")
		.empty_values(false)
}

fn build_preserve_color_arg() -> Arg<'static, 'static> {
	Arg::with_name("PRESERVE_COLOR")
		.help("Aligns the style image's colors to the content image before the transfer")
		.long("preserve-color")
}

fn build_batch_subcommand() -> App<'static, 'static> {
	SubCommand::with_name("batch")
		.about("Stylize every image in a folder against one style image")
		.arg(
			Arg::with_name("CONTENT_FOLDER")
				.required(true)
				.index(1)
				.help("Images from this folder will be stylized"),
		)
		.arg(
			Arg::with_name("STYLE_FILE")
				.required(true)
				.index(2)
				.help("The style image applied to every content image"),
		)
		.arg(
			Arg::with_name("OUTPUT_FOLDER")
				.required(true)
				.index(3)
				.help("Stylized images are written here, one per input"),
		)
		.arg(build_alpha_arg())
		.arg(build_variant_arg())
		.arg(build_weights_dir_arg())
		.arg(build_preserve_color_arg())
		.arg(
			Arg::with_name("THREADS")
				.short("t")
				.long("threads")
				.value_name("N")
				.help("Number of worker threads. Default: one per logical core")
				.empty_values(false),
		)
}

fn build_convert_subcommand() -> App<'static, 'static> {
	SubCommand::with_name("convert")
		.about("Convert an NPZ weight export into a native .stw weight file")
		.arg(
			Arg::with_name("INPUT_FILE")
				.required(true)
				.index(1)
				.help("The NPZ archive exported from the original training checkpoints"),
		)
		.arg(
			Arg::with_name("OUTPUT_FILE")
				.required(true)
				.index(2)
				.help("The .stw weight file to write/overwrite"),
		)
		.arg(
			Arg::with_name("KIND")
				.required(true)
				.short("k")
				.long("kind")
				.value_name("KIND")
				.possible_values(&["encoder", "decoder"])
				.help("Which network component the archive holds"),
		)
		.arg(
			Arg::with_name("QUANTISE")
				.long("quantise")
				.help("Zero low mantissa bits to shrink the output file"),
		)
}

fn build_inspect_subcommand() -> App<'static, 'static> {
	SubCommand::with_name("inspect")
		.about("List the layers stored in a .stw weight file")
		.arg(
			Arg::with_name("WEIGHT_FILE")
				.required(true)
				.index(1)
				.help("The weight file to inspect"),
		)
}
