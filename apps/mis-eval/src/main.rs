// crates.io
use clap::Parser;
// self
use mis_eval::Args;

fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;
	let args = Args::parse();
	mis_eval::run(args)
}
