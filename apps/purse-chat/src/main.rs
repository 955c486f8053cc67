use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = purse_chat::Args::parse();

	purse_chat::run(args).await
}
