use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = sift_query::Args::parse();

	sift_query::run(args).await
}
