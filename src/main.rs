use clap::Parser;

#[tokio::main]
async fn main() {
    let cli = hydra::cli::Cli::parse();
    if let Err(e) = hydra::cmd::dispatch(cli).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
