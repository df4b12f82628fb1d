#[tokio::main]
async fn main() {
    if let Err(e) = handler_loader_cli::init().await {
        eprintln!("❌ {e}");
        std::process::exit(1);
    }
}
