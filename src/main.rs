#[tokio::main]
async fn main() {
    if let Err(e) = dockpulse_backend::run().await {
        eprintln!("dockpulse-backend failed: {}", e);
        std::process::exit(1);
    }
}
