#[tokio::main]
async fn main() {
    if let Err(err) = places_anchors::run().await {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
