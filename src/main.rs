#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = bandly_rust::run().await {
        eprintln!("bandly-rust fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
