#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = examify_client::run().await {
        eprintln!("examify-client fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
