#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = grading_desk::run().await {
        eprintln!("grading-desk fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
