#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = lms_grading::run().await {
        eprintln!("lms-grading fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
