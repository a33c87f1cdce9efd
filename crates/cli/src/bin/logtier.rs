use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    logtier_cli::main_entry().await
}
