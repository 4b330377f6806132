use dotenv::dotenv;

use extracr::{AppConfig, AppContainer};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    dotenv().ok();
    env_logger::init();

    let config = AppConfig::from_env()?;

    // Connecting and migrating block, so keep them off the runtime threads.
    let container = tokio::task::spawn_blocking(move || AppContainer::new(&config)).await??;
    let store = &container.document_store;

    let total = store.count(None).await?;
    tracing::info!(total, "OCR document store ready");

    match store.latest().await? {
        Some(document) => tracing::info!(
            document_id = %document.id(),
            filename = document.filename(),
            created_at = %document.created_at(),
            has_fields = document.has_fields(),
            "Latest OCR document"
        ),
        None => tracing::info!("No rows in ocr_documents"),
    }

    Ok(())
}
