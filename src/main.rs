use std::sync::Arc;
use std::time::Duration;

use spiderhive::examples::CatalogSpider;
use spiderhive::{
    create_storage, CrawlConfig, CrawlSession, FieldKind, FieldSchema, HandlerRegistry,
    HttpFetcher, LaunchEntry, ProxySettings, StorageCategory, StorageManager, StorageType,
    StorageWriter, TaskDescriptor,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .init();

    let config = CrawlConfig::default()
        .with_wait_base(Duration::from_secs(2))
        .with_wait_max(Duration::from_secs(120))
        .with_queue_capacity(32)
        .with_proxy(ProxySettings::default().credentials_from_env());

    let data_storage = create_storage(StorageType::Disk {
        path: "data".to_string(),
    })
    .await?;
    let error_storage = create_storage(StorageType::Disk {
        path: "error".to_string(),
    })
    .await?;

    let storage = StorageManager::new()
        .register_storage(StorageCategory::Data, data_storage.clone(), "records")
        .register_storage(StorageCategory::Error, error_storage, "failures");

    let writer = Arc::new(StorageWriter::new(data_storage, "records"));
    let handlers = HandlerRegistry::new().register(
        "catalog",
        FieldSchema::new()
            .with_field("title", FieldKind::String)
            .with_field("price", FieldKind::Float),
        writer,
    );

    let fetcher = Box::new(HttpFetcher::new()?);
    let session = CrawlSession::new(config, handlers, fetcher).with_storage(storage);

    let entries = vec![LaunchEntry::new(
        TaskDescriptor::new(1, "catalog", "dummyjson.com")
            .with_param("path", "/products")
            .with_param("items_key", "products"),
        Arc::new(CatalogSpider::new()),
    )];

    let result = session.run(entries, false).await?;
    println!(
        "Run finished: {} broken tasks in {:.2}s",
        result.broken_tasks,
        result.duration_seconds()
    );

    Ok(())
}
