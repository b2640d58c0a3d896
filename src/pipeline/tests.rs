use super::schema::{FieldKind, FieldSchema, FieldSpec, RecordSchema, SchemaViolation};
use super::{HandlerRegistry, RecordPipeline, RecordWriter, TaskHandler};
use crate::core::{ScrapedRecord, TaskDescriptor, TaskId};
use crate::launcher::QueueItem;
use crate::registry::{CrawlState, CrawlStateRegistry};
use crate::stats::StatsTracker;
use crate::storage::base::StorageError;
use crate::{ScraperError, ScraperResult};
use async_trait::async_trait;
use parking_lot::Mutex;
use regex::Regex;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::mpsc;

#[derive(Clone, Default)]
struct MemoryWriter {
    persisted: Arc<Mutex<Vec<ScrapedRecord>>>,
    fail: bool,
}

impl MemoryWriter {
    fn new() -> Self {
        Self::default()
    }

    fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    fn count(&self) -> usize {
        self.persisted.lock().len()
    }
}

#[async_trait]
impl RecordWriter for MemoryWriter {
    async fn persist(
        &self,
        _descriptor: &TaskDescriptor,
        record: &ScrapedRecord,
    ) -> ScraperResult<()> {
        if self.fail {
            return Err(StorageError::OperationError("disk full".to_string()).into());
        }
        self.persisted.lock().push(record.clone());
        Ok(())
    }
}

fn record(task_id: TaskId, value: serde_json::Value) -> QueueItem {
    QueueItem::Record(ScrapedRecord {
        task_id,
        payload: value.as_object().unwrap().clone(),
    })
}

fn book_schema() -> FieldSchema {
    FieldSchema::new()
        .with_field("title", FieldKind::String)
        .with_field("price", FieldKind::Float)
}

fn registry_for(descriptors: Vec<TaskDescriptor>) -> Arc<CrawlStateRegistry> {
    let registry = Arc::new(CrawlStateRegistry::new());
    registry.build(descriptors).unwrap();
    registry
}

async fn run_pipeline(
    items: Vec<QueueItem>,
    registry: Arc<CrawlStateRegistry>,
    handlers: HandlerRegistry,
) -> ScraperResult<()> {
    let (tx, rx) = mpsc::channel(items.len() + 1);
    for item in items {
        tx.send(item).await.unwrap();
    }
    tx.send(QueueItem::Sentinel).await.unwrap();
    drop(tx);

    RecordPipeline::new(rx, registry, Arc::new(handlers), StatsTracker::new())
        .listen()
        .await
}

#[tokio::test]
async fn test_valid_record_is_persisted_exactly_once() {
    let registry = registry_for(vec![TaskDescriptor::new(1, "books", "books.example.com")]);
    let writer = Arc::new(MemoryWriter::new());
    let handlers = HandlerRegistry::new().register("books", book_schema(), writer.clone());

    run_pipeline(
        vec![record(1, json!({"title": "Dune", "price": 9.99}))],
        Arc::clone(&registry),
        handlers,
    )
    .await
    .unwrap();

    assert_eq!(writer.count(), 1);
    assert_eq!(registry.state(1).unwrap(), CrawlState::Running);
}

#[tokio::test]
async fn test_validation_failure_drops_record_and_flags_task() {
    let registry = registry_for(vec![TaskDescriptor::new(1, "books", "books.example.com")]);
    let writer = Arc::new(MemoryWriter::new());
    let handlers = HandlerRegistry::new().register("books", book_schema(), writer.clone());

    run_pipeline(
        vec![record(1, json!({"price": "not a number"}))],
        Arc::clone(&registry),
        handlers,
    )
    .await
    .unwrap();

    assert_eq!(writer.count(), 0);
    assert_eq!(registry.state(1).unwrap(), CrawlState::Error);
}

#[tokio::test]
async fn test_missing_handler_flags_task_and_keeps_draining() {
    let registry = registry_for(vec![
        TaskDescriptor::new(1, "ghost", "ghost.example.com"),
        TaskDescriptor::new(2, "books", "books.example.com"),
    ]);
    let writer = Arc::new(MemoryWriter::new());
    let handlers = HandlerRegistry::new().register("books", book_schema(), writer.clone());

    run_pipeline(
        vec![
            record(1, json!({"anything": true})),
            record(2, json!({"title": "Dune", "price": 9.99})),
        ],
        Arc::clone(&registry),
        handlers,
    )
    .await
    .unwrap();

    assert_eq!(registry.state(1).unwrap(), CrawlState::Error);
    assert_eq!(registry.state(2).unwrap(), CrawlState::Running);
    assert_eq!(writer.count(), 1);
}

#[tokio::test]
async fn test_handler_without_schema_flags_task() {
    let registry = registry_for(vec![TaskDescriptor::new(1, "books", "books.example.com")]);
    let writer = Arc::new(MemoryWriter::new());
    let handlers = HandlerRegistry::new().register_handler(
        "books",
        TaskHandler {
            schema: None,
            writer: writer.clone(),
        },
    );

    run_pipeline(
        vec![record(1, json!({"title": "Dune", "price": 9.99}))],
        Arc::clone(&registry),
        handlers,
    )
    .await
    .unwrap();

    assert_eq!(writer.count(), 0);
    assert_eq!(registry.state(1).unwrap(), CrawlState::Error);
}

#[tokio::test]
async fn test_persistence_failure_ends_the_run() {
    let registry = registry_for(vec![TaskDescriptor::new(1, "books", "books.example.com")]);
    let writer = Arc::new(MemoryWriter::failing());
    let handlers = HandlerRegistry::new().register("books", book_schema(), writer.clone());

    let result = run_pipeline(
        vec![
            record(1, json!({"title": "Dune", "price": 9.99})),
            record(1, json!({"title": "Foundation", "price": 7.50})),
        ],
        registry,
        handlers,
    )
    .await;

    assert!(matches!(result, Err(ScraperError::StorageError(_))));
    assert_eq!(writer.count(), 0);
}

#[tokio::test]
async fn test_record_for_unknown_task_is_dropped() {
    let registry = registry_for(vec![TaskDescriptor::new(1, "books", "books.example.com")]);
    let writer = Arc::new(MemoryWriter::new());
    let handlers = HandlerRegistry::new().register("books", book_schema(), writer.clone());

    run_pipeline(
        vec![record(99, json!({"title": "Dune", "price": 9.99}))],
        registry,
        handlers,
    )
    .await
    .unwrap();

    assert_eq!(writer.count(), 0);
}

#[test]
fn test_field_schema_accepts_matching_payload() {
    let schema = FieldSchema::new()
        .with_field("title", FieldKind::String)
        .with_field("pages", FieldKind::Integer)
        .with_field("price", FieldKind::Float)
        .with_field("in_stock", FieldKind::Boolean)
        .with_field("sku", FieldKind::Pattern(Regex::new(r"^[A-Z]{2}-\d{4}$").unwrap()))
        .with_spec(FieldSpec::new("subtitle", FieldKind::String).optional());

    let payload = json!({
        "title": "Dune",
        "pages": 412,
        "price": 9.99,
        "in_stock": true,
        "sku": "BK-0042",
    });
    assert!(schema.validate(payload.as_object().unwrap()).is_ok());
}

#[test]
fn test_field_schema_rejects_missing_required_field() {
    let schema = FieldSchema::new().with_field("title", FieldKind::String);
    let payload = json!({"price": 9.99});
    assert!(matches!(
        schema.validate(payload.as_object().unwrap()),
        Err(SchemaViolation::MissingField(field)) if field == "title"
    ));
}

#[test]
fn test_field_schema_rejects_wrong_kind() {
    let schema = FieldSchema::new().with_field("pages", FieldKind::Integer);
    let payload = json!({"pages": "many"});
    assert!(matches!(
        schema.validate(payload.as_object().unwrap()),
        Err(SchemaViolation::WrongKind { .. })
    ));
}

#[test]
fn test_field_schema_rejects_pattern_mismatch() {
    let schema = FieldSchema::new()
        .with_field("sku", FieldKind::Pattern(Regex::new(r"^[A-Z]{2}-\d{4}$").unwrap()));
    let payload = json!({"sku": "nope"});
    assert!(matches!(
        schema.validate(payload.as_object().unwrap()),
        Err(SchemaViolation::PatternMismatch { .. })
    ));
}

#[test]
fn test_float_field_accepts_integer_value() {
    let schema = FieldSchema::new().with_field("price", FieldKind::Float);
    let payload = json!({"price": 10});
    assert!(schema.validate(payload.as_object().unwrap()).is_ok());
}
