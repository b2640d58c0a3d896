use super::{CrawlState, CrawlStateRegistry, RegistryError};
use crate::core::TaskDescriptor;

fn descriptors() -> Vec<TaskDescriptor> {
    vec![
        TaskDescriptor::new(1, "books", "books.example.com"),
        TaskDescriptor::new(2, "news", "news.example.com").with_param("section", "tech"),
    ]
}

#[test]
fn test_build_starts_all_tasks_running() {
    let registry = CrawlStateRegistry::new();
    registry.build(descriptors()).unwrap();

    assert_eq!(registry.len(), 2);
    assert_eq!(registry.state(1).unwrap(), CrawlState::Running);
    assert_eq!(registry.state(2).unwrap(), CrawlState::Running);
}

#[test]
fn test_build_fails_when_not_cleared() {
    let registry = CrawlStateRegistry::new();
    registry.build(descriptors()).unwrap();
    assert!(matches!(
        registry.build(descriptors()),
        Err(RegistryError::AlreadyBuilt(2))
    ));
}

#[test]
fn test_set_and_get_state() {
    let registry = CrawlStateRegistry::new();
    registry.build(descriptors()).unwrap();

    registry.set_state(1, CrawlState::Error).unwrap();
    assert_eq!(registry.state(1).unwrap(), CrawlState::Error);
    assert_eq!(registry.state(2).unwrap(), CrawlState::Running);
}

#[test]
fn test_terminal_states_absorb_transitions() {
    let registry = CrawlStateRegistry::new();
    registry.build(descriptors()).unwrap();

    registry.set_state(1, CrawlState::Complete).unwrap();
    registry.set_state(1, CrawlState::Running).unwrap();
    assert_eq!(registry.state(1).unwrap(), CrawlState::Complete);

    // Repeated error flips from the pipeline are fine.
    registry.mark_error(2).unwrap();
    registry.mark_error(2).unwrap();
    assert_eq!(registry.state(2).unwrap(), CrawlState::Error);
}

#[test]
fn test_unknown_task_is_an_error() {
    let registry = CrawlStateRegistry::new();
    registry.build(descriptors()).unwrap();

    assert!(matches!(
        registry.state(99),
        Err(RegistryError::UnknownTask(99))
    ));
    assert!(matches!(
        registry.set_state(99, CrawlState::Error),
        Err(RegistryError::UnknownTask(99))
    ));
    assert!(matches!(
        registry.descriptor(99),
        Err(RegistryError::UnknownTask(99))
    ));
}

#[test]
fn test_descriptor_lookup() {
    let registry = CrawlStateRegistry::new();
    registry.build(descriptors()).unwrap();

    let descriptor = registry.descriptor(2).unwrap();
    assert_eq!(descriptor.name, "news");
    assert_eq!(descriptor.params.get("section").unwrap(), "tech");
}

#[test]
fn test_clear_empties_registry_for_next_run() {
    let registry = CrawlStateRegistry::new();
    registry.build(descriptors()).unwrap();
    registry.clear();

    assert!(registry.is_empty());
    registry.build(descriptors()).unwrap();
    assert_eq!(registry.len(), 2);
}
