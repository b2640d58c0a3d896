use serde::Serialize;

#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Default)]
pub enum StorageCategory {
    #[default]
    Data, // For validated, processed records
    Error,          // For the failure log
    Custom(String), // For any custom storage needs
}
