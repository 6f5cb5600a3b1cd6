pub mod storage;

pub use storage::{StorageError, StudyDirectory};
