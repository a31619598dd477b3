//! SQLite persistence: split-pool database handle and the task repository.

pub mod pool;
pub mod task;

pub use pool::DatabasePool;
pub use task::SqliteTaskRepository;
