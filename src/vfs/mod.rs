mod entry;
mod local_fs;
mod memory_fs;
mod resolver;

pub use entry::Entry;
pub use local_fs::{DEFAULT_DIRECTORY_MODE, DEFAULT_FILE_MODE, LocalFS};
pub use memory_fs::MemoryFS;
pub use resolver::PathResolver;
