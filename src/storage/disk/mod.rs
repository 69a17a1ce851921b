pub mod file_manager;

pub use file_manager::{FileManager, FileManagerError};
