// File system helpers: JSON persistence and downloaded media files
pub mod json_ops;
pub mod media_files;

pub use json_ops::*;
pub use media_files::*;
