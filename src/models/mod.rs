// Data models (structs)
pub mod download;
pub mod settings;

pub use download::*;
pub use settings::*;
