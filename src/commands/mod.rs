// Tauri command handlers - one file per domain
pub mod downloads;
