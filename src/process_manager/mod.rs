// Downloader process management: output splitting, parsing and supervision
pub mod downloader;
pub mod line_splitter;
pub mod progress_parser;

pub use downloader::*;
pub use line_splitter::LineSplitter;
pub use progress_parser::{fragment_percent, parse_line, ParsedLine};
