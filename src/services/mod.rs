pub mod analyzer;
pub mod detector;
pub mod extractor;
pub mod image_downloader;
pub mod session_store;

pub use analyzer::{ArticleAnalyzer, ComparisonAnalyzer};
pub use detector::{PageVerdict, VerificationDetector};
pub use extractor::{ContentExtractor, ExtractedContent, ImageRef};
pub use image_downloader::ImageDownloader;
pub use session_store::{FileSessionStore, MemorySessionStore, SessionStore};
