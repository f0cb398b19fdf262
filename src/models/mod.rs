pub mod analysis;
pub mod article;
pub mod batch;
pub mod loaders;
pub mod session;

pub use analysis::{AnalyzedArticle, ArticleAnalysis, ComparisonItem, ComparisonReport, TermOverlap};
pub use article::{Article, ArticleStatus, ArticleSummary, Image, ImageStatus};
pub use batch::{BatchOutcome, BatchResult, BatchTask, ErrorRecord};
pub use loaders::load_batch_task;
pub use session::{Cookie, Session};
