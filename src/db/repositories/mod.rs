//! Database repositories
//!
//! One repository per entity. Each is a trait with a single SQLx
//! implementation that dispatches on the configured driver.

pub mod author;
pub mod blog;
pub mod comment;
pub mod document;
pub mod feedback;
pub mod quiz;

pub use author::{AuthorRepository, SqlxAuthorRepository};
pub use blog::{BlogRepository, SqlxBlogRepository};
pub use comment::{CommentRepository, SqlxCommentRepository};
pub use document::{DocumentRepository, SqlxDocumentRepository};
pub use feedback::{FeedbackRepository, SqlxFeedbackRepository};
pub use quiz::{QuizRepository, SqlxQuizRepository};
