//! Data models
//!
//! Entities stored in the database (Author, Blog, Document, Comment, Quiz,
//! Feedback), their create/update inputs, list filters and pagination types.

mod author;
mod blog;
mod comment;
mod document;
mod feedback;
pub mod limits;
mod pagination;
mod quiz;

pub use author::{Author, CreateAuthorInput, UpdateAuthorInput};
pub use blog::{Blog, BlogFilter, CreateBlogInput, UpdateBlogInput};
pub use comment::{Comment, CommentWithDocument, CreateCommentInput};
pub use document::{
    CreateDocumentInput, Document, DocumentFilter, DocumentFilterOptions, DocumentType,
    UpdateDocumentInput,
};
pub use feedback::{CreateFeedbackInput, Feedback, FeedbackCounts, FeedbackStatus};
pub use pagination::{ListParams, PagedResult, SortOrder};
pub use quiz::{
    CategoryCount, CreateQuizInput, Difficulty, PublicQuestion, PublicQuiz, Question,
    QuestionReview, Quiz, QuizFilter, QuizResult, QuizSession, QuizSummary, SessionStarted,
    StartSessionInput, SubmitAnswersInput, UpdateQuizInput,
};
