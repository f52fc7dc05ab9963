//! Document model
//!
//! A document is the record of an uploaded study file (notes, past papers,
//! syllabi...). The file itself lives elsewhere; only its URL is stored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::SortOrder;

/// Kind of study material
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    #[default]
    Notes,
    QuestionPaper,
    Syllabus,
    Book,
    Assignment,
    Other,
}

impl DocumentType {
    pub const ALL: [DocumentType; 6] = [
        DocumentType::Notes,
        DocumentType::QuestionPaper,
        DocumentType::Syllabus,
        DocumentType::Book,
        DocumentType::Assignment,
        DocumentType::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::Notes => "notes",
            DocumentType::QuestionPaper => "question_paper",
            DocumentType::Syllabus => "syllabus",
            DocumentType::Book => "book",
            DocumentType::Assignment => "assignment",
            DocumentType::Other => "other",
        }
    }

    /// Human-readable label for pages
    pub fn label(&self) -> &'static str {
        match self {
            DocumentType::Notes => "Notes",
            DocumentType::QuestionPaper => "Question Paper",
            DocumentType::Syllabus => "Syllabus",
            DocumentType::Book => "Book",
            DocumentType::Assignment => "Assignment",
            DocumentType::Other => "Other",
        }
    }
}

impl std::fmt::Display for DocumentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DocumentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace(['-', ' '], "_").as_str() {
            "notes" => Ok(Self::Notes),
            "question_paper" => Ok(Self::QuestionPaper),
            "syllabus" => Ok(Self::Syllabus),
            "book" => Ok(Self::Book),
            "assignment" => Ok(Self::Assignment),
            "other" => Ok(Self::Other),
            _ => Err(format!("Invalid document type: {}", s)),
        }
    }
}

/// Document entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub doc_type: DocumentType,
    pub subject: String,
    pub university: String,
    pub year: Option<i32>,
    pub file_url: String,
    pub description: String,
    pub tags: Vec<String>,
    pub view_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document {
    /// Whether the file can be previewed inline as a PDF
    pub fn is_pdf(&self) -> bool {
        let path = self.file_url.split(['?', '#']).next().unwrap_or("");
        path.to_lowercase().ends_with(".pdf")
    }
}

/// Input for creating a document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateDocumentInput {
    pub title: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default, rename = "type", alias = "doc_type")]
    pub doc_type: DocumentType,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub university: String,
    #[serde(default)]
    pub year: Option<i32>,
    pub file_url: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl CreateDocumentInput {
    pub fn new(title: impl Into<String>, file_url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            file_url: file_url.into(),
            ..Default::default()
        }
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }
}

/// Input for updating a document; `None` leaves a field unchanged
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateDocumentInput {
    pub title: Option<String>,
    pub slug: Option<String>,
    #[serde(default, rename = "type", alias = "doc_type")]
    pub doc_type: Option<DocumentType>,
    pub subject: Option<String>,
    pub university: Option<String>,
    pub year: Option<i32>,
    pub file_url: Option<String>,
    pub description: Option<String>,
    pub tags: Option<Vec<String>>,
}

/// Filters for document list queries
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentFilter {
    /// Substring match on title, description, subject and university
    pub search: Option<String>,
    pub doc_type: Option<DocumentType>,
    pub subject: Option<String>,
    pub university: Option<String>,
    pub year: Option<i32>,
    pub tag: Option<String>,
    pub sort: SortOrder,
}

/// Distinct values offered by the document search filters
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentFilterOptions {
    pub subjects: Vec<String>,
    pub universities: Vec<String>,
    pub types: Vec<DocumentType>,
}
