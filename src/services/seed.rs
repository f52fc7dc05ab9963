//! Sample content for fresh installs

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::models::{
    BlogFilter, CreateAuthorInput, CreateBlogInput, CreateCommentInput, CreateDocumentInput,
    CreateQuizInput, Difficulty, DocumentType, Question,
};
use crate::services::{AuthorService, BlogService, CommentService, DocumentService, QuizService};

/// What a seed run inserted
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedReport {
    /// True when content already existed and nothing was inserted
    pub skipped: bool,
    pub authors: usize,
    pub blogs: usize,
    pub documents: usize,
    pub quizzes: usize,
    pub comments: usize,
}

pub struct SeedService {
    authors: Arc<AuthorService>,
    blogs: Arc<BlogService>,
    documents: Arc<DocumentService>,
    quizzes: Arc<QuizService>,
    comments: Arc<CommentService>,
}

impl SeedService {
    pub fn new(
        authors: Arc<AuthorService>,
        blogs: Arc<BlogService>,
        documents: Arc<DocumentService>,
        quizzes: Arc<QuizService>,
        comments: Arc<CommentService>,
    ) -> Self {
        Self {
            authors,
            blogs,
            documents,
            quizzes,
            comments,
        }
    }

    /// Whether the site has no blogs, documents or quizzes yet
    pub async fn is_empty(&self) -> anyhow::Result<bool> {
        let blogs = self
            .blogs
            .list(&BlogFilter::default(), &crate::models::ListParams::new(1, 1))
            .await?
            .total;
        Ok(blogs == 0 && self.documents.count().await? == 0 && self.quizzes.count().await? == 0)
    }

    /// Insert the sample content unless the site already has some.
    ///
    /// Inserts go through the services, so slugs, rendering and validation
    /// match content created by hand.
    pub async fn run(&self) -> anyhow::Result<SeedReport> {
        if !self.is_empty().await? {
            tracing::info!("Content already present, skipping seed");
            return Ok(SeedReport {
                skipped: true,
                ..Default::default()
            });
        }

        let mut report = SeedReport::default();

        let mut author_ids = Vec::new();
        for author in sample_authors() {
            author_ids.push(self.authors.create(author).await?.id);
            report.authors += 1;
        }

        for (i, blog) in sample_blogs().into_iter().enumerate() {
            let blog = match author_ids.get(i % author_ids.len().max(1)) {
                Some(id) => blog.with_author(*id),
                None => blog,
            };
            self.blogs.create(blog).await?;
            report.blogs += 1;
        }

        let mut document_slugs = Vec::new();
        for document in sample_documents() {
            document_slugs.push(self.documents.create(document).await?.slug);
            report.documents += 1;
        }

        for quiz in sample_quizzes() {
            self.quizzes.create(quiz).await?;
            report.quizzes += 1;
        }

        for (slug, comment) in document_slugs.iter().zip(sample_comments()) {
            self.comments.create(slug, comment).await?;
            report.comments += 1;
        }

        tracing::info!(
            "Seeded {} authors, {} blogs, {} documents, {} quizzes, {} comments",
            report.authors,
            report.blogs,
            report.documents,
            report.quizzes,
            report.comments
        );
        Ok(report)
    }
}

fn sample_authors() -> Vec<CreateAuthorInput> {
    vec![
        CreateAuthorInput::new("Priya Raman")
            .with_bio("Final-year engineering student who writes about study habits."),
        CreateAuthorInput::new("Daniel Okafor")
            .with_bio("Maths tutor. Collects past papers and turns them into practice sets."),
    ]
}

fn sample_blogs() -> Vec<CreateBlogInput> {
    vec![
        CreateBlogInput::new(
            "How to Plan Your Exam Revision",
            "## Start with the syllabus\n\nList every topic, then mark the ones you find hardest.\n\n\
             ## Use past papers\n\n- Time yourself\n- Mark honestly\n- Revisit mistakes after a week\n",
        )
        .published(),
        CreateBlogInput::new(
            "Active Recall Beats Re-reading",
            "Re-reading feels productive but tests show **retrieval practice** works better.\n\n\
             Close the book and write down what you remember, then check.",
        )
        .published(),
        CreateBlogInput::new(
            "Notes on Note-taking",
            "A draft about the Cornell method and when it helps.",
        ),
    ]
}

fn sample_documents() -> Vec<CreateDocumentInput> {
    let mut calculus = CreateDocumentInput::new(
        "Calculus I Lecture Notes",
        "https://files.example.org/calculus-1-notes.pdf",
    )
    .with_subject("Mathematics");
    calculus.university = "State University".into();
    calculus.year = Some(2023);
    calculus.description = "Limits, derivatives and an introduction to integrals.".into();
    calculus.tags = vec!["calculus".into(), "first-year".into()];

    let mut paper = CreateDocumentInput::new(
        "Linear Algebra Final Exam 2022",
        "https://files.example.org/linear-algebra-final-2022.pdf",
    )
    .with_subject("Mathematics");
    paper.doc_type = DocumentType::QuestionPaper;
    paper.university = "State University".into();
    paper.year = Some(2022);
    paper.tags = vec!["exam".into(), "matrices".into()];

    let mut syllabus = CreateDocumentInput::new(
        "Organic Chemistry Syllabus",
        "https://files.example.org/organic-chemistry-syllabus.docx",
    )
    .with_subject("Chemistry");
    syllabus.doc_type = DocumentType::Syllabus;
    syllabus.university = "City College".into();
    syllabus.year = Some(2024);

    let mut assignment = CreateDocumentInput::new(
        "Intro to Programming Assignment 3",
        "https://files.example.org/programming-assignment-3.pdf",
    )
    .with_subject("Computer Science");
    assignment.doc_type = DocumentType::Assignment;
    assignment.tags = vec!["python".into()];

    vec![calculus, paper, syllabus, assignment]
}

fn sample_quizzes() -> Vec<CreateQuizInput> {
    vec![
        CreateQuizInput {
            title: "Derivatives Warm-up".into(),
            description: "Quick checks on basic differentiation rules.".into(),
            category: "Mathematics".into(),
            questions: vec![
                Question::new("What is the derivative of x^2?", &["x", "2x", "x^2", "2"], "2x")
                    .with_explanation("Power rule: d/dx x^n = n x^(n-1).")
                    .with_difficulty(Difficulty::Easy),
                Question::new("What is the derivative of sin(x)?", &["cos(x)", "-cos(x)", "sin(x)", "-sin(x)"], "cos(x)")
                    .with_difficulty(Difficulty::Easy),
                Question::new("d/dx e^(3x) equals", &["e^(3x)", "3e^(3x)", "3x e^(3x)", "e^3"], "3e^(3x)")
                    .with_explanation("Chain rule: multiply by the derivative of 3x.")
                    .with_difficulty(Difficulty::Medium),
                Question::new("d/dx ln(x^2 + 1) equals", &["1/(x^2+1)", "2x/(x^2+1)", "2x", "ln(2x)"], "2x/(x^2+1)")
                    .with_difficulty(Difficulty::Hard),
            ],
            ..Default::default()
        },
        CreateQuizInput {
            title: "Matrix Basics".into(),
            description: "Dimensions, products and determinants.".into(),
            category: "Mathematics".into(),
            questions: vec![
                Question::new("A 2x3 matrix times a 3x4 matrix gives a matrix of size", &["2x4", "3x3", "4x2", "undefined"], "2x4")
                    .with_difficulty(Difficulty::Easy),
                Question::new("The determinant of the 2x2 identity matrix is", &["0", "1", "2", "-1"], "1")
                    .with_difficulty(Difficulty::Easy),
                Question::new("If det(A) = 0 then A is", &["invertible", "singular", "orthogonal", "diagonal"], "singular")
                    .with_explanation("A matrix is invertible exactly when its determinant is non-zero.")
                    .with_difficulty(Difficulty::Medium),
            ],
            ..Default::default()
        },
        CreateQuizInput {
            title: "Python Fundamentals".into(),
            description: "Core language behaviour every beginner trips over.".into(),
            category: "Computer Science".into(),
            questions: vec![
                Question::new("What does len([1, 2, 3]) return?", &["2", "3", "4", "error"], "3")
                    .with_difficulty(Difficulty::Easy),
                Question::new("Which type is immutable?", &["list", "dict", "tuple", "set"], "tuple")
                    .with_difficulty(Difficulty::Medium),
                Question::new("What is the value of 7 // 2?", &["3.5", "3", "4", "1"], "3")
                    .with_explanation("// is floor division.")
                    .with_difficulty(Difficulty::Easy),
            ],
            ..Default::default()
        },
    ]
}

fn sample_comments() -> Vec<CreateCommentInput> {
    vec![
        CreateCommentInput::new("Aisha", "These notes saved me the week before the midterm."),
        CreateCommentInput::new("Tom", "Does anyone have the marking scheme for this paper?"),
        CreateCommentInput::new("Mei", "Useful overview, thanks for uploading."),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::create_cache;
    use crate::config::{CacheConfig, QuizConfig};
    use crate::db::repositories::*;
    use crate::db::{create_test_pool, migrations};
    use crate::services::MarkdownRenderer;

    async fn setup_seed() -> (SeedService, Arc<BlogService>) {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        let cache = create_cache(&CacheConfig::default());

        let authors = Arc::new(AuthorService::new(SqlxAuthorRepository::boxed(pool.clone()), cache.clone()));
        let blogs = Arc::new(BlogService::new(
            SqlxBlogRepository::boxed(pool.clone()),
            SqlxAuthorRepository::boxed(pool.clone()),
            cache.clone(),
            MarkdownRenderer::new(),
        ));
        let documents = Arc::new(DocumentService::new(
            SqlxDocumentRepository::boxed(pool.clone()),
            SqlxCommentRepository::boxed(pool.clone()),
            cache.clone(),
        ));
        let quizzes = Arc::new(QuizService::new(
            SqlxQuizRepository::boxed(pool.clone()),
            cache.clone(),
            QuizConfig::default(),
        ));
        let comments = Arc::new(CommentService::new(
            SqlxCommentRepository::boxed(pool.clone()),
            SqlxDocumentRepository::boxed(pool),
        ));
        (
            SeedService::new(authors, blogs.clone(), documents, quizzes, comments),
            blogs,
        )
    }

    #[tokio::test]
    async fn test_seed_populates_then_skips() {
        let (seed, blogs) = setup_seed().await;

        let first = seed.run().await.unwrap();
        assert!(!first.skipped);
        assert_eq!(first.authors, 2);
        assert_eq!(first.blogs, 3);
        assert_eq!(first.documents, 4);
        assert_eq!(first.quizzes, 3);
        assert_eq!(first.comments, 3);
        assert_eq!(blogs.count_published().await.unwrap(), 2);

        let second = seed.run().await.unwrap();
        assert!(second.skipped);
        assert_eq!(second.blogs, 0);
    }
}
