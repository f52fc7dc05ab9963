//! Quiz model
//!
//! Questions are stored with their quiz as a JSON array. Public views strip
//! the correct answer and explanation; they are only revealed when a session
//! is scored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::SortOrder;

/// Question difficulty
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

impl std::str::FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "easy" => Ok(Self::Easy),
            "medium" => Ok(Self::Medium),
            "hard" => Ok(Self::Hard),
            _ => Err(format!("Invalid difficulty: {}", s)),
        }
    }
}

/// A multiple-choice question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub question: String,
    pub options: Vec<String>,
    /// Must equal one of `options`
    pub correct_answer: String,
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub difficulty: Difficulty,
}

impl Question {
    pub fn new(
        question: impl Into<String>,
        options: &[&str],
        correct_answer: impl Into<String>,
    ) -> Self {
        Self {
            question: question.into(),
            options: options.iter().map(|o| o.to_string()).collect(),
            correct_answer: correct_answer.into(),
            explanation: String::new(),
            difficulty: Difficulty::default(),
        }
    }

    pub fn with_explanation(mut self, explanation: impl Into<String>) -> Self {
        self.explanation = explanation.into();
        self
    }

    pub fn with_difficulty(mut self, difficulty: Difficulty) -> Self {
        self.difficulty = difficulty;
        self
    }

    pub fn is_correct(&self, answer: &str) -> bool {
        self.correct_answer.trim() == answer.trim()
    }
}

/// Question as shown to a player (no answer, no explanation)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicQuestion {
    pub question: String,
    pub options: Vec<String>,
    pub difficulty: Difficulty,
}

impl From<&Question> for PublicQuestion {
    fn from(q: &Question) -> Self {
        Self {
            question: q.question.clone(),
            options: q.options.clone(),
            difficulty: q.difficulty,
        }
    }
}

/// Quiz entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quiz {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub description: String,
    pub category: String,
    pub questions: Vec<Question>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Public view of a quiz with answers removed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicQuiz {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub description: String,
    pub category: String,
    pub question_count: usize,
    pub questions: Vec<PublicQuestion>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Quiz> for PublicQuiz {
    fn from(quiz: &Quiz) -> Self {
        Self {
            id: quiz.id,
            title: quiz.title.clone(),
            slug: quiz.slug.clone(),
            description: quiz.description.clone(),
            category: quiz.category.clone(),
            question_count: quiz.questions.len(),
            questions: quiz.questions.iter().map(PublicQuestion::from).collect(),
            created_at: quiz.created_at,
            updated_at: quiz.updated_at,
        }
    }
}

/// List entry for a quiz (no questions)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizSummary {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub description: String,
    pub category: String,
    pub question_count: usize,
    pub created_at: DateTime<Utc>,
}

impl From<Quiz> for QuizSummary {
    fn from(quiz: Quiz) -> Self {
        Self {
            id: quiz.id,
            title: quiz.title,
            slug: quiz.slug,
            description: quiz.description,
            category: quiz.category,
            question_count: quiz.questions.len(),
            created_at: quiz.created_at,
        }
    }
}

/// A quiz category and how many quizzes it holds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCount {
    pub category: String,
    pub quiz_count: i64,
}

/// Input for creating a quiz
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateQuizInput {
    pub title: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub description: String,
    pub category: String,
    pub questions: Vec<Question>,
}

/// Input for updating a quiz; `None` leaves a field unchanged
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateQuizInput {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub questions: Option<Vec<Question>>,
}

/// Filters for quiz list queries
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuizFilter {
    /// Substring match on title and description
    pub search: Option<String>,
    pub category: Option<String>,
    pub sort: SortOrder,
}

/// Request to start a timed quiz session.
///
/// Exactly one of `quiz_slug` / `category` selects the question pool.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StartSessionInput {
    #[serde(default)]
    pub quiz_slug: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub count: Option<usize>,
    #[serde(default)]
    pub difficulty: Option<Difficulty>,
}

/// Server-side state of a running session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizSession {
    pub id: Uuid,
    /// Quiz title, or the category name for pooled sessions
    pub title: String,
    pub questions: Vec<Question>,
    pub time_limit_seconds: u64,
    pub started_at: DateTime<Utc>,
    pub deadline: DateTime<Utc>,
}

/// What the player receives when a session starts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStarted {
    pub session_id: Uuid,
    pub title: String,
    pub question_count: usize,
    pub time_limit_seconds: u64,
    pub started_at: DateTime<Utc>,
    pub deadline: DateTime<Utc>,
    pub questions: Vec<PublicQuestion>,
}

impl From<&QuizSession> for SessionStarted {
    fn from(session: &QuizSession) -> Self {
        Self {
            session_id: session.id,
            title: session.title.clone(),
            question_count: session.questions.len(),
            time_limit_seconds: session.time_limit_seconds,
            started_at: session.started_at,
            deadline: session.deadline,
            questions: session.questions.iter().map(PublicQuestion::from).collect(),
        }
    }
}

/// Answers submitted for a session, by question position
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubmitAnswersInput {
    #[serde(default)]
    pub answers: Vec<Option<String>>,
}

/// Per-question outcome shown after scoring
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionReview {
    pub question: String,
    pub options: Vec<String>,
    pub selected: Option<String>,
    pub correct_answer: String,
    pub explanation: String,
    pub is_correct: bool,
}

/// Score for a submitted session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizResult {
    pub session_id: Uuid,
    pub title: String,
    pub total: usize,
    pub correct: usize,
    pub incorrect: usize,
    pub unanswered: usize,
    /// Percentage of correct answers, one decimal place
    pub percentage: f64,
    pub time_taken_seconds: i64,
    pub timed_out: bool,
    pub review: Vec<QuestionReview>,
}
