//! Quiz service
//!
//! Quiz CRUD plus the session flow:
//! 1. pick a quiz or a category
//! 2. sample questions (optionally of one difficulty)
//! 3. play against a deadline
//! 4. submit once and get a scored review

use anyhow::Context;
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use crate::cache::{Cache, CacheLayer, MemoryCache};
use crate::config::QuizConfig;
use crate::db::query::is_unique_violation;
use crate::db::repositories::QuizRepository;
use crate::models::limits::{
    self, CATEGORY_MAX, DESCRIPTION_MAX, EXPLANATION_MAX, OPTIONS_MAX, OPTIONS_MIN, OPTION_MAX,
    QUESTION_MAX, TITLE_MAX,
};
use crate::models::{
    CategoryCount, CreateQuizInput, ListParams, PagedResult, Question, Quiz, QuizFilter, QuizResult,
    QuizSession, QuizSummary, SessionStarted, StartSessionInput, SubmitAnswersInput, UpdateQuizInput,
};
use crate::services::quiz_session::{
    new_session, sample_questions, score_answers, session_key, session_ttl, MAX_TIME_LIMIT_SECONDS,
};
use crate::services::slug::{generate_slug, insert_with_unique_slug, is_valid_slug, SlugInsert};
use crate::services::{cached, invalidate, store};

const CACHE_KEY_QUIZ_BY_SLUG: &str = "quiz:slug:";
const CACHE_KEY_QUIZ_LIST: &str = "quizzes:list";
const CACHE_KEY_QUIZ_CATEGORIES: &str = "quizzes:categories";

/// Quiz entries only
const QUIZ_CACHE_PATTERNS: [&str; 2] = ["quiz:*", "quizzes:*"];

#[derive(Debug, thiserror::Error)]
pub enum QuizServiceError {
    #[error("Quiz not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Quiz slug already exists: {0}")]
    DuplicateSlug(String),

    /// Unknown, expired or already submitted session
    #[error("Quiz session not found: {0}")]
    SessionNotFound(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Quiz management and play
pub struct QuizService {
    repo: Arc<dyn QuizRepository>,
    cache: Arc<Cache>,
    /// Running sessions, sized by `quiz.max_sessions`. Content reads never
    /// compete with them for capacity.
    sessions: MemoryCache,
    config: QuizConfig,
}

impl QuizService {
    pub fn new(repo: Arc<dyn QuizRepository>, cache: Arc<Cache>, config: QuizConfig) -> Self {
        let sessions = MemoryCache::with_capacity_and_ttl(
            config.max_sessions,
            std::time::Duration::from_secs(MAX_TIME_LIMIT_SECONDS),
        );
        Self { repo, cache, sessions, config }
    }

    pub fn config(&self) -> &QuizConfig {
        &self.config
    }

    pub async fn create(&self, input: CreateQuizInput) -> Result<Quiz, QuizServiceError> {
        let now = Utc::now();
        let draft = Quiz {
            id: 0,
            slug: String::new(),
            title: validation(limits::required("Title", &input.title, TITLE_MAX))?,
            description: validation(limits::optional("Description", &input.description, DESCRIPTION_MAX))?,
            category: validation(limits::required("Category", &input.category, CATEGORY_MAX))?,
            questions: validate_questions(input.questions)?,
            created_at: now,
            updated_at: now,
        };

        let quiz = match explicit_slug(input.slug.as_deref())? {
            Some(slug) => {
                if self.repo.exists_by_slug(&slug, None).await? {
                    return Err(QuizServiceError::DuplicateSlug(slug));
                }
                match self.repo.create(&Quiz { slug: slug.clone(), ..draft }).await {
                    Ok(quiz) => quiz,
                    Err(e) if is_unique_violation(&e) => return Err(QuizServiceError::DuplicateSlug(slug)),
                    Err(e) => return Err(e.context("Failed to create quiz").into()),
                }
            }
            None => {
                let base = generate_slug(&draft.title);
                let outcome = insert_with_unique_slug(
                    &base,
                    |slug| async move { self.repo.exists_by_slug(&slug, None).await },
                    |slug| {
                        let quiz = Quiz { slug, ..draft.clone() };
                        async move { self.repo.create(&quiz).await }
                    },
                )
                .await
                .context("Failed to create quiz")?;
                match outcome {
                    SlugInsert::Inserted(quiz) => quiz,
                    SlugInsert::Exhausted => return Err(QuizServiceError::DuplicateSlug(base)),
                }
            }
        };

        tracing::info!(
            "Created quiz {} ({}) with {} questions",
            quiz.id,
            quiz.slug,
            quiz.questions.len()
        );
        invalidate(&self.cache, &QUIZ_CACHE_PATTERNS).await;
        Ok(quiz)
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Quiz, QuizServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get quiz by ID")?
            .ok_or_else(|| QuizServiceError::NotFound(id.to_string()))
    }

    /// Full quiz, answers included. Public callers convert to `PublicQuiz`.
    pub async fn get_by_slug(&self, slug: &str) -> Result<Quiz, QuizServiceError> {
        let key = format!("{}{}", CACHE_KEY_QUIZ_BY_SLUG, slug);
        if let Some(quiz) = cached::<Quiz>(&self.cache, &key).await {
            return Ok(quiz);
        }

        let quiz = self
            .repo
            .get_by_slug(slug)
            .await
            .context("Failed to get quiz by slug")?
            .ok_or_else(|| QuizServiceError::NotFound(slug.to_string()))?;
        store(&self.cache, &key, &quiz).await;
        Ok(quiz)
    }

    pub async fn list(
        &self,
        filter: &QuizFilter,
        params: &ListParams,
    ) -> Result<PagedResult<QuizSummary>, QuizServiceError> {
        let key = format!(
            "{}:{}:{}:{}:{}:{}",
            CACHE_KEY_QUIZ_LIST,
            params.page,
            params.per_page,
            filter.sort.as_str(),
            filter.category.as_deref().unwrap_or(""),
            filter.search.as_deref().unwrap_or("").to_lowercase(),
        );
        if let Some(page) = cached::<PagedResult<QuizSummary>>(&self.cache, &key).await {
            return Ok(page);
        }

        let items = self
            .repo
            .list(filter, params.offset(), params.limit())
            .await
            .context("Failed to list quizzes")?;
        let total = self.repo.count(filter).await.context("Failed to count quizzes")?;
        let page = PagedResult::new(items, total, params).map(QuizSummary::from);
        store(&self.cache, &key, &page).await;
        Ok(page)
    }

    /// Categories with their quiz counts, alphabetically
    pub async fn categories(&self) -> Result<Vec<CategoryCount>, QuizServiceError> {
        if let Some(categories) = cached::<Vec<CategoryCount>>(&self.cache, CACHE_KEY_QUIZ_CATEGORIES).await {
            return Ok(categories);
        }
        let categories = self
            .repo
            .list_categories()
            .await
            .context("Failed to list quiz categories")?;
        store(&self.cache, CACHE_KEY_QUIZ_CATEGORIES, &categories).await;
        Ok(categories)
    }

    pub async fn update(&self, id: i64, input: UpdateQuizInput) -> Result<Quiz, QuizServiceError> {
        let existing = self.get_by_id(id).await?;
        let mut quiz = existing.clone();

        if let Some(title) = input.title.as_deref() {
            quiz.title = validation(limits::required("Title", title, TITLE_MAX))?;
        }
        if let Some(description) = input.description.as_deref() {
            quiz.description = validation(limits::optional("Description", description, DESCRIPTION_MAX))?;
        }
        if let Some(category) = input.category.as_deref() {
            quiz.category = validation(limits::required("Category", category, CATEGORY_MAX))?;
        }
        if let Some(questions) = input.questions {
            quiz.questions = validate_questions(questions)?;
        }
        if let Some(slug) = explicit_slug(input.slug.as_deref())? {
            if slug != existing.slug && self.repo.exists_by_slug(&slug, Some(id)).await? {
                return Err(QuizServiceError::DuplicateSlug(slug));
            }
            quiz.slug = slug;
        }
        quiz.updated_at = Utc::now();

        let updated = match self.repo.update(&quiz).await {
            Ok(updated) => updated,
            Err(e) if is_unique_violation(&e) => return Err(QuizServiceError::DuplicateSlug(quiz.slug)),
            Err(e) => return Err(e.context("Failed to update quiz").into()),
        };

        tracing::info!("Updated quiz {} ({})", updated.id, updated.slug);
        invalidate(&self.cache, &QUIZ_CACHE_PATTERNS).await;
        Ok(updated)
    }

    pub async fn delete(&self, id: i64) -> Result<(), QuizServiceError> {
        let deleted = self.repo.delete(id).await.context("Failed to delete quiz")?;
        if !deleted {
            return Err(QuizServiceError::NotFound(id.to_string()));
        }
        tracing::info!("Deleted quiz {}", id);
        invalidate(&self.cache, &QUIZ_CACHE_PATTERNS).await;
        Ok(())
    }

    pub async fn count(&self) -> Result<i64, QuizServiceError> {
        Ok(self
            .repo
            .count(&QuizFilter::default())
            .await
            .context("Failed to count quizzes")?)
    }

    pub async fn count_questions(&self) -> Result<i64, QuizServiceError> {
        Ok(self
            .repo
            .count_questions()
            .await
            .context("Failed to count quiz questions")?)
    }

    /// Start a timed session.
    ///
    /// The question pool is one quiz (`quiz_slug`) or every quiz in a
    /// category (`category`), optionally narrowed to one difficulty.
    pub async fn start_session(&self, input: StartSessionInput) -> Result<SessionStarted, QuizServiceError> {
        let count = input.count.unwrap_or(self.config.default_question_count);
        if count == 0 || count > self.config.max_question_count {
            return Err(QuizServiceError::ValidationError(format!(
                "Question count must be between 1 and {}",
                self.config.max_question_count
            )));
        }

        let quiz_slug = input.quiz_slug.as_deref().map(str::trim).filter(|s| !s.is_empty());
        let category = input.category.as_deref().map(str::trim).filter(|s| !s.is_empty());
        let (title, mut pool) = match (quiz_slug, category) {
            (Some(slug), _) => {
                let quiz = self.get_by_slug(slug).await?;
                (quiz.title, quiz.questions)
            }
            (None, Some(category)) => {
                let quizzes = self
                    .repo
                    .list_by_category(category)
                    .await
                    .context("Failed to load category questions")?;
                if quizzes.is_empty() {
                    return Err(QuizServiceError::NotFound(format!("category '{}'", category)));
                }
                let pool = quizzes.into_iter().flat_map(|q| q.questions).collect();
                (category.to_string(), pool)
            }
            (None, None) => {
                return Err(QuizServiceError::ValidationError(
                    "Either quiz_slug or category is required".to_string(),
                ))
            }
        };

        if let Some(difficulty) = input.difficulty {
            pool.retain(|q| q.difficulty == difficulty);
        }
        if pool.is_empty() {
            return Err(QuizServiceError::ValidationError(
                "No questions match the selection".to_string(),
            ));
        }

        let questions = sample_questions(&pool, count);
        let session = new_session(title, questions, &self.config, Utc::now());
        self.sessions
            .set(&session_key(&session.id), &session, session_ttl(&session, &self.config))
            .await
            .context("Failed to store quiz session")?;

        tracing::info!(
            "Started quiz session {} ({} of {} questions)",
            session.id,
            session.questions.len(),
            pool.len()
        );
        Ok(SessionStarted::from(&session))
    }

    /// Score a session. A session can be submitted once.
    pub async fn submit_session(
        &self,
        session_id: Uuid,
        input: SubmitAnswersInput,
    ) -> Result<QuizResult, QuizServiceError> {
        let session = self
            .sessions
            .take::<QuizSession>(&session_key(&session_id))
            .await
            .context("Failed to load quiz session")?
            .ok_or_else(|| QuizServiceError::SessionNotFound(session_id.to_string()))?;

        let result = score_answers(&session, &input.answers, Utc::now());
        tracing::info!(
            "Scored quiz session {}: {}/{}{}",
            session_id,
            result.correct,
            result.total,
            if result.timed_out { " (late)" } else { "" }
        );
        Ok(result)
    }
}

fn validation<T>(result: Result<T, String>) -> Result<T, QuizServiceError> {
    result.map_err(QuizServiceError::ValidationError)
}

/// Check and trim every question. A quiz needs at least one.
fn validate_questions(questions: Vec<Question>) -> Result<Vec<Question>, QuizServiceError> {
    if questions.is_empty() {
        return Err(QuizServiceError::ValidationError(
            "A quiz needs at least one question".to_string(),
        ));
    }

    questions
        .into_iter()
        .enumerate()
        .map(|(i, q)| {
            let n = i + 1;
            let question = validation(limits::required(&format!("Question {}", n), &q.question, QUESTION_MAX))?;
            if !(OPTIONS_MIN..=OPTIONS_MAX).contains(&q.options.len()) {
                return Err(QuizServiceError::ValidationError(format!(
                    "Question {} needs between {} and {} options",
                    n, OPTIONS_MIN, OPTIONS_MAX
                )));
            }
            let options = q
                .options
                .iter()
                .map(|o| validation(limits::required(&format!("Question {} option", n), o, OPTION_MAX)))
                .collect::<Result<Vec<_>, _>>()?;
            for (j, option) in options.iter().enumerate() {
                if options[..j].contains(option) {
                    return Err(QuizServiceError::ValidationError(format!(
                        "Question {} repeats option '{}'",
                        n, option
                    )));
                }
            }
            let correct_answer = q.correct_answer.trim().to_string();
            if !options.contains(&correct_answer) {
                return Err(QuizServiceError::ValidationError(format!(
                    "Question {}: correct answer must be one of the options",
                    n
                )));
            }
            let explanation = validation(limits::optional(
                &format!("Question {} explanation", n),
                &q.explanation,
                EXPLANATION_MAX,
            ))?;
            Ok(Question {
                question,
                options,
                correct_answer,
                explanation,
                difficulty: q.difficulty,
            })
        })
        .collect()
}

fn explicit_slug(slug: Option<&str>) -> Result<Option<String>, QuizServiceError> {
    match slug.map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) if is_valid_slug(s) => Ok(Some(s.to_string())),
        Some(s) => Err(QuizServiceError::ValidationError(format!(
            "Invalid slug '{}': use lowercase letters, digits and single hyphens",
            s
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::create_cache;
    use crate::config::CacheConfig;
    use crate::db::repositories::SqlxQuizRepository;
    use crate::db::{create_test_pool, migrations};
    use crate::models::Difficulty;

    async fn setup_service() -> QuizService {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool).await.expect("Failed to run migrations");
        QuizService::new(
            SqlxQuizRepository::boxed(pool),
            create_cache(&CacheConfig::default()),
            QuizConfig::default(),
        )
    }

    fn questions(n: usize, difficulty: Difficulty) -> Vec<Question> {
        (0..n)
            .map(|i| {
                Question::new(format!("{:?} question {}", difficulty, i), &["yes", "no"], "yes")
                    .with_difficulty(difficulty)
            })
            .collect()
    }

    fn quiz_input(title: &str, category: &str, questions: Vec<Question>) -> CreateQuizInput {
        CreateQuizInput {
            title: title.into(),
            category: category.into(),
            questions,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_validates_questions() {
        let service = setup_service().await;

        let empty = service.create(quiz_input("Empty", "Math", vec![])).await;
        assert!(matches!(empty, Err(QuizServiceError::ValidationError(_))));

        let one_option = vec![Question::new("Q", &["only"], "only")];
        let result = service.create(quiz_input("Bad", "Math", one_option)).await;
        assert!(matches!(result, Err(QuizServiceError::ValidationError(_))));

        let wrong_answer = vec![Question::new("Q", &["a", "b"], "c")];
        let result = service.create(quiz_input("Bad", "Math", wrong_answer)).await;
        assert!(matches!(result, Err(QuizServiceError::ValidationError(_))));

        let repeated = vec![Question::new("Q", &["a", " a"], "a")];
        let result = service.create(quiz_input("Bad", "Math", repeated)).await;
        assert!(matches!(result, Err(QuizServiceError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_create_trims_answers() {
        let service = setup_service().await;
        let q = vec![Question::new(" 2+2? ", &[" 3", "4 "], " 4")];
        let quiz = service.create(quiz_input("Arithmetic", "Math", q)).await.unwrap();
        assert_eq!(quiz.questions[0].question, "2+2?");
        assert_eq!(quiz.questions[0].options, vec!["3", "4"]);
        assert_eq!(quiz.questions[0].correct_answer, "4");
    }

    #[tokio::test]
    async fn test_session_roundtrip() {
        let service = setup_service().await;
        service
            .create(quiz_input("Basics", "Science", questions(6, Difficulty::Easy)))
            .await
            .unwrap();

        let started = service
            .start_session(StartSessionInput {
                quiz_slug: Some("basics".into()),
                count: Some(4),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(started.question_count, 4);
        assert_eq!(started.time_limit_seconds, 4 * service.config().seconds_per_question);

        let answers = vec![Some("yes".to_string()), Some("no".to_string()), None];
        let result = service
            .submit_session(started.session_id, SubmitAnswersInput { answers })
            .await
            .unwrap();
        assert_eq!(result.total, 4);
        assert_eq!(result.correct, 1);
        assert_eq!(result.incorrect, 1);
        assert_eq!(result.unanswered, 2);
        assert_eq!(result.percentage, 25.0);
        assert!(!result.timed_out);
    }

    #[tokio::test]
    async fn test_session_is_single_use() {
        let service = setup_service().await;
        service
            .create(quiz_input("Once", "Science", questions(2, Difficulty::Easy)))
            .await
            .unwrap();
        let started = service
            .start_session(StartSessionInput {
                quiz_slug: Some("once".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(started.question_count, 2);

        service
            .submit_session(started.session_id, SubmitAnswersInput::default())
            .await
            .unwrap();
        let again = service
            .submit_session(started.session_id, SubmitAnswersInput::default())
            .await;
        assert!(matches!(again, Err(QuizServiceError::SessionNotFound(_))));
    }

    #[tokio::test]
    async fn test_unknown_session() {
        let service = setup_service().await;
        let result = service
            .submit_session(Uuid::new_v4(), SubmitAnswersInput::default())
            .await;
        assert!(matches!(result, Err(QuizServiceError::SessionNotFound(_))));
    }

    #[tokio::test]
    async fn test_category_pool_with_difficulty() {
        let service = setup_service().await;
        service
            .create(quiz_input("Part 1", "History", questions(3, Difficulty::Easy)))
            .await
            .unwrap();
        service
            .create(quiz_input("Part 2", "History", questions(2, Difficulty::Hard)))
            .await
            .unwrap();

        let started = service
            .start_session(StartSessionInput {
                category: Some("History".into()),
                count: Some(10),
                difficulty: Some(Difficulty::Hard),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(started.question_count, 2);
        assert_eq!(started.title, "History");
        assert!(started.questions.iter().all(|q| q.difficulty == Difficulty::Hard));

        let none = service
            .start_session(StartSessionInput {
                category: Some("History".into()),
                difficulty: Some(Difficulty::Medium),
                ..Default::default()
            })
            .await;
        assert!(matches!(none, Err(QuizServiceError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_start_session_validation() {
        let service = setup_service().await;
        let neither = service.start_session(StartSessionInput::default()).await;
        assert!(matches!(neither, Err(QuizServiceError::ValidationError(_))));

        let too_many = service
            .start_session(StartSessionInput {
                quiz_slug: Some("x".into()),
                count: Some(service.config().max_question_count + 1),
                ..Default::default()
            })
            .await;
        assert!(matches!(too_many, Err(QuizServiceError::ValidationError(_))));

        let missing = service
            .start_session(StartSessionInput {
                quiz_slug: Some("missing".into()),
                ..Default::default()
            })
            .await;
        assert!(matches!(missing, Err(QuizServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_writes_keep_sessions() {
        let service = setup_service().await;
        service
            .create(quiz_input("Keep", "Art", questions(2, Difficulty::Easy)))
            .await
            .unwrap();
        let started = service
            .start_session(StartSessionInput {
                quiz_slug: Some("keep".into()),
                ..Default::default()
            })
            .await
            .unwrap();

        service
            .create(quiz_input("Other", "Art", questions(1, Difficulty::Easy)))
            .await
            .unwrap();
        assert!(service
            .submit_session(started.session_id, SubmitAnswersInput::default())
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_list_churn_does_not_evict_sessions() {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool).await.expect("Failed to run migrations");
        let small = CacheConfig {
            ttl_seconds: 600,
            max_capacity: 50,
        };
        let service = QuizService::new(
            SqlxQuizRepository::boxed(pool),
            create_cache(&small),
            QuizConfig::default(),
        );
        service
            .create(quiz_input("Churn", "Math", questions(3, Difficulty::Easy)))
            .await
            .unwrap();

        async fn flood(service: &QuizService, round: usize, n: usize) {
            for i in 0..n {
                let filter = QuizFilter {
                    search: Some(format!("term-{}-{}", round, i)),
                    ..Default::default()
                };
                service.list(&filter, &ListParams::default()).await.unwrap();
            }
        }

        flood(&service, 0, 200).await;
        let mut started = Vec::new();
        for round in 1..=10 {
            let session = service
                .start_session(StartSessionInput {
                    quiz_slug: Some("churn".into()),
                    ..Default::default()
                })
                .await
                .unwrap();
            started.push(session.session_id);
            flood(&service, round, 100).await;
        }

        for id in started {
            let result = service
                .submit_session(id, SubmitAnswersInput::default())
                .await
                .unwrap();
            assert_eq!(result.total, 3);
        }
    }

    #[tokio::test]
    async fn test_categories_and_counts() {
        let service = setup_service().await;
        service.create(quiz_input("A", "Math", questions(3, Difficulty::Easy))).await.unwrap();
        service.create(quiz_input("B", "Math", questions(2, Difficulty::Easy))).await.unwrap();
        service.create(quiz_input("C", "Art", questions(1, Difficulty::Easy))).await.unwrap();

        let categories = service.categories().await.unwrap();
        assert_eq!(
            categories,
            vec![
                CategoryCount { category: "Art".into(), quiz_count: 1 },
                CategoryCount { category: "Math".into(), quiz_count: 2 },
            ]
        );
        assert_eq!(service.count().await.unwrap(), 3);
        assert_eq!(service.count_questions().await.unwrap(), 6);

        let page = service.list(&QuizFilter::default(), &ListParams::default()).await.unwrap();
        assert_eq!(page.total, 3);
        assert!(page.items.iter().any(|q| q.question_count == 3));
    }
}
