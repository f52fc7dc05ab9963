//! Quiz play: question sampling and answer scoring
//!
//! A session is a shuffled sample of questions with a deadline. It is kept
//! in the cache until it is submitted or expires; scoring consumes it.

use chrono::{DateTime, Duration, Utc};
use rand::seq::SliceRandom;
use uuid::Uuid;

use crate::config::QuizConfig;
use crate::models::{Question, QuestionReview, QuizResult, QuizSession};

/// Cache key prefix for running sessions
pub const SESSION_KEY_PREFIX: &str = "quiz_session:";

/// Longest time limit a session can carry, one week
pub const MAX_TIME_LIMIT_SECONDS: u64 = 7 * 24 * 60 * 60;

pub fn session_key(id: &Uuid) -> String {
    format!("{}{}", SESSION_KEY_PREFIX, id)
}

/// Shuffle a copy of `questions` and keep the first `count`.
///
/// Never returns more than `count` items or more than exist.
pub fn sample_questions<T: Clone>(questions: &[T], count: usize) -> Vec<T> {
    let mut pool = questions.to_vec();
    pool.shuffle(&mut rand::rng());
    pool.truncate(count);
    pool
}

/// Build a session for already-sampled questions
pub fn new_session(
    title: String,
    questions: Vec<Question>,
    config: &QuizConfig,
    now: DateTime<Utc>,
) -> QuizSession {
    let time_limit_seconds = (questions.len() as u64)
        .saturating_mul(config.seconds_per_question)
        .min(MAX_TIME_LIMIT_SECONDS);
    QuizSession {
        id: Uuid::new_v4(),
        title,
        questions,
        time_limit_seconds,
        started_at: now,
        deadline: now + Duration::seconds(time_limit_seconds as i64),
    }
}

/// How long a session stays retrievable: its time limit plus the grace period
pub fn session_ttl(session: &QuizSession, config: &QuizConfig) -> std::time::Duration {
    std::time::Duration::from_secs(session.time_limit_seconds.saturating_add(config.grace_seconds))
}

/// Score answers against a session, by position.
///
/// Missing, blank and extra answers are ignored beyond counting as
/// unanswered. An answer that is not one of the options is incorrect.
pub fn score_answers(
    session: &QuizSession,
    answers: &[Option<String>],
    submitted_at: DateTime<Utc>,
) -> QuizResult {
    let mut correct = 0;
    let mut unanswered = 0;

    let review: Vec<QuestionReview> = session
        .questions
        .iter()
        .enumerate()
        .map(|(i, question)| {
            let selected = answers
                .get(i)
                .and_then(|a| a.as_deref())
                .map(str::trim)
                .filter(|a| !a.is_empty())
                .map(str::to_string);
            let is_correct = selected.as_deref().is_some_and(|a| question.is_correct(a));
            match (&selected, is_correct) {
                (None, _) => unanswered += 1,
                (Some(_), true) => correct += 1,
                (Some(_), false) => {}
            }
            QuestionReview {
                question: question.question.clone(),
                options: question.options.clone(),
                selected,
                correct_answer: question.correct_answer.clone(),
                explanation: question.explanation.clone(),
                is_correct,
            }
        })
        .collect();

    let total = session.questions.len();
    QuizResult {
        session_id: session.id,
        title: session.title.clone(),
        total,
        correct,
        incorrect: total - correct - unanswered,
        unanswered,
        percentage: percentage(correct, total),
        time_taken_seconds: (submitted_at - session.started_at).num_seconds().max(0),
        timed_out: submitted_at > session.deadline,
        review,
    }
}

/// Percentage rounded to one decimal place
fn percentage(correct: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (correct as f64 * 1000.0 / total as f64).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn question(n: usize) -> Question {
        Question::new(format!("Q{}", n), &["a", "b", "c"], "b").with_explanation(format!("why {}", n))
    }

    fn session(n: usize) -> QuizSession {
        new_session(
            "Test".into(),
            (0..n).map(question).collect(),
            &QuizConfig::default(),
            Utc::now(),
        )
    }

    #[test]
    fn test_sample_is_a_permutation_prefix() {
        let items: Vec<u32> = (0..20).collect();
        let sample = sample_questions(&items, 5);
        assert_eq!(sample.len(), 5);
        let mut dedup = sample.clone();
        dedup.sort();
        dedup.dedup();
        assert_eq!(dedup.len(), 5);
        assert!(sample.iter().all(|x| items.contains(x)));
    }

    #[test]
    fn test_sample_caps_to_length() {
        let items = vec![1, 2, 3];
        assert_eq!(sample_questions(&items, 10).len(), 3);
        assert!(sample_questions(&items, 0).is_empty());
        assert!(sample_questions::<u8>(&[], 4).is_empty());
    }

    #[test]
    fn test_new_session_timing() {
        let config = QuizConfig::default();
        let s = session(4);
        assert_eq!(s.time_limit_seconds, 4 * config.seconds_per_question);
        assert_eq!(
            (s.deadline - s.started_at).num_seconds() as u64,
            s.time_limit_seconds
        );
        assert_eq!(
            session_ttl(&s, &config).as_secs(),
            s.time_limit_seconds + config.grace_seconds
        );
        assert!(session_key(&s.id).starts_with(SESSION_KEY_PREFIX));
    }

    #[test]
    fn test_huge_time_budget_is_clamped() {
        let config = QuizConfig {
            seconds_per_question: 10_000_000_000_000_000,
            grace_seconds: u64::MAX,
            ..Default::default()
        };
        let now = Utc::now();
        let s = new_session("Long".into(), (0..50).map(question).collect(), &config, now);

        assert_eq!(s.time_limit_seconds, MAX_TIME_LIMIT_SECONDS);
        assert_eq!((s.deadline - now).num_seconds() as u64, MAX_TIME_LIMIT_SECONDS);
        assert_eq!(session_ttl(&s, &config).as_secs(), u64::MAX);

        let result = score_answers(&s, &[], now + Duration::seconds(60));
        assert!(!result.timed_out);
    }

    #[test]
    fn test_score_mixed_answers() {
        let s = session(4);
        let answers = vec![
            Some("b".to_string()),
            Some(" b ".to_string()),
            Some("a".to_string()),
            None,
        ];
        let result = score_answers(&s, &answers, s.started_at + Duration::seconds(12));

        assert_eq!(result.total, 4);
        assert_eq!(result.correct, 2);
        assert_eq!(result.incorrect, 1);
        assert_eq!(result.unanswered, 1);
        assert_eq!(result.percentage, 50.0);
        assert_eq!(result.time_taken_seconds, 12);
        assert!(!result.timed_out);
        assert_eq!(result.review[2].selected.as_deref(), Some("a"));
        assert!(!result.review[2].is_correct);
        assert_eq!(result.review[0].explanation, "why 0");
    }

    #[test]
    fn test_short_and_long_answer_lists() {
        let s = session(3);
        let short = score_answers(&s, &[Some("b".into())], s.started_at);
        assert_eq!(short.unanswered, 2);

        let long: Vec<Option<String>> = vec![Some("b".into()); 10];
        let result = score_answers(&s, &long, s.started_at);
        assert_eq!(result.correct, 3);
        assert_eq!(result.review.len(), 3);
    }

    #[test]
    fn test_blank_answer_is_unanswered() {
        let s = session(1);
        let result = score_answers(&s, &[Some("   ".into())], s.started_at);
        assert_eq!(result.unanswered, 1);
        assert_eq!(result.review[0].selected, None);
    }

    #[test]
    fn test_late_submission_times_out() {
        let s = session(2);
        let result = score_answers(&s, &[], s.deadline + Duration::seconds(1));
        assert!(result.timed_out);
    }

    #[test]
    fn test_percentage_rounding() {
        assert_eq!(percentage(1, 3), 33.3);
        assert_eq!(percentage(2, 3), 66.7);
        assert_eq!(percentage(0, 0), 0.0);
        assert_eq!(percentage(7, 7), 100.0);
    }

    proptest! {
        #[test]
        fn prop_sample_bounds(len in 0usize..60, count in 0usize..80) {
            let items: Vec<usize> = (0..len).collect();
            let sample = sample_questions(&items, count);
            prop_assert_eq!(sample.len(), count.min(len));
            let mut sorted = sample.clone();
            sorted.sort();
            sorted.dedup();
            prop_assert_eq!(sorted.len(), sample.len());
        }

        #[test]
        fn prop_score_partitions_total(
            n in 1usize..30,
            picks in proptest::collection::vec(proptest::option::of(0usize..4), 0..40),
        ) {
            let s = session(n);
            let options = ["a", "b", "c", "zzz"];
            let answers: Vec<Option<String>> = picks
                .iter()
                .map(|p| p.map(|i| options[i].to_string()))
                .collect();
            let result = score_answers(&s, &answers, s.started_at);
            prop_assert_eq!(result.correct + result.incorrect + result.unanswered, result.total);
            prop_assert!((0.0..=100.0).contains(&result.percentage));
            prop_assert_eq!(result.review.len(), n);
        }
    }
}
