use crate::models::assessment::Question;
use crate::models::attempt::TopicStats;

#[derive(Debug, Clone, PartialEq)]
pub struct ScoreCard {
    pub score: u32,
    pub percentage: f64,
    pub topic_stats: TopicStats,
}

/// `score / total * 100`, rounded to two decimals.
pub fn percentage(score: u32, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (score as f64 / total as f64 * 10_000.0).round() / 100.0
}

/// Scores answers position by position. `answers` must be as long as `questions`.
/// A `None` answer never matches and still counts toward its topic's total.
pub fn score_answers(questions: &[Question], answers: &[Option<String>]) -> ScoreCard {
    let mut score = 0;
    let mut topic_stats = TopicStats::new();

    for (question, answer) in questions.iter().zip(answers) {
        let stat = topic_stats.entry(question.topic.clone()).or_default();
        stat.total += 1;
        if answer.as_deref() == Some(question.correct_option.as_str()) {
            stat.correct += 1;
            score += 1;
        }
    }

    ScoreCard {
        score,
        percentage: percentage(score, questions.len()),
        topic_stats,
    }
}
