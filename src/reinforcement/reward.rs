// Reward system for the student policy
// Turns the teacher's free-text feedback into a scalar reward

use tracing::debug;

/// Calculate the reward carried by a piece of teacher feedback.
///
/// Keyword contributions are independent and add up:
/// "correct" (without "incorrect") +1.0, "incorrect" -1.0,
/// "strengths" +0.5, "improvement" -0.5. Matching is case-insensitive
/// and substring based, so "improvements" also counts.
pub fn extract_reward(feedback: &str) -> f64 {
    let lowered = feedback.to_lowercase();
    let mut reward = 0.0;

    if lowered.contains("correct") && !lowered.contains("incorrect") {
        reward += 1.0;
    }
    if lowered.contains("incorrect") {
        reward -= 1.0;
    }
    if lowered.contains("strengths") {
        reward += 0.5;
    }
    if lowered.contains("improvement") {
        reward -= 0.5;
    }

    debug!(
        "Feedback '{}...' resulted in reward: {}",
        feedback.chars().take(50).collect::<String>(),
        reward
    );
    reward
}
