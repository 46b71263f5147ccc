//! Smooths noisy per-frame emotion labels into a stable expression.

use std::time::{Duration, Instant};

use crate::presence::GazeSnapshot;

const VOTE_CAP: u8 = 8;
const WINNING_VOTES: u8 = 3;
const STRONG_SCORE: f32 = 0.55;
const REFRESH_INTERVAL: Duration = Duration::from_millis(800);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expression {
    Happy,
    Neutral,
    Angry,
}

impl Expression {
    /// Tie-break order when votes are equal.
    const ALL: [Expression; 3] = [Expression::Happy, Expression::Neutral, Expression::Angry];

    fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "happy" => Some(Expression::Happy),
            "neutral" => Some(Expression::Neutral),
            "angry" => Some(Expression::Angry),
            _ => None,
        }
    }

    pub fn visual(self) -> &'static str {
        match self {
            Expression::Happy => "state6",
            Expression::Neutral => "state1",
            Expression::Angry => "state4",
        }
    }

    fn index(self) -> usize {
        match self {
            Expression::Happy => 0,
            Expression::Neutral => 1,
            Expression::Angry => 2,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExpressionVoter {
    votes: [u8; 3],
    stable: Expression,
    last_visual_at: Option<Instant>,
}

impl Default for ExpressionVoter {
    fn default() -> Self {
        Self {
            votes: [0; 3],
            stable: Expression::Neutral,
            last_visual_at: None,
        }
    }
}

impl ExpressionVoter {
    pub fn stable(&self) -> Expression {
        self.stable
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Cast one frame's vote. Returns the expression to show when the visual should change.
    pub fn observe(&mut self, gaze: &GazeSnapshot, now: Instant) -> Option<Expression> {
        let label = gaze
            .emotion_label
            .as_deref()
            .filter(|_| gaze.face_detected)
            .and_then(Expression::from_label)
            .unwrap_or(Expression::Neutral);
        let weight = if gaze.emotion_score >= STRONG_SCORE { 2 } else { 1 };

        for vote in self.votes.iter_mut() {
            *vote = vote.saturating_sub(1);
        }
        let slot = &mut self.votes[label.index()];
        *slot = (*slot + weight).min(VOTE_CAP);

        let mut winner = Expression::ALL[0];
        for candidate in Expression::ALL {
            if self.votes[candidate.index()] > self.votes[winner.index()] {
                winner = candidate;
            }
        }
        if self.votes[winner.index()] < WINNING_VOTES {
            return None;
        }
        let recently_shown = self
            .last_visual_at
            .is_some_and(|at| now.saturating_duration_since(at) < REFRESH_INTERVAL);
        if winner == self.stable && recently_shown {
            return None;
        }
        self.stable = winner;
        self.last_visual_at = Some(now);
        Some(winner)
    }
}
