//! Score Aggregator - Parsed Results to a Score
//!
//! **Core Responsibility:**
//! Count the leaves of a parsed result tree and turn the counts into a score.
//!
//! **Scoring Rules:**
//! - No leaves: not applicable, caller falls back to output comparison
//! - Lazy mode (max-score unset or <= 0): one point per leaf,
//!   max_score = leaf count, pass_score = 80% of the leaf count
//! - Weighted mode (max-score > 0): score = passed / total * max_score,
//!   pass_score = configured pass-score (already defaulted to 80% of max)
//! - status: Fail if score < pass_score, Pass otherwise

use crate::parser::{TestEntry, TestNode};
use grader_common::inputs::DEFAULT_PASS_RATIO;
use grader_common::types::{GradeStatus, ScoreOutcome};

/// Result of scoring a tree that had at least one leaf
#[derive(Debug, Clone, PartialEq)]
pub struct HierarchyScore {
    pub status: GradeStatus,
    pub score: f64,
    pub max_score: f64,
    pub pass_score: f64,
    pub task_count: u32,
    pub task_passed: u32,
}

impl HierarchyScore {
    pub fn message(&self) -> Option<String> {
        match self.status {
            GradeStatus::Pass => None,
            _ => Some(format!(
                "{}/{} tests passed, score {} is below the passing score {}",
                self.task_passed, self.task_count, self.score, self.pass_score
            )),
        }
    }

    pub fn into_outcome(self) -> ScoreOutcome {
        ScoreOutcome {
            message: self.message(),
            status: self.status,
            score: self.score,
            max_score: self.max_score,
        }
    }
}

/// Count (total, passed) leaves below `node`
pub fn count_leaves(node: &TestNode) -> (u32, u32) {
    node.entries()
        .fold((0, 0), |(total, passed), (_, entry)| match entry {
            TestEntry::Leaf(true) => (total + 1, passed + 1),
            TestEntry::Leaf(false) => (total + 1, passed),
            TestEntry::Branch(child) => {
                let (t, p) = count_leaves(child);
                (total + t, passed + p)
            }
        })
}

/// Score a parsed tree; `None` when it holds no results at all
pub fn score(tree: &TestNode, max_score: f64, pass_score: f64) -> Option<HierarchyScore> {
    let (task_count, task_passed) = count_leaves(tree);
    if task_count == 0 {
        return None;
    }

    let (score, max_score, pass_score) = if max_score <= 0.0 {
        let count = f64::from(task_count);
        (f64::from(task_passed), count, count * DEFAULT_PASS_RATIO)
    } else {
        let pass_score = if pass_score > 0.0 {
            pass_score
        } else {
            max_score * DEFAULT_PASS_RATIO
        };
        (
            f64::from(task_passed) / f64::from(task_count) * max_score,
            max_score,
            pass_score,
        )
    };

    let status = if score < pass_score {
        GradeStatus::Fail
    } else {
        GradeStatus::Pass
    };

    Some(HierarchyScore {
        status,
        score,
        max_score,
        pass_score,
        task_count,
        task_passed,
    })
}
