//! Report types returned by a synthesis call.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// RoundKind
// ---------------------------------------------------------------------------

/// Which pass of the reduction a round belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundKind {
    /// Round 0: passages → answers.
    Map,
    /// Any later round: answers → fewer answers.
    Reduce,
}

impl RoundKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Map => "map",
            Self::Reduce => "reduce",
        }
    }
}

impl std::fmt::Display for RoundKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// RoundSummary
// ---------------------------------------------------------------------------

/// What happened during one round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundSummary {
    /// Zero-based round number (0 is the map round).
    pub round: usize,
    pub kind: RoundKind,
    /// Units consumed by this round.
    pub input_units: usize,
    /// Batches the units were partitioned into.
    pub batches: usize,
    /// Model calls issued (equals answers produced).
    pub invocations: usize,
    /// Batches dropped without a call.
    pub skipped: usize,
    /// Sum of the costs charged in this round.
    pub cost: f64,
}

// ---------------------------------------------------------------------------
// SynthesisReport
// ---------------------------------------------------------------------------

/// Result of a successful synthesis call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesisReport {
    /// The single surviving answer.
    pub answer: String,
    /// Sum of the costs of every invocation issued.
    pub total_cost: f64,
    /// Total number of invocations across all rounds.
    pub invocations: usize,
    /// Per-round breakdown, in execution order.
    pub rounds: Vec<RoundSummary>,
}

impl SynthesisReport {
    /// Split into the `(answer, total_cost)` pair.
    pub fn into_parts(self) -> (String, f64) {
        (self.answer, self.total_cost)
    }

    /// Number of reduce rounds that ran after the map round.
    pub fn reduce_rounds(&self) -> usize {
        self.rounds
            .iter()
            .filter(|r| r.kind == RoundKind::Reduce)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round(round: usize, kind: RoundKind, invocations: usize) -> RoundSummary {
        RoundSummary {
            round,
            kind,
            input_units: invocations * 2,
            batches: invocations,
            invocations,
            skipped: 0,
            cost: invocations as f64,
        }
    }

    #[test]
    fn round_kind_serializes_snake_case() {
        assert_eq!(serde_json::to_string(&RoundKind::Map).unwrap(), r#""map""#);
        assert_eq!(RoundKind::Reduce.to_string(), "reduce");
    }

    #[test]
    fn report_counts_reduce_rounds() {
        let report = SynthesisReport {
            answer: "42".into(),
            total_cost: 3.0,
            invocations: 3,
            rounds: vec![round(0, RoundKind::Map, 2), round(1, RoundKind::Reduce, 1)],
        };
        assert_eq!(report.reduce_rounds(), 1);

        let (answer, cost) = report.into_parts();
        assert_eq!(answer, "42");
        assert_eq!(cost, 3.0);
    }

    #[test]
    fn report_serializes_to_json() {
        let report = SynthesisReport {
            answer: "yes".into(),
            total_cost: 0.5,
            invocations: 1,
            rounds: vec![round(0, RoundKind::Map, 1)],
        };
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains(r#""answer":"yes""#));
        assert!(json.contains(r#""kind":"map""#));
    }
}
