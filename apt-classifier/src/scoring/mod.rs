//! Axis Scoring Engine
//!
//! Produces one complementary score pair per axis, choosing a strategy by
//! data tier and falling back per axis:
//!
//! | Tier                          | Ladder                                                        |
//! |-------------------------------|---------------------------------------------------------------|
//! | rich                          | AI → heuristic; text-grounded → heuristic without an AI reply |
//! | moderate                      | text-grounded → AI (if ambiguous) → heuristic                 |
//! | sparse / minimal / attribution| heuristic                                                     |
//!
//! A moderate record is "ambiguous" when fewer than
//! [`AMBIGUITY_GROUNDED_AXES`] axes are grounded by text. The heuristic
//! result is computed for every record and fills any axis no other
//! strategy produced. On a rich record, axes a generative reply leaves out
//! take the heuristic prior.

pub mod ai_assisted;
pub mod generative_client;
pub mod heuristic;
pub mod lexical;

use tracing::debug;

use crate::models::NormalizedRecord;
use crate::types::{Axis, AxisProvenance, AxisScore, AxisScores, DataTier, ScoringStrategy};
use ai_assisted::{AiOutcome, AiScorer};

/// Moderate records with fewer grounded axes than this consult the AI
pub const AMBIGUITY_GROUNDED_AXES: usize = 3;

/// Scores plus provenance for one record
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringOutcome {
    pub scores: AxisScores,
    pub strategies: [ScoringStrategy; 4],
    pub reasoning: Vec<String>,
    pub sources: Vec<String>,
}

impl ScoringOutcome {
    /// Strategy summary, e.g. "text_grounded+heuristic"
    pub fn strategy_summary(&self) -> String {
        let mut used: Vec<ScoringStrategy> = Vec::new();
        for strategy in self.strategies {
            if !used.contains(&strategy) {
                used.push(strategy);
            }
        }
        used.sort();
        used.iter()
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join("+")
    }

    pub fn provenance(&self) -> Vec<AxisProvenance> {
        Axis::ALL
            .iter()
            .map(|&axis| AxisProvenance {
                axis,
                strategy: self.strategies[axis.index()],
            })
            .collect()
    }
}

/// Tier-driven scoring ladder
pub struct ScoringEngine {
    ai: Option<AiScorer>,
}

impl ScoringEngine {
    pub fn new(ai: Option<AiScorer>) -> Self {
        Self { ai }
    }

    /// Heuristic and text scoring only
    pub fn offline() -> Self {
        Self { ai: None }
    }

    pub fn has_ai(&self) -> bool {
        self.ai.is_some()
    }

    /// Score a record at a given tier
    pub async fn score(&self, record: &NormalizedRecord, tier: DataTier) -> ScoringOutcome {
        let heuristic = heuristic::score(record);
        let mut axes: [Option<(AxisScore, ScoringStrategy)>; 4] = [None; 4];
        let mut reasoning = Vec::new();
        let mut sources = heuristic.sources.clone();

        let lexical = match (tier, record.biography.known()) {
            (DataTier::Rich | DataTier::Moderate, Some(bio)) => Some(lexical::score(bio)),
            _ => None,
        };

        let wants_ai = match tier {
            DataTier::Rich => true,
            DataTier::Moderate => lexical
                .as_ref()
                .map(|l| l.grounded_count() < AMBIGUITY_GROUNDED_AXES)
                .unwrap_or(true),
            _ => false,
        };

        if tier == DataTier::Moderate {
            if let Some(lex) = &lexical {
                fill_lexical(&mut axes, lex);
            }
        }

        let mut ai_answered = false;
        if wants_ai {
            if let Some(ai) = &self.ai {
                match ai.score(record).await {
                    AiOutcome::Scored(result) | AiOutcome::Malformed(result) => {
                        ai_answered = true;
                        for axis in Axis::ALL {
                            let slot = &mut axes[axis.index()];
                            if slot.is_none() {
                                if let Some(score) = result.get(axis) {
                                    *slot = Some((score, ScoringStrategy::AiAssisted));
                                }
                            }
                        }
                        if !result.repaired.is_empty() {
                            let labels: Vec<&str> = result.repaired.iter().map(|a| a.label()).collect();
                            reasoning.push(format!(
                                "generative pairs recomputed from first pole: {}",
                                labels.join(", ")
                            ));
                        }
                        if let Some(rationale) = result.rationale {
                            reasoning.push(format!("generative: {}", rationale));
                        }
                        sources.push(format!("generative:{}", ai.service_name()));
                    }
                    AiOutcome::Unavailable(reason) => {
                        reasoning.push(format!("generative scoring unavailable: {}", reason));
                    }
                }
            }
        }

        if tier == DataTier::Rich && !ai_answered {
            if let Some(lex) = &lexical {
                fill_lexical(&mut axes, lex);
            }
        }

        if let Some(lex) = &lexical {
            if lex.grounded_count() > 0 {
                reasoning.push(format!("text signals: {}", lex.signals.join(" ")));
            }
        }

        let mut scores = AxisScores::neutral();
        let mut strategies = [ScoringStrategy::Heuristic; 4];
        for axis in Axis::ALL {
            let (score, strategy) = axes[axis.index()]
                .unwrap_or((heuristic.scores.get(axis), ScoringStrategy::Heuristic));
            scores.set(axis, score);
            strategies[axis.index()] = strategy;
        }

        let heuristic_axes: Vec<&str> = Axis::ALL
            .iter()
            .filter(|a| strategies[a.index()] == ScoringStrategy::Heuristic)
            .map(|a| a.label())
            .collect();
        if !heuristic_axes.is_empty() {
            let uninformed: Vec<&str> = Axis::ALL
                .iter()
                .filter(|a| {
                    strategies[a.index()] == ScoringStrategy::Heuristic && !heuristic.informed[a.index()]
                })
                .map(|a| a.label())
                .collect();
            if uninformed.is_empty() {
                reasoning.push(format!("heuristic priors for {}", heuristic_axes.join(", ")));
            } else {
                reasoning.push(format!(
                    "heuristic priors for {} (no evidence, 50/50: {})",
                    heuristic_axes.join(", "),
                    uninformed.join(", ")
                ));
            }
        }

        debug!(
            artist_id = %record.id,
            tier = %tier,
            strategies = ?strategies,
            "Axis scoring complete"
        );

        ScoringOutcome {
            scores,
            strategies,
            reasoning,
            sources,
        }
    }
}

fn fill_lexical(axes: &mut [Option<(AxisScore, ScoringStrategy)>; 4], lex: &lexical::LexicalScores) {
    for axis in Axis::ALL {
        let slot = &mut axes[axis.index()];
        if slot.is_none() {
            if let Some(score) = lex.get(axis) {
                *slot = Some((score, ScoringStrategy::TextGrounded));
            }
        }
    }
}
