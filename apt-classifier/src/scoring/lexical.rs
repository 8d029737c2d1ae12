//! Text-grounded scoring
//!
//! Counts a bounded set of thematic signals per pole in the biography and
//! turns the balance into an axis score:
//!
//! ```text
//! first = 50 + 50 * (hits_first - hits_second) / (hits_first + hits_second + SMOOTHING)
//! ```
//!
//! clamped to 5..=95. Signals are word stems matched at the start of a
//! word ("isolat" matches "isolated" and "isolation"). Stems that would
//! swallow unrelated words are written as exact forms instead:
//! `"=flow|flows|flowing"` matches those words only, never "flowers".
//! Each signal counts once. An axis with fewer than [`MIN_GROUNDING_HITS`] total signals is
//! left ungrounded and falls back to another strategy.

use std::collections::HashSet;

use crate::types::{Axis, AxisScore};

/// Laplace-style smoothing for the pole balance
const SMOOTHING: f64 = 2.0;

/// Minimum signals on an axis before its text score is trusted
pub const MIN_GROUNDING_HITS: usize = 2;

/// Lexical scores never claim more than this much certainty
const MIN_SCORE: i64 = 5;
const MAX_SCORE: i64 = 95;

/// Signal stems per pole, indexed by axis: (first pole, second pole)
const SIGNALS: [(&[&str], &[&str]); 4] = [
    // L / S
    (
        &[
            "solitar", "solitude", "alone", "isolat", "reclus", "introspect", "introvert",
            "private", "withdr", "lonel", "hermit", "seclu", "retreat", "inward",
            "contemplat", "meditat", "=shy", "quiet", "self-taught", "aloof",
        ],
        &[
            "social", "collaborat", "friend", "salon", "collective", "communit",
            "=public|publicly", "mentor", "pupil", "network", "gathering", "party",
            "parties", "celebrit", "colleague", "cofound", "co-found", "famous", "popular",
            "activis",
        ],
    ),
    // A / R
    (
        &[
            "abstract", "nonrepresent", "non-objective", "nonobjective", "non-figurat",
            "spiritual", "imagin", "dream", "visionar", "invent", "avant-garde", "radical",
            "distort", "fragment", "fantas", "mystic", "transcend", "symbolis", "metaphys",
            "surreal",
        ],
        &[
            "realis", "realistic", "portrait", "landscape", "figurat", "observ", "likeness",
            "lifelike", "faithful", "accura", "depict", "anatom", "scene", "document",
            "topograph", "still-life", "naturalis", "botanical", "everyday", "photograph",
        ],
    ),
    // E / M
    (
        &[
            "emotion", "passion", "feeling", "intens", "anguish", "melanchol",
            "=joy|joyful|joyous", "sorrow", "turmoil", "ecsta", "grief", "mood", "sensual",
            "intuiti", "heartfelt", "torment", "despair", "longing", "tender", "yearn",
        ],
        &[
            "concept", "=idea|ideas", "intellect", "theor", "philosoph", "meaning", "analy",
            "rational", "logic", "research", "scholar", "principle", "semiot", "critique",
            "investigat", "mathemat", "reason", "treatise", "argument", "academ",
        ],
    ),
    // F / C
    (
        &[
            "spontan", "fluid", "improvis", "loose", "gestur", "=flow|flows|flowing",
            "instinct", "energetic", "organic", "=chance|chances", "automatic", "unplanned",
            "drip", "splash", "freedom", "=wild|wildly|wildness", "restless", "impulsive",
            "vigorous", "unfinish",
        ],
        &[
            "structur", "method", "precis", "disciplin", "meticul", "order", "plann",
            "geometr", "rigor", "rigour", "systemat", "control", "balanc", "symmetr",
            "grid", "deliberat", "exact", "measured", "careful", "craft",
        ],
    ),
];

/// Signal counts and the grounded axis scores they produced
#[derive(Debug, Clone, PartialEq)]
pub struct LexicalScores {
    /// `Some` only for grounded axes
    pub axes: [Option<AxisScore>; 4],
    /// (first-pole hits, second-pole hits) per axis
    pub hits: [(usize, usize); 4],
    /// Matched stems, prefixed with their pole letter (e.g. "L:isolat")
    pub signals: Vec<String>,
}

impl LexicalScores {
    pub fn get(&self, axis: Axis) -> Option<AxisScore> {
        self.axes[axis.index()]
    }

    pub fn grounded_count(&self) -> usize {
        self.axes.iter().filter(|a| a.is_some()).count()
    }
}

/// Score a biography
pub fn score(biography: &str) -> LexicalScores {
    let lower = biography.to_lowercase();
    let words: HashSet<&str> = lower
        .split(|c: char| !(c.is_alphanumeric() || c == '-'))
        .map(|w| w.trim_matches('-'))
        .filter(|w| !w.is_empty())
        .collect();

    let mut axes = [None; 4];
    let mut hits = [(0usize, 0usize); 4];
    let mut signals = Vec::new();

    for axis in Axis::ALL {
        let (first_stems, second_stems) = SIGNALS[axis.index()];
        let (first_letter, second_letter) = axis.letters();

        let first_hits = matched_stems(&words, first_stems);
        let second_hits = matched_stems(&words, second_stems);

        signals.extend(first_hits.iter().map(|s| format!("{}:{}", first_letter, label(s))));
        signals.extend(second_hits.iter().map(|s| format!("{}:{}", second_letter, label(s))));

        let (hf, hs) = (first_hits.len(), second_hits.len());
        hits[axis.index()] = (hf, hs);

        if hf + hs >= MIN_GROUNDING_HITS {
            let balance = (hf as f64 - hs as f64) / (hf as f64 + hs as f64 + SMOOTHING);
            let first = (50.0 + 50.0 * balance).round() as i64;
            axes[axis.index()] = Some(AxisScore::from_first(first.clamp(MIN_SCORE, MAX_SCORE)));
        }
    }

    LexicalScores {
        axes,
        hits,
        signals,
    }
}

fn matched_stems<'a>(words: &HashSet<&str>, stems: &[&'a str]) -> Vec<&'a str> {
    stems
        .iter()
        .copied()
        .filter(|stem| words.iter().any(|w| matches_signal(stem, w)))
        .collect()
}

fn matches_signal(signal: &str, word: &str) -> bool {
    match signal.strip_prefix('=') {
        Some(forms) => forms.split('|').any(|form| form == word),
        None => word.starts_with(signal),
    }
}

/// Display form of a signal: the stem, or the first exact form
fn label(signal: &str) -> &str {
    signal
        .trim_start_matches('=')
        .split('|')
        .next()
        .unwrap_or(signal)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_signals_grounds_nothing() {
        let result = score("Born in a small town. Worked with oils and canvas.");
        assert_eq!(result.grounded_count(), 0);
        assert!(result.signals.is_empty());
    }

    #[test]
    fn test_single_signal_is_not_grounded() {
        let result = score("She was known to be shy.");
        assert_eq!(result.hits[Axis::Sociality.index()], (1, 0));
        assert!(result.get(Axis::Sociality).is_none());
    }

    #[test]
    fn test_one_sided_signals_score_strongly() {
        let result = score(
            "A solitary, reclusive and introspective figure who lived in isolation.",
        );
        let axis = result.get(Axis::Sociality).expect("grounded");
        // 4 hits vs 0: 50 + 50 * 4/6 = 83
        assert_eq!(axis.first, 83);
        assert!(axis.is_complementary());
    }

    #[test]
    fn test_balanced_signals_stay_near_middle() {
        let result = score("A solitary painter with a wide network of friends and a quiet studio.");
        let axis = result.get(Axis::Sociality).expect("grounded");
        assert!((40..=60).contains(&axis.first), "got {}", axis.first);
    }

    #[test]
    fn test_scores_are_clamped() {
        let text = "solitary solitude alone isolated reclusive introspective introverted private \
                    withdrawn lonely hermit secluded retreat inward contemplative meditative";
        let result = score(text);
        assert!(result.get(Axis::Sociality).unwrap().first <= 95);
    }

    #[test]
    fn test_stem_matches_word_start_only() {
        // "disorder" must not count as "order"
        let result = score("disorder and disorder");
        assert_eq!(result.hits[Axis::Structure.index()], (0, 0));
    }

    #[test]
    fn test_exact_forms_do_not_match_longer_words() {
        let result = score("Published widely, painting flowers and wildlife by chancellors.");
        assert_eq!(result.hits[Axis::Sociality.index()], (0, 0));
        assert_eq!(result.hits[Axis::Structure.index()], (0, 0));
        assert!(result.signals.is_empty(), "{:?}", result.signals);
    }

    #[test]
    fn test_exact_forms_match_listed_words() {
        let result = score("Flowing, wildly improvised canvases shown in public.");
        assert_eq!(result.hits[Axis::Structure.index()], (3, 0));
        assert_eq!(result.hits[Axis::Sociality.index()], (0, 1));
        assert!(result.signals.contains(&"F:flow".to_string()));
        assert!(result.signals.contains(&"S:public".to_string()));
    }
}
