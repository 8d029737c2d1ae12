//! Heuristic lookup scoring
//!
//! Curated priors keyed by known metadata. Used directly for sparse,
//! minimal and attribution records, and as the per-axis fallback for every
//! other strategy.
//!
//! # Algorithm
//! 1. Movement/era tags matched against [`MOVEMENTS`]; matched priors are
//!    averaged per axis. If matched priors disagree strongly on an axis
//!    (one ≥ 65, another ≤ 35) that axis is treated as contradictory and
//!    pinned to 50/50.
//! 2. With no movement match, a birth-year bucket supplies a weak prior.
//! 3. A nationality leaning that points against a movement prior at least
//!    [`CONTRADICTION_MARGIN`] points from center contradicts it; that axis
//!    is pinned to 50/50 as well.
//! 4. Nationality, medium and life-span leanings nudge the remaining axes
//!    by [`NUDGE`] points toward a pole.
//!
//! Axes with no contributing metadata stay at the 50/50 prior.

use crate::models::NormalizedRecord;
use crate::normalizer::name_key;
use crate::types::{Axis, AxisScore, AxisScores, Pole, TypeCode};

/// Points a single leaning moves an axis toward its pole
pub const NUDGE: f64 = 5.0;

/// Matched priors this far apart (both sides of 50) are contradictory
const CONTRADICTION_HIGH: u8 = 65;
const CONTRADICTION_LOW: u8 = 35;

/// Movement lean (distance from 50) a nationality must oppose to contradict it
pub const CONTRADICTION_MARGIN: f64 = 15.0;

/// Historical prior for an art movement
///
/// `prior` holds first-pole scores in axis order (L, A, E, F).
#[derive(Debug)]
pub struct MovementProfile {
    pub key: &'static str,
    pub patterns: &'static [&'static str],
    pub prior: [u8; 4],
    /// Persona codes historically associated with the movement
    pub archetypes: &'static [&'static str],
}

/// Movement table, most specific patterns first
pub static MOVEMENTS: &[MovementProfile] = &[
    MovementProfile {
        key: "abstract_expressionism",
        patterns: &["abstract expressionis", "action painting", "color field", "colour field"],
        prior: [70, 90, 80, 85],
        archetypes: &["LAEF", "LAMF", "SAEF"],
    },
    MovementProfile {
        key: "post_impressionism",
        patterns: &["post-impressionis", "post impressionis", "postimpressionis", "pointillis"],
        prior: [65, 55, 80, 70],
        archetypes: &["LAEF", "LREF", "LAEC"],
    },
    MovementProfile {
        key: "neoclassicism",
        patterns: &["neoclassic", "neo-classic"],
        prior: [50, 10, 25, 15],
        archetypes: &["LRMC", "SRMC", "SREC"],
    },
    MovementProfile {
        key: "golden_age",
        patterns: &["golden age", "dutch golden"],
        prior: [55, 15, 40, 25],
        archetypes: &["LRMC", "LREC", "SRMC"],
    },
    MovementProfile {
        key: "pop_art",
        patterns: &["pop art", "pop-art", "neo-pop"],
        prior: [20, 40, 30, 45],
        archetypes: &["SAMC", "SREF", "SAMF"],
    },
    MovementProfile {
        key: "renaissance",
        patterns: &["renaissance", "quattrocento", "cinquecento", "mannerism"],
        prior: [55, 10, 25, 15],
        archetypes: &["LRMC", "SRMC", "LREC"],
    },
    MovementProfile {
        key: "baroque",
        patterns: &["baroque", "caravaggis"],
        prior: [25, 10, 80, 30],
        archetypes: &["SREC", "SAEC", "SREF"],
    },
    MovementProfile {
        key: "rococo",
        patterns: &["rococo"],
        prior: [30, 15, 70, 55],
        archetypes: &["SREF", "SREC", "SAEC"],
    },
    MovementProfile {
        key: "romanticism",
        patterns: &["romantic"],
        prior: [60, 25, 85, 65],
        archetypes: &["LREF", "LAEF", "SREF"],
    },
    MovementProfile {
        key: "surrealism",
        patterns: &["surreal", "dada"],
        prior: [70, 80, 45, 70],
        archetypes: &["LAMF", "LAEF", "SAMF"],
    },
    MovementProfile {
        key: "realism",
        patterns: &["realism", "realist", "naturalis"],
        prior: [55, 10, 45, 30],
        archetypes: &["LRMC", "LREC", "SRMC"],
    },
    MovementProfile {
        key: "impressionism",
        patterns: &["impressionis"],
        prior: [60, 40, 85, 80],
        archetypes: &["LREF", "LAEF", "SREF"],
    },
    MovementProfile {
        key: "expressionism",
        patterns: &["expressionis", "fauvis", "die brucke", "der blaue reiter"],
        prior: [60, 65, 85, 75],
        archetypes: &["LAEF", "SAEF", "LAEC"],
    },
    MovementProfile {
        key: "cubism",
        patterns: &["cubis", "futuris", "constructivis"],
        prior: [75, 85, 35, 60],
        archetypes: &["LAMF", "SAMF", "LAMC"],
    },
    MovementProfile {
        key: "minimalism",
        patterns: &["minimalis", "de stijl", "bauhaus", "hard-edge"],
        prior: [75, 85, 15, 15],
        archetypes: &["LAMC", "LRMC", "LAMF"],
    },
    MovementProfile {
        key: "conceptual",
        patterns: &["conceptual", "fluxus"],
        prior: [60, 80, 10, 40],
        archetypes: &["LAMC", "SAMC", "LAMF"],
    },
    MovementProfile {
        key: "ukiyo_e",
        patterns: &["ukiyo-e", "ukiyo e", "woodblock"],
        prior: [45, 30, 60, 40],
        archetypes: &["LREC", "SREC", "LAEC"],
    },
    MovementProfile {
        key: "contemporary",
        patterns: &["contemporary", "street art", "installation art", "new media", "digital art"],
        prior: [40, 65, 40, 55],
        archetypes: &["SAMF", "SAMC", "SAEF"],
    },
];

/// Nationality leanings: (aliases, pole letters)
const NATIONALITY_LEANINGS: &[(&[&str], &[char])] = &[
    (&["american", "united states", "usa"], &['S', 'F']),
    (&["french", "france"], &['M', 'C']),
    (&["japanese", "japan"], &['L', 'E']),
    (&["german", "germany"], &['M', 'C']),
    (&["italian", "italy"], &['E', 'C']),
    (&["spanish", "spain"], &['E', 'F']),
    (&["dutch", "netherlands", "netherlandish"], &['R', 'C']),
    (&["russian", "russia"], &['L', 'E']),
];

/// Medium leanings: (keywords, pole letters)
const MEDIUM_LEANINGS: &[(&[&str], &[char])] = &[
    (&["mixed media", "collage", "installation", "assemblage"], &['A', 'F']),
    (&["watercolor", "watercolour", "ink wash"], &['E', 'F']),
    (&["sculpture", "sculptor", "bronze", "marble"], &['R', 'S']),
    (&["print", "etching", "woodcut", "lithograph", "engraving"], &['M', 'S']),
    (&["oil"], &['C']),
];

/// Birth-year buckets used when no movement matched
const ERA_BUCKETS: &[(i32, &str, [u8; 4])] = &[
    (1600, "pre-1600", [55, 15, 30, 20]),
    (1800, "1600-1799", [40, 15, 55, 30]),
    (1900, "1800-1899", [55, 35, 70, 60]),
    (1946, "1900-1945", [60, 70, 55, 60]),
    (i32::MAX, "post-1945", [45, 65, 45, 55]),
];

/// Lifespans outside these bounds carry a leaning
const SHORT_LIFE_YEARS: i32 = 40;
const LONG_LIFE_YEARS: i32 = 70;

/// Heuristic result with per-axis provenance
#[derive(Debug, Clone, PartialEq)]
pub struct HeuristicScores {
    pub scores: AxisScores,
    /// Whether any metadata contributed to the axis
    pub informed: [bool; 4],
    /// Axes pinned to 50/50 because metadata disagreed
    pub contradictory: [bool; 4],
    pub sources: Vec<String>,
}

/// Score a record from metadata alone
pub fn score(record: &NormalizedRecord) -> HeuristicScores {
    let mut firsts = [50.0f64; 4];
    let mut informed = [false; 4];
    let mut contradictory = [false; 4];
    let mut sources = Vec::new();

    let matched = matched_movements(record);
    if !matched.is_empty() {
        for axis in Axis::ALL {
            let i = axis.index();
            let values: Vec<u8> = matched.iter().map(|m| m.prior[i]).collect();
            let max = values.iter().copied().max().unwrap_or(50);
            let min = values.iter().copied().min().unwrap_or(50);
            if max >= CONTRADICTION_HIGH && min <= CONTRADICTION_LOW {
                contradictory[i] = true;
                continue;
            }
            firsts[i] = values.iter().map(|v| f64::from(*v)).sum::<f64>() / values.len() as f64;
            informed[i] = true;
        }
        let keys: Vec<&str> = matched.iter().map(|m| m.key).collect();
        sources.push(format!("movement:{}", keys.join(",")));
    } else if let Some(birth) = record.birth_year.known() {
        if let Some((_, label, prior)) = ERA_BUCKETS.iter().find(|(limit, _, _)| *birth < *limit) {
            for axis in Axis::ALL {
                firsts[axis.index()] = f64::from(prior[axis.index()]);
            }
            informed = [true; 4];
            sources.push(format!("era:{}", label));
        }
    }

    let mut leanings: Vec<(String, &[char])> = Vec::new();
    if let Some(nationality) = record.nationality.known() {
        if let Some(letters) = nationality_leaning(nationality) {
            if !matched.is_empty() {
                for (axis, pole) in letters.iter().filter_map(|l| Axis::from_letter(*l)) {
                    let i = axis.index();
                    if contradictory[i] {
                        continue;
                    }
                    let lean = firsts[i] - 50.0;
                    let opposed = match pole {
                        Pole::First => lean <= -CONTRADICTION_MARGIN,
                        Pole::Second => lean >= CONTRADICTION_MARGIN,
                    };
                    if opposed {
                        contradictory[i] = true;
                        informed[i] = false;
                        firsts[i] = 50.0;
                    }
                }
            }
            leanings.push((format!("nationality:{}", name_key(nationality)), letters));
        }
    }
    if let Some(medium) = record.medium.known() {
        if let Some((keyword, letters)) = medium_leaning(medium) {
            leanings.push((format!("medium:{}", keyword), letters));
        }
    }
    if let Some(lifespan) = record.lifespan() {
        if lifespan < SHORT_LIFE_YEARS {
            leanings.push(("life:short".to_string(), &['E', 'F']));
        } else if lifespan > LONG_LIFE_YEARS {
            leanings.push(("life:long".to_string(), &['M', 'C']));
        }
    }

    for (source, letters) in leanings {
        let mut applied = false;
        for letter in letters {
            let Some((axis, pole)) = Axis::from_letter(*letter) else {
                continue;
            };
            let i = axis.index();
            if contradictory[i] {
                continue;
            }
            firsts[i] += match pole {
                Pole::First => NUDGE,
                Pole::Second => -NUDGE,
            };
            informed[i] = true;
            applied = true;
        }
        if applied {
            sources.push(source);
        }
    }

    let mut scores = AxisScores::neutral();
    for axis in Axis::ALL {
        scores.set(axis, AxisScore::from_first_f64(firsts[axis.index()]));
    }

    HeuristicScores {
        scores,
        informed,
        contradictory,
        sources,
    }
}

/// Movement profiles matched by the record's era/movement tags
pub fn matched_movements(record: &NormalizedRecord) -> Vec<&'static MovementProfile> {
    let Some(tags) = record.movements.known() else {
        return Vec::new();
    };

    let mut matched: Vec<&'static MovementProfile> = Vec::new();
    for tag in tags {
        if let Some(profile) = match_movement(tag) {
            if !matched.iter().any(|m| m.key == profile.key) {
                matched.push(profile);
            }
        }
    }
    matched
}

/// First movement whose pattern occurs in `text` (lowercased)
pub fn match_movement(text: &str) -> Option<&'static MovementProfile> {
    let lower = text.to_lowercase();
    MOVEMENTS
        .iter()
        .find(|m| m.patterns.iter().any(|p| lower.contains(p)))
}

/// Every movement mentioned anywhere in a longer text, e.g. a reference summary
pub fn movements_in_text(text: &str) -> Vec<&'static str> {
    let lower = text.to_lowercase();
    let mut found: Vec<&'static str> = Vec::new();
    for movement in MOVEMENTS {
        if movement.patterns.iter().any(|p| lower.contains(p)) && !found.contains(&movement.key) {
            found.push(movement.key);
        }
    }
    // "post-impressionism" also contains "impressionis"
    if found.contains(&"post_impressionism") {
        found.retain(|k| *k != "impressionism");
    }
    if found.contains(&"abstract_expressionism") {
        found.retain(|k| *k != "expressionism");
    }
    if found.contains(&"surrealism") && !lower.contains(" realis") {
        found.retain(|k| *k != "realism");
    }
    found
}

/// Canonical nationality word for a free-text nationality, if tabled
pub fn canonical_nationality(text: &str) -> Option<&'static str> {
    let padded = format!(" {} ", name_key(text));
    NATIONALITY_LEANINGS.iter().find_map(|(aliases, _)| {
        aliases
            .iter()
            .any(|alias| padded.contains(&format!(" {} ", alias)))
            .then_some(aliases[0])
    })
}

fn nationality_leaning(text: &str) -> Option<&'static [char]> {
    let canonical = canonical_nationality(text)?;
    NATIONALITY_LEANINGS
        .iter()
        .find(|(aliases, _)| aliases[0] == canonical)
        .map(|(_, letters)| *letters)
}

fn medium_leaning(text: &str) -> Option<(&'static str, &'static [char])> {
    let lower = text.to_lowercase();
    MEDIUM_LEANINGS.iter().find_map(|(keywords, letters)| {
        keywords
            .iter()
            .find(|k| lower.contains(*k))
            .map(|k| (*k, *letters))
    })
}

/// Type codes consistent with the record's metadata
///
/// Union of the archetypes of every matched movement, in table order.
pub fn archetypes_for(record: &NormalizedRecord) -> Vec<TypeCode> {
    let mut codes = Vec::new();
    for movement in matched_movements(record) {
        for code in movement.archetypes.iter().filter_map(|c| c.parse::<TypeCode>().ok()) {
            if !codes.contains(&code) {
                codes.push(code);
            }
        }
    }
    codes
}
