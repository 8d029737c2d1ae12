//! AI-assisted scoring
//!
//! Sends one structured request per record to a [`GenerativeClient`] and
//! parses the reply defensively:
//! - each axis is read from its first-pole value; the second pole is always
//!   recomputed as `100 - first`, and a reported pair that did not sum to
//!   100 is recorded as repaired
//! - an axis missing from the reply is left empty so the caller can fall
//!   back for that axis alone
//! - timeouts, transport errors and unparseable replies are retried once
//!   before the outcome is `Unavailable`

use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::generative_client::GenerativeClient;
use crate::models::NormalizedRecord;
use crate::types::{Axis, AxisScore};
use crate::utils::text::{outer_json_object, strip_code_blocks, truncate_to_char_boundary};

/// Biography bytes sent to the service
const MAX_BIOGRAPHY_BYTES: usize = 4000;

/// Total attempts per record (first call + one retry)
const MAX_ATTEMPTS: u32 = 2;

const SYSTEM_PROMPT: &str = "You are an art historian who profiles visual artists on four \
bipolar axes. For each axis give the first pole a score from 0 to 100; the second pole is \
100 minus that score.\n\
- L (solitary) vs S (social)\n\
- A (abstract) vs R (representational)\n\
- E (emotional) vs M (meaning/conceptual)\n\
- F (flowing/spontaneous) vs C (constructive/structured)\n\
Judge each axis independently from the evidence given. Do not default to any single \
combination; use values near 50 only when the evidence is genuinely balanced.\n\
Reply with a JSON object only: {\"scores\": {\"L\": n, \"S\": n, \"A\": n, \"R\": n, \
\"E\": n, \"M\": n, \"F\": n, \"C\": n}, \"rationale\": \"one or two sentences\"}";

/// Axis values recovered from a reply
#[derive(Debug, Clone, PartialEq)]
pub struct AiAxes {
    pub axes: [Option<AxisScore>; 4],
    pub rationale: Option<String>,
    /// Axes whose reported pair did not sum to 100
    pub repaired: Vec<Axis>,
}

impl AiAxes {
    pub fn get(&self, axis: Axis) -> Option<AxisScore> {
        self.axes[axis.index()]
    }
}

/// Result of AI-assisted scoring for one record
#[derive(Debug, Clone, PartialEq)]
pub enum AiOutcome {
    /// All four axes present
    Scored(AiAxes),
    /// Some axes present; the rest need fallback
    Malformed(AiAxes),
    /// No usable reply after retry
    Unavailable(String),
}

/// Scorer wrapping a generative client with timeout and retry
pub struct AiScorer {
    client: Arc<dyn GenerativeClient>,
    timeout: Duration,
}

impl AiScorer {
    pub fn new(client: Arc<dyn GenerativeClient>, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    pub fn service_name(&self) -> &str {
        self.client.name()
    }

    /// Score a record, retrying once on timeout/error/unparseable reply
    pub async fn score(&self, record: &NormalizedRecord) -> AiOutcome {
        let user_prompt = build_user_prompt(record);
        let mut last_reason = String::new();

        for attempt in 1..=MAX_ATTEMPTS {
            let call = self.client.complete(SYSTEM_PROMPT, &user_prompt);
            last_reason = match tokio::time::timeout(self.timeout, call).await {
                Err(_) => format!("timed out after {} ms", self.timeout.as_millis()),
                Ok(Err(e)) => e.to_string(),
                Ok(Ok(text)) => match parse_response(&text) {
                    AiOutcome::Unavailable(reason) => reason,
                    outcome => return outcome,
                },
            };

            if attempt < MAX_ATTEMPTS {
                debug!(
                    artist_id = %record.id,
                    attempt,
                    reason = %last_reason,
                    "Generative scoring failed, retrying"
                );
            }
        }

        warn!(
            artist_id = %record.id,
            service = %self.client.name(),
            reason = %last_reason,
            "Generative scoring unavailable, falling back"
        );
        AiOutcome::Unavailable(last_reason)
    }
}

/// Prompt describing the record
pub fn build_user_prompt(record: &NormalizedRecord) -> String {
    let mut prompt = format!("Artist: {}\n", record.name);

    if let Some(localized) = record.name_localized.known() {
        prompt.push_str(&format!("Also known as: {}\n", localized));
    }
    if let Some(nationality) = record.nationality.known() {
        prompt.push_str(&format!("Nationality: {}\n", nationality));
    }
    if let Some(movements) = record.movements.known() {
        prompt.push_str(&format!("Movements: {}\n", movements.join(", ")));
    }
    match (record.birth_year.known(), record.death_year.known()) {
        (Some(b), Some(d)) => prompt.push_str(&format!("Life: {}-{}\n", b, d)),
        (Some(b), None) => prompt.push_str(&format!("Born: {}\n", b)),
        (None, Some(d)) => prompt.push_str(&format!("Died: {}\n", d)),
        (None, None) => {}
    }
    if let Some(medium) = record.medium.known() {
        prompt.push_str(&format!("Primary medium: {}\n", medium));
    }
    if let Some(biography) = record.biography.known() {
        prompt.push_str("\nBiography:\n");
        prompt.push_str(truncate_to_char_boundary(biography, MAX_BIOGRAPHY_BYTES));
        prompt.push('\n');
    }

    prompt
}

/// Parse a reply into axis scores
///
/// Accepted shapes, per axis:
/// - `{"scores": {"L": 70, "S": 30}}` or the same keys at top level
/// - `{"scores": {"L_S": {"L": 70, "S": 30}}}`
/// - `{"scores": {"L_S": -40}}`: centered score in -100..=100 where
///   negative leans to the first pole
pub fn parse_response(text: &str) -> AiOutcome {
    let cleaned = strip_code_blocks(text);
    let value: Value = match serde_json::from_str(cleaned) {
        Ok(v) => v,
        Err(_) => match outer_json_object(cleaned).map(serde_json::from_str::<Value>) {
            Some(Ok(v)) => v,
            _ => return AiOutcome::Unavailable("reply is not JSON".to_string()),
        },
    };

    let scores = value
        .get("scores")
        .filter(|v| v.is_object())
        .unwrap_or(&value);

    let mut axes = [None; 4];
    let mut repaired = Vec::new();

    for axis in Axis::ALL {
        if let Some((score, was_repaired)) = read_axis(scores, axis) {
            axes[axis.index()] = Some(score);
            if was_repaired {
                repaired.push(axis);
            }
        }
    }

    let rationale = ["rationale", "reasoning"]
        .iter()
        .find_map(|k| value.get(*k).and_then(Value::as_str))
        .map(str::to_string);

    let present = axes.iter().filter(|a| a.is_some()).count();
    let parsed = AiAxes {
        axes,
        rationale,
        repaired,
    };

    match present {
        0 => AiOutcome::Unavailable("reply has no axis scores".to_string()),
        4 => AiOutcome::Scored(parsed),
        _ => AiOutcome::Malformed(parsed),
    }
}

/// Read one axis; returns the score and whether the pair needed repair
fn read_axis(scores: &Value, axis: Axis) -> Option<(AxisScore, bool)> {
    let (first_letter, second_letter) = axis.letters();

    let container = match scores.get(axis.label()) {
        Some(nested) if nested.is_object() => nested,
        Some(centered) => {
            let main = number(centered).filter(|v| (-100.0..=100.0).contains(v))?;
            return Some((AxisScore::from_first_f64(50.0 - main / 2.0), false));
        }
        None => scores,
    };

    let first = container
        .get(first_letter.to_string())
        .and_then(number)
        .filter(|v| (0.0..=100.0).contains(v));
    let second = container
        .get(second_letter.to_string())
        .and_then(number)
        .filter(|v| (0.0..=100.0).contains(v));

    match (first, second) {
        (Some(f), Some(s)) => {
            let score = AxisScore::from_first_f64(f);
            Some((score, (f + s - 100.0).abs() > 0.5))
        }
        (Some(f), None) => Some((AxisScore::from_first_f64(f), false)),
        (None, Some(s)) => Some((AxisScore::from_first_f64(100.0 - s), false)),
        (None, None) => None,
    }
}

fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_end_matches('%').parse().ok(),
        _ => None,
    }
}
