//! Record Normalizer
//!
//! Pure transform from [`RawArtistRecord`] to [`NormalizedRecord`]:
//! - whitespace collapsed, wrapping quotes stripped
//! - every optional field becomes `Field::Known` / `Field::Unknown`
//! - attribution phrasing ("Workshop of X") detected and the subject
//!   name extracted for reference lookups
//! - impossible years dropped
//!
//! Only an unusable identity (no name with any letters or digits, or a
//! bare placeholder like "Anonymous") is rejected as `InvalidRecord`.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{ClassifyError, ClassifyResult};
use crate::models::{Attribution, Field, NormalizedRecord, RawArtistRecord};

/// Plausible year range for artist life dates
const MIN_YEAR: i32 = 1000;
const MAX_YEAR: i32 = 2100;

/// Attribution qualifiers, longest first so "copy after" wins over "after"
const ATTRIBUTION_QUALIFIERS: [&str; 11] = [
    "attributed to",
    "workshop of",
    "follower of",
    "imitator of",
    "circle of",
    "school of",
    "studio of",
    "manner of",
    "style of",
    "copy after",
    "after",
];

/// Names that carry no identity on their own
const PLACEHOLDER_NAMES: [&str; 6] = [
    "unknown",
    "anonymous",
    "unknown artist",
    "anonymous artist",
    "unidentified artist",
    "n/a",
];

/// Qualifier at the start of the name or after a separator
static ATTRIBUTION_RE: Lazy<Regex> = Lazy::new(|| {
    let alternatives = ATTRIBUTION_QUALIFIERS.join("|");
    Regex::new(&format!(r"(?i)(?:^|[,;(]\s*)({})\s+", alternatives))
        .expect("attribution pattern is valid")
});

/// Trailing parenthetical like "(Dutch, 1606-1669)"
static TRAILING_PAREN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*\([^)]*\)\s*$").expect("parenthetical pattern is valid"));

/// Normalize a raw record
pub fn normalize(raw: &RawArtistRecord) -> ClassifyResult<NormalizedRecord> {
    let localized = clean_text(raw.name_localized.as_deref());
    let name = match clean_name(raw.name.as_deref()) {
        Some(name) => name,
        None => match localized.as_deref().and_then(|n| clean_name(Some(n))) {
            Some(name) => name,
            None => {
                return Err(ClassifyError::invalid_record(
                    raw.id,
                    "artist name is empty or has no usable characters",
                ))
            }
        },
    };

    let attribution = detect_attribution(&name);
    let lookup_name = match &attribution {
        Some(Attribution {
            subject: Some(subject),
            ..
        }) => subject.clone(),
        _ => TRAILING_PAREN_RE.replace(&name, "").trim().to_string(),
    };

    if attribution.is_none() && is_placeholder(&lookup_name) {
        return Err(ClassifyError::invalid_record(
            raw.id,
            format!("artist name '{}' is a placeholder", name),
        ));
    }

    let (birth_year, death_year) = normalize_years(raw.birth_year, raw.death_year);

    Ok(NormalizedRecord {
        id: raw.id,
        name,
        lookup_name,
        name_localized: localized.into(),
        nationality: clean_text(raw.nationality.as_deref()).into(),
        movements: normalize_movements(&raw.movements),
        birth_year,
        death_year,
        biography: clean_biography(raw.biography.as_deref()).into(),
        medium: clean_text(raw.medium.as_deref())
            .map(|m| m.to_lowercase())
            .into(),
        artwork_count: raw.artwork_count.filter(|c| *c > 0).into(),
        attribution,
        prior: raw.prior.clone(),
        enriched_from: Vec::new(),
    })
}

/// Case-folded, whitespace-collapsed key used for caches and comparisons
pub fn name_key(name: &str) -> String {
    name.split_whitespace()
        .map(|w| {
            w.chars()
                .filter(|c| c.is_alphanumeric())
                .flat_map(char::to_lowercase)
                .collect::<String>()
        })
        .filter(|w| !w.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Trim and collapse whitespace; `None` when nothing remains
fn clean_text(value: Option<&str>) -> Option<String> {
    let collapsed = value?.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        None
    } else {
        Some(collapsed)
    }
}

/// Cleaned name, or `None` when it has no letters or digits
fn clean_name(value: Option<&str>) -> Option<String> {
    let text = clean_text(value)?;
    let stripped = text
        .trim_matches(|c: char| matches!(c, '"' | '\'' | '“' | '”' | '‘' | '’' | '`'))
        .trim()
        .to_string();
    if stripped.chars().any(char::is_alphanumeric) {
        Some(stripped)
    } else {
        None
    }
}

/// Biography keeps paragraph breaks but drops surrounding blank space
fn clean_biography(value: Option<&str>) -> Option<String> {
    let trimmed = value?.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn is_placeholder(name: &str) -> bool {
    let key = name.trim().to_lowercase();
    PLACEHOLDER_NAMES.contains(&key.as_str())
}

/// Detect attribution qualifiers and recover the first named subject
///
/// "Attributed to Rembrandt van Rijn, workshop of Jan Lievens" yields the
/// qualifiers `["attributed to", "workshop of"]` and subject
/// "Rembrandt van Rijn".
pub fn detect_attribution(name: &str) -> Option<Attribution> {
    let matches: Vec<_> = ATTRIBUTION_RE.captures_iter(name).collect();
    if matches.is_empty() {
        return None;
    }

    let mut qualifiers = Vec::new();
    let mut subject = None;

    for caps in &matches {
        let (Some(whole), Some(qualifier)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        qualifiers.push(qualifier.as_str().to_lowercase());

        if subject.is_none() {
            let rest = &name[whole.end()..];
            let end = rest.find([',', ';', '(']).unwrap_or(rest.len());
            let candidate = rest[..end].trim();
            if candidate.chars().any(char::is_alphanumeric) && !is_placeholder(candidate) {
                subject = Some(candidate.to_string());
            }
        }
    }

    Some(Attribution {
        qualifiers,
        subject,
    })
}

fn normalize_movements(raw: &[String]) -> Field<Vec<String>> {
    let mut movements: Vec<String> = Vec::new();
    for tag in raw {
        // Collaborators sometimes pack several tags into one string
        for part in tag.split([',', ';', '/']) {
            let cleaned = part.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();
            if !cleaned.is_empty() && !movements.contains(&cleaned) {
                movements.push(cleaned);
            }
        }
    }

    if movements.is_empty() {
        Field::Unknown
    } else {
        Field::Known(movements)
    }
}

fn normalize_years(birth: Option<i32>, death: Option<i32>) -> (Field<i32>, Field<i32>) {
    let in_range = |y: i32| (MIN_YEAR..=MAX_YEAR).contains(&y);
    let birth = birth.filter(|y| in_range(*y));
    let death = death.filter(|y| in_range(*y));

    match (birth, death) {
        (Some(b), Some(d)) if b > d => {
            tracing::debug!(birth = b, death = d, "Contradictory life dates, dropping both");
            (Field::Unknown, Field::Unknown)
        }
        (b, d) => (b.into(), d.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn raw(name: &str) -> RawArtistRecord {
        RawArtistRecord::new(Uuid::new_v4(), name)
    }

    #[test]
    fn test_unusable_names_are_invalid() {
        for name in ["", "   ", "?!.,", "\"\""] {
            let err = normalize(&raw(name)).unwrap_err();
            assert!(matches!(err, ClassifyError::InvalidRecord { .. }), "{name:?}");
        }
        let mut missing = raw("x");
        missing.name = None;
        assert!(normalize(&missing).is_err());
    }

    #[test]
    fn test_placeholder_name_is_invalid() {
        assert!(normalize(&raw("Anonymous")).is_err());
        assert!(normalize(&raw("  unknown   artist ")).is_err());
    }

    #[test]
    fn test_localized_name_rescues_empty_primary() {
        let mut record = raw("  ");
        record.name_localized = Some("이중섭".to_string());
        let normalized = normalize(&record).unwrap();
        assert_eq!(normalized.name, "이중섭");
    }

    #[test]
    fn test_missing_fields_become_unknown() {
        let normalized = normalize(&raw("Hilma af Klint")).unwrap();
        assert_eq!(normalized.biography, Field::Unknown);
        assert_eq!(normalized.nationality, Field::Unknown);
        assert_eq!(normalized.movements, Field::Unknown);
        assert_eq!(normalized.metadata_count(), 0);
        assert_eq!(normalized.biography_len(), 0);
    }

    #[test]
    fn test_whitespace_and_quotes_cleaned() {
        let mut record = raw("  \"Frida    Kahlo\"  ");
        record.nationality = Some("  Mexican ".to_string());
        record.biography = Some("   ".to_string());
        let normalized = normalize(&record).unwrap();
        assert_eq!(normalized.name, "Frida Kahlo");
        assert_eq!(normalized.nationality, Field::Known("Mexican".to_string()));
        assert_eq!(normalized.biography, Field::Unknown);
    }

    #[test]
    fn test_attribution_with_two_qualifiers() {
        let normalized =
            normalize(&raw("Attributed to Rembrandt van Rijn, workshop of Jan Lievens")).unwrap();
        let attribution = normalized.attribution.expect("attribution detected");
        assert_eq!(attribution.qualifiers, vec!["attributed to", "workshop of"]);
        assert_eq!(attribution.subject.as_deref(), Some("Rembrandt van Rijn"));
        assert_eq!(normalized.lookup_name, "Rembrandt van Rijn");
    }

    #[test]
    fn test_after_only_matches_as_qualifier() {
        assert!(detect_attribution("After Caravaggio").is_some());
        assert!(detect_attribution("Copy after Titian").is_some());
        assert!(detect_attribution("Jan Aftersen").is_none());
        assert!(detect_attribution("Claude Monet").is_none());
    }

    #[test]
    fn test_movements_split_and_lowercased() {
        let mut record = raw("Piet Mondrian");
        record.movements = vec!["De Stijl, Abstract Art".to_string(), "de stijl".to_string()];
        let normalized = normalize(&record).unwrap();
        assert_eq!(
            normalized.movements,
            Field::Known(vec!["de stijl".to_string(), "abstract art".to_string()])
        );
    }

    #[test]
    fn test_impossible_years_dropped() {
        let mut record = raw("Someone");
        record.birth_year = Some(1900);
        record.death_year = Some(1850);
        let normalized = normalize(&record).unwrap();
        assert_eq!(normalized.birth_year, Field::Unknown);
        assert_eq!(normalized.death_year, Field::Unknown);

        record.birth_year = Some(12);
        record.death_year = Some(1890);
        let normalized = normalize(&record).unwrap();
        assert_eq!(normalized.birth_year, Field::Unknown);
        assert_eq!(normalized.death_year, Field::Known(1890));
    }

    #[test]
    fn test_lookup_name_drops_trailing_parenthetical() {
        let normalized = normalize(&raw("Johannes Vermeer (Dutch, 1632-1675)")).unwrap();
        assert_eq!(normalized.lookup_name, "Johannes Vermeer");
    }

    #[test]
    fn test_name_key() {
        assert_eq!(name_key("  Vincent  van Gogh! "), "vincent van gogh");
        assert_eq!(name_key("J.M.W. Turner"), "jmw turner");
    }
}
