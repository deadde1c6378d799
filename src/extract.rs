//! Field Extraction Engine: a table of named patterns applied to raw markup.
//!
//! Extraction is total. A field whose pattern does not match, or whose match
//! cannot be coerced to the field's type, takes the type's zero value. One
//! malformed page must never be able to abort a run, so nothing here returns
//! an error once the table itself has been built.

use crate::error::ConfigError;
use crate::models::{AttributeRecord, FieldKind, FieldValue};
use regex::{Regex, RegexBuilder};
use rustc_hash::FxHashSet;

#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub name: String,
    pub kind: FieldKind,
    pattern: Regex,
}

impl FieldSpec {
    /// `pattern` must contain at least one capture group; group 1 is the value.
    /// Matching is always case-insensitive.
    pub fn new(name: &str, pattern: &str, kind: FieldKind) -> Result<Self, ConfigError> {
        let compiled = RegexBuilder::new(pattern)
            .case_insensitive(true)
            .multi_line(true)
            .build()
            .map_err(|e| ConfigError::InvalidPattern {
                field: name.to_string(),
                reason: e.to_string(),
            })?;
        if compiled.captures_len() < 2 {
            return Err(ConfigError::InvalidPattern {
                field: name.to_string(),
                reason: "pattern has no capture group".to_string(),
            });
        }
        Ok(Self {
            name: name.to_string(),
            kind,
            pattern: compiled,
        })
    }

    /// Spec for a `| param = value` template parameter. The parameter must
    /// start a line or follow a `|`, so `str` never matches inside `rstr`.
    pub fn param(name: &str, param: &str, kind: FieldKind) -> Result<Self, ConfigError> {
        let value = match kind {
            FieldKind::Integer => r"([+-]?\d+(?:\.\d+)?)",
            FieldKind::PercentFloat => r"([+-]?\d+(?:\.\d+)?\s*%?)",
            FieldKind::String => r"([^|\n}]*)",
        };
        let key = regex::escape(param).replace(' ', r"[ _]");
        Self::new(name, &format!(r"(?:^|\|)[ \t]*{}[ \t]*=[ \t]*{}", key, value), kind)
    }

    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    fn extract(&self, markup: &str) -> FieldValue {
        let raw = self
            .pattern
            .captures(markup)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str());
        match raw {
            Some(raw) => coerce(raw, self.kind),
            None => self.kind.default_value(),
        }
    }
}

/// Ordered set of field specs with unique names.
#[derive(Debug, Clone)]
pub struct FieldTable {
    specs: Vec<FieldSpec>,
}

impl FieldTable {
    pub fn new(specs: Vec<FieldSpec>) -> Result<Self, ConfigError> {
        let mut seen = FxHashSet::default();
        for spec in &specs {
            if !seen.insert(spec.name.as_str()) {
                return Err(ConfigError::DuplicateField(spec.name.clone()));
            }
        }
        Ok(Self { specs })
    }

    pub fn specs(&self) -> &[FieldSpec] {
        &self.specs
    }

    pub fn contains(&self, name: &str) -> bool {
        self.specs.iter().any(|s| s.name == name)
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

/// One entry per spec, in table order.
pub fn extract(markup: &str, table: &FieldTable) -> AttributeRecord {
    let mut record = AttributeRecord::new();
    for spec in &table.specs {
        record.insert(spec.name.clone(), spec.extract(markup));
    }
    record
}

/// Converts matched text to a typed value. Numeric kinds drop a leading `+`
/// and a trailing `%`; unparseable residue becomes the zero value.
pub fn coerce(raw: &str, kind: FieldKind) -> FieldValue {
    let trimmed = raw.trim();
    match kind {
        FieldKind::String => FieldValue::Text(trimmed.to_string()),
        FieldKind::Integer => FieldValue::Integer(parse_integer(&numeric_text(trimmed))),
        FieldKind::PercentFloat => FieldValue::Float(parse_float(&numeric_text(trimmed))),
    }
}

fn numeric_text(s: &str) -> String {
    let s = s.strip_prefix('+').unwrap_or(s);
    let s = s.trim_end().strip_suffix('%').unwrap_or(s);
    s.trim().to_string()
}

/// Decimal text is truncated toward zero.
fn parse_integer(s: &str) -> i64 {
    if let Ok(v) = s.parse::<i64>() {
        return v;
    }
    match s.parse::<f64>() {
        Ok(v) if v.is_finite() && v.abs() < i64::MAX as f64 => v.trunc() as i64,
        _ => 0,
    }
}

fn parse_float(s: &str) -> f64 {
    match s.parse::<f64>() {
        Ok(v) if v.is_finite() => v,
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(specs: Vec<FieldSpec>) -> FieldTable {
        FieldTable::new(specs).unwrap()
    }

    #[test]
    fn extracts_typed_parameters() {
        let t = table(vec![
            FieldSpec::param("id", "id", FieldKind::Integer).unwrap(),
            FieldSpec::param("stab_attack", "astab", FieldKind::Integer).unwrap(),
            FieldSpec::param("magic_damage", "mdmg", FieldKind::PercentFloat).unwrap(),
            FieldSpec::param("slot", "slot", FieldKind::String).unwrap(),
        ]);
        let markup = "{{Infobox Bonuses\n|astab = +50\n|mdmg = 2.5%\n|slot = weapon\n}}\n{{Infobox Item|id=1289}}";
        let rec = extract(markup, &t);
        assert_eq!(rec.get("id"), Some(&FieldValue::Integer(1289)));
        assert_eq!(rec.get("stab_attack"), Some(&FieldValue::Integer(50)));
        assert_eq!(rec.get("magic_damage"), Some(&FieldValue::Float(2.5)));
        assert_eq!(rec.get("slot"), Some(&FieldValue::Text("weapon".into())));
    }

    #[test]
    fn every_spec_yields_a_value_on_empty_markup() {
        let t = table(vec![
            FieldSpec::param("a", "astab", FieldKind::Integer).unwrap(),
            FieldSpec::param("m", "mdmg", FieldKind::PercentFloat).unwrap(),
            FieldSpec::param("s", "slot", FieldKind::String).unwrap(),
        ]);
        for markup in ["", "no templates at all", "{{broken", "|astab = lots"] {
            let rec = extract(markup, &t);
            assert_eq!(rec.len(), 3);
            assert_eq!(rec.get("a"), Some(&FieldValue::Integer(0)));
            assert_eq!(rec.get("m"), Some(&FieldValue::Float(0.0)));
            assert_eq!(rec.get("s"), Some(&FieldValue::Text(String::new())));
        }
    }

    #[test]
    fn case_insensitive_and_first_match_wins() {
        let t = table(vec![FieldSpec::param("prayer", "prayer", FieldKind::Integer).unwrap()]);
        let rec = extract("|Prayer = 3\n|prayer = 9", &t);
        assert_eq!(rec.integer("prayer"), 3);
    }

    #[test]
    fn param_does_not_match_suffix_of_longer_name() {
        let t = table(vec![
            FieldSpec::param("melee_strength", "str", FieldKind::Integer).unwrap(),
        ]);
        let rec = extract("|rstr = 20\n", &t);
        assert_eq!(rec.integer("melee_strength"), 0);
        let rec = extract("|rstr = 20\n|str = 7\n", &t);
        assert_eq!(rec.integer("melee_strength"), 7);
    }

    #[test]
    fn param_with_space_matches_underscore_form() {
        let t = table(vec![
            FieldSpec::param("max_hit", "max hit", FieldKind::Integer).unwrap(),
        ]);
        assert_eq!(extract("|max_hit = 41", &t).integer("max_hit"), 41);
        assert_eq!(extract("|max hit = 42", &t).integer("max_hit"), 42);
    }

    #[test]
    fn negative_values_survive() {
        let t = table(vec![FieldSpec::param("magic_attack", "amagic", FieldKind::Integer).unwrap()]);
        assert_eq!(extract("|amagic = -30", &t).integer("magic_attack"), -30);
    }

    #[test]
    fn custom_pattern_with_non_numeric_capture_defaults() {
        let t = table(vec![
            FieldSpec::new("attack_range", r"attackrange\s*=\s*(\d+|\w+)", FieldKind::Integer).unwrap(),
        ]);
        assert_eq!(extract("|attackrange = staff", &t).integer("attack_range"), 0);
        assert_eq!(extract("|attackrange = 7", &t).integer("attack_range"), 7);
    }

    #[test]
    fn coerce_strips_sign_and_percent() {
        assert_eq!(coerce(" +15% ", FieldKind::PercentFloat), FieldValue::Float(15.0));
        assert_eq!(coerce("+4", FieldKind::Integer), FieldValue::Integer(4));
        assert_eq!(coerce("4.9", FieldKind::Integer), FieldValue::Integer(4));
        assert_eq!(coerce("n/a", FieldKind::Integer), FieldValue::Integer(0));
        assert_eq!(coerce("nan", FieldKind::PercentFloat), FieldValue::Float(0.0));
        assert_eq!(coerce("  two words ", FieldKind::String), FieldValue::Text("two words".into()));
    }

    #[test]
    fn duplicate_field_names_rejected() {
        let err = FieldTable::new(vec![
            FieldSpec::param("id", "id", FieldKind::Integer).unwrap(),
            FieldSpec::param("id", "npcid", FieldKind::Integer).unwrap(),
        ])
        .unwrap_err();
        assert_eq!(err, ConfigError::DuplicateField("id".into()));
    }

    #[test]
    fn pattern_without_group_rejected() {
        assert!(matches!(
            FieldSpec::new("id", r"id\s*=\s*\d+", FieldKind::Integer),
            Err(ConfigError::InvalidPattern { .. })
        ));
        assert!(matches!(
            FieldSpec::new("id", r"id(", FieldKind::Integer),
            Err(ConfigError::InvalidPattern { .. })
        ));
    }
}
