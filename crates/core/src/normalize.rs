use crate::models::{CanonicalDocument, RawRecord, DEFAULT_SOURCE, SNIPPET_MAX_CHARS};
use crate::IngestError;
use chrono::Utc;
use serde_json::Value;
use std::sync::atomic::{AtomicI64, Ordering};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CanonicalField {
    Name,
    Description,
    Muscles,
    Equipment,
    Difficulty,
    Tags,
    Id,
}

impl CanonicalField {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Description => "description",
            Self::Muscles => "muscles",
            Self::Equipment => "equipment",
            Self::Difficulty => "difficulty",
            Self::Tags => "tags",
            Self::Id => "id",
        }
    }
}

#[derive(Debug, Clone)]
pub struct AliasTable {
    entries: Vec<(CanonicalField, Vec<String>)>,
}

impl AliasTable {
    pub fn new<I, A, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (CanonicalField, A)>,
        A: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|(field, aliases)| {
                    let aliases = aliases
                        .into_iter()
                        .map(|alias| alias.as_ref().to_lowercase())
                        .collect();
                    (field, aliases)
                })
                .collect(),
        }
    }

    pub fn entries(&self) -> &[(CanonicalField, Vec<String>)] {
        &self.entries
    }

    pub fn aliases(&self, field: CanonicalField) -> &[String] {
        self.entries
            .iter()
            .find(|(candidate, _)| *candidate == field)
            .map(|(_, aliases)| aliases.as_slice())
            .unwrap_or_default()
    }
}

impl Default for AliasTable {
    fn default() -> Self {
        Self::new([
            (CanonicalField::Name, vec!["name", "exercise_name", "title"]),
            (
                CanonicalField::Description,
                vec!["description", "desc", "instruction", "instructions", "how_to"],
            ),
            (
                CanonicalField::Muscles,
                vec!["muscle", "muscles", "primary_muscle", "target_muscles"],
            ),
            (CanonicalField::Equipment, vec!["equipment", "equip", "tools"]),
            (CanonicalField::Difficulty, vec!["difficulty", "level", "skill_level"]),
            (CanonicalField::Tags, vec!["tags", "categories", "category"]),
            (CanonicalField::Id, vec!["id", "exercise_id", "uid"]),
        ])
    }
}

pub trait Clock: Send + Sync {
    fn now_millis(&self) -> i64;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

pub struct Normalizer<C: Clock = SystemClock> {
    table: AliasTable,
    clock: C,
    last_generated_id: AtomicI64,
}

impl Default for Normalizer<SystemClock> {
    fn default() -> Self {
        Self::new(AliasTable::default(), SystemClock)
    }
}

impl<C: Clock> Normalizer<C> {
    pub fn new(table: AliasTable, clock: C) -> Self {
        Self {
            table,
            clock,
            last_generated_id: AtomicI64::new(i64::MIN),
        }
    }

    pub fn table(&self) -> &AliasTable {
        &self.table
    }

    pub fn normalize(&self, raw: &RawRecord) -> Result<CanonicalDocument, IngestError> {
        // First spelling wins when two keys differ only in case.
        let mut lowered: Vec<(String, &Value)> = Vec::with_capacity(raw.len());
        for (key, value) in raw {
            let key = key.to_lowercase();
            if !lowered.iter().any(|(existing, _)| *existing == key) {
                lowered.push((key, value));
            }
        }
        let lookup = |alias: &str| {
            lowered
                .iter()
                .find(|(key, _)| key == alias)
                .map(|(_, value)| *value)
        };

        let mut name = None;
        let mut description = None;
        let mut difficulty = None;
        let mut id = None;
        let mut muscles = Vec::new();
        let mut equipment = Vec::new();
        let mut tags = Vec::new();

        for (field, aliases) in self.table.entries() {
            let Some(value) = aliases
                .iter()
                .filter_map(|alias| lookup(alias.as_str()))
                .find(|value| !is_empty(value))
            else {
                continue;
            };

            match field {
                CanonicalField::Name => name = Some(scalar_text(*field, value)?),
                CanonicalField::Description => description = Some(scalar_text(*field, value)?),
                CanonicalField::Difficulty => difficulty = Some(scalar_text(*field, value)?),
                CanonicalField::Id => id = Some(scalar_text(*field, value)?),
                CanonicalField::Muscles => muscles = list_values(*field, value)?,
                CanonicalField::Equipment => equipment = list_values(*field, value)?,
                CanonicalField::Tags => tags = list_values(*field, value)?,
            }
        }

        let name = match name {
            Some(name) => name,
            None => match lookup(CanonicalField::Name.as_str()) {
                Some(Value::Null) => String::new(),
                Some(value) => scalar_text(CanonicalField::Name, value)?,
                None => lowered
                    .iter()
                    .find_map(|(_, value)| match value {
                        Value::String(text) if !text.is_empty() => Some(text.clone()),
                        Value::Number(number) if number.as_f64() != Some(0.0) => {
                            Some(number.to_string())
                        }
                        _ => None,
                    })
                    .unwrap_or_default(),
            },
        };

        let id = match id {
            Some(id) => id,
            None => self.generate_id(),
        };

        let snippet = description
            .as_deref()
            .map(|text| text.chars().take(SNIPPET_MAX_CHARS).collect())
            .unwrap_or_default();

        Ok(CanonicalDocument {
            id,
            name,
            description,
            snippet,
            muscles,
            equipment,
            difficulty,
            tags,
            source: DEFAULT_SOURCE.to_string(),
        })
    }

    // Same-millisecond records share an id and overwrite each other downstream.
    fn generate_id(&self) -> String {
        let now = self.clock.now_millis();
        let previous = self.last_generated_id.swap(now, Ordering::Relaxed);
        if previous == now {
            warn!(id = now, "generated document id repeats the previous one");
        }
        now.to_string()
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(text) => text.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

fn scalar_text(field: CanonicalField, value: &Value) -> Result<String, IngestError> {
    match value {
        Value::String(text) => Ok(text.clone()),
        Value::Number(number) => Ok(number.to_string()),
        other => Err(invalid(field, format!("expected text, found {}", kind(other)))),
    }
}

fn list_values(field: CanonicalField, value: &Value) -> Result<Vec<String>, IngestError> {
    match value {
        Value::String(text) => Ok(split_list(text)),
        Value::Array(items) => {
            let mut values = Vec::with_capacity(items.len());
            for item in items {
                let text = match item {
                    Value::String(text) => text.clone(),
                    Value::Number(number) => number.to_string(),
                    other => {
                        return Err(invalid(
                            field,
                            format!("list entries must be text, found {}", kind(other)),
                        ))
                    }
                };
                if !text.trim().is_empty() {
                    values.push(text);
                }
            }
            Ok(values)
        }
        other => Err(invalid(
            field,
            format!("expected text or list, found {}", kind(other)),
        )),
    }
}

pub fn split_list(text: &str) -> Vec<String> {
    text.split(',')
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .map(str::to_string)
        .collect()
}

fn invalid(field: CanonicalField, reason: String) -> IngestError {
    IngestError::InvalidRecord {
        field: field.as_str().to_string(),
        reason,
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct FixedClock(i64);

    impl Clock for FixedClock {
        fn now_millis(&self) -> i64 {
            self.0
        }
    }

    fn record(value: Value) -> RawRecord {
        match value {
            Value::Object(map) => map,
            other => panic!("test record must be an object, got {other}"),
        }
    }

    fn normalizer() -> Normalizer<FixedClock> {
        Normalizer::new(AliasTable::default(), FixedClock(1_700_000_000_123))
    }

    #[test]
    fn first_alias_wins() {
        let raw = record(json!({"exercise_name": "Back Squat", "name": "Squat"}));
        let document = normalizer().normalize(&raw).expect("normalize");
        assert_eq!(document.name, "Squat");
    }

    #[test]
    fn empty_alias_values_fall_through_to_the_next_alias() {
        let raw = record(json!({"name": "", "Exercise_Name": "Deadlift", "title": "ignored"}));
        let document = normalizer().normalize(&raw).expect("normalize");
        assert_eq!(document.name, "Deadlift");
    }

    #[test]
    fn alias_lookup_ignores_key_case() {
        let raw = record(json!({"Name": "Row", "LEVEL": "medium", "Skill_Level": "hard"}));
        let document = normalizer().normalize(&raw).expect("normalize");
        assert_eq!(document.name, "Row");
        assert_eq!(document.difficulty.as_deref(), Some("medium"));
    }

    #[test]
    fn comma_separated_lists_are_split_and_trimmed() {
        let raw = record(json!({"name": "Pull-up", "muscles": "chest, back ,, arms"}));
        let document = normalizer().normalize(&raw).expect("normalize");
        assert_eq!(document.muscles, vec!["chest", "back", "arms"]);
    }

    #[test]
    fn list_values_keep_order_and_drop_blank_entries() {
        let raw = record(json!({
            "name": "Dip",
            "equip": ["bars", " ", "belt"],
            "categories": "upper body"
        }));
        let document = normalizer().normalize(&raw).expect("normalize");
        assert_eq!(document.equipment, vec!["bars", "belt"]);
        assert_eq!(document.tags, vec!["upper body"]);
    }

    #[test]
    fn snippet_is_first_two_hundred_characters() {
        let description = "x".repeat(150) + &"é".repeat(100);
        let raw = record(json!({"name": "Plank", "instructions": description}));
        let document = normalizer().normalize(&raw).expect("normalize");

        assert_eq!(document.snippet.chars().count(), 200);
        assert!(description.starts_with(&document.snippet));
        assert_eq!(document.description.as_deref(), Some(description.as_str()));
    }

    #[test]
    fn snippet_is_empty_without_description() {
        let raw = record(json!({"name": "Plank"}));
        let document = normalizer().normalize(&raw).expect("normalize");
        assert_eq!(document.snippet, "");
        assert!(document.description.is_none());
    }

    #[test]
    fn name_falls_back_to_first_non_empty_field() {
        let raw = record(json!({"notes": "", "movement": "Farmer Carry", "other": "x"}));
        let document = normalizer().normalize(&raw).expect("normalize");
        assert_eq!(document.name, "Farmer Carry");
    }

    #[test]
    fn name_fallback_skips_zero_numbers() {
        let raw = record(json!({"reps": 0, "weight": 0.0, "movement": "Row"}));
        let document = normalizer().normalize(&raw).expect("normalize");
        assert_eq!(document.name, "Row");

        let raw = record(json!({"reps": 12, "movement": "Row"}));
        let document = normalizer().normalize(&raw).expect("normalize");
        assert_eq!(document.name, "12");
    }

    #[test]
    fn empty_id_falls_back_to_a_generated_id() {
        let raw = record(json!({"id": "", "exercise_id": null, "name": "Lunge"}));
        let document = normalizer().normalize(&raw).expect("normalize");
        assert_eq!(document.id, "1700000000123");
        assert!(!document.id.is_empty());
    }

    #[test]
    fn empty_name_key_blocks_the_field_scan() {
        let raw = record(json!({"NAME": "", "movement": "Farmer Carry"}));
        let document = normalizer().normalize(&raw).expect("normalize");
        assert_eq!(document.name, "");
    }

    #[test]
    fn source_and_generated_id_defaults() {
        let raw = record(json!({"name": "Lunge"}));
        let document = normalizer().normalize(&raw).expect("normalize");
        assert_eq!(document.source, "import");
        assert_eq!(document.id, "1700000000123");
    }

    #[test]
    fn numeric_ids_are_kept_as_text() {
        let raw = record(json!({"exercise_id": 42, "name": "Curl"}));
        let document = normalizer().normalize(&raw).expect("normalize");
        assert_eq!(document.id, "42");
    }

    #[test]
    fn repeated_generated_ids_are_not_deduplicated() {
        let normalizer = normalizer();
        let first = normalizer
            .normalize(&record(json!({"name": "A"})))
            .expect("normalize");
        let second = normalizer
            .normalize(&record(json!({"name": "B"})))
            .expect("normalize");
        assert_eq!(first.id, second.id);
    }

    #[test]
    fn non_text_scalar_is_an_invalid_record() {
        let raw = record(json!({"name": {"en": "Squat"}}));
        match normalizer().normalize(&raw) {
            Err(IngestError::InvalidRecord { field, .. }) => assert_eq!(field, "name"),
            other => panic!("expected invalid record, got {other:?}"),
        }
    }

    #[test]
    fn boolean_list_field_is_an_invalid_record() {
        let raw = record(json!({"name": "Squat", "tags": true}));
        assert!(matches!(
            normalizer().normalize(&raw),
            Err(IngestError::InvalidRecord { .. })
        ));
    }

    #[test]
    fn custom_tables_control_priority() {
        let table = AliasTable::new([(CanonicalField::Name, ["title", "name"])]);
        let normalizer = Normalizer::new(table, FixedClock(7));
        let raw = record(json!({"name": "Squat", "Title": "Back Squat"}));
        let document = normalizer.normalize(&raw).expect("normalize");
        assert_eq!(document.name, "Back Squat");
        assert_eq!(normalizer.table().aliases(CanonicalField::Id), &[] as &[String]);
    }

    #[test]
    fn serialized_document_omits_absent_optionals() {
        let raw = record(json!({"id": "ex-1", "name": "Squat", "muscles": "legs"}));
        let document = normalizer().normalize(&raw).expect("normalize");
        let encoded = serde_json::to_value(&document).expect("serialize");
        assert_eq!(
            encoded,
            json!({
                "id": "ex-1",
                "name": "Squat",
                "snippet": "",
                "muscles": ["legs"],
                "source": "import"
            })
        );
    }
}
