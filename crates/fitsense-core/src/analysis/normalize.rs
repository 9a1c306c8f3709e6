//! AI response normalization
//!
//! Maps arbitrary model JSON onto [`NormalizedReport`]. The model is asked
//! for a specific layout but routinely drifts: it nests everything under
//! `workout_report`, renames `workout_exercises` to `exercises`, spells the
//! timestamp key two ways and returns the meal plan as either a list or a
//! map. Sections that cannot be recovered are filled from the fallback
//! report so the result always looks complete.
//!
//! Meal keys are derived from the meal name, so two meals called
//! `"Snack"` collapse into one slot and the later entry wins.

use serde_json::{Map, Value};
use indexmap::IndexMap;

use super::report::{
    default_emotions, default_exercises, default_nutrition_plan, EmotionMark, Exercise, Meal,
    NormalizedReport,
};

/// Top level key some responses wrap the whole report in
const GROUP_KEY: &str = "workout_report";

/// Accepted spellings of the exercise section, in priority order
const EXERCISE_KEYS: [&str; 2] = ["exercises", "workout_exercises"];

/// Accepted spellings of an emotion timestamp, in priority order
const TIMESTAMP_KEYS: [&str; 2] = ["timestamp", "time_stamp"];

/// Sections recovered from a response before defaults are applied
#[derive(Debug, Default)]
struct PartialReport {
    workout_exercises: Option<Vec<Exercise>>,
    facial_emotions: Option<Vec<EmotionMark>>,
    voice_emotions: Option<Vec<EmotionMark>>,
    nutrition_plan: Option<IndexMap<String, Meal>>,
}

impl PartialReport {
    fn complete(self) -> NormalizedReport {
        NormalizedReport {
            workout_exercises: self.workout_exercises.unwrap_or_else(default_exercises),
            facial_emotions: self.facial_emotions.unwrap_or_else(default_emotions),
            voice_emotions: self.voice_emotions.unwrap_or_else(default_emotions),
            nutrition_plan: self.nutrition_plan.unwrap_or_else(default_nutrition_plan),
        }
    }
}

/// Reconcile a parsed model response into the fixed report shape
pub fn normalize(raw: &Value) -> NormalizedReport {
    let grouped = raw.get(GROUP_KEY);
    if grouped.is_some() {
        tracing::debug!("Response uses grouped '{}' layout", GROUP_KEY);
    }
    let source = grouped.unwrap_or(raw);

    let partial = PartialReport {
        workout_exercises: EXERCISE_KEYS
            .iter()
            .find_map(|key| entries(source, key))
            .map(|items| items.iter().map(to_exercise).collect()),
        facial_emotions: entries(source, "facial_emotions")
            .map(|items| items.iter().map(to_emotion).collect()),
        voice_emotions: entries(source, "voice_emotions")
            .map(|items| items.iter().map(to_emotion).collect()),
        nutrition_plan: source.get("nutrition_plan").and_then(to_nutrition_plan),
    };

    let missing: Vec<&str> = [
        ("workout_exercises", partial.workout_exercises.is_none()),
        ("facial_emotions", partial.facial_emotions.is_none()),
        ("voice_emotions", partial.voice_emotions.is_none()),
        ("nutrition_plan", partial.nutrition_plan.is_none()),
    ]
    .into_iter()
    .filter_map(|(name, absent)| absent.then_some(name))
    .collect();
    if !missing.is_empty() {
        tracing::warn!(sections = ?missing, "Model omitted sections, using defaults");
    }

    partial.complete()
}

/// Array stored under `key`, if the key holds one
fn entries<'a>(source: &'a Value, key: &str) -> Option<&'a Vec<Value>> {
    source.get(key).and_then(Value::as_array)
}

/// Render a field as text; absent and null become empty
fn text(entry: &Value, key: &str) -> String {
    entry.get(key).map(render).unwrap_or_default()
}

fn render(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn to_exercise(entry: &Value) -> Exercise {
    Exercise {
        name: text(entry, "name"),
        sets: text(entry, "sets"),
        reps: text(entry, "reps"),
    }
}

fn to_emotion(entry: &Value) -> EmotionMark {
    let time_stamp = TIMESTAMP_KEYS
        .iter()
        .filter_map(|key| entry.get(*key))
        .find(|value| !value.is_null())
        .map(render)
        .unwrap_or_default();

    EmotionMark {
        emotion: text(entry, "emotion"),
        time_stamp,
    }
}

fn to_meal(entry: &Value) -> Meal {
    Meal {
        time: text(entry, "time"),
        food: text(entry, "food"),
    }
}

/// Slot key for the meal at `index` (zero based)
fn meal_key(entry: &Value, index: usize) -> String {
    let name = match entry.get("meal") {
        Some(value) if !value.is_null() => render(value),
        _ => format!("meal{}", index + 1),
    };
    name.to_lowercase().replace(' ', "_")
}

fn to_nutrition_plan(value: &Value) -> Option<IndexMap<String, Meal>> {
    match value {
        Value::Array(items) => {
            let mut plan = IndexMap::new();
            for (index, entry) in items.iter().enumerate() {
                let key = meal_key(entry, index);
                if let Some(previous) = plan.insert(key.clone(), to_meal(entry)) {
                    tracing::debug!(
                        key = %key,
                        replaced_food = %previous.food,
                        "Duplicate meal slot, later entry wins"
                    );
                }
            }
            Some(plan)
        }
        Value::Object(slots) => Some(meal_map(slots)),
        _ => None,
    }
}

fn meal_map(slots: &Map<String, Value>) -> IndexMap<String, Meal> {
    slots
        .iter()
        .map(|(key, entry)| (key.clone(), to_meal(entry)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_scalar_fields_rendered_as_text() {
        let report = normalize(&json!({
            "exercises": [{ "name": "Rows", "sets": 4, "reps": 12.5 }]
        }));
        assert_eq!(
            report.workout_exercises,
            vec![Exercise {
                name: "Rows".into(),
                sets: "4".into(),
                reps: "12.5".into(),
            }]
        );
    }

    #[test]
    fn test_missing_fields_become_empty() {
        let report = normalize(&json!({
            "workout_report": { "exercises": [{ "name": "Plank" }, "junk"] }
        }));
        assert_eq!(report.workout_exercises.len(), 2);
        assert_eq!(report.workout_exercises[0].sets, "");
        assert_eq!(report.workout_exercises[1].name, "");
    }

    #[test]
    fn test_timestamp_preferred_over_time_stamp() {
        let mark = to_emotion(&json!({
            "emotion": "Calm", "timestamp": "00:05", "time_stamp": "99:99"
        }));
        assert_eq!(mark.time_stamp, "00:05");

        let mark = to_emotion(&json!({
            "emotion": "Calm",
            "timestamp": null,
            "time_stamp": "00:07"
        }));
        assert_eq!(mark.time_stamp, "00:07");
    }

    #[test]
    fn test_meal_key_derivation() {
        assert_eq!(meal_key(&json!({ "meal": "Post Workout Snack" }), 0), "post_workout_snack");
        assert_eq!(meal_key(&json!({ "time": "9:00" }), 2), "meal3");
        assert_eq!(meal_key(&json!({ "meal": null }), 0), "meal1");
    }

    #[test]
    fn test_non_array_section_falls_back() {
        let report = normalize(&json!({ "facial_emotions": "none detected" }));
        assert_eq!(report.facial_emotions, default_emotions());
    }

    #[test]
    fn test_scalar_input_yields_defaults() {
        assert_eq!(normalize(&json!(42)), NormalizedReport::fallback());
    }
}
