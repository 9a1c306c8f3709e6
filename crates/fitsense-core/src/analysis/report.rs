//! Normalized report schema
//!
//! The only shape ever returned to a video-analysis client.

use serde::{Deserialize, Serialize};
use indexmap::IndexMap;

/// One recommended or detected exercise
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exercise {
    pub name: String,
    pub sets: String,
    pub reps: String,
}

/// An emotion observed at a point in the video
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmotionMark {
    pub emotion: String,
    pub time_stamp: String,
}

/// One meal slot of the nutrition plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meal {
    pub time: String,
    pub food: String,
}

/// Fixed four-section workout report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedReport {
    pub workout_exercises: Vec<Exercise>,
    pub facial_emotions: Vec<EmotionMark>,
    pub voice_emotions: Vec<EmotionMark>,
    /// Meal slot key (e.g. `breakfast`, `post_workout`) to meal, in plan order
    pub nutrition_plan: IndexMap<String, Meal>,
}

impl NormalizedReport {
    /// Canned report returned when analysis cannot complete
    pub fn fallback() -> Self {
        Self {
            workout_exercises: default_exercises(),
            facial_emotions: default_emotions(),
            voice_emotions: default_emotions(),
            nutrition_plan: default_nutrition_plan(),
        }
    }
}

fn exercise(name: &str, sets: &str, reps: &str) -> Exercise {
    Exercise {
        name: name.to_string(),
        sets: sets.to_string(),
        reps: reps.to_string(),
    }
}

fn mark(emotion: &str, time_stamp: &str) -> EmotionMark {
    EmotionMark {
        emotion: emotion.to_string(),
        time_stamp: time_stamp.to_string(),
    }
}

fn meal(time: &str, food: &str) -> Meal {
    Meal {
        time: time.to_string(),
        food: food.to_string(),
    }
}

/// Exercises used when the model omits the section
pub(crate) fn default_exercises() -> Vec<Exercise> {
    vec![
        exercise("Push ups", "3", "10"),
        exercise("Squats", "3", "15"),
        exercise("Plank", "3", "60 seconds"),
        exercise("Lunges", "3", "12 per leg"),
        exercise("Burpees", "3", "8"),
    ]
}

/// Emotion timeline used for either emotion section when omitted
pub(crate) fn default_emotions() -> Vec<EmotionMark> {
    vec![
        mark("Neutral", "00:00"),
        mark("Effort", "00:01"),
        mark("Strain", "00:02"),
    ]
}

/// Meal plan used when the model omits the section
pub(crate) fn default_nutrition_plan() -> IndexMap<String, Meal> {
    IndexMap::from([
        ("breakfast".to_string(), meal("8:00 AM", "Oatmeal with fruits")),
        ("lunch".to_string(), meal("1:00 PM", "Grilled chicken salad")),
        (
            "dinner".to_string(),
            meal("7:00 PM", "Baked fish with vegetables"),
        ),
    ])
}
