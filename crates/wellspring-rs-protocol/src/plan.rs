use crate::lenient;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which sub-plans a plan request produces.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PlanType {
    Diet,
    Fitness,
    #[default]
    General,
}

impl PlanType {
    pub fn includes_diet(self) -> bool {
        matches!(self, PlanType::Diet | PlanType::General)
    }

    pub fn includes_fitness(self) -> bool {
        matches!(self, PlanType::Fitness | PlanType::General)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PlanType::Diet => "diet",
            PlanType::Fitness => "fitness",
            PlanType::General => "general",
        }
    }
}

impl fmt::Display for PlanType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlanType {
    type Err = std::convert::Infallible;

    /// Unrecognized names resolve to `General`.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let raw = raw.trim().to_ascii_lowercase();
        Ok(match raw.as_str() {
            "diet" | "nutrition" | "meal" | "meal_plan" | "diet_plan" => PlanType::Diet,
            "fitness" | "workout" | "exercise" | "training" | "fitness_plan" => PlanType::Fitness,
            _ => PlanType::General,
        })
    }
}

/// Macronutrient split, usually as percentages or grams.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Macros {
    #[serde(default, deserialize_with = "lenient::opt_text")]
    pub protein: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_text", alias = "carbohydrates")]
    pub carbs: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_text", alias = "fat")]
    pub fats: Option<String>,
}

/// One meal slot in a diet plan.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Meal {
    #[serde(
        default,
        deserialize_with = "lenient::text",
        alias = "meal_time",
        alias = "name",
        alias = "meal"
    )]
    pub meal_type: String,
    #[serde(
        default,
        deserialize_with = "lenient::string_list",
        alias = "items",
        alias = "foods",
        alias = "options"
    )]
    pub food_items: Vec<String>,
    #[serde(
        default,
        deserialize_with = "lenient::opt_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub notes: Option<String>,
}

/// Dietary plan; `meals` is the canonical meal list.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DietPlan {
    #[serde(default, deserialize_with = "lenient::text")]
    pub goal: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub description: String,
    #[serde(default, deserialize_with = "lenient::opt_count")]
    pub duration_days: Option<u32>,
    #[serde(
        default,
        deserialize_with = "lenient::opt_count",
        alias = "calories",
        alias = "daily_calories"
    )]
    pub daily_calorie_target: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub macros: Option<Macros>,
    #[serde(default, alias = "meal_plan", alias = "daily_meals")]
    pub meals: Vec<Meal>,
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub foods_to_emphasize: Vec<String>,
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub foods_to_limit: Vec<String>,
    #[serde(
        default,
        deserialize_with = "lenient::opt_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub hydration: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient::opt_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub notes: Option<String>,
}

impl DietPlan {
    /// A usable diet plan names at least one meal with food in it.
    pub fn is_usable(&self) -> bool {
        self.meals.iter().any(|meal| !meal.food_items.is_empty())
    }
}

/// Single step of a warm-up or cool-down.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RoutineStep {
    #[serde(default, deserialize_with = "lenient::text")]
    pub name: String,
    #[serde(
        default,
        deserialize_with = "lenient::opt_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub duration: Option<String>,
}

/// Warm-up or cool-down block.
///
/// Models sometimes describe these as a sentence; that form is kept in
/// `description`.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct Routine {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    pub exercises: Vec<RoutineStep>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RoutineRepr {
    Text(String),
    Steps(Vec<RoutineStep>),
    Full {
        #[serde(default, deserialize_with = "lenient::opt_text")]
        duration: Option<String>,
        #[serde(default)]
        exercises: Vec<RoutineStep>,
        #[serde(default, deserialize_with = "lenient::opt_text")]
        description: Option<String>,
    },
}

impl<'de> Deserialize<'de> for Routine {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match RoutineRepr::deserialize(deserializer)? {
            RoutineRepr::Text(text) => Routine {
                duration: None,
                exercises: Vec::new(),
                description: Some(text),
            },
            RoutineRepr::Steps(exercises) => Routine {
                duration: None,
                exercises,
                description: None,
            },
            RoutineRepr::Full {
                duration,
                exercises,
                description,
            } => Routine {
                duration,
                exercises,
                description,
            },
        })
    }
}

/// One exercise prescription.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Exercise {
    #[serde(default, deserialize_with = "lenient::text", alias = "exercise")]
    pub name: String,
    #[serde(
        default,
        deserialize_with = "lenient::opt_count",
        skip_serializing_if = "Option::is_none"
    )]
    pub sets: Option<u32>,
    #[serde(
        default,
        deserialize_with = "lenient::opt_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub reps: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient::opt_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub duration: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient::opt_count",
        alias = "rest",
        skip_serializing_if = "Option::is_none"
    )]
    pub rest_seconds: Option<u32>,
    #[serde(
        default,
        deserialize_with = "lenient::opt_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub notes: Option<String>,
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub target_areas: Vec<String>,
}

/// One training day in the schedule.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct WorkoutDay {
    #[serde(default, deserialize_with = "lenient::text")]
    pub day: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub focus: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warm_up: Option<Routine>,
    #[serde(default, alias = "workout")]
    pub exercises: Vec<Exercise>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cool_down: Option<Routine>,
}

/// Training plan; `workout_schedule` is the canonical schedule field.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FitnessPlan {
    #[serde(default, deserialize_with = "lenient::text")]
    pub goal: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub description: String,
    #[serde(default, deserialize_with = "lenient::opt_count")]
    pub duration_weeks: Option<u32>,
    #[serde(default, deserialize_with = "lenient::opt_count", alias = "frequency")]
    pub frequency_per_week: Option<u32>,
    #[serde(default, deserialize_with = "lenient::opt_count")]
    pub session_duration_minutes: Option<u32>,
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub equipment_needed: Vec<String>,
    #[serde(
        default,
        alias = "schedule",
        alias = "weekly_schedule",
        alias = "workouts"
    )]
    pub workout_schedule: Vec<WorkoutDay>,
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub progression_guidelines: Vec<String>,
    #[serde(
        default,
        deserialize_with = "lenient::opt_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub rest_days_recommendation: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient::opt_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub notes: Option<String>,
}

impl FitnessPlan {
    /// A usable fitness plan schedules at least one exercise.
    pub fn is_usable(&self) -> bool {
        self.workout_schedule
            .iter()
            .any(|day| !day.exercises.is_empty())
    }
}

/// Combined output of the plan generator.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Plan {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diet_plan: Option<DietPlan>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fitness_plan: Option<FitnessPlan>,
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub lifestyle_recommendations: Vec<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub personalized_notes: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    /// Historical schedule spellings parse into the canonical field.
    #[test]
    fn accepts_schedule_aliases() {
        let plan: FitnessPlan = serde_json::from_value(json!({
            "goal": "strength",
            "frequency_per_week": "3 times",
            "schedule": [{
                "day": "Day 1",
                "focus": "Full body",
                "warm_up": "5 minutes of marching in place",
                "exercises": [{"name": "Squat", "sets": 3, "reps": 10, "rest_seconds": "60s"}]
            }]
        }))
        .expect("plan");
        assert_eq!(plan.frequency_per_week, Some(3));
        assert!(plan.is_usable());
        let day = &plan.workout_schedule[0];
        assert_eq!(day.exercises[0].reps.as_deref(), Some("10"));
        assert_eq!(day.exercises[0].rest_seconds, Some(60));
        assert_eq!(
            day.warm_up.as_ref().and_then(|w| w.description.as_deref()),
            Some("5 minutes of marching in place")
        );

        let value = serde_json::to_value(&plan).expect("json");
        assert!(value.get("workout_schedule").is_some());
        assert!(value.get("schedule").is_none());
    }

    /// Meal lists tolerate the `items`/`meal_time` spelling.
    #[test]
    fn accepts_meal_aliases() {
        let plan: DietPlan = serde_json::from_value(json!({
            "goal": "energy",
            "daily_calorie_target": "2000 kcal",
            "meals": [{"meal_time": "Breakfast", "items": ["Oatmeal"]}]
        }))
        .expect("plan");
        assert_eq!(plan.daily_calorie_target, Some(2000));
        assert_eq!(plan.meals[0].meal_type, "Breakfast");
        assert!(plan.is_usable());
    }

    /// Unknown plan types fall back to general.
    #[test]
    fn plan_type_parsing() {
        assert_eq!("Workout".parse::<PlanType>(), Ok(PlanType::Fitness));
        assert_eq!("meal_plan".parse::<PlanType>(), Ok(PlanType::Diet));
        assert_eq!("holistic".parse::<PlanType>(), Ok(PlanType::General));
        assert!(PlanType::General.includes_diet() && PlanType::General.includes_fitness());
        assert!(!PlanType::Diet.includes_fitness());
    }
}
