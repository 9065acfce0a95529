//! Rule-based plans used when generation cannot produce a usable one.

use wellspring_rs_protocol::{
    DietPlan, Exercise, FitnessPlan, Meal, Routine, RoutineStep, UserProfile, WorkoutDay,
};

const TRAINING_DAYS: [&str; 3] = ["Monday", "Wednesday", "Friday"];
const REST_DAYS: [&str; 4] = ["Tuesday", "Thursday", "Saturday", "Sunday"];

const REST_NOTES: &str = "Take this day off from structured exercise to allow your muscles to recover and adapt. Stay hydrated and focus on good nutrition.";

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|item| item.to_string()).collect()
}

fn mentions_any(profile: Option<&UserProfile>, field: &str, words: &[&str]) -> bool {
    profile
        .and_then(|profile| profile.text_lower(field))
        .is_some_and(|text| words.iter().any(|word| text.contains(word)))
}

fn has_entries(profile: Option<&UserProfile>, field: &str) -> bool {
    profile
        .and_then(|profile| profile.get(field))
        .is_some_and(|value| value.as_list().iter().any(|item| !item.trim().is_empty()))
}

/// Minimal diet plan shaped by diet preference and activity level.
pub fn diet_plan(goal: &str, profile: Option<&UserProfile>) -> DietPlan {
    let plant_based = mentions_any(profile, "dietary_preferences", &["vegetarian", "vegan"]);
    let low_carb = mentions_any(profile, "dietary_preferences", &["keto", "low carb", "low-carb"]);

    let proteins = if plant_based {
        ["Tofu", "Lentils", "Beans", "Greek yogurt"]
    } else {
        ["Chicken breast", "Fish", "Lean beef", "Eggs"]
    };
    let carbs: Vec<&str> = if low_carb {
        vec!["Berries", "Non-starchy vegetables"]
    } else {
        vec!["Brown rice", "Sweet potatoes", "Quinoa", "Oatmeal"]
    };

    let calories = match profile.and_then(|profile| profile.text_lower("activity_level")) {
        Some(level) if level == "sedentary" || level == "light" => 1800,
        Some(level) if level == "active" || level == "very active" => 2200,
        _ => 2000,
    };

    let breakfast = if low_carb {
        strings(&["Eggs with avocado", "Spinach"])
    } else {
        strings(&["Oatmeal with berries", "Greek yogurt"])
    };

    DietPlan {
        goal: non_empty(goal, "Balanced nutrition for general health"),
        description: "A simplified nutritional approach focusing on whole foods and balanced meals"
            .to_string(),
        duration_days: Some(7),
        daily_calorie_target: Some(calories),
        macros: None,
        meals: vec![
            Meal {
                meal_type: "Breakfast".to_string(),
                food_items: breakfast,
                notes: Some("Focus on protein and fiber for sustained energy".to_string()),
            },
            Meal {
                meal_type: "Lunch".to_string(),
                food_items: vec![
                    format!("Large salad with {}", proteins[0]),
                    "Olive oil dressing".to_string(),
                ],
                notes: Some("Include plenty of colorful vegetables".to_string()),
            },
            Meal {
                meal_type: "Dinner".to_string(),
                food_items: vec![
                    proteins[1].to_string(),
                    carbs[0].to_string(),
                    "Steamed vegetables".to_string(),
                ],
                notes: Some("Balance protein, carbs, and healthy fats".to_string()),
            },
        ],
        foods_to_emphasize: vec![
            "Whole, unprocessed foods".to_string(),
            format!("Lean proteins: {}", proteins.join(", ")),
            format!("Complex carbohydrates: {}", carbs.join(", ")),
            "Healthy fats: Avocado, olive oil, nuts".to_string(),
        ],
        foods_to_limit: strings(&["Processed foods", "Added sugars", "Refined carbohydrates"]),
        hydration: Some("Drink 8-10 glasses of water daily".to_string()),
        notes: Some(
            "This is a simplified plan. For optimal results, consider consulting with a registered dietitian."
                .to_string(),
        ),
    }
}

/// Minimal full-body plan adapted to fitness level, equipment and limitations.
pub fn fitness_plan(goal: &str, profile: Option<&UserProfile>) -> FitnessPlan {
    let beginner = profile
        .and_then(|profile| profile.text_lower("fitness_level"))
        .is_none_or(|level| level == "beginner");
    let has_equipment = has_entries(profile, "available_equipment");
    let has_limitations = has_entries(profile, "physical_limitations");
    let pick = |easy: &str, hard: &str| (if beginner { easy } else { hard }).to_string();
    let sets = if beginner { 2 } else { 3 };

    let mut exercises = vec![
        Exercise {
            name: (if has_limitations { "Modified Push-ups" } else { "Push-ups" }).to_string(),
            sets: Some(sets),
            reps: Some(pick("5-8", "8-12")),
            rest_seconds: Some(60),
            notes: Some("Keep core engaged throughout the movement".to_string()),
            target_areas: strings(&["chest", "shoulders", "triceps"]),
            ..Exercise::default()
        },
        Exercise {
            name: "Bodyweight Squats".to_string(),
            sets: Some(sets),
            reps: Some(pick("10-12", "12-15")),
            rest_seconds: Some(60),
            notes: Some("Keep weight in heels, knees tracking over toes".to_string()),
            target_areas: strings(&["quadriceps", "glutes", "hamstrings"]),
            ..Exercise::default()
        },
        Exercise {
            name: "Plank".to_string(),
            sets: Some(2),
            duration: Some(pick("20 seconds", "30-45 seconds")),
            rest_seconds: Some(45),
            notes: Some("Maintain neutral spine position".to_string()),
            target_areas: strings(&["core", "shoulders"]),
            ..Exercise::default()
        },
    ];
    if has_equipment {
        exercises.push(Exercise {
            name: "Dumbbell Rows".to_string(),
            sets: Some(sets),
            reps: Some(pick("8-10", "10-12")),
            rest_seconds: Some(60),
            notes: Some("Keep back straight, pull elbow back".to_string()),
            target_areas: strings(&["back", "biceps"]),
            ..Exercise::default()
        });
    }

    let mut schedule: Vec<WorkoutDay> = TRAINING_DAYS
        .iter()
        .map(|day| WorkoutDay {
            day: day.to_string(),
            focus: "Full Body Strength".to_string(),
            warm_up: Some(warm_up()),
            exercises: exercises.clone(),
            cool_down: Some(Routine {
                duration: Some("5 minutes".to_string()),
                exercises: Vec::new(),
                description: Some(
                    "5 minutes of static stretching, holding each stretch for 20-30 seconds."
                        .to_string(),
                ),
            }),
        })
        .collect();
    schedule.extend(REST_DAYS.iter().map(|day| WorkoutDay {
        day: day.to_string(),
        focus: "Rest Day".to_string(),
        warm_up: None,
        exercises: vec![Exercise {
            name: "Rest & Recovery".to_string(),
            notes: Some(REST_NOTES.to_string()),
            ..Exercise::default()
        }],
        cool_down: None,
    }));
    schedule.sort_by_key(|day| weekday_index(&day.day));

    FitnessPlan {
        goal: non_empty(goal, "General fitness improvement"),
        description:
            "A simplified full-body workout routine focusing on fundamental movement patterns"
                .to_string(),
        duration_weeks: Some(4),
        frequency_per_week: Some(TRAINING_DAYS.len() as u32),
        session_duration_minutes: Some(30),
        equipment_needed: if has_equipment {
            strings(&["Dumbbells", "Exercise mat"])
        } else {
            strings(&["None required", "Exercise mat (optional)"])
        },
        workout_schedule: schedule,
        progression_guidelines: strings(&[
            "Add 1-2 reps per set each week until reaching the top of the range",
            "Add a set once every set reaches the top of the range with good form",
        ]),
        rest_days_recommendation: Some(
            "Rest at least one day between sessions; light walking or stretching is fine."
                .to_string(),
        ),
        notes: Some(
            "This is a simplified plan. Consult a qualified trainer for a fully personalized program."
                .to_string(),
        ),
    }
}

/// Templated lifestyle advice and notes.
pub fn lifestyle(goal: &str, profile: Option<&UserProfile>) -> (Vec<String>, String) {
    let mut recommendations = strings(&[
        "Aim for 7-9 hours of sleep per night on a consistent schedule",
        "Drink 8-10 glasses of water daily",
        "Take short movement breaks every hour when sitting for long periods",
        "Set aside 10 minutes a day for a stress-reducing activity such as deep breathing or a walk",
    ]);
    if mentions_any(profile, "stress_level", &["high"]) {
        recommendations.push(
            "Schedule regular downtime and consider talking to a professional about ongoing stress"
                .to_string(),
        );
    }

    let mut notes = format!(
        "This plan is built around your goal: {}.",
        non_empty(goal, "better overall health")
    );
    if let Some(bmi) = profile.and_then(UserProfile::bmi) {
        notes.push_str(&format!(" Your current BMI is about {bmi:.1}."));
    }
    notes.push_str(" Start gradually and adjust as you learn what works for you.");
    (recommendations, notes)
}

fn warm_up() -> Routine {
    let steps = [
        "Marching in place",
        "Arm circles (forward and backward)",
        "Leg swings (forward/backward and side-to-side)",
        "Torso twists",
        "Light jogging in place",
    ];
    Routine {
        duration: Some("5 minutes".to_string()),
        exercises: steps
            .iter()
            .map(|name| RoutineStep {
                name: name.to_string(),
                duration: Some("1 minute".to_string()),
            })
            .collect(),
        description: None,
    }
}

fn weekday_index(day: &str) -> usize {
    [
        "Monday",
        "Tuesday",
        "Wednesday",
        "Thursday",
        "Friday",
        "Saturday",
        "Sunday",
    ]
    .iter()
    .position(|name| *name == day)
    .unwrap_or(usize::MAX)
}

fn non_empty(text: &str, default: &str) -> String {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        default.to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn profile(value: serde_json::Value) -> UserProfile {
        serde_json::from_value(value).expect("profile")
    }

    /// Vegetarian, low-carb and sedentary profiles shape the diet fallback.
    #[test]
    fn diet_follows_preferences() {
        let plan = diet_plan(
            "",
            Some(&profile(json!({
                "dietary_preferences": ["vegetarian", "low-carb"],
                "activity_level": "sedentary"
            }))),
        );
        assert_eq!(plan.goal, "Balanced nutrition for general health");
        assert_eq!(plan.daily_calorie_target, Some(1800));
        assert_eq!(plan.meals[0].food_items, vec!["Eggs with avocado", "Spinach"]);
        assert_eq!(plan.meals[1].food_items[0], "Large salad with Tofu");
        assert_eq!(plan.meals[2].food_items, vec!["Lentils", "Berries", "Steamed vegetables"]);
        assert!(plan.is_usable());
    }

    /// Without a profile the diet fallback uses the omnivore defaults.
    #[test]
    fn diet_defaults() {
        let plan = diet_plan("Lose 5 pounds", None);
        assert_eq!(plan.goal, "Lose 5 pounds");
        assert_eq!(plan.daily_calorie_target, Some(2000));
        assert_eq!(plan.meals[2].food_items[0], "Fish");
        assert_eq!(plan.duration_days, Some(7));
    }

    /// Equipment adds rows, limitations modify push-ups, level sets volume.
    #[test]
    fn fitness_adapts_to_profile() {
        let plan = fitness_plan(
            "",
            Some(&profile(json!({
                "fitness_level": "Intermediate",
                "available_equipment": ["dumbbells"],
                "physical_limitations": ["wrist pain"]
            }))),
        );
        assert_eq!(plan.goal, "General fitness improvement");
        assert_eq!(plan.workout_schedule.len(), 7);
        assert_eq!(plan.workout_schedule[0].day, "Monday");
        assert_eq!(plan.workout_schedule[1].focus, "Rest Day");

        let monday = &plan.workout_schedule[0].exercises;
        let names: Vec<&str> = monday.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["Modified Push-ups", "Bodyweight Squats", "Plank", "Dumbbell Rows"]
        );
        assert_eq!(monday[0].sets, Some(3));
        assert_eq!(monday[0].reps.as_deref(), Some("8-12"));
        assert_eq!(monday[2].duration.as_deref(), Some("30-45 seconds"));
        assert_eq!(plan.equipment_needed, vec!["Dumbbells", "Exercise mat"]);
        assert!(plan.is_usable());
    }

    /// Beginners without equipment get the lighter bodyweight routine.
    #[test]
    fn fitness_beginner_defaults() {
        let plan = fitness_plan("Get fit", None);
        let monday = &plan.workout_schedule[0].exercises;
        assert_eq!(monday.len(), 3);
        assert_eq!(monday[0].name, "Push-ups");
        assert_eq!(monday[0].sets, Some(2));
        assert_eq!(monday[1].reps.as_deref(), Some("10-12"));
        assert_eq!(plan.frequency_per_week, Some(3));
        assert_eq!(plan.equipment_needed, vec!["None required", "Exercise mat (optional)"]);
    }

    /// Lifestyle notes mention BMI when height and weight are known.
    #[test]
    fn lifestyle_mentions_bmi() {
        let (recommendations, notes) = lifestyle(
            "sleep better",
            Some(&profile(json!({"weight_lbs": 150, "height_inches": 65}))),
        );
        assert_eq!(recommendations.len(), 4);
        assert!(notes.contains("sleep better"));
        assert!(notes.contains("BMI is about 25.0"));
    }
}
