//! Named functions the chat model can call, one set per record kind.
//!
//! Every function takes JSON arguments and answers with a JSON string,
//! mapping or list of mappings. Problems with the record input itself
//! (bad id, name too long, unknown record) are answered with a message,
//! never with an error; `ToolError` only covers calls that name an unknown
//! function or whose arguments do not fit the declared parameters.

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Value, json};
use tracing::debug;

use crate::error::{StoreError, ToolError};
use crate::models::{Draft, Exercise, Meal, Nutrition, Record, Workload};
use crate::store::RecordStore;

/// Name, description and JSON-Schema parameters of one callable function.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDefinition {
    pub name: &'static str,
    pub description: String,
    pub parameters: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    List,
    Suggest,
    Details,
    Toggle,
    Add,
    Remove,
    ByCategory,
    ByTag,
}

/// How a record kind is exposed to the model.
pub trait Surface: Record {
    /// Capitalized noun used in messages ("Meal").
    const TITLE: &'static str;

    const LIST: &'static str;
    const SUGGEST: &'static str;
    const DETAILS: &'static str;
    const TOGGLE: &'static str;
    const ADD: &'static str;
    const REMOVE: &'static str;
    const BY_CATEGORY: &'static str;
    const BY_TAG: &'static str;

    const SUGGEST_DESCRIPTION: &'static str;
    const TOGGLE_DESCRIPTION: &'static str;

    /// Argument carrying the record id ("meal_id").
    const ID_ARG: &'static str;
    /// Argument of the tag filter ("ingredient").
    const TAG_ARG: &'static str;
    /// Returned by the suggestion function when nothing is pending.
    const ALL_DONE: &'static str;

    type AddArgs: DeserializeOwned;

    fn draft(args: Self::AddArgs) -> Draft<Self::Extra>;

    fn add_parameters() -> Value;

    fn definitions() -> Vec<ToolDefinition> {
        let id_arg = Self::ID_ARG;
        let tag_arg = Self::TAG_ARG;
        let id_only = json!({
            "type": "object",
            "properties": {
                id_arg: {
                    "type": "integer",
                    "description": format!("ID of the {}", Self::NOUN)
                }
            },
            "required": [Self::ID_ARG]
        });
        let no_args = json!({ "type": "object", "properties": {} });

        vec![
            ToolDefinition {
                name: Self::LIST,
                description: format!(
                    "Get the current list of {}s and their status",
                    Self::NOUN
                ),
                parameters: no_args,
            },
            ToolDefinition {
                name: Self::SUGGEST,
                description: Self::SUGGEST_DESCRIPTION.to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "preference": {
                            "type": "string",
                            "description": format!("Part of the {} name to look for", Self::NOUN)
                        }
                    }
                }),
            },
            ToolDefinition {
                name: Self::DETAILS,
                description: format!("Get details for a specific {}", Self::NOUN),
                parameters: id_only.clone(),
            },
            ToolDefinition {
                name: Self::TOGGLE,
                description: Self::TOGGLE_DESCRIPTION.to_string(),
                parameters: id_only.clone(),
            },
            ToolDefinition {
                name: Self::ADD,
                description: format!("Add a new {} to the list", Self::NOUN),
                parameters: Self::add_parameters(),
            },
            ToolDefinition {
                name: Self::REMOVE,
                description: format!("Remove a {} from the list", Self::NOUN),
                parameters: id_only,
            },
            ToolDefinition {
                name: Self::BY_CATEGORY,
                description: format!("Get {}s by category", Self::NOUN),
                parameters: json!({
                    "type": "object",
                    "properties": { "category": { "type": "string" } },
                    "required": ["category"]
                }),
            },
            ToolDefinition {
                name: Self::BY_TAG,
                description: format!(
                    "Get {}s by {}",
                    Self::NOUN,
                    Self::TAG_ARG.replace('_', " ")
                ),
                parameters: json!({
                    "type": "object",
                    "properties": { tag_arg: { "type": "string" } },
                    "required": [Self::TAG_ARG]
                }),
            },
        ]
    }
}

fn operation<R: Surface>(name: &str) -> Option<Op> {
    [
        (R::LIST, Op::List),
        (R::SUGGEST, Op::Suggest),
        (R::DETAILS, Op::Details),
        (R::TOGGLE, Op::Toggle),
        (R::ADD, Op::Add),
        (R::REMOVE, Op::Remove),
        (R::BY_CATEGORY, Op::ByCategory),
        (R::BY_TAG, Op::ByTag),
    ]
    .into_iter()
    .find_map(|(n, op)| (n == name).then_some(op))
}

// ---------------------------------------------------------------------------
// Meals
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct AddMealArgs {
    #[serde(default)]
    name: String,
    category: Option<String>,
    ingredients: Option<Vec<String>>,
    calories: Option<i64>,
    protein: Option<i64>,
    carbs: Option<i64>,
    fats: Option<i64>,
    description: Option<String>,
}

impl Surface for Meal {
    const TITLE: &'static str = "Meal";

    const LIST: &'static str = "get_meals";
    const SUGGEST: &'static str = "get_meal_suggestion";
    const DETAILS: &'static str = "get_meal_details";
    const TOGGLE: &'static str = "log_meal";
    const ADD: &'static str = "add_meal";
    const REMOVE: &'static str = "remove_meal";
    const BY_CATEGORY: &'static str = "get_meals_by_category";
    const BY_TAG: &'static str = "get_meals_by_ingredient";

    const SUGGEST_DESCRIPTION: &'static str = "Get a meal suggestion based on preferences";
    const TOGGLE_DESCRIPTION: &'static str = "Mark a meal as consumed or not consumed";

    const ID_ARG: &'static str = "meal_id";
    const TAG_ARG: &'static str = "ingredient";
    const ALL_DONE: &'static str = "All meals consumed! Add new ones.";

    type AddArgs = AddMealArgs;

    fn draft(args: AddMealArgs) -> Draft<Nutrition> {
        Draft {
            name: args.name,
            category: args.category,
            tags: args.ingredients.unwrap_or_default(),
            description: args.description,
            extra: Nutrition {
                calories: args.calories,
                protein: args.protein,
                carbs: args.carbs,
                fats: args.fats,
            },
        }
    }

    fn add_parameters() -> Value {
        json!({
            "type": "object",
            "properties": {
                "name": { "type": "string", "description": "Meal name (max 50 characters)" },
                "category": { "type": "string", "description": "breakfast, lunch, dinner, snack... (default lunch)" },
                "ingredients": { "type": "array", "items": { "type": "string" } },
                "calories": { "type": "integer" },
                "protein": { "type": "integer", "description": "grams" },
                "carbs": { "type": "integer", "description": "grams" },
                "fats": { "type": "integer", "description": "grams" },
                "description": { "type": "string", "description": "max 200 characters" }
            },
            "required": ["name"]
        })
    }
}

// ---------------------------------------------------------------------------
// Exercises
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct AddExerciseArgs {
    #[serde(default)]
    name: String,
    category: Option<String>,
    muscle_groups: Option<Vec<String>>,
    difficulty: Option<String>,
    description: Option<String>,
    sets: Option<i64>,
    reps: Option<i64>,
    duration: Option<String>,
}

impl Surface for Exercise {
    const TITLE: &'static str = "Exercise";

    const LIST: &'static str = "get_exercises";
    const SUGGEST: &'static str = "get_next_exercise";
    const DETAILS: &'static str = "get_exercise_details";
    const TOGGLE: &'static str = "toggle_exercise";
    const ADD: &'static str = "add_exercise";
    const REMOVE: &'static str = "remove_exercise";
    const BY_CATEGORY: &'static str = "get_exercises_by_category";
    const BY_TAG: &'static str = "get_exercises_by_muscle_group";

    const SUGGEST_DESCRIPTION: &'static str = "Get the next recommended exercise";
    const TOGGLE_DESCRIPTION: &'static str = "Mark an exercise as completed or not completed";

    const ID_ARG: &'static str = "exercise_id";
    const TAG_ARG: &'static str = "muscle_group";
    const ALL_DONE: &'static str = "All exercises completed! Add new ones.";

    type AddArgs = AddExerciseArgs;

    fn draft(args: AddExerciseArgs) -> Draft<Workload> {
        Draft {
            name: args.name,
            category: args.category,
            tags: args.muscle_groups.unwrap_or_default(),
            description: args.description,
            extra: Workload {
                difficulty: args.difficulty,
                sets: args.sets,
                reps: args.reps,
                duration: args.duration,
            },
        }
    }

    fn add_parameters() -> Value {
        json!({
            "type": "object",
            "properties": {
                "name": { "type": "string", "description": "Exercise name (max 50 characters)" },
                "category": { "type": "string", "description": "strength, cardio, core... (default strength)" },
                "muscle_groups": { "type": "array", "items": { "type": "string" } },
                "difficulty": { "type": "string", "description": "beginner, intermediate or advanced" },
                "description": { "type": "string", "description": "max 200 characters" },
                "sets": { "type": "integer" },
                "reps": { "type": "integer" },
                "duration": { "type": "string", "description": "e.g. \"30 seconds\"" }
            },
            "required": ["name"]
        })
    }
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

/// Both stores behind one by-name call interface.
#[derive(Debug)]
pub struct Toolbox {
    meals: RecordStore<Meal>,
    exercises: RecordStore<Exercise>,
}

impl Toolbox {
    pub fn new(meals: RecordStore<Meal>, exercises: RecordStore<Exercise>) -> Self {
        Self { meals, exercises }
    }

    pub fn meals(&self) -> &RecordStore<Meal> {
        &self.meals
    }

    pub fn exercises(&self) -> &RecordStore<Exercise> {
        &self.exercises
    }

    pub fn definitions() -> Vec<ToolDefinition> {
        let mut defs = Exercise::definitions();
        defs.extend(Meal::definitions());
        defs
    }

    pub fn call(&mut self, name: &str, args: Value) -> Result<Value, ToolError> {
        debug!("tool call: {} {}", name, args);
        if let Some(op) = operation::<Meal>(name) {
            return run(&mut self.meals, op, name, args);
        }
        if let Some(op) = operation::<Exercise>(name) {
            return run(&mut self.exercises, op, name, args);
        }
        Err(ToolError::UnknownTool(name.to_string()))
    }
}

fn run<R: Surface>(
    store: &mut RecordStore<R>,
    op: Op,
    tool: &str,
    args: Value,
) -> Result<Value, ToolError> {
    let value = match op {
        Op::List => json!(store.list()),
        Op::Suggest => {
            let preference = optional_str(&args, "preference");
            match store.suggest(preference) {
                Some(record) => json!(record),
                None => json!({ "message": R::ALL_DONE }),
            }
        }
        Op::Details => match store.details(&id_arg::<R>(&args, tool)?) {
            Ok(Some(record)) => json!(record),
            Ok(None) => json!({ "error": format!("{} not found", R::TITLE) }),
            Err(_) => json!({ "error": format!("Invalid {} ID", R::NOUN) }),
        },
        Op::Toggle => Value::String(toggle_message(store, &id_arg::<R>(&args, tool)?)),
        Op::Add => {
            let args: R::AddArgs =
                serde_json::from_value(args).map_err(|e| ToolError::InvalidArguments {
                    tool: tool.to_string(),
                    message: e.to_string(),
                })?;
            Value::String(add_message(store, R::draft(args)))
        }
        Op::Remove => Value::String(remove_message(store, &id_arg::<R>(&args, tool)?)),
        Op::ByCategory => {
            let category = required_str(&args, "category", tool)?;
            json!(store.filter_by_category(category))
        }
        Op::ByTag => {
            let tag = required_str(&args, R::TAG_ARG, tool)?;
            json!(store.filter_by_tag(tag))
        }
    };
    Ok(value)
}

fn toggle_message<R: Surface>(store: &mut RecordStore<R>, raw_id: &str) -> String {
    match store.toggle(raw_id) {
        Ok(Some(t)) => {
            let status = if t.done {
                R::DONE_STATUS.to_uppercase()
            } else {
                format!("NOT {}", R::DONE_STATUS.to_uppercase())
            };
            format!("{} '{}' is now {}", R::TITLE, t.name, status)
        }
        Ok(None) => format!("{} with ID {} not found", R::TITLE, raw_id.trim()),
        Err(StoreError::InvalidId(_)) => format!(
            "Invalid {} ID format. Please provide a valid number.",
            R::NOUN
        ),
        Err(e) => storage_failure::<R>(&e),
    }
}

fn add_message<R: Surface>(store: &mut RecordStore<R>, draft: Draft<R::Extra>) -> String {
    match store.add(draft) {
        Ok(record) => format!(
            "{} '{}' added successfully with ID {}",
            R::TITLE,
            record.name(),
            record.id().unwrap_or_default()
        ),
        Err(StoreError::EmptyName) => format!("{} name cannot be empty", R::TITLE),
        Err(StoreError::NameTooLong { max }) => {
            format!("{} name is too long (max {} characters)", R::TITLE, max)
        }
        Err(StoreError::DescriptionTooLong { max }) => {
            format!("Description is too long (max {} characters)", max)
        }
        Err(e @ StoreError::Persist { .. }) => storage_failure::<R>(&e),
        Err(e) => format!("Error adding {}: {}", R::NOUN, e),
    }
}

fn remove_message<R: Surface>(store: &mut RecordStore<R>, raw_id: &str) -> String {
    match store.remove(raw_id) {
        Ok(Some(removed)) => format!("{} '{}' removed successfully", R::TITLE, removed.name()),
        Ok(None) => format!("{} not found", R::TITLE),
        Err(StoreError::InvalidId(_)) => format!("Invalid {} ID", R::NOUN),
        Err(e) => storage_failure::<R>(&e),
    }
}

// The change is kept in memory; only the file is stale.
fn storage_failure<R: Surface>(e: &StoreError) -> String {
    format!(
        "{} list was updated but the change could not be saved: {}",
        R::TITLE,
        e
    )
}

// Ids arrive as numbers or strings depending on the model. A whole-valued
// float such as 1.0 counts as that integer.
fn id_arg<R: Surface>(args: &Value, tool: &str) -> Result<String, ToolError> {
    match args.get(R::ID_ARG) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(match (n.as_i64(), n.as_f64()) {
            (Some(id), _) => id.to_string(),
            (None, Some(f)) if f.fract() == 0.0 => format!("{f:.0}"),
            _ => n.to_string(),
        }),
        Some(Value::Null) | None => Err(ToolError::InvalidArguments {
            tool: tool.to_string(),
            message: format!("missing {}", R::ID_ARG),
        }),
        Some(other) => Ok(other.to_string()),
    }
}

fn optional_str<'a>(args: &'a Value, key: &str) -> Option<&'a str> {
    args.get(key).and_then(Value::as_str)
}

fn required_str<'a>(args: &'a Value, key: &str, tool: &str) -> Result<&'a str, ToolError> {
    optional_str(args, key).ok_or_else(|| ToolError::InvalidArguments {
        tool: tool.to_string(),
        message: format!("missing {}", key),
    })
}
