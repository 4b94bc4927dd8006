use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Map, Number, Value};

/// Schema of one kind of tracked record.
///
/// Both stores share the same contract: integer id, name, one boolean
/// status flag, a category, a description and an ordered tag list. The
/// rest of the fields are kind-specific and travel as `Extra`.
///
/// Records are read from whatever object the file holds. A field that is
/// missing reads as absent (not done, empty name, no tags), and a field
/// whose value has an unexpected type is carried along untouched.
pub trait Record: Clone + Serialize + DeserializeOwned {
    /// Kind-specific fields supplied when a record is added.
    type Extra: Default;

    /// Lowercase noun ("meal", "exercise").
    const NOUN: &'static str;
    /// What a set status flag means ("consumed", "completed").
    const DONE_STATUS: &'static str;
    const DEFAULT_CATEGORY: &'static str;
    const DEFAULT_PATH: &'static str;

    /// `None` when the stored id is missing or not an integer. Such a
    /// record is never matched by id.
    fn id(&self) -> Option<i64>;
    fn name(&self) -> &str;
    fn category(&self) -> &str;
    fn tags(&self) -> &[String];
    fn is_done(&self) -> bool;
    fn set_done(&mut self, done: bool);

    /// Assemble a new, not-done record from already validated fields.
    fn build(
        id: i64,
        name: String,
        category: String,
        tags: Vec<String>,
        description: String,
        extra: Self::Extra,
    ) -> Self;

    /// Records used when no valid backing file exists.
    fn seed() -> Vec<Self>;
}

/// Caller-supplied fields of a record that is about to be added.
#[derive(Debug, Clone, Default)]
pub struct Draft<E> {
    pub name: String,
    pub category: Option<String>, // None -> kind default
    pub tags: Vec<String>,
    pub description: Option<String>, // None or "" -> derived
    pub extra: E,
}

impl<E: Default> Draft<E> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            category: None,
            tags: Vec::new(),
            description: None,
            extra: E::default(),
        }
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn extra(mut self, extra: E) -> Self {
        self.extra = extra;
        self
    }
}

// ---------------------------------------------------------------------------
// Meals
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(from = "Map<String, Value>")]
pub struct Meal {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consumed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ingredients: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calories: Option<Number>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protein: Option<Number>, // grams
    #[serde(skip_serializing_if = "Option::is_none")]
    pub carbs: Option<Number>, // grams
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fats: Option<Number>, // grams
    /// Keys this program does not know, and known keys holding an
    /// unexpected type. Written back as they were read.
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

impl From<Map<String, Value>> for Meal {
    fn from(mut fields: Map<String, Value>) -> Self {
        Meal {
            id: take(&mut fields, "id"),
            name: take(&mut fields, "name"),
            consumed: take(&mut fields, "consumed"),
            description: take(&mut fields, "description"),
            category: take(&mut fields, "category"),
            ingredients: take(&mut fields, "ingredients"),
            calories: take(&mut fields, "calories"),
            protein: take(&mut fields, "protein"),
            carbs: take(&mut fields, "carbs"),
            fats: take(&mut fields, "fats"),
            other: fields,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Nutrition {
    pub calories: Option<i64>,
    pub protein: Option<i64>,
    pub carbs: Option<i64>,
    pub fats: Option<i64>,
}

impl Record for Meal {
    type Extra = Nutrition;

    const NOUN: &'static str = "meal";
    const DONE_STATUS: &'static str = "consumed";
    const DEFAULT_CATEGORY: &'static str = "lunch";
    const DEFAULT_PATH: &'static str = "meals.json";

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn name(&self) -> &str {
        self.name.as_deref().unwrap_or_default()
    }

    fn category(&self) -> &str {
        self.category.as_deref().unwrap_or_default()
    }

    fn tags(&self) -> &[String] {
        self.ingredients.as_deref().unwrap_or_default()
    }

    fn is_done(&self) -> bool {
        self.consumed.unwrap_or(false)
    }

    fn set_done(&mut self, done: bool) {
        self.other.remove("consumed");
        self.consumed = Some(done);
    }

    fn build(
        id: i64,
        name: String,
        category: String,
        tags: Vec<String>,
        description: String,
        extra: Nutrition,
    ) -> Self {
        Meal {
            id: Some(id),
            name: Some(name),
            consumed: Some(false),
            description: Some(description),
            category: Some(category),
            ingredients: Some(tags),
            calories: extra.calories.map(Number::from),
            protein: extra.protein.map(Number::from),
            carbs: extra.carbs.map(Number::from),
            fats: extra.fats.map(Number::from),
            other: Map::new(),
        }
    }

    fn seed() -> Vec<Self> {
        let mut oatmeal = Meal::build(
            2,
            "Oatmeal".into(),
            "breakfast".into(),
            strings(&["oats", "milk", "banana", "honey"]),
            "Breakfast with fruits".into(),
            Nutrition {
                calories: Some(300),
                protein: Some(10),
                carbs: Some(50),
                fats: Some(5),
            },
        );
        oatmeal.consumed = Some(true);

        vec![
            Meal::build(
                1,
                "Chicken Salad".into(),
                "lunch".into(),
                strings(&["chicken", "lettuce", "tomato", "cucumber"]),
                "Healthy protein-rich meal".into(),
                Nutrition {
                    calories: Some(350),
                    protein: Some(30),
                    carbs: Some(10),
                    fats: Some(15),
                },
            ),
            oatmeal,
        ]
    }
}

// ---------------------------------------------------------------------------
// Exercises
// ---------------------------------------------------------------------------

pub const DEFAULT_DIFFICULTY: &str = "beginner";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(from = "Map<String, Value>")]
pub struct Exercise {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub muscle_groups: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sets: Option<Number>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reps: Option<Number>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>, // free text, e.g. "30 seconds"
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

impl From<Map<String, Value>> for Exercise {
    fn from(mut fields: Map<String, Value>) -> Self {
        Exercise {
            id: take(&mut fields, "id"),
            name: take(&mut fields, "name"),
            completed: take(&mut fields, "completed"),
            description: take(&mut fields, "description"),
            category: take(&mut fields, "category"),
            muscle_groups: take(&mut fields, "muscle_groups"),
            difficulty: take(&mut fields, "difficulty"),
            sets: take(&mut fields, "sets"),
            reps: take(&mut fields, "reps"),
            duration: take(&mut fields, "duration"),
            other: fields,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Workload {
    pub difficulty: Option<String>, // None -> "beginner"
    pub sets: Option<i64>,
    pub reps: Option<i64>,
    pub duration: Option<String>,
}

impl Record for Exercise {
    type Extra = Workload;

    const NOUN: &'static str = "exercise";
    const DONE_STATUS: &'static str = "completed";
    const DEFAULT_CATEGORY: &'static str = "strength";
    const DEFAULT_PATH: &'static str = "exercises.json";

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn name(&self) -> &str {
        self.name.as_deref().unwrap_or_default()
    }

    fn category(&self) -> &str {
        self.category.as_deref().unwrap_or_default()
    }

    fn tags(&self) -> &[String] {
        self.muscle_groups.as_deref().unwrap_or_default()
    }

    fn is_done(&self) -> bool {
        self.completed.unwrap_or(false)
    }

    fn set_done(&mut self, done: bool) {
        self.other.remove("completed");
        self.completed = Some(done);
    }

    fn build(
        id: i64,
        name: String,
        category: String,
        tags: Vec<String>,
        description: String,
        extra: Workload,
    ) -> Self {
        Exercise {
            id: Some(id),
            name: Some(name),
            completed: Some(false),
            description: Some(description),
            category: Some(category),
            muscle_groups: Some(tags),
            difficulty: Some(
                extra
                    .difficulty
                    .unwrap_or_else(|| DEFAULT_DIFFICULTY.to_string()),
            ),
            sets: extra.sets.map(Number::from),
            reps: extra.reps.map(Number::from),
            duration: extra.duration,
            other: Map::new(),
        }
    }

    fn seed() -> Vec<Self> {
        let sets_of = |sets: i64, reps: i64| Workload {
            sets: Some(sets),
            reps: Some(reps),
            ..Default::default()
        };
        let mut plank = Exercise::build(
            3,
            "Plank".into(),
            "core".into(),
            strings(&["abs", "back"]),
            "Core stability exercise".into(),
            Workload {
                duration: Some("30 seconds".into()),
                ..Default::default()
            },
        );
        plank.completed = Some(true);

        vec![
            Exercise::build(
                1,
                "Push Ups".into(),
                "strength".into(),
                strings(&["chest", "triceps", "shoulders"]),
                "Basic upper body exercise".into(),
                sets_of(3, 10),
            ),
            Exercise::build(
                2,
                "Squats".into(),
                "strength".into(),
                strings(&["quadriceps", "glutes", "hamstrings"]),
                "Lower body strength exercise".into(),
                sets_of(3, 12),
            ),
            plank,
        ]
    }
}

// Moves `key` out of `fields` when its value has the expected type; anything
// else stays behind to be written back verbatim.
fn take<T: DeserializeOwned>(fields: &mut Map<String, Value>, key: &str) -> Option<T> {
    let value = T::deserialize(fields.get(key)?).ok()?;
    fields.remove(key);
    Some(value)
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
