// Define data modules
pub mod models; // Data structures (Meal, Exercise, Record schema, Draft)
pub mod logic;  // Validation, id allocation and matching rules
pub mod store;  // Persistent storage (load/save <kind>.json)
pub mod error;  // Store / tool / chat / config errors
pub mod tools;  // Named functions exposed to the chat model
pub mod chat;   // Chat-completion client and conversation loop
pub mod config; // Command-line and environment settings

pub use models::{Draft, Exercise, Meal, Nutrition, Record, Workload};
pub use store::{RecordStore, Toggled};
pub use tools::{ToolDefinition, Toolbox};

pub type MealStore = RecordStore<Meal>;
pub type ExerciseStore = RecordStore<Exercise>;
