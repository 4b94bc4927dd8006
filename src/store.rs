use std::{
    ffi::OsString,
    fs, io,
    path::{Path, PathBuf},
};

use tracing::{debug, error, info, warn};

use crate::error::StoreError;
use crate::logic;
use crate::models::{Draft, Record};

/// Ordered collection of records backed by one JSON file.
///
/// The whole collection is rewritten after every mutation. There is no
/// locking: a store expects a single caller issuing operations in order.
#[derive(Debug)]
pub struct RecordStore<R: Record> {
    path: PathBuf,
    records: Vec<R>,
}

/// Result of a successful status flip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toggled {
    pub id: i64,
    pub name: String,
    pub done: bool,
}

impl<R: Record> RecordStore<R> {
    /// Load the collection at `path`, falling back to the seed set when the
    /// file is missing, unreadable, or not a JSON array of objects. Never
    /// fails.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let records = match load_records::<R>(&path) {
            Ok(records) => records,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!("{} not found, starting from seed {}s", path.display(), R::NOUN);
                R::seed()
            }
            Err(e) => {
                error!("Error loading {}s from {}: {}", R::NOUN, path.display(), e);
                R::seed()
            }
        };
        info!("{} store initialized with {} records", R::NOUN, records.len());
        Self { path, records }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn list(&self) -> &[R] {
        debug!("Retrieving {} list", R::NOUN);
        &self.records
    }

    // First record not yet done whose name contains the preference.
    // Falls back to the first record not yet done; None when all are done.
    pub fn suggest(&self, preference: Option<&str>) -> Option<&R> {
        let mut pending = self.records.iter().filter(|r| !r.is_done());
        if let Some(pref) = preference.filter(|p| !p.is_empty()) {
            if let Some(hit) = pending
                .clone()
                .find(|r| logic::contains_ignore_case(r.name(), pref))
            {
                return Some(hit);
            }
        }
        pending.next()
    }

    pub fn details(&self, raw_id: &str) -> Result<Option<&R>, StoreError> {
        let id = logic::parse_id(raw_id)?;
        Ok(self.records.iter().find(|r| r.id() == Some(id)))
    }

    /// Flip the status flag of `raw_id` and persist.
    ///
    /// `Ok(None)` when no record has that id. On `StoreError::Persist` the
    /// flag stays flipped in memory.
    pub fn toggle(&mut self, raw_id: &str) -> Result<Option<Toggled>, StoreError> {
        let id = logic::parse_id(raw_id).inspect_err(|_| {
            error!("Invalid {} ID format: {}", R::NOUN, raw_id);
        })?;

        let Some(record) = self.records.iter_mut().find(|r| r.id() == Some(id)) else {
            warn!("{} with ID {} not found", R::NOUN, id);
            return Ok(None);
        };

        let done = !record.is_done();
        record.set_done(done);
        let toggled = Toggled {
            id,
            name: record.name().to_string(),
            done,
        };

        self.save()?;
        info!(
            "{} '{}' status changed to {}",
            R::NOUN,
            toggled.name,
            if done { R::DONE_STATUS } else { "pending" }
        );
        Ok(Some(toggled))
    }

    /// Validate and append a new record, then persist.
    ///
    /// Validation failures leave the collection and the file untouched.
    pub fn add(&mut self, draft: Draft<R::Extra>) -> Result<&R, StoreError> {
        logic::validate_name(&draft.name)?;
        logic::validate_description(draft.description.as_deref())?;

        let id = logic::next_id(self.records.iter().filter_map(|r| r.id()))?;
        let category = draft
            .category
            .unwrap_or_else(|| R::DEFAULT_CATEGORY.to_string());
        let description = match draft.description {
            Some(d) if !d.is_empty() => d,
            _ => logic::derive_description(&category, &draft.tags, R::NOUN),
        };

        let name = draft.name;
        self.records.push(R::build(
            id,
            name.clone(),
            category,
            draft.tags,
            description,
            draft.extra,
        ));
        self.save()?;
        info!("New {} added: {} (id {})", R::NOUN, name, id);

        Ok(&self.records[self.records.len() - 1])
    }

    /// Delete the record with `raw_id`, keeping the order of the rest.
    pub fn remove(&mut self, raw_id: &str) -> Result<Option<R>, StoreError> {
        let id = logic::parse_id(raw_id)?;
        let Some(index) = self.records.iter().position(|r| r.id() == Some(id)) else {
            return Ok(None);
        };

        let removed = self.records.remove(index);
        self.save()?;
        info!("{} '{}' removed", R::NOUN, removed.name());
        Ok(Some(removed))
    }

    pub fn filter_by_category(&self, category: &str) -> Vec<&R> {
        self.records
            .iter()
            .filter(|r| logic::eq_ignore_case(r.category(), category))
            .collect()
    }

    pub fn filter_by_tag(&self, tag: &str) -> Vec<&R> {
        self.records
            .iter()
            .filter(|r| r.tags().iter().any(|t| logic::eq_ignore_case(t, tag)))
            .collect()
    }

    /// Rewrite the backing file with the current collection.
    pub fn save(&self) -> Result<(), StoreError> {
        save_records(&self.path, &self.records).inspect_err(|e| {
            error!("Error saving {}s: {}", R::NOUN, e);
        })
    }
}

pub fn load_records<R: Record>(path: &Path) -> io::Result<Vec<R>> {
    let text = fs::read_to_string(path)?;
    let records: Vec<R> =
        serde_json::from_str(&text).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    Ok(records)
}

// Pretty JSON (2-space indent) written next to the target, then renamed over it.
pub fn save_records<R: Record>(path: &Path, records: &[R]) -> Result<(), StoreError> {
    let text = serde_json::to_string_pretty(records)?;
    let persist = |source: io::Error| StoreError::Persist {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(persist)?;
    }

    let mut tmp_path = OsString::from(path.as_os_str());
    tmp_path.push(".tmp");
    let tmp_path = PathBuf::from(tmp_path);

    fs::write(&tmp_path, text).map_err(persist)?;
    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        persist(e)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Exercise, Meal, Nutrition};
    use tempfile::TempDir;

    fn meal_store(dir: &TempDir) -> RecordStore<Meal> {
        RecordStore::open(dir.path().join("meals.json"))
    }

    #[test]
    fn missing_file_yields_seed() {
        let dir = TempDir::new().unwrap();
        let store = meal_store(&dir);
        assert_eq!(store.list(), Meal::seed().as_slice());
        // opening alone does not create the file
        assert!(!store.path().exists());
    }

    #[test]
    fn malformed_file_yields_seed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("exercises.json");
        fs::write(&path, "{ not json").unwrap();
        let store: RecordStore<Exercise> = RecordStore::open(&path);
        assert_eq!(store.list(), Exercise::seed().as_slice());
    }

    #[test]
    fn suggest_prefers_matching_pending_record() {
        let dir = TempDir::new().unwrap();
        let mut store = meal_store(&dir);
        store
            .add(Draft::new("Greek Salad").category("dinner"))
            .unwrap();

        assert_eq!(store.suggest(Some("greek")).unwrap().name(), "Greek Salad");
        // Oatmeal is consumed, so the preference falls back
        assert_eq!(store.suggest(Some("oat")).unwrap().name(), "Chicken Salad");
        assert_eq!(store.suggest(Some("")).unwrap().name(), "Chicken Salad");
        assert_eq!(store.suggest(None).unwrap().name(), "Chicken Salad");
    }

    #[test]
    fn suggest_none_when_everything_done() {
        let dir = TempDir::new().unwrap();
        let mut store = meal_store(&dir);
        store.toggle("1").unwrap();
        assert!(store.suggest(None).is_none());
        assert!(store.suggest(Some("salad")).is_none());
    }

    #[test]
    fn details_distinguishes_bad_and_absent_ids() {
        let dir = TempDir::new().unwrap();
        let store = meal_store(&dir);
        assert_eq!(store.details("2").unwrap().unwrap().name(), "Oatmeal");
        assert!(store.details("999").unwrap().is_none());
        assert!(matches!(store.details("two"), Err(StoreError::InvalidId(_))));
    }

    #[test]
    fn toggle_flips_and_persists() {
        let dir = TempDir::new().unwrap();
        let mut store = meal_store(&dir);

        let toggled = store.toggle("1").unwrap().unwrap();
        assert_eq!(
            toggled,
            Toggled {
                id: 1,
                name: "Chicken Salad".into(),
                done: true
            }
        );

        let reloaded: Vec<Meal> = load_records(store.path()).unwrap();
        assert!(reloaded[0].is_done());
    }

    #[test]
    fn toggle_unknown_id_does_not_write() {
        let dir = TempDir::new().unwrap();
        let mut store = meal_store(&dir);
        assert!(store.toggle("42").unwrap().is_none());
        assert!(store.toggle("x").is_err());
        assert!(!store.path().exists());
    }

    #[test]
    fn add_assigns_next_id_and_derives_description() {
        let dir = TempDir::new().unwrap();
        let mut store = meal_store(&dir);

        let meal = store
            .add(Draft::new("Toast").category("breakfast"))
            .unwrap()
            .clone();
        assert_eq!(meal.id(), Some(3));
        assert_eq!(meal.description.as_deref(), Some("breakfast meal"));
        assert!(!meal.is_done());

        let meal = store
            .add(
                Draft::new("Stir Fry")
                    .tags(["tofu", "broccoli"])
                    .extra(Nutrition {
                        calories: Some(420),
                        ..Default::default()
                    }),
            )
            .unwrap()
            .clone();
        assert_eq!(meal.id(), Some(4));
        assert_eq!(meal.category(), "lunch");
        assert_eq!(meal.description.as_deref(), Some("lunch with tofu, broccoli"));
        assert_eq!(meal.calories, Some(420.into()));
    }

    #[test]
    fn add_on_empty_collection_starts_at_one() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("meals.json");
        fs::write(&path, "[]").unwrap();
        let mut store: RecordStore<Meal> = RecordStore::open(&path);
        assert_eq!(store.add(Draft::new("Soup")).unwrap().id(), Some(1));
    }

    #[test]
    fn empty_description_is_derived() {
        let dir = TempDir::new().unwrap();
        let mut store: RecordStore<Exercise> =
            RecordStore::open(dir.path().join("exercises.json"));
        let ex = store
            .add(Draft::new("Burpees").category("cardio").description(""))
            .unwrap();
        assert_eq!(ex.description.as_deref(), Some("cardio exercise"));
        assert_eq!(ex.difficulty.as_deref(), Some("beginner"));
    }

    #[test]
    fn rejected_add_leaves_everything_untouched() {
        let dir = TempDir::new().unwrap();
        let mut store = meal_store(&dir);

        let err = store.add(Draft::new("x".repeat(51))).unwrap_err();
        assert!(matches!(err, StoreError::NameTooLong { max: 50 }));
        let err = store
            .add(Draft::new("Pie").description("d".repeat(201)))
            .unwrap_err();
        assert!(matches!(err, StoreError::DescriptionTooLong { .. }));
        assert!(matches!(
            store.add(Draft::new(" ")).unwrap_err(),
            StoreError::EmptyName
        ));

        assert_eq!(store.list().len(), 2);
        assert!(!store.path().exists());
    }

    #[test]
    fn remove_keeps_order_of_the_rest() {
        let dir = TempDir::new().unwrap();
        let mut store: RecordStore<Exercise> =
            RecordStore::open(dir.path().join("exercises.json"));

        let removed = store.remove("2").unwrap().unwrap();
        assert_eq!(removed.name(), "Squats");
        let names: Vec<&str> = store.list().iter().map(Record::name).collect();
        assert_eq!(names, ["Push Ups", "Plank"]);
        assert!(store.remove("2").unwrap().is_none());
        assert!(store.remove("abc").is_err());
    }

    #[test]
    fn filters_are_case_insensitive() {
        let dir = TempDir::new().unwrap();
        let store: RecordStore<Exercise> = RecordStore::open(dir.path().join("exercises.json"));

        let strength = store.filter_by_category("STRENGTH");
        assert_eq!(strength.len(), 2);
        let core = store.filter_by_tag("Abs");
        assert_eq!(core.len(), 1);
        assert_eq!(core[0].name(), "Plank");
        assert!(store.filter_by_tag("calves").is_empty());
    }

    #[test]
    fn valid_json_with_unexpected_types_is_kept() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("meals.json");
        fs::write(
            &path,
            r#"[{"id": 5, "name": "Leftovers", "consumed": false, "calories": 350.5},
                {"id": "6", "category": "snack"}]"#,
        )
        .unwrap();

        let mut store: RecordStore<Meal> = RecordStore::open(&path);
        assert_eq!(store.list().len(), 2);
        assert_eq!(store.list()[0].name(), "Leftovers");
        // the string id is neither matched nor counted
        assert!(store.details("6").unwrap().is_none());
        assert_eq!(store.add(Draft::new("Pasta")).unwrap().id(), Some(6));

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("Leftovers"));
        assert!(text.contains("350.5"));
        assert!(text.contains(r#""id": "6""#));
        assert!(!text.contains("Chicken Salad"));
    }

    #[test]
    fn non_array_file_yields_seed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("meals.json");
        fs::write(&path, r#"{"meals": []}"#).unwrap();
        let store: RecordStore<Meal> = RecordStore::open(&path);
        assert_eq!(store.list(), Meal::seed().as_slice());
    }

    #[test]
    fn toggle_keeps_the_stored_key_set() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("meals.json");
        fs::write(
            &path,
            r#"[{"id": 5, "name": "Leftovers", "consumed": false, "category": "dinner", "notes": "keep me"}]"#,
        )
        .unwrap();

        let mut store: RecordStore<Meal> = RecordStore::open(&path);
        store.toggle("5").unwrap().unwrap();

        let saved: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(
            saved,
            serde_json::json!([{
                "id": 5,
                "name": "Leftovers",
                "consumed": true,
                "category": "dinner",
                "notes": "keep me"
            }])
        );
    }

    #[test]
    fn add_past_the_largest_id_is_refused() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("meals.json");
        let text = format!(r#"[{{"id": {}, "name": "Big"}}]"#, i64::MAX);
        fs::write(&path, &text).unwrap();

        let mut store: RecordStore<Meal> = RecordStore::open(&path);
        let err = store.add(Draft::new("Next")).unwrap_err();
        assert!(matches!(err, StoreError::IdsExhausted));
        assert_eq!(store.list().len(), 1);
        assert_eq!(fs::read_to_string(&path).unwrap(), text);
    }

    // A directory where the file should be makes the rename fail.
    fn unwritable_meal_store(dir: &TempDir) -> RecordStore<Meal> {
        let path = dir.path().join("meals.json");
        fs::create_dir(&path).unwrap();
        RecordStore::open(&path)
    }

    #[test]
    fn save_failure_is_reported_but_memory_keeps_change() {
        let dir = TempDir::new().unwrap();
        let mut store = unwritable_meal_store(&dir);

        let err = store.toggle("1").unwrap_err();
        assert!(matches!(err, StoreError::Persist { .. }));
        assert!(store.list()[0].is_done());
        assert!(!dir.path().join("meals.json.tmp").exists());
    }

    #[test]
    fn add_save_failure_keeps_the_new_record() {
        let dir = TempDir::new().unwrap();
        let mut store = unwritable_meal_store(&dir);

        let err = store.add(Draft::new("Toast")).unwrap_err();
        assert!(matches!(err, StoreError::Persist { .. }));
        assert_eq!(store.list().len(), 3);
        assert_eq!(store.list()[2].name(), "Toast");
        assert!(!dir.path().join("meals.json.tmp").exists());
    }

    #[test]
    fn remove_save_failure_keeps_the_removal() {
        let dir = TempDir::new().unwrap();
        let mut store = unwritable_meal_store(&dir);

        let err = store.remove("1").unwrap_err();
        assert!(matches!(err, StoreError::Persist { .. }));
        let names: Vec<&str> = store.list().iter().map(Record::name).collect();
        assert_eq!(names, ["Oatmeal"]);
        assert!(!dir.path().join("meals.json.tmp").exists());
    }
}
