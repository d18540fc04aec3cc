//! Pure filtering, sorting and note-editing state for the client views.
//!
//! Nothing here performs I/O: the views fetch once and recompute from these
//! functions whenever a filter or sort input changes.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::mealdb::MealData;
use crate::models::Recipe;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    Name,
    Category,
    Area,
    /// Saved recipes: newest first. Search results: upstream order.
    #[default]
    Recent,
}

impl std::str::FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "name" => Ok(Self::Name),
            "category" => Ok(Self::Category),
            "area" => Ok(Self::Area),
            "recent" | "recency" | "newest" => Ok(Self::Recent),
            other => Err(format!(
                "Unknown sort '{other}'. Use name, category, area or recent"
            )),
        }
    }
}

/// Filters for search results. `None` or blank means "any".
#[derive(Debug, Clone, Default)]
pub struct MealFilter {
    pub category: Option<String>,
    pub area: Option<String>,
    pub tag: Option<String>,
}

fn active(value: Option<&String>) -> Option<&str> {
    value.map(|v| v.trim()).filter(|v| !v.is_empty())
}

fn eq_ignore_case(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.to_lowercase()
}

fn cmp_ignore_case(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase())
}

impl MealFilter {
    #[must_use]
    pub fn matches(&self, meal: &MealData) -> bool {
        let field_matches = |wanted: Option<&String>, actual: Option<&String>| match active(wanted)
        {
            None => true,
            Some(w) => actual.is_some_and(|a| eq_ignore_case(a, w)),
        };

        field_matches(self.category.as_ref(), meal.category.as_ref())
            && field_matches(self.area.as_ref(), meal.area.as_ref())
            && match active(self.tag.as_ref()) {
                None => true,
                Some(tag) => meal.tag_list().iter().any(|t| eq_ignore_case(t, tag)),
            }
    }
}

#[must_use]
pub fn filter_meals<'a>(meals: &'a [MealData], filter: &MealFilter) -> Vec<&'a MealData> {
    meals.iter().filter(|m| filter.matches(m)).collect()
}

/// Stable sort of search results. `Recent` keeps the upstream order.
pub fn sort_meals(meals: &mut [&MealData], key: SortKey) {
    let field = |m: &MealData| -> String {
        match key {
            SortKey::Name => m.name.clone(),
            SortKey::Category => m.category.clone(),
            SortKey::Area => m.area.clone(),
            SortKey::Recent => None,
        }
        .unwrap_or_default()
    };
    if key != SortKey::Recent {
        meals.sort_by(|a, b| cmp_ignore_case(&field(a), &field(b)));
    }
}

/// Distinct tags across the given meals, sorted case-insensitively.
#[must_use]
pub fn collect_tags(meals: &[MealData]) -> Vec<String> {
    let mut seen: BTreeMap<String, String> = BTreeMap::new();
    for tag in meals.iter().flat_map(MealData::tag_list) {
        seen.entry(tag.to_lowercase())
            .or_insert_with(|| tag.to_string());
    }
    seen.into_values().collect()
}

fn created(recipe: &Recipe) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(&recipe.created_at).ok()
}

/// Stable sort of saved recipes. `Recent` puts the newest `createdAt` first;
/// unparseable timestamps sort last.
pub fn sort_recipes(recipes: &mut [Recipe], key: SortKey) {
    match key {
        SortKey::Name => recipes.sort_by(|a, b| cmp_ignore_case(&a.name, &b.name)),
        SortKey::Category => recipes.sort_by(|a, b| cmp_ignore_case(&a.category, &b.category)),
        SortKey::Area => recipes.sort_by(|a, b| cmp_ignore_case(&a.area, &b.area)),
        SortKey::Recent => recipes.sort_by(|a, b| match (created(a), created(b)) {
            (Some(x), Some(y)) => y.cmp(&x),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }),
    }
}

/// Case-insensitive substring match against the raw tag string.
/// A blank filter keeps everything; untagged recipes never match otherwise.
#[must_use]
pub fn filter_recipes_by_tag(recipes: Vec<Recipe>, tag_filter: &str) -> Vec<Recipe> {
    let needle = tag_filter.trim().to_lowercase();
    if needle.is_empty() {
        return recipes;
    }
    recipes
        .into_iter()
        .filter(|r| {
            r.tags
                .as_deref()
                .is_some_and(|t| t.to_lowercase().contains(&needle))
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteUpdate {
    pub meal_id: String,
    pub notes: String,
}

/// Inline note editing for the saved list. One recipe at a time.
#[derive(Debug, Default)]
pub struct NoteEditor {
    editing: Option<String>,
    draft: String,
}

impl NoteEditor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start editing `recipe`, discarding any other edit in progress.
    pub fn begin(&mut self, recipe: &Recipe) {
        self.editing = Some(recipe.meal_id.clone());
        self.draft.clone_from(&recipe.notes);
    }

    #[must_use]
    pub fn editing(&self) -> Option<&str> {
        self.editing.as_deref()
    }

    #[must_use]
    pub fn is_editing(&self, meal_id: &str) -> bool {
        self.editing.as_deref() == Some(meal_id)
    }

    #[must_use]
    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn set_draft(&mut self, text: &str) {
        if self.editing.is_some() {
            text.clone_into(&mut self.draft);
        }
    }

    /// Append a line to the draft, separated by a newline when non-empty.
    pub fn append(&mut self, text: &str) {
        if self.editing.is_none() {
            return;
        }
        if !self.draft.trim().is_empty() {
            self.draft.push('\n');
        }
        self.draft.push_str(text);
    }

    pub fn cancel(&mut self) {
        self.editing = None;
        self.draft.clear();
    }

    /// Finish the edit, returning the update to send. Clears the editor.
    pub fn commit(&mut self) -> Option<NoteUpdate> {
        let meal_id = self.editing.take()?;
        let notes = std::mem::take(&mut self.draft);
        Some(NoteUpdate { meal_id, notes })
    }
}
