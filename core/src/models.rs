use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// A saved recipe: a snapshot of an external meal plus the user's notes.
///
/// `name`, `thumbnail`, `category` and `area` are copied at save time and are
/// never re-synced with the external source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    pub id: String,
    pub meal_id: String,
    pub name: String,
    pub thumbnail: String,
    pub category: String,
    pub area: String,
    pub tags: Option<String>,
    pub instructions: String,
    pub ingredients: Vec<String>,
    pub notes: String,
    pub created_at: String,
    pub updated_at: String,
}

impl Recipe {
    /// Individual tags from the comma-separated `tags` field.
    pub fn tag_list(&self) -> Vec<&str> {
        split_tags(self.tags.as_deref())
    }
}

/// Create payload for a recipe. Everything except server-assigned metadata.
///
/// Descriptive fields accept `null` (TheMealDB sends it for missing values)
/// and store it as an empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRecipe {
    #[serde(default, deserialize_with = "null_as_default")]
    pub meal_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub thumbnail: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub category: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub area: String,
    #[serde(default)]
    pub tags: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub instructions: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub ingredients: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub notes: String,
}

fn null_as_default<'de, T, D>(deserializer: D) -> Result<T, D::Error>
where
    T: Deserialize<'de> + Default,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Trim the natural key and normalize a blank tag string to `None`.
pub fn validate_new_recipe(recipe: &NewRecipe) -> Result<NewRecipe, StoreError> {
    let meal_id = recipe.meal_id.trim();
    if meal_id.is_empty() {
        return Err(StoreError::Invalid("mealId is required".to_string()));
    }
    Ok(NewRecipe {
        meal_id: meal_id.to_string(),
        tags: recipe
            .tags
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(String::from),
        ..recipe.clone()
    })
}

/// Split a comma-separated tag string, dropping blanks.
pub fn split_tags(tags: Option<&str>) -> Vec<&str> {
    tags.map(|t| {
        t.split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .collect()
    })
    .unwrap_or_default()
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Meal {0} already saved")]
    Conflict(String),
    #[error("Recipe {0} not found")]
    NotFound(String),
    #[error("{0}")]
    Invalid(String),
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("malformed stored document: {0}")]
    Serialization(#[from] serde_json::Error),
}
