//! Response schema for TheMealDB v1 and conversions into mealbook types.
//!
//! Meals carry up to [`INGREDIENT_SLOTS`] numbered `strIngredientN` /
//! `strMeasureN` field pairs. Those are kept in a flattened map so the
//! schema does not need forty optional fields.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::{NewRecipe, split_tags};

pub const INGREDIENT_SLOTS: usize = 20;

/// `search.php`, `random.php` and `lookup.php` all answer with this shape.
/// TheMealDB sends `"meals": null` when nothing matched.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct MealsResponse {
    pub meals: Option<Vec<MealData>>,
}

impl MealsResponse {
    #[must_use]
    pub fn into_meals(self) -> Vec<MealData> {
        self.meals.unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct MealData {
    #[serde(rename = "idMeal")]
    pub id: String,
    #[serde(rename = "strMeal")]
    pub name: Option<String>,
    #[serde(rename = "strCategory")]
    pub category: Option<String>,
    #[serde(rename = "strArea")]
    pub area: Option<String>,
    #[serde(rename = "strInstructions")]
    pub instructions: Option<String>,
    #[serde(rename = "strMealThumb")]
    pub thumbnail: Option<String>,
    #[serde(rename = "strTags")]
    pub tags: Option<String>,
    #[serde(rename = "strYoutube")]
    pub youtube: Option<String>,
    #[serde(rename = "strSource")]
    pub source: Option<String>,
    #[serde(flatten)]
    pub fields: HashMap<String, Value>,
}

impl MealData {
    fn slot(&self, prefix: &str, index: usize) -> Option<&str> {
        self.fields
            .get(&format!("{prefix}{index}"))
            .and_then(Value::as_str)
    }

    #[must_use]
    pub fn ingredient(&self, index: usize) -> Option<&str> {
        self.slot("strIngredient", index)
    }

    #[must_use]
    pub fn measure(&self, index: usize) -> Option<&str> {
        self.slot("strMeasure", index)
    }

    #[must_use]
    pub fn tag_list(&self) -> Vec<&str> {
        split_tags(self.tags.as_deref())
    }

    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

/// Combined "measure ingredient" strings for every slot whose ingredient has
/// non-blank text, in ascending slot order.
#[must_use]
pub fn extract_ingredients(meal: &MealData) -> Vec<String> {
    (1..=INGREDIENT_SLOTS)
        .filter_map(|i| {
            let ingredient = meal.ingredient(i).filter(|s| !s.trim().is_empty())?;
            let measure = meal.measure(i).unwrap_or("");
            Some(format!("{measure} {ingredient}").trim().to_string())
        })
        .collect()
}

/// Snapshot an upstream meal into a create payload.
#[must_use]
pub fn meal_to_recipe(meal: &MealData, notes: &str) -> NewRecipe {
    NewRecipe {
        meal_id: meal.id.clone(),
        name: meal.name.clone().unwrap_or_default(),
        thumbnail: meal.thumbnail.clone().unwrap_or_default(),
        category: meal.category.clone().unwrap_or_default(),
        area: meal.area.clone().unwrap_or_default(),
        tags: meal.tags.clone().filter(|t| !t.trim().is_empty()),
        instructions: meal.instructions.clone().unwrap_or_default(),
        ingredients: extract_ingredients(meal),
        notes: notes.to_string(),
    }
}

/// `list.php?c=list` answers `{"meals":[{"strCategory":"Beef"}, ...]}`.
#[derive(Debug, Deserialize)]
pub struct CategoryListResponse {
    pub meals: Option<Vec<CategoryEntry>>,
}

#[derive(Debug, Deserialize)]
pub struct CategoryEntry {
    #[serde(rename = "strCategory")]
    pub name: Option<String>,
}

/// `list.php?a=list` answers `{"meals":[{"strArea":"American"}, ...]}`.
#[derive(Debug, Deserialize)]
pub struct AreaListResponse {
    pub meals: Option<Vec<AreaEntry>>,
}

#[derive(Debug, Deserialize)]
pub struct AreaEntry {
    #[serde(rename = "strArea")]
    pub name: Option<String>,
}

#[must_use]
pub fn category_names(resp: CategoryListResponse) -> Vec<String> {
    resp.meals
        .unwrap_or_default()
        .into_iter()
        .filter_map(|c| c.name.filter(|n| !n.trim().is_empty()))
        .collect()
}

#[must_use]
pub fn area_names(resp: AreaListResponse) -> Vec<String> {
    resp.meals
        .unwrap_or_default()
        .into_iter()
        .filter_map(|a| a.name.filter(|n| !n.trim().is_empty()))
        .collect()
}
