use std::path::Path;

use anyhow::Result;
use tracing::{debug, info};

use crate::db::Database;
use crate::mealdb::{MealData, meal_to_recipe};
use crate::models::{NewRecipe, Recipe, StoreError, validate_new_recipe};

/// The four recipe-store operations behind the REST API.
///
/// Each call is independent; the only cross-record rule is `mealId`
/// uniqueness, which the store enforces.
pub struct RecipeService {
    db: Database,
}

impl RecipeService {
    pub fn new(db_path: &Path) -> Result<Self> {
        let db = Database::open(db_path)?;
        Ok(Self { db })
    }

    pub fn new_in_memory() -> Result<Self> {
        let db = Database::open_in_memory()?;
        Ok(Self { db })
    }

    pub fn list(&self) -> Result<Vec<Recipe>, StoreError> {
        let recipes = self.db.list_recipes()?;
        debug!(count = recipes.len(), "listed saved recipes");
        Ok(recipes)
    }

    pub fn count(&self) -> Result<i64, StoreError> {
        self.db.count_recipes()
    }

    pub fn get(&self, meal_id: &str) -> Result<Option<Recipe>, StoreError> {
        self.db.get_recipe(meal_id.trim())
    }

    pub fn create(&self, recipe: &NewRecipe) -> Result<Recipe, StoreError> {
        let recipe = validate_new_recipe(recipe)?;
        let created = self.db.insert_recipe(&recipe)?;
        info!(meal_id = %created.meal_id, name = %created.name, "saved recipe");
        Ok(created)
    }

    /// Save an upstream meal directly, e.g. from a search or random result.
    pub fn save_meal(&self, meal: &MealData, notes: &str) -> Result<Recipe, StoreError> {
        self.create(&meal_to_recipe(meal, notes))
    }

    pub fn update_notes(&self, meal_id: &str, notes: &str) -> Result<Recipe, StoreError> {
        let updated = self.db.update_recipe_notes(meal_id.trim(), notes)?;
        info!(meal_id = %updated.meal_id, "updated recipe notes");
        Ok(updated)
    }

    pub fn delete(&self, meal_id: &str) -> Result<(), StoreError> {
        let meal_id = meal_id.trim();
        if !self.db.delete_recipe(meal_id)? {
            return Err(StoreError::NotFound(meal_id.to_string()));
        }
        info!(meal_id, "deleted recipe");
        Ok(())
    }
}
