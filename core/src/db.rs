use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{Connection, ErrorCode, OptionalExtension, params};
use uuid::Uuid;

use crate::models::{NewRecipe, Recipe, StoreError};

const RECIPE_COLUMNS: &str = "uuid, meal_id, name, thumbnail, category, area, tags, instructions, ingredients, notes, created_at, updated_at";

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;
        let db = Database { conn };
        db.migrate()?;
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<()> {
        let version: i64 = self
            .conn
            .pragma_query_value(None, "user_version", |row| row.get(0))?;

        if version < 1 {
            // One row per saved recipe document; ingredients kept as a JSON array.
            self.conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS recipes (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    uuid TEXT NOT NULL UNIQUE,
                    meal_id TEXT NOT NULL UNIQUE,
                    name TEXT NOT NULL DEFAULT '',
                    thumbnail TEXT NOT NULL DEFAULT '',
                    category TEXT NOT NULL DEFAULT '',
                    area TEXT NOT NULL DEFAULT '',
                    tags TEXT,
                    instructions TEXT NOT NULL DEFAULT '',
                    ingredients TEXT NOT NULL DEFAULT '[]',
                    notes TEXT NOT NULL DEFAULT '',
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );

                PRAGMA user_version = 1;",
            )?;
        }

        Ok(())
    }

    // Expects RECIPE_COLUMNS order. The ingredient list is decoded by the caller.
    fn recipe_from_row(row: &rusqlite::Row) -> rusqlite::Result<(Recipe, String)> {
        let ingredients_json: String = row.get(8)?;
        Ok((
            Recipe {
                id: row.get(0)?,
                meal_id: row.get(1)?,
                name: row.get(2)?,
                thumbnail: row.get(3)?,
                category: row.get(4)?,
                area: row.get(5)?,
                tags: row.get(6)?,
                instructions: row.get(7)?,
                ingredients: Vec::new(),
                notes: row.get(9)?,
                created_at: row.get(10)?,
                updated_at: row.get(11)?,
            },
            ingredients_json,
        ))
    }

    fn decode((mut recipe, ingredients_json): (Recipe, String)) -> Result<Recipe, StoreError> {
        recipe.ingredients = serde_json::from_str(&ingredients_json)?;
        Ok(recipe)
    }

    // --- Recipes ---

    pub fn list_recipes(&self) -> Result<Vec<Recipe>, StoreError> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {RECIPE_COLUMNS} FROM recipes ORDER BY id"))?;
        let rows = stmt
            .query_map([], Self::recipe_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(Self::decode).collect()
    }

    pub fn get_recipe(&self, meal_id: &str) -> Result<Option<Recipe>, StoreError> {
        let row = self
            .conn
            .query_row(
                &format!("SELECT {RECIPE_COLUMNS} FROM recipes WHERE meal_id = ?1"),
                params![meal_id],
                Self::recipe_from_row,
            )
            .optional()?;
        row.map(Self::decode).transpose()
    }

    /// Insert a new recipe. The payload is expected to be validated already.
    pub fn insert_recipe(&self, recipe: &NewRecipe) -> Result<Recipe, StoreError> {
        if self.get_recipe(&recipe.meal_id)?.is_some() {
            return Err(StoreError::Conflict(recipe.meal_id.clone()));
        }

        let now = Utc::now().to_rfc3339();
        let uuid = Uuid::new_v4().to_string();
        let ingredients = serde_json::to_string(&recipe.ingredients)?;
        let inserted = self.conn.execute(
            "INSERT INTO recipes (uuid, meal_id, name, thumbnail, category, area, tags, instructions, ingredients, notes, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                uuid,
                recipe.meal_id,
                recipe.name,
                recipe.thumbnail,
                recipe.category,
                recipe.area,
                recipe.tags,
                recipe.instructions,
                ingredients,
                recipe.notes,
                now,
                now,
            ],
        );

        match inserted {
            Ok(_) => {}
            // Another writer got there between the lookup and the insert.
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == ErrorCode::ConstraintViolation =>
            {
                return Err(StoreError::Conflict(recipe.meal_id.clone()));
            }
            Err(e) => return Err(e.into()),
        }

        self.get_recipe(&recipe.meal_id)?
            .ok_or_else(|| StoreError::NotFound(recipe.meal_id.clone()))
    }

    pub fn update_recipe_notes(&self, meal_id: &str, notes: &str) -> Result<Recipe, StoreError> {
        let now = Utc::now().to_rfc3339();
        let rows = self.conn.execute(
            "UPDATE recipes SET notes = ?1, updated_at = ?2 WHERE meal_id = ?3",
            params![notes, now, meal_id],
        )?;
        if rows == 0 {
            return Err(StoreError::NotFound(meal_id.to_string()));
        }
        self.get_recipe(meal_id)?
            .ok_or_else(|| StoreError::NotFound(meal_id.to_string()))
    }

    pub fn delete_recipe(&self, meal_id: &str) -> Result<bool, StoreError> {
        let rows = self
            .conn
            .execute("DELETE FROM recipes WHERE meal_id = ?1", params![meal_id])?;
        Ok(rows > 0)
    }

    pub fn count_recipes(&self) -> Result<i64, StoreError> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM recipes", [], |row| row.get(0))?;
        Ok(count)
    }
}
