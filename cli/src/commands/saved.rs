use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process;

use crate::api::{BackendClient, ClientError};
use crate::mealdb::MealDbClient;
use mealbook_core::export::{file_name, render_markdown, render_text};
use mealbook_core::mealdb::meal_to_recipe;
use mealbook_core::models::Recipe;
use mealbook_core::view::{NoteEditor, NoteUpdate, SortKey, filter_recipes_by_tag, sort_recipes};

use super::helpers::{UiConfig, exit_on_client_error, json_error, print_recipe_table};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) enum ExportFormat {
    #[default]
    Markdown,
    Text,
    Json,
}

impl ExportFormat {
    fn extension(self) -> &'static str {
        match self {
            Self::Markdown => "md",
            Self::Text => "txt",
            Self::Json => "json",
        }
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "markdown" | "md" => Ok(Self::Markdown),
            "text" | "txt" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(format!(
                "Unknown format '{other}'. Use markdown, text or json"
            )),
        }
    }
}

/// The backend has no single-record read, so look the recipe up in the list.
async fn find_saved(backend: &BackendClient, meal_id: &str) -> Result<Recipe> {
    let meal_id = meal_id.trim();
    backend
        .list()
        .await?
        .into_iter()
        .find(|r| r.meal_id == meal_id)
        .ok_or_else(|| {
            ClientError::NotFound(format!("No saved recipe with meal id '{meal_id}'")).into()
        })
}

pub(crate) async fn cmd_save(
    meals: &MealDbClient,
    backend: &BackendClient,
    meal_id: &str,
    notes: &str,
    json: bool,
) -> Result<()> {
    let Some(meal) = meals.lookup(meal_id.trim()).await? else {
        if json {
            println!("{}", json_error("Meal not found"));
        } else {
            eprintln!("No meal found on TheMealDB with id '{meal_id}'");
        }
        process::exit(2);
    };

    let saved = match backend.create(&meal_to_recipe(&meal, notes)).await {
        Ok(recipe) => recipe,
        Err(e) => return exit_on_client_error(e, json),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&saved)?);
    } else {
        println!("Saved {} (meal id: {})", saved.name, saved.meal_id);
    }

    Ok(())
}

/// Saved recipes after the local tag filter and sort.
fn arrange(recipes: Vec<Recipe>, sort: SortKey, tag: Option<&str>) -> Vec<Recipe> {
    let mut recipes = filter_recipes_by_tag(recipes, tag.unwrap_or(""));
    sort_recipes(&mut recipes, sort);
    recipes
}

pub(crate) async fn cmd_saved(
    backend: &BackendClient,
    ui: &UiConfig,
    sort: SortKey,
    tag: Option<&str>,
    json: bool,
) -> Result<()> {
    let recipes = arrange(backend.list().await?, sort, tag);

    if recipes.is_empty() {
        if json {
            println!("[]");
        } else if let Some(tag) = tag {
            eprintln!("No saved recipes tagged '{tag}'");
        } else {
            eprintln!("No saved recipes yet");
        }
        process::exit(2);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&recipes)?);
    } else {
        print_recipe_table(ui, &recipes);
    }

    Ok(())
}

/// Run one edit session over `recipe`: replace the notes or append a line.
fn edit_notes(recipe: &Recipe, text: &str, append: bool) -> Option<NoteUpdate> {
    let mut editor = NoteEditor::new();
    editor.begin(recipe);
    if append {
        editor.append(text);
    } else {
        editor.set_draft(text);
    }
    editor.commit()
}

pub(crate) async fn cmd_note(
    backend: &BackendClient,
    meal_id: &str,
    text: &str,
    append: bool,
    json: bool,
) -> Result<()> {
    let recipe = match find_saved(backend, meal_id).await {
        Ok(recipe) => recipe,
        Err(e) => return exit_on_client_error(e, json),
    };
    let Some(update) = edit_notes(&recipe, text, append) else {
        return Ok(());
    };

    let updated = match backend.update_notes(&update.meal_id, &update.notes).await {
        Ok(recipe) => recipe,
        Err(e) => return exit_on_client_error(e, json),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&updated)?);
    } else {
        println!("Updated notes for {}", updated.name);
        if !updated.notes.is_empty() {
            println!("{}", updated.notes);
        }
    }

    Ok(())
}

pub(crate) async fn cmd_delete(backend: &BackendClient, meal_id: &str, json: bool) -> Result<()> {
    let message = match backend.delete(meal_id.trim()).await {
        Ok(message) => message,
        Err(e) => return exit_on_client_error(e, json),
    };

    if json {
        println!("{}", serde_json::json!({ "message": message }));
    } else {
        println!("{message}");
    }

    Ok(())
}

fn render_export(recipe: &Recipe, format: ExportFormat) -> Result<String> {
    Ok(match format {
        ExportFormat::Markdown => render_markdown(recipe),
        ExportFormat::Text => render_text(recipe),
        ExportFormat::Json => serde_json::to_string_pretty(recipe)?,
    })
}

/// Write the rendered recipe to `output`, or to its derived file name in `dir`.
fn write_export(
    recipe: &Recipe,
    format: ExportFormat,
    output: Option<&Path>,
    dir: &Path,
) -> Result<PathBuf> {
    let path = output.map_or_else(
        || dir.join(file_name(recipe, format.extension())),
        Path::to_path_buf,
    );
    let document = render_export(recipe, format)?;
    std::fs::write(&path, document)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}

pub(crate) async fn cmd_export(
    backend: &BackendClient,
    meal_id: &str,
    format: ExportFormat,
    output: Option<&Path>,
    json: bool,
) -> Result<()> {
    let recipe = match find_saved(backend, meal_id).await {
        Ok(recipe) => recipe,
        Err(e) => return exit_on_client_error(e, json),
    };

    // JSON goes to stdout unless a destination was given.
    if format == ExportFormat::Json && output.is_none() {
        println!("{}", render_export(&recipe, format)?);
        return Ok(());
    }

    let path = write_export(&recipe, format, output, Path::new("."))?;
    if json {
        println!("{}", serde_json::json!({ "path": path.display().to_string() }));
    } else {
        println!("Exported {} to {}", recipe.name, path.display());
    }

    Ok(())
}
