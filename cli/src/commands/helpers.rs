use anyhow::Result;
use serde::Serialize;
use std::process;
use tabled::{Table, Tabled, settings::Style};

use crate::api::ClientError;
use mealbook_core::mealdb::{MealData, extract_ingredients};
use mealbook_core::models::Recipe;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) enum Theme {
    #[default]
    Light,
    Dark,
}

impl std::str::FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "light" => Ok(Self::Light),
            "dark" => Ok(Self::Dark),
            other => Err(format!("Unknown theme '{other}'. Use light or dark")),
        }
    }
}

/// Presentation settings, built once in `main` and handed to every renderer.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct UiConfig {
    pub theme: Theme,
}

impl UiConfig {
    pub(crate) fn new(theme: Theme) -> Self {
        Self { theme }
    }

    pub(crate) fn table<T: Tabled>(&self, rows: &[T]) -> String {
        let mut table = Table::new(rows);
        match self.theme {
            Theme::Light => table.with(Style::rounded()),
            Theme::Dark => table.with(Style::modern()),
        };
        table.to_string()
    }

    fn rule(&self) -> &'static str {
        match self.theme {
            Theme::Light => "────────────────────────────────────────",
            Theme::Dark => "════════════════════════════════════════",
        }
    }
}

pub(crate) fn print_meal_table(ui: &UiConfig, meals: &[&MealData]) {
    #[derive(Tabled)]
    struct MealRow {
        #[tabled(rename = "#")]
        idx: usize,
        #[tabled(rename = "ID")]
        id: String,
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Category")]
        category: String,
        #[tabled(rename = "Area")]
        area: String,
        #[tabled(rename = "Tags")]
        tags: String,
    }

    let rows: Vec<MealRow> = meals
        .iter()
        .enumerate()
        .map(|(i, m)| MealRow {
            idx: i + 1,
            id: m.id.clone(),
            name: truncate(m.display_name(), 40),
            category: m.category.clone().unwrap_or_default(),
            area: m.area.clone().unwrap_or_default(),
            tags: truncate(&m.tag_list().join(", "), 30),
        })
        .collect();

    println!("{}", ui.table(&rows));
}

pub(crate) fn print_recipe_table(ui: &UiConfig, recipes: &[Recipe]) {
    #[derive(Tabled)]
    struct RecipeRow {
        #[tabled(rename = "Meal ID")]
        meal_id: String,
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Category")]
        category: String,
        #[tabled(rename = "Area")]
        area: String,
        #[tabled(rename = "Tags")]
        tags: String,
        #[tabled(rename = "Notes")]
        notes: String,
        #[tabled(rename = "Saved")]
        saved: String,
    }

    let rows: Vec<RecipeRow> = recipes
        .iter()
        .map(|r| RecipeRow {
            meal_id: r.meal_id.clone(),
            name: truncate(&r.name, 35),
            category: r.category.clone(),
            area: r.area.clone(),
            tags: truncate(&r.tag_list().join(", "), 25),
            // First line only; the full text is in `export`.
            notes: truncate(r.notes.lines().next().unwrap_or(""), 30),
            saved: r.created_at.chars().take(10).collect(),
        })
        .collect();

    println!("{}", ui.table(&rows));
}

/// Full view of one upstream meal, including its ingredient list.
pub(crate) fn print_meal_details(ui: &UiConfig, meal: &MealData) {
    println!("{}", ui.rule());
    println!("{} (id: {})", meal.display_name(), meal.id);
    let category = meal.category.as_deref().unwrap_or("-");
    let area = meal.area.as_deref().unwrap_or("-");
    println!("{category} | {area}");
    let tags = meal.tag_list();
    if !tags.is_empty() {
        println!("Tags: {}", tags.join(", "));
    }
    if let Some(thumb) = meal.thumbnail.as_deref().filter(|t| !t.is_empty()) {
        println!("Image: {thumb}");
    }

    let ingredients = extract_ingredients(meal);
    if !ingredients.is_empty() {
        println!("\nIngredients:");
        for line in &ingredients {
            println!("  - {line}");
        }
    }
    if let Some(instructions) = meal.instructions.as_deref().filter(|i| !i.trim().is_empty()) {
        println!("\nInstructions:\n{}", instructions.trim());
    }
}

/// Print conflict and not-found outcomes and exit 2. Anything else is returned.
pub(crate) fn exit_on_client_error(err: anyhow::Error, json: bool) -> Result<()> {
    let message = match err.downcast_ref::<ClientError>() {
        Some(ClientError::Conflict(msg) | ClientError::NotFound(msg)) => msg.clone(),
        _ => return Err(err),
    };
    if json {
        println!("{}", json_error(&message));
    } else {
        eprintln!("{message}");
    }
    process::exit(2);
}

pub(crate) fn json_error(message: &str) -> String {
    #[derive(Serialize)]
    struct CliError<'a> {
        error: &'a str,
    }
    serde_json::to_string(&CliError { error: message })
        .unwrap_or_else(|_| format!("{{\"error\":\"{message}\"}}"))
}

pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let end = s.char_indices().nth(max - 3).map_or(s.len(), |(i, _)| i);
        format!("{}...", &s[..end])
    }
}
