use anyhow::{Result, bail};
use serde::Serialize;
use std::process;
use tracing::debug;

use crate::api::BackendClient;
use crate::mealdb::MealDbClient;
use mealbook_core::mealdb::{MealData, meal_to_recipe};
use mealbook_core::view::{MealFilter, SortKey, collect_tags, filter_meals, sort_meals};

use super::helpers::{UiConfig, exit_on_client_error, print_meal_details, print_meal_table};

/// Search TheMealDB, then filter and sort the results locally.
#[allow(clippy::too_many_arguments)]
pub(crate) async fn cmd_search(
    meals: &MealDbClient,
    ui: &UiConfig,
    term: &str,
    filter: &MealFilter,
    sort: SortKey,
    details: bool,
    json: bool,
) -> Result<()> {
    let results = meals.search(term).await?;
    let mut shown = filter_meals(&results, filter);
    sort_meals(&mut shown, sort);
    debug!(
        fetched = results.len(),
        shown = shown.len(),
        "filtered search results"
    );

    if shown.is_empty() {
        if json {
            println!("[]");
        } else if results.is_empty() {
            eprintln!("No meals found for '{term}'");
        } else {
            let total = results.len();
            eprintln!("No meals match the filters ({total} fetched for '{term}')");
        }
        process::exit(2);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&shown)?);
    } else if details {
        for meal in &shown {
            print_meal_details(ui, meal);
        }
    } else {
        print_meal_table(ui, &shown);
    }

    Ok(())
}

pub(crate) async fn cmd_random(
    meals: &MealDbClient,
    backend: &BackendClient,
    ui: &UiConfig,
    save: bool,
    notes: &str,
    json: bool,
) -> Result<()> {
    let Some(meal) = meals.random().await? else {
        bail!("TheMealDB returned no random meal");
    };

    if !save {
        if json {
            println!("{}", serde_json::to_string_pretty(&meal)?);
        } else {
            print_meal_details(ui, &meal);
        }
        return Ok(());
    }

    let saved = match backend.create(&meal_to_recipe(&meal, notes)).await {
        Ok(recipe) => recipe,
        Err(e) => return exit_on_client_error(e, json),
    };

    if json {
        let body = serde_json::json!({ "meal": meal, "saved": saved });
        println!("{}", serde_json::to_string_pretty(&body)?);
    } else {
        print_meal_details(ui, &meal);
        println!("\nSaved {} (meal id: {})", saved.name, saved.meal_id);
    }

    Ok(())
}

#[derive(Serialize)]
struct FilterOptions {
    categories: Vec<String>,
    areas: Vec<String>,
    tags: Vec<String>,
}

/// Valid filter values. Tags have no upstream list, so they come from a search.
pub(crate) async fn cmd_filters(
    meals: &MealDbClient,
    term: Option<&str>,
    json: bool,
) -> Result<()> {
    let categories = meals.categories().await?;
    let areas = meals.areas().await?;
    let sample: Vec<MealData> = meals.search(term.unwrap_or("")).await?;
    let options = FilterOptions {
        categories,
        areas,
        tags: collect_tags(&sample),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&options)?);
    } else {
        print_options("Categories", &options.categories);
        print_options("Areas", &options.areas);
        print_options("Tags", &options.tags);
    }

    Ok(())
}

fn print_options(label: &str, values: &[String]) {
    if values.is_empty() {
        println!("{label}: -");
    } else {
        println!("{label}: {}", values.join(", "));
    }
}
