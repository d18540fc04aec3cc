use std::fmt::Write;

use crate::models::Recipe;

/// Render a single recipe as a Markdown document.
#[must_use]
pub fn render_markdown(recipe: &Recipe) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# {}\n", title(recipe));
    let _ = writeln!(out, "- **Category:** {}", or_dash(&recipe.category));
    let _ = writeln!(out, "- **Area:** {}", or_dash(&recipe.area));
    if let Some(tags) = recipe.tags.as_deref().filter(|t| !t.is_empty()) {
        let _ = writeln!(out, "- **Tags:** {tags}");
    }
    if !recipe.thumbnail.is_empty() {
        let _ = writeln!(out, "\n![{}]({})", title(recipe), recipe.thumbnail);
    }

    if !recipe.ingredients.is_empty() {
        out.push_str("\n## Ingredients\n\n");
        for ing in &recipe.ingredients {
            let _ = writeln!(out, "- {ing}");
        }
    }

    if !recipe.instructions.trim().is_empty() {
        let _ = write!(out, "\n## Instructions\n\n{}\n", recipe.instructions.trim());
    }

    if !recipe.notes.trim().is_empty() {
        let _ = write!(out, "\n## Notes\n\n{}\n", recipe.notes.trim());
    }

    out
}

/// Render a single recipe as plain text.
#[must_use]
pub fn render_text(recipe: &Recipe) -> String {
    let mut out = String::new();
    let name = title(recipe);
    let _ = writeln!(out, "{name}");
    let _ = writeln!(out, "{}", "=".repeat(name.chars().count()));
    let _ = writeln!(out, "Category: {}", or_dash(&recipe.category));
    let _ = writeln!(out, "Area: {}", or_dash(&recipe.area));
    if let Some(tags) = recipe.tags.as_deref().filter(|t| !t.is_empty()) {
        let _ = writeln!(out, "Tags: {tags}");
    }

    if !recipe.ingredients.is_empty() {
        out.push_str("\nIngredients:\n");
        for ing in &recipe.ingredients {
            let _ = writeln!(out, "  * {ing}");
        }
    }
    if !recipe.instructions.trim().is_empty() {
        let _ = write!(out, "\nInstructions:\n{}\n", recipe.instructions.trim());
    }
    let notes = recipe.notes.trim();
    let _ = writeln!(out, "\nNotes: {}", if notes.is_empty() { "-" } else { notes });

    out
}

/// Filesystem-safe file name derived from the recipe name, e.g.
/// `teriyaki-chicken-casserole.md`. Falls back to the meal id.
#[must_use]
pub fn file_name(recipe: &Recipe, extension: &str) -> String {
    let mut slug = String::new();
    for c in recipe.name.chars() {
        if c.is_alphanumeric() {
            slug.extend(c.to_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    let slug = slug.trim_end_matches('-');
    let stem = if slug.is_empty() {
        format!("recipe-{}", recipe.meal_id)
    } else {
        slug.to_string()
    };
    format!("{stem}.{extension}")
}

fn title(recipe: &Recipe) -> &str {
    if recipe.name.trim().is_empty() {
        recipe.meal_id.as_str()
    } else {
        recipe.name.trim()
    }
}

fn or_dash(s: &str) -> &str {
    if s.trim().is_empty() { "-" } else { s }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Recipe {
        Recipe {
            id: "id".to_string(),
            meal_id: "52772".to_string(),
            name: "Teriyaki Chicken Casserole".to_string(),
            thumbnail: "https://www.themealdb.com/images/media/meals/wvpsxx1468256321.jpg"
                .to_string(),
            category: "Chicken".to_string(),
            area: "Japanese".to_string(),
            tags: Some("Meat,Casserole".to_string()),
            instructions: "Preheat oven to 350 F.\n".to_string(),
            ingredients: vec!["3/4 cup soy sauce".to_string(), "1/2 cup water".to_string()],
            notes: "great with rice".to_string(),
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    #[test]
    fn test_render_markdown() {
        let md = render_markdown(&sample());
        assert!(md.starts_with("# Teriyaki Chicken Casserole\n"));
        assert!(md.contains("- **Category:** Chicken"));
        assert!(md.contains("- **Tags:** Meat,Casserole"));
        assert!(md.contains("## Ingredients\n\n- 3/4 cup soy sauce\n- 1/2 cup water\n"));
        assert!(md.contains("## Instructions\n\nPreheat oven to 350 F.\n"));
        assert!(md.contains("## Notes\n\ngreat with rice\n"));
    }

    #[test]
    fn test_render_markdown_skips_empty_sections() {
        let mut r = sample();
        r.tags = None;
        r.ingredients.clear();
        r.notes.clear();
        r.thumbnail.clear();
        let md = render_markdown(&r);
        assert!(!md.contains("Tags"));
        assert!(!md.contains("## Ingredients"));
        assert!(!md.contains("## Notes"));
        assert!(!md.contains("!["));
    }

    #[test]
    fn test_render_text() {
        let text = render_text(&sample());
        assert!(text.starts_with("Teriyaki Chicken Casserole\n==="));
        assert!(text.contains("  * 1/2 cup water\n"));
        assert!(text.ends_with("Notes: great with rice\n"));
    }

    #[test]
    fn test_file_name() {
        assert_eq!(file_name(&sample(), "md"), "teriyaki-chicken-casserole.md");

        let mut r = sample();
        r.name = "Mum's Pie & Mash!".to_string();
        assert_eq!(file_name(&r, "txt"), "mum-s-pie-mash.txt");

        r.name = "  ".to_string();
        assert_eq!(file_name(&r, "md"), "recipe-52772.md");
    }
}
