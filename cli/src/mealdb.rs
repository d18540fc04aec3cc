use anyhow::{Context, Result};

use mealbook_core::mealdb::{
    AreaListResponse, CategoryListResponse, MealData, MealsResponse, area_names, category_names,
};

pub struct MealDbClient {
    client: reqwest::Client,
    base_url: String,
}

impl MealDbClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(format!(
                "mealbook/{} (recipe bookmarks)",
                env!("CARGO_PKG_VERSION")
            ))
            .timeout(std::time::Duration::from_secs(10))
            .connect_timeout(std::time::Duration::from_secs(5))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, &str)],
    ) -> Result<T> {
        let url = format!("{}/{endpoint}", self.base_url);
        let resp = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .context("Failed to reach TheMealDB")?
            .error_for_status()
            .context("TheMealDB returned an error")?;

        resp.json()
            .await
            .with_context(|| format!("Failed to parse TheMealDB {endpoint} response"))
    }

    /// Raw search response, passed through by the server's `/meals` proxy.
    pub async fn search_raw(&self, term: &str) -> Result<MealsResponse> {
        self.get_json("search.php", &[("s", term)]).await
    }

    pub async fn search(&self, term: &str) -> Result<Vec<MealData>> {
        Ok(self.search_raw(term).await?.into_meals())
    }

    pub async fn random(&self) -> Result<Option<MealData>> {
        let resp: MealsResponse = self.get_json("random.php", &[]).await?;
        Ok(resp.into_meals().into_iter().next())
    }

    pub async fn lookup(&self, meal_id: &str) -> Result<Option<MealData>> {
        let resp: MealsResponse = self.get_json("lookup.php", &[("i", meal_id)]).await?;
        Ok(resp.into_meals().into_iter().next())
    }

    pub async fn categories(&self) -> Result<Vec<String>> {
        let resp: CategoryListResponse = self.get_json("list.php", &[("c", "list")]).await?;
        Ok(category_names(resp))
    }

    pub async fn areas(&self) -> Result<Vec<String>> {
        let resp: AreaListResponse = self.get_json("list.php", &[("a", "list")]).await?;
        Ok(area_names(resp))
    }
}
