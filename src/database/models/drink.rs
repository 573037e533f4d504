use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sqlx::FromRow;

/// A drink on the menu. `recipe` holds a JSON-encoded array of ingredient
/// objects and is only parsed when a projection is built.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Drink {
    pub id: i64,
    pub title: String,
    pub recipe: String,
}

impl Drink {
    /// Short projection: ingredient names stripped, only `color` and `parts`
    /// survive. Safe to serve without any permission. A recipe that is not a
    /// JSON array is an error, nothing from it may reach the public listing.
    pub fn short(&self) -> Result<Value, serde_json::Error> {
        let items: Vec<Value> = serde_json::from_str(&self.recipe)?;
        let recipe: Vec<Value> = items
            .into_iter()
            .map(|item| {
                json!({
                    "color": item.get("color").cloned().unwrap_or(Value::Null),
                    "parts": item.get("parts").cloned().unwrap_or(Value::Null),
                })
            })
            .collect();

        Ok(json!({ "id": self.id, "title": self.title, "recipe": recipe }))
    }

    /// Long projection: the full recipe as stored, names included. Requires
    /// the `get:drinks-detail` permission at the routing layer.
    pub fn long(&self) -> Result<Value, serde_json::Error> {
        let recipe: Value = serde_json::from_str(&self.recipe)?;
        Ok(json!({ "id": self.id, "title": self.title, "recipe": recipe }))
    }
}
