use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct FoodQuery {
    pub q: Option<String>,
    pub locale: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    20
}

#[derive(Debug, Deserialize)]
pub struct CreateFoodRequest {
    pub name: String,
    pub calories: f64,
    #[serde(default)]
    pub protein_g: f64,
    #[serde(default)]
    pub carbs_g: f64,
    #[serde(default)]
    pub fat_g: f64,
    pub fiber_g: Option<f64>,
    pub sugar_g: Option<f64>,
    pub sodium_mg: Option<f64>,
    #[serde(default = "default_serving_size")]
    pub serving_size: f64,
    #[serde(default = "default_serving_unit")]
    pub serving_unit: String,
    pub locale: Option<String>,
    #[serde(default)]
    pub is_public: bool,
}

fn default_serving_size() -> f64 {
    100.0
}

fn default_serving_unit() -> String {
    "g".into()
}
