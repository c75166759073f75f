use serde::{Deserialize, Serialize};

use crate::config::ValidationMode;

/// Raw values exactly as submitted through the form.
///
/// Every field defaults to an empty string so that a partially filled form
/// still reaches validation instead of being rejected by the extractor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MenuForm {
    pub restaurant_id: String,
    pub menu_category: String,
    pub menu_item: String,
    pub price: String,
    pub ingredients: String,
}

/// One menu item, ready for the inference pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct MenuRecord {
    pub restaurant_id: String,
    pub menu_category: String,
    pub menu_item: String,
    pub ingredients: String,
    /// Non-negative, rounded to cents
    pub price: f64,
}

/// A submission that cannot be turned into a record.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Please fill in all fields. Missing: {}", .0.join(", "))]
    EmptyFields(Vec<&'static str>),
    #[error("Price must be a non-negative number, got '{0}'")]
    InvalidPrice(String),
    /// The request body was not a readable form submission
    #[error("The form could not be read: {0}")]
    MalformedForm(String),
}

impl MenuRecord {
    pub fn new(
        restaurant_id: impl Into<String>,
        menu_category: impl Into<String>,
        menu_item: impl Into<String>,
        ingredients: impl Into<String>,
        price: f64,
    ) -> Self {
        Self {
            restaurant_id: restaurant_id.into(),
            menu_category: menu_category.into(),
            menu_item: menu_item.into(),
            ingredients: ingredients.into(),
            price,
        }
    }

    /// Builds a record from the raw form, coercing only the price.
    pub fn from_form(form: &MenuForm) -> Result<Self, ValidationError> {
        Ok(Self::new(
            form.restaurant_id.clone(),
            form.menu_category.clone(),
            form.menu_item.clone(),
            form.ingredients.clone(),
            coerce_price(&form.price)?,
        ))
    }

    /// Column name / value pairs in the order the form presents them
    pub fn columns(&self) -> [(&'static str, String); 5] {
        [
            ("RestaurantID", self.restaurant_id.clone()),
            ("MenuCategory", self.menu_category.clone()),
            ("MenuItem", self.menu_item.clone()),
            ("Price", format!("{:.2}", self.price)),
            ("Ingredients", self.ingredients.clone()),
        ]
    }
}

impl MenuForm {
    /// Returns the display names of fields left blank.
    pub fn empty_fields(&self) -> Vec<&'static str> {
        [
            ("Restaurant ID", &self.restaurant_id),
            ("Menu Category", &self.menu_category),
            ("Menu Item Name", &self.menu_item),
            ("Price", &self.price),
            ("Ingredients", &self.ingredients),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect()
    }

    /// Checks the form under `mode`, then builds the record.
    pub fn validate(&self, mode: ValidationMode) -> Result<MenuRecord, ValidationError> {
        if mode == ValidationMode::Strict {
            let empty = self.empty_fields();
            if !empty.is_empty() {
                return Err(ValidationError::EmptyFields(empty));
            }
        }
        MenuRecord::from_form(self)
    }
}

/// Parses a price entered as text. A blank price is the form's default, 0.00.
pub fn coerce_price(raw: &str) -> Result<f64, ValidationError> {
    let trimmed = raw.trim().trim_start_matches('$');
    if trimmed.is_empty() {
        return Ok(0.0);
    }
    let value: f64 = trimmed
        .parse()
        .map_err(|_| ValidationError::InvalidPrice(raw.to_string()))?;
    let cents = (value * 100.0).round() / 100.0;
    // The price reaches the transform as an f32 tensor
    if value < 0.0 || !cents.is_finite() || cents > f64::from(f32::MAX) {
        return Err(ValidationError::InvalidPrice(raw.to_string()));
    }
    Ok(cents)
}
