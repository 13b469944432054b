// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! Request and response bodies of the drinks API. All types derive
//! `ToSchema` for OpenAPI documentation.
//!
//! ## Representations
//!
//! A [`Drink`] serializes in its long form (ingredient names included).
//! Public listings use [`ShortDrink`], which only exposes the colors and
//! proportions needed to draw the drink.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use crate::error::ApiError;

// =============================================================================
// Drink Models
// =============================================================================

/// One ingredient of a recipe.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct Ingredient {
    /// Ingredient name, e.g. "milk".
    pub name: String,
    /// Display color, e.g. "grey" or "#ffffff".
    pub color: String,
    /// Number of parts of this ingredient in the drink.
    pub parts: u32,
}

/// A drink in its long representation.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct Drink {
    /// Unique identifier, assigned by the store.
    pub id: u64,
    /// Unique drink title.
    pub title: String,
    /// Ordered ingredients.
    pub recipe: Vec<Ingredient>,
}

/// Ingredient without its name.
#[derive(Debug, Clone, Serialize, ToSchema, PartialEq, Eq)]
pub struct ShortIngredient {
    pub color: String,
    pub parts: u32,
}

/// A drink in its short (public) representation.
#[derive(Debug, Clone, Serialize, ToSchema, PartialEq, Eq)]
pub struct ShortDrink {
    pub id: u64,
    pub title: String,
    pub recipe: Vec<ShortIngredient>,
}

impl Drink {
    /// Short representation with ingredient names stripped.
    pub fn short(&self) -> ShortDrink {
        ShortDrink {
            id: self.id,
            title: self.title.clone(),
            recipe: self
                .recipe
                .iter()
                .map(|ingredient| ShortIngredient {
                    color: ingredient.color.clone(),
                    parts: ingredient.parts,
                })
                .collect(),
        }
    }
}

// =============================================================================
// Requests
// =============================================================================

/// Request to create a drink. Both fields are required.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct CreateDrinkRequest {
    pub title: String,
    pub recipe: Vec<Ingredient>,
}

impl CreateDrinkRequest {
    /// Validate a raw JSON body; any violation is a 422.
    pub fn from_json(body: Value) -> Result<Self, ApiError> {
        let Value::Object(mut fields) = body else {
            return Err(ApiError::unprocessable("Request body must be a JSON object"));
        };

        let title = match fields.remove("title") {
            Some(Value::String(title)) if !title.trim().is_empty() => title,
            _ => return Err(ApiError::unprocessable("'title' must be a non-empty string")),
        };
        let recipe = match fields.remove("recipe") {
            Some(recipe @ Value::Array(_)) => parse_recipe(recipe)
                .ok_or_else(|| ApiError::unprocessable("'recipe' entries need name, color and parts"))?,
            _ => return Err(ApiError::unprocessable("'recipe' must be a list")),
        };

        Ok(Self { title, recipe })
    }
}

/// Partial update of a drink.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct UpdateDrinkRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipe: Option<Vec<Ingredient>>,
}

impl UpdateDrinkRequest {
    /// Validate a raw JSON body; any violation is a 400.
    pub fn from_json(body: Value) -> Result<Self, ApiError> {
        let Value::Object(mut fields) = body else {
            return Err(ApiError::bad_request("Request body must be a JSON object"));
        };

        let title = match fields.remove("title") {
            None | Some(Value::Null) => None,
            Some(Value::String(title)) if !title.trim().is_empty() => Some(title),
            Some(_) => return Err(ApiError::bad_request("'title' must be a non-empty string")),
        };
        let recipe = match fields.remove("recipe") {
            None | Some(Value::Null) => None,
            Some(recipe @ Value::Array(_)) => Some(
                parse_recipe(recipe)
                    .ok_or_else(|| ApiError::bad_request("'recipe' entries need name, color and parts"))?,
            ),
            Some(_) => return Err(ApiError::bad_request("'recipe' must be a list")),
        };

        Ok(Self { title, recipe })
    }
}

fn parse_recipe(recipe: Value) -> Option<Vec<Ingredient>> {
    serde_json::from_value(recipe).ok()
}

// =============================================================================
// Responses
// =============================================================================

/// `GET /drinks` response.
#[derive(Debug, Serialize, ToSchema)]
pub struct ShortDrinksResponse {
    pub success: bool,
    pub drinks: Vec<ShortDrink>,
}

/// Response carrying drinks in long form.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DrinksResponse {
    pub success: bool,
    pub drinks: Vec<Drink>,
}

impl DrinksResponse {
    pub fn new(drinks: Vec<Drink>) -> Self {
        Self {
            success: true,
            drinks,
        }
    }
}

/// `DELETE /drinks/{id}` response.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DeleteDrinkResponse {
    pub success: bool,
    /// Id of the deleted drink.
    pub delete: u64,
}
