// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-memory drink store.
//!
//! Drinks live for the lifetime of the process. Ids are assigned from a
//! monotonically increasing counter starting at 1 and are never reused.

use std::collections::BTreeMap;

use crate::error::ApiError;
use crate::models::{CreateDrinkRequest, Drink, Ingredient, UpdateDrinkRequest};

#[derive(Debug)]
pub struct DrinkStore {
    drinks: BTreeMap<u64, Drink>,
    next_id: u64,
}

impl Default for DrinkStore {
    fn default() -> Self {
        Self {
            drinks: BTreeMap::new(),
            next_id: 1,
        }
    }
}

impl DrinkStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store holding the single sample drink "water".
    pub fn with_sample() -> Self {
        let mut store = Self::new();
        store.insert("water".to_string(), vec![water()]);
        store
    }

    /// All drinks ordered by id.
    pub fn list(&self) -> Vec<Drink> {
        self.drinks.values().cloned().collect()
    }

    pub fn get(&self, id: u64) -> Result<Drink, ApiError> {
        self.drinks
            .get(&id)
            .cloned()
            .ok_or_else(|| ApiError::not_found("Drink not found"))
    }

    pub fn len(&self) -> usize {
        self.drinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drinks.is_empty()
    }

    /// Create a drink. A duplicate title is a 422.
    pub fn create(&mut self, request: CreateDrinkRequest) -> Result<Drink, ApiError> {
        if self.title_taken(&request.title, None) {
            return Err(ApiError::unprocessable("A drink with this title already exists"));
        }
        Ok(self.insert(request.title, request.recipe))
    }

    /// Apply a partial update. Unknown id is a 404, a duplicate title a 400.
    pub fn update(&mut self, id: u64, request: UpdateDrinkRequest) -> Result<Drink, ApiError> {
        if !self.drinks.contains_key(&id) {
            return Err(ApiError::not_found("Drink not found"));
        }
        if let Some(title) = &request.title {
            if self.title_taken(title, Some(id)) {
                return Err(ApiError::bad_request("A drink with this title already exists"));
            }
        }

        let drink = self
            .drinks
            .get_mut(&id)
            .ok_or_else(|| ApiError::not_found("Drink not found"))?;
        if let Some(title) = request.title {
            drink.title = title;
        }
        if let Some(recipe) = request.recipe {
            drink.recipe = recipe;
        }
        Ok(drink.clone())
    }

    pub fn delete(&mut self, id: u64) -> Result<Drink, ApiError> {
        self.drinks
            .remove(&id)
            .ok_or_else(|| ApiError::not_found("Drink not found"))
    }

    fn insert(&mut self, title: String, recipe: Vec<Ingredient>) -> Drink {
        let id = self.next_id;
        self.next_id += 1;
        let drink = Drink { id, title, recipe };
        self.drinks.insert(id, drink.clone());
        drink
    }

    fn title_taken(&self, title: &str, except: Option<u64>) -> bool {
        self.drinks
            .values()
            .any(|drink| drink.title == title && Some(drink.id) != except)
    }
}

fn water() -> Ingredient {
    Ingredient {
        name: "water".to_string(),
        color: "blue".to_string(),
        parts: 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    fn latte() -> CreateDrinkRequest {
        CreateDrinkRequest {
            title: "latte".into(),
            recipe: vec![
                Ingredient { name: "espresso".into(), color: "brown".into(), parts: 1 },
                Ingredient { name: "milk".into(), color: "white".into(), parts: 3 },
            ],
        }
    }

    #[test]
    fn sample_store_holds_water() {
        let store = DrinkStore::with_sample();
        let drinks = store.list();
        assert_eq!(drinks.len(), 1);
        assert_eq!(drinks[0].id, 1);
        assert_eq!(drinks[0].title, "water");
        assert_eq!(drinks[0].recipe, vec![water()]);
    }

    #[test]
    fn create_assigns_increasing_ids() {
        let mut store = DrinkStore::with_sample();
        let latte = store.create(latte()).unwrap();
        assert_eq!(latte.id, 2);
        assert_eq!(store.get(2).unwrap(), latte);
    }

    #[test]
    fn create_rejects_duplicate_title() {
        let mut store = DrinkStore::new();
        store.create(latte()).unwrap();
        let err = store.create(latte()).unwrap_err();
        assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn update_changes_only_given_fields() {
        let mut store = DrinkStore::new();
        let created = store.create(latte()).unwrap();

        let updated = store
            .update(
                created.id,
                UpdateDrinkRequest {
                    title: Some("cafe latte".into()),
                    recipe: None,
                },
            )
            .unwrap();
        assert_eq!(updated.title, "cafe latte");
        assert_eq!(updated.recipe, created.recipe);
    }

    #[test]
    fn update_keeping_own_title_is_allowed() {
        let mut store = DrinkStore::new();
        let created = store.create(latte()).unwrap();
        let update = UpdateDrinkRequest {
            title: Some("latte".into()),
            recipe: None,
        };
        assert!(store.update(created.id, update).is_ok());
    }

    #[test]
    fn update_errors() {
        let mut store = DrinkStore::with_sample();
        store.create(latte()).unwrap();

        let missing = store.update(99, UpdateDrinkRequest::default()).unwrap_err();
        assert_eq!(missing.status, StatusCode::NOT_FOUND);

        let duplicate = store
            .update(
                2,
                UpdateDrinkRequest {
                    title: Some("water".into()),
                    recipe: None,
                },
            )
            .unwrap_err();
        assert_eq!(duplicate.status, StatusCode::BAD_REQUEST);
        assert_eq!(store.get(2).unwrap().title, "latte");
    }

    #[test]
    fn delete_removes_and_ids_are_not_reused() {
        let mut store = DrinkStore::with_sample();
        assert_eq!(store.delete(1).unwrap().title, "water");
        assert!(store.is_empty());
        assert_eq!(store.delete(1).unwrap_err().status, StatusCode::NOT_FOUND);

        assert_eq!(store.create(latte()).unwrap().id, 2);
    }
}
