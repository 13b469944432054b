// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Drink endpoints.
//!
//! Listing drinks is public. Every other operation requires its own
//! permission scope, checked by the [`Authorized`] extractor before the path
//! or body is looked at.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    Json,
};
use serde_json::Value;
use tracing::info;

use crate::{
    auth::{Authorized, Scope},
    error::ApiError,
    models::{
        CreateDrinkRequest, DeleteDrinkResponse, DrinksResponse, ShortDrinksResponse,
        UpdateDrinkRequest,
    },
    state::AppState,
};

/// `get:drinks-detail`
pub struct GetDrinksDetail;
/// `post:drinks`
pub struct PostDrinks;
/// `patch:drinks`
pub struct PatchDrinks;
/// `delete:drinks`
pub struct DeleteDrinks;

impl Scope for GetDrinksDetail {
    const NAME: &'static str = "get:drinks-detail";
}

impl Scope for PostDrinks {
    const NAME: &'static str = "post:drinks";
}

impl Scope for PatchDrinks {
    const NAME: &'static str = "patch:drinks";
}

impl Scope for DeleteDrinks {
    const NAME: &'static str = "delete:drinks";
}

fn drink_id(path: Result<Path<u64>, PathRejection>) -> Result<u64, ApiError> {
    path.map(|Path(id)| id)
        .map_err(|rejection| ApiError::not_found(rejection.body_text()))
}

fn json_body(body: Result<Json<Value>, JsonRejection>) -> Result<Value, ApiError> {
    body.map(|Json(value)| value)
        .map_err(|rejection| ApiError::bad_request(rejection.body_text()))
}

#[utoipa::path(
    get,
    path = "/drinks",
    tag = "Drinks",
    responses((status = 200, description = "All drinks, short form", body = ShortDrinksResponse))
)]
pub async fn list_drinks(State(state): State<AppState>) -> Json<ShortDrinksResponse> {
    let store = state.store.read().await;
    Json(ShortDrinksResponse {
        success: true,
        drinks: store.list().iter().map(|drink| drink.short()).collect(),
    })
}

#[utoipa::path(
    get,
    path = "/drinks-detail",
    tag = "Drinks",
    security(("bearer_auth" = ["get:drinks-detail"])),
    responses(
        (status = 200, description = "All drinks, long form", body = DrinksResponse),
        (status = 401, description = "Missing or invalid token"),
        (status = 403, description = "Scope not granted")
    )
)]
pub async fn drinks_detail(
    _auth: Authorized<GetDrinksDetail>,
    State(state): State<AppState>,
) -> Json<DrinksResponse> {
    let store = state.store.read().await;
    Json(DrinksResponse::new(store.list()))
}

#[utoipa::path(
    post,
    path = "/drinks",
    request_body = CreateDrinkRequest,
    tag = "Drinks",
    security(("bearer_auth" = ["post:drinks"])),
    responses(
        (status = 200, description = "Created drink, long form", body = DrinksResponse),
        (status = 400, description = "Malformed JSON", body = crate::error::ErrorBody),
        (status = 401, description = "Missing or invalid token"),
        (status = 403, description = "Scope not granted"),
        (status = 422, description = "Invalid drink or duplicate title", body = crate::error::ErrorBody)
    )
)]
pub async fn create_drink(
    auth: Authorized<PostDrinks>,
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<DrinksResponse>, ApiError> {
    let request = CreateDrinkRequest::from_json(json_body(body)?)?;

    let drink = state.store.write().await.create(request)?;
    info!(id = drink.id, title = %drink.title, subject = %auth.claims().subject, "drink created");
    Ok(Json(DrinksResponse::new(vec![drink])))
}

#[utoipa::path(
    patch,
    path = "/drinks/{drink_id}",
    params(("drink_id" = u64, Path, description = "Identifier of the drink to update")),
    request_body = UpdateDrinkRequest,
    tag = "Drinks",
    security(("bearer_auth" = ["patch:drinks"])),
    responses(
        (status = 200, description = "Updated drink, long form", body = DrinksResponse),
        (status = 400, description = "Invalid values or duplicate title", body = crate::error::ErrorBody),
        (status = 401, description = "Missing or invalid token"),
        (status = 403, description = "Scope not granted"),
        (status = 404, description = "Drink not found", body = crate::error::ErrorBody)
    )
)]
pub async fn update_drink(
    auth: Authorized<PatchDrinks>,
    path: Result<Path<u64>, PathRejection>,
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<DrinksResponse>, ApiError> {
    let id = drink_id(path)?;
    // An unknown id is a 404 even when the body is also invalid.
    state.store.read().await.get(id)?;
    let request = UpdateDrinkRequest::from_json(json_body(body)?)?;

    let drink = state.store.write().await.update(id, request)?;
    info!(id, subject = %auth.claims().subject, "drink updated");
    Ok(Json(DrinksResponse::new(vec![drink])))
}

#[utoipa::path(
    delete,
    path = "/drinks/{drink_id}",
    params(("drink_id" = u64, Path, description = "Identifier of the drink to delete")),
    tag = "Drinks",
    security(("bearer_auth" = ["delete:drinks"])),
    responses(
        (status = 200, description = "Drink deleted", body = DeleteDrinkResponse),
        (status = 401, description = "Missing or invalid token"),
        (status = 403, description = "Scope not granted"),
        (status = 404, description = "Drink not found", body = crate::error::ErrorBody)
    )
)]
pub async fn delete_drink(
    auth: Authorized<DeleteDrinks>,
    path: Result<Path<u64>, PathRejection>,
    State(state): State<AppState>,
) -> Result<Json<DeleteDrinkResponse>, ApiError> {
    let id = drink_id(path)?;

    let drink = state.store.write().await.delete(id)?;
    info!(id, title = %drink.title, subject = %auth.claims().subject, "drink deleted");
    Ok(Json(DeleteDrinkResponse {
        success: true,
        delete: id,
    }))
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{to_bytes, Body},
        http::{header, Method, Request, StatusCode},
        Router,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::api::router;
    use crate::auth::testing::{authorizer, claims_with, primary_key, secondary_key, token_with};
    use crate::state::AppState;
    use crate::store::DrinkStore;

    fn app() -> (Router, AppState) {
        let state = AppState::new(DrinkStore::with_sample(), authorizer());
        (router(state.clone()), state)
    }

    async fn send(
        app: &Router,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<&str>,
    ) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let body = match body {
            Some(json) => {
                request = request.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = app.clone().oneshot(request.body(body).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    const LATTE: &str =
        r#"{"title": "latte", "recipe": [{"name": "milk", "color": "white", "parts": 3}]}"#;

    #[tokio::test]
    async fn public_listing_uses_short_form() {
        let (app, _) = app();
        let (status, body) = send(&app, Method::GET, "/drinks", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({
                "success": true,
                "drinks": [{"id": 1, "title": "water", "recipe": [{"color": "blue", "parts": 1}]}]
            })
        );
    }

    #[tokio::test]
    async fn detail_requires_token() {
        let (app, _) = app();
        let (status, body) = send(&app, Method::GET, "/drinks-detail", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "missing_header");
    }

    #[tokio::test]
    async fn detail_with_scope_uses_long_form() {
        let (app, _) = app();
        let token = token_with(&["get:drinks-detail"]);
        let (status, body) = send(&app, Method::GET, "/drinks-detail", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["drinks"][0]["recipe"][0]["name"], "water");
    }

    #[tokio::test]
    async fn token_from_unknown_key_is_rejected() {
        let (app, _) = app();
        let token = secondary_key().sign(&claims_with(&["get:drinks-detail"]));
        let (status, body) = send(&app, Method::GET, "/drinks-detail", Some(&token), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "signing_key_not_found");
    }

    #[tokio::test]
    async fn missing_permissions_claim_is_unauthorized() {
        let (app, _) = app();
        let mut claims = claims_with(&[]);
        claims.as_object_mut().unwrap().remove("permissions");
        let token = primary_key().sign(&claims);
        let (status, body) = send(&app, Method::GET, "/drinks-detail", Some(&token), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "permissions_claim_missing");
    }

    #[tokio::test]
    async fn create_returns_created_drink() {
        let (app, state) = app();
        let token = token_with(&["post:drinks"]);
        let (status, body) = send(&app, Method::POST, "/drinks", Some(&token), Some(LATTE)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["drinks"].as_array().unwrap().len(), 1);
        assert_eq!(body["drinks"][0]["id"], 2);
        assert_eq!(body["drinks"][0]["recipe"][0]["name"], "milk");
        assert_eq!(state.store.read().await.len(), 2);
    }

    #[tokio::test]
    async fn create_without_scope_is_forbidden_and_stores_nothing() {
        let (app, state) = app();
        let token = token_with(&["get:drinks-detail"]);
        let (status, body) = send(&app, Method::POST, "/drinks", Some(&token), Some(LATTE)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "permission_denied");
        assert_eq!(state.store.read().await.len(), 1);
    }

    #[tokio::test]
    async fn authorization_runs_before_body_validation() {
        let (app, _) = app();
        let (status, _) = send(&app, Method::POST, "/drinks", None, Some("{not json")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = send(&app, Method::DELETE, "/drinks/abc", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn create_validation_errors() {
        let (app, _) = app();
        let token = token_with(&["post:drinks"]);

        let (status, body) = send(&app, Method::POST, "/drinks", Some(&token), Some("{not json")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"success": false, "error": 400, "message": "Bad request"}));

        let (status, body) =
            send(&app, Method::POST, "/drinks", Some(&token), Some(r#"{"title": "latte"}"#)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"], 422);

        let duplicate = r#"{"title": "water", "recipe": []}"#;
        let (status, _) = send(&app, Method::POST, "/drinks", Some(&token), Some(duplicate)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn patch_updates_drink() {
        let (app, _) = app();
        let token = token_with(&["patch:drinks"]);
        let (status, body) = send(
            &app,
            Method::PATCH,
            "/drinks/1",
            Some(&token),
            Some(r#"{"title": "sparkling water"}"#),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["drinks"][0]["title"], "sparkling water");
        assert_eq!(body["drinks"][0]["recipe"][0]["color"], "blue");
    }

    #[tokio::test]
    async fn patch_errors() {
        let (app, _) = app();
        let token = token_with(&["patch:drinks", "post:drinks"]);
        send(&app, Method::POST, "/drinks", Some(&token), Some(LATTE)).await;

        let (status, _) =
            send(&app, Method::PATCH, "/drinks/42", Some(&token), Some(r#"{"title": "x"}"#)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) =
            send(&app, Method::PATCH, "/drinks/2", Some(&token), Some(r#"{"title": "water"}"#)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) =
            send(&app, Method::PATCH, "/drinks/2", Some(&token), Some(r#"{"recipe": 5}"#)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn delete_flow() {
        let (app, state) = app();
        let token = token_with(&["delete:drinks"]);

        let (status, body) = send(&app, Method::DELETE, "/drinks/1", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"success": true, "delete": 1}));
        assert!(state.store.read().await.is_empty());

        let (status, body) = send(&app, Method::DELETE, "/drinks/1", Some(&token), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Resource not found");

        let (status, _) = send(&app, Method::DELETE, "/drinks/abc", Some(&token), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn delete_with_other_scopes_is_forbidden() {
        let (app, state) = app();
        let token = token_with(&["get:drinks-detail", "post:drinks"]);
        let (status, _) = send(&app, Method::DELETE, "/drinks/1", Some(&token), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(state.store.read().await.len(), 1);
    }
}
