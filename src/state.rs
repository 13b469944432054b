// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use axum::extract::FromRef;
use tokio::sync::RwLock;

use crate::auth::Authorizer;
use crate::store::DrinkStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<RwLock<DrinkStore>>,
    pub authorizer: Arc<Authorizer>,
}

impl AppState {
    pub fn new(store: DrinkStore, authorizer: Authorizer) -> Self {
        Self {
            store: Arc::new(RwLock::new(store)),
            authorizer: Arc::new(authorizer),
        }
    }
}

impl FromRef<AppState> for Arc<Authorizer> {
    fn from_ref(state: &AppState) -> Self {
        Arc::clone(&state.authorizer)
    }
}
