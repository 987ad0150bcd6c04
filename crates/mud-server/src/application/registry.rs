//! The world's name → place table.
//!
//! Entries are only ever added: there is no operation that destroys a place.

use std::collections::HashMap;
use std::sync::Arc;

use mud_core::MudError;
use tokio::sync::Mutex;

use crate::application::place::Place;

#[derive(Default)]
pub struct PlaceRegistry {
    places: Mutex<HashMap<String, Arc<Place>>>,
}

impl PlaceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `place` under its own name.
    ///
    /// # Errors
    ///
    /// [`MudError::PlaceAlreadyExists`] if the name is taken.
    pub async fn register(&self, place: Arc<Place>) -> Result<(), MudError> {
        let mut places = self.places.lock().await;
        if places.contains_key(place.name()) {
            return Err(MudError::PlaceAlreadyExists(place.name().to_string()));
        }
        places.insert(place.name().to_string(), place);
        Ok(())
    }

    /// # Errors
    ///
    /// [`MudError::NoSuchPlace`] if nothing is registered under `name`.
    pub async fn resolve(&self, name: &str) -> Result<Arc<Place>, MudError> {
        self.places
            .lock()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| MudError::NoSuchPlace(name.to_string()))
    }

    /// Every place, ordered by name.
    pub async fn all(&self) -> Vec<Arc<Place>> {
        let mut places: Vec<_> = self.places.lock().await.values().cloned().collect();
        places.sort_by(|a, b| a.name().cmp(b.name()));
        places
    }

    pub async fn len(&self) -> usize {
        self.places.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.places.lock().await.is_empty()
    }
}
