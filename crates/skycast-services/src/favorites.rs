//! Saved favorite cities.

use crate::kv_store::{Storage, StoreResult};

pub const FAVORITES_KEY: &str = "favoriteLocations";

/// Ordered list of favorite city names, persisted as a JSON array.
#[derive(Clone)]
pub struct Favorites {
    storage: Storage,
}

impl Favorites {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    /// Favorites in insertion order. Unreadable stored data yields an empty list.
    pub fn list(&self) -> Vec<String> {
        self.storage.get_or(FAVORITES_KEY, Vec::new())
    }

    pub fn contains(&self, city: &str) -> bool {
        let city = city.trim();
        self.list().iter().any(|c| c == city)
    }

    /// Append `city`. Returns false when it is blank or already saved.
    pub fn add(&self, city: &str) -> StoreResult<bool> {
        let city = city.trim();
        if city.is_empty() {
            return Ok(false);
        }

        let mut cities = self.list();
        if cities.iter().any(|c| c == city) {
            return Ok(false);
        }

        cities.push(city.to_string());
        self.storage.set(FAVORITES_KEY, &cities)?;
        tracing::info!(city, "Added favorite");
        Ok(true)
    }

    /// Returns false when `city` was not saved.
    pub fn remove(&self, city: &str) -> StoreResult<bool> {
        let city = city.trim();
        let mut cities = self.list();
        let before = cities.len();
        cities.retain(|c| c != city);
        if cities.len() == before {
            return Ok(false);
        }

        self.storage.set(FAVORITES_KEY, &cities)?;
        tracing::info!(city, "Removed favorite");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_keeps_order_and_skips_duplicates() {
        let favorites = Favorites::new(Storage::memory());
        assert!(favorites.add("Ankara").unwrap());
        assert!(favorites.add(" Izmir ").unwrap());
        assert!(!favorites.add("Ankara").unwrap());
        assert!(!favorites.add("   ").unwrap());

        assert_eq!(favorites.list(), vec!["Ankara", "Izmir"]);
        assert!(favorites.contains("Izmir"));
    }

    #[test]
    fn test_remove() {
        let favorites = Favorites::new(Storage::memory());
        favorites.add("Ankara").unwrap();
        favorites.add("Izmir").unwrap();

        assert!(favorites.remove("Ankara").unwrap());
        assert!(!favorites.remove("Bursa").unwrap());
        assert_eq!(favorites.list(), vec!["Izmir"]);
    }

    #[test]
    fn test_corrupt_list_reads_as_empty() {
        let storage = Storage::memory();
        storage.set(FAVORITES_KEY, &serde_json::json!({"not": "a list"})).unwrap();
        let favorites = Favorites::new(storage);

        assert!(favorites.list().is_empty());
        assert!(favorites.add("Ankara").unwrap());
        assert_eq!(favorites.list(), vec!["Ankara"]);
    }

    #[test]
    fn test_shared_storage_sees_same_list() {
        let storage = Storage::memory();
        Favorites::new(storage.clone()).add("Antalya").unwrap();
        assert_eq!(Favorites::new(storage).list(), vec!["Antalya"]);
    }
}
