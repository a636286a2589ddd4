//! Process-lifetime storage for the admin and operator areas.
//!
//! Everything here resets on restart; real persistence is out of scope.
//! Ids are handed out by a single mutex-guarded monotonic counter so
//! concurrent writers can no longer mint the same id.

use std::sync::Mutex;

use chrono::NaiveDate;

use crate::model::{NewsItem, Operator};
use crate::ports::PortError;

struct Inner {
    next_id: u64,
    news: Vec<NewsItem>,
    operators: Vec<Operator>,
}

/// In-memory store for news items and stall operators.
pub struct MarketStore {
    inner: Mutex<Inner>,
}

impl Default for MarketStore {
    fn default() -> Self {
        Self::new()
    }
}

fn max_numeric_id<'a>(ids: impl Iterator<Item = &'a str>) -> u64 {
    ids.filter_map(|id| id.parse::<u64>().ok())
        .max()
        .unwrap_or(0)
}

impl MarketStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                next_id: 1,
                news: Vec::new(),
                operators: Vec::new(),
            }),
        }
    }

    /// Create a store pre-populated with existing records; the id
    /// counter is seeded past the highest numeric id seen.
    #[must_use]
    pub fn with_seed(news: Vec<NewsItem>, operators: Vec<Operator>) -> Self {
        let highest = max_numeric_id(
            news.iter()
                .map(|item| item.id.as_str())
                .chain(operators.iter().map(|operator| operator.id.as_str())),
        );
        Self {
            inner: Mutex::new(Inner {
                next_id: highest + 1,
                news,
                operators,
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // A poisoned lock only happens after a panic in this module;
        // the data is plain values, so continuing is safe.
        self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// All news items, newest insertion last.
    #[must_use]
    pub fn list_news(&self) -> Vec<NewsItem> {
        self.lock().news.clone()
    }

    /// Create a news item.
    ///
    /// # Errors
    ///
    /// Returns [`PortError::Validation`] when the title is empty.
    pub fn create_news(
        &self,
        title: &str,
        content: &str,
        published_at: NaiveDate,
    ) -> Result<NewsItem, PortError> {
        if title.trim().is_empty() {
            return Err(PortError::Validation(String::from("news title is required")));
        }
        let mut inner = self.lock();
        let id = inner.next_id.to_string();
        inner.next_id += 1;
        let item = NewsItem {
            id,
            title: title.trim().to_owned(),
            content: content.to_owned(),
            published_at,
        };
        inner.news.push(item.clone());
        Ok(item)
    }

    /// Replace the title/content of an existing news item.
    ///
    /// # Errors
    ///
    /// Returns [`PortError::NotFound`] for an unknown id.
    pub fn update_news(&self, id: &str, title: &str, content: &str) -> Result<NewsItem, PortError> {
        let mut inner = self.lock();
        let item = inner
            .news
            .iter_mut()
            .find(|item| item.id == id)
            .ok_or_else(|| PortError::NotFound(format!("news item {id}")))?;
        if !title.trim().is_empty() {
            item.title = title.trim().to_owned();
        }
        item.content = content.to_owned();
        Ok(item.clone())
    }

    /// Delete a news item.
    ///
    /// # Errors
    ///
    /// Returns [`PortError::NotFound`] for an unknown id.
    pub fn delete_news(&self, id: &str) -> Result<(), PortError> {
        let mut inner = self.lock();
        let position = inner
            .news
            .iter()
            .position(|item| item.id == id)
            .ok_or_else(|| PortError::NotFound(format!("news item {id}")))?;
        inner.news.remove(position);
        Ok(())
    }

    /// All registered operators.
    #[must_use]
    pub fn list_operators(&self) -> Vec<Operator> {
        self.lock().operators.clone()
    }

    /// Register a stall operator.
    ///
    /// # Errors
    ///
    /// Returns [`PortError::Validation`] when the name is empty.
    pub fn create_operator(
        &self,
        name: &str,
        category: &str,
        description: &str,
        stall_number: &str,
    ) -> Result<Operator, PortError> {
        if name.trim().is_empty() {
            return Err(PortError::Validation(String::from(
                "operator name is required",
            )));
        }
        let mut inner = self.lock();
        let id = inner.next_id.to_string();
        inner.next_id += 1;
        let operator = Operator {
            id,
            name: name.trim().to_owned(),
            category: category.to_owned(),
            description: description.to_owned(),
            stall_number: stall_number.to_owned(),
            is_open: true,
        };
        inner.operators.push(operator.clone());
        Ok(operator)
    }

    /// Flip an operator's open/closed state.
    ///
    /// # Errors
    ///
    /// Returns [`PortError::NotFound`] for an unknown id.
    pub fn set_operator_open(&self, id: &str, is_open: bool) -> Result<Operator, PortError> {
        let mut inner = self.lock();
        let operator = inner
            .operators
            .iter_mut()
            .find(|operator| operator.id == id)
            .ok_or_else(|| PortError::NotFound(format!("operator {id}")))?;
        operator.is_open = is_open;
        Ok(operator.clone())
    }

    /// Remove an operator.
    ///
    /// # Errors
    ///
    /// Returns [`PortError::NotFound`] for an unknown id.
    pub fn delete_operator(&self, id: &str) -> Result<(), PortError> {
        let mut inner = self.lock();
        let position = inner
            .operators
            .iter()
            .position(|operator| operator.id == id)
            .ok_or_else(|| PortError::NotFound(format!("operator {id}")))?;
        inner.operators.remove(position);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 15).expect("valid date")
    }

    #[test]
    fn ids_are_unique_and_monotonic() {
        let store = MarketStore::new();
        let first = store.create_news("Mercato spostato", "", today()).expect("created");
        let second = store
            .create_operator("Banco Frutta", "food", "", "A12")
            .expect("created");
        assert_eq!(first.id, "1");
        assert_eq!(second.id, "2");
    }

    #[test]
    fn seeded_store_continues_past_existing_ids() {
        let seed = vec![NewsItem {
            id: String::from("41"),
            title: String::from("Avviso"),
            content: String::new(),
            published_at: today(),
        }];
        let store = MarketStore::with_seed(seed, Vec::new());
        let created = store.create_news("Nuovo avviso", "", today()).expect("created");
        assert_eq!(created.id, "42");
    }

    #[test]
    fn missing_title_is_a_validation_error() {
        let store = MarketStore::new();
        let result = store.create_news("  ", "body", today());
        assert!(matches!(result, Err(PortError::Validation(_))));
    }

    #[test]
    fn unknown_id_is_not_found() {
        let store = MarketStore::new();
        assert!(matches!(
            store.delete_news("99"),
            Err(PortError::NotFound(_))
        ));
        assert!(matches!(
            store.set_operator_open("99", false),
            Err(PortError::NotFound(_))
        ));
    }

    #[test]
    fn update_and_delete_round_trip() {
        let store = MarketStore::new();
        let item = store.create_news("Avviso", "vecchio", today()).expect("created");
        let updated = store
            .update_news(&item.id, "Avviso aggiornato", "nuovo")
            .expect("updated");
        assert_eq!(updated.title, "Avviso aggiornato");
        assert_eq!(updated.content, "nuovo");

        store.delete_news(&item.id).expect("deleted");
        assert!(store.list_news().is_empty());
    }
}
