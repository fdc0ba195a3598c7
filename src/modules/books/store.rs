//! In-memory book storage.
//!
//! The whole catalog sits behind one async mutex, held for the full duration
//! of every operation.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Mutex;

use super::models::{Author, Book};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("last book id '{id}' is not numeric")]
    NonNumericId { id: String },

    #[error("no book id left after '{id}'")]
    IdSpaceExhausted { id: String },
}

/// Shared handle to the ordered book list. Clones share the same list.
#[derive(Clone, Default)]
pub struct BookStore {
    books: Arc<Mutex<Vec<Book>>>,
}

impl BookStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_books(books: Vec<Book>) -> Self {
        Self {
            books: Arc::new(Mutex::new(books)),
        }
    }

    /// Append the two sample records the service starts with.
    pub async fn seed_sample_data(&self) {
        self.books.lock().await.extend(sample_books());
    }

    pub async fn len(&self) -> usize {
        self.books.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.books.lock().await.is_empty()
    }

    /// Sort the store by ID string in place and return a snapshot of it.
    /// The order is lexicographic, so `"10"` lands before `"2"`.
    pub async fn list(&self) -> Vec<Book> {
        let mut books = self.books.lock().await;
        books.sort_by(|a, b| a.id.cmp(&b.id));
        books.clone()
    }

    pub async fn get(&self, id: &str) -> Option<Book> {
        self.books
            .lock()
            .await
            .iter()
            .find(|book| book.id == id)
            .cloned()
    }

    /// Assign the next ID to `book`, append it and return the stored copy.
    pub async fn create(&self, mut book: Book) -> Result<Book, StoreError> {
        let mut books = self.books.lock().await;
        book.id = next_id(&books)?;
        books.push(book.clone());
        Ok(book)
    }

    /// Replace the record with `id` by `book`, keeping `id`. The replacement
    /// goes to the end of the list. `None` if no record matches.
    pub async fn update(&self, id: &str, mut book: Book) -> Option<Book> {
        let mut books = self.books.lock().await;
        let index = books.iter().position(|existing| existing.id == id)?;
        let previous = books.remove(index);

        book.id = previous.id;
        books.push(book.clone());
        Some(book)
    }

    /// Remove the first record with `id`, keeping the others in order.
    pub async fn delete(&self, id: &str) -> Option<Book> {
        let mut books = self.books.lock().await;
        let index = books.iter().position(|book| book.id == id)?;
        Some(books.remove(index))
    }
}

pub fn sample_books() -> Vec<Book> {
    vec![
        Book {
            id: "1".to_string(),
            isbn: "1111".to_string(),
            title: "My Book".to_string(),
            author: Some(Author::new("John", "Doe")),
        },
        Book {
            id: "2".to_string(),
            isbn: "2222".to_string(),
            title: "The Better Book".to_string(),
            author: Some(Author::new("Will", "Smith")),
        },
    ]
}

fn parse_id(id: &str) -> Option<i64> {
    id.parse().ok()
}

/// One past the last record's ID. Updates park records at the end and the
/// string sort puts `"9"` after `"10"`, so the last ID can be lower than
/// another one in the store; the highest wins.
fn next_id(books: &[Book]) -> Result<String, StoreError> {
    let Some(last) = books.last() else {
        return Ok("1".to_string());
    };

    let last_id = parse_id(&last.id).ok_or_else(|| StoreError::NonNumericId {
        id: last.id.clone(),
    })?;
    let highest = books
        .iter()
        .filter_map(|book| parse_id(&book.id))
        .fold(last_id, i64::max);

    highest
        .checked_add(1)
        .map(|id| id.to_string())
        .ok_or_else(|| StoreError::IdSpaceExhausted {
            id: highest.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn titled(title: &str) -> Book {
        Book {
            title: title.to_string(),
            ..Book::default()
        }
    }

    fn ids(books: &[Book]) -> Vec<&str> {
        books.iter().map(|book| book.id.as_str()).collect()
    }

    async fn seeded() -> BookStore {
        let store = BookStore::new();
        store.seed_sample_data().await;
        store
    }

    #[tokio::test]
    async fn creates_increment_the_last_id() {
        let store = seeded().await;

        for expected in ["3", "4", "5"] {
            let book = store.create(titled("X")).await.unwrap();
            assert_eq!(book.id, expected);
        }
        assert_eq!(store.len().await, 5);
    }

    #[tokio::test]
    async fn create_ignores_client_supplied_id() {
        let store = seeded().await;
        let mut book = titled("X");
        book.id = "99".to_string();

        assert_eq!(store.create(book).await.unwrap().id, "3");
    }

    #[tokio::test]
    async fn create_into_empty_store_starts_at_one() {
        let store = BookStore::new();
        assert!(store.is_empty().await);

        assert_eq!(store.create(titled("first")).await.unwrap().id, "1");
        assert_eq!(store.create(titled("second")).await.unwrap().id, "2");
    }

    #[tokio::test]
    async fn create_after_non_numeric_last_id_fails() {
        let mut books = sample_books();
        books.push(Book {
            id: "abc".to_string(),
            ..Book::default()
        });
        let store = BookStore::with_books(books);

        assert_eq!(
            store.create(titled("X")).await,
            Err(StoreError::NonNumericId {
                id: "abc".to_string()
            })
        );
        assert_eq!(store.len().await, 3);
    }

    #[tokio::test]
    async fn create_at_the_top_of_the_id_space_fails() {
        let store = BookStore::with_books(vec![Book {
            id: i64::MAX.to_string(),
            ..Book::default()
        }]);

        assert!(matches!(
            store.create(titled("X")).await,
            Err(StoreError::IdSpaceExhausted { .. })
        ));
    }

    #[tokio::test]
    async fn create_after_update_does_not_reuse_an_id() {
        let store = seeded().await;
        store.update("1", titled("moved")).await.unwrap();

        // The list is now [2, 1]; a naive last+1 would hand out "2" again.
        let created = store.create(titled("X")).await.unwrap();
        assert_eq!(created.id, "3");
    }

    #[tokio::test]
    async fn create_after_string_sort_does_not_reuse_an_id() {
        let store = BookStore::with_books(
            (1..=10)
                .map(|id| Book {
                    id: id.to_string(),
                    ..Book::default()
                })
                .collect(),
        );

        let listed = store.list().await;
        assert_eq!(listed.last().unwrap().id, "9");

        // "9" is last after sorting; last+1 alone would hand out "10" twice.
        assert_eq!(store.create(titled("X")).await.unwrap().id, "11");
    }

    #[tokio::test]
    async fn list_sorts_in_place_by_id_string() {
        let store = BookStore::with_books(
            ["10", "2", "x", "1", "9"]
                .into_iter()
                .map(|id| Book {
                    id: id.to_string(),
                    ..Book::default()
                })
                .collect(),
        );

        let listed = store.list().await;
        assert_eq!(ids(&listed), ["1", "10", "2", "9", "x"]);

        // The next create sees "x" last, proving the sort stuck.
        assert!(store.create(titled("X")).await.is_err());
    }

    #[tokio::test]
    async fn get_returns_the_stored_record() {
        let store = seeded().await;

        assert_eq!(store.get("2").await, Some(sample_books()[1].clone()));
        assert_eq!(store.get("42").await, None);
    }

    #[tokio::test]
    async fn update_keeps_id_and_moves_record_to_the_end() {
        let store = seeded().await;
        store.create(titled("third")).await.unwrap();

        let mut replacement = titled("Y");
        replacement.id = "77".to_string();
        let updated = store.update("1", replacement).await.unwrap();

        assert_eq!(updated.id, "1");
        assert_eq!(updated.title, "Y");
        assert_eq!(updated.author, None);
        assert_eq!(store.get("1").await, Some(updated));
        assert_eq!(store.get("77").await, None);

        let books = store.books.lock().await;
        assert_eq!(ids(&books), ["2", "3", "1"]);
    }

    #[tokio::test]
    async fn update_of_missing_record_changes_nothing() {
        let store = seeded().await;

        assert_eq!(store.update("9", titled("Y")).await, None);
        assert_eq!(store.list().await, sample_books());
    }

    #[tokio::test]
    async fn delete_removes_only_the_first_match() {
        let store = BookStore::with_books(
            [("1", "a"), ("2", "b"), ("2", "c"), ("3", "d")]
                .into_iter()
                .map(|(id, title)| Book {
                    id: id.to_string(),
                    title: title.to_string(),
                    ..Book::default()
                })
                .collect(),
        );

        let removed = store.delete("2").await.unwrap();
        assert_eq!(removed.title, "b");

        let books = store.books.lock().await;
        let remaining: Vec<_> = books.iter().map(|b| b.title.as_str()).collect();
        assert_eq!(remaining, ["a", "c", "d"]);
    }

    #[tokio::test]
    async fn delete_of_missing_record_is_a_no_op() {
        let store = seeded().await;

        assert_eq!(store.delete("9").await, None);
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn concurrent_creates_hand_out_distinct_ids() {
        let store = seeded().await;

        let handles: Vec<_> = (0..32)
            .map(|n| {
                let store = store.clone();
                tokio::spawn(async move { store.create(titled(&n.to_string())).await })
            })
            .collect();

        let mut assigned = Vec::new();
        for handle in handles {
            assigned.push(handle.await.unwrap().unwrap().id);
        }
        assigned.sort();
        assigned.dedup();

        assert_eq!(assigned.len(), 32);
        assert_eq!(store.len().await, 34);
    }
}
