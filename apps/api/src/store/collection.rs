//! Typed collection access on top of a `DocumentStore`.

use std::marker::PhantomData;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::store::{DocumentStore, Filter, FindOptions, Patch, StoreError};

/// A type persisted as one document in a named collection.
pub trait Document: Serialize + DeserializeOwned + Send + Sync {
    const COLLECTION: &'static str;
    /// Field holding the identity of the document. Unique within the collection.
    const KEY_FIELD: &'static str;
    /// Field paths that queries, patches and sorts may reference. Sub-paths of
    /// a listed field are accepted too.
    const FIELDS: &'static [&'static str];

    fn key(&self) -> &str;
}

fn is_known_field<T: Document>(path: &str) -> bool {
    T::FIELDS.iter().any(|field| {
        path == *field
            || path
                .strip_prefix(field)
                .is_some_and(|rest| rest.starts_with('.'))
    })
}

fn check_fields<'a, T: Document>(
    paths: impl IntoIterator<Item = &'a str>,
) -> Result<(), StoreError> {
    for path in paths {
        if !is_known_field::<T>(path) {
            return Err(StoreError::InvalidQuery(format!(
                "unknown field '{path}' for collection '{}'",
                T::COLLECTION
            )));
        }
    }
    Ok(())
}

fn encode<T: Document>(item: &T) -> Result<Value, StoreError> {
    serde_json::to_value(item).map_err(|source| StoreError::Malformed {
        collection: T::COLLECTION.to_string(),
        source,
    })
}

fn decode<T: Document>(document: &Value) -> Result<T, StoreError> {
    T::deserialize(document).map_err(|source| StoreError::Malformed {
        collection: T::COLLECTION.to_string(),
        source,
    })
}

/// Matched documents of one query. Decoding happens lazily on iteration and
/// `iter` can be called any number of times.
pub struct Cursor<T> {
    documents: Vec<Value>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Document> Cursor<T> {
    fn new(documents: Vec<Value>) -> Self {
        Self {
            documents,
            _marker: PhantomData,
        }
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Result<T, StoreError>> + '_ {
        self.documents.iter().map(decode::<T>)
    }

    /// Decodes every document, stopping at the first malformed one.
    pub fn try_collect(&self) -> Result<Vec<T>, StoreError> {
        self.iter().collect()
    }
}

/// Typed CRUD facade over a single collection.
pub struct Collection<T> {
    store: Arc<dyn DocumentStore>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for Collection<T> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            _marker: PhantomData,
        }
    }
}

impl<T: Document> Collection<T> {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            _marker: PhantomData,
        }
    }

    fn key_filter(key: &str) -> Filter {
        Filter::eq(T::KEY_FIELD, key)
    }

    /// Lists the collection with skip/limit/sort. The sort key must be a known
    /// field.
    pub async fn all(&self, options: &FindOptions) -> Result<Cursor<T>, StoreError> {
        if let Some(sort) = &options.sort {
            check_fields::<T>([sort.key.as_str()])?;
        }
        let documents = self
            .store
            .find(T::COLLECTION, &Filter::All, options)
            .await?;
        Ok(Cursor::new(documents))
    }

    pub async fn filter(&self, filter: &Filter) -> Result<Cursor<T>, StoreError> {
        check_fields::<T>(filter.field_paths())?;
        let documents = self
            .store
            .find(T::COLLECTION, filter, &FindOptions::default())
            .await?;
        Ok(Cursor::new(documents))
    }

    /// Exactly one match, or `NotFound` / `AmbiguousResult`.
    pub async fn one(&self, filter: &Filter) -> Result<T, StoreError> {
        let cursor = self.filter(filter).await?;
        match cursor.len() {
            0 => Err(StoreError::not_found(T::COLLECTION, filter)),
            1 => cursor
                .iter()
                .next()
                .unwrap_or_else(|| Err(StoreError::not_found(T::COLLECTION, filter))),
            count => Err(StoreError::AmbiguousResult {
                collection: T::COLLECTION.to_string(),
                filter: filter.to_string(),
                count,
            }),
        }
    }

    /// Like `one`, with no match reported as `None`.
    pub async fn one_or_none(&self, filter: &Filter) -> Result<Option<T>, StoreError> {
        match self.one(filter).await {
            Ok(item) => Ok(Some(item)),
            Err(StoreError::NotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Stores `item` in place of every document sharing its key.
    pub async fn replace(&self, item: &T) -> Result<(), StoreError> {
        let removed = self.delete_many(&Self::key_filter(item.key())).await?;
        if removed > 0 {
            debug!("Replacing '{}' in '{}'", item.key(), T::COLLECTION);
        }
        self.add(item).await
    }

    pub async fn add(&self, item: &T) -> Result<(), StoreError> {
        let existing = self
            .store
            .count(T::COLLECTION, &Self::key_filter(item.key()))
            .await?;
        if existing > 0 {
            return Err(StoreError::DuplicateKey {
                collection: T::COLLECTION.to_string(),
                field: T::KEY_FIELD.to_string(),
                key: item.key().to_string(),
            });
        }

        self.store.insert_one(T::COLLECTION, encode(item)?).await?;
        debug!("Added '{}' to '{}'", item.key(), T::COLLECTION);
        Ok(())
    }

    /// Applies `patch` to the first match and reports whether one matched.
    ///
    /// With `expect_modified` a missing match is `NotFound`; without it the
    /// call returns `Ok(false)` and writes nothing.
    pub async fn update_one(
        &self,
        filter: &Filter,
        patch: &Patch,
        expect_modified: bool,
    ) -> Result<bool, StoreError> {
        check_fields::<T>(filter.field_paths())?;
        check_fields::<T>(patch.paths())?;

        let matched = self.store.update_one(T::COLLECTION, filter, patch).await?;
        if matched == 0 {
            if expect_modified {
                return Err(StoreError::not_found(T::COLLECTION, filter));
            }
            debug!("No document in '{}' matched {filter}; update skipped", T::COLLECTION);
            return Ok(false);
        }
        Ok(true)
    }

    pub async fn delete(&self, item: &T) -> Result<u64, StoreError> {
        self.store
            .delete_one(T::COLLECTION, &Self::key_filter(item.key()))
            .await
    }

    pub async fn delete_many(&self, filter: &Filter) -> Result<u64, StoreError> {
        check_fields::<T>(filter.field_paths())?;
        self.store.delete_many(T::COLLECTION, filter).await
    }

    pub async fn count(&self, filter: &Filter) -> Result<u64, StoreError> {
        check_fields::<T>(filter.field_paths())?;
        self.store.count(T::COLLECTION, filter).await
    }
}
