//! Lazy query building over mapped collections.
//!
//! A [`QuerySet`] accumulates a filter document plus skip/limit/sort options
//! and defers execution until a terminal operation runs. On top of the plain
//! terminals it adds the HTTP-flavored lookups (`get_or_404`, `first_or_404`)
//! and query-backed pagination.

use crate::error::{Error, Result};
use crate::pagination::{self, Pagination};
use futures_util::TryStreamExt;
use mongodb::bson::{self, Document, doc};
use mongodb::{Collection, Database};
use serde::{Serialize, de::DeserializeOwned};
use std::marker::PhantomData;

/// A serde-mapped document type bound to one collection.
pub trait Entity: DeserializeOwned + Serialize + Send + Sync + Unpin + Sized + 'static {
    type Id: Serialize + Send;

    const COLLECTION_NAME: &'static str;

    fn collection(db: &Database) -> Collection<Self> {
        db.collection(Self::COLLECTION_NAME)
    }

    /// Fresh, unfiltered queryset over this entity's collection.
    fn objects(db: &Database) -> QuerySet<Self> {
        QuerySet::new(Self::collection(db))
    }
}

pub trait Filter<E>: Send {
    fn to_document(&self) -> Document;
}

#[derive(Debug)]
pub struct FilterById<E: Entity>(E::Id, PhantomData<E>);

pub fn by_id<E: Entity>(id: E::Id) -> FilterById<E> {
    FilterById(id, PhantomData)
}

impl<E: Entity> Filter<E> for FilterById<E> {
    fn to_document(&self) -> Document {
        doc! { "_id": bson::to_bson(&self.0).unwrap() }
    }
}

/// Raw filter documents pass through unchanged.
impl<E: Send> Filter<E> for Document {
    fn to_document(&self) -> Document {
        self.clone()
    }
}

#[derive(Clone, Copy, Debug)]
pub enum Order {
    Asc,
    Desc,
}

#[derive(Debug)]
pub struct QuerySet<E: Entity> {
    collection: Collection<E>,
    filter: Document,
    skip: Option<u64>,
    limit: Option<i64>,
    sort: Option<Document>,
}

// Manual impl: `Collection` clones cheaply and `E` itself need not be Clone.
impl<E: Entity> Clone for QuerySet<E> {
    fn clone(&self) -> Self {
        Self {
            collection: self.collection.clone(),
            filter: self.filter.clone(),
            skip: self.skip,
            limit: self.limit,
            sort: self.sort.clone(),
        }
    }
}

impl<E: Entity> QuerySet<E> {
    pub fn new(collection: Collection<E>) -> Self {
        Self {
            collection,
            filter: Document::new(),
            skip: None,
            limit: None,
            sort: None,
        }
    }

    /// Merges `filter`'s conditions into the accumulated filter document.
    pub fn filter(mut self, filter: impl Filter<E>) -> Self {
        self.filter.extend(filter.to_document());
        self
    }

    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = Some(skip);
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn order_by(mut self, field: &str, order: Order) -> Self {
        let sort = self.sort.get_or_insert_with(Document::new);
        sort.insert(
            field,
            match order {
                Order::Asc => 1,
                Order::Desc => -1,
            },
        );
        self
    }

    pub async fn all(self) -> Result<Vec<E>> {
        let mut query = self.collection.find(self.filter);

        if let Some(skip) = self.skip {
            query = query.skip(skip);
        }

        if let Some(limit) = self.limit {
            query = query.limit(limit);
        }

        if let Some(sort) = self.sort {
            query = query.sort(sort);
        }

        let entities = query.await?.try_collect().await?;

        Ok(entities)
    }

    pub async fn first(self) -> Result<Option<E>> {
        let mut query = self.collection.find_one(self.filter);

        if let Some(skip) = self.skip {
            query = query.skip(skip);
        }

        if let Some(sort) = self.sort {
            query = query.sort(sort);
        }

        let entity = query.await?;

        Ok(entity)
    }

    /// Number of documents matching the filter. Skip and limit do not apply.
    pub async fn count(self) -> Result<u64> {
        let count = self.collection.count_documents(self.filter).await?;

        Ok(count)
    }

    pub async fn exists(self) -> Result<bool> {
        let count = self.count().await?;

        Ok(count > 0)
    }

    /// Exactly-one lookup: [`Error::NotFound`] on zero matches,
    /// [`Error::MultipleResultsFound`] on more than one.
    pub async fn get(self) -> Result<E> {
        one_or_fail(self.limit(2).all().await?)
    }

    /// [`get`](Self::get), for handlers: the miss renders as an HTTP 404 at
    /// the response boundary. Ambiguity and driver errors propagate
    /// unchanged.
    pub async fn get_or_404(self) -> Result<E> {
        self.get().await
    }

    /// [`get_or_404`](Self::get_or_404) with a caller-supplied 404 body.
    pub async fn get_or_404_msg(self, message: impl Into<String> + Send) -> Result<E> {
        with_404_message(self.get().await, message)
    }

    /// First-or-none lookup, the miss rendering as an HTTP 404.
    pub async fn first_or_404(self) -> Result<E> {
        some_or_404(self.first().await?)
    }

    /// [`first_or_404`](Self::first_or_404) with a caller-supplied 404 body.
    pub async fn first_or_404_msg(self, message: impl Into<String> + Send) -> Result<E> {
        with_404_message(some_or_404(self.first().await?), message)
    }

    /// Runs a count query for the total, then fetches the requested page.
    pub async fn paginate(self, page: u64, per_page: u64) -> Result<Pagination<E>> {
        pagination::check_params(page, per_page)?;
        let total = self.clone().count().await?;

        self.paginate_with_total(page, per_page, total).await
    }

    /// Fetches one page against a total the caller already knows, skipping
    /// the extra count query.
    pub async fn paginate_with_total(
        self,
        page: u64,
        per_page: u64,
        total: u64,
    ) -> Result<Pagination<E>> {
        pagination::check_params(page, per_page)?;
        let offset = (page - 1).saturating_mul(per_page);
        let limit = i64::try_from(per_page).unwrap_or(i64::MAX);
        let items = self.skip(offset).limit(limit).all().await?;

        Pagination::new(items, page, per_page, Some(total))
    }
}

// Post-fetch resolution for the exactly-one contract, over a limit-2 fetch.
fn one_or_fail<E>(mut matches: Vec<E>) -> Result<E> {
    if matches.len() > 1 {
        return Err(Error::MultipleResultsFound);
    }

    matches.pop().ok_or_else(Error::not_found)
}

fn some_or_404<E>(entity: Option<E>) -> Result<E> {
    entity.ok_or_else(Error::not_found)
}

/// Attaches the caller's 404 body to a miss; every other outcome passes
/// through unchanged.
fn with_404_message<E>(result: Result<E>, message: impl Into<String>) -> Result<E> {
    match result {
        Err(Error::NotFound { .. }) => Err(Error::not_found_msg(message)),
        other => other,
    }
}
