//! Fixed-size page views over large result sequences.
//!
//! A [`Pagination`] is a value object: the page's items are fetched once and
//! cached for its lifetime, and all navigation metadata is derived from
//! `page`, `per_page`, and the (optionally known) total count.
//!
//! Input policy is *reject*, never clamp: a zero `page` or `per_page` is an
//! [`Error::InvalidPagination`]. A page past the end of the sequence is not
//! an error; it yields no items and `has_next() == false`.

use crate::error::{Error, Result};
use serde::Serialize;
use serde::ser::SerializeStruct;

pub(crate) fn check_params(page: u64, per_page: u64) -> Result<()> {
    if page == 0 || per_page == 0 {
        return Err(Error::InvalidPagination { page, per_page });
    }
    Ok(())
}

/// A 1-indexed, fixed-size view over a larger sequence.
#[derive(Debug)]
pub struct Pagination<T> {
    items: Vec<T>,
    page: u64,
    per_page: u64,
    total: Option<u64>,
}

impl<T> Pagination<T> {
    /// Wraps items already sliced to one page. `total`, when known, drives
    /// `has_next` and `pages`; when `None` both degrade to `false` / `None`.
    pub fn new(items: Vec<T>, page: u64, per_page: u64, total: Option<u64>) -> Result<Self> {
        check_params(page, per_page)?;
        Ok(Self {
            items,
            page,
            per_page,
            total,
        })
    }

    /// Slices one page out of a full in-memory sequence. The total is the
    /// sequence length.
    pub fn from_items(items: Vec<T>, page: u64, per_page: u64) -> Result<Self> {
        check_params(page, per_page)?;
        let total = items.len() as u64;
        let offset = usize::try_from((page - 1).saturating_mul(per_page)).unwrap_or(usize::MAX);
        let take = usize::try_from(per_page).unwrap_or(usize::MAX);
        let items = items.into_iter().skip(offset).take(take).collect();

        Ok(Self {
            items,
            page,
            per_page,
            total: Some(total),
        })
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn into_items(self) -> Vec<T> {
        self.items
    }

    pub fn page(&self) -> u64 {
        self.page
    }

    pub fn per_page(&self) -> u64 {
        self.per_page
    }

    /// Total number of items across all pages, if known.
    pub fn total(&self) -> Option<u64> {
        self.total
    }

    /// Total number of pages, if the total is known.
    pub fn pages(&self) -> Option<u64> {
        self.total.map(|total| total.div_ceil(self.per_page))
    }

    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    /// `true` iff `page * per_page < total`. Unknown total degrades to
    /// `false`.
    pub fn has_next(&self) -> bool {
        self.total
            .is_some_and(|total| self.page.saturating_mul(self.per_page) < total)
    }

    pub fn prev_page(&self) -> Option<u64> {
        self.has_prev().then(|| self.page - 1)
    }

    pub fn next_page(&self) -> Option<u64> {
        self.has_next().then(|| self.page + 1)
    }

    /// Page numbers for a pagination control, `None` marking a gap: the
    /// first `left_edge` pages, a `left_current`/`right_current` window
    /// around the current page, and the last `right_edge` pages. Empty when
    /// the total is unknown.
    pub fn iter_pages(
        &self,
        left_edge: u64,
        left_current: u64,
        right_current: u64,
        right_edge: u64,
    ) -> impl Iterator<Item = Option<u64>> + use<T> {
        let pages = self.pages().unwrap_or(0);
        let page = self.page;

        let mut out = Vec::new();
        let mut last = 0;
        for num in 1..=pages {
            let in_left_edge = num <= left_edge;
            let in_window = num + left_current >= page && num < page + right_current;
            let in_right_edge = num + right_edge > pages;
            if in_left_edge || in_window || in_right_edge {
                if last + 1 != num {
                    out.push(None);
                }
                out.push(Some(num));
                last = num;
            }
        }

        out.into_iter()
    }
}

impl<T: Clone> Pagination<T> {
    /// Paginates an ordered list embedded in a parent document, slicing the
    /// pre-loaded list in memory.
    ///
    /// The total is resolved in priority order: the explicit `total`
    /// argument, then the document's [`maintained_count`], then the list
    /// length. The first two are trusted even when they disagree with the
    /// actual list length.
    ///
    /// [`maintained_count`]: ListField::maintained_count
    pub fn for_list_field<D>(doc: &D, page: u64, per_page: u64, total: Option<u64>) -> Result<Self>
    where
        D: ListField<T>,
    {
        check_params(page, per_page)?;
        let items = doc.field_items();
        let total = total
            .or_else(|| doc.maintained_count())
            .unwrap_or(items.len() as u64);

        let offset = usize::try_from((page - 1).saturating_mul(per_page)).unwrap_or(usize::MAX);
        let take = usize::try_from(per_page).unwrap_or(usize::MAX);
        let start = offset.min(items.len());
        let end = offset.saturating_add(take).min(items.len());

        Ok(Self {
            items: items[start..end].to_vec(),
            page,
            per_page,
            total: Some(total),
        })
    }
}

/// An ordered list embedded in a single parent document.
///
/// `maintained_count` exposes a counter the document keeps alongside the
/// list, if any. It takes precedence over the list length when resolving the
/// total, but nothing guarantees the two agree; treat it as a hint the
/// application maintains.
pub trait ListField<T> {
    fn field_items(&self) -> &[T];

    fn maintained_count(&self) -> Option<u64> {
        None
    }
}

impl<T: Serialize> Serialize for Pagination<T> {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("Pagination", 7)?;
        state.serialize_field("items", &self.items)?;
        state.serialize_field("page", &self.page)?;
        state.serialize_field("per_page", &self.per_page)?;
        state.serialize_field("total", &self.total)?;
        state.serialize_field("pages", &self.pages())?;
        state.serialize_field("has_prev", &self.has_prev())?;
        state.serialize_field("has_next", &self.has_next())?;
        state.end()
    }
}
