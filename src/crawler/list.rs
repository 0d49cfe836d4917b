//! Photostream listing with pagination
//!
//! This module walks the paginated search endpoint from page 1 until the
//! service reports the last page, accumulating every photo summary.

use thiserror::Error;

use crate::crawler::PageSource;
use crate::models::PhotoSummary;
use crate::utils::error::FetchError;

/// A listing that stopped on a failed page
///
/// Carries the summaries gathered before the failure; callers decide
/// whether to use or discard them.
#[derive(Error, Debug)]
#[error("Listing stopped at page {page}: {source}")]
pub struct PartialListing {
    /// Page that failed
    pub page: u32,

    /// Summaries from the pages before it
    pub photos: Vec<PhotoSummary>,

    #[source]
    pub source: FetchError,
}

/// Sequential photostream lister
pub struct PhotoLister<S> {
    source: S,
}

impl<S: PageSource> PhotoLister<S> {
    /// Create new lister over a page source
    #[must_use]
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// Fetch every page and return all summaries in listing order
    ///
    /// Pages are requested one at a time starting at 1. Listing stops once
    /// the page number reported by the service reaches the reported page
    /// count, so an empty photostream (`pages == 0`) ends after one call.
    ///
    /// # Errors
    ///
    /// Returns [`PartialListing`] as soon as any page fails; nothing is retried
    pub async fn fetch_all(&self) -> Result<Vec<PhotoSummary>, PartialListing> {
        let mut photos = Vec::new();
        let mut page = 1;

        loop {
            let listing = match self.source.fetch_page(page).await {
                Ok(listing) => listing,
                Err(source) => {
                    tracing::warn!(page, error = %source, "Failed to fetch list page");
                    return Err(PartialListing {
                        page,
                        photos,
                        source,
                    });
                }
            };

            let count = listing.photos.len();
            photos.extend(listing.photos);

            tracing::info!(
                page,
                photos = count,
                total_pages = listing.pages,
                "Got page of photos"
            );

            if listing.page >= listing.pages {
                break;
            }

            page += 1;
        }

        tracing::info!(pages = page, total = photos.len(), "Completed photo listing");

        Ok(photos)
    }

    /// Borrow the underlying page source
    pub fn source(&self) -> &S {
        &self.source
    }
}
