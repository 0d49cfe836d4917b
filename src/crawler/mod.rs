//! Photostream crawling
//!
//! This module ties the stages together: list every photo, enrich each one
//! through a pool of detail workers, and stream the results into a single
//! JSON array file.
//!
//! The remote API is reached through two seams, [`PageSource`] and
//! [`DetailSource`], implemented by [`fetcher::FlickrFetcher`].

pub mod fetcher;
pub mod list;
pub mod pipeline;

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::watch;

use crate::config::Config;
use crate::error::Result;
use crate::models::{PhotoInfo, PhotoSummary, RunSummary, SearchPage};
use crate::storage::JsonArrayWriter;
use crate::utils::error::{FetchError, PipelineError};

use self::fetcher::FlickrFetcher;
use self::list::PhotoLister;
use self::pipeline::PhotoPipeline;

/// Paginated listing collaborator
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Fetch one 1-based page of summaries
    async fn fetch_page(&self, page: u32) -> std::result::Result<SearchPage, FetchError>;
}

/// Per-photo detail collaborator
#[async_trait]
pub trait DetailSource: Send + Sync {
    /// Fetch the enriched record for one summary
    async fn fetch_detail(
        &self,
        summary: &PhotoSummary,
    ) -> std::result::Result<PhotoInfo, FetchError>;
}

#[async_trait]
impl<'a, T: PageSource + ?Sized> PageSource for &'a T {
    async fn fetch_page(&self, page: u32) -> std::result::Result<SearchPage, FetchError> {
        (**self).fetch_page(page).await
    }
}

/// Main crawler: runs a whole list, enrich and save cycle
pub struct Crawler<P, D> {
    /// Listing collaborator
    pages: P,

    /// Detail collaborator, shared by every worker
    details: Arc<D>,

    /// Configuration
    config: Config,

    /// Abort signal observed by every pipeline stage
    abort: watch::Sender<bool>,
}

impl Crawler<FlickrFetcher, FlickrFetcher> {
    /// Create a crawler that talks to the Flickr API
    pub fn new(config: Config) -> Result<Self> {
        let fetcher = FlickrFetcher::with_config(&config.flickr)?;
        Self::with_sources(config, fetcher.clone(), fetcher)
    }
}

impl<P, D> Crawler<P, D>
where
    P: PageSource,
    D: DetailSource + 'static,
{
    /// Create a crawler over arbitrary collaborators
    pub fn with_sources(config: Config, pages: P, details: D) -> Result<Self> {
        config.validate()?;
        let (abort, _) = watch::channel(false);

        Ok(Self {
            pages,
            details: Arc::new(details),
            config,
            abort,
        })
    }

    /// Handle that cancels a running crawl when triggered
    pub fn abort_handle(&self) -> AbortHandle {
        AbortHandle {
            abort: self.abort.clone(),
        }
    }

    /// Run the full crawl
    ///
    /// Lists every photo, then, if there is at least one, creates the
    /// output file and runs the worker pipeline into it. With nothing
    /// listed no file is created or touched.
    ///
    /// # Errors
    ///
    /// Listing failures, detail failures in abort mode, output I/O
    /// failures and cancellation are all fatal. A failed run may leave a
    /// truncated, unclosed JSON array behind.
    pub async fn run(&self) -> Result<RunSummary> {
        tracing::info!(
            user_id = %self.config.flickr.user_id,
            "Fetching photo data from Flickr"
        );

        let lister = PhotoLister::new(&self.pages);
        let mut abort_rx = self.abort.subscribe();
        let listed = tokio::select! {
            listed = lister.fetch_all() => listed,
            _ = pipeline::abort_requested(&mut abort_rx) => {
                return Err(PipelineError::Cancelled.into());
            }
        };

        let photos = listed.map_err(|e| {
            tracing::error!(
                page = e.page,
                discarded = e.photos.len(),
                "Listing failed, discarding partial results"
            );
            PipelineError::Listing(e.source)
        })?;

        if photos.is_empty() {
            tracing::info!("Got no photos");
            return Ok(RunSummary::default());
        }

        let path = self.config.output.path.as_path();
        let writer = Self::create_output(path).await?;

        let pipeline = PhotoPipeline::new(
            self.config.pipeline.clone(),
            Arc::clone(&self.details),
            self.abort.clone(),
        );
        let (mut summary, file) = pipeline.run(photos, writer).await?;
        file.sync_all().await.map_err(PipelineError::Io)?;
        summary.output = Some(path.to_path_buf());

        tracing::info!(
            saved = summary.saved,
            failed = summary.failed.len(),
            output = %path.display(),
            "Saved details for photos"
        );

        Ok(summary)
    }

    async fn create_output(path: &Path) -> Result<JsonArrayWriter<tokio::fs::File>> {
        let file = tokio::fs::File::create(path)
            .await
            .map_err(PipelineError::Io)?;
        let writer = JsonArrayWriter::open(file).await?;
        Ok(writer)
    }
}

/// Cancels a running crawl from another task
#[derive(Debug, Clone)]
pub struct AbortHandle {
    abort: watch::Sender<bool>,
}

impl AbortHandle {
    /// Ask every stage to stop at its next suspension point
    pub fn abort(&self) {
        self.abort.send_replace(true);
    }

    pub fn is_aborted(&self) -> bool {
        *self.abort.borrow()
    }
}
