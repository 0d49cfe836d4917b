//! Streaming JSON array writer
//!
//! Records are appended one at a time as `{...},` so that, between the
//! opening bracket and finalization, the sink always ends with a complete
//! object followed by a comma. [`JsonArrayWriter::finalize`] steps back over
//! that last comma and closes the array.
//!
//! ```text
//! open      [
//! append    [{"id":"1"},
//! append    [{"id":"1"},{"id":"2"},
//! finalize  [{"id":"1"},{"id":"2"}]\n
//! ```

use serde::Serialize;
use std::io::SeekFrom;
use tokio::io::{AsyncSeek, AsyncSeekExt, AsyncWrite, AsyncWriteExt};

use crate::utils::error::PipelineError;

/// Append-only JSON array over a seekable sink
///
/// Not shared: exactly one task owns the writer for the whole run.
#[derive(Debug)]
pub struct JsonArrayWriter<W> {
    inner: W,
    records: usize,
}

impl<W> JsonArrayWriter<W>
where
    W: AsyncWrite + AsyncSeek + Unpin + Send,
{
    /// Write the opening bracket and take ownership of the sink
    pub async fn open(mut inner: W) -> Result<Self, PipelineError> {
        inner.write_all(b"[").await?;
        Ok(Self { inner, records: 0 })
    }

    /// Append one record followed by a comma
    ///
    /// The record is encoded into a buffer first, so trailing whitespace
    /// from the encoder never reaches the sink and the write is one call.
    pub async fn append<T: Serialize + ?Sized>(&mut self, record: &T) -> Result<(), PipelineError> {
        let mut buf = serde_json::to_vec(record)?;
        while buf.last().is_some_and(u8::is_ascii_whitespace) {
            buf.pop();
        }
        buf.push(b',');

        self.inner.write_all(&buf).await?;
        self.records += 1;
        Ok(())
    }

    /// Number of records appended so far
    pub fn records(&self) -> usize {
        self.records
    }

    /// Replace the trailing comma with `]\n` and flush
    ///
    /// With no records appended the sink only holds `[`, which becomes
    /// `[]\n`. Returns the sink so the caller can sync it.
    pub async fn finalize(mut self) -> Result<W, PipelineError> {
        if self.records > 0 {
            self.inner.seek(SeekFrom::Current(-1)).await?;
        }
        self.inner.write_all(b"]\n").await?;
        self.inner.flush().await?;
        Ok(self.inner)
    }

    /// Give the sink back without closing the array
    pub async fn abandon(mut self) -> Result<W, PipelineError> {
        self.inner.flush().await?;
        Ok(self.inner)
    }
}
