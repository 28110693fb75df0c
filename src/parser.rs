//! Delimiter sniffing and row streaming.
//!
//! The whole input is buffered before parsing because the delimiter is
//! chosen from the full content. Rows are then read one at a time.

use crate::{CatalogError, CatalogResult};
use csv_async::{AsyncReader, AsyncReaderBuilder, StringRecord};
use futures::Stream;
use serde::Serialize;
use std::fmt::Display;
use std::future::Future;
use std::io::Cursor;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Field separator of an ingested file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Delimiter {
    Comma,
    Semicolon,
}

impl Delimiter {
    pub fn as_byte(self) -> u8 {
        match self {
            Delimiter::Comma => b',',
            Delimiter::Semicolon => b';',
        }
    }

    /// Semicolon files may carry `#` comment lines.
    pub fn comment(self) -> Option<u8> {
        match self {
            Delimiter::Comma => None,
            Delimiter::Semicolon => Some(b'#'),
        }
    }
}

/// Semicolon only when the content has `;` and no `,` at all.
pub fn detect_delimiter(content: &[u8]) -> Delimiter {
    let delimiter = if content.contains(&b';') && !content.contains(&b',') {
        Delimiter::Semicolon
    } else {
        Delimiter::Comma
    };
    tracing::debug!(?delimiter, "detected delimiter");
    delimiter
}

/// Outcome of one pass over an input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestSummary {
    pub delimiter: Delimiter,
    pub row_count: usize,
    pub accepted: usize,
    pub rejected: usize,
}

/// Single-pass reader yielding rows as owned fields.
pub struct RowReader {
    rdr: AsyncReader<Cursor<Vec<u8>>>,
    record: StringRecord,
    delimiter: Delimiter,
}

impl RowReader {
    /// Buffer `reader` to the end, sniff the delimiter and prepare the parser.
    pub async fn from_reader<R>(mut reader: R) -> CatalogResult<Self>
    where
        R: AsyncRead + Unpin,
    {
        let mut content = Vec::new();
        reader.read_to_end(&mut content).await?;
        let delimiter = detect_delimiter(&content);

        let rdr = AsyncReaderBuilder::new()
            .has_headers(false)
            .delimiter(delimiter.as_byte())
            .comment(delimiter.comment())
            // every row must be as wide as the first one
            .flexible(false)
            .create_reader(Cursor::new(content));

        Ok(Self {
            rdr,
            record: StringRecord::new(),
            delimiter,
        })
    }

    pub fn delimiter(&self) -> Delimiter {
        self.delimiter
    }

    /// Next row, `Ok(None)` at end of input.
    pub async fn next_row(&mut self) -> CatalogResult<Option<Vec<String>>> {
        if !self.rdr.read_record(&mut self.record).await? {
            return Ok(None);
        }
        Ok(Some(self.record.iter().map(str::to_string).collect()))
    }

    /// The remaining rows as a stream. The first error ends the stream.
    pub fn into_stream(self) -> impl Stream<Item = CatalogResult<Vec<String>>> {
        futures::stream::try_unfold(self, |mut rows| async move {
            Ok::<_, CatalogError>(rows.next_row().await?.map(|row| (row, rows)))
        })
    }
}

/// Feed every row of `reader` to `handler`.
///
/// A handler error is logged and counted as rejected; the pass goes on.
/// Read and format errors end the pass and are returned.
pub async fn for_each_row<R, F, Fut, E>(reader: R, mut handler: F) -> CatalogResult<IngestSummary>
where
    R: AsyncRead + Unpin,
    F: FnMut(Vec<String>) -> Fut,
    Fut: Future<Output = Result<(), E>>,
    E: Display,
{
    let mut rows = RowReader::from_reader(reader).await?;
    let mut summary = IngestSummary {
        delimiter: rows.delimiter(),
        row_count: 0,
        accepted: 0,
        rejected: 0,
    };

    while let Some(fields) = rows.next_row().await? {
        summary.row_count += 1;
        match handler(fields).await {
            Ok(()) => summary.accepted += 1,
            Err(err) => {
                summary.rejected += 1;
                tracing::warn!(row = summary.row_count, error = %err, "row skipped");
            }
        }
    }

    tracing::debug!(
        rows = summary.row_count,
        accepted = summary.accepted,
        rejected = summary.rejected,
        "ingest pass finished"
    );
    Ok(summary)
}
