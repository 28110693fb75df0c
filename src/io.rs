use crate::CatalogResult;
use async_compression::tokio::bufread::{GzipDecoder, ZstdDecoder};
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncRead, BufReader};
use tokio_util::codec::FramedRead;
use tokio_util::io::StreamReader;

use crate::codec::Utf8Transcoder;

/// How an incoming company file is packed.
#[derive(Debug, Clone)]
pub struct CsvMeta {
    /// e.g. "application/gzip" or "text/csv"
    pub content_type: String,
    /// e.g. "gzip", "zstd" or empty
    pub content_encoding: String,
    /// file name or upload name (used for extension fallback)
    pub name_hint: String,
    /// Character encoding of the rows (defaults to UTF-8)
    pub charset: &'static encoding_rs::Encoding,
}

impl Default for CsvMeta {
    fn default() -> Self {
        Self {
            content_type: String::new(),
            content_encoding: String::new(),
            name_hint: String::new(),
            charset: encoding_rs::UTF_8,
        }
    }
}

impl CsvMeta {
    /// Meta for a multipart part; both values are optional in a form upload.
    ///
    /// A `charset=` parameter on the content type selects the transcoder.
    pub fn for_upload(content_type: Option<&str>, file_name: Option<&str>) -> Self {
        let content_type = content_type.unwrap_or_default();
        Self {
            content_type: content_type.to_string(),
            name_hint: file_name.unwrap_or_default().to_string(),
            charset: charset_param(content_type).unwrap_or(encoding_rs::UTF_8),
            ..Default::default()
        }
    }

    pub fn with_charset(mut self, charset: &'static encoding_rs::Encoding) -> Self {
        self.charset = charset;
        self
    }

    /// Content type without parameters, lowercased.
    fn mime(&self) -> String {
        let essence = self.content_type.split(';').next().unwrap_or_default();
        essence.trim().to_ascii_lowercase()
    }

    fn is_gzip(&self) -> bool {
        let ce = self.content_encoding.to_ascii_lowercase();
        let ct = self.mime();
        ce.split(',').any(|s| s.trim() == "gzip")
            || matches!(ct.as_str(), "application/gzip" | "application/x-gzip")
            || self.name_hint.ends_with(".gz")
    }

    fn is_zstd(&self) -> bool {
        let ce = self.content_encoding.to_ascii_lowercase();
        ce.split(',').any(|s| s.trim() == "zstd")
            || self.mime() == "application/zstd"
            || self.name_hint.ends_with(".zst")
    }
}

fn charset_param(content_type: &str) -> Option<&'static encoding_rs::Encoding> {
    let label = content_type.split(';').skip(1).find_map(|param| {
        let (key, value) = param.split_once('=')?;
        key.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim().trim_matches('"'))
    })?;
    let charset = encoding_rs::Encoding::for_label(label.as_bytes());
    if charset.is_none() {
        tracing::warn!(label, "unknown upload charset, reading as UTF-8");
    }
    charset
}

/// Wrap a raw reader with optional decompression and UTF-8 transcoding.
pub fn build_csv_reader<R>(raw: R, meta: &CsvMeta) -> Box<dyn AsyncRead + Unpin + Send>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let buf = BufReader::with_capacity(64 * 1024, raw);
    let decompressed: Box<dyn AsyncRead + Unpin + Send> = if meta.is_gzip() {
        tracing::debug!(source = %meta.name_hint, "gzip input");
        Box::new(GzipDecoder::new(buf))
    } else if meta.is_zstd() {
        tracing::debug!(source = %meta.name_hint, "zstd input");
        Box::new(ZstdDecoder::new(buf))
    } else {
        Box::new(buf)
    };

    if meta.charset == encoding_rs::UTF_8 {
        return decompressed;
    }
    tracing::debug!(charset = meta.charset.name(), "transcoding to UTF-8");
    let framed = FramedRead::new(decompressed, Utf8Transcoder::new(meta.charset));
    Box::new(StreamReader::new(framed))
}

/// Open a local company file; packing is inferred from the extension.
pub async fn reader_from_path(
    path: &Path,
    charset: &'static encoding_rs::Encoding,
) -> CatalogResult<Box<dyn AsyncRead + Unpin + Send>> {
    let file = File::open(path).await?;
    let name = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_string();

    let mut meta = CsvMeta {
        name_hint: name,
        charset,
        ..Default::default()
    };
    match path.extension().and_then(|s| s.to_str()).unwrap_or_default() {
        "gz" => {
            meta.content_type = "application/gzip".into();
            meta.content_encoding = "gzip".into();
        }
        "zst" => {
            meta.content_type = "application/zstd".into();
            meta.content_encoding = "zstd".into();
        }
        _ => meta.content_type = "text/csv".into(),
    }

    Ok(build_csv_reader(file, &meta))
}
