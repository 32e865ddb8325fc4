//! Splitting URL lists into service-sized chunks and encoding request bodies.

/// Maximum number of URLs the service accepts in one request.
pub const MAX_BATCH_SIZE: usize = 500;

/// A contiguous run of at most `MAX_BATCH_SIZE` URLs from a lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk<'a> {
    /// Position of the chunk within the lookup.
    pub index: usize,
    /// Position of the chunk's first URL within the lookup.
    pub offset: usize,
    pub urls: &'a [String],
}

impl Chunk<'_> {
    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    /// Request body for this chunk, see `encode_body`.
    pub fn body(&self) -> String {
        encode_body(self.urls)
    }
}

/// Partition `urls` into chunks in input order. An empty slice has no chunks.
pub fn chunks(urls: &[String]) -> impl Iterator<Item = Chunk<'_>> + '_ {
    urls.chunks(MAX_BATCH_SIZE)
        .enumerate()
        .map(|(index, urls)| Chunk {
            index,
            offset: index * MAX_BATCH_SIZE,
            urls,
        })
}

pub fn chunk_count(len: usize) -> usize {
    len.div_ceil(MAX_BATCH_SIZE)
}

/// Minimal cleanup the lookup protocol asks of clients. This is not full
/// canonicalization: percent-encoding, IP literals and fragments are left
/// for the service.
pub fn normalize_url(raw: &str) -> String {
    let mut url: String = raw
        .trim()
        .chars()
        .filter(|c| !matches!(c, '\t' | '\r' | '\n'))
        .collect();

    if !has_http_scheme(&url) {
        url.insert_str(0, "http://");
    }
    url
}

fn has_http_scheme(url: &str) -> bool {
    let starts_with = |prefix: &str| {
        url.get(..prefix.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
    };
    starts_with("http://") || starts_with("https://")
}

/// The URL count on the first line, then one normalized URL per line.
pub fn encode_body<S: AsRef<str>>(urls: &[S]) -> String {
    let mut body = urls.len().to_string();
    for url in urls {
        body.push('\n');
        body.push_str(&normalize_url(url.as_ref()));
    }
    body
}
