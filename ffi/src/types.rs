//! `#[repr(C)]` types for the FFI boundary.
//!
//! # Design
//! Each type mirrors a core type but uses C-compatible representations:
//! `*mut c_char` instead of `String`, raw pointers instead of `Vec`, and
//! enums with explicit discriminants. Conversion functions live here to keep
//! `lib.rs` focused on the `extern "C"` surface.

use std::ffi::{CStr, CString};
use std::os::raw::c_char;

use sblookup_core::{HttpRequest, HttpResponse, LookupReport, Verdict};

/// Opaque handle to a `LookupClient`. C callers receive a pointer to this
/// and pass it back into every FFI function.
pub struct FfiLookupClient {
    pub(crate) inner: sblookup_core::LookupClient,
}

/// Opaque handle to a `LookupSession` whose requests the C caller executes.
pub struct FfiLookupSession {
    pub(crate) inner: sblookup_core::LookupSession,
}

/// Copy `s` into a C string. Interior NULs cannot be represented and are
/// dropped.
pub(crate) fn to_c_string(s: impl Into<String>) -> *mut c_char {
    let mut bytes = s.into().into_bytes();
    bytes.retain(|b| *b != 0);
    CString::new(bytes).unwrap_or_default().into_raw()
}

/// Read a caller-owned C string. Invalid UTF-8 is replaced, not rejected.
///
/// # Safety
/// `ptr` must be non-null and point to a NUL-terminated string.
pub(crate) unsafe fn from_c_string(ptr: *const c_char) -> String {
    unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned()
}

// ---------------------------------------------------------------------------
// Request / response
// ---------------------------------------------------------------------------

/// One lookup request described as C-compatible plain data.
///
/// Always a POST of `body` to `url` with the given content type. Built by
/// `sb_session_build_request`; freed with `sb_free_request`.
#[repr(C)]
pub struct FfiHttpRequest {
    pub url: *mut c_char,
    pub body: *mut c_char,
    pub content_type: *mut c_char,
}

impl FfiHttpRequest {
    pub(crate) fn from_core(req: HttpRequest) -> *mut Self {
        let content_type = req
            .headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case("content-type"))
            .map(|(_, value)| value.clone())
            .unwrap_or_else(|| "text/plain".to_string());

        Box::into_raw(Box::new(FfiHttpRequest {
            url: to_c_string(req.url),
            body: to_c_string(req.body),
            content_type: to_c_string(content_type),
        }))
    }
}

/// An HTTP response described as C-compatible plain data.
///
/// The C caller constructs this on the stack after executing a request and
/// passes a pointer to `sb_session_record_response`. The FFI layer reads but
/// does not free these fields. A null `body` is an empty body.
#[repr(C)]
pub struct FfiHttpResponse {
    pub status: u16,
    pub body: *const c_char,
}

impl FfiHttpResponse {
    pub(crate) fn to_core(&self) -> HttpResponse {
        let body = if self.body.is_null() {
            String::new()
        } else {
            unsafe { from_c_string(self.body) }
        };
        HttpResponse::new(self.status, body)
    }
}

// ---------------------------------------------------------------------------
// Status and results
// ---------------------------------------------------------------------------

/// Outcome of the `sb_session_record_*` functions.
#[repr(C)]
#[derive(Debug, PartialEq, Eq)]
pub enum FfiStatus {
    Ok = 0,
    NullArg = 1,
    UnknownChunk = 2,
    Panic = 3,
}

/// Verdict for one URL as a C enum.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiVerdict {
    Clean = 0,
    Malware = 1,
    Phishing = 2,
    MalwarePhishing = 3,
    Error = 4,
}

impl From<Verdict> for FfiVerdict {
    fn from(v: Verdict) -> Self {
        match v {
            Verdict::Clean => FfiVerdict::Clean,
            Verdict::Malware => FfiVerdict::Malware,
            Verdict::Phishing => FfiVerdict::Phishing,
            Verdict::MalwarePhishing => FfiVerdict::MalwarePhishing,
            Verdict::Error => FfiVerdict::Error,
        }
    }
}

#[repr(C)]
pub struct FfiVerdictEntry {
    pub url: *mut c_char,
    pub verdict: FfiVerdict,
}

/// Verdicts of a finished session, sorted by URL.
///
/// `failed_chunks` counts requests that did not yield verdicts; their URLs
/// are present with `FfiVerdict::Error`.
#[repr(C)]
pub struct FfiLookupResult {
    pub entries: *mut FfiVerdictEntry,
    pub len: u32,
    pub failed_chunks: u32,
}

impl FfiLookupResult {
    pub(crate) fn from_report(report: LookupReport) -> *mut Self {
        let failed_chunks = report.failures().count() as u32;
        let mut results: Vec<(String, Verdict)> = report.results.into_iter().collect();
        results.sort_by(|a, b| a.0.cmp(&b.0));

        let len = results.len() as u32;
        let entries: Vec<FfiVerdictEntry> = results
            .into_iter()
            .map(|(url, verdict)| FfiVerdictEntry {
                url: to_c_string(url),
                verdict: verdict.into(),
            })
            .collect();

        let entries = if entries.is_empty() {
            std::ptr::null_mut()
        } else {
            // boxed slice: capacity == len, so it can be rebuilt from (ptr, len)
            Box::into_raw(entries.into_boxed_slice()) as *mut FfiVerdictEntry
        };

        Box::into_raw(Box::new(FfiLookupResult {
            entries,
            len,
            failed_chunks,
        }))
    }
}
