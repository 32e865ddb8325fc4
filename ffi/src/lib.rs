//! C-ABI wrapper around `sblookup-core`.
//!
//! # Overview
//! Exposes URL lookups through `extern "C"` functions for hosts that perform
//! their own HTTP. The host begins a session, builds and executes one request
//! per chunk, records each response (or transport failure), then finishes the
//! session to get one verdict per URL.
//!
//! # Design
//! - Every `extern "C"` function wraps its body in `catch_unwind` so panics
//!   never cross the FFI boundary.
//! - Sessions map 1:1 onto `LookupSession`; responses may be recorded in any
//!   order and missing ones resolve to `FfiVerdict::Error` at finish.
//! - The C caller owns all returned pointers and must call the matching
//!   `sb_free_*` function to release them.

pub mod types;

use std::ffi::CString;
use std::os::raw::c_char;
use std::panic::{catch_unwind, AssertUnwindSafe};

use sblookup_core::{ClientConfig, LookupClient, LookupSession, TransportError, TransportErrorKind};

use types::*;

// ---------------------------------------------------------------------------
// Client lifecycle
// ---------------------------------------------------------------------------

/// Create a client for the default lookup endpoint.
///
/// Returns null if `api_key` is null or empty, or if an internal panic
/// occurs. The caller must free the returned pointer with `sb_client_free`.
#[unsafe(no_mangle)]
pub extern "C" fn sb_client_new(api_key: *const c_char, debug: bool) -> *mut FfiLookupClient {
    sb_client_new_with_endpoint(api_key, std::ptr::null(), debug)
}

/// Create a client for `endpoint`. A null `endpoint` selects the default.
///
/// Returns null if `api_key` is null or empty, or `endpoint` is not an
/// absolute URL.
#[unsafe(no_mangle)]
pub extern "C" fn sb_client_new_with_endpoint(
    api_key: *const c_char,
    endpoint: *const c_char,
    debug: bool,
) -> *mut FfiLookupClient {
    catch_unwind(|| {
        if api_key.is_null() {
            return std::ptr::null_mut();
        }
        let mut config = ClientConfig::new(unsafe { from_c_string(api_key) }).with_debug(debug);
        if !endpoint.is_null() {
            config = config.with_endpoint(unsafe { from_c_string(endpoint) });
        }
        match LookupClient::new(config) {
            Ok(inner) => Box::into_raw(Box::new(FfiLookupClient { inner })),
            Err(_) => std::ptr::null_mut(),
        }
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Free a client created by `sb_client_new`. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn sb_client_free(client: *mut FfiLookupClient) {
    if !client.is_null() {
        let _ = catch_unwind(|| {
            drop(unsafe { Box::from_raw(client) });
        });
    }
}

/// Copy of the client's most recent failure message, or null if none.
///
/// The caller must free a non-null result with `sb_free_string`.
#[unsafe(no_mangle)]
pub extern "C" fn sb_client_last_error(client: *const FfiLookupClient) -> *mut c_char {
    catch_unwind(|| {
        if client.is_null() {
            return std::ptr::null_mut();
        }
        let client = unsafe { &*client };
        match client.inner.last_error() {
            Some(message) => to_c_string(message),
            None => std::ptr::null_mut(),
        }
    })
    .unwrap_or(std::ptr::null_mut())
}

// ---------------------------------------------------------------------------
// Sessions
// ---------------------------------------------------------------------------

/// Start a lookup of `len` URLs.
///
/// Returns null if `client` is null, if `urls` is null while `len` is
/// non-zero, or if any entry of `urls` is null. The caller releases the
/// session with `sb_session_finish` or `sb_session_free`.
#[unsafe(no_mangle)]
pub extern "C" fn sb_session_begin(
    client: *const FfiLookupClient,
    urls: *const *const c_char,
    len: u32,
) -> *mut FfiLookupSession {
    catch_unwind(|| {
        if client.is_null() || (urls.is_null() && len > 0) {
            return std::ptr::null_mut();
        }
        let client = unsafe { &*client };
        let ptrs: &[*const c_char] = if len == 0 {
            &[]
        } else {
            unsafe { std::slice::from_raw_parts(urls, len as usize) }
        };
        if ptrs.iter().any(|p| p.is_null()) {
            return std::ptr::null_mut();
        }
        let owned: Vec<String> = ptrs.iter().map(|p| unsafe { from_c_string(*p) }).collect();
        let inner = client.inner.begin(&owned);
        Box::into_raw(Box::new(FfiLookupSession { inner }))
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Free a session without finishing it. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn sb_session_free(session: *mut FfiLookupSession) {
    if !session.is_null() {
        let _ = catch_unwind(|| {
            drop(unsafe { Box::from_raw(session) });
        });
    }
}

/// Number of requests the session needs. Zero for a null session.
#[unsafe(no_mangle)]
pub extern "C" fn sb_session_chunk_count(session: *const FfiLookupSession) -> u32 {
    catch_unwind(|| {
        if session.is_null() {
            return 0;
        }
        unsafe { &*session }.inner.chunk_count() as u32
    })
    .unwrap_or(0)
}

/// Build the request for chunk `index`.
///
/// Returns null if `client` or `session` is null or `index` is out of range.
/// The caller must free the returned pointer with `sb_free_request`.
#[unsafe(no_mangle)]
pub extern "C" fn sb_session_build_request(
    client: *const FfiLookupClient,
    session: *const FfiLookupSession,
    index: u32,
) -> *mut FfiHttpRequest {
    catch_unwind(|| {
        if client.is_null() || session.is_null() {
            return std::ptr::null_mut();
        }
        let client = unsafe { &*client };
        let session = unsafe { &*session };
        match session.inner.chunk(index as usize) {
            Some(chunk) => FfiHttpRequest::from_core(client.inner.build_request(&chunk)),
            None => std::ptr::null_mut(),
        }
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Record the HTTP response the caller received for chunk `index`.
#[unsafe(no_mangle)]
pub extern "C" fn sb_session_record_response(
    client: *mut FfiLookupClient,
    session: *mut FfiLookupSession,
    index: u32,
    response: *const FfiHttpResponse,
) -> FfiStatus {
    if response.is_null() {
        return FfiStatus::NullArg;
    }
    record(client, session, index, || Ok(unsafe { &*response }.to_core()))
}

/// Record that the request for chunk `index` could not be completed.
///
/// `detail` describes the failure and may be null.
#[unsafe(no_mangle)]
pub extern "C" fn sb_session_record_failure(
    client: *mut FfiLookupClient,
    session: *mut FfiLookupSession,
    index: u32,
    detail: *const c_char,
) -> FfiStatus {
    record(client, session, index, || {
        let detail = if detail.is_null() {
            "transport failure".to_string()
        } else {
            unsafe { from_c_string(detail) }
        };
        Err(TransportError::new(TransportErrorKind::Other, detail))
    })
}

fn record<F>(
    client: *mut FfiLookupClient,
    session: *mut FfiLookupSession,
    index: u32,
    outcome: F,
) -> FfiStatus
where
    F: FnOnce() -> Result<sblookup_core::HttpResponse, TransportError>,
{
    if client.is_null() || session.is_null() {
        return FfiStatus::NullArg;
    }
    catch_unwind(AssertUnwindSafe(|| {
        let client = unsafe { &mut *client };
        let session = unsafe { &mut *session };
        match client.inner.record(&mut session.inner, index as usize, outcome()) {
            Ok(()) => FfiStatus::Ok,
            Err(_) => FfiStatus::UnknownChunk,
        }
    }))
    .unwrap_or(FfiStatus::Panic)
}

/// Consume `session` and return one verdict per distinct URL.
///
/// Returns null if `session` is null. The session pointer is invalid after
/// this call. The caller must free the result with `sb_free_result`.
#[unsafe(no_mangle)]
pub extern "C" fn sb_session_finish(session: *mut FfiLookupSession) -> *mut FfiLookupResult {
    if session.is_null() {
        return std::ptr::null_mut();
    }
    catch_unwind(|| {
        let session: LookupSession = unsafe { Box::from_raw(session) }.inner;
        FfiLookupResult::from_report(session.finish())
    })
    .unwrap_or(std::ptr::null_mut())
}

// ---------------------------------------------------------------------------
// Free functions
// ---------------------------------------------------------------------------

/// Free an `FfiHttpRequest` returned by `sb_session_build_request`.
/// Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn sb_free_request(req: *mut FfiHttpRequest) {
    if req.is_null() {
        return;
    }
    let _ = catch_unwind(|| {
        let req = unsafe { Box::from_raw(req) };
        for s in [req.url, req.body, req.content_type] {
            if !s.is_null() {
                drop(unsafe { CString::from_raw(s) });
            }
        }
    });
}

/// Free an `FfiLookupResult` returned by `sb_session_finish`.
/// Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn sb_free_result(result: *mut FfiLookupResult) {
    if result.is_null() {
        return;
    }
    let _ = catch_unwind(|| {
        let result = unsafe { Box::from_raw(result) };
        if !result.entries.is_null() && result.len > 0 {
            let entries = unsafe {
                Box::from_raw(std::ptr::slice_from_raw_parts_mut(
                    result.entries,
                    result.len as usize,
                ))
            };
            for entry in entries.iter() {
                if !entry.url.is_null() {
                    drop(unsafe { CString::from_raw(entry.url) });
                }
            }
        }
    });
}

/// Free a C string allocated by this library. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn sb_free_string(s: *mut c_char) {
    if !s.is_null() {
        let _ = catch_unwind(|| {
            drop(unsafe { CString::from_raw(s) });
        });
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::{CStr, CString};

    fn client() -> *mut FfiLookupClient {
        let key = CString::new("test-key").unwrap();
        let endpoint = CString::new("http://localhost:3000/safebrowsing/api/lookup").unwrap();
        let client = sb_client_new_with_endpoint(key.as_ptr(), endpoint.as_ptr(), false);
        assert!(!client.is_null());
        client
    }

    fn begin(client: *const FfiLookupClient, urls: &[&str]) -> *mut FfiLookupSession {
        let owned: Vec<CString> = urls.iter().map(|u| CString::new(*u).unwrap()).collect();
        let ptrs: Vec<*const c_char> = owned.iter().map(|c| c.as_ptr()).collect();
        let session = sb_session_begin(client, ptrs.as_ptr(), ptrs.len() as u32);
        assert!(!session.is_null());
        session
    }

    fn entries(result: &FfiLookupResult) -> Vec<(String, FfiVerdict)> {
        if result.len == 0 {
            return Vec::new();
        }
        unsafe { std::slice::from_raw_parts(result.entries, result.len as usize) }
            .iter()
            .map(|e| {
                let url = unsafe { CStr::from_ptr(e.url) }.to_str().unwrap().to_string();
                (url, e.verdict)
            })
            .collect()
    }

    #[test]
    fn client_new_and_free() {
        let key = CString::new("test-key").unwrap();
        let client = sb_client_new(key.as_ptr(), false);
        assert!(!client.is_null());
        sb_client_free(client);
    }

    #[test]
    fn client_new_rejects_null_and_empty_key() {
        assert!(sb_client_new(std::ptr::null(), false).is_null());
        let empty = CString::new("").unwrap();
        assert!(sb_client_new(empty.as_ptr(), false).is_null());
    }

    #[test]
    fn client_new_rejects_relative_endpoint() {
        let key = CString::new("k").unwrap();
        let endpoint = CString::new("/lookup").unwrap();
        assert!(sb_client_new_with_endpoint(key.as_ptr(), endpoint.as_ptr(), false).is_null());
    }

    #[test]
    fn client_free_null_is_safe() {
        sb_client_free(std::ptr::null_mut());
    }

    #[test]
    fn build_request_for_first_chunk() {
        let client = client();
        let session = begin(client, &["www.google.com", "http://www.gumblar.cn/"]);
        assert_eq!(sb_session_chunk_count(session), 1);

        let req = sb_session_build_request(client, session, 0);
        assert!(!req.is_null());
        let req_ref = unsafe { &*req };
        let url = unsafe { CStr::from_ptr(req_ref.url) }.to_str().unwrap();
        assert_eq!(
            url,
            "http://localhost:3000/safebrowsing/api/lookup?client=rust&apikey=test-key&appver=0.1&pver=3.0"
        );
        let body = unsafe { CStr::from_ptr(req_ref.body) }.to_str().unwrap();
        assert_eq!(body, "2\nhttp://www.google.com\nhttp://www.gumblar.cn/");
        let content_type = unsafe { CStr::from_ptr(req_ref.content_type) }.to_str().unwrap();
        assert_eq!(content_type, "text/plain");

        sb_free_request(req);
        sb_session_free(session);
        sb_client_free(client);
    }

    #[test]
    fn build_request_out_of_range_returns_null() {
        let client = client();
        let session = begin(client, &["http://a/"]);
        assert!(sb_session_build_request(client, session, 1).is_null());
        assert!(sb_session_build_request(std::ptr::null(), session, 0).is_null());
        sb_session_free(session);
        sb_client_free(client);
    }

    #[test]
    fn begin_rejects_null_entries() {
        let client = client();
        let a = CString::new("http://a/").unwrap();
        let ptrs = [a.as_ptr(), std::ptr::null()];
        assert!(sb_session_begin(client, ptrs.as_ptr(), 2).is_null());
        assert!(sb_session_begin(client, std::ptr::null(), 1).is_null());
        sb_client_free(client);
    }

    #[test]
    fn empty_session_finishes_empty() {
        let client = client();
        let session = sb_session_begin(client, std::ptr::null(), 0);
        assert!(!session.is_null());
        assert_eq!(sb_session_chunk_count(session), 0);

        let result = sb_session_finish(session);
        let r = unsafe { &*result };
        assert_eq!(r.len, 0);
        assert!(r.entries.is_null());
        assert_eq!(r.failed_chunks, 0);

        sb_free_result(result);
        sb_client_free(client);
    }

    #[test]
    fn record_response_and_finish() {
        let client = client();
        let session = begin(client, &["http://b/", "http://a/"]);
        let body = CString::new("malware\nok").unwrap();
        let resp = FfiHttpResponse {
            status: 200,
            body: body.as_ptr(),
        };
        assert_eq!(sb_session_record_response(client, session, 0, &resp), FfiStatus::Ok);
        assert!(sb_client_last_error(client).is_null());

        let result = sb_session_finish(session);
        let r = unsafe { &*result };
        assert_eq!(r.failed_chunks, 0);
        assert_eq!(
            entries(r),
            vec![
                ("http://a/".to_string(), FfiVerdict::Clean),
                ("http://b/".to_string(), FfiVerdict::Malware),
            ]
        );

        sb_free_result(result);
        sb_client_free(client);
    }

    #[test]
    fn bad_credentials_set_last_error() {
        let client = client();
        let session = begin(client, &["http://a/"]);
        let resp = FfiHttpResponse {
            status: 403,
            body: std::ptr::null(),
        };
        assert_eq!(sb_session_record_response(client, session, 0, &resp), FfiStatus::Ok);

        let message = sb_client_last_error(client);
        assert!(!message.is_null());
        assert_eq!(unsafe { CStr::from_ptr(message) }.to_str().unwrap(), "invalid API key");
        sb_free_string(message);

        let result = sb_session_finish(session);
        let r = unsafe { &*result };
        assert_eq!(r.failed_chunks, 1);
        assert_eq!(entries(r), vec![("http://a/".to_string(), FfiVerdict::Error)]);

        sb_free_result(result);
        sb_client_free(client);
    }

    #[test]
    fn recorded_failure_and_missing_chunk_are_errors() {
        let urls: Vec<String> = (0..1000).map(|i| format!("http://host/{i:04}")).collect();
        let refs: Vec<&str> = urls.iter().map(String::as_str).collect();
        let client = client();
        let session = begin(client, &refs);
        assert_eq!(sb_session_chunk_count(session), 2);

        let detail = CString::new("connection reset").unwrap();
        assert_eq!(
            sb_session_record_failure(client, session, 1, detail.as_ptr()),
            FfiStatus::Ok
        );
        let message = sb_client_last_error(client);
        assert_eq!(
            unsafe { CStr::from_ptr(message) }.to_str().unwrap(),
            "unexpected server response"
        );
        sb_free_string(message);

        let result = sb_session_finish(session);
        let r = unsafe { &*result };
        assert_eq!(r.len, 1000);
        assert_eq!(r.failed_chunks, 2);
        assert!(entries(r).iter().all(|(_, v)| *v == FfiVerdict::Error));

        sb_free_result(result);
        sb_client_free(client);
    }

    #[test]
    fn record_rejects_bad_arguments() {
        let client = client();
        let session = begin(client, &["http://a/"]);
        let resp = FfiHttpResponse {
            status: 204,
            body: std::ptr::null(),
        };
        assert_eq!(
            sb_session_record_response(client, session, 5, &resp),
            FfiStatus::UnknownChunk
        );
        assert_eq!(
            sb_session_record_response(client, session, 0, std::ptr::null()),
            FfiStatus::NullArg
        );
        assert_eq!(
            sb_session_record_failure(std::ptr::null_mut(), session, 0, std::ptr::null()),
            FfiStatus::NullArg
        );
        sb_session_free(session);
        sb_client_free(client);
    }

    #[test]
    fn free_functions_accept_null() {
        sb_free_request(std::ptr::null_mut());
        sb_free_result(std::ptr::null_mut());
        sb_free_string(std::ptr::null_mut());
        sb_session_free(std::ptr::null_mut());
        assert!(sb_session_finish(std::ptr::null_mut()).is_null());
        assert_eq!(sb_session_chunk_count(std::ptr::null()), 0);
    }
}
