//! Map libcurl errors onto `TransferError`.

use super::TransferError;

/// Classify a curl error. Write errors are handled by the caller, which knows
/// whether the sink reported an I/O failure.
pub fn classify_curl_error(e: curl::Error) -> TransferError {
    if e.is_aborted_by_callback() {
        return TransferError::Aborted;
    }
    if e.is_too_many_redirects() {
        return TransferError::TooManyRedirects;
    }
    if e.is_operation_timedout()
        || e.is_couldnt_connect()
        || e.is_couldnt_resolve_host()
        || e.is_couldnt_resolve_proxy()
        || e.is_recv_error()
        || e.is_send_error()
        || e.is_got_nothing()
    {
        return TransferError::Retryable(e.to_string());
    }
    TransferError::Protocol(e.to_string())
}
