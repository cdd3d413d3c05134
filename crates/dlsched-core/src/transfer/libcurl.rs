//! libcurl-backed transfer (curl crate, one Easy handle per call).

use std::cell::RefCell;
use std::collections::HashMap;
use std::io;
use std::str;
use std::time::Duration;

use super::classify::classify_curl_error;
use super::parse::parse_headers;
use super::{ProbeResult, Transfer, TransferError, TransferRequest, TransferSink};

const USER_AGENT: &str = concat!("dlsched/", env!("CARGO_PKG_VERSION"));

/// Timeouts and limits for every handle this backend creates.
#[derive(Debug, Clone, Copy)]
pub struct CurlTransfer {
    pub connect_timeout: Duration,
    /// Abort when throughput stays below `low_speed_limit` bytes/s for this long.
    pub low_speed_time: Duration,
    pub low_speed_limit: u32,
    pub max_redirections: u32,
}

impl Default for CurlTransfer {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            low_speed_time: Duration::from_secs(60),
            low_speed_limit: 1024,
            max_redirections: 10,
        }
    }
}

fn curl_err(e: curl::Error) -> TransferError {
    classify_curl_error(e)
}

impl CurlTransfer {
    fn easy(
        &self,
        url: &str,
        custom_headers: &HashMap<String, String>,
    ) -> Result<curl::easy::Easy, TransferError> {
        let mut easy = curl::easy::Easy::new();
        easy.url(url).map_err(curl_err)?;
        easy.useragent(USER_AGENT).map_err(curl_err)?;
        easy.follow_location(true).map_err(curl_err)?;
        easy.max_redirections(self.max_redirections)
            .map_err(curl_err)?;
        easy.connect_timeout(self.connect_timeout)
            .map_err(curl_err)?;
        easy.low_speed_limit(self.low_speed_limit)
            .map_err(curl_err)?;
        easy.low_speed_time(self.low_speed_time)
            .map_err(curl_err)?;

        if !custom_headers.is_empty() {
            let mut list = curl::easy::List::new();
            for (k, v) in custom_headers {
                list.append(&format!("{}: {}", k.trim(), v.trim()))
                    .map_err(curl_err)?;
            }
            easy.http_headers(list).map_err(curl_err)?;
        }
        Ok(easy)
    }
}

impl Transfer for CurlTransfer {
    fn probe(&self, request: &TransferRequest<'_>) -> Result<ProbeResult, TransferError> {
        let mut headers: Vec<String> = Vec::new();
        let mut easy = self.easy(request.url, request.headers)?;
        easy.nobody(true).map_err(curl_err)?;

        {
            let mut transfer = easy.transfer();
            transfer
                .header_function(|data| {
                    if let Ok(s) = str::from_utf8(data) {
                        headers.push(s.trim_end().to_string());
                    }
                    true
                })
                .map_err(curl_err)?;
            transfer.perform().map_err(curl_err)?;
        }

        let code = easy.response_code().map_err(curl_err)?;
        if !(200..300).contains(&code) {
            return Err(TransferError::Protocol(format!(
                "HEAD {} returned HTTP {}",
                request.url, code
            )));
        }

        Ok(parse_headers(&headers))
    }

    fn fetch(
        &self,
        request: &TransferRequest<'_>,
        resume_from: u64,
        sink: &mut dyn TransferSink,
    ) -> Result<u32, TransferError> {
        let mut easy = self.easy(request.url, request.headers)?;
        if resume_from > 0 {
            easy.resume_from(resume_from).map_err(curl_err)?;
        }
        easy.progress(true).map_err(curl_err)?;

        let sink = RefCell::new(sink);
        let storage_error: RefCell<Option<io::Error>> = RefCell::new(None);

        let perform_result = {
            let mut transfer = easy.transfer();
            transfer
                .write_function(|data| match sink.borrow_mut().write(data) {
                    Ok(()) => Ok(data.len()),
                    Err(e) => {
                        storage_error.borrow_mut().replace(e);
                        // Short write makes libcurl fail with CURLE_WRITE_ERROR.
                        Ok(0)
                    }
                })
                .map_err(curl_err)?;
            transfer
                .progress_function(|_, _, _, _| !sink.borrow().should_abort())
                .map_err(curl_err)?;
            transfer.perform()
        };

        if let Err(e) = perform_result {
            if e.is_write_error() {
                let io_err = storage_error
                    .borrow_mut()
                    .take()
                    .unwrap_or_else(|| io::Error::new(io::ErrorKind::Other, e.to_string()));
                return Err(TransferError::Storage(io_err));
            }
            return Err(classify_curl_error(e));
        }

        easy.response_code().map_err(curl_err)
    }
}
