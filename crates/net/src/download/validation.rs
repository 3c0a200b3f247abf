//! HTTP response and request header validation for downloads

use kratos_errors::{Error, NetworkError};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::StatusCode;

/// Reject any status outside the 2xx range
pub(super) fn validate_response(response: &reqwest::Response) -> Result<(), Error> {
    check_status(response.status())
}

fn check_status(status: StatusCode) -> Result<(), Error> {
    if status.is_success() {
        return Ok(());
    }

    Err(NetworkError::HttpStatus {
        status: status.as_u16(),
        status_text: status.canonical_reason().unwrap_or_default().to_string(),
    }
    .into())
}

/// Parse and insert one `name: value` request header
pub(crate) fn insert_header(headers: &mut HeaderMap, name: &str, value: &str) -> Result<(), Error> {
    let invalid = || NetworkError::InvalidHeader {
        name: name.to_string(),
    };
    let header_name = HeaderName::from_bytes(name.trim().as_bytes()).map_err(|_| invalid())?;
    let header_value = HeaderValue::from_str(value.trim()).map_err(|_| invalid())?;
    headers.insert(header_name, header_value);
    Ok(())
}
