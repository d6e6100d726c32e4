//! Helpers for the asynchronous request protocol.
//!
//! A server in async mode answers `202 Accepted` with a `Location` header
//! naming `/_async('{id}')`. Polling that resource returns either an
//! embedded HTTP message in the body or an `asyncresult` header carrying the
//! final status.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use tm1_config::constants::ASYNC_POLL_SCHEDULE_MS;

use crate::endpoints::request::Tm1Response;
use crate::error::{ClientError, Result};

/// Path of the async resource for `id`.
pub fn async_path(id: &str) -> String {
    format!("/_async('{id}')")
}

/// Extract the async id: the text between the first pair of single quotes.
pub fn parse_async_id(location: Option<&str>) -> Result<String> {
    let location = location.ok_or_else(|| {
        ClientError::ProtocolError("202 response without a Location header".to_string())
    })?;
    let start = location.find('\'');
    let end = location.rfind('\'');
    match (start, end) {
        (Some(s), Some(e)) if e > s + 1 => Ok(location[s + 1..e].to_string()),
        _ => Err(ClientError::ProtocolError(format!(
            "cannot find async id in Location header: {location}"
        ))),
    }
}

/// Delay before poll number `attempt` (0-based).
pub fn poll_delay(attempt: usize) -> Duration {
    let ms = ASYNC_POLL_SCHEDULE_MS
        .get(attempt)
        .copied()
        .or_else(|| ASYNC_POLL_SCHEDULE_MS.last().copied())
        .unwrap_or(1000);
    Duration::from_millis(ms)
}

/// Whether a poll response means the operation is still running.
pub fn is_pending(poll: &Tm1Response) -> bool {
    poll.status == 202
}

/// Turn a completed poll response into the operation's own response.
pub fn decode_async_result(poll: Tm1Response) -> Result<Tm1Response> {
    if poll.body.starts_with(b"HTTP/") {
        return parse_embedded_http(&poll.body);
    }
    if let Some(status) = poll
        .header("asyncresult")
        .and_then(|v| v.trim().get(..3))
        .and_then(|code| code.parse::<u16>().ok())
    {
        return Ok(Tm1Response { status, ..poll });
    }
    Ok(poll)
}

/// Parse `HTTP/1.1 200 OK\r\nHeader: v\r\n\r\nbody` (bare `\n` line ends are accepted).
fn parse_embedded_http(raw: &[u8]) -> Result<Tm1Response> {
    let (head, body) = split_head(raw);
    let head = String::from_utf8_lossy(head);
    let mut lines = head.lines();
    let status_line = lines.next().unwrap_or_default();
    let status = status_line
        .split_whitespace()
        .nth(1)
        .and_then(|s| s.parse::<u16>().ok())
        .ok_or_else(|| {
            ClientError::ProtocolError(format!("malformed async status line: {status_line}"))
        })?;
    let mut headers = HeaderMap::new();
    for line in lines {
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.trim().as_bytes()),
            HeaderValue::from_str(value.trim()),
        ) {
            headers.append(name, value);
        }
    }
    Ok(Tm1Response {
        status,
        headers,
        body: body.to_vec(),
    })
}

fn split_head(raw: &[u8]) -> (&[u8], &[u8]) {
    for sep in [&b"\r\n\r\n"[..], &b"\n\n"[..]] {
        if let Some(pos) = raw.windows(sep.len()).position(|w| w == sep) {
            return (&raw[..pos], &raw[pos + sep.len()..]);
        }
    }
    (raw, &[])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn poll(status: u16, body: &str) -> Tm1Response {
        Tm1Response {
            status,
            headers: HeaderMap::new(),
            body: body.as_bytes().to_vec(),
        }
    }

    #[test]
    fn test_parse_async_id() {
        assert_eq!(
            parse_async_id(Some("/api/v1/_async('abc-123')")).unwrap(),
            "abc-123"
        );
        assert!(matches!(
            parse_async_id(Some("/api/v1/_async")),
            Err(ClientError::ProtocolError(_))
        ));
        assert!(matches!(parse_async_id(None), Err(ClientError::ProtocolError(_))));
    }

    #[test]
    fn test_poll_schedule() {
        assert_eq!(poll_delay(0), Duration::from_millis(100));
        assert_eq!(poll_delay(1), Duration::from_millis(300));
        assert_eq!(poll_delay(2), Duration::from_millis(600));
        assert_eq!(poll_delay(3), Duration::from_secs(1));
        assert_eq!(poll_delay(40), Duration::from_secs(1));
    }

    #[test]
    fn test_decode_embedded_message() {
        let done = poll(
            200,
            "HTTP/1.1 201 Created\r\nContent-Type: application/json\r\n\r\n{\"ID\":\"x\"}",
        );
        let resp = decode_async_result(done).unwrap();
        assert_eq!(resp.status, 201);
        assert_eq!(resp.header("content-type"), Some("application/json"));
        assert_eq!(resp.text(), "{\"ID\":\"x\"}");
    }

    #[test]
    fn test_decode_embedded_message_bare_newlines() {
        let resp = decode_async_result(poll(200, "HTTP/1.1 404 Not Found\n\n{}")).unwrap();
        assert_eq!(resp.status, 404);
        assert_eq!(resp.text(), "{}");
    }

    #[test]
    fn test_decode_asyncresult_header() {
        let mut p = poll(200, "{\"error\":{\"message\":\"boom\"}}");
        p.headers
            .insert("asyncresult", HeaderValue::from_static("500 Internal Server Error"));
        let resp = decode_async_result(p).unwrap();
        assert_eq!(resp.status, 500);
    }

    #[test]
    fn test_decode_plain_poll_passthrough() {
        let resp = decode_async_result(poll(200, "{}")).unwrap();
        assert_eq!(resp.status, 200);
    }
}
