// src/serve/http.rs

//! Just enough HTTP/1.1 for a local development server: one request per
//! connection, no request bodies. File and error responses close the
//! connection; the event stream is the only response kept open.

use anyhow::{bail, Context, Result};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt, Take};

use super::hub::ReloadMessage;

const MAX_HEAD_BYTES: usize = 16 * 1024;

/// Parsed request head.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: String,
    pub target: String,
    pub version: String,
    pub headers: Vec<(String, String)>,
}

impl Request {
    /// Request path without query string.
    pub fn path(&self) -> &str {
        self.target.split('?').next().unwrap_or_default()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Read a request head. Returns `Ok(None)` when the client closed the
/// connection before sending anything.
///
/// At most `MAX_HEAD_BYTES` are read for the whole head.
pub async fn read_request<R>(reader: &mut R) -> Result<Option<Request>>
where
    R: AsyncBufRead + Unpin,
{
    let mut reader = reader.take(MAX_HEAD_BYTES as u64);
    let mut line = String::new();

    let n = read_head_line(&mut reader, &mut line)
        .await
        .context("reading request line")?;
    if n == 0 {
        return Ok(None);
    }

    let mut parts = line.split_whitespace();
    let (Some(method), Some(target), Some(version)) = (parts.next(), parts.next(), parts.next())
    else {
        bail!("malformed request line: {:?}", line.trim_end());
    };
    let mut request = Request {
        method: method.to_string(),
        target: target.to_string(),
        version: version.to_string(),
        headers: Vec::new(),
    };

    loop {
        line.clear();
        let n = read_head_line(&mut reader, &mut line)
            .await
            .context("reading request header")?;

        let trimmed = line.trim_end_matches(['\r', '\n']);
        if n == 0 || trimmed.is_empty() {
            break;
        }
        if let Some((name, value)) = trimmed.split_once(':') {
            request
                .headers
                .push((name.trim().to_string(), value.trim().to_string()));
        }
    }

    Ok(Some(request))
}

/// `read_line` against the head budget. A line cut off by the budget is an
/// error rather than a short read.
async fn read_head_line<R>(reader: &mut Take<&mut R>, line: &mut String) -> Result<usize>
where
    R: AsyncBufRead + Unpin,
{
    let n = reader.read_line(line).await?;
    if reader.limit() == 0 && !line.ends_with('\n') {
        bail!("request head exceeds {MAX_HEAD_BYTES} bytes");
    }
    Ok(n)
}

/// A complete response with an in-memory body.
#[derive(Debug, Clone)]
pub struct Response {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl Response {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((name.to_string(), value.into()));
        self
    }

    pub fn with_body(mut self, content_type: &str, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self.with_header("Content-Type", content_type)
    }

    /// Plain-text error page.
    pub fn error(status: u16) -> Self {
        let text = format!("{} {}\n", status, reason_phrase(status));
        Self::new(status).with_body("text/plain; charset=utf-8", text)
    }

    /// Serialize the response. With `head_only` the body is omitted but
    /// `Content-Length` still describes it.
    pub async fn write_to<W>(&self, writer: &mut W, head_only: bool) -> Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        let mut head = format!("HTTP/1.1 {} {}\r\n", self.status, reason_phrase(self.status));
        for (name, value) in &self.headers {
            head.push_str(&format!("{name}: {value}\r\n"));
        }
        head.push_str(&format!("Content-Length: {}\r\n", self.body.len()));
        head.push_str("Cache-Control: no-cache\r\n");
        head.push_str("Connection: close\r\n\r\n");

        writer.write_all(head.as_bytes()).await?;
        if !head_only {
            writer.write_all(&self.body).await?;
        }
        writer.flush().await?;
        Ok(())
    }
}

/// Response head that opens a Server-Sent-Events stream.
///
/// No `Content-Length`, and the connection stays open for further frames.
pub fn event_stream_head() -> &'static str {
    "HTTP/1.1 200 OK\r\n\
     Content-Type: text/event-stream\r\n\
     Cache-Control: no-cache\r\n\
     Connection: keep-alive\r\n\r\n"
}

/// Encode a hub message as one SSE frame.
pub fn event_frame(message: &ReloadMessage) -> String {
    match message {
        ReloadMessage::Reload => "event: reload\ndata: reload\n\n".to_string(),
        ReloadMessage::Notify(text) => {
            let mut frame = String::from("event: notify\n");
            for line in text.lines() {
                frame.push_str("data: ");
                frame.push_str(line);
                frame.push('\n');
            }
            if text.is_empty() {
                frame.push_str("data: \n");
            }
            frame.push('\n');
            frame
        }
    }
}

pub fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        301 => "Moved Permanently",
        400 => "Bad Request",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        500 => "Internal Server Error",
        _ => "Unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::BufReader;

    #[tokio::test]
    async fn parses_request_head() {
        let raw = b"GET /blog/?page=2 HTTP/1.1\r\nHost: localhost\r\nAccept: text/html\r\n\r\n";
        let mut reader = BufReader::new(&raw[..]);

        let req = read_request(&mut reader).await.unwrap().unwrap();
        assert_eq!(req.method, "GET");
        assert_eq!(req.path(), "/blog/");
        assert_eq!(req.header("host"), Some("localhost"));
    }

    #[tokio::test]
    async fn empty_connection_yields_none() {
        let mut reader = BufReader::new(&b""[..]);
        assert!(read_request(&mut reader).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn head_request_omits_body() {
        let mut out = Vec::new();
        Response::new(200)
            .with_body("text/plain", "hello")
            .write_to(&mut out, true)
            .await
            .unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(text.contains("Content-Length: 5\r\n"));
        assert!(text.ends_with("\r\n\r\n"));
    }

    #[tokio::test]
    async fn endless_request_line_is_rejected_at_the_head_limit() {
        let raw = vec![b'a'; MAX_HEAD_BYTES * 4];
        let mut reader = BufReader::new(&raw[..]);

        let err = read_request(&mut reader).await.unwrap_err();
        assert!(err.to_string().contains("reading request line"), "{err:#}");
        assert!(format!("{err:#}").contains("exceeds"));
    }

    #[tokio::test]
    async fn oversized_headers_are_rejected() {
        let mut raw = b"GET / HTTP/1.1\r\n".to_vec();
        for i in 0..2000 {
            raw.extend_from_slice(format!("X-Filler-{i}: value\r\n").as_bytes());
        }
        raw.extend_from_slice(b"\r\n");
        let mut reader = BufReader::new(&raw[..]);

        assert!(read_request(&mut reader).await.is_err());
    }

    #[tokio::test]
    async fn head_just_under_the_limit_is_accepted() {
        let mut raw = b"GET / HTTP/1.1\r\nX-Pad: ".to_vec();
        let pad = MAX_HEAD_BYTES - raw.len() - 4;
        raw.extend(std::iter::repeat_n(b'p', pad));
        raw.extend_from_slice(b"\r\n\r\n");
        assert_eq!(raw.len(), MAX_HEAD_BYTES);
        let mut reader = BufReader::new(&raw[..]);

        let req = read_request(&mut reader).await.unwrap().unwrap();
        assert_eq!(req.header("x-pad").map(str::len), Some(pad));
    }

    #[test]
    fn event_stream_stays_open_and_everything_else_closes() {
        let head = event_stream_head();
        assert!(head.contains("Content-Type: text/event-stream\r\n"));
        assert!(head.contains("Connection: keep-alive\r\n"));
        assert!(!head.contains("Content-Length"));
        assert!(head.ends_with("\r\n\r\n"));
    }

    #[tokio::test]
    async fn file_responses_close_the_connection() {
        let mut out = Vec::new();
        Response::error(404).write_to(&mut out, false).await.unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Connection: close\r\n"));
    }

    #[test]
    fn multi_line_notify_becomes_multiple_data_lines() {
        let frame = event_frame(&ReloadMessage::Notify("a\nb".into()));
        assert_eq!(frame, "event: notify\ndata: a\ndata: b\n\n");
    }
}
