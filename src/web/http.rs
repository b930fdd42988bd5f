use std::collections::HashMap;

use serde::Serialize;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::error::{AppError, AppResult, HttpError};

const MAX_REQUEST_BYTES: usize = 64 * 1024;

pub(super) struct WebRequest {
    pub(super) method: String,
    pub(super) path: String,
}

#[derive(Debug)]
pub(super) struct RequestError {
    pub(super) status: u16,
    pub(super) message: String,
}

impl RequestError {
    fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

/// Read the request head and drain any body. Only method and path matter
/// to the stats endpoint; the query string is dropped.
pub(super) async fn read_request(socket: &mut TcpStream) -> Result<WebRequest, RequestError> {
    let mut buffer: Vec<u8> = Vec::with_capacity(1024);
    let mut chunk = [0u8; 1024];
    let header_end = loop {
        let bytes = socket
            .read(&mut chunk)
            .await
            .map_err(|err| RequestError::new(400, format!("Failed to read request: {}", err)))?;
        if bytes == 0 {
            return Err(RequestError::new(400, "Empty request"));
        }
        let read_slice = chunk
            .get(..bytes)
            .ok_or_else(|| RequestError::new(400, "Invalid read length"))?;
        buffer.extend_from_slice(read_slice);
        if buffer.len() > MAX_REQUEST_BYTES {
            return Err(RequestError::new(413, "Request too large"));
        }
        if let Some(pos) = find_header_end(&buffer) {
            break pos;
        }
    };

    let header_text = buffer
        .get(..header_end)
        .and_then(|bytes| std::str::from_utf8(bytes).ok())
        .ok_or_else(|| RequestError::new(400, "Malformed request headers"))?;
    let mut lines = header_text.split("\r\n");
    let mut request_line = lines.next().unwrap_or_default().split_whitespace();
    let (Some(method), Some(target)) = (request_line.next(), request_line.next()) else {
        return Err(RequestError::new(400, "Malformed request line"));
    };

    let headers: HashMap<String, String> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(key, value)| (key.trim().to_ascii_lowercase(), value.trim().to_owned()))
        .collect();
    let content_length = headers
        .get("content-length")
        .and_then(|value| value.parse::<usize>().ok())
        .unwrap_or(0)
        .min(MAX_REQUEST_BYTES);
    let mut body_read = buffer.len().saturating_sub(header_end.saturating_add(4));
    while body_read < content_length {
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(bytes) => body_read = body_read.saturating_add(bytes),
        }
    }

    let path = target.split_once('?').map_or(target, |(path, _)| path);
    Ok(WebRequest {
        method: method.to_ascii_uppercase(),
        path: path.to_owned(),
    })
}

fn find_header_end(buffer: &[u8]) -> Option<usize> {
    buffer.windows(4).position(|window| window == b"\r\n\r\n")
}

const fn status_text(status: u16) -> &'static str {
    match status {
        400 => "Bad Request",
        404 => "Not Found",
        413 => "Payload Too Large",
        500 => "Internal Server Error",
        _ => "OK",
    }
}

pub(super) async fn write_json<T: Serialize + ?Sized>(
    socket: &mut TcpStream,
    status: u16,
    value: &T,
) -> AppResult<()> {
    let body = serde_json::to_vec(value).map_err(|err| {
        AppError::http(HttpError::Serialize {
            context: "web response",
            source: err,
        })
    })?;
    write_response(socket, status, &body).await
}

pub(super) async fn write_error(socket: &mut TcpStream, status: u16, message: &str) -> AppResult<()> {
    #[derive(Serialize)]
    struct ErrorBody<'msg> {
        error: &'msg str,
    }
    write_json(socket, status, &ErrorBody { error: message }).await
}

async fn write_response(socket: &mut TcpStream, status: u16, body: &[u8]) -> AppResult<()> {
    let head = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        status,
        status_text(status),
        body.len()
    );
    socket.write_all(head.as_bytes()).await.map_err(|err| {
        AppError::http(HttpError::Write {
            context: "web response head",
            source: err,
        })
    })?;
    socket.write_all(body).await.map_err(|err| {
        AppError::http(HttpError::Write {
            context: "web response body",
            source: err,
        })
    })?;
    socket.flush().await.map_err(|err| {
        AppError::http(HttpError::Write {
            context: "web response",
            source: err,
        })
    })
}
