//! Adapts a `reqwest` byte stream into the `AsyncRead` expected by
//! `rspp_core::sse::parse_sse`, so the shared SSE framer can drive any
//! streaming HTTP response body.

use std::io;

use futures_util::TryStreamExt;
use tokio::io::AsyncRead;
use tokio_util::io::StreamReader;

/// Wrap a streaming response body as an `AsyncRead`.
pub fn response_as_async_read(response: reqwest::Response) -> impl AsyncRead + Unpin {
    let stream = response
        .bytes_stream()
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e));
    StreamReader::new(stream)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    #[tokio::test]
    async fn reads_response_body_through_to_completion() {
        let server = httpmock::MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(httpmock::Method::GET).path("/sse");
                then.status(200).body("data: hello\n\n");
            })
            .await;

        let response = reqwest::get(server.url("/sse")).await.unwrap();
        let mut reader = response_as_async_read(response);
        let mut out = String::new();
        reader.read_to_string(&mut out).await.unwrap();

        mock.assert_async().await;
        assert_eq!(out, "data: hello\n\n");
    }
}
