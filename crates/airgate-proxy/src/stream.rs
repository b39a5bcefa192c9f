//! Relaying upstream responses to the caller

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use airgate_core::headers::downstream_response_headers;
use axum::body::Body;
use axum::response::Response;
use bytes::Bytes;
use futures_util::Stream;

use crate::forwarder::{BodyStream, UpstreamFailure, UpstreamResponse};

/// Largest frame handed to the connection in one write
pub const FRAME_SIZE: usize = 4096;

/// Passes an upstream body through in frames of at most [`FRAME_SIZE`]
///
/// Each frame is yielded as soon as it is available so token streams reach
/// the caller without buffering. Dropping the relay drops the upstream body,
/// which closes the upstream connection.
pub struct RelayStream {
    upstream: BodyStream,
    pending: Bytes,
    account: String,
    relayed: usize,
    finished: bool,
}

impl RelayStream {
    pub fn new(upstream: BodyStream, account: impl Into<String>) -> Self {
        Self {
            upstream,
            pending: Bytes::new(),
            account: account.into(),
            relayed: 0,
            finished: false,
        }
    }

    fn next_frame(&mut self) -> Bytes {
        let len = self.pending.len().min(FRAME_SIZE);
        self.relayed += len;
        self.pending.split_to(len)
    }
}

impl Stream for RelayStream {
    type Item = Result<Bytes, io::Error>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        loop {
            if !this.pending.is_empty() {
                return Poll::Ready(Some(Ok(this.next_frame())));
            }

            if this.finished {
                return Poll::Ready(None);
            }

            match this.upstream.as_mut().poll_next(cx) {
                Poll::Pending => return Poll::Pending,
                Poll::Ready(Some(Ok(chunk))) => this.pending = chunk,
                Poll::Ready(Some(Err(e))) => {
                    this.finished = true;
                    tracing::warn!(
                        account = %this.account,
                        relayed_bytes = this.relayed,
                        error = %e,
                        "upstream stream failed, aborting response"
                    );
                    return Poll::Ready(Some(Err(e)));
                }
                Poll::Ready(None) => {
                    this.finished = true;
                    tracing::debug!(account = %this.account, relayed_bytes = this.relayed, "upstream stream complete");
                    return Poll::Ready(None);
                }
            }
        }
    }
}

impl Drop for RelayStream {
    fn drop(&mut self) {
        if !self.finished {
            tracing::info!(
                account = %self.account,
                relayed_bytes = self.relayed,
                "client disconnected before upstream finished"
            );
        }
    }
}

/// Response streaming a successful upstream reply
pub fn relay(upstream: UpstreamResponse, account: &str) -> Response {
    let mut response = Response::new(Body::from_stream(RelayStream::new(upstream.body, account)));
    *response.status_mut() = upstream.status;
    *response.headers_mut() = downstream_response_headers(&upstream.headers);
    response
}

/// Response repeating a failed upstream reply as received
pub fn replay(failure: UpstreamFailure) -> Response {
    let mut response = Response::new(Body::from(failure.body));
    *response.status_mut() = failure.status;
    *response.headers_mut() = downstream_response_headers(&failure.headers);
    response
}
