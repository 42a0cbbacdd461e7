//! Transparent response decorator that observes status and body size

use axum::body::{Body, Bytes, HttpBody};
use axum::http::StatusCode;
use axum::response::Response;
use http_body::{Frame, SizeHint};
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use tracing::{debug, Span};

/// Records the status of the first response it sees and counts the bytes
/// its body yields. Frames are forwarded untouched; nothing is buffered.
#[derive(Debug)]
pub struct ResponseRecorder {
    status: Option<StatusCode>,
    written: Arc<AtomicUsize>,
    span: Span,
}

impl ResponseRecorder {
    pub fn new(span: Span) -> Self {
        Self {
            status: None,
            written: Arc::new(AtomicUsize::new(0)),
            span,
        }
    }

    /// Observe `response`, returning it with its body wrapped in a [`RecordedBody`].
    pub fn record(&mut self, response: Response) -> Response {
        if self.status.is_none() {
            self.status = Some(response.status());
        }

        let written = self.written.clone();
        let span = self.span.clone();
        response.map(|inner| {
            Body::new(RecordedBody {
                inner,
                written,
                span,
                finished: false,
            })
        })
    }

    /// Status of the first recorded response, if any
    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    /// Body bytes yielded so far
    pub fn bytes_written(&self) -> usize {
        self.written.load(Ordering::Relaxed)
    }
}

/// Body wrapper that tallies data frames as they are polled
pub struct RecordedBody {
    inner: Body,
    written: Arc<AtomicUsize>,
    span: Span,
    finished: bool,
}

impl RecordedBody {
    pub fn into_inner(self) -> Body {
        self.inner
    }
}

impl HttpBody for RecordedBody {
    type Data = Bytes;
    type Error = axum::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.get_mut();
        let poll = Pin::new(&mut this.inner).poll_frame(cx);

        match &poll {
            Poll::Ready(Some(Ok(frame))) => {
                if let Some(data) = frame.data_ref() {
                    this.written.fetch_add(data.len(), Ordering::Relaxed);
                }
            }
            Poll::Ready(None) if !this.finished => {
                this.finished = true;
                let bytes = this.written.load(Ordering::Relaxed);
                this.span.in_scope(|| debug!(bytes, "Response body sent"));
            }
            _ => {}
        }

        poll
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}
