//! In-memory executor for client tests.

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::error::TransportError;
use crate::gemini::executor::{HttpExecutor, HttpRequest, HttpResponse};

enum Reply {
    Body { status: u16, body: Bytes },
    Error(TransportError),
    Endless { status: u16, chunk: Bytes, pulled: Arc<AtomicUsize> },
    Pending,
}

#[derive(Default)]
struct State {
    replies: VecDeque<Reply>,
    requests: Vec<HttpRequest>,
}

/// Records every request and answers from a queue. With an empty queue it
/// answers `200 {}`.
#[derive(Clone, Default)]
pub struct MockExecutor {
    state: Arc<Mutex<State>>,
}

impl MockExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, reply: Reply) {
        self.state.lock().unwrap().replies.push_back(reply);
    }

    pub fn enqueue(&self, status: u16, body: impl Into<Bytes>) {
        self.push(Reply::Body {
            status,
            body: body.into(),
        });
    }

    pub fn enqueue_error(&self, error: TransportError) {
        self.push(Reply::Error(error));
    }

    /// Body that never ends, served `chunk_size` bytes at a time. The returned
    /// counter tracks how many chunks were pulled.
    pub fn enqueue_endless(&self, status: u16, chunk_size: usize) -> Arc<AtomicUsize> {
        let pulled = Arc::new(AtomicUsize::new(0));
        self.push(Reply::Endless {
            status,
            chunk: Bytes::from(vec![b'a'; chunk_size]),
            pulled: pulled.clone(),
        });
        pulled
    }

    /// Next call never completes.
    pub fn enqueue_pending(&self) {
        self.push(Reply::Pending);
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.state.lock().unwrap().requests.clone()
    }

    pub fn request_count(&self) -> usize {
        self.state.lock().unwrap().requests.len()
    }

    pub fn last_request(&self) -> Option<HttpRequest> {
        self.state.lock().unwrap().requests.last().cloned()
    }
}

#[async_trait]
impl HttpExecutor for MockExecutor {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let reply = {
            let mut state = self.state.lock().unwrap();
            state.requests.push(request);
            state.replies.pop_front()
        };

        match reply {
            None => Ok(HttpResponse::from_bytes(200, "{}")),
            Some(Reply::Body { status, body }) => Ok(HttpResponse::from_bytes(status, body)),
            Some(Reply::Error(e)) => Err(e),
            Some(Reply::Endless {
                status,
                chunk,
                pulled,
            }) => Ok(HttpResponse::new(
                status,
                stream::repeat_with(move || {
                    pulled.fetch_add(1, Ordering::SeqCst);
                    Ok(chunk.clone())
                }),
            )),
            Some(Reply::Pending) => futures::future::pending().await,
        }
    }
}
