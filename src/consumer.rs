use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use bytes::Bytes;
use futures::{Stream, StreamExt};
use tokio::sync::Notify;
use tokio::task::JoinHandle;

use crate::decode::Utf8ChunkDecoder;
use crate::error::{ClientError, ErrorKind, Result, log_error};
use crate::lines::LineBuffer;
use crate::record::parse_record;

// ============================================================================
// Stream State
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum StreamState {
    Idle = 0,
    AwaitingResponse = 1,
    Streaming = 2,
    Completed = 3,
    Failed = 4,
    Cancelled = 5,
}

impl StreamState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => Self::AwaitingResponse,
            2 => Self::Streaming,
            3 => Self::Completed,
            4 => Self::Failed,
            5 => Self::Cancelled,
            _ => Self::Idle,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Self::AwaitingResponse | Self::Streaming)
    }
}

// ============================================================================
// Cancellation Token
// ============================================================================

/// Cooperative cancellation flag shared between a handle and the driver
/// task. The driver observes it at its one suspension point, the chunk read.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
    inner: Arc<CancelInner>,
}

#[derive(Debug, Default)]
struct CancelInner {
    cancelled: AtomicBool,
    notify: Notify,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Idempotent; a no-op once the stream has reached a terminal state.
    pub fn cancel(&self) {
        if !self.inner.cancelled.swap(true, Ordering::SeqCst) {
            self.inner.notify.notify_waiters();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Resolves once cancel() has been called.
    pub async fn cancelled(&self) {
        if self.is_cancelled() {
            return;
        }
        let notified = self.inner.notify.notified();
        tokio::pin!(notified);
        // Register the waiter before re-checking the flag, so a cancel()
        // landing in between still wakes this future. notify_waiters() only
        // reaches waiters that are already enabled.
        notified.as_mut().enable();
        if self.is_cancelled() {
            return;
        }
        notified.await;
    }
}

// ============================================================================
// Request & Sink
// ============================================================================

/// Immutable description of one generation request.
///
/// Preconditions (validated by the caller layer, not here): `model` and the
/// trimmed `prompt` are non-empty.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub model: String,
    pub prompt: String,
    pub endpoint: String,
}

impl GenerationRequest {
    pub fn new(
        model: impl Into<String>,
        prompt: impl Into<String>,
        endpoint: impl Into<String>,
    ) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            endpoint: endpoint.into(),
        }
    }
}

/// Caller-supplied sink for one request's lifecycle, invoked on the driver
/// task.
///
/// `on_fragment` fires zero or more times, each call carrying only the newly
/// decoded increment, in stream order. `on_complete` fires exactly once on
/// graceful end-of-stream with the exact concatenation of every fragment
/// delivered before it. `on_error` fires at most once, and only if
/// `on_complete` never did. Nothing fires after a terminal callback.
pub trait GenerationSink: Send + 'static {
    fn on_fragment(&mut self, text: &str);
    fn on_complete(&mut self, full_text: &str);
    fn on_error(&mut self, kind: ErrorKind, detail: &str);
}

// ============================================================================
// Consumer
// ============================================================================

/// Drives a single generation request from issuance to a terminal state.
/// At most one stream is active per consumer instance.
pub struct GenerationConsumer {
    client: reqwest::Client,
    state: Arc<AtomicU8>,
}

impl GenerationConsumer {
    pub fn new() -> Self {
        Self::with_client(reqwest::Client::new())
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client,
            state: Arc::new(AtomicU8::new(StreamState::Idle as u8)),
        }
    }

    pub fn state(&self) -> StreamState {
        StreamState::from_u8(self.state.load(Ordering::SeqCst))
    }

    /// Issue the request and stream its reply into `sink`.
    ///
    /// Rejected with `AlreadyActive` while a prior request on this instance
    /// has not reached a terminal state; the rejected request's sink sees no
    /// callbacks.
    pub fn start<S: GenerationSink>(
        &self,
        request: GenerationRequest,
        sink: S,
    ) -> Result<GenerationHandle> {
        let mut current = self.state.load(Ordering::SeqCst);
        loop {
            if StreamState::from_u8(current).is_active() {
                return Err(ClientError::already_active());
            }
            match self.state.compare_exchange(
                current,
                StreamState::AwaitingResponse as u8,
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => break,
                Err(actual) => current = actual,
            }
        }

        let token = CancellationToken::new();
        let task = tokio::spawn(run_request(
            self.client.clone(),
            request,
            sink,
            token.clone(),
            Arc::clone(&self.state),
        ));
        Ok(GenerationHandle { token, task })
    }
}

impl Default for GenerationConsumer {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle to an in-flight generation.
#[derive(Debug)]
pub struct GenerationHandle {
    token: CancellationToken,
    task: JoinHandle<()>,
}

impl GenerationHandle {
    /// Request cooperative cancellation. Idempotent; safe after completion.
    /// Already-delivered fragments remain valid.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Wait for the driver task to finish; all callbacks are done after this.
    pub async fn wait(self) {
        let _ = self.task.await;
    }
}

// ============================================================================
// Driver
// ============================================================================

async fn run_request<S: GenerationSink>(
    client: reqwest::Client,
    request: GenerationRequest,
    mut sink: S,
    token: CancellationToken,
    state: Arc<AtomicU8>,
) {
    log::info!("generation started: model={}", request.model);
    match drive(&client, &request, &mut sink, &token, &state).await {
        Ok(reply) => {
            state.store(StreamState::Completed as u8, Ordering::SeqCst);
            log::info!("generation completed: {} chars", reply.chars().count());
            sink.on_complete(&reply);
        }
        Err(err) => {
            let terminal = if err.kind == ErrorKind::Cancelled {
                StreamState::Cancelled
            } else {
                StreamState::Failed
            };
            state.store(terminal as u8, Ordering::SeqCst);
            log_error(&err);
            sink.on_error(err.kind, &err.detail);
        }
    }
}

async fn drive<S: GenerationSink>(
    client: &reqwest::Client,
    request: &GenerationRequest,
    sink: &mut S,
    token: &CancellationToken,
    state: &AtomicU8,
) -> Result<String> {
    let send = client
        .post(&request.endpoint)
        .json(&serde_json::json!({
            "model": request.model,
            "prompt": request.prompt,
            "stream": true,
        }))
        .send();
    let response = tokio::select! {
        biased;
        _ = token.cancelled() => return Err(ClientError::cancelled()),
        response = send => response.map_err(|e| ClientError::network(e.to_string()))?,
    };

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ClientError::http(status.as_u16(), body));
    }

    state.store(StreamState::Streaming as u8, Ordering::SeqCst);
    let chunks = response
        .bytes_stream()
        .map(|chunk| chunk.map_err(|e| e.to_string()));
    consume_ndjson(Box::pin(chunks), token, sink).await
}

/// The decode → split → parse → deliver loop over a chunked byte transport.
///
/// Separated from the HTTP plumbing so any byte stream can drive it.
pub(crate) async fn consume_ndjson<C, S>(
    mut chunks: C,
    token: &CancellationToken,
    sink: &mut S,
) -> Result<String>
where
    C: Stream<Item = std::result::Result<Bytes, String>> + Unpin,
    S: GenerationSink,
{
    let mut decoder = Utf8ChunkDecoder::new();
    let mut lines = LineBuffer::new();
    let mut reply = String::new();
    let mut received_any = false;

    loop {
        let next = tokio::select! {
            biased;
            _ = token.cancelled() => return Err(ClientError::cancelled()),
            next = chunks.next() => next,
        };
        let bytes = match next {
            None => break,
            Some(Ok(bytes)) => bytes,
            Some(Err(detail)) => {
                // A body that dies before yielding anything is unreadable,
                // not merely interrupted.
                return Err(if received_any {
                    ClientError::network(detail)
                } else {
                    ClientError::empty_body(detail)
                });
            }
        };
        if bytes.is_empty() {
            continue;
        }
        received_any = true;
        lines.push(&decoder.decode(&bytes));
        while let Some(line) = lines.next_line() {
            deliver_line(&line, &mut reply, sink);
        }
    }

    // A final record may arrive without a trailing newline.
    let mut tail = lines.take_pending();
    tail.push_str(&decoder.finish());
    deliver_line(&tail, &mut reply, sink);

    Ok(reply)
}

fn deliver_line<S: GenerationSink>(line: &str, reply: &mut String, sink: &mut S) {
    let Some(record) = parse_record(line) else {
        return;
    };
    if record.done {
        log::debug!("stream reported done");
    }
    if let Some(fragment) = record.response {
        reply.push_str(&fragment);
        sink.on_fragment(&fragment);
    }
}

// ============================================================================
// Tests
// ============================================================================
