//! Streaming request bridge.
//!
//! One logical "send chat messages, receive streamed tokens" operation runs
//! over an indirect invocation channel: the backend is invoked with a random
//! correlation id, and progress events tagged with that id arrive later on a
//! push channel. [`ChatDispatcher`] owns the id-to-handler registry and a
//! single pump task that routes each event to the caller that requested it.

use std::collections::HashMap;
use std::error::Error as StdError;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

pub mod http;
pub mod models;

pub use models::{
    ChatInvocation, ChatOptions, ChatRequestOptions, ConversationRequest, ProgressPayload,
    RequestMessage, ACCESS_TYPE_ACCESS_TOKEN, ACCESS_TYPE_API_KEY,
};

/// Error delivered through the `on_error` callback of [`ChatDispatcher::send_chat`].
///
/// Cancellation and invocation failure share this type; they differ only in
/// the message, which is `"canceled"` for cancellation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatError {
    message: String,
}

impl ChatError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn canceled() -> Self {
        Self::new("canceled")
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_canceled(&self) -> bool {
        self.message == "canceled"
    }
}

impl fmt::Display for ChatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl StdError for ChatError {}

/// Error type backends report from an entry point.
pub type BackendError = Box<dyn StdError + Send + Sync>;

/// The two named backend entry points, selected by credential variant.
///
/// Implementations receive the full invocation (correlation id included) and
/// report progress out-of-band through the [`ProgressSender`] paired with the
/// dispatcher; the `Result` only signals acceptance or failure of the
/// invocation itself.
#[async_trait::async_trait]
pub trait ChatBackend: Send + Sync {
    async fn fetch_by_api_key(&self, invocation: ChatInvocation) -> Result<(), BackendError>;

    async fn fetch_by_access_token(&self, invocation: ChatInvocation) -> Result<(), BackendError>;
}

/// Producer half of the progress channel.
///
/// Handed to the transport that receives streamed updates from the backend;
/// every emitted payload is routed by correlation id inside the dispatcher.
#[derive(Clone)]
pub struct ProgressSender {
    tx: mpsc::UnboundedSender<ProgressPayload>,
}

impl ProgressSender {
    pub fn emit(&self, payload: ProgressPayload) {
        // The receiver lives as long as the dispatcher; a send failure just
        // means the process is shutting down.
        let _ = self.tx.send(payload);
    }
}

/// Callback receiving streamed progress for one request.
pub type ProgressFn = Box<dyn Fn(ProgressPayload) + Send + Sync>;

/// Callback receiving the single terminal error for one request, if any.
pub type ErrorFn = Box<dyn FnOnce(ChatError) + Send>;

type ProgressHandler = Box<dyn Fn(ProgressPayload) + Send + Sync>;

/// Owns the correlation registry for in-flight chat requests.
///
/// Constructed once at application startup and shared by handle. The first
/// `send_chat` call lazily spawns the single process-wide pump task that
/// drains the progress channel; the registry maps each in-flight correlation
/// id to the progress callback supplied by its caller.
pub struct ChatDispatcher {
    backend: Arc<dyn ChatBackend>,
    handlers: Arc<Mutex<HashMap<u32, ProgressHandler>>>,
    listening: AtomicBool,
    progress_rx: Mutex<Option<mpsc::UnboundedReceiver<ProgressPayload>>>,
}

impl ChatDispatcher {
    /// Create a dispatcher for `backend` along with the sender the transport
    /// uses to emit progress events.
    pub fn new(backend: Arc<dyn ChatBackend>) -> (Arc<Self>, ProgressSender) {
        let (tx, rx) = mpsc::unbounded_channel();
        let dispatcher = Arc::new(Self {
            backend,
            handlers: Arc::new(Mutex::new(HashMap::new())),
            listening: AtomicBool::new(false),
            progress_rx: Mutex::new(Some(rx)),
        });
        (dispatcher, ProgressSender { tx })
    }

    /// Number of requests currently holding a registered progress handler.
    ///
    /// Handlers are removed when the invocation settles or is canceled, so a
    /// value that keeps growing points at a backend that never settles.
    pub fn in_flight(&self) -> usize {
        self.handlers.lock().unwrap().len()
    }

    /// Issue one chat request and stream its progress back through `on_progress`.
    ///
    /// A random correlation id tags the invocation; progress events carrying
    /// that id are delivered to `on_progress` in emission order until the
    /// request settles. `on_error` fires at most once, with a `"canceled"`
    /// error if `cancel` triggers first or with the backend's message if the
    /// invocation fails. Events that arrive after the request settled are
    /// dropped.
    ///
    /// Returns the correlation id of the request.
    pub async fn send_chat(
        &self,
        messages: Vec<RequestMessage>,
        option: ChatRequestOptions,
        on_progress: Option<ProgressFn>,
        on_error: Option<ErrorFn>,
        cancel: Option<CancellationToken>,
    ) -> u32 {
        let id = random_correlation_id();
        let mut on_error = on_error;

        if let Some(on_progress) = on_progress {
            self.handlers.lock().unwrap().insert(id, on_progress);
        }
        self.ensure_listening();

        let invocation = ChatInvocation {
            id,
            messages,
            option,
        };
        tracing::debug!(id, access_type = %invocation.option.chat.access_type, "dispatching chat request");

        let invoke = async {
            if invocation.option.chat.access_type == ACCESS_TYPE_API_KEY {
                self.backend.fetch_by_api_key(invocation).await
            } else {
                self.backend.fetch_by_access_token(invocation).await
            }
        };

        match cancel {
            Some(token) => {
                tokio::select! {
                    _ = token.cancelled() => {
                        self.handlers.lock().unwrap().remove(&id);
                        if let Some(on_error) = on_error.take() {
                            on_error(ChatError::canceled());
                        }
                    }
                    result = invoke => self.settle(id, result, &mut on_error),
                }
            }
            None => {
                let result = invoke.await;
                self.settle(id, result, &mut on_error);
            }
        }

        id
    }

    /// Remove the handler for a settled request and surface a failure, if
    /// any, through the (not yet consumed) error callback.
    fn settle(&self, id: u32, result: Result<(), BackendError>, on_error: &mut Option<ErrorFn>) {
        if let Err(err) = result {
            tracing::debug!(id, error = %err, "chat invocation failed");
            if let Some(on_error) = on_error.take() {
                on_error(ChatError::new(err.to_string()));
            }
        }
        self.handlers.lock().unwrap().remove(&id);
    }

    /// Spawn the progress pump exactly once for the process lifetime.
    fn ensure_listening(&self) {
        if self.listening.swap(true, Ordering::SeqCst) {
            return;
        }
        let Some(mut rx) = self.progress_rx.lock().unwrap().take() else {
            return;
        };
        let handlers = Arc::clone(&self.handlers);
        tokio::spawn(async move {
            while let Some(payload) = rx.recv().await {
                // Handlers run under the registry lock; they must not call
                // back into the dispatcher.
                let guard = handlers.lock().unwrap();
                match guard.get(&payload.id) {
                    Some(handler) => handler(payload),
                    None => {
                        tracing::debug!(id = payload.id, "dropping progress event with no handler")
                    }
                }
            }
        });
    }
}

/// Random unsigned 32-bit correlation id for one in-flight request.
fn random_correlation_id() -> u32 {
    let mut bytes = [0_u8; 4];
    if getrandom::fill(&mut bytes).is_ok() {
        return u32::from_ne_bytes(bytes);
    }
    // Best-effort fallback when the OS entropy source is unavailable.
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0);
    let mut x = nanos ^ ((std::process::id() as u64) << 32);
    x ^= x << 13;
    x ^= x >> 7;
    x ^= x << 17;
    x as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;
    use tokio::sync::Semaphore;

    struct TestBackend {
        calls: StdMutex<Vec<(&'static str, u32, String)>>,
        gate: Semaphore,
        fail_with: Option<String>,
    }

    impl TestBackend {
        fn settling() -> Arc<Self> {
            Arc::new(Self {
                calls: StdMutex::new(Vec::new()),
                gate: Semaphore::new(Semaphore::MAX_PERMITS),
                fail_with: None,
            })
        }

        fn gated() -> Arc<Self> {
            Arc::new(Self {
                calls: StdMutex::new(Vec::new()),
                gate: Semaphore::new(0),
                fail_with: None,
            })
        }

        fn failing(message: &str) -> Arc<Self> {
            Arc::new(Self {
                calls: StdMutex::new(Vec::new()),
                gate: Semaphore::new(Semaphore::MAX_PERMITS),
                fail_with: Some(message.to_string()),
            })
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }

        fn id_for_model(&self, model: &str) -> u32 {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .find(|(_, _, m)| m == model)
                .map(|(_, id, _)| *id)
                .expect("no invocation recorded for model")
        }

        async fn record(
            &self,
            entry_point: &'static str,
            invocation: ChatInvocation,
        ) -> Result<(), BackendError> {
            self.calls.lock().unwrap().push((
                entry_point,
                invocation.id,
                invocation.option.chat.model.clone(),
            ));
            let _permit = self.gate.acquire().await;
            match &self.fail_with {
                Some(message) => Err(message.clone().into()),
                None => Ok(()),
            }
        }
    }

    #[async_trait::async_trait]
    impl ChatBackend for TestBackend {
        async fn fetch_by_api_key(&self, invocation: ChatInvocation) -> Result<(), BackendError> {
            self.record("api_key", invocation).await
        }

        async fn fetch_by_access_token(
            &self,
            invocation: ChatInvocation,
        ) -> Result<(), BackendError> {
            self.record("access_token", invocation).await
        }
    }

    fn options(access_type: &str, model: &str) -> ChatRequestOptions {
        ChatRequestOptions::new(ChatOptions {
            api_key: "sk-test".into(),
            access_token: "tok-test".into(),
            access_type: access_type.into(),
            proxy: None,
            model: model.into(),
            system_message: String::new(),
            temperature: 0.7,
        })
    }

    fn user_message(content: &str) -> Vec<RequestMessage> {
        vec![RequestMessage {
            role: "user".into(),
            content: content.into(),
        }]
    }

    async fn wait_until(mut condition: impl FnMut() -> bool) {
        for _ in 0..200 {
            if condition() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("condition not met within timeout");
    }

    #[tokio::test]
    async fn access_type_selects_backend_entry_point() {
        let backend = TestBackend::settling();
        let (dispatcher, _progress) = ChatDispatcher::new(backend.clone());

        dispatcher
            .send_chat(user_message("hi"), options(ACCESS_TYPE_API_KEY, "m"), None, None, None)
            .await;
        dispatcher
            .send_chat(user_message("hi"), options(ACCESS_TYPE_ACCESS_TOKEN, "m"), None, None, None)
            .await;
        // Anything other than "0" falls back to the access-token entry point.
        dispatcher
            .send_chat(user_message("hi"), options("7", "m"), None, None, None)
            .await;

        let calls = backend.calls.lock().unwrap();
        let entry_points: Vec<&str> = calls.iter().map(|(e, _, _)| *e).collect();
        assert_eq!(entry_points, ["api_key", "access_token", "access_token"]);
    }

    #[tokio::test]
    async fn no_progress_callback_registers_no_handler() {
        let backend = TestBackend::gated();
        let (dispatcher, _progress) = ChatDispatcher::new(backend.clone());

        let send = {
            let dispatcher = dispatcher.clone();
            tokio::spawn(async move {
                dispatcher
                    .send_chat(user_message("hi"), options(ACCESS_TYPE_API_KEY, "m"), None, None, None)
                    .await
            })
        };

        wait_until(|| backend.call_count() == 1).await;
        assert_eq!(dispatcher.in_flight(), 0);

        backend.gate.add_permits(1);
        send.await.expect("send task panicked");
        assert_eq!(dispatcher.in_flight(), 0);
    }

    #[tokio::test]
    async fn cancellation_fires_error_callback_exactly_once() {
        let backend = TestBackend::gated();
        let (dispatcher, _progress) = ChatDispatcher::new(backend);

        let errors = Arc::new(StdMutex::new(Vec::new()));
        let sink = errors.clone();
        let token = CancellationToken::new();
        token.cancel();

        dispatcher
            .send_chat(
                user_message("hi"),
                options(ACCESS_TYPE_API_KEY, "m"),
                None,
                Some(Box::new(move |err| sink.lock().unwrap().push(err))),
                Some(token),
            )
            .await;

        let errors = errors.lock().unwrap();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].is_canceled());
        assert_eq!(errors[0].message(), "canceled");
        assert_eq!(dispatcher.in_flight(), 0);
    }

    #[tokio::test]
    async fn error_callback_fires_at_most_once_under_cancel_and_failure() {
        // Both terminal outcomes are possible here; whichever loses must be a
        // no-op because the callback was already consumed.
        let backend = TestBackend::failing("boom");
        let (dispatcher, _progress) = ChatDispatcher::new(backend);

        let errors = Arc::new(StdMutex::new(Vec::new()));
        let sink = errors.clone();
        let token = CancellationToken::new();
        token.cancel();

        dispatcher
            .send_chat(
                user_message("hi"),
                options(ACCESS_TYPE_API_KEY, "m"),
                None,
                Some(Box::new(move |err| sink.lock().unwrap().push(err))),
                Some(token),
            )
            .await;

        assert_eq!(errors.lock().unwrap().len(), 1);
        assert_eq!(dispatcher.in_flight(), 0);
    }

    #[tokio::test]
    async fn invocation_failure_wraps_backend_message() {
        let backend = TestBackend::failing("upstream exploded");
        let (dispatcher, _progress) = ChatDispatcher::new(backend);

        let errors = Arc::new(StdMutex::new(Vec::new()));
        let sink = errors.clone();

        dispatcher
            .send_chat(
                user_message("hi"),
                options(ACCESS_TYPE_ACCESS_TOKEN, "m"),
                Some(Box::new(|_| {})),
                Some(Box::new(move |err| sink.lock().unwrap().push(err))),
                None,
            )
            .await;

        let errors = errors.lock().unwrap();
        assert_eq!(errors.len(), 1);
        assert!(!errors[0].is_canceled());
        assert!(errors[0].message().contains("upstream exploded"));
        assert_eq!(dispatcher.in_flight(), 0);
    }

    #[tokio::test]
    async fn progress_events_route_by_correlation_id_in_order() {
        let backend = TestBackend::gated();
        let (dispatcher, progress) = ChatDispatcher::new(backend.clone());

        let received_x = Arc::new(StdMutex::new(Vec::new()));
        let received_y = Arc::new(StdMutex::new(Vec::new()));

        let spawn_send = |model: &'static str, sink: Arc<StdMutex<Vec<String>>>| {
            let dispatcher = dispatcher.clone();
            tokio::spawn(async move {
                dispatcher
                    .send_chat(
                        user_message("hi"),
                        options(ACCESS_TYPE_API_KEY, model),
                        Some(Box::new(move |payload| {
                            sink.lock().unwrap().push(payload.detail)
                        })),
                        None,
                        None,
                    )
                    .await
            })
        };
        let send_x = spawn_send("model-x", received_x.clone());
        let send_y = spawn_send("model-y", received_y.clone());

        wait_until(|| backend.call_count() == 2).await;
        assert_eq!(dispatcher.in_flight(), 2);
        let id_x = backend.id_for_model("model-x");
        let id_y = backend.id_for_model("model-y");

        for (id, detail) in [(id_x, "x-first"), (id_y, "y-only"), (id_x, "x-second")] {
            progress.emit(ProgressPayload {
                id,
                detail: detail.into(),
                finish_reason: String::new(),
                role: "assistant".into(),
                conversation_id: None,
                parent_message_id: None,
            });
        }

        wait_until(|| received_x.lock().unwrap().len() == 2).await;
        wait_until(|| received_y.lock().unwrap().len() == 1).await;
        assert_eq!(*received_x.lock().unwrap(), ["x-first", "x-second"]);
        assert_eq!(*received_y.lock().unwrap(), ["y-only"]);

        backend.gate.add_permits(2);
        send_x.await.expect("send task panicked");
        send_y.await.expect("send task panicked");
        assert_eq!(dispatcher.in_flight(), 0);
    }

    #[tokio::test]
    async fn late_events_for_settled_requests_are_dropped() {
        let backend = TestBackend::settling();
        let (dispatcher, progress) = ChatDispatcher::new(backend);

        let received = Arc::new(StdMutex::new(Vec::new()));
        let sink = received.clone();
        let id = dispatcher
            .send_chat(
                user_message("hi"),
                options(ACCESS_TYPE_API_KEY, "m"),
                Some(Box::new(move |payload| {
                    sink.lock().unwrap().push(payload.detail)
                })),
                None,
                None,
            )
            .await;
        assert_eq!(dispatcher.in_flight(), 0);

        progress.emit(ProgressPayload {
            id,
            detail: "too late".into(),
            finish_reason: "stop".into(),
            role: "assistant".into(),
            conversation_id: None,
            parent_message_id: None,
        });
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(received.lock().unwrap().is_empty());
    }
}
