pub mod claude_cli;

use async_trait::async_trait;
use futures::{TryStreamExt, stream::BoxStream};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info};

pub use claude_cli::ClaudeCli;

/// Answer returned when a conversation finishes without a result event
pub const NO_RESPONSE: &str = "No response available";

/// One record emitted by the AI backend while it works on a prompt.
/// Only `result` events are inspected; everything else is passed over.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QueryEvent {
    System {
        #[serde(default)]
        subtype: Option<String>,
    },
    Assistant {
        #[serde(default)]
        message: serde_json::Value,
    },
    User {
        #[serde(default)]
        message: serde_json::Value,
    },
    Result {
        #[serde(default)]
        subtype: Option<String>,
        #[serde(default)]
        result: Option<String>,
        #[serde(default)]
        is_error: bool,
        #[serde(default)]
        num_turns: Option<u32>,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryOptions {
    pub max_turns: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRequest {
    pub prompt: String,
    pub options: QueryOptions,
}

impl QueryRequest {
    pub fn new(prompt: impl Into<String>, max_turns: u32) -> Self {
        Self {
            prompt: prompt.into(),
            options: QueryOptions { max_turns },
        }
    }
}

/// Ordered, finite stream of events for a single prompt
pub type QueryStream = BoxStream<'static, anyhow::Result<QueryEvent>>;

/// A conversational AI backend that answers a prompt with a stream of events
#[async_trait]
pub trait QueryBackend: Send + Sync {
    async fn query(&self, request: QueryRequest) -> anyhow::Result<QueryStream>;
}

/// Resolves a prompt to a single textual answer through a [`QueryBackend`]
#[derive(Clone)]
pub struct QueryGateway {
    backend: Arc<dyn QueryBackend>,
}

impl QueryGateway {
    pub fn new(backend: Arc<dyn QueryBackend>) -> Self {
        Self { backend }
    }

    /// Runs the prompt and returns the payload of the first result event.
    ///
    /// The stream is always drained to the end: a result event is not
    /// guaranteed to be the last one emitted. Stream failures are returned
    /// as-is with no retry.
    pub async fn resolve(&self, prompt: &str, max_turns: u32) -> anyhow::Result<String> {
        info!("Resolving prompt with max_turns={}", max_turns);
        let stream = self
            .backend
            .query(QueryRequest::new(prompt, max_turns))
            .await?;

        let (event_count, first_result) = stream
            .try_fold(
                (0usize, None::<Option<String>>),
                |(count, first), event| async move {
                    debug!("Query event #{}: {:?}", count, event);
                    let first = match (first, event) {
                        (None, QueryEvent::Result { result, .. }) => Some(result),
                        (first, _) => first,
                    };
                    Ok::<_, anyhow::Error>((count + 1, first))
                },
            )
            .await?;

        info!("Query stream finished after {} events", event_count);

        Ok(first_result
            .flatten()
            .unwrap_or_else(|| NO_RESPONSE.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use serde_json::json;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Replays a fixed script of events and records what it was asked
    struct ScriptedBackend {
        script: Vec<Result<serde_json::Value, String>>,
        polled: Arc<AtomicUsize>,
        requests: Mutex<Vec<QueryRequest>>,
    }

    impl ScriptedBackend {
        fn new(script: Vec<Result<serde_json::Value, String>>) -> Self {
            Self {
                script,
                polled: Arc::new(AtomicUsize::new(0)),
                requests: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl QueryBackend for ScriptedBackend {
        async fn query(&self, request: QueryRequest) -> anyhow::Result<QueryStream> {
            self.requests.lock().unwrap().push(request);
            let polled = self.polled.clone();
            let items = self.script.clone().into_iter().map(move |item| -> anyhow::Result<QueryEvent> {
                polled.fetch_add(1, Ordering::SeqCst);
                match item {
                    Ok(value) => Ok(serde_json::from_value(value)?),
                    Err(msg) => Err(anyhow::anyhow!(msg)),
                }
            });
            Ok(Box::pin(stream::iter(items)))
        }
    }

    fn gateway(backend: ScriptedBackend) -> (QueryGateway, Arc<ScriptedBackend>) {
        let backend = Arc::new(backend);
        (QueryGateway::new(backend.clone()), backend)
    }

    #[test]
    fn test_event_decoding() {
        let event: QueryEvent = serde_json::from_value(json!({
            "type": "result",
            "subtype": "success",
            "result": "hello",
            "is_error": false,
            "num_turns": 2,
            "session_id": "abc"
        }))
        .unwrap();
        assert!(matches!(
            event,
            QueryEvent::Result { result: Some(ref r), num_turns: Some(2), .. } if r == "hello"
        ));

        let event: QueryEvent =
            serde_json::from_value(json!({"type": "stream_event", "delta": "x"})).unwrap();
        assert!(matches!(event, QueryEvent::Other));

        let event: QueryEvent =
            serde_json::from_value(json!({"type": "system", "subtype": "init"})).unwrap();
        assert!(matches!(event, QueryEvent::System { .. }));
    }

    #[tokio::test]
    async fn test_resolve_returns_result_payload() {
        let (gateway, backend) = gateway(ScriptedBackend::new(vec![
            Ok(json!({"type": "system", "subtype": "init"})),
            Ok(json!({"type": "assistant", "message": {"content": []}})),
            Ok(json!({"type": "result", "subtype": "success", "result": "42"})),
        ]));

        let answer = gateway.resolve("what is the answer?", 2).await.unwrap();
        assert_eq!(answer, "42");

        let requests = backend.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].prompt, "what is the answer?");
        assert_eq!(requests[0].options.max_turns, 2);
    }

    #[tokio::test]
    async fn test_resolve_drains_stream_after_result() {
        let (gateway, backend) = gateway(ScriptedBackend::new(vec![
            Ok(json!({"type": "result", "result": "first"})),
            Ok(json!({"type": "assistant"})),
            Ok(json!({"type": "result", "result": "second"})),
            Ok(json!({"type": "system"})),
        ]));

        let answer = gateway.resolve("prompt", 1).await.unwrap();
        assert_eq!(answer, "first");
        assert_eq!(backend.polled.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_resolve_without_result_event() {
        let (gateway, _) = gateway(ScriptedBackend::new(vec![
            Ok(json!({"type": "system"})),
            Ok(json!({"type": "assistant"})),
        ]));

        let answer = gateway.resolve("prompt", 1).await.unwrap();
        assert_eq!(answer, NO_RESPONSE);
    }

    #[tokio::test]
    async fn test_resolve_empty_stream() {
        let (gateway, _) = gateway(ScriptedBackend::new(vec![]));
        assert_eq!(gateway.resolve("prompt", 1).await.unwrap(), NO_RESPONSE);
    }

    #[tokio::test]
    async fn test_resolve_result_without_payload() {
        let (gateway, _) = gateway(ScriptedBackend::new(vec![
            Ok(json!({"type": "result", "subtype": "error_max_turns", "is_error": true})),
            Ok(json!({"type": "result", "result": "late"})),
        ]));

        let answer = gateway.resolve("prompt", 1).await.unwrap();
        assert_eq!(answer, NO_RESPONSE);
    }

    #[tokio::test]
    async fn test_resolve_propagates_stream_error() {
        let (gateway, _) = gateway(ScriptedBackend::new(vec![
            Ok(json!({"type": "result", "result": "partial"})),
            Err("boom".to_string()),
        ]));

        let err = gateway.resolve("prompt", 1).await.unwrap_err();
        assert_eq!(err.to_string(), "boom");
    }
}
