//! A scripted fake model for tests.
//!
//! The provider answers each assistant turn with a preset response, picked
//! by how many assistant messages the request already contains. Every
//! request is recorded so tests can check what the agent sent.

mod preset;

use std::collections::VecDeque;
use std::error::Error as StdError;
use std::fmt::{self, Display, Formatter};
use std::future::ready;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll, ready};
use std::time::Duration;

use steward_model::{
    ErrorKind, ModelFinishReason, ModelProvider, ModelProviderError,
    ModelRequest, ModelResponse, ModelResponseEvent, OpaqueMessage,
};
use tokio::time::{Sleep, sleep};

pub use preset::*;

#[derive(Debug)]
pub struct Error {
    message: String,
    kind: ErrorKind,
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.kind)
    }
}

impl StdError for Error {}

impl ModelProviderError for Error {
    #[inline]
    fn kind(&self) -> ErrorKind {
        self.kind
    }
}

pub struct TestModelResponse {
    events: VecDeque<ModelResponseEvent>,
    opaque_id: String,
    delay: Option<Duration>,
    sleep: Option<Pin<Box<Sleep>>>,
}

impl ModelResponse for TestModelResponse {
    type Error = crate::Error;

    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, Self::Error>> {
        // Every field is `Unpin`.
        let this = self.get_mut();

        if let Some(delay) = this.delay {
            let sleep = this
                .sleep
                .get_or_insert_with(|| Box::pin(sleep(delay)));
            ready!(sleep.as_mut().poll(cx));
            this.sleep = None;
        }
        Poll::Ready(Ok(this.events.pop_front()))
    }

    fn make_opaque_message(&self) -> Option<OpaqueMessage> {
        Some(OpaqueMessage::new(self.opaque_id.clone(), ()))
    }
}

struct Turn {
    preset: PresetResponse,
    attempts: u64,
}

#[derive(Default)]
struct Script {
    turns: Vec<Turn>,
    requests: Vec<ModelRequest>,
}

/// A local fake model for testing purpose.
///
/// Clones share the same script and request log.
///
/// # Note
///
/// This type is not optimized for production use, there are heavy memory
/// copies involved. You should only use it for testing.
#[derive(Clone, Default)]
pub struct TestModelProvider {
    script: Arc<Mutex<Script>>,
    delay: Option<Duration>,
}

impl TestModelProvider {
    /// Appends the response for the next assistant turn.
    pub fn add_assistant_turn(&mut self, preset: PresetResponse) {
        self.lock().turns.push(Turn {
            preset,
            attempts: 0,
        });
    }

    /// Delays every event by `duration`.
    #[inline]
    pub fn set_delay(&mut self, duration: Duration) {
        self.delay = Some(duration);
    }

    /// Returns all requests received so far, oldest first.
    pub fn requests(&self) -> Vec<ModelRequest> {
        self.lock().requests.clone()
    }

    fn lock(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn respond(&self, req: &ModelRequest) -> Result<TestModelResponse, Error> {
        let mut script = self.lock();
        script.requests.push(req.clone());

        let turn_idx = req.messages.iter().filter(|m| m.is_assistant()).count();
        let Some(turn) = script.turns.get_mut(turn_idx) else {
            return Err(Error {
                message: format!("no preset for assistant turn {turn_idx}"),
                kind: ErrorKind::Other,
            });
        };

        turn.attempts += 1;
        let should_fail = match turn.preset.failures {
            Some(0) => true,
            Some(failures) => turn.attempts <= failures,
            None => false,
        };
        if should_fail {
            return Err(Error {
                message: format!("injected failure on turn {turn_idx}"),
                kind: ErrorKind::RateLimitExceeded,
            });
        }

        let finish_reason = if turn.preset.has_tool_call() {
            ModelFinishReason::ToolCalls
        } else {
            ModelFinishReason::Stop
        };
        let events = turn
            .preset
            .events
            .iter()
            .map(|event| match event {
                PresetEvent::MessageDelta(text) => {
                    ModelResponseEvent::MessageDelta(text.clone())
                }
                PresetEvent::ToolCall(req) => {
                    ModelResponseEvent::ToolCall(req.clone())
                }
            })
            .chain([ModelResponseEvent::Completed(finish_reason)])
            .collect();

        Ok(TestModelResponse {
            events,
            opaque_id: format!("test-msg:{turn_idx}"),
            delay: self.delay,
            sleep: None,
        })
    }
}

impl ModelProvider for TestModelProvider {
    type Error = crate::Error;
    type Response = TestModelResponse;

    fn send_request(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<Self::Response, Self::Error>> + Send + 'static
    {
        ready(self.respond(req))
    }
}

#[cfg(test)]
mod tests {
    use std::future::poll_fn;
    use std::pin::pin;

    use serde_json::json;
    use steward_model::{ModelMessage, ToolCallRequest, ToolCallResult};

    use super::*;

    async fn collect(resp: TestModelResponse) -> Vec<ModelResponseEvent> {
        let mut resp = pin!(resp);
        let mut events = vec![];
        while let Some(event) = poll_fn(|cx| resp.as_mut().poll_next_event(cx))
            .await
            .unwrap()
        {
            events.push(event);
        }
        events
    }

    fn date_call() -> ToolCallRequest {
        ToolCallRequest {
            id: "call_1".to_owned(),
            name: "todays_date_time".to_owned(),
            arguments: json!({ "timeZone": "America/Chicago", "locale": "en-US" }),
        }
    }

    #[tokio::test]
    async fn test_turns_follow_assistant_count() {
        let mut provider = TestModelProvider::default();
        provider.add_assistant_turn(PresetResponse::tool_calls([date_call()]));
        provider.add_assistant_turn(PresetResponse::text("It is noon."));

        let mut req = ModelRequest {
            messages: vec![ModelMessage::User("What time is it?".to_owned())],
            tools: vec![],
        };
        let events = collect(provider.send_request(&req).await.unwrap()).await;
        assert_eq!(
            events,
            vec![
                ModelResponseEvent::ToolCall(date_call()),
                ModelResponseEvent::Completed(ModelFinishReason::ToolCalls),
            ]
        );

        req.messages.push(ModelMessage::Assistant {
            content: String::new(),
            tool_calls: vec![date_call()],
        });
        req.messages.push(ModelMessage::Tool(ToolCallResult {
            id: "call_1".to_owned(),
            content: "noon".to_owned(),
        }));
        let events = collect(provider.send_request(&req).await.unwrap()).await;
        assert_eq!(
            events,
            vec![
                ModelResponseEvent::MessageDelta("It is noon.".to_owned()),
                ModelResponseEvent::Completed(ModelFinishReason::Stop),
            ]
        );

        assert_eq!(provider.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_injected_failures() {
        let mut provider = TestModelProvider::default();
        provider.add_assistant_turn(PresetResponse::text("ok").with_failures(1));
        let req = ModelRequest {
            messages: vec![ModelMessage::User("hi".to_owned())],
            tools: vec![],
        };

        let Err(err) = provider.send_request(&req).await else {
            panic!("first attempt should fail");
        };
        assert_eq!(err.kind(), ErrorKind::RateLimitExceeded);
        assert!(provider.send_request(&req).await.is_ok());
    }

    #[tokio::test]
    async fn test_script_exhausted() {
        let provider = TestModelProvider::default();
        let req = ModelRequest {
            messages: vec![ModelMessage::User("hi".to_owned())],
            tools: vec![],
        };
        let Err(err) = provider.send_request(&req).await else {
            panic!("an empty script cannot answer");
        };
        assert_eq!(err.kind(), ErrorKind::Other);
    }

    #[tokio::test]
    async fn test_delay() {
        let mut provider = TestModelProvider::default();
        provider.add_assistant_turn(PresetResponse::text("slow"));
        provider.set_delay(Duration::from_millis(1));
        let req = ModelRequest {
            messages: vec![ModelMessage::User("hi".to_owned())],
            tools: vec![],
        };
        let events = collect(provider.send_request(&req).await.unwrap()).await;
        assert_eq!(events.len(), 2);
    }
}
