use std::future::poll_fn;
use std::pin::{Pin, pin};
use std::sync::Arc;

use steward_model::{
    ModelFinishReason, ModelProvider, ModelProviderError, ModelRequest,
    ModelResponse, ModelResponseEvent, OpaqueMessage, ToolCallRequest,
};
use tracing::Instrument;

use crate::conversation::AiMessage;

pub(crate) type OnDelta = Arc<dyn Fn(&str) + Send + Sync>;

type SendRequestResult = Result<AiMessage, Box<dyn ModelProviderError>>;
type BoxedSendRequestFuture =
    Pin<Box<dyn Future<Output = SendRequestResult> + Send>>;
type HandlerFn =
    Arc<dyn Fn(ModelRequest, Option<OnDelta>) -> BoxedSendRequestFuture + Send + Sync>;

/// A type-erased handle to a model provider.
///
/// It drives one streamed response to completion and folds its events
/// into a single [`AiMessage`].
#[derive(Clone)]
pub(crate) struct ModelClient {
    handler_fn: HandlerFn,
}

impl ModelClient {
    pub fn new<P: ModelProvider + 'static>(provider: P) -> Self {
        // Erase `P` so the agent does not need a generic parameter.
        let handler_fn: HandlerFn = Arc::new(move |req, on_delta| {
            let fut = provider.send_request(&req);
            Box::pin(
                async move {
                    trace!(
                        "sending {} messages, {} tools",
                        req.messages.len(),
                        req.tools.len()
                    );
                    match fut.await {
                        Ok(resp) => collect_response(resp, on_delta).await,
                        Err(err) => {
                            error!("model request failed: {err}");
                            Err(Box::new(err) as Box<dyn ModelProviderError>)
                        }
                    }
                }
                .instrument(trace_span!("model request")),
            )
        });
        Self { handler_fn }
    }

    /// Sends a request and waits for the complete answer. Text deltas are
    /// forwarded to `on_delta` as they arrive.
    #[inline]
    pub async fn send_request(
        &self,
        req: ModelRequest,
        on_delta: Option<OnDelta>,
    ) -> SendRequestResult {
        (self.handler_fn)(req, on_delta).await
    }
}

async fn collect_response<R: ModelResponse>(
    resp: R,
    on_delta: Option<OnDelta>,
) -> SendRequestResult {
    let mut content = String::new();
    let mut tool_calls: Vec<ToolCallRequest> = Vec::new();
    let mut finish_reason = None;

    let mut resp = pin!(resp);
    loop {
        let event = poll_fn(|cx| resp.as_mut().poll_next_event(cx))
            .await
            .map_err(|err| {
                error!("model response broke off: {err}");
                Box::new(err) as Box<dyn ModelProviderError>
            })?;
        let Some(event) = event else {
            break;
        };
        trace!("got an event: {event:?}");

        match event {
            ModelResponseEvent::MessageDelta(delta) => {
                if let Some(on_delta) = &on_delta {
                    on_delta(&delta);
                }
                content.push_str(&delta);
            }
            ModelResponseEvent::ToolCall(req) => tool_calls.push(req),
            ModelResponseEvent::Completed(reason) => finish_reason = Some(reason),
        }
    }

    match finish_reason {
        Some(ModelFinishReason::Length) => {
            warn!("model output was truncated by the token limit");
        }
        Some(ModelFinishReason::ContentFilter) => {
            warn!("model output was withheld by a content filter");
        }
        _ => {}
    }

    // Only ask for the opaque message once the stream is drained.
    let opaque: Option<OpaqueMessage> = resp.make_opaque_message();
    debug!(
        "model answered with {} chars and {} tool calls",
        content.len(),
        tool_calls.len()
    );
    Ok(AiMessage {
        content,
        tool_calls,
        opaque,
    })
}
