use std::pin::Pin;
use std::task::{Context, Poll, ready};

use pin_project_lite::pin_project;
use serde_json::Value;
use steward_model::{
    ErrorKind, ModelFinishReason, ModelResponse, ModelResponseEvent,
    OpaqueMessage, ToolCallRequest,
};

use crate::Error;
use crate::io::Sse;
use crate::proto::{ChatCompletionChunk, Message, ToolCall};

/// Everything accumulated from the stream so far.
struct StreamState {
    sse: Sse,
    id: Option<String>,
    content: String,
    reasoning_content: Option<String>,
    tool_calls: Vec<ToolCall>,
    // Tool calls are only handed out once their arguments are complete,
    // which is known when the stream finishes.
    emitted_tool_calls: usize,
    finish_reason: Option<ModelFinishReason>,
    finish_emitted: bool,
    ended: bool,
}

impl StreamState {
    fn new(sse: Sse) -> Self {
        Self {
            sse,
            id: None,
            content: String::new(),
            reasoning_content: None,
            tool_calls: Vec::new(),
            emitted_tool_calls: 0,
            finish_reason: None,
            finish_emitted: false,
            ended: false,
        }
    }

    fn into_message(self) -> Option<(String, Message)> {
        Some((
            self.id?,
            Message::Assistant {
                content: (!self.content.is_empty()).then_some(self.content),
                tool_calls: (!self.tool_calls.is_empty())
                    .then_some(self.tool_calls),
                reasoning_content: self.reasoning_content,
            },
        ))
    }

    fn merge_tool_call(&mut self, fragment: ToolCall) {
        let existing = self
            .tool_calls
            .iter_mut()
            .find(|t| fragment.index.is_some() && t.index == fragment.index);
        let Some(existing) = existing else {
            self.tool_calls.push(fragment);
            return;
        };
        if let Some(id) = fragment.id {
            existing.id.get_or_insert_default().push_str(&id);
        }
        if let Some(ty) = fragment.r#type {
            // Some servers repeat the type on every fragment.
            existing.r#type.get_or_insert(ty);
        }
        let Some(function) = fragment.function else {
            return;
        };
        match &mut existing.function {
            Some(partial) => {
                if let Some(name) = function.name {
                    partial.name.get_or_insert_default().push_str(&name);
                }
                if let Some(arguments) = function.arguments {
                    partial
                        .arguments
                        .get_or_insert_default()
                        .push_str(&arguments);
                }
            }
            None => existing.function = Some(function),
        }
    }

    fn tool_call_request(&self, idx: usize) -> Result<ToolCallRequest, Error> {
        let call = &self.tool_calls[idx];
        let function = call.function.as_ref();
        let name = function.and_then(|f| f.name.clone()).unwrap_or_default();
        let raw_arguments = function
            .and_then(|f| f.arguments.as_deref())
            .filter(|args| !args.trim().is_empty())
            .unwrap_or("{}");
        let arguments = serde_json::from_str::<Value>(raw_arguments).map_err(
            |err| {
                Error::new(
                    format!("malformed arguments for tool `{name}`: {err}"),
                    ErrorKind::Other,
                )
            },
        )?;
        Ok(ToolCallRequest {
            id: call.id.clone().unwrap_or_else(|| format!("call_{idx}")),
            name,
            arguments,
        })
    }
}

type PinnedFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;
type NextEvent = Result<(Option<ModelResponseEvent>, StreamState), Error>;

pin_project! {
    /// A streamed chat completion.
    pub struct OpenAIResponse {
        next_event_fut: Option<PinnedFuture<NextEvent>>,
        full_msg: Option<(String, Message)>,
    }
}

impl OpenAIResponse {
    pub(crate) fn from_sse(sse: Sse) -> Self {
        let state = StreamState::new(sse);
        Self {
            next_event_fut: Some(Box::pin(next_event(state))),
            full_msg: None,
        }
    }
}

impl ModelResponse for OpenAIResponse {
    type Error = crate::Error;

    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, Self::Error>> {
        let this = self.project();
        let Some(next_event_fut) = this.next_event_fut else {
            return Poll::Ready(Ok(None));
        };
        let (event, state) = match ready!(next_event_fut.as_mut().poll(cx)) {
            Ok((Some(event), state)) => (event, state),
            Ok((None, state)) => {
                *this.next_event_fut = None;
                *this.full_msg = state.into_message();
                return Poll::Ready(Ok(None));
            }
            Err(err) => {
                *this.next_event_fut = None;
                return Poll::Ready(Err(err));
            }
        };

        *this.next_event_fut = Some(Box::pin(next_event(state)));
        Poll::Ready(Ok(Some(event)))
    }

    fn make_opaque_message(&self) -> Option<OpaqueMessage> {
        self.full_msg
            .as_ref()
            .map(|(id, msg)| OpaqueMessage::new(id, msg.clone()))
    }
}

async fn next_event(mut state: StreamState) -> NextEvent {
    while !state.ended {
        let payload = match state.sse.next_event().await {
            Ok(Some(payload)) => payload,
            Ok(None) => {
                state.ended = true;
                break;
            }
            Err(err) => {
                return Err(Error::new(
                    format!("broken event stream: {err:?}"),
                    ErrorKind::Other,
                ));
            }
        };
        trace!("got sse event: {payload}");
        if payload == "[DONE]" {
            state.ended = true;
            break;
        }

        let mut chunk = serde_json::from_str::<ChatCompletionChunk>(&payload)
            .map_err(|err| Error::new(format!("{err}"), ErrorKind::Other))?;

        // Usage reports and content-filter preambles carry no choices.
        let Some(choice) = chunk.choices.pop() else {
            continue;
        };
        if state.id.get_or_insert_with(|| chunk.id.clone()) != &chunk.id {
            return Err(Error::new("chunk id mismatch", ErrorKind::Other));
        }

        let mut message_delta = None;
        if let Some(content) = choice.delta.content.filter(|c| !c.is_empty())
        {
            state.content.push_str(&content);
            message_delta = Some(content);
        }
        if let Some(reasoning) = choice.delta.reasoning_content {
            state
                .reasoning_content
                .get_or_insert_default()
                .push_str(&reasoning);
        }
        for fragment in choice.delta.tool_calls.into_iter().flatten() {
            state.merge_tool_call(fragment);
        }
        if let Some(reason) = choice.finish_reason {
            state.finish_reason = Some(ModelFinishReason::from_wire(&reason));
        }

        if let Some(delta) = message_delta {
            return Ok((Some(ModelResponseEvent::MessageDelta(delta)), state));
        }
    }

    // Text deltas are already out. Now the completed tool calls in order,
    // then the finish reason.
    if state.emitted_tool_calls < state.tool_calls.len() {
        let request = state.tool_call_request(state.emitted_tool_calls)?;
        state.emitted_tool_calls += 1;
        return Ok((Some(ModelResponseEvent::ToolCall(request)), state));
    }

    if !state.finish_emitted {
        state.finish_emitted = true;
        let reason = match state.finish_reason {
            Some(reason) => reason,
            None if state.tool_calls.is_empty() => ModelFinishReason::Stop,
            None => ModelFinishReason::ToolCalls,
        };
        return Ok((Some(ModelResponseEvent::Completed(reason)), state));
    }

    Ok((None, state))
}

#[cfg(test)]
mod tests {
    use std::future::poll_fn;
    use std::pin::pin;

    use serde_json::json;
    use steward_model::ModelProviderError;

    use super::*;
    use crate::io::Chunks;

    async fn collect(chunks: Chunks) -> (Vec<ModelResponseEvent>, OpaqueMessage) {
        let mut resp = pin!(OpenAIResponse::from_sse(Sse::new(chunks)));
        let mut events = vec![];
        while let Some(event) = poll_fn(|cx| resp.as_mut().poll_next_event(cx))
            .await
            .unwrap()
        {
            events.push(event);
        }
        (events, resp.make_opaque_message().unwrap())
    }

    #[tokio::test]
    async fn test_tool_call_stream() {
        let chunks = Chunks::canned([include_bytes!(
            "../fixtures/tool_call_stream.txt"
        )
        .as_slice()]);
        let (events, opaque) = collect(chunks).await;

        assert_eq!(
            events,
            vec![
                ModelResponseEvent::ToolCall(ToolCallRequest {
                    id: "call_date".to_owned(),
                    name: "todays_date_time".to_owned(),
                    arguments: json!({
                        "timeZone": "America/Chicago",
                        "locale": "en-US"
                    }),
                }),
                ModelResponseEvent::ToolCall(ToolCallRequest {
                    id: "call_search".to_owned(),
                    name: "tavily_search_results_json".to_owned(),
                    arguments: json!({ "input": "weather in Dallas" }),
                }),
                ModelResponseEvent::Completed(ModelFinishReason::ToolCalls),
            ]
        );

        assert_eq!(opaque.id(), "chatcmpl-42");
        let Some(Message::Assistant {
            content,
            tool_calls,
            ..
        }) = opaque.downcast_ref::<Message>()
        else {
            panic!("expected an assistant message");
        };
        assert_eq!(content, &None);
        assert_eq!(tool_calls.as_ref().map(Vec::len), Some(2));
    }

    #[tokio::test]
    async fn test_text_stream() {
        let chunks = Chunks::canned([
            b"data: {\"id\":\"\",\"choices\":[]}\n\n".as_slice(),
            b"data: {\"id\":\"c1\",\"choices\":[{\"delta\":{\"role\":\"assistant\",\"content\":\"\"},\"finish_reason\":null}]}\n\n".as_slice(),
            b"data: {\"id\":\"c1\",\"choices\":[{\"delta\":{\"content\":\"It is \"},\"finish_reason\":null}]}\n\n".as_slice(),
            b"data: {\"id\":\"c1\",\"choices\":[{\"delta\":{\"content\":\"sunny.\"},\"finish_reason\":\"stop\"}]}\n\n".as_slice(),
            b"data: {\"id\":\"c1\",\"choices\":[],\"usage\":{\"total_tokens\":9}}\n\n".as_slice(),
            b"data: [DONE]\n\n".as_slice(),
        ]);
        let (events, _) = collect(chunks).await;
        assert_eq!(
            events,
            vec![
                ModelResponseEvent::MessageDelta("It is ".to_owned()),
                ModelResponseEvent::MessageDelta("sunny.".to_owned()),
                ModelResponseEvent::Completed(ModelFinishReason::Stop),
            ]
        );
    }

    #[tokio::test]
    async fn test_malformed_chunk() {
        let chunks = Chunks::canned([b"data: {not json}\n\n".as_slice()]);
        let mut resp = pin!(OpenAIResponse::from_sse(Sse::new(chunks)));
        let err = poll_fn(|cx| resp.as_mut().poll_next_event(cx))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Other);
        // Exhausted after the error.
        let next = poll_fn(|cx| resp.as_mut().poll_next_event(cx)).await;
        assert!(matches!(next, Ok(None)));
    }
}
