use std::future::ready;
use std::sync::{Arc, Mutex};

use serde::Deserialize;
use serde_json::{Value, json};
use steward_model::{ErrorKind, ModelMessage, ToolCallRequest};
use steward_test_model::{PresetEvent, PresetResponse, TestModelProvider};

use crate::checkpoint::MemorySaver;
use crate::conversation::{Message, Role, ToolStatus};
use crate::tool::{Tool, ToolResult};
use crate::{AgentBuilder, AgentError, TranscriptSource};

#[derive(Deserialize)]
struct ClockInput {
    #[serde(rename = "timeZone")]
    time_zone: String,
}

/// Always reports noon, in whatever zone is asked.
struct FixedClock {
    schema: Value,
}

impl FixedClock {
    fn new() -> Self {
        Self {
            schema: json!({
                "type": "object",
                "properties": { "timeZone": { "type": "string" } },
                "required": ["timeZone"]
            }),
        }
    }
}

impl Tool for FixedClock {
    type Input = ClockInput;

    fn name(&self) -> &str {
        "todays_date_time"
    }

    fn description(&self) -> &str {
        "Useful to get current day, date and time."
    }

    fn parameter_schema(&self) -> &Value {
        &self.schema
    }

    fn execute(
        &self,
        input: ClockInput,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        ready(Ok(format!("12:00:00 PM in {}", input.time_zone)))
    }
}

fn clock_call(id: &str) -> ToolCallRequest {
    ToolCallRequest {
        id: id.to_owned(),
        name: "todays_date_time".to_owned(),
        arguments: json!({ "timeZone": "America/Chicago", "locale": "en-US" }),
    }
}

#[tokio::test]
async fn test_final_answer_without_tools() {
    let mut provider = TestModelProvider::default();
    provider.add_assistant_turn(PresetResponse::with_events([
        PresetEvent::MessageDelta("hi ".to_owned()),
        PresetEvent::MessageDelta("there".to_owned()),
    ]));

    let agent = AgentBuilder::with_model_provider(provider.clone()).build();
    let conversation = agent.invoke("hello", "1").await.unwrap();

    let roles: Vec<_> = conversation.messages().iter().map(Message::role).collect();
    assert_eq!(roles, [Role::Human, Role::Ai]);
    assert_eq!(conversation.last_content(), Some("hi there"));
    assert_eq!(provider.requests().len(), 1);
}

#[tokio::test]
async fn test_tool_turn_appends_one_result_per_call() {
    let mut provider = TestModelProvider::default();
    provider.add_assistant_turn(PresetResponse::tool_calls([clock_call("call_1")]));
    provider.add_assistant_turn(PresetResponse::text("It is noon in Chicago."));

    let agent = AgentBuilder::with_model_provider(provider.clone())
        .with_tool(FixedClock::new())
        .build();
    assert_eq!(agent.tool_names(), ["todays_date_time"]);

    let answer = agent
        .ask("what is the current time in Chicago?", "1")
        .await
        .unwrap();
    assert_eq!(answer, "It is noon in Chicago.");

    let requests = provider.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].tools.len(), 1);
    assert_eq!(requests[0].tools[0].name, "todays_date_time");

    // Exactly one tool result sits between the tool call and the next
    // model invocation.
    let second = &requests[1].messages;
    assert_eq!(second.len(), 3);
    assert!(second[1].is_assistant());
    let ModelMessage::Tool(result) = &second[2] else {
        panic!("expected a tool result, got {:?}", second[2]);
    };
    assert_eq!(result.id, "call_1");
    assert_eq!(result.content, "12:00:00 PM in America/Chicago");
}

#[tokio::test]
async fn test_unknown_tool_is_reported_to_the_model() {
    let mut provider = TestModelProvider::default();
    provider.add_assistant_turn(PresetResponse::tool_calls([
        clock_call("call_1"),
        ToolCallRequest {
            id: "call_2".to_owned(),
            name: "weather".to_owned(),
            arguments: json!({}),
        },
    ]));
    provider.add_assistant_turn(PresetResponse::text("Noon, weather unknown."));

    let agent = AgentBuilder::with_model_provider(provider)
        .with_tool(FixedClock::new())
        .build();
    let conversation = agent.invoke("time and weather?", "1").await.unwrap();

    let tool_results: Vec<_> = conversation
        .messages()
        .iter()
        .filter_map(|msg| match msg {
            Message::Tool(result) => Some(result),
            _ => None,
        })
        .collect();
    assert_eq!(tool_results.len(), 2);
    assert_eq!(tool_results[0].tool_call_id, "call_1");
    assert_eq!(tool_results[0].status, ToolStatus::Success);
    assert_eq!(tool_results[1].tool_call_id, "call_2");
    assert_eq!(tool_results[1].status, ToolStatus::Error);
    assert_eq!(conversation.last_content(), Some("Noon, weather unknown."));
}

#[tokio::test]
async fn test_threads_continue_with_checkpointer() {
    let mut provider = TestModelProvider::default();
    provider.add_assistant_turn(PresetResponse::text("Sunny in SF."));
    provider.add_assistant_turn(PresetResponse::text("Rainy in NY."));

    let agent = AgentBuilder::with_model_provider(provider.clone())
        .with_checkpointer(MemorySaver::new())
        .build();

    agent.ask("what is the current weather in sf", "42").await.unwrap();
    let conversation = agent.invoke("what about ny", "42").await.unwrap();
    assert_eq!(conversation.len(), 4);
    assert_eq!(conversation.last_content(), Some("Rainy in NY."));
    assert_eq!(provider.requests()[1].messages.len(), 3);

    // A fresh thread starts over, so the first scripted turn answers again.
    let answer = agent.ask("hello", "43").await.unwrap();
    assert_eq!(answer, "Sunny in SF.");
    assert_eq!(provider.requests()[2].messages.len(), 1);
}

#[tokio::test]
async fn test_without_checkpointer_threads_are_forgotten() {
    let mut provider = TestModelProvider::default();
    provider.add_assistant_turn(PresetResponse::text("first"));

    let agent = AgentBuilder::with_model_provider(provider.clone()).build();
    agent.ask("one", "42").await.unwrap();
    let conversation = agent.invoke("two", "42").await.unwrap();
    assert_eq!(conversation.len(), 2);
}

#[tokio::test]
async fn test_recursion_limit() {
    let mut provider = TestModelProvider::default();
    provider.add_assistant_turn(PresetResponse::tool_calls([clock_call("call_1")]));
    provider.add_assistant_turn(PresetResponse::tool_calls([clock_call("call_2")]));

    let agent = AgentBuilder::with_model_provider(provider)
        .with_tool(FixedClock::new())
        .with_recursion_limit(3)
        .build();
    let err = agent.invoke("loop forever", "1").await.unwrap_err();
    assert!(matches!(err, AgentError::RecursionLimit { limit: 3 }));
}

#[tokio::test]
async fn test_model_errors_propagate() {
    let mut provider = TestModelProvider::default();
    provider.add_assistant_turn(PresetResponse::text("never").with_failures(0));

    let agent = AgentBuilder::with_model_provider(provider).build();
    let err = agent.invoke("hello", "1").await.unwrap_err();
    assert_eq!(err.model_error_kind(), Some(ErrorKind::RateLimitExceeded));
}

#[tokio::test]
async fn test_system_prompt_is_sent_but_not_stored() {
    let mut provider = TestModelProvider::default();
    provider.add_assistant_turn(PresetResponse::text("ok"));

    let agent = AgentBuilder::with_model_provider(provider.clone())
        .with_system_prompt("Answer briefly.")
        .build();
    let conversation = agent.invoke("hello", "1").await.unwrap();

    assert_eq!(
        provider.requests()[0].messages[0],
        ModelMessage::System("Answer briefly.".to_owned())
    );
    assert_eq!(conversation.messages()[0], Message::human("hello"));
}

#[tokio::test]
async fn test_transcript_callback() {
    let mut provider = TestModelProvider::default();
    provider.add_assistant_turn(PresetResponse::with_events([
        PresetEvent::MessageDelta("Checking.".to_owned()),
        PresetEvent::ToolCall(clock_call("call_1")),
    ]));
    provider.add_assistant_turn(PresetResponse::text("Noon."));

    let transcript = Arc::new(Mutex::new(Vec::new()));
    let agent = AgentBuilder::with_model_provider(provider)
        .with_tool(FixedClock::new())
        .on_transcript({
            let transcript = Arc::clone(&transcript);
            move |text, source| {
                transcript.lock().unwrap().push((text.to_owned(), source));
            }
        })
        .build();
    agent.invoke("time?", "1").await.unwrap();

    assert_eq!(
        *transcript.lock().unwrap(),
        [
            ("Checking.".to_owned(), TranscriptSource::Assistant),
            (
                "12:00:00 PM in America/Chicago".to_owned(),
                TranscriptSource::Tool
            ),
            ("Noon.".to_owned(), TranscriptSource::Assistant),
        ]
    );
}
