//! Conversation-related types.

use steward_model::{
    ModelMessage, OpaqueMessage, ToolCallRequest, ToolCallResult,
};

/// Who produced a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Role {
    /// Instructions from the host application.
    System,
    /// Input from the user.
    Human,
    /// Output of the model.
    Ai,
    /// Result of a tool call.
    Tool,
}

/// A message produced by the model.
#[derive(Clone, Debug, PartialEq)]
pub struct AiMessage {
    /// The text of the answer, may be empty when only tools are requested.
    pub content: String,
    /// Tool calls requested by the model, in the order they were declared.
    pub tool_calls: Vec<ToolCallRequest>,
    /// The provider's own copy of this message, used when replaying the
    /// history to the same provider.
    pub(crate) opaque: Option<OpaqueMessage>,
}

impl AiMessage {
    /// Creates a message with the given text and tool calls.
    #[inline]
    pub fn new<S: Into<String>>(
        content: S,
        tool_calls: Vec<ToolCallRequest>,
    ) -> Self {
        Self {
            content: content.into(),
            tool_calls,
            opaque: None,
        }
    }
}

/// Whether a tool call succeeded.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ToolStatus {
    /// The tool returned a result.
    #[default]
    Success,
    /// The tool could not be found, rejected its input, or failed.
    Error,
}

/// The result of one tool call.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ToolMessage {
    /// Id of the tool call request this message answers.
    pub tool_call_id: String,
    /// Name of the requested tool.
    pub name: String,
    /// Output of the tool, or an error description.
    pub content: String,
    /// Whether the call succeeded.
    pub status: ToolStatus,
}

/// An entry in the conversation history. Messages are never modified
/// after they are created.
#[derive(Clone, Debug, PartialEq)]
pub enum Message {
    /// System instructions.
    System(String),
    /// A user input.
    Human(String),
    /// A model answer.
    Ai(AiMessage),
    /// A tool result.
    Tool(ToolMessage),
}

impl Message {
    /// Creates a human message.
    #[inline]
    pub fn human<S: Into<String>>(content: S) -> Self {
        Message::Human(content.into())
    }

    /// Creates a model message without tool calls.
    #[inline]
    pub fn ai<S: Into<String>>(content: S) -> Self {
        Message::Ai(AiMessage::new(content, vec![]))
    }

    /// Returns the role of the message author.
    pub fn role(&self) -> Role {
        match self {
            Message::System(_) => Role::System,
            Message::Human(_) => Role::Human,
            Message::Ai(_) => Role::Ai,
            Message::Tool(_) => Role::Tool,
        }
    }

    /// Returns the text of the message.
    pub fn content(&self) -> &str {
        match self {
            Message::System(content) | Message::Human(content) => content,
            Message::Ai(msg) => &msg.content,
            Message::Tool(msg) => &msg.content,
        }
    }

    /// Returns the tool calls requested by this message. Only model
    /// messages can request tools.
    pub fn tool_calls(&self) -> &[ToolCallRequest] {
        match self {
            Message::Ai(msg) => &msg.tool_calls,
            _ => &[],
        }
    }

    pub(crate) fn to_model_message(&self) -> ModelMessage {
        match self {
            Message::System(content) => ModelMessage::System(content.clone()),
            Message::Human(content) => ModelMessage::User(content.clone()),
            Message::Ai(AiMessage {
                opaque: Some(opaque),
                ..
            }) => ModelMessage::Opaque(opaque.clone()),
            Message::Ai(msg) => ModelMessage::Assistant {
                content: msg.content.clone(),
                tool_calls: msg.tool_calls.clone(),
            },
            Message::Tool(msg) => ModelMessage::Tool(ToolCallResult {
                id: msg.tool_call_id.clone(),
                content: msg.content.clone(),
            }),
        }
    }
}

/// An append-only sequence of messages, oldest first.
#[derive(Clone, Default, Debug, PartialEq)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    /// Creates a conversation from existing messages.
    #[inline]
    pub fn from_messages(messages: Vec<Message>) -> Self {
        Self { messages }
    }

    /// Appends a message.
    #[inline]
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Returns all messages, oldest first.
    #[inline]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Returns the most recent message.
    #[inline]
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Returns the text of the most recent message.
    #[inline]
    pub fn last_content(&self) -> Option<&str> {
        self.last().map(Message::content)
    }

    /// Returns the number of messages.
    #[inline]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Returns `true` if there are no messages.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub(crate) fn to_model_messages(&self) -> Vec<ModelMessage> {
        self.messages.iter().map(Message::to_model_message).collect()
    }
}

impl Extend<Message> for Conversation {
    fn extend<I: IntoIterator<Item = Message>>(&mut self, iter: I) {
        self.messages.extend(iter);
    }
}
