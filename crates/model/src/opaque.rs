use std::any::Any;
use std::fmt::{self, Debug, Formatter};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// A provider-specific copy of an assistant message.
///
/// The agent keeps its own view of every assistant turn, but some
/// providers need extra fields to replay history correctly (reasoning
/// text, vendor-specific tool call shapes). A provider can stash its raw
/// message here and recover it when the history is sent back.
///
/// Two opaque messages are equal when their ids are equal.
pub struct OpaqueMessage(Arc<dyn Payload>);

impl OpaqueMessage {
    /// Wraps `value` under the given id, which should be unique within
    /// one conversation.
    #[inline]
    pub fn new<ID: Into<String>, T: Send + Sync + 'static>(
        id: ID,
        value: T,
    ) -> Self {
        Self(Arc::new(Tagged {
            id: id.into(),
            value,
        }))
    }

    /// Returns the id of this message.
    #[inline]
    pub fn id(&self) -> &str {
        self.0.id()
    }

    /// Returns the wrapped value if it has type `T`.
    #[inline]
    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.0.as_any().downcast_ref()
    }
}

impl Clone for OpaqueMessage {
    #[inline]
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl Debug for OpaqueMessage {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_tuple("OpaqueMessage").field(&self.id()).finish()
    }
}

impl PartialEq for OpaqueMessage {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for OpaqueMessage {}

impl Hash for OpaqueMessage {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

trait Payload: Send + Sync {
    fn id(&self) -> &str;
    fn as_any(&self) -> &dyn Any;
}

struct Tagged<T> {
    id: String,
    value: T,
}

impl<T: Send + Sync + 'static> Payload for Tagged<T> {
    fn id(&self) -> &str {
        &self.id
    }

    fn as_any(&self) -> &dyn Any {
        &self.value
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[derive(Clone, Debug, PartialEq)]
    struct WireMessage {
        reasoning: String,
    }

    #[test]
    fn test_downcast() {
        let opaque = OpaqueMessage::new(
            "chatcmpl-1",
            WireMessage {
                reasoning: "check the clock first".to_owned(),
            },
        );
        assert_eq!(opaque.id(), "chatcmpl-1");
        let wire = opaque.downcast_ref::<WireMessage>().unwrap();
        assert_eq!(wire.reasoning, "check the clock first");
        assert!(opaque.downcast_ref::<String>().is_none());
    }

    #[test]
    fn test_identity_is_the_id() {
        let a = OpaqueMessage::new("chatcmpl-1", 1u32);
        let b = OpaqueMessage::new("chatcmpl-1", "different payload");
        let c = OpaqueMessage::new("chatcmpl-2", 1u32);
        assert_eq!(a, b);
        assert_ne!(a, c);

        let set: HashSet<_> = [a.clone(), a, b, c].into_iter().collect();
        assert_eq!(set.len(), 2);
    }
}
