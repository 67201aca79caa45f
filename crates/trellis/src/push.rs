//! Partial page updates pushed from the server to connected clients.
//!
//! A [`Push`] names an action, a DOM target and a content fragment. Hosts that
//! support pushes expose a [`PushSink`]; [`Push::apply`] selects the sink
//! operation through a fixed table of function pointers keyed by
//! [`PushAction`].

use std::sync::Arc;

use strum::{Display, EnumIter, EnumString};

use crate::error::ComponentError;

/// Operations a push can perform on its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum PushAction {
    /// Append the content inside the target.
    Append,
    /// Prepend the content inside the target.
    Prepend,
    /// Replace the target with the content.
    Replace,
    /// Replace the target's children with the content.
    Update,
    /// Remove the target; the content is ignored.
    Remove,
    /// Insert the content before the target.
    Before,
    /// Insert the content after the target.
    After,
}

/// Receiver of push operations, typically backed by a host's stream channel.
pub trait PushSink: Send + Sync {
    /// Appends `content` inside `target`.
    fn append(&self, target: &str, content: &str) -> Result<(), ComponentError>;
    /// Prepends `content` inside `target`.
    fn prepend(&self, target: &str, content: &str) -> Result<(), ComponentError>;
    /// Replaces `target` with `content`.
    fn replace(&self, target: &str, content: &str) -> Result<(), ComponentError>;
    /// Replaces the children of `target` with `content`.
    fn update(&self, target: &str, content: &str) -> Result<(), ComponentError>;
    /// Removes `target`.
    fn remove(&self, target: &str) -> Result<(), ComponentError>;
    /// Inserts `content` before `target`.
    fn before(&self, target: &str, content: &str) -> Result<(), ComponentError>;
    /// Inserts `content` after `target`.
    fn after(&self, target: &str, content: &str) -> Result<(), ComponentError>;
}

type PushOperation = fn(&dyn PushSink, &str, &str) -> Result<(), ComponentError>;

impl PushAction {
    fn operation(self) -> PushOperation {
        match self {
            Self::Append => |sink, target, content| sink.append(target, content),
            Self::Prepend => |sink, target, content| sink.prepend(target, content),
            Self::Replace => |sink, target, content| sink.replace(target, content),
            Self::Update => |sink, target, content| sink.update(target, content),
            Self::Remove => |sink, target, _| sink.remove(target),
            Self::Before => |sink, target, content| sink.before(target, content),
            Self::After => |sink, target, content| sink.after(target, content),
        }
    }
}

/// One push request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Push {
    action: PushAction,
    target: String,
    content: String,
}

impl Push {
    /// Builds a push request.
    #[must_use]
    pub fn new(action: PushAction, target: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            action,
            target: target.into(),
            content: content.into(),
        }
    }

    /// Action to perform.
    #[must_use]
    pub const fn action(&self) -> PushAction {
        self.action
    }

    /// DOM target identifier.
    #[must_use]
    pub fn target(&self) -> &str {
        self.target.as_str()
    }

    /// Content fragment.
    #[must_use]
    pub fn content(&self) -> &str {
        self.content.as_str()
    }

    /// Dispatches the request to the matching operation of `sink`.
    ///
    /// # Errors
    ///
    /// Propagates the sink's failure.
    pub fn apply(&self, sink: &dyn PushSink) -> Result<(), ComponentError> {
        (self.action.operation())(sink, &self.target, &self.content)
    }
}

/// Emitter that pushes fragments through its host's push channel.
#[derive(Clone)]
pub struct PushEmitter {
    sink: Arc<dyn PushSink>,
}

impl PushEmitter {
    /// Wraps a push channel.
    #[must_use]
    pub fn new(sink: Arc<dyn PushSink>) -> Self {
        Self { sink }
    }

    /// Builds and dispatches a push request.
    ///
    /// # Errors
    ///
    /// Propagates the sink's failure.
    pub fn push(
        &self,
        action: PushAction,
        target: impl Into<String>,
        content: impl Into<String>,
    ) -> Result<(), ComponentError> {
        Push::new(action, target, content).apply(self.sink.as_ref())
    }
}
