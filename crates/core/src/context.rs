//! The rolling message window handed to the next agent call.

use crate::message::Message;

/// What the next agent call should see.
///
/// Agents only ever receive a [`snapshot`](TurnContext::snapshot), never a
/// reference, so nothing an agent does can change the orchestrator's view.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TurnContext {
    messages: Vec<Message>,
}

impl TurnContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, msg: Message) {
        self.messages.push(msg);
    }

    pub fn extend(&mut self, msgs: impl IntoIterator<Item = Message>) {
        self.messages.extend(msgs);
    }

    /// An owned copy of the window.
    pub fn snapshot(&self) -> Vec<Message> {
        self.messages.clone()
    }

    /// Keeps only the `k` most recent messages, in chronological order.
    pub fn retain_recent(&mut self, k: usize) {
        let excess = self.messages.len().saturating_sub(k);
        self.messages.drain(..excess);
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context_of(n: usize) -> TurnContext {
        let mut ctx = TurnContext::new();
        for i in 0..n {
            ctx.push(Message::user(format!("m{i}")));
        }
        ctx
    }

    #[test]
    fn test_retain_recent_keeps_tail_in_order() {
        let mut ctx = context_of(5);
        ctx.retain_recent(2);
        let contents: Vec<_> = ctx.messages().iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["m3", "m4"]);
    }

    #[test]
    fn test_retain_more_than_available_is_noop() {
        let mut ctx = context_of(2);
        ctx.retain_recent(10);
        assert_eq!(ctx.len(), 2);
    }

    #[test]
    fn test_retain_zero_empties() {
        let mut ctx = context_of(3);
        ctx.retain_recent(0);
        assert!(ctx.is_empty());
    }

    #[test]
    fn test_snapshot_is_detached() {
        let ctx = context_of(1);
        let mut copy = ctx.snapshot();
        copy.push(Message::system("request"));
        assert_eq!(ctx.len(), 1);
        assert_eq!(copy.len(), 2);
    }
}
