#![forbid(unsafe_code)]

//! Ordered, mutable message collections for one field.
//!
//! A bag carries two kinds of messages — errors and informational messages —
//! each with three origin buckets: *prepended* (host-injected, shown first),
//! *base* (rule-produced), and *appended* (host-injected, shown last). Reads
//! concatenate the buckets in that order. Removal by text only touches the
//! prepended/appended edges; the base bucket belongs to the validation
//! pipeline and is replaced wholesale on each run.

/// The two message kinds a bag holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    /// A validation failure shown as an error.
    Error,
    /// An informational message.
    Message,
}

/// Which kinds a clearing operation applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Clear {
    All,
    Errors,
    Messages,
}

impl Clear {
    fn covers(self, kind: MessageKind) -> bool {
        matches!(
            (self, kind),
            (Clear::All, _)
                | (Clear::Errors, MessageKind::Error)
                | (Clear::Messages, MessageKind::Message)
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Buckets {
    prepended: Vec<String>,
    base: Vec<String>,
    appended: Vec<String>,
}

impl Buckets {
    fn all(&self) -> impl Iterator<Item = &str> {
        self.prepended
            .iter()
            .chain(&self.base)
            .chain(&self.appended)
            .map(String::as_str)
    }

    fn remove_from_edges(&mut self, text: &str) {
        self.prepended.retain(|m| m != text);
        self.appended.retain(|m| m != text);
    }
}

/// Ordered error/info messages for one field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageBag {
    errors: Buckets,
    messages: Buckets,
}

impl MessageBag {
    /// An empty bag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn buckets(&self, kind: MessageKind) -> &Buckets {
        match kind {
            MessageKind::Error => &self.errors,
            MessageKind::Message => &self.messages,
        }
    }

    fn buckets_mut(&mut self, kind: MessageKind) -> &mut Buckets {
        match kind {
            MessageKind::Error => &mut self.errors,
            MessageKind::Message => &mut self.messages,
        }
    }

    /// All errors: prepended, then rule-produced, then appended.
    #[must_use]
    pub fn errors(&self) -> Vec<&str> {
        self.errors.all().collect()
    }

    /// All informational messages, in bucket order.
    #[must_use]
    pub fn messages(&self) -> Vec<&str> {
        self.messages.all().collect()
    }

    /// The first error, if any.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.errors.all().next()
    }

    /// The first informational message, if any.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.messages.all().next()
    }

    /// `true` when at least one error is present in any bucket.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.errors.all().next().is_some()
    }

    /// `true` when no message of either kind is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        !self.has_errors() && self.messages.all().next().is_none()
    }

    /// Insert at the front of the prepended bucket.
    pub fn prepend(&mut self, text: impl Into<String>, kind: MessageKind) {
        self.buckets_mut(kind).prepended.insert(0, text.into());
    }

    /// Push onto the appended bucket.
    pub fn append(&mut self, text: impl Into<String>, kind: MessageKind) {
        self.buckets_mut(kind).appended.push(text.into());
    }

    /// Push a rule-produced message onto the base bucket.
    pub fn push_base(&mut self, text: impl Into<String>, kind: MessageKind) {
        self.buckets_mut(kind).base.push(text.into());
    }

    /// Remove `text` from the prepended/appended buckets of `kind`, or of
    /// both kinds when `kind` is `None`. Base messages are never removed
    /// this way.
    pub fn remove(&mut self, text: &str, kind: Option<MessageKind>) {
        match kind {
            Some(k) => self.buckets_mut(k).remove_from_edges(text),
            None => {
                self.errors.remove_from_edges(text);
                self.messages.remove_from_edges(text);
            }
        }
    }

    /// Clear every bucket of the selected kinds.
    pub fn clear(&mut self, which: Clear) {
        for kind in [MessageKind::Error, MessageKind::Message] {
            if which.covers(kind) {
                *self.buckets_mut(kind) = Buckets::default();
            }
        }
    }

    /// Clear only the prepended buckets of the selected kinds.
    pub fn clear_prepended(&mut self, which: Clear) {
        for kind in [MessageKind::Error, MessageKind::Message] {
            if which.covers(kind) {
                self.buckets_mut(kind).prepended.clear();
            }
        }
    }

    /// Clear only the appended buckets of the selected kinds.
    pub fn clear_appended(&mut self, which: Clear) {
        for kind in [MessageKind::Error, MessageKind::Message] {
            if which.covers(kind) {
                self.buckets_mut(kind).appended.clear();
            }
        }
    }

    /// Clear only the rule-produced base buckets of the selected kinds.
    ///
    /// The pipeline calls this on every trigger so host-injected messages
    /// survive re-validation.
    pub fn clear_base(&mut self, which: Clear) {
        for kind in [MessageKind::Error, MessageKind::Message] {
            if which.covers(kind) {
                self.buckets_mut(kind).base.clear();
            }
        }
    }

    #[must_use]
    fn bucket_lens(&self, kind: MessageKind) -> (usize, usize, usize) {
        let b = self.buckets(kind);
        (b.prepended.len(), b.base.len(), b.appended.len())
    }

    /// (prepended, base, appended) error counts, for diagnostics.
    #[must_use]
    pub fn error_bucket_lens(&self) -> (usize, usize, usize) {
        self.bucket_lens(MessageKind::Error)
    }
}
