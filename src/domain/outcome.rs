#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum OutcomeKind {
    Success,
    Error,
    Info,
}

/// Transient result text shown under the menu until the next key press.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CommandOutcome {
    pub text: String,
    pub kind: OutcomeKind,
}

impl CommandOutcome {
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: OutcomeKind::Success,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: OutcomeKind::Error,
        }
    }

    pub fn info(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: OutcomeKind::Info,
        }
    }

    pub fn is_error(&self) -> bool {
        self.kind == OutcomeKind::Error
    }
}
