use std::io;

use crate::block::{Kind, Message};
use crate::status::ErrorType;

/// Failure signal that unwinds report blocks until its recover point claims it.
///
/// Every block it passes records the outcome in its close fields. The first
/// block that handles it emits the attached message, if any. Without an
/// explicit recover point the judgement claims it silently; an explicit
/// recover point makes the claiming block escalate the status.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{status}")]
pub struct Failure {
    status: ErrorType,
    message: Option<Message>,
    recover_at: Kind,
    escalate: bool,
}

impl Failure {
    pub fn new(status: ErrorType) -> Self {
        Failure {
            status,
            message: None,
            recover_at: Kind::Judgement,
            escalate: false,
        }
    }

    /// Stop propagation at the nearest enclosing block of `kind`.
    pub fn recover_at(mut self, kind: Kind) -> Self {
        self.recover_at = kind;
        self.escalate = true;
        self
    }

    pub fn with_message(mut self, message: Message) -> Self {
        self.message = Some(message);
        self
    }

    pub fn status(&self) -> ErrorType {
        self.status
    }

    pub fn recover_kind(&self) -> Kind {
        self.recover_at
    }

    pub fn escalates(&self) -> bool {
        self.escalate
    }

    pub fn message(&self) -> Option<&Message> {
        self.message.as_ref()
    }

    pub(crate) fn take_message(&mut self) -> Option<Message> {
        self.message.take()
    }

    /// The judgement claims every failure that reaches it.
    pub(crate) fn is_claimed_by(&self, kind: Kind) -> bool {
        kind == self.recover_at || kind == Kind::Judgement
    }
}

impl From<ErrorType> for Failure {
    fn from(status: ErrorType) -> Self {
        Failure::new(status)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("judgement failed: {0}")]
    Failure(#[from] Failure),

    #[error("cannot write report event")]
    Emit(#[source] io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<ErrorType> for Error {
    fn from(status: ErrorType) -> Self {
        Error::Failure(Failure::new(status))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_recover_point_is_silent_judgement() {
        let failure = Failure::new(ErrorType::WrongAnswer);
        assert_eq!(failure.recover_kind(), Kind::Judgement);
        assert!(!failure.escalates());
        assert!(failure.is_claimed_by(Kind::Judgement));
        assert!(!failure.is_claimed_by(Kind::Test));
    }

    #[test]
    fn explicit_recover_point_escalates() {
        let failure = Failure::new(ErrorType::RuntimeError).recover_at(Kind::TestCase);
        assert!(failure.escalates());
        assert!(failure.is_claimed_by(Kind::TestCase));
        assert!(!failure.is_claimed_by(Kind::Context));
        assert!(failure.is_claimed_by(Kind::Judgement));
    }

    #[test]
    fn message_is_taken_once() {
        let mut failure = Failure::new(ErrorType::Wrong).with_message(Message::new("nope"));
        assert!(failure.take_message().is_some());
        assert!(failure.take_message().is_none());
    }
}
