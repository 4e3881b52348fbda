use std::io::Write;
use std::ops::{Deref, DerefMut};

use serde_json::Value;
use tracing::{debug, trace};

use crate::block::{Annotation, Block, Kind, Message};
use crate::failure::{Error, Failure};
use crate::status::ErrorType;
use crate::{Fields, Result};

/// Writes report events, one JSON object per line, to a single output stream.
///
/// Blocks are opened with [`Reporter::open`]; nested blocks are opened on
/// the [`Scope`] handed to the body, so events always come out well nested.
///
/// ```
/// use dodona::{Judgement, Reporter, Tab};
///
/// let mut reporter = Reporter::new(Vec::new());
/// reporter
///     .open(Judgement, |judgement| {
///         judgement.open(Tab::new("example tab"), |tab| {
///             tab.set("badgeCount", 43);
///             Ok(())
///         })
///     })
///     .unwrap();
///
/// let out = String::from_utf8(reporter.into_inner()).unwrap();
/// assert_eq!(out.lines().count(), 4);
/// ```
pub struct Reporter<W: Write> {
    out: W,
    depth: usize,
}

impl<W: Write> Reporter<W> {
    pub fn new(out: W) -> Self {
        Reporter { out, depth: 0 }
    }

    pub fn get_ref(&self) -> &W {
        &self.out
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// Number of blocks currently open.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Open `block`, run `body` inside it and close it again.
    ///
    /// The close event is emitted on every exit path. A [`Failure`] returned
    /// by the body updates this block's close fields; if this block is the
    /// failure's recover point the failure is swallowed and `Ok(None)` is
    /// returned, otherwise it is returned to the enclosing block. Any other
    /// error is passed through untouched.
    pub fn open<B, T, F>(&mut self, block: B, body: F) -> Result<Option<T>>
    where
        B: Block,
        F: FnOnce(&mut Scope<'_, W>) -> Result<T>,
    {
        let kind = B::KIND;
        self.emit(kind.start_command(), block.into_fields())?;
        debug!(kind = kind.name(), depth = self.depth, "opened block");

        self.depth += 1;
        let mut close = Fields::new();
        let outcome = body(&mut Scope {
            reporter: self,
            close: &mut close,
            kind,
        });
        self.depth -= 1;

        let (value, pending) = match outcome {
            Ok(value) => (Some(value), None),
            Err(Error::Failure(failure)) => match self.handle_failure(kind, &mut close, failure)? {
                Some(failure) => (None, Some(Error::Failure(failure))),
                None => (None, None),
            },
            Err(other) => (None, Some(other)),
        };

        if let Some(command) = kind.close_command() {
            self.emit(command, close)?;
        }
        debug!(kind = kind.name(), depth = self.depth, "closed block");

        match pending {
            Some(error) => Err(error),
            None => Ok(value),
        }
    }

    /// Emit a message block; messages have no body of their own.
    pub fn message(&mut self, message: Message) -> Result<()> {
        self.open(message, |_| Ok(())).map(drop)
    }

    /// Emit an annotation block; annotations have no body of their own.
    pub fn annotate(&mut self, annotation: Annotation) -> Result<()> {
        self.open(annotation, |_| Ok(())).map(drop)
    }

    /// Returns the failure again if it has to propagate past this block.
    fn handle_failure(
        &mut self,
        kind: Kind,
        close: &mut Fields,
        mut failure: Failure,
    ) -> Result<Option<Failure>> {
        record_outcome(kind, close, failure.status());

        if let Some(message) = failure.take_message() {
            self.message(message)?;
        }

        if !failure.is_claimed_by(kind) {
            debug!(kind = kind.name(), status = %failure.status(), "failure passes through");
            return Ok(Some(failure));
        }

        if failure.escalates() {
            let mut fields = Fields::new();
            fields.insert("status".into(), failure.status().into());
            self.emit("escalate-status", fields)?;
        }
        debug!(
            kind = kind.name(),
            status = %failure.status(),
            escalated = failure.escalates(),
            "failure claimed"
        );
        Ok(None)
    }

    fn emit(&mut self, command: &str, mut fields: Fields) -> Result<()> {
        fields.insert("command".into(), Value::String(command.to_string()));
        trace!(command, "emit");
        serde_json::to_writer(&mut self.out, &fields).map_err(|e| Error::Emit(e.into()))?;
        self.out.write_all(b"\n").map_err(Error::Emit)?;
        self.out.flush().map_err(Error::Emit)
    }
}

/// Mirror the bookkeeping failures do on the blocks they pass.
fn record_outcome(kind: Kind, close: &mut Fields, status: ErrorType) {
    if kind.tracks_status() {
        close.insert("status".into(), status.into());
    }
    if kind.tracks_accepted() {
        close.insert("accepted".into(), status.is_accepted().into());
    }
}

/// Handle on an open block: sets close fields and opens nested blocks.
pub struct Scope<'a, W: Write> {
    reporter: &'a mut Reporter<W>,
    close: &'a mut Fields,
    kind: Kind,
}

impl<W: Write> Scope<'_, W> {
    pub fn kind(&self) -> Kind {
        self.kind
    }

    /// Set a field of this block's close event.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.close.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.close.get(key)
    }

    /// Settle this block's outcome without raising a failure: records
    /// `status` and `accepted` as far as the block kind carries them.
    pub fn conclude(&mut self, status: ErrorType) {
        record_outcome(self.kind, self.close, status);
    }
}

impl<W: Write> Deref for Scope<'_, W> {
    type Target = Reporter<W>;

    fn deref(&self) -> &Self::Target {
        self.reporter
    }
}

impl<W: Write> DerefMut for Scope<'_, W> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.reporter
    }
}
