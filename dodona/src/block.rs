use serde_json::{Value, json};

use crate::Fields;
use crate::status::{AnnotationSeverity, MessageFormat, MessagePermission};

/// Kind tag of a report block.
///
/// The tag fixes the event commands a block emits and which close fields
/// failure handling maintains for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Judgement,
    Tab,
    Context,
    TestCase,
    Test,
    Message,
    Annotation,
}

impl Kind {
    pub fn name(self) -> &'static str {
        match self {
            Kind::Judgement => "judgement",
            Kind::Tab => "tab",
            Kind::Context => "context",
            Kind::TestCase => "testcase",
            Kind::Test => "test",
            Kind::Message => "message",
            Kind::Annotation => "annotation",
        }
    }

    pub fn start_command(self) -> &'static str {
        match self {
            Kind::Judgement => "start-judgement",
            Kind::Tab => "start-tab",
            Kind::Context => "start-context",
            Kind::TestCase => "start-testcase",
            Kind::Test => "start-test",
            Kind::Message => "append-message",
            Kind::Annotation => "annotate-code",
        }
    }

    /// `None` for inline kinds, which only ever emit their start event.
    pub fn close_command(self) -> Option<&'static str> {
        match self {
            Kind::Judgement => Some("close-judgement"),
            Kind::Tab => Some("close-tab"),
            Kind::Context => Some("close-context"),
            Kind::TestCase => Some("close-testcase"),
            Kind::Test => Some("close-test"),
            Kind::Message | Kind::Annotation => None,
        }
    }

    /// Blocks that record an `accepted` flag when an outcome reaches them.
    pub fn tracks_accepted(self) -> bool {
        matches!(
            self,
            Kind::Judgement | Kind::Context | Kind::TestCase | Kind::Test
        )
    }

    /// Blocks that record the full `status` when an outcome reaches them.
    pub fn tracks_status(self) -> bool {
        matches!(self, Kind::Judgement | Kind::Test)
    }
}

/// A report block that can be opened on a [`Reporter`](crate::Reporter).
pub trait Block {
    const KIND: Kind;

    /// Fields of the start event.
    fn into_fields(self) -> Fields;
}

fn insert(fields: &mut Fields, key: impl Into<String>, value: impl Into<Value>) {
    fields.insert(key.into(), value.into());
}

/// Top-level outcome of a run.
#[derive(Debug, Clone, Copy, Default)]
pub struct Judgement;

impl Block for Judgement {
    const KIND: Kind = Kind::Judgement;

    fn into_fields(self) -> Fields {
        Fields::new()
    }
}

/// Organizational section with a title.
#[derive(Debug, Clone)]
pub struct Tab {
    fields: Fields,
}

impl Tab {
    pub fn new(title: impl Into<String>) -> Self {
        let mut fields = Fields::new();
        insert(&mut fields, "title", title.into());
        Tab { fields }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        insert(&mut self.fields, key, value);
        self
    }
}

impl Block for Tab {
    const KIND: Kind = Kind::Tab;

    fn into_fields(self) -> Fields {
        self.fields
    }
}

/// A set of related test cases.
#[derive(Debug, Clone, Copy, Default)]
pub struct Context;

impl Block for Context {
    const KIND: Kind = Kind::Context;

    fn into_fields(self) -> Fields {
        Fields::new()
    }
}

/// One scenario inside a context.
#[derive(Debug, Clone)]
pub struct TestCase {
    description: Value,
}

impl TestCase {
    /// Use `description` as is: a plain string or a prepared description object.
    pub fn new(description: impl Into<Value>) -> Self {
        TestCase {
            description: description.into(),
        }
    }

    /// Description object rendered with the given format.
    pub fn formatted(format: MessageFormat, description: impl Into<String>) -> Self {
        TestCase {
            description: json!({
                "format": format,
                "description": description.into(),
            }),
        }
    }
}

impl Block for TestCase {
    const KIND: Kind = Kind::TestCase;

    fn into_fields(self) -> Fields {
        let mut fields = Fields::new();
        insert(&mut fields, "description", self.description);
        fields
    }
}

/// A single expected-versus-generated comparison.
///
/// The body is expected to set the `generated` close field.
#[derive(Debug, Clone)]
pub struct Test {
    fields: Fields,
}

impl Test {
    pub fn new(description: impl Into<Value>, expected: impl Into<String>) -> Self {
        let mut fields = Fields::new();
        insert(&mut fields, "description", description);
        insert(&mut fields, "expected", expected.into());
        Test { fields }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        insert(&mut self.fields, key, value);
        self
    }
}

impl Block for Test {
    const KIND: Kind = Kind::Test;

    fn into_fields(self) -> Fields {
        self.fields
    }
}

/// Inline message appended to the enclosing block.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    message: Value,
}

impl Message {
    /// Use `message` as is: a plain string or a prepared message object.
    pub fn new(message: impl Into<Value>) -> Self {
        Message {
            message: message.into(),
        }
    }

    pub fn formatted(format: MessageFormat, description: impl Into<String>) -> Self {
        Message {
            message: json!({
                "format": format,
                "description": description.into(),
            }),
        }
    }

    /// Restrict who gets to see the message. A plain message is promoted to
    /// a text message object first.
    pub fn permission(self, permission: MessagePermission) -> Self {
        let mut object = match self.message {
            Value::Object(object) => object,
            other => {
                let mut object = Fields::new();
                insert(&mut object, "format", MessageFormat::Text);
                insert(&mut object, "description", other);
                object
            }
        };
        insert(&mut object, "permission", permission);
        Message {
            message: Value::Object(object),
        }
    }

    pub fn body(&self) -> &Value {
        &self.message
    }
}

impl Block for Message {
    const KIND: Kind = Kind::Message;

    fn into_fields(self) -> Fields {
        let mut fields = Fields::new();
        insert(&mut fields, "message", self.message);
        fields
    }
}

/// Inline annotation on a line of the submitted code. Rows are 0-based.
#[derive(Debug, Clone)]
pub struct Annotation {
    fields: Fields,
}

impl Annotation {
    pub fn new(row: usize, text: impl Into<String>) -> Self {
        let mut fields = Fields::new();
        insert(&mut fields, "row", row);
        insert(&mut fields, "text", text.into());
        Annotation { fields }
    }

    pub fn severity(self, severity: AnnotationSeverity) -> Self {
        self.with("type", severity)
    }

    pub fn column(self, column: usize) -> Self {
        self.with("column", column)
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        insert(&mut self.fields, key, value);
        self
    }
}

impl Block for Annotation {
    const KIND: Kind = Kind::Annotation;

    fn into_fields(self) -> Fields {
        self.fields
    }
}
