pub mod block;
pub mod failure;
pub mod reporter;
pub mod status;

pub use block::{Annotation, Block, Context, Judgement, Kind, Message, Tab, Test, TestCase};
pub use failure::{Error, Failure};
pub use reporter::{Reporter, Scope};
pub use status::{AnnotationSeverity, ErrorType, MessageFormat, MessagePermission};

/// Field bag of a start or close event.
/// Keys are kept sorted, so every record serializes the same way.
pub type Fields = serde_json::Map<String, serde_json::Value>;

pub type Result<T, E = Error> = std::result::Result<T, E>;
