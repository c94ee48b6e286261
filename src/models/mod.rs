//! Data model shared by the build and query phases.

pub mod abstraction;
pub mod chapter;
pub mod conversation;
pub mod source;

pub use abstraction::{Abstraction, Relationship, RelationshipWarning, TraversalOrder};
pub use chapter::Chapter;
pub use conversation::{ConversationTurn, Role};
pub use source::SourceFile;
