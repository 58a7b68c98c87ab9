//! # corral-blueprints: convention-driven relation operations
//!
//! Generic operations exposed over a model's declared relations. The crate
//! currently ships the hardest of them, add-to-collection: link a child
//! record into a parent's to-many relation, creating the child first when it
//! does not exist, with realtime announcements kept consistent (one creation
//! event, one link event, nothing on a duplicate add).
//!
//! Collaborators are reached through traits: persistence via
//! `corral_model::ModelStore`, broadcasting via
//! `corral_realtime::RecordBroadcast`. HTTP parsing and status mapping live
//! outside; errors carry an [`ErrorClass`] signal instead.

pub mod add;
pub mod error;
pub mod request;

// Re-export the operation surface
pub use add::{AddToCollection, LinkOutcome};
pub use error::{BlueprintError, BlueprintResult, ErrorClass};
pub use request::{AddRequest, ChildSpec, RESERVED_FIELDS};
