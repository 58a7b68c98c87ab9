//! Request boundary for the add-to-collection operation
//!
//! Parameter parsing and validation live in the transport layer; by the time
//! an [`AddRequest`] exists, the parent identifier is known. What this module
//! decides is the shape of the child specification: a recognized identifier
//! value wins, otherwise the non-reserved body fields describe a record to
//! create. The decision is made once, here, as a tagged union.

use serde_json::Value;

use corral_model::{FieldMap, PopulateOptions, RecordId};
use corral_realtime::ConnectionId;

use crate::error::{BlueprintError, BlueprintResult};

/// Body fields that never describe the child record: pagination, sorting,
/// and the identifiers already carried by the route
pub const RESERVED_FIELDS: [&str; 5] = ["limit", "skip", "sort", "id", "parentid"];

/// How the child record to associate is specified
#[derive(Debug, Clone, PartialEq)]
pub enum ChildSpec {
    /// The primary key of an (assumed) existing record
    ById(RecordId),
    /// Field values for a record to create
    ByFields(FieldMap),
}

/// One add-to-collection invocation
#[derive(Debug, Clone)]
pub struct AddRequest {
    /// Parent model name
    pub model: String,
    /// Relation alias on the parent
    pub alias: String,
    /// Parent record identifier (from the route; absence is the transport
    /// layer's problem)
    pub parent_id: RecordId,
    /// Positional child primary-key value, when the caller supplied one
    pub child_pk: Option<Value>,
    /// Request body fields
    pub body: FieldMap,
    /// Present when the request arrived over a persistent channel
    pub socket: Option<ConnectionId>,
    /// Whether announcements should be mirrored back to the requester
    pub mirror: bool,
    /// Pass-through constraints for the final populated fetch
    pub populate: PopulateOptions,
}

impl AddRequest {
    pub fn new(model: &str, alias: &str, parent_id: impl Into<RecordId>) -> Self {
        Self {
            model: model.to_string(),
            alias: alias.to_string(),
            parent_id: parent_id.into(),
            child_pk: None,
            body: FieldMap::new(),
            socket: None,
            mirror: false,
            populate: PopulateOptions::default(),
        }
    }

    /// Supply the child's primary key positionally
    pub fn child_pk(mut self, value: Value) -> Self {
        self.child_pk = Some(value);
        self
    }

    /// Supply the request body
    pub fn body(mut self, body: FieldMap) -> Self {
        self.body = body;
        self
    }

    /// Mark the request as arriving over a persistent channel
    pub fn from_socket(mut self, conn: ConnectionId) -> Self {
        self.socket = Some(conn);
        self
    }

    /// Mirror announcements back to the requesting connection
    pub fn mirror(mut self, mirror: bool) -> Self {
        self.mirror = mirror;
        self
    }

    /// Constrain the final populated fetch
    pub fn populate(mut self, options: PopulateOptions) -> Self {
        self.populate = options;
        self
    }

    /// The connection announcements should skip, if any
    pub fn excluded(&self) -> Option<ConnectionId> {
        if self.mirror {
            None
        } else {
            self.socket
        }
    }

    /// Resolve the child specification from the request.
    ///
    /// A recognized positional identifier takes precedence; otherwise the
    /// non-reserved, non-null body fields form a creation payload. Neither is
    /// a client error.
    pub fn child_spec(&self) -> BlueprintResult<ChildSpec> {
        if let Some(id) = self.child_pk.as_ref().and_then(RecordId::from_value) {
            return Ok(ChildSpec::ById(id));
        }

        let fields: FieldMap = self
            .body
            .iter()
            .filter(|(name, value)| {
                !RESERVED_FIELDS.contains(&name.as_str()) && !value.is_null()
            })
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();

        if fields.is_empty() {
            return Err(BlueprintError::MissingChildSpec);
        }
        Ok(ChildSpec::ByFields(fields))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use corral_model::fields;
    use serde_json::json;

    #[test]
    fn test_positional_pk_wins() {
        let req = AddRequest::new("farm", "animals", 1)
            .child_pk(json!(5))
            .body(fields(&[("name", json!("Jimmy"))]));
        assert_eq!(req.child_spec().unwrap(), ChildSpec::ById(RecordId::Int(5)));
    }

    #[test]
    fn test_body_fields_drop_reserved_and_null() {
        let req = AddRequest::new("farm", "animals", 1).body(fields(&[
            ("name", json!("Jimmy")),
            ("limit", json!(10)),
            ("skip", json!(2)),
            ("sort", json!("name")),
            ("id", json!(3)),
            ("parentid", json!(1)),
            ("owner", json!(null)),
        ]));

        match req.child_spec().unwrap() {
            ChildSpec::ByFields(fields) => {
                assert_eq!(fields.len(), 1);
                assert_eq!(fields.get("name"), Some(&json!("Jimmy")));
            }
            other => panic!("expected fields, got {:?}", other),
        }
    }

    #[test]
    fn test_neither_shape_is_an_error() {
        let req = AddRequest::new("farm", "animals", 1)
            .body(fields(&[("limit", json!(10)), ("id", json!(null))]));
        assert!(matches!(
            req.child_spec(),
            Err(BlueprintError::MissingChildSpec)
        ));
    }

    #[test]
    fn test_unrecognized_pk_value_falls_back_to_body() {
        let req = AddRequest::new("farm", "animals", 1)
            .child_pk(json!({"nested": true}))
            .body(fields(&[("name", json!("Jimmy"))]));
        assert!(matches!(
            req.child_spec().unwrap(),
            ChildSpec::ByFields(_)
        ));
    }

    #[test]
    fn test_excluded_respects_mirror() {
        let conn = ConnectionId::new();
        let req = AddRequest::new("farm", "animals", 1).from_socket(conn);
        assert_eq!(req.excluded(), Some(conn));

        let req = AddRequest::new("farm", "animals", 1)
            .from_socket(conn)
            .mirror(true);
        assert_eq!(req.excluded(), None);

        let req = AddRequest::new("farm", "animals", 1);
        assert_eq!(req.excluded(), None);
    }
}
