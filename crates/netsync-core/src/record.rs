//! A single entity instance held by a snapshot store.

use std::collections::BTreeMap;

use crate::error::{SyncError, SyncResult};
use crate::registry::Schema;
use crate::value::{Fields, Handle, Identity, Value};

/// Reserved field carrying a record's native handle in bulk documents.
pub const HANDLE_FIELD: &str = "pk";

static NULL: Value = Value::Null;

/// Entity instance: identity, field values, children and native handle.
///
/// Containment children are kept per child kind, as identities, in the
/// order they were attached.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    kind: &'static str,
    identifiers: &'static [&'static str],
    attributes: &'static [&'static str],
    identity: Identity,
    fields: Fields,
    children: BTreeMap<&'static str, Vec<Identity>>,
    handle: Option<Handle>,
}

impl Record {
    /// Builds a record from raw field values.
    ///
    /// Child-list fields declared by the schema become the record's children
    /// and the reserved `pk` field becomes its handle.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::MissingIdentifier`] if an identity field is
    /// absent, null or empty.
    pub fn new(schema: &Schema, mut fields: Fields) -> SyncResult<Self> {
        let handle = fields
            .remove(HANDLE_FIELD)
            .and_then(|v| v.identity_part())
            .map(Handle::new);

        let mut children = BTreeMap::new();
        for (child_kind, field) in schema.children {
            let ids = fields
                .remove(*field)
                .map(|v| v.text_items().into_iter().map(Identity::parse).collect())
                .unwrap_or_default();
            children.insert(*child_kind, ids);
        }

        let mut parts = Vec::with_capacity(schema.identifiers.len());
        for field in schema.identifiers {
            let part = fields
                .get(*field)
                .and_then(Value::identity_part)
                .ok_or_else(|| SyncError::MissingIdentifier {
                    kind: schema.kind.to_string(),
                    field: field.to_string(),
                })?;
            parts.push(part);
        }

        Ok(Self {
            kind: schema.kind,
            identifiers: schema.identifiers,
            attributes: schema.attributes,
            identity: Identity::new(parts),
            fields,
            children,
            handle,
        })
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn unique_id(&self) -> String {
        self.identity.unique_id()
    }

    pub fn handle(&self) -> Option<&Handle> {
        self.handle.as_ref()
    }

    pub(crate) fn set_handle(&mut self, handle: Option<Handle>) {
        self.handle = handle;
    }

    /// Value of a field; missing fields read as null.
    pub fn get(&self, field: &str) -> &Value {
        self.fields.get(field).unwrap_or(&NULL)
    }

    /// Text value of a field, if it holds text.
    pub fn text(&self, field: &str) -> Option<&str> {
        self.get(field).as_str()
    }

    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    /// Writes a non-identity field. Null removes the field.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::InvalidField`] for identity fields, which are
    /// immutable once the record exists.
    pub fn set(&mut self, field: &str, value: Value) -> SyncResult<()> {
        if self.identifiers.contains(&field) {
            return Err(SyncError::InvalidField {
                kind: self.kind.to_string(),
                field: field.to_string(),
                reason: "identity fields are immutable".to_string(),
            });
        }
        if value.is_null() {
            self.fields.remove(field);
        } else {
            self.fields.insert(field.to_string(), value);
        }
        Ok(())
    }

    /// Identity field names and values, in declaration order.
    pub fn identity_fields(&self) -> impl Iterator<Item = (&'static str, &Value)> + '_ {
        self.identifiers.iter().map(move |f| (*f, self.get(f)))
    }

    /// Compared attribute names and values, in declaration order.
    pub fn attributes(&self) -> impl Iterator<Item = (&'static str, &Value)> + '_ {
        self.attributes.iter().map(move |f| (*f, self.get(f)))
    }

    /// Identities of the children of `kind`.
    pub fn children(&self, kind: &str) -> &[Identity] {
        self.children.get(kind).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn all_children(&self) -> impl Iterator<Item = (&'static str, &Identity)> + '_ {
        self.children
            .iter()
            .flat_map(|(kind, ids)| ids.iter().map(move |id| (*kind, id)))
    }

    /// Returns false if the child was already attached.
    pub(crate) fn add_child(&mut self, kind: &'static str, id: Identity) -> bool {
        let ids = self.children.entry(kind).or_default();
        if ids.contains(&id) {
            return false;
        }
        ids.push(id);
        true
    }

    pub(crate) fn remove_child(&mut self, kind: &str, id: &Identity) -> bool {
        match self.children.get_mut(kind) {
            Some(ids) => {
                let before = ids.len();
                ids.retain(|c| c != id);
                ids.len() != before
            }
            None => false,
        }
    }

    pub(crate) fn retain_children<F>(&mut self, mut keep: F) -> Vec<(&'static str, Identity)>
    where
        F: FnMut(&'static str, &Identity) -> bool,
    {
        let mut dropped = Vec::new();
        for (kind, ids) in self.children.iter_mut() {
            let kind = *kind;
            ids.retain(|id| {
                let retained = keep(kind, id);
                if !retained {
                    dropped.push((kind, id.clone()));
                }
                retained
            });
        }
        dropped
    }

    /// Field map in bulk-document form: fields, child lists and `pk`.
    pub fn to_fields(&self, schema: &Schema) -> Fields {
        let mut out = self.fields.clone();
        for (child_kind, field) in schema.children {
            let ids: Vec<String> = self
                .children(child_kind)
                .iter()
                .map(Identity::unique_id)
                .collect();
            out.insert(field.to_string(), Value::from(ids));
        }
        if let Some(handle) = &self.handle {
            out.insert(HANDLE_FIELD.to_string(), Value::from(handle.as_str()));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Registry;
    use pretty_assertions::assert_eq;

    fn fields(pairs: &[(&str, Value)]) -> Fields {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_identity_from_identifiers() {
        let registry = Registry::network();
        let schema = registry.schema("interface").unwrap();
        let record = Record::new(
            schema,
            fields(&[
                ("device", "ams01-edge-01".into()),
                ("name", "Ethernet1/1".into()),
                ("description", "uplink".into()),
                ("pk", "42".into()),
            ]),
        )
        .unwrap();

        assert_eq!(record.unique_id(), "ams01-edge-01__Ethernet1/1");
        assert_eq!(record.handle(), Some(&Handle::new("42")));
        assert_eq!(record.text("description"), Some("uplink"));
        assert!(record.get("mode").is_null());
        assert!(!record.fields().contains_key("pk"));
    }

    #[test]
    fn test_missing_identifier() {
        let registry = Registry::network();
        let schema = registry.schema("vlan").unwrap();
        let err = Record::new(schema, fields(&[("site", "ams01".into())])).unwrap_err();
        assert_eq!(
            err,
            SyncError::MissingIdentifier {
                kind: "vlan".to_string(),
                field: "vid".to_string()
            }
        );
    }

    #[test]
    fn test_children_are_extracted() {
        let registry = Registry::network();
        let schema = registry.schema("device").unwrap();
        let record = Record::new(
            schema,
            fields(&[
                ("slug", "edge-01".into()),
                (
                    "interfaces",
                    Value::from(vec!["edge-01__eth0".to_string(), "edge-01__eth1".to_string()]),
                ),
            ]),
        )
        .unwrap();

        assert_eq!(record.children("interface").len(), 2);
        assert!(record.fields().get("interfaces").is_none());

        let exported = record.to_fields(schema);
        assert_eq!(
            exported["interfaces"].text_items(),
            vec!["edge-01__eth0", "edge-01__eth1"]
        );
    }

    #[test]
    fn test_identity_fields_are_immutable() {
        let registry = Registry::network();
        let schema = registry.schema("site").unwrap();
        let mut record = Record::new(schema, fields(&[("slug", "ams01".into())])).unwrap();

        assert!(matches!(
            record.set("slug", "lon01".into()),
            Err(SyncError::InvalidField { .. })
        ));
        record.set("description", "Amsterdam".into()).unwrap();
        record.set("description", Value::Null).unwrap();
        assert!(record.get("description").is_null());
    }
}
