//! Type Registry: declarative schema of every entity kind.
//!
//! A [`Schema`] names a kind's identity fields, compared attributes,
//! containment children and reference fields. The diff and sync engines only
//! ever consult this table, so adding a kind means adding one entry here.
//!
//! # Reference flavors
//!
//! | Flavor | Declared as | Field value |
//! |--------|-------------|-------------|
//! | foreign key | `foreign_keys: (field, kind)` | unique id of one record |
//! | many-to-many | `many_to_many: (field, kind)` | list of unique ids |
//! | generic | [`GenericRelation`] | none; resolved from sibling identifier fields |

use std::collections::HashSet;

use crate::error::{SyncError, SyncResult};
use crate::record::Record;
use crate::store::SnapshotStore;
use crate::value::{Handle, Identity};

/// Kind names of the network registry.
pub mod kinds {
    pub const STATUS: &str = "status";
    pub const SITE: &str = "site";
    pub const DEVICE: &str = "device";
    pub const INTERFACE: &str = "interface";
    pub const IP_ADDRESS: &str = "ip_address";
    pub const PREFIX: &str = "prefix";
    pub const VLAN: &str = "vlan";
    pub const CABLE: &str = "cable";
}

/// Resolves a generic reference: looks at the record's sibling identifier
/// fields and returns the native handle of the referent in `store`.
pub type Resolver = fn(&Record, &SnapshotStore) -> Option<Handle>;

/// A polymorphic reference resolved by a dedicated function.
#[derive(Debug, Clone, Copy)]
pub struct GenericRelation {
    /// Name under which the resolved handle is reported to target hooks.
    pub field: &'static str,
    /// Kind the resolver looks up.
    pub target: &'static str,
    /// Sibling fields the resolver reads.
    pub identifiers: &'static [&'static str],
    pub resolver: Resolver,
}

/// Declarative description of one entity kind.
#[derive(Debug, Clone, Copy)]
pub struct Schema {
    pub kind: &'static str,
    pub identifiers: &'static [&'static str],
    /// Fields compared by the diff engine.
    pub attributes: &'static [&'static str],
    /// Child kind -> field holding the child identities.
    pub children: &'static [(&'static str, &'static str)],
    pub foreign_keys: &'static [(&'static str, &'static str)],
    pub many_to_many: &'static [(&'static str, &'static str)],
    pub generic: &'static [GenericRelation],
    /// Fields indexed for O(1) reverse lookup.
    pub unique_fields: &'static [&'static str],
}

impl Schema {
    pub const fn empty(kind: &'static str, identifiers: &'static [&'static str]) -> Self {
        Self {
            kind,
            identifiers,
            attributes: &[],
            children: &[],
            foreign_keys: &[],
            many_to_many: &[],
            generic: &[],
            unique_fields: &[],
        }
    }

    pub fn is_identifier(&self, field: &str) -> bool {
        self.identifiers.contains(&field)
    }

    pub fn is_attribute(&self, field: &str) -> bool {
        self.attributes.contains(&field)
    }

    pub fn foreign_key(&self, field: &str) -> Option<&'static str> {
        self.foreign_keys
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, kind)| *kind)
    }

    pub fn many_to_many(&self, field: &str) -> Option<&'static str> {
        self.many_to_many
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, kind)| *kind)
    }

    /// Field holding the identities of `child` records, if declared.
    pub fn children_field(&self, child: &str) -> Option<&'static str> {
        self.children
            .iter()
            .find(|(kind, _)| *kind == child)
            .map(|(_, field)| *field)
    }

    pub(crate) fn is_children_field(&self, field: &str) -> bool {
        self.children.iter().any(|(_, f)| *f == field)
    }
}

/// The set of schemas for one reconciliation universe.
#[derive(Debug, Clone)]
pub struct Registry {
    schemas: Vec<Schema>,
    top_level: Vec<&'static str>,
}

impl Registry {
    /// Builds and validates a registry.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Schema`] if any reference, child or top-level
    /// entry names an undeclared kind, or if containment has a cycle.
    pub fn new(schemas: Vec<Schema>, top_level: &[&str]) -> SyncResult<Self> {
        let mut registry = Self {
            schemas,
            top_level: Vec::new(),
        };
        registry.top_level = registry.intern_kinds(top_level)?;
        registry.validate()?;
        Ok(registry)
    }

    /// Standard network registry: sites, devices, interfaces, addresses,
    /// prefixes, VLANs, cables and statuses.
    pub fn network() -> Self {
        Self {
            schemas: NETWORK_SCHEMAS.to_vec(),
            top_level: NETWORK_TOP_LEVEL.to_vec(),
        }
    }

    /// Replaces the top-level kind ordering.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Schema`] if a name is not a declared kind.
    pub fn with_top_level<S: AsRef<str>>(mut self, top_level: &[S]) -> SyncResult<Self> {
        let names: Vec<&str> = top_level.iter().map(AsRef::as_ref).collect();
        self.top_level = self.intern_kinds(&names)?;
        Ok(self)
    }

    fn intern_kinds(&self, names: &[&str]) -> SyncResult<Vec<&'static str>> {
        names
            .iter()
            .map(|name| {
                self.schema(name)
                    .map(|s| s.kind)
                    .map_err(|_| SyncError::schema(format!("top-level kind '{}' is not declared", name)))
            })
            .collect()
    }

    /// Looks up the schema of a kind.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::UnknownKind`] if the kind is not declared.
    pub fn schema(&self, kind: &str) -> SyncResult<&Schema> {
        self.schemas
            .iter()
            .find(|s| s.kind == kind)
            .ok_or_else(|| SyncError::UnknownKind(kind.to_string()))
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.schemas.iter().any(|s| s.kind == kind)
    }

    /// Kinds in declaration order.
    pub fn kinds(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.schemas.iter().map(|s| s.kind)
    }

    pub fn top_level(&self) -> &[&'static str] {
        &self.top_level
    }

    /// Kinds that declare `kind` as a child, with the declaring field.
    pub fn parents_of(&self, kind: &str) -> impl Iterator<Item = (&'static str, &'static str)> + '_ {
        let kind = kind.to_string();
        self.schemas.iter().filter_map(move |s| {
            s.children_field(&kind).map(|field| (s.kind, field))
        })
    }

    /// Processing order shared by the loader, the diff engine and the sync engine.
    ///
    /// Top-level kinds come first, each followed depth-first by its containment
    /// children; remaining kinds follow in declaration order. A parent kind
    /// therefore always precedes its child kinds.
    pub fn order(&self) -> Vec<&'static str> {
        let mut order = Vec::with_capacity(self.schemas.len());
        let mut seen = HashSet::new();

        let roots = self
            .top_level
            .iter()
            .copied()
            .chain(self.schemas.iter().map(|s| s.kind));
        for kind in roots {
            self.visit(kind, &mut seen, &mut order);
        }
        order
    }

    fn visit(&self, kind: &'static str, seen: &mut HashSet<&'static str>, order: &mut Vec<&'static str>) {
        if !seen.insert(kind) {
            return;
        }
        order.push(kind);
        if let Ok(schema) = self.schema(kind) {
            for (child, _) in schema.children {
                self.visit(child, seen, order);
            }
        }
    }

    /// Checks that every kind referenced anywhere is declared and that
    /// containment is acyclic.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Schema`] describing the first problem found.
    pub fn validate(&self) -> SyncResult<()> {
        let mut declared = HashSet::new();
        for schema in &self.schemas {
            if !declared.insert(schema.kind) {
                return Err(SyncError::schema(format!("kind '{}' declared twice", schema.kind)));
            }
            if schema.identifiers.is_empty() {
                return Err(SyncError::schema(format!("kind '{}' has no identifiers", schema.kind)));
            }
        }

        for schema in &self.schemas {
            let references = schema
                .foreign_keys
                .iter()
                .chain(schema.many_to_many.iter())
                .map(|(field, target)| (*field, *target))
                .chain(schema.generic.iter().map(|g| (g.field, g.target)))
                .chain(schema.children.iter().map(|(child, field)| (*field, *child)));

            for (field, target) in references {
                if !declared.contains(target) {
                    return Err(SyncError::schema(format!(
                        "{}.{} references undeclared kind '{}'",
                        schema.kind, field, target
                    )));
                }
            }

            for field in schema.attributes {
                if schema.is_identifier(field) {
                    return Err(SyncError::schema(format!(
                        "{}.{} is both identifier and attribute",
                        schema.kind, field
                    )));
                }
            }
        }

        for kind in &self.top_level {
            if !declared.contains(kind) {
                return Err(SyncError::schema(format!("top-level kind '{}' is not declared", kind)));
            }
        }

        for schema in &self.schemas {
            self.check_acyclic(schema.kind, &mut Vec::new())?;
        }

        Ok(())
    }

    fn check_acyclic(&self, kind: &'static str, path: &mut Vec<&'static str>) -> SyncResult<()> {
        if path.contains(&kind) {
            path.push(kind);
            return Err(SyncError::schema(format!(
                "containment cycle: {}",
                path.join(" -> ")
            )));
        }
        path.push(kind);
        let schema = self.schema(kind)?;
        for (child, _) in schema.children {
            self.check_acyclic(child, path)?;
        }
        path.pop();
        Ok(())
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::network()
    }
}

/// Looks up `kind` in `store` by the identity formed from `fields` of `record`.
fn handle_by_fields(
    record: &Record,
    store: &SnapshotStore,
    kind: &str,
    fields: &[&str],
) -> Option<Handle> {
    let parts: Option<Vec<String>> = fields.iter().map(|f| record.get(f).identity_part()).collect();
    let identity = Identity::new(parts?);
    store.get(kind, &identity).ok()?.handle().cloned()
}

fn ip_address_interface(record: &Record, store: &SnapshotStore) -> Option<Handle> {
    handle_by_fields(record, store, kinds::INTERFACE, &["device", "interface"])
}

fn cable_termination_a(record: &Record, store: &SnapshotStore) -> Option<Handle> {
    handle_by_fields(
        record,
        store,
        kinds::INTERFACE,
        &["termination_a_device", "termination_a"],
    )
}

fn cable_termination_b(record: &Record, store: &SnapshotStore) -> Option<Handle> {
    handle_by_fields(
        record,
        store,
        kinds::INTERFACE,
        &["termination_b_device", "termination_b"],
    )
}

const NETWORK_TOP_LEVEL: &[&str] = &[kinds::STATUS, kinds::SITE, kinds::DEVICE, kinds::CABLE];

const NETWORK_SCHEMAS: &[Schema] = &[
    Schema {
        attributes: &["name"],
        ..Schema::empty(kinds::STATUS, &["slug"])
    },
    Schema {
        children: &[(kinds::VLAN, "vlans"), (kinds::PREFIX, "prefixes")],
        ..Schema::empty(kinds::SITE, &["slug"])
    },
    Schema {
        attributes: &["site", "primary_ip"],
        children: &[(kinds::INTERFACE, "interfaces")],
        foreign_keys: &[("site", kinds::SITE)],
        unique_fields: &["primary_ip"],
        ..Schema::empty(kinds::DEVICE, &["slug"])
    },
    Schema {
        attributes: &[
            "description",
            "mode",
            "tagged_vlans",
            "untagged_vlan",
            "status",
            "type",
        ],
        children: &[(kinds::IP_ADDRESS, "ip_addresses")],
        foreign_keys: &[
            ("device", kinds::DEVICE),
            ("status", kinds::STATUS),
            ("untagged_vlan", kinds::VLAN),
        ],
        many_to_many: &[("tagged_vlans", kinds::VLAN)],
        ..Schema::empty(kinds::INTERFACE, &["device", "name"])
    },
    Schema {
        attributes: &["status"],
        foreign_keys: &[("status", kinds::STATUS)],
        generic: &[GenericRelation {
            field: "interface",
            target: kinds::INTERFACE,
            identifiers: &["device", "interface"],
            resolver: ip_address_interface,
        }],
        ..Schema::empty(kinds::IP_ADDRESS, &["device", "interface", "address"])
    },
    Schema {
        attributes: &["vlan", "status"],
        foreign_keys: &[
            ("site", kinds::SITE),
            ("status", kinds::STATUS),
            ("vlan", kinds::VLAN),
        ],
        ..Schema::empty(kinds::PREFIX, &["site", "prefix"])
    },
    Schema {
        attributes: &["name", "status"],
        foreign_keys: &[("site", kinds::SITE), ("status", kinds::STATUS)],
        ..Schema::empty(kinds::VLAN, &["site", "vid"])
    },
    Schema {
        generic: &[
            GenericRelation {
                field: "termination_a",
                target: kinds::INTERFACE,
                identifiers: &["termination_a_device", "termination_a"],
                resolver: cable_termination_a,
            },
            GenericRelation {
                field: "termination_b",
                target: kinds::INTERFACE,
                identifiers: &["termination_b_device", "termination_b"],
                resolver: cable_termination_b,
            },
        ],
        ..Schema::empty(
            kinds::CABLE,
            &[
                "termination_a_device",
                "termination_a",
                "termination_b_device",
                "termination_b",
            ],
        )
    },
];
