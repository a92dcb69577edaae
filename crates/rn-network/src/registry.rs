//! Network-wide typology and road-marker template registries.
//!
//! Both registries must be fully populated before a rebuild starts.  The
//! rebuild only ever borrows them immutably.

use std::collections::BTreeMap;

/// The kind of a cross-section element: whether vehicles may drive on it,
/// plus a rendering class for the (external) drawing layer.
#[derive(Clone, Debug, PartialEq)]
pub struct Typology {
    pub name:     String,
    pub drivable: bool,
    pub class:    String,
}

impl Typology {
    pub fn new(name: impl Into<String>, drivable: bool) -> Self {
        let name = name.into();
        Self { class: name.clone(), name, drivable }
    }

    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.class = class.into();
        self
    }
}

/// Physical stripe width for one road-marker type token.
#[derive(Clone, Debug, PartialEq)]
pub struct MarkerTemplate {
    pub kind:  String,
    pub width: f64,
}

impl MarkerTemplate {
    pub fn new(kind: impl Into<String>, width: f64) -> Self {
        Self { kind: kind.into(), width }
    }
}

// ── TypologyRegistry ──────────────────────────────────────────────────────────

/// Typologies keyed by name, matched case-insensitively.
#[derive(Clone, Debug, Default)]
pub struct TypologyRegistry {
    by_name: BTreeMap<String, Typology>,
}

impl TypologyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `typology`, returning the entry it replaced (same name,
    /// ignoring case), if any.
    pub fn insert(&mut self, typology: Typology) -> Option<Typology> {
        self.by_name.insert(typology.name.to_lowercase(), typology)
    }

    pub fn get(&self, name: &str) -> Option<&Typology> {
        self.by_name.get(&name.to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Typology> + '_ {
        self.by_name.values()
    }
}

// ── MarkerTemplateRegistry ────────────────────────────────────────────────────

/// Road-marker templates keyed by their exact type token.
#[derive(Clone, Debug, Default)]
pub struct MarkerTemplateRegistry {
    by_kind: BTreeMap<String, MarkerTemplate>,
}

impl MarkerTemplateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, template: MarkerTemplate) -> Option<MarkerTemplate> {
        self.by_kind.insert(template.kind.clone(), template)
    }

    pub fn get(&self, kind: &str) -> Option<&MarkerTemplate> {
        self.by_kind.get(kind)
    }

    pub fn len(&self) -> usize {
        self.by_kind.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_kind.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MarkerTemplate> + '_ {
        self.by_kind.values()
    }
}

/// Both registries, borrowed together by the binding pass.
#[derive(Clone, Debug, Default)]
pub struct Registries {
    pub typologies: TypologyRegistry,
    pub markers:    MarkerTemplateRegistry,
}
