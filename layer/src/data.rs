//! Raw spec storage of a layer.
//!
//! [`LayerData`] is the plain map of specs behind a [`Layer`](crate::Layer).
//! Its mutators are only ever called by a
//! [`LayerStateDelegate`](crate::LayerStateDelegate); everything else goes
//! through the layer so that the installed delegate sees every change.
//!
//! Every mutator returns `true` if the data changed. Invalid targets (a
//! missing spec, a missing parent, an occupied destination) are no-ops.

use std::collections::BTreeMap;

use crate::path::Path;
use crate::value::{TimeCode, TimeSampleMap, Value};

/// Well-known field names.
pub mod fields {
    /// Ordered names of a prim's child prims.
    pub const PRIM_CHILDREN: &str = "primChildren";
    /// Ordered names of a prim's properties.
    pub const PROPERTY_CHILDREN: &str = "propertyChildren";
    /// Time-sampled values of an attribute.
    pub const TIME_SAMPLES: &str = "timeSamples";
    /// Default (untimed) value of an attribute.
    pub const DEFAULT: &str = "default";
    /// Whether a prim participates in composition.
    pub const ACTIVE: &str = "active";
    /// User-defined dictionary of a spec.
    pub const CUSTOM_DATA: &str = "customData";
}

/// Kind of a spec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum SpecType {
    PseudoRoot,
    Prim,
    Attribute,
    Relationship,
}

impl SpecType {
    pub fn is_property(self) -> bool {
        matches!(self, Self::Attribute | Self::Relationship)
    }
}

/// One node of the layer: a type, an inert flag and a set of fields.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct SpecData {
    pub spec_type: SpecType,
    /// Inert specs carry no opinions of their own and only exist to hold
    /// descendants.
    pub inert: bool,
    pub fields: BTreeMap<String, Value>,
}

impl SpecData {
    pub fn new(spec_type: SpecType, inert: bool) -> Self {
        Self {
            spec_type,
            inert,
            fields: BTreeMap::new(),
        }
    }
}

/// Map of every spec in a layer, keyed by path. Always holds the pseudo-root.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct LayerData {
    specs: BTreeMap<Path, SpecData>,
}

impl LayerData {
    pub fn new() -> Self {
        let mut specs = BTreeMap::new();
        specs.insert(
            Path::absolute_root(),
            SpecData::new(SpecType::PseudoRoot, false),
        );
        Self { specs }
    }

    // -- Queries --

    pub fn has_spec(&self, path: &Path) -> bool {
        self.specs.contains_key(path)
    }

    pub fn spec(&self, path: &Path) -> Option<&SpecData> {
        self.specs.get(path)
    }

    pub fn spec_type(&self, path: &Path) -> Option<SpecType> {
        self.specs.get(path).map(|spec| spec.spec_type)
    }

    pub fn field(&self, path: &Path, field: &str) -> Option<&Value> {
        self.specs.get(path)?.fields.get(field)
    }

    pub fn dict_value(&self, path: &Path, field: &str, key: &str) -> Option<&Value> {
        self.field(path, field)?.as_dictionary()?.get(key)
    }

    pub fn has_time_samples(&self, path: &Path) -> bool {
        self.field(path, fields::TIME_SAMPLES).is_some()
    }

    pub fn time_samples(&self, path: &Path) -> Option<&TimeSampleMap> {
        self.field(path, fields::TIME_SAMPLES)?.as_time_samples()
    }

    pub fn time_sample(&self, path: &Path, time: TimeCode) -> Option<&Value> {
        self.time_samples(path)?.get(&time)
    }

    pub fn children(&self, path: &Path, field: &str) -> &[String] {
        self.field(path, field)
            .and_then(Value::as_token_list)
            .unwrap_or_default()
    }

    /// Every spec at or below `path`, parents before descendants.
    pub fn subtree(&self, path: &Path) -> Vec<(Path, SpecData)> {
        self.specs
            .range(path.clone()..)
            .take_while(|(p, _)| p.as_str().starts_with(path.as_str()))
            .filter(|(p, _)| p.has_prefix(path))
            .map(|(p, spec)| (p.clone(), spec.clone()))
            .collect()
    }

    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.specs.keys()
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    /// Always `false`: the pseudo-root is never removed.
    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    // -- Mutators --

    /// Sets (`Some`) or erases (`None`) a field.
    pub fn set_field(&mut self, path: &Path, field: &str, value: Option<Value>) -> bool {
        let Some(spec) = self.specs.get_mut(path) else {
            log::debug!("set_field: no spec at {path}");
            return false;
        };
        match value {
            Some(value) => {
                if spec.fields.get(field) == Some(&value) {
                    return false;
                }
                spec.fields.insert(field.to_owned(), value);
                true
            }
            None => spec.fields.remove(field).is_some(),
        }
    }

    /// Sets or erases one key of a dictionary-valued field. Erasing the last
    /// key erases the field.
    pub fn set_dict_value(
        &mut self,
        path: &Path,
        field: &str,
        key: &str,
        value: Option<Value>,
    ) -> bool {
        let Some(spec) = self.specs.get_mut(path) else {
            log::debug!("set_dict_value: no spec at {path}");
            return false;
        };
        let mut dict = match spec.fields.get(field) {
            Some(Value::Dictionary(dict)) => dict.clone(),
            Some(_) => {
                log::debug!("set_dict_value: {path}.{field} is not a dictionary");
                return false;
            }
            None => BTreeMap::new(),
        };
        let changed = match value {
            Some(value) => dict.insert(key.to_owned(), value.clone()) != Some(value),
            None => dict.remove(key).is_some(),
        };
        if !changed {
            return false;
        }
        if dict.is_empty() {
            spec.fields.remove(field);
        } else {
            spec.fields.insert(field.to_owned(), Value::Dictionary(dict));
        }
        true
    }

    /// Sets or erases the sample at `time`. The samples field is created on
    /// demand and kept (possibly empty) when its last sample is erased.
    pub fn set_time_sample(&mut self, path: &Path, time: TimeCode, value: Option<Value>) -> bool {
        let Some(spec) = self.specs.get_mut(path) else {
            log::debug!("set_time_sample: no spec at {path}");
            return false;
        };
        if !spec.fields.contains_key(fields::TIME_SAMPLES) {
            if value.is_none() {
                return false;
            }
            spec.fields.insert(
                fields::TIME_SAMPLES.to_owned(),
                Value::TimeSamples(TimeSampleMap::new()),
            );
        }
        let Some(Value::TimeSamples(samples)) = spec.fields.get_mut(fields::TIME_SAMPLES) else {
            log::debug!("set_time_sample: {path} holds a non-sample timeSamples field");
            return false;
        };
        match value {
            Some(value) => {
                if samples.get(&time) == Some(&value) {
                    return false;
                }
                samples.insert(time, value);
                true
            }
            None => samples.remove(&time).is_some(),
        }
    }

    /// Creates an empty spec. The parent must exist, the path must be free,
    /// and the type must match the path kind.
    pub fn create_spec(&mut self, path: &Path, spec_type: SpecType, inert: bool) -> bool {
        if self.specs.contains_key(path) {
            log::debug!("create_spec: {path} already exists");
            return false;
        }
        let kind_matches = match spec_type {
            SpecType::PseudoRoot => false,
            SpecType::Prim => path.is_prim(),
            SpecType::Attribute | SpecType::Relationship => path.is_property(),
        };
        if !kind_matches {
            log::debug!("create_spec: {spec_type:?} cannot live at {path}");
            return false;
        }
        let parent_is_prim = path
            .parent()
            .and_then(|parent| self.spec_type(&parent))
            .is_some_and(|ty| !ty.is_property());
        if !parent_is_prim {
            log::debug!("create_spec: no parent prim for {path}");
            return false;
        }
        self.specs.insert(path.clone(), SpecData::new(spec_type, inert));
        true
    }

    /// Deletes the spec at `path` together with its whole subtree.
    ///
    /// With `inert` set, only a spec without fields or descendants is
    /// removed.
    pub fn delete_spec(&mut self, path: &Path, inert: bool) -> bool {
        if path.is_absolute_root() || !self.specs.contains_key(path) {
            log::debug!("delete_spec: cannot delete {path}");
            return false;
        }
        let doomed: Vec<Path> = self.subtree(path).into_iter().map(|(p, _)| p).collect();
        if inert {
            let holds_opinions = doomed.len() > 1
                || self
                    .specs
                    .get(path)
                    .is_some_and(|spec| !spec.fields.is_empty());
            if holds_opinions {
                log::debug!("delete_spec: {path} is not inert");
                return false;
            }
        }
        for p in doomed {
            self.specs.remove(&p);
        }
        true
    }

    /// Re-keys the subtree at `old_path` to `new_path`.
    pub fn move_spec(&mut self, old_path: &Path, new_path: &Path) -> bool {
        if old_path.is_absolute_root()
            || !self.specs.contains_key(old_path)
            || self.specs.contains_key(new_path)
            || new_path.has_prefix(old_path)
            || old_path.is_property() != new_path.is_property()
        {
            log::debug!("move_spec: cannot move {old_path} to {new_path}");
            return false;
        }
        let parent_exists = new_path
            .parent()
            .is_some_and(|parent| self.specs.contains_key(&parent));
        if !parent_exists {
            log::debug!("move_spec: no parent for {new_path}");
            return false;
        }
        for (path, spec) in self.subtree(old_path) {
            self.specs.remove(&path);
            if let Some(moved) = path.replace_prefix(old_path, new_path) {
                self.specs.insert(moved, spec);
            }
        }
        true
    }

    /// Appends `key` to the children list `field` of `parent`.
    pub fn push_child(&mut self, parent: &Path, field: &str, key: &str) -> bool {
        let Some(spec) = self.specs.get_mut(parent) else {
            log::debug!("push_child: no spec at {parent}");
            return false;
        };
        match spec.fields.get_mut(field) {
            Some(Value::TokenList(children)) => children.push(key.to_owned()),
            Some(_) => {
                log::debug!("push_child: {parent}.{field} is not a children list");
                return false;
            }
            None => {
                spec.fields
                    .insert(field.to_owned(), Value::TokenList(vec![key.to_owned()]));
            }
        }
        true
    }

    /// Removes `key` from the end of the children list `field` of `parent`.
    /// Popping the last child erases the field.
    pub fn pop_child(&mut self, parent: &Path, field: &str, key: &str) -> bool {
        let Some(spec) = self.specs.get_mut(parent) else {
            log::debug!("pop_child: no spec at {parent}");
            return false;
        };
        let Some(Value::TokenList(children)) = spec.fields.get_mut(field) else {
            return false;
        };
        if children.last().map(String::as_str) != Some(key) {
            log::debug!("pop_child: {key} is not the last child of {parent}.{field}");
            return false;
        }
        children.pop();
        if children.is_empty() {
            spec.fields.remove(field);
        }
        true
    }
}

impl Default for LayerData {
    fn default() -> Self {
        Self::new()
    }
}
