use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};
use url::Url;

use crate::errors::{Result, SchemaError};
use crate::keywords::{REF, try_map_subschemas};
use crate::store::DocumentStore;

/// One reference expansion: the absolute target document plus the
/// percent-decoded fragment inside it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RefKey {
    pub document: Url,
    pub fragment: String,
}

impl fmt::Display for RefKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.document, self.fragment)
    }
}

/// Ordered set of references currently being expanded.
#[derive(Debug, Clone, Default)]
pub struct ResolutionStack {
    keys: Vec<RefKey>,
}

impl ResolutionStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &RefKey) -> bool {
        self.keys.contains(key)
    }

    /// Pushes `key`, failing when it is already being expanded.
    pub fn push(&mut self, key: RefKey) -> Result<()> {
        if self.contains(&key) {
            let chain = self
                .keys
                .iter()
                .chain(std::iter::once(&key))
                .map(ToString::to_string)
                .collect();
            return Err(SchemaError::Cycle { chain });
        }
        self.keys.push(key);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Drops every key pushed after the stack had `len` entries.
    pub fn truncate(&mut self, len: usize) {
        self.keys.truncate(len);
    }

    pub fn keys(&self) -> &[RefKey] {
        &self.keys
    }
}

/// A dereferenced node together with the document its references resolve against.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved {
    pub node: Value,
    pub base: Url,
}

/// Dereferences `$ref` pointers within and across documents.
#[derive(Debug, Clone)]
pub struct RefResolver {
    store: Arc<DocumentStore>,
}

impl RefResolver {
    pub fn new(store: Arc<DocumentStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<DocumentStore> {
        &self.store
    }

    /// Dereferences `node` against `base`.
    ///
    /// Nodes without `$ref` come back unchanged. Chains of plain references
    /// collapse to their final target; a target that pairs `$ref` with local
    /// keywords is returned as-is so the caller can merge the two.
    pub fn deref(&self, node: &Value, base: &Url) -> Result<Resolved> {
        let mut stack = ResolutionStack::new();
        self.follow(node, base, &mut stack)
    }

    /// Like [`RefResolver::deref`], recording every expanded reference on
    /// `stack`. The keys stay pushed so the caller can keep them while it
    /// walks the target; it truncates the stack when done.
    pub fn follow(&self, node: &Value, base: &Url, stack: &mut ResolutionStack) -> Result<Resolved> {
        let Some(mut reference) = reference_of(node).map(str::to_string) else {
            return Ok(Resolved {
                node: node.clone(),
                base: base.clone(),
            });
        };
        let mut current = base.clone();

        loop {
            let key = self.key_for(&reference, &current)?;
            stack.push(key.clone())?;

            let document = self.store.fetch(&key.document)?.ok_or_else(|| {
                SchemaError::resolution(&reference, &current, "document cannot be fetched")
            })?;
            let target = locate(&document, &key.fragment).ok_or_else(|| {
                SchemaError::resolution(&reference, &current, "pointer does not resolve")
            })?;

            match target.as_object() {
                Some(map) if map.len() == 1 && map.contains_key(REF) => {
                    reference = reference_of(target).unwrap_or_default().to_string();
                    current = key.document;
                }
                _ => {
                    let node = if key.document == *base {
                        target.clone()
                    } else {
                        rebase(target, &key.document)
                    };
                    return Ok(Resolved {
                        node,
                        base: key.document,
                    });
                }
            }
        }
    }

    /// Normalises `reference`, read in the document `base`, to an absolute key.
    pub fn key_for(&self, reference: &str, base: &Url) -> Result<RefKey> {
        let (document_part, fragment_part) = split_reference(reference);
        let mut document = if document_part.is_empty() {
            base.clone()
        } else {
            base.join(document_part)
                .map_err(|err| SchemaError::resolution(reference, base, err.to_string()))?
        };
        document.set_fragment(None);
        let fragment = urlencoding::decode(fragment_part)
            .map_err(|err| SchemaError::resolution(reference, base, err.to_string()))?
            .into_owned();
        Ok(RefKey { document, fragment })
    }
}

/// Splits a reference into its document part and fragment part.
pub fn split_reference(reference: &str) -> (&str, &str) {
    reference.split_once('#').unwrap_or((reference, ""))
}

/// The `$ref` string of a schema node, if it carries one.
pub fn reference_of(node: &Value) -> Option<&str> {
    node.as_object()?.get(REF)?.as_str()
}

/// Splits a node carrying `$ref` next to other keywords into a plain
/// reference node and the remaining local keywords.
pub fn split_local_keywords(node: &Value) -> Option<(Value, Map<String, Value>)> {
    let map = node.as_object()?;
    let reference = map.get(REF)?;
    if map.len() == 1 {
        return None;
    }
    let mut local = map.clone();
    local.remove(REF);
    let mut plain = Map::new();
    plain.insert(REF.to_string(), reference.clone());
    Some((Value::Object(plain), local))
}

/// Navigates a JSON Pointer fragment; an empty fragment is the document root.
pub fn locate<'a>(document: &'a Value, fragment: &str) -> Option<&'a Value> {
    if fragment.is_empty() {
        return Some(document);
    }
    if fragment.starts_with('/') {
        document.pointer(fragment)
    } else {
        document.pointer(&format!("/{fragment}"))
    }
}

/// Rewrites every relative `$ref` at a schema position below `node` to an
/// absolute reference against `document`, so the subtree stays valid once
/// moved elsewhere. Instance data (`default`, `enum`, ...) is left alone.
pub fn rebase(node: &Value, document: &Url) -> Value {
    let Value::Object(map) = node else {
        return node.clone();
    };
    let mapped: std::result::Result<_, std::convert::Infallible> =
        try_map_subschemas(map, |sub| Ok(rebase(sub, document)));
    let mut rebased = match mapped {
        Ok(rebased) => rebased,
        Err(never) => match never {},
    };
    let absolute = rebased
        .get(REF)
        .and_then(Value::as_str)
        .and_then(|reference| document.join(reference).ok());
    if let Some(absolute) = absolute {
        rebased.insert(REF.to_string(), Value::String(absolute.to_string()));
    }
    Value::Object(rebased)
}
