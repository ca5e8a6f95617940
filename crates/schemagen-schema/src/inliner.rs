use std::collections::HashMap;
use std::hash::{DefaultHasher, Hash, Hasher};

use serde_json::{Map, Value};
use tracing::debug;
use url::Url;

use crate::errors::Result;
use crate::keywords::{ALL_OF, strip_refs, try_map_subschemas};
use crate::merge::{merge, merge_into};
use crate::reference::{RefResolver, ResolutionStack, reference_of, split_local_keywords};

/// Produces fully dereferenced, `allOf`-flattened schema trees.
#[derive(Debug, Clone)]
pub struct SchemaInliner {
    resolver: RefResolver,
}

impl SchemaInliner {
    pub fn new(resolver: RefResolver) -> Self {
        Self { resolver }
    }

    pub fn resolver(&self) -> &RefResolver {
        &self.resolver
    }

    /// Inlines `node`, read in the document `base`. The result holds no `$ref`.
    pub fn inline(&self, node: &Value, base: &Url) -> Result<Value> {
        let mut pass = InlinePass::new(&self.resolver);
        let inlined = pass.inline(node, base)?;
        debug!(base = %base, memoized = pass.memo.len(), "schema inlined");
        Ok(strip_refs(inlined))
    }

    /// Loads the named schema and inlines its root document.
    pub fn inline_schema(&self, name: &str) -> Result<Value> {
        let loaded = self.resolver.store().load(name)?;
        self.inline(&loaded.root, &loaded.base)
    }
}

/// State of one compilation: the memo never outlives the pass.
struct InlinePass<'a> {
    resolver: &'a RefResolver,
    memo: HashMap<(Url, u64), Value>,
    stack: ResolutionStack,
}

impl<'a> InlinePass<'a> {
    fn new(resolver: &'a RefResolver) -> Self {
        Self {
            resolver,
            memo: HashMap::new(),
            stack: ResolutionStack::new(),
        }
    }

    fn inline(&mut self, node: &Value, base: &Url) -> Result<Value> {
        let Value::Object(map) = node else {
            return Ok(node.clone());
        };
        let key = (base.clone(), fingerprint(node));
        if let Some(done) = self.memo.get(&key) {
            return Ok(done.clone());
        }
        let inlined = self.expand(node, map, base)?;
        self.memo.insert(key, inlined.clone());
        Ok(inlined)
    }

    fn expand(&mut self, node: &Value, map: &Map<String, Value>, base: &Url) -> Result<Value> {
        // `$ref` next to local keywords acts as allOf [target, locals].
        if let Some((plain, local)) = split_local_keywords(node) {
            let target = self.inline(&plain, base)?;
            let local = self.inline(&Value::Object(local), base)?;
            return Ok(merge(&target, &local));
        }

        if reference_of(node).is_some() {
            let mark = self.stack.len();
            let resolved = self.resolver.follow(node, base, &mut self.stack)?;
            let inlined = self.inline(&resolved.node, &resolved.base);
            self.stack.truncate(mark);
            return inlined;
        }

        if let Some(Value::Array(branches)) = map.get(ALL_OF) {
            let mut merged = Map::new();
            for branch in branches {
                if let Value::Object(branch) = self.inline(branch, base)? {
                    merge_into(&mut merged, &branch);
                }
            }
            let mut carrier = map.clone();
            carrier.remove(ALL_OF);
            let carrier = try_map_subschemas(&carrier, |sub| self.inline(sub, base))?;
            merge_into(&mut merged, &carrier);
            return Ok(Value::Object(merged));
        }

        let inlined = try_map_subschemas(map, |sub| self.inline(sub, base))?;
        Ok(Value::Object(inlined))
    }
}

/// Structural hash of a JSON tree; object keys are hashed in stored order.
fn fingerprint(value: &Value) -> u64 {
    let mut hasher = DefaultHasher::new();
    hash_value(value, &mut hasher);
    hasher.finish()
}

fn hash_value(value: &Value, hasher: &mut DefaultHasher) {
    match value {
        Value::Null => 0u8.hash(hasher),
        Value::Bool(flag) => {
            1u8.hash(hasher);
            flag.hash(hasher);
        }
        Value::Number(number) => {
            2u8.hash(hasher);
            number.to_string().hash(hasher);
        }
        Value::String(text) => {
            3u8.hash(hasher);
            text.hash(hasher);
        }
        Value::Array(items) => {
            4u8.hash(hasher);
            items.len().hash(hasher);
            for item in items {
                hash_value(item, hasher);
            }
        }
        Value::Object(map) => {
            5u8.hash(hasher);
            map.len().hash(hasher);
            for (key, item) in map {
                key.hash(hasher);
                hash_value(item, hasher);
            }
        }
    }
}
