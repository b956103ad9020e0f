//! `$ref` placeholder substitution inside call arguments.
//!
//! `{"$ref": "guild"}` becomes the context's guild id (defaults applied).
//! `{"$ref": "args.2"}` becomes the resolved value of positional argument 2.
//! Unknown, dangling or cyclic references are validation errors.

use serde_json::{Map, Value};

use super::{ContextResolver, InvocationContext, TargetKind};
use crate::error::GatewayError;

const REF_KEY: &str = "$ref";

/// Substituted arguments plus the context kinds they referenced.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedArgs {
    pub args: Vec<Value>,
    pub referenced: Vec<TargetKind>,
}

/// Replace every `$ref` placeholder in `args`.
pub fn resolve_refs(
    args: &[Value],
    ctx: &InvocationContext,
    resolver: &ContextResolver,
) -> Result<ResolvedArgs, GatewayError> {
    let mut walker = RefWalker {
        args,
        ctx,
        resolver,
        memo: vec![None; args.len()],
        visiting: vec![false; args.len()],
        referenced: Vec::new(),
    };
    let mut resolved = Vec::with_capacity(args.len());
    for index in 0..args.len() {
        resolved.push(walker.resolve_arg(index)?);
    }
    Ok(ResolvedArgs {
        args: resolved,
        referenced: walker.referenced,
    })
}

struct RefWalker<'a> {
    args: &'a [Value],
    ctx: &'a InvocationContext,
    resolver: &'a ContextResolver,
    memo: Vec<Option<Value>>,
    visiting: Vec<bool>,
    referenced: Vec<TargetKind>,
}

impl RefWalker<'_> {
    fn resolve_arg(&mut self, index: usize) -> Result<Value, GatewayError> {
        if let Some(done) = &self.memo[index] {
            return Ok(done.clone());
        }
        if self.visiting[index] {
            return Err(GatewayError::Validation(format!(
                "cyclic $ref through args.{}",
                index
            )));
        }
        self.visiting[index] = true;
        let args = self.args;
        let value = self.walk(&args[index])?;
        self.visiting[index] = false;
        self.memo[index] = Some(value.clone());
        Ok(value)
    }

    fn walk(&mut self, value: &Value) -> Result<Value, GatewayError> {
        match value {
            Value::Object(map) => {
                if let Some(reference) = as_ref(map) {
                    return self.substitute(reference);
                }
                let mut out = Map::with_capacity(map.len());
                for (key, item) in map {
                    out.insert(key.clone(), self.walk(item)?);
                }
                Ok(Value::Object(out))
            }
            Value::Array(items) => items
                .iter()
                .map(|item| self.walk(item))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            other => Ok(other.clone()),
        }
    }

    fn substitute(&mut self, reference: &str) -> Result<Value, GatewayError> {
        if let Some(raw_index) = reference.strip_prefix("args.") {
            let index: usize = raw_index.parse().map_err(|_| {
                GatewayError::Validation(format!("invalid $ref '{}'", reference))
            })?;
            if index >= self.args.len() {
                return Err(GatewayError::Validation(format!(
                    "$ref '{}' points past the {} supplied args",
                    reference,
                    self.args.len()
                )));
            }
            return self.resolve_arg(index);
        }

        let kind = TargetKind::parse(reference).ok_or_else(|| {
            GatewayError::Validation(format!("unknown $ref '{}'", reference))
        })?;
        let (id, _) = self.resolver.effective_id(self.ctx, kind).ok_or_else(|| {
            GatewayError::Validation(format!(
                "$ref '{}' needs {} in the context",
                reference,
                kind.context_field()
            ))
        })?;
        if !self.referenced.contains(&kind) {
            self.referenced.push(kind);
        }
        Ok(Value::String(id))
    }
}

/// `{"$ref": "..."}` with no other keys.
fn as_ref(map: &Map<String, Value>) -> Option<&str> {
    if map.len() != 1 {
        return None;
    }
    map.get(REF_KEY).and_then(Value::as_str)
}
