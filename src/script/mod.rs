//! Restricted expression language for script nodes.
//!
//! Startup scripts run once per resolution pass into a [`Preamble`]. Each
//! script node then evaluates against a private copy of that scope with its
//! siblings bound in a fresh frame, so nothing one node binds is visible to
//! another.

pub mod ast;
pub mod binding;
pub mod builtins;
pub mod error;
pub mod eval;
pub mod lexer;
pub mod ops;
pub mod parser;
pub mod scope;
pub mod value;

pub use error::ScriptError;
pub use eval::Evaluator;
pub use scope::Scope;
pub use value::ScriptValue;

use ast::{Expr, Stmt};
use indexmap::IndexMap;
use serde_yaml_ng::Value;
use tracing::{debug, warn};

/// Parse a node expression.
pub fn compile_expression(source: &str) -> error::Result<Expr> {
    parser::parse_expression(source)
}

/// Parse a startup script.
pub fn compile_program(source: &str) -> error::Result<Vec<Stmt>> {
    parser::parse_program(source)
}

/// The scope produced by running the startup scripts.
#[derive(Debug, Clone, Default)]
pub struct Preamble {
    scope: Scope,
}

impl Preamble {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Run `scripts` in order. A script that fails to parse is skipped as a
    /// whole; a statement that fails to run is skipped on its own.
    pub fn build<S: AsRef<str>>(scripts: &[S]) -> Self {
        let mut scope = Scope::new();
        for (index, script) in scripts.iter().enumerate() {
            let stmts = match compile_program(script.as_ref()) {
                Ok(stmts) => stmts,
                Err(err) => {
                    warn!(script = index, error = %err, "startup script does not parse, skipping");
                    continue;
                }
            };
            let mut evaluator = Evaluator::new(&mut scope);
            for stmt in &stmts {
                if let Err(err) = evaluator.exec(stmt) {
                    warn!(script = index, error = %err, "startup statement failed, skipping");
                }
            }
        }
        debug!(names = ?scope.names(), "preamble ready");
        Self { scope }
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn evaluator(&self) -> ScriptEvaluator<'_> {
        ScriptEvaluator { preamble: self }
    }
}

/// Evaluates script node expressions on top of a preamble.
#[derive(Debug, Clone, Copy)]
pub struct ScriptEvaluator<'p> {
    preamble: &'p Preamble,
}

impl<'p> ScriptEvaluator<'p> {
    /// Evaluate `source` with `siblings` bound. `Ok(None)` when the
    /// expression yields `None`.
    pub fn evaluate(
        &self,
        source: &str,
        siblings: &IndexMap<String, Value>,
    ) -> error::Result<Option<Value>> {
        let expr = compile_expression(source)?;
        let mut scope = self.preamble.scope.clone();
        scope.push_frame();
        binding::bind_siblings(&mut scope, siblings)?;
        let result = Evaluator::new(&mut scope).eval(&expr)?;
        match result.to_yaml()? {
            Value::Null => Ok(None),
            value => Ok(Some(value)),
        }
    }
}
