//! Tree-walking evaluator.

use super::ast::{Expr, Stmt, UnaryOp};
use super::builtins;
use super::error::{Result, ScriptError};
use super::ops;
use super::scope::Scope;
use super::value::{Function, ScriptValue};
use std::rc::Rc;
use tracing::warn;

/// Maximum depth of nested user function calls.
pub const MAX_CALL_DEPTH: usize = 64;

/// Evaluates expressions and statements against a borrowed scope.
pub struct Evaluator<'s> {
    scope: &'s mut Scope,
    depth: usize,
}

impl<'s> Evaluator<'s> {
    pub fn new(scope: &'s mut Scope) -> Self {
        Self { scope, depth: 0 }
    }

    /// Execute one startup statement.
    pub fn exec(&mut self, stmt: &Stmt) -> Result<()> {
        match stmt {
            Stmt::Assign { name, value } => {
                let value = self.eval(value)?;
                self.scope.set(name.clone(), value);
            }
            Stmt::Def { name, params, body } => {
                let func = Function {
                    name: name.clone(),
                    params: params.clone(),
                    body: Rc::clone(body),
                };
                self.scope.set(name.clone(), ScriptValue::Function(Rc::new(func)));
            }
            Stmt::Import(text) => {
                warn!(statement = %text, "imports are not supported in scripts, skipping");
            }
            Stmt::Expr(expr) => {
                self.eval(expr)?;
            }
        }
        Ok(())
    }

    pub fn eval(&mut self, expr: &Expr) -> Result<ScriptValue> {
        match expr {
            Expr::Const(value) => Ok(value.clone()),
            Expr::Name(name) => self.lookup(name),
            Expr::List(items) => Ok(ScriptValue::List(self.eval_all(items)?)),
            Expr::Dict(entries) => {
                let mut map = indexmap::IndexMap::with_capacity(entries.len());
                for (key, value) in entries {
                    let key = ops::map_key(&self.eval(key)?);
                    let value = self.eval(value)?;
                    map.insert(key, value);
                }
                Ok(ScriptValue::Map(map))
            }
            Expr::Unary { op, operand } => {
                let value = self.eval(operand)?;
                match op {
                    UnaryOp::Neg => ops::negate(&value),
                    UnaryOp::Pos => ops::positive(&value),
                    UnaryOp::Not => Ok(ScriptValue::Bool(!value.truthy())),
                }
            }
            Expr::Binary { op, left, right } => {
                let left = self.eval(left)?;
                let right = self.eval(right)?;
                ops::binary(*op, &left, &right)
            }
            Expr::Compare { first, rest } => {
                let mut left = self.eval(first)?;
                for (op, operand) in rest {
                    let right = self.eval(operand)?;
                    if !ops::compare(*op, &left, &right)? {
                        return Ok(ScriptValue::Bool(false));
                    }
                    left = right;
                }
                Ok(ScriptValue::Bool(true))
            }
            Expr::And(left, right) => {
                let left = self.eval(left)?;
                if left.truthy() {
                    self.eval(right)
                } else {
                    Ok(left)
                }
            }
            Expr::Or(left, right) => {
                let left = self.eval(left)?;
                if left.truthy() {
                    Ok(left)
                } else {
                    self.eval(right)
                }
            }
            Expr::Conditional {
                cond,
                then,
                otherwise,
            } => {
                if self.eval(cond)?.truthy() {
                    self.eval(then)
                } else {
                    self.eval(otherwise)
                }
            }
            Expr::Call { callee, args } => self.eval_call(callee, args),
            Expr::Index { target, index } => {
                let target = self.eval(target)?;
                let index = self.eval(index)?;
                ops::index(&target, &index)
            }
            Expr::Slice {
                target,
                start,
                stop,
            } => {
                let target = self.eval(target)?;
                let start = start.as_deref().map(|e| self.eval(e)).transpose()?;
                let stop = stop.as_deref().map(|e| self.eval(e)).transpose()?;
                ops::slice(&target, start.as_ref(), stop.as_ref())
            }
            Expr::Lambda { params, body } => Ok(ScriptValue::Function(Rc::new(Function {
                name: "<lambda>".to_string(),
                params: params.clone(),
                body: Rc::clone(body),
            }))),
        }
    }

    fn eval_all(&mut self, exprs: &[Expr]) -> Result<Vec<ScriptValue>> {
        exprs.iter().map(|e| self.eval(e)).collect()
    }

    /// Scope first, then named constants.
    fn lookup(&self, name: &str) -> Result<ScriptValue> {
        if let Some(value) = self.scope.get(name) {
            return Ok(value.clone());
        }
        if let Some(value) = builtins::constant(name) {
            return Ok(value);
        }
        if builtins::is_builtin(name) {
            return Err(ScriptError::type_error(format!(
                "builtin '{}' can only be called",
                name
            )));
        }
        Err(ScriptError::UnknownName(name.to_string()))
    }

    fn eval_call(&mut self, callee: &Expr, args: &[Expr]) -> Result<ScriptValue> {
        if let Expr::Name(name) = callee {
            if !self.scope.contains(name) && builtins::is_builtin(name) {
                let args = self.eval_all(args)?;
                return builtins::call(name, &args);
            }
        }

        let target = self.eval(callee)?;
        let args = self.eval_all(args)?;
        match target {
            ScriptValue::Function(func) => self.call_function(&func, args),
            other => Err(ScriptError::type_error(format!(
                "'{}' object is not callable",
                other.type_name()
            ))),
        }
    }

    fn call_function(&mut self, func: &Function, args: Vec<ScriptValue>) -> Result<ScriptValue> {
        if args.len() != func.params.len() {
            return Err(ScriptError::arity(
                &func.name,
                func.params.len().to_string(),
                args.len(),
            ));
        }
        if self.depth >= MAX_CALL_DEPTH {
            return Err(ScriptError::RecursionLimit(MAX_CALL_DEPTH));
        }

        self.depth += 1;
        self.scope.push_frame();
        for (param, arg) in func.params.iter().zip(args) {
            self.scope.set(param.clone(), arg);
        }
        let result = self.eval(&func.body);
        self.scope.pop_frame();
        self.depth -= 1;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::parser::{parse_expression, parse_program};

    fn eval_in(scope: &mut Scope, source: &str) -> Result<ScriptValue> {
        let expr = parse_expression(source)?;
        Evaluator::new(scope).eval(&expr)
    }

    fn eval(source: &str) -> Result<ScriptValue> {
        eval_in(&mut Scope::new(), source)
    }

    fn run(scope: &mut Scope, program: &str) {
        let stmts = parse_program(program).unwrap();
        let mut evaluator = Evaluator::new(scope);
        for stmt in &stmts {
            evaluator.exec(stmt).unwrap();
        }
    }

    #[test]
    fn test_eval_arithmetic() {
        assert_eq!(eval("1 + 2 * 3").unwrap(), ScriptValue::Int(7));
        assert_eq!(eval("(1 + 2) * 3").unwrap(), ScriptValue::Int(9));
        assert_eq!(eval("-2 ** 2").unwrap(), ScriptValue::Int(-4));
        assert_eq!(eval("10 / 4").unwrap(), ScriptValue::Float(2.5));
    }

    #[test]
    fn test_eval_sequence_repetition() {
        assert_eq!(
            eval("[1, 2] * 2").unwrap(),
            ScriptValue::List(vec![
                ScriptValue::Int(1),
                ScriptValue::Int(2),
                ScriptValue::Int(1),
                ScriptValue::Int(2)
            ])
        );
        assert_eq!(eval("'ab' * 3").unwrap(), ScriptValue::Str("ababab".into()));
        assert!(eval("[range(1000000)] * 1000000").is_err());
    }

    #[test]
    fn test_eval_names_from_scope() {
        let mut scope = Scope::new();
        scope.set("a", ScriptValue::Int(2));
        scope.set("b", ScriptValue::Int(3));
        assert_eq!(eval_in(&mut scope, "a + b").unwrap(), ScriptValue::Int(5));
    }

    #[test]
    fn test_eval_unknown_name() {
        assert_eq!(
            eval("missing + 1").unwrap_err(),
            ScriptError::UnknownName("missing".into())
        );
    }

    #[test]
    fn test_eval_constants_and_builtins() {
        assert_eq!(eval("round(pi, 2)").unwrap(), ScriptValue::Float(3.14));
        assert_eq!(eval("max(1, 5, 3)").unwrap(), ScriptValue::Int(5));
        assert!(eval("len").is_err());
    }

    #[test]
    fn test_eval_scope_shadows_builtin() {
        let mut scope = Scope::new();
        scope.set("len", ScriptValue::Int(4));
        assert_eq!(eval_in(&mut scope, "len * 2").unwrap(), ScriptValue::Int(8));
        assert!(eval_in(&mut scope, "len([1])").is_err());
    }

    #[test]
    fn test_eval_short_circuit() {
        assert_eq!(eval("0 or 'x'").unwrap(), ScriptValue::Str("x".into()));
        assert_eq!(eval("0 and missing").unwrap(), ScriptValue::Int(0));
        assert_eq!(eval("1 or missing").unwrap(), ScriptValue::Int(1));
    }

    #[test]
    fn test_eval_chained_comparison() {
        assert_eq!(eval("1 < 2 < 3").unwrap(), ScriptValue::Bool(true));
        assert_eq!(eval("1 < 3 < 2").unwrap(), ScriptValue::Bool(false));
        assert_eq!(eval("3 > 2 == 2").unwrap(), ScriptValue::Bool(true));
    }

    #[test]
    fn test_eval_conditional() {
        assert_eq!(eval("'a' if 1 > 2 else 'b'").unwrap(), ScriptValue::Str("b".into()));
    }

    #[test]
    fn test_eval_subscripts() {
        assert_eq!(eval("[1, 2, 3][-1]").unwrap(), ScriptValue::Int(3));
        assert_eq!(
            eval("[1, 2, 3][1:]").unwrap(),
            ScriptValue::List(vec![ScriptValue::Int(2), ScriptValue::Int(3)])
        );
        assert_eq!(eval("{'a': 1}['a']").unwrap(), ScriptValue::Int(1));
    }

    #[test]
    fn test_eval_lambda_call() {
        assert_eq!(eval("(lambda x, y: x * y)(3, 4)").unwrap(), ScriptValue::Int(12));
    }

    #[test]
    fn test_eval_def_and_assign() {
        let mut scope = Scope::new();
        run(
            &mut scope,
            "scale = 10\ndef f(x):\n    return x * scale\ny = f(2)",
        );
        assert_eq!(scope.get("y"), Some(&ScriptValue::Int(20)));
        assert_eq!(eval_in(&mut scope, "f(3) + 1").unwrap(), ScriptValue::Int(31));
    }

    #[test]
    fn test_eval_function_frame_popped() {
        let mut scope = Scope::new();
        run(&mut scope, "def f(x): return x");
        eval_in(&mut scope, "f(1)").unwrap();
        assert!(!scope.contains("x"));
        assert_eq!(scope.depth(), 1);
    }

    #[test]
    fn test_eval_recursion_limit() {
        let mut scope = Scope::new();
        run(&mut scope, "def f(n): return f(n + 1)");
        assert_eq!(
            eval_in(&mut scope, "f(0)").unwrap_err(),
            ScriptError::RecursionLimit(MAX_CALL_DEPTH)
        );
        assert_eq!(scope.depth(), 1);
    }

    #[test]
    fn test_eval_recursive_function_terminates() {
        let mut scope = Scope::new();
        run(&mut scope, "def fact(n): return 1 if n <= 1 else n * fact(n - 1)");
        assert_eq!(eval_in(&mut scope, "fact(10)").unwrap(), ScriptValue::Int(3628800));
    }

    #[test]
    fn test_eval_wrong_arity() {
        let mut scope = Scope::new();
        run(&mut scope, "def f(a, b): return a");
        assert!(matches!(
            eval_in(&mut scope, "f(1)"),
            Err(ScriptError::Arity { got: 1, .. })
        ));
    }

    #[test]
    fn test_eval_not_callable() {
        let err = eval("(1)(2)").unwrap_err();
        assert!(err.to_string().contains("not callable"));
    }

    #[test]
    fn test_eval_import_skipped() {
        let mut scope = Scope::new();
        run(&mut scope, "import numpy as np\nx = 1");
        assert_eq!(scope.get("x"), Some(&ScriptValue::Int(1)));
    }
}
