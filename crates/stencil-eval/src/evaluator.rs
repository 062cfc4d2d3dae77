//! Core expression evaluator.

use crate::error::{EvalError, EvalResult};
use crate::scope::Scope;
use std::cmp::Ordering;
use stencil_parser::compile_expr;
use stencil_types::ast::*;
use stencil_types::{StencilError, Value};

/// Evaluate expression text against a scope.
///
/// Syntax and runtime failures surface as [`StencilError::Expression`]
/// naming the trimmed expression text.
pub fn evaluate(source: &str, scope: &Scope<'_>) -> Result<Value, StencilError> {
    evaluate_compiled(&compile_expr(source), scope)
}

/// Evaluate expression text and reduce the result to its truthiness.
pub fn evaluate_boolean(source: &str, scope: &Scope<'_>) -> Result<bool, StencilError> {
    evaluate(source, scope).map(|value| value.is_truthy())
}

/// Evaluate an already-parsed expression.
pub fn evaluate_compiled(expr: &CompiledExpr, scope: &Scope<'_>) -> Result<Value, StencilError> {
    let result = match &expr.parsed {
        Ok(parsed) => Evaluator::new(scope).eval_expr(parsed),
        Err(syntax) => Err(EvalError::Syntax(syntax.clone())),
    };
    result.map_err(|cause| StencilError::expression(&expr.source, cause))
}

/// Walks expression nodes and produces Values.
///
/// Evaluation is pure: no bindings are created or changed.
pub struct Evaluator<'s, 'p> {
    scope: &'s Scope<'p>,
}

impl<'s, 'p> Evaluator<'s, 'p> {
    pub fn new(scope: &'s Scope<'p>) -> Self {
        Self { scope }
    }

    // ══════════════════════════════════════════════════════════════════════
    // Expression evaluation
    // ══════════════════════════════════════════════════════════════════════

    /// Evaluate an expression to a Value.
    pub fn eval_expr(&self, expr: &Expr) -> EvalResult<Value> {
        match &expr.kind {
            ExprKind::NumberLit(n) => Ok(Value::Number(*n)),
            ExprKind::StringLit(s) => Ok(Value::String(s.clone())),
            ExprKind::BoolLit(b) => Ok(Value::Bool(*b)),
            ExprKind::NullLit => Ok(Value::Null),
            ExprKind::UndefinedLit => Ok(Value::Undefined),
            ExprKind::ArrayLit(elems) => {
                let mut values = Vec::with_capacity(elems.len());
                for elem in elems {
                    values.push(self.eval_expr(elem)?);
                }
                Ok(Value::Array(values))
            }

            ExprKind::Identifier(name) => Ok(self.scope.get(name).cloned().unwrap_or_default()),

            ExprKind::Member { object, property } => {
                let object = self.eval_expr(object)?;
                Ok(object.property(&property.name))
            }
            ExprKind::Index { object, index } => {
                let object = self.eval_expr(object)?;
                if object.is_nullish() {
                    return Ok(Value::Undefined);
                }
                let key = self.eval_expr(index)?;
                Ok(object.index(&key))
            }
            ExprKind::Call { callee, .. } => Err(EvalError::NotCallable(callee_name(callee))),

            ExprKind::Unary { op, operand } => self.eval_unary(*op, operand),
            ExprKind::Binary { left, op, right } => self.eval_binary(left, *op, right),
            ExprKind::Conditional {
                test,
                consequent,
                alternate,
            } => {
                if self.eval_expr(test)?.is_truthy() {
                    self.eval_expr(consequent)
                } else {
                    self.eval_expr(alternate)
                }
            }
            ExprKind::Paren(inner) => self.eval_expr(inner),
        }
    }

    // ── Operators ─────────────────────────────────────────────────────────

    fn eval_unary(&self, op: UnaryOp, operand: &Expr) -> EvalResult<Value> {
        let value = self.eval_expr(operand)?;
        match op {
            UnaryOp::Not => Ok(Value::Bool(!value.is_truthy())),
            UnaryOp::Neg => Ok(Value::Number(-number_operand(&value, "-")?)),
            UnaryOp::Plus => Ok(Value::Number(number_operand(&value, "+")?)),
        }
    }

    fn eval_binary(&self, left: &Expr, op: BinOp, right: &Expr) -> EvalResult<Value> {
        // Short-circuit operators yield an operand, not a boolean.
        match op {
            BinOp::And => {
                let lv = self.eval_expr(left)?;
                return if lv.is_truthy() {
                    self.eval_expr(right)
                } else {
                    Ok(lv)
                };
            }
            BinOp::Or => {
                let lv = self.eval_expr(left)?;
                return if lv.is_truthy() {
                    Ok(lv)
                } else {
                    self.eval_expr(right)
                };
            }
            BinOp::Coalesce => {
                let lv = self.eval_expr(left)?;
                return if lv.is_nullish() {
                    self.eval_expr(right)
                } else {
                    Ok(lv)
                };
            }
            _ => {}
        }

        let lv = self.eval_expr(left)?;
        let rv = self.eval_expr(right)?;

        match op {
            BinOp::Add => eval_add(&lv, &rv),
            BinOp::Sub => eval_arith(&lv, &rv, op, |a, b| a - b),
            BinOp::Mul => eval_arith(&lv, &rv, op, |a, b| a * b),
            BinOp::Div => eval_arith(&lv, &rv, op, |a, b| a / b),
            BinOp::Mod => eval_arith(&lv, &rv, op, |a, b| a % b),
            BinOp::Eq => Ok(Value::Bool(loose_eq(&lv, &rv))),
            BinOp::NotEq => Ok(Value::Bool(!loose_eq(&lv, &rv))),
            BinOp::StrictEq => Ok(Value::Bool(lv == rv)),
            BinOp::StrictNotEq => Ok(Value::Bool(lv != rv)),
            BinOp::Less => eval_compare(&lv, &rv, op, Ordering::is_lt),
            BinOp::Greater => eval_compare(&lv, &rv, op, Ordering::is_gt),
            BinOp::LessEq => eval_compare(&lv, &rv, op, Ordering::is_le),
            BinOp::GreaterEq => eval_compare(&lv, &rv, op, Ordering::is_ge),
            BinOp::And | BinOp::Or | BinOp::Coalesce => Ok(Value::Undefined),
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════
// Operator helpers
// ══════════════════════════════════════════════════════════════════════════

fn number_operand(value: &Value, op: &str) -> EvalResult<f64> {
    value.to_number().ok_or_else(|| {
        EvalError::TypeMismatch(format!(
            "cannot apply unary '{op}' to {}",
            value.type_name()
        ))
    })
}

/// `+` concatenates when either side is a string, otherwise adds.
fn eval_add(lv: &Value, rv: &Value) -> EvalResult<Value> {
    if matches!(lv, Value::String(_)) || matches!(rv, Value::String(_)) {
        return Ok(Value::String(format!("{lv}{rv}")));
    }
    eval_arith(lv, rv, BinOp::Add, |a, b| a + b)
}

fn eval_arith(lv: &Value, rv: &Value, op: BinOp, f: fn(f64, f64) -> f64) -> EvalResult<Value> {
    match (lv.to_number(), rv.to_number()) {
        (Some(a), Some(b)) => Ok(Value::Number(f(a, b))),
        _ => Err(EvalError::TypeMismatch(format!(
            "cannot apply '{op}' to {} and {}",
            lv.type_name(),
            rv.type_name()
        ))),
    }
}

/// Strict equality, except that `null` and `undefined` are loosely equal.
fn loose_eq(lv: &Value, rv: &Value) -> bool {
    if lv.is_nullish() && rv.is_nullish() {
        return true;
    }
    lv == rv
}

fn eval_compare(
    lv: &Value,
    rv: &Value,
    op: BinOp,
    test: fn(Ordering) -> bool,
) -> EvalResult<Value> {
    let ordering = match (lv, rv) {
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Array(_) | Value::Object(_), _) | (_, Value::Array(_) | Value::Object(_)) => {
            return Err(EvalError::TypeMismatch(format!(
                "cannot compare {} {op} {}",
                lv.type_name(),
                rv.type_name()
            )));
        }
        _ => match (lv.to_number(), rv.to_number()) {
            (Some(a), Some(b)) => a.partial_cmp(&b),
            _ => None,
        },
    };
    // NaN on either side compares false.
    Ok(Value::Bool(ordering.is_some_and(test)))
}

/// A readable name for a call target, used in error messages.
fn callee_name(expr: &Expr) -> String {
    match &expr.kind {
        ExprKind::Identifier(name) => name.clone(),
        ExprKind::Member { object, property } => {
            format!("{}.{}", callee_name(object), property.name)
        }
        ExprKind::Index { object, .. } => format!("{}[...]", callee_name(object)),
        ExprKind::Paren(inner) => callee_name(inner),
        _ => "expression".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn scope() -> Scope<'static> {
        let mut bindings = BTreeMap::new();
        bindings.insert("n".to_string(), Value::from(4.0));
        bindings.insert("s".to_string(), Value::from("ab"));
        Scope::root(bindings)
    }

    #[test]
    fn test_callee_name_paths() {
        let expr = stencil_parser::parse_expression("user.format(x)").unwrap();
        let ExprKind::Call { callee, .. } = &expr.kind else {
            panic!("expected call");
        };
        assert_eq!(callee_name(callee), "user.format");
    }

    #[test]
    fn test_compare_mixed_via_numbers() {
        let scope = scope();
        assert_eq!(evaluate("'10' > n", &scope).unwrap(), Value::Bool(true));
        assert_eq!(evaluate("s < 'b'", &scope).unwrap(), Value::Bool(true));
    }

    #[test]
    fn test_nan_comparisons_are_false() {
        let scope = scope();
        assert_eq!(evaluate("s < 1", &scope).unwrap(), Value::Bool(false));
        assert_eq!(evaluate("s >= 1", &scope).unwrap(), Value::Bool(false));
    }
}
