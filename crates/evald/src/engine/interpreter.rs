//! Tree-walking interpreter with lexically scoped bindings.

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use crate::evaluator::OutputSink;

use super::parser::{BinOp, Expr, Stmt};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Value {
    Int(i64),
    Str(String),
}

impl Value {
    const fn type_name(&self) -> &'static str {
        match self {
            Self::Int(_) => "int",
            Self::Str(_) => "string",
        }
    }

    /// Rendering used when an expression statement reports its value.
    pub(crate) fn repr(&self) -> String {
        match self {
            Self::Int(value) => value.to_string(),
            Self::Str(text) => format!("{text:?}"),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(value) => write!(f, "{value}"),
            Self::Str(text) => f.write_str(text),
        }
    }
}

/// Runtime failure raised while a statement runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Thrown {
    pub(crate) kind: &'static str,
    pub(crate) message: String,
}

impl Thrown {
    fn arithmetic(message: &str) -> Self {
        Self {
            kind: "ArithmeticError",
            message: message.to_owned(),
        }
    }

    fn type_error(message: String) -> Self {
        Self {
            kind: "TypeError",
            message,
        }
    }
}

/// Global bindings plus the block scopes of the statement being run.
#[derive(Debug)]
pub(crate) struct Interpreter {
    scopes: Vec<HashMap<String, Value>>,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self {
            scopes: vec![HashMap::new()],
        }
    }
}

impl Interpreter {
    /// Names used by `stmt` that would be unbound when it runs, in order of
    /// first appearance.
    pub(crate) fn unresolved_names(&self, stmt: &Stmt) -> Vec<String> {
        let mut scopes: Vec<BTreeSet<&str>> = vec![
            self.scopes
                .iter()
                .flat_map(HashMap::keys)
                .map(String::as_str)
                .collect(),
        ];
        let mut missing = Vec::new();
        resolve_stmt(stmt, &mut scopes, &mut missing);
        missing
    }

    /// Runs one statement, printing into `output`. Returns the value of a bare
    /// expression statement.
    pub(crate) fn run(
        &mut self,
        stmt: &Stmt,
        output: &mut OutputSink,
    ) -> Result<Option<Value>, Thrown> {
        match stmt {
            Stmt::Let { name, value } => {
                let value = self.eval(value)?;
                if let Some(scope) = self.scopes.last_mut() {
                    scope.insert(name.clone(), value);
                }
                Ok(None)
            }
            Stmt::Print(expr) => {
                let value = self.eval(expr)?;
                output.push_line(&value.to_string());
                Ok(None)
            }
            Stmt::Expr(expr) => self.eval(expr).map(Some),
            Stmt::Block(body) => {
                let depth = self.scopes.len();
                self.scopes.push(HashMap::new());
                let result = body
                    .iter()
                    .try_for_each(|inner| self.run(inner, output).map(drop));
                self.scopes.truncate(depth);
                result.map(|()| None)
            }
        }
    }

    fn lookup(&self, name: &str) -> Option<&Value> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }

    fn eval(&self, expr: &Expr) -> Result<Value, Thrown> {
        match expr {
            Expr::Int(value) => Ok(Value::Int(*value)),
            Expr::Str(text) => Ok(Value::Str(text.clone())),
            Expr::Name(name) => self.lookup(name).cloned().ok_or_else(|| Thrown {
                kind: "NameError",
                message: format!("undefined name '{name}'"),
            }),
            Expr::Neg(inner) => match self.eval(inner)? {
                Value::Int(value) => value
                    .checked_neg()
                    .map(Value::Int)
                    .ok_or_else(|| Thrown::arithmetic("integer overflow")),
                other => Err(Thrown::type_error(format!(
                    "bad operand type for unary -: {}",
                    other.type_name()
                ))),
            },
            Expr::Binary { op, lhs, rhs } => {
                let lhs = self.eval(lhs)?;
                let rhs = self.eval(rhs)?;
                apply(*op, lhs, rhs)
            }
        }
    }
}

fn apply(op: BinOp, lhs: Value, rhs: Value) -> Result<Value, Thrown> {
    match (op, lhs, rhs) {
        (BinOp::Add, Value::Str(mut text), rhs) => {
            text.push_str(&rhs.to_string());
            Ok(Value::Str(text))
        }
        (BinOp::Add, lhs, Value::Str(text)) => Ok(Value::Str(format!("{lhs}{text}"))),
        (op, Value::Int(lhs), Value::Int(rhs)) => {
            let result = match op {
                BinOp::Add => lhs.checked_add(rhs),
                BinOp::Sub => lhs.checked_sub(rhs),
                BinOp::Mul => lhs.checked_mul(rhs),
                BinOp::Div | BinOp::Rem if rhs == 0 => {
                    return Err(Thrown::arithmetic("division by zero"));
                }
                BinOp::Div => lhs.checked_div(rhs),
                BinOp::Rem => lhs.checked_rem(rhs),
            };
            result
                .map(Value::Int)
                .ok_or_else(|| Thrown::arithmetic("integer overflow"))
        }
        (op, lhs, rhs) => Err(Thrown::type_error(format!(
            "unsupported operand types for {}: {} and {}",
            op.symbol(),
            lhs.type_name(),
            rhs.type_name()
        ))),
    }
}

fn resolve_stmt<'a>(stmt: &'a Stmt, scopes: &mut Vec<BTreeSet<&'a str>>, missing: &mut Vec<String>) {
    match stmt {
        Stmt::Let { name, value } => {
            resolve_expr(value, scopes, missing);
            if let Some(scope) = scopes.last_mut() {
                scope.insert(name.as_str());
            }
        }
        Stmt::Print(expr) | Stmt::Expr(expr) => resolve_expr(expr, scopes, missing),
        Stmt::Block(body) => {
            scopes.push(BTreeSet::new());
            for inner in body {
                resolve_stmt(inner, scopes, missing);
            }
            scopes.pop();
        }
    }
}

fn resolve_expr(expr: &Expr, scopes: &[BTreeSet<&str>], missing: &mut Vec<String>) {
    match expr {
        Expr::Int(_) | Expr::Str(_) => {}
        Expr::Name(name) => {
            let bound = scopes.iter().any(|scope| scope.contains(name.as_str()));
            if !bound && !missing.contains(name) {
                missing.push(name.clone());
            }
        }
        Expr::Neg(inner) => resolve_expr(inner, scopes, missing),
        Expr::Binary { lhs, rhs, .. } => {
            resolve_expr(lhs, scopes, missing);
            resolve_expr(rhs, scopes, missing);
        }
    }
}
