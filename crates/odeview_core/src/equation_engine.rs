use crate::error::BindError;
use crate::traits::{lit, Scalar};
use std::collections::HashMap;
use std::fmt;

mod equation;
mod parser;

pub use equation::{parse_equation, Equation};
pub use parser::{parse, MAX_DEPTH};

/// Names that are never treated as parameters.
pub const FUNCTIONS: &[&str] = &["sin", "cos", "tan", "exp", "log", "ln", "sqrt", "abs"];
pub const CONSTANTS: &[&str] = &["pi"];

pub fn is_reserved(name: &str) -> bool {
    FUNCTIONS.contains(&name) || CONSTANTS.contains(&name)
}

/// OpCodes for the Stack-based Virtual Machine.
/// The VM operates on a stack of `Scalar` values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OpCode {
    /// Pushes a constant `f64` value onto the stack.
    LoadConst(f64),
    /// Pushes the value of a variable (by index) onto the stack.
    /// For a scalar ODE the variables are `[t, y]`.
    LoadVar(usize),
    /// Pushes the value of a parameter (by index) onto the stack.
    LoadParam(usize),
    /// Pops top two values (b, a), pushes (a + b).
    Add,
    /// Pops top two values (b, a), pushes (a - b).
    Sub,
    /// Pops top two values (b, a), pushes (a * b).
    Mul,
    /// Pops top two values (b, a), pushes (a / b).
    Div,
    /// Pops top two values (b, a), pushes (a ^ b).
    Pow,
    /// Pops top value (a), pushes -a.
    Neg,
    Sin,
    Cos,
    Tan,
    Exp,
    /// Natural logarithm.
    Ln,
    Sqrt,
    Abs,
}

/// Represents a compiled sequence of operations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bytecode {
    pub ops: Vec<OpCode>,
}

impl Bytecode {
    pub fn new() -> Self {
        Self { ops: Vec::new() }
    }
}

/// Stack-based Virtual Machine for evaluating equations.
///
/// The VM is stateless; `execute` takes all necessary context:
/// - `bytecode`: Instructions to run.
/// - `vars`: Current variable values (read-only).
/// - `params`: Parameter vector (read-only).
/// - `stack`: A mutable buffer for intermediate computations.
///
/// Returns the value left on the stack. Malformed bytecode evaluates to NaN.
pub struct VM;

impl VM {
    pub fn execute<T: Scalar>(
        bytecode: &Bytecode,
        vars: &[T],
        params: &[T],
        stack: &mut Vec<T>,
    ) -> T {
        fn pop<T: Scalar>(stack: &mut Vec<T>) -> T {
            stack.pop().unwrap_or_else(T::nan)
        }

        stack.clear();

        for op in &bytecode.ops {
            let value = match *op {
                OpCode::LoadConst(val) => lit(val),
                OpCode::LoadVar(idx) => vars.get(idx).copied().unwrap_or_else(T::nan),
                OpCode::LoadParam(idx) => params.get(idx).copied().unwrap_or_else(T::nan),
                OpCode::Add | OpCode::Sub | OpCode::Mul | OpCode::Div | OpCode::Pow => {
                    let b = pop(stack);
                    let a = pop(stack);
                    match op {
                        OpCode::Add => a + b,
                        OpCode::Sub => a - b,
                        OpCode::Mul => a * b,
                        OpCode::Div => a / b,
                        _ => a.powf(b),
                    }
                }
                OpCode::Neg => -pop(stack),
                OpCode::Sin => pop(stack).sin(),
                OpCode::Cos => pop(stack).cos(),
                OpCode::Tan => pop(stack).tan(),
                OpCode::Exp => pop(stack).exp(),
                OpCode::Ln => pop(stack).ln(),
                OpCode::Sqrt => pop(stack).sqrt(),
                OpCode::Abs => pop(stack).abs(),
            };
            stack.push(value);
        }

        pop(stack)
    }
}

// --- AST ---

/// Abstract Syntax Tree nodes for expressions.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Variable(String),
    Binary(Box<Expr>, char, Box<Expr>), // char is operator +, -, *, /, ^
    Unary(char, Box<Expr>),             // only '-'
    Call(String, Box<Expr>),            // functions like sin(x)
}

impl Expr {
    /// Visits every variable name in evaluation order.
    pub fn for_each_variable<'a>(&'a self, visit: &mut impl FnMut(&'a str)) {
        match self {
            Expr::Number(_) => {}
            Expr::Variable(name) => visit(name),
            Expr::Binary(left, _, right) => {
                left.for_each_variable(visit);
                right.for_each_variable(visit);
            }
            Expr::Unary(_, operand) | Expr::Call(_, operand) => operand.for_each_variable(visit),
        }
    }

    fn precedence(&self) -> u8 {
        match self {
            Expr::Binary(_, '+' | '-', _) => 1,
            Expr::Binary(_, '*' | '/', _) => 2,
            Expr::Unary(..) => 3,
            Expr::Binary(_, _, _) => 4,
            Expr::Number(_) | Expr::Variable(_) | Expr::Call(..) => 5,
        }
    }

    fn fmt_child(&self, f: &mut fmt::Formatter<'_>, min_precedence: u8) -> fmt::Result {
        if self.precedence() < min_precedence {
            write!(f, "({self})")
        } else {
            write!(f, "{self}")
        }
    }
}

/// Prints the expression with the minimal parentheses needed to re-parse into the same tree.
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Number(n) => write!(f, "{n}"),
            Expr::Variable(name) => write!(f, "{name}"),
            Expr::Call(func, arg) => write!(f, "{func}({arg})"),
            Expr::Unary(op, operand) => {
                write!(f, "{op}")?;
                operand.fmt_child(f, 3)
            }
            Expr::Binary(left, '^', right) => {
                left.fmt_child(f, 5)?;
                write!(f, "^")?;
                right.fmt_child(f, 3)
            }
            Expr::Binary(left, op, right) => {
                let precedence = self.precedence();
                left.fmt_child(f, precedence)?;
                write!(f, " {op} ")?;
                right.fmt_child(f, precedence + 1)
            }
        }
    }
}

/// Compiles an AST (`Expr`) into `Bytecode`.
/// Resolves variable and parameter names to indices.
pub struct Compiler {
    pub var_map: HashMap<String, usize>,
    pub param_map: HashMap<String, usize>,
}

impl Compiler {
    pub fn new(var_names: &[String], param_names: &[String]) -> Self {
        let var_map = var_names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i))
            .collect();
        let param_map = param_names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i))
            .collect();

        Self { var_map, param_map }
    }

    /// Fails with every name that resolves to neither a variable, a parameter nor a constant.
    pub fn compile(&self, expr: &Expr) -> Result<Bytecode, BindError> {
        let mut ops = Vec::new();
        let mut unknown = Vec::new();
        self.compile_recursive(expr, &mut ops, &mut unknown);
        if unknown.is_empty() {
            Ok(Bytecode { ops })
        } else {
            unknown.sort();
            unknown.dedup();
            Err(BindError::UnboundParameter { names: unknown })
        }
    }

    fn compile_recursive(&self, expr: &Expr, ops: &mut Vec<OpCode>, unknown: &mut Vec<String>) {
        match expr {
            Expr::Number(n) => ops.push(OpCode::LoadConst(*n)),
            Expr::Variable(name) => {
                if let Some(&idx) = self.var_map.get(name) {
                    ops.push(OpCode::LoadVar(idx));
                } else if let Some(&idx) = self.param_map.get(name) {
                    ops.push(OpCode::LoadParam(idx));
                } else if name == "pi" {
                    ops.push(OpCode::LoadConst(std::f64::consts::PI));
                } else {
                    unknown.push(name.clone());
                }
            }
            Expr::Binary(left, op, right) => {
                self.compile_recursive(left, ops, unknown);
                self.compile_recursive(right, ops, unknown);
                ops.push(match op {
                    '+' => OpCode::Add,
                    '-' => OpCode::Sub,
                    '*' => OpCode::Mul,
                    '/' => OpCode::Div,
                    _ => OpCode::Pow,
                });
            }
            Expr::Unary(_, operand) => {
                self.compile_recursive(operand, ops, unknown);
                ops.push(OpCode::Neg);
            }
            Expr::Call(func, arg) => {
                self.compile_recursive(arg, ops, unknown);
                match func.as_str() {
                    "sin" => ops.push(OpCode::Sin),
                    "cos" => ops.push(OpCode::Cos),
                    "tan" => ops.push(OpCode::Tan),
                    "exp" => ops.push(OpCode::Exp),
                    "log" | "ln" => ops.push(OpCode::Ln),
                    "sqrt" => ops.push(OpCode::Sqrt),
                    "abs" => ops.push(OpCode::Abs),
                    _ => unknown.push(func.clone()),
                }
            }
        }
    }
}
