//! Arithmetic built-in tool.
//!
//! Applies one of four binary operations to two operands. An operand may be a
//! number, a numeric string, or another `{operation, a, b}` object, so a
//! single call can evaluate a small expression tree.

use crate::messages::ToolDefinition;
use crate::tools::{parse_args, ToolConfig, ToolError, ToolExecutionFuture, ToolExecutor};
use serde::Deserialize;
use serde_json::{json, Value};

const TOOL_NAME: &str = "calculator";

/// Nesting limit for operand expressions.
const MAX_DEPTH: usize = 32;

/// Calculator tool executor.
#[derive(Debug, Default, Clone)]
pub struct CalculatorTool;

/// One arithmetic node.
#[derive(Debug, Deserialize)]
struct Expression {
    operation: String,
    a: Operand,
    b: Operand,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Operand {
    Number(f64),
    Text(String),
    Nested(Box<Expression>),
}

/// Supported binary operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operation {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl Operation {
    fn parse(name: &str) -> Result<Self, ToolError> {
        match name.trim().to_ascii_lowercase().as_str() {
            "add" => Ok(Self::Add),
            "subtract" => Ok(Self::Subtract),
            "multiply" => Ok(Self::Multiply),
            "divide" => Ok(Self::Divide),
            _ => Err(ToolError::unsupported_operation(
                TOOL_NAME,
                format!("Unknown operation: {name}"),
            )),
        }
    }

    fn apply(self, a: f64, b: f64) -> Result<f64, ToolError> {
        let value = match self {
            Self::Add => a + b,
            Self::Subtract => a - b,
            Self::Multiply => a * b,
            Self::Divide => {
                if b == 0.0 {
                    return Err(ToolError::execution_failed(TOOL_NAME, "Division by zero"));
                }
                a / b
            }
        };

        if value.is_finite() {
            Ok(value)
        } else {
            Err(ToolError::execution_failed(
                TOOL_NAME,
                "Result is not a finite number",
            ))
        }
    }
}

impl Expression {
    fn evaluate(&self, depth: usize) -> Result<f64, ToolError> {
        if depth > MAX_DEPTH {
            return Err(ToolError::invalid_input(
                TOOL_NAME,
                format!("Expression nested deeper than {MAX_DEPTH} levels"),
            ));
        }

        let operation = Operation::parse(&self.operation)?;
        let a = self.a.resolve(depth)?;
        let b = self.b.resolve(depth)?;
        operation.apply(a, b)
    }
}

impl Operand {
    fn resolve(&self, depth: usize) -> Result<f64, ToolError> {
        let value = match self {
            Self::Number(n) => *n,
            Self::Text(text) => text.trim().parse::<f64>().map_err(|_| {
                ToolError::invalid_input(TOOL_NAME, format!("Invalid operand: {text}"))
            })?,
            Self::Nested(expression) => expression.evaluate(depth + 1)?,
        };

        if value.is_finite() {
            Ok(value)
        } else {
            Err(ToolError::invalid_input(
                TOOL_NAME,
                "Operands must be finite numbers",
            ))
        }
    }
}

impl CalculatorTool {
    /// Creates a new calculator tool.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Returns the tool configuration for registration.
    #[must_use]
    pub fn tool_config() -> ToolConfig {
        ToolConfig::new(ToolDefinition {
            name: TOOL_NAME.to_string(),
            description: "Perform arithmetic. Supports add, subtract, multiply and divide. \
                          Operands may be numbers or nested {operation, a, b} objects."
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "operation": {
                        "type": "string",
                        "enum": ["add", "subtract", "multiply", "divide"],
                        "description": "The operation to apply"
                    },
                    "a": {
                        "description": "First operand: a number or a nested operation object"
                    },
                    "b": {
                        "description": "Second operand: a number or a nested operation object"
                    }
                },
                "required": ["operation", "a", "b"]
            }),
        })
    }
}

impl ToolExecutor for CalculatorTool {
    fn config(&self) -> ToolConfig {
        Self::tool_config()
    }

    fn execute(&self, args: Value) -> ToolExecutionFuture {
        Box::pin(async move {
            let expression: Expression = parse_args(TOOL_NAME, args)?;
            let result = expression.evaluate(0)?;
            Ok(json!({ "result": result }))
        })
    }
}
