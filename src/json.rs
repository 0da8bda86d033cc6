//! JSON interchange form of the AST.
//!
//! Lets front ends written in other languages hand a program to the compiler
//! without going through the surface syntax. Enums use serde's externally
//! tagged layout with snake_case variant names:
//!
//! ```json
//! {"stmts": [
//!   {"kind": {"define": {"target": {"name": "a"}, "value": {"number": 1.0}}}},
//!   {"kind": {"expr": {"call2": {"function": {"primitive": "+"},
//!                                "x": {"name": "a"}, "y": {"number": 2.0}}}}}
//! ]}
//! ```
//!
//! Statement spans are optional on input.

use crate::Error;
use crate::ast::Block;

/// Parse a JSON document into a program block
pub fn parse_ast(input: &str) -> Result<Block, Error> {
    let json: serde_json::Value =
        serde_json::from_str(input).map_err(|e| Error::parse(format!("invalid JSON: {e}")))?;
    if !json.is_object() {
        return Err(Error::parse("a program must be a JSON object with a \"stmts\" list"));
    }
    serde_json::from_value(json).map_err(|e| Error::parse(format!("invalid program: {e}")))
}

/// Serialize a program block to pretty-printed JSON
pub fn to_json(block: &Block) -> Result<String, Error> {
    serde_json::to_string_pretty(block).map_err(|e| Error::parse(format!("cannot serialize: {e}")))
}
