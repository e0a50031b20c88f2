// Copyright 2025 Diivanand Ramalingam
// Licensed under the Apache License, Version 2.0

pub mod ast;
pub mod lexer;
pub mod parser;
pub mod typechecker;

pub use ast::*;
pub use lexer::{tokenize, Token, TokenKind};
pub use parser::{parse, parse_program};
pub use typechecker::{type_check_program, TypeContext, TypeError};

// Re-export the lifetime error alias
pub use parser::ParseError;
