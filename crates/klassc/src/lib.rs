// Copyright 2025 Diivanand Ramalingam
// Licensed under the Apache License, Version 2.0

use klass_codegen::{generate, CodegenError};
use klass_frontend::{parse_program, parser, tokenize, type_check_program, TypeError};

/// Failure of any pipeline stage.
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error("parse errors:\n{}", .0.join("\n"))]
    Parse(Vec<String>),

    #[error(transparent)]
    Type(#[from] TypeError),

    #[error(transparent)]
    Codegen(#[from] CodegenError),
}

/// Run text -> tokens -> AST -> verdict -> text for one translation unit.
pub fn compile(source: &str) -> Result<String, CompileError> {
    let toks = tokenize(source);
    log::debug!("lexed {} tokens", toks.len());

    let prog = parse_program(&toks)
        .map_err(|errs| CompileError::Parse(errs.iter().map(parser::describe).collect()))?;
    log::debug!(
        "parsed {} classes and {} statements",
        prog.classes.len(),
        prog.statements.len()
    );

    type_check_program(&prog)?;
    log::debug!("type check passed");

    let out = generate(&prog)?;
    log::debug!("generated {} bytes", out.len());
    Ok(out)
}
