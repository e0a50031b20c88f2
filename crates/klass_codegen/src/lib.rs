// Copyright 2025 Diivanand Ramalingam
// Licensed under the Apache License, Version 2.0

pub mod host;
pub mod lowering;

use klass_frontend::Program;

#[derive(Debug, thiserror::Error)]
pub enum CodegenError {
    #[error("failed to write generated code: {0}")]
    Fmt(#[from] std::fmt::Error),
}

/// Accumulates target source text for one program.
#[derive(Debug, Default)]
pub struct Codegen {
    out: String,
}

impl Codegen {
    pub fn new() -> Self {
        Self::default()
    }

    /// One block per class, then one line per top-level statement, each
    /// newline-terminated.
    pub fn compile_program(&mut self, p: &Program) -> Result<(), CodegenError> {
        for class in &p.classes {
            lowering::lower_class(&mut self.out, class)?;
            self.out.push('\n');
        }
        for stmt in &p.statements {
            lowering::lower_stmt(&mut self.out, stmt)?;
            self.out.push('\n');
        }
        Ok(())
    }

    pub fn output(&self) -> &str {
        &self.out
    }

    pub fn finish(self) -> String {
        self.out
    }
}

/// Generate target source for a checked program.
pub fn generate(p: &Program) -> Result<String, CodegenError> {
    let mut cg = Codegen::new();
    cg.compile_program(p)?;
    Ok(cg.finish())
}
