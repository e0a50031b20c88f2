// Copyright 2025 Diivanand Ramalingam
// Licensed under the Apache License, Version 2.0

//! Host-runtime names the generated code relies on.

/// Constructor function every root class chains to.
pub const ROOT_CLASS: &str = "Object";

/// Self-reference inside constructor functions and methods.
pub const SELF_REF: &str = "this";

/// Print primitive that `println` lowers to.
pub const PRINT_FN: &str = "console.log";

/// Keyword for variable declarations.
pub const DECLARE: &str = "let";

/// Prefix for statements inside constructor and method bodies.
pub const INDENT: &str = "\t";
