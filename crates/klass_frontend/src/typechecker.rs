use std::collections::{BTreeSet, HashMap};

use indexmap::IndexMap;

use crate::ast::*;

/// Built-in class names.
const OBJECT: &str = "Object";
const STRING: &str = "String";

/// Built-in scalar type names.
const INT: &str = "Int";
const BOOLEAN: &str = "Boolean";
const VOID: &str = "Void";

const BUILTIN_TYPES: &[&str] = &[INT, BOOLEAN, VOID, OBJECT, STRING];

/// Semantic errors. The first one found aborts the check.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TypeError {
    #[error("RedeclarationError: {0}")]
    Redeclaration(String),

    #[error("UndeclaredError: {0}")]
    Undeclared(String),

    #[error("IncompatibleAssignmentError: {0}")]
    IncompatibleAssignment(String),

    #[error("ReturnTypeError: {0}")]
    ReturnType(String),

    #[error("NotAFunctionError: {0}")]
    NotAFunction(String),

    /// Any other type error (bad operands, arity, hierarchy, unknown types).
    #[error("TypeError: {0}")]
    Invalid(String),
}

impl TypeError {
    pub fn message(&self) -> &str {
        match self {
            TypeError::Redeclaration(m)
            | TypeError::Undeclared(m)
            | TypeError::IncompatibleAssignment(m)
            | TypeError::ReturnType(m)
            | TypeError::NotAFunction(m)
            | TypeError::Invalid(m) => m,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct Param {
    name: String,
    ty: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct MethodSig {
    params: Vec<Param>,
    ret: String,
}

#[derive(Clone, Debug)]
struct ClassInfo<'p> {
    parent: Option<String>,
    variables: IndexMap<String, String>,
    ctor_params: Vec<Param>,
    methods: IndexMap<String, MethodSig>,
    // `None` for built-ins
    def: Option<&'p ClassDef>,
}

impl ClassInfo<'_> {
    fn builtin(parent: Option<&str>) -> Self {
        ClassInfo {
            parent: parent.map(str::to_string),
            variables: IndexMap::new(),
            ctor_params: Vec::new(),
            methods: IndexMap::new(),
            def: None,
        }
    }
}

/// Class table with inheritance, built once per program and read by every later pass.
#[derive(Clone, Debug)]
pub struct TypeContext<'p> {
    classes: IndexMap<String, ClassInfo<'p>>,
}

impl<'p> TypeContext<'p> {
    fn new() -> Self {
        let mut ctx = TypeContext {
            classes: IndexMap::new(),
        };
        ctx.install_builtins();
        ctx
    }

    /// Collect every class of `p` and validate the hierarchy.
    pub fn from_program(p: &'p Program) -> Result<Self, TypeError> {
        let mut ctx = TypeContext::new();
        install_user_class_headers(&mut ctx, p)?;
        install_members(&mut ctx, p)?;
        validate_inheritance(&ctx)?;
        Ok(ctx)
    }

    fn install_builtins(&mut self) {
        self.classes
            .insert(OBJECT.to_string(), ClassInfo::builtin(None));
        self.classes
            .insert(STRING.to_string(), ClassInfo::builtin(Some(OBJECT)));
    }

    pub fn has_class(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    fn is_valid_type(&self, ty: &str) -> bool {
        BUILTIN_TYPES.contains(&ty) || self.has_class(ty)
    }

    /// `name` followed by its ancestors, nearest first. Stops on a missing
    /// parent or a revisited class.
    fn chain<'a>(&'a self, name: &'a str) -> Vec<&'a str> {
        let mut out = Vec::new();
        let mut seen = BTreeSet::new();
        let mut cur = Some(name);
        while let Some(c) = cur {
            if !seen.insert(c) {
                break;
            }
            let Some(info) = self.classes.get(c) else { break };
            out.push(c);
            cur = info.parent.as_deref();
        }
        out
    }

    /// Identity or ancestor-chain subtyping. No other conversions exist.
    pub fn is_assignable(&self, source: &str, target: &str) -> bool {
        source == target || self.chain(source).contains(&target)
    }

    fn lookup_method(&self, class: &str, method: &str) -> Option<&MethodSig> {
        self.chain(class)
            .into_iter()
            .find_map(|c| self.classes.get(c)?.methods.get(method))
    }

    fn lookup_variable(&self, class: &str, name: &str) -> Option<&str> {
        self.chain(class)
            .into_iter()
            .find_map(|c| self.classes.get(c)?.variables.get(name))
            .map(String::as_str)
    }
}

/// Public entry point.
pub fn type_check_program(p: &Program) -> Result<(), TypeError> {
    let ctx = TypeContext::from_program(p)?;
    check_overrides(&ctx)?;

    let mut checker = Checker {
        ctx: &ctx,
        globals: HashMap::new(),
    };

    for (name, info) in &ctx.classes {
        if let Some(def) = info.def {
            checker.check_class(name, info, def)?;
        }
    }

    let mut scope = Scope::default();
    for stmt in &p.statements {
        checker.check_stmt(stmt, &mut scope)?;
    }

    Ok(())
}

fn install_user_class_headers(ctx: &mut TypeContext<'_>, p: &Program) -> Result<(), TypeError> {
    for c in &p.classes {
        if ctx.has_class(&c.name) {
            return Err(TypeError::Redeclaration(format!(
                "Class '{}' is already defined",
                c.name
            )));
        }

        let parent = c.parent.clone().unwrap_or_else(|| OBJECT.to_string());
        ctx.classes.insert(
            c.name.clone(),
            ClassInfo {
                parent: Some(parent),
                variables: IndexMap::new(),
                ctor_params: Vec::new(),
                methods: IndexMap::new(),
                def: None,
            },
        );
    }
    Ok(())
}

fn install_members<'p>(ctx: &mut TypeContext<'p>, p: &'p Program) -> Result<(), TypeError> {
    for class in &p.classes {
        let cname = class.name.as_str();

        let mut variables = IndexMap::new();
        for v in &class.variables {
            if !ctx.is_valid_type(&v.var_type) {
                return Err(TypeError::Invalid(format!(
                    "Unknown type '{}' for variable '{}' in class '{cname}'",
                    v.var_type, v.name
                )));
            }
            if variables.insert(v.name.clone(), v.var_type.clone()).is_some() {
                return Err(TypeError::Redeclaration(format!(
                    "Variable '{}' is already defined in class '{cname}'",
                    v.name
                )));
            }
        }

        let ctor_params = match &class.constructor {
            Some(ctor) => process_parameters(ctx, &ctor.parameters)?,
            None => Vec::new(),
        };

        let mut methods = IndexMap::new();
        for m in &class.methods {
            if !ctx.is_valid_type(&m.return_type) {
                return Err(TypeError::Invalid(format!(
                    "Unknown return type '{}' for method '{}' in class '{cname}'",
                    m.return_type, m.name
                )));
            }
            let sig = MethodSig {
                params: process_parameters(ctx, &m.parameters)?,
                ret: m.return_type.clone(),
            };
            if methods.insert(m.name.clone(), sig).is_some() {
                return Err(TypeError::Redeclaration(format!(
                    "Method '{}' is already defined in class '{cname}'",
                    m.name
                )));
            }
        }

        if let Some(info) = ctx.classes.get_mut(cname) {
            info.variables = variables;
            info.ctor_params = ctor_params;
            info.methods = methods;
            info.def = Some(class);
        }
    }
    Ok(())
}

fn process_parameters(ctx: &TypeContext<'_>, params: &[VarDec]) -> Result<Vec<Param>, TypeError> {
    let mut names = BTreeSet::new();
    let mut out = Vec::with_capacity(params.len());
    for param in params {
        if !ctx.is_valid_type(&param.var_type) {
            return Err(TypeError::Invalid(format!(
                "Unknown parameter type '{}' for parameter '{}'",
                param.var_type, param.name
            )));
        }
        if !names.insert(param.name.as_str()) {
            return Err(TypeError::Redeclaration(format!(
                "Parameter '{}' is declared more than once",
                param.name
            )));
        }
        out.push(Param {
            name: param.name.clone(),
            ty: param.var_type.clone(),
        });
    }
    Ok(out)
}

fn validate_inheritance(ctx: &TypeContext<'_>) -> Result<(), TypeError> {
    for (name, info) in &ctx.classes {
        if let Some(parent) = &info.parent {
            if !ctx.has_class(parent) {
                return Err(TypeError::Invalid(format!(
                    "Class '{name}' extends unknown class '{parent}'"
                )));
            }
        }

        // Cycle detection
        let mut seen = BTreeSet::<&str>::new();
        let mut cur = Some(name.as_str());
        while let Some(c) = cur {
            if !seen.insert(c) {
                return Err(TypeError::Invalid(format!(
                    "Circular inheritance detected involving class '{name}'"
                )));
            }
            cur = ctx.classes.get(c).and_then(|i| i.parent.as_deref());
        }
    }
    Ok(())
}

/// A redefined method keeps its ancestor's parameter types and return type.
fn check_overrides(ctx: &TypeContext<'_>) -> Result<(), TypeError> {
    for (cname, info) in &ctx.classes {
        let Some(parent) = info.parent.as_deref() else { continue };
        for (mname, sig) in &info.methods {
            let Some(inherited) = ctx.lookup_method(parent, mname) else { continue };

            let same_params = inherited.params.len() == sig.params.len()
                && inherited
                    .params
                    .iter()
                    .zip(&sig.params)
                    .all(|(a, b)| a.ty == b.ty);
            if !same_params || inherited.ret != sig.ret {
                return Err(TypeError::Invalid(format!(
                    "Method '{mname}' in class '{cname}' overrides an inherited method with a different signature"
                )));
            }
        }
    }
    Ok(())
}

fn has_return(stmts: &[Stmt]) -> bool {
    stmts.iter().any(returns)
}

// An `if` only counts when both branches are present and return.
fn returns(stmt: &Stmt) -> bool {
    match stmt {
        Stmt::Return(_) => true,
        Stmt::Block(inner) => has_return(inner),
        Stmt::If {
            then_branch,
            else_branch: Some(else_branch),
            ..
        } => returns(then_branch) && returns(else_branch),
        _ => false,
    }
}

/// Per-body checking state. Blocks snapshot `locals` on entry and restore it on exit.
#[derive(Clone, Debug, Default)]
struct Scope<'a> {
    class: Option<&'a str>,
    // `None` outside a method body
    return_type: Option<&'a str>,
    in_loop: bool,
    locals: HashMap<String, String>,
}

impl<'a> Scope<'a> {
    fn for_class(class: &'a str) -> Self {
        Scope {
            class: Some(class),
            ..Scope::default()
        }
    }

    fn bind_params(&mut self, params: &[Param]) {
        for p in params {
            self.locals.insert(p.name.clone(), p.ty.clone());
        }
    }
}

struct Checker<'c, 'p> {
    ctx: &'c TypeContext<'p>,
    globals: HashMap<String, String>,
}

impl Checker<'_, '_> {
    fn check_class(&mut self, name: &str, info: &ClassInfo<'_>, def: &ClassDef) -> Result<(), TypeError> {
        if let Some(ctor) = &def.constructor {
            self.check_constructor(name, info, ctor)?;
        } else {
            self.check_implicit_super(name, info)?;
        }

        for method in &def.methods {
            self.check_method(name, method)?;
        }
        Ok(())
    }

    fn parent_ctor_params(&self, info: &ClassInfo<'_>) -> &[Param] {
        info.parent
            .as_deref()
            .and_then(|p| self.ctx.classes.get(p))
            .map(|p| p.ctor_params.as_slice())
            .unwrap_or(&[])
    }

    fn check_implicit_super(&self, name: &str, info: &ClassInfo<'_>) -> Result<(), TypeError> {
        if !self.parent_ctor_params(info).is_empty() {
            return Err(TypeError::Invalid(format!(
                "Constructor in class '{name}' must call super() with appropriate arguments"
            )));
        }
        Ok(())
    }

    fn check_constructor(
        &mut self,
        name: &str,
        info: &ClassInfo<'_>,
        ctor: &Constructor,
    ) -> Result<(), TypeError> {
        let mut scope = Scope::for_class(name);
        scope.bind_params(&info.ctor_params);

        match &ctor.super_call {
            Some(call) => {
                let what = format!("super call in '{name}'");
                self.check_args(&what, &call.arguments, self.parent_ctor_params(info), &scope)?;
            }
            None => self.check_implicit_super(name, info)?,
        }

        for stmt in &ctor.statements {
            self.check_stmt(stmt, &mut scope)?;
        }
        Ok(())
    }

    fn check_method(&mut self, class: &str, method: &MethodDef) -> Result<(), TypeError> {
        let params = self
            .ctx
            .classes
            .get(class)
            .and_then(|c| c.methods.get(&method.name))
            .map(|sig| sig.params.clone())
            .unwrap_or_default();

        let mut scope = Scope::for_class(class);
        scope.return_type = Some(method.return_type.as_str());
        scope.bind_params(&params);

        for stmt in &method.statements {
            self.check_stmt(stmt, &mut scope)?;
        }

        if method.return_type != VOID && !has_return(&method.statements) {
            return Err(TypeError::ReturnType(format!(
                "Method '{}' has return type '{}' but might not return a value",
                method.name, method.return_type
            )));
        }
        Ok(())
    }

    fn check_stmt(&mut self, stmt: &Stmt, scope: &mut Scope<'_>) -> Result<(), TypeError> {
        match stmt {
            Stmt::Block(stmts) => {
                let saved = scope.locals.clone();
                let result = stmts.iter().try_for_each(|s| self.check_stmt(s, scope));
                scope.locals = saved;
                result
            }

            Stmt::Expr(e) => self.type_of_expr(e, scope).map(|_| ()),

            Stmt::VarDec(decl) => self.check_var_dec(decl, scope),

            Stmt::Assign {
                variable,
                expression,
            } => self.check_assign(variable, expression, scope),

            Stmt::While { condition, body } => {
                self.expect_boolean("While", condition, scope)?;
                let was_in_loop = scope.in_loop;
                scope.in_loop = true;
                let result = self.check_stmt(body, scope);
                scope.in_loop = was_in_loop;
                result
            }

            Stmt::Break => {
                if scope.in_loop {
                    Ok(())
                } else {
                    Err(TypeError::Invalid(
                        "Break statement can only be used inside a loop".to_string(),
                    ))
                }
            }

            Stmt::Return(expr) => self.check_return(expr.as_ref(), scope),

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.expect_boolean("If", condition, scope)?;
                self.check_stmt(then_branch, scope)?;
                if let Some(else_branch) = else_branch {
                    self.check_stmt(else_branch, scope)?;
                }
                Ok(())
            }
        }
    }

    fn expect_boolean(&self, what: &str, cond: &Expr, scope: &Scope<'_>) -> Result<(), TypeError> {
        let ty = self.type_of_expr(cond, scope)?;
        if ty != BOOLEAN {
            return Err(TypeError::Invalid(format!(
                "{what} condition must be Boolean, but got '{ty}'"
            )));
        }
        Ok(())
    }

    fn check_var_dec(&mut self, decl: &VarDec, scope: &mut Scope<'_>) -> Result<(), TypeError> {
        if !self.ctx.is_valid_type(&decl.var_type) {
            return Err(TypeError::Invalid(format!("Unknown type '{}'", decl.var_type)));
        }

        let in_class = scope
            .class
            .is_some_and(|c| self.ctx.lookup_variable(c, &decl.name).is_some());
        if scope.locals.contains_key(&decl.name) || in_class || self.globals.contains_key(&decl.name) {
            return Err(TypeError::Redeclaration(format!(
                "Variable '{}' is already defined",
                decl.name
            )));
        }

        let table = if scope.class.is_some() {
            &mut scope.locals
        } else {
            &mut self.globals
        };
        table.insert(decl.name.clone(), decl.var_type.clone());
        Ok(())
    }

    fn check_assign(&self, name: &str, expr: &Expr, scope: &Scope<'_>) -> Result<(), TypeError> {
        let var_type = self.variable_type(name, scope)?;
        let expr_type = self.type_of_expr(expr, scope)?;
        if !self.ctx.is_assignable(&expr_type, &var_type) {
            return Err(TypeError::IncompatibleAssignment(format!(
                "Cannot assign value of type '{expr_type}' to variable '{name}' of type '{var_type}'"
            )));
        }
        Ok(())
    }

    fn check_return(&self, expr: Option<&Expr>, scope: &Scope<'_>) -> Result<(), TypeError> {
        let Some(expected) = scope.return_type else {
            return Err(TypeError::ReturnType(
                "Return statement outside of method".to_string(),
            ));
        };

        match expr {
            None if expected == VOID => Ok(()),
            None => Err(TypeError::ReturnType(format!(
                "Method with return type '{expected}' must return a value"
            ))),
            Some(e) => {
                let ty = self.type_of_expr(e, scope)?;
                if expected == VOID && ty != VOID {
                    return Err(TypeError::ReturnType(format!(
                        "Void methods cannot return a value of type '{ty}'"
                    )));
                }
                if !self.ctx.is_assignable(&ty, expected) {
                    return Err(TypeError::ReturnType(format!(
                        "Cannot return value of type '{ty}' from method with return type '{expected}'"
                    )));
                }
                Ok(())
            }
        }
    }

    /// local, then instance (enclosing class and its ancestors), then global.
    fn variable_type(&self, name: &str, scope: &Scope<'_>) -> Result<String, TypeError> {
        if let Some(ty) = scope.locals.get(name) {
            return Ok(ty.clone());
        }
        if let Some(ty) = scope.class.and_then(|c| self.ctx.lookup_variable(c, name)) {
            return Ok(ty.to_string());
        }
        if let Some(ty) = self.globals.get(name) {
            return Ok(ty.clone());
        }
        Err(TypeError::Undeclared(format!("Variable '{name}' is not defined")))
    }

    fn check_args(
        &self,
        what: &str,
        args: &[Expr],
        params: &[Param],
        scope: &Scope<'_>,
    ) -> Result<(), TypeError> {
        if args.len() != params.len() {
            return Err(TypeError::Invalid(format!(
                "{what} has {} arguments but requires {}",
                args.len(),
                params.len()
            )));
        }
        for (i, (arg, param)) in args.iter().zip(params).enumerate() {
            let arg_ty = self.type_of_expr(arg, scope)?;
            if !self.ctx.is_assignable(&arg_ty, &param.ty) {
                return Err(TypeError::Invalid(format!(
                    "Type mismatch in {what}: argument {} is of type '{arg_ty}', but parameter requires '{}'",
                    i + 1,
                    param.ty
                )));
            }
        }
        Ok(())
    }

    fn type_of_expr(&self, e: &Expr, scope: &Scope<'_>) -> Result<String, TypeError> {
        match e {
            Expr::Literal(lit) => Ok(lit.type_name().to_string()),

            Expr::Variable(name) => self.variable_type(name, scope),

            Expr::This => scope
                .class
                .map(str::to_string)
                .ok_or_else(|| TypeError::Invalid("'this' can only be used inside a class".to_string())),

            Expr::Println(arg) => {
                self.type_of_expr(arg, scope)?;
                Ok(VOID.to_string())
            }

            Expr::Binary { left, op, right } => {
                let l = self.type_of_expr(left, scope)?;
                let r = self.type_of_expr(right, scope)?;
                match op {
                    BinOp::Add if l == STRING || r == STRING => Ok(STRING.to_string()),
                    _ if l == INT && r == INT => Ok(INT.to_string()),
                    _ => Err(TypeError::Invalid(format!(
                        "Cannot use '{op}' operator with types '{l}' and '{r}'"
                    ))),
                }
            }

            Expr::Call {
                object,
                method,
                args,
            } => {
                let recv = self.type_of_expr(object, scope)?;
                if !self.ctx.has_class(&recv) {
                    return Err(TypeError::Invalid(format!(
                        "Cannot call method on type '{recv}'"
                    )));
                }
                let sig = self.ctx.lookup_method(&recv, method).ok_or_else(|| {
                    TypeError::NotAFunction(format!(
                        "Method '{method}' not found in class '{recv}'"
                    ))
                })?;
                self.check_args(&format!("call to '{method}'"), args, &sig.params, scope)?;
                Ok(sig.ret.clone())
            }

            Expr::New { class_name, args } => {
                let info = self.ctx.classes.get(class_name).ok_or_else(|| {
                    TypeError::Invalid(format!("Class '{class_name}' not found"))
                })?;
                let what = format!("constructor call for '{class_name}'");
                self.check_args(&what, args, &info.ctor_params, scope)?;
                Ok(class_name.clone())
            }
        }
    }
}
