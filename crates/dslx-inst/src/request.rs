//! Instantiation request files.
//!
//! A request is a TOML document describing one parametric function call or
//! struct literal: the signature, the argument types, the declared
//! parametrics, and any declarations it depends on (structs, enums and the
//! constant functions its constraints call).

use std::collections::BTreeMap;
use std::path::Path;

use dslx_common::{Span, SyntaxError};
use dslx_typeck::env::DEFAULT_PARAMETRIC_WIDTH;
use dslx_typeck::syntax::{parse_expr, parse_type, NominalScope};
use dslx_typeck::{
    instantiate_function, instantiate_struct, ConstFn, EvalOptions, FnCtx, FunctionType,
    InstantiateCtx, InstantiationError, Interpreter, ParametricBinding, SymbolicBindings, Ty,
    TypeAndBindings,
};
use serde::Deserialize;

/// A parsed request file.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Request {
    #[serde(default)]
    pub options: Options,
    #[serde(default)]
    pub structs: Vec<StructDecl>,
    #[serde(default)]
    pub enums: Vec<EnumDecl>,
    #[serde(default)]
    pub functions: Vec<FunctionDecl>,
    pub instantiate: Instantiate,
}

/// Evaluator settings from the `[options]` table.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Options {
    #[serde(default)]
    pub max_eval_depth: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StructDecl {
    pub name: String,
    pub fields: Vec<String>,
}

/// An enum over a concrete bits type, e.g. `type = "uN[2]"`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnumDecl {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
}

/// A constant function callable from constraint expressions.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FunctionDecl {
    pub name: String,
    #[serde(default)]
    pub parametrics: Vec<ParametricDecl>,
    #[serde(default)]
    pub params: Vec<ParamDecl>,
    #[serde(rename = "return")]
    pub ret: String,
    pub body: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParamDecl {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
}

/// `{ name = "N", width = 32, expr = "M + u32:1" }`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParametricDecl {
    pub name: String,
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default)]
    pub expr: Option<String>,
}

fn default_width() -> u32 {
    DEFAULT_PARAMETRIC_WIDTH
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    Function,
    Struct,
}

/// The `[instantiate]` table.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Instantiate {
    pub kind: Kind,
    #[serde(default)]
    pub name: Option<String>,
    /// Byte range of the invocation within `source`.
    #[serde(default)]
    pub span: Option<[u32; 2]>,
    #[serde(default)]
    pub source: Option<String>,
    /// Formal parameter types, or member types for a struct.
    #[serde(default)]
    pub params: Vec<String>,
    pub args: Vec<String>,
    #[serde(rename = "return", default)]
    pub ret: Option<String>,
    #[serde(rename = "struct", default)]
    pub struct_name: Option<String>,
    #[serde(default)]
    pub parametrics: Vec<ParametricDecl>,
    #[serde(default)]
    pub explicit: BTreeMap<String, i64>,
}

impl Request {
    /// Read and parse a request from a file path.
    pub fn from_file(path: &Path) -> Result<Request, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
        Self::from_str(&content)
    }

    /// Parse a request from a string.
    pub fn from_str(content: &str) -> Result<Request, String> {
        toml::from_str(content).map_err(|e| format!("Failed to parse request: {}", e))
    }

    /// Resolve every textual type and expression into a runnable [`Job`].
    pub fn lower(&self) -> Result<Job, String> {
        let mut scope = NominalScope::new();
        for decl in &self.structs {
            scope.add_struct(decl.name.clone(), decl.fields.clone());
        }
        for decl in &self.enums {
            let context = format!("enum `{}`", decl.name);
            match lower_type(&decl.ty, &scope, &context)? {
                Ty::Bits { signed, size } => match size.as_concrete() {
                    Some(size) => {
                        scope.add_enum(decl.name.clone(), signed, size);
                    }
                    None => return Err(format!("{}: underlying type must have a concrete width", context)),
                },
                other => {
                    return Err(format!("{}: underlying type must be bits, not {}", context, other))
                }
            }
        }

        let mut interpreter = match self.options.max_eval_depth {
            Some(max_depth) => Interpreter::with_options(EvalOptions { max_depth }),
            None => Interpreter::new(),
        };
        for decl in &self.functions {
            interpreter.register(lower_function(decl, &scope)?);
        }

        let inst = &self.instantiate;
        let params = lower_types(&inst.params, &scope, "instantiate.params")?;
        let args = lower_types(&inst.args, &scope, "instantiate.args")?;
        let parametrics = lower_parametrics(&inst.parametrics, "instantiate.parametrics")?;

        let (target, default_name) = match inst.kind {
            Kind::Function => {
                let ret = inst
                    .ret
                    .as_deref()
                    .ok_or("instantiate: `return` is required for kind = \"function\"")?;
                let ret = lower_type(ret, &scope, "instantiate.return")?;
                (Target::Function(FunctionType::new(params, ret)), "f".to_string())
            }
            Kind::Struct => {
                let name = inst
                    .struct_name
                    .as_deref()
                    .ok_or("instantiate: `struct` is required for kind = \"struct\"")?;
                let def = scope
                    .struct_ref(name)
                    .ok_or_else(|| format!("instantiate: unknown struct `{}`", name))?;
                if params.len() != def.fields.len() || args.len() != params.len() {
                    return Err(format!(
                        "instantiate: struct `{}` has {} field(s) but {} member type(s) and {} argument(s) were given",
                        name,
                        def.fields.len(),
                        params.len(),
                        args.len()
                    ));
                }
                let ty = Ty::struct_ty(def.clone(), params.clone());
                (
                    Target::Struct {
                        ty,
                        members: params,
                    },
                    name.to_string(),
                )
            }
        };

        let name = inst.name.clone().unwrap_or(default_name);
        let explicit = (!inst.explicit.is_empty()).then(|| {
            inst.explicit
                .iter()
                .map(|(k, v)| (k.clone(), *v))
                .collect::<SymbolicBindings>()
        });

        // Without source text, render the invocation itself.
        let (source, span) = match &inst.source {
            Some(source) => {
                let span = match inst.span {
                    Some([s, e]) if s > e => {
                        return Err("instantiate: span start must be <= end".to_string())
                    }
                    Some([s, e]) => Span::new(s, e),
                    None => Span::new(0, text_len(source)?),
                };
                (source.clone(), span)
            }
            None => {
                let text = invocation_text(&name, &target, &args);
                let span = Span::new(0, text_len(&text)?);
                (text, span)
            }
        };

        Ok(Job {
            name,
            interpreter,
            target,
            args,
            parametrics,
            explicit,
            source,
            span,
        })
    }
}

/// What is being instantiated.
#[derive(Debug)]
pub enum Target {
    Function(FunctionType),
    Struct { ty: Ty, members: Vec<Ty> },
}

/// A fully lowered request.
#[derive(Debug)]
pub struct Job {
    pub name: String,
    pub interpreter: Interpreter,
    pub target: Target,
    pub args: Vec<Ty>,
    pub parametrics: Vec<ParametricBinding>,
    pub explicit: Option<SymbolicBindings>,
    /// Text the invocation span points into.
    pub source: String,
    pub span: Span,
}

impl Job {
    pub fn run(&self) -> Result<TypeAndBindings, InstantiationError> {
        let ctx = InstantiateCtx::new(&self.interpreter, FnCtx::new("request", self.name.clone()));
        match &self.target {
            Target::Function(signature) => instantiate_function(
                self.span,
                signature,
                &self.args,
                &ctx,
                Some(&self.parametrics),
                self.explicit.as_ref(),
            ),
            Target::Struct { ty, members } => instantiate_struct(
                self.span,
                ty,
                &self.args,
                members,
                &ctx,
                Some(&self.parametrics),
            ),
        }
    }
}

fn invocation_text(name: &str, target: &Target, args: &[Ty]) -> String {
    let args: Vec<String> = args.iter().map(ToString::to_string).collect();
    match target {
        Target::Function(_) => format!("{}({})", name, args.join(", ")),
        Target::Struct { ty, .. } => match ty {
            Ty::Tuple {
                nominal: Some(def), ..
            } => {
                let fields: Vec<String> = def
                    .fields
                    .iter()
                    .zip(&args)
                    .map(|(f, a)| format!("{}: {}", f, a))
                    .collect();
                format!("{} {{ {} }}", name, fields.join(", "))
            }
            _ => format!("{} {{ {} }}", name, args.join(", ")),
        },
    }
}

fn text_len(text: &str) -> Result<u32, String> {
    u32::try_from(text.len()).map_err(|_| "instantiate: source text is too long".to_string())
}

fn syntax_error(text: &str, context: &str, err: SyntaxError) -> String {
    format!("{}: `{}` at {}: {}", context, text, err.span, err)
}

fn lower_type(text: &str, scope: &NominalScope, context: &str) -> Result<Ty, String> {
    parse_type(text, scope).map_err(|e| syntax_error(text, context, e))
}

fn lower_types(texts: &[String], scope: &NominalScope, context: &str) -> Result<Vec<Ty>, String> {
    texts
        .iter()
        .enumerate()
        .map(|(i, t)| lower_type(t, scope, &format!("{}[{}]", context, i)))
        .collect()
}

fn lower_parametrics(decls: &[ParametricDecl], context: &str) -> Result<Vec<ParametricBinding>, String> {
    decls
        .iter()
        .map(|d| match &d.expr {
            Some(text) => parse_expr(text)
                .map(|e| ParametricBinding::with_expr(d.name.clone(), d.width, e))
                .map_err(|e| syntax_error(text, &format!("{} `{}`", context, d.name), e)),
            None => Ok(ParametricBinding::new(d.name.clone(), d.width)),
        })
        .collect()
}

fn lower_function(decl: &FunctionDecl, scope: &NominalScope) -> Result<ConstFn, String> {
    let context = format!("function `{}`", decl.name);
    let params = decl
        .params
        .iter()
        .map(|p| lower_type(&p.ty, scope, &context).map(|ty| (p.name.clone(), ty)))
        .collect::<Result<Vec<_>, String>>()?;
    Ok(ConstFn {
        name: decl.name.clone(),
        parametrics: lower_parametrics(&decl.parametrics, &context)?,
        params,
        ret: lower_type(&decl.ret, scope, &context)?,
        body: parse_expr(&decl.body).map_err(|e| syntax_error(&decl.body, &context, e))?,
    })
}
