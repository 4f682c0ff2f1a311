//! Type representation for parametric instantiation.
//!
//! Defines the closed `Ty` enum (bits, arrays, tuples/structs, enums and
//! functions), the `Dim` used for every size in the algebra, and the nominal
//! references that give structs and enums their identity.

use std::fmt;

use crate::expr::ParametricExpr;

/// Identity of a struct or enum definition.
///
/// Two nominal types are the same type iff their `DefId`s are equal; names
/// are only carried for display.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct DefId(pub u32);

/// A reference to a declared struct.
///
/// `name` and `fields` are used ONLY for display. They are excluded from
/// `PartialEq` and `Hash` so that identity follows the definition.
#[derive(Clone, Debug)]
pub struct StructRef {
    pub def: DefId,
    pub name: String,
    pub fields: Vec<String>,
}

impl PartialEq for StructRef {
    fn eq(&self, other: &Self) -> bool {
        self.def == other.def
    }
}

impl Eq for StructRef {}

impl std::hash::Hash for StructRef {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.def.hash(state);
    }
}

/// A reference to a declared enum. Identity follows `def`, as for structs.
#[derive(Clone, Debug)]
pub struct EnumRef {
    pub def: DefId,
    pub name: String,
}

impl PartialEq for EnumRef {
    fn eq(&self, other: &Self) -> bool {
        self.def == other.def
    }
}

impl Eq for EnumRef {}

impl std::hash::Hash for EnumRef {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.def.hash(state);
    }
}

/// A size in the type algebra: either known, or an expression over
/// parametric names that becomes known once those names are bound.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Dim {
    Concrete(u64),
    Parametric(ParametricExpr),
}

impl Dim {
    /// A dimension naming a single parametric, e.g. the `N` in `uN[N]`.
    pub fn symbol(name: impl Into<String>) -> Dim {
        Dim::Parametric(ParametricExpr::Symbol(name.into()))
    }

    pub fn as_concrete(&self) -> Option<u64> {
        match self {
            Dim::Concrete(n) => Some(*n),
            Dim::Parametric(_) => None,
        }
    }

    /// The parametric name if this dimension is exactly one symbol.
    ///
    /// Only such dimensions are bindable; compound expressions like `N + 1`
    /// are resolved, never bound.
    pub fn as_symbol(&self) -> Option<&str> {
        match self {
            Dim::Parametric(expr) => expr.as_symbol(),
            Dim::Concrete(_) => None,
        }
    }
}

impl From<u64> for Dim {
    fn from(n: u64) -> Dim {
        Dim::Concrete(n)
    }
}

impl fmt::Display for Dim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dim::Concrete(n) => write!(f, "{}", n),
            Dim::Parametric(expr) => write!(f, "{}", expr),
        }
    }
}

/// The signature of a function value: parameter types and a return type.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FunctionType {
    pub params: Vec<Ty>,
    pub ret: Box<Ty>,
}

impl FunctionType {
    pub fn new(params: Vec<Ty>, ret: Ty) -> Self {
        FunctionType {
            params,
            ret: Box::new(ret),
        }
    }
}

/// A DSLX type as seen by the instantiator.
///
/// - `Bits`: a signed or unsigned bit vector, e.g. `uN[8]`, `sN[N]`
/// - `Array`: `element[size]`
/// - `Tuple`: anonymous when `nominal` is `None`; a declared struct otherwise
/// - `Enum`: a declared enum over an underlying bits type
/// - `Function`: only reachable through function-typed parameters
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Ty {
    Bits {
        signed: bool,
        size: Dim,
    },
    Array {
        element: Box<Ty>,
        size: Dim,
    },
    Tuple {
        members: Vec<Ty>,
        nominal: Option<StructRef>,
    },
    Enum {
        def: EnumRef,
        signed: bool,
        size: Dim,
    },
    Function(FunctionType),
}

impl Ty {
    /// Create an unsigned bits type of a known width.
    pub fn ubits(width: u64) -> Ty {
        Ty::Bits {
            signed: false,
            size: Dim::Concrete(width),
        }
    }

    /// Create a signed bits type of a known width.
    pub fn sbits(width: u64) -> Ty {
        Ty::Bits {
            signed: true,
            size: Dim::Concrete(width),
        }
    }

    /// Create a bits type whose width is the named parametric.
    pub fn bits_param(signed: bool, name: &str) -> Ty {
        Ty::Bits {
            signed,
            size: Dim::symbol(name),
        }
    }

    pub fn array(element: Ty, size: impl Into<Dim>) -> Ty {
        Ty::Array {
            element: Box::new(element),
            size: size.into(),
        }
    }

    /// Create an anonymous tuple type.
    pub fn tuple(members: Vec<Ty>) -> Ty {
        Ty::Tuple {
            members,
            nominal: None,
        }
    }

    /// Create a struct type: a tuple carrying the struct's identity.
    pub fn struct_ty(def: StructRef, members: Vec<Ty>) -> Ty {
        Ty::Tuple {
            members,
            nominal: Some(def),
        }
    }

    pub fn fun(params: Vec<Ty>, ret: Ty) -> Ty {
        Ty::Function(FunctionType::new(params, ret))
    }

    /// Short name of the structural kind, used in kind-mismatch messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Ty::Bits { .. } => "bits",
            Ty::Array { .. } => "array",
            Ty::Tuple { nominal: None, .. } => "tuple",
            Ty::Tuple { nominal: Some(_), .. } => "struct",
            Ty::Enum { .. } => "enum",
            Ty::Function(_) => "function",
        }
    }

    /// Whether two types have the same structural kind.
    ///
    /// Structs and anonymous tuples share a kind; their identities are
    /// compared separately by the binder.
    pub fn same_kind(&self, other: &Ty) -> bool {
        matches!(
            (self, other),
            (Ty::Bits { .. }, Ty::Bits { .. })
                | (Ty::Array { .. }, Ty::Array { .. })
                | (Ty::Tuple { .. }, Ty::Tuple { .. })
                | (Ty::Enum { .. }, Ty::Enum { .. })
                | (Ty::Function(_), Ty::Function(_))
        )
    }

    /// Whether every dimension reachable from this type is concrete.
    pub fn is_concrete(&self) -> bool {
        let mut concrete = true;
        self.visit_dims(&mut |dim| concrete &= dim.as_concrete().is_some());
        concrete
    }

    fn visit_dims(&self, f: &mut impl FnMut(&Dim)) {
        match self {
            Ty::Bits { size, .. } | Ty::Enum { size, .. } => f(size),
            Ty::Array { element, size } => {
                element.visit_dims(f);
                f(size);
            }
            Ty::Tuple { members, .. } => {
                for m in members {
                    m.visit_dims(f);
                }
            }
            Ty::Function(fun) => {
                for p in &fun.params {
                    p.visit_dims(f);
                }
                fun.ret.visit_dims(f);
            }
        }
    }

    /// Rebuild this type with every dimension passed through `f`.
    ///
    /// The input is left untouched; the result is a fresh tree.
    pub fn map_size<E>(&self, f: &mut impl FnMut(&Dim) -> Result<Dim, E>) -> Result<Ty, E> {
        Ok(match self {
            Ty::Bits { signed, size } => Ty::Bits {
                signed: *signed,
                size: f(size)?,
            },
            Ty::Enum { def, signed, size } => Ty::Enum {
                def: def.clone(),
                signed: *signed,
                size: f(size)?,
            },
            Ty::Array { element, size } => {
                let element = Box::new(element.map_size(f)?);
                Ty::Array {
                    element,
                    size: f(size)?,
                }
            }
            Ty::Tuple { members, nominal } => Ty::Tuple {
                members: members
                    .iter()
                    .map(|m| m.map_size(f))
                    .collect::<Result<_, _>>()?,
                nominal: nominal.clone(),
            },
            Ty::Function(fun) => {
                let params = fun
                    .params
                    .iter()
                    .map(|p| p.map_size(f))
                    .collect::<Result<_, _>>()?;
                let ret = fun.ret.map_size(f)?;
                Ty::Function(FunctionType::new(params, ret))
            }
        })
    }
}

impl fmt::Display for Ty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ty::Bits { signed, size } => {
                write!(f, "{}N[{}]", if *signed { "s" } else { "u" }, size)
            }
            Ty::Array { element, size } => write!(f, "{}[{}]", element, size),
            Ty::Tuple {
                members,
                nominal: None,
            } => {
                write!(f, "(")?;
                for (i, m) in members.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", m)?;
                }
                if members.len() == 1 {
                    write!(f, ",")?;
                }
                write!(f, ")")
            }
            Ty::Tuple {
                members,
                nominal: Some(def),
            } => {
                write!(f, "{} {{ ", def.name)?;
                for (i, m) in members.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    match def.fields.get(i) {
                        Some(field) => write!(f, "{}: {}", field, m)?,
                        None => write!(f, "{}", m)?,
                    }
                }
                write!(f, " }}")
            }
            Ty::Enum { def, .. } => write!(f, "{}", def.name),
            Ty::Function(fun) => {
                write!(f, "(")?;
                for (i, p) in fun.params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", p)?;
                }
                write!(f, ") -> {}", fun.ret)
            }
        }
    }
}
