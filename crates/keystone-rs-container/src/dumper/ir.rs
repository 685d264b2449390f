//! Intermediate representation of a compiled container.
//!
//! The dumper lowers a [`crate::ContainerBuilder`] into a [`ContainerUnit`];
//! emitters only decide how each node is spelled.

/// One compiled container class.
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerUnit {
    pub class: String,
    pub base_class: String,
    /// Parameter bag exported as the container defaults; empty means the
    /// unit has no constructor.
    pub default_parameters: Vec<(String, Expr)>,
    /// Service accessors followed by alias accessors.
    pub methods: Vec<Method>,
}

impl ContainerUnit {
    pub fn has_parameters(&self) -> bool {
        !self.default_parameters.is_empty()
    }

    pub fn method(&self, name: &str) -> Option<&Method> {
        self.methods.iter().find(|method| method.name == name)
    }
}

/// Accessor returning one service.
#[derive(Debug, Clone, PartialEq)]
pub struct Method {
    pub name: String,
    /// Id the accessor serves.
    pub service: String,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// Include a file before building.
    Require(Expr),
    /// Return the stored instance when it was already built.
    SharedGuard { id: String },
    /// `$var = value`.
    Assign { var: String, value: Expr },
    /// Expression evaluated for its side effects.
    Eval(Expr),
    /// Return a freshly built instance.
    Return(Expr),
    /// Store the instance in the shared slot and return it.
    ReturnShared { id: String, value: Expr },
    /// Single-statement body delegating to another accessor.
    Forward(Expr),
}

/// Class operand of an instantiation.
#[derive(Debug, Clone, PartialEq)]
pub enum ClassRef {
    /// Class name written literally.
    Named(String),
    /// Class name held by a local variable.
    Var(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Str(String),
    List(Vec<Expr>),
    Map(Vec<(String, Expr)>),
    /// String concatenation of literals and lookups.
    Concat(Vec<Expr>),
    /// The container itself.
    Container,
    /// Accessor call for a known service.
    Service(String),
    /// Accessor call for an id no definition or alias provides.
    MissingService(String),
    /// Runtime parameter lookup.
    Parameter(String),
    Var(String),
    New {
        class: ClassRef,
        arguments: Vec<Expr>,
    },
    StaticCall {
        class: Box<Expr>,
        method: String,
        arguments: Vec<Expr>,
    },
    MethodCall {
        target: Box<Expr>,
        method: String,
        arguments: Vec<Expr>,
    },
    FunctionCall {
        name: String,
        arguments: Vec<Expr>,
    },
    /// Reference object kept inside the exported parameter bag.
    ServiceReference(String),
}

impl Expr {
    pub fn var(name: &str) -> Self {
        Self::Var(name.to_string())
    }

    /// Split a string on `%name%` tokens into literals and parameter lookups.
    ///
    /// `%%` is a literal `%`; a `%` without a closing partner, or enclosing
    /// whitespace, stays literal. Empty literal parts are dropped.
    pub fn interpolated(value: &str) -> Self {
        let mut parts = Vec::new();
        let mut literal = String::new();
        let mut rest = value;
        while let Some(start) = rest.find('%') {
            literal.push_str(&rest[..start]);
            let after = &rest[start + 1..];
            if let Some(tail) = after.strip_prefix('%') {
                literal.push('%');
                rest = tail;
                continue;
            }
            match after.find('%') {
                Some(end) if !after[..end].contains(char::is_whitespace) => {
                    if !literal.is_empty() {
                        parts.push(Self::Str(std::mem::take(&mut literal)));
                    }
                    parts.push(Self::Parameter(after[..end].to_lowercase()));
                    rest = &after[end + 1..];
                }
                _ => {
                    literal.push('%');
                    rest = after;
                }
            }
        }
        literal.push_str(rest);
        if !literal.is_empty() {
            parts.push(Self::Str(literal));
        }

        match parts.len() {
            0 => Self::Str(String::new()),
            1 => parts.remove(0),
            _ => Self::Concat(parts),
        }
    }
}
