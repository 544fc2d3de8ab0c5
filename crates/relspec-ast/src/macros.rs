//! Parametric named expressions awaiting inlining.

use std::fmt;
use std::sync::Arc;

use crate::ast::{Expr, Ident};
use crate::error::{Error, Result};
use crate::span::Span;

/// Identifies the module whose bindings a macro body is checked against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleId(pub u32);

/// A macro, possibly partially applied.
///
/// `args` may be shorter than `params`; such a macro is a curried value that
/// cannot be used as an expression. Using it anyway raises the deferred
/// error it carries.
#[derive(Debug, Clone)]
pub struct Macro {
    span: Span,
    is_private: Option<Span>,
    module: ModuleId,
    name: String,
    params: Vec<Ident>,
    args: Vec<Expr>,
    body: Arc<Expr>,
    deferred: Error,
}

impl Macro {
    pub fn new(
        span: Span,
        is_private: Option<Span>,
        module: ModuleId,
        name: impl Into<String>,
        params: Vec<Ident>,
        body: Expr,
    ) -> Self {
        let name = name.into();
        Self {
            deferred: incomplete_call(span, &name),
            span,
            is_private,
            module,
            name,
            params,
            args: Vec::new(),
            body: Arc::new(body),
        }
    }

    /// Supply arguments up front, as when the call site lists them.
    pub fn with_args(&self, args: Vec<Expr>) -> Result<Macro> {
        args.into_iter().try_fold(self.clone(), |mac, arg| mac.add_arg(arg))
    }

    /// A new macro with one more argument supplied.
    pub fn add_arg(&self, arg: Expr) -> Result<Macro> {
        if self.gap() == 0 {
            return Err(Error::type_error(
                arg.span(),
                format!(
                    "too many arguments for the macro \"{}\", which takes {}",
                    self.name,
                    self.params.len()
                ),
            ));
        }
        let mut args = self.args.clone();
        args.push(arg);
        Ok(Macro {
            args,
            ..self.clone()
        })
    }

    pub fn with_span(&self, span: Span) -> Macro {
        Macro {
            span,
            deferred: incomplete_call(span, &self.name),
            ..self.clone()
        }
    }

    /// Number of parameters still unfulfilled.
    pub fn gap(&self) -> usize {
        self.params.len() - self.args.len()
    }

    pub fn is_saturated(&self) -> bool {
        self.gap() == 0
    }

    pub fn span(&self) -> Span {
        self.span
    }

    pub fn is_private(&self) -> Option<Span> {
        self.is_private
    }

    pub fn module(&self) -> ModuleId {
        self.module
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &[Ident] {
        &self.params
    }

    pub fn args(&self) -> &[Expr] {
        &self.args
    }

    pub fn body(&self) -> &Expr {
        &self.body
    }

    /// The error to raise if this macro is used as a value while unsaturated.
    pub fn deferred(&self) -> &Error {
        &self.deferred
    }

    /// Same macro with its arguments replaced; the count must not exceed the parameters.
    pub fn replace_args(&self, args: Vec<Expr>) -> Result<Macro> {
        if args.len() > self.params.len() {
            return Err(Error::fatal(self.span, "more arguments than parameters"));
        }
        Ok(Macro {
            args,
            ..self.clone()
        })
    }
}

fn incomplete_call(span: Span, name: &str) -> Error {
    Error::fatal(span, format!("Incomplete call on the macro \"{}\"", name))
}

impl fmt::Display for Macro {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair_macro() -> Macro {
        Macro::new(
            Span::new(0, 4),
            None,
            ModuleId(0),
            "pair",
            vec![Ident::new("a", Span::UNKNOWN), Ident::new("b", Span::UNKNOWN)],
            Expr::name(Span::UNKNOWN, "a"),
        )
    }

    #[test]
    fn test_gap_tracks_supplied_args() {
        let mac = pair_macro();
        assert_eq!(mac.gap(), 2);
        let once = mac.add_arg(Expr::number(Span::UNKNOWN, 1)).unwrap();
        assert_eq!(once.gap(), 1);
        assert_eq!(mac.gap(), 2);
        let twice = once.add_arg(Expr::number(Span::UNKNOWN, 2)).unwrap();
        assert!(twice.is_saturated());
        assert_eq!(twice.gap(), twice.params().len() - twice.args().len());
    }

    #[test]
    fn test_add_arg_on_saturated_macro_fails() {
        let full = pair_macro()
            .with_args(vec![Expr::number(Span::UNKNOWN, 1), Expr::number(Span::UNKNOWN, 2)])
            .unwrap();
        let err = full.add_arg(Expr::number(Span::UNKNOWN, 3)).unwrap_err();
        assert!(err.is_type());
        assert_eq!(full.gap(), 0);
    }

    #[test]
    fn test_deferred_error_names_macro() {
        let mac = pair_macro();
        assert!(mac.deferred().is_fatal());
        assert!(mac.deferred().message().contains("\"pair\""));
    }
}
