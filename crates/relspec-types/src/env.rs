//! Name-resolution environment and checking context.

use std::sync::Arc;

use relspec_ast::{Error, Expr, Ident, Macro, ModuleId, Result, Span, Type};
use rustc_hash::FxHashMap;

/// The bindings handed to the checker by the module resolver.
///
/// Each module maps names to one or more already-typed leaves or macros.
/// Binding a name twice in one module overloads it.
#[derive(Debug, Clone, Default)]
pub struct Env {
    modules: Vec<Module>,
}

/// The top-level bindings of one module.
#[derive(Debug, Clone)]
pub struct Module {
    pub name: String,
    bindings: FxHashMap<String, Vec<Expr>>,
}

impl Module {
    pub fn get(&self, name: &str) -> &[Expr] {
        self.bindings.get(name).map(Vec::as_slice).unwrap_or(&[])
    }
}

impl Env {
    /// Create a new empty environment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a module and return its id.
    pub fn add_module(&mut self, name: &str) -> ModuleId {
        self.modules.push(Module {
            name: name.to_string(),
            bindings: FxHashMap::default(),
        });
        ModuleId((self.modules.len() - 1) as u32)
    }

    /// Look up a module by id.
    pub fn module(&self, id: ModuleId) -> Option<&Module> {
        self.modules.get(id.0 as usize)
    }

    /// Bind `name` to a typed leaf or a macro value.
    pub fn define(&mut self, module: ModuleId, name: &str, value: Expr) -> Result<()> {
        let slot = self
            .modules
            .get_mut(module.0 as usize)
            .ok_or_else(|| Error::fatal(value.span(), format!("unknown module #{}", module.0)))?;
        slot.bindings.entry(name.to_string()).or_default().push(value);
        Ok(())
    }

    /// Bind `name` to a relation leaf of the given type and return the leaf.
    pub fn define_relation(&mut self, module: ModuleId, name: &str, ty: Type) -> Result<Expr> {
        let leaf = Expr::relation(Span::UNKNOWN, name, ty)?;
        self.define(module, name, leaf.clone())?;
        Ok(leaf)
    }

    /// Bind `name` to a macro whose body is checked in `module`.
    pub fn define_macro(
        &mut self,
        module: ModuleId,
        name: &str,
        params: Vec<Ident>,
        body: Expr,
    ) -> Result<Macro> {
        let mac = Macro::new(Span::UNKNOWN, None, module, name, params, body);
        self.define(module, name, Expr::from_macro(mac.clone()))?;
        Ok(mac)
    }

    /// All bindings of `name` in `module`.
    pub fn lookup(&self, module: ModuleId, name: &str) -> &[Expr] {
        self.module(module).map(|m| m.get(name)).unwrap_or(&[])
    }
}

/// One frame of local bindings (quantified variables, macro parameters).
#[derive(Debug)]
struct Scope {
    vars: FxHashMap<String, Expr>,
    parent: Option<Arc<Scope>>,
}

impl Scope {
    fn get(&self, name: &str) -> Option<&Expr> {
        self.vars
            .get(name)
            .or_else(|| self.parent.as_ref().and_then(|p| p.get(name)))
    }
}

/// Everything one checking call needs to look names up.
///
/// A context is a cheap value: deriving a child never affects the parent,
/// and the unroll budget travels by value.
#[derive(Debug, Clone)]
pub struct Context {
    env: Arc<Env>,
    module: ModuleId,
    locals: Option<Arc<Scope>>,
    unrolls: u32,
}

impl Context {
    pub fn new(env: Arc<Env>, module: ModuleId, unrolls: u32) -> Self {
        Self {
            env,
            module,
            locals: None,
            unrolls,
        }
    }

    pub fn env(&self) -> &Arc<Env> {
        &self.env
    }

    pub fn module(&self) -> ModuleId {
        self.module
    }

    /// Remaining macro expansions allowed.
    pub fn unrolls(&self) -> u32 {
        self.unrolls
    }

    /// A child scope with `bindings` added; they shadow outer names.
    pub fn bind_all(&self, bindings: impl IntoIterator<Item = (String, Expr)>) -> Context {
        let vars: FxHashMap<String, Expr> = bindings.into_iter().collect();
        if vars.is_empty() {
            return self.clone();
        }
        Context {
            locals: Some(Arc::new(Scope {
                vars,
                parent: self.locals.clone(),
            })),
            ..self.clone()
        }
    }

    pub fn bind(&self, name: &str, value: Expr) -> Context {
        self.bind_all([(name.to_string(), value)])
    }

    /// The context a macro body is checked in: the defining module's
    /// bindings only, with one fewer unroll.
    pub fn for_macro(&self, module: ModuleId) -> Context {
        Context {
            env: self.env.clone(),
            module,
            locals: None,
            unrolls: self.unrolls.saturating_sub(1),
        }
    }

    /// The innermost local binding of `name`, if any.
    pub fn lookup_local(&self, name: &str) -> Option<&Expr> {
        self.locals.as_ref().and_then(|l| l.get(name))
    }

    /// Candidates for `name`: a local binding wins, otherwise every module binding.
    pub fn lookup(&self, name: &str) -> Vec<Expr> {
        match self.lookup_local(name) {
            Some(local) => vec![local.clone()],
            None => self.env.lookup(self.module, name).to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relspec_ast::Atom;

    fn env_with_a() -> (Arc<Env>, ModuleId) {
        let mut env = Env::new();
        let main = env.add_module("main");
        env.define_relation(main, "A", Type::unary(Atom::top_level("A"))).unwrap();
        (Arc::new(env), main)
    }

    #[test]
    fn test_define_and_lookup() {
        let (env, main) = env_with_a();
        assert_eq!(env.lookup(main, "A").len(), 1);
        assert!(env.lookup(main, "missing").is_empty());
        assert_eq!(env.module(main).unwrap().name, "main");
    }

    #[test]
    fn test_define_twice_overloads() {
        let mut env = Env::new();
        let main = env.add_module("main");
        let a = Atom::top_level("A");
        let b = Atom::top_level("B");
        env.define_relation(main, "f", Type::relation([a.clone(), b.clone()])).unwrap();
        env.define_relation(main, "f", Type::relation([b, a])).unwrap();
        assert_eq!(env.lookup(main, "f").len(), 2);
    }

    #[test]
    fn test_define_in_unknown_module_fails() {
        let mut env = Env::new();
        let err = env.define(ModuleId(3), "x", Expr::number(Span::UNKNOWN, 1)).unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_child_scope_shadows() {
        let (env, main) = env_with_a();
        let cx = Context::new(env, main, 5);
        let child = cx.bind("A", Expr::number(Span::UNKNOWN, 1));
        assert_eq!(child.lookup("A")[0].ty(), Some(&Type::INT));
        assert!(cx.lookup("A")[0].ty().unwrap().is_relational());
    }

    #[test]
    fn test_macro_context_drops_locals_and_one_unroll() {
        let (env, main) = env_with_a();
        let cx = Context::new(env, main, 2).bind("x", Expr::number(Span::UNKNOWN, 1));
        let inner = cx.for_macro(main);
        assert_eq!(inner.unrolls(), 1);
        assert_eq!(cx.unrolls(), 2);
        assert!(inner.lookup("x").is_empty());
        assert_eq!(inner.lookup("A").len(), 1);
    }
}
