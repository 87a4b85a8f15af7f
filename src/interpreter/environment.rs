use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::ast::FunctionDecl;

/// Handle to a scope record inside [`Scopes`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScopeId(usize);

#[derive(Debug, Default)]
struct Scope {
    bindings: FxHashMap<String, i64>,
    functions: FxHashMap<String, Rc<FunctionDecl>>,
    parent: Option<ScopeId>,
}

/// Arena of lexical scopes.
///
/// Scopes are pushed when a block or call starts and popped when it ends, so
/// the arena always mirrors the execution stack and index 0 is the global
/// scope. Lookups follow parent handles outward; definitions only ever touch
/// the scope they are given.
#[derive(Debug)]
pub struct Scopes {
    scopes: Vec<Scope>,
}

impl Scopes {
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope::default()],
        }
    }

    pub fn global(&self) -> ScopeId {
        ScopeId(0)
    }

    pub fn push(&mut self, parent: ScopeId) -> ScopeId {
        let id = ScopeId(self.scopes.len());
        self.scopes.push(Scope {
            parent: Some(parent),
            ..Scope::default()
        });
        id
    }

    /// Releases `scope` together with anything pushed after it.
    pub fn pop(&mut self, scope: ScopeId) {
        debug_assert!(scope.0 > 0, "the global scope is never popped");
        self.scopes.truncate(scope.0.max(1));
    }

    /// Number of live scopes, the global one included.
    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    pub fn define(&mut self, scope: ScopeId, name: &str, value: i64) {
        let bindings = &mut self.scopes[scope.0].bindings;
        if let Some(slot) = bindings.get_mut(name) {
            *slot = value;
        } else {
            bindings.insert(name.to_string(), value);
        }
    }

    pub fn get(&self, scope: ScopeId, name: &str) -> Option<i64> {
        self.chain(scope)
            .find_map(|scope| scope.bindings.get(name).copied())
    }

    pub fn define_function(&mut self, scope: ScopeId, function: Rc<FunctionDecl>) {
        self.scopes[scope.0]
            .functions
            .insert(function.name.clone(), function);
    }

    pub fn get_function(&self, scope: ScopeId, name: &str) -> Option<Rc<FunctionDecl>> {
        self.chain(scope)
            .find_map(|scope| scope.functions.get(name).cloned())
    }

    fn chain(&self, start: ScopeId) -> impl Iterator<Item = &Scope> {
        let mut next = Some(start);
        std::iter::from_fn(move || {
            let scope = &self.scopes[next?.0];
            next = scope.parent;
            Some(scope)
        })
    }
}

impl Default for Scopes {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Statement;

    fn function(name: &str) -> Rc<FunctionDecl> {
        Rc::new(FunctionDecl {
            name: name.to_string(),
            parameters: vec![],
            body: Statement::Block(vec![]),
        })
    }

    #[test]
    fn lookup_walks_parent_chain() {
        let mut scopes = Scopes::new();
        let global = scopes.global();
        scopes.define(global, "x", 1);
        let inner = scopes.push(global);
        let innermost = scopes.push(inner);

        assert_eq!(scopes.get(innermost, "x"), Some(1));
        assert_eq!(scopes.get(innermost, "missing"), None);
    }

    #[test]
    fn define_shadows_without_touching_parent() {
        let mut scopes = Scopes::new();
        let global = scopes.global();
        scopes.define(global, "x", 1);
        let inner = scopes.push(global);
        scopes.define(inner, "x", 2);

        assert_eq!(scopes.get(inner, "x"), Some(2));
        assert_eq!(scopes.get(global, "x"), Some(1));

        scopes.pop(inner);
        assert_eq!(scopes.get(global, "x"), Some(1));
        assert_eq!(scopes.depth(), 1);
    }

    #[test]
    fn define_overwrites_in_same_scope() {
        let mut scopes = Scopes::new();
        let global = scopes.global();
        scopes.define(global, "x", 1);
        scopes.define(global, "x", 5);
        assert_eq!(scopes.get(global, "x"), Some(5));
    }

    #[test]
    fn functions_resolve_through_parents() {
        let mut scopes = Scopes::new();
        let global = scopes.global();
        scopes.define_function(global, function("f"));
        let inner = scopes.push(global);
        scopes.define_function(inner, function("g"));

        assert!(scopes.get_function(inner, "f").is_some());
        assert!(scopes.get_function(inner, "g").is_some());
        assert!(scopes.get_function(global, "g").is_none());
    }

    #[test]
    fn pop_releases_nested_scopes() {
        let mut scopes = Scopes::new();
        let global = scopes.global();
        let outer = scopes.push(global);
        let _inner = scopes.push(outer);
        assert_eq!(scopes.depth(), 3);

        scopes.pop(outer);
        assert_eq!(scopes.depth(), 1);
    }

    #[test]
    fn variables_and_functions_live_in_separate_namespaces() {
        let mut scopes = Scopes::new();
        let global = scopes.global();
        scopes.define(global, "f", 3);
        scopes.define_function(global, function("f"));

        assert_eq!(scopes.get(global, "f"), Some(3));
        assert!(scopes.get_function(global, "f").is_some());
    }
}
