use super::common::types::Attributes;
use super::value::Value;

/// Read-only view over a feature's attributes plus any `let` bindings in
/// effect. Bindings are pushed as new links on the stack and disappear when
/// the evaluation that created them returns; the attribute map itself is
/// never touched.
pub enum Scope<'a> {
    Root(&'a Attributes),
    Binding {
        name: &'a str,
        value: Option<Value>,
        parent: &'a Scope<'a>,
    },
}

impl<'a> Scope<'a> {
    pub fn new(attrs: &'a Attributes) -> Scope<'a> {
        Scope::Root(attrs)
    }

    pub fn bind<'b>(&'b self, name: &'b str, value: Option<Value>) -> Scope<'b>
    where
        'a: 'b,
    {
        Scope::Binding {
            name,
            value,
            parent: self,
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        let mut scope = self;
        loop {
            match scope {
                Scope::Root(attrs) => return attrs.get(key),
                Scope::Binding {
                    name,
                    value,
                    parent,
                } => {
                    if *name == key {
                        return value.as_ref();
                    }
                    scope = *parent;
                }
            }
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        let mut scope = self;
        loop {
            match scope {
                Scope::Root(attrs) => return attrs.contains_key(key),
                Scope::Binding { name, parent, .. } => {
                    if *name == key {
                        return true;
                    }
                    scope = *parent;
                }
            }
        }
    }
}
