//! The seam between the browser and the script engine.
//!
//! The engine itself is an external collaborator; everything the tree
//! decoration pass needs from it goes through the [`Engine`] trait, so the
//! engine implementation can change without touching the DOM side.

#[cfg(any(test, feature = "test-harness"))]
pub mod mock;

/// Opaque handle to an engine-owned object. The engine's garbage collector
/// owns the lifetime; holders keep a non-owning copy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Obj(pub u32);

#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Str(String),
    Num(f64),
    Bool(bool),
    Object(Obj),
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Num(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<Obj> for Value {
    fn from(o: Obj) -> Self {
        Value::Object(o)
    }
}

/// Object creation, property access, arrays, and DOM-mirror child
/// appending. Every allocating call returns `Option`: `None` means the
/// engine is out of memory or its context has been torn down, and the
/// caller abandons the current object, never the whole traversal.
pub trait Engine {
    /// Create an object of `class` and bind it to `parent.name`.
    /// `class: None` creates a plain object.
    fn instantiate(&mut self, parent: Obj, name: &str, class: Option<&str>) -> Option<Obj>;

    /// Create an engine-native array bound to `parent.name`.
    fn instantiate_array(&mut self, parent: Obj, name: &str) -> Option<Obj>;

    /// Create an object of `class` as `array[index]`.
    fn instantiate_array_element(&mut self, array: Obj, index: u32, class: &str) -> Option<Obj>;

    fn has_property(&self, obj: Obj, name: &str) -> bool;

    fn get_property_object(&self, obj: Obj, name: &str) -> Option<Obj>;

    fn set_property(&mut self, obj: Obj, name: &str, value: Value) -> Option<()>;

    /// Bind a function property compiled from `body`.
    fn set_property_function(&mut self, obj: Obj, name: &str, body: &str) -> Option<()>;

    fn delete_property(&mut self, obj: Obj, name: &str);

    fn array_length(&self, array: Obj) -> Option<u32>;

    fn set_array_element_object(&mut self, array: Obj, index: u32, value: Obj) -> Option<()>;

    /// The engine-side "append child" used to mirror the tag tree into the
    /// script world. Append only; document order must be preserved.
    fn append_child(&mut self, parent: Obj, child: Obj) -> Option<()>;
}
