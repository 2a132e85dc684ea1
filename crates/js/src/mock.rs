//! Recording engine for tests: a flat object store with property maps,
//! optional array storage, and child lists, so tests can assert the graph
//! that decoration built.

use std::collections::BTreeMap;

use crate::{Engine, Obj, Value};

#[derive(Debug, Default)]
pub struct MockObject {
    pub class: Option<String>,
    pub props: BTreeMap<String, Value>,
    pub functions: BTreeMap<String, String>,
    pub array: Option<Vec<Obj>>,
    pub children: Vec<Obj>,
}

#[derive(Debug, Default)]
pub struct MockEngine {
    objects: Vec<MockObject>,
    /// When set, every allocating call fails, simulating engine OOM.
    pub fail_allocations: bool,
}

impl MockEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a free-standing object (e.g. the document or window root).
    pub fn root(&mut self, class: &str) -> Obj {
        self.alloc(Some(class)).expect("root allocation")
    }

    pub fn object(&self, obj: Obj) -> &MockObject {
        &self.objects[obj.0 as usize]
    }

    pub fn prop_str(&self, obj: Obj, name: &str) -> Option<&str> {
        match self.object(obj).props.get(name) {
            Some(Value::Str(s)) => Some(s),
            _ => None,
        }
    }

    pub fn prop_obj(&self, obj: Obj, name: &str) -> Option<Obj> {
        match self.object(obj).props.get(name) {
            Some(Value::Object(o)) => Some(*o),
            _ => None,
        }
    }

    fn alloc(&mut self, class: Option<&str>) -> Option<Obj> {
        if self.fail_allocations {
            return None;
        }
        let id = Obj(self.objects.len() as u32);
        self.objects.push(MockObject {
            class: class.map(str::to_string),
            ..MockObject::default()
        });
        Some(id)
    }
}

impl Engine for MockEngine {
    fn instantiate(&mut self, parent: Obj, name: &str, class: Option<&str>) -> Option<Obj> {
        let io = self.alloc(class)?;
        self.objects[parent.0 as usize]
            .props
            .insert(name.to_string(), Value::Object(io));
        Some(io)
    }

    fn instantiate_array(&mut self, parent: Obj, name: &str) -> Option<Obj> {
        let io = self.alloc(Some("Array"))?;
        self.objects[io.0 as usize].array = Some(Vec::new());
        self.objects[parent.0 as usize]
            .props
            .insert(name.to_string(), Value::Object(io));
        Some(io)
    }

    fn instantiate_array_element(&mut self, array: Obj, index: u32, class: &str) -> Option<Obj> {
        let io = self.alloc(Some(class))?;
        let slot = self.objects[array.0 as usize].array.as_mut()?;
        let index = index as usize;
        if slot.len() <= index {
            slot.resize(index + 1, io);
        }
        slot[index] = io;
        Some(io)
    }

    fn has_property(&self, obj: Obj, name: &str) -> bool {
        self.object(obj).props.contains_key(name)
    }

    fn get_property_object(&self, obj: Obj, name: &str) -> Option<Obj> {
        self.prop_obj(obj, name)
    }

    fn set_property(&mut self, obj: Obj, name: &str, value: Value) -> Option<()> {
        if self.fail_allocations {
            return None;
        }
        self.objects[obj.0 as usize]
            .props
            .insert(name.to_string(), value);
        Some(())
    }

    fn set_property_function(&mut self, obj: Obj, name: &str, body: &str) -> Option<()> {
        if self.fail_allocations {
            return None;
        }
        self.objects[obj.0 as usize]
            .functions
            .insert(name.to_string(), body.to_string());
        Some(())
    }

    fn delete_property(&mut self, obj: Obj, name: &str) {
        self.objects[obj.0 as usize].props.remove(name);
    }

    fn array_length(&self, array: Obj) -> Option<u32> {
        self.object(array).array.as_ref().map(|a| a.len() as u32)
    }

    fn set_array_element_object(&mut self, array: Obj, index: u32, value: Obj) -> Option<()> {
        let slot = self.objects[array.0 as usize].array.as_mut()?;
        let index = index as usize;
        if slot.len() <= index {
            slot.resize(index + 1, value);
        }
        slot[index] = value;
        Some(())
    }

    fn append_child(&mut self, parent: Obj, child: Obj) -> Option<()> {
        if self.fail_allocations {
            return None;
        }
        self.objects[parent.0 as usize].children.push(child);
        Some(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instantiate_and_lookup() {
        let mut eng = MockEngine::new();
        let doc = eng.root("Document");
        let form = eng.instantiate(doc, "f1", Some("Form")).unwrap();
        assert!(eng.has_property(doc, "f1"));
        assert_eq!(eng.get_property_object(doc, "f1"), Some(form));
        assert_eq!(eng.object(form).class.as_deref(), Some("Form"));
    }

    #[test]
    fn arrays_grow_by_index() {
        let mut eng = MockEngine::new();
        let doc = eng.root("Document");
        let arr = eng.instantiate_array(doc, "forms").unwrap();
        assert_eq!(eng.array_length(arr), Some(0));
        let e = eng.instantiate_array_element(arr, 0, "Element").unwrap();
        assert_eq!(eng.array_length(arr), Some(1));
        assert_eq!(eng.object(arr).array.as_ref().unwrap()[0], e);
    }

    #[test]
    fn failing_allocations_return_none() {
        let mut eng = MockEngine::new();
        let doc = eng.root("Document");
        eng.fail_allocations = true;
        assert!(eng.instantiate(doc, "x", None).is_none());
        assert!(eng.set_property(doc, "y", Value::Bool(true)).is_none());
    }
}
