//! The node arena. One [`Node`] per tag occurrence; tree links are ids
//! into the arena, so the arena (via its owning document) is the sole
//! owner and upward/downward walks never fight the borrow checker.

use core_types::FrameId;
use js::Obj;

use crate::tag::{tag_info, Action, InputType, TagInfo};

pub type NodeId = u32;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Id(pub NodeId);

/// Persistent processing stage. A node is prerendered once and decorated
/// once; `Suppressed` nodes (skipped head subtrees, detached frame
/// contents) are past both stages and ignored forever.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum Step {
    #[default]
    Fresh,
    Prerendered,
    Decorated,
    Suppressed,
}

/// The six event-handler attributes recognized at build time.
#[derive(Clone, Copy, Debug, Default)]
pub struct Handlers {
    pub onclick: bool,
    pub onchange: bool,
    pub onsubmit: bool,
    pub onreset: bool,
    pub onload: bool,
    pub onunload: bool,
}

pub const HANDLER_NAMES: [&str; 6] = [
    "onclick", "onchange", "onsubmit", "onreset", "onload", "onunload",
];

impl Handlers {
    pub fn get(&self, name: &str) -> bool {
        match name {
            "onclick" => self.onclick,
            "onchange" => self.onchange,
            "onsubmit" => self.onsubmit,
            "onreset" => self.onreset,
            "onload" => self.onload,
            "onunload" => self.onunload,
            _ => false,
        }
    }

    pub fn set(&mut self, name: &str) {
        match name {
            "onclick" => self.onclick = true,
            "onchange" => self.onchange = true,
            "onsubmit" => self.onsubmit = true,
            "onreset" => self.onreset = true,
            "onload" => self.onload = true,
            "onunload" => self.onunload = true,
            _ => {}
        }
    }

    pub fn any(&self) -> bool {
        self.onclick || self.onchange || self.onsubmit || self.onreset || self.onload || self.onunload
    }
}

#[derive(Debug)]
pub struct Node {
    pub seqno: Id,
    pub action: Action,
    pub info: &'static TagInfo,
    pub frame: FrameId,
    /// A closing tag, as in `</a>`. Never linked into the tree; only used
    /// to find its matching open tag.
    pub slash: bool,

    /// Raw attributes in source order; lookup is case-insensitive.
    pub attributes: Vec<(String, Option<String>)>,

    // resolved fields
    pub name: Option<String>,
    pub id_attr: Option<String>,
    pub classname: Option<String>,
    pub href: Option<String>,
    pub value: Option<String>,
    /// Reset/mirror value, restored by a form reset.
    pub rvalue: Option<String>,
    pub text: Option<String>,
    pub inner_html: Option<String>,
    pub itype: Option<InputType>,
    pub maxlength: Option<u32>,

    pub checked: bool,
    pub rchecked: bool,
    pub disabled: bool,
    pub readonly: bool,
    pub multiple: bool,
    pub doorway: bool,
    pub deleted: bool,
    pub contracted: bool,
    pub script_generated: bool,
    pub handlers: Handlers,

    // form bookkeeping
    pub post: bool,
    pub mime: bool,
    pub bymail: bool,
    pub javapost: bool,
    pub secure: bool,
    pub submitted: bool,
    /// Anchor contains visible alphanumeric text.
    pub text_inside: bool,
    /// Non-hidden inputs under this form.
    pub input_count: u32,
    /// Checked options under this select.
    pub selected_count: u32,
    pub option_index: Option<u32>,
    pub list_start: Option<i64>,
    /// Handle of the addressable side buffer holding textarea content.
    pub side_buffer: Option<usize>,

    // tree links
    pub parent: Option<Id>,
    pub firstchild: Option<Id>,
    pub sibling: Option<Id>,
    /// Matching close tag (or open tag, from the close side).
    pub balance: Option<Id>,
    /// The form that owns this input, the table above this row, etc.
    pub controller: Option<Id>,

    pub step: Step,
    /// Per-traversal cycle guard, reset at the start of each walk.
    pub visited: bool,

    /// Engine object mirroring this node, once decorated.
    pub js: Option<Obj>,
}

impl Node {
    fn new(info: &'static TagInfo, seqno: Id, frame: FrameId) -> Self {
        Node {
            seqno,
            action: info.action,
            info,
            frame,
            slash: false,
            attributes: Vec::new(),
            name: None,
            id_attr: None,
            classname: None,
            href: None,
            value: None,
            rvalue: None,
            text: None,
            inner_html: None,
            itype: None,
            maxlength: None,
            checked: false,
            rchecked: false,
            disabled: false,
            readonly: false,
            multiple: false,
            doorway: false,
            deleted: false,
            contracted: false,
            script_generated: false,
            handlers: Handlers::default(),
            post: false,
            mime: false,
            bymail: false,
            javapost: false,
            secure: false,
            submitted: false,
            text_inside: false,
            input_count: 0,
            selected_count: 0,
            option_index: None,
            list_start: None,
            side_buffer: None,
            parent: None,
            firstchild: None,
            sibling: None,
            balance: None,
            controller: None,
            step: Step::Fresh,
            visited: false,
            js: None,
        }
    }

    /// Attribute value by case-insensitive name. Empty values count as
    /// absent, as do valueless attributes.
    pub fn attrib_val(&self, name: &str) -> Option<&str> {
        for (k, v) in &self.attributes {
            if k.eq_ignore_ascii_case(name) {
                return match v.as_deref() {
                    Some("") | None => None,
                    some => some,
                };
            }
        }
        None
    }

    pub fn attrib_present(&self, name: &str) -> bool {
        self.attributes
            .iter()
            .any(|(k, _)| k.eq_ignore_ascii_case(name))
    }
}

#[derive(Debug, Default)]
pub struct NodeArena {
    nodes: Vec<Node>,
}

impl NodeArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> u32 {
        self.nodes.len() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Create a node for a tag name. Even inert tags like `<html>` get a
    /// node so close tags can pair up by nesting order.
    pub fn new_node(&mut self, name: &str, frame: FrameId) -> Id {
        let info = tag_info(name);
        let id = Id(self.nodes.len() as NodeId);
        self.nodes.push(Node::new(info, id, frame));
        id
    }

    /// Append `child` to `parent`'s sibling chain.
    pub fn link_in_tree(&mut self, parent: Id, child: Id) {
        self[child].parent = Some(parent);
        match self[parent].firstchild {
            None => self[parent].firstchild = Some(child),
            Some(first) => {
                let mut last = first;
                while let Some(next) = self[last].sibling {
                    last = next;
                }
                self[last].sibling = Some(child);
            }
        }
    }

    /// Unlink `child` from its parent's chain. The node keeps no stale
    /// links afterwards.
    pub fn detach(&mut self, child: Id) {
        let Some(parent) = self[child].parent.take() else {
            self[child].sibling = None;
            return;
        };
        if self[parent].firstchild == Some(child) {
            self[parent].firstchild = self[child].sibling;
        } else {
            let mut c = self[parent].firstchild;
            while let Some(cur) = c {
                if self[cur].sibling == Some(child) {
                    self[cur].sibling = self[child].sibling;
                    break;
                }
                c = self[cur].sibling;
            }
        }
        self[child].sibling = None;
    }

    /// Nearest enclosing ancestor with the given action, excluding the
    /// node itself.
    pub fn find_open_tag(&self, from: Id, action: Action) -> Option<Id> {
        let mut cur = self[from].parent;
        while let Some(t) = cur {
            if self[t].action == action {
                return Some(t);
            }
            cur = self[t].parent;
        }
        None
    }

    /// Does the subtree rooted at `t` (inclusive) contain the action?
    pub fn tag_below(&self, t: Id, action: Action) -> bool {
        if self[t].action == action {
            return true;
        }
        let mut c = self[t].firstchild;
        while let Some(cur) = c {
            if self.tag_below(cur, action) {
                return true;
            }
            c = self[cur].sibling;
        }
        false
    }

    pub fn ids_from(&self, start: Id) -> impl Iterator<Item = Id> + use<> {
        (start.0..self.nodes.len() as NodeId).map(Id)
    }

    /// Depth-first walk over every root in `start..`, calling back on open
    /// and close. A node whose parent predates `start` is a root of the
    /// fresh range; that is how content attached under an older node
    /// (a frame's payload, an innerHTML fragment) gets walked. The
    /// per-node `visited` guard turns an accidental cycle into a logged
    /// "malformed tree" rather than unbounded recursion.
    pub fn traverse_all<F>(&mut self, start: Id, mut callback: F)
    where
        F: FnMut(&mut NodeArena, Id, bool),
    {
        let mut overflow = false;
        for id in self.ids_from(start).collect::<Vec<_>>() {
            self[id].visited = false;
        }
        for id in self.ids_from(start).collect::<Vec<_>>() {
            let n = &self[id];
            if n.parent.is_none_or(|p| p < start) && !n.slash && n.step < Step::Suppressed {
                self.traverse_node(id, &mut callback, &mut overflow);
            }
        }
        if overflow {
            log::debug!("malformed tree!");
        }
    }

    fn traverse_node<F>(&mut self, id: Id, callback: &mut F, overflow: &mut bool)
    where
        F: FnMut(&mut NodeArena, Id, bool),
    {
        if self[id].visited {
            *overflow = true;
            log::trace!("node revisit {} {}", self[id].info.name, id.0);
            return;
        }
        self[id].visited = true;

        callback(self, id, true);
        let mut child = self[id].firstchild;
        while let Some(c) = child {
            self.traverse_node(c, callback, overflow);
            child = self[c].sibling;
        }
        callback(self, id, false);
    }
}

impl std::ops::Index<Id> for NodeArena {
    type Output = Node;

    fn index(&self, id: Id) -> &Node {
        &self.nodes[id.0 as usize]
    }
}

impl std::ops::IndexMut<Id> for NodeArena {
    fn index_mut(&mut self, id: Id) -> &mut Node {
        &mut self.nodes[id.0 as usize]
    }
}
