//! Tree builder: turns the tokenizer's flat open/close tag list into a
//! parented tree. Nesting follows stack discipline, a close tag pairs with
//! the innermost unmatched open tag; bad nesting degrades to best-effort
//! linking and is never an error.

use core_types::FrameId;
use url::Url;

use crate::node::{Id, NodeArena, Step, HANDLER_NAMES};
use crate::tag::Action;

/// One tag record from the tokenizer. Attributes arrive already split into
/// name/value pairs; values are raw, unresolved text.
#[derive(Clone, Debug)]
pub struct TagToken {
    pub name: String,
    pub slash: bool,
    pub attributes: Vec<(String, Option<String>)>,
    /// Only on `text` pseudo-tags.
    pub text: Option<String>,
    /// Raw source between this tag and its close, for containers whose
    /// region is exposed to script.
    pub inner_html: Option<String>,
}

impl TagToken {
    pub fn open(name: &str) -> Self {
        TagToken {
            name: name.to_string(),
            slash: false,
            attributes: Vec::new(),
            text: None,
            inner_html: None,
        }
    }

    pub fn close(name: &str) -> Self {
        TagToken {
            name: name.to_string(),
            slash: true,
            attributes: Vec::new(),
            text: None,
            inner_html: None,
        }
    }

    /// A run of page text between tags.
    pub fn text(body: &str) -> Self {
        let mut t = TagToken::open("text");
        t.text = Some(body.to_string());
        t
    }

    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attributes
            .push((name.to_string(), Some(value.to_string())));
        self
    }

    pub fn flag(mut self, name: &str) -> Self {
        self.attributes.push((name.to_string(), None));
        self
    }

    pub fn inner(mut self, source: &str) -> Self {
        self.inner_html = Some(source.to_string());
        self
    }
}

/// The document's base URL for relative resolution. The first `<base href>`
/// sets it permanently; later base tags are ignored.
#[derive(Clone, Debug, Default)]
pub struct DocumentBase {
    base: Option<Url>,
    locked: bool,
}

impl DocumentBase {
    pub fn new(base: Option<Url>) -> Self {
        DocumentBase {
            base,
            locked: false,
        }
    }

    pub fn url(&self) -> Option<&Url> {
        self.base.as_ref()
    }

    /// Resolve `rel` against the base. Unresolvable references come back
    /// unchanged; a link that can't be followed is still a link.
    pub fn resolve(&self, rel: &str) -> String {
        if let Some(b) = &self.base {
            if let Ok(u) = b.join(rel) {
                return u.to_string();
            }
        } else if let Ok(u) = Url::parse(rel) {
            return u.to_string();
        }
        rel.to_string()
    }

    fn set_from_base_tag(&mut self, href: &str) {
        if self.locked {
            return;
        }
        match Url::parse(href) {
            Ok(u) => {
                self.base = Some(u);
                self.locked = true;
            }
            Err(e) => log::debug!("base href {href} does not parse: {e}"),
        }
    }
}

/// Materialize tokens as arena nodes, in order. Returns the id of the
/// first new node; `build_tree` then links the region `start..`.
pub fn append_tokens(arena: &mut NodeArena, tokens: Vec<TagToken>, frame: FrameId) -> Id {
    let start = Id(arena.len());
    for tok in tokens {
        let id = arena.new_node(&tok.name, frame);
        arena[id].slash = tok.slash;
        arena[id].attributes = tok.attributes;
        arena[id].text = tok.text;
        arena[id].inner_html = tok.inner_html;
    }
    start
}

/// Link the nodes in `start..` into a tree, attaching roots under `attach`
/// when given (document.write / innerHTML insertion point, or a frame's
/// content root). `generated` marks markup synthesized by script rather
/// than parsed from the page; tidy wraps such fragments in html/head/body,
/// which must not land in the tree.
pub fn build_tree(
    arena: &mut NodeArena,
    start: Id,
    attach: Option<Id>,
    generated: bool,
    base: &mut DocumentBase,
) {
    let mut b = TreeBuilder {
        arena,
        pos: start.0,
        attach,
        generated,
        disable: false,
        base,
    };
    log::trace!("tree of nodes");
    b.into_tree(None);
    log::trace!("end tree");
}

struct TreeBuilder<'a> {
    arena: &'a mut NodeArena,
    pos: u32,
    attach: Option<Id>,
    generated: bool,
    /// Inside a skipped `<head>` subtree of generated html.
    disable: bool,
    base: &'a mut DocumentBase,
}

impl TreeBuilder<'_> {
    fn next(&mut self) -> Option<Id> {
        if self.pos >= self.arena.len() {
            return None;
        }
        let id = Id(self.pos);
        self.pos += 1;
        Some(id)
    }

    fn into_tree(&mut self, parent: Option<Id>) {
        let mut prev: Option<Id> = None;
        while let Some(t) = self.next() {
            if self.arena[t].slash {
                if let Some(p) = parent {
                    self.arena[p].balance = Some(t);
                    self.arena[t].balance = Some(p);
                }
                return;
            }

            if self.disable {
                log::trace!("node skip {}", self.arena[t].info.name);
                self.arena[t].step = Step::Suppressed;
                self.into_tree(Some(t));
                continue;
            }

            if self.generated {
                // Skip past <head> altogether, including its tidy
                // generated descendants, and pass through <body> so the
                // children attach below.
                match self.arena[t].action {
                    Action::Head => {
                        log::trace!("node skip {}", self.arena[t].info.name);
                        self.arena[t].step = Step::Suppressed;
                        self.disable = true;
                        self.into_tree(Some(t));
                        self.disable = false;
                        continue;
                    }
                    Action::Body => {
                        log::trace!("node pass {}", self.arena[t].info.name);
                        self.arena[t].step = Step::Suppressed;
                        self.into_tree(Some(t));
                        continue;
                    }
                    _ => {}
                }

                let pass_through = match parent {
                    None => true,
                    Some(p) => self.arena[p].action == Action::Body,
                };
                if pass_through {
                    log::trace!("node up {}", self.arena[t].info.name);
                    if let Some(a) = self.attach {
                        self.arena.link_in_tree(a, t);
                    }
                    self.check_attributes(t);
                    self.into_tree(Some(t));
                    continue;
                }
            }

            // regular linking; a frame inside a window attaches to the
            // frame's content root
            self.arena[t].parent = parent.or(self.attach);
            if let Some(p) = prev {
                self.arena[p].sibling = Some(t);
            } else if let Some(p) = parent {
                self.arena[p].firstchild = Some(t);
            } else if let Some(a) = self.attach {
                match self.arena[a].firstchild {
                    None => self.arena[a].firstchild = Some(t),
                    Some(first) => {
                        let mut last = first;
                        while let Some(next) = self.arena[last].sibling {
                            last = next;
                        }
                        self.arena[last].sibling = Some(t);
                    }
                }
            }
            prev = Some(t);

            self.check_attributes(t);
            self.into_tree(Some(t));
        }
    }

    fn check_attributes(&mut self, t: Id) {
        for h in HANDLER_NAMES {
            if self.arena[t].attrib_present(h) {
                self.arena[t].handlers.set(h);
                self.arena[t].doorway = true;
            }
        }
        if self.arena[t].attrib_present("checked") {
            self.arena[t].checked = true;
            self.arena[t].rchecked = true;
        }
        if self.arena[t].attrib_present("readonly") {
            self.arena[t].readonly = true;
        }
        if self.arena[t].attrib_present("disabled") {
            self.arena[t].disabled = true;
        }
        if self.arena[t].attrib_present("multiple") {
            self.arena[t].multiple = true;
        }

        self.arena[t].name = self.arena[t].attrib_val("name").map(str::to_string);
        self.arena[t].id_attr = self.arena[t].attrib_val("id").map(str::to_string);
        self.arena[t].classname = self.arena[t].attrib_val("class").map(str::to_string);
        if let Some(v) = self.arena[t].attrib_val("value").map(str::to_string) {
            self.arena[t].value = Some(v.clone());
            self.arena[t].rvalue = Some(v);
        }

        if let Some(v) = self.arena[t].attrib_val("href").map(str::to_string) {
            let resolved = self.base.resolve(&v);
            if self.arena[t].action == Action::Base {
                self.base.set_from_base_tag(&resolved);
            }
            self.rewrite_attr(t, "href", &resolved);
            self.arena[t].href = Some(resolved);
        }
        for a in ["src", "action"] {
            if let Some(v) = self.arena[t].attrib_val(a).map(str::to_string) {
                let resolved = self.base.resolve(&v);
                self.rewrite_attr(t, a, &resolved);
                if self.arena[t].href.is_none() {
                    self.arena[t].href = Some(resolved);
                }
            }
        }

        // href=javascript:foo() is another doorway into js
        if let Some(h) = &self.arena[t].href {
            // byte-wise so a multibyte char at the cut can't split
            if h.as_bytes()
                .get(..11)
                .is_some_and(|p| p.eq_ignore_ascii_case(b"javascript:"))
            {
                self.arena[t].doorway = true;
            }
        }
        // and of course the primary doorway
        if self.arena[t].action == Action::Script {
            self.arena[t].doorway = true;
            self.arena[t].script_generated = self.generated;
        }
    }

    fn rewrite_attr(&mut self, t: Id, name: &str, value: &str) {
        for (k, v) in &mut self.arena[t].attributes {
            if k.eq_ignore_ascii_case(name) {
                *v = Some(value.to_string());
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(tokens: Vec<TagToken>, generated: bool) -> (NodeArena, Id) {
        let mut arena = NodeArena::new();
        let start = append_tokens(&mut arena, tokens, 0);
        let mut base =
            DocumentBase::new(Some(Url::parse("http://www.example.com/dir/page.html").unwrap()));
        build_tree(&mut arena, start, None, generated, &mut base);
        (arena, start)
    }

    #[test]
    fn preorder_matches_token_order() {
        let (mut arena, start) = build(
            vec![
                TagToken::open("div"),
                TagToken::open("p"),
                TagToken::close("p"),
                TagToken::open("span"),
                TagToken::open("b"),
                TagToken::close("b"),
                TagToken::close("span"),
                TagToken::close("div"),
                TagToken::open("hr"),
            ],
            false,
        );
        let mut order = Vec::new();
        arena.traverse_all(start, |a, id, open| {
            if open {
                order.push(a[id].info.name);
            }
        });
        assert_eq!(order, vec!["div", "p", "span", "b", "hr"]);
    }

    #[test]
    fn close_tags_pair_by_nesting() {
        let (arena, _) = build(
            vec![
                TagToken::open("a"),
                TagToken::open("b"),
                TagToken::close("b"),
                TagToken::close("a"),
            ],
            false,
        );
        assert_eq!(arena[Id(0)].balance, Some(Id(3)));
        assert_eq!(arena[Id(3)].balance, Some(Id(0)));
        assert_eq!(arena[Id(1)].balance, Some(Id(2)));
    }

    #[test]
    fn unmatched_opens_are_tolerated() {
        let (arena, _) = build(vec![TagToken::open("div"), TagToken::open("p")], false);
        assert_eq!(arena[Id(0)].balance, None);
        assert_eq!(arena[Id(1)].parent, Some(Id(0)));
    }

    #[test]
    fn hrefs_resolve_against_the_base() {
        let (arena, _) = build(
            vec![TagToken::open("a").attr("href", "../other.html")],
            false,
        );
        assert_eq!(
            arena[Id(0)].href.as_deref(),
            Some("http://www.example.com/other.html")
        );
        assert_eq!(
            arena[Id(0)].attrib_val("href"),
            Some("http://www.example.com/other.html")
        );
    }

    #[test]
    fn first_base_tag_wins() {
        let mut arena = NodeArena::new();
        let start = append_tokens(
            &mut arena,
            vec![
                TagToken::open("base").attr("href", "http://one.example.com/a/"),
                TagToken::open("base").attr("href", "http://two.example.com/b/"),
                TagToken::open("a").attr("href", "x.html"),
            ],
            0,
        );
        let mut base = DocumentBase::new(None);
        build_tree(&mut arena, start, None, false, &mut base);
        assert_eq!(
            arena[Id(2)].href.as_deref(),
            Some("http://one.example.com/a/x.html")
        );
    }

    #[test]
    fn doorway_detection() {
        let (arena, _) = build(
            vec![
                TagToken::open("a").attr("href", "javascript:void(0)"),
                TagToken::open("div").attr("onclick", "go()"),
                TagToken::open("script"),
                TagToken::close("script"),
                TagToken::open("p"),
            ],
            false,
        );
        assert!(arena[Id(0)].doorway);
        assert!(arena[Id(1)].doorway);
        assert!(arena[Id(1)].handlers.onclick);
        assert!(arena[Id(2)].doorway);
        assert!(!arena[Id(4)].doorway);
    }

    #[test]
    fn multibyte_hrefs_are_not_doorways() {
        // with no base the href stays unresolved, and its eleventh byte
        // lands inside a multibyte char
        let mut arena = NodeArena::new();
        let start = append_tokens(
            &mut arena,
            vec![TagToken::open("a").attr("href", "0123456789é")],
            0,
        );
        let mut base = DocumentBase::new(None);
        build_tree(&mut arena, start, None, false, &mut base);
        assert!(!arena[Id(0)].doorway);
        assert_eq!(arena[Id(0)].href.as_deref(), Some("0123456789é"));
    }

    #[test]
    fn generated_mode_skips_head_and_unwraps_body() {
        let mut arena = NodeArena::new();
        let attach = arena.new_node("div", 0);
        let start = append_tokens(
            &mut arena,
            vec![
                TagToken::open("html"),
                TagToken::open("head"),
                TagToken::open("title"),
                TagToken::close("title"),
                TagToken::close("head"),
                TagToken::open("body"),
                TagToken::open("p"),
                TagToken::close("p"),
                TagToken::open("b"),
                TagToken::close("b"),
                TagToken::close("body"),
                TagToken::close("html"),
            ],
            0,
        );
        let mut base = DocumentBase::new(None);
        build_tree(&mut arena, start, Some(attach), true, &mut base);

        // the inert html node, p and b hang off the attach point in
        // document order; the head subtree is suppressed
        let html = Id(start.0);
        let p = Id(start.0 + 6);
        let b = Id(start.0 + 8);
        assert_eq!(arena[attach].firstchild, Some(html));
        assert_eq!(arena[html].sibling, Some(p));
        assert_eq!(arena[p].sibling, Some(b));
        let title = Id(start.0 + 2);
        assert_eq!(arena[title].step, Step::Suppressed);
        assert_eq!(arena[Id(start.0 + 1)].step, Step::Suppressed);
    }

    #[test]
    fn checked_and_value_capture() {
        let (arena, _) = build(
            vec![TagToken::open("input")
                .flag("checked")
                .attr("value", "go")
                .attr("name", "btn")],
            false,
        );
        let t = &arena[Id(0)];
        assert!(t.checked && t.rchecked);
        assert_eq!(t.value.as_deref(), Some("go"));
        assert_eq!(t.rvalue.as_deref(), Some("go"));
        assert_eq!(t.name.as_deref(), Some("btn"));
    }
}
