//! Second tree pass: materialize a scripting-engine object per eligible
//! node and thread it into the engine's object graph, so scripts see the
//! page the way legacy browsers present it. All the hard cases live in
//! [`Decorator::dom_link`], the duplicate-name resolution.

use core_types::FrameId;
use js::{Engine, Obj, Value};

use crate::node::{Id, NodeArena, Step, HANDLER_NAMES};
use crate::tag::{Action, InputType};

/// Names a freshly created object is reachable by under its owner.
/// Which kind was used matters later: only a natural name registers in
/// `document.all`, only a non-id key allows an extra id registration.
enum MemberName {
    Sym(String),
    Id(String),
    /// Generated key that only keeps the object away from the garbage
    /// collector.
    Fake(String),
}

impl MemberName {
    fn as_str(&self) -> &str {
        match self {
            MemberName::Sym(s) | MemberName::Id(s) | MemberName::Fake(s) => s,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum RadioSel {
    No,
    /// Radio buttons; the named form member is the array of buttons.
    Radio,
    /// Selects; the object is an array and self-references its options.
    Select,
}

pub struct Decorator<'a, E: Engine> {
    engine: &'a mut E,
    win: Obj,
    doc: Obj,
    frame: FrameId,
    /// Insertion point for script-generated fragments (innerHTML,
    /// document.write); roots mirror under it instead of the document.
    inner_parent: Option<Obj>,
    /// Document title captured at prerender time.
    title: Option<String>,
    fake_idx: u32,
    last_fake: String,
}

/// Decorate every fresh node in `start..`, mirroring the tag tree into the
/// engine's object graph. Engine allocation failure abandons the node at
/// hand, never the traversal.
pub fn decorate<E: Engine>(arena: &mut NodeArena, start: Id, dec: &mut Decorator<'_, E>) {
    arena.traverse_all(start, |a, id, open| {
        if open {
            dec.js_node(a, id);
        }
    });
}

/// The engine-side registries `dom_link` threads objects into. A fresh
/// document object gets these before its first decoration.
pub fn prepare_document<E: Engine>(engine: &mut E, win: Obj, doc: Obj) -> Option<()> {
    engine.instantiate(doc, "all", None)?;
    engine.instantiate(doc, "idMaster", None)?;
    for list in [
        "forms",
        "anchors",
        "images",
        "scripts",
        "metas",
        "heads",
        "bodies",
        "tables",
        "divs",
        "htmlobjs",
        "spans",
        "areas",
        "paragraphs",
    ] {
        engine.instantiate_array(doc, list)?;
    }
    engine.instantiate_array(win, "frames")?;
    Some(())
}

impl<'a, E: Engine> Decorator<'a, E> {
    pub fn new(
        engine: &'a mut E,
        win: Obj,
        doc: Obj,
        frame: FrameId,
        inner_parent: Option<Obj>,
        title: Option<String>,
    ) -> Self {
        Decorator {
            engine,
            win,
            doc,
            frame,
            inner_parent,
            title,
            fake_idx: 0,
            last_fake: String::new(),
        }
    }

    fn fake_prop_name(&mut self) -> String {
        self.fake_idx += 1;
        self.last_fake = format!("gc$${}", self.fake_idx);
        self.last_fake.clone()
    }

    /// Property sets follow the page's best effort; a failing set never
    /// aborts decoration.
    fn setp(&mut self, obj: Obj, name: &str, value: Value) {
        let _ = self.engine.set_property(obj, name, value);
    }

    fn append(&mut self, parent: Obj, child: Obj) {
        let _ = self.engine.append_child(parent, child);
    }

    fn js_node(&mut self, arena: &mut NodeArena, t: Id) {
        if arena[t].step >= Step::Decorated {
            return;
        }
        arena[t].step = Step::Decorated;

        // A tree parsed while scripting was off can meet a second
        // decoration under another frame's context; skip it there.
        if arena[t].frame != self.frame {
            return;
        }

        log::trace!("decorate {} {}", arena[t].info.name, arena[t].seqno.0);

        let action = arena[t].action;
        match action {
            Action::Text => {
                let name = self.fake_prop_name();
                if let Some(io) = self.engine.instantiate(self.doc, &name, Some("TextNode")) {
                    let w = arena[t].text.clone().unwrap_or_default();
                    self.setp(io, "data", w.into());
                    self.setp(io, "nodeName", "text".into());
                    self.setp(io, "nodeType", Value::Num(3.0));
                    // a text node should never have children, but improper
                    // html out there puts stuff under one
                    let _ = self.engine.instantiate_array(io, "childNodes");
                    arena[t].js = Some(io);
                }
            }

            Action::Meta => {
                self.dom_link(arena, t, "Meta", None, Some("metas"), self.doc, RadioSel::No);
                if let Some(io) = arena[t].js {
                    let content = arena[t].attrib_val("content").unwrap_or_default().to_string();
                    self.setp(io, "content", content.into());
                }
            }

            Action::Script => {
                self.dom_link(
                    arena,
                    t,
                    "Script",
                    Some("src"),
                    Some("scripts"),
                    self.doc,
                    RadioSel::No,
                );
                if let Some(io) = arena[t].js {
                    for a in ["type", "language"] {
                        if let Some(v) = arena[t].attrib_val(a).map(str::to_string) {
                            self.setp(io, a, v.into());
                        }
                    }
                    for a in ["src", "data"] {
                        let v = arena[t].attrib_val(a).unwrap_or_default().to_string();
                        self.setp(io, a, v.into());
                    }
                }
            }

            Action::Form => {
                self.dom_link(arena, t, "Form", Some("action"), Some("forms"), self.doc, RadioSel::No);
                self.set_onhandlers(arena, t);
            }

            Action::Input => {
                self.form_control_js(arena, t);
                if arena[t].itype == Some(InputType::TextArea) {
                    if let Some(io) = arena[t].js {
                        let v = arena[t].value.clone().unwrap_or_default();
                        self.setp(io, "innerText", v.into());
                    }
                }
            }

            Action::Option => {
                let _ = self.option_js(arena, t);
                // the options array already established the parent child
                // relationship, skip the mirror step
                if let Some(io) = arena[t].js {
                    self.setp(io, "nodeType", Value::Num(1.0));
                }
                return;
            }

            Action::Anchor => {
                self.dom_link(
                    arena,
                    t,
                    "Anchor",
                    Some("href"),
                    Some("anchors"),
                    self.doc,
                    RadioSel::No,
                );
                self.set_onhandlers(arena, t);
            }

            Action::Head => {
                self.dom_link(arena, t, "Head", None, Some("heads"), self.doc, RadioSel::No);
            }

            Action::Body => {
                self.dom_link(arena, t, "Body", None, Some("bodies"), self.doc, RadioSel::No);
                self.set_onhandlers(arena, t);
            }

            Action::OrderedList | Action::UnorderedList | Action::DefinitionList => {
                self.dom_link(arena, t, "Lister", None, None, self.doc, RadioSel::No);
            }

            Action::ListItem => {
                self.dom_link(arena, t, "Listitem", None, None, self.doc, RadioSel::No);
            }

            Action::Table => {
                self.dom_link(arena, t, "Table", None, Some("tables"), self.doc, RadioSel::No);
                if let Some(io) = arena[t].js {
                    let _ = self.engine.instantiate_array(io, "rows");
                }
            }

            Action::TableRow => {
                if let Some(above) = arena[t].controller.and_then(|c| arena[c].js) {
                    self.dom_link(arena, t, "Trow", None, Some("rows"), above, RadioSel::No);
                    if let Some(io) = arena[t].js {
                        let _ = self.engine.instantiate_array(io, "cells");
                    }
                }
            }

            Action::TableCell => {
                if let Some(above) = arena[t].controller.and_then(|c| arena[c].js) {
                    self.dom_link(arena, t, "Cell", None, Some("cells"), above, RadioSel::No);
                }
            }

            Action::Div => {
                self.dom_link(arena, t, "Div", None, Some("divs"), self.doc, RadioSel::No);
            }

            Action::HtmlObj => {
                self.dom_link(arena, t, "HtmlObj", None, Some("htmlobjs"), self.doc, RadioSel::No);
            }

            Action::Span | Action::Sub | Action::Sup | Action::Ovb => {
                self.dom_link(arena, t, "Span", None, Some("spans"), self.doc, RadioSel::No);
            }

            Action::Area => {
                self.dom_link(arena, t, "Area", Some("href"), Some("areas"), self.doc, RadioSel::No);
            }

            Action::Frame => {
                self.dom_link(arena, t, "Frame", Some("src"), Some("frames"), self.win, RadioSel::No);
                if let Some(io) = arena[t].js {
                    // contentDocument exists below even before the frame's
                    // own dom is loaded into it
                    let _ = self.frame_skeleton(io, arena[t].href.as_deref());
                }
            }

            Action::Image => {
                self.dom_link(arena, t, "Image", Some("src"), Some("images"), self.doc, RadioSel::No);
            }

            Action::Paragraph => {
                self.dom_link(arena, t, "P", None, Some("paragraphs"), self.doc, RadioSel::No);
            }

            Action::Title => {
                if let Some(ft) = self.title.clone() {
                    self.setp(self.doc, "title", ft.into());
                }
            }

            _ => {}
        }

        let Some(io) = arena[t].js else {
            return;
        };
        self.setp(io, "nodeType", Value::Num(1.0));

        // the js tree mirrors the dom tree
        match arena[t].parent {
            Some(p) => {
                if let Some(pj) = arena[p].js {
                    self.append(pj, io);
                }
            }
            None => {
                if let Some(inner) = self.inner_parent {
                    self.append(inner, io);
                } else if action == Action::Head || action == Action::Body {
                    self.append(self.doc, io);
                }
            }
        }

        // the TextNode was linked to the document only to protect it from
        // garbage collection; it has a parent now
        if action == Action::Text {
            let last = self.last_fake.clone();
            self.engine.delete_property(self.doc, &last);
        }

        if arena[t].info.inner_html() {
            let inner = arena[t].inner_html.clone().unwrap_or_default();
            self.setp(io, "innerHTML", inner.into());
        }
    }

    /// Create this node's engine object under `owner` and register it by
    /// name, resolving name collisions the way legacy pages expect.
    /// A failed engine allocation leaves the node undecorated.
    fn dom_link(
        &mut self,
        arena: &mut NodeArena,
        t: Id,
        classname: &str,
        href_prop: Option<&str>,
        list: Option<&str>,
        owner: Obj,
        radiosel: RadioSel,
    ) {
        let _ = self.dom_link_obj(arena, t, classname, href_prop, list, owner, radiosel);
    }

    fn dom_link_obj(
        &mut self,
        arena: &mut NodeArena,
        t: Id,
        classname: &str,
        href_prop: Option<&str>,
        list: Option<&str>,
        owner: Obj,
        radiosel: RadioSel,
    ) -> Option<()> {
        let symname = arena[t].name.clone();
        let idname = arena[t].id_attr.clone();
        let htmlclass = arena[t].classname.clone();
        let href_url = arena[t].href.clone();
        let stylestring = arena[t].attrib_val("style").map(str::to_string);

        log::trace!(
            "domLink {classname} name {}",
            symname.as_deref().unwrap_or_default()
        );

        let mut io: Option<Obj> = None;
        let mut dupname = false;
        let mut collided = false;

        if let Some(sym) = symname.as_deref() {
            if self.engine.has_property(owner, sym) {
                collided = true;
                // An input named action collides with form.action. Assume
                // the tag displaces the action; scripts reading
                // form.action then see the input tag. The actioncrash
                // marker remembers the first collision so a third tag of
                // the same name falls through as a plain duplicate.
                if sym == "action" {
                    let ao = self.engine.get_property_object(owner, sym)?;
                    if !self.engine.has_property(ao, "actioncrash") {
                        self.engine.delete_property(owner, sym);
                        collided = false;
                    }
                }
                if collided {
                    if radiosel == RadioSel::Radio {
                        // the named member is the array of buttons
                        io = Some(self.engine.get_property_object(owner, sym)?);
                    } else {
                        dupname = true;
                    }
                }
            }
        }

        if io.is_none() {
            let membername = match (&symname, &idname) {
                (Some(sym), _) if !dupname => MemberName::Sym(sym.clone()),
                (None, Some(id)) if id != "submit" && id != "reset" && id != "action" => {
                    // id= must not displace a form's native members
                    MemberName::Id(id.clone())
                }
                _ => MemberName::Fake(self.fake_prop_name()),
            };

            let new = if radiosel != RadioSel::No {
                // the first radio button, or a select; either way the form
                // member is an array
                let a = self.engine.instantiate_array(owner, membername.as_str())?;
                if radiosel == RadioSel::Radio {
                    self.setp(a, "type", "radio".into());
                    self.setp(a, "nodeName", "radio".into());
                } else {
                    // a select is an array that references itself as its
                    // own list of options
                    self.setp(a, "options", a.into());
                    self.setp(a, "childNodes", a.into());
                    self.setp(a, "selectedIndex", Value::Num(-1.0));
                }
                a
            } else {
                let o = self
                    .engine
                    .instantiate(owner, membername.as_str(), Some(classname))?;
                let _ = self.engine.instantiate_array(o, "childNodes");
                let so = self.engine.instantiate(o, "style", None);
                if let (Some(so), Some(style)) = (so, stylestring.as_deref()) {
                    self.process_styles(so, style);
                }
                // attributes pages expect even before they are populated
                self.setp(o, "className", "".into());
                self.setp(o, "class", "".into());
                self.setp(o, "nodeValue", "".into());
                let _ = self.engine.instantiate_array(o, "attributes");
                self.setp(o, "ownerDocument", self.doc.into());
                if classname == "Form" {
                    let _ = self.engine.instantiate_array(o, "elements");
                }
                o
            };

            if let MemberName::Sym(sym) = &membername {
                let master = self.engine.get_property_object(self.doc, "all")?;
                self.setp(master, sym, new.into());
                if sym == "action" {
                    self.setp(new, "actioncrash", true.into());
                }
            }

            if let Some(alist) = list.and_then(|l| self.engine.get_property_object(owner, l)) {
                let length = self.engine.array_length(alist)?;
                let _ = self.engine.set_array_element_object(alist, length, new);
                if let (Some(sym), false) = (symname.as_deref(), dupname) {
                    self.setp(alist, sym, new.into());
                }
                if let Some(id) = idname.as_deref() {
                    if !matches!(membername, MemberName::Id(_)) {
                        self.setp(alist, id, new.into());
                    }
                }
            }

            io = Some(new);
        }

        let mut io = io?;
        if radiosel == RadioSel::Radio {
            // drop down to the element within the radio array
            let length = self.engine.array_length(io)?;
            io = self.engine.instantiate_array_element(io, length, "Element")?;
        }

        if let Some(sym) = symname.as_deref() {
            self.setp(io, "name", sym.into());
        }
        if let Some(id) = idname.as_deref() {
            // form.id stays undefined so a form can hold a field named id
            if classname != "Form" {
                self.setp(io, "id", id.into());
            }
            if let Some(master) = self.engine.get_property_object(self.doc, "idMaster") {
                self.setp(master, id, io.into());
            }
        }

        if let (Some(prop), Some(u)) = (href_prop, href_url.as_deref()) {
            let _ = self.instantiate_url(io, prop, u);
        }

        if classname == "Element" {
            // link back to the form that owns the element
            self.setp(io, "form", owner.into());
        }

        if let Some(hc) = htmlclass.as_deref() {
            self.setp(io, "className", hc.into());
            self.setp(io, "class", hc.into());
        }

        arena[t].js = Some(io);
        self.setp(io, "nodeName", arena[t].info.name.into());

        if classname == "Body" {
            self.setp(self.doc, "body", io.into());
            for (p, v) in [
                ("clientHeight", 768.0),
                ("clientWidth", 1024.0),
                ("offsetHeight", 768.0),
                ("offsetWidth", 1024.0),
                ("scrollHeight", 768.0),
                ("scrollWidth", 1024.0),
                ("scrollTop", 0.0),
                ("scrollLeft", 0.0),
            ] {
                self.setp(io, p, Value::Num(v));
            }
            self.setp(self.doc, "documentElement", io.into());
        }
        if classname == "Head" {
            self.setp(self.doc, "head", io.into());
        }

        Some(())
    }

    fn form_control_js(&mut self, arena: &mut NodeArena, t: Id) {
        let itype = arena[t].itype;
        let radiosel = match itype {
            Some(InputType::Radio) => RadioSel::Radio,
            Some(InputType::Select) => RadioSel::Select,
            _ => RadioSel::No,
        };
        let form_obj = arena[t].controller.and_then(|f| arena[f].js);
        match form_obj {
            Some(fo) => self.dom_link(arena, t, "Element", None, Some("elements"), fo, radiosel),
            None => self.dom_link(arena, t, "Element", None, None, self.doc, radiosel),
        };
        let Some(io) = arena[t].js else {
            return;
        };
        let Some(itype) = itype else {
            return;
        };

        self.set_onhandlers(arena, t);

        if itype <= InputType::Radio {
            let v = arena[t].value.clone().unwrap_or_default();
            self.setp(io, "value", v.clone().into());
            if itype != InputType::File {
                // no default value on file inputs
                self.setp(io, "defaultValue", v.into());
            }
        }

        let typedesc = if itype == InputType::Select {
            if arena[t].multiple {
                "select-multiple"
            } else {
                "select-one"
            }
        } else {
            itype.type_name()
        };
        self.setp(io, "type", typedesc.into());

        if itype >= InputType::Radio {
            let checked = arena[t].checked;
            self.setp(io, "checked", checked.into());
            self.setp(io, "defaultChecked", checked.into());
        }
    }

    fn option_js(&mut self, arena: &mut NodeArena, t: Id) -> Option<()> {
        let sel = arena[t].controller?;
        let tx = arena[t].text.clone();
        match tx.as_deref() {
            None | Some("") => log::debug!("empty option"),
            Some(text) => {
                if arena[t].value.as_deref().unwrap_or_default().is_empty() {
                    arena[t].value = Some(text.to_string());
                }
            }
        }

        // no point if the controlling select has no js object
        let selj = arena[sel].js?;
        let idx = arena[t].option_index?;
        let io = self.establish_js_option(selj, idx)?;
        arena[t].js = Some(io);

        let text = arena[t].text.clone().unwrap_or_default();
        let value = arena[t].value.clone().unwrap_or_default();
        self.setp(io, "text", text.into());
        self.setp(io, "value", value.clone().into());
        self.setp(io, "nodeName", "option".into());
        let checked = arena[t].checked;
        self.setp(io, "selected", checked.into());
        self.setp(io, "defaultSelected", checked.into());

        if checked && !arena[sel].multiple {
            self.setp(selj, "selectedIndex", Value::Num(idx as f64));
            self.setp(selj, "value", value.into());
        }
        Some(())
    }

    fn establish_js_option(&mut self, sel: Obj, idx: u32) -> Option<Obj> {
        let oa = self.engine.get_property_object(sel, "options")?;
        let oo = self.engine.instantiate_array_element(oa, idx, "Option")?;
        // option.form = select.form
        if let Some(fo) = self.engine.get_property_object(sel, "form") {
            self.setp(oo, "form", fo.into());
        }
        let _ = self.engine.instantiate_array(oo, "childNodes");
        let _ = self.engine.instantiate_array(oo, "attributes");
        let _ = self.engine.instantiate(oo, "style", None);
        Some(oo)
    }

    fn instantiate_url(&mut self, parent: Obj, name: &str, url: &str) -> Option<Obj> {
        let uo = self.engine.instantiate(parent, name, Some("URL"))?;
        self.setp(uo, "href", url.into());
        Some(uo)
    }

    fn set_onhandlers(&mut self, arena: &NodeArena, t: Id) {
        // the most common handlers; onkeypress, onfocus and friends are
        // not consulted
        for name in HANDLER_NAMES {
            if arena[t].handlers.get(name) {
                if let (Some(io), Some(code)) = (arena[t].js, arena[t].attrib_val(name)) {
                    self.handler_set(io, name, &code.to_string());
                }
            }
        }
    }

    /// Compile handler code in the scope chain pages assume: the document,
    /// and the owning form when there is one.
    fn handler_set(&mut self, ev: Obj, name: &str, code: &str) {
        let hasform = self.engine.has_property(ev, "form");
        let mut newcode = String::with_capacity(code.len() + 60);
        newcode.push_str("with(document) { ");
        if hasform {
            newcode.push_str("with(this.form) { ");
        }
        newcode.push_str(code);
        if hasform {
            newcode.push_str(" }");
        }
        newcode.push_str(" }");
        let _ = self.engine.set_property_function(ev, name, &newcode);
    }

    /// Unpack a `style="a: b; c: d"` attribute onto `obj.style`.
    fn process_styles(&mut self, so: Obj, stylestring: &str) {
        for pair in stylestring.split(';') {
            let Some((name, value)) = pair.split_once(':') else {
                // something there, but not the expected syntax
                continue;
            };
            let name = name.trim();
            let value = value.trim();
            if !name.is_empty() {
                self.setp(so, name, value.into());
            }
        }
    }

    fn frame_skeleton(&mut self, io: Obj, href: Option<&str>) -> Option<()> {
        let cd = self.engine.instantiate(io, "contentDocument", Some("Document"))?;
        let cdbody = self.engine.instantiate(cd, "body", Some("Body"))?;
        let _ = self.engine.instantiate(cdbody, "style", None);
        if let Some(h) = href {
            let _ = self.instantiate_url(cd, "location", h);
        }
        Some(())
    }
}
