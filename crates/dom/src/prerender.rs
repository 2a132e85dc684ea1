//! First tree pass: normalize tag semantics before any scripting object
//! exists. Runs the repair passes first, then one depth-first open/close
//! traversal with transient "current open X" trackers, valid because
//! title, script, anchor, form, select, option and textarea do not nest.

use std::collections::HashSet;

use tools::{left_clip, space_crunch};

use crate::node::{Id, Node, NodeArena, Step};
use crate::repair::repair_tree;
use crate::tag::{resolve_input_type, span_class_action, Action, InputType};

/// Collaborator callbacks the pass hands off to: meta handling (cookies,
/// refresh, keywords) and the addressable buffer that holds textarea text.
pub trait DocumentHooks {
    fn meta_tag(&mut self, _node: &Node) {}

    /// Store textarea content in a side buffer, returning its handle.
    fn side_buffer(&mut self, _text: &str) -> Option<usize> {
        None
    }
}

/// Hooks for a document with no collaborators, e.g. under test.
#[derive(Debug, Default)]
pub struct NoHooks;

impl DocumentHooks for NoHooks {}

#[derive(Debug, Default)]
pub struct PrerenderOutcome {
    /// Whitespace-crunched text of the first title tag.
    pub title: Option<String>,
}

pub fn prerender<H: DocumentHooks>(
    arena: &mut NodeArena,
    start: Id,
    hooks: &mut H,
) -> PrerenderOutcome {
    repair_tree(arena, start);

    let mut p = Prerender {
        hooks,
        form: None,
        sel: None,
        opt: None,
        title: None,
        script: None,
        ta: None,
        anchor: None,
        radio_groups: None,
        nopt: 0,
        title_text: None,
    };
    arena.traverse_all(start, |a, id, open| p.node(a, id, open));
    PrerenderOutcome {
        title: p.title_text,
    }
}

struct Prerender<'a, H: DocumentHooks> {
    hooks: &'a mut H,
    form: Option<Id>,
    sel: Option<Id>,
    opt: Option<Id>,
    title: Option<Id>,
    script: Option<Id>,
    ta: Option<Id>,
    anchor: Option<Id>,
    /// Names of radio groups that already have a checked member.
    /// `None` until the first form opens.
    radio_groups: Option<HashSet<String>>,
    /// Sequential option index within the current select.
    nopt: u32,
    title_text: Option<String>,
}

impl<H: DocumentHooks> Prerender<'_, H> {
    fn node(&mut self, arena: &mut NodeArena, t: Id, open: bool) {
        log::trace!(
            "prend {}{} {}",
            if open { "" } else { "/" },
            arena[t].info.name,
            arena[t].seqno.0
        );

        if arena[t].step >= Step::Prerendered {
            return;
        }
        if !open {
            arena[t].step = Step::Prerendered;
        }

        match arena[t].action {
            Action::Text => self.text_node(arena, t, open),

            Action::Title => self.title = open.then_some(t),
            Action::Script => self.script = open.then_some(t),
            Action::Anchor => self.anchor = open.then_some(t),

            Action::Form => {
                if open {
                    self.form_open(arena, t);
                } else if let Some(form) = self.form {
                    if arena[form].href.is_some() && !arena[form].submitted {
                        make_button(arena, form);
                        arena[form].submitted = true;
                    }
                    self.form = None;
                }
            }

            Action::Input => {
                if open {
                    self.input_helper(arena, t);
                    let itype = arena[t].itype;
                    if itype == Some(InputType::Hidden) {
                        return;
                    }
                    if let (Some(form), Some(itype)) = (self.form, itype) {
                        arena[form].input_count += 1;
                        if itype == InputType::Submit || itype == InputType::Image {
                            arena[form].submitted = true;
                        }
                        if itype == InputType::Button && arena[t].handlers.onclick {
                            arena[form].submitted = true;
                        }
                        if itype > InputType::Hidden
                            && itype <= InputType::Select
                            && arena[t].handlers.onchange
                        {
                            arena[form].submitted = true;
                        }
                    }
                }
            }

            Action::Option => {
                if !open {
                    self.opt = None;
                    return;
                }
                let Some(sel) = self.sel else {
                    log::debug!("option appears outside a select statement");
                    return;
                };
                self.opt = Some(t);
                arena[t].controller = Some(sel);
                arena[t].option_index = Some(self.nopt);
                self.nopt += 1;
                if arena[t].attrib_present("selected") {
                    if arena[sel].selected_count > 0 && !arena[sel].multiple {
                        log::debug!("multiple options are selected");
                    } else {
                        arena[t].checked = true;
                        arena[t].rchecked = true;
                        arena[sel].selected_count += 1;
                    }
                }
                if arena[t].value.is_none() {
                    arena[t].value = Some(String::new());
                }
                arena[t].text = Some(String::new());
            }

            Action::Select => {
                if open {
                    self.sel = Some(t);
                    self.nopt = 0;
                    arena[t].itype = Some(InputType::Select);
                    self.form_control(arena, t, true);
                } else {
                    self.sel = None;
                    arena[t].action = Action::Input;
                    arena[t].value = Some(display_options(arena, t));
                }
            }

            Action::TextArea => {
                if open {
                    self.ta = Some(t);
                    arena[t].itype = Some(InputType::TextArea);
                    self.form_control(arena, t, true);
                } else {
                    arena[t].action = Action::Input;
                    if arena[t].value.is_none() {
                        // no text inside, <textarea></textarea>
                        arena[t].value = Some(String::new());
                        arena[t].rvalue = Some(String::new());
                    }
                    let text = arena[t].value.clone().unwrap_or_default();
                    arena[t].side_buffer = self.hooks.side_buffer(&text);
                    self.ta = None;
                }
            }

            Action::Meta => {
                if open {
                    self.hooks.meta_tag(&arena[t]);
                }
            }

            Action::TableRow => {
                if open {
                    arena[t].controller = arena.find_open_tag(t, Action::Table);
                }
            }
            Action::TableCell => {
                if open {
                    arena[t].controller = arena.find_open_tag(t, Action::TableRow);
                }
            }

            Action::Span => {
                if open {
                    if let Some(class) = arena[t].classname.clone() {
                        if let Some(a) = span_class_action(&class) {
                            arena[t].action = a;
                        }
                    }
                }
            }

            Action::OrderedList => {
                if open {
                    if let Some(j) = arena[t]
                        .attrib_val("start")
                        .and_then(|a| a.trim().parse::<i64>().ok())
                        .filter(|j| *j >= 0)
                    {
                        arena[t].list_start = Some(j - 1);
                    }
                }
            }

            Action::Frame => {
                if open {
                    return;
                }
                // frames fetch their own documents; the fallback text
                // inside the tag is never shown
                let mut child = arena[t].firstchild;
                while let Some(c) = child {
                    child = arena[c].sibling;
                    arena[c].parent = None;
                    arena[c].deleted = true;
                    arena[c].step = Step::Suppressed;
                }
                arena[t].firstchild = None;
            }

            _ => {}
        }
    }

    /// Route a text node to whichever capturing element is open.
    fn text_node(&mut self, arena: &mut NodeArena, t: Id, open: bool) {
        if !open || arena[t].text.is_none() {
            return;
        }

        if self.title.is_some() {
            if self.title_text.is_none() {
                let text = arena[t].text.as_deref().unwrap_or_default();
                self.title_text = Some(space_crunch(text));
            }
            arena[t].deleted = true;
            return;
        }

        if let Some(opt) = self.opt {
            let text = arena[t].text.clone().unwrap_or_default();
            arena[opt].text = Some(space_crunch(&text));
            arena[t].deleted = true;
            return;
        }

        if let Some(script) = self.script {
            arena[script].text = arena[t].text.clone();
            arena[t].deleted = true;
            return;
        }

        if let Some(ta) = self.ta {
            let mut v = arena[t].text.clone().unwrap_or_default();
            // tidy sometimes lops off the last newline; and the content
            // goes into a buffer of lines, so it should end in one
            if !v.is_empty() && !v.ends_with('\n') {
                v.push('\n');
            }
            left_clip(&mut v);
            arena[ta].rvalue = Some(v.clone());
            arena[ta].value = Some(v);
            arena[t].deleted = true;
            return;
        }

        // text is on the page
        if let Some(a) = self.anchor {
            let has_alnum = arena[t]
                .text
                .as_deref()
                .unwrap_or_default()
                .chars()
                .any(|c| c.is_ascii_alphanumeric());
            if has_alnum {
                arena[a].text_inside = true;
            }
        }
    }

    fn form_open(&mut self, arena: &mut NodeArena, t: Id) {
        self.form = Some(t);
        if let Some(a) = arena[t].attrib_val("method") {
            if a.eq_ignore_ascii_case("post") {
                arena[t].post = true;
            } else if !a.eq_ignore_ascii_case("get") {
                log::debug!("form method should be get or post");
            }
        }
        if let Some(a) = arena[t].attrib_val("enctype") {
            if a.eq_ignore_ascii_case("multipart/form-data") {
                arena[t].mime = true;
            } else if !a.eq_ignore_ascii_case("application/x-www-form-urlencoded") {
                log::debug!(
                    "unrecognized enctype, please use multipart/form-data or application/x-www-form-urlencoded"
                );
            }
        }
        if let Some(href) = arena[t].href.clone() {
            if let Some(prot) = href.split(':').next().filter(|p| p.len() < href.len()) {
                if prot.eq_ignore_ascii_case("mailto") {
                    arena[t].bymail = true;
                } else if prot.eq_ignore_ascii_case("javascript") {
                    arena[t].javapost = true;
                } else if prot.eq_ignore_ascii_case("https") {
                    arena[t].secure = true;
                } else if !prot.eq_ignore_ascii_case("http") {
                    log::debug!("form cannot submit using protocol {prot}");
                }
            }
        }
        self.radio_groups = Some(HashSet::new());
    }

    fn input_helper(&mut self, arena: &mut NodeArena, t: Id) {
        let itype = if arena[t].info.name == "button" {
            InputType::Button
        } else if let Some(s) = arena[t].attrib_val("type") {
            resolve_input_type(s)
        } else {
            InputType::Text
        };
        arena[t].itype = Some(itype);

        if let Some(len) = arena[t]
            .attrib_val("maxlength")
            .and_then(|s| s.trim().parse::<u32>().ok())
            .filter(|len| *len > 0)
        {
            arena[t].maxlength = Some(len);
        }

        // No preset value on file inputs; a page must not pick which local
        // file gets uploaded.
        if itype == InputType::File {
            arena[t].value = None;
            arena[t].rvalue = None;
        }

        // an empty value is "", not absent
        if arena[t].value.is_none() {
            arena[t].value = Some(String::new());
        }
        if arena[t].rvalue.is_none() {
            arena[t].rvalue = arena[t].value.clone();
        }

        if itype == InputType::Radio && arena[t].checked {
            let myname = arena[t].name.clone().or_else(|| arena[t].id_attr.clone());
            if let (Some(groups), Some(name)) = (self.radio_groups.as_mut(), myname) {
                if !groups.insert(name) {
                    log::debug!("multiple radio buttons have been selected");
                    arena[t].checked = false;
                    arena[t].rchecked = false;
                }
            }
        }

        // even the submit fields can have a name, but they don't have to
        self.form_control(arena, t, itype > InputType::Submit);
    }

    /// Attach a control to its form, by tracker or by ancestor search
    /// (nodes can be created dynamically, not through html).
    fn form_control(&mut self, arena: &mut NodeArena, t: Id, namecheck: bool) {
        let cform = self.form.or_else(|| arena.find_open_tag(t, Action::Form));
        if let Some(cform) = cform {
            arena[t].controller = Some(cform);
        } else if arena[t].itype != Some(InputType::Button) {
            log::debug!("{} is not part of a fill-out form", arena[t].info.desc);
        }
        if namecheck && arena[t].name.is_none() && arena[t].id_attr.is_none() {
            log::debug!("{} does not have a name", arena[t].info.desc);
        }
    }
}

/// Synthesize a submit button as the form's last child, so a form with an
/// action but no explicit submit control can still be submitted.
fn make_button(arena: &mut NodeArena, form: Id) {
    let t = arena.new_node("input", arena[form].frame);
    arena[t].controller = Some(form);
    arena[t].itype = Some(InputType::Submit);
    arena[t].value = Some(String::new());
    arena[t].step = Step::Prerendered;
    arena.link_in_tree(form, t);
}

/// Comma-joined text of the checked options under a select, in document
/// order. The select displays this as its value.
pub fn display_options(arena: &NodeArena, sel: Id) -> String {
    let mut opt = String::new();
    for id in arena.ids_from(Id(0)) {
        let t = &arena[id];
        if t.controller != Some(sel) || !t.checked {
            continue;
        }
        if !opt.is_empty() {
            opt.push(',');
        }
        opt.push_str(t.text.as_deref().unwrap_or_default());
    }
    opt
}
