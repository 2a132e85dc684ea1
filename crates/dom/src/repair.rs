//! Heuristic fixups for parser-produced structural defects. Three passes,
//! run in this order over the newly built region; each restructures the
//! tree in place and none can fail.

use crate::node::{Id, NodeArena};
use crate::tag::Action;

pub fn repair_tree(arena: &mut NodeArena, start: Id) {
    nested_anchors(arena, start);
    empty_anchors(arena, start);
    table_form(arena, start);
}

/// Anchors should never nest; {Link1{Link2{Link3}}} renders funny and
/// appears in the wild. Move each inner anchor back up to sit just after
/// its enclosing anchor.
fn nested_anchors(arena: &mut NodeArena, start: Id) {
    for a2 in arena.ids_from(start).collect::<Vec<_>>() {
        if arena[a2].action != Action::Anchor || arena[a2].slash {
            continue;
        }
        let Some(a1) = arena.find_open_tag(a2, Action::Anchor) else {
            continue;
        };
        arena.detach(a2);
        arena[a2].parent = arena[a1].parent;
        arena[a2].sibling = arena[a1].sibling;
        arena[a1].sibling = Some(a2);
    }
}

/// `<a><div>stuff</div></a>` often arrives with the div pushed outside the
/// anchor, rendering as {} stuff. Move a following div back under a
/// childless anchor. Skip the move when the div's subtree holds an anchor
/// (would recreate the nesting the previous pass removed), an input, or a
/// form.
fn empty_anchors(arena: &mut NodeArena, start: Id) {
    for a0 in arena.ids_from(start).collect::<Vec<_>>() {
        if arena[a0].action != Action::Anchor || arena[a0].slash || arena[a0].firstchild.is_some() {
            continue;
        }
        // the next sibling at any ancestor level
        let mut up = Some(a0);
        while let Some(u) = up {
            if arena[u].sibling.is_some() {
                break;
            }
            up = arena[u].parent;
        }
        let Some(up) = up else { continue };
        let Some(div) = arena[up].sibling else {
            continue;
        };
        if arena[div].action != Action::Div {
            continue;
        }
        if arena.tag_below(div, Action::Anchor)
            || arena.tag_below(div, Action::Input)
            || arena.tag_below(div, Action::Form)
        {
            continue;
        }
        arena[up].sibling = arena[div].sibling;
        arena[a0].firstchild = Some(div);
        arena[div].parent = Some(a0);
        arena[div].sibling = None;
    }
}

/// A form directly inside a table but outside tr/td closes immediately and
/// orphans its controls. Move the first following table sibling that holds
/// an input down under the empty form.
fn table_form(arena: &mut NodeArena, start: Id) {
    for form in arena.ids_from(start).collect::<Vec<_>>() {
        if arena[form].action != Action::Form || arena[form].slash || arena[form].firstchild.is_some()
        {
            continue;
        }
        let mut t = form;
        let mut cur = arena[form].sibling;
        while let Some(table) = cur {
            if arena[table].action == Action::Table && arena.tag_below(table, Action::Input) {
                arena[table].parent = Some(form);
                arena[form].firstchild = Some(table);
                arena[t].sibling = arena[table].sibling;
                arena[table].sibling = None;
                break;
            }
            t = table;
            cur = arena[table].sibling;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::{append_tokens, build_tree, DocumentBase, TagToken};

    fn build(tokens: Vec<TagToken>) -> NodeArena {
        let mut arena = NodeArena::new();
        let start = append_tokens(&mut arena, tokens, 0);
        let mut base = DocumentBase::new(None);
        build_tree(&mut arena, start, None, false, &mut base);
        arena
    }

    #[test]
    fn nested_anchors_become_siblings() {
        let mut arena = build(vec![
            TagToken::open("a"),
            TagToken::open("a"),
            TagToken::open("a"),
            TagToken::close("a"),
            TagToken::close("a"),
            TagToken::close("a"),
        ]);
        nested_anchors(&mut arena, Id(0));
        assert_eq!(arena[Id(0)].sibling, Some(Id(1)));
        assert_eq!(arena[Id(1)].sibling, Some(Id(2)));
        assert_eq!(arena[Id(1)].parent, None);
        assert_eq!(arena[Id(0)].firstchild, None);
    }

    #[test]
    fn nested_anchor_repair_is_idempotent() {
        let mut arena = build(vec![
            TagToken::open("div"),
            TagToken::open("a"),
            TagToken::open("a"),
            TagToken::close("a"),
            TagToken::close("a"),
            TagToken::close("div"),
        ]);
        nested_anchors(&mut arena, Id(0));
        let snapshot: Vec<_> = (0..arena.len())
            .map(|i| {
                let n = &arena[Id(i)];
                (n.parent, n.firstchild, n.sibling)
            })
            .collect();
        nested_anchors(&mut arena, Id(0));
        let again: Vec<_> = (0..arena.len())
            .map(|i| {
                let n = &arena[Id(i)];
                (n.parent, n.firstchild, n.sibling)
            })
            .collect();
        assert_eq!(snapshot, again);
    }

    #[test]
    fn empty_anchor_swallows_following_div() {
        let mut arena = build(vec![
            TagToken::open("a").attr("href", "#bottom"),
            TagToken::close("a"),
            TagToken::open("div"),
            TagToken::open("b"),
            TagToken::close("b"),
            TagToken::close("div"),
        ]);
        let (a, div) = (Id(0), Id(2));
        assert_eq!(arena[a].sibling, Some(div));
        empty_anchors(&mut arena, Id(0));
        assert_eq!(arena[a].firstchild, Some(div));
        assert_eq!(arena[div].parent, Some(a));
        assert_eq!(arena[a].sibling, None);
    }

    #[test]
    fn div_with_interactive_content_stays_put() {
        let mut arena = build(vec![
            TagToken::open("a"),
            TagToken::close("a"),
            TagToken::open("div"),
            TagToken::open("input"),
            TagToken::close("div"),
        ]);
        empty_anchors(&mut arena, Id(0));
        assert_eq!(arena[Id(0)].firstchild, None);
        assert_eq!(arena[Id(0)].sibling, Some(Id(2)));
    }

    #[test]
    fn orphaned_table_moves_under_form() {
        let mut arena = build(vec![
            TagToken::open("form"),
            TagToken::close("form"),
            TagToken::open("table"),
            TagToken::open("tr"),
            TagToken::open("td"),
            TagToken::open("input"),
            TagToken::close("td"),
            TagToken::close("tr"),
            TagToken::close("table"),
        ]);
        let (form, table) = (Id(0), Id(2));
        table_form(&mut arena, Id(0));
        assert_eq!(arena[form].firstchild, Some(table));
        assert_eq!(arena[table].parent, Some(form));
        assert_eq!(arena[form].sibling, None);
    }

    #[test]
    fn table_without_inputs_is_left_alone() {
        let mut arena = build(vec![
            TagToken::open("form"),
            TagToken::close("form"),
            TagToken::open("table"),
            TagToken::open("tr"),
            TagToken::close("tr"),
            TagToken::close("table"),
        ]);
        table_form(&mut arena, Id(0));
        assert_eq!(arena[Id(0)].firstchild, None);
    }
}
