//! Static tag registry: tag name to semantic action, plus the lookup
//! tables that turn attribute strings into closed enums (input types,
//! span classes) so later passes never compare strings.

/// Semantic action code for a tag. Several tag names can share an action
/// (`td`/`th`, `img`/`image`, `frame`/`iframe`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    /// `<html>` itself; carries no behavior.
    Zero,
    Base,
    HtmlObj,
    Anchor,
    Input,
    Title,
    TextArea,
    Select,
    Option,
    Sub,
    Sup,
    Ovb,
    Nop,
    Paragraph,
    Head,
    Body,
    Text,
    Music,
    Meta,
    Link,
    Image,
    Br,
    Div,
    Dt,
    Dd,
    ListItem,
    UnorderedList,
    OrderedList,
    DefinitionList,
    Hr,
    Form,
    Frame,
    Map,
    Area,
    Table,
    TableBody,
    TableRow,
    TableCell,
    Pre,
    Script,
    /// Visible to script but no special handling.
    JsVisible,
    Span,
}

/// Resolved `<input type=...>`. Variant order mirrors the classic type
/// table; the ordering is meaningful (e.g. everything at or below
/// `Submit` is a button-like control with an optional name).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum InputType {
    Reset,
    Button,
    Image,
    Submit,
    Hidden,
    Text,
    Password,
    Number,
    File,
    Select,
    TextArea,
    Radio,
    Checkbox,
}

impl InputType {
    /// The `type` string exposed to script for this control.
    pub fn type_name(self) -> &'static str {
        match self {
            InputType::Reset => "reset",
            InputType::Button => "button",
            InputType::Image => "image",
            InputType::Submit => "submit",
            InputType::Hidden => "hidden",
            InputType::Text => "text",
            InputType::Password => "password",
            InputType::Number => "number",
            InputType::File => "file",
            InputType::Select => "select",
            InputType::TextArea => "textarea",
            InputType::Radio => "radio",
            InputType::Checkbox => "checkbox",
        }
    }
}

const INPUT_TYPES: &[(&str, InputType)] = &[
    ("reset", InputType::Reset),
    ("button", InputType::Button),
    ("image", InputType::Image),
    ("submit", InputType::Submit),
    ("hidden", InputType::Hidden),
    ("text", InputType::Text),
    ("password", InputType::Password),
    ("number", InputType::Number),
    ("file", InputType::File),
    ("select", InputType::Select),
    ("textarea", InputType::TextArea),
    ("radio", InputType::Radio),
    ("checkbox", InputType::Checkbox),
];

/// HTML5 input types that get no special treatment here; they render and
/// submit as text, without a warning.
const INPUT_OTHERS: &[&str] = &[
    "date",
    "datetime",
    "datetime-local",
    "month",
    "week",
    "time",
    "email",
    "range",
    "search",
    "tel",
    "url",
];

/// Resolve an explicit `type=` attribute string.
/// Unknown strings degrade to text; only truly unrecognized ones warn.
pub fn resolve_input_type(s: &str) -> InputType {
    for (name, t) in INPUT_TYPES {
        if name.eq_ignore_ascii_case(s) {
            return *t;
        }
    }
    if !INPUT_OTHERS.iter().any(|o| o.eq_ignore_ascii_case(s)) {
        log::debug!("unrecognized input type {s}");
    }
    InputType::Text
}

/// Span `class=` values that reclassify the node's semantic action.
pub fn span_class_action(class: &str) -> Option<Action> {
    if class.eq_ignore_ascii_case("sup") {
        Some(Action::Sup)
    } else if class.eq_ignore_ascii_case("sub") {
        Some(Action::Sub)
    } else if class.eq_ignore_ascii_case("ovb") {
        Some(Action::Ovb)
    } else {
        None
    }
}

#[derive(Debug)]
pub struct TagInfo {
    pub name: &'static str,
    pub desc: &'static str,
    pub action: Action,
    /// Paragraph-break weight around this tag (rendering hint).
    pub para: u8,
    /// Structure hints; bit 0 marks containers whose source region is
    /// exposed to script as innerHTML.
    pub hints: u8,
}

pub const HINT_INNER_HTML: u8 = 1;

impl TagInfo {
    pub fn inner_html(&self) -> bool {
        self.hints & HINT_INNER_HTML != 0
    }
}

/// The first three entries are fixed: `html` (inert), `base`, and the
/// generic object entry that unknown tag names degrade to.
pub const AVAILABLE_TAGS: &[TagInfo] = &[
    t("html", "html", Action::Zero, 0, 0),
    t("base", "base reference for relative URLs", Action::Base, 0, 4),
    t("object", "an html object", Action::HtmlObj, 5, 1),
    t("a", "an anchor", Action::Anchor, 0, 1),
    t("input", "an input item", Action::Input, 0, 4),
    t("element", "an input element", Action::Input, 0, 4),
    t("title", "the title", Action::Title, 0, 0),
    t("textarea", "an input text area", Action::TextArea, 0, 0),
    t("select", "an option list", Action::Select, 0, 0),
    t("option", "a select option", Action::Option, 0, 0),
    t("sub", "a subscript", Action::Sub, 0, 0),
    t("sup", "a superscript", Action::Sup, 0, 0),
    t("ovb", "an overbar", Action::Ovb, 0, 0),
    t("font", "a font", Action::Nop, 0, 0),
    t("center", "centered text", Action::Paragraph, 2, 5),
    t("caption", "a caption", Action::Nop, 5, 0),
    t("head", "the html header information", Action::Head, 0, 5),
    t("body", "the html body", Action::Body, 0, 5),
    t("text", "a text section", Action::Text, 0, 4),
    t("bgsound", "background music", Action::Music, 0, 4),
    t("audio", "audio passage", Action::Music, 0, 4),
    t("meta", "a meta tag", Action::Meta, 0, 4),
    t("link", "a link tag", Action::Link, 0, 4),
    t("img", "an image", Action::Image, 0, 4),
    t("image", "an image", Action::Image, 0, 4),
    t("br", "a line break", Action::Br, 1, 4),
    t("p", "a paragraph", Action::Paragraph, 2, 5),
    t("div", "a divided section", Action::Div, 5, 1),
    t("map", "a map of images", Action::Map, 2, 4),
    t("blockquote", "a quoted paragraph", Action::Nop, 10, 1),
    t("h1", "a level 1 header", Action::Nop, 10, 1),
    t("h2", "a level 2 header", Action::Nop, 10, 1),
    t("h3", "a level 3 header", Action::Nop, 10, 1),
    t("h4", "a level 4 header", Action::Nop, 10, 1),
    t("h5", "a level 5 header", Action::Nop, 10, 1),
    t("h6", "a level 6 header", Action::Nop, 10, 1),
    t("dt", "a term", Action::Dt, 2, 4),
    t("dd", "a definition", Action::Dd, 1, 4),
    t("li", "a list item", Action::ListItem, 1, 5),
    t("ul", "a bullet list", Action::UnorderedList, 10, 1),
    t("dir", "a directory list", Action::Nop, 5, 0),
    t("menu", "a menu", Action::Nop, 5, 0),
    t("ol", "a numbered list", Action::OrderedList, 10, 1),
    t("dl", "a definition list", Action::DefinitionList, 10, 1),
    t("hr", "a horizontal line", Action::Hr, 5, 4),
    t("form", "a form", Action::Form, 10, 1),
    t("button", "a button", Action::Input, 0, 4),
    t("frame", "a frame", Action::Frame, 2, 0),
    t("iframe", "a frame", Action::Frame, 2, 1),
    t("area", "an image map area", Action::Area, 0, 4),
    t("table", "a table", Action::Table, 10, 1),
    t("tbody", "a table body", Action::TableBody, 0, 1),
    t("tr", "a table row", Action::TableRow, 5, 1),
    t("td", "a table entry", Action::TableCell, 0, 5),
    t("th", "a table heading", Action::TableCell, 0, 5),
    t("pre", "a preformatted section", Action::Pre, 10, 0),
    t("listing", "a listing", Action::Pre, 1, 0),
    t("xmp", "an example", Action::Pre, 1, 0),
    t("fixed", "a fixed presentation", Action::Nop, 1, 0),
    t("code", "a block of code", Action::Nop, 0, 0),
    t("samp", "a block of sample text", Action::Nop, 0, 0),
    t("address", "an address block", Action::Nop, 1, 0),
    t("style", "a style block", Action::Nop, 0, 2),
    t("script", "a script", Action::Script, 0, 0),
    t("noscript", "no script section", Action::Nop, 0, 2),
    t("noframes", "no frames section", Action::Nop, 0, 2),
    t("embed", "embedded html", Action::Music, 0, 4),
    t("noembed", "no embed section", Action::Nop, 0, 2),
    t("em", "emphasized text", Action::JsVisible, 0, 0),
    t("label", "a label", Action::JsVisible, 0, 0),
    t("strike", "emphasized text", Action::JsVisible, 0, 0),
    t("s", "emphasized text", Action::JsVisible, 0, 0),
    t("strong", "emphasized text", Action::JsVisible, 0, 0),
    t("b", "bold text", Action::JsVisible, 0, 0),
    t("i", "italicized text", Action::JsVisible, 0, 0),
    t("u", "underlined text", Action::JsVisible, 0, 0),
    t("dfn", "definition text", Action::JsVisible, 0, 0),
    t("q", "quoted text", Action::JsVisible, 0, 0),
    t("abbr", "an abbreviation", Action::JsVisible, 0, 0),
    t("span", "an html span", Action::Span, 0, 1),
    t("frameset", "a frame set", Action::JsVisible, 0, 0),
];

const fn t(name: &'static str, desc: &'static str, action: Action, para: u8, hints: u8) -> TagInfo {
    TagInfo {
        name,
        desc,
        action,
        para,
        hints,
    }
}

/// Case-insensitive registry lookup. Unknown names degrade to the generic
/// object entry with a warning, matching how dynamically created nodes of
/// exotic names still participate in the tree.
pub fn tag_info(name: &str) -> &'static TagInfo {
    for ti in AVAILABLE_TAGS {
        if ti.name.eq_ignore_ascii_case(name) {
            return ti;
        }
    }
    log::debug!("warning, created node {name} reverts to generic");
    &AVAILABLE_TAGS[2]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_lookup_is_case_insensitive() {
        assert_eq!(tag_info("FORM").action, Action::Form);
        assert_eq!(tag_info("Th").action, Action::TableCell);
    }

    #[test]
    fn unknown_tags_degrade_to_generic_object() {
        assert_eq!(tag_info("blink").action, Action::HtmlObj);
    }

    #[test]
    fn input_type_resolution() {
        assert_eq!(resolve_input_type("RADIO"), InputType::Radio);
        // HTML5 types quietly become text
        assert_eq!(resolve_input_type("email"), InputType::Text);
        // unknown types noisily become text
        assert_eq!(resolve_input_type("blob"), InputType::Text);
    }

    #[test]
    fn span_classes() {
        assert_eq!(span_class_action("SUP"), Some(Action::Sup));
        assert_eq!(span_class_action("ovb"), Some(Action::Ovb));
        assert_eq!(span_class_action("big"), None);
    }

    #[test]
    fn ordering_of_input_types() {
        assert!(InputType::Submit < InputType::Hidden);
        assert!(InputType::Radio <= InputType::Radio);
        assert!(InputType::Checkbox > InputType::Radio);
    }
}
