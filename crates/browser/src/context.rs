//! Per-frame document state. Every frame, the top window included, gets
//! its own base url, window and document objects, and the capture slots
//! prerender reports into.

use core_types::FrameId;
use dom::{DocumentBase, Node};
use js::Obj;
use url::Url;

pub struct FrameContext {
    pub frame: FrameId,
    pub win: Obj,
    pub doc: Obj,
    pub base: DocumentBase,
    /// First title seen in this frame's markup.
    pub title: Option<String>,
    /// Raw `N;url=target` text of the first meta refresh directive.
    pub refresh: Option<String>,
}

impl FrameContext {
    pub fn new(frame: FrameId, win: Obj, doc: Obj, base: Option<Url>) -> Self {
        FrameContext {
            frame,
            win,
            doc,
            base: DocumentBase::new(base),
            title: None,
            refresh: None,
        }
    }

    /// A meta tag crossed during prerender. Only the refresh directive
    /// matters to the browsing loop; the first one wins.
    pub fn capture_meta(&mut self, node: &Node) {
        let Some(equiv) = node.attrib_val("http-equiv") else {
            return;
        };
        if !equiv.eq_ignore_ascii_case("refresh") {
            return;
        }
        if let Some(content) = node.attrib_val("content") {
            log::debug!("meta refresh {content}");
            if self.refresh.is_none() {
                self.refresh = Some(content.to_string());
            }
        }
    }
}
