//! One browsed document: the node arena, the scripting engine, and the
//! frame contexts that nested frames push and pop around their own
//! ingestion. The tokenizer stays outside; batches of tokens come in and
//! run the whole pipeline, build, repair, prerender, decorate.

use core_types::FrameId;
use dom::{
    Decorator, DocumentHooks, Id, Node, NodeArena, TagToken, append_tokens, build_tree, decorate,
    prepare_document, prerender,
};
use js::{Engine, Obj, Value};
use net::{FetchRequest, Prompter, Transfer, TransferError};
use url::Url;

use crate::context::FrameContext;

pub struct Document<E: Engine> {
    pub arena: NodeArena,
    pub engine: E,
    context: FrameContext,
    /// Enclosing contexts while a nested frame ingests its content.
    saved: Vec<FrameContext>,
    /// Contexts of frames already expanded, for later inspection.
    inner_frames: Vec<FrameContext>,
    next_frame: FrameId,
    /// Textarea text, addressed by 1-based handle, shared by all frames.
    side_buffers: Vec<String>,
}

/// Adapter handing prerender's callbacks to the right owner: meta capture
/// belongs to the current frame, side buffers to the whole document.
struct IngestHooks<'a> {
    context: &'a mut FrameContext,
    buffers: &'a mut Vec<String>,
}

impl DocumentHooks for IngestHooks<'_> {
    fn meta_tag(&mut self, node: &Node) {
        self.context.capture_meta(node);
    }

    fn side_buffer(&mut self, text: &str) -> Option<usize> {
        self.buffers.push(text.to_string());
        Some(self.buffers.len())
    }
}

impl<E: Engine> Document<E> {
    /// A fresh top-level document around existing window and document
    /// objects. An engine failure preparing the registries is logged;
    /// decoration then degrades node by node rather than aborting.
    pub fn new(mut engine: E, win: Obj, doc: Obj, base: Option<Url>) -> Self {
        if prepare_document(&mut engine, win, doc).is_none() {
            log::warn!("cannot prepare the document object");
        }
        Document {
            arena: NodeArena::new(),
            engine,
            context: FrameContext::new(0, win, doc, base),
            saved: Vec::new(),
            inner_frames: Vec::new(),
            next_frame: 1,
            side_buffers: Vec::new(),
        }
    }

    pub fn context(&self) -> &FrameContext {
        &self.context
    }

    pub fn title(&self) -> Option<&str> {
        self.context.title.as_deref()
    }

    /// The current frame's meta refresh directive, if its markup had one.
    pub fn refresh(&self) -> Option<&str> {
        self.context.refresh.as_deref()
    }

    /// Textarea text by the handle stored on its node.
    pub fn side_buffer_text(&self, handle: usize) -> Option<&str> {
        self.side_buffers
            .get(handle.checked_sub(1)?)
            .map(String::as_str)
    }

    pub fn side_buffer_count(&self) -> usize {
        self.side_buffers.len()
    }

    /// Context of an expanded frame.
    pub fn frame_context(&self, frame: FrameId) -> Option<&FrameContext> {
        self.inner_frames.iter().find(|c| c.frame == frame)
    }

    /// Run the pipeline over one batch of tokens. Returns the id of the
    /// batch's first node. `attach` roots the new content under an
    /// existing node, as for a frame's payload.
    pub fn ingest(&mut self, tokens: Vec<TagToken>, attach: Option<Id>, generated: bool) -> Id {
        self.run_pipeline(tokens, attach, generated, None)
    }

    /// innerHTML / document.write re-entry. The fragment's roots land
    /// under `attach` in the tree; parentless roots mirror under
    /// `inner_parent` in the object graph.
    pub fn inject_generated_html(
        &mut self,
        tokens: Vec<TagToken>,
        attach: Option<Id>,
        inner_parent: Option<Obj>,
    ) -> Id {
        self.run_pipeline(tokens, attach, true, inner_parent)
    }

    fn run_pipeline(
        &mut self,
        tokens: Vec<TagToken>,
        attach: Option<Id>,
        generated: bool,
        inner_parent: Option<Obj>,
    ) -> Id {
        let start = append_tokens(&mut self.arena, tokens, self.context.frame);
        build_tree(
            &mut self.arena,
            start,
            attach,
            generated,
            &mut self.context.base,
        );
        let mut hooks = IngestHooks {
            context: &mut self.context,
            buffers: &mut self.side_buffers,
        };
        let outcome = prerender(&mut self.arena, start, &mut hooks);
        if self.context.title.is_none() {
            self.context.title = outcome.title;
        }
        let mut dec = Decorator::new(
            &mut self.engine,
            self.context.win,
            self.context.doc,
            self.context.frame,
            inner_parent,
            self.context.title.clone(),
        );
        decorate(&mut self.arena, start, &mut dec);
        start
    }

    /// Expand a frame in place: fetch its source, push a fresh context,
    /// ingest the payload attached under the frame node, restore. A frame
    /// expanded before just comes back on screen. Returns false when the
    /// frame has nothing to show.
    pub fn expand_frame<F>(
        &mut self,
        frame_node: Id,
        transfer: &mut Transfer,
        prompter: &mut dyn Prompter,
        tokenize: F,
    ) -> Result<bool, TransferError>
    where
        F: Fn(&str) -> Vec<TagToken>,
    {
        if self.arena[frame_node].firstchild.is_some() {
            self.arena[frame_node].contracted = false;
            return Ok(true);
        }
        let Some(src) = self.arena[frame_node].href.clone() else {
            log::debug!("frame has no source");
            return Ok(false);
        };

        let mut req = FetchRequest::new(self.context.base.resolve(&src));
        req.referrer = self.context.base.url().map(|u| u.to_string());
        let outcome = transfer.fetch(&req, prompter)?;
        let html = String::from_utf8_lossy(&outcome.body).into_owned();

        let frame = self.next_frame;
        self.next_frame += 1;
        let Some((win, doc)) = self.frame_objects(frame) else {
            log::warn!("cannot create the frame's window");
            return Ok(false);
        };

        let base = Url::parse(&outcome.final_url).ok();
        let fresh = FrameContext::new(frame, win, doc, base);
        self.saved.push(std::mem::replace(&mut self.context, fresh));
        self.ingest(tokenize(&html), Some(frame_node), false);
        let inner = match self.saved.pop() {
            Some(caller) => std::mem::replace(&mut self.context, caller),
            // the push above pairs with this pop
            None => return Ok(true),
        };

        if let Some(fj) = self.arena[frame_node].js {
            let _ = self
                .engine
                .set_property(fj, "contentDocument", Value::Object(inner.doc));
            let _ = self
                .engine
                .set_property(fj, "contentWindow", Value::Object(inner.win));
        }
        self.arena[frame_node].contracted = false;
        self.inner_frames.push(inner);
        Ok(true)
    }

    /// Take a frame off screen. Its tree and objects stay for the next
    /// expand.
    pub fn contract_frame(&mut self, frame_node: Id) {
        self.arena[frame_node].contracted = true;
    }

    fn frame_objects(&mut self, frame: FrameId) -> Option<(Obj, Obj)> {
        let name = format!("frame{frame}$win");
        let win = self
            .engine
            .instantiate(self.context.win, &name, Some("Window"))?;
        let doc = self.engine.instantiate(win, "document", Some("Document"))?;
        prepare_document(&mut self.engine, win, doc)?;
        Some((win, doc))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use js::mock::MockEngine;
    use net::{FtpPayload, FtpTransport, NetConfig, PluginRegistry, SilentPrompter};
    use std::cell::Cell;
    use std::rc::Rc;

    fn new_doc() -> Document<MockEngine> {
        let mut eng = MockEngine::new();
        let win = eng.root("Window");
        let doc = eng.root("Document");
        Document::new(eng, win, doc, Url::parse("http://x.example.com/").ok())
    }

    #[test]
    fn ingest_builds_decorates_and_titles() {
        let mut d = new_doc();
        let start = d.ingest(
            vec![
                TagToken::open("html"),
                TagToken::open("title"),
                TagToken::text("  My   Page "),
                TagToken::close("title"),
                TagToken::open("body"),
                TagToken::open("div").attr("id", "main"),
                TagToken::close("div"),
                TagToken::close("body"),
                TagToken::close("html"),
            ],
            None,
            false,
        );
        assert_eq!(start, Id(0));
        assert_eq!(d.title(), Some("My Page"));
        // the div is mirrored into the object graph
        let div = Id(5);
        assert_eq!(d.arena[div].info.name, "div");
        assert!(d.arena[div].js.is_some());
    }

    #[test]
    fn generated_fragments_attach_under_their_node() {
        let mut d = new_doc();
        let start = d.ingest(
            vec![
                TagToken::open("body"),
                TagToken::open("div"),
                TagToken::close("div"),
                TagToken::close("body"),
            ],
            None,
            false,
        );
        let div = Id(start.0 + 1);
        assert_eq!(d.arena[div].info.name, "div");

        let p = d.inject_generated_html(
            vec![
                TagToken::open("p"),
                TagToken::text("hi"),
                TagToken::close("p"),
            ],
            Some(div),
            None,
        );
        assert_eq!(d.arena[p].parent, Some(div));
        let dj = d.arena[div].js.unwrap();
        let pj = d.arena[p].js.unwrap();
        assert!(d.engine.object(dj).children.contains(&pj));
    }

    #[test]
    fn parentless_generated_roots_mirror_under_inner_parent() {
        let mut d = new_doc();
        let target = d.engine.root("Element");
        let p = d.inject_generated_html(
            vec![
                TagToken::open("p"),
                TagToken::text("written"),
                TagToken::close("p"),
            ],
            None,
            Some(target),
        );
        let pj = d.arena[p].js.unwrap();
        assert!(d.engine.object(target).children.contains(&pj));
    }

    #[test]
    fn textarea_text_lands_in_a_side_buffer() {
        let mut d = new_doc();
        let start = d.ingest(
            vec![
                TagToken::open("body"),
                TagToken::open("textarea").attr("name", "msg"),
                TagToken::text("line one"),
                TagToken::close("textarea"),
                TagToken::close("body"),
            ],
            None,
            false,
        );
        let ta = Id(start.0 + 1);
        assert_eq!(d.arena[ta].side_buffer, Some(1));
        assert_eq!(d.side_buffer_text(1), Some("line one\n"));
        assert_eq!(d.side_buffer_count(), 1);
    }

    #[test]
    fn meta_refresh_is_captured_once() {
        let mut d = new_doc();
        d.ingest(
            vec![
                TagToken::open("head"),
                TagToken::open("meta")
                    .attr("http-equiv", "Refresh")
                    .attr("content", "3;url=/next"),
                TagToken::open("meta")
                    .attr("http-equiv", "refresh")
                    .attr("content", "9;url=/later"),
                TagToken::close("head"),
            ],
            None,
            false,
        );
        assert_eq!(d.refresh(), Some("3;url=/next"));
    }

    struct OnePageFtp {
        body: &'static str,
        fetches: Rc<Cell<usize>>,
    }

    impl FtpTransport for OnePageFtp {
        fn retrieve(
            &mut self,
            _url: &Url,
            _user: &str,
            _pass: &str,
        ) -> Result<FtpPayload, TransferError> {
            self.fetches.set(self.fetches.get() + 1);
            Ok(FtpPayload::File(self.body.as_bytes().to_vec()))
        }

        fn list(&mut self, _url: &Url, _user: &str, _pass: &str) -> Result<String, TransferError> {
            Ok(String::new())
        }
    }

    #[test]
    fn frames_expand_and_contract() {
        let mut d = new_doc();
        let start = d.ingest(
            vec![
                TagToken::open("frameset"),
                TagToken::open("frame").attr("src", "ftp://files.example.com/inner.html"),
                TagToken::close("frameset"),
            ],
            None,
            false,
        );
        let frame = Id(start.0 + 1);
        assert_eq!(d.arena[frame].info.name, "frame");
        assert!(d.arena[frame].js.is_some());

        let fetches = Rc::new(Cell::new(0));
        let mut transfer =
            Transfer::new(NetConfig::default(), PluginRegistry::default()).with_ftp(Box::new(
                OnePageFtp {
                    body: "<html><title>Inner</title><body><p>hello</p></body></html>",
                    fetches: fetches.clone(),
                },
            ));
        let tokenize = |_html: &str| {
            vec![
                TagToken::open("html"),
                TagToken::open("title"),
                TagToken::text("Inner"),
                TagToken::close("title"),
                TagToken::open("body"),
                TagToken::open("p"),
                TagToken::text("hello"),
                TagToken::close("p"),
                TagToken::close("body"),
                TagToken::close("html"),
            ]
        };

        let expanded = d
            .expand_frame(frame, &mut transfer, &mut SilentPrompter, tokenize)
            .unwrap();
        assert!(expanded);
        assert!(!d.arena[frame].contracted);
        assert_eq!(fetches.get(), 1);

        // the payload hangs under the frame node, in its own frame
        let inner_root = d.arena[frame].firstchild.unwrap();
        assert_eq!(d.arena[inner_root].frame, 1);
        assert_eq!(
            d.frame_context(1).and_then(|c| c.title.as_deref()),
            Some("Inner")
        );
        // the outer document keeps its own context
        assert_eq!(d.context().frame, 0);
        assert_eq!(d.title(), None);

        let fj = d.arena[frame].js.unwrap();
        assert!(d.engine.prop_obj(fj, "contentDocument").is_some());
        assert!(d.engine.prop_obj(fj, "contentWindow").is_some());

        d.contract_frame(frame);
        assert!(d.arena[frame].contracted);

        // re-expansion is instant, no second fetch
        let again = d
            .expand_frame(frame, &mut transfer, &mut SilentPrompter, |_| Vec::new())
            .unwrap();
        assert!(again);
        assert!(!d.arena[frame].contracted);
        assert_eq!(fetches.get(), 1);
    }

    #[test]
    fn a_frame_without_a_source_stays_put() {
        let mut d = new_doc();
        let start = d.ingest(
            vec![
                TagToken::open("frameset"),
                TagToken::open("frame"),
                TagToken::close("frameset"),
            ],
            None,
            false,
        );
        let frame = Id(start.0 + 1);
        let mut transfer = Transfer::new(NetConfig::default(), PluginRegistry::default());
        let expanded = d
            .expand_frame(frame, &mut transfer, &mut SilentPrompter, |_| Vec::new())
            .unwrap();
        assert!(!expanded);
        assert!(d.arena[frame].firstchild.is_none());
    }
}
