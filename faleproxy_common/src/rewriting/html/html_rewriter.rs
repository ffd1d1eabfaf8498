use std::{borrow::Cow, cell::Cell, rc::Rc};

use anyhow::Context;
use lol_html::{
    doc_text, element,
    html_content::{ContentType, EndTag, TextType},
    Settings,
};

use crate::rewriting::{
    replacement::ReplacementRule,
    rewriter::{Rewritten, Rewriter},
};

/// Rewrites the visible text of an HTML document, leaving tags, attributes, comments and
/// script or style bodies byte-identical.
pub struct HtmlRewriter {
    rule: ReplacementRule,
}

/// Where a text node sits in the document, which decides what happens to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TextScope {
    /// The content of a `<title>` element. Rewritten, and the first one is reported back.
    Title,
    /// Character data a reader sees on the page. Rewritten.
    Visible,
    /// Script, style and other raw text. Untouched.
    Verbatim,
}

/// Open elements that change how text is classified. Shared with end tag handlers, which
/// must be `'static`.
///
/// Head and body are not tracked: both tags and their end tags are optional, and the only
/// character data a parser keeps in the head is whitespace or the title.
#[derive(Default)]
struct OpenElements {
    title: Cell<bool>,
}

impl OpenElements {
    fn classify(&self, text_type: TextType) -> TextScope {
        if !matches!(text_type, TextType::Data | TextType::RCData) {
            return TextScope::Verbatim;
        }

        if self.title.get() {
            TextScope::Title
        } else {
            TextScope::Visible
        }
    }
}

impl HtmlRewriter {
    pub fn new(rule: ReplacementRule) -> Self {
        Self { rule }
    }

    /// Applies the rule to the source of a text node, keeping its escaping.
    ///
    /// A token spelled with character references (`Y&#97;le`) only shows up once the text is
    /// decoded. In that case the node is decoded, rewritten and escaped again; otherwise the
    /// source bytes around each token are kept as they were, since the rule only swaps letters.
    fn rewrite_source<'a>(&self, source: &'a str) -> Cow<'a, str> {
        let rewritten = self.rule.apply(source);

        let revealed = match self
            .rule
            .apply(&html_escape::decode_html_entities(&rewritten))
        {
            Cow::Owned(text) => Some(text),
            Cow::Borrowed(_) => None,
        };

        match revealed {
            Some(text) => Cow::Owned(html_escape::encode_text(&text).into_owned()),
            None => rewritten,
        }
    }

    /// Rewrites a document that arrives in several pieces. Text nodes split across pieces are
    /// reassembled before the rule is applied, so a token on a boundary is still replaced.
    pub fn rewrite_chunks<'a, I>(&self, chunks: I) -> anyhow::Result<Rewritten>
    where
        I: IntoIterator<Item = &'a [u8]>,
    {
        let open = Rc::new(OpenElements::default());
        let mut pending = String::new();
        let mut title: Option<String> = None;
        let mut output = vec![];

        let mut rewriter = lol_html::HtmlRewriter::new(
            Settings {
                element_content_handlers: vec![element!("title", |el| {
                    open.title.set(true);

                    if let Some(handlers) = el.end_tag_handlers() {
                        let open = open.clone();
                        handlers.push(Box::new(move |_: &mut EndTag| {
                            open.title.set(false);
                            Ok(())
                        }));
                    }

                    Ok(())
                })],
                document_content_handlers: vec![doc_text!(|chunk| {
                    let scope = open.classify(chunk.text_type());

                    match scope {
                        TextScope::Verbatim => return Ok(()),
                        TextScope::Title | TextScope::Visible => {}
                    }

                    pending.push_str(chunk.as_str());

                    if !chunk.last_in_text_node() {
                        chunk.remove();
                        return Ok(());
                    }

                    let rewritten = self.rewrite_source(&pending);

                    if scope == TextScope::Title && title.is_none() {
                        title = Some(html_escape::decode_html_entities(&rewritten).into_owned());
                    }

                    chunk.replace(&rewritten, ContentType::Html);
                    pending.clear();

                    Ok(())
                })],
                // Never bail out on markup whose parse depends on the tree builder
                strict: false,
                ..Settings::default()
            },
            |c: &[u8]| output.extend_from_slice(c),
        );

        for chunk in chunks {
            rewriter.write(chunk).context("failed to parse the document")?;
        }

        rewriter.end().context("failed to finish rewriting the document")?;

        Ok(Rewritten {
            content: String::from_utf8(output).context("rewritten document is not valid UTF-8")?,
            title: title.unwrap_or_default(),
        })
    }
}

impl Default for HtmlRewriter {
    fn default() -> Self {
        Self::new(ReplacementRule::default())
    }
}

impl Rewriter for HtmlRewriter {
    fn rewrite(&self, input: &[u8]) -> anyhow::Result<Rewritten> {
        self.rewrite_chunks([input])
    }
}
