//! Markdown to Telegram HTML.
//!
//! [`format_message`] is re-run on every growing prefix of a streamed answer, so it must produce
//! valid, balanced markup for any input: unterminated markers stay literal, raw HTML is escaped,
//! and every tag opened is closed.

use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag};

/// Link schemes Telegram accepts in `<a href>`; anything else renders as plain text.
const ALLOWED_SCHEMES: [&str; 4] = ["http://", "https://", "tg://", "mailto:"];

/// Converts model output (markdown) to Telegram-flavoured HTML.
pub fn format_message(buffer: &str) -> String {
    let mut renderer = HtmlRenderer::new(buffer.len());
    for event in Parser::new_ext(buffer, Options::ENABLE_STRIKETHROUGH) {
        renderer.event(event);
    }
    renderer.finish()
}

/// Escapes `&`, `<`, `>` for text content.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    push_escaped(&mut out, text, false);
    out
}

fn push_escaped(out: &mut String, text: &str, attribute: bool) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
}

fn is_allowed_link(url: &str) -> bool {
    let lower = url.trim().to_ascii_lowercase();
    ALLOWED_SCHEMES.iter().any(|s| lower.starts_with(s))
}

/// What to emit when the matching end event arrives.
enum Close {
    Nothing,
    Tag(&'static str),
    Heading,
    CodeBlock,
    BlockQuote,
    Paragraph,
    List,
    Item,
}

struct HtmlRenderer {
    out: String,
    open: Vec<Close>,
    /// One entry per open list: next number for ordered lists, `None` for bullets.
    lists: Vec<Option<u64>>,
}

impl HtmlRenderer {
    fn new(capacity: usize) -> Self {
        Self {
            out: String::with_capacity(capacity + capacity / 4),
            open: Vec::new(),
            lists: Vec::new(),
        }
    }

    fn text(&mut self, text: &str) {
        push_escaped(&mut self.out, text, false);
    }

    fn ensure_newline(&mut self) {
        if !self.out.is_empty() && !self.out.ends_with('\n') {
            self.out.push('\n');
        }
    }

    fn trim_trailing_newlines(&mut self) {
        let len = self.out.trim_end_matches('\n').len();
        self.out.truncate(len);
    }

    fn event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => {
                let close = self.start(tag);
                self.open.push(close);
            }
            Event::End(_) => {
                if let Some(close) = self.open.pop() {
                    self.end(close);
                }
            }
            Event::Text(t) => self.text(&t),
            Event::Code(t) => {
                self.out.push_str("<code>");
                self.text(&t);
                self.out.push_str("</code>");
            }
            Event::Html(t) | Event::InlineHtml(t) => self.text(&t),
            Event::SoftBreak | Event::HardBreak => self.out.push('\n'),
            Event::Rule => {
                self.ensure_newline();
                self.out.push_str("——————\n\n");
            }
            Event::TaskListMarker(done) => self.out.push_str(if done { "[x] " } else { "[ ] " }),
            Event::FootnoteReference(t) => {
                self.out.push('[');
                self.text(&t);
                self.out.push(']');
            }
            _ => {}
        }
    }

    fn start(&mut self, tag: Tag<'_>) -> Close {
        match tag {
            Tag::Paragraph => Close::Paragraph,
            Tag::Heading { .. } => {
                self.out.push_str("<b>");
                Close::Heading
            }
            Tag::BlockQuote(_) => {
                self.out.push_str("<blockquote>");
                Close::BlockQuote
            }
            Tag::CodeBlock(kind) => {
                let lang = match kind {
                    CodeBlockKind::Fenced(info) => info
                        .split_whitespace()
                        .next()
                        .map(str::to_string)
                        .unwrap_or_default(),
                    CodeBlockKind::Indented => String::new(),
                };
                if lang.is_empty() {
                    self.out.push_str("<pre><code>");
                } else {
                    self.out.push_str("<pre><code class=\"language-");
                    push_escaped(&mut self.out, &lang, true);
                    self.out.push_str("\">");
                }
                Close::CodeBlock
            }
            Tag::List(start) => {
                if !self.lists.is_empty() {
                    self.ensure_newline();
                }
                self.lists.push(start);
                Close::List
            }
            Tag::Item => {
                self.ensure_newline();
                let depth = self.lists.len().saturating_sub(1);
                self.out.push_str(&"  ".repeat(depth));
                match self.lists.last_mut() {
                    Some(Some(n)) => {
                        self.out.push_str(&format!("{}. ", n));
                        *n += 1;
                    }
                    _ => self.out.push_str("• "),
                }
                Close::Item
            }
            Tag::Emphasis => {
                self.out.push_str("<i>");
                Close::Tag("</i>")
            }
            Tag::Strong => {
                self.out.push_str("<b>");
                Close::Tag("</b>")
            }
            Tag::Strikethrough => {
                self.out.push_str("<s>");
                Close::Tag("</s>")
            }
            Tag::Link { dest_url, .. } if is_allowed_link(&dest_url) => {
                self.out.push_str("<a href=\"");
                push_escaped(&mut self.out, dest_url.trim(), true);
                self.out.push_str("\">");
                Close::Tag("</a>")
            }
            _ => Close::Nothing,
        }
    }

    fn end(&mut self, close: Close) {
        match close {
            Close::Nothing => {}
            Close::Tag(t) => self.out.push_str(t),
            Close::Heading => self.out.push_str("</b>\n\n"),
            Close::Paragraph => {
                if self.lists.is_empty() {
                    self.out.push_str("\n\n");
                } else {
                    self.ensure_newline();
                }
            }
            Close::CodeBlock => self.out.push_str("</code></pre>\n\n"),
            Close::BlockQuote => {
                self.trim_trailing_newlines();
                self.out.push_str("</blockquote>\n\n");
            }
            Close::Item => self.ensure_newline(),
            Close::List => {
                self.lists.pop();
                if self.lists.is_empty() {
                    self.out.push('\n');
                }
            }
        }
    }

    fn finish(mut self) -> String {
        while let Some(close) = self.open.pop() {
            self.end(close);
        }
        let len = self.out.trim_end().len();
        self.out.truncate(len);
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Checks that every tag is closed in order and no raw `<`, `>` or bare `&` leaks from text.
    fn assert_balanced(html: &str) {
        let mut stack: Vec<String> = Vec::new();
        let mut rest = html;
        while let Some(i) = rest.find(|c| c == '<' || c == '>' || c == '&') {
            let tail = &rest[i..];
            match tail.as_bytes()[0] {
                b'<' => {
                    let end = tail.find('>').unwrap_or_else(|| panic!("unclosed tag in {:?}", html));
                    let inner = &tail[1..end];
                    assert!(!inner.contains('<'), "raw '<' inside tag in {:?}", html);
                    if let Some(name) = inner.strip_prefix('/') {
                        assert_eq!(stack.pop().as_deref(), Some(name), "mismatched close in {:?}", html);
                    } else {
                        let name = inner.split_whitespace().next().unwrap_or_default();
                        stack.push(name.to_string());
                    }
                    rest = &tail[end + 1..];
                }
                b'&' => {
                    assert!(
                        ["&amp;", "&lt;", "&gt;", "&quot;"].iter().any(|e| tail.starts_with(e)),
                        "bare '&' in {:?}",
                        html
                    );
                    rest = &tail[1..];
                }
                _ => panic!("raw '>' in text of {:?}", html),
            }
        }
        assert!(stack.is_empty(), "unclosed tags {:?} in {:?}", stack, html);
    }

    #[test]
    fn test_plain_text() {
        assert_eq!(format_message("Hello"), "Hello");
        assert_eq!(format_message(""), "");
    }

    #[test]
    fn test_inline_styles() {
        assert_eq!(
            format_message("**bold** __also__ *it* _it2_ ~~gone~~ `x<y`"),
            "<b>bold</b> <b>also</b> <i>it</i> <i>it2</i> <s>gone</s> <code>x&lt;y</code>"
        );
    }

    #[test]
    fn test_raw_html_is_escaped() {
        assert_eq!(
            format_message("use <b>tags</b> & stuff"),
            "use &lt;b&gt;tags&lt;/b&gt; &amp; stuff"
        );
        assert_eq!(format_message("<div>\nblock\n</div>"), "&lt;div&gt;\nblock\n&lt;/div&gt;");
    }

    #[test]
    fn test_unterminated_markers_stay_literal() {
        assert_eq!(format_message("**bol"), "**bol");
        assert_eq!(format_message("some `code"), "some `code");
        assert_eq!(format_message("[link](http://x"), "[link](http://x");
    }

    #[test]
    fn test_code_block_with_language() {
        assert_eq!(
            format_message("```rust\nfn main() { a < b }\n```"),
            "<pre><code class=\"language-rust\">fn main() { a &lt; b }\n</code></pre>"
        );
        let partial = format_message("intro\n\n```py\nx = 1");
        assert!(partial.starts_with("intro\n\n<pre><code class=\"language-py\">x = 1"));
        assert!(partial.ends_with("</code></pre>"));
    }

    #[test]
    fn test_links() {
        assert_eq!(
            format_message("[site](https://example.com/?a=1&b=2)"),
            "<a href=\"https://example.com/?a=1&amp;b=2\">site</a>"
        );
        assert_eq!(format_message("[x](javascript:alert(1))"), "x");
        assert_eq!(
            format_message("[me](tg://user?id=1)"),
            "<a href=\"tg://user?id=1\">me</a>"
        );
    }

    #[test]
    fn test_headings_lists_quotes() {
        assert_eq!(format_message("# Title\n\nbody"), "<b>Title</b>\n\nbody");
        assert_eq!(format_message("- a\n- b"), "• a\n• b");
        assert_eq!(format_message("1. x\n2. y"), "1. x\n2. y");
        assert_eq!(format_message("3. x\n4. y"), "3. x\n4. y");
        assert_eq!(format_message("- a\n  - b"), "• a\n  • b");
        assert_eq!(format_message("> quoted"), "<blockquote>quoted</blockquote>");
        assert_eq!(format_message("- a\n\nafter"), "• a\n\nafter");
    }

    #[test]
    fn test_every_prefix_is_balanced() {
        let doc = "# Plan & <goals>\n\nSome **bold _nested_ text** and `code`.\n\n\
                   - item [link](https://a.b/?q=\"1\")\n- ~~old~~ *new*\n  1. sub\n\n\
                   > quote with <html>\n\n```rust\nlet x = a < b && c > d;\n```\n\nDone.";
        for (i, _) in doc.char_indices() {
            assert_balanced(&format_message(&doc[..i]));
        }
        assert_balanced(&format_message(doc));
    }
}
