//! Markdown rendering service
//!
//! Blog posts are written in Markdown and stored alongside their rendered
//! HTML. Raw HTML in the source is escaped rather than passed through, so a
//! post can never inject markup into the page that displays it.
//!
//! # Example
//!
//! ```
//! use studyvault::services::markdown::MarkdownRenderer;
//!
//! let renderer = MarkdownRenderer::new();
//! let html = renderer.render("# Revision tips\n\nStart **early**.");
//! assert!(html.contains("<h1>"));
//! assert!(html.contains("<strong>"));
//! ```

use pulldown_cmark::{html, CodeBlockKind, Event, Options, Parser, Tag, TagEnd};

/// Markdown renderer supporting tables, strikethrough, task lists and
/// smart punctuation.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkdownRenderer;

impl MarkdownRenderer {
    pub fn new() -> Self {
        Self
    }

    fn options() -> Options {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TASKLISTS);
        options.insert(Options::ENABLE_SMART_PUNCTUATION);
        options
    }

    /// Renders Markdown text to HTML.
    ///
    /// Fenced code blocks get a `language-*` class for client-side
    /// highlighting.
    pub fn render(&self, markdown: &str) -> String {
        let parser = Parser::new_ext(markdown, Self::options());
        let events = self.process_events(parser);

        let mut html_output = String::new();
        html::push_html(&mut html_output, events.into_iter());
        html_output
    }

    /// Plain-text summary of a Markdown document, cut at a word boundary
    /// to at most `max_chars` characters (an ellipsis is appended when cut).
    pub fn excerpt(&self, markdown: &str, max_chars: usize) -> String {
        let mut text = String::new();
        for event in Parser::new_ext(markdown, Self::options()) {
            match event {
                Event::Text(t) | Event::Code(t) => text.push_str(&t),
                Event::SoftBreak
                | Event::HardBreak
                | Event::End(
                    TagEnd::Paragraph
                    | TagEnd::Heading(_)
                    | TagEnd::Item
                    | TagEnd::TableCell
                    | TagEnd::BlockQuote
                    | TagEnd::CodeBlock,
                ) => text.push(' '),
                _ => {}
            }
        }
        let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
        truncate_words(&collapsed, max_chars)
    }

    fn process_events<'a>(&self, parser: Parser<'a>) -> Vec<Event<'a>> {
        let mut events = Vec::new();
        let mut in_code_block = false;
        let mut code_lang: Option<String> = None;
        let mut code_content = String::new();

        for event in parser {
            match event {
                Event::Start(Tag::CodeBlock(kind)) => {
                    in_code_block = true;
                    code_content.clear();
                    code_lang = match kind {
                        CodeBlockKind::Fenced(lang) if !lang.trim().is_empty() => {
                            Some(lang.trim().to_string())
                        }
                        _ => None,
                    };
                }
                Event::End(TagEnd::CodeBlock) => {
                    in_code_block = false;
                    let block = match code_lang.take() {
                        Some(lang) => format!(
                            "<pre><code class=\"language-{}\">{}</code></pre>",
                            html_escape(&lang),
                            html_escape(&code_content)
                        ),
                        None => format!("<pre><code>{}</code></pre>", html_escape(&code_content)),
                    };
                    events.push(Event::Html(block.into()));
                }
                Event::Text(text) if in_code_block => code_content.push_str(&text),
                // Raw HTML is shown as text
                Event::Html(raw) | Event::InlineHtml(raw) => events.push(Event::Text(raw)),
                _ => events.push(event),
            }
        }

        events
    }
}

fn truncate_words(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let budget = max_chars.saturating_sub(1);
    let cut: String = text.chars().take(budget).collect();
    let trimmed = match cut.rfind(' ') {
        Some(pos) if pos > 0 => &cut[..pos],
        _ => cut.as_str(),
    };
    format!("{}…", trimmed.trim_end())
}

/// Escapes HTML special characters in a string.
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}
