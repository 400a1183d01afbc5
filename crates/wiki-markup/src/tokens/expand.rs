//! Token reinsertion into rendered HTML.

use super::{Replacements, Token, TokenKind, TokenSet, TokenTable};
use crate::escape::escape_html;
use crate::toc;

/// Replace every placeholder in `html` with its token's rendered form.
///
/// The table of contents goes in first, so placeholders inside heading text
/// are expanded inside the ToC entries too. Named tokens follow, then
/// pass-through text. Block-level tokens (the ToC and block pass-through)
/// replace the paragraph the grammar wrapped around their placeholder.
///
/// Unknown tokens and renderer failures emit the escaped source text. A
/// placeholder that ended up inside a tag gets the escaped
/// [`literal`](super::Token::literal) text of its token, never rendered HTML.
pub fn expand(tokens: &TokenSet, html: &str, table: &TokenTable) -> String {
    if tokens.is_empty() {
        return html.to_owned();
    }

    let mut html = html.to_owned();
    let mut replacements = Replacements::default();

    if tokens.has_toc() {
        let (with_ids, headings) = toc::assign_heading_ids(&html);
        html = with_ids;
        let toc_html = toc::render_toc(&headings);
        for (index, token) in indexed(tokens, TokenKind::TableOfContents) {
            let in_tag = escape_html(token.literal());
            replacements.block(&tokens.placeholder(index), &toc_html, &in_tag);
        }
    }

    for (index, token) in indexed(tokens, TokenKind::Named) {
        replacements.inline(
            &tokens.placeholder(index),
            render_named(token, table),
            escape_html(token.literal()),
        );
    }

    for (index, token) in indexed(tokens, TokenKind::BlockPassThrough) {
        let pre = format!("<pre>{}</pre>", escape_html(&token.raw_body));
        let in_tag = escape_html(token.literal());
        replacements.block(&tokens.placeholder(index), &pre, &in_tag);
    }

    for (index, token) in indexed(tokens, TokenKind::InlinePassThrough) {
        let text = escape_html(&token.raw_body);
        replacements.inline(&tokens.placeholder(index), text.clone(), text);
    }

    replacements.apply(html)
}

fn indexed(tokens: &TokenSet, kind: TokenKind) -> impl Iterator<Item = (usize, &Token)> {
    tokens
        .tokens()
        .iter()
        .enumerate()
        .filter(move |(_, token)| token.kind == kind)
}

fn render_named(token: &Token, table: &TokenTable) -> String {
    let Some(renderer) = table.get(&token.name) else {
        tracing::debug!(token = %token.name, "Unknown token, emitting source text");
        return escape_html(&token.source);
    };

    match renderer.render(&token.raw_body) {
        Ok(html) => html,
        Err(error) => {
            tracing::warn!(token = %token.name, %error, "Token renderer failed, emitting source text");
            escape_html(&token.source)
        }
    }
}
