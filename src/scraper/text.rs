// src/scraper/text.rs
//
// Browser-style text extraction. The label heuristics ("Utilities: ...")
// capture to end of line, so block boundaries must become newlines rather
// than collapsing the whole document onto one line.

use ::scraper::{ElementRef, Html, Node};

const BLOCK_TAGS: [&str; 22] = [
    "p", "div", "li", "ul", "ol", "h1", "h2", "h3", "h4", "h5", "h6", "br", "tr", "table",
    "section", "article", "header", "footer", "main", "aside", "nav", "blockquote",
];

/// Visible text of the whole document, one line per block element.
pub(crate) fn document_text(doc: &Html) -> String {
    element_text(doc.root_element())
}

/// Visible text of one element subtree, whitespace-normalized.
pub(crate) fn element_text(el: ElementRef) -> String {
    let mut out = String::new();
    collect(el, &mut out);
    out.trim().to_string()
}

fn collect(el: ElementRef, out: &mut String) {
    for child in el.children() {
        match child.value() {
            Node::Text(t) => {
                let words: Vec<&str> = t.split_whitespace().collect();
                if !words.is_empty() {
                    if !out.is_empty() && !out.ends_with(['\n', ' ']) {
                        out.push(' ');
                    }
                    out.push_str(&words.join(" "));
                }
            }
            Node::Element(e) => {
                let name = e.name();
                if name == "script" || name == "style" {
                    continue;
                }
                let block = BLOCK_TAGS.contains(&name);
                if block && !out.is_empty() && !out.ends_with('\n') {
                    out.push('\n');
                }
                if let Some(child_el) = ElementRef::wrap(child) {
                    collect(child_el, out);
                }
                if block && !out.is_empty() && !out.ends_with('\n') {
                    out.push('\n');
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocks_become_lines_and_inline_text_joins() {
        let doc = Html::parse_document(
            "<div><p>Utilities: included</p><p>Parking: <b>street</b> only</p><script>var x=1;</script></div>",
        );
        let text = document_text(&doc);
        assert_eq!(text, "Utilities: included\nParking: street only");
    }

    #[test]
    fn element_text_normalizes_whitespace() {
        let doc = Html::parse_fragment("<span>  2 bed,\n   1 bath </span>");
        assert_eq!(element_text(doc.root_element()), "2 bed, 1 bath");
    }
}
