//! Readers for the rendered HTML fragment carried by each implementor record.
//!
//! The generator emits a narrow, regular subset of HTML (anchors with
//! `class`/`href`/`title`, entity-escaped generics), so a scanner is enough;
//! anything unexpected is passed through rather than rejected.

use crate::index::identity::ItemKind;

#[derive(Clone, Debug, Eq, PartialEq)]
/// One `<a class=.. href=.. title=..>label</a>` cross-link.
pub struct CrossLink {
    pub kind: ItemKind,
    pub href: String,
    pub title: Option<String>,
    pub label: String,
}

impl CrossLink {
    pub fn is_external(&self) -> bool {
        is_external(&self.href)
    }
}

/// Absolute links point at other documentation sites; the rest are page-relative.
pub fn is_external(href: &str) -> bool {
    href.starts_with("http://") || href.starts_with("https://")
}

/// Collect every anchor in `text`, in document order.
pub fn links(text: &str) -> Vec<CrossLink> {
    let mut found = Vec::new();
    let mut rest = text;
    while let Some(start) = rest.find("<a ") {
        let after_open = &rest[start + 3..];
        let Some(tag_end) = after_open.find('>') else {
            break;
        };
        let attrs = &after_open[..tag_end];
        let body = &after_open[tag_end + 1..];
        let Some(close) = body.find("</a>") else {
            break;
        };

        if let Some(href) = attribute(attrs, "href") {
            found.push(CrossLink {
                kind: ItemKind::from_class(&attribute(attrs, "class").unwrap_or_default()),
                href,
                title: attribute(attrs, "title"),
                label: plain_text(&body[..close]),
            });
        }
        rest = &body[close + 4..];
    }
    found
}

/// Strip tags and decode the entities the generator escapes.
pub fn plain_text(text: &str) -> String {
    let mut stripped = String::with_capacity(text.len());
    let mut in_tag = false;
    for ch in text.chars() {
        match ch {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => stripped.push(ch),
            _ => {}
        }
    }
    decode_entities(&stripped)
}

fn decode_entities(text: &str) -> String {
    const ENTITIES: &[(&str, &str)] = &[
        ("&lt;", "<"),
        ("&gt;", ">"),
        ("&quot;", "\""),
        ("&#39;", "'"),
        ("&#x27;", "'"),
        ("&nbsp;", " "),
        ("&amp;", "&"),
    ];

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    'scan: while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        let candidate = &rest[pos..];
        for (entity, replacement) in ENTITIES {
            if let Some(tail) = candidate.strip_prefix(entity) {
                out.push_str(replacement);
                rest = tail;
                continue 'scan;
            }
        }
        out.push('&');
        rest = &candidate[1..];
    }
    out.push_str(rest);
    out
}

fn attribute(attrs: &str, name: &str) -> Option<String> {
    let needle = format!("{name}=\"");
    let mut search = attrs;
    loop {
        let pos = search.find(&needle)?;
        // Reject matches inside longer names (`data-href=`).
        let boundary = pos == 0 || search[..pos].ends_with(char::is_whitespace);
        let value_start = &search[pos + needle.len()..];
        let end = value_start.find('"')?;
        if boundary {
            return Some(decode_entities(&value_start[..end]));
        }
        search = &value_start[end + 1..];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DESERIALIZE_ROW: &str = "impl&lt;'de&gt; <a class=\"trait\" href=\"https://docs.rs/serde/1.0.104/serde/de/trait.Deserialize.html\" title=\"trait serde::de::Deserialize\">Deserialize</a>&lt;'de&gt; for <a class=\"enum\" href=\"wasmer_runtime/enum.Backend.html\" title=\"enum wasmer_runtime::Backend\">Backend</a>";

    #[test]
    fn extracts_links_in_order() {
        let found = links(DESERIALIZE_ROW);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].kind, ItemKind::Trait);
        assert!(found[0].is_external());
        assert_eq!(found[0].label, "Deserialize");
        assert_eq!(
            found[0].title.as_deref(),
            Some("trait serde::de::Deserialize")
        );
        assert_eq!(found[1].kind, ItemKind::Enum);
        assert_eq!(found[1].href, "wasmer_runtime/enum.Backend.html");
        assert!(!found[1].is_external());
    }

    #[test]
    fn plain_text_decodes_generics() {
        assert_eq!(
            plain_text(DESERIALIZE_ROW),
            "impl<'de> Deserialize<'de> for Backend"
        );
    }

    #[test]
    fn unknown_entities_and_bare_ampersands_pass_through() {
        assert_eq!(plain_text("a &foo; b & c &amp;lt;"), "a &foo; b & c &lt;");
    }

    #[test]
    fn attribute_ignores_prefixed_names() {
        let found = links("<a data-href=\"x\" href=\"y\" class=\"struct\">T</a>");
        assert_eq!(found[0].href, "y");
        assert_eq!(found[0].kind, ItemKind::Struct);
        assert!(found[0].title.is_none());
    }

    #[test]
    fn anchors_without_href_or_close_are_skipped() {
        assert!(links("<a class=\"struct\">T</a>").is_empty());
        assert!(links("<a href=\"x\">unterminated").is_empty());
    }
}
