//! Low level HTML helpers for the upstream pages.
//!
//! Tag and attribute names are matched case-insensitively on ASCII only, comments and scripts are
//! not understood. Good enough for the handful of government pages we read, not a general purpose
//! parser.

/// Character entities found on the upstream pages, the rest are left untouched.
const ENTITIES: [(&str, &str); 17] = [
    ("&nbsp;", " "),
    ("&lt;", "<"),
    ("&gt;", ">"),
    ("&quot;", "\""),
    ("&#39;", "'"),
    ("&aacute;", "á"),
    ("&eacute;", "é"),
    ("&iacute;", "í"),
    ("&oacute;", "ó"),
    ("&uacute;", "ú"),
    ("&Aacute;", "Á"),
    ("&Eacute;", "É"),
    ("&Iacute;", "Í"),
    ("&Oacute;", "Ó"),
    ("&ntilde;", "ñ"),
    ("&Ntilde;", "Ñ"),
    // Last, so `&amp;lt;` stays `&lt;`.
    ("&amp;", "&"),
];

/// Find every complete `<tag ...>...</tag>` element in `html`, in document order.
///
/// Nested elements of the same tag are matched to their own closing tag and are returned as well,
/// after the element containing them. Elements that are never closed are skipped.
pub fn blocks<'a>(html: &'a str, tag: &str) -> Vec<&'a str> {
    let lowercase = html.to_ascii_lowercase();
    let open = format!("<{}", tag.to_ascii_lowercase());
    let close = format!("</{}>", tag.to_ascii_lowercase());

    let mut found = Vec::new();
    let mut from = 0_usize;
    while let Some(start) = find_open(&lowercase, &open, from) {
        if let Some(block) = matching_close(&lowercase, &open, &close, start)
            .and_then(|end| html.get(start..end))
        {
            found.push(block);
        }
        from = start.saturating_add(open.len());
    }

    found
}

/// Position of the next `open` (e.g. `<tr`) at or after `from` that really starts that tag, so
/// `<tr` does not match `<track`.
fn find_open(lowercase: &str, open: &str, from: usize) -> Option<usize> {
    let mut from = from;
    loop {
        let start = lowercase.get(from..)?.find(open)?.saturating_add(from);
        let after_name = start.saturating_add(open.len());
        let is_tag = lowercase
            .get(after_name..)
            .and_then(|rest| rest.chars().next())
            .is_some_and(|c| c == '>' || c == '/' || c.is_ascii_whitespace());
        if is_tag {
            return Some(start);
        }
        from = after_name;
    }
}

/// The end (exclusive) of the element opened at `start`, skipping over nested elements.
fn matching_close(lowercase: &str, open: &str, close: &str, start: usize) -> Option<usize> {
    let mut depth = 0_usize;
    let mut cursor = start;
    loop {
        let next_close = lowercase.get(cursor..)?.find(close)?.saturating_add(cursor);
        match find_open(lowercase, open, cursor) {
            Some(next_open) if next_open < next_close => {
                depth = depth.saturating_add(1);
                cursor = next_open.saturating_add(open.len());
            }
            _ => {
                depth = depth.saturating_sub(1);
                cursor = next_close.saturating_add(close.len());
                if depth == 0 {
                    return Some(cursor);
                }
            }
        }
    }
}

/// The opening tag of a block, e.g. `<td class="x">` for `<td class="x">1</td>`.
pub fn open_tag(block: &str) -> &str {
    block
        .find('>')
        .and_then(|end| block.get(..=end))
        .unwrap_or(block)
}

/// The HTML inside a block, without its own opening and closing tags.
pub fn inner(block: &str) -> &str {
    let start = open_tag(block).len();
    let end = block.rfind('<').filter(|end| *end >= start).unwrap_or(block.len());
    block.get(start..end).unwrap_or_default()
}

/// Read an attribute value from an opening tag, quoted with either `"` or `'`.
pub fn attribute<'a>(open_tag: &'a str, name: &str) -> Option<&'a str> {
    let lowercase = open_tag.to_ascii_lowercase();
    let needle = format!("{}=", name.to_ascii_lowercase());

    let mut from = 0_usize;
    loop {
        let position = lowercase.get(from..)?.find(&needle)?.saturating_add(from);
        let preceded_by_space = lowercase
            .get(..position)
            .and_then(|before| before.chars().last())
            .is_some_and(|c| c.is_ascii_whitespace());
        let value_start = position.saturating_add(needle.len());
        if !preceded_by_space {
            from = value_start;
            continue;
        }

        let rest = open_tag.get(value_start..)?;
        let quote = rest.chars().next()?;
        if quote == '"' || quote == '\'' {
            let value = rest.get(1..)?;
            return value.find(quote).and_then(|end| value.get(..end));
        }

        let end = rest
            .find(|c: char| c.is_ascii_whitespace() || c == '>')
            .unwrap_or(rest.len());
        return rest.get(..end);
    }
}

/// Find the opening tag of the element with the given `id`, and everything after it.
pub fn after_id<'a>(html: &'a str, id: &str) -> Option<(&'a str, &'a str)> {
    let mut from = 0_usize;
    loop {
        let start = html.get(from..)?.find('<')?.saturating_add(from);
        let rest = html.get(start..)?;
        let tag = open_tag(rest);
        if attribute(tag, "id") == Some(id) {
            return Some((tag, rest.get(tag.len()..)?));
        }
        from = start.saturating_add(1);
    }
}

/// The first element in `html` whose opening tag lists `class`, as a block.
pub fn first_with_class<'a>(html: &'a str, class: &str) -> Option<&'a str> {
    let mut from = 0_usize;
    loop {
        let start = html.get(from..)?.find('<')?.saturating_add(from);
        let rest = html.get(start..)?;
        let tag = open_tag(rest);
        if has_class(tag, class) {
            let name: String = tag
                .chars()
                .skip(1)
                .take_while(char::is_ascii_alphanumeric)
                .collect();
            return blocks(rest, &name)
                .into_iter()
                .find(|block| block.as_ptr() == rest.as_ptr());
        }
        from = start.saturating_add(1);
    }
}

/// Whether an opening tag lists `class` among its classes.
pub fn has_class(open_tag: &str, class: &str) -> bool {
    attribute(open_tag, "class").is_some_and(|classes| classes.split_whitespace().any(|c| c == class))
}

/// Visible text of an HTML fragment: tags removed, entities decoded and whitespace collapsed.
pub fn text(html: &str) -> String {
    let mut stripped = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => stripped.push(c),
            _ => {}
        }
    }

    let decoded = ENTITIES
        .iter()
        .fold(stripped, |acc, (entity, replacement)| acc.replace(entity, replacement));

    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}
