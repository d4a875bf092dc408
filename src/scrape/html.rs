//! Tolerant HTML element lookup.
//!
//! This is a tag scanner, not a DOM. Elements are located by `id` or class,
//! then narrowed with a short path of `(tag, nth)` steps. Each step counts
//! direct children like XPath does, except that an implied `tbody` is looked
//! through. Unclosed `li`/`p`/`td`/`tr` are closed the way browsers do: at the
//! next sibling or at the end of their parent.

const VOID: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track", "wbr",
];
const RAW_TEXT: &[&str] = &["script", "style"];
const INLINE: &[&str] = &["a", "abbr", "b", "em", "font", "i", "small", "span", "strong", "sub", "sup", "u"];

fn is_one_of(name: &str, set: &[&str]) -> bool {
    set.iter().any(|s| name.eq_ignore_ascii_case(s))
}

/// Implied-end rules for elements whose closing tag is optional.
struct Rules {
    /// An opening tag of one of these ends the element.
    siblings: &'static [&'static str],
    /// A closing tag of one of these ends the element.
    parents: &'static [&'static str],
    /// Opening one of these starts a nested scope where the rules pause.
    containers: &'static [&'static str],
}

fn rules(name: &str) -> Rules {
    const NONE: &[&str] = &[];
    const CELL: &[&str] = &["td", "th", "tr", "tbody", "thead", "tfoot"];
    const SECTION: &[&str] = &["tbody", "thead", "tfoot"];
    const TABLE: &[&str] = &["table"];
    const LIST: &[&str] = &["ul", "ol"];

    match name.to_ascii_lowercase().as_str() {
        "li" => Rules { siblings: &["li"], parents: LIST, containers: LIST },
        "td" | "th" => Rules { siblings: CELL, parents: &["tr", "tbody", "thead", "tfoot", "table"], containers: TABLE },
        "tr" => Rules { siblings: &["tr", "tbody", "thead", "tfoot"], parents: &["tbody", "thead", "tfoot", "table"], containers: TABLE },
        "tbody" | "thead" | "tfoot" => Rules { siblings: SECTION, parents: TABLE, containers: TABLE },
        "p" => Rules {
            siblings: &["p", "div", "ul", "ol", "table", "h1", "h2", "h3", "h4", "h5", "h6"],
            parents: &["div", "td", "li", "section", "article", "body"],
            containers: NONE,
        },
        _ => Rules { siblings: NONE, parents: NONE, containers: NONE },
    }
}

// ─── Tag scanning ───────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
struct Tag<'a> {
    /// Byte offset of `<`.
    start: usize,
    /// Byte offset just past `>`.
    end: usize,
    name: &'a str,
    closing: bool,
    self_closing: bool,
}

/// Offset just past the `>` that ends a tag, honouring quoted attributes.
fn find_tag_end(html: &str, from: usize, limit: usize) -> Option<usize> {
    let mut quote: Option<u8> = None;
    for (i, &b) in html.as_bytes()[from..limit].iter().enumerate() {
        match quote {
            Some(q) if b == q => quote = None,
            Some(_) => {}
            None if b == b'"' || b == b'\'' => quote = Some(b),
            None if b == b'>' => return Some(from + i + 1),
            None => {}
        }
    }
    None
}

fn find_ci(haystack: &str, needle: &str) -> Option<usize> {
    let (h, n) = (haystack.as_bytes(), needle.as_bytes());
    if n.is_empty() || h.len() < n.len() {
        return None;
    }
    (0..=h.len() - n.len()).find(|&i| h[i..i + n.len()].eq_ignore_ascii_case(n))
}

fn next_tag(html: &str, mut from: usize, limit: usize) -> Option<Tag<'_>> {
    while from < limit {
        let start = from + html[from..limit].find('<')?;
        let rest = &html[start..limit];

        if rest.starts_with("<!--") {
            from = start + rest.find("-->")? + 3;
            continue;
        }

        let closing = rest.as_bytes().get(1) == Some(&b'/');
        let name_start = if closing { start + 2 } else { start + 1 };
        let name_len = html.as_bytes()[name_start.min(limit)..limit]
            .iter()
            .take_while(|b| b.is_ascii_alphanumeric())
            .count();

        if name_len == 0 {
            // <!DOCTYPE>, <?xml?>, or a stray '<' in text
            from = if rest.starts_with("<!") || rest.starts_with("<?") {
                start + rest.find('>')? + 1
            } else {
                start + 1
            };
            continue;
        }

        let end = find_tag_end(html, name_start + name_len, limit)?;
        return Some(Tag {
            start,
            end,
            name: &html[name_start..name_start + name_len],
            closing,
            self_closing: !closing && html[..end - 1].ends_with('/'),
        });
    }
    None
}

/// Iterator over tags in `html[pos..limit]`; skips script/style bodies.
struct Tags<'a> {
    html: &'a str,
    pos: usize,
    limit: usize,
}

impl<'a> Tags<'a> {
    fn new(html: &'a str, pos: usize, limit: usize) -> Self {
        Self { html, pos, limit }
    }
}

impl<'a> Iterator for Tags<'a> {
    type Item = Tag<'a>;

    fn next(&mut self) -> Option<Tag<'a>> {
        let tag = next_tag(self.html, self.pos, self.limit)?;
        self.pos = tag.end;
        if !tag.closing && !tag.self_closing && is_one_of(tag.name, RAW_TEXT) {
            let close = format!("</{}", tag.name);
            self.pos = match find_ci(&self.html[tag.end..self.limit], &close) {
                Some(i) => find_tag_end(self.html, tag.end + i, self.limit).unwrap_or(self.limit),
                None => self.limit,
            };
        }
        Some(tag)
    }
}

fn attributes(tag_src: &str) -> Vec<(&str, &str)> {
    let b = tag_src.as_bytes();
    let mut out = Vec::new();
    let mut i = 1 + b[1..].iter().take_while(|c| c.is_ascii_alphanumeric()).count();

    loop {
        while i < b.len() && (b[i].is_ascii_whitespace() || b[i] == b'/') {
            i += 1;
        }
        if i >= b.len() || b[i] == b'>' {
            break;
        }
        let name_start = i;
        while i < b.len() && !b[i].is_ascii_whitespace() && !matches!(b[i], b'=' | b'>' | b'/') {
            i += 1;
        }
        let name = &tag_src[name_start..i];
        while i < b.len() && b[i].is_ascii_whitespace() {
            i += 1;
        }
        if i < b.len() && b[i] == b'=' {
            i += 1;
            while i < b.len() && b[i].is_ascii_whitespace() {
                i += 1;
            }
            let value = if i < b.len() && (b[i] == b'"' || b[i] == b'\'') {
                let q = b[i];
                let v_start = i + 1;
                let v_len = b[v_start..].iter().take_while(|&&c| c != q).count();
                i = (v_start + v_len + 1).min(b.len());
                &tag_src[v_start..v_start + v_len]
            } else {
                let v_start = i;
                while i < b.len() && !b[i].is_ascii_whitespace() && b[i] != b'>' {
                    i += 1;
                }
                &tag_src[v_start..i]
            };
            out.push((name, value));
        } else if !name.is_empty() {
            out.push((name, ""));
        } else {
            i += 1;
        }
    }
    out
}

// ─── Elements ───────────────────────────────────────────────────

/// A located element: byte ranges into the source document.
#[derive(Debug, Clone, Copy)]
pub struct Element<'a> {
    html: &'a str,
    open_end: usize,
    inner_end: usize,
    end: usize,
    name: &'a str,
}

/// Work out where the element opened by `open` ends, never past `limit`.
fn close_element<'a>(html: &'a str, open: Tag<'a>, limit: usize) -> Element<'a> {
    let mut el = Element {
        html,
        open_end: open.end,
        inner_end: open.end,
        end: open.end,
        name: open.name,
    };
    if open.self_closing || is_one_of(open.name, VOID) {
        return el;
    }

    let rules = rules(open.name);
    let mut depth = 1usize;
    let mut nested = 0usize;

    for tag in Tags::new(html, open.end, limit) {
        let same = tag.name.eq_ignore_ascii_case(open.name);
        let container = is_one_of(tag.name, rules.containers);

        if tag.closing {
            if same && nested == 0 {
                depth -= 1;
                if depth == 0 {
                    el.inner_end = tag.start;
                    el.end = tag.end;
                    return el;
                }
            } else if container && nested > 0 {
                nested -= 1;
                if nested == 0 {
                    depth = 1;
                }
            } else if nested == 0 && is_one_of(tag.name, rules.parents) {
                el.inner_end = tag.start;
                el.end = tag.start;
                return el;
            }
        } else if !tag.self_closing {
            if container {
                nested += 1;
            } else if nested == 0 && depth == 1 && is_one_of(tag.name, rules.siblings) {
                el.inner_end = tag.start;
                el.end = tag.start;
                return el;
            } else if same && nested == 0 {
                depth += 1;
            }
        }
    }

    el.inner_end = limit;
    el.end = limit;
    el
}

impl<'a> Element<'a> {
    pub fn name(&self) -> &'a str {
        self.name
    }

    /// Direct children with the given tag name, in document order.
    ///
    /// A `tbody` between a table and its rows is looked through, so
    /// `table/tr` finds rows whether or not the page spells it out.
    pub fn children(&self, tag: &str) -> Vec<Element<'a>> {
        let mut out = Vec::new();
        self.collect_children(tag, &mut out);
        out
    }

    fn collect_children(&self, tag: &str, out: &mut Vec<Element<'a>>) {
        let mut pos = self.open_end;
        while pos < self.inner_end {
            let Some(open) = Tags::new(self.html, pos, self.inner_end).find(|t| !t.closing) else {
                break;
            };
            let child = close_element(self.html, open, self.inner_end);
            pos = child.end.max(open.end);

            if open.name.eq_ignore_ascii_case(tag) {
                out.push(child);
            } else if open.name.eq_ignore_ascii_case("tbody") && tag.eq_ignore_ascii_case("tr") {
                child.collect_children(tag, out);
            }
        }
    }

    /// All descendant text, whitespace-normalised.
    pub fn text(&self) -> String {
        collect_text(self.html, self.open_end, self.inner_end, false)
    }

    /// Only the text nodes directly inside this element.
    pub fn own_text(&self) -> String {
        collect_text(self.html, self.open_end, self.inner_end, true)
    }

    /// The text run right after this element, up to the next tag or `limit`.
    pub fn following_text(&self, limit: usize) -> String {
        let limit = limit.max(self.end);
        let stop = self.html[self.end..limit].find('<').map_or(limit, |i| self.end + i);
        normalize(&decode_entities(&self.html[self.end..stop]))
    }
}

fn collect_text(html: &str, from: usize, to: usize, own_only: bool) -> String {
    let mut out = String::new();
    let mut depth = 0usize;
    let mut pos = from;
    let mut tags = Tags::new(html, from, to);

    while let Some(tag) = tags.next() {
        if !own_only || depth == 0 {
            out.push_str(&html[pos..tag.start]);
        }
        if !is_one_of(tag.name, INLINE) {
            out.push(' ');
        }
        if own_only && !tag.self_closing && !is_one_of(tag.name, VOID) && !is_one_of(tag.name, RAW_TEXT) {
            if tag.closing {
                depth = depth.saturating_sub(1);
            } else {
                depth += 1;
            }
        }
        pos = tags.pos;
    }
    if !own_only || depth == 0 {
        out.push_str(&html[pos..to]);
    }
    normalize(&decode_entities(&out))
}

fn normalize(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Decode the handful of entities that show up in scraped tables.
pub fn decode_entities(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        let decoded = tail.find(';').filter(|&semi| semi <= 10).and_then(|semi| {
            let entity = &tail[1..semi];
            let ch = match entity {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "nbsp" => Some(' '),
                _ => entity
                    .strip_prefix("#x")
                    .or_else(|| entity.strip_prefix("#X"))
                    .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                    .or_else(|| entity.strip_prefix('#').and_then(|dec| dec.parse().ok()))
                    .and_then(char::from_u32),
            }?;
            Some((ch, semi + 1))
        });
        match decoded {
            Some((ch, len)) => {
                out.push(ch);
                rest = &tail[len..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

// ─── Documents and selectors ────────────────────────────────────

pub struct Document<'a> {
    html: &'a str,
}

impl<'a> Document<'a> {
    pub fn new(html: &'a str) -> Self {
        Self { html }
    }

    /// First element whose start tag satisfies `pred`.
    fn find(&self, pred: impl Fn(&[(&str, &str)]) -> bool) -> Option<Element<'a>> {
        let limit = self.html.len();
        Tags::new(self.html, 0, limit)
            .filter(|t| !t.closing)
            .find(|t| pred(&attributes(&self.html[t.start..t.end])))
            .map(|t| close_element(self.html, t, limit))
    }

    pub fn find_by_id(&self, id: &str) -> Option<Element<'a>> {
        self.find(|attrs| attrs.iter().any(|(k, v)| k.eq_ignore_ascii_case("id") && *v == id))
    }

    /// First element carrying `class` among its classes.
    pub fn find_by_class(&self, class: &str) -> Option<Element<'a>> {
        self.find(|attrs| {
            attrs
                .iter()
                .any(|(k, v)| k.eq_ignore_ascii_case("class") && v.split_whitespace().any(|c| c == class))
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    Id(&'static str),
    Class(&'static str),
}

/// Which of the matching children to take. `Index` is 1-based like XPath.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nth {
    Index(usize),
    Last,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    pub tag: &'static str,
    pub nth: Nth,
}

impl Step {
    pub const fn nth(tag: &'static str, n: usize) -> Self {
        Self { tag, nth: Nth::Index(n) }
    }

    pub const fn last(tag: &'static str) -> Self {
        Self { tag, nth: Nth::Last }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extract {
    /// All descendant text (`//text()`).
    Text,
    /// Direct text nodes only (`/text()`).
    OwnText,
    /// The text node after the element (`following-sibling::text()[1]`).
    FollowingText,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selector {
    pub anchor: Anchor,
    pub steps: &'static [Step],
    pub extract: Extract,
}

impl Selector {
    /// Walk the path. Returns the target and its parent.
    pub fn locate<'a>(&self, doc: &Document<'a>) -> Option<(Element<'a>, Element<'a>)> {
        let anchor = match self.anchor {
            Anchor::Id(id) => doc.find_by_id(id)?,
            Anchor::Class(class) => doc.find_by_class(class)?,
        };
        let mut parent = anchor;
        let mut current = anchor;
        for step in self.steps {
            let mut candidates = current.children(step.tag);
            let next = match step.nth {
                Nth::Index(0) => return None,
                Nth::Index(n) if n <= candidates.len() => candidates.swap_remove(n - 1),
                Nth::Index(_) => return None,
                Nth::Last => candidates.pop()?,
            };
            parent = current;
            current = next;
        }
        Some((current, parent))
    }

    /// Extracted text, or `None` if the element is missing or the text empty.
    pub fn select(&self, doc: &Document<'_>) -> Option<String> {
        let (el, parent) = self.locate(doc)?;
        let text = match self.extract {
            Extract::Text => el.text(),
            Extract::OwnText => el.own_text(),
            Extract::FollowingText => el.following_text(parent.inner_end),
        };
        Some(text).filter(|t| !t.is_empty())
    }
}
