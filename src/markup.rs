//! Shorthand markup translation for message bodies.
//!
//! Authors style their posts with a tiny bulletin-board tag set (`[b]`, `[i]`, `[u]` and
//! their `[/x]` closers). Before a message is displayed its body is passed through
//! [translate], which swaps those tags for display tags (`<b>`, `</i>`, ...) and leaves
//! every other byte of the text alone.
//!
//! Translation runs in two passes:
//!
//! 1. [tokenize] splits the text on anything *tag shaped*: a `[`, an optional `/`, exactly
//!    one character, and a `]`.
//! 2. Each tag-shaped token is classified on its own. Bold, italic and underline (in that
//!    order, ASCII case-insensitive) become display tags; any other letter stays literal.
//!
//! Pairing is positional. `[b][/i]` is rendered as `<b></i>`, an unmatched `[/b]` as `</b>`.
//! The output contains real display markup, so translating it again is not a no-op and
//! there is no way back to the shorthand form.
//!
//! ```
//! use bbforum::markup::translate;
//!
//! assert_eq!(translate("[b]bold[/b] and [x]raw[/x]"), "<b>bold</b> and [x]raw[/x]");
//! ```
use std::borrow::Cow;
use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

/// Generic tag shape. `.` does not match `\n`, so a line break never sits inside a tag.
const TAG_SHAPE: &str = r"\[/?.\]";

fn tag_shape() -> &'static Regex {
    static TAG_SHAPE_RE: OnceLock<Regex> = OnceLock::new();
    TAG_SHAPE_RE.get_or_init(|| Regex::new(TAG_SHAPE).expect("tag shape pattern is valid"))
}

/// The styles the translator knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagKind {
    Bold,
    Italic,
    Underline,
}

impl TagKind {
    /// Classification order: the first kind whose letter matches wins.
    pub const PRIORITY: [TagKind; 3] = [TagKind::Bold, TagKind::Italic, TagKind::Underline];

    /// Shorthand letter, lower case.
    pub fn letter(self) -> char {
        match self {
            TagKind::Bold => 'b',
            TagKind::Italic => 'i',
            TagKind::Underline => 'u',
        }
    }

    fn open_marker(self) -> &'static str {
        match self {
            TagKind::Bold => "<b>",
            TagKind::Italic => "<i>",
            TagKind::Underline => "<u>",
        }
    }

    fn close_marker(self) -> &'static str {
        match self {
            TagKind::Bold => "</b>",
            TagKind::Italic => "</i>",
            TagKind::Underline => "</u>",
        }
    }
}

/// A recognised tag occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tag {
    pub kind: TagKind,
    pub closing: bool,
}

impl Tag {
    /// Display form of this tag (`<b>` or `</b>`, ...).
    pub fn display(&self) -> &'static str {
        if self.closing {
            self.kind.close_marker()
        } else {
            self.kind.open_marker()
        }
    }

    /// Classify a single tag-shaped token such as `[B]` or `[/u]`.
    ///
    /// Returns `None` when the token is not a bold, italic or underline tag.
    pub fn classify(token: &str) -> Option<Tag> {
        let inner = token.strip_prefix('[')?.strip_suffix(']')?;
        let letter = inner.strip_prefix('/').unwrap_or(inner);
        let mut chars = letter.chars();
        let ch = chars.next()?.to_ascii_lowercase();
        if chars.next().is_some() {
            return None;
        }
        TagKind::PRIORITY
            .into_iter()
            .find(|kind| kind.letter() == ch)
            .map(|kind| Tag {
                kind,
                closing: token.contains('/'),
            })
    }
}

/// One piece of the token stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    /// Plain text between tags, copied to the output untouched.
    Text(&'a str),
    /// A bold, italic or underline tag.
    Tag(Tag),
    /// Tag shaped but with an unknown letter; kept verbatim.
    Literal(&'a str),
}

impl<'a> Segment<'a> {
    /// The text this segment contributes to the translated output.
    pub fn rendered(&self) -> &'a str {
        match self {
            Segment::Text(text) | Segment::Literal(text) => text,
            Segment::Tag(tag) => tag.display(),
        }
    }
}

impl fmt::Display for Segment<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.rendered())
    }
}

/// Split `text` into plain and tag-shaped segments.
///
/// Empty plain runs (between two adjacent tags, or at either end) are not emitted.
pub fn tokenize(text: &str) -> Vec<Segment<'_>> {
    let mut segments = Vec::new();
    let mut last = 0;
    for found in tag_shape().find_iter(text) {
        if found.start() > last {
            segments.push(Segment::Text(&text[last..found.start()]));
        }
        let token = found.as_str();
        segments.push(match Tag::classify(token) {
            Some(tag) => Segment::Tag(tag),
            None => Segment::Literal(token),
        });
        last = found.end();
    }
    if last < text.len() {
        segments.push(Segment::Text(&text[last..]));
    }
    segments
}

/// Translate shorthand tags into display tags, borrowing when nothing changes.
pub fn translate_cow(text: &str) -> Cow<'_, str> {
    if !tag_shape().is_match(text) {
        return Cow::Borrowed(text);
    }
    let mut out = String::with_capacity(text.len());
    for segment in tokenize(text) {
        out.push_str(segment.rendered());
    }
    Cow::Owned(out)
}

/// Translate shorthand tags into display tags.
pub fn translate(text: &str) -> String {
    translate_cow(text).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_is_case_insensitive() {
        assert_eq!(
            Tag::classify("[B]"),
            Some(Tag { kind: TagKind::Bold, closing: false })
        );
        assert_eq!(
            Tag::classify("[/U]"),
            Some(Tag { kind: TagKind::Underline, closing: true })
        );
        assert_eq!(Tag::classify("[x]"), None);
        assert_eq!(Tag::classify("[/]"), None);
        assert_eq!(Tag::classify("[bb]"), None);
    }

    #[test]
    fn tokenize_keeps_plain_runs_in_order() {
        let segments = tokenize("a [b]b[/b] [q]");
        assert_eq!(
            segments,
            vec![
                Segment::Text("a "),
                Segment::Tag(Tag { kind: TagKind::Bold, closing: false }),
                Segment::Text("b"),
                Segment::Tag(Tag { kind: TagKind::Bold, closing: true }),
                Segment::Text(" "),
                Segment::Literal("[q]"),
            ]
        );
    }

    #[test]
    fn tokenize_prefers_leftmost_shape() {
        // "[[]" is tag shaped (the single character is '['), so "b]" is left as text.
        assert_eq!(
            tokenize("[[]b]"),
            vec![Segment::Literal("[[]"), Segment::Text("b]")]
        );
    }

    #[test]
    fn untouched_input_is_borrowed() {
        assert!(matches!(translate_cow("no tags [here"), Cow::Borrowed(_)));
        assert!(matches!(translate_cow("[b]"), Cow::Owned(_)));
    }

    #[test]
    fn newline_never_inside_a_tag() {
        assert_eq!(translate("[\n]"), "[\n]");
    }
}
