// REST resource paths, relative to the configured base URL
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};

use crate::models::{CommentId, PostId};

pub const LOGIN: &str = "/auth/login";
pub const REGISTER: &str = "/auth/register";
pub const POSTS: &str = "/posts";

/// Characters escaped inside one path segment. Includes `/` and `\` so an id
/// can never split into several segments.
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'[')
    .add(b'\\')
    .add(b']')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

/// Encode `id` as a single path segment.
pub fn segment(id: &str) -> String {
    utf8_percent_encode(id, SEGMENT).to_string()
}

/// `.` and `..` (in any percent-encoded spelling) are collapsed by URL
/// resolution, so they cannot be sent as literal segments.
pub fn is_dot_segment(segment: &str) -> bool {
    matches!(
        segment.to_ascii_lowercase().replace("%2e", ".").as_str(),
        "." | ".."
    )
}

pub fn post(id: &PostId) -> String {
    format!("{}/{}", POSTS, segment(id.as_str()))
}

pub fn upvote(id: &PostId) -> String {
    format!("{}/upvote", post(id))
}

pub fn downvote(id: &PostId) -> String {
    format!("{}/downvote", post(id))
}

pub fn post_comments(id: &PostId) -> String {
    format!("{}/comments", post(id))
}

pub fn comment(id: &CommentId) -> String {
    format!("/comments/{}", segment(id.as_str()))
}
