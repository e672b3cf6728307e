//! Splits assistant answers into text runs and `##N$$` citation markers.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::internal::ReferenceChunk;

static MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"##(\d+)\$\$").expect("valid marker regex"));

#[derive(Debug, Clone, PartialEq)]
pub enum AnswerSegment<'a> {
    Text(&'a str),
    Citation {
        index: usize,
        /// `None` when the answer cites a chunk the server did not return
        chunk: Option<&'a ReferenceChunk>,
    },
}

pub fn segment_answer<'a>(answer: &'a str, references: &'a [ReferenceChunk]) -> Vec<AnswerSegment<'a>> {
    let mut segments = Vec::new();
    let mut cursor = 0;

    for caps in MARKER.captures_iter(answer) {
        let Some(whole) = caps.get(0) else { continue };
        if whole.start() > cursor {
            segments.push(AnswerSegment::Text(&answer[cursor..whole.start()]));
        }
        match caps[1].parse::<usize>() {
            Ok(index) => segments.push(AnswerSegment::Citation {
                index,
                chunk: references.get(index),
            }),
            // Index too large for usize; keep the marker as plain text
            Err(_) => segments.push(AnswerSegment::Text(whole.as_str())),
        }
        cursor = whole.end();
    }

    if cursor < answer.len() {
        segments.push(AnswerSegment::Text(&answer[cursor..]));
    }
    segments
}

/// Answer text with citation markers removed
pub fn strip_citations(answer: &str) -> String {
    MARKER.replace_all(answer, "").into_owned()
}
