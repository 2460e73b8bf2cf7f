//! Lua traceback parsing.

use std::sync::LazyLock;

use regex::Regex;

static FRAME_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(.+?):(\d*):? in (.+)").expect("must compile"));

/// One frame of a traceback, innermost first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TracebackFrame {
    pub file: String,
    /// 0 when the traceback has no line for this frame.
    pub line: i64,
    pub function: String,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ParsedTraceback {
    pub frames: Vec<TracebackFrame>,
    /// Non-empty lines that are not `path:line in function`.
    pub unmatched: Vec<String>,
}

pub fn parse_traceback(traceback: &str) -> ParsedTraceback {
    let mut parsed = ParsedTraceback::default();

    for line in traceback.lines().map(str::trim).filter(|l| !l.is_empty()) {
        match FRAME_LINE.captures(line) {
            Some(caps) => parsed.frames.push(TracebackFrame {
                file: caps[1].to_string(),
                line: caps[2].parse().unwrap_or(0),
                function: caps[3].to_string(),
            }),
            None => parsed.unmatched.push(line.to_string()),
        }
    }
    parsed
}
