use crate::core::record::StackFrame;
use std::backtrace::Backtrace;

// Frames of this module tree are never reported.
const OWN_MODULE: &str = "query_inspect::instrumentation";

/// Decides which captured frames are application code.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TracebackFilter {
    roots: Vec<String>,
    excludes: Vec<String>,
}

impl TracebackFilter {
    pub fn new(roots: Vec<String>, excludes: Vec<String>) -> Self {
        Self { roots, excludes }
    }

    /// Prefix match on the raw path text. Excludes only apply under a root;
    /// with no roots every path passes.
    pub fn includes_path(&self, path: &str) -> bool {
        if self.roots.is_empty() {
            return true;
        }
        self.roots
            .iter()
            .any(|root| path.starts_with(root.as_str()))
            && !self.excludes.iter().any(|x| path.starts_with(x.as_str()))
    }

    pub fn includes(&self, frame: &StackFrame) -> bool {
        !is_own_frame(frame) && self.includes_path(&frame.file)
    }

    pub fn apply(&self, frames: Vec<StackFrame>) -> Vec<StackFrame> {
        frames.into_iter().filter(|f| self.includes(f)).collect()
    }
}

fn is_own_frame(frame: &StackFrame) -> bool {
    frame.function.contains(OWN_MODULE)
}

/// Captures the caller's stack, outermost frame first, passed through `filter`.
pub fn capture_stack(filter: &TracebackFilter) -> Vec<StackFrame> {
    // full style: the short one rewrites paths under the cwd to `./...`
    let rendered = format!("{:#}", Backtrace::force_capture());
    let mut frames = parse_backtrace(&rendered);

    // drop the capture machinery: everything up to our own first frame
    if let Some(pos) = frames.iter().position(is_own_frame) {
        frames.drain(..pos);
    }
    frames.reverse();
    filter.apply(frames)
}

/// Parses the `Display` form of a std backtrace, innermost frame first.
///
/// ```text
///    3: app::views::list::h0f1e2d3c4b5a6978
///              at /app/src/views.rs:12:9
/// ```
pub(crate) fn parse_backtrace(rendered: &str) -> Vec<StackFrame> {
    let mut frames: Vec<StackFrame> = Vec::new();

    for line in rendered.lines() {
        let trimmed = line.trim_start();
        if let Some(location) = trimmed.strip_prefix("at ") {
            if let Some(frame) = frames.last_mut() {
                let (file, line) = split_location(location);
                frame.file = file;
                frame.line = line;
            }
            continue;
        }
        if let Some((idx, function)) = trimmed.split_once(": ") {
            if idx.chars().all(|c| c.is_ascii_digit()) && !idx.is_empty() {
                let function = strip_symbol_hash(function).to_string();
                frames.push(StackFrame { file: String::new(), line: None, function });
            }
        }
    }
    frames
}

// "app::f::h0123456789abcdef" -> "app::f"
fn strip_symbol_hash(function: &str) -> &str {
    match function.rsplit_once("::h") {
        Some((head, hash)) if hash.len() == 16 && hash.chars().all(|c| c.is_ascii_hexdigit()) => head,
        _ => function,
    }
}

// "path:line:col" -> (path, line)
fn split_location(location: &str) -> (String, Option<u32>) {
    let mut parts = location.rsplitn(3, ':');
    let col = parts.next();
    let line = parts.next();
    let path = parts.next();
    match (path, line, col) {
        (Some(path), Some(line), Some(_)) => (path.to_string(), line.parse().ok()),
        _ => (location.to_string(), None),
    }
}
