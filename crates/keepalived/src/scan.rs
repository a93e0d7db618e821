//! Line-oriented scanning primitives shared by the config and dump parsers.
//!
//! Both daemon file formats are flat text where a known substring marks the
//! start of a block or the line carrying a field. These helpers only promise
//! substring semantics: callers must pick sentinels specific enough not to
//! collide with unrelated lines in their format.

/// Value extracted for a field sentinel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    /// The sentinel is present with no trailing value: a feature flag such as
    /// `vmac_xmit_base`, or a `{` block opener.
    Present,
    /// Trailing text after the sentinel, trimmed.
    Scalar(String),
}

impl FieldValue {
    pub fn as_scalar(&self) -> Option<&str> {
        match self {
            FieldValue::Scalar(v) => Some(v),
            FieldValue::Present => None,
        }
    }
}

/// Indexes of every line containing `sentinel`, in ascending order.
pub fn block_starts(lines: &[&str], sentinel: &str) -> Vec<usize> {
    lines
        .iter()
        .enumerate()
        .filter(|(_, line)| line.contains(sentinel))
        .map(|(idx, _)| idx)
        .collect()
}

/// Split `lines` into blocks running from each start index up to the next
/// start, the last block extending to the end of input.
pub fn split_blocks<'a>(lines: &[&'a str], starts: &[usize]) -> Vec<Vec<&'a str>> {
    starts
        .iter()
        .enumerate()
        .map(|(idx, &start)| {
            let end = starts.get(idx + 1).copied().unwrap_or(lines.len());
            lines[start..end].to_vec()
        })
        .collect()
}

/// Find the first line in `block` containing `sentinel` and classify what
/// follows it. Absence is a normal outcome for optional fields, never an
/// error.
pub fn find_field(block: &[&str], sentinel: &str) -> Option<FieldValue> {
    for line in block {
        if let Some(pos) = line.find(sentinel) {
            let trailing = line[pos + sentinel.len()..].trim();
            if trailing.is_empty() || trailing == "{" {
                return Some(FieldValue::Present);
            }
            return Some(FieldValue::Scalar(trailing.to_string()));
        }
    }
    None
}

/// Find the first line whose leading whitespace-delimited token equals
/// `keyword` and classify what follows. Stricter than [`find_field`]: the
/// config format reuses keyword stems (`preempt`, `preempt_delay`,
/// `nopreempt`), so substring matching would misattribute fields.
pub fn find_keyword(block: &[&str], keyword: &str) -> Option<FieldValue> {
    for line in block {
        let rest = match line.trim_start().strip_prefix(keyword) {
            Some(rest) if rest.is_empty() || rest.starts_with(char::is_whitespace) => rest,
            _ => continue,
        };
        let trailing = rest.trim();
        if trailing.is_empty() || trailing == "{" {
            return Some(FieldValue::Present);
        }
        return Some(FieldValue::Scalar(trailing.to_string()));
    }
    None
}

/// Index of the first line at or after `from` whose trimmed content equals
/// `text`. Used to locate bracket openers and their `}` terminators.
pub fn find_line(block: &[&str], text: &str, from: usize) -> Option<usize> {
    block
        .iter()
        .enumerate()
        .skip(from)
        .find(|(_, line)| line.trim() == text)
        .map(|(idx, _)| idx)
}
