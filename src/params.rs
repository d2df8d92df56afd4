//! Request parameter normalization.

/// Largest integer magnitude exactly representable as an IEEE double.
pub const MAX_SAFE_INTEGER: i64 = (1 << 53) - 1;

/// Parse the leading integer of `text` in `radix`, the way JavaScript's
/// `parseInt` does: leading whitespace and a sign are accepted, parsing stops
/// at the first non-digit, and `0x`/`0X` is allowed for radix 16.
///
/// Returns `None` when there are no digits or the value leaves the safe
/// integer range.
pub fn parse_int(text: &str, radix: u32) -> Option<i64> {
    if !(2..=36).contains(&radix) {
        return None;
    }
    let s = text.trim_start();
    let (negative, s) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let s = if radix == 16 {
        s.strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s)
    } else {
        s
    };
    let mut value: i64 = 0;
    let mut digits = 0;
    for c in s.chars() {
        let Some(d) = c.to_digit(radix) else { break };
        value = value
            .checked_mul(i64::from(radix))?
            .checked_add(i64::from(d))?;
        if value > MAX_SAFE_INTEGER {
            return None;
        }
        digits += 1;
    }
    if digits == 0 {
        return None;
    }
    Some(if negative { -value } else { value })
}

/// How a result cursor is sliced and what the response reports about it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageMode {
    /// `limit` applied (with an optional offset); the response reports `done`.
    Limited { offset: usize, limit: usize },
    /// Only an offset; results stream with neither `done` nor `total`.
    OffsetOnly { offset: usize },
    /// No slicing; the response reports the exact `total`.
    Unrestricted,
}

/// `limit` and `offset` as given by the caller, after parsing.
///
/// A parameter that parses to zero, or not at all, is treated as absent. The
/// parsed values are echoed back even when they are negative; only positive
/// values take effect.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Pagination {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl Pagination {
    pub fn from_params(limit: Option<&str>, offset: Option<&str>) -> Self {
        let parse = |p: Option<&str>| p.and_then(|s| parse_int(s, 10)).filter(|n| *n != 0);
        Self {
            limit: parse(limit),
            offset: parse(offset),
        }
    }

    fn positive(n: Option<i64>) -> Option<usize> {
        n.filter(|n| *n > 0).and_then(|n| usize::try_from(n).ok())
    }

    pub fn mode(&self) -> PageMode {
        let offset = Self::positive(self.offset);
        match (Self::positive(self.limit), offset) {
            (Some(limit), offset) => PageMode::Limited {
                offset: offset.unwrap_or(0),
                limit,
            },
            (None, Some(offset)) => PageMode::OffsetOnly { offset },
            (None, None) => PageMode::Unrestricted,
        }
    }
}
