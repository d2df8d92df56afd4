//! Single-pass sequence combinators.
//!
//! Every combinator takes ownership of the sequence it transforms, so stages
//! compose over one underlying cursor and never over a copy. Pass
//! `iter.by_ref()` to keep using a sequence after a stage is done with it.
//!
//! `take` reports whether anything remained after the cut through its own
//! return value ([`Take::exhausted`], [`Page::exhausted`]) rather than through
//! a shared flag.

use std::iter::{FusedIterator, Peekable};

/// Skip the first `n` elements, then yield the rest in order.
///
/// Skipping happens on the first pull and stops early if the sequence runs
/// out.
pub fn drop<I: Iterator>(n: usize, iter: I) -> Drop<I> {
    Drop {
        iter,
        remaining: n,
    }
}

pub struct Drop<I> {
    iter: I,
    remaining: usize,
}

impl<I: Iterator> Iterator for Drop<I> {
    type Item = I::Item;

    fn next(&mut self) -> Option<I::Item> {
        while self.remaining > 0 {
            self.remaining -= 1;
            if self.iter.next().is_none() {
                self.remaining = 0;
                return None;
            }
        }
        self.iter.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let (lo, hi) = self.iter.size_hint();
        (
            lo.saturating_sub(self.remaining),
            hi.map(|h| h.saturating_sub(self.remaining)),
        )
    }
}

/// [`drop`] over a fallible sequence. Skips `n` elements right away; an error
/// among them is returned rather than skipped.
pub fn try_drop<T, E, I>(n: usize, mut iter: I) -> Result<I, E>
where
    I: Iterator<Item = Result<T, E>>,
{
    for _ in 0..n {
        match iter.next() {
            Some(Ok(_)) => {}
            Some(Err(e)) => return Err(e),
            None => break,
        }
    }
    Ok(iter)
}

/// Yield at most `n` elements.
///
/// Once the cut is reached (or the sequence ends first), [`Take::exhausted`]
/// tells whether the underlying sequence had nothing left. Deciding that looks
/// at one element past the cut.
pub fn take<I: Iterator>(n: usize, iter: I) -> Take<I> {
    Take {
        iter: iter.peekable(),
        remaining: n,
        exhausted: None,
    }
}

pub struct Take<I: Iterator> {
    iter: Peekable<I>,
    remaining: usize,
    exhausted: Option<bool>,
}

impl<I: Iterator> Take<I> {
    /// `None` until the take has finished; then `Some(true)` when no element
    /// remained right after the cut.
    pub fn exhausted(&self) -> Option<bool> {
        self.exhausted
    }
}

impl<I: Iterator> Iterator for Take<I> {
    type Item = I::Item;

    fn next(&mut self) -> Option<I::Item> {
        if self.exhausted.is_some() {
            return None;
        }
        if self.remaining == 0 {
            self.exhausted = Some(self.iter.peek().is_none());
            return None;
        }
        match self.iter.next() {
            Some(item) => {
                self.remaining -= 1;
                Some(item)
            }
            None => {
                self.exhausted = Some(true);
                None
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.exhausted.is_some() {
            return (0, Some(0));
        }
        let (lo, hi) = self.iter.size_hint();
        (
            lo.min(self.remaining),
            Some(hi.map_or(self.remaining, |h| h.min(self.remaining))),
        )
    }
}

impl<I: Iterator> FusedIterator for Take<I> {}

/// A bounded slice of a sequence plus whether the sequence ended there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub exhausted: bool,
}

/// Pull at most `n` elements into a [`Page`].
pub fn take_page<I: Iterator>(n: usize, iter: I) -> Page<I::Item> {
    let mut t = take(n, iter);
    let items: Vec<_> = t.by_ref().collect();
    Page {
        items,
        exhausted: t.exhausted().unwrap_or(true),
    }
}

/// [`take_page`] over a fallible sequence such as a dataset cursor.
///
/// The first error is returned, including one met while checking for an
/// element past the cut.
pub fn try_take_page<T, E, I>(n: usize, iter: I) -> Result<Page<T>, E>
where
    I: Iterator<Item = Result<T, E>>,
{
    let mut iter = iter.fuse();
    let mut items = Vec::with_capacity(n.min(1024));
    while items.len() < n {
        match iter.next() {
            Some(item) => items.push(item?),
            None => {
                return Ok(Page {
                    items,
                    exhausted: true,
                });
            }
        }
    }
    let exhausted = match iter.next() {
        None => true,
        Some(Ok(_)) => false,
        Some(Err(e)) => return Err(e),
    };
    Ok(Page { items, exhausted })
}

/// Yield the elements satisfying `pred`, in order.
pub fn filter<I, P>(pred: P, iter: I) -> std::iter::Filter<I, P>
where
    I: Iterator,
    P: FnMut(&I::Item) -> bool,
{
    iter.filter(pred)
}

/// Discard elements until one satisfies `pred`; that element and everything
/// after it are yielded.
pub fn skip_until<I, P>(pred: P, iter: I) -> SkipUntil<I, P>
where
    I: Iterator,
    P: FnMut(&I::Item) -> bool,
{
    SkipUntil {
        iter,
        pred: Some(pred),
    }
}

pub struct SkipUntil<I, P> {
    iter: I,
    pred: Option<P>,
}

impl<I, P> Iterator for SkipUntil<I, P>
where
    I: Iterator,
    P: FnMut(&I::Item) -> bool,
{
    type Item = I::Item;

    fn next(&mut self) -> Option<I::Item> {
        if let Some(mut pred) = self.pred.take() {
            return self.iter.by_ref().find(|x| pred(x));
        }
        self.iter.next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drop_skips_prefix() {
        let v: Vec<_> = drop(2, 1..=5).collect();
        assert_eq!(v, vec![3, 4, 5]);
    }

    #[test]
    fn drop_past_end() {
        assert_eq!(drop(10, 1..=3).count(), 0);
    }

    #[test]
    fn drop_zero_is_identity() {
        let v: Vec<_> = drop(0, 1..=3).collect();
        assert_eq!(v, vec![1, 2, 3]);
    }

    #[test]
    fn try_drop_surfaces_skipped_error() {
        let source = vec![Ok(1), Err("bad"), Ok(3)];
        assert!(matches!(try_drop(2, source.into_iter()), Err("bad")));
        let source = vec![Ok::<_, ()>(1), Ok(2), Ok(3)];
        let rest: Vec<_> = try_drop(2, source.into_iter()).unwrap().collect();
        assert_eq!(rest, vec![Ok(3)]);
    }

    #[test]
    fn take_reports_more_remaining() {
        let mut t = take(2, 1..=5);
        assert_eq!(t.exhausted(), None);
        assert_eq!(t.by_ref().collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(t.exhausted(), Some(false));
    }

    #[test]
    fn take_exact_length_is_exhausted() {
        let mut t = take(3, 1..=3);
        assert_eq!(t.by_ref().count(), 3);
        assert_eq!(t.exhausted(), Some(true));
    }

    #[test]
    fn take_short_sequence_is_exhausted() {
        let mut t = take(10, 1..=3);
        assert_eq!(t.by_ref().count(), 3);
        assert_eq!(t.exhausted(), Some(true));
    }

    #[test]
    fn take_is_fused_after_cut() {
        let mut t = take(1, 1..=3);
        assert_eq!(t.next(), Some(1));
        assert_eq!(t.next(), None);
        assert_eq!(t.next(), None);
    }

    #[test]
    fn drop_then_take_shares_one_cursor() {
        let mut source = 0..5;
        let page = take_page(2, drop(1, source.by_ref()));
        assert_eq!(page.items, vec![1, 2]);
        assert!(!page.exhausted);
        // One element was looked at past the cut; the cursor moved on.
        assert_eq!(source.collect::<Vec<_>>(), vec![4]);
    }

    #[test]
    fn page_covers_remainder() {
        let page = take_page(10, drop(1, 0..5));
        assert_eq!(page.items, vec![1, 2, 3, 4]);
        assert!(page.exhausted);
    }

    #[test]
    fn try_page_propagates_error_past_cut() {
        let source = vec![Ok(1), Ok(2), Err("bad")];
        assert_eq!(try_take_page(2, source.into_iter()), Err("bad"));
    }

    #[test]
    fn try_page_ok() {
        let source = vec![Ok::<_, ()>(1), Ok(2), Ok(3)];
        let page = try_take_page(2, source.into_iter()).unwrap();
        assert_eq!(page.items, vec![1, 2]);
        assert!(!page.exhausted);
    }

    #[test]
    fn filter_preserves_order() {
        let v: Vec<_> = filter(|x: &i32| x % 2 == 0, 1..=6).collect();
        assert_eq!(v, vec![2, 4, 6]);
    }

    #[test]
    fn skip_until_keeps_first_match() {
        let v: Vec<_> = skip_until(|x: &i32| *x >= 3, [1, 2, 3, 1, 5].into_iter()).collect();
        assert_eq!(v, vec![3, 1, 5]);
    }

    #[test]
    fn skip_until_no_match() {
        assert_eq!(skip_until(|x: &i32| *x > 9, 1..=3).count(), 0);
    }
}
