//! Folding pipeline states into an ordered list.

use super::output::{Busy, Output};
use crate::pager::PagingState;
use pagewise_core::{Direction, Key, Page, Request, RequestParams, Value};

/// What a trigger should send, given the pages seen so far.
#[derive(Debug, Clone)]
pub enum Plan<K> {
    /// Start over from the source's refresh key.
    Refresh,
    /// The last page in this direction was incomplete; ask for it again.
    Reissue(RequestParams<K>),
    /// Move on to the neighboring key.
    Advance(K),
    /// The last page was complete and has no neighbor. Nothing to do.
    Exhausted,
}

/// The accumulated list and the two boundary pages it grows from.
///
/// `last_prepend` is the page at the front of the list, `last_append` the one
/// at the back. A refresh sets both to the same page. When a page arrives for
/// the same key as the boundary page in its direction, the boundary page's
/// values are replaced rather than duplicated.
#[derive(Debug)]
pub struct Accumulator<K, V> {
    output: Output<V>,
    last_prepend: Option<Page<K, V>>,
    last_append: Option<Page<K, V>>,
}

impl<K: Key, V: Value> Accumulator<K, V> {
    /// Empty list, no boundaries.
    pub fn new() -> Self {
        Self {
            output: Output::new(),
            last_prepend: None,
            last_append: None,
        }
    }

    /// The current output.
    pub fn output(&self) -> &Output<V> {
        &self.output
    }

    /// The page at the front of the list.
    pub fn last_prepend(&self) -> Option<&Page<K, V>> {
        self.last_prepend.as_ref()
    }

    /// The page at the back of the list.
    pub fn last_append(&self) -> Option<&Page<K, V>> {
        self.last_append.as_ref()
    }

    /// Fold one pipeline state in.
    pub fn apply(&mut self, state: PagingState<K, V>) -> &Output<V> {
        match state {
            PagingState::Refreshing => self.output.busy = Busy::REFRESHING,
            PagingState::Prepending => {
                self.output.busy.remove(Busy::REFRESHING);
                self.output.busy.insert(Busy::PREPENDING);
            }
            PagingState::Appending => {
                self.output.busy.remove(Busy::REFRESHING);
                self.output.busy.insert(Busy::APPENDING);
            }
            PagingState::Done(page) => self.fold(page),
        }
        &self.output
    }

    fn fold(&mut self, page: Page<K, V>) {
        match page.request.direction() {
            Direction::Refresh => {
                self.output.values = page.values.clone();
                self.output.busy = Busy::empty();
                self.last_prepend = Some(page.clone());
                self.last_append = Some(page);
            }
            Direction::Prepend => {
                let stale = overlap(self.last_prepend.as_ref(), &page).min(self.output.values.len());
                let mut values = page.values.clone();
                values.extend(self.output.values.drain(stale..));
                self.output.values = values;
                self.output.busy.remove(Busy::PREPENDING);
                self.last_prepend = Some(page);
            }
            Direction::Append => {
                let stale = overlap(self.last_append.as_ref(), &page);
                let keep = self.output.values.len().saturating_sub(stale);
                self.output.values.truncate(keep);
                self.output.values.extend(page.values.iter().cloned());
                self.output.busy.remove(Busy::APPENDING);
                self.last_append = Some(page);
            }
        }
    }

    /// Decide what a trigger in `direction` should send.
    pub fn plan(&self, direction: Direction) -> Plan<K> {
        let last = match direction {
            Direction::Refresh => return Plan::Refresh,
            Direction::Prepend => &self.last_prepend,
            Direction::Append => &self.last_append,
        };
        let Some(last) = last else {
            return Plan::Refresh;
        };

        if !last.is_complete() {
            return Plan::Reissue(last.request.params().clone());
        }

        let chain = last.request.params().key_chain();
        let neighbor = match direction {
            Direction::Prepend => &chain.prev_key,
            _ => &chain.next_key,
        };
        match neighbor {
            Some(key) => Plan::Advance(key.clone()),
            None => Plan::Exhausted,
        }
    }
}

impl<K: Key, V: Value> Default for Accumulator<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

/// Values of `boundary` that `page` replaces: all of them when both target
/// the same key.
fn overlap<K: Key, V>(boundary: Option<&Page<K, V>>, page: &Page<K, V>) -> usize {
    boundary
        .filter(|boundary| boundary.key() == page.key())
        .map_or(0, Page::len)
}

/// Turn a plan into a request. `None` when the plan is [`Plan::Exhausted`].
pub(crate) fn plan_request<K>(
    direction: Direction,
    plan: Plan<K>,
    build: impl FnOnce(Direction, Option<K>) -> Request<K>,
) -> Option<Request<K>>
where
    K: Key,
{
    match plan {
        Plan::Refresh => Some(build(Direction::Refresh, None)),
        Plan::Reissue(params) => Some(Request::new(direction, params.restamped())),
        Plan::Advance(key) => Some(build(direction, Some(key))),
        Plan::Exhausted => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagewise_core::{KeyChain, RequestParams};
    use std::num::NonZeroUsize;

    fn page(direction: Direction, key: i32, values: &[&'static str]) -> Page<i32, &'static str> {
        let chain = KeyChain::new(key, Some(key - 1), Some(key + 1));
        let request = Request::new(
            direction,
            RequestParams::new(chain, NonZeroUsize::new(3).unwrap()),
        );
        Page::new(request, values.to_vec())
    }

    fn done(
        acc: &mut Accumulator<i32, &'static str>,
        direction: Direction,
        key: i32,
        values: &[&'static str],
    ) -> Vec<&'static str> {
        acc.apply(PagingState::Done(page(direction, key, values)))
            .values
            .clone()
    }

    #[test]
    fn test_refresh_replaces_everything() {
        let mut acc = Accumulator::new();
        done(&mut acc, Direction::Refresh, 0, &["a", "b", "c"]);
        done(&mut acc, Direction::Append, 1, &["d", "e", "f"]);
        let values = done(&mut acc, Direction::Refresh, 0, &["x", "y", "z"]);
        assert_eq!(values, ["x", "y", "z"]);
        assert_eq!(acc.last_prepend().unwrap().key(), acc.last_append().unwrap().key());
    }

    #[test]
    fn test_prepend_replaces_incomplete_front_page() {
        let mut acc = Accumulator::new();
        done(&mut acc, Direction::Refresh, 5, &["a", "b", "c"]);
        done(&mut acc, Direction::Prepend, 4, &["p", "q"]);

        // The same key again, now complete.
        let values = done(&mut acc, Direction::Prepend, 4, &["o", "p", "q"]);
        assert_eq!(values, ["o", "p", "q", "a", "b", "c"]);
    }

    #[test]
    fn test_prepend_overlap_keeps_values_past_stale_prefix() {
        let sized = |direction, key, values: &[&'static str]| {
            let request = Request::new(
                direction,
                RequestParams::new(KeyChain::isolated(key), NonZeroUsize::new(5).unwrap()),
            );
            PagingState::Done(Page::new(request, values.to_vec()))
        };

        let mut acc = Accumulator::new();
        acc.apply(sized(Direction::Refresh, 9, &["c"]));
        acc.apply(sized(Direction::Prepend, 4, &["a", "b"]));
        assert_eq!(acc.output().values, ["a", "b", "c"]);

        let output = acc.apply(sized(
            Direction::Prepend,
            4,
            &["x1", "x2", "x3", "x4", "x5"],
        ));
        assert_eq!(output.values, ["x1", "x2", "x3", "x4", "x5", "c"]);
    }

    #[test]
    fn test_prepend_overlap_with_refresh_page() {
        let mut acc = Accumulator::new();
        done(&mut acc, Direction::Refresh, 5, &["a", "b"]);

        // Reissued refresh key as a prepend: the old page's values go away.
        let values = done(&mut acc, Direction::Prepend, 5, &["x1", "x2", "x3"]);
        assert_eq!(values, ["x1", "x2", "x3"]);
    }

    #[test]
    fn test_append_replaces_incomplete_back_page() {
        let mut acc = Accumulator::new();
        done(&mut acc, Direction::Refresh, 0, &["a", "b", "c"]);
        done(&mut acc, Direction::Append, 1, &["d"]);
        let values = done(&mut acc, Direction::Append, 1, &["d", "e", "f"]);
        assert_eq!(values, ["a", "b", "c", "d", "e", "f"]);
    }

    #[test]
    fn test_busy_flags() {
        let mut acc = Accumulator::<i32, &'static str>::new();
        assert!(acc.apply(PagingState::Refreshing).is_refreshing());

        let output = acc.apply(PagingState::Appending);
        assert!(!output.is_refreshing());
        assert!(output.is_appending());

        let output = acc.apply(PagingState::Prepending);
        assert!(output.is_appending() && output.is_prepending());

        acc.apply(PagingState::Done(page(Direction::Append, 1, &["a"])));
        assert_eq!(acc.output().busy, Busy::PREPENDING);

        acc.apply(PagingState::Refreshing);
        acc.apply(PagingState::Done(page(Direction::Refresh, 0, &["a"])));
        assert!(!acc.output().is_busy());
    }

    #[test]
    fn test_plan() {
        let mut acc = Accumulator::<i32, &'static str>::new();
        assert!(matches!(acc.plan(Direction::Append), Plan::Refresh));
        assert!(matches!(acc.plan(Direction::Prepend), Plan::Refresh));

        done(&mut acc, Direction::Refresh, 5, &["a", "b", "c"]);
        assert!(matches!(acc.plan(Direction::Prepend), Plan::Advance(4)));
        assert!(matches!(acc.plan(Direction::Append), Plan::Advance(6)));
        assert!(matches!(acc.plan(Direction::Refresh), Plan::Refresh));

        done(&mut acc, Direction::Append, 6, &["d"]);
        match acc.plan(Direction::Append) {
            Plan::Reissue(params) => assert_eq!(params.key_chain().key, 6),
            other => panic!("expected a reissue, got {other:?}"),
        }
    }

    #[test]
    fn test_plan_exhausted_without_neighbor() {
        let mut acc = Accumulator::<i32, &'static str>::new();
        let request = Request::Refresh(RequestParams::new(
            KeyChain::isolated(0),
            NonZeroUsize::new(1).unwrap(),
        ));
        acc.apply(PagingState::Done(Page::new(request, vec!["only"])));
        assert!(matches!(acc.plan(Direction::Append), Plan::Exhausted));
        assert!(matches!(acc.plan(Direction::Prepend), Plan::Exhausted));
    }

    #[tokio::test(start_paused = true)]
    async fn test_plan_request_restamps_reissues() {
        let params = RequestParams::new(KeyChain::isolated(3), NonZeroUsize::new(2).unwrap());
        let stamp = params.timestamp();
        tokio::time::advance(std::time::Duration::from_secs(1)).await;

        let request = plan_request(Direction::Append, Plan::Reissue(params), |_, _| {
            unreachable!("reissues reuse their params")
        })
        .unwrap();
        assert_eq!(request.direction(), Direction::Append);
        assert!(request.params().timestamp() > stamp);

        assert!(plan_request::<i32>(Direction::Append, Plan::Exhausted, |_, _| unreachable!()).is_none());
    }
}
