//! Cluster-wide key enumeration
//!
//! # Algorithm
//!
//! 1. Broadcast one enumeration task to every member
//! 2. If a completed member's keys are still being drained, return the next
//!    one not yet seen
//! 3. Otherwise wait on all outstanding tasks at once, bounded by the poll
//!    interval; an elapsed round is logged and the wait resumes
//! 4. The first task to finish becomes the one being drained
//! 5. Stop when no task is outstanding and nothing is left to drain
//!
//! Waiting on every handle together means a slow member never delays keys
//! from members that already finished.

use std::collections::{BTreeMap, HashSet};
use std::hash::Hash;
use std::time::Duration;

use futures_util::future::{BoxFuture, FutureExt};
use futures_util::stream::{FuturesUnordered, StreamExt};
use tokio::task::{AbortHandle, JoinError};

use crate::observability::{Diagnostics, Event};

use super::config::EnumerationConfig;
use super::errors::{EnumerationError, EnumerationResult};
use super::sequence::{KeySequence, LocalKeys};
use super::{KeyedCache, MemberId, MemberTask};

type MemberOutcome<K> = (MemberId, Result<EnumerationResult<Vec<K>>, JoinError>);

/// Dispatches key enumeration to every member of a cache's cluster.
#[derive(Debug, Clone, Default)]
pub struct DistributedKeyEnumerator {
    config: EnumerationConfig,
    diagnostics: Diagnostics,
}

impl DistributedKeyEnumerator {
    pub fn new(config: EnumerationConfig) -> Self {
        Self {
            config,
            diagnostics: Diagnostics::disabled(),
        }
    }

    pub fn with_diagnostics(mut self, diagnostics: Diagnostics) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    /// Produce every key in `cache`.
    ///
    /// A cache without a cluster yields its local iterator directly and makes
    /// no cluster calls. A distributed cache has one task submitted to each
    /// member; the returned sequence merges their results as they complete.
    ///
    /// Must be called from within a tokio runtime when the cache is
    /// distributed.
    pub fn enumerate_keys<K, C>(&self, cache: &C) -> KeySequence<K>
    where
        K: Clone + Eq + Hash + Send + 'static,
        C: KeyedCache<K> + ?Sized,
    {
        let Some(cluster) = cache.cluster() else {
            return KeySequence::Local(LocalKeys::new(cache.local_keys(), self.diagnostics.clone()));
        };

        let tasks = cluster.submit_everywhere(cache.name());
        let members = tasks.len().to_string();
        self.diagnostics.event(
            Event::EnumerationStart,
            &[("cache", cache.name()), ("members", members.as_str())],
        );

        KeySequence::Distributed(DistributedKeys::new(
            tasks,
            self.config.poll_interval(),
            self.diagnostics.clone(),
        ))
    }
}

/// Keys merged from all member tasks of one broadcast.
pub struct DistributedKeys<K> {
    pending: FuturesUnordered<BoxFuture<'static, MemberOutcome<K>>>,
    outstanding: BTreeMap<MemberId, AbortHandle>,
    current: Option<std::vec::IntoIter<K>>,
    seen: HashSet<K>,
    poll_interval: Duration,
    diagnostics: Diagnostics,
}

impl<K> DistributedKeys<K>
where
    K: Clone + Eq + Hash + Send + 'static,
{
    pub(crate) fn new(tasks: Vec<MemberTask<K>>, poll_interval: Duration, diagnostics: Diagnostics) -> Self {
        let mut outstanding = BTreeMap::new();
        let pending = FuturesUnordered::new();

        for MemberTask { member, handle } in tasks {
            outstanding.insert(member.clone(), handle.abort_handle());
            pending.push(async move { (member, handle.await) }.boxed());
        }

        Self {
            pending,
            outstanding,
            current: None,
            seen: HashSet::new(),
            poll_interval,
            diagnostics,
        }
    }

    /// Members whose tasks have not finished yet
    pub fn outstanding_members(&self) -> Vec<MemberId> {
        self.outstanding.keys().cloned().collect()
    }

    pub(crate) async fn next(&mut self) -> EnumerationResult<Option<K>> {
        loop {
            if let Some(keys) = self.current.as_mut() {
                for key in keys.by_ref() {
                    if self.seen.insert(key.clone()) {
                        self.diagnostics.metrics().increment_keys_enumerated();
                        return Ok(Some(key));
                    }
                }
                self.current = None;
            }

            if self.pending.is_empty() {
                return Ok(None);
            }

            let outcome = match tokio::time::timeout(self.poll_interval, self.pending.next()).await {
                Ok(Some(outcome)) => outcome,
                Ok(None) => return Ok(None),
                Err(_) => {
                    self.log_waiting();
                    continue;
                }
            };

            let keys = self.accept(outcome)?;
            self.current = Some(keys.into_iter());
        }
    }

    /// Retire a finished member, turning task failures into errors.
    fn accept(&mut self, (member, outcome): MemberOutcome<K>) -> EnumerationResult<Vec<K>> {
        self.outstanding.remove(&member);

        let result = match outcome {
            Ok(result) => result,
            Err(join_error) if join_error.is_cancelled() => {
                Err(EnumerationError::MemberCancelled { member: member.clone() })
            }
            Err(join_error) => Err(EnumerationError::MemberPanicked {
                member: member.clone(),
                reason: join_error.to_string(),
            }),
        };

        match result {
            Ok(keys) => {
                self.diagnostics.metrics().increment_member_tasks_completed();
                let count = keys.len().to_string();
                self.diagnostics.event(
                    Event::EnumerationMemberComplete,
                    &[("member", member.as_str()), ("keys", count.as_str())],
                );
                Ok(keys)
            }
            Err(err) => {
                self.diagnostics.metrics().increment_member_tasks_failed();
                let reason = err.to_string();
                self.diagnostics.event(
                    Event::EnumerationMemberFailed,
                    &[("member", member.as_str()), ("reason", reason.as_str())],
                );
                Err(err)
            }
        }
    }

    fn log_waiting(&self) {
        let waiting: Vec<&str> = self.outstanding.keys().map(MemberId::as_str).collect();
        let waiting = waiting.join(",");
        self.diagnostics
            .trace(Event::EnumerationWaiting, &[("outstanding", waiting.as_str())]);
    }
}

impl<K> Drop for DistributedKeys<K> {
    fn drop(&mut self) {
        // Abandoned sequences must not leave member tasks running
        for handle in self.outstanding.values() {
            handle.abort();
        }
    }
}
