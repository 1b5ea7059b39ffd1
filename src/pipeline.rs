//! Batched concurrent lookup pipeline.
//!
//! A feeder thread pushes address batches into a bounded queue, a fixed pool
//! of workers resolves them against a shared [`Trie`], and the calling thread
//! drains result batches from a second bounded queue. Each queue closes when
//! its last sender is dropped, so shutdown flows feeder → workers → consumer.
//!
//! With more than one worker, result batches arrive in completion order, not
//! submission order. The set of matches is the same for any worker count.

use ahash::AHashSet;
use crossbeam_channel::bounded;
use std::io::{self, BufRead};
use std::num::NonZeroUsize;
use std::panic;
use std::thread;

use crate::trie::Trie;
use crate::Result;

/// Default number of addresses per input batch.
pub const DEFAULT_BATCH_SIZE: usize = 4096;

/// Default queue slots per worker.
const QUEUE_SLOTS_PER_WORKER: usize = 2;

/// Configuration for the lookup pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Number of worker threads (at least 1).
    pub workers: usize,
    /// Addresses per batch when reading a line stream.
    pub batch_size: usize,
    /// Capacity of each queue, in batches.
    pub queue_depth: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let workers = thread::available_parallelism()
            .map(NonZeroUsize::get)
            .unwrap_or(1);
        Self::with_workers(workers)
    }
}

impl PipelineConfig {
    /// Create a configuration with the given worker count.
    ///
    /// A count of 0 is raised to 1.
    pub fn with_workers(workers: usize) -> Self {
        let workers = workers.max(1);
        Self {
            workers,
            batch_size: DEFAULT_BATCH_SIZE,
            queue_depth: workers * QUEUE_SLOTS_PER_WORKER,
        }
    }

    /// Set the batch size used when reading line streams.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Set the queue capacity, in batches.
    pub fn with_queue_depth(mut self, queue_depth: usize) -> Self {
        self.queue_depth = queue_depth.max(1);
        self
    }
}

/// Case-insensitive set of owners to keep. An empty filter keeps everything.
#[derive(Debug, Clone, Default)]
pub struct OwnerFilter {
    allowed: AHashSet<String>,
}

impl OwnerFilter {
    /// Filter that accepts every owner.
    pub fn allow_all() -> Self {
        Self::default()
    }

    /// Build a filter from owner names. Blank names are ignored.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let allowed = names
            .into_iter()
            .map(|name| name.as_ref().trim().to_lowercase())
            .filter(|name| !name.is_empty())
            .collect();
        Self { allowed }
    }

    /// Parse a comma-separated owner list such as `"aws, GCP"`.
    pub fn parse(list: &str) -> Self {
        Self::new(list.split(','))
    }

    /// Whether this filter accepts every owner.
    pub fn is_empty(&self) -> bool {
        self.allowed.is_empty()
    }

    /// Check whether `owner` passes the filter.
    pub fn allows(&self, owner: &str) -> bool {
        self.allowed.is_empty() || self.allowed.contains(&owner.to_lowercase())
    }
}

/// A resolved address.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Match {
    /// Address as it appeared in the input.
    pub addr: String,
    /// Owner name, never empty.
    pub owner: String,
}

/// Counters for one pipeline run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    /// Input batches submitted.
    pub batches: usize,
    /// Addresses submitted.
    pub addresses: usize,
    /// Matches delivered to the sink.
    pub matches: usize,
}

/// Resolve one batch, dropping misses and filtered owners.
pub fn lookup_batch(trie: &Trie, filter: &OwnerFilter, batch: Vec<String>) -> Vec<Match> {
    batch
        .into_iter()
        .filter_map(|addr| {
            let owner = trie.lookup(&addr);
            if owner.is_empty() || !filter.allows(owner) {
                return None;
            }
            Some(Match {
                owner: owner.to_string(),
                addr,
            })
        })
        .collect()
}

/// Worker pool that applies a shared trie to batches of addresses.
pub struct LookupPipeline<'t> {
    trie: &'t Trie,
    filter: OwnerFilter,
    config: PipelineConfig,
}

impl<'t> LookupPipeline<'t> {
    /// Create a pipeline over `trie` with the default configuration.
    pub fn new(trie: &'t Trie) -> Self {
        Self::with_config(trie, PipelineConfig::default())
    }

    /// Create a pipeline with a custom configuration.
    pub fn with_config(trie: &'t Trie, config: PipelineConfig) -> Self {
        Self {
            trie,
            filter: OwnerFilter::allow_all(),
            config,
        }
    }

    /// Only report matches whose owner passes `filter`.
    pub fn with_filter(mut self, filter: OwnerFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Get the pipeline configuration.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Resolve the given addresses as a single batch.
    pub fn run_addrs<F>(&self, addrs: Vec<String>, sink: F) -> PipelineStats
    where
        F: FnMut(Vec<Match>),
    {
        self.run(std::iter::once(addrs), sink)
    }

    /// Resolve addresses read line by line from `reader`.
    ///
    /// Lines are trimmed and blank lines skipped. A read error stops the
    /// feeder; batches already queued are still resolved before the error is
    /// returned.
    pub fn run_reader<R, F>(&self, reader: R, sink: F) -> Result<PipelineStats>
    where
        R: BufRead + Send,
        F: FnMut(Vec<Match>),
    {
        let mut batches = LineBatches::new(reader, self.config.batch_size);
        let stats = self.run(&mut batches, sink);
        match batches.error.take() {
            Some(e) => Err(e.into()),
            None => Ok(stats),
        }
    }

    /// Resolve every batch from `batches`, passing each non-empty result batch
    /// to `sink` on the calling thread.
    pub fn run<B, F>(&self, batches: B, mut sink: F) -> PipelineStats
    where
        B: IntoIterator<Item = Vec<String>>,
        B::IntoIter: Send,
        F: FnMut(Vec<Match>),
    {
        let batches = batches.into_iter();
        let depth = self.config.queue_depth.max(1);
        let (batch_tx, batch_rx) = bounded::<Vec<String>>(depth);
        let (result_tx, result_rx) = bounded::<Vec<Match>>(depth);

        thread::scope(|scope| {
            let feeder = scope.spawn(move || {
                let mut stats = PipelineStats::default();
                for batch in batches {
                    stats.batches += 1;
                    stats.addresses += batch.len();
                    if batch_tx.send(batch).is_err() {
                        break;
                    }
                }
                stats
            });

            for _ in 0..self.config.workers.max(1) {
                let batch_rx = batch_rx.clone();
                let result_tx = result_tx.clone();
                let trie = self.trie;
                let filter = &self.filter;
                scope.spawn(move || {
                    for batch in batch_rx {
                        let results = lookup_batch(trie, filter, batch);
                        if !results.is_empty() && result_tx.send(results).is_err() {
                            break;
                        }
                    }
                });
            }
            drop(batch_rx);
            drop(result_tx);

            let mut matches = 0;
            for results in result_rx {
                matches += results.len();
                sink(results);
            }

            let mut stats = match feeder.join() {
                Ok(stats) => stats,
                Err(payload) => panic::resume_unwind(payload),
            };
            stats.matches = matches;
            stats
        })
    }
}

/// Splits a line stream into fixed-size batches of trimmed, non-blank lines.
///
/// Lines that are not valid UTF-8 are decoded lossily and later fail to
/// parse like any other malformed address. Iteration ends at EOF or at the
/// first read error, which is kept in `error` for the caller to inspect
/// afterwards.
pub struct LineBatches<R> {
    reader: R,
    batch_size: usize,
    line: Vec<u8>,
    done: bool,
    /// First read error, if any.
    pub error: Option<io::Error>,
}

impl<R: BufRead> LineBatches<R> {
    /// Create a batcher yielding at most `batch_size` lines per batch.
    pub fn new(reader: R, batch_size: usize) -> Self {
        Self {
            reader,
            batch_size: batch_size.max(1),
            line: Vec::new(),
            done: false,
            error: None,
        }
    }
}

impl<R: BufRead> Iterator for LineBatches<R> {
    type Item = Vec<String>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let mut batch = Vec::with_capacity(self.batch_size);
        while batch.len() < self.batch_size {
            self.line.clear();
            match self.reader.read_until(b'\n', &mut self.line) {
                Ok(0) => {
                    self.done = true;
                    break;
                }
                Ok(_) => {
                    let line = String::from_utf8_lossy(&self.line);
                    let addr = line.trim();
                    if !addr.is_empty() {
                        batch.push(addr.to_string());
                    }
                }
                Err(e) => {
                    self.error = Some(e);
                    self.done = true;
                    break;
                }
            }
        }
        if batch.is_empty() {
            None
        } else {
            Some(batch)
        }
    }
}
