//! A fault-tolerant distributed MapReduce engine.
//!
//! A coordinator hands map and reduce tasks to a dynamically changing pool of
//! workers, re-assigns the work of crashed workers, and stitches the
//! partitioned intermediate output into per-partition results. All input,
//! intermediate, and output data lives on a filesystem shared by every
//! process in the job.

use anyhow::bail;
use serde::{Deserialize, Serialize};
use std::hash::Hasher;

pub mod cmd;
pub mod codec;
pub mod executor;
pub mod schedule;
pub mod standalone;
pub mod workload;

/////////////////////////////////////////////////////////////////////////////
// MapReduce application types
/////////////////////////////////////////////////////////////////////////////

/// The output of an application map function.
///
/// The [`anyhow::Result`] layer accounts for inputs the application cannot
/// make sense of; such a failure fails the whole task attempt.
pub type MapOutput = anyhow::Result<Vec<KeyValue>>;

/// A map function takes the name of an input file and its full contents.
///
/// It returns the key-value pairs mined from that input. It performs no I/O
/// of its own.
pub type MapFn = fn(input_name: &str, contents: &str) -> MapOutput;

/// A reduce function takes a key and every value recorded for that key
/// across all map tasks, and folds them into a single output value.
///
/// The value slice is a multiset: ordering across the map tasks that emitted
/// the values is not guaranteed.
pub type ReduceFn = fn(key: &str, values: &[String]) -> anyhow::Result<String>;

/// A map reduce application.
#[derive(Copy, Clone)]
pub struct Workload {
    pub map_fn: MapFn,
    pub reduce_fn: ReduceFn,
}

/////////////////////////////////////////////////////////////////////////////
// Key-value pairs
/////////////////////////////////////////////////////////////////////////////

/// A single key-value pair.
///
/// Pairs with equal keys are independent occurrences, never merged; the
/// reduce side sees every one of them.
#[derive(Clone, Eq, PartialEq, Hash, Debug, Serialize, Deserialize)]
pub struct KeyValue {
    /// The key.
    pub key: String,
    /// The value.
    pub value: String,
}

impl KeyValue {
    /// Construct a new key-value pair from the given key and value.
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/////////////////////////////////////////////////////////////////////////////
// Jobs and phases
/////////////////////////////////////////////////////////////////////////////

/// Which of the two global stages of a job a task belongs to.
///
/// All tasks of a phase complete before the job advances to the next.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Phase {
    Map,
    Reduce,
}

impl Phase {
    /// The wire spelling of this phase.
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Map => "Map",
            Phase::Reduce => "Reduce",
        }
    }
}

impl std::str::FromStr for Phase {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Map" => Ok(Phase::Map),
            "Reduce" => Ok(Phase::Reduce),
            other => bail!("unknown phase `{other}`"),
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One MapReduce job, immutable for the run.
#[derive(Clone, Debug)]
pub struct Job {
    /// Identifier used to namespace this job's intermediate files.
    pub name: String,
    /// Name of the registered workload to run.
    pub workload: String,
    /// The input files, one map task per file.
    pub files: Vec<String>,
    /// Number of reduce partitions.
    pub n_reduce: usize,
}

/// Hashes an intermediate key. Compute a reduce bucket for a given key
/// by calculating `ihash(key) % n_reduce`.
///
/// The result depends only on the key bytes, so every process in the job
/// routes a given key to the same partition.
pub fn ihash(key: &str) -> u32 {
    let mut hasher = fnv::FnvHasher::with_key(0);
    hasher.write(key.as_bytes());
    (hasher.finish() & 0x7fffffff) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ihash_is_stable_and_non_negative() {
        for key in ["", "a", "the", "sat", "\u{1f980} crab"] {
            assert_eq!(ihash(key), ihash(key));
            assert_eq!(ihash(key) & 0x8000_0000, 0);
        }
    }

    #[test]
    fn bucket_routing_is_a_pure_function_of_key_and_r() {
        let r = 7u32;
        let repeats: Vec<u32> = (0..4).map(|_| ihash("dog") % r).collect();
        assert!(repeats.windows(2).all(|w| w[0] == w[1]));
    }

    #[test]
    fn phase_spelling_round_trips() {
        for phase in [Phase::Map, Phase::Reduce] {
            assert_eq!(phase.as_str().parse::<Phase>().unwrap(), phase);
        }
        assert!("Shuffle".parse::<Phase>().is_err());
    }
}
