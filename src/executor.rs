//! Map- and reduce-side task execution.
//!
//! [`perform_map`] and [`perform_reduce`] each run one task on whichever
//! worker was assigned it. Every failure is returned to the caller so the
//! attempt can be reported as failed over the RPC boundary and the task
//! retried on another worker; nothing here ever aborts the worker process.

use crate::codec::{self, BucketMap};
use crate::{ihash, KeyValue, MapFn, ReduceFn};
use anyhow::{Context, Result};
use dashmap::DashMap;
use itertools::Itertools;
use std::fs;
use std::path::Path;

// types related to the map side
type BucketIndex = u32;
type Buckets = DashMap<BucketIndex, Vec<KeyValue>>;

/// Runs one map task: reads `input`, applies `map_fn` to its contents, and
/// partitions the emitted pairs into `n_reduce` bucket files under `dir`.
///
/// Each key's values keep the order the map function emitted them in, with
/// duplicates retained. All `n_reduce` bucket files are written even when
/// empty, and each is rewritten in full, so a retried task replaces whatever
/// an earlier attempt left behind instead of appending to it.
pub fn perform_map(
    dir: &Path,
    job_name: &str,
    task_index: usize,
    input: &str,
    n_reduce: usize,
    map_fn: MapFn,
) -> Result<()> {
    let contents =
        fs::read_to_string(input).with_context(|| format!("reading map input `{input}`"))?;

    let buckets: Buckets = Buckets::new();
    for item in map_fn(input, &contents)? {
        let bucket_no = ihash(&item.key) % n_reduce as u32;
        buckets.entry(bucket_no).or_default().push(item);
    }

    for reduce_task in 0..n_reduce {
        let mut bucket = BucketMap::new();
        if let Some((_, pairs)) = buckets.remove(&(reduce_task as u32)) {
            for KeyValue { key, value } in pairs {
                bucket.entry(key).or_default().push(value);
            }
        }
        codec::write_bucket(
            &codec::bucket_path(dir, job_name, task_index, reduce_task),
            &bucket,
        )?;
    }
    Ok(())
}

/// Runs one reduce task: decodes this task's bucket from all `n_map` map
/// outputs under `dir`, concatenates the value lists per key, and applies
/// `reduce_fn` to each key in sorted order.
///
/// The combined mapping starts empty and is populated strictly from decoded
/// bucket files; a missing or corrupt file fails the attempt rather than
/// silently under-counting values.
pub fn perform_reduce(
    dir: &Path,
    job_name: &str,
    task_index: usize,
    n_map: usize,
    reduce_fn: ReduceFn,
) -> Result<()> {
    let mut merged = BucketMap::new();
    for map_task in 0..n_map {
        let bucket = codec::read_bucket(&codec::bucket_path(dir, job_name, map_task, task_index))?;
        for (key, mut values) in bucket {
            merged.entry(key).or_default().append(&mut values);
        }
    }

    let mut records = Vec::with_capacity(merged.len());
    for (key, values) in merged.into_iter().sorted_by(|a, b| a.0.cmp(&b.0)) {
        let reduced = reduce_fn(&key, &values)
            .with_context(|| format!("reducing key `{key}`"))?;
        records.push(KeyValue {
            key,
            value: reduced,
        });
    }

    codec::write_output(&codec::output_path(dir, job_name, task_index), &records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    // Test workload: each input line is "key value"; reduce joins values.
    fn pairs_map(_input: &str, contents: &str) -> crate::MapOutput {
        let mut pairs = Vec::new();
        for line in contents.lines().filter(|l| !l.trim().is_empty()) {
            let (key, value) = line
                .split_once(' ')
                .ok_or_else(|| anyhow::anyhow!("malformed test line `{line}`"))?;
            pairs.push(KeyValue::new(key, value));
        }
        Ok(pairs)
    }

    fn join_reduce(_key: &str, values: &[String]) -> Result<String> {
        Ok(values.join(","))
    }

    #[test]
    fn retried_map_task_overwrites_its_own_buckets() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.txt");
        fs::write(&input, "a 1").unwrap();
        let input = input.display().to_string();

        // Simulate a retry after the scheduler missed the first success.
        perform_map(dir.path(), "job", 0, &input, 1, pairs_map).unwrap();
        perform_map(dir.path(), "job", 0, &input, 1, pairs_map).unwrap();

        let bucket = codec::read_bucket(&codec::bucket_path(dir.path(), "job", 0, 0)).unwrap();
        assert_eq!(bucket["a"], vec!["1"]);
    }

    #[test]
    fn reduce_sees_every_value_from_every_map_task() {
        let dir = tempfile::tempdir().unwrap();
        for (task_index, contents) in ["a 1\na 2", "a 3"].iter().enumerate() {
            let input = dir.path().join(format!("in-{task_index}.txt"));
            fs::write(&input, contents).unwrap();
            perform_map(
                dir.path(),
                "job",
                task_index,
                &input.display().to_string(),
                1,
                pairs_map,
            )
            .unwrap();
        }

        perform_reduce(dir.path(), "job", 0, 2, join_reduce).unwrap();

        let records = codec::read_output(&codec::output_path(dir.path(), "job", 0)).unwrap();
        assert_eq!(records, vec![KeyValue::new("a", "1,2,3")]);
    }

    #[test]
    fn reduce_output_is_in_sorted_key_order() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.txt");
        fs::write(&input, "b 1\na 1\nc 1").unwrap();
        perform_map(
            dir.path(),
            "job",
            0,
            &input.display().to_string(),
            1,
            pairs_map,
        )
        .unwrap();

        perform_reduce(dir.path(), "job", 0, 1, join_reduce).unwrap();

        let records = codec::read_output(&codec::output_path(dir.path(), "job", 0)).unwrap();
        let keys: Vec<&str> = records.iter().map(|kv| kv.key.as_str()).collect();
        assert_eq!(keys, vec!["a", "b", "c"]);
    }

    #[test]
    fn map_writes_all_buckets_even_when_empty() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.txt");
        fs::write(&input, "a 1").unwrap();
        perform_map(
            dir.path(),
            "job",
            0,
            &input.display().to_string(),
            3,
            pairs_map,
        )
        .unwrap();

        let mut non_empty = 0;
        for reduce_task in 0..3 {
            let bucket =
                codec::read_bucket(&codec::bucket_path(dir.path(), "job", 0, reduce_task)).unwrap();
            non_empty += usize::from(!bucket.is_empty());
        }
        assert_eq!(non_empty, 1);
    }

    #[test]
    fn unreadable_input_fails_the_attempt() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("no-such-file").display().to_string();
        assert!(perform_map(dir.path(), "job", 0, &missing, 2, pairs_map).is_err());
        // No partial bucket files may be left behind.
        assert!(!codec::bucket_path(dir.path(), "job", 0, 0).exists());
    }

    #[test]
    fn reduce_with_missing_bucket_file_fails_the_attempt() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.txt");
        fs::write(&input, "a 1").unwrap();
        perform_map(
            dir.path(),
            "job",
            0,
            &input.display().to_string(),
            1,
            pairs_map,
        )
        .unwrap();

        // Claims two map tasks ran, but only task 0 wrote its buckets.
        assert!(perform_reduce(dir.path(), "job", 0, 2, join_reduce).is_err());
    }
}
