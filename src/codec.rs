//! On-disk exchange format between map and reduce tasks.
//!
//! A map task writes one bucket file per reduce partition, holding a single
//! JSON map from key to the ordered list of values that task routed there.
//! A reduce task writes its partition output as one JSON [`KeyValue`] record
//! per line, in sorted key order. The matching encode and decode routines
//! both live here so the two sides cannot drift apart.

use crate::KeyValue;
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// The key-to-values association carried by one bucket file.
pub type BucketMap = HashMap<String, Vec<String>>;

/// Path of the intermediate file that map task `map_task` produces for
/// reduce task `reduce_task`.
pub fn bucket_path(dir: &Path, job_name: &str, map_task: usize, reduce_task: usize) -> PathBuf {
    dir.join(format!("mrtmp.{job_name}-{map_task}-{reduce_task}"))
}

/// Path of the output file of reduce task `reduce_task`.
pub fn output_path(dir: &Path, job_name: &str, reduce_task: usize) -> PathBuf {
    dir.join(format!("mrtmp.{job_name}-res-{reduce_task}"))
}

/// Path of the final merged result file for the whole job.
pub fn merged_path(dir: &Path, job_name: &str) -> PathBuf {
    dir.join(format!("mrtmp.{job_name}"))
}

/// Write a bucket file in full, replacing whatever a previous attempt of the
/// same map task left behind.
pub fn write_bucket(path: &Path, bucket: &BucketMap) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("creating bucket file {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, bucket)?;
    writer.flush()?;
    Ok(())
}

/// Decode one bucket file. A missing or malformed file is an error; the
/// caller must not fall back to partial input.
pub fn read_bucket(path: &Path) -> Result<BucketMap> {
    let file = File::open(path)
        .with_context(|| format!("opening bucket file {}", path.display()))?;
    let bucket = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("decoding bucket file {}", path.display()))?;
    Ok(bucket)
}

/// Write a reduce task's output records in full, replacing prior content.
pub fn write_output(path: &Path, records: &[KeyValue]) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("creating output file {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    for record in records {
        serde_json::to_writer(&mut writer, record)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}

/// Read back the records of one partition output file.
pub fn read_output(path: &Path) -> Result<Vec<KeyValue>> {
    let file = File::open(path)
        .with_context(|| format!("opening output file {}", path.display()))?;
    let mut records = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line?;
        if line.is_empty() {
            continue;
        }
        records.push(
            serde_json::from_str(&line)
                .with_context(|| format!("decoding output record in {}", path.display()))?,
        );
    }
    Ok(records)
}

/// Merge all `n_reduce` partition outputs into the single user-visible
/// result file, sorted by key across partitions, and return its path.
pub fn merge_outputs(dir: &Path, job_name: &str, n_reduce: usize) -> Result<PathBuf> {
    let mut records = Vec::new();
    for reduce_task in 0..n_reduce {
        records.extend(read_output(&output_path(dir, job_name, reduce_task))?);
    }
    records.sort_by(|a, b| a.key.cmp(&b.key));

    let path = merged_path(dir, job_name);
    let file = File::create(&path)
        .with_context(|| format!("creating merged result file {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    for KeyValue { key, value } in &records {
        writeln!(writer, "{key}: {value}")?;
    }
    writer.flush()?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_names_are_namespaced_by_job_and_task() {
        let dir = Path::new("/work");
        assert_eq!(
            bucket_path(dir, "wcjob", 3, 1),
            PathBuf::from("/work/mrtmp.wcjob-3-1")
        );
        assert_eq!(
            output_path(dir, "wcjob", 1),
            PathBuf::from("/work/mrtmp.wcjob-res-1")
        );
        assert_eq!(merged_path(dir, "wcjob"), PathBuf::from("/work/mrtmp.wcjob"));
    }

    #[test]
    fn bucket_write_replaces_previous_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = bucket_path(dir.path(), "job", 0, 0);

        let mut first = BucketMap::new();
        first.insert("a".into(), vec!["1".into(), "2".into()]);
        write_bucket(&path, &first).unwrap();

        let mut second = BucketMap::new();
        second.insert("a".into(), vec!["1".into()]);
        write_bucket(&path, &second).unwrap();

        assert_eq!(read_bucket(&path).unwrap(), second);
    }

    #[test]
    fn merge_sorts_records_across_partitions() {
        let dir = tempfile::tempdir().unwrap();
        write_output(
            &output_path(dir.path(), "job", 0),
            &[KeyValue::new("cat", "1"), KeyValue::new("sat", "1")],
        )
        .unwrap();
        write_output(
            &output_path(dir.path(), "job", 1),
            &[KeyValue::new("dog", "1"), KeyValue::new("the", "2")],
        )
        .unwrap();

        let merged = merge_outputs(dir.path(), "job", 2).unwrap();
        let contents = std::fs::read_to_string(merged).unwrap();
        assert_eq!(contents, "cat: 1\ndog: 1\nsat: 1\nthe: 2\n");
    }

    #[test]
    fn missing_bucket_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_bucket(&bucket_path(dir.path(), "job", 9, 9)).is_err());
    }
}
