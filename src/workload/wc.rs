//! A MapReduce-compatible implementation of word count.
//!

use crate::{KeyValue, MapOutput};
use anyhow::Result;

pub fn map(_input_name: &str, contents: &str) -> MapOutput {
    let pairs = contents
        .split(|c: char| !c.is_alphabetic())
        .filter(|s| !s.is_empty())
        .map(|word| KeyValue::new(word.to_lowercase(), "1"))
        .collect();
    Ok(pairs)
}

pub fn reduce(_key: &str, values: &[String]) -> Result<String> {
    let mut count: u64 = 0;
    for value in values {
        count += value.parse::<u64>()?;
    }
    Ok(count.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_emits_one_pair_per_word() {
        let pairs = map("in.txt", "The cat, the hat!").unwrap();
        let words: Vec<&str> = pairs.iter().map(|kv| kv.key.as_str()).collect();
        assert_eq!(words, vec!["the", "cat", "the", "hat"]);
        assert!(pairs.iter().all(|kv| kv.value == "1"));
    }

    #[test]
    fn reduce_sums_the_counts() {
        let values = vec!["1".to_string(), "1".to_string(), "2".to_string()];
        assert_eq!(reduce("the", &values).unwrap(), "4");
    }

    #[test]
    fn reduce_rejects_a_non_numeric_count() {
        assert!(reduce("the", &["one".to_string()]).is_err());
    }
}
