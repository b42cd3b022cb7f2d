//! A MapReduce-compatible implementation of vertex degree counting.
//!
//! Input files hold one undirected edge per line as a whitespace-separated
//! pair of vertex names. The degree of a vertex is the number of edge
//! endpoints naming it.

use crate::{KeyValue, MapOutput};
use anyhow::{bail, Result};

pub fn map(input_name: &str, contents: &str) -> MapOutput {
    let mut pairs = Vec::new();
    for (line_no, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let mut endpoints = line.split_whitespace();
        match (endpoints.next(), endpoints.next()) {
            (Some(u), Some(v)) => {
                pairs.push(KeyValue::new(u, "1"));
                pairs.push(KeyValue::new(v, "1"));
            }
            _ => bail!("{input_name}:{}: malformed edge `{line}`", line_no + 1),
        }
    }
    Ok(pairs)
}

pub fn reduce(_key: &str, values: &[String]) -> Result<String> {
    Ok(values.len().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_emits_both_endpoints_of_an_edge() {
        let pairs = map("g.txt", "a b\nb c\n").unwrap();
        let keys: Vec<&str> = pairs.iter().map(|kv| kv.key.as_str()).collect();
        assert_eq!(keys, vec!["a", "b", "b", "c"]);
    }

    #[test]
    fn map_rejects_a_dangling_edge() {
        assert!(map("g.txt", "a\n").is_err());
    }

    #[test]
    fn reduce_counts_endpoints() {
        let values = vec!["1".to_string(), "1".to_string()];
        assert_eq!(reduce("b", &values).unwrap(), "2");
    }
}
