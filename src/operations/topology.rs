// Persistent jump-gate graph between systems
use std::collections::{HashMap, HashSet, VecDeque};
use tracing::debug;

use crate::error::{CoordError, Result};
use crate::storage::Store;

/// Undirected graph of systems joined by jump gates. Edges are stored once,
/// normalised so that `system_a < system_b`, and are never deleted.
#[derive(Clone)]
pub struct TopologyGraph {
    store: Store,
}

impl TopologyGraph {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Record that `a` and `b` are connected. Returns whether the edge was new.
    pub async fn record_edge(&self, a: &str, b: &str) -> Result<bool> {
        if a == b {
            return Ok(false);
        }
        let (first, second) = if a < b { (a, b) } else { (b, a) };
        let inserted = sqlx::query("INSERT OR IGNORE INTO edges (system_a, system_b) VALUES (?1, ?2)")
            .bind(first)
            .bind(second)
            .execute(self.store.pool())
            .await?
            .rows_affected()
            == 1;
        if inserted {
            debug!("🌌 New jump edge {} <-> {}", first, second);
        }
        Ok(inserted)
    }

    pub async fn edge_count(&self) -> Result<i64> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM edges").fetch_one(self.store.pool()).await?;
        Ok(count)
    }

    pub async fn neighbours(&self, system: &str) -> Result<Vec<String>> {
        let neighbours = sqlx::query_scalar(
            "SELECT system_b FROM edges WHERE system_a = ?1
             UNION
             SELECT system_a FROM edges WHERE system_b = ?1
             ORDER BY 1",
        )
        .bind(system)
        .fetch_all(self.store.pool())
        .await?;
        Ok(neighbours)
    }

    async fn adjacency(&self) -> Result<HashMap<String, Vec<String>>> {
        let edges: Vec<(String, String)> = sqlx::query_as("SELECT system_a, system_b FROM edges")
            .fetch_all(self.store.pool())
            .await?;

        let mut adjacency: HashMap<String, Vec<String>> = HashMap::new();
        for (a, b) in edges {
            adjacency.entry(a.clone()).or_default().push(b.clone());
            adjacency.entry(b).or_default().push(a);
        }
        for neighbours in adjacency.values_mut() {
            neighbours.sort();
        }
        Ok(adjacency)
    }

    /// Fewest-jumps route from `src` to `dst`, both ends included.
    pub async fn shortest_path(&self, src: &str, dst: &str) -> Result<Vec<String>> {
        if src == dst {
            return Ok(vec![src.to_string()]);
        }
        let adjacency = self.adjacency().await?;

        let mut previous: HashMap<&str, &str> = HashMap::new();
        let mut seen: HashSet<&str> = HashSet::from([src]);
        let mut queue: VecDeque<&str> = VecDeque::from([src]);

        while let Some(system) = queue.pop_front() {
            let Some(neighbours) = adjacency.get(system) else {
                continue;
            };
            for next in neighbours {
                if !seen.insert(next.as_str()) {
                    continue;
                }
                previous.insert(next.as_str(), system);
                if next == dst {
                    let mut path = vec![dst.to_string()];
                    let mut cursor = dst;
                    while let Some(&prior) = previous.get(cursor) {
                        path.push(prior.to_string());
                        cursor = prior;
                    }
                    path.reverse();
                    return Ok(path);
                }
                queue.push_back(next.as_str());
            }
        }

        Err(CoordError::NoPathFound { from: src.to_string(), to: dst.to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn edges_are_normalised_and_idempotent() {
        let graph = TopologyGraph::new(Store::in_memory().await.unwrap());
        assert!(graph.record_edge("X1-B", "X1-A").await.unwrap());
        assert!(!graph.record_edge("X1-A", "X1-B").await.unwrap());
        assert!(!graph.record_edge("X1-A", "X1-A").await.unwrap());
        assert_eq!(graph.edge_count().await.unwrap(), 1);
        assert_eq!(graph.neighbours("X1-B").await.unwrap(), vec!["X1-A".to_string()]);
    }

    #[tokio::test]
    async fn path_to_self_is_just_the_start() {
        let graph = TopologyGraph::new(Store::in_memory().await.unwrap());
        assert_eq!(graph.shortest_path("X1-A", "X1-A").await.unwrap(), vec!["X1-A".to_string()]);
    }

    #[tokio::test]
    async fn shortest_path_prefers_fewer_jumps() {
        let graph = TopologyGraph::new(Store::in_memory().await.unwrap());
        for (a, b) in [("A", "B"), ("B", "C"), ("C", "D"), ("A", "E"), ("E", "D")] {
            graph.record_edge(a, b).await.unwrap();
        }
        let path = graph.shortest_path("A", "D").await.unwrap();
        assert_eq!(path.len(), 3);
        assert_eq!(path.first().map(String::as_str), Some("A"));
        assert_eq!(path.last().map(String::as_str), Some("D"));
    }
}
