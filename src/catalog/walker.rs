//! Bounded subtree listing for the `tree` command.
//!
//! The store only exposes one-level children queries, so a tree view is built
//! by expanding level after level. Sibling fetches run concurrently; assembly
//! into display order happens after all fetches settle.

use std::collections::HashMap;

use futures::stream::{self, StreamExt};

use crate::api::{ApiClient, ApiError, Category, CategoryId};

/// Levels shown when the operator gives no explicit depth.
pub const DEFAULT_TREE_DEPTH: usize = 4;

/// Expansion stops once this many rows have been fetched.
const MAX_TREE_NODES: usize = 2_000;

const CONCURRENT_FETCHES: usize = 8;

/// One line of the tree listing: a category and its indent depth relative to
/// the walk's starting frontier.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeRow {
    pub depth: usize,
    pub node: Category,
}

/// Walks the subtree under `root` (`None` = the root set) down to `max_depth`
/// levels, returning rows in display order (each node directly above its
/// children).
///
/// Any fetch failure aborts the walk; individual fetches already retry
/// transient errors, so a persistent failure means the store is unreachable
/// and a partial tree would only mislead.
pub async fn walk_subtree(
    api: &ApiClient,
    root: Option<&CategoryId>,
    max_depth: usize,
) -> Result<Vec<TreeRow>, ApiError> {
    let top = api.fetch_frontier(root).await?;

    let mut children_of: HashMap<CategoryId, Vec<Category>> = HashMap::new();
    let mut level = top.clone();
    let mut fetched = top.len();

    // `top` sits at depth 0; expand up to max_depth - 1 levels below it.
    for _ in 1..max_depth {
        if level.is_empty() || fetched >= MAX_TREE_NODES {
            break;
        }
        let results: Vec<(CategoryId, Result<Vec<Category>, ApiError>)> =
            stream::iter(level.iter().map(|c| c.id.clone()))
                .map(|id| {
                    let api = api.clone();
                    async move {
                        let rows = api.fetch_children(&id).await;
                        (id, rows)
                    }
                })
                .buffer_unordered(CONCURRENT_FETCHES)
                .collect()
                .await;

        let mut next = Vec::new();
        for (id, rows) in results {
            let rows = rows?;
            fetched += rows.len();
            next.extend(rows.iter().cloned());
            children_of.insert(id, rows);
        }
        level = next;
    }

    if fetched >= MAX_TREE_NODES {
        tracing::warn!(nodes = fetched, "Tree listing truncated at node budget");
    }

    let mut out = Vec::with_capacity(fetched);
    let mut stack: Vec<(usize, Category)> = top.into_iter().rev().map(|c| (0, c)).collect();
    while let Some((depth, node)) = stack.pop() {
        // remove() also keeps a row that shows up twice from re-expanding
        let children = children_of.remove(&node.id).unwrap_or_default();
        out.push(TreeRow { depth, node });
        for child in children.into_iter().rev() {
            stack.push((depth + 1, child));
        }
    }
    Ok(out)
}
