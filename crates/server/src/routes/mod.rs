//! HTTP handlers, grouped by the resource they expose.

pub mod economy;
pub mod rut;
pub mod weather;

use serde::Deserialize;

use crate::error::{ServerError, ServerResult};

/// Query of the endpoints searchable by name.
#[derive(Debug, Deserialize)]
pub struct NameQuery {
    /// Optional fuzzy filter over the name and code of each entry.
    name: Option<String>,
}

impl NameQuery {
    /// The trimmed name to search for, `None` when absent or blank.
    pub fn name(&self) -> Option<&str> {
        self.name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }
}

/// Keep the entries whose hint fuzzy matches `name`, best first. Nothing matching is a 404.
pub fn search_by_name<T, F>(entries: Vec<T>, hint_fn: F, name: &str) -> ServerResult<Vec<T>>
where
    T: Clone,
    F: Fn(&T) -> String,
{
    let found: Vec<T> = fuzzy_search::search(&entries, hint_fn, name)
        .into_iter()
        .cloned()
        .collect();

    if found.is_empty() {
        return Err(ServerError::NotFound);
    }

    tracing::debug!(found = found.len(), "Matched entries");
    Ok(found)
}
