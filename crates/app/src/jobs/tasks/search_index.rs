use std::collections::{HashMap, HashSet};

use chrono::Utc;
use tracing::debug;

use crate::jobs::JobError;
use crate::state::AppState;
use quottit_core::domain::search::SearchDocument;
use quottit_infra::db::list_quotes;
use quottit_infra::search::document_for_quote;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct JobStats {
    pub fetched: usize,
    pub indexed: usize,
    pub skipped: usize,
    pub removed: usize,
}

#[derive(Debug, Default)]
struct ReconcilePlan {
    to_index: Vec<SearchDocument>,
    to_remove: Vec<String>,
    skipped: usize,
}

/// Brings the index in line with the store. A rebuild wipes the index
/// first; a refresh only rewrites documents whose checksum changed and
/// drops documents whose quote is gone.
pub async fn run(state: &AppState, rebuild: bool) -> Result<JobStats, JobError> {
    let started = Utc::now();
    state.job_health.lock().await.index_refresh_last_run = Some(started);

    let pool = state.db.as_ref().ok_or(JobError::DbUnavailable)?;
    let quotes = list_quotes(pool).await?;
    let documents: Vec<SearchDocument> = quotes.iter().map(document_for_quote).collect();

    let existing = if rebuild {
        state.search.delete_all()?;
        HashMap::new()
    } else {
        state.search.checksums()?
    };
    let fetched = documents.len();
    let plan = plan_reconcile(documents, &existing);
    debug!(
        fetched,
        to_index = plan.to_index.len(),
        to_remove = plan.to_remove.len(),
        "search index plan"
    );

    if !plan.to_remove.is_empty() {
        state.search.delete_documents(&plan.to_remove)?;
    }
    if !plan.to_index.is_empty() {
        state.search.upsert_documents(&plan.to_index)?;
    }

    state.job_health.lock().await.index_refresh_last_success = Some(Utc::now());
    Ok(JobStats {
        fetched,
        indexed: plan.to_index.len(),
        skipped: plan.skipped,
        removed: plan.to_remove.len(),
    })
}

fn plan_reconcile(
    documents: Vec<SearchDocument>,
    existing: &HashMap<String, String>,
) -> ReconcilePlan {
    let live: HashSet<&str> = documents.iter().map(|doc| doc.id.as_str()).collect();
    let mut to_remove: Vec<String> = existing
        .keys()
        .filter(|id| !live.contains(id.as_str()))
        .cloned()
        .collect();
    to_remove.sort();

    let mut plan = ReconcilePlan {
        to_remove,
        ..ReconcilePlan::default()
    };
    for doc in documents {
        if existing.get(&doc.id) == Some(&doc.checksum) {
            plan.skipped += 1;
        } else {
            plan.to_index.push(doc);
        }
    }
    plan
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use chrono::{DateTime, Utc};

    use super::plan_reconcile;
    use quottit_core::domain::search::SearchDocument;

    fn doc(id: &str, checksum: &str) -> SearchDocument {
        SearchDocument {
            id: id.to_string(),
            text: "text".to_string(),
            author: "Anonymous".to_string(),
            source: None,
            tags: Vec::new(),
            created_at: DateTime::<Utc>::from_timestamp_millis(0).unwrap(),
            checksum: checksum.to_string(),
        }
    }

    #[test]
    fn unchanged_documents_are_skipped() {
        let existing = HashMap::from([
            ("a".to_string(), "1".to_string()),
            ("b".to_string(), "2".to_string()),
        ]);
        let plan = plan_reconcile(vec![doc("a", "1"), doc("b", "changed")], &existing);
        assert_eq!(plan.skipped, 1);
        assert_eq!(plan.to_index.len(), 1);
        assert_eq!(plan.to_index[0].id, "b");
        assert!(plan.to_remove.is_empty());
    }

    #[test]
    fn documents_without_quotes_are_removed() {
        let existing = HashMap::from([
            ("gone".to_string(), "1".to_string()),
            ("a".to_string(), "1".to_string()),
        ]);
        let plan = plan_reconcile(vec![doc("a", "1"), doc("new", "3")], &existing);
        assert_eq!(plan.to_remove, vec!["gone".to_string()]);
        assert_eq!(plan.to_index.len(), 1);
        assert_eq!(plan.to_index[0].id, "new");
    }

    #[test]
    fn empty_index_indexes_everything() {
        let plan = plan_reconcile(vec![doc("a", "1"), doc("b", "2")], &HashMap::new());
        assert_eq!(plan.to_index.len(), 2);
        assert_eq!(plan.skipped, 0);
    }
}
