use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::identity::Identity;
use crate::error::CoreError;

const MAX_COMMENT_LEN: usize = 2000;
/// Deepest level a new reply may be posted at; roots sit at level 0.
pub const MAX_REPLY_DEPTH: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub quote_id: String,
    pub text: String,
    pub author: Identity,
    pub votes: i64,
    #[serde(rename = "timestamp", with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    pub parent_id: Option<String>,
}

/// A comment with its direct replies. Derived on every read, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommentNode {
    #[serde(flatten)]
    pub comment: Comment,
    pub replies: Vec<CommentNode>,
}

impl Drop for CommentNode {
    fn drop(&mut self) {
        // Unlink descendants first so long reply chains drop without recursion.
        let mut pending = std::mem::take(&mut self.replies);
        while let Some(mut node) = pending.pop() {
            pending.append(&mut node.replies);
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CommentThread {
    pub quote_id: String,
    pub total: usize,
    pub comments: Vec<CommentNode>,
}

impl CommentThread {
    pub fn from_snapshot(quote_id: impl Into<String>, snapshot: &[Comment]) -> Self {
        let comments = build_tree(snapshot);
        CommentThread {
            quote_id: quote_id.into(),
            total: count_nodes(&comments),
            comments,
        }
    }
}

/// Validated input for a new comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewComment {
    pub text: String,
    pub parent_id: Option<String>,
}

impl NewComment {
    pub fn normalize(text: &str, parent_id: Option<&str>) -> Result<Self, CoreError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(CoreError::Empty("text"));
        }
        if text.chars().count() > MAX_COMMENT_LEN {
            return Err(CoreError::TooLong("text", MAX_COMMENT_LEN));
        }
        let parent_id = parent_id
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string);
        Ok(NewComment {
            text: text.to_string(),
            parent_id,
        })
    }
}

/// Rebuilds the reply forest for one quote from a flat snapshot.
///
/// Siblings are ordered by descending votes; ties keep snapshot order. A
/// comment whose parent is not in the snapshot becomes a root. When two
/// records share an id the later one wins and the earlier one is dropped.
pub fn build_tree(comments: &[Comment]) -> Vec<CommentNode> {
    let mut slots: HashMap<&str, usize> = HashMap::with_capacity(comments.len());
    for (idx, comment) in comments.iter().enumerate() {
        slots.insert(comment.id.as_str(), idx);
    }
    let live = |idx: usize| slots.get(comments[idx].id.as_str()) == Some(&idx);

    let mut children: Vec<Vec<usize>> = vec![Vec::new(); comments.len()];
    let mut parent_of: Vec<Option<usize>> = vec![None; comments.len()];
    let mut roots = Vec::new();
    for idx in (0..comments.len()).filter(|idx| live(*idx)) {
        let parent = comments[idx]
            .parent_id
            .as_deref()
            .and_then(|parent_id| slots.get(parent_id).copied());
        match parent {
            Some(parent_idx) => {
                children[parent_idx].push(idx);
                parent_of[idx] = Some(parent_idx);
            }
            None => roots.push(idx),
        }
    }

    // Parent cycles are unreachable from any root; cut each one open.
    let mut reached = vec![false; comments.len()];
    mark_reached(&roots, &children, &mut reached);
    for idx in 0..comments.len() {
        if reached[idx] || !live(idx) {
            continue;
        }
        let entry = cycle_entry(idx, &parent_of);
        if let Some(parent_idx) = parent_of[entry].take() {
            children[parent_idx].retain(|child| *child != entry);
        }
        roots.push(entry);
        mark_reached(&[entry], &children, &mut reached);
    }

    sort_by_votes(&mut roots, comments);
    for siblings in children.iter_mut() {
        sort_by_votes(siblings, comments);
    }

    materialize(&roots, comments, &children)
}

pub fn count_nodes(forest: &[CommentNode]) -> usize {
    let mut count = 0;
    let mut stack: Vec<&CommentNode> = forest.iter().collect();
    while let Some(node) = stack.pop() {
        count += 1;
        stack.extend(node.replies.iter());
    }
    count
}

/// Level a reply to `parent_id` would sit at, or `None` when the parent is
/// not in the snapshot. Ancestor loops stop the walk.
pub fn reply_depth(comments: &[Comment], parent_id: &str) -> Option<usize> {
    let parents: HashMap<&str, Option<&str>> = comments
        .iter()
        .map(|comment| (comment.id.as_str(), comment.parent_id.as_deref()))
        .collect();
    let mut current = parents.get(parent_id).copied()?;
    let mut seen = HashSet::from([parent_id]);
    let mut depth = 1;
    while let Some(id) = current {
        match parents.get(id) {
            Some(next) if seen.insert(id) => {
                depth += 1;
                current = *next;
            }
            _ => break,
        }
    }
    Some(depth)
}

/// Collects every id in the forest.
pub fn node_ids(forest: &[CommentNode]) -> HashSet<&str> {
    let mut ids = HashSet::new();
    let mut stack: Vec<&CommentNode> = forest.iter().collect();
    while let Some(node) = stack.pop() {
        ids.insert(node.comment.id.as_str());
        stack.extend(node.replies.iter());
    }
    ids
}

fn mark_reached(start: &[usize], children: &[Vec<usize>], reached: &mut [bool]) {
    let mut stack = start.to_vec();
    while let Some(idx) = stack.pop() {
        if reached[idx] {
            continue;
        }
        reached[idx] = true;
        stack.extend(children[idx].iter().copied());
    }
}

/// Walks up from `start` until the parent chain loops and returns the
/// earliest (by snapshot position) member of that loop.
fn cycle_entry(start: usize, parent_of: &[Option<usize>]) -> usize {
    let mut seen = HashSet::new();
    let mut current = start;
    while seen.insert(current) {
        match parent_of[current] {
            Some(parent) => current = parent,
            None => return current,
        }
    }
    let mut earliest = current;
    let mut member = parent_of[current];
    while let Some(idx) = member {
        if idx == current {
            break;
        }
        earliest = earliest.min(idx);
        member = parent_of[idx];
    }
    earliest
}

fn sort_by_votes(siblings: &mut [usize], comments: &[Comment]) {
    siblings.sort_by(|a, b| comments[*b].votes.cmp(&comments[*a].votes));
}

/// Builds nodes children-first with an explicit stack.
fn materialize(
    roots: &[usize],
    comments: &[Comment],
    children: &[Vec<usize>],
) -> Vec<CommentNode> {
    let mut built: Vec<Option<CommentNode>> = (0..comments.len()).map(|_| None).collect();
    let mut stack: Vec<(usize, bool)> = roots.iter().map(|idx| (*idx, false)).collect();
    while let Some((idx, expanded)) = stack.pop() {
        if expanded {
            let replies = children[idx]
                .iter()
                .filter_map(|child| built[*child].take())
                .collect();
            built[idx] = Some(CommentNode {
                comment: comments[idx].clone(),
                replies,
            });
        } else {
            stack.push((idx, true));
            stack.extend(children[idx].iter().map(|child| (*child, false)));
        }
    }
    roots.iter().filter_map(|idx| built[*idx].take()).collect()
}
