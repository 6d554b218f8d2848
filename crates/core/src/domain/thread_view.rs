use std::collections::HashSet;

use crate::domain::comments::{node_ids, CommentNode};

/// Per-viewer display toggles for a comment thread.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ThreadViewState {
    collapsed: HashSet<String>,
    reply_target: Option<String>,
}

impl ThreadViewState {
    /// Returns whether the comment is collapsed after the toggle.
    pub fn toggle_collapsed(&mut self, comment_id: &str) -> bool {
        if self.collapsed.remove(comment_id) {
            return false;
        }
        self.collapsed.insert(comment_id.to_string());
        true
    }

    pub fn is_collapsed(&self, comment_id: &str) -> bool {
        self.collapsed.contains(comment_id)
    }

    /// Opens the reply box on `comment_id`, replacing any other open one.
    /// Toggling the comment that already has it open closes it.
    pub fn toggle_reply(&mut self, comment_id: &str) {
        if self.reply_target.as_deref() == Some(comment_id) {
            self.reply_target = None;
        } else {
            self.reply_target = Some(comment_id.to_string());
        }
    }

    pub fn reply_target(&self) -> Option<&str> {
        self.reply_target.as_deref()
    }

    pub fn close_reply(&mut self) {
        self.reply_target = None;
    }

    /// Forgets toggles for comments missing from a freshly rebuilt forest.
    pub fn retain_known(&mut self, forest: &[CommentNode]) {
        let known = node_ids(forest);
        self.collapsed.retain(|id| known.contains(id.as_str()));
        if self
            .reply_target
            .as_deref()
            .is_some_and(|id| !known.contains(id))
        {
            self.reply_target = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Utc};

    use super::*;
    use crate::domain::comments::{build_tree, Comment};
    use crate::domain::identity::Identity;

    fn comment(id: &str) -> Comment {
        Comment {
            id: id.to_string(),
            quote_id: "q".to_string(),
            text: "t".to_string(),
            author: Identity {
                id: "u".to_string(),
                display_name: "U".to_string(),
                avatar_url: None,
            },
            votes: 0,
            created_at: DateTime::<Utc>::from_timestamp_millis(0).unwrap(),
            parent_id: None,
        }
    }

    #[test]
    fn collapse_toggles() {
        let mut state = ThreadViewState::default();
        assert!(state.toggle_collapsed("a"));
        assert!(state.is_collapsed("a"));
        assert!(!state.toggle_collapsed("a"));
        assert!(!state.is_collapsed("a"));
    }

    #[test]
    fn only_one_reply_target() {
        let mut state = ThreadViewState::default();
        state.toggle_reply("a");
        state.toggle_reply("b");
        assert_eq!(state.reply_target(), Some("b"));
        state.toggle_reply("b");
        assert_eq!(state.reply_target(), None);
        state.toggle_reply("a");
        state.close_reply();
        assert_eq!(state.reply_target(), None);
    }

    #[test]
    fn retain_known_drops_deleted_comments() {
        let mut state = ThreadViewState::default();
        state.toggle_collapsed("a");
        state.toggle_collapsed("gone");
        state.toggle_reply("gone");
        let forest = build_tree(&[comment("a")]);
        state.retain_known(&forest);
        assert!(state.is_collapsed("a"));
        assert!(!state.is_collapsed("gone"));
        assert_eq!(state.reply_target(), None);
    }
}
