// Ledger reporting: totals, per-user activity, recent and toxic listings.
//
// Everything here works on comments already loaded (and backfilled) by the
// ledger, so it never touches the model or the file system.

use std::cmp::Reverse;
use std::collections::BTreeMap;

use serde::Serialize;

use crate::ledger::Comment;

pub const DEFAULT_RECENT_LIMIT: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub total: usize,
    pub toxic: usize,
    pub non_toxic: usize,
}

impl Summary {
    pub fn toxic_pct(&self) -> f64 {
        pct(self.toxic, self.total)
    }

    pub fn non_toxic_pct(&self) -> f64 {
        pct(self.non_toxic, self.total)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserActivity {
    pub username: String,
    pub total: usize,
    pub toxic: usize,
}

fn pct(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 * 100.0 / total as f64
    }
}

pub fn summarize(comments: &[Comment]) -> Summary {
    let toxic = comments.iter().filter(|c| c.is_toxic).count();
    Summary {
        total: comments.len(),
        toxic,
        non_toxic: comments.len() - toxic,
    }
}

/// Comment counts per display name, ordered by name.
pub fn user_activity(comments: &[Comment]) -> Vec<UserActivity> {
    let mut by_user: BTreeMap<&str, (usize, usize)> = BTreeMap::new();
    for c in comments {
        let entry = by_user.entry(c.author.display_name.as_str()).or_default();
        entry.0 += 1;
        if c.is_toxic {
            entry.1 += 1;
        }
    }
    by_user
        .into_iter()
        .map(|(username, (total, toxic))| UserActivity {
            username: username.to_string(),
            total,
            toxic,
        })
        .collect()
}

/// Newest first; comments without a timestamp go last in ledger order.
pub fn recent(comments: &[Comment], limit: usize) -> Vec<&Comment> {
    let mut sorted: Vec<&Comment> = comments.iter().collect();
    // Option orders None < Some, so reversing puts unknown times at the end
    sorted.sort_by_key(|c| Reverse(c.submitted_at));
    sorted.truncate(limit);
    sorted
}

pub fn toxic_only(comments: &[Comment]) -> Vec<&Comment> {
    comments.iter().filter(|c| c.is_toxic).collect()
}
