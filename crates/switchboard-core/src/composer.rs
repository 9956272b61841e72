//! View composition: selector -> fetch plan, and result merging.
//!
//! Planning is pure: given a selector, the current roster (groups and DM
//! threads ranked by recent activity), approval records, and stream
//! definitions, produce the ordered list of remote fetches needed to populate
//! or refresh the view. Fan-out is capped per view kind so composite views
//! cannot overwhelm the rate-limited gateway.
//!
//! Merging is equally pure: flatten per-conversation batches, sort ascending
//! by `(created_at, id)`, drop duplicate ids. A failed fetch simply
//! contributes no batch; the composite degrades instead of failing wholesale.

use std::collections::HashSet;

use crate::{Approvals, GroupId, Message, MessageId, StreamSet, UserId, ViewSelector};

/// Initial page size for single-conversation views.
pub const INITIAL_PAGE: u32 = 40;

/// Poll-refresh page size for single-conversation views.
pub const POLL_PAGE: u32 = 5;

/// Page size for backward history pagination.
pub const BACKFILL_PAGE: u32 = 40;

/// AllFeed history fan-out: groups.
pub const ALL_FEED_HISTORY_GROUPS: usize = 10;

/// AllFeed history per-group page.
pub const ALL_FEED_GROUP_PAGE: u32 = 5;

/// AllFeed history fan-out: approved DMs.
pub const ALL_FEED_HISTORY_DMS: usize = 3;

/// AllFeed per-DM page.
pub const ALL_FEED_DM_PAGE: u32 = 3;

/// AllFeed poll fan-out: groups (slightly wider than history, smaller pages).
pub const ALL_FEED_POLL_GROUPS: usize = 12;

/// AllFeed poll fan-out: approved DMs.
pub const ALL_FEED_POLL_DMS: usize = 4;

/// AllDms fan-out cap.
pub const ALL_DMS_FANOUT: usize = 12;

/// AllDms per-DM page.
pub const ALL_DMS_PAGE: u32 = 5;

/// Per-group page for stream views.
pub const STREAM_PAGE: u32 = 10;

/// One conversation endpoint to fetch from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FetchTarget {
    /// A group's message list.
    Group(GroupId),
    /// A DM thread's message list, keyed by counterpart.
    Dm(UserId),
}

/// One remote fetch operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOp {
    /// Endpoint to fetch.
    pub target: FetchTarget,
    /// Maximum messages to request.
    pub page_size: u32,
    /// History cursor: only messages older than this id.
    pub before_id: Option<MessageId>,
}

impl FetchOp {
    fn new(target: FetchTarget, page_size: u32) -> Self {
        Self { target, page_size, before_id: None }
    }
}

/// Why a plan is being built; poll refreshes use smaller pages and, for the
/// unified feed, a slightly wider fan-out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchPhase {
    /// Populating a freshly (re)bound panel.
    Initial,
    /// Lightweight recurring refresh.
    Poll,
}

/// Ordered list of fetches composing one view.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchPlan {
    /// Fetches to execute. Individual failures contribute zero messages.
    pub ops: Vec<FetchOp>,
}

/// A conversation entry in the roster, ranked by recent activity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterEntry {
    /// Group id or DM counterpart user id.
    pub id: String,
    /// Display name (group name or counterpart name).
    pub name: String,
    /// Timestamp of the most recent message, seconds.
    pub last_activity_at: u64,
}

/// Current group and DM thread listings used for fan-out ranking.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Roster {
    /// All groups the user belongs to.
    pub groups: Vec<RosterEntry>,
    /// All DM threads, regardless of approval.
    pub dms: Vec<RosterEntry>,
}

impl Roster {
    /// The `limit` most recently active groups.
    fn recent_groups(&self, limit: usize) -> Vec<&RosterEntry> {
        let mut sorted: Vec<&RosterEntry> = self.groups.iter().collect();
        sorted.sort_by(|a, b| b.last_activity_at.cmp(&a.last_activity_at));
        sorted.truncate(limit);
        sorted
    }

    /// The `limit` most recently active *approved* DM counterparts.
    fn recent_approved_dms(&self, approvals: &Approvals, limit: usize) -> Vec<&RosterEntry> {
        let mut sorted: Vec<&RosterEntry> =
            self.dms.iter().filter(|d| approvals.is_approved(&d.id)).collect();
        sorted.sort_by(|a, b| b.last_activity_at.cmp(&a.last_activity_at));
        sorted.truncate(limit);
        sorted
    }
}

/// Build the fetch plan for `selector`.
///
/// `monitored` names the streams currently toggled into the unified-streams
/// composite; it is ignored for every other selector kind.
pub fn plan(
    selector: &ViewSelector,
    phase: FetchPhase,
    roster: &Roster,
    approvals: &Approvals,
    streams: &StreamSet,
    monitored: &[String],
) -> FetchPlan {
    let page = match phase {
        FetchPhase::Initial => INITIAL_PAGE,
        FetchPhase::Poll => POLL_PAGE,
    };

    let ops = match selector {
        ViewSelector::Group(id) => {
            vec![FetchOp::new(FetchTarget::Group(id.clone()), page)]
        },
        ViewSelector::Dm(id) => {
            vec![FetchOp::new(FetchTarget::Dm(id.clone()), page)]
        },
        ViewSelector::AllFeed => {
            let (group_count, dm_count) = match phase {
                FetchPhase::Initial => (ALL_FEED_HISTORY_GROUPS, ALL_FEED_HISTORY_DMS),
                FetchPhase::Poll => (ALL_FEED_POLL_GROUPS, ALL_FEED_POLL_DMS),
            };
            let mut ops: Vec<FetchOp> = roster
                .recent_groups(group_count)
                .into_iter()
                .map(|g| FetchOp::new(FetchTarget::Group(g.id.clone()), ALL_FEED_GROUP_PAGE))
                .collect();
            ops.extend(
                roster
                    .recent_approved_dms(approvals, dm_count)
                    .into_iter()
                    .map(|d| FetchOp::new(FetchTarget::Dm(d.id.clone()), ALL_FEED_DM_PAGE)),
            );
            ops
        },
        ViewSelector::AllDms => roster
            .recent_approved_dms(approvals, ALL_DMS_FANOUT)
            .into_iter()
            .map(|d| FetchOp::new(FetchTarget::Dm(d.id.clone()), ALL_DMS_PAGE))
            .collect(),
        ViewSelector::Stream(name) => streams
            .get(name)
            .map(|def| {
                def.member_group_ids
                    .iter()
                    .map(|g| FetchOp::new(FetchTarget::Group(g.clone()), STREAM_PAGE))
                    .collect()
            })
            .unwrap_or_default(),
        ViewSelector::UnifiedStreams => {
            let mut seen: Vec<&GroupId> = Vec::new();
            for name in monitored {
                if let Some(def) = streams.get(name) {
                    for group in &def.member_group_ids {
                        if !seen.contains(&group) {
                            seen.push(group);
                        }
                    }
                }
            }
            seen.into_iter()
                .map(|g| FetchOp::new(FetchTarget::Group(g.clone()), STREAM_PAGE))
                .collect()
        },
    };

    FetchPlan { ops }
}

/// Build the backfill fetch for a single-conversation panel.
///
/// `before_id` is the panel's oldest known message id. Returns `None` for
/// composite selectors, which do not paginate backward.
pub fn backfill_op(selector: &ViewSelector, before_id: MessageId) -> Option<FetchOp> {
    let target = match selector {
        ViewSelector::Group(id) => FetchTarget::Group(id.clone()),
        ViewSelector::Dm(id) => FetchTarget::Dm(id.clone()),
        _ => return None,
    };
    Some(FetchOp { target, page_size: BACKFILL_PAGE, before_id: Some(before_id) })
}

/// Merge per-conversation batches into one ordered collection.
///
/// Ascending `(created_at, id)` order; duplicate ids collapse to one entry.
/// Directional presentation (oldest-first vs newest-first) is a display
/// concern, not handled here.
pub fn merge(batches: Vec<Vec<Message>>) -> Vec<Message> {
    let mut all: Vec<Message> = batches.into_iter().flatten().collect();
    all.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
    let mut seen: HashSet<MessageId> = HashSet::with_capacity(all.len());
    all.retain(|m| seen.insert(m.id.clone()));
    all
}
