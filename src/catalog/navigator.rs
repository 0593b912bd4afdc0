use thiserror::Error;

use crate::api::{Category, CategoryId};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NavError {
    /// Drill targets must be members of the displayed frontier.
    #[error("category {0} is not in the current view")]
    NotInFrontier(CategoryId),
}

/// One breadcrumb: the parent of the view that was on screen when the
/// operator drilled down, plus the name of the category entered (kept for
/// the prompt).
#[derive(Debug, Clone, PartialEq, Eq)]
struct Crumb {
    parent: Option<CategoryId>,
    entered: String,
}

/// How to restore navigation state when a fetch fails while still current.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Rollback {
    /// Refresh of an existing view: nothing was changed eagerly.
    None,
    /// Undo a drill-down: pop the stack back into the cursor.
    PopStack,
    /// Undo a back-step: re-push the popped crumb and restore the cursor.
    Repush {
        crumb: Crumb,
        prior: Option<CategoryId>,
    },
}

/// Tag for one outstanding frontier fetch.
///
/// Issued by [`Navigator::drill_into`], [`Navigator::go_back`], and
/// [`Navigator::refresh`]. The caller performs the request for
/// [`FetchTicket::parent`] and settles the ticket with exactly one of
/// [`Navigator::absorb`] (rows arrived) or [`Navigator::rescind`] (request
/// failed). A ticket that no longer matches the navigation state at
/// settlement time is discarded without touching anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    parent: Option<CategoryId>,
    seq: u64,
    expected_level: Option<u32>,
    rollback: Rollback,
}

impl FetchTicket {
    /// Parent whose children this fetch should retrieve; `None` means the
    /// root set (level-1 categories).
    pub fn parent(&self) -> Option<&CategoryId> {
        self.parent.as_ref()
    }
}

/// Cursor over the externally-owned category tree.
///
/// The store is the source of record: this type holds only the active
/// frontier (one node's children) and the breadcrumb trail behind it, and it
/// never patches a row locally. Navigation moves the cursor eagerly; the
/// frontier changes only when a matching response is absorbed, so a late
/// response from an abandoned navigation can never overwrite the view.
#[derive(Debug, Default)]
pub struct Navigator {
    /// Breadcrumb trail, oldest first.
    stack: Vec<Crumb>,
    /// The parent whose children the operator most recently asked for.
    current_parent: Option<CategoryId>,
    /// The parent the rows in `frontier` actually belong to. Trails behind
    /// `current_parent` while a fetch is outstanding.
    frontier_parent: Option<CategoryId>,
    /// The displayed sibling set, replaced wholesale on each absorbed fetch.
    frontier: Vec<Category>,
    /// Bumped once per issued ticket; settlement requires an exact match.
    seq: u64,
}

impl Navigator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rows of the displayed frontier.
    pub fn frontier(&self) -> &[Category] {
        &self.frontier
    }

    /// The navigation cursor (`None` while viewing the root set).
    pub fn current_parent(&self) -> Option<&CategoryId> {
        self.current_parent.as_ref()
    }

    /// Number of drill-downs that can be undone with [`Self::go_back`].
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn at_root(&self) -> bool {
        self.current_parent.is_none()
    }

    /// Names of the categories entered so far, oldest first. Feeds the
    /// prompt; rolls back together with the stack.
    pub fn trail(&self) -> Vec<&str> {
        self.stack.iter().map(|c| c.entered.as_str()).collect()
    }

    /// Looks a drill candidate up in the displayed frontier.
    pub fn frontier_member(&self, id: &CategoryId) -> Option<&Category> {
        self.frontier.iter().find(|c| &c.id == id)
    }

    /// Descends into `id`, which must be a member of the displayed frontier.
    ///
    /// Pushes the displayed view's parent onto the breadcrumb stack and moves
    /// the cursor, then hands back the ticket for the children fetch. The
    /// stack records the view that was actually on screen, so the trail stays
    /// a real ancestor chain even when an earlier fetch never resolved.
    pub fn drill_into(&mut self, id: &CategoryId) -> Result<FetchTicket, NavError> {
        let subject = self
            .frontier_member(id)
            .ok_or_else(|| NavError::NotInFrontier(id.clone()))?;
        let expected_level = subject.level.checked_add(1);

        self.stack.push(Crumb {
            parent: self.frontier_parent.clone(),
            entered: subject.name.clone(),
        });
        self.current_parent = Some(id.clone());
        Ok(self.issue(expected_level, Rollback::PopStack))
    }

    /// Ascends one level. Silent no-op returning `None` when the stack is
    /// empty (already at the root set).
    pub fn go_back(&mut self) -> Option<FetchTicket> {
        let crumb = self.stack.pop()?;
        let prior = std::mem::replace(&mut self.current_parent, crumb.parent.clone());
        let expected_level = match self.current_parent {
            None => Some(1),
            Some(_) => None,
        };
        Some(self.issue(expected_level, Rollback::Repush { crumb, prior }))
    }

    /// Re-requests the cursor's frontier without moving it. Used for the
    /// initial root listing and after every successful mutation.
    pub fn refresh(&mut self) -> FetchTicket {
        let expected_level = if self.current_parent.is_none() {
            Some(1)
        } else if self.current_parent == self.frontier_parent {
            self.frontier.first().map(|c| c.level)
        } else {
            None
        };
        self.issue(expected_level, Rollback::None)
    }

    /// Settles a ticket with fetched rows.
    ///
    /// Replaces the frontier wholesale and returns `true` iff the ticket
    /// still matches both the cursor and the newest sequence number. A stale
    /// ticket (the operator navigated again before this response arrived) is
    /// logged and dropped, leaving all state untouched.
    pub fn absorb(&mut self, ticket: FetchTicket, rows: Vec<Category>) -> bool {
        if !self.is_current(&ticket) {
            tracing::debug!(
                requested = ?ticket.parent,
                current = ?self.current_parent,
                "Discarding stale frontier response"
            );
            return false;
        }

        audit_rows(&ticket, &rows);
        self.frontier = rows;
        self.frontier_parent = ticket.parent;
        true
    }

    /// Settles a failed ticket.
    ///
    /// If the ticket is still current, the eager navigation change is rolled
    /// back so cursor, stack, and frontier again describe the last good view.
    /// Stale tickets are ignored; a newer navigation already owns the state.
    pub fn rescind(&mut self, ticket: FetchTicket) {
        if !self.is_current(&ticket) {
            return;
        }
        match ticket.rollback {
            Rollback::None => {}
            Rollback::PopStack => {
                self.current_parent = self.stack.pop().and_then(|c| c.parent);
            }
            Rollback::Repush { crumb, prior } => {
                self.current_parent = prior;
                self.stack.push(crumb);
            }
        }
        // Invalidate anything else still in flight against the old state.
        self.seq = self.seq.wrapping_add(1);
    }

    fn issue(&mut self, expected_level: Option<u32>, rollback: Rollback) -> FetchTicket {
        self.seq = self.seq.wrapping_add(1);
        FetchTicket {
            parent: self.current_parent.clone(),
            seq: self.seq,
            expected_level,
            rollback,
        }
    }

    fn is_current(&self, ticket: &FetchTicket) -> bool {
        ticket.seq == self.seq && ticket.parent == self.current_parent
    }
}

/// Sanity-checks fetched rows against the request. The store stays
/// authoritative, so violations are logged, never rejected.
fn audit_rows(ticket: &FetchTicket, rows: &[Category]) {
    for row in rows {
        if row.parent_id != ticket.parent {
            tracing::warn!(
                id = %row.id,
                parent = ?row.parent_id,
                requested = ?ticket.parent,
                "Store returned a row for a different parent"
            );
        }
        if let Some(expected) = ticket.expected_level {
            if row.level != expected {
                tracing::warn!(
                    id = %row.id,
                    level = row.level,
                    expected,
                    "Store returned a row with an unexpected level"
                );
            }
        }
    }
}
