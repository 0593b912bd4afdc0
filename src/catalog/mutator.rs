//! Category tree mutations: create, insert-above-child, delete.
//!
//! Every operation validates locally, sends one request, and returns. None of
//! them touch the frontier; the caller refetches through the navigator so the
//! view always reflects what the store actually did (Insert in particular
//! reparents and relevels a whole subtree server-side).

use thiserror::Error;

use crate::api::{
    ApiClient, ApiError, Category, CategoryDraft, CategoryId, InsertCategory, NewCategory,
};
use crate::util::strip_control_chars;

#[derive(Debug, Error)]
pub enum MutateError {
    /// Rejected before any request left the process.
    #[error("{0}")]
    Validation(String),
    /// The tree or navigation state no longer supports the operation.
    #[error("{0}")]
    Precondition(String),
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Sanitize and validate a draft before it goes on the wire.
///
/// Strips control characters (ANSI escape injection prevention) and trims
/// whitespace from every field; rejects empty/whitespace-only names. Optional
/// fields that sanitize to nothing are dropped.
fn sanitize_draft(draft: &CategoryDraft) -> Result<CategoryDraft, MutateError> {
    let name = strip_control_chars(&draft.name).trim().to_owned();
    if name.is_empty() {
        return Err(MutateError::Validation(
            "category name cannot be empty or whitespace-only".into(),
        ));
    }
    let clean_opt = |field: &Option<String>| {
        field
            .as_deref()
            .map(|v| strip_control_chars(v).trim().to_owned())
            .filter(|v| !v.is_empty())
    };
    Ok(CategoryDraft {
        name,
        description: clean_opt(&draft.description),
        image_uri: clean_opt(&draft.image_uri),
    })
}

/// Level for a new child of `subject`. The store enforces the same rule; the
/// client computes it because the create endpoints require it in the body.
fn child_level(subject: &Category) -> Result<u32, MutateError> {
    subject.level.checked_add(1).ok_or_else(|| {
        MutateError::Precondition(format!("category {} is nested too deeply", subject.id))
    })
}

fn new_category(subject: &Category, clean: CategoryDraft) -> Result<NewCategory, MutateError> {
    Ok(NewCategory {
        name: clean.name,
        description: clean.description,
        image_uri: clean.image_uri,
        parent_id: subject.id.clone(),
        level: child_level(subject)?,
    })
}

/// Creates a new child of `subject` from `draft`.
pub async fn create(
    api: &ApiClient,
    subject: &Category,
    draft: &CategoryDraft,
) -> Result<Category, MutateError> {
    let clean = sanitize_draft(draft)?;
    let body = new_category(subject, clean)?;
    Ok(api.create_category(&body).await?)
}

/// Splices a new category between `subject` and its existing child
/// `existing_child_id`.
///
/// `eligible_children` must be a fresh fetch of `subject`'s children; the
/// child is checked against it so a drifted tree fails here instead of with
/// an opaque store rejection. The store reparents `existing_child_id` under
/// the new node and relevels that subtree by +1; none of that is mirrored
/// locally, so callers must refetch before trusting any cached levels.
pub async fn insert(
    api: &ApiClient,
    subject: &Category,
    draft: &CategoryDraft,
    existing_child_id: &CategoryId,
    eligible_children: &[Category],
) -> Result<Category, MutateError> {
    let clean = sanitize_draft(draft)?;
    if eligible_children.is_empty() {
        return Err(MutateError::Precondition(format!(
            "{} has no children to insert above",
            subject.name
        )));
    }
    if !eligible_children.iter().any(|c| &c.id == existing_child_id) {
        return Err(MutateError::Precondition(format!(
            "category {existing_child_id} is not a current child of {}",
            subject.name
        )));
    }
    let body = InsertCategory {
        category: new_category(subject, clean)?,
        children_id: existing_child_id.clone(),
    };
    Ok(api.insert_category(&body).await?)
}

/// Deletes `subject`. Descendant handling is store policy; the caller
/// refetches to learn what actually happened.
pub async fn delete(api: &ApiClient, subject: &Category) -> Result<(), MutateError> {
    api.delete_category(&subject.id).await?;
    Ok(())
}
