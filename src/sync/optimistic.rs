use std::sync::Arc;

use crate::core::models::Secret;

/// Speculative edit applied to the active-secrets view before the backend
/// confirms it.
#[derive(Debug, Clone)]
pub enum SecretAction {
    Create(Secret),
    Update(Secret),
    Delete(i64),
}

/// Applies a pending-action log to a base snapshot, left to right.
/// `Create` prepends, `Update` replaces in place, `Delete` removes.
/// Unknown ids for update/delete are no-ops.
pub fn apply(base: &[Secret], actions: &[SecretAction]) -> Vec<Secret> {
    let mut state = base.to_vec();
    for action in actions {
        match action {
            SecretAction::Create(secret) => state.insert(0, secret.clone()),
            SecretAction::Update(secret) => {
                if let Some(existing) = state.iter_mut().find(|s| s.id == secret.id) {
                    *existing = secret.clone();
                }
            }
            SecretAction::Delete(id) => state.retain(|s| s.id != *id),
        }
    }
    state
}

/// The session's pending-action log over the last cache resolution. The log
/// is discarded wholesale whenever the base snapshot is replaced by a
/// refresh; convergence is re-fetch, never per-action rollback.
#[derive(Debug, Default)]
pub struct OptimisticSecrets {
    base: Arc<Vec<Secret>>,
    log: Vec<SecretAction>,
}

impl OptimisticSecrets {
    pub fn base(&self) -> &Arc<Vec<Secret>> {
        &self.base
    }

    pub fn rebase(&mut self, base: Arc<Vec<Secret>>) {
        self.base = base;
        self.log.clear();
    }

    pub fn push(&mut self, action: SecretAction) {
        self.log.push(action);
    }

    pub fn pending(&self) -> usize {
        self.log.len()
    }

    pub fn view(&self) -> Vec<Secret> {
        apply(&self.base, &self.log)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::{SecretAction, apply};
    use crate::core::models::Secret;

    fn secret(id: i64, title: &str) -> Secret {
        Secret {
            id,
            title: title.to_owned(),
            username: None,
            password: "x".to_owned(),
            created_at: Utc::now(),
            project_id: None,
            deleted_at: None,
        }
    }

    #[test]
    fn create_prepends() {
        let base = vec![secret(1, "one")];
        let next = apply(&base, &[SecretAction::Create(secret(2, "two"))]);
        assert_eq!(next.iter().map(|s| s.id).collect::<Vec<_>>(), vec![2, 1]);
    }

    #[test]
    fn update_replaces_in_place() {
        let base = vec![secret(1, "one"), secret(2, "two"), secret(3, "three")];
        let next = apply(&base, &[SecretAction::Update(secret(2, "renamed"))]);

        assert_eq!(next.iter().map(|s| s.id).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(next[1].title, "renamed");
    }

    #[test]
    fn delete_removes_matching_id() {
        let base = vec![secret(5, "a"), secret(6, "b"), secret(7, "c")];
        let next = apply(&base, &[SecretAction::Delete(5)]);
        assert_eq!(next.iter().map(|s| s.id).collect::<Vec<_>>(), vec![6, 7]);
    }

    #[test]
    fn unknown_ids_are_no_ops() {
        let base = vec![secret(1, "one")];
        let next = apply(
            &base,
            &[
                SecretAction::Update(secret(99, "ghost")),
                SecretAction::Delete(42),
            ],
        );
        assert_eq!(next, base);
    }

    #[test]
    fn fully_reverted_sequence_restores_base() {
        let base = vec![secret(1, "one"), secret(2, "two")];
        let temp = secret(-100, "draft");
        let actions = [
            SecretAction::Create(temp.clone()),
            SecretAction::Update(secret(-100, "edited draft")),
            SecretAction::Delete(temp.id),
        ];
        assert_eq!(apply(&base, &actions), base);
    }
}
