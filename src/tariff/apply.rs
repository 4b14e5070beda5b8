use crate::error::{Error, Result};
use crate::tariff::validation::validate;
use crate::tariff::{StoreCommand, TariffBook, TariffCommand, TariffConfiguration, TariffId, TariffState};
use chrono::{DateTime, Utc};

/// What a committed command did. Carries enough to notify hooks without re-reading the book.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    Created(TariffId),
    Updated(TariffId),
    Activated {
        id: TariffId,
        displaced: Option<TariffId>,
    },
    Paused(TariffId),
    Resumed(TariffId),
    Finalized(TariffId),
    Deleted(TariffConfiguration),
}

impl Transition {
    pub fn id(&self) -> TariffId {
        match self {
            Transition::Created(id)
            | Transition::Updated(id)
            | Transition::Paused(id)
            | Transition::Resumed(id)
            | Transition::Finalized(id) => *id,
            Transition::Activated { id, .. } => *id,
            Transition::Deleted(config) => config.id,
        }
    }
}

/// Validate then apply a command to a copy of `book`.
///
/// The input book is never modified; on error nothing changes. Deterministic: the
/// command's own `at` is the only clock consulted.
pub fn apply(book: &TariffBook, cmd: &StoreCommand) -> Result<(TariffBook, Transition)> {
    validate(book, cmd)?;
    let mut new_book = book.clone();
    let transition = match &cmd.kind {
        TariffCommand::Create { draft } => {
            let id = new_book.allocate_id();
            let config = TariffConfiguration::from_draft(id, draft.clone(), &cmd.actor, cmd.at);
            new_book.insert(config);
            Transition::Created(id)
        }
        TariffCommand::Update { id, patch } => {
            let config = get_mut(&mut new_book, *id)?;
            config.apply_patch(patch.clone());
            config.audit.touch(&cmd.actor, cmd.at);
            Transition::Updated(*id)
        }
        TariffCommand::Activate { id } => {
            let displaced = apply_activate(&mut new_book, *id, &cmd.actor, cmd.at)?;
            Transition::Activated { id: *id, displaced }
        }
        TariffCommand::Pause { id } => {
            let config = get_mut(&mut new_book, *id)?;
            pause(config, &cmd.actor, cmd.at);
            Transition::Paused(*id)
        }
        TariffCommand::Resume { id } => {
            let config = get_mut(&mut new_book, *id)?;
            config.state = TariffState::Active;
            config.paused_at = None;
            config.audit.touch(&cmd.actor, cmd.at);
            Transition::Resumed(*id)
        }
        TariffCommand::Finalize { id } => {
            let config = get_mut(&mut new_book, *id)?;
            config.state = TariffState::Finalized;
            // finalizing before the start date must not leave expires_at < effective_from
            config.expires_at = Some(cmd.at.max(config.effective_from));
            config.audit.touch(&cmd.actor, cmd.at);
            Transition::Finalized(*id)
        }
        TariffCommand::Delete { id } => {
            let removed = new_book.remove(*id).ok_or(Error::NotFound(*id))?;
            Transition::Deleted(removed)
        }
    };

    Ok((new_book, transition))
}

fn get_mut(book: &mut TariffBook, id: TariffId) -> Result<&mut TariffConfiguration> {
    book.get_mut(id).ok_or(Error::NotFound(id))
}

fn pause(config: &mut TariffConfiguration, actor: &str, at: DateTime<Utc>) {
    config.state = TariffState::Paused;
    config.paused_at = Some(at);
    config.audit.touch(actor, at);
}

/// Demote the current Active configuration (if any, and if it is not the target) to
/// Paused, then promote the target. Returns the demoted id.
fn apply_activate(
    book: &mut TariffBook,
    id: TariffId,
    actor: &str,
    at: DateTime<Utc>,
) -> Result<Option<TariffId>> {
    let displaced = book.active().map(|c| c.id).filter(|active| *active != id);
    if let Some(prev) = displaced {
        pause(get_mut(book, prev)?, actor, at);
    }

    let config = get_mut(book, id)?;
    config.state = TariffState::Active;
    config.paused_at = None;
    config.audit.touch(actor, at);

    Ok(displaced)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tariff::test_support::{at, draft};
    use crate::tariff::TariffPatch;

    fn run(book: &TariffBook, kind: TariffCommand) -> Result<(TariffBook, Transition)> {
        apply(book, &StoreCommand::new("admin".to_string(), at(2025, 3, 1), kind))
    }

    fn created(n: usize) -> TariffBook {
        let mut book = TariffBook::new();
        for _ in 0..n {
            book = run(&book, TariffCommand::Create { draft: draft() }).unwrap().0;
        }
        book
    }

    #[test]
    fn test_apply_create() {
        let book = TariffBook::new();
        let (book, transition) = run(&book, TariffCommand::Create { draft: draft() }).unwrap();
        assert_eq!(transition, Transition::Created(TariffId(1)));
        let config = book.get(TariffId(1)).unwrap();
        assert_eq!(config.state, TariffState::Draft);
        assert_eq!(config.audit.created_by, "admin");
        assert_eq!(config.audit.created_at, at(2025, 3, 1));
    }

    #[test]
    fn test_apply_create_invalid_leaves_book_untouched() {
        let book = created(1);
        let mut bad = draft();
        bad.tiers.clear();
        assert!(run(&book, TariffCommand::Create { draft: bad }).is_err());
        assert_eq!(book.len(), 1);
        assert_eq!(book.next_id(), TariffId(2));
    }

    #[test]
    fn test_apply_update_touches_audit() {
        let book = created(1);
        let patch = TariffPatch {
            description: Some("revised".to_string()),
            ..TariffPatch::default()
        };
        let (book, _) = apply(
            &book,
            &StoreCommand::new(
                "editor".to_string(),
                at(2025, 4, 1),
                TariffCommand::Update {
                    id: TariffId(1),
                    patch,
                },
            ),
        )
        .unwrap();
        let config = book.get(TariffId(1)).unwrap();
        assert_eq!(config.description, "revised");
        assert_eq!(config.audit.created_by, "admin");
        assert_eq!(config.audit.modified_by, "editor");
        assert_eq!(config.audit.modified_at, at(2025, 4, 1));
    }

    #[test]
    fn test_apply_activate_displaces_previous() {
        let book = created(2);
        let (book, _) = run(&book, TariffCommand::Activate { id: TariffId(1) }).unwrap();
        let (book, transition) = run(&book, TariffCommand::Activate { id: TariffId(2) }).unwrap();

        assert_eq!(
            transition,
            Transition::Activated {
                id: TariffId(2),
                displaced: Some(TariffId(1))
            }
        );
        let a = book.get(TariffId(1)).unwrap();
        assert_eq!(a.state, TariffState::Paused);
        assert_eq!(a.paused_at, Some(at(2025, 3, 1)));
        assert_eq!(book.get(TariffId(2)).unwrap().state, TariffState::Active);
        assert_eq!(book.active_count(), 1);
    }

    #[test]
    fn test_apply_activate_twice_rejected() {
        let book = created(1);
        let (book, _) = run(&book, TariffCommand::Activate { id: TariffId(1) }).unwrap();
        assert!(matches!(
            run(&book, TariffCommand::Activate { id: TariffId(1) }),
            Err(Error::InvalidStateTransition { .. })
        ));
    }

    #[test]
    fn test_apply_pause_and_resume() {
        let book = created(1);
        let (book, _) = run(&book, TariffCommand::Activate { id: TariffId(1) }).unwrap();
        let (book, _) = run(&book, TariffCommand::Pause { id: TariffId(1) }).unwrap();
        assert_eq!(book.get(TariffId(1)).unwrap().state, TariffState::Paused);
        assert_eq!(book.active_count(), 0);

        let (book, transition) = run(&book, TariffCommand::Resume { id: TariffId(1) }).unwrap();
        assert_eq!(transition, Transition::Resumed(TariffId(1)));
        let config = book.get(TariffId(1)).unwrap();
        assert_eq!(config.state, TariffState::Active);
        assert_eq!(config.paused_at, None);
    }

    #[test]
    fn test_apply_resume_blocked_by_other_active() {
        let book = created(2);
        let (book, _) = run(&book, TariffCommand::Activate { id: TariffId(1) }).unwrap();
        let (book, _) = run(&book, TariffCommand::Activate { id: TariffId(2) }).unwrap();

        let err = run(&book, TariffCommand::Resume { id: TariffId(1) }).unwrap_err();
        assert_eq!(
            err,
            Error::ActiveConflict {
                id: TariffId(1),
                active: TariffId(2)
            }
        );
        assert_eq!(book.get(TariffId(1)).unwrap().state, TariffState::Paused);
        assert_eq!(book.get(TariffId(2)).unwrap().state, TariffState::Active);
    }

    #[test]
    fn test_apply_finalize_sets_expiry() {
        let book = created(1);
        let (book, _) = run(&book, TariffCommand::Activate { id: TariffId(1) }).unwrap();
        let (book, _) = run(&book, TariffCommand::Finalize { id: TariffId(1) }).unwrap();
        let config = book.get(TariffId(1)).unwrap();
        assert_eq!(config.state, TariffState::Finalized);
        assert_eq!(config.expires_at, Some(at(2025, 3, 1)));

        // terminal
        for kind in [
            TariffCommand::Activate { id: TariffId(1) },
            TariffCommand::Resume { id: TariffId(1) },
            TariffCommand::Pause { id: TariffId(1) },
            TariffCommand::Finalize { id: TariffId(1) },
        ] {
            assert!(run(&book, kind).is_err());
        }
    }

    #[test]
    fn test_apply_finalize_before_effective_date() {
        let mut future = draft();
        future.effective_from = at(2026, 1, 1);
        let (book, _) = run(&TariffBook::new(), TariffCommand::Create { draft: future }).unwrap();
        let (book, _) = run(&book, TariffCommand::Activate { id: TariffId(1) }).unwrap();
        let (book, _) = run(&book, TariffCommand::Finalize { id: TariffId(1) }).unwrap();

        let config = book.get(TariffId(1)).unwrap();
        assert_eq!(config.expires_at, Some(at(2026, 1, 1)));
        assert!(config.expires_at >= Some(config.effective_from));
        assert!(book.resolve(at(2026, 1, 1)).is_err());
    }

    #[test]
    fn test_apply_finalize_draft_rejected() {
        let book = created(1);
        assert!(run(&book, TariffCommand::Finalize { id: TariffId(1) }).is_err());
    }

    #[test]
    fn test_apply_delete() {
        let book = created(2);
        let (book, _) = run(&book, TariffCommand::Activate { id: TariffId(1) }).unwrap();
        assert!(run(&book, TariffCommand::Delete { id: TariffId(1) }).is_err());

        let (book, transition) = run(&book, TariffCommand::Delete { id: TariffId(2) }).unwrap();
        assert_eq!(transition.id(), TariffId(2));
        assert!(book.get(TariffId(2)).is_none());

        // ids are never reused
        let (book, transition) = run(&book, TariffCommand::Create { draft: draft() }).unwrap();
        assert_eq!(transition, Transition::Created(TariffId(3)));
        assert_eq!(book.len(), 2);
    }
}
