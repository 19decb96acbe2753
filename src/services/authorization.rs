// ============================================================================
// AUTORISATION
// ============================================================================
//
// Toutes les règles "qui a le droit de faire quoi" sont ici, dans une seule
// fonction pure: authorize(actor, resource, action) -> Decision.
//
// Les services chargent d'abord la ressource (propriétaire, membres...), puis
// demandent une décision. Deux façons de convertir un refus:
//   - ensure()         : refus => 403 Forbidden(raison)
//   - ensure_visible() : refus => 404, pour ne pas révéler qu'une ressource
//                        existe à quelqu'un qui ne peut pas la voir
//
// ============================================================================

use crate::errors::{AppError, Result};
use crate::middleware::Actor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Read,
    Create,
    Update,
    Delete,
    SetStatus,
    Comment,
    UploadProof,
}

/// Ce sur quoi porte l'action, avec les ids nécessaires à la décision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    /// Comptes utilisateurs (écran des approbations)
    UserAccounts,
    /// Collection des decks (création, listing)
    Decks,
    Deck {
        coach_id: i32,
        student_id: Option<i32>,
    },
    Ticket {
        author_id: i32,
        assigned_to_id: Option<i32>,
        coach_id: i32,
        student_id: Option<i32>,
    },
    /// Config + canaux de paiement de l'appelant. `owner_id` est renseigné
    /// dès qu'un enregistrement précis est visé.
    PaymentChannels { owner_id: Option<i32> },
    Plans { coach_id: Option<i32> },
    /// Collection des factures (création, listing)
    Invoices,
    Invoice {
        student_id: i32,
        coach_id: i32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed,
    Denied(&'static str),
}

impl Decision {
    fn from_bool(allowed: bool, reason: &'static str) -> Self {
        if allowed {
            Decision::Allowed
        } else {
            Decision::Denied(reason)
        }
    }

    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allowed)
    }
}

pub fn authorize(actor: &Actor, resource: Resource, action: Action) -> Decision {
    match resource {
        Resource::UserAccounts => Decision::from_bool(actor.is_super_admin(), "forbidden"),

        Resource::Decks => match action {
            Action::Create => Decision::from_bool(actor.is_coach(), "forbidden"),
            // le listing est filtré par rôle dans le service
            Action::Read => Decision::Allowed,
            _ => Decision::Denied("forbidden"),
        },

        Resource::Deck {
            coach_id,
            student_id,
        } => {
            let is_coach = actor.id == coach_id;
            let is_student = student_id == Some(actor.id);
            match action {
                Action::Read => {
                    Decision::from_bool(is_coach || is_student || actor.is_admin(), "not_found")
                }
                // un ticket est ouvert par l'étudiant du deck, personne d'autre
                Action::Create => Decision::from_bool(is_student, "not_in_deck"),
                // documents et progression
                Action::Update => Decision::from_bool(is_coach || actor.is_admin(), "forbidden"),
                _ => Decision::Denied("forbidden"),
            }
        }

        Resource::Ticket {
            author_id,
            assigned_to_id,
            coach_id,
            student_id,
        } => {
            let is_coach = actor.id == coach_id;
            match action {
                Action::SetStatus => {
                    Decision::from_bool(is_coach || actor.is_admin(), "forbidden")
                }
                Action::Comment | Action::Read => {
                    let allowed = actor.id == author_id
                        || assigned_to_id == Some(actor.id)
                        || is_coach
                        || student_id == Some(actor.id)
                        || actor.is_admin();
                    Decision::from_bool(allowed, "forbidden")
                }
                _ => Decision::Denied("forbidden"),
            }
        }

        Resource::PaymentChannels { owner_id } => {
            if !(actor.is_coach() || actor.is_super_admin()) {
                return Decision::Denied("forbidden");
            }
            match owner_id {
                Some(owner) => Decision::from_bool(owner == actor.id || actor.is_admin(), "forbidden"),
                None => Decision::Allowed,
            }
        }

        Resource::Plans { coach_id } => match coach_id {
            Some(owner) => Decision::from_bool(owner == actor.id || actor.is_admin(), "forbidden"),
            None => Decision::from_bool(actor.is_coach() || actor.is_admin(), "forbidden"),
        },

        Resource::Invoices => match action {
            Action::Create => Decision::from_bool(actor.is_student(), "forbidden"),
            Action::Read => Decision::Allowed,
            _ => Decision::Denied("forbidden"),
        },

        Resource::Invoice {
            student_id,
            coach_id,
        } => {
            let is_student = actor.id == student_id;
            let is_coach = actor.id == coach_id;
            match action {
                Action::Read => {
                    Decision::from_bool(is_student || is_coach || actor.is_admin(), "not_found")
                }
                Action::UploadProof => Decision::from_bool(is_student, "forbidden"),
                Action::SetStatus => {
                    Decision::from_bool(is_coach || actor.is_admin(), "forbidden")
                }
                _ => Decision::Denied("forbidden"),
            }
        }
    }
}

/// Refus => 403
pub fn ensure(actor: &Actor, resource: Resource, action: Action) -> Result<()> {
    match authorize(actor, resource, action) {
        Decision::Allowed => Ok(()),
        Decision::Denied(reason) => {
            tracing::debug!(actor_id = actor.id, ?resource, ?action, reason, "access denied");
            Err(AppError::Forbidden(reason))
        }
    }
}

/// Refus => 404 avec le code donné
pub fn ensure_visible(
    actor: &Actor,
    resource: Resource,
    action: Action,
    not_found: &'static str,
) -> Result<()> {
    if authorize(actor, resource, action).is_allowed() {
        Ok(())
    } else {
        Err(AppError::NotFound(not_found))
    }
}
