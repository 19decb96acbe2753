use chrono::Utc;
use sea_orm::*;
use tracing::instrument;
use validator::Validate;

use crate::email::templates;
use crate::errors::{AppError, Result};
use crate::middleware::Actor;
use crate::models::dto::{CreateCommentRequest, CreateTicketRequest};
use crate::models::tickets::{self, TicketStatus};
use crate::models::{ticket_comments, users};
use crate::services::authorization::{ensure, Action, Resource};
use crate::services::deck_service::{DeckContext, DeckService};
use crate::services::status::{check_ticket_transition, Mover};
use crate::services::OutboxService;

pub struct TicketService;

impl TicketService {
    async fn load_with_deck<C: ConnectionTrait>(
        conn: &C,
        ticket_id: i32,
    ) -> Result<(tickets::Model, DeckContext)> {
        let ticket = tickets::Entity::find_by_id(ticket_id)
            .one(conn)
            .await?
            .ok_or(AppError::NotFound("ticket_not_found"))?;

        let context = DeckService::load_context(conn, ticket.deck_id)
            .await?
            .ok_or_else(|| AppError::Internal(format!("deck {} of ticket {} missing", ticket.deck_id, ticket.id)))?;

        Ok((ticket, context))
    }

    fn as_resource(ticket: &tickets::Model, context: &DeckContext) -> Resource {
        Resource::Ticket {
            author_id: ticket.author_id,
            assigned_to_id: ticket.assigned_to_id,
            coach_id: context.deck.coach_id,
            student_id: context.student_id(),
        }
    }

    async fn email_of<C: ConnectionTrait>(conn: &C, user_id: Option<i32>) -> Result<Option<String>> {
        let Some(user_id) = user_id else {
            return Ok(None);
        };
        Ok(users::Entity::find_by_id(user_id)
            .one(conn)
            .await?
            .map(|u| u.email))
    }

    /// Ouvre un ticket. Seul l'étudiant du deck peut le faire; le coach est prévenu.
    #[instrument(skip(db, actor, request), fields(actor_id = actor.id, deck_id = request.deck_id))]
    pub async fn create_ticket(
        db: &DatabaseConnection,
        actor: &Actor,
        request: &CreateTicketRequest,
    ) -> Result<tickets::Model> {
        request.validate()?;

        // Deck inconnu et deck d'un autre étudiant: même réponse
        let context = DeckService::load_context(db, request.deck_id)
            .await?
            .ok_or(AppError::Forbidden("not_in_deck"))?;
        ensure(actor, context.as_resource(), Action::Create)?;

        let now = Utc::now();
        let txn = db.begin().await?;

        let ticket = tickets::ActiveModel {
            deck_id: Set(context.deck.id),
            author_id: Set(actor.id),
            assigned_to_id: Set(None),
            title: Set(request.title.trim().to_string()),
            body: Set(request.body.clone()),
            status: Set(TicketStatus::Open),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        if let Some(coach_email) = Self::email_of(&txn, Some(context.deck.coach_id)).await? {
            OutboxService::enqueue(&txn, templates::new_ticket(&coach_email, &ticket.title)).await?;
        }

        txn.commit().await?;

        tracing::info!(ticket_id = ticket.id, "ticket created");
        Ok(ticket)
    }

    /// Change le statut d'un ticket (coach du deck ou admin); l'étudiant est prévenu
    #[instrument(skip(db, actor), fields(actor_id = actor.id))]
    pub async fn set_status(
        db: &DatabaseConnection,
        actor: &Actor,
        ticket_id: i32,
        status: TicketStatus,
    ) -> Result<tickets::Model> {
        let (ticket, context) = Self::load_with_deck(db, ticket_id).await?;
        ensure(actor, Self::as_resource(&ticket, &context), Action::SetStatus)?;
        check_ticket_transition(Mover::Reviewer, ticket.status, status)?;

        let previous = ticket.status;
        let txn = db.begin().await?;

        let mut active: tickets::ActiveModel = ticket.into();
        active.status = Set(status);
        active.updated_at = Set(Utc::now());
        let updated = active.update(&txn).await?;

        if let Some(student_email) = Self::email_of(&txn, context.student_id()).await? {
            let email = templates::ticket_status_changed(&student_email, &updated.title, updated.status);
            OutboxService::enqueue(&txn, email).await?;
        }

        txn.commit().await?;

        tracing::info!(ticket_id, from = ?previous, to = ?status, "ticket status changed");
        Ok(updated)
    }

    /// Ajoute un commentaire. Auteur, assigné, coach, étudiant du deck ou admin.
    /// L'autre partie est prévenue: le coach si l'étudiant répond, l'étudiant sinon.
    #[instrument(skip(db, actor, request), fields(actor_id = actor.id))]
    pub async fn add_comment(
        db: &DatabaseConnection,
        actor: &Actor,
        ticket_id: i32,
        request: &CreateCommentRequest,
    ) -> Result<ticket_comments::Model> {
        request.validate()?;

        let (ticket, context) = Self::load_with_deck(db, ticket_id).await?;
        ensure(actor, Self::as_resource(&ticket, &context), Action::Comment)?;

        let txn = db.begin().await?;

        let comment = ticket_comments::ActiveModel {
            ticket_id: Set(ticket.id),
            author_id: Set(actor.id),
            body: Set(request.body.clone()),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        let commenter_is_student = context.student_id() == Some(actor.id);
        let notify = if commenter_is_student {
            Some(context.deck.coach_id)
        } else {
            context.student_id()
        };

        if let Some(to) = Self::email_of(&txn, notify).await? {
            let email = templates::ticket_reply(&to, &ticket.title, &actor.email, &comment.body);
            OutboxService::enqueue(&txn, email).await?;
        }

        txn.commit().await?;

        Ok(comment)
    }
}
