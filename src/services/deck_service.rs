use std::collections::HashMap;

use chrono::Utc;
use sea_orm::*;
use tracing::instrument;
use validator::Validate;

use crate::config::AppConfig;
use crate::email::templates;
use crate::errors::{AppError, Result};
use crate::middleware::Actor;
use crate::models::dto::{
    CreateDeckRequest, CreateDocumentRequest, CreateProgressRequest, DeckDetail, DeckSummary,
    TicketWithComments, UserSummary,
};
use crate::models::users::{self, AccessLevel, Role, UserStatus};
use crate::models::{decks, documents, memberships, progress_entries, ticket_comments, tickets};
use crate::services::auth_service::normalize_email;
use crate::services::authorization::{ensure, ensure_visible, Action, Resource};
use crate::services::OutboxService;
use crate::utils::password;

/// Nombre d'entrées de progression renvoyées avec le détail d'un deck
const RECENT_PROGRESS: u64 = 4;

/// Un deck avec son éventuel étudiant
pub struct DeckContext {
    pub deck: decks::Model,
    pub membership: Option<memberships::Model>,
}

impl DeckContext {
    pub fn student_id(&self) -> Option<i32> {
        self.membership.as_ref().map(|m| m.student_id)
    }

    pub fn as_resource(&self) -> Resource {
        Resource::Deck {
            coach_id: self.deck.coach_id,
            student_id: self.student_id(),
        }
    }
}

pub struct DeckService;

impl DeckService {
    /// Charge un deck et sa membership (None si le deck n'existe pas)
    pub async fn load_context<C: ConnectionTrait>(conn: &C, deck_id: i32) -> Result<Option<DeckContext>> {
        let Some(deck) = decks::Entity::find_by_id(deck_id).one(conn).await? else {
            return Ok(None);
        };

        let membership = memberships::Entity::find()
            .filter(memberships::Column::DeckId.eq(deck.id))
            .one(conn)
            .await?;

        Ok(Some(DeckContext { deck, membership }))
    }

    async fn users_by_id<C: ConnectionTrait>(conn: &C, ids: Vec<i32>) -> Result<HashMap<i32, users::Model>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let users = users::Entity::find()
            .filter(users::Column::Id.is_in(ids))
            .all(conn)
            .await?;
        Ok(users.into_iter().map(|u| (u.id, u)).collect())
    }

    /// Crée un deck pour le coach et y associe l'étudiant.
    /// L'étudiant est créé (ACTIVE, mot de passe temporaire envoyé par email)
    /// s'il n'a pas encore de compte.
    #[instrument(skip(db, config, actor, request), fields(actor_id = actor.id))]
    pub async fn create_deck(
        db: &DatabaseConnection,
        config: &AppConfig,
        actor: &Actor,
        request: &CreateDeckRequest,
    ) -> Result<DeckSummary> {
        ensure(actor, Resource::Decks, Action::Create)?;
        request.validate()?;

        let student_email = normalize_email(&request.student_email);
        let now = Utc::now();
        let txn = db.begin().await?;

        // 1. Trouver ou créer l'étudiant
        let existing = users::Entity::find()
            .filter(users::Column::Email.eq(&student_email))
            .one(&txn)
            .await?;

        let student = match existing {
            Some(user) if user.role != Role::Student => {
                return Err(AppError::Conflict("email_not_student"));
            }
            Some(user) => {
                let paired = memberships::Entity::find()
                    .filter(memberships::Column::StudentId.eq(user.id))
                    .one(&txn)
                    .await?;
                if paired.is_some() {
                    return Err(AppError::Conflict("student_already_paired"));
                }
                user
            }
            None => {
                let temp_password = password::generate_temp_password();
                let hash = password::hash_password(&temp_password).map_err(AppError::Internal)?;

                let student = users::ActiveModel {
                    email: Set(student_email.clone()),
                    name: Set(None),
                    password_hash: Set(Some(hash)),
                    role: Set(Role::Student),
                    access_level: Set(AccessLevel::User),
                    status: Set(UserStatus::Active),
                    created_at: Set(now),
                    updated_at: Set(now),
                    ..Default::default()
                }
                .insert(&txn)
                .await?;

                let email = templates::student_account(&student.email, &config.app_base_url, &temp_password);
                OutboxService::enqueue(&txn, email).await?;
                tracing::info!(student_id = student.id, "student account provisioned");
                student
            }
        };

        // 2. Deck + membership
        let deck = decks::ActiveModel {
            name: Set(request.name.trim().to_string()),
            coach_id: Set(actor.id),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        memberships::ActiveModel {
            deck_id: Set(deck.id),
            student_id: Set(student.id),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        let coach = users::Entity::find_by_id(actor.id)
            .one(&txn)
            .await?
            .ok_or(AppError::Unauthorized)?;

        txn.commit().await?;

        tracing::info!(deck_id = deck.id, student_id = student.id, "deck created");
        Ok(DeckSummary {
            deck,
            coach: UserSummary::from(&coach),
            student: Some(UserSummary::from(&student)),
        })
    }

    /// Decks visibles: les siens pour un coach, le sien pour un étudiant, tous pour un admin
    #[instrument(skip(db, actor), fields(actor_id = actor.id))]
    pub async fn list_decks(db: &DatabaseConnection, actor: &Actor) -> Result<Vec<DeckSummary>> {
        ensure(actor, Resource::Decks, Action::Read)?;

        let mut query = decks::Entity::find().order_by_desc(decks::Column::CreatedAt);
        if !actor.is_admin() {
            query = match actor.role {
                Role::Student => {
                    let deck_ids: Vec<i32> = memberships::Entity::find()
                        .filter(memberships::Column::StudentId.eq(actor.id))
                        .all(db)
                        .await?
                        .into_iter()
                        .map(|m| m.deck_id)
                        .collect();
                    query.filter(decks::Column::Id.is_in(deck_ids))
                }
                _ => query.filter(decks::Column::CoachId.eq(actor.id)),
            };
        }
        let decks = query.all(db).await?;

        let deck_ids: Vec<i32> = decks.iter().map(|d| d.id).collect();
        let student_by_deck: HashMap<i32, i32> = memberships::Entity::find()
            .filter(memberships::Column::DeckId.is_in(deck_ids))
            .all(db)
            .await?
            .into_iter()
            .map(|m| (m.deck_id, m.student_id))
            .collect();

        let mut user_ids: Vec<i32> = decks.iter().map(|d| d.coach_id).collect();
        user_ids.extend(student_by_deck.values().copied());
        let users = Self::users_by_id(db, user_ids).await?;

        let summaries = decks
            .into_iter()
            .filter_map(|deck| {
                let coach = users.get(&deck.coach_id).map(UserSummary::from)?;
                let student = student_by_deck
                    .get(&deck.id)
                    .and_then(|id| users.get(id))
                    .map(UserSummary::from);
                Some(DeckSummary { deck, coach, student })
            })
            .collect();

        Ok(summaries)
    }

    /// Détail d'un deck: tickets (avec commentaires), documents, 4 dernières progressions.
    /// Un deck non visible répond comme un deck inexistant.
    #[instrument(skip(db, actor), fields(actor_id = actor.id))]
    pub async fn get_deck(db: &DatabaseConnection, actor: &Actor, deck_id: i32) -> Result<DeckDetail> {
        let context = Self::load_context(db, deck_id)
            .await?
            .ok_or(AppError::NotFound("deck_not_found"))?;
        ensure_visible(actor, context.as_resource(), Action::Read, "deck_not_found")?;

        let DeckContext { deck, membership } = context;

        // Tickets du plus récent au plus ancien, commentaires dans l'ordre d'écriture
        let tickets = tickets::Entity::find()
            .filter(tickets::Column::DeckId.eq(deck.id))
            .order_by_desc(tickets::Column::CreatedAt)
            .order_by_desc(tickets::Column::Id)
            .all(db)
            .await?;

        let ticket_ids: Vec<i32> = tickets.iter().map(|t| t.id).collect();
        let comments = ticket_comments::Entity::find()
            .filter(ticket_comments::Column::TicketId.is_in(ticket_ids))
            .order_by_asc(ticket_comments::Column::CreatedAt)
            .order_by_asc(ticket_comments::Column::Id)
            .all(db)
            .await?;

        let mut comments_by_ticket: HashMap<i32, Vec<ticket_comments::Model>> = HashMap::new();
        for comment in comments {
            comments_by_ticket.entry(comment.ticket_id).or_default().push(comment);
        }

        let mut user_ids: Vec<i32> = tickets.iter().map(|t| t.author_id).collect();
        user_ids.push(deck.coach_id);
        if let Some(m) = &membership {
            user_ids.push(m.student_id);
        }
        let users = Self::users_by_id(db, user_ids).await?;

        let tickets = tickets
            .into_iter()
            .map(|ticket| TicketWithComments {
                author_email: users.get(&ticket.author_id).map(|u| u.email.clone()),
                comments: comments_by_ticket.remove(&ticket.id).unwrap_or_default(),
                ticket,
            })
            .collect();

        let documents = documents::Entity::find()
            .filter(documents::Column::DeckId.eq(deck.id))
            .order_by_desc(documents::Column::CreatedAt)
            .all(db)
            .await?;

        let progress = progress_entries::Entity::find()
            .filter(progress_entries::Column::DeckId.eq(deck.id))
            .order_by_desc(progress_entries::Column::WeekStart)
            .order_by_desc(progress_entries::Column::Id)
            .limit(RECENT_PROGRESS)
            .all(db)
            .await?;

        let coach = users
            .get(&deck.coach_id)
            .map(UserSummary::from)
            .ok_or_else(|| AppError::Internal(format!("coach {} of deck {} missing", deck.coach_id, deck.id)))?;
        let student = membership
            .as_ref()
            .and_then(|m| users.get(&m.student_id))
            .map(UserSummary::from);

        Ok(DeckDetail {
            deck,
            coach,
            student,
            tickets,
            documents,
            progress,
        })
    }

    /// Ajoute un document (lien) au deck. Coach du deck ou admin.
    #[instrument(skip(db, actor, request), fields(actor_id = actor.id, deck_id = request.deck_id))]
    pub async fn add_document(
        db: &DatabaseConnection,
        actor: &Actor,
        request: &CreateDocumentRequest,
    ) -> Result<documents::Model> {
        request.validate()?;
        let context = Self::load_context(db, request.deck_id)
            .await?
            .ok_or(AppError::NotFound("deck_not_found"))?;
        ensure_visible(actor, context.as_resource(), Action::Read, "deck_not_found")?;
        ensure(actor, context.as_resource(), Action::Update)?;

        let url = request
            .url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .map(str::to_string);

        let document = documents::ActiveModel {
            deck_id: Set(context.deck.id),
            title: Set(request.title.trim().to_string()),
            url: Set(url),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(db)
        .await?;

        Ok(document)
    }

    /// Ajoute une entrée de progression hebdomadaire. Coach du deck ou admin.
    #[instrument(skip(db, actor, request), fields(actor_id = actor.id, deck_id = request.deck_id))]
    pub async fn add_progress(
        db: &DatabaseConnection,
        actor: &Actor,
        request: &CreateProgressRequest,
    ) -> Result<progress_entries::Model> {
        request.validate()?;
        let context = Self::load_context(db, request.deck_id)
            .await?
            .ok_or(AppError::NotFound("deck_not_found"))?;
        ensure_visible(actor, context.as_resource(), Action::Read, "deck_not_found")?;
        ensure(actor, context.as_resource(), Action::Update)?;

        let blank_to_none = |value: &Option<String>| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        let entry = progress_entries::ActiveModel {
            deck_id: Set(context.deck.id),
            author_id: Set(actor.id),
            week_start: Set(request.week_start),
            summary: Set(request.summary.trim().to_string()),
            blockers: Set(blank_to_none(&request.blockers)),
            next_actions: Set(blank_to_none(&request.next_actions)),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(db)
        .await?;

        Ok(entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::notification_outbox;
    use crate::test_utils::{active_user, setup_test_db};
    use chrono::NaiveDate;

    fn deck_request(student_email: &str) -> CreateDeckRequest {
        CreateDeckRequest {
            name: "Deck".to_string(),
            student_email: student_email.to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_deck_provisions_student() {
        let db = setup_test_db().await;
        let config = AppConfig::for_tests();
        let (_, coach) = active_user(&db, "coach@example.com", Role::Coach).await;

        let summary = DeckService::create_deck(&db, &config, &coach, &deck_request("New.Student@example.com"))
            .await
            .unwrap();

        let student = summary.student.unwrap();
        assert_eq!(student.email, "new.student@example.com");

        let account = users::Entity::find_by_id(student.id).one(&db).await.unwrap().unwrap();
        assert_eq!(account.role, Role::Student);
        assert_eq!(account.status, UserStatus::Active);

        let outbox = notification_outbox::Entity::find().all(&db).await.unwrap();
        assert_eq!(outbox.len(), 1);
        assert!(outbox[0].body.contains("Temp password"));
    }

    #[tokio::test]
    async fn test_create_deck_trims_inputs() {
        let db = setup_test_db().await;
        let config = AppConfig::for_tests();
        let (_, coach) = active_user(&db, "coach@example.com", Role::Coach).await;

        let summary = DeckService::create_deck(&db, &config, &coach, &deck_request(" Sam@Example.com "))
            .await
            .unwrap();
        assert_eq!(summary.student.unwrap().email, "sam@example.com");

        let blank_name = CreateDeckRequest {
            name: "   ".to_string(),
            student_email: "other@example.com".to_string(),
        };
        assert!(matches!(
            DeckService::create_deck(&db, &config, &coach, &blank_name).await,
            Err(AppError::InvalidPayload(_))
        ));
        assert_eq!(decks::Entity::find().count(&db).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_student_pairs_with_one_deck_only() {
        let db = setup_test_db().await;
        let config = AppConfig::for_tests();
        let (_, coach) = active_user(&db, "coach@example.com", Role::Coach).await;
        let (_, other_coach) = active_user(&db, "other@example.com", Role::Coach).await;

        DeckService::create_deck(&db, &config, &coach, &deck_request("s@example.com")).await.unwrap();
        let second = DeckService::create_deck(&db, &config, &other_coach, &deck_request("s@example.com")).await;
        assert!(matches!(second, Err(AppError::Conflict("student_already_paired"))));

        // la transaction échouée n'a laissé aucun deck
        assert_eq!(decks::Entity::find().count(&db).await.unwrap(), 1);
        assert_eq!(memberships::Entity::find().count(&db).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_create_deck_rules() {
        let db = setup_test_db().await;
        let config = AppConfig::for_tests();
        let (_, coach) = active_user(&db, "coach@example.com", Role::Coach).await;
        let (_, student) = active_user(&db, "student@example.com", Role::Student).await;

        assert!(matches!(
            DeckService::create_deck(&db, &config, &student, &deck_request("x@example.com")).await,
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            DeckService::create_deck(&db, &config, &coach, &deck_request("coach@example.com")).await,
            Err(AppError::Conflict("email_not_student"))
        ));
        assert!(matches!(
            DeckService::create_deck(&db, &config, &coach, &deck_request("not-an-email")).await,
            Err(AppError::InvalidPayload(_))
        ));
    }

    #[tokio::test]
    async fn test_deck_visibility_and_listing() {
        let db = setup_test_db().await;
        let config = AppConfig::for_tests();
        let (_, coach) = active_user(&db, "coach@example.com", Role::Coach).await;
        let (_, outsider) = active_user(&db, "outsider@example.com", Role::Coach).await;
        let (_, admin) = active_user(&db, "root@example.com", Role::SuperAdmin).await;
        let (_, student) = active_user(&db, "student@example.com", Role::Student).await;

        let summary = DeckService::create_deck(&db, &config, &coach, &deck_request("student@example.com"))
            .await
            .unwrap();
        let deck_id = summary.deck.id;

        assert!(DeckService::get_deck(&db, &coach, deck_id).await.is_ok());
        assert!(DeckService::get_deck(&db, &student, deck_id).await.is_ok());
        assert!(DeckService::get_deck(&db, &admin, deck_id).await.is_ok());
        assert!(matches!(
            DeckService::get_deck(&db, &outsider, deck_id).await,
            Err(AppError::NotFound("deck_not_found"))
        ));

        assert_eq!(DeckService::list_decks(&db, &coach).await.unwrap().len(), 1);
        assert_eq!(DeckService::list_decks(&db, &student).await.unwrap().len(), 1);
        assert_eq!(DeckService::list_decks(&db, &admin).await.unwrap().len(), 1);
        assert!(DeckService::list_decks(&db, &outsider).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_documents_and_progress() {
        let db = setup_test_db().await;
        let config = AppConfig::for_tests();
        let (_, coach) = active_user(&db, "coach@example.com", Role::Coach).await;
        let (_, student) = active_user(&db, "student@example.com", Role::Student).await;
        let deck_id = DeckService::create_deck(&db, &config, &coach, &deck_request("student@example.com"))
            .await
            .unwrap()
            .deck
            .id;

        let document = DeckService::add_document(
            &db,
            &coach,
            &CreateDocumentRequest {
                deck_id,
                title: "Plan".to_string(),
                url: Some("  ".to_string()),
            },
        )
        .await
        .unwrap();
        assert_eq!(document.url, None);

        let student_attempt = DeckService::add_document(
            &db,
            &student,
            &CreateDocumentRequest {
                deck_id,
                title: "Mine".to_string(),
                url: None,
            },
        )
        .await;
        assert!(matches!(student_attempt, Err(AppError::Forbidden(_))));

        for day in 1..=5 {
            DeckService::add_progress(
                &db,
                &coach,
                &CreateProgressRequest {
                    deck_id,
                    week_start: NaiveDate::from_ymd_opt(2025, day, 6).unwrap(),
                    summary: format!("Week {}", day),
                    blockers: None,
                    next_actions: Some("Keep going".to_string()),
                },
            )
            .await
            .unwrap();
        }

        let detail = DeckService::get_deck(&db, &student, deck_id).await.unwrap();
        assert_eq!(detail.documents.len(), 1);
        assert_eq!(detail.progress.len(), 4);
        assert_eq!(detail.progress[0].summary, "Week 5");
    }
}
