use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use sea_orm::*;
use tokio::task::JoinHandle;

use crate::email::{Mailer, OutgoingEmail};
use crate::errors::Result;
use crate::models::notification_outbox::{self, OutboxStatus};

/// Nombre max d'emails envoyés par passage du worker
const BATCH_SIZE: u64 = 20;

pub struct OutboxService;

impl OutboxService {
    /// Ajoute un email à l'outbox.
    /// Prend n'importe quelle connexion: appelé avec la transaction de
    /// l'écriture qui déclenche l'email, les deux sont commit ensemble.
    pub async fn enqueue<C: ConnectionTrait>(conn: &C, email: OutgoingEmail) -> Result<()> {
        notification_outbox::ActiveModel {
            recipient: Set(email.to),
            subject: Set(email.subject),
            body: Set(email.body),
            status: Set(OutboxStatus::Pending),
            last_error: Set(None),
            created_at: Set(Utc::now()),
            processed_at: Set(None),
            ..Default::default()
        }
        .insert(conn)
        .await?;

        Ok(())
    }

    /// Envoie les emails en attente (une seule tentative chacun).
    /// Retourne le nombre de lignes traitées.
    pub async fn drain_once(db: &DatabaseConnection, mailer: &Arc<dyn Mailer>) -> Result<usize> {
        let pending = notification_outbox::Entity::find()
            .filter(notification_outbox::Column::Status.eq(OutboxStatus::Pending))
            .order_by_asc(notification_outbox::Column::Id)
            .limit(BATCH_SIZE)
            .all(db)
            .await?;

        let processed = pending.len();

        for row in pending {
            let mailer = Arc::clone(mailer);
            let to = row.recipient.clone();
            let subject = row.subject.clone();
            let body = row.body.clone();

            // Le Mailer est bloquant (SMTP synchrone)
            let outcome = tokio::task::spawn_blocking(move || mailer.send_mail(&to, &subject, &body))
                .await
                .unwrap_or_else(|e| Err(format!("mail task failed: {}", e)));

            let outbox_id = row.id;
            let mut active: notification_outbox::ActiveModel = row.into();
            match outcome {
                Ok(()) => {
                    active.status = Set(OutboxStatus::Sent);
                    active.last_error = Set(None);
                }
                Err(e) => {
                    tracing::warn!(outbox_id, error = %e, "email delivery failed");
                    active.status = Set(OutboxStatus::Failed);
                    active.last_error = Set(Some(e));
                }
            }
            active.processed_at = Set(Some(Utc::now()));
            active.update(db).await?;
        }

        Ok(processed)
    }

    /// Lance le worker en tâche de fond: un passage toutes les `poll` secondes
    pub fn spawn_worker(
        db: DatabaseConnection,
        mailer: Arc<dyn Mailer>,
        poll: Duration,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(poll);
            loop {
                interval.tick().await;
                match Self::drain_once(&db, &mailer).await {
                    Ok(0) => {}
                    Ok(processed) => tracing::debug!(processed, "outbox drained"),
                    Err(e) => tracing::error!(error = %e, "outbox worker pass failed"),
                }
            }
        })
    }
}
