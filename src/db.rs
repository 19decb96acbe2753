// connexion BD + création du schéma depuis les entités

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, Database, DatabaseConnection, DbErr,
    EntityTrait, QueryFilter, Schema, Set,
};

use crate::config::SeedAdmin;
use crate::errors::{AppError, Result};
use crate::models::{
    coach_bank_accounts, coach_ewallets, coach_payments_config, decks, documents, invoices,
    memberships, notification_outbox, password_reset_tokens, payment_plans, progress_entries,
    ticket_comments, tickets, users,
};
use crate::utils::password;

pub async fn establish_connection(database_url: &str) -> std::result::Result<DatabaseConnection, DbErr> {
    Database::connect(database_url).await
}

/// Crée les tables (IF NOT EXISTS) dans l'ordre des clés étrangères
pub async fn create_tables(db: &DatabaseConnection) -> std::result::Result<(), DbErr> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    let statements = vec![
        schema.create_table_from_entity(users::Entity).if_not_exists().to_owned(),
        schema.create_table_from_entity(password_reset_tokens::Entity).if_not_exists().to_owned(),
        schema.create_table_from_entity(decks::Entity).if_not_exists().to_owned(),
        schema.create_table_from_entity(memberships::Entity).if_not_exists().to_owned(),
        schema.create_table_from_entity(tickets::Entity).if_not_exists().to_owned(),
        schema.create_table_from_entity(ticket_comments::Entity).if_not_exists().to_owned(),
        schema.create_table_from_entity(documents::Entity).if_not_exists().to_owned(),
        schema.create_table_from_entity(progress_entries::Entity).if_not_exists().to_owned(),
        schema.create_table_from_entity(coach_payments_config::Entity).if_not_exists().to_owned(),
        schema.create_table_from_entity(coach_bank_accounts::Entity).if_not_exists().to_owned(),
        schema.create_table_from_entity(coach_ewallets::Entity).if_not_exists().to_owned(),
        schema.create_table_from_entity(payment_plans::Entity).if_not_exists().to_owned(),
        schema.create_table_from_entity(invoices::Entity).if_not_exists().to_owned(),
        schema.create_table_from_entity(notification_outbox::Entity).if_not_exists().to_owned(),
    ];

    for statement in statements {
        db.execute(builder.build(&statement)).await?;
    }

    tracing::info!("database schema ensured");
    Ok(())
}

/// Crée (ou remet à niveau) le compte super admin défini dans l'environnement
pub async fn seed_super_admin(db: &DatabaseConnection, seed: &SeedAdmin) -> Result<users::Model> {
    let email = seed.email.trim().to_lowercase();
    let now = Utc::now();

    let existing = users::Entity::find()
        .filter(users::Column::Email.eq(&email))
        .one(db)
        .await?;

    let admin = match existing {
        Some(user) => {
            let mut active: users::ActiveModel = user.into();
            active.role = Set(users::Role::SuperAdmin);
            active.access_level = Set(users::AccessLevel::Admin);
            active.status = Set(users::UserStatus::Active);
            active.updated_at = Set(now);
            active.update(db).await?
        }
        None => {
            let hash = password::hash_password(&seed.password).map_err(AppError::Internal)?;
            users::ActiveModel {
                email: Set(email.clone()),
                name: Set(Some("Super Admin".to_string())),
                password_hash: Set(Some(hash)),
                role: Set(users::Role::SuperAdmin),
                access_level: Set(users::AccessLevel::Admin),
                status: Set(users::UserStatus::Active),
                created_at: Set(now),
                updated_at: Set(now),
                ..Default::default()
            }
            .insert(db)
            .await?
        }
    };

    tracing::info!(email = %admin.email, "super admin seeded");
    Ok(admin)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::setup_test_db;
    use sea_orm::{PaginatorTrait, QuerySelect};

    #[tokio::test]
    async fn test_create_tables_is_idempotent() {
        let db = setup_test_db().await;
        create_tables(&db).await.unwrap();

        let _: Vec<invoices::Model> = invoices::Entity::find().limit(1).all(&db).await.unwrap();
        let _: Vec<notification_outbox::Model> =
            notification_outbox::Entity::find().limit(1).all(&db).await.unwrap();
    }

    #[tokio::test]
    async fn test_seed_super_admin_upserts() {
        let db = setup_test_db().await;
        let seed = SeedAdmin {
            email: "Admin@Example.com".to_string(),
            password: "Admin12345!".to_string(),
        };

        let first = seed_super_admin(&db, &seed).await.unwrap();
        let second = seed_super_admin(&db, &seed).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.email, "admin@example.com");
        assert_eq!(second.role, users::Role::SuperAdmin);
        assert_eq!(second.access_level, users::AccessLevel::Admin);
        assert_eq!(users::Entity::find().count(&db).await.unwrap(), 1);
    }
}
