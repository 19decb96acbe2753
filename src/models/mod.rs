// ============================================================================
// MODELS - MODULE PRINCIPAL
// ============================================================================
//
// Description:
//   Point d'entrée pour tous les modèles de données.
//   Chaque modèle correspond à une table avec SeaORM.
//
// Liste des modules:
//   - health : Health check API
//   - dto : Requêtes (validées) et réponses composées de l'API
//   - users : Utilisateurs (rôle, niveau d'accès, statut d'approbation)
//   - password_reset_tokens : Tokens de reset password (expire 30 min)
//   - decks : Espaces de travail coach <-> étudiant
//   - memberships : Jumelage 1:1 deck <-> étudiant
//   - tickets / ticket_comments : Tickets de support et fil de discussion
//   - documents : Liens partagés dans un deck
//   - progress_entries : Suivi hebdomadaire
//   - coach_payments_config : Canaux activés par coach
//   - coach_bank_accounts / coach_ewallets : Canaux de paiement (max 5 chacun)
//   - payment_plans : Offres tarifées d'un coach
//   - invoices : Factures + preuve de paiement
//   - notification_outbox : Emails en attente d'envoi
//
// Points d'attention:
//   - Tous les modèles utilisent SeaORM (pas de SQL brut)
//   - Les montants sont des entiers en unités mineures (i64)
//   - Les enums sont stockés en VARCHAR (DeriveActiveEnum)
//
// ============================================================================

pub mod health;
pub mod dto;
pub mod users;
pub mod password_reset_tokens;
pub mod decks;
pub mod memberships;
pub mod tickets;
pub mod ticket_comments;
pub mod documents;
pub mod progress_entries;
pub mod coach_payments_config;
pub mod coach_bank_accounts;
pub mod coach_ewallets;
pub mod payment_plans;
pub mod invoices;
pub mod notification_outbox;
