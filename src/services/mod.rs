pub mod authorization;
pub mod status;
pub mod outbox_service;
pub mod auth_service;
pub mod admin_service;
pub mod deck_service;
pub mod ticket_service;
pub mod payments_service;
pub mod plan_service;
pub mod invoice_service;

pub use admin_service::AdminService;
pub use auth_service::AuthService;
pub use deck_service::DeckService;
pub use invoice_service::InvoiceService;
pub use outbox_service::OutboxService;
pub use payments_service::PaymentsService;
pub use plan_service::PlanService;
pub use ticket_service::TicketService;
