// Tables de transition des statuts (tickets, factures)
//
// Un coach (ou un admin) peut déplacer un ticket ou une facture vers
// n'importe quel statut. Le seul mouvement étudiant est l'envoi d'une preuve,
// qui fait passer la facture en SUBMITTED tant qu'elle n'est pas close.

use crate::errors::{AppError, Result};
use crate::models::invoices::InvoiceStatus;
use crate::models::tickets::TicketStatus;

/// Qui déclenche le changement de statut
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mover {
    Reviewer,
    Student,
}

const ALL_TICKET_STATUSES: &[TicketStatus] = &[
    TicketStatus::Open,
    TicketStatus::InProgress,
    TicketStatus::Resolved,
    TicketStatus::Closed,
];

const ALL_INVOICE_STATUSES: &[InvoiceStatus] = &[
    InvoiceStatus::Pending,
    InvoiceStatus::AwaitingProof,
    InvoiceStatus::Submitted,
    InvoiceStatus::UnderReview,
    InvoiceStatus::Paid,
    InvoiceStatus::Rejected,
    InvoiceStatus::Canceled,
];

fn ticket_targets(mover: Mover, _from: TicketStatus) -> &'static [TicketStatus] {
    match mover {
        Mover::Reviewer => ALL_TICKET_STATUSES,
        Mover::Student => &[],
    }
}

fn invoice_targets(mover: Mover, from: InvoiceStatus) -> &'static [InvoiceStatus] {
    match (mover, from) {
        (Mover::Reviewer, _) => ALL_INVOICE_STATUSES,
        (Mover::Student, InvoiceStatus::Paid | InvoiceStatus::Canceled) => &[],
        (Mover::Student, _) => &[InvoiceStatus::Submitted],
    }
}

pub fn check_ticket_transition(mover: Mover, from: TicketStatus, to: TicketStatus) -> Result<()> {
    if ticket_targets(mover, from).contains(&to) {
        Ok(())
    } else {
        Err(AppError::Forbidden("forbidden"))
    }
}

pub fn check_invoice_transition(mover: Mover, from: InvoiceStatus, to: InvoiceStatus) -> Result<()> {
    if invoice_targets(mover, from).contains(&to) {
        return Ok(());
    }
    match from {
        InvoiceStatus::Paid | InvoiceStatus::Canceled => Err(AppError::Conflict("invoice_closed")),
        _ => Err(AppError::Forbidden("forbidden")),
    }
}
