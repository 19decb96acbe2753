//! Contenu des emails envoyés par l'application (texte brut)

use crate::models::tickets::TicketStatus;

/// Email prêt à être mis dans l'outbox
#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

pub fn password_reset(to: &str, app_base_url: &str, token: &str, ttl_minutes: i64) -> OutgoingEmail {
    let link = format!(
        "{}/reset-password?token={}",
        app_base_url.trim_end_matches('/'),
        token
    );
    OutgoingEmail {
        to: to.to_string(),
        subject: "Reset your CoachDeck password".to_string(),
        body: format!(
            "Click this link to reset your password:\n\n{}\n\nThis link expires in {} minutes.",
            link, ttl_minutes
        ),
    }
}

pub fn student_account(to: &str, app_base_url: &str, temp_password: &str) -> OutgoingEmail {
    OutgoingEmail {
        to: to.to_string(),
        subject: "Your CoachDeck account".to_string(),
        body: format!(
            "Temp password: {}\nSign in at {}/signin",
            temp_password,
            app_base_url.trim_end_matches('/')
        ),
    }
}

pub fn coach_approval_request(to: &str, coach_email: &str, coach_name: &str) -> OutgoingEmail {
    OutgoingEmail {
        to: to.to_string(),
        subject: "New coach awaiting approval".to_string(),
        body: format!(
            "{} <{}> signed up as a coach and is waiting for approval.",
            coach_name, coach_email
        ),
    }
}

pub fn new_ticket(to: &str, title: &str) -> OutgoingEmail {
    OutgoingEmail {
        to: to.to_string(),
        subject: "New ticket".to_string(),
        body: format!("A new ticket was created: {}", title),
    }
}

pub fn ticket_status_changed(to: &str, title: &str, status: TicketStatus) -> OutgoingEmail {
    let status = match status {
        TicketStatus::Open => "OPEN",
        TicketStatus::InProgress => "IN_PROGRESS",
        TicketStatus::Resolved => "RESOLVED",
        TicketStatus::Closed => "CLOSED",
    };
    OutgoingEmail {
        to: to.to_string(),
        subject: format!("Ticket status updated: {}", title),
        body: format!(
            "Hi,\n\nThe status of your ticket \"{}\" is now: {}.\n\nCoachDeck",
            title, status
        ),
    }
}

pub fn ticket_reply(to: &str, title: &str, author_email: &str, body: &str) -> OutgoingEmail {
    OutgoingEmail {
        to: to.to_string(),
        subject: format!("New reply on ticket: {}", title),
        body: format!("{} replied:\n\n{}", author_email, body),
    }
}
