// Contenu des emails envoyés par le service

use super::mailer::OutgoingEmail;
use crate::models::complaints::{self, ComplaintStatus};

pub fn login_otp(to: &str, code: &str, ttl_minutes: i64) -> OutgoingEmail {
    OutgoingEmail {
        to: to.to_string(),
        subject: "Your OTP Code".to_string(),
        text: format!("Your OTP is {}. It expires in {} minutes.", code, ttl_minutes),
        html: Some(format!(
            "<p>Your OTP is <strong>{}</strong>. It expires in {} minutes.</p>",
            code, ttl_minutes
        )),
    }
}

pub fn registration_otp(to: &str, name: &str, code: &str, ttl_minutes: i64) -> OutgoingEmail {
    OutgoingEmail {
        to: to.to_string(),
        subject: "Verify your email".to_string(),
        text: format!(
            "Hello {},\n\nYour verification code is {}. It expires in {} minutes.\n\nSupport Team",
            name, code, ttl_minutes
        ),
        // le nom vient du formulaire : texte seul
        html: None,
    }
}

pub fn reset_password(to: &str, link: &str) -> OutgoingEmail {
    OutgoingEmail {
        to: to.to_string(),
        subject: "Password Reset Request".to_string(),
        text: format!(
            "You requested a password reset.\n\nOpen this link to choose a new password (valid for 1 hour):\n{}\n\nIf you did not request this, ignore this email.",
            link
        ),
        html: Some(format!(
            "<p>You requested a password reset.</p><p><a href=\"{}\">Reset your password</a> (valid for 1 hour).</p><p>If you did not request this, ignore this email.</p>",
            link
        )),
    }
}

/// Notification à l'ingénieur assigné
pub fn complaint_assigned(complaint: &complaints::Model) -> OutgoingEmail {
    OutgoingEmail {
        to: complaint.assigned_to_email.clone(),
        subject: format!("Complaint #{} assigned to you", complaint.complaint_id),
        text: format!(
            "Dear {},\n\nComplaint #{} \"{}\" has been assigned to you.\n\nType: {}\nLocation: {}\nRequester: {} <{}>\n\n{}\n\nBest regards,\nSupport Team",
            complaint.assigned_to,
            complaint.complaint_id,
            complaint.title,
            complaint.complaint_type,
            complaint.location,
            complaint.name,
            complaint.user_email,
            complaint.description
        ),
        html: None,
    }
}

/// Notification au demandeur quand la plainte est résolue ou rejetée
pub fn complaint_closed(complaint: &complaints::Model) -> OutgoingEmail {
    let outcome = match complaint.status {
        ComplaintStatus::Rejected => "rejected",
        _ => "resolved",
    };

    OutgoingEmail {
        to: complaint.user_email.clone(),
        subject: format!("Complaint #{} - {}", complaint.complaint_id, complaint.status),
        text: format!(
            "Dear {},\n\nYour complaint titled \"{}\" (ID: {}) has been {}.\n\nMessage from our engineer:\n\"{}\"\n\nThank you,\nSupport Team",
            complaint.name, complaint.title, complaint.complaint_id, outcome, complaint.engineer_message
        ),
        html: None,
    }
}
