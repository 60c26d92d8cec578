//! Email service for sending invitation emails via SMTP.

use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use shopyard_core::{AppError, Config, Role};
use std::sync::Arc;

/// Email service for invitation notifications. Absent when SMTP is not
/// configured; invitation sending then degrades to returning the accept
/// URL in the API response only.
#[derive(Clone)]
pub struct EmailService {
    mailer: Arc<AsyncSmtpTransport<Tokio1Executor>>,
    from: String,
}

impl EmailService {
    /// Create email service from config. Returns `None` if SMTP is not configured.
    pub fn from_config(config: &Config) -> Option<Self> {
        let host = config.smtp_host()?;
        let from = config.smtp_from()?.to_string();
        let port = config.smtp_port().unwrap_or(587);

        let mailer = if config.smtp_tls() {
            let b = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host).ok()?;
            let b = b.port(port);
            let b = if let (Some(u), Some(p)) = (config.smtp_user(), config.smtp_password()) {
                b.credentials(Credentials::new(u.to_string(), p.to_string()))
            } else {
                b
            };
            tracing::info!(
                host = %host,
                port = port,
                "Email service initialized (SMTP with STARTTLS)"
            );
            b.build()
        } else {
            let b = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host).port(port);
            let b = if let (Some(u), Some(p)) = (config.smtp_user(), config.smtp_password()) {
                b.credentials(Credentials::new(u.to_string(), p.to_string()))
            } else {
                b
            };
            tracing::info!(host = %host, port = port, "Email service initialized (SMTP)");
            b.build()
        };

        Some(Self {
            mailer: Arc::new(mailer),
            from,
        })
    }

    /// Send an invitation email. Single attempt; a failure surfaces as a
    /// failed invitation send, never retried here.
    pub async fn send_invitation(
        &self,
        to: &str,
        tenant_name: &str,
        inviter_name: &str,
        role: Role,
        accept_url: &str,
    ) -> Result<(), AppError> {
        let to_addr: Mailbox = to
            .parse()
            .map_err(|_| AppError::Email(format!("Invalid recipient address: {}", to)))?;
        let from_addr: Mailbox = self
            .from
            .parse()
            .map_err(|e| AppError::Email(format!("Invalid SMTP_FROM: {}", e)))?;

        let subject = format!("You're invited to join {}", tenant_name);
        let body = invitation_body_html(tenant_name, inviter_name, role, accept_url);

        let email = Message::builder()
            .from(from_addr)
            .to(to_addr)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(body)
            .map_err(|e| AppError::Email(e.to_string()))?;

        self.mailer
            .send(email)
            .await
            .map_err(|e| AppError::Email(e.to_string()))?;

        tracing::info!(tenant = %tenant_name, "Invitation email sent");
        Ok(())
    }
}

fn invitation_body_html(
    tenant_name: &str,
    inviter_name: &str,
    role: Role,
    accept_url: &str,
) -> String {
    format!(
        r#"<html>
  <body style="font-family: sans-serif; color: #1f2937;">
    <h2>Join {tenant} on Shopyard</h2>
    <p>{inviter} invited you to join <strong>{tenant}</strong> as <strong>{role}</strong>.</p>
    <p>
      <a href="{url}" style="background: #2563eb; color: #ffffff; padding: 10px 18px; border-radius: 6px; text-decoration: none;">
        Accept invitation
      </a>
    </p>
    <p>This invitation expires in 7 days. If you weren't expecting it, you can ignore this email.</p>
  </body>
</html>"#,
        tenant = tenant_name,
        inviter = inviter_name,
        role = role,
        url = accept_url,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invitation_body_contains_link_and_role() {
        let body = invitation_body_html(
            "Paws & Claws",
            "Dana",
            Role::Staff,
            "https://paws.example.com/invitations/accept?token=abc",
        );
        assert!(body.contains("Paws &amp; Claws") || body.contains("Paws & Claws"));
        assert!(body.contains("staff"));
        assert!(body.contains("token=abc"));
    }
}
