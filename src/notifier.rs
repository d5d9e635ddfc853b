//! New-event notifications.

use async_trait::async_trait;
use chrono::{Local, NaiveDate};
use html_escape::{encode_double_quoted_attribute, encode_text};
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::config::EmailConfig;
use crate::types::Event;

const RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━";

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("No recipient emails configured")]
    NoRecipients,
    #[error("Invalid email address '{address}': {source}")]
    InvalidAddress {
        address: String,
        source: lettre::address::AddressError,
    },
    #[error("Failed to build message: {0}")]
    Message(#[from] lettre::error::Error),
    #[error("SMTP error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, events: &[Event]) -> Result<(), NotifyError>;
}

pub struct EmailNotifier {
    config: EmailConfig,
    page_url: String,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl EmailNotifier {
    pub fn new(config: &EmailConfig, page_url: &str) -> Result<Self, NotifyError> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_server)?
            .port(config.smtp_port)
            .credentials(Credentials::new(
                config.sender_email.clone(),
                config.sender_password.clone(),
            ))
            .build();

        Ok(Self {
            config: config.clone(),
            page_url: page_url.to_string(),
            transport,
        })
    }
}

#[async_trait]
impl Notifier for EmailNotifier {
    async fn notify(&self, events: &[Event]) -> Result<(), NotifyError> {
        let recipients = self.config.recipients();
        let message = build_message(
            &self.config,
            &recipients,
            events,
            &self.page_url,
            Local::now().date_naive(),
        )?;

        self.transport.send(message).await?;

        log::info!(
            "Email notification sent successfully to {} recipient(s): {}",
            recipients.len(),
            recipients.join(", ")
        );
        Ok(())
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, NotifyError> {
    address
        .parse()
        .map_err(|source| NotifyError::InvalidAddress {
            address: address.to_string(),
            source,
        })
}

/// One message addressed to every recipient, with plain-text and HTML parts.
pub fn build_message(
    config: &EmailConfig,
    recipients: &[String],
    events: &[Event],
    page_url: &str,
    today: NaiveDate,
) -> Result<Message, NotifyError> {
    if recipients.is_empty() {
        return Err(NotifyError::NoRecipients);
    }

    let mut builder = Message::builder()
        .from(parse_mailbox(&config.sender_email)?)
        .subject(subject(today));
    for recipient in recipients {
        builder = builder.to(parse_mailbox(recipient)?);
    }

    Ok(builder.multipart(MultiPart::alternative_plain_html(
        text_body(events, page_url),
        html_body(events, page_url),
    ))?)
}

pub fn subject(today: NaiveDate) -> String {
    format!(
        "🔔 New Event(s) on Om Swami Ashram - {}",
        today.format("%Y-%m-%d")
    )
}

pub fn text_body(events: &[Event], page_url: &str) -> String {
    let mut body = String::from("New events have been added to Om Swami Ashram website!\n\n");

    for event in events {
        body.push_str(&format!("{RULE}\n"));
        body.push_str(&format!("Event: {}\n", event.title));
        body.push_str(&format!("Date: {}\n", event.date));
        body.push_str(&format!("Description: {}\n", event.description));
        body.push_str(&format!("Link: {}\n\n", event.url));
    }

    body.push_str(&format!("\nVisit the events page: {page_url}\n"));
    body.push_str(&format!("\n{RULE}\n"));
    body.push_str("This is an automated notification from your Om Swami Events Tracker.\n");
    body
}

pub fn html_body(events: &[Event], page_url: &str) -> String {
    let mut body = String::from(
        r#"<html>
  <body style="font-family: Arial, sans-serif;">
    <h2 style="color: #ff6b35;">🔔 New Events on Om Swami Ashram</h2>
    <p>The following new event(s) have been discovered:</p>
"#,
    );

    for event in events {
        body.push_str(&format!(
            r#"    <div style="margin: 20px 0; padding: 15px; border-left: 4px solid #ff6b35; background-color: #f9f9f9;">
      <h3 style="color: #333; margin-top: 0;">{}</h3>
      <p><strong>📅 Date:</strong> {}</p>
      <p><strong>📝 Description:</strong> {}</p>
      <p><a href="{}" style="color: #ff6b35; text-decoration: none;">View Event Details →</a></p>
    </div>
"#,
            encode_text(&event.title),
            encode_text(&event.date),
            encode_text(&event.description),
            encode_double_quoted_attribute(&event.url),
        ));
    }

    body.push_str(&format!(
        r#"    <p style="margin-top: 30px;">
      <a href="{}" style="display: inline-block; padding: 10px 20px; background-color: #ff6b35; color: white; text-decoration: none; border-radius: 5px;">Visit Events Page</a>
    </p>
    <p style="color: #999; font-size: 11px; margin-top: 20px; text-align: center;">
      This is an automated notification from your Om Swami Events Tracker.
    </p>
  </body>
</html>
"#,
        encode_double_quoted_attribute(page_url)
    ));
    body
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = "https://omswami.org/events";

    fn email_config() -> EmailConfig {
        EmailConfig {
            smtp_server: "smtp.example.org".to_string(),
            smtp_port: 587,
            sender_email: "tracker@example.org".to_string(),
            sender_password: "secret".to_string(),
            recipient_emails: Vec::new(),
            recipient_email: None,
        }
    }

    fn events() -> Vec<Event> {
        vec![
            Event::new(
                "Meditation Retreat".to_string(),
                "3 - 5 April 2026".to_string(),
                "Silent retreat <limited seats> & more".to_string(),
                PAGE.to_string(),
            ),
            Event::new(
                "Satsang".to_string(),
                "Every Sunday".to_string(),
                "No description available".to_string(),
                PAGE.to_string(),
            ),
        ]
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 14).unwrap()
    }

    #[test]
    fn test_subject_carries_date() {
        assert_eq!(
            subject(today()),
            "🔔 New Event(s) on Om Swami Ashram - 2026-03-14"
        );
    }

    #[test]
    fn test_text_body_lists_every_event() {
        let body = text_body(&events(), PAGE);

        assert!(body.contains("Event: Meditation Retreat\n"));
        assert!(body.contains("Date: 3 - 5 April 2026\n"));
        assert!(body.contains("Event: Satsang\n"));
        assert!(body.contains(&format!("Visit the events page: {PAGE}")));
        assert_eq!(body.matches(RULE).count(), 3);
    }

    #[test]
    fn test_html_body_escapes_event_text() {
        let body = html_body(&events(), PAGE);

        assert!(body.contains("Silent retreat &lt;limited seats&gt; &amp; more"));
        assert!(!body.contains("<limited seats>"));
        assert_eq!(body.matches("View Event Details").count(), 2);
    }

    #[test]
    fn test_html_body_escapes_link_attributes() {
        let mut event = events().remove(0);
        event.url = r#"https://omswami.org/events?a=1&b="x""#.to_string();

        let body = html_body(&[event], r#"https://omswami.org/"events""#);

        assert!(body.contains(r#"href="https://omswami.org/events?a=1&amp;b=&quot;x&quot;""#));
        assert!(body.contains(r#"href="https://omswami.org/&quot;events&quot;""#));
    }

    #[test]
    fn test_build_message_requires_recipients() {
        let result = build_message(&email_config(), &[], &events(), PAGE, today());

        assert!(matches!(result, Err(NotifyError::NoRecipients)));
    }

    #[test]
    fn test_build_message_rejects_bad_address() {
        let recipients = vec!["not an address".to_string()];

        let result = build_message(&email_config(), &recipients, &events(), PAGE, today());

        assert!(matches!(result, Err(NotifyError::InvalidAddress { .. })));
    }

    #[test]
    fn test_build_message_addresses_all_recipients() {
        let mut config = email_config();
        config.recipient_email = Some("legacy@example.org".to_string());
        let recipients = config.recipients();

        let message = build_message(&config, &recipients, &events(), PAGE, today())
            .expect("message should build");
        let raw = String::from_utf8(message.formatted()).unwrap();

        assert!(raw.contains("legacy@example.org"));
        assert!(raw.contains("tracker@example.org"));
        assert!(raw.contains("multipart/alternative"));
    }
}
