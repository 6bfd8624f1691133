//! Outbound email over SMTP.

use crate::config::SmtpConfig;
use crate::errors::{DispatchError, Result};
use lettre::message::header::ContentType;
use lettre::message::{Attachment, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::info;
use uuid::Uuid;

pub struct Mailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
}

impl Mailer {
    pub fn new(config: &SmtpConfig) -> Result<Self> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .map_err(|e| DispatchError::Internal(format!("smtp transport init failed: {e}")))?
            .port(config.port)
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
            .build();

        Ok(Self {
            transport,
            from_address: config.from_address.clone(),
        })
    }

    /// Send a completed-ride receipt with the rendered PDF attached.
    pub async fn send_receipt(&self, to: &str, ride_id: Uuid, pdf: Vec<u8>) -> Result<()> {
        let attachment = Attachment::new(format!("receipt-{ride_id}.pdf")).body(
            pdf,
            ContentType::parse("application/pdf")
                .map_err(|e| DispatchError::Internal(format!("bad content type: {e}")))?,
        );

        let body = SinglePart::plain(format!(
            "Thanks for riding with us. Your receipt for ride {ride_id} is attached."
        ));

        let message = Message::builder()
            .from(self.from_address.parse().map_err(|e| {
                DispatchError::Internal(format!("invalid from address: {e}"))
            })?)
            .to(to
                .parse()
                .map_err(|e| DispatchError::Internal(format!("invalid recipient: {e}")))?)
            .subject("Your ride receipt")
            .multipart(MultiPart::mixed().singlepart(body).singlepart(attachment))
            .map_err(|e| DispatchError::Internal(format!("message build failed: {e}")))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| DispatchError::Internal(format!("smtp send failed: {e}")))?;

        info!(%ride_id, recipient = to, "receipt email sent");
        Ok(())
    }
}
