//! Raw outbound submission.

use async_trait::async_trait;
use lettre::address::Envelope;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Address, SmtpTransport, Transport};
use secrecy::ExposeSecret;

use crate::config::SmtpConfig;
use crate::error::TransportError;

/// Submits pre-rendered messages with an explicit envelope.
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send_raw(
        &self,
        source: &str,
        destinations: &[String],
        raw: &[u8],
    ) -> Result<(), TransportError>;
}

/// Build an SMTP envelope from plain address strings.
pub fn build_envelope(source: &str, destinations: &[String]) -> Result<Envelope, TransportError> {
    let from: Address = source
        .parse()
        .map_err(|e| TransportError::Envelope(format!("source {source}: {e}")))?;
    let to = destinations
        .iter()
        .map(|d| {
            d.parse::<Address>()
                .map_err(|e| TransportError::Envelope(format!("destination {d}: {e}")))
        })
        .collect::<Result<Vec<_>, _>>()?;
    Envelope::new(Some(from), to).map_err(|e| TransportError::Envelope(e.to_string()))
}

/// SMTP relay via lettre.
pub struct SmtpRelay {
    transport: SmtpTransport,
}

impl SmtpRelay {
    pub fn new(config: &SmtpConfig) -> Result<Self, TransportError> {
        let mut builder = SmtpTransport::relay(&config.host)
            .map_err(|e| TransportError::Setup(format!("SMTP relay error: {e}")))?
            .port(config.port);

        if !config.username.is_empty() {
            builder = builder.credentials(Credentials::new(
                config.username.clone(),
                config.password.expose_secret().to_string(),
            ));
        }

        Ok(Self {
            transport: builder.build(),
        })
    }
}

#[async_trait]
impl MailTransport for SmtpRelay {
    async fn send_raw(
        &self,
        source: &str,
        destinations: &[String],
        raw: &[u8],
    ) -> Result<(), TransportError> {
        let envelope = build_envelope(source, destinations)?;
        let transport = self.transport.clone();
        let raw = raw.to_vec();

        tokio::task::spawn_blocking(move || transport.send_raw(&envelope, &raw))
            .await
            .map_err(|e| TransportError::Submit(format!("send task panicked: {e}")))?
            .map_err(|e| TransportError::Submit(format!("SMTP send failed: {e}")))?;

        tracing::info!(destinations = ?destinations, "Message submitted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::SecretString;

    #[test]
    fn envelope_from_valid_addresses() {
        let envelope =
            build_envelope("conversion@noreply.example", &["alice@kindle.com".to_string()])
                .unwrap();
        assert_eq!(
            envelope.from().map(|a| a.to_string()),
            Some("conversion@noreply.example".to_string())
        );
        assert_eq!(envelope.to().len(), 1);
    }

    #[test]
    fn envelope_rejects_bad_destination() {
        let err = build_envelope("a@example.com", &["not an address".to_string()]).unwrap_err();
        assert!(matches!(err, TransportError::Envelope(_)));
    }

    #[test]
    fn envelope_requires_a_destination() {
        assert!(build_envelope("a@example.com", &[]).is_err());
    }

    #[test]
    fn relay_builds_without_connecting() {
        let config = SmtpConfig {
            host: "smtp.test.com".into(),
            port: 587,
            username: "user".into(),
            password: SecretString::from("pass".to_string()),
        };
        assert!(SmtpRelay::new(&config).is_ok());
    }
}
