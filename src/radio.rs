//! SMS notifications through the Twilio REST API
//!
//! One form-encoded POST per message, authenticated with HTTP Basic auth.
//! No retries: the next scheduled invocation is the retry.

use crate::error::{Error, Result};
use crate::manifest::TwilioConfig;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use tracing::{debug, info};
use ureq::Agent;

/// Longest slice of a provider error body kept in the error message
const ERROR_BODY_LIMIT: usize = 200;

/// Something that can deliver a text alert to a human
pub trait Notifier {
    fn send(&self, message: &str) -> Result<()>;
}

/// Twilio Programmable Messaging client
pub struct TwilioSms {
    endpoint: String,
    authorization: String,
    from: String,
    to: String,
    agent: Agent,
}

impl TwilioSms {
    pub fn from_config(config: &TwilioConfig) -> Self {
        let agent_config = Agent::config_builder()
            .timeout_global(Some(config.timeout()))
            .http_status_as_error(false)
            .build();

        Self::with_agent(config, Agent::new_with_config(agent_config))
    }

    /// Use a caller-built agent; it must not treat HTTP statuses as errors
    pub fn with_agent(config: &TwilioConfig, agent: Agent) -> Self {
        Self {
            endpoint: messages_endpoint(&config.twilio_api_base, &config.account_sid),
            authorization: basic_auth(&config.account_sid, &config.auth_token),
            from: config.from_number.clone(),
            to: config.to_number.clone(),
            agent,
        }
    }
}

impl Notifier for TwilioSms {
    fn send(&self, message: &str) -> Result<()> {
        debug!(endpoint = %self.endpoint, to = %self.to, "sending SMS");

        let mut response = self
            .agent
            .post(&self.endpoint)
            .header("Authorization", self.authorization.as_str())
            .send_form([
                ("To", self.to.as_str()),
                ("From", self.from.as_str()),
                ("Body", message),
            ])
            .map_err(|e| Error::Notify(format!("request to {} failed: {}", self.endpoint, e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.body_mut().read_to_string().unwrap_or_default();
            return Err(Error::Notify(format!(
                "provider answered {}: {}",
                status.as_u16(),
                truncate(body.trim(), ERROR_BODY_LIMIT)
            )));
        }

        info!(to = %self.to, "SMS sent");
        Ok(())
    }
}

/// Stand-in used by `--dry-run`: logs the message instead of sending it
#[derive(Debug, Clone, Copy, Default)]
pub struct LogOnly;

impl Notifier for LogOnly {
    fn send(&self, message: &str) -> Result<()> {
        info!(%message, "dry run: SMS not sent");
        Ok(())
    }
}

/// `{base}/2010-04-01/Accounts/{sid}/Messages.json`
pub fn messages_endpoint(api_base: &str, account_sid: &str) -> String {
    format!(
        "{}/2010-04-01/Accounts/{}/Messages.json",
        api_base.trim_end_matches('/'),
        account_sid
    )
}

/// `Basic base64(sid:token)`
pub fn basic_auth(account_sid: &str, auth_token: &str) -> String {
    format!(
        "Basic {}",
        STANDARD.encode(format!("{}:{}", account_sid, auth_token))
    )
}

fn truncate(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::sync::mpsc;
    use std::thread;

    fn twilio_config(api_base: &str) -> TwilioConfig {
        TwilioConfig {
            account_sid: "AC123".into(),
            auth_token: "secret".into(),
            from_number: "+15550001111".into(),
            to_number: "+15552223333".into(),
            twilio_api_base: api_base.into(),
            notify_timeout_seconds: 2,
        }
    }

    /// Accept one request, hand its raw text back, answer with `status_line`
    fn fake_twilio(status_line: &'static str) -> (String, mpsc::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let Ok((mut stream, _)) = listener.accept() else {
                return;
            };
            let mut raw = Vec::new();
            let mut buf = [0u8; 2048];
            loop {
                let n = stream.read(&mut buf).unwrap_or(0);
                if n == 0 {
                    break;
                }
                raw.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&raw);
                if let Some(head_end) = text.find("\r\n\r\n") {
                    let length = text[..head_end]
                        .lines()
                        .find_map(|l| {
                            let lower = l.to_ascii_lowercase();
                            lower
                                .strip_prefix("content-length:")
                                .map(|v| v.trim().parse::<usize>().unwrap_or(0))
                        })
                        .unwrap_or(0);
                    if raw.len() >= head_end + 4 + length {
                        break;
                    }
                }
            }
            let _ = tx.send(String::from_utf8_lossy(&raw).into_owned());
            let body = r#"{"message":"rejected"}"#;
            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            );
            let _ = stream.write_all(response.as_bytes());
        });
        (format!("http://{}", addr), rx)
    }

    /// Local fakes must not be routed through an environment proxy
    fn local_sms(base: &str) -> TwilioSms {
        let config = twilio_config(base);
        let agent = Agent::new_with_config(
            Agent::config_builder()
                .timeout_global(Some(config.timeout()))
                .http_status_as_error(false)
                .proxy(None)
                .build(),
        );
        TwilioSms::with_agent(&config, agent)
    }

    #[test]
    fn test_messages_endpoint() {
        assert_eq!(
            messages_endpoint("https://api.twilio.com/", "AC123"),
            "https://api.twilio.com/2010-04-01/Accounts/AC123/Messages.json"
        );
    }

    #[test]
    fn test_basic_auth_header() {
        // base64("AC123:secret")
        assert_eq!(basic_auth("AC123", "secret"), "Basic QUMxMjM6c2VjcmV0");
    }

    #[test]
    fn test_send_posts_form() {
        let (base, rx) = fake_twilio("201 Created");
        let sms = local_sms(&base);

        sms.send("Plex is back UP").unwrap();

        let request = rx.recv().unwrap();
        assert!(request.starts_with("POST /2010-04-01/Accounts/AC123/Messages.json"));
        assert!(request.contains("Basic QUMxMjM6c2VjcmV0"));
        assert!(request.contains("application/x-www-form-urlencoded"));
        assert!(request.contains("To=%2B15552223333"));
        assert!(request.contains("From=%2B15550001111"));
        assert!(request.contains("Body=Plex+is+back+UP") || request.contains("Body=Plex%20is%20back%20UP"));
    }

    #[test]
    fn test_provider_rejection_is_an_error() {
        let (base, _rx) = fake_twilio("401 Unauthorized");
        let sms = local_sms(&base);

        let err = sms.send("hello").unwrap_err();
        assert!(matches!(err, Error::Notify(_)));
        assert!(err.to_string().contains("401"));
        assert!(err.to_string().contains("rejected"));
    }

    #[test]
    fn test_unreachable_provider_is_an_error() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let sms = local_sms(&format!("http://{}", addr));
        assert!(matches!(sms.send("hello"), Err(Error::Notify(_))));
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("héllo", 2), "hé");
        assert_eq!(truncate("short", 50), "short");
    }
}
