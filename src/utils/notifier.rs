use std::io;

use async_trait::async_trait;
use tracing::{debug, info};

/// Delivers password reset tokens to the account owner. The token never
/// appears in an HTTP response.
#[async_trait]
pub trait ResetNotifier: Send + Sync {
    async fn send_reset(&self, email: &str, token: &str, expires_in: usize) -> io::Result<()>;
}

/// Development notifier: writes the token to the log instead of mailing it.
pub struct LogResetNotifier;

#[async_trait]
impl ResetNotifier for LogResetNotifier {
    async fn send_reset(&self, email: &str, token: &str, expires_in: usize) -> io::Result<()> {
        info!(email, expires_in, "Password reset requested");
        debug!(email, token, "Reset token");
        Ok(())
    }
}

#[cfg(test)]
pub struct CapturingResetNotifier {
    sent: std::sync::Mutex<Vec<(String, String)>>,
}

#[cfg(test)]
impl CapturingResetNotifier {
    pub fn new() -> Self {
        Self {
            sent: std::sync::Mutex::new(Vec::new()),
        }
    }

    pub fn last_token_for(&self, email: &str) -> Option<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(to, _)| to == email)
            .map(|(_, token)| token.clone())
    }

    pub fn count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[cfg(test)]
#[async_trait]
impl ResetNotifier for CapturingResetNotifier {
    async fn send_reset(&self, email: &str, token: &str, _expires_in: usize) -> io::Result<()> {
        self.sent
            .lock()
            .unwrap()
            .push((email.to_string(), token.to_string()));
        Ok(())
    }
}
