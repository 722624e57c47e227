//! Handoff of the login code between the auth flow and the UI.
//!
//! The auth flow awaits [`CodePrompt::request_code`], the UI receives a
//! [`CodeRequest`] from the channel and answers it with the code typed by
//! the user.

use crate::prelude::*;
use crate::{err, Result};
use std::fmt;
use tokio::sync::{mpsc, oneshot};

#[derive(Debug, thiserror::Error)]
pub enum AuthCodeError {
    #[error("Nobody receives auth code requests anymore")]
    ReceiverClosed,

    #[error("Auth code request was dropped without an answer")]
    Unanswered,

    #[error("Auth code is empty")]
    EmptyCode,
}

/// Creates a bounded channel of code requests
pub fn channel(capacity: usize) -> (CodePrompt, mpsc::Receiver<CodeRequest>) {
    let (send, recv) = mpsc::channel(capacity.max(1));
    (CodePrompt { requests: send }, recv)
}

#[derive(Clone)]
pub struct CodePrompt {
    requests: mpsc::Sender<CodeRequest>,
}

impl CodePrompt {
    /// Waits until the UI answers with the code sent to the phone
    #[instrument(skip_all)]
    pub async fn request_code(&self, phone: &str) -> Result<String> {
        let (send, recv) = oneshot::channel();

        let request = CodeRequest {
            phone: phone.to_owned(),
            return_slot: send,
        };

        self.requests
            .send(request)
            .await
            .map_err(|_| err!(AuthCodeError::ReceiverClosed))?;

        debug!("Waiting for the auth code");

        let code = recv.await.map_err(|_| err!(AuthCodeError::Unanswered))?;
        let code = code.trim();

        if code.is_empty() {
            return Err(err!(AuthCodeError::EmptyCode));
        }

        Ok(code.to_owned())
    }
}

pub struct CodeRequest {
    phone: String,
    return_slot: oneshot::Sender<String>,
}

impl fmt::Debug for CodeRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CodeRequest")
            .field("return_slot", &std::any::type_name::<oneshot::Sender<String>>())
            .finish_non_exhaustive()
    }
}

impl CodeRequest {
    /// Phone number the code was sent to
    pub fn phone(&self) -> &str {
        &self.phone
    }

    /// Returns `false` if the auth flow doesn't wait for the code anymore
    pub fn respond(self, code: impl Into<String>) -> bool {
        self.return_slot.send(code.into()).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use assert_matches::assert_matches;

    #[test_log::test(tokio::test)]
    async fn code_is_delivered() {
        let (prompt, mut requests) = channel(1);

        let ui = tokio::spawn(async move {
            let request = requests.recv().await.unwrap();
            assert_eq!(request.phone(), "+10000000000");
            assert!(request.respond(" 12345\n"));
        });

        let code = prompt.request_code("+10000000000").await.unwrap();

        assert_eq!(code, "12345");
        ui.await.unwrap();
    }

    #[test_log::test(tokio::test)]
    async fn closed_ui_is_an_error() {
        let (prompt, requests) = channel(1);
        drop(requests);

        let err = prompt.request_code("+1").await.unwrap_err();

        assert_matches!(
            err.kind(),
            ErrorKind::AuthCode {
                source: AuthCodeError::ReceiverClosed
            }
        );
    }

    #[test_log::test(tokio::test)]
    async fn dropped_request_is_an_error() {
        let (prompt, mut requests) = channel(1);

        tokio::spawn(async move {
            drop(requests.recv().await);
        });

        let err = prompt.request_code("+1").await.unwrap_err();

        assert_matches!(
            err.kind(),
            ErrorKind::AuthCode {
                source: AuthCodeError::Unanswered
            }
        );
    }

    #[test_log::test(tokio::test)]
    async fn blank_code_is_rejected() {
        let (prompt, mut requests) = channel(1);

        tokio::spawn(async move {
            requests.recv().await.unwrap().respond("   ");
        });

        let err = prompt.request_code("+1").await.unwrap_err();

        assert_matches!(
            err.kind(),
            ErrorKind::AuthCode {
                source: AuthCodeError::EmptyCode
            }
        );
    }

    #[test_log::test(tokio::test)]
    async fn late_answer_is_reported() {
        let (prompt, mut requests) = channel(1);

        let request = tokio::spawn(async move { prompt.request_code("+1").await });
        let code_request = requests.recv().await.unwrap();

        request.abort();
        let _ = request.await;

        assert!(!code_request.respond("12345"));
    }
}
