//! Session lifecycle management

use super::client::LivyClient;
use super::polling::PollingConfig;
use super::session::{SessionRequest, SessionState};
use crate::error::{Error, Result};
use tracing::{debug, info, warn};

/// Handle to one remote Livy session
///
/// Obtained through [`LivySession::create`] or [`LivySession::start`]. The
/// remote session stays alive until [`close`](LivySession::close) is called;
/// dropping an open handle only logs a warning because the delete request
/// cannot be issued from `Drop`.
#[derive(Debug)]
pub struct LivySession {
    client: LivyClient,
    id: i64,
    polling: PollingConfig,
    closed: bool,
}

impl LivySession {
    /// Submit a session creation request without waiting for readiness
    pub async fn create(
        client: LivyClient,
        request: &SessionRequest,
        polling: PollingConfig,
    ) -> Result<Self> {
        // Fail on a bad schedule before anything is created remotely
        polling.schedule()?;

        let session = client.create_session(request).await?;
        info!(
            "Created Livy session {} '{}' in state {}",
            session.id, request.name, session.state
        );

        Ok(Self {
            client,
            id: session.id,
            polling,
            closed: false,
        })
    }

    /// Create a session and wait until it is ready
    ///
    /// If the session never becomes ready it is closed before the waiting
    /// error is returned.
    pub async fn start(
        client: LivyClient,
        request: &SessionRequest,
        polling: PollingConfig,
    ) -> Result<Self> {
        let mut session = Self::create(client, request, polling).await?;

        match session.wait().await {
            Ok(_) => Ok(session),
            Err(e) => {
                warn!("Livy session {} did not start: {}", session.id, e);
                if let Err(close_err) = session.close().await {
                    warn!("Failed to close Livy session {}: {}", session.id, close_err);
                }
                Err(e)
            }
        }
    }

    /// Remote session identifier
    pub fn id(&self) -> i64 {
        self.id
    }

    /// Whether [`close`](LivySession::close) has completed
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Underlying REST client
    pub fn client(&self) -> &LivyClient {
        &self.client
    }

    /// Polling settings used for sessions and statements
    pub fn polling(&self) -> &PollingConfig {
        &self.polling
    }

    /// Fetch the current state of the session
    pub async fn state(&self) -> Result<SessionState> {
        if self.closed {
            return Err(Error::session_lookup(self.id, "session has been closed"));
        }
        let session = self.client.get_session(self.id).await?;
        Ok(session.state)
    }

    /// Block until the session leaves the startup states
    ///
    /// Returns the first ready state. A session that terminates while
    /// starting fails with [`Error::SessionFailedToStart`]; running out of
    /// schedule fails with [`Error::SessionTimeout`].
    pub async fn wait(&self) -> Result<SessionState> {
        let mut schedule = self.polling.schedule()?;

        loop {
            let state = self.state().await?;
            debug!("Livy session {} is {}", self.id, state);

            if state.is_finished() {
                return Err(Error::SessionFailedToStart {
                    id: self.id,
                    state: state.to_string(),
                });
            }
            if !state.is_not_ready() {
                info!("Livy session {} ready ({})", self.id, state);
                return Ok(state);
            }

            match schedule.next() {
                Some(interval) => tokio::time::sleep(interval).await,
                None => {
                    return Err(Error::SessionTimeout {
                        id: self.id,
                        elapsed: schedule.elapsed(),
                    })
                }
            }
        }
    }

    /// Delete the remote session and release the connection
    ///
    /// Calling this again after success is a no-op. A session the server no
    /// longer knows about counts as already deleted.
    pub async fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }

        match self.client.delete_session(self.id).await {
            Ok(()) => info!("Closed Livy session {}", self.id),
            Err(Error::SessionLookup { .. }) => {
                debug!("Livy session {} was already gone", self.id);
            }
            Err(e) => return Err(e),
        }

        self.closed = true;
        self.client.close();
        Ok(())
    }
}

impl Drop for LivySession {
    fn drop(&mut self) {
        if !self.closed {
            warn!(
                "Livy session {} dropped without close(); it remains on {}",
                self.id,
                self.client.url()
            );
        }
    }
}
