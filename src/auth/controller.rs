//! Module `controller`
//!
//! The authentication controller: holds the session in a USER/PASS sub-loop
//! until a valid credential pair is presented or the attempt budget runs out.
//!
//! Modeled as an explicit two-state machine (`AwaitUser`, `AwaitPass`); the
//! terminal outcomes are the function's return values. The identity check
//! result is carried as a recorded boolean into the password round so the
//! client is never told which of the two checks failed.

use log::{debug, info};
use tokio::io::{AsyncRead, AsyncWrite};

use crate::auth::{validate_password, validate_user};
use crate::config::ServerConfig;
use crate::error::SessionError;
use crate::protocol::commands::{Verb, parse_command};
use crate::protocol::replies::{GIVE_PWORD, LOGIN_ERR, LOGIN_OK};
use crate::protocol::{CommandReader, ReplyWriter};
use crate::session::Session;

const LOG_IN_FIRST: &str = "Please log in with USER and PASS first.";

#[derive(Debug, PartialEq)]
enum LoginState {
    AwaitUser,
    AwaitPass,
}

/// Run the login sub-loop for a newly connected session.
///
/// Returns `Ok(())` once the session is authenticated, with the user, home
/// directory, and working directory recorded on the session. I/O failures
/// propagate immediately and are never counted as login attempts; exhausting
/// the attempt budget returns `SessionError::LoginAttemptsExceeded`.
pub async fn authenticate<R, W>(
    session: &mut Session,
    reader: &mut CommandReader<R>,
    writer: &mut ReplyWriter<W>,
    config: &ServerConfig,
) -> Result<(), SessionError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut state = LoginState::AwaitUser;
    let mut attempts: u32 = 0;
    let mut user_ok = false;
    let mut candidate = String::new();

    loop {
        match state {
            LoginState::AwaitUser => {
                let line = reader.read_line().await?;
                let cmd = parse_command(&line);

                if cmd.verb == Verb::User {
                    user_ok = match validate_user(&cmd.arg, config) {
                        Ok(()) => true,
                        Err(e) => {
                            debug!("USER rejected for {}: {}", session.peer_addr(), e);
                            false
                        }
                    };
                    candidate = cmd.arg;
                    state = LoginState::AwaitPass;
                } else {
                    // Wrong verb for this state; no retry is consumed.
                    writer.send(LOGIN_ERR, LOG_IN_FIRST).await?;
                }
            }

            LoginState::AwaitPass => {
                writer.send(GIVE_PWORD, "Password required for user.").await?;

                let line = reader.read_line().await?;
                let cmd = parse_command(&line);

                if cmd.verb != Verb::Pass {
                    // Wrong verb for this state; back to the identity round
                    // without consuming a retry.
                    writer.send(LOGIN_ERR, LOG_IN_FIRST).await?;
                    state = LoginState::AwaitUser;
                    continue;
                }

                let pass_ok = match validate_password(&candidate, &cmd.arg, config) {
                    Ok(()) => true,
                    Err(e) => {
                        debug!("PASS rejected for {}: {}", session.peer_addr(), e);
                        false
                    }
                };

                if pass_ok && user_ok {
                    writer.send(LOGIN_OK, "LOGIN OK.").await?;
                    session.login(candidate, config);
                    info!(
                        "Client {} logged in as {} (home {})",
                        session.peer_addr(),
                        session.user().unwrap_or(""),
                        session.home_dir()
                    );
                    return Ok(());
                }

                // One failed USER/PASS round. The reply never reveals which
                // of the two checks failed.
                attempts += 1;
                writer.send(LOGIN_ERR, "Incorrect login credentials.").await?;

                if attempts >= config.max_login_attempts {
                    return Err(SessionError::LoginAttemptsExceeded(attempts));
                }

                state = LoginState::AwaitUser;
            }
        }
    }
}
