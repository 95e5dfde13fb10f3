//! Module `dispatcher`
//!
//! The main protocol loop: reads one verb/argument pair per iteration,
//! enforces the two-phase rename sub-protocol ahead of the verb table, and
//! routes everything else to its handler. The loop runs until QUIT or a
//! transport failure; protocol violations only produce error replies.

use log::{debug, warn};
use tokio::io::{AsyncRead, AsyncWrite};

use crate::config::ServerConfig;
use crate::error::SessionError;
use crate::protocol::commands::{Verb, parse_command};
use crate::protocol::replies::{ALLO_OK, BAD_COMMAND, NOT_IMPLEMENTED};
use crate::protocol::{CommandReader, ReplyWriter, handlers};
use crate::session::Session;

/// Run the post-login command loop for one session.
pub async fn command_loop<R, W>(
    session: &mut Session,
    reader: &mut CommandReader<R>,
    writer: &mut ReplyWriter<W>,
    config: &ServerConfig,
) -> Result<(), SessionError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    loop {
        // The per-command scope is reset first: anything the previous
        // command needed to keep had to be copied into session state.
        session.command.reset();

        let line = reader.read_line().await?;
        if line.len() > config.max_command_length {
            // Still an intervening command: it breaks an RNFR/RNTO pairing.
            session.clear_rename_pending();
            writer.send(BAD_COMMAND, "Command too long.").await?;
            continue;
        }

        session.command.load(parse_command(&line));
        debug!(
            "Client {} sent [{}] [{}]",
            session.peer_addr(),
            session.command.name(),
            session.command.arg()
        );

        // Rename continuation check, with priority over the verb table.
        if session.command.verb() == Verb::Rnto {
            match session.take_rename_pending() {
                Some(source) => {
                    handlers::handle_rnto(session, writer, config, &source).await?;
                }
                None => handlers::handle_bad_rnto(writer).await?,
            }
            continue;
        }

        // A rename-from is only valid when immediately followed by RNTO;
        // any other command cancels the pairing.
        if session.rename_pending().is_some() {
            session.clear_rename_pending();
            handlers::handle_bad_rnto(writer).await?;
            continue;
        }

        match session.command.verb() {
            // QUIT is the one verb that returns instead of looping.
            Verb::Quit => {
                handlers::handle_quit(writer).await?;
                return Ok(());
            }
            Verb::Pasv => handlers::handle_pasv(session, writer, config).await?,
            Verb::Port => handlers::handle_port(session, writer).await?,
            Verb::Syst => handlers::handle_syst(writer).await?,
            Verb::Abor => handlers::handle_abort(session, writer).await?,
            Verb::Rmd => handlers::handle_rmd(session, writer, config).await?,
            Verb::Mkd => handlers::handle_mkd(session, writer, config).await?,
            Verb::Pwd => handlers::handle_pwd(session, writer).await?,
            Verb::Cwd => handlers::handle_cwd(session, writer, config).await?,
            Verb::Cdup => handlers::handle_cdup(session, writer, config).await?,
            Verb::Rnfr => {
                // The source path is copied into session-durable state; the
                // command scope it came from dies at the next reset.
                if let Some(source) = handlers::handle_rnfr(session, writer, config).await? {
                    session.set_rename_pending(source);
                }
            }
            Verb::Type => handlers::handle_type(session, writer).await?,
            Verb::Retr => handlers::handle_retr(session, writer, config).await?,
            Verb::Stor => handlers::handle_stor(session, writer, config).await?,
            Verb::Dele => handlers::handle_dele(session, writer, config).await?,
            Verb::Stou => handlers::handle_stou(session, writer, config).await?,
            Verb::List => handlers::handle_list(session, writer, config).await?,
            Verb::Feat => handlers::handle_feat(writer).await?,
            Verb::Appe => handlers::handle_appe(session, writer, config).await?,
            Verb::Site => handlers::handle_site(writer).await?,

            // Administrative verbs answered inline; they carry no state.
            // RNTO never reaches the table; the continuation check above
            // consumed it.
            Verb::Rnto => unreachable!("RNTO is handled by the rename continuation check"),

            Verb::Allo => writer.send(ALLO_OK, "ALLO command ignored.").await?,
            Verb::Rein => writer.send(NOT_IMPLEMENTED, "REIN not implemented.").await?,
            Verb::Acct => writer.send(NOT_IMPLEMENTED, "ACCT not implemented.").await?,
            Verb::Smnt => writer.send(NOT_IMPLEMENTED, "SMNT not implemented.").await?,

            // USER/PASS are the auth controller's verbs; after login they
            // have no handler installed, like any unknown verb.
            Verb::User | Verb::Pass | Verb::Unknown => {
                warn!(
                    "No handler installed for command [{}] from {}",
                    session.command.name(),
                    session.peer_addr()
                );
                writer.send(NOT_IMPLEMENTED, "Command not implemented.").await?;
            }
        }
    }
}
