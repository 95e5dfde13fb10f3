//! Command handlers for the Crux FTP server.
//!
//! One handler per verb in the dispatch table. Each handler takes the
//! session and the reply writer, performs its own replies, and returns
//! `Result<(), SessionError>` where `Err` means a transport failure: a
//! command that merely failed (bad path, missing file, no data channel) is a
//! successful dispatch of an unsuccessful command and replies with an error
//! code instead.
//!
//! Handlers never touch the pending-rename marker; RNFR reports its result
//! through its return value and the dispatcher records it.

use log::{debug, error, info};

use tokio::io::AsyncWrite;
use tokio::net::TcpStream;

use crate::config::ServerConfig;
use crate::error::SessionError;
use crate::protocol::ReplyWriter;
use crate::protocol::replies::{
    ACTION_NOT_TAKEN, BAD_ARGS, BAD_PARAMETER, BAD_SEQUENCE, CANT_OPEN_DATA, DATA_OPEN,
    FEAT_END, FILE_ACTION_OK, GOODBYE, OK, PASV_OK, PATH_CREATED, RNFR_OK, SITE_OK,
    SYST_OK, TRANSFER_ABORTED, TRANSFER_OK,
};
use crate::session::Session;
use crate::storage;
use crate::storage::validation::{resolve_path, virtual_to_real};
use crate::transfer;
use crate::transfer::{DataChannel, TransferType};

const SYNTAX_ERROR: &str = "Syntax error in parameters or arguments.";

/// Handles the QUIT command: the single verb that ends the dispatch loop.
pub async fn handle_quit<W: AsyncWrite + Unpin>(
    writer: &mut ReplyWriter<W>,
) -> Result<(), SessionError> {
    writer.send(GOODBYE, "Goodbye.").await
}

/// Handles the SYST command.
pub async fn handle_syst<W: AsyncWrite + Unpin>(
    writer: &mut ReplyWriter<W>,
) -> Result<(), SessionError> {
    writer.send(SYST_OK, "UNIX Type: L8").await
}

/// Handles the FEAT command: no extended features are advertised.
pub async fn handle_feat<W: AsyncWrite + Unpin>(
    writer: &mut ReplyWriter<W>,
) -> Result<(), SessionError> {
    writer.send(FEAT_END, "End.").await
}

/// Handles the SITE command.
pub async fn handle_site<W: AsyncWrite + Unpin>(
    writer: &mut ReplyWriter<W>,
) -> Result<(), SessionError> {
    writer.send(SITE_OK, "SITE commands not supported.").await
}

/// Handles the TYPE command: selects ASCII or Image representation.
pub async fn handle_type<W: AsyncWrite + Unpin>(
    session: &mut Session,
    writer: &mut ReplyWriter<W>,
) -> Result<(), SessionError> {
    match TransferType::from_arg(session.command.arg()) {
        Some(transfer_type) => {
            session.set_transfer_type(transfer_type);
            let message = format!("Type set to {}.", transfer_type.code());
            writer.send(OK, &message).await
        }
        None => {
            writer
                .send(BAD_PARAMETER, "Command not implemented for that parameter.")
                .await
        }
    }
}

/// Handles the ABOR command: drops any configured data channel.
pub async fn handle_abort<W: AsyncWrite + Unpin>(
    session: &mut Session,
    writer: &mut ReplyWriter<W>,
) -> Result<(), SessionError> {
    session.clear_data_channel();
    writer.send(TRANSFER_OK, "ABOR command successful.").await
}

/// Handles the PWD command.
pub async fn handle_pwd<W: AsyncWrite + Unpin>(
    session: &Session,
    writer: &mut ReplyWriter<W>,
) -> Result<(), SessionError> {
    let message = format!("\"{}\" is the current directory.", session.cwd());
    writer.send(PATH_CREATED, &message).await
}

/// Handles the CWD command: validates the target against the real filesystem
/// before committing the new working directory.
pub async fn handle_cwd<W: AsyncWrite + Unpin>(
    session: &mut Session,
    writer: &mut ReplyWriter<W>,
    config: &ServerConfig,
) -> Result<(), SessionError> {
    let target = session.command.arg().to_string();
    change_directory(session, writer, config, target).await
}

/// Handles the CDUP command as a CWD to the parent directory.
pub async fn handle_cdup<W: AsyncWrite + Unpin>(
    session: &mut Session,
    writer: &mut ReplyWriter<W>,
    config: &ServerConfig,
) -> Result<(), SessionError> {
    change_directory(session, writer, config, "..".to_string()).await
}

async fn change_directory<W: AsyncWrite + Unpin>(
    session: &mut Session,
    writer: &mut ReplyWriter<W>,
    config: &ServerConfig,
    target: String,
) -> Result<(), SessionError> {
    if target.is_empty() {
        return writer.send(BAD_ARGS, SYNTAX_ERROR).await;
    }

    let (virtual_path, real_path) =
        match resolve_path(&config.server_root_path(), session.cwd(), &target) {
            Ok(resolved) => resolved,
            Err(e) => {
                debug!("CWD rejected for {}: {}", session.peer_addr(), e);
                return writer.send(ACTION_NOT_TAKEN, "Failed to change directory.").await;
            }
        };

    if !real_path.is_dir() {
        return writer.send(ACTION_NOT_TAKEN, "Failed to change directory.").await;
    }

    session.set_cwd(virtual_path);
    writer.send(FILE_ACTION_OK, "Directory successfully changed.").await
}

/// Handles the MKD command.
pub async fn handle_mkd<W: AsyncWrite + Unpin>(
    session: &mut Session,
    writer: &mut ReplyWriter<W>,
    config: &ServerConfig,
) -> Result<(), SessionError> {
    let arg = session.command.arg();
    if arg.is_empty() {
        return writer.send(BAD_ARGS, SYNTAX_ERROR).await;
    }

    match resolve_path(&config.server_root_path(), session.cwd(), arg)
        .and_then(|(virtual_path, real_path)| {
            storage::create_directory(&real_path)?;
            Ok(virtual_path)
        }) {
        Ok(virtual_path) => {
            let message = format!("\"{}\" created.", virtual_path);
            writer.send(PATH_CREATED, &message).await
        }
        Err(e) => {
            debug!("MKD failed for {}: {}", session.peer_addr(), e);
            writer.send(ACTION_NOT_TAKEN, "Failed to create directory.").await
        }
    }
}

/// Handles the RMD command.
pub async fn handle_rmd<W: AsyncWrite + Unpin>(
    session: &mut Session,
    writer: &mut ReplyWriter<W>,
    config: &ServerConfig,
) -> Result<(), SessionError> {
    let arg = session.command.arg();
    if arg.is_empty() {
        return writer.send(BAD_ARGS, SYNTAX_ERROR).await;
    }

    match resolve_path(&config.server_root_path(), session.cwd(), arg)
        .and_then(|(_, real_path)| storage::remove_directory(&real_path))
    {
        Ok(()) => writer.send(FILE_ACTION_OK, "Directory removed.").await,
        Err(e) => {
            debug!("RMD failed for {}: {}", session.peer_addr(), e);
            writer.send(ACTION_NOT_TAKEN, "Failed to remove directory.").await
        }
    }
}

/// Handles the DELE command.
pub async fn handle_dele<W: AsyncWrite + Unpin>(
    session: &mut Session,
    writer: &mut ReplyWriter<W>,
    config: &ServerConfig,
) -> Result<(), SessionError> {
    let arg = session.command.arg();
    if arg.is_empty() {
        return writer.send(BAD_ARGS, SYNTAX_ERROR).await;
    }

    match resolve_path(&config.server_root_path(), session.cwd(), arg)
        .and_then(|(_, real_path)| storage::delete_file(&real_path))
    {
        Ok(()) => writer.send(FILE_ACTION_OK, "File deleted.").await,
        Err(e) => {
            debug!("DELE failed for {}: {}", session.peer_addr(), e);
            writer.send(ACTION_NOT_TAKEN, "Failed to delete file.").await
        }
    }
}

/// Handles the RNFR command: validates the rename source and hands the
/// resolved virtual path back for the dispatcher to hold until RNTO.
///
/// Returns `Ok(None)` when the command failed (a reply has been sent); the
/// dispatcher sets the pending-rename marker only on `Ok(Some(_))`.
pub async fn handle_rnfr<W: AsyncWrite + Unpin>(
    session: &mut Session,
    writer: &mut ReplyWriter<W>,
    config: &ServerConfig,
) -> Result<Option<String>, SessionError> {
    let arg = session.command.arg();
    if arg.is_empty() {
        writer.send(BAD_ARGS, SYNTAX_ERROR).await?;
        return Ok(None);
    }

    let (virtual_path, real_path) =
        match resolve_path(&config.server_root_path(), session.cwd(), arg) {
            Ok(resolved) => resolved,
            Err(e) => {
                debug!("RNFR rejected for {}: {}", session.peer_addr(), e);
                writer.send(ACTION_NOT_TAKEN, "RNFR failed.").await?;
                return Ok(None);
            }
        };

    if !real_path.exists() {
        writer.send(ACTION_NOT_TAKEN, "File or directory not found.").await?;
        return Ok(None);
    }

    writer.send(RNFR_OK, "Ready for RNTO.").await?;
    Ok(Some(virtual_path))
}

/// Completes a rename: called by the dispatcher with the source path held
/// since the RNFR command.
pub async fn handle_rnto<W: AsyncWrite + Unpin>(
    session: &mut Session,
    writer: &mut ReplyWriter<W>,
    config: &ServerConfig,
    source: &str,
) -> Result<(), SessionError> {
    let arg = session.command.arg();
    if arg.is_empty() {
        return writer.send(BAD_ARGS, SYNTAX_ERROR).await;
    }

    let root = config.server_root_path();
    let source_real = virtual_to_real(&root, source);

    match resolve_path(&root, session.cwd(), arg)
        .and_then(|(_, destination)| storage::rename_entry(&source_real, &destination))
    {
        Ok(()) => {
            info!("Client {} renamed {} to {}", session.peer_addr(), source, arg);
            writer.send(FILE_ACTION_OK, "Rename successful.").await
        }
        Err(e) => {
            debug!("RNTO failed for {}: {}", session.peer_addr(), e);
            writer.send(ACTION_NOT_TAKEN, "Rename failed.").await
        }
    }
}

/// Handles an RNTO with no pending rename, and any command that broke an
/// RNFR/RNTO pair.
pub async fn handle_bad_rnto<W: AsyncWrite + Unpin>(
    writer: &mut ReplyWriter<W>,
) -> Result<(), SessionError> {
    writer.send(BAD_SEQUENCE, "Bad sequence of commands.").await
}

/// Handles the PASV command: binds a data listener owned by this session.
pub async fn handle_pasv<W: AsyncWrite + Unpin>(
    session: &mut Session,
    writer: &mut ReplyWriter<W>,
    config: &ServerConfig,
) -> Result<(), SessionError> {
    let (channel, addr) = match transfer::setup_passive(config).await {
        Ok(result) => result,
        Err(e) => {
            error!("PASV setup failed for {}: {}", session.peer_addr(), e);
            return writer.send(CANT_OPEN_DATA, "Can't open data connection.").await;
        }
    };

    let std::net::IpAddr::V4(ip) = addr.ip() else {
        return writer.send(CANT_OPEN_DATA, "Can't open data connection.").await;
    };

    session.set_data_channel(channel);

    let octets = ip.octets();
    let message = format!(
        "Entering Passive Mode ({},{},{},{},{},{}).",
        octets[0],
        octets[1],
        octets[2],
        octets[3],
        addr.port() >> 8,
        addr.port() & 0xff
    );
    writer.send(PASV_OK, &message).await
}

/// Handles the PORT command: records the client's data target.
pub async fn handle_port<W: AsyncWrite + Unpin>(
    session: &mut Session,
    writer: &mut ReplyWriter<W>,
) -> Result<(), SessionError> {
    match transfer::setup_active(session.peer_addr().ip(), session.command.arg()) {
        Ok(channel) => {
            session.set_data_channel(channel);
            writer.send(OK, "PORT command successful.").await
        }
        Err(e) => {
            debug!("PORT rejected for {}: {}", session.peer_addr(), e);
            writer.send(BAD_ARGS, "Invalid PORT command.").await
        }
    }
}

/// Takes the session's data channel and opens the per-transfer stream.
///
/// Sends the appropriate error reply and returns `Ok(None)` when the channel
/// is missing or cannot be opened; the 150 mark must already be on the wire.
async fn open_transfer_stream<W: AsyncWrite + Unpin>(
    session: &mut Session,
    writer: &mut ReplyWriter<W>,
    config: &ServerConfig,
    channel: DataChannel,
) -> Result<Option<TcpStream>, SessionError> {
    match transfer::open_data_stream(channel, session.peer_addr().ip(), config.data_timeout()).await
    {
        Ok(stream) => Ok(Some(stream)),
        Err(e) => {
            error!(
                "Failed to open data stream for {}: {}",
                session.peer_addr(),
                e
            );
            writer.send(CANT_OPEN_DATA, "Can't open data connection.").await?;
            Ok(None)
        }
    }
}

/// Handles the RETR command: streams a file to the client.
pub async fn handle_retr<W: AsyncWrite + Unpin>(
    session: &mut Session,
    writer: &mut ReplyWriter<W>,
    config: &ServerConfig,
) -> Result<(), SessionError> {
    let arg = session.command.arg();
    if arg.is_empty() {
        return writer.send(BAD_ARGS, SYNTAX_ERROR).await;
    }

    let real_path = match resolve_path(&config.server_root_path(), session.cwd(), arg) {
        Ok((_, real_path)) if real_path.is_file() => real_path,
        Ok(_) | Err(_) => {
            return writer.send(ACTION_NOT_TAKEN, "Failed to open file.").await;
        }
    };

    let Some(channel) = session.take_data_channel() else {
        return writer.send(CANT_OPEN_DATA, "Use PORT or PASV first.").await;
    };

    writer.send(DATA_OPEN, "Opening data connection.").await?;
    let Some(mut stream) = open_transfer_stream(session, writer, config, channel).await? else {
        return Ok(());
    };

    match transfer::send_file(&mut stream, &real_path).await {
        Ok(_) => writer.send(TRANSFER_OK, "Transfer complete.").await,
        Err(e) => {
            error!("RETR failed for {}: {}", session.peer_addr(), e);
            writer
                .send(TRANSFER_ABORTED, "Connection closed; transfer aborted.")
                .await
        }
    }
}

/// Handles the STOR command: receives a file from the client through a
/// temporary file and an atomic rename.
pub async fn handle_stor<W: AsyncWrite + Unpin>(
    session: &mut Session,
    writer: &mut ReplyWriter<W>,
    config: &ServerConfig,
) -> Result<(), SessionError> {
    let arg = session.command.arg();
    if arg.is_empty() {
        return writer.send(BAD_ARGS, SYNTAX_ERROR).await;
    }

    let real_path = match resolve_path(&config.server_root_path(), session.cwd(), arg) {
        Ok((_, real_path)) => real_path,
        Err(e) => {
            debug!("STOR rejected for {}: {}", session.peer_addr(), e);
            return writer.send(ACTION_NOT_TAKEN, "Invalid file path.").await;
        }
    };

    if !real_path.parent().map(|p| p.is_dir()).unwrap_or(false) {
        return writer.send(ACTION_NOT_TAKEN, "Directory not found.").await;
    }

    if real_path.exists() {
        return writer.send(ACTION_NOT_TAKEN, "File already exists.").await;
    }

    receive_into(session, writer, config, real_path).await
}

/// Handles the STOU command: like STOR, with a server-chosen unique name.
pub async fn handle_stou<W: AsyncWrite + Unpin>(
    session: &mut Session,
    writer: &mut ReplyWriter<W>,
    config: &ServerConfig,
) -> Result<(), SessionError> {
    let base = if session.command.arg().is_empty() {
        "upload"
    } else {
        session.command.arg()
    };

    let real_path = match resolve_path(&config.server_root_path(), session.cwd(), base)
        .and_then(|(_, real_path)| storage::unique_name(&real_path))
    {
        Ok(real_path) => real_path,
        Err(e) => {
            debug!("STOU rejected for {}: {}", session.peer_addr(), e);
            return writer.send(ACTION_NOT_TAKEN, "Invalid file path.").await;
        }
    };

    if !real_path.parent().map(|p| p.is_dir()).unwrap_or(false) {
        return writer.send(ACTION_NOT_TAKEN, "Directory not found.").await;
    }

    receive_into(session, writer, config, real_path).await
}

/// Shared upload tail for STOR and STOU: 150 mark, open stream, receive.
async fn receive_into<W: AsyncWrite + Unpin>(
    session: &mut Session,
    writer: &mut ReplyWriter<W>,
    config: &ServerConfig,
    real_path: std::path::PathBuf,
) -> Result<(), SessionError> {
    let Some(channel) = session.take_data_channel() else {
        return writer.send(CANT_OPEN_DATA, "Use PORT or PASV first.").await;
    };

    let file_name = real_path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let mark = format!("FILE: {}", file_name);
    writer.send(DATA_OPEN, &mark).await?;

    let Some(mut stream) = open_transfer_stream(session, writer, config, channel).await? else {
        return Ok(());
    };

    let temp_path = real_path.with_file_name(format!("{}.tmp", file_name));
    match transfer::receive_file(&mut stream, &real_path, &temp_path).await {
        Ok(_) => writer.send(TRANSFER_OK, "Transfer complete.").await,
        Err(e) => {
            error!("Upload failed for {}: {}", session.peer_addr(), e);
            writer
                .send(TRANSFER_ABORTED, "Connection closed; transfer aborted.")
                .await
        }
    }
}

/// Handles the APPE command: appends received data to a file.
pub async fn handle_appe<W: AsyncWrite + Unpin>(
    session: &mut Session,
    writer: &mut ReplyWriter<W>,
    config: &ServerConfig,
) -> Result<(), SessionError> {
    let arg = session.command.arg();
    if arg.is_empty() {
        return writer.send(BAD_ARGS, SYNTAX_ERROR).await;
    }

    let real_path = match resolve_path(&config.server_root_path(), session.cwd(), arg) {
        Ok((_, real_path)) => real_path,
        Err(e) => {
            debug!("APPE rejected for {}: {}", session.peer_addr(), e);
            return writer.send(ACTION_NOT_TAKEN, "Invalid file path.").await;
        }
    };

    if !real_path.parent().map(|p| p.is_dir()).unwrap_or(false) {
        return writer.send(ACTION_NOT_TAKEN, "Directory not found.").await;
    }

    let Some(channel) = session.take_data_channel() else {
        return writer.send(CANT_OPEN_DATA, "Use PORT or PASV first.").await;
    };

    writer.send(DATA_OPEN, "Opening data connection.").await?;
    let Some(mut stream) = open_transfer_stream(session, writer, config, channel).await? else {
        return Ok(());
    };

    match transfer::append_file(&mut stream, &real_path).await {
        Ok(_) => writer.send(TRANSFER_OK, "Transfer complete.").await,
        Err(e) => {
            error!("APPE failed for {}: {}", session.peer_addr(), e);
            writer
                .send(TRANSFER_ABORTED, "Connection closed; transfer aborted.")
                .await
        }
    }
}

/// Handles the LIST command: sends a directory listing over the data channel.
pub async fn handle_list<W: AsyncWrite + Unpin>(
    session: &mut Session,
    writer: &mut ReplyWriter<W>,
    config: &ServerConfig,
) -> Result<(), SessionError> {
    let target = if session.command.arg().is_empty() {
        session.cwd().to_string()
    } else {
        session.command.arg().to_string()
    };

    let entries = match resolve_path(&config.server_root_path(), session.cwd(), &target)
        .and_then(|(_, real_path)| storage::list_directory(&real_path))
    {
        Ok(entries) => entries,
        Err(e) => {
            debug!("LIST failed for {}: {}", session.peer_addr(), e);
            return writer.send(ACTION_NOT_TAKEN, "Failed to list directory.").await;
        }
    };

    let Some(channel) = session.take_data_channel() else {
        return writer.send(CANT_OPEN_DATA, "Use PORT or PASV first.").await;
    };

    writer
        .send(DATA_OPEN, "Here comes the directory listing.")
        .await?;
    let Some(mut stream) = open_transfer_stream(session, writer, config, channel).await? else {
        return Ok(());
    };

    match transfer::send_listing(&mut stream, &entries).await {
        Ok(()) => writer.send(TRANSFER_OK, "Directory send OK.").await,
        Err(e) => {
            error!("LIST failed for {}: {}", session.peer_addr(), e);
            writer
                .send(TRANSFER_ABORTED, "Connection closed; transfer aborted.")
                .await
        }
    }
}
