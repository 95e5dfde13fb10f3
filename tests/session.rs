//! Full-session integration tests.
//!
//! Each test drives the session lifecycle driver over an in-memory duplex
//! stream, exactly the way the server drives it over a TCP stream, with a
//! scratch directory as the server root. Data-channel tests additionally use
//! real loopback sockets.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader, DuplexStream};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crux_ftp_server::config::ServerConfig;
use crux_ftp_server::session::run_session;

struct TestClient {
    reader: BufReader<DuplexStream>,
    handle: JoinHandle<()>,
}

impl TestClient {
    async fn send(&mut self, command: &str) {
        self.reader
            .get_mut()
            .write_all(format!("{}\r\n", command).as_bytes())
            .await
            .unwrap();
    }

    /// Read one reply line, without its CRLF. Empty string means EOF.
    async fn recv(&mut self) -> String {
        let mut line = String::new();
        self.reader.read_line(&mut line).await.unwrap();
        line.trim_end().to_string()
    }

    async fn expect(&mut self, command: &str, reply_prefix: &str) {
        self.send(command).await;
        let reply = self.recv().await;
        assert!(
            reply.starts_with(reply_prefix),
            "sent {:?}, expected reply starting with {:?}, got {:?}",
            command,
            reply_prefix,
            reply
        );
    }
}

fn test_config(root: &TempDir) -> ServerConfig {
    ServerConfig {
        server_root: root.path().to_string_lossy().to_string(),
        ..ServerConfig::default()
    }
}

fn spawn_session(config: ServerConfig) -> TestClient {
    let (client, server) = tokio::io::duplex(4096);
    let peer = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 54321);
    let handle = tokio::spawn(run_session(
        server,
        peer,
        Arc::new(config),
        CancellationToken::new(),
    ));
    TestClient {
        reader: BufReader::new(client),
        handle,
    }
}

/// Connect, read the greeting, and log in as alice.
async fn login(config: ServerConfig) -> TestClient {
    let mut client = spawn_session(config);
    let greeting = client.recv().await;
    assert!(greeting.starts_with("220 "), "greeting was {:?}", greeting);
    client.expect("USER alice", "331 Password required for user.").await;
    client.expect("PASS alice123", "230 LOGIN OK.").await;
    client
}

#[tokio::test]
async fn greeting_login_and_quit() {
    let root = TempDir::new().unwrap();
    let mut client = login(test_config(&root)).await;

    client.expect("QUIT", "221 Goodbye.").await;
    assert_eq!(client.recv().await, "", "connection should be closed");
    client.handle.await.unwrap();
}

#[tokio::test]
async fn empty_banner_sends_no_greeting() {
    let root = TempDir::new().unwrap();
    let config = ServerConfig {
        banner: String::new(),
        ..test_config(&root)
    };
    let mut client = spawn_session(config);

    // No unsolicited line: the very first reply is the USER response.
    client.send("USER alice").await;
    assert_eq!(client.recv().await, "331 Password required for user.");
}

#[tokio::test]
async fn wrong_verb_before_login_is_a_protocol_error() {
    let root = TempDir::new().unwrap();
    let mut client = spawn_session(test_config(&root));
    client.recv().await; // greeting

    client
        .expect("PWD", "530 Please log in with USER and PASS first.")
        .await;

    // The state loop re-reads: login still succeeds afterwards.
    client.expect("USER alice", "331").await;
    client.expect("PASS alice123", "230").await;
}

#[tokio::test]
async fn wrong_verb_in_password_round_consumes_no_attempt() {
    let root = TempDir::new().unwrap();
    let config = ServerConfig {
        max_login_attempts: 1,
        ..test_config(&root)
    };
    let mut client = spawn_session(config);
    client.recv().await; // greeting

    // A non-PASS verb after USER is a protocol error, not a failed attempt;
    // with a budget of one, a counted failure would end the session.
    client.expect("USER alice", "331").await;
    client
        .expect("SYST", "530 Please log in with USER and PASS first.")
        .await;

    client.expect("USER alice", "331").await;
    client.expect("PASS alice123", "230 LOGIN OK.").await;
}

#[tokio::test]
async fn login_attempts_exhaustion_closes_the_connection() {
    let root = TempDir::new().unwrap();
    let config = ServerConfig {
        max_login_attempts: 2,
        ..test_config(&root)
    };
    let mut client = spawn_session(config);
    client.recv().await; // greeting

    for _ in 0..2 {
        client.expect("USER alice", "331").await;
        client
            .expect("PASS wrong", "530 Incorrect login credentials.")
            .await;
    }

    // The budget is spent; no third round is offered.
    assert_eq!(client.recv().await, "", "connection should be closed");
    client.handle.await.unwrap();
}

#[tokio::test]
async fn generic_failure_message_never_reveals_which_check_failed() {
    let root = TempDir::new().unwrap();
    let mut client = spawn_session(test_config(&root));
    client.recv().await; // greeting

    // Unknown user, correct-looking password.
    client.expect("USER mallory", "331").await;
    client
        .expect("PASS alice123", "530 Incorrect login credentials.")
        .await;

    // Known user, wrong password: byte-identical reply.
    client.expect("USER alice", "331").await;
    client
        .expect("PASS wrong", "530 Incorrect login credentials.")
        .await;
}

#[tokio::test]
async fn unknown_verb_keeps_the_loop_alive() {
    let root = TempDir::new().unwrap();
    let mut client = login(test_config(&root)).await;

    client.expect("XYZZY", "502 Command not implemented.").await;
    client.expect("SYST", "215 UNIX Type: L8").await;
    client.expect("XYZZY again", "502 Command not implemented.").await;
    client.expect("QUIT", "221").await;
}

#[tokio::test]
async fn verb_matching_is_case_insensitive() {
    let root = TempDir::new().unwrap();
    let mut client = login(test_config(&root)).await;

    client.expect("syst", "215 UNIX Type: L8").await;
    client.expect("SySt", "215 UNIX Type: L8").await;
    client.expect("pwd", "257").await;
}

#[tokio::test]
async fn user_and_pass_have_no_handler_after_login() {
    let root = TempDir::new().unwrap();
    let mut client = login(test_config(&root)).await;

    client.expect("USER bob", "502 Command not implemented.").await;
    client.expect("PASS bob123", "502 Command not implemented.").await;
}

#[tokio::test]
async fn home_directory_resolved_from_user() {
    let root = TempDir::new().unwrap();
    std::fs::create_dir(root.path().join("alice")).unwrap();

    let mut client = login(test_config(&root)).await;
    client
        .expect("PWD", "257 \"/alice\" is the current directory.")
        .await;
}

#[tokio::test]
async fn missing_home_directory_falls_back_to_root() {
    let root = TempDir::new().unwrap();
    // No alice/ under the server root.
    let mut client = login(test_config(&root)).await;
    client
        .expect("PWD", "257 \"/\" is the current directory.")
        .await;
}

#[tokio::test]
async fn rename_pair_completes_with_captured_path() {
    let root = TempDir::new().unwrap();
    std::fs::write(root.path().join("a.txt"), b"payload").unwrap();

    let mut client = login(test_config(&root)).await;
    client.expect("RNFR a.txt", "350 Ready for RNTO.").await;
    client.expect("RNTO b.txt", "250 Rename successful.").await;

    assert!(!root.path().join("a.txt").exists());
    assert_eq!(
        std::fs::read(root.path().join("b.txt")).unwrap(),
        b"payload"
    );
}

#[tokio::test]
async fn rnto_without_rnfr_is_a_bad_sequence() {
    let root = TempDir::new().unwrap();
    let mut client = login(test_config(&root)).await;

    client
        .expect("RNTO b.txt", "503 Bad sequence of commands.")
        .await;
    // And the loop goes on.
    client.expect("SYST", "215").await;
}

#[tokio::test]
async fn intervening_command_cancels_a_pending_rename() {
    let root = TempDir::new().unwrap();
    std::fs::write(root.path().join("a.txt"), b"x").unwrap();

    let mut client = login(test_config(&root)).await;
    client.expect("RNFR a.txt", "350").await;

    // The intervening command is answered with the bad-sequence reply...
    client.expect("SYST", "503 Bad sequence of commands.").await;
    // ...and dispatches normally on the next call.
    client.expect("SYST", "215 UNIX Type: L8").await;

    // The pairing is gone: RNTO now has nothing to complete.
    client.expect("RNTO b.txt", "503").await;
    assert!(root.path().join("a.txt").exists());
    assert!(!root.path().join("b.txt").exists());
}

#[tokio::test]
async fn pending_rename_is_consumed_exactly_once() {
    let root = TempDir::new().unwrap();
    std::fs::write(root.path().join("a.txt"), b"x").unwrap();

    let mut client = login(test_config(&root)).await;
    client.expect("RNFR a.txt", "350").await;
    client.expect("RNTO b.txt", "250").await;
    // An immediate second RNTO finds no pending rename.
    client.expect("RNTO c.txt", "503").await;
    assert!(root.path().join("b.txt").exists());
    assert!(!root.path().join("c.txt").exists());
}

#[tokio::test]
async fn rnfr_can_rearm_after_a_cancelled_pairing() {
    let root = TempDir::new().unwrap();
    std::fs::write(root.path().join("a.txt"), b"a").unwrap();
    std::fs::write(root.path().join("b.txt"), b"b").unwrap();

    let mut client = login(test_config(&root)).await;
    client.expect("RNFR a.txt", "350").await;
    // RNFR between the pair cancels it first and is then swallowed by the
    // bad-sequence reply, so re-arm and verify the fresh source wins.
    client.expect("RNFR b.txt", "503").await;
    client.expect("RNFR b.txt", "350").await;
    client.expect("RNTO c.txt", "250").await;

    assert!(root.path().join("a.txt").exists());
    assert!(!root.path().join("b.txt").exists());
    assert_eq!(std::fs::read(root.path().join("c.txt")).unwrap(), b"b");
}

#[tokio::test]
async fn directory_command_flow() {
    let root = TempDir::new().unwrap();
    let mut client = login(test_config(&root)).await;

    client.expect("MKD docs", "257 \"/docs\" created.").await;
    client.expect("CWD docs", "250 Directory successfully changed.").await;
    client.expect("PWD", "257 \"/docs\"").await;
    client.expect("CDUP", "250").await;
    client.expect("PWD", "257 \"/\"").await;
    client.expect("RMD docs", "250 Directory removed.").await;
    client.expect("RMD docs", "550").await;
    client.expect("CWD missing", "550 Failed to change directory.").await;
    client.expect("DELE nothing.txt", "550").await;
}

#[tokio::test]
async fn path_traversal_is_refused() {
    let root = TempDir::new().unwrap();
    let mut client = login(test_config(&root)).await;

    client.expect("CWD ..", "550 Failed to change directory.").await;
    client.expect("DELE ../../etc/passwd", "550").await;
}

#[tokio::test]
async fn administrative_verbs_get_canned_replies() {
    let root = TempDir::new().unwrap();
    let mut client = login(test_config(&root)).await;

    client.expect("ALLO 1024", "202 ALLO command ignored.").await;
    client.expect("REIN", "502 REIN not implemented.").await;
    client.expect("ACCT anon", "502 ACCT not implemented.").await;
    client.expect("SMNT vol0", "502 SMNT not implemented.").await;
    client.expect("SITE CHMOD 777 x", "202 SITE commands not supported.").await;
    client.expect("FEAT", "211 End.").await;
}

#[tokio::test]
async fn type_selection() {
    let root = TempDir::new().unwrap();
    let mut client = login(test_config(&root)).await;

    client.expect("TYPE A", "200 Type set to A.").await;
    client.expect("TYPE i", "200 Type set to I.").await;
    client
        .expect("TYPE E", "504 Command not implemented for that parameter.")
        .await;
}

#[tokio::test]
async fn overlong_command_line_is_rejected_not_fatal() {
    let root = TempDir::new().unwrap();
    let config = ServerConfig {
        max_command_length: 32,
        ..test_config(&root)
    };
    let mut client = login(config).await;

    let long = format!("STOR {}", "x".repeat(100));
    client.expect(&long, "500 Command too long.").await;
    client.expect("SYST", "215").await;
}

#[tokio::test]
async fn overlong_command_line_cancels_a_pending_rename() {
    let root = TempDir::new().unwrap();
    std::fs::write(root.path().join("a.txt"), b"x").unwrap();
    let config = ServerConfig {
        max_command_length: 32,
        ..test_config(&root)
    };
    let mut client = login(config).await;

    client.expect("RNFR a.txt", "350").await;

    // The rejected line is still an intervening command: the pairing is
    // gone and the following RNTO has nothing to complete.
    let long = format!("SYST {}", "x".repeat(100));
    client.expect(&long, "500 Command too long.").await;
    client.expect("RNTO b.txt", "503 Bad sequence of commands.").await;

    assert!(root.path().join("a.txt").exists());
    assert!(!root.path().join("b.txt").exists());
}

#[tokio::test]
async fn transfers_without_a_data_channel_are_refused() {
    let root = TempDir::new().unwrap();
    std::fs::write(root.path().join("a.txt"), b"x").unwrap();
    let mut client = login(test_config(&root)).await;

    client.expect("RETR a.txt", "425 Use PORT or PASV first.").await;
    client.expect("STOR up.txt", "425 Use PORT or PASV first.").await;
    client.expect("LIST", "425 Use PORT or PASV first.").await;
}

/// Parse the port out of a `227 Entering Passive Mode (h1,h2,h3,h4,p1,p2).`
/// reply.
fn parse_pasv_port(reply: &str) -> u16 {
    let open = reply.find('(').unwrap();
    let close = reply.find(')').unwrap();
    let fields: Vec<u16> = reply[open + 1..close]
        .split(',')
        .map(|f| f.parse().unwrap())
        .collect();
    assert_eq!(fields.len(), 6, "bad PASV reply {:?}", reply);
    fields[4] * 256 + fields[5]
}

#[tokio::test]
async fn passive_store_retrieve_and_list_round_trip() {
    let root = TempDir::new().unwrap();
    let config = ServerConfig {
        data_port_min: 42100,
        data_port_max: 42180,
        ..test_config(&root)
    };
    let mut client = login(config).await;

    // STOR over a passive data connection.
    client.send("PASV").await;
    let reply = client.recv().await;
    assert!(reply.starts_with("227 Entering Passive Mode ("), "{:?}", reply);
    let port = parse_pasv_port(&reply);

    let mut data = tokio::net::TcpStream::connect(("127.0.0.1", port))
        .await
        .unwrap();
    client.expect("STOR up.txt", "150 FILE: up.txt").await;
    data.write_all(b"hello over the data channel").await.unwrap();
    data.shutdown().await.unwrap();
    drop(data);
    assert_eq!(client.recv().await, "226 Transfer complete.");
    assert_eq!(
        std::fs::read(root.path().join("up.txt")).unwrap(),
        b"hello over the data channel"
    );

    // The channel was consumed; a new PASV is needed for the next transfer.
    client.send("PASV").await;
    let port = parse_pasv_port(&client.recv().await);
    let mut data = tokio::net::TcpStream::connect(("127.0.0.1", port))
        .await
        .unwrap();
    client.expect("RETR up.txt", "150 Opening data connection.").await;
    let mut content = Vec::new();
    data.read_to_end(&mut content).await.unwrap();
    assert_eq!(content, b"hello over the data channel");
    assert_eq!(client.recv().await, "226 Transfer complete.");

    // LIST shows the stored file.
    client.send("PASV").await;
    let port = parse_pasv_port(&client.recv().await);
    let mut data = tokio::net::TcpStream::connect(("127.0.0.1", port))
        .await
        .unwrap();
    client
        .expect("LIST", "150 Here comes the directory listing.")
        .await;
    let mut listing = String::new();
    data.read_to_string(&mut listing).await.unwrap();
    assert!(listing.contains("up.txt"), "listing was {:?}", listing);
    assert_eq!(client.recv().await, "226 Directory send OK.");

    client.expect("QUIT", "221").await;
}

#[tokio::test]
async fn appe_appends_to_an_existing_file() {
    let root = TempDir::new().unwrap();
    std::fs::write(root.path().join("log.txt"), b"one\n").unwrap();
    let config = ServerConfig {
        data_port_min: 42180,
        data_port_max: 42230,
        ..test_config(&root)
    };
    let mut client = login(config).await;

    client.send("PASV").await;
    let port = parse_pasv_port(&client.recv().await);
    let mut data = tokio::net::TcpStream::connect(("127.0.0.1", port))
        .await
        .unwrap();
    client.expect("APPE log.txt", "150 Opening data connection.").await;
    data.write_all(b"two\n").await.unwrap();
    data.shutdown().await.unwrap();
    drop(data);
    assert_eq!(client.recv().await, "226 Transfer complete.");

    assert_eq!(
        std::fs::read(root.path().join("log.txt")).unwrap(),
        b"one\ntwo\n"
    );
}

#[tokio::test]
async fn stou_picks_a_fresh_name() {
    let root = TempDir::new().unwrap();
    std::fs::write(root.path().join("up.txt"), b"old").unwrap();
    let config = ServerConfig {
        data_port_min: 42230,
        data_port_max: 42280,
        ..test_config(&root)
    };
    let mut client = login(config).await;

    client.send("PASV").await;
    let port = parse_pasv_port(&client.recv().await);
    let mut data = tokio::net::TcpStream::connect(("127.0.0.1", port))
        .await
        .unwrap();
    client.expect("STOU up.txt", "150 FILE: up.txt.1").await;
    data.write_all(b"new").await.unwrap();
    data.shutdown().await.unwrap();
    drop(data);
    assert_eq!(client.recv().await, "226 Transfer complete.");

    assert_eq!(std::fs::read(root.path().join("up.txt")).unwrap(), b"old");
    assert_eq!(std::fs::read(root.path().join("up.txt.1")).unwrap(), b"new");
}

#[tokio::test]
async fn shutdown_token_ends_a_blocked_session() {
    let root = TempDir::new().unwrap();
    let (client, server) = tokio::io::duplex(4096);
    let peer = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 54321);
    let token = CancellationToken::new();
    let handle = tokio::spawn(run_session(
        server,
        peer,
        Arc::new(test_config(&root)),
        token.clone(),
    ));

    let mut reader = BufReader::new(client);
    let mut greeting = String::new();
    reader.read_line(&mut greeting).await.unwrap();
    assert!(greeting.starts_with("220 "));

    // The session is blocked reading the first command; cancelling the
    // token must end it.
    token.cancel();
    handle.await.unwrap();
}
