use std::io::{self, BufRead, BufReader, Write};
use std::net::{IpAddr, TcpListener, TcpStream};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use super::*;
use crate::Deadline;
use crate::error::ErrorKind;
use crate::mx::tests::StubResolver;

const GREETING: &str = "220 mock.smtp.test ESMTP\r\n";
const EHLO_OK: (&str, &str) = ("EHLO", "250-mock.smtp.test\r\n250-PIPELINING\r\n250 SIZE 10240000\r\n");
const MAIL_OK: (&str, &str) = ("MAIL FROM:", "250 2.1.0 Ok\r\n");
const QUIT_OK: (&str, &str) = ("QUIT", "221 2.0.0 Bye\r\n");

pub(crate) struct MockServer {
    pub port: u16,
    handle: thread::JoinHandle<Vec<String>>,
}

impl MockServer {
    /// Every command line the client sent, in order.
    pub(crate) fn commands(self) -> Vec<String> {
        self.handle.join().expect("mock server thread")
    }
}

/// Accepts one connection, sends `greeting`, then answers each expected
/// command with its scripted reply. An empty reply stays silent. Commands
/// received after the script ends are still recorded.
pub(crate) fn spawn_mock_server(
    greeting: &'static str,
    script: Vec<(&'static str, &'static str)>,
) -> MockServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind mock server");
    let port = listener.local_addr().expect("addr").port();
    let (ready_tx, ready_rx) = mpsc::channel();
    let handle = thread::spawn(move || {
        ready_tx.send(()).ok();
        let mut commands = Vec::new();
        if let Ok((mut stream, _)) = listener.accept() {
            let _ = handle_session(&mut stream, greeting, script, &mut commands);
        }
        commands
    });
    ready_rx.recv().expect("server ready");
    MockServer { port, handle }
}

fn handle_session(
    stream: &mut TcpStream,
    greeting: &str,
    script: Vec<(&'static str, &'static str)>,
    commands: &mut Vec<String>,
) -> io::Result<()> {
    stream.set_read_timeout(Some(Duration::from_secs(5)))?;
    let mut reader = BufReader::new(stream.try_clone()?);
    stream.write_all(greeting.as_bytes())?;
    stream.flush()?;
    for (expected, response) in script {
        let mut line = String::new();
        if reader.read_line(&mut line)? == 0 {
            return Ok(());
        }
        let line = line.trim_end().to_string();
        let matches = line.starts_with(expected);
        commands.push(line);
        if !matches {
            return Ok(());
        }
        if !response.is_empty() {
            stream.write_all(response.as_bytes())?;
            stream.flush()?;
        }
    }
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line)? == 0 {
            return Ok(());
        }
        commands.push(line.trim_end().to_string());
    }
}

pub(crate) fn test_options(port: u16) -> ProbeOptions {
    ProbeOptions {
        port,
        connect_timeout: Duration::from_secs(2),
        command_timeout: Duration::from_secs(2),
        ..ProbeOptions::default()
    }
}

fn open_local(port: u16) -> Result<DeliverabilityProbe, ProbeError> {
    let resolver = StubResolver::with_hosts(&["127.0.0.1"]);
    DeliverabilityProbe::open(
        &resolver,
        "example.com",
        "verifier.test",
        "probe@verifier.test",
        &test_options(port),
        Deadline::none(),
    )
}

fn rcpt_count(commands: &[String]) -> usize {
    commands.iter().filter(|c| c.starts_with("RCPT TO:")).count()
}

fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    listener.local_addr().expect("addr").port()
}

#[test]
fn catch_all_server_accepts_synthetic_address() {
    let server = spawn_mock_server(
        GREETING,
        vec![EHLO_OK, MAIL_OK, ("RCPT TO:", "250 2.1.5 Ok\r\n"), QUIT_OK],
    );
    let mut probe = open_local(server.port).expect("open");
    assert_eq!(probe.exchanger(), "127.0.0.1");
    assert!(probe.has_catch_all(3));
    probe.close();

    let commands = server.commands();
    assert_eq!(commands[0], "EHLO verifier.test");
    assert_eq!(commands[1], "MAIL FROM:<probe@verifier.test>");
    assert!(commands[2].ends_with("@example.com>"), "{commands:?}");
    assert_ne!(commands[2], "RCPT TO:<user@example.com>");
    assert_eq!(commands[3], "QUIT");
    assert_eq!(commands.len(), 4);
}

#[test]
fn rejected_synthetic_address_is_not_catch_all() {
    let server = spawn_mock_server(
        GREETING,
        vec![
            EHLO_OK,
            MAIL_OK,
            ("RCPT TO:", "550 5.1.1 User unknown\r\n"),
            ("RCPT TO:<user@example.com>", "250 2.1.5 Ok\r\n"),
            QUIT_OK,
        ],
    );
    let mut probe = open_local(server.port).expect("open");
    assert!(!probe.has_catch_all(3));
    probe
        .is_deliverable("user@example.com", 3)
        .expect("deliverable");
    drop(probe);

    let commands = server.commands();
    assert_eq!(rcpt_count(&commands), 2);
    assert_eq!(commands.last().map(String::as_str), Some("QUIT"));
}

#[test]
fn greylisted_synthetic_address_exhausts_budget_and_is_not_catch_all() {
    let server = spawn_mock_server(
        GREETING,
        vec![
            EHLO_OK,
            MAIL_OK,
            ("RCPT TO:", "451 4.7.1 Greylisted, try again later\r\n"),
            ("RCPT TO:", "451 4.7.1 Greylisted, try again later\r\n"),
            ("RCPT TO:", "451 4.7.1 Greylisted, try again later\r\n"),
            QUIT_OK,
        ],
    );
    let mut probe = open_local(server.port).expect("open");
    assert!(!probe.has_catch_all(2));
    probe.close();
    assert_eq!(rcpt_count(&server.commands()), 3);
}

#[test]
fn recipient_with_line_break_is_never_sent() {
    let server = spawn_mock_server(GREETING, vec![EHLO_OK, MAIL_OK, QUIT_OK]);
    let mut probe = open_local(server.port).expect("open");
    let err = probe
        .is_deliverable("u@example.com>\r\nRSET\r\nX:<x", 0)
        .expect_err("unsafe recipient");
    assert!(matches!(err, ProbeError::UnsafeArgument { stage: Stage::RcptTo, .. }));
    assert_eq!(err.kind(), ErrorKind::EmailParseFailure);
    probe.close();

    let commands = server.commands();
    assert_eq!(rcpt_count(&commands), 0);
    assert!(!commands.iter().any(|c| c == "RSET"), "{commands:?}");
}

#[test]
fn unsafe_identity_fails_before_any_lookup() {
    let resolver = StubResolver::new(|_| panic!("resolver must not be reached"));
    for (hello, from) in [
        ("verifier.test\r\nRSET", "probe@verifier.test"),
        ("verifier.test", "probe@verifier.test>\nRSET"),
    ] {
        let err = match DeliverabilityProbe::open(
            &resolver,
            "example.com",
            hello,
            from,
            &ProbeOptions::default(),
            Deadline::none(),
        ) {
            Ok(_) => panic!("unsafe identity accepted"),
            Err(err) => err,
        };
        assert!(matches!(err, ProbeError::UnsafeArgument { .. }), "{err:?}");
    }
}

#[test]
fn named_exchanger_is_resolved_through_the_resolver() {
    let server = spawn_mock_server(GREETING, vec![EHLO_OK, MAIL_OK, QUIT_OK]);
    let resolver = StubResolver::with_hosts(&["mx.example.test"])
        .with_address("mx.example.test", IpAddr::from([127, 0, 0, 1]));
    let mut probe = DeliverabilityProbe::open(
        &resolver,
        "example.com",
        "verifier.test",
        "probe@verifier.test",
        &test_options(server.port),
        Deadline::none(),
    )
    .expect("resolved exchanger");
    assert_eq!(probe.exchanger(), "mx.example.test");
    probe.close();
    server.commands();
}

#[test]
fn unresolvable_exchanger_is_no_such_host() {
    let resolver = StubResolver::with_hosts(&["mx.unknown.test"]);
    let err = match DeliverabilityProbe::open(
        &resolver,
        "example.com",
        "verifier.test",
        "probe@verifier.test",
        &test_options(closed_port()),
        Deadline::none(),
    ) {
        Ok(_) => panic!("no address for exchanger"),
        Err(err) => err,
    };
    assert_eq!(err.kind(), ErrorKind::NoSuchHost);
}

#[test]
fn temporary_rejection_is_retried_until_accepted() {
    let server = spawn_mock_server(
        GREETING,
        vec![
            EHLO_OK,
            MAIL_OK,
            ("RCPT TO:", "451 4.7.1 Greylisted, try again later\r\n"),
            ("RCPT TO:", "451 4.7.1 Greylisted, try again later\r\n"),
            ("RCPT TO:", "451 4.7.1 Greylisted, try again later\r\n"),
            ("RCPT TO:", "250 2.1.5 Ok\r\n"),
            QUIT_OK,
        ],
    );
    let mut probe = open_local(server.port).expect("open");
    probe
        .is_deliverable("user@example.com", 3)
        .expect("accepted on the last retry");
    probe.close();
    assert_eq!(rcpt_count(&server.commands()), 4);
}

#[test]
fn retry_budget_is_respected_exactly() {
    let server = spawn_mock_server(
        GREETING,
        vec![
            EHLO_OK,
            MAIL_OK,
            ("RCPT TO:", "450 4.2.0 Try again later\r\n"),
            ("RCPT TO:", "450 4.2.0 Try again later\r\n"),
            ("RCPT TO:", "450 4.2.0 Try again later\r\n"),
            QUIT_OK,
        ],
    );
    let mut probe = open_local(server.port).expect("open");
    let err = probe
        .is_deliverable("user@example.com", 2)
        .expect_err("budget exhausted");
    assert_eq!(err.kind(), ErrorKind::TemporaryRejection);
    probe.close();
    assert_eq!(rcpt_count(&server.commands()), 3);
}

#[test]
fn permanent_rejection_is_never_retried() {
    let server = spawn_mock_server(
        GREETING,
        vec![
            EHLO_OK,
            MAIL_OK,
            ("RCPT TO:", "550 5.1.1 <user@example.com>: Recipient address rejected: User unknown\r\n"),
            QUIT_OK,
        ],
    );
    let mut probe = open_local(server.port).expect("open");
    let err = probe
        .is_deliverable("user@example.com", 3)
        .expect_err("rejected");
    assert_eq!(err.kind(), ErrorKind::PermanentRejection);
    match &err {
        ProbeError::Rejected { response, .. } => assert_eq!(response.code, 550),
        other => panic!("unexpected error: {other:?}"),
    }
    probe.close();
    assert_eq!(rcpt_count(&server.commands()), 1);
}

#[test]
fn mailbox_full_is_never_retried() {
    let server = spawn_mock_server(
        GREETING,
        vec![
            EHLO_OK,
            MAIL_OK,
            ("RCPT TO:", "452 4.2.2 Mailbox full\r\n"),
            QUIT_OK,
        ],
    );
    let mut probe = open_local(server.port).expect("open");
    let err = probe
        .is_deliverable("user@example.com", 3)
        .expect_err("full");
    assert_eq!(err.kind(), ErrorKind::MailboxFull);
    probe.close();
    assert_eq!(rcpt_count(&server.commands()), 1);
}

#[test]
fn close_is_idempotent() {
    let server = spawn_mock_server(GREETING, vec![EHLO_OK, MAIL_OK, QUIT_OK]);
    let mut probe = open_local(server.port).expect("open");
    assert!(probe.is_open());
    probe.close();
    probe.close();
    assert!(!probe.is_open());
    let err = probe
        .is_deliverable("user@example.com", 0)
        .expect_err("closed");
    assert!(matches!(err, ProbeError::Closed));
    drop(probe);

    let commands = server.commands();
    assert_eq!(commands.iter().filter(|c| *c == "QUIT").count(), 1);
}

#[test]
fn ehlo_rejection_falls_back_to_helo() {
    let server = spawn_mock_server(
        GREETING,
        vec![
            ("EHLO", "502 5.5.2 Command not recognized\r\n"),
            ("HELO verifier.test", "250 mock.smtp.test\r\n"),
            MAIL_OK,
            QUIT_OK,
        ],
    );
    let mut probe = open_local(server.port).expect("open via HELO");
    probe.close();
    assert_eq!(server.commands()[1], "HELO verifier.test");
}

#[test]
fn refused_greeting_is_connection_refused() {
    let server = spawn_mock_server("554 5.3.2 No SMTP service here\r\n", vec![QUIT_OK]);
    let err = match open_local(server.port) {
        Ok(_) => panic!("greeting should be refused"),
        Err(err) => err,
    };
    assert_eq!(err.kind(), ErrorKind::ConnectionRefused);
    assert!(matches!(
        err,
        ProbeError::Refused {
            stage: Stage::Greeting,
            ..
        }
    ));
    assert_eq!(server.commands(), ["QUIT"]);
}

#[test]
fn blocked_sender_is_reported_as_blocked() {
    let server = spawn_mock_server(
        GREETING,
        vec![
            EHLO_OK,
            ("MAIL FROM:", "550 5.7.1 Client host [192.0.2.1] blocked using Spamhaus\r\n"),
            QUIT_OK,
        ],
    );
    let err = match open_local(server.port) {
        Ok(_) => panic!("MAIL FROM should be refused"),
        Err(err) => err,
    };
    assert_eq!(err.kind(), ErrorKind::Blocked);
    server.commands();
}

#[test]
fn malformed_reply_is_unexpected_response() {
    let server = spawn_mock_server(GREETING, vec![("EHLO", "hello there\r\n"), QUIT_OK]);
    let err = match open_local(server.port) {
        Ok(_) => panic!("malformed EHLO reply"),
        Err(err) => err,
    };
    assert_eq!(err.kind(), ErrorKind::UnexpectedResponse);
    server.commands();
}

#[test]
fn silent_server_times_out() {
    let server = spawn_mock_server(GREETING, vec![("EHLO", "")]);
    let resolver = StubResolver::with_hosts(&["127.0.0.1"]);
    let options = ProbeOptions {
        command_timeout: Duration::from_millis(200),
        ..test_options(server.port)
    };
    let err = match DeliverabilityProbe::open(
        &resolver,
        "example.com",
        "verifier.test",
        "probe@verifier.test",
        &options,
        Deadline::none(),
    ) {
        Ok(_) => panic!("EHLO never answered"),
        Err(err) => err,
    };
    assert_eq!(err.kind(), ErrorKind::Timeout);
    server.commands();
}

#[test]
fn no_exchangers_is_no_such_host() {
    let resolver = StubResolver::new(|_| Ok(Vec::new()));
    let err = match DeliverabilityProbe::open(
        &resolver,
        "nosuchdomain.invalid",
        "verifier.test",
        "probe@verifier.test",
        &ProbeOptions::default(),
        Deadline::none(),
    ) {
        Ok(_) => panic!("no exchangers"),
        Err(err) => err,
    };
    assert!(matches!(err, ProbeError::NoSuchHost { ref domain } if domain == "nosuchdomain.invalid"));
    assert_eq!(err.kind(), ErrorKind::NoSuchHost);
}

#[test]
fn every_candidate_unreachable_is_no_such_host() {
    let port = closed_port();
    let err = match open_local(port) {
        Ok(_) => panic!("nothing listens"),
        Err(err) => err,
    };
    assert_eq!(err.kind(), ErrorKind::NoSuchHost);
}

#[test]
fn unusable_candidate_falls_through_to_next() {
    let server = spawn_mock_server(GREETING, vec![EHLO_OK, MAIL_OK, QUIT_OK]);
    // IPv6 is disabled, so the first candidate has no usable address.
    let resolver = StubResolver::with_hosts(&["::1", "127.0.0.1"]);
    let mut probe = DeliverabilityProbe::open(
        &resolver,
        "example.com",
        "verifier.test",
        "probe@verifier.test",
        &test_options(server.port),
        Deadline::none(),
    )
    .expect("second candidate");
    assert_eq!(probe.exchanger(), "127.0.0.1");
    probe.close();
    server.commands();
}

#[test]
fn expired_deadline_stops_before_connecting() {
    let resolver = StubResolver::with_hosts(&["127.0.0.1"]);
    let err = match DeliverabilityProbe::open(
        &resolver,
        "example.com",
        "verifier.test",
        "probe@verifier.test",
        &test_options(closed_port()),
        Deadline::after(Duration::ZERO),
    ) {
        Ok(_) => panic!("deadline already passed"),
        Err(err) => err,
    };
    assert_eq!(err.kind(), ErrorKind::Timeout);
}

#[test]
fn connector_opens_through_its_resolver() {
    let server = spawn_mock_server(GREETING, vec![EHLO_OK, MAIL_OK, QUIT_OK]);
    let connector = SmtpConnector::with_resolver(
        StubResolver::with_hosts(&["127.0.0.1"]),
        "verifier.test",
        "probe@verifier.test",
        test_options(server.port),
    );
    let mut probe = connector
        .open("example.com", Deadline::none())
        .expect("open");
    assert_eq!(probe.domain(), "example.com");
    probe.close();
    server.commands();
}
