// tests/smtp.rs
//
// SMTP dialogue against an in-process fake relay.

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;

use jobctl::errors::JobError;
use jobctl::notify::{MailMessage, Notifier, SmtpNotifier};
use jobctl_test_utils::{init_tracing, with_timeout};

fn message() -> MailMessage {
    MailMessage {
        from: "box@example.com".into(),
        to: vec!["ops@example.com".into(), "dba@example.com".into()],
        subject: "box : Job nightly.json completed with SUCCESS".into(),
        body: "line one\n.starts with a dot\nlast".into(),
    }
}

/// Accept one connection, answer with canned replies (`rcpt_reply` for RCPT), and return
/// the lines the client sent.
async fn fake_relay(listener: TcpListener, rcpt_reply: &'static str) -> Vec<String> {
    let (stream, _) = listener.accept().await.unwrap();
    let (read, mut write) = stream.into_split();
    let mut reader = BufReader::new(read);
    let mut received = Vec::new();
    let mut in_data = false;

    write.write_all(b"220 relay ready\r\n").await.unwrap();
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line).await.unwrap() == 0 {
            break;
        }
        let line = line.trim_end_matches("\r\n").to_string();
        received.push(line.clone());

        if in_data {
            if line == "." {
                in_data = false;
                write.write_all(b"250 queued\r\n").await.unwrap();
            }
            continue;
        }

        let reply: &[u8] = if line.starts_with("HELO") {
            b"250-relay greets you\r\n250 ok\r\n"
        } else if line.starts_with("RCPT") {
            rcpt_reply.as_bytes()
        } else if line == "DATA" {
            in_data = true;
            b"354 go ahead\r\n"
        } else if line == "QUIT" {
            write.write_all(b"221 bye\r\n").await.unwrap();
            break;
        } else {
            b"250 ok\r\n"
        };
        write.write_all(reply).await.unwrap();
    }
    received
}

#[tokio::test]
async fn delivers_through_the_relay() {
    init_tracing();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let relay = tokio::spawn(fake_relay(listener, "250 ok\r\n"));

    let mut notifier = SmtpNotifier::new(addr.to_string(), "box");
    with_timeout(notifier.send(&message())).await.unwrap();

    let lines = relay.await.unwrap();
    assert_eq!(lines[0], "HELO box");
    assert_eq!(lines[1], "MAIL FROM:<box@example.com>");
    assert_eq!(lines[2], "RCPT TO:<ops@example.com>");
    assert_eq!(lines[3], "RCPT TO:<dba@example.com>");
    assert_eq!(lines[4], "DATA");
    assert!(lines.contains(&"Subject: box : Job nightly.json completed with SUCCESS".to_string()));
    assert!(lines.contains(&"..starts with a dot".to_string()));
    assert_eq!(lines.last().unwrap(), "QUIT");
}

#[tokio::test]
async fn rejected_recipient_is_a_notification_error() {
    init_tracing();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(fake_relay(listener, "550 no such user\r\n"));

    let mut notifier = SmtpNotifier::new(addr.to_string(), "box");
    let err = with_timeout(notifier.send(&message())).await.unwrap_err();
    assert!(matches!(err, JobError::Notification(_)));
}

#[tokio::test]
async fn unreachable_relay_is_a_notification_error() {
    // Bind then drop to get a port nobody listens on.
    let addr = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    };

    let mut notifier = SmtpNotifier::new(addr.to_string(), "box");
    let err = with_timeout(notifier.send(&message())).await.unwrap_err();
    assert!(matches!(err, JobError::Notification(_)));
}
