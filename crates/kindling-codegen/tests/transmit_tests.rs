//! Live session tests against a scripted in-memory client.

use std::time::Duration;

use kindling_codegen::{LiveSession, Progress, TemplateCode, TransmitError};
use serde_json::Value as Json;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream};

// ══════════════════════════════════════════════════════════════════════════════
// Scripted client
// ══════════════════════════════════════════════════════════════════════════════

enum Reply {
    Line(String),
    Silent,
    Hangup,
}

fn ok(index: usize) -> Reply {
    Reply::Line(format!(r#"{{"status":"success","index":{index}}}"#))
}

fn complete() -> Reply {
    Reply::Line(r#"{"status":"complete"}"#.into())
}

/// Answers each received message with the next scripted reply and returns
/// everything it received once the connection closes.
async fn client(stream: DuplexStream, replies: Vec<Reply>) -> Vec<Json> {
    let (reader, mut writer) = tokio::io::split(stream);
    let mut lines = BufReader::new(reader).lines();
    let mut replies = replies.into_iter();
    let mut seen = Vec::new();
    while let Ok(Some(line)) = lines.next_line().await {
        seen.push(serde_json::from_str(&line).unwrap());
        match replies.next() {
            Some(Reply::Line(text)) => {
                writer.write_all(format!("{text}\n").as_bytes()).await.unwrap();
            }
            Some(Reply::Hangup) => break,
            Some(Reply::Silent) | None => {}
        }
    }
    seen
}

fn codes(n: usize) -> Vec<TemplateCode> {
    (0..n)
        .map(|i| TemplateCode {
            name: format!("event.Join~{i}"),
            code: format!("H4sI{i}"),
        })
        .collect()
}

fn session(replies: Vec<Reply>) -> (LiveSession<DuplexStream>, tokio::task::JoinHandle<Vec<Json>>) {
    let (server, remote) = tokio::io::duplex(64 * 1024);
    let handle = tokio::spawn(client(remote, replies));
    (LiveSession::new(server, Duration::from_millis(5000)), handle)
}

// ══════════════════════════════════════════════════════════════════════════════
// Tests
// ══════════════════════════════════════════════════════════════════════════════

#[tokio::test(start_paused = true)]
async fn full_delivery_finishes_batch() {
    let (mut live, handle) = session(vec![ok(0), ok(1), complete()]);
    let progress = live.deliver(&codes(2)).await.unwrap();
    assert_eq!(progress, Progress { delivered: 2, total: 2 });
    assert!(progress.is_complete());
    assert!(live.is_open());
    assert_eq!(live.sequence(), 2);
    drop(live);

    let seen = handle.await.unwrap();
    assert_eq!(seen.len(), 3);
    assert_eq!(seen[0]["type"], "template");
    assert_eq!(seen[0]["seq"], 0);
    assert_eq!(seen[0]["index"], 0);
    assert_eq!(seen[0]["source"], "kindling");
    assert_eq!(seen[0]["data"]["name"], "event.Join~0");
    assert_eq!(seen[0]["data"]["code"], "H4sI0");
    assert_eq!(seen[1]["seq"], 1);
    assert_eq!(seen[1]["index"], 1);
    assert_eq!(seen[2]["type"], "finish");
    assert_eq!(seen[2]["count"], 2);
}

#[tokio::test(start_paused = true)]
async fn silent_client_reports_partial_progress() {
    let (mut live, handle) = session(vec![ok(0), ok(1), Reply::Silent]);
    let err = live.deliver(&codes(3)).await.unwrap_err();
    assert_eq!(
        err,
        TransmitError::AckTimeout {
            awaiting: "template 2".into(),
            timeout_ms: 5000,
            progress: Progress { delivered: 2, total: 3 },
        }
    );
    let progress = err.progress().unwrap();
    assert_eq!(progress.confirmed(), 0..2);
    assert_eq!(progress.unconfirmed(), 2..3);

    // The session is gone; nothing is resent.
    assert!(!live.is_open());
    assert_eq!(live.deliver(&codes(3)).await.unwrap_err(), TransmitError::SessionClosed);
    let seen = handle.await.unwrap();
    assert_eq!(seen.len(), 3);
    assert_eq!(seen[2]["index"], 2);
}

#[tokio::test(start_paused = true)]
async fn rejected_template_stops_delivery() {
    let reject = Reply::Line(r#"{"status":"error","index":1,"error":"plot is full"}"#.into());
    let (mut live, handle) = session(vec![ok(0), reject]);
    let err = live.deliver(&codes(4)).await.unwrap_err();
    assert_eq!(
        err,
        TransmitError::DeliveryRejected {
            index: 1,
            reason: "plot is full".into(),
            progress: Progress { delivered: 1, total: 4 },
        }
    );
    assert!(err.to_diagnostic().suggestion.is_some());
    assert_eq!(handle.await.unwrap().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn mismatched_index_is_unexpected() {
    let (mut live, _handle) = session(vec![ok(5)]);
    let err = live.deliver(&codes(2)).await.unwrap_err();
    assert!(matches!(
        err,
        TransmitError::UnexpectedResponse { ref response, progress }
            if response.contains("\"index\":5") && progress.delivered == 0
    ));
}

#[tokio::test(start_paused = true)]
async fn non_json_reply_is_unexpected() {
    let (mut live, _handle) = session(vec![Reply::Line("hello".into())]);
    let err = live.deliver(&codes(1)).await.unwrap_err();
    assert_eq!(
        err,
        TransmitError::UnexpectedResponse {
            response: "hello".into(),
            progress: Progress { delivered: 0, total: 1 },
        }
    );
}

#[tokio::test(start_paused = true)]
async fn hangup_is_connection_lost() {
    let (mut live, _handle) = session(vec![ok(0), Reply::Hangup]);
    let err = live.deliver(&codes(3)).await.unwrap_err();
    assert!(matches!(err, TransmitError::ConnectionLost { .. }));
    assert_eq!(err.progress(), Some(Progress { delivered: 1, total: 3 }));
}

#[tokio::test(start_paused = true)]
async fn missing_finish_ack_times_out() {
    let (mut live, _handle) = session(vec![ok(0), Reply::Silent]);
    let err = live.deliver(&codes(1)).await.unwrap_err();
    assert!(matches!(
        err,
        TransmitError::AckTimeout { ref awaiting, progress, .. }
            if awaiting == "finish" && progress.is_complete()
    ));
}

#[tokio::test(start_paused = true)]
async fn sequence_continues_across_batches() {
    let (mut live, handle) = session(vec![ok(0), complete(), ok(0), complete()]);
    live.deliver(&codes(1)).await.unwrap();
    live.deliver(&codes(1)).await.unwrap();
    assert_eq!(live.sequence(), 2);
    drop(live);
    let seen = handle.await.unwrap();
    assert_eq!(seen[2]["seq"], 1);
    assert_eq!(seen[2]["index"], 0);
}
