use super::*;

use crate::config::EngineConfig;

fn short_timeout_config() -> EngineConfig {
    let mut config = test_config();
    config.challenge.timeout = Duration::from_millis(500);
    config
}

async fn expect_challenge(ws: &mut TestWs) -> String {
    match ws_expect_message(ws, WAIT, |m| matches!(m, ServerMessage::ChallengeIssued { .. })).await
    {
        ServerMessage::ChallengeIssued { word, .. } => word,
        other => panic!("unexpected message: {other:?}"),
    }
}

#[tokio::test]
async fn unanswered_challenge_terminates_the_connection() {
    let server = start_test_server(short_timeout_config()).await;
    let user_id = UserId::new();
    let mut ws = ws_join(&server, user_id, "Mina").await;

    assert_eq!(server.app().use_cases.challenge.issue_for_user(user_id).await, 1);
    expect_challenge(&mut ws).await;

    // Gameplay is blocked while the challenge is outstanding.
    ws_send_client(&mut ws, &ClientMessage::FishingAttempt { nonce: None }).await;
    let blocked = ws_expect_message(&mut ws, WAIT, |m| rejection_reason(m).is_some()).await;
    assert_eq!(rejection_reason(&blocked), Some(RejectionCode::ChallengePending));

    let terminated = ws_expect_message(&mut ws, WAIT, |m| {
        matches!(m, ServerMessage::ConnectionTerminated { .. })
    })
    .await;
    assert_eq!(
        terminated,
        ServerMessage::ConnectionTerminated {
            reason: TerminationReason::ChallengeTimeout
        }
    );
    assert_eq!(ws_expect_close(&mut ws, WAIT).await, Some(4002));
}

#[tokio::test]
async fn wrong_answer_terminates_the_connection() {
    let server = start_test_server(test_config()).await;
    let user_id = UserId::new();
    let mut ws = ws_join(&server, user_id, "Mina").await;

    server.app().use_cases.challenge.issue_for_user(user_id).await;
    let word = expect_challenge(&mut ws).await;

    ws_send_client(
        &mut ws,
        &ClientMessage::ChallengeResponse {
            text: word.to_lowercase() + "?",
        },
    )
    .await;
    let terminated = ws_recv_server(&mut ws).await;
    assert_eq!(
        terminated,
        ServerMessage::ConnectionTerminated {
            reason: TerminationReason::ChallengeFailed
        }
    );
    assert_eq!(ws_expect_close(&mut ws, WAIT).await, Some(4001));
}

#[tokio::test]
async fn correct_answer_unblocks_gameplay() {
    let server = start_test_server(test_config()).await;
    let user_id = UserId::new();
    let mut ws = ws_join(&server, user_id, "Mina").await;

    server.app().use_cases.challenge.issue_for_user(user_id).await;
    let word = expect_challenge(&mut ws).await;

    ws_send_client(&mut ws, &ClientMessage::ChallengeResponse { text: word }).await;
    ws_expect_message(&mut ws, WAIT, |m| matches!(m, ServerMessage::ChallengePassed)).await;

    ws_send_client(&mut ws, &ClientMessage::FishingAttempt { nonce: None }).await;
    let msg = ws_expect_message(&mut ws, WAIT, |m| {
        matches!(m, ServerMessage::FishingResult { .. }) || rejection_reason(m).is_some()
    })
    .await;
    assert!(matches!(msg, ServerMessage::FishingResult { .. }), "unexpected: {msg:?}");
}
