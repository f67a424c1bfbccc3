use super::*;

#[tokio::test]
async fn join_replies_with_the_verified_identity() {
    let server = start_test_server(test_config()).await;
    let user_id = UserId::new();

    let mut ws = ws_connect(server.addr).await;
    ws_send_client(
        &mut ws,
        &ClientMessage::Join {
            token: server.token(user_id, "Mina", Role::Admin),
        },
    )
    .await;

    let joined = ws_expect_message(&mut ws, WAIT, |m| matches!(m, ServerMessage::Joined { .. })).await;
    assert_eq!(
        joined,
        ServerMessage::Joined {
            user_id: user_id.to_uuid(),
            display_name: "Mina".to_string(),
            role: Role::Admin,
        }
    );
    assert_eq!(server.state.connections.room_size(&tidewatch_domain::RoomId::lobby()), 1);
}

#[tokio::test]
async fn gameplay_before_join_is_a_malformed_handshake() {
    let server = start_test_server(test_config()).await;
    let mut ws = ws_connect(server.addr).await;

    ws_send_client(&mut ws, &ClientMessage::FishingAttempt { nonce: None }).await;

    let msg = ws_recv_server(&mut ws).await;
    assert_eq!(
        msg,
        ServerMessage::ConnectionTerminated {
            reason: TerminationReason::MalformedHandshake
        }
    );
    assert_eq!(ws_expect_close(&mut ws, WAIT).await, Some(4004));
}

#[tokio::test]
async fn invalid_token_is_rejected_and_closed() {
    let server = start_test_server(test_config()).await;
    let mut ws = ws_connect(server.addr).await;

    ws_send_client(
        &mut ws,
        &ClientMessage::Join {
            token: "not-a-token".to_string(),
        },
    )
    .await;

    let msg = ws_recv_server(&mut ws).await;
    assert_eq!(
        msg,
        ServerMessage::ConnectionTerminated {
            reason: TerminationReason::IdentityRejected
        }
    );
    assert_eq!(ws_expect_close(&mut ws, WAIT).await, Some(4003));
}

#[tokio::test]
async fn unparseable_frames_after_join_get_parse_error() {
    let server = start_test_server(test_config()).await;
    let mut ws = ws_join(&server, UserId::new(), "Mina").await;

    ws_send_raw(&mut ws, r#"{"type":"teleport"}"#).await;
    let msg = ws_expect_message(&mut ws, WAIT, |m| matches!(m, ServerMessage::Error { .. })).await;
    match msg {
        ServerMessage::Error { code, .. } => assert_eq!(code, PARSE_ERROR),
        other => panic!("unexpected message: {other:?}"),
    }

    // The connection survives a bad frame.
    ws_send_client(&mut ws, &ClientMessage::Heartbeat).await;
    let pong = ws_expect_message(&mut ws, WAIT, |m| matches!(m, ServerMessage::Pong)).await;
    assert_eq!(pong, ServerMessage::Pong);
}

#[tokio::test]
async fn second_join_is_rejected() {
    let server = start_test_server(test_config()).await;
    let user_id = UserId::new();
    let mut ws = ws_join(&server, user_id, "Mina").await;

    ws_send_client(
        &mut ws,
        &ClientMessage::Join {
            token: server.token(user_id, "Mina", Role::Registered),
        },
    )
    .await;
    let msg = ws_expect_message(&mut ws, WAIT, |m| rejection_reason(m).is_some()).await;
    assert_eq!(rejection_reason(&msg), Some(RejectionCode::Malformed));
}
