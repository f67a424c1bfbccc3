use super::*;

#[tokio::test]
async fn chat_reaches_everyone_in_the_lobby() {
    let server = start_test_server(test_config()).await;
    let mut alice = ws_join(&server, UserId::new(), "Alice").await;
    let mut bob = ws_join(&server, UserId::new(), "Bob").await;

    ws_send_client(
        &mut alice,
        &ClientMessage::ChatMessage {
            content: "  hello harbor  ".to_string(),
            nonce: None,
        },
    )
    .await;

    for ws in [&mut alice, &mut bob] {
        let msg = ws_expect_message(ws, WAIT, |m| {
            matches!(
                m,
                ServerMessage::StateUpdate {
                    payload: RoomPayload::Chat { .. },
                    ..
                }
            )
        })
        .await;
        match msg {
            ServerMessage::StateUpdate {
                room_id,
                payload: RoomPayload::Chat {
                    display_name,
                    content,
                    ..
                },
                ..
            } => {
                assert_eq!(room_id, "lobby");
                assert_eq!(display_name, "Alice");
                assert_eq!(content, "hello harbor");
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }
}

#[tokio::test]
async fn second_cast_inside_the_cooldown_is_rejected() {
    let server = start_test_server(test_config()).await;
    let mut ws = ws_join(&server, UserId::new(), "Mina").await;

    ws_send_client(&mut ws, &ClientMessage::FishingAttempt { nonce: None }).await;
    let first = ws_expect_message(&mut ws, WAIT, |m| {
        matches!(m, ServerMessage::FishingResult { .. }) || rejection_reason(m).is_some()
    })
    .await;
    assert!(
        matches!(first, ServerMessage::FishingResult { total_fish: 1, .. }),
        "unexpected first cast: {first:?}"
    );

    ws_send_client(&mut ws, &ClientMessage::FishingAttempt { nonce: None }).await;
    let second = ws_expect_message(&mut ws, WAIT, |m| rejection_reason(m).is_some()).await;
    match second {
        ServerMessage::Rejected {
            action,
            reason,
            retry_after_ms,
            ..
        } => {
            assert_eq!(action, "fishing_attempt");
            assert_eq!(reason, RejectionCode::CooldownActive);
            assert!(retry_after_ms.is_some_and(|ms| ms > 0));
        }
        other => panic!("unexpected message: {other:?}"),
    }
}

#[tokio::test]
async fn replayed_nonce_is_rejected() {
    let server = start_test_server(test_config()).await;
    let mut ws = ws_join(&server, UserId::new(), "Mina").await;
    let chat = ClientMessage::ChatMessage {
        content: "once".to_string(),
        nonce: Some("n-1".to_string()),
    };

    ws_send_client(&mut ws, &chat).await;
    ws_expect_message(&mut ws, WAIT, |m| matches!(m, ServerMessage::StateUpdate { .. })).await;

    ws_send_client(&mut ws, &chat).await;
    let msg = ws_expect_message(&mut ws, WAIT, |m| rejection_reason(m).is_some()).await;
    assert_eq!(rejection_reason(&msg), Some(RejectionCode::Replayed));
}

#[tokio::test]
async fn subscriptions_are_acknowledged() {
    let server = start_test_server(test_config()).await;
    let mut ws = ws_join(&server, UserId::new(), "Mina").await;

    ws_send_client(
        &mut ws,
        &ClientMessage::SubscribeRoom {
            room_id: "raid:advanced".to_string(),
        },
    )
    .await;
    let msg = ws_expect_message(&mut ws, WAIT, |m| matches!(m, ServerMessage::Subscribed { .. })).await;
    assert_eq!(
        msg,
        ServerMessage::Subscribed {
            room_id: "raid:advanced".to_string()
        }
    );

    ws_send_client(
        &mut ws,
        &ClientMessage::UnsubscribeRoom {
            room_id: "raid:advanced".to_string(),
        },
    )
    .await;
    ws_expect_message(&mut ws, WAIT, |m| matches!(m, ServerMessage::Unsubscribed { .. })).await;

    ws_send_client(
        &mut ws,
        &ClientMessage::SubscribeRoom {
            room_id: "no spaces allowed".to_string(),
        },
    )
    .await;
    let msg = ws_expect_message(&mut ws, WAIT, |m| rejection_reason(m).is_some()).await;
    assert_eq!(rejection_reason(&msg), Some(RejectionCode::Malformed));
}
