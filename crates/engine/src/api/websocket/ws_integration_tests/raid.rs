use super::*;

use tidewatch_domain::{CombatTarget, EncounterKind, RaidTier, SessionPhase};

/// Put a low-health boss in the beginner room and wait until it is attackable.
async fn spawn_dummy(server: &TestServer) -> uuid::Uuid {
    let combat = &server.app().use_cases.combat;
    let tier = RaidTier::Beginner;
    let session = combat
        .spawn(
            tier.room_id(),
            EncounterKind::Raid { tier },
            vec![CombatTarget::new("Training Dummy", 12).unwrap()],
        )
        .await
        .unwrap();

    tokio::time::timeout(WAIT, async {
        while combat.snapshot(session.id()).await.map(|s| s.phase()) != Some(SessionPhase::Active) {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();
    session.id().to_uuid()
}

#[tokio::test]
async fn summon_into_an_occupied_room_is_rejected() {
    let server = start_test_server(test_config()).await;
    spawn_dummy(&server).await;
    let mut ws = ws_join(&server, UserId::new(), "Mina").await;

    ws_send_client(
        &mut ws,
        &ClientMessage::RaidSummon {
            room_id: "raid:beginner".to_string(),
            nonce: None,
        },
    )
    .await;
    let msg = ws_expect_message(&mut ws, WAIT, |m| rejection_reason(m).is_some()).await;
    assert_eq!(rejection_reason(&msg), Some(RejectionCode::AlreadyActive));
}

#[tokio::test]
async fn attacks_defeat_the_boss_and_pay_the_damage_dealer() {
    let server = start_test_server(test_config()).await;
    let session_id = spawn_dummy(&server).await;

    let attacker_id = UserId::new();
    let mut attacker = ws_join(&server, attacker_id, "Alice").await;
    let watcher_id = UserId::new();
    let mut watcher = ws_join(&server, watcher_id, "Bob").await;
    ws_send_client(
        &mut watcher,
        &ClientMessage::SubscribeRoom {
            room_id: "raid:beginner".to_string(),
        },
    )
    .await;
    ws_expect_message(&mut watcher, WAIT, |m| matches!(m, ServerMessage::Subscribed { .. })).await;

    let mut defeated = false;
    for _ in 0..12 {
        ws_send_client(
            &mut attacker,
            &ClientMessage::RaidAttack {
                session_id,
                nonce: None,
            },
        )
        .await;
        let msg = ws_expect_message(&mut attacker, WAIT, |m| {
            matches!(
                m,
                ServerMessage::CombatResult {
                    payload: CombatPayload::Attack { .. },
                    ..
                }
            ) || rejection_reason(m).is_some()
        })
        .await;
        match msg {
            ServerMessage::CombatResult {
                payload: CombatPayload::Attack { session_health, .. },
                ..
            } => {
                if session_health == 0 {
                    defeated = true;
                    break;
                }
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }
    assert!(defeated, "boss survived every attack");

    for ws in [&mut attacker, &mut watcher] {
        let msg = ws_expect_message(ws, WAIT, |m| {
            matches!(
                m,
                ServerMessage::CombatResult {
                    payload: CombatPayload::Defeated { .. },
                    ..
                }
            )
        })
        .await;
        match msg {
            ServerMessage::CombatResult {
                payload: CombatPayload::Defeated { finisher, rankings, .. },
                ..
            } => {
                assert_eq!(finisher, Some(attacker_id.to_uuid()));
                assert_eq!(rankings.len(), 1);
                assert_eq!(rankings[0].damage, 12);
            }
            other => panic!("unexpected message: {other:?}"),
        }

        let msg = ws_expect_message(ws, WAIT, |m| {
            matches!(
                m,
                ServerMessage::CombatResult {
                    payload: CombatPayload::RewardsDistributed { .. },
                    ..
                }
            )
        })
        .await;
        match msg {
            ServerMessage::CombatResult {
                payload: CombatPayload::RewardsDistributed { rewards },
                ..
            } => {
                assert!(!rewards.is_empty());
                assert!(rewards.iter().all(|r| r.user_id == attacker_id.to_uuid()));
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    // Late attacks see the boss as gone.
    ws_send_client(
        &mut attacker,
        &ClientMessage::RaidAttack {
            session_id,
            nonce: None,
        },
    )
    .await;
    let msg = ws_expect_message(&mut attacker, WAIT, |m| rejection_reason(m).is_some()).await;
    assert_eq!(rejection_reason(&msg), Some(RejectionCode::TargetDefeated));
}
