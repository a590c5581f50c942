//! End-to-end flows through the public API: registry -> room -> engine.

use pretty_assertions::assert_eq;
use serde_json::{json, Value};

use parlor_core::{Action, Player, Registry, Room, RoomStatus};

fn setup_room(game_type: &str, player_count: usize) -> (Room, Vec<String>) {
    let host = Player::new("Player 0");
    let mut room = Room::new("ABC234", game_type, host, 10);

    for i in 1..player_count {
        room.add_player(Player::new(&format!("Player {i}"))).unwrap();
    }

    let ordered: Vec<String> = room
        .players_by_join_order()
        .iter()
        .map(|p| p.id.clone())
        .collect();

    (room, ordered)
}

fn start(room: &mut Room, registry: &Registry, config: &[u8]) {
    let game = registry.create_game(&room.game_type).unwrap();
    let parsed = registry.parse_config(&room.game_type, config).unwrap();
    room.start_game(game, parsed.as_ref()).unwrap();
}

fn act(room: &mut Room, player_id: &str, action_type: &str, payload: Value) {
    room.process_action(player_id, &Action::new(action_type, payload))
        .unwrap();
}

fn phase_name(room: &Room) -> String {
    room.game.as_ref().unwrap().phase().name
}

fn public_state(room: &Room) -> Value {
    room.game.as_ref().unwrap().public_state().unwrap()
}

#[test]
fn test_werewolf_full_round() {
    let registry = Registry::with_builtin_games();
    let (mut room, players) = setup_room("werewolf", 6);

    // 6 players, 9 cards: one werewolf, one minion, four villagers dealt
    // somewhere among seer/robber/troublemaker center extras.
    let config = json!({
        "roles": [
            "werewolf", "minion", "villager", "villager", "villager", "villager",
            "seer", "robber", "troublemaker",
        ],
    });
    start(&mut room, &registry, config.to_string().as_bytes());
    assert_eq!(room.status, RoomStatus::Playing);
    assert_eq!(phase_name(&room), "role_reveal");

    // Every player sees exactly one private role card: their own.
    for player_id in &players {
        let role_events: Vec<_> = room
            .events_for_player(player_id)
            .into_iter()
            .filter(|e| e.event_type == "role_assigned")
            .collect();
        assert_eq!(role_events.len(), 1);
    }

    // Acknowledge gate: after the last acknowledgement the night begins.
    for (i, player_id) in players.iter().enumerate() {
        act(&mut room, player_id, "acknowledge_role", Value::Null);
        if i + 1 < players.len() {
            assert_eq!(phase_name(&room), "role_reveal");
        }
    }
    assert_eq!(phase_name(&room), "night");

    // Night -> day is host-driven.
    let host_id = room.host_id.clone();
    assert!(room
        .process_action(
            &players[players.len() - 1],
            &Action::new("advance_phase", Value::Null),
        )
        .is_err());
    act(&mut room, &host_id, "advance_phase", Value::Null);
    assert_eq!(phase_name(&room), "day");

    // Everyone votes for the same player; the tally closes the game.
    let target = players[1].clone();
    for player_id in &players {
        act(&mut room, player_id, "vote", json!({"target_id": target}));
    }

    assert_eq!(room.status, RoomStatus::Finished);
    let results = room.game.as_ref().unwrap().results();

    assert_eq!(results.final_state["eliminated"], json!([target]));

    // Winner set is consistent with the eliminated player's team.
    let roles = results.final_state["roles"].as_object().unwrap();
    let target_role = roles[&target].as_str().unwrap();
    let werewolf_died = matches!(target_role, "werewolf" | "minion");

    for winner in &results.winners {
        let role = roles[winner].as_str().unwrap();
        match results.win_reason.as_str() {
            "village_eliminated_werewolf" => {
                assert!(werewolf_died);
                assert!(!matches!(role, "werewolf" | "minion" | "tanner"));
            }
            "werewolf_team_survived" => {
                assert!(!werewolf_died);
                assert!(matches!(role, "werewolf" | "minion"));
            }
            other => panic!("unexpected win reason: {other}"),
        }
    }

    // The vote reveal is public; role cards never were.
    let public = room.public_events();
    assert!(public.iter().any(|e| e.event_type == "votes_revealed"));
    assert!(!public.iter().any(|e| e.event_type == "role_assigned"));
}

#[test]
fn test_avalon_rejection_round_rotates_leadership() {
    let registry = Registry::with_builtin_games();
    let (mut room, players) = setup_room("avalon", 5);

    let config = json!({
        "roles": ["merlin", "assassin", "loyal_servant", "loyal_servant", "minion"],
    });
    start(&mut room, &registry, config.to_string().as_bytes());

    for player_id in &players {
        act(&mut room, player_id, "acknowledge_role", Value::Null);
    }
    assert_eq!(phase_name(&room), "team_building");

    let leader = public_state(&room)["current_leader_id"]
        .as_str()
        .unwrap()
        .to_string();
    let leader_index = players.iter().position(|id| *id == leader).unwrap();

    // Quest 1 with 5 players takes a team of exactly 2.
    assert_eq!(public_state(&room)["required_team_size"], json!(2));
    act(
        &mut room,
        &leader,
        "propose_team",
        json!({"team_members": [players[0], players[1]]}),
    );

    for player_id in &players {
        act(&mut room, player_id, "vote_team", json!({"vote": "reject"}));
    }

    // Rejection counted, leadership passed to the next player in join order.
    let state = public_state(&room);
    assert_eq!(state["rejection_count"], json!(1));
    assert_eq!(state["phase"], json!("team_building"));
    assert_eq!(
        state["current_leader_id"],
        json!(players[(leader_index + 1) % players.len()])
    );

    // Four more rejected proposals hand Evil the game.
    for _ in 0..4 {
        let leader = public_state(&room)["current_leader_id"]
            .as_str()
            .unwrap()
            .to_string();
        act(
            &mut room,
            &leader,
            "propose_team",
            json!({"team_members": [players[0], players[1]]}),
        );
        for player_id in &players {
            act(&mut room, player_id, "vote_team", json!({"vote": "reject"}));
        }
    }

    assert_eq!(room.status, RoomStatus::Finished);
    let results = room.game.as_ref().unwrap().results();
    assert_eq!(results.win_reason, "five_consecutive_rejections");
    assert_eq!(results.winners.len(), 2);
}

#[test]
fn test_avalon_clean_quest_advances_and_rotates() {
    let registry = Registry::with_builtin_games();
    let (mut room, players) = setup_room("avalon", 5);

    let config = json!({
        "roles": ["merlin", "assassin", "loyal_servant", "loyal_servant", "minion"],
    });
    start(&mut room, &registry, config.to_string().as_bytes());

    for player_id in &players {
        act(&mut room, player_id, "acknowledge_role", Value::Null);
    }

    let leader = public_state(&room)["current_leader_id"]
        .as_str()
        .unwrap()
        .to_string();
    let leader_index = players.iter().position(|id| *id == leader).unwrap();

    let team = [players[0].clone(), players[1].clone()];
    act(
        &mut room,
        &leader,
        "propose_team",
        json!({"team_members": team}),
    );
    for player_id in &players {
        act(&mut room, player_id, "vote_team", json!({"vote": "approve"}));
    }
    assert_eq!(phase_name(&room), "quest_execution");

    for member in &team {
        act(
            &mut room,
            member,
            "play_quest_card",
            json!({"card": "success"}),
        );
    }

    // All-success quest: recorded as a win, quest number advanced by one,
    // leadership rotated.
    let state = public_state(&room);
    assert_eq!(state["quest_results"][0]["success"], json!(true));
    assert_eq!(state["quest_number"], json!(2));
    assert_eq!(state["good_quest_wins"], json!(1));
    assert_eq!(state["phase"], json!("team_building"));
    assert_eq!(
        state["current_leader_id"],
        json!(players[(leader_index + 1) % players.len()])
    );
}

#[test]
fn test_reset_game_returns_room_to_lobby() {
    let registry = Registry::with_builtin_games();
    let (mut room, players) = setup_room("werewolf", 3);

    let config = json!({
        "roles": ["werewolf", "seer", "villager", "villager", "robber", "drunk"],
    });
    start(&mut room, &registry, config.to_string().as_bytes());
    assert!(!room.event_log.is_empty());

    room.reset_game().unwrap();
    assert_eq!(room.status, RoomStatus::Waiting);
    assert!(room.game.is_none());
    assert!(room.event_log.is_empty());
    assert_eq!(room.player_count(), players.len());
}
