//! Hidden-information properties: a hiding agent's true position must never
//! reach a hunter client, through any path that produces views.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::time::{Duration, sleep};
use tracing_subscriber::EnvFilter;

use specter_engine::{
    BoardType, BroadcastGateway, FilteredSnapshot, GameStore, MemoryStore, PlayerId, Position,
    Role, SessionRegistry, SessionSettings,
};

/// Records every delivery, in arrival order.
#[derive(Debug, Default)]
struct RecordingGateway {
    deliveries: tokio::sync::Mutex<Vec<(String, BTreeMap<PlayerId, FilteredSnapshot>)>>,
}

#[async_trait]
impl BroadcastGateway for RecordingGateway {
    async fn deliver(&self, session_id: &str, views: BTreeMap<PlayerId, FilteredSnapshot>) {
        let mut deliveries = self.deliveries.lock().await;
        deliveries.push((session_id.to_string(), views));
    }
}

async fn settle() {
    // The outbox drains on a spawned task; give it a moment.
    sleep(Duration::from_millis(50)).await;
}

fn seated_registry(gateway: Arc<RecordingGateway>) -> SessionRegistry {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();
    let store: Arc<dyn GameStore> = Arc::new(MemoryStore::new());
    let registry = SessionRegistry::new(gateway, store);
    let settings = SessionSettings::new(BoardType::Museum, "gallery-heist", 20, 2);
    let session = registry
        .create_session("match-1".to_string(), settings)
        .expect("session creation");
    session
        .join("ghost".to_string(), Role::Agent, None)
        .expect("agent joins");
    session
        .join("h1".to_string(), Role::Hunter, None)
        .expect("hunter joins");
    session
        .join("h2".to_string(), Role::Hunter, None)
        .expect("hunter joins");
    registry
}

#[tokio::test]
async fn hunters_never_receive_a_hidden_agent_position() {
    let gateway = Arc::new(RecordingGateway::default());
    let registry = seated_registry(Arc::clone(&gateway));
    let session = registry.get("match-1").expect("live session");

    // Museum: (0,0) -> (1,0) is quiet and far from every hunter start.
    let update = session
        .submit_move("ghost", Position::new(0, 0), Position::new(1, 0))
        .expect("agent move");
    assert!(!update.revealed());
    settle().await;

    // Every delivery so far (joins included) must keep the position from
    // hunters.
    let deliveries = gateway.deliveries.lock().await;
    assert!(!deliveries.is_empty());
    for (_, views) in deliveries.iter() {
        for (recipient, snapshot) in views {
            if snapshot.role() == &Role::Hunter {
                assert!(!snapshot.agent_revealed());
                assert_eq!(
                    snapshot.agent_position(),
                    &None,
                    "hunter {recipient} received the hidden position"
                );
                // And the field is absent from the wire format entirely.
                let json = serde_json::to_value(snapshot).unwrap();
                assert!(json.get("agent_position").is_none());
            }
        }
    }

    // The move's own delivery carries the new position to the agent alone.
    let (_, final_views) = deliveries.last().expect("delivery for the move");
    let agent_view = final_views.get("ghost").expect("agent view");
    assert_eq!(agent_view.agent_position(), &Some(Position::new(1, 0)));
}

#[tokio::test]
async fn force_reveal_card_exposes_the_agent_for_the_round() {
    let gateway = Arc::new(RecordingGateway::default());
    let registry = seated_registry(Arc::clone(&gateway));
    let session = registry.get("match-1").expect("live session");

    session
        .submit_move("ghost", Position::new(0, 0), Position::new(1, 0))
        .expect("agent move");

    // Hunter h1 burns a motion scanner on their turn.
    let outcome = session
        .use_equipment("h1", "motion_scanner")
        .expect("card use");
    assert!(*outcome.update().revealed());

    let hunter_view = session.snapshot("h1").expect("snapshot");
    assert_eq!(hunter_view.agent_position(), &Some(Position::new(1, 0)));

    // The reveal lapses when the next round begins.
    session
        .submit_move("h1", Position::new(10, 7), Position::new(9, 7))
        .expect("hunter move");
    session
        .submit_move("h2", Position::new(0, 7), Position::new(1, 7))
        .expect("hunter move");

    let hunter_view = session.snapshot("h1").expect("snapshot");
    assert_eq!(hunter_view.agent_position(), &None);
}

#[tokio::test]
async fn per_player_delivery_order_follows_round_order() {
    let gateway = Arc::new(RecordingGateway::default());
    let registry = seated_registry(Arc::clone(&gateway));
    let session = registry.get("match-1").expect("live session");

    let agent_legs = [
        (Position::new(0, 0), Position::new(1, 0)),
        (Position::new(1, 0), Position::new(2, 0)),
    ];
    let mut h1 = Position::new(10, 7);
    let mut h2 = Position::new(0, 7);
    for (from, to) in agent_legs {
        session.submit_move("ghost", from, to).expect("agent move");
        let next = Position::new(h1.x - 1, h1.y);
        session.submit_move("h1", h1, next).expect("hunter move");
        h1 = next;
        let next = Position::new(h2.x + 1, h2.y);
        session.submit_move("h2", h2, next).expect("hunter move");
        h2 = next;
    }
    settle().await;

    let deliveries = gateway.deliveries.lock().await;
    for player in ["ghost", "h1", "h2"] {
        let rounds: Vec<u32> = deliveries
            .iter()
            .filter_map(|(_, views)| views.get(player))
            .map(|snapshot| *snapshot.current_round())
            .collect();
        assert!(
            rounds.windows(2).all(|pair| pair[0] <= pair[1]),
            "rounds for {player} arrived out of order: {rounds:?}"
        );
        assert_eq!(rounds.last(), Some(&3));
    }
}
