//! Circuit pushing against an in-memory controller

mod common;

use common::{InMemoryController, H1, H2, S1, S2};
use fl_circuit::{flow_name, CircuitPusher, CircuitRequest, Direction};
use fl_core::{
    AttachmentPoint, Error, ErrorKind, FlowMatch, FlowScope, StaticFlowEntry, ETHER_TYPE_IPV4,
};
use std::sync::atomic::Ordering;
use std::sync::Arc;

fn pusher(controller: &Arc<InMemoryController>) -> CircuitPusher {
    CircuitPusher::new(controller.clone(), controller.clone(), controller.clone())
}

fn two_switch_controller() -> InMemoryController {
    InMemoryController::new()
        .with_host(H1, S1, 1)
        .with_host(H2, S2, 2)
        .with_route(&[(S1, 1), (S1, 3), (S2, 1), (S2, 2)])
}

#[tokio::test]
async fn test_every_hop_pair_gets_two_flows() {
    let controller = Arc::new(two_switch_controller());

    let result = pusher(&controller)
        .push_circuit(&CircuitRequest::new("web", H1, H2))
        .await
        .unwrap();

    assert_eq!(result.len(), 4);
    assert_eq!(controller.installs(), 4);

    let directions: Vec<_> = result.flows.iter().map(|f| f.direction).collect();
    assert_eq!(
        directions,
        vec![
            Direction::Forward,
            Direction::Reverse,
            Direction::Forward,
            Direction::Reverse
        ]
    );

    let s1_forward = controller.flow(&flow_name("web", S1, Direction::Forward)).unwrap();
    let s1_reverse = controller.flow(&flow_name("web", S1, Direction::Reverse)).unwrap();
    let s2_forward = controller.flow(&flow_name("web", S2, Direction::Forward)).unwrap();
    let s2_reverse = controller.flow(&flow_name("web", S2, Direction::Reverse)).unwrap();
    assert_eq!(s1_forward.actions, "output=3");
    assert_eq!(s1_reverse.actions, "output=1");
    assert_eq!(s2_forward.actions, "output=2");
    assert_eq!(s2_reverse.actions, "output=1");
}

#[tokio::test]
async fn test_flow_names_follow_hop_roles() {
    let controller = Arc::new(
        InMemoryController::new()
            .with_host(H1, "S1", 1)
            .with_host(H2, "S2", 2)
            .with_route(&[("S2", 2), ("S1", 1)]),
    );

    let result = pusher(&controller)
        .push_circuit(&CircuitRequest::new("c1", H1, H2))
        .await
        .unwrap();

    assert_eq!(
        result.flow_names(),
        vec!["circuit_c1_S1_forward", "circuit_c1_S2_reverse"]
    );
    assert_eq!(result.flows[0].switch_dpid, "S1");
    assert_eq!(result.flows[1].switch_dpid, "S2");
}

#[tokio::test]
async fn test_forward_and_reverse_matches() {
    let controller = Arc::new(two_switch_controller());

    pusher(&controller)
        .push_circuit(&CircuitRequest::new("web", H1, H2))
        .await
        .unwrap();

    for name in controller.flow_names() {
        let entry = controller.flow(&name).unwrap();
        assert_eq!(entry.flow_match.ether_type.as_deref(), Some(ETHER_TYPE_IPV4));
        if name.ends_with("_forward") {
            assert_eq!(entry.flow_match.src_ip.as_deref(), Some(H1));
            assert_eq!(entry.flow_match.dst_ip.as_deref(), Some(H2));
        } else {
            assert_eq!(entry.flow_match.src_ip.as_deref(), Some(H2));
            assert_eq!(entry.flow_match.dst_ip.as_deref(), Some(H1));
        }
    }
}

#[tokio::test]
async fn test_repeated_push_replaces_flows() {
    let controller = Arc::new(two_switch_controller());
    let pusher = pusher(&controller);
    let request = CircuitRequest::new("web", H1, H2);

    let first = pusher.push_circuit(&request).await.unwrap();
    let count = controller.flow_count();
    let second = pusher.push_circuit(&request).await.unwrap();

    assert_eq!(count, 4);
    assert_eq!(controller.flow_count(), count);
    assert_eq!(first.flow_names(), second.flow_names());
    assert_eq!(controller.installs(), 8);
}

#[tokio::test]
async fn test_empty_route_installs_nothing() {
    let controller = Arc::new(
        InMemoryController::new()
            .with_host(H1, S1, 1)
            .with_host(H2, S2, 2),
    );

    let err = pusher(&controller)
        .push_circuit(&CircuitRequest::new("web", H1, H2))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::RouteNotFound);
    assert!(matches!(err, Error::RouteNotFound { hops: 0, .. }));
    assert_eq!(controller.installs(), 0);
}

#[tokio::test]
async fn test_odd_route_installs_nothing() {
    let controller = Arc::new(
        InMemoryController::new()
            .with_host(H1, S1, 1)
            .with_host(H2, S2, 2)
            .with_route(&[(S1, 1), (S1, 3), (S2, 1)]),
    );

    let err = pusher(&controller)
        .push_circuit(&CircuitRequest::new("web", H1, H2))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::RouteNotFound { hops: 3, .. }));
    assert_eq!(controller.installs(), 0);
}

#[tokio::test]
async fn test_unknown_source_stops_before_routing() {
    let controller = Arc::new(two_switch_controller());

    let err = pusher(&controller)
        .push_circuit(&CircuitRequest::new("web", "10.9.9.9", H2))
        .await
        .unwrap_err();

    assert_eq!(err, Error::HostNotFound("10.9.9.9".to_string()));
    assert_eq!(controller.device_lookups(), 1);
    assert_eq!(controller.route_lookups(), 0);
    assert_eq!(controller.installs(), 0);
}

#[tokio::test]
async fn test_host_without_attachment_point() {
    let controller = Arc::new(
        InMemoryController::new()
            .with_host(H1, S1, 1)
            .with_detached_host(H2)
            .with_route(&[(S1, 1), (S1, 2)]),
    );

    let err = pusher(&controller)
        .push_circuit(&CircuitRequest::new("web", H1, H2))
        .await
        .unwrap_err();

    assert_eq!(err, Error::AttachmentPointMissing(H2.to_string()));
    assert_eq!(err.kind(), ErrorKind::AttachmentPointMissing);
    assert_eq!(controller.route_lookups(), 0);
}

#[tokio::test]
async fn test_first_device_first_attachment_point_wins() {
    // H1: first device attached twice, second device elsewhere
    // H2: first device on S2/2, second device detached
    let controller = Arc::new(
        InMemoryController::new()
            .with_multihomed_host(H1, &[(S1, 1), (S2, 9)])
            .with_host(H1, S2, 7)
            .with_host(H2, S2, 2)
            .with_detached_host(H2)
            .with_route(&[(S1, 1), (S1, 3), (S2, 1), (S2, 2)]),
    );

    let result = pusher(&controller)
        .push_circuit(&CircuitRequest::new("web", H1, H2))
        .await
        .unwrap();

    assert_eq!(result.len(), 4);
    assert_eq!(
        controller.route_requests(),
        vec![(AttachmentPoint::new(S1, 1), AttachmentPoint::new(S2, 2))]
    );
}

#[tokio::test]
async fn test_destination_uses_its_first_attachment_point() {
    let controller = Arc::new(
        InMemoryController::new()
            .with_host(H1, S1, 1)
            .with_multihomed_host(H2, &[(S2, 2), (S1, 4)])
            .with_route(&[(S1, 1), (S1, 3), (S2, 1), (S2, 2)]),
    );

    pusher(&controller)
        .push_circuit(&CircuitRequest::new("web", H1, H2))
        .await
        .unwrap();

    let requests = controller.route_requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].1, AttachmentPoint::new(S2, 2));
}

#[tokio::test]
async fn test_failed_install_leaves_earlier_flows() {
    let controller = Arc::new(two_switch_controller().failing_install(3));

    let err = pusher(&controller)
        .push_circuit(&CircuitRequest::new("web", H1, H2))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Transport);
    assert_eq!(controller.installs(), 3);
    assert_eq!(
        controller.flow_names(),
        vec![
            flow_name("web", S1, Direction::Forward),
            flow_name("web", S1, Direction::Reverse),
        ]
    );
    assert_eq!(controller.delete_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_rollback_removes_earlier_flows() {
    let controller = Arc::new(two_switch_controller().failing_install(3));

    let err = pusher(&controller)
        .with_rollback(true)
        .push_circuit(&CircuitRequest::new("web", H1, H2))
        .await
        .unwrap_err();

    assert!(err.is_transport());
    assert_eq!(controller.flow_count(), 0);
    assert_eq!(controller.delete_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_rollback_on_repush_removes_rewritten_flows() {
    // Calls 1-4 are the first push; the re-push fails on its second install
    let controller = Arc::new(two_switch_controller().failing_install(6));
    let request = CircuitRequest::new("web", H1, H2);

    pusher(&controller).push_circuit(&request).await.unwrap();
    let err = pusher(&controller)
        .with_rollback(true)
        .push_circuit(&request)
        .await
        .unwrap_err();

    assert!(err.is_transport());
    assert!(controller
        .flow(&flow_name("web", S1, Direction::Forward))
        .is_none());
    assert_eq!(controller.flow_count(), 3);
}

#[tokio::test]
async fn test_rollback_failure_keeps_install_error() {
    let controller = Arc::new(
        two_switch_controller()
            .failing_install(2)
            .failing_delete(),
    );

    let err = pusher(&controller)
        .with_rollback(true)
        .push_circuit(&CircuitRequest::new("web", H1, H2))
        .await
        .unwrap_err();

    assert_eq!(err, Error::transport("connection reset by peer"));
    assert_eq!(controller.flow_count(), 1);
}

#[tokio::test]
async fn test_circuit_flows_only_match_own_prefix() {
    let controller = Arc::new(two_switch_controller());
    let pusher = pusher(&controller);
    pusher
        .push_circuit(&CircuitRequest::new("web", H1, H2))
        .await
        .unwrap();
    // Same leading characters, different circuit
    pusher
        .push_circuit(&CircuitRequest::new("web2", H1, H2))
        .await
        .unwrap();
    controller.seed_flow(StaticFlowEntry::new(
        "manual",
        S1,
        FlowMatch::ipv4(H1, H2),
        "output=4",
    ));

    let flows = pusher.circuit_flows("web").await.unwrap();

    assert_eq!(flows.len(), 4);
    assert!(flows
        .iter()
        .all(|f| f.flow_name == flow_name("web", &f.switch_dpid, f.direction)));
}

#[tokio::test]
async fn test_remove_circuit() {
    let controller = Arc::new(two_switch_controller());
    let pusher = pusher(&controller);
    pusher
        .push_circuit(&CircuitRequest::new("web", H1, H2))
        .await
        .unwrap();
    pusher
        .push_circuit(&CircuitRequest::new("db", H1, H2))
        .await
        .unwrap();

    let mut removed = pusher.remove_circuit("web").await.unwrap();
    removed.sort();

    assert_eq!(removed.len(), 4);
    assert!(removed.iter().all(|n| n.starts_with("circuit_web_")));
    assert_eq!(controller.flow_count(), 4);
    assert!(pusher.circuit_flows("web").await.unwrap().is_empty());
    assert_eq!(pusher.circuit_flows("db").await.unwrap().len(), 4);
}

#[tokio::test]
async fn test_switch_clear_drops_circuit_half() {
    use fl_circuit::FlowInstaller;

    let controller = Arc::new(two_switch_controller());
    let pusher = pusher(&controller);
    pusher
        .push_circuit(&CircuitRequest::new("web", H1, H2))
        .await
        .unwrap();

    controller
        .clear(&FlowScope::Switch(S1.to_string()))
        .await
        .unwrap();

    let flows = pusher.circuit_flows("web").await.unwrap();
    assert_eq!(flows.len(), 2);
    assert!(flows.iter().all(|f| f.switch_dpid == S2));
}
