use cloudavenue::alb::{PoolHealthMonitor, PoolMember, PoolModelRequest};
use cloudavenue::domain::{HealthMonitorType, PoolAlgorithm};
use cloudavenue::ErrorKind;

use crate::support::{FakeAlb, GATEWAY, OTHER_GATEWAY};

fn web_pool() -> PoolModelRequest {
    let mut request = PoolModelRequest::new("web", GATEWAY);
    request.algorithm = Some(PoolAlgorithm::RoundRobin);
    request.default_port = Some(8080);
    request.members = Some(vec![PoolMember::new("10.0.0.10"), PoolMember::new("10.0.0.11")]);
    request.health_monitors = Some(vec![PoolHealthMonitor::new(HealthMonitorType::Http)]);
    request
}

#[test]
fn algorithm_with_a_space_is_rejected() {
    let err = "LEAST CONNECTIONS".parse::<PoolAlgorithm>().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!("LEAST_CONNECTIONS".parse::<PoolAlgorithm>().unwrap(), PoolAlgorithm::LeastConnections);
}

#[tokio::test]
async fn members_and_member_group_are_exclusive() {
    let fake = FakeAlb::new();
    let mut request = web_pool();
    request.member_group_id =
        Some("urn:vcloud:firewallGroup:55555555-5555-4555-8555-555555555555".to_string());

    let err = fake.manager().pools.create(request).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(fake.calls(), 0);
    assert_eq!(fake.refreshes(), 0);
}

#[tokio::test]
async fn create_then_get_by_name_and_id() {
    let fake = FakeAlb::new();
    let pools = fake.manager().pools;

    let created = pools.create(web_pool()).await.unwrap();
    assert_eq!(created.name, "web");
    assert_eq!(created.edge_gateway_id, GATEWAY);
    assert_eq!(created.algorithm, Some(PoolAlgorithm::RoundRobin));
    assert_eq!(created.members.as_ref().map(Vec::len), Some(2));

    let by_name = pools.get(GATEWAY, "web").await.unwrap();
    assert_eq!(by_name.id, created.id);

    // URN lookups ignore the gateway argument
    let by_id = pools.get(OTHER_GATEWAY, &created.id).await.unwrap();
    assert_eq!(by_id, created);
}

#[tokio::test]
async fn absent_numerics_stay_absent() {
    let fake = FakeAlb::new();
    let created = fake.manager().pools.create(PoolModelRequest::new("bare", GATEWAY)).await.unwrap();

    let stored = fake.stored_pool(&created.id).unwrap();
    assert_eq!(stored.default_port, None);
    assert_eq!(stored.graceful_timeout_period, None);
    assert_eq!(created.default_port, None);
}

#[tokio::test]
async fn update_forces_the_id() {
    let fake = FakeAlb::new();
    let pools = fake.manager().pools;
    let created = pools.create(web_pool()).await.unwrap();

    let mut request = web_pool();
    request.algorithm = Some(PoolAlgorithm::LeastConnections);
    let updated = pools.update(&created.id, request).await.unwrap();

    assert_eq!(updated.id, created.id);
    assert_eq!(updated.algorithm, Some(PoolAlgorithm::LeastConnections));
    assert_eq!(fake.stored_pool(&created.id).unwrap().algorithm.as_deref(), Some("LEAST_CONNECTIONS"));
}

#[tokio::test]
async fn update_with_wrong_kind_fails_before_transport() {
    let fake = FakeAlb::new();
    let err = fake
        .manager()
        .pools
        .update(
            "urn:vcloud:loadBalancerVirtualService:11111111-1111-4111-8111-111111111111",
            web_pool(),
        )
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InvalidFormat);
    assert_eq!(fake.calls(), 0);
}

#[tokio::test]
async fn list_and_delete() {
    let fake = FakeAlb::new();
    let pools = fake.manager().pools;

    let first = pools.create(web_pool()).await.unwrap();
    pools.create(PoolModelRequest::new("api", GATEWAY)).await.unwrap();
    pools.create(PoolModelRequest::new("elsewhere", OTHER_GATEWAY)).await.unwrap();

    assert_eq!(pools.list(GATEWAY).await.unwrap().len(), 2);

    pools.delete(&first.id).await.unwrap();
    assert_eq!(pools.list(GATEWAY).await.unwrap().len(), 1);

    let err = pools.delete(&first.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn missing_name_is_not_found() {
    let fake = FakeAlb::new();
    let err = fake.manager().pools.get(GATEWAY, "nope").await.unwrap_err();
    assert!(err.is_not_found());
}
