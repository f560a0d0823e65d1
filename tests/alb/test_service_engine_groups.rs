use cloudavenue::ErrorKind;

use crate::support::{FakeAlb, GATEWAY, OTHER_GATEWAY, SEG, SEG_2};

#[tokio::test]
async fn list_returns_bound_groups() {
    let fake = FakeAlb::seeded();
    fake.bind_service_engine_group(SEG_2, "seg-2");

    let groups = fake.manager().service_engine_groups.list(GATEWAY).await.unwrap();
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].edge_gateway_id.as_deref(), Some(GATEWAY));
    assert_eq!(groups[0].max_virtual_services, Some(10));
}

#[tokio::test]
async fn get_by_name_or_id() {
    let fake = FakeAlb::seeded();
    fake.bind_service_engine_group(SEG_2, "seg-2");
    let groups = fake.manager().service_engine_groups;

    assert_eq!(groups.get(GATEWAY, "seg-2").await.unwrap().id, SEG_2);
    assert_eq!(groups.get(GATEWAY, SEG).await.unwrap().name, "seg-default");
    assert!(groups.get(GATEWAY, "missing").await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn unbound_gateway_is_not_found() {
    let fake = FakeAlb::seeded();
    let err = fake.manager().service_engine_groups.list(OTHER_GATEWAY).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert!(err.to_string().contains("not enabled"), "{}", err);
}

#[tokio::test]
async fn get_first_requires_a_single_binding() {
    let fake = FakeAlb::seeded();
    let groups = fake.manager().service_engine_groups;
    assert_eq!(groups.get_first(GATEWAY).await.unwrap().id, SEG);

    fake.bind_service_engine_group(SEG_2, "seg-2");
    let err = groups.get_first(GATEWAY).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[tokio::test]
async fn malformed_gateway_fails_before_transport() {
    let fake = FakeAlb::seeded();
    let groups = fake.manager().service_engine_groups;

    assert_eq!(groups.list("").await.unwrap_err().kind(), ErrorKind::Empty);
    assert_eq!(groups.list("gateway-1").await.unwrap_err().kind(), ErrorKind::InvalidFormat);
    assert_eq!(fake.calls(), 0);
}
