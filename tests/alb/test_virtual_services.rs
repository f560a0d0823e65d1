use cloudavenue::alb::{VirtualServiceModelRequest, VirtualServicePort};
use cloudavenue::domain::{ApplicationProfileType, TransportType};
use cloudavenue::ErrorKind;

use crate::support::{FakeAlb, CERTIFICATE, GATEWAY, SEG, SEG_2};

const POOL: &str = "urn:vcloud:loadBalancerPool:66666666-6666-4666-8666-666666666666";

fn front(profile: ApplicationProfileType) -> VirtualServiceModelRequest {
    VirtualServiceModelRequest::new(
        "front",
        GATEWAY,
        profile,
        POOL,
        "192.168.1.10",
        vec![VirtualServicePort::single(443, TransportType::TcpProxy)],
    )
}

#[tokio::test]
async fn https_without_certificate_fails_before_transport() {
    let fake = FakeAlb::seeded();
    let err = fake
        .manager()
        .virtual_services
        .create(front(ApplicationProfileType::Https))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(err.to_string().contains("certificate_id"), "{}", err);
    assert_eq!(fake.calls(), 0);
    assert_eq!(fake.refreshes(), 0);
}

#[tokio::test]
async fn port_end_must_exceed_start() {
    let fake = FakeAlb::seeded();
    let mut request = front(ApplicationProfileType::Http);
    request.service_ports = vec![VirtualServicePort::range(8443, 8000, TransportType::TcpProxy)];

    let err = fake.manager().virtual_services.create(request).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(fake.calls(), 0);
}

#[tokio::test]
async fn create_uses_the_only_bound_service_engine_group() {
    let fake = FakeAlb::seeded();
    let mut request = front(ApplicationProfileType::Https);
    request.certificate_id = Some(CERTIFICATE.to_string());

    let created = fake.manager().virtual_services.create(request).await.unwrap();
    assert_eq!(created.service_engine_group_id, SEG);
    assert_eq!(created.application_profile, ApplicationProfileType::Https);
    assert_eq!(created.certificate_id.as_deref(), Some(CERTIFICATE));

    let stored = fake.stored_virtual_service(&created.id).unwrap();
    assert_eq!(stored.service_ports[0].ssl_enabled, Some(true));
}

#[tokio::test]
async fn several_service_engine_groups_need_an_explicit_choice() {
    let fake = FakeAlb::seeded();
    fake.bind_service_engine_group(SEG_2, "seg-2");
    let services = fake.manager().virtual_services;

    let err = services.create(front(ApplicationProfileType::Http)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let mut request = front(ApplicationProfileType::Http);
    request.service_engine_group_id = Some(SEG_2.to_string());
    let created = services.create(request).await.unwrap();
    assert_eq!(created.service_engine_group_id, SEG_2);
}

#[tokio::test]
async fn gateway_without_load_balancer_is_not_found() {
    let fake = FakeAlb::new();
    let err = fake
        .manager()
        .virtual_services
        .create(front(ApplicationProfileType::L4Tcp))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn get_update_list_and_delete() {
    let fake = FakeAlb::new();
    fake.bind_service_engine_group(SEG, "seg-default");
    let services = fake.manager().virtual_services;

    let created = services.create(front(ApplicationProfileType::Http)).await.unwrap();
    assert_eq!(services.get(GATEWAY, "front").await.unwrap(), created);
    assert_eq!(services.get(GATEWAY, &created.id).await.unwrap(), created);

    let mut request = front(ApplicationProfileType::Http);
    request.service_ports = vec![VirtualServicePort::range(8080, 8090, TransportType::TcpProxy)];
    let updated = services.update(&created.id, request).await.unwrap();
    assert_eq!(updated.id, created.id);
    assert_eq!(updated.service_ports[0].end, Some(8090));

    assert_eq!(services.list(GATEWAY).await.unwrap().len(), 1);

    services.delete(&created.id).await.unwrap();
    assert!(services.list(GATEWAY).await.unwrap().is_empty());
    assert!(services.get(GATEWAY, &created.id).await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn create_and_update_refresh_once_each() {
    let fake = FakeAlb::new();
    fake.bind_service_engine_group(SEG, "seg-default");
    let services = fake.manager().virtual_services;

    let created = services.create(front(ApplicationProfileType::Http)).await.unwrap();
    assert_eq!(fake.refreshes(), 1);

    services.update(&created.id, front(ApplicationProfileType::Http)).await.unwrap();
    assert_eq!(fake.refreshes(), 2);
}
