use cloudavenue::alb::policies::{
    ConnectionAction, HeaderRewrite, HttpPolicies, HttpProtocol, LocationRewriteAction,
    RateLimitAction, RateLimitSubAction, RedirectAction, RequestMatchCriteria, RequestPolicy,
    RequestPolicyAction, RequestPolicyFields, ResponsePolicy, ResponseContentType,
    SecurityPolicy, SecurityPolicyAction, SecurityPolicyFields, SendResponseAction,
    SetMatchOperator, StatusCodeMatch, StringMatch, StringMatchOperator, UrlRewriteAction,
};
use cloudavenue::upstream::http_rules as wire;
use cloudavenue::upstream::{HttpRequestRule, HttpRuleList};
use cloudavenue::ErrorKind;

use crate::support::{FakeAlb, VIRTUAL_SERVICE};

fn redirect_rule() -> HttpRequestRule {
    HttpRequestRule {
        name: "to-example".to_string(),
        active: true,
        logging: false,
        match_criteria: wire::RequestMatchCriteria {
            protocol: Some("HTTP".to_string()),
            ..Default::default()
        },
        redirect_action: Some(wire::RedirectAction {
            protocol: "HTTP".to_string(),
            host: Some("example.com".to_string()),
            port: Some(80),
            status_code: 301,
            path: Some("/n".to_string()),
            keep_query: true,
        }),
        ..Default::default()
    }
}

#[tokio::test]
async fn get_translates_a_single_redirect_rule() {
    let fake = FakeAlb::seeded();
    fake.set_request_rules(VIRTUAL_SERVICE, HttpRuleList::new(vec![redirect_rule()]));

    let chain = fake.manager().request_policies.get(VIRTUAL_SERVICE).await.unwrap();
    let policies = chain.policies.expect("policies present");
    assert_eq!(policies.len(), 1);

    let policy = &policies[0];
    assert_eq!(policy.criteria.protocol, Some(HttpProtocol::Http));
    assert_eq!(
        policy.criteria,
        RequestMatchCriteria { protocol: Some(HttpProtocol::Http), ..Default::default() }
    );
    match &policy.action {
        RequestPolicyAction::Redirect(redirect) => {
            assert_eq!(redirect.port, Some(80));
            assert_eq!(redirect.status_code, 301);
            assert!(redirect.keep_query);
        }
        other => panic!("unexpected action {:?}", other),
    }
    assert_eq!(fake.refreshes(), 1);
}

#[tokio::test]
async fn get_without_upstream_list_yields_nil_policies() {
    let fake = FakeAlb::seeded();
    let chain = fake.manager().request_policies.get(VIRTUAL_SERVICE).await.unwrap();
    assert!(chain.policies.is_none());
    assert_eq!(chain.virtual_service_id, VIRTUAL_SERVICE);
}

#[tokio::test]
async fn update_round_trips_request_policies_in_order() {
    let fake = FakeAlb::seeded();
    let manager = fake.manager().request_policies;

    let policies = HttpPolicies::new(
        VIRTUAL_SERVICE,
        vec![
            RequestPolicy::new(
                "https",
                RequestPolicyAction::Redirect(RedirectAction::new(HttpProtocol::Https, 443, 302)),
            )
            .with_criteria(RequestMatchCriteria {
                path: Some(StringMatch {
                    operator: StringMatchOperator::BeginsWith,
                    values: vec!["/secure".to_string()],
                }),
                ..Default::default()
            }),
            RequestPolicy::new(
                "rewrite",
                RequestPolicyAction::Rewrite {
                    header_rewrites: vec![HeaderRewrite::add("X-Env", "prod"), HeaderRewrite::remove("Server")],
                    url_rewrite: Some(UrlRewriteAction {
                        host_header: Some("backend.local".to_string()),
                        path: Some("/v2".to_string()),
                        query: None,
                        keep_query: true,
                    }),
                },
            ),
        ],
    );

    let written = manager.update(&policies).await.unwrap();
    assert_eq!(written, policies);

    let read = manager.get(VIRTUAL_SERVICE).await.unwrap();
    assert_eq!(read, policies);
    assert_eq!(read.policies.unwrap()[0].name, "https");
}

#[tokio::test]
async fn delete_leaves_an_empty_chain() {
    let fake = FakeAlb::seeded();
    fake.set_request_rules(VIRTUAL_SERVICE, HttpRuleList::new(vec![redirect_rule()]));
    let manager = fake.manager().request_policies;

    manager.delete(VIRTUAL_SERVICE).await.unwrap();

    assert_eq!(fake.request_rules(VIRTUAL_SERVICE).unwrap().values, Some(Vec::new()));
    let read = manager.get(VIRTUAL_SERVICE).await.unwrap();
    assert!(read.is_empty());
}

#[tokio::test]
async fn update_with_absent_chain_writes_an_empty_list() {
    let fake = FakeAlb::seeded();
    fake.set_request_rules(VIRTUAL_SERVICE, HttpRuleList::new(vec![redirect_rule()]));
    let manager = fake.manager().request_policies;

    let absent: HttpPolicies<RequestPolicy> =
        HttpPolicies { virtual_service_id: VIRTUAL_SERVICE.to_string(), policies: None };
    let written = manager.update(&absent).await.unwrap();

    assert_eq!(fake.request_rules(VIRTUAL_SERVICE).unwrap().values, Some(Vec::new()));
    assert_eq!(written.policies, Some(Vec::new()));
}

#[tokio::test]
async fn delete_with_empty_id_fails_before_transport() {
    let fake = FakeAlb::seeded();
    let err = fake.manager().request_policies.delete("").await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Empty);
    assert_eq!(fake.calls(), 0);
    assert_eq!(fake.refreshes(), 0);
}

#[tokio::test]
async fn malformed_id_fails_before_transport() {
    let fake = FakeAlb::seeded();
    let err = fake
        .manager()
        .security_policies
        .get("urn:vcloud:loadBalancerPool:11111111-1111-4111-8111-111111111111")
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InvalidFormat);
    assert_eq!(fake.calls(), 0);
}

#[tokio::test]
async fn unknown_virtual_service_is_not_found() {
    let fake = FakeAlb::seeded();
    let err = fake
        .manager()
        .response_policies
        .get("urn:vcloud:loadBalancerVirtualService:99999999-9999-4999-8999-999999999999")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn invalid_policy_fails_before_transport() {
    let fake = FakeAlb::seeded();
    let mut remove = HeaderRewrite::remove("Server");
    remove.value = Some("nginx".to_string());

    let policies = HttpPolicies::new(
        VIRTUAL_SERVICE,
        vec![RequestPolicy::new(
            "strip",
            RequestPolicyAction::Rewrite { header_rewrites: vec![remove], url_rewrite: None },
        )],
    );

    let err = fake.manager().request_policies.update(&policies).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(err.to_string().contains("policies[0].action"), "{}", err);
    assert_eq!(fake.calls(), 0);
}

#[test]
fn redirect_combined_with_url_rewrite_is_rejected() {
    let fields = RequestPolicyFields {
        name: "mixed".to_string(),
        active: true,
        redirect_action: Some(RedirectAction::new(HttpProtocol::Http, 80, 301)),
        url_rewrite_action: Some(UrlRewriteAction::default()),
        ..Default::default()
    };
    assert_eq!(RequestPolicy::try_from(fields).unwrap_err().kind(), ErrorKind::Validation);
}

#[test]
fn connection_with_rate_limit_is_rejected() {
    let fields = SecurityPolicyFields {
        name: "mixed".to_string(),
        active: true,
        connection_action: Some(ConnectionAction::Allow),
        rate_limit_action: Some(RateLimitAction::new(10, 1)),
        ..Default::default()
    };
    assert_eq!(SecurityPolicy::try_from(fields).unwrap_err().kind(), ErrorKind::Validation);
}

#[tokio::test]
async fn response_location_rewrite_round_trips() {
    let fake = FakeAlb::seeded();
    let manager = fake.manager().response_policies;

    let mut policy = ResponsePolicy::new("location");
    policy.location_rewrite = Some(LocationRewriteAction {
        protocol: HttpProtocol::Http,
        host: Some("example.com".to_string()),
        port: Some(80),
        path: Some("/newpath".to_string()),
        keep_query: true,
    });
    policy.criteria.status_code = Some(StatusCodeMatch {
        operator: SetMatchOperator::IsIn,
        status_codes: vec!["200".to_string(), "301-303".to_string()],
    });

    let policies = HttpPolicies::new(VIRTUAL_SERVICE, vec![policy]);
    let written = manager.update(&policies).await.unwrap();
    assert_eq!(written, policies);
    assert_eq!(manager.get(VIRTUAL_SERVICE).await.unwrap(), policies);
}

#[tokio::test]
async fn security_rate_limit_sub_actions_update() {
    let fake = FakeAlb::seeded();
    let manager = fake.manager().security_policies;

    let mut limit = RateLimitAction::new(100, 60);
    limit.action = Some(RateLimitSubAction::Redirect(RedirectAction {
        protocol: HttpProtocol::Https,
        host: Some("sorry.example.com".to_string()),
        port: Some(443),
        status_code: 302,
        path: Some("/busy".to_string()),
        keep_query: false,
    }));
    let policies = HttpPolicies::new(
        VIRTUAL_SERVICE,
        vec![SecurityPolicy::new("limit", SecurityPolicyAction::RateLimit(limit.clone()))],
    );
    assert_eq!(manager.update(&policies).await.unwrap(), policies);

    limit.action = Some(RateLimitSubAction::SendResponse(SendResponseAction {
        status_code: 404,
        content_type: Some(ResponseContentType::Json),
        content: Some(r#"{"k":"v"}"#.to_string()),
    }));
    let policies = HttpPolicies::new(
        VIRTUAL_SERVICE,
        vec![SecurityPolicy::new("limit", SecurityPolicyAction::RateLimit(limit))],
    );
    assert_eq!(manager.update(&policies).await.unwrap(), policies);
    assert_eq!(manager.get(VIRTUAL_SERVICE).await.unwrap(), policies);
}

#[tokio::test]
async fn every_operation_refreshes_first() {
    let fake = FakeAlb::seeded();
    let alb = fake.manager();

    alb.request_policies.get(VIRTUAL_SERVICE).await.unwrap();
    alb.response_policies.get(VIRTUAL_SERVICE).await.unwrap();
    alb.security_policies.delete(VIRTUAL_SERVICE).await.unwrap();

    assert_eq!(fake.refreshes(), 3);
}
