mod common;

use std::sync::Arc;

use rcgen::{date_time_ymd, DistinguishedName, DnType, ExtendedKeyUsagePurpose};
use trustpin_engine as tp;
use tp::{OpenSslSystemVerifier, RejectReason, SystemVerifier, TrustPolicy, TrustPolicyEngine};

fn anchored(anchors: &[&common::Issued]) -> TrustPolicyEngine {
    let anchors = anchors.iter().map(|a| a.parsed()).collect();
    TrustPolicyEngine::new(TrustPolicy::system_with_anchors(anchors).unwrap()).unwrap()
}

fn system_failure(res: &tp::VerificationResult) -> &str {
    match res.reason() {
        Some(RejectReason::SystemValidationFailed { detail }) => detail,
        other => panic!("expected system validation failure, got {other:?}"),
    }
}

#[test]
fn anchored_root_accepts_valid_chain() {
    let pki = common::pki("localhost");
    let res = anchored(&[&pki.root]).verify(&pki.chain(), "localhost");
    assert!(res.is_accepted(), "{res:?}");
}

#[test]
fn hostname_must_match_leaf_san() {
    let pki = common::pki("localhost");
    let res = anchored(&[&pki.root]).verify(&pki.chain(), "example.org");
    assert!(system_failure(&res).contains("not valid for host example.org"));
}

#[test]
fn hostname_check_is_case_insensitive() {
    let pki = common::pki("api.example.com");
    assert!(anchored(&[&pki.root]).verify(&pki.chain(), "API.Example.COM").is_accepted());
}

#[test]
fn untrusted_root_is_rejected() {
    let pki = common::pki("localhost");
    let other_root = common::root_ca("Somebody Else");
    let res = anchored(&[&other_root]).verify(&pki.chain(), "localhost");
    system_failure(&res);
}

#[test]
fn missing_intermediate_is_rejected() {
    let pki = common::pki("localhost");
    let leaf_only = common::chain_of(&[&pki.leaf.der]);
    let res = anchored(&[&pki.root]).verify(&leaf_only, "localhost");
    system_failure(&res);
}

#[test]
fn intermediate_can_serve_as_anchor() {
    let pki = common::pki("localhost");
    let res = anchored(&[&pki.intermediate]).verify(&pki.chain(), "localhost");
    assert!(res.is_accepted(), "{res:?}");
}

fn leaf_without_san(root: &common::Issued, common_name: &str) -> common::Issued {
    common::leaf_signed_by(root, "localhost", |p| {
        p.subject_alt_names.clear();
        let mut dn = DistinguishedName::new();
        dn.push(DnType::CommonName, common_name);
        p.distinguished_name = dn;
    })
}

#[test]
fn common_name_used_when_leaf_has_no_san() {
    let root = common::root_ca("TrustPin Test Root");
    let leaf = leaf_without_san(&root, "localhost");
    let res = anchored(&[&root]).verify(&common::chain_of(&[&leaf.der]), "localhost");
    assert!(res.is_accepted(), "{res:?}");
}

#[test]
fn common_name_with_embedded_nul_never_matches() {
    let root = common::root_ca("TrustPin Test Root");
    let leaf = leaf_without_san(&root, "localhost\0.attacker.test");
    let chain = common::chain_of(&[&leaf.der]);
    let engine = anchored(&[&root]);
    for host in ["localhost", "localhost\0.attacker.test"] {
        let res = engine.verify(&chain, host);
        assert!(system_failure(&res).contains("not valid for host"), "{host:?}");
    }
    // Logged subjects keep everything after the NUL.
    assert_eq!(leaf.parsed().subject(), "CN=localhost\\0.attacker.test");
}

#[test]
fn client_auth_only_leaf_is_not_a_server_certificate() {
    let root = common::root_ca("TrustPin Test Root");
    let leaf = common::leaf_signed_by(&root, "localhost", |p| {
        p.extended_key_usages = vec![ExtendedKeyUsagePurpose::ClientAuth];
    });
    let res = anchored(&[&root]).verify(&common::chain_of(&[&leaf.der]), "localhost");
    system_failure(&res);
}

#[test]
fn server_auth_leaf_is_accepted() {
    let root = common::root_ca("TrustPin Test Root");
    let leaf = common::leaf_signed_by(&root, "localhost", |p| {
        p.extended_key_usages = vec![ExtendedKeyUsagePurpose::ServerAuth, ExtendedKeyUsagePurpose::ClientAuth];
    });
    let res = anchored(&[&root]).verify(&common::chain_of(&[&leaf.der]), "localhost");
    assert!(res.is_accepted(), "{res:?}");
}

#[test]
fn expired_leaf_is_rejected() {
    let root = common::root_ca("TrustPin Test Root");
    let leaf = common::leaf_signed_by(&root, "localhost", |p| {
        p.not_before = date_time_ymd(2000, 1, 1);
        p.not_after = date_time_ymd(2001, 1, 1);
    });
    let res = anchored(&[&root]).verify(&common::chain_of(&[&leaf.der]), "localhost");
    assert!(system_failure(&res).contains("expired"), "{res:?}");
}

#[test]
fn self_signed_leaf_not_trusted_without_anchor() {
    let pki = common::pki("localhost");
    let stray = common::self_signed("localhost");
    let res = anchored(&[&pki.root]).verify(&common::chain_of(&[&stray.der]), "localhost");
    system_failure(&res);
}

#[test]
fn empty_anchor_list_is_misconfigured() {
    let err = TrustPolicy::system_with_anchors(Vec::new()).unwrap_err();
    assert!(matches!(err, tp::EngineError::MisconfiguredPolicy(_)));
    let err = OpenSslSystemVerifier::with_anchors(&[]).unwrap_err();
    assert!(matches!(err, tp::EngineError::MisconfiguredPolicy(_)));
}

#[test]
fn platform_store_does_not_trust_test_root() {
    let pki = common::pki("localhost");
    let res = tp::verify_chain(&TrustPolicy::system_default(), &pki.chain(), "localhost");
    assert!(!res.is_accepted());
}

#[derive(Debug)]
struct RecordingVerifier {
    seen: std::sync::Mutex<Vec<String>>,
}

impl SystemVerifier for RecordingVerifier {
    fn validate(&self, _chain: &tp::CertificateChain, hostname: &str) -> Result<(), String> {
        self.seen.lock().unwrap().push(hostname.to_string());
        Ok(())
    }
}

#[test]
fn custom_system_verifier_receives_hostname() {
    let recorder = Arc::new(RecordingVerifier { seen: Default::default() });
    let engine = TrustPolicyEngine::with_system_verifier(TrustPolicy::system_default(), recorder.clone());
    let pki = common::pki("localhost");
    assert!(engine.verify(&pki.chain(), "localhost").is_accepted());
    assert_eq!(*recorder.seen.lock().unwrap(), vec!["localhost".to_string()]);
}

#[test]
fn pinned_policies_never_consult_system_store() {
    let recorder = Arc::new(RecordingVerifier { seen: Default::default() });
    let pki = common::pki("localhost");
    let policy = TrustPolicy::pinned_certificate(pki.leaf.parsed());
    let engine = TrustPolicyEngine::with_system_verifier(policy, recorder.clone());
    assert!(engine.verify(&pki.chain(), "localhost").is_accepted());
    assert!(recorder.seen.lock().unwrap().is_empty());
}
