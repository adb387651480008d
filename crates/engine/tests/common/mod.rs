#![allow(dead_code)]

use std::io::Read;
use std::net::TcpListener;
use std::thread;
use std::time::Duration;

use openssl::pkey::PKey;
use openssl::ssl::{SslAcceptor, SslMethod};
use openssl::x509::X509;
use rcgen::{
    BasicConstraints, Certificate as RcCert, CertificateParams, DistinguishedName, DnType, IsCa, KeyPair,
    SerialNumber, PKCS_ECDSA_P256_SHA256,
};

use trustpin_engine as tp;

/// A generated certificate, serialized once so its bytes stay stable
/// (ECDSA signatures differ on every serialization).
pub struct Issued {
    pub cert: RcCert,
    pub der: Vec<u8>,
    pub pem: String,
}

impl Issued {
    pub fn parsed(&self) -> tp::Certificate {
        tp::Certificate::from_der(&self.der).expect("parse generated cert")
    }

    pub fn key_pem(&self) -> String {
        self.cert.serialize_private_key_pem()
    }
}

/// Root -> intermediate -> leaf for `host`.
pub struct Pki {
    pub root: Issued,
    pub intermediate: Issued,
    pub leaf: Issued,
}

impl Pki {
    /// Leaf-first chain as a server would send it (no root).
    pub fn chain(&self) -> tp::CertificateChain {
        chain_of(&[&self.leaf.der, &self.intermediate.der])
    }

    pub fn full_chain(&self) -> tp::CertificateChain {
        chain_of(&[&self.leaf.der, &self.intermediate.der, &self.root.der])
    }
}

fn params(common_name: &str, sans: Vec<String>) -> CertificateParams {
    let mut params = CertificateParams::new(sans);
    params.alg = &PKCS_ECDSA_P256_SHA256;
    let mut dn = DistinguishedName::new();
    dn.push(DnType::CommonName, common_name);
    params.distinguished_name = dn;
    params
}

fn ca_params(common_name: &str) -> CertificateParams {
    let mut p = params(common_name, Vec::new());
    p.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
    p
}

fn self_signed_from(params: CertificateParams) -> Issued {
    let cert = RcCert::from_params(params).expect("cert");
    let der = cert.serialize_der().expect("der");
    let pem = pem_of(&der);
    Issued { cert, der, pem }
}

fn signed_by(params: CertificateParams, issuer: &Issued) -> Issued {
    let cert = RcCert::from_params(params).expect("cert");
    let der = cert.serialize_der_with_signer(&issuer.cert).expect("der");
    let pem = pem_of(&der);
    Issued { cert, der, pem }
}

fn pem_of(der: &[u8]) -> String {
    let x509 = X509::from_der(der).expect("x509");
    String::from_utf8(x509.to_pem().expect("pem")).expect("utf8")
}

pub fn root_ca(name: &str) -> Issued {
    self_signed_from(ca_params(name))
}

/// Full root/intermediate/leaf hierarchy with `host` as the leaf's DNS SAN.
pub fn pki(host: &str) -> Pki {
    let root = root_ca("TrustPin Test Root");
    let intermediate = signed_by(ca_params("TrustPin Test Intermediate"), &root);
    let leaf = signed_by(params(host, vec![host.to_string()]), &intermediate);
    Pki { root, intermediate, leaf }
}

/// Leaf for `host` signed directly by `issuer`, with `tweak` applied to its
/// parameters first.
pub fn leaf_signed_by(issuer: &Issued, host: &str, tweak: impl FnOnce(&mut CertificateParams)) -> Issued {
    let mut p = params(host, vec![host.to_string()]);
    tweak(&mut p);
    signed_by(p, issuer)
}

/// Self-signed leaf for `host`.
pub fn self_signed(host: &str) -> Issued {
    self_signed_from(params(host, vec![host.to_string()]))
}

/// PKCS#8 DER of a fresh P-256 key, reusable across certificates.
pub fn fresh_key_der() -> Vec<u8> {
    KeyPair::generate(&PKCS_ECDSA_P256_SHA256).expect("keypair").serialize_der()
}

/// Self-signed leaf for `host` with the given key and serial number.
pub fn self_signed_with_key(host: &str, key_der: &[u8], serial: u8) -> Issued {
    let mut p = params(host, vec![host.to_string()]);
    p.key_pair = Some(KeyPair::from_der(key_der).expect("key from der"));
    p.serial_number = Some(SerialNumber::from_slice(&[serial]));
    self_signed_from(p)
}

pub fn chain_of(ders: &[&[u8]]) -> tp::CertificateChain {
    tp::CertificateChain::from_der(ders).expect("parse chain")
}

/// Serve one TLS connection on 127.0.0.1 presenting `chain_pem` (leaf first)
/// and return the port. The server thread ends once the client hangs up.
pub fn serve_once(chain_pem: &[&str], key_pem: &str) -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().expect("addr").port();

    let mut builder = SslAcceptor::mozilla_intermediate_v5(SslMethod::tls()).expect("acceptor");
    let key = PKey::private_key_from_pem(key_pem.as_bytes()).expect("key");
    builder.set_private_key(&key).expect("set key");
    builder
        .set_certificate(&X509::from_pem(chain_pem[0].as_bytes()).expect("leaf pem"))
        .expect("set cert");
    for extra in &chain_pem[1..] {
        builder
            .add_extra_chain_cert(X509::from_pem(extra.as_bytes()).expect("extra pem"))
            .expect("extra cert");
    }
    let acceptor = builder.build();

    thread::spawn(move || {
        if let Ok((stream, _)) = listener.accept() {
            let _ = stream.set_read_timeout(Some(Duration::from_secs(5)));
            if let Ok(mut tls) = acceptor.accept(stream) {
                let mut buf = [0u8; 64];
                let _ = tls.read(&mut buf);
            }
        }
    });
    port
}

/// A local port with nothing listening on it.
pub fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    listener.local_addr().expect("addr").port()
}
