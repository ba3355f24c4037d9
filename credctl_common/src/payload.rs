//! Building the contents of a credential secret from a resolved config.

use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt};

use crate::kind::{CredentialKind, ResolvedConfig};

/// Domain of the annotation recording which kind of credential a basic-auth
/// secret holds. Knative Build reads `build.knative.dev/<type>-<n>` to decide
/// which host a secret applies to.
pub const ANNOTATION_PREFIX: &str = "build.knative.dev";

/// Placeholder email stored in pull secrets. Registry configs historically
/// required a non-empty email, and readers expect this exact value.
pub const PULL_SECRET_EMAIL: &str = "noop";

/// The provenance annotation key for `kind`, for example
/// `build.knative.dev/docker-0`.
pub fn annotation_key(kind: CredentialKind) -> String {
    format!("{}/{}-0", ANNOTATION_PREFIX, kind.secret_type())
}

/// A flat username/password credential, plus an annotation saying what it's
/// for.
#[derive(Clone, Eq, PartialEq)]
pub struct BasicAuthRecord {
    /// See [`annotation_key`].
    pub annotation_key: String,
    /// The URL the credential applies to.
    pub annotation_value: String,
    /// The stored username.
    pub username: String,
    /// The stored password.
    pub password: String,
}

impl fmt::Debug for BasicAuthRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicAuthRecord")
            .field("annotation_key", &self.annotation_key)
            .field("annotation_value", &self.annotation_value)
            .field("username", &"<redacted>")
            .field("password", &"<redacted>")
            .finish()
    }
}

/// A registry credential document in the Docker `config.json` format.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PullSecretAuthsDocument {
    /// Credentials keyed by registry URL.
    pub auths: BTreeMap<String, AuthEntry>,
}

/// Credentials for a single registry.
///
/// Field order matters: it's the order in which fields are serialized.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AuthEntry {
    /// Registry username.
    pub username: String,
    /// Registry password.
    pub password: String,
    /// Always [`PULL_SECRET_EMAIL`].
    pub email: String,
}

/// A serialized [`PullSecretAuthsDocument`], ready to be stored in a secret.
#[derive(Clone, Eq, PartialEq)]
pub struct PullSecretDocument {
    /// Compact JSON.
    pub json: String,
}

impl PullSecretDocument {
    /// Parse our JSON back into a structured document.
    pub fn parse(&self) -> serde_json::Result<PullSecretAuthsDocument> {
        serde_json::from_str(&self.json)
    }
}

impl fmt::Debug for PullSecretDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PullSecretDocument")
            .field("json", &"<redacted>")
            .finish()
    }
}

/// The data we'll store in a secret.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum CredentialPayload {
    /// A `kubernetes.io/basic-auth` secret.
    BasicAuth(BasicAuthRecord),
    /// A `kubernetes.io/dockerconfigjson` secret.
    PullSecret(PullSecretDocument),
}

/// Build the payload for `cfg`. Calling this twice on the same config gives
/// identical results.
pub fn build(cfg: &ResolvedConfig) -> CredentialPayload {
    if cfg.for_pulling {
        CredentialPayload::PullSecret(build_pull_secret(cfg))
    } else {
        CredentialPayload::BasicAuth(BasicAuthRecord {
            annotation_key: annotation_key(cfg.kind),
            annotation_value: cfg.url.clone(),
            username: cfg.username.clone(),
            password: cfg.password.clone(),
        })
    }
}

fn build_pull_secret(cfg: &ResolvedConfig) -> PullSecretDocument {
    let mut auths = BTreeMap::new();
    auths.insert(
        cfg.url.clone(),
        AuthEntry {
            username: cfg.username.clone(),
            password: cfg.password.clone(),
            email: PULL_SECRET_EMAIL.to_owned(),
        },
    );
    let json = serde_json::to_string(&PullSecretAuthsDocument { auths })
        .expect("a document made of strings should always serialize");
    PullSecretDocument { json }
}

#[cfg(test)]
fn resolved(kind: CredentialKind, url: &str, for_pulling: bool) -> ResolvedConfig {
    use crate::kind::SecretTarget;

    ResolvedConfig {
        kind,
        url: url.to_owned(),
        username: "u".to_owned(),
        password: "p".to_owned(),
        for_pulling,
        target: SecretTarget {
            name: "secret1".to_owned(),
            namespace: "ns1".to_owned(),
            generate_name: false,
        },
    }
}

#[test]
fn pull_secret_has_exact_json() {
    let cfg = resolved(CredentialKind::Docker, "https://registry.example.com/", true);
    match build(&cfg) {
        CredentialPayload::PullSecret(doc) => assert_eq!(
            doc.json,
            r#"{"auths":{"https://registry.example.com/":{"username":"u","password":"p","email":"noop"}}}"#,
        ),
        other => panic!("expected a pull secret, got {:?}", other),
    }
}

#[test]
fn pull_secret_parses_back() {
    let cfg = ResolvedConfig {
        username: "user \"quoted\"".to_owned(),
        password: "pä\nss".to_owned(),
        ..resolved(CredentialKind::Gcr, "gcr.io", true)
    };
    let doc = match build(&cfg) {
        CredentialPayload::PullSecret(doc) => doc.parse().unwrap(),
        other => panic!("expected a pull secret, got {:?}", other),
    };
    assert_eq!(doc.auths.len(), 1);
    let entry = &doc.auths["gcr.io"];
    assert_eq!(entry.username, cfg.username);
    assert_eq!(entry.password, cfg.password);
    assert_eq!(entry.email, "noop");
}

#[test]
fn basic_auth_record_for_ssh() {
    let cfg = resolved(CredentialKind::Ssh, "github.com", false);
    assert_eq!(
        build(&cfg),
        CredentialPayload::BasicAuth(BasicAuthRecord {
            annotation_key: "build.knative.dev/ssh-0".to_owned(),
            annotation_value: "github.com".to_owned(),
            username: "u".to_owned(),
            password: "p".to_owned(),
        }),
    );
}

#[test]
fn registry_shorthands_annotate_as_docker() {
    let cfg = resolved(CredentialKind::DockerHub, "index.docker.io/v1/", false);
    match build(&cfg) {
        CredentialPayload::BasicAuth(record) => {
            assert_eq!(record.annotation_key, "build.knative.dev/docker-0");
            assert_eq!(record.annotation_value, "index.docker.io/v1/");
        }
        other => panic!("expected basic auth, got {:?}", other),
    }
}

#[test]
fn build_is_deterministic() {
    for &for_pulling in &[false, true] {
        let cfg = resolved(CredentialKind::Docker, "registry.local:5000", for_pulling);
        assert_eq!(build(&cfg), build(&cfg));
    }
}

#[test]
fn payload_debug_hides_credentials() {
    let cfg = ResolvedConfig {
        username: "alice-registry-user".to_owned(),
        password: "hunter2".to_owned(),
        ..resolved(CredentialKind::Docker, "registry.local", false)
    };
    for &for_pulling in &[false, true] {
        let cfg = ResolvedConfig {
            for_pulling,
            ..cfg.clone()
        };
        let debug = format!("{:?}", build(&cfg));
        assert!(!debug.contains("alice-registry-user"));
        assert!(!debug.contains("hunter2"));
    }
}
