//! Turning the credential kind a user asked for into exactly one concrete
//! kind and URL.
//!
//! Users can either name a kind explicitly (`--type ssh --url github.com`) or
//! use a shorthand which implies both the kind and the registry host
//! (`--docker-hub`, `--gcr`). The two styles never mix: asking for both is an
//! error, not an override.

use std::{fmt, str::FromStr};
use thiserror::Error;
use tracing::debug;

/// Registry host used for Docker Hub credentials.
pub const DOCKER_HUB_URL: &str = "index.docker.io/v1/";

/// Registry host used for Google Container Registry credentials.
pub const GCR_URL: &str = "gcr.io";

/// The kind of credential we're provisioning.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum CredentialKind {
    /// Credentials for a source repository reached over SSH.
    Ssh,
    /// Credentials for an arbitrary Docker registry.
    Docker,
    /// Credentials for Docker Hub.
    DockerHub,
    /// Credentials for `gcr.io`.
    Gcr,
}

impl CredentialKind {
    /// The lowercase name of this kind, as accepted on the command line.
    pub fn as_str(self) -> &'static str {
        match self {
            CredentialKind::Ssh => "ssh",
            CredentialKind::Docker => "docker",
            CredentialKind::DockerHub => "docker-hub",
            CredentialKind::Gcr => "gcr",
        }
    }

    /// The credential type recorded in a secret's provenance annotation.
    /// Consumers of that annotation only know about `ssh` and `docker`, so
    /// every registry kind maps to `docker`.
    pub fn secret_type(self) -> &'static str {
        match self {
            CredentialKind::Ssh => "ssh",
            CredentialKind::Docker
            | CredentialKind::DockerHub
            | CredentialKind::Gcr => "docker",
        }
    }

    /// The well-known URL implied by this kind, if it has one.
    pub fn fixed_url(self) -> Option<&'static str> {
        match self {
            CredentialKind::Ssh | CredentialKind::Docker => None,
            CredentialKind::DockerHub => Some(DOCKER_HUB_URL),
            CredentialKind::Gcr => Some(GCR_URL),
        }
    }
}

impl fmt::Display for CredentialKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.as_str().fmt(f)
    }
}

/// The kinds which may be chosen with an explicit `--type` flag.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ExplicitKind {
    /// `--type ssh`
    Ssh,
    /// `--type docker`
    Docker,
}

impl FromStr for ExplicitKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ssh" => Ok(ExplicitKind::Ssh),
            "docker" => Ok(ExplicitKind::Docker),
            _ => Err(ValidationError::UnknownType {
                value: s.to_owned(),
            }),
        }
    }
}

impl From<ExplicitKind> for CredentialKind {
    fn from(kind: ExplicitKind) -> Self {
        match kind {
            ExplicitKind::Ssh => CredentialKind::Ssh,
            ExplicitKind::Docker => CredentialKind::Docker,
        }
    }
}

/// Input which can't be turned into a single credential kind.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum ValidationError {
    /// More than one way of choosing a kind was supplied.
    #[error(
        "conflicting flags {}: expected either --type with --url, or exactly one of --docker-hub or --gcr",
        .flags.join(", ")
    )]
    AmbiguousKind {
        /// The flags which conflict with each other.
        flags: Vec<&'static str>,
    },

    /// No way of choosing a kind was supplied.
    #[error("expected --type flag (or one of --docker-hub, --gcr) to be specified")]
    MissingKind,

    /// An explicit kind was chosen without the URL it needs.
    #[error("expected --url flag to be specified for type {kind}")]
    MissingUrl {
        /// The kind which needs a URL.
        kind: CredentialKind,
    },

    /// `--type` named a kind we don't know.
    #[error("unknown credential type {value:?} (expected ssh or docker)")]
    UnknownType {
        /// The value we couldn't parse.
        value: String,
    },
}

/// How the user picked a credential kind. Exactly one style applies.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum KindSelection {
    /// `--type` and (usually) `--url`.
    Explicit {
        /// The chosen kind.
        kind: ExplicitKind,
        /// The URL, if one was given.
        url: Option<String>,
    },
    /// `--docker-hub`
    DockerHub,
    /// `--gcr`
    Gcr,
}

impl KindSelection {
    /// Combine the independent command-line flags into a single selection,
    /// rejecting any combination which mixes styles. Empty URLs count as
    /// missing.
    pub fn from_flags(
        kind: Option<ExplicitKind>,
        url: Option<String>,
        docker_hub: bool,
        gcr: bool,
    ) -> Result<Self, ValidationError> {
        let url = url.filter(|url| !url.is_empty());

        let mut shorthands = vec![];
        if docker_hub {
            shorthands.push("--docker-hub");
        }
        if gcr {
            shorthands.push("--gcr");
        }

        if shorthands.is_empty() {
            return match kind {
                Some(kind) => Ok(KindSelection::Explicit { kind, url }),
                None => Err(ValidationError::MissingKind),
            };
        }

        let mut flags = shorthands;
        if kind.is_some() {
            flags.push("--type");
        }
        if url.is_some() {
            flags.push("--url");
        }
        if flags.len() > 1 {
            return Err(ValidationError::AmbiguousKind { flags });
        }

        if docker_hub {
            Ok(KindSelection::DockerHub)
        } else {
            Ok(KindSelection::Gcr)
        }
    }
}

/// The Kubernetes object we're going to create.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SecretTarget {
    /// The secret name, or the `generateName` prefix if `generate_name` is set.
    pub name: String,
    /// The namespace to create the secret in.
    pub namespace: String,
    /// Let the API server pick a unique name starting with `name`.
    pub generate_name: bool,
}

/// Everything the user told us, before we've decided what it means.
#[derive(Clone)]
pub struct RawConfig {
    /// How the credential kind was chosen.
    pub selection: KindSelection,
    /// The username to store.
    pub username: String,
    /// The password to store.
    pub password: String,
    /// Build an image pull secret instead of a basic-auth secret.
    pub for_pulling: bool,
    /// Where the secret goes.
    pub target: SecretTarget,
}

/// A credential with a concrete kind and URL.
#[derive(Clone, Eq, PartialEq)]
pub struct ResolvedConfig {
    /// The resolved kind.
    pub kind: CredentialKind,
    /// The host or endpoint the credential is for. Never empty.
    pub url: String,
    /// The username to store.
    pub username: String,
    /// The password to store.
    pub password: String,
    /// Build an image pull secret instead of a basic-auth secret.
    pub for_pulling: bool,
    /// Where the secret goes.
    pub target: SecretTarget,
}

// Credentials stay out of `Debug` output, so this can be logged safely.
impl fmt::Debug for ResolvedConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedConfig")
            .field("kind", &self.kind)
            .field("url", &self.url)
            .field("username", &"<redacted>")
            .field("password", &"<redacted>")
            .field("for_pulling", &self.for_pulling)
            .field("target", &self.target)
            .finish()
    }
}

/// The kind and URL implied by a shorthand flag.
fn shorthand(kind: CredentialKind) -> (CredentialKind, String) {
    let url = kind
        .fixed_url()
        .expect("shorthand kinds always have a fixed URL");
    (kind, url.to_owned())
}

/// Fill in the kind and URL implied by `input`.
pub fn resolve(input: RawConfig) -> Result<ResolvedConfig, ValidationError> {
    let (kind, url) = match input.selection {
        KindSelection::Explicit { kind, url } => {
            let kind = CredentialKind::from(kind);
            match url {
                Some(url) if !url.is_empty() => (kind, url),
                _ => return Err(ValidationError::MissingUrl { kind }),
            }
        }
        KindSelection::DockerHub => shorthand(CredentialKind::DockerHub),
        KindSelection::Gcr => shorthand(CredentialKind::Gcr),
    };
    debug!(%kind, %url, for_pulling = input.for_pulling, "resolved credential kind");

    Ok(ResolvedConfig {
        kind,
        url,
        username: input.username,
        password: input.password,
        for_pulling: input.for_pulling,
        target: input.target,
    })
}

#[cfg(test)]
fn raw_config(selection: KindSelection) -> RawConfig {
    RawConfig {
        selection,
        username: "u".to_owned(),
        password: "p".to_owned(),
        for_pulling: false,
        target: SecretTarget {
            name: "secret1".to_owned(),
            namespace: "ns1".to_owned(),
            generate_name: false,
        },
    }
}

#[test]
fn shorthands_resolve_to_fixed_hosts() {
    let examples = &[
        (KindSelection::DockerHub, CredentialKind::DockerHub, DOCKER_HUB_URL),
        (KindSelection::Gcr, CredentialKind::Gcr, GCR_URL),
    ];
    for (selection, kind, url) in examples {
        for &for_pulling in &[false, true] {
            let mut raw = raw_config(selection.clone());
            raw.for_pulling = for_pulling;
            let resolved = resolve(raw).expect("shorthand should resolve");
            assert_eq!(resolved.kind, *kind);
            assert_eq!(resolved.url, *url);
            assert_eq!(resolved.for_pulling, for_pulling);
            assert_eq!(kind.fixed_url(), Some(*url));
        }
    }
}

#[test]
fn docker_hub_keeps_credentials_and_target() {
    let resolved = resolve(raw_config(KindSelection::DockerHub)).unwrap();
    assert_eq!(resolved.kind, CredentialKind::DockerHub);
    assert_eq!(resolved.url, "index.docker.io/v1/");
    assert_eq!(resolved.username, "u");
    assert_eq!(resolved.password, "p");
    assert_eq!(resolved.target.name, "secret1");
    assert_eq!(resolved.target.namespace, "ns1");
}

#[test]
fn explicit_url_is_kept_verbatim() {
    let url = " https://registry.example.com/ ";
    let resolved = resolve(raw_config(KindSelection::Explicit {
        kind: ExplicitKind::Docker,
        url: Some(url.to_owned()),
    }))
    .unwrap();
    assert_eq!(resolved.kind, CredentialKind::Docker);
    assert_eq!(resolved.url, url);
}

#[test]
fn explicit_kinds_require_url() {
    for &kind in &[ExplicitKind::Docker, ExplicitKind::Ssh] {
        for url in vec![None, Some(String::new())] {
            let err = resolve(raw_config(KindSelection::Explicit { kind, url }))
                .unwrap_err();
            assert_eq!(err, ValidationError::MissingUrl { kind: kind.into() });
        }
    }
}

#[test]
fn type_and_shorthand_are_ambiguous() {
    let err = KindSelection::from_flags(
        Some(ExplicitKind::Docker),
        None,
        false,
        true,
    )
    .unwrap_err();
    assert_eq!(
        err,
        ValidationError::AmbiguousKind {
            flags: vec!["--gcr", "--type"],
        },
    );
}

#[test]
fn url_and_shorthand_are_ambiguous() {
    let err = KindSelection::from_flags(
        None,
        Some("github.com".to_owned()),
        true,
        false,
    )
    .unwrap_err();
    assert_eq!(
        err,
        ValidationError::AmbiguousKind {
            flags: vec!["--docker-hub", "--url"],
        },
    );
}

#[test]
fn both_shorthands_are_ambiguous() {
    let err = KindSelection::from_flags(None, None, true, true).unwrap_err();
    assert!(matches!(err, ValidationError::AmbiguousKind { .. }));
    assert!(err.to_string().contains("--docker-hub, --gcr"));
}

#[test]
fn nothing_selected_is_missing_kind() {
    assert_eq!(
        KindSelection::from_flags(None, None, false, false).unwrap_err(),
        ValidationError::MissingKind,
    );
    assert_eq!(
        KindSelection::from_flags(None, Some("github.com".to_owned()), false, false)
            .unwrap_err(),
        ValidationError::MissingKind,
    );
}

#[test]
fn single_style_selections_are_accepted() {
    assert_eq!(
        KindSelection::from_flags(None, None, true, false).unwrap(),
        KindSelection::DockerHub,
    );
    assert_eq!(
        KindSelection::from_flags(None, Some(String::new()), false, true).unwrap(),
        KindSelection::Gcr,
    );
    assert_eq!(
        KindSelection::from_flags(
            Some(ExplicitKind::Ssh),
            Some("github.com".to_owned()),
            false,
            false,
        )
        .unwrap(),
        KindSelection::Explicit {
            kind: ExplicitKind::Ssh,
            url: Some("github.com".to_owned()),
        },
    );
}

#[test]
fn explicit_kind_parsing() {
    assert_eq!("ssh".parse::<ExplicitKind>().unwrap(), ExplicitKind::Ssh);
    assert_eq!("docker".parse::<ExplicitKind>().unwrap(), ExplicitKind::Docker);
    assert_eq!(
        "docker-hub".parse::<ExplicitKind>().unwrap_err(),
        ValidationError::UnknownType {
            value: "docker-hub".to_owned(),
        },
    );
}

#[test]
fn secret_types_collapse_registry_kinds() {
    assert_eq!(CredentialKind::Ssh.secret_type(), "ssh");
    assert_eq!(CredentialKind::Docker.secret_type(), "docker");
    assert_eq!(CredentialKind::DockerHub.secret_type(), "docker");
    assert_eq!(CredentialKind::Gcr.secret_type(), "docker");
    assert_eq!(CredentialKind::DockerHub.to_string(), "docker-hub");
}

#[test]
fn debug_output_hides_credentials() {
    let mut raw = raw_config(KindSelection::Gcr);
    raw.username = "alice-registry-user".to_owned();
    raw.password = "hunter2".to_owned();
    let resolved = resolve(raw).unwrap();
    let debug = format!("{:?}", resolved);
    assert!(!debug.contains("alice-registry-user"));
    assert!(!debug.contains("hunter2"));
    assert!(debug.contains("<redacted>"));
    assert!(debug.contains("gcr.io"));
}
