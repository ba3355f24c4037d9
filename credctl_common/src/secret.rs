//! Kubernetes `Secret` manifests (missing lots of fields).

use crate::{
    kind::{ResolvedConfig, SecretTarget},
    payload::{build, CredentialPayload},
    prelude::*,
};

/// The secret type used for username/password credentials.
pub const SECRET_TYPE_BASIC_AUTH: &str = "kubernetes.io/basic-auth";

/// Key holding the username in a basic-auth secret.
pub const BASIC_AUTH_USERNAME_KEY: &str = "username";

/// Key holding the password in a basic-auth secret.
pub const BASIC_AUTH_PASSWORD_KEY: &str = "password";

/// The secret type used for image pull credentials.
pub const SECRET_TYPE_DOCKER_CONFIG_JSON: &str = "kubernetes.io/dockerconfigjson";

/// Key holding the registry document in an image pull secret.
pub const DOCKER_CONFIG_JSON_KEY: &str = ".dockerconfigjson";

/// A Kubernetes secret, as we send it to the cluster and as the cluster
/// sends it back.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Secret {
    /// Always `v1`.
    pub api_version: String,
    /// Always `Secret`.
    pub kind: String,
    /// Name, namespace and annotations.
    pub metadata: ObjectMeta,
    /// One of the `SECRET_TYPE_*` constants.
    #[serde(rename = "type")]
    pub secret_type: String,
    /// Plain-text values. Only used when creating secrets; the API server
    /// folds them into `data`.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub string_data: BTreeMap<String, String>,
    /// Base64-encoded values, as returned by the API server.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub data: BTreeMap<String, String>,
}

/// The parts of Kubernetes object metadata that we care about.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    /// The object's name. Unset when `generate_name` is used, until the API
    /// server fills it in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// A prefix for a server-generated name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generate_name: Option<String>,
    /// The object's namespace.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    /// Object annotations.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

impl ObjectMeta {
    /// Metadata for creating an object at `target`.
    pub fn for_target(target: &SecretTarget) -> ObjectMeta {
        let (name, generate_name) = if target.generate_name {
            (None, Some(format!("{}-", target.name)))
        } else {
            (Some(target.name.clone()), None)
        };
        ObjectMeta {
            name,
            generate_name,
            namespace: Some(target.namespace.clone()),
            annotations: BTreeMap::new(),
        }
    }
}

impl Secret {
    /// An empty secret of type `secret_type` at `target`.
    pub fn new(secret_type: &str, target: &SecretTarget) -> Secret {
        Secret {
            api_version: "v1".to_owned(),
            kind: "Secret".to_owned(),
            metadata: ObjectMeta::for_target(target),
            secret_type: secret_type.to_owned(),
            string_data: BTreeMap::new(),
            data: BTreeMap::new(),
        }
    }

    /// The secret's name, falling back to its `generateName` prefix if the
    /// server hasn't assigned one yet.
    pub fn display_name(&self) -> &str {
        self.metadata
            .name
            .as_deref()
            .or_else(|| self.metadata.generate_name.as_deref())
            .unwrap_or("")
    }

    /// Look up `key` in the server-returned `data`, and decode it as a
    /// Base64-encoded UTF-8 string.
    pub fn decoded_data(&self, key: &str) -> Result<Option<String>> {
        let encoded = match self.data.get(key) {
            Some(encoded) => encoded,
            None => return Ok(None),
        };
        let bytes = base64::decode(encoded)
            .with_context(|| format!("could not base64-decode secret key {:?}", key))?;
        let decoded = String::from_utf8(bytes)
            .with_context(|| format!("could not UTF-8-decode secret key {:?}", key))?;
        Ok(Some(decoded))
    }

    /// Check that `stored`, as returned by the cluster, holds every value we
    /// sent in `string_data`. Only key names appear in errors.
    pub fn check_stored(&self, stored: &Secret) -> Result<()> {
        for (key, sent) in &self.string_data {
            match stored.decoded_data(key)? {
                Some(value) if &value == sent => {}
                Some(_) => {
                    return Err(format_err!("cluster stored a different value for {:?}", key))
                }
                None => return Err(format_err!("cluster did not store {:?}", key)),
            }
        }
        debug!(keys = self.string_data.len(), "checked stored secret data");
        Ok(())
    }
}

impl CredentialPayload {
    /// The Kubernetes secret type for this payload.
    pub fn secret_type(&self) -> &'static str {
        match self {
            CredentialPayload::BasicAuth(_) => SECRET_TYPE_BASIC_AUTH,
            CredentialPayload::PullSecret(_) => SECRET_TYPE_DOCKER_CONFIG_JSON,
        }
    }

    /// Wrap this payload in a secret manifest at `target`.
    pub fn into_secret(self, target: &SecretTarget) -> Secret {
        let mut secret = Secret::new(self.secret_type(), target);
        match self {
            CredentialPayload::BasicAuth(record) => {
                secret
                    .metadata
                    .annotations
                    .insert(record.annotation_key, record.annotation_value);
                secret
                    .string_data
                    .insert(BASIC_AUTH_USERNAME_KEY.to_owned(), record.username);
                secret
                    .string_data
                    .insert(BASIC_AUTH_PASSWORD_KEY.to_owned(), record.password);
            }
            CredentialPayload::PullSecret(doc) => {
                secret
                    .string_data
                    .insert(DOCKER_CONFIG_JSON_KEY.to_owned(), doc.json);
            }
        }
        secret
    }
}

/// Build the full secret manifest for `cfg`.
pub fn build_secret(cfg: &ResolvedConfig) -> Secret {
    build(cfg).into_secret(&cfg.target)
}

#[cfg(test)]
fn resolved(for_pulling: bool, generate_name: bool) -> ResolvedConfig {
    ResolvedConfig {
        kind: CredentialKind::Docker,
        url: "https://registry.example.com/".to_owned(),
        username: "u".to_owned(),
        password: "p".to_owned(),
        for_pulling,
        target: SecretTarget {
            name: "secret1".to_owned(),
            namespace: "ns1".to_owned(),
            generate_name,
        },
    }
}

#[test]
fn basic_auth_manifest() {
    let secret = build_secret(&resolved(false, false));
    let json = serde_json::to_value(&secret).unwrap();
    assert_eq!(
        json,
        serde_json::json!({
            "apiVersion": "v1",
            "kind": "Secret",
            "metadata": {
                "name": "secret1",
                "namespace": "ns1",
                "annotations": {
                    "build.knative.dev/docker-0": "https://registry.example.com/",
                },
            },
            "type": "kubernetes.io/basic-auth",
            "stringData": {
                "username": "u",
                "password": "p",
            },
        }),
    );
}

#[test]
fn pull_secret_manifest_has_no_annotation() {
    let secret = build_secret(&resolved(true, false));
    assert_eq!(secret.secret_type, SECRET_TYPE_DOCKER_CONFIG_JSON);
    assert!(secret.metadata.annotations.is_empty());
    assert_eq!(secret.string_data.len(), 1);
    let doc: serde_json::Value =
        serde_json::from_str(&secret.string_data[DOCKER_CONFIG_JSON_KEY]).unwrap();
    assert_eq!(
        doc["auths"]["https://registry.example.com/"]["email"],
        "noop",
    );
}

#[test]
fn generate_name_uses_prefix() {
    let secret = build_secret(&resolved(false, true));
    assert_eq!(secret.metadata.name, None);
    assert_eq!(secret.metadata.generate_name.as_deref(), Some("secret1-"));
    assert_eq!(secret.display_name(), "secret1-");
    let json = serde_json::to_value(&secret).unwrap();
    assert!(json["metadata"].get("name").is_none());
    assert_eq!(json["metadata"]["generateName"], "secret1-");
}

#[test]
fn parse_created_secret() {
    let json = r#"
{
  "apiVersion": "v1",
  "kind": "Secret",
  "metadata": {
    "name": "secret1-x7k2p",
    "generateName": "secret1-",
    "namespace": "ns1",
    "uid": "1b0e0a64-6b1f-4c36-9a0c-0d3e0f3c8f11",
    "resourceVersion": "4242"
  },
  "type": "kubernetes.io/basic-auth",
  "data": {
    "username": "dQ==",
    "password": "cA=="
  }
}"#;
    let secret: Secret = serde_json::from_str(json).expect("parse error");
    assert_eq!(secret.display_name(), "secret1-x7k2p");
    assert_eq!(secret.secret_type, SECRET_TYPE_BASIC_AUTH);
    assert!(secret.string_data.is_empty());
    assert_eq!(secret.decoded_data("username").unwrap().as_deref(), Some("u"));
    assert_eq!(secret.decoded_data("password").unwrap().as_deref(), Some("p"));
    assert_eq!(secret.decoded_data("missing").unwrap(), None);
}

#[test]
fn decoded_data_rejects_bad_base64() {
    let mut secret = Secret::new(SECRET_TYPE_BASIC_AUTH, &resolved(false, false).target);
    secret.data.insert("username".to_owned(), "not base64!".to_owned());
    assert!(secret.decoded_data("username").is_err());
}

#[cfg(test)]
fn as_stored(secret: &Secret) -> Secret {
    let mut stored = secret.clone();
    stored.data = stored
        .string_data
        .iter()
        .map(|(k, v)| (k.clone(), base64::encode(v)))
        .collect();
    stored.string_data.clear();
    stored
}

#[test]
fn check_stored_accepts_matching_data() {
    for &for_pulling in &[false, true] {
        let secret = build_secret(&resolved(for_pulling, false));
        secret.check_stored(&as_stored(&secret)).unwrap();
    }
}

#[test]
fn check_stored_rejects_missing_or_changed_keys() {
    let secret = build_secret(&resolved(false, false));

    let mut missing = as_stored(&secret);
    missing.data.remove(BASIC_AUTH_PASSWORD_KEY);
    let err = secret.check_stored(&missing).unwrap_err();
    assert!(err.to_string().contains("did not store \"password\""));

    let mut changed = as_stored(&secret);
    changed
        .data
        .insert(BASIC_AUTH_USERNAME_KEY.to_owned(), base64::encode("someone-else"));
    let err = secret.check_stored(&changed).unwrap_err();
    assert!(err.to_string().contains("different value for \"username\""));
    assert!(!err.to_string().contains("someone-else"));
}
