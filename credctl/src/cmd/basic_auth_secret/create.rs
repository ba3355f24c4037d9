//! The `basic-auth-secret create` subcommand.

use credctl_common::{
    kubernetes::{Kubectl, SecretSink},
    prelude::*,
    secret::build_secret,
};
use std::io;
use structopt::StructOpt;

use crate::table::print_secret_table;

/// Create a basic auth secret.
///
/// Examples:
///
///   credctl basic-auth-secret create -s secret1 --type ssh --url github.com -u username -p password -n ns1
///
///   credctl basic-auth-secret create -s secret1 --docker-hub -u username -p password --for-pulling -n ns1
///
///   credctl basic-auth-secret create -s secret1 --type docker --url https://registry.domain.com/ -u username -p password -n ns1
#[derive(StructOpt)]
pub struct Opt {
    /// Name of the secret.
    #[structopt(short = "s", long = "secret")]
    secret: String,

    /// Namespace to create the secret in.
    #[structopt(short = "n", long = "namespace", env = "CREDCTL_NAMESPACE")]
    namespace: String,

    /// Let the cluster generate a unique name starting with the secret name.
    #[structopt(short = "g", long = "generate-name")]
    generate_name: bool,

    /// Credential type (`ssh` or `docker`).
    #[structopt(long = "type")]
    kind: Option<ExplicitKind>,

    /// URL the credential is for (eg. `https://index.docker.io/v1/`,
    /// `github.com`).
    #[structopt(long = "url")]
    url: Option<String>,

    /// Preconfigure type and URL for the Docker Hub registry.
    #[structopt(long = "docker-hub")]
    docker_hub: bool,

    /// Preconfigure type and URL for the gcr.io registry.
    #[structopt(long = "gcr")]
    gcr: bool,

    /// Username to store.
    #[structopt(short = "u", long = "username")]
    username: Option<String>,

    /// Password to store.
    #[structopt(short = "p", long = "password")]
    password: Option<String>,

    /// Create an image pull secret instead of a basic auth secret.
    #[structopt(long = "for-pulling")]
    for_pulling: bool,

    /// Just print out the manifest without creating it.
    #[structopt(long = "dry-run")]
    dry_run: bool,

    /// The `kubectl` binary to use.
    #[structopt(
        long = "kubectl",
        env = "CREDCTL_KUBECTL",
        default_value = "kubectl",
        parse(from_os_str)
    )]
    kubectl: PathBuf,
}

impl Opt {
    /// Collect our flags into a `RawConfig`, checking that they pick exactly
    /// one credential kind.
    fn raw_config(&self) -> Result<RawConfig, ValidationError> {
        let selection = KindSelection::from_flags(
            self.kind,
            self.url.clone(),
            self.docker_hub,
            self.gcr,
        )?;
        Ok(RawConfig {
            selection,
            username: self.username.clone().unwrap_or_default(),
            password: self.password.clone().unwrap_or_default(),
            for_pulling: self.for_pulling,
            target: SecretTarget {
                name: self.secret.clone(),
                namespace: self.namespace.clone(),
                generate_name: self.generate_name,
            },
        })
    }
}

/// The `basic-auth-secret create` subcommand.
pub fn run(opt: &Opt) -> Result<()> {
    let kubectl = Kubectl::new(&opt.kubectl);
    let stdout = io::stdout();
    let mut out = stdout.lock();
    create(opt, &kubectl, &mut out)
}

/// Validate our options, then either print the secret manifest or create it
/// using `sink` and print a summary of the result.
fn create<S, W>(opt: &Opt, sink: &S, out: &mut W) -> Result<()>
where
    S: SecretSink + ?Sized,
    W: Write,
{
    let cfg = resolve(opt.raw_config()?)?;
    let secret = build_secret(&cfg);

    if opt.dry_run {
        let manifest =
            serde_yaml::to_string(&secret).context("error rendering secret manifest")?;
        write!(out, "{}", manifest)?;
        return Ok(());
    }

    let created = sink
        .create(&secret)
        .context("error creating basic auth secret")?;
    secret
        .check_stored(&created)
        .context("error checking created secret")?;
    info!(name = created.display_name(), "created secret");
    print_secret_table(&created, out)
}

#[cfg(test)]
mod test_support {
    use super::*;
    use std::cell::RefCell;

    /// A sink which remembers what we asked it to create.
    #[derive(Default)]
    pub struct RecordingSink {
        pub created: RefCell<Vec<Secret>>,
    }

    impl SecretSink for RecordingSink {
        fn create(&self, secret: &Secret) -> Result<Secret> {
            self.created.borrow_mut().push(secret.clone());
            Ok(as_stored(secret))
        }
    }

    /// What the API server sends back: `stringData` folded into
    /// Base64-encoded `data`, and a generated name filled in.
    pub fn as_stored(secret: &Secret) -> Secret {
        let mut stored = secret.clone();
        if let Some(prefix) = &stored.metadata.generate_name {
            stored.metadata.name = Some(format!("{}abcde", prefix));
        }
        stored.data = stored
            .string_data
            .iter()
            .map(|(k, v)| (k.clone(), base64::encode(v)))
            .collect();
        stored.string_data.clear();
        stored
    }

    /// A sink which "forgets" to store the password.
    pub struct LossySink;

    impl SecretSink for LossySink {
        fn create(&self, secret: &Secret) -> Result<Secret> {
            let mut stored = as_stored(secret);
            stored.data.remove("password");
            Ok(stored)
        }
    }

    /// A sink which always fails.
    pub struct FailingSink;

    impl SecretSink for FailingSink {
        fn create(&self, _secret: &Secret) -> Result<Secret> {
            Err(format_err!("secrets \"secret1\" already exists"))
        }
    }

    pub fn parse(args: &[&str]) -> Opt {
        let mut all_args = vec!["create"];
        all_args.extend_from_slice(args);
        Opt::from_iter_safe(all_args).expect("could not parse arguments")
    }
}

#[test]
fn creates_ssh_secret_and_prints_table() {
    use credctl_common::secret::SECRET_TYPE_BASIC_AUTH;
    use self::test_support::*;

    let opt = parse(&[
        "-s", "secret1", "-n", "ns1", "--type", "ssh", "--url", "github.com", "-u", "u",
        "-p", "p",
    ]);
    let sink = RecordingSink::default();
    let mut out = Vec::<u8>::new();
    create(&opt, &sink, &mut out).unwrap();

    let created = sink.created.borrow();
    assert_eq!(created.len(), 1);
    let secret = &created[0];
    assert_eq!(secret.metadata.name.as_deref(), Some("secret1"));
    assert_eq!(secret.metadata.namespace.as_deref(), Some("ns1"));
    assert_eq!(secret.secret_type, SECRET_TYPE_BASIC_AUTH);
    assert_eq!(
        secret.metadata.annotations["build.knative.dev/ssh-0"],
        "github.com",
    );
    assert_eq!(secret.string_data["username"], "u");
    assert_eq!(secret.string_data["password"], "p");

    let out = String::from_utf8(out).unwrap();
    assert!(out.contains("secret1"));
    assert!(out.contains(SECRET_TYPE_BASIC_AUTH));
}

#[test]
fn creates_docker_hub_pull_secret() {
    use credctl_common::secret::{DOCKER_CONFIG_JSON_KEY, SECRET_TYPE_DOCKER_CONFIG_JSON};
    use self::test_support::*;

    let opt = parse(&[
        "-s", "secret1", "-n", "ns1", "--docker-hub", "-u", "u", "-p", "p",
        "--for-pulling",
    ]);
    let sink = RecordingSink::default();
    create(&opt, &sink, &mut Vec::<u8>::new()).unwrap();

    let created = sink.created.borrow();
    let secret = &created[0];
    assert_eq!(secret.secret_type, SECRET_TYPE_DOCKER_CONFIG_JSON);
    assert!(secret.metadata.annotations.is_empty());
    assert_eq!(
        secret.string_data[DOCKER_CONFIG_JSON_KEY],
        r#"{"auths":{"index.docker.io/v1/":{"username":"u","password":"p","email":"noop"}}}"#,
    );
}

#[test]
fn generated_names_are_printed() {
    use self::test_support::*;

    let opt = parse(&["-s", "secret1", "-n", "ns1", "-g", "--gcr"]);
    let sink = RecordingSink::default();
    let mut out = Vec::<u8>::new();
    create(&opt, &sink, &mut out).unwrap();

    assert_eq!(
        sink.created.borrow()[0].metadata.generate_name.as_deref(),
        Some("secret1-"),
    );
    let out = String::from_utf8(out).unwrap();
    assert!(out.contains("secret1-abcde"));
}

#[test]
fn validation_errors_never_reach_the_sink() {
    use self::test_support::*;

    let examples: &[(&[&str], ValidationError)] = &[
        (
            &["--type", "docker", "--gcr"],
            ValidationError::AmbiguousKind {
                flags: vec!["--gcr", "--type"],
            },
        ),
        (&["-u", "u"], ValidationError::MissingKind),
        (
            &["--type", "docker"],
            ValidationError::MissingUrl {
                kind: CredentialKind::Docker,
            },
        ),
    ];
    for (args, expected) in examples {
        let mut all_args = vec!["-s", "secret1", "-n", "ns1"];
        all_args.extend_from_slice(args);
        let opt = parse(&all_args);
        let sink = RecordingSink::default();
        let err = create(&opt, &sink, &mut Vec::<u8>::new()).unwrap_err();
        assert_eq!(err.downcast_ref::<ValidationError>(), Some(expected));
        assert!(sink.created.borrow().is_empty());
    }
}

#[test]
fn stored_data_is_checked() {
    use self::test_support::*;

    let opt = parse(&[
        "-s", "secret1", "-n", "ns1", "--type", "ssh", "--url", "github.com", "-u", "u",
        "-p", "p",
    ]);
    let mut out = Vec::<u8>::new();
    let err = create(&opt, &LossySink, &mut out).unwrap_err();
    assert_eq!(err.to_string(), "error checking created secret");
    assert!(format!("{:#}", err).contains("did not store \"password\""));
    assert!(out.is_empty());
}

#[test]
fn sink_failures_are_reported() {
    use self::test_support::*;

    let opt = parse(&["-s", "secret1", "-n", "ns1", "--gcr"]);
    let mut out = Vec::<u8>::new();
    let err = create(&opt, &FailingSink, &mut out).unwrap_err();
    assert_eq!(err.to_string(), "error creating basic auth secret");
    assert!(format!("{:#}", err).contains("already exists"));
    assert!(out.is_empty());
}

#[test]
fn dry_run_prints_yaml_manifest() {
    use self::test_support::*;

    let opt = parse(&[
        "-s", "secret1", "-n", "ns1", "--type", "docker", "--url",
        "https://registry.example.com/", "-u", "u", "-p", "p", "--dry-run",
    ]);
    let mut out = Vec::<u8>::new();
    create(&opt, &FailingSink, &mut out).unwrap();

    let parsed: serde_json::Value = serde_yaml::from_slice(&out).expect("rendered invalid YAML");
    assert_eq!(parsed["kind"], "Secret");
    assert_eq!(parsed["type"], "kubernetes.io/basic-auth");
    assert_eq!(
        parsed["metadata"]["annotations"]["build.knative.dev/docker-0"],
        "https://registry.example.com/",
    );
}

#[test]
fn unknown_types_are_rejected() {
    let args = ["create", "-s", "secret1", "-n", "ns1", "--type", "ftp", "--url", "x"];
    assert!(Opt::from_iter_safe(&args).is_err());
}

#[test]
fn namespace_is_required() {
    // Only meaningful when the environment doesn't supply a namespace.
    if std::env::var_os("CREDCTL_NAMESPACE").is_none() {
        let args = ["create", "-s", "secret1", "--gcr"];
        assert!(Opt::from_iter_safe(&args).is_err());
    }
}
