//! Unit tests for option validation and normalisation.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use rstest::{fixture, rstest};

use super::{
    ConfigError, Configuration, DEFAULT_DOCKER_PORT, DEFAULT_IMAGE, DEFAULT_INSTANCE_TYPE,
    DEFAULT_REGION, DEFAULT_SSH_PORT, DEFAULT_SWAP_SIZE, DriverOptions, generate_root_password,
    ssh_user_for,
};
use crate::stackscript::StackScriptRef;

#[fixture]
fn options() -> DriverOptions {
    DriverOptions {
        token: String::from("secret-token"),
        ..DriverOptions::default()
    }
}

fn configure(options: &DriverOptions) -> Configuration {
    Configuration::from_options(options, "my-machine")
        .unwrap_or_else(|err| panic!("configuration should validate: {err}"))
}

#[rstest]
fn defaults_fill_unset_options(options: DriverOptions) {
    let config = configure(&options);
    assert_eq!(config.region, DEFAULT_REGION);
    assert_eq!(config.instance_type, DEFAULT_INSTANCE_TYPE);
    assert_eq!(config.image, DEFAULT_IMAGE);
    assert_eq!(config.ssh_port, DEFAULT_SSH_PORT);
    assert_eq!(config.swap_size, DEFAULT_SWAP_SIZE);
    assert_eq!(config.docker_port, DEFAULT_DOCKER_PORT);
    assert_eq!(config.ssh_user, "root");
    assert_eq!(config.label, "my-machine");
    assert!(config.stackscript.is_none());
    assert!(config.stackscript_data.is_empty());
    assert!(!config.create_private_ip);
}

#[rstest]
#[case("")]
#[case("   ")]
fn missing_token_names_env_var_and_key(options: DriverOptions, #[case] token: &str) {
    let opts = DriverOptions {
        token: token.to_owned(),
        ..options
    };
    let Err(ConfigError::MissingField(message)) = Configuration::from_options(&opts, "m") else {
        panic!("expected MissingField");
    };
    assert!(message.contains("LINODE_TOKEN"), "message: {message}");
    assert!(message.contains("linode-machine.toml"), "message: {message}");
    assert!(message.contains("token"), "message: {message}");
}

#[rstest]
fn generated_password_is_base64_of_fifty_bytes(options: DriverOptions) {
    let config = configure(&options);
    let decoded = STANDARD
        .decode(&config.root_password)
        .unwrap_or_else(|err| panic!("password should be base64: {err}"));
    assert_eq!(decoded.len(), 50);
}

#[test]
fn generated_passwords_differ() {
    let first = generate_root_password().unwrap_or_else(|err| panic!("generate: {err}"));
    let second = generate_root_password().unwrap_or_else(|err| panic!("generate: {err}"));
    assert_ne!(first, second);
}

#[rstest]
fn explicit_password_is_kept(options: DriverOptions) {
    let opts = DriverOptions {
        root_pass: Some(String::from("hunter2hunter2")),
        ..options
    };
    assert_eq!(configure(&opts).root_password, "hunter2hunter2");
}

#[rstest]
fn explicit_label_is_canonicalised(options: DriverOptions) {
    let opts = DriverOptions {
        label: Some(String::from("--web server__01--")),
        ..options
    };
    assert_eq!(configure(&opts).label, "webserver_01");
}

#[rstest]
fn host_name_becomes_label(options: DriverOptions) {
    let config = Configuration::from_options(&options, "host.example.com")
        .unwrap_or_else(|err| panic!("configure: {err}"));
    assert_eq!(config.label, "host.example.com");
}

#[rstest]
fn label_without_usable_characters_is_rejected(options: DriverOptions) {
    let opts = DriverOptions {
        label: Some(String::from("!!!")),
        ..options
    };
    assert_eq!(
        Configuration::from_options(&opts, "ignored"),
        Err(ConfigError::EmptyLabel(String::from("!!!")))
    );
}

#[rstest]
#[case(None, "linode/ubuntu18.04", "root")]
#[case(None, "linode/containerlinux", "core")]
#[case(Some("admin"), "linode/containerlinux", "admin")]
#[case(Some(" "), "linode/debian11", "root")]
fn ssh_user_follows_image(
    #[case] explicit: Option<&str>,
    #[case] image: &str,
    #[case] expected: &str,
) {
    assert_eq!(ssh_user_for(explicit, image), expected);
}

#[rstest]
fn named_stackscript_is_parsed(options: DriverOptions) {
    let opts = DriverOptions {
        stackscript: Some(String::from("linode/docker")),
        stackscript_data: Some(String::from(r#"{"hostname":"web","tz":"UTC"}"#)),
        ..options
    };
    let config = configure(&opts);
    assert_eq!(
        config.stackscript,
        Some(StackScriptRef::Named {
            owner: String::from("linode"),
            label: String::from("docker"),
        })
    );
    assert_eq!(
        config.stackscript_data.get("hostname").map(String::as_str),
        Some("web")
    );
}

#[rstest]
fn numeric_stackscript_is_an_id(options: DriverOptions) {
    let opts = DriverOptions {
        stackscript: Some(String::from("10079")),
        ..options
    };
    assert_eq!(configure(&opts).stackscript, Some(StackScriptRef::Id(10079)));
}

#[rstest]
#[case("docker")]
#[case("/docker")]
#[case("linode/")]
#[case("a/b/c")]
fn malformed_stackscript_is_rejected(options: DriverOptions, #[case] raw: &str) {
    let opts = DriverOptions {
        stackscript: Some(raw.to_owned()),
        ..options
    };
    assert_eq!(
        Configuration::from_options(&opts, "m"),
        Err(ConfigError::MalformedStackScript(raw.to_owned()))
    );
}

#[rstest]
#[case("not json")]
#[case("[1, 2]")]
#[case(r#"{"nested": {"a": 1}}"#)]
fn invalid_stackscript_data_is_rejected(options: DriverOptions, #[case] raw: &str) {
    let opts = DriverOptions {
        stackscript: Some(String::from("linode/docker")),
        stackscript_data: Some(raw.to_owned()),
        ..options
    };
    assert!(matches!(
        Configuration::from_options(&opts, "m"),
        Err(ConfigError::InvalidStackScriptData(_))
    ));
}

#[rstest]
fn stackscript_data_without_stackscript_is_ignored(options: DriverOptions) {
    let opts = DriverOptions {
        stackscript: None,
        stackscript_data: Some(String::from("not json")),
        ..options
    };
    let config = configure(&opts);
    assert!(config.stackscript.is_none());
    assert!(config.stackscript_data.is_empty());
}

#[rstest]
fn blank_optional_strings_count_as_unset(options: DriverOptions) {
    let opts = DriverOptions {
        stackscript: Some(String::from("  ")),
        kernel: Some(String::new()),
        ua_prefix: Some(String::from(" ")),
        ..options
    };
    let config = configure(&opts);
    assert!(config.stackscript.is_none());
    assert!(config.kernel.is_none());
    assert!(config.user_agent_prefix.is_none());
}
