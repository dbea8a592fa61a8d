use std::fs;

use rstest::rstest;
use tempfile::tempdir;
use vaultdex_core::config::{ConfigError, ConfigLoader};

fn load(contents: &str, vault: Option<&str>) -> Result<(), ConfigError> {
    let tmp = tempdir().unwrap();
    let path = tmp.path().join("config.toml");
    fs::write(&path, contents).unwrap();
    ConfigLoader::load(Some(&path), vault).map(|_| ())
}

#[test]
fn missing_file_is_not_found() {
    let tmp = tempdir().unwrap();
    let path = tmp.path().join("absent/config.toml");

    let err = ConfigLoader::load(Some(&path), None).unwrap_err();
    assert!(matches!(err, ConfigError::NotFound(p) if p.ends_with("config.toml")));
}

#[rstest]
#[case::bad_version("version = 2\n[vaults.a]\nroot = \"/tmp/a\"\n", None, "unsupported")]
#[case::no_vaults("version = 1\n", None, "no vaults")]
#[case::unknown_override("version = 1\n[vaults.a]\nroot = \"/tmp/a\"\n", Some("b"), "'b' not found")]
#[case::unknown_default(
    "version = 1\ndefault_vault = \"c\"\n[vaults.a]\nroot = \"/tmp/a\"\n",
    None,
    "'c' not found"
)]
#[case::broken_toml("version = 1\n[vaults.a\n", None, "failed to parse TOML")]
#[case::missing_root("version = 1\n[vaults.a]\nwatch = true\n", None, "failed to parse TOML")]
fn invalid_configs_are_rejected(
    #[case] contents: &str,
    #[case] vault: Option<&str>,
    #[case] message: &str,
) {
    let err = load(contents, vault).unwrap_err();
    assert!(err.to_string().contains(message), "{err}");
}

#[test]
fn bad_version_carries_the_number() {
    let err = load("version = 3\n[vaults.a]\nroot = \"/tmp/a\"\n", None).unwrap_err();
    assert!(matches!(err, ConfigError::BadVersion(3)));
}
