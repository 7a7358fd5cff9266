//! End-to-end synchronisation across two SDKs when one cannot be updated.

use camino::{Utf8Path, Utf8PathBuf};
use rstest::{fixture, rstest};
use sdk_checksum_sync::config::{Project, SyncConfig};
use sdk_checksum_sync::error::AppError;
use sdk_checksum_sync::fetch::{FetchError, ManifestFetcher};
use sdk_checksum_sync::ledger::{LedgerState, load};
use sdk_checksum_sync::patch::{PatchError, PatchOutcome};
use sdk_checksum_sync::sync::{RunOutcome, Stage, Synchronizer, TargetFailure, TargetStatus};
use sdk_checksum_sync::version_tag::VersionTag;
use std::fs;
use tempfile::TempDir;

const CHECKSUMS: &str = "\
1111111111111111111111111111111111111111111111111111111111111111  test-server_Darwin_arm64.tar.gz
2222222222222222222222222222222222222222222222222222222222222222  test-server_Linux_x86_64.tar.gz
3333333333333333333333333333333333333333333333333333333333333333  test-server_Windows_x86_64.zip
";

struct CannedRelease;

impl ManifestFetcher for CannedRelease {
    fn fetch_manifest(&self, project: &Project, tag: &VersionTag) -> Result<String, FetchError> {
        assert_eq!(project.name, "test-server");
        assert_eq!(tag.as_str(), "v0.2.0");
        Ok(CHECKSUMS.to_owned())
    }
}

struct Checkout {
    _temp: TempDir,
    root: Utf8PathBuf,
}

#[fixture]
fn checkout() -> Checkout {
    let temp = tempfile::tempdir().expect("temp dir");
    let root = Utf8PathBuf::try_from(temp.path().to_path_buf()).expect("UTF-8 path");
    Checkout { _temp: temp, root }
}

fn write(path: &Utf8Path, content: &str) {
    fs::create_dir_all(path.parent().expect("parent")).expect("create dir");
    fs::write(path, content).expect("write file");
}

const CONFIG: &str = r#"
[[sdk]]
name = "A"
dir = "sdks/a"
files = ["install.py"]

[[sdk]]
name = "B"
dir = "sdks/b"
files = ["postinstall.js", "README.md"]
"#;

#[rstest]
fn failing_sdk_does_not_stop_the_others(checkout: Checkout) {
    let root = &checkout.root;
    let config_path = root.join("sync.toml");
    write(&config_path, CONFIG);

    // A's installer path is occupied by a directory, so it cannot be patched.
    fs::create_dir_all(root.join("sdks/a/install.py")).expect("create blocking directory");
    write(
        &root.join("sdks/b/postinstall.js"),
        "const TEST_SERVER_VERSION = 'v0.1.0'; // pinned\n",
    );
    write(&root.join("sdks/b/README.md"), "# SDK B\n");

    let mut config = SyncConfig::load(&config_path).expect("load config");
    config.root.clone_from(root);
    let tag = VersionTag::try_from("v0.2.0").expect("valid tag");
    let mut trace = Vec::new();

    let report = Synchronizer::new(config)
        .run(&tag, &CannedRelease, &mut trace)
        .expect("manifest fetched");

    let outcome = report.outcome();
    assert_eq!(outcome, RunOutcome::PartialFailure(vec!["A".to_owned()]));

    let [a, b] = report.targets() else {
        panic!("expected two target reports");
    };
    match &a.status {
        TargetStatus::Failed(failure) => assert_eq!(failure.stage(), Stage::Patch),
        TargetStatus::Done => panic!("A should have failed"),
    }
    assert!(matches!(b.status, TargetStatus::Done));
    assert_eq!(
        b.files.iter().map(|f| f.outcome).collect::<Vec<_>>(),
        vec![
            PatchOutcome::Patched { replacements: 1 },
            PatchOutcome::SkippedIdentifierNotFound
        ]
    );

    assert_eq!(
        fs::read_to_string(root.join("sdks/b/postinstall.js")).expect("read B"),
        "const TEST_SERVER_VERSION = 'v0.2.0'; // pinned\n"
    );
    let LedgerState::Loaded(ledger) = load(&root.join("sdks/b/checksums.json")).expect("load")
    else {
        panic!("B's ledger should be written");
    };
    assert_eq!(
        ledger
            .manifest_for("v0.2.0")
            .and_then(|m| m.checksum_for("test-server_Windows_x86_64.zip")),
        Some("3333333333333333333333333333333333333333333333333333333333333333")
    );

    let trace = String::from_utf8(trace).expect("UTF-8 trace");
    assert!(trace.contains("Error updating A SDK"));
    assert!(trace.contains("--- Updating B SDK ---"));

    let RunOutcome::PartialFailure(failed) = outcome else {
        panic!("expected partial failure");
    };
    let err = AppError::PartialFailure { failed };
    assert_ne!(err.exit_code(), 0);
    assert_eq!(err.to_string(), "Failed to update SDKs: A");
}

#[cfg(unix)]
#[rstest]
fn read_only_installer_fails_without_being_replaced(checkout: Checkout) {
    use std::os::unix::fs::PermissionsExt;

    let root = &checkout.root;
    let config_path = root.join("sync.toml");
    write(&config_path, CONFIG);

    let original = "TEST_SERVER_VERSION = \"v0.1.0\"\n";
    let installer = root.join("sdks/a/install.py");
    write(&installer, original);
    fs::set_permissions(&installer, fs::Permissions::from_mode(0o444)).expect("chmod");
    if fs::OpenOptions::new().write(true).open(&installer).is_ok() {
        // Privileged users can write read-only files.
        return;
    }
    write(
        &root.join("sdks/b/postinstall.js"),
        "const TEST_SERVER_VERSION = 'v0.1.0';\n",
    );
    write(&root.join("sdks/b/README.md"), "# SDK B\n");

    let mut config = SyncConfig::load(&config_path).expect("load config");
    config.root.clone_from(root);
    let tag = VersionTag::try_from("v0.2.0").expect("valid tag");

    let report = Synchronizer::new(config)
        .run(&tag, &CannedRelease, &mut Vec::new())
        .expect("manifest fetched");

    assert_eq!(
        report.outcome(),
        RunOutcome::PartialFailure(vec!["A".to_owned()])
    );
    let [a, b] = report.targets() else {
        panic!("expected two target reports");
    };
    assert!(
        matches!(
            &a.status,
            TargetStatus::Failed(TargetFailure::Patch(PatchError::Write { .. }))
        ),
        "got {:?}",
        a.status
    );
    assert!(a.files.is_empty());
    assert!(matches!(b.status, TargetStatus::Done));
    assert_eq!(fs::read_to_string(&installer).expect("read A"), original);
    assert_eq!(
        fs::read_to_string(root.join("sdks/b/postinstall.js")).expect("read B"),
        "const TEST_SERVER_VERSION = 'v0.2.0';\n"
    );
}
