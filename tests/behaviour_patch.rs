//! Behaviour tests for rewriting pinned versions in SDK sources.

use camino::Utf8PathBuf;
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use sdk_checksum_sync::patch::{PatchError, PatchOutcome, patch_version};
use std::fs;
use tempfile::TempDir;

const IDENTIFIER: &str = "TEST_SERVER_VERSION";

#[derive(Default)]
struct PatchWorld {
    _temp_dir: Option<TempDir>,
    path: Option<Utf8PathBuf>,
    original: Option<String>,
    first_patch: Option<String>,
    outcome: Option<PatchOutcome>,
    error: Option<PatchError>,
}

impl PatchWorld {
    fn create(&mut self, file_name: &str, content: Option<String>) {
        let temp_dir = tempfile::tempdir().expect("create temp dir");
        let dir = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).expect("UTF-8 path");
        let path = dir.join(file_name);
        if let Some(content) = &content {
            fs::write(&path, content).expect("write source file");
        }
        self.original = content;
        self.path = Some(path);
        self._temp_dir = Some(temp_dir);
    }

    fn contents(&self) -> String {
        fs::read_to_string(self.path.as_ref().expect("path set")).expect("read source file")
    }
}

#[fixture]
fn world() -> PatchWorld {
    PatchWorld::default()
}

#[given("a Python installer pinned to {version}")]
fn given_python(world: &mut PatchWorld, version: String) {
    world.create(
        "install.py",
        Some(format!(
            "import os\n\n    {IDENTIFIER} = \"{version}\"  # bumped by release tooling\n"
        )),
    );
}

#[given("a TypeScript installer pinned to {version}")]
fn given_typescript(world: &mut PatchWorld, version: String) {
    world.create(
        "postinstall.js",
        Some(format!("const {IDENTIFIER} = '{version}';\n")),
    );
}

#[given("a helper module without a pinned version")]
fn given_helper(world: &mut PatchWorld) {
    world.create(
        "helpers.py",
        Some(format!(
            "def current():\n    return fetch({IDENTIFIER}, dest=\"bin\")\n"
        )),
    );
}

#[given("a path with no file")]
fn given_missing(world: &mut PatchWorld) {
    world.create("absent.py", None);
}

#[when("the file is patched to {version}")]
fn when_patched(world: &mut PatchWorld, version: String) {
    let path = world.path.clone().expect("path set");
    match patch_version(&path, &version, IDENTIFIER) {
        Ok(outcome) => {
            world.outcome = Some(outcome);
            world.error = None;
            if world.first_patch.is_none() {
                world.first_patch = Some(world.contents());
            }
        }
        Err(error) => {
            world.outcome = None;
            world.error = Some(error);
        }
    }
}

#[then("the file was patched")]
fn then_patched(world: &mut PatchWorld) {
    assert_eq!(
        world.outcome,
        Some(PatchOutcome::Patched { replacements: 1 })
    );
}

#[then("the file was skipped")]
fn then_skipped(world: &mut PatchWorld) {
    assert_eq!(world.outcome, Some(PatchOutcome::SkippedIdentifierNotFound));
}

#[then("the file pins {version} with its comment intact")]
fn then_pins_with_comment(world: &mut PatchWorld, version: String) {
    assert_eq!(
        world.contents(),
        format!("import os\n\n    {IDENTIFIER} = \"{version}\"  # bumped by release tooling\n")
    );
}

#[then("the file pins {version} in single quotes")]
fn then_pins_single_quoted(world: &mut PatchWorld, version: String) {
    assert_eq!(world.contents(), format!("const {IDENTIFIER} = '{version}';\n"));
}

#[then("the file contents match the first patch")]
fn then_stable(world: &mut PatchWorld) {
    assert_eq!(Some(world.contents()), world.first_patch);
}

#[then("the file is unchanged")]
fn then_unchanged(world: &mut PatchWorld) {
    assert_eq!(Some(world.contents()), world.original);
}

#[then("patching fails with a read error")]
fn then_read_error(world: &mut PatchWorld) {
    assert!(
        matches!(world.error, Some(PatchError::Read { .. })),
        "expected a read error, got {:?}",
        world.error
    );
}

#[scenario(
    path = "tests/features/patch.feature",
    name = "Rewrite a Python declaration"
)]
fn scenario_python(world: PatchWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/patch.feature",
    name = "Rewrite a TypeScript declaration"
)]
fn scenario_typescript(world: PatchWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/patch.feature", name = "Patching twice is stable")]
fn scenario_idempotent(world: PatchWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/patch.feature",
    name = "Skip a file without the identifier"
)]
fn scenario_skip(world: PatchWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/patch.feature", name = "Report a missing file")]
fn scenario_missing(world: PatchWorld) {
    let _ = world;
}
