//! Integration tests for gemlayer

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;

    pub fn gemlayer() -> Command {
        let mut cmd = cargo_bin_cmd!("gemlayer");
        for var in [
            "CNB_APP_DIR",
            "CNB_LAYERS_DIR",
            "CNB_BP_PLAN_PATH",
            "CNB_STACK_ID",
            "CNB_BUILDPACK_DIR",
            "BP_KEEP_GEM_EXTENSION_BUILD_FILES",
            "BP_LOG_LEVEL",
        ] {
            cmd.env_remove(var);
        }
        cmd
    }

    #[test]
    fn help_displays() {
        gemlayer()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("cached bundle install"));
    }

    #[test]
    fn version_displays() {
        gemlayer()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("gemlayer"));
    }

    #[test]
    fn build_requires_layers_dir() {
        gemlayer()
            .args(["build", "--plan", "plan.toml"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("--layers-dir"));
    }

    #[test]
    fn missing_plan_reports_hint() {
        let dir = tempfile::TempDir::new().unwrap();
        gemlayer()
            .arg("build")
            .arg("--layers-dir")
            .arg(dir.path())
            .arg("--plan")
            .arg(dir.path().join("missing.toml"))
            .arg("--working-dir")
            .arg(dir.path())
            .assert()
            .failure()
            .stderr(predicate::str::contains("Build plan not found"))
            .stderr(predicate::str::contains("Hint:"));
    }

    #[test]
    fn invalid_keep_build_files_fails() {
        let dir = tempfile::TempDir::new().unwrap();
        gemlayer()
            .env("BP_KEEP_GEM_EXTENSION_BUILD_FILES", "banana")
            .arg("build")
            .arg("--layers-dir")
            .arg(dir.path())
            .arg("--plan")
            .arg(dir.path().join("plan.toml"))
            .assert()
            .failure()
            .stderr(predicate::str::contains(
                "failed to parse BP_KEEP_GEM_EXTENSION_BUILD_FILES",
            ));
    }
}

#[cfg(unix)]
mod build_tests {
    use super::cli_tests::gemlayer;
    use assert_cmd::Command;
    use predicates::prelude::*;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    const FAKE_RUBY: &str = r#"#!/bin/sh
echo "ruby 3.2.2 (2023-03-30 revision e51014f9c0) [x86_64-linux]"
"#;

    const FAKE_BUNDLE: &str = r##"#!/bin/sh
echo "$*" >> "$FAKE_BUNDLE_LOG"
if [ "$1" = "install" ]; then
  if [ -n "$FAKE_BUNDLE_FAIL" ]; then
    echo "Could not find gem 'rack' in locally installed gems." >&2
    exit 5
  fi
  slot=$(dirname "$BUNDLE_USER_CONFIG")
  mkdir -p "$slot/ruby/3.2.0/gems/rack-3.0.0/lib"
  echo "# rack" > "$slot/ruby/3.2.0/gems/rack-3.0.0/lib/rack.rb"
  echo "Bundle complete!"
fi
"##;

    struct Sandbox {
        _dir: TempDir,
        app: PathBuf,
        layers: PathBuf,
        plan: PathBuf,
        bin: PathBuf,
        log: PathBuf,
    }

    fn write_script(path: &Path, content: &str) {
        fs::write(path, content).unwrap();
        fs::set_permissions(path, fs::Permissions::from_mode(0o755)).unwrap();
    }

    fn sandbox() -> Sandbox {
        let dir = TempDir::new().unwrap();
        let app = dir.path().join("app");
        let layers = dir.path().join("layers");
        let bin = dir.path().join("bin");
        for path in [&app, &layers, &bin] {
            fs::create_dir_all(path).unwrap();
        }

        fs::write(app.join("Gemfile"), "source 'https://rubygems.org'\ngem 'rack'\n").unwrap();
        fs::write(app.join("Gemfile.lock"), "GEM\n  specs:\n    rack (3.0.0)\n").unwrap();

        let plan = dir.path().join("plan.toml");
        fs::write(
            &plan,
            "[[entries]]\nname = \"gems\"\n[entries.metadata]\nbuild = true\n\n[[entries]]\nname = \"gems\"\n[entries.metadata]\nlaunch = true\n",
        )
        .unwrap();

        write_script(&bin.join("ruby"), FAKE_RUBY);
        write_script(&bin.join("bundle"), FAKE_BUNDLE);

        let log = dir.path().join("bundle.log");
        Sandbox {
            _dir: dir,
            app,
            layers,
            plan,
            bin,
            log,
        }
    }

    impl Sandbox {
        fn command(&self, subcommand: &str, stack: &str) -> Command {
            let mut cmd = gemlayer();
            cmd.env("FAKE_BUNDLE_LOG", &self.log)
                .arg(subcommand)
                .arg("--working-dir")
                .arg(&self.app)
                .arg("--layers-dir")
                .arg(&self.layers)
                .arg("--plan")
                .arg(&self.plan)
                .arg("--stack")
                .arg(stack)
                .arg("--bundle")
                .arg(self.bin.join("bundle"))
                .arg("--ruby")
                .arg(self.bin.join("ruby"));
            cmd
        }

        fn bundle_calls(&self) -> Vec<String> {
            fs::read_to_string(&self.log)
                .unwrap_or_default()
                .lines()
                .map(str::to_string)
                .collect()
        }
    }

    #[test]
    fn fresh_build_installs_both_slots() {
        let sandbox = sandbox();

        sandbox
            .command("build", "some-stack")
            .assert()
            .success()
            .stdout(predicate::str::contains("Bundle Install"))
            .stdout(predicate::str::contains(
                "Executing build environment install process",
            ))
            .stdout(predicate::str::contains(
                "Executing launch environment install process",
            ))
            .stdout(predicate::str::contains("Configuring launch environment"));

        let calls = sandbox.bundle_calls();
        assert_eq!(
            calls[..4],
            [
                "config --global clean true".to_string(),
                format!(
                    "config --global path {}",
                    sandbox.layers.join("build-gems").display()
                ),
                "config --global cache_path --parseable".to_string(),
                "install".to_string(),
            ]
        );
        assert!(calls.contains(&"config --global without development:test".to_string()));

        let document = fs::read_to_string(sandbox.layers.join("build-gems.toml")).unwrap();
        assert!(document.contains("stack = \"some-stack\""));
        assert!(document.contains("runtime_version = \"3.2.2\""));

        assert!(sandbox
            .layers
            .join("launch-gems/ruby/3.2.0/gems/rack-3.0.0/lib/rack.rb")
            .exists());
        let env = fs::read_to_string(
            sandbox
                .layers
                .join("launch-gems/env.launch/BUNDLE_USER_CONFIG.default"),
        )
        .unwrap();
        assert_eq!(
            env,
            sandbox.layers.join("launch-gems/config").display().to_string()
        );
    }

    #[test]
    fn second_build_reuses_slots() {
        let sandbox = sandbox();
        sandbox.command("build", "some-stack").assert().success();
        let first = sandbox.bundle_calls().len();
        let document = fs::read_to_string(sandbox.layers.join("launch-gems.toml")).unwrap();

        sandbox
            .command("build", "some-stack")
            .assert()
            .success()
            .stdout(predicate::str::contains("Reusing cached layer"))
            .stdout(predicate::str::contains("Executing").not());

        assert_eq!(sandbox.bundle_calls().len(), first);
        assert_eq!(
            fs::read_to_string(sandbox.layers.join("launch-gems.toml")).unwrap(),
            document
        );
    }

    #[test]
    fn changed_lockfile_rebuilds() {
        let sandbox = sandbox();
        sandbox.command("build", "some-stack").assert().success();

        fs::write(
            sandbox.app.join("Gemfile.lock"),
            "GEM\n  specs:\n    rack (3.0.1)\n",
        )
        .unwrap();

        sandbox
            .command("build", "some-stack")
            .assert()
            .success()
            .stdout(predicate::str::contains(
                "Executing build environment install process",
            ));
    }

    #[test]
    fn stack_change_clears_slots() {
        let sandbox = sandbox();
        sandbox.command("build", "stack-a").assert().success();

        sandbox
            .command("build", "stack-b")
            .assert()
            .success()
            .stdout(predicate::str::contains(
                "Stack upgraded from stack-a to stack-b, clearing cached gems",
            ));

        let document = fs::read_to_string(sandbox.layers.join("build-gems.toml")).unwrap();
        assert!(document.contains("stack = \"stack-b\""));
    }

    #[test]
    fn failed_rebuild_on_new_stack_is_not_reused() {
        let sandbox = sandbox();
        sandbox.command("build", "stack-a").assert().success();

        sandbox
            .command("build", "stack-b")
            .env("FAKE_BUNDLE_FAIL", "1")
            .assert()
            .failure();

        let build_reuse = format!(
            "Reusing cached layer {}",
            sandbox.layers.join("build-gems").display()
        );
        sandbox
            .command("build", "stack-a")
            .assert()
            .success()
            .stdout(predicate::str::contains(build_reuse).not())
            .stdout(predicate::str::contains(
                "Executing build environment install process",
            ));
        assert!(sandbox
            .layers
            .join("build-gems/ruby/3.2.0/gems/rack-3.0.0/lib/rack.rb")
            .exists());
    }

    #[test]
    fn non_utf8_environment_is_tolerated() {
        use std::ffi::OsString;
        use std::os::unix::ffi::OsStringExt;

        let sandbox = sandbox();
        sandbox
            .command("build", "some-stack")
            .env("SOME_VAR", OsString::from_vec(vec![b'f', 0xff, b'o']))
            .assert()
            .success()
            .stdout(predicate::str::contains(
                "Executing build environment install process",
            ));
    }

    #[test]
    fn local_config_is_projected_then_removed() {
        let sandbox = sandbox();
        fs::create_dir_all(sandbox.app.join(".bundle")).unwrap();
        fs::write(sandbox.app.join(".bundle/config"), "BUNDLE_JOBS: \"4\"\n").unwrap();

        sandbox.command("build", "some-stack").assert().success();

        assert_eq!(
            fs::read_to_string(sandbox.layers.join("build-gems/config")).unwrap(),
            "BUNDLE_JOBS: \"4\"\n"
        );
        assert!(!sandbox.app.join(".bundle/config").exists());
        assert!(!sandbox.app.join(".bundle/config.bak").exists());
    }

    #[test]
    fn failed_install_reports_output_and_restores_config() {
        let sandbox = sandbox();
        fs::create_dir_all(sandbox.app.join(".bundle")).unwrap();
        fs::write(sandbox.app.join(".bundle/config"), "original").unwrap();

        sandbox
            .command("build", "some-stack")
            .env("FAKE_BUNDLE_FAIL", "1")
            .assert()
            .failure()
            .stderr(predicate::str::contains("failed to execute"))
            .stderr(predicate::str::contains("Could not find gem 'rack'"));

        assert_eq!(
            fs::read_to_string(sandbox.app.join(".bundle/config")).unwrap(),
            "original"
        );
        assert_eq!(
            fs::read_to_string(sandbox.app.join(".bundle/config.bak")).unwrap(),
            "original"
        );
        assert!(!sandbox.layers.join("build-gems.toml").exists());
    }

    #[test]
    fn status_reports_without_installing() {
        let sandbox = sandbox();

        sandbox
            .command("status", "some-stack")
            .args(["--format", "json"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"decided_rebuild\""));
        assert!(sandbox.bundle_calls().is_empty());

        sandbox.command("build", "some-stack").assert().success();

        sandbox
            .command("status", "some-stack")
            .assert()
            .success()
            .stdout(predicate::str::contains("launch-gems"))
            .stdout(predicate::str::contains("reuse"));
    }
}
