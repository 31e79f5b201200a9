//! Integration tests for pkgflow

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::path::Path;
    use tempfile::TempDir;

    /// Environment a CI runner may set that would leak into the tests
    const AMBIENT_ENV: [&str; 8] = [
        "GITHUB_OUTPUT",
        "GITHUB_SHA",
        "PKGFLOW_CONFIG",
        "INPUT_TOKEN",
        "INPUT_URL",
        "INPUT_CACHE_PREFIX",
        "INPUT_PATH",
        "INPUT_DEBUG",
    ];

    fn pkgflow() -> Command {
        let mut cmd = cargo_bin_cmd!("pkgflow");
        for var in AMBIENT_ENV {
            cmd.env_remove(var);
        }
        cmd
    }

    /// Config file with no backoff so retry tests finish quickly
    fn write_config(dir: &Path) -> std::path::PathBuf {
        let path = dir.join("config.toml");
        let store = dir.join("cache-store");
        std::fs::write(
            &path,
            format!(
                "[upload]\nbase_delay_secs = 0\nattempt_timeout_secs = 30\n\n[cache]\nstore_dir = \"{}\"\n",
                store.display()
            ),
        )
        .unwrap();
        path
    }

    #[test]
    fn help_displays() {
        pkgflow()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("build and publish .deb/.rpm packages"));
    }

    #[test]
    fn package_help_lists_pkg_version() {
        pkgflow()
            .args(["package", "--help"])
            .assert()
            .success()
            .stdout(predicate::str::contains("--pkg-version"))
            .stdout(predicate::str::contains("--version"));
    }

    #[test]
    fn version_displays() {
        pkgflow()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("pkgflow"));
    }

    #[test]
    fn config_path_honors_flag() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("custom.toml");
        pkgflow()
            .args(["--config", path.to_str().unwrap(), "config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("custom.toml"));
    }

    #[test]
    fn config_show_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("missing.toml");
        pkgflow()
            .args(["--config", path.to_str().unwrap(), "config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[upload]"))
            .stdout(predicate::str::contains("https://go.packager.io"));
    }

    #[test]
    fn config_init_then_set() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        let path_str = path.to_str().unwrap();

        pkgflow()
            .args(["--config", path_str, "config", "init"])
            .assert()
            .success();
        pkgflow()
            .args(["--config", path_str, "config", "set", "build.runtime", "podman"])
            .assert()
            .success();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("runtime = \"podman\""));
    }

    #[test]
    fn completions_generate() {
        pkgflow()
            .args(["completions", "bash"])
            .assert()
            .success()
            .stdout(predicate::str::contains("pkgflow"));
    }

    #[test]
    fn publish_rejects_repository_without_slash() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("demo.deb");
        std::fs::write(&file, b"deb").unwrap();

        // Port 9 is never contacted: validation fails first
        pkgflow()
            .args([
                "publish",
                "--file",
                file.to_str().unwrap(),
                "--target",
                "ubuntu-22.04",
                "--repository",
                "onlyorgname",
                "--channel",
                "main",
                "--token",
                "tok",
                "--url",
                "http://127.0.0.1:9",
            ])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid repository format"));
    }

    #[test]
    fn publish_missing_file_fails() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("absent.rpm");

        pkgflow()
            .args([
                "publish",
                "--file",
                file.to_str().unwrap(),
                "--target",
                "el-9",
                "--repository",
                "acme/tools",
                "--channel",
                "main",
                "--token",
                "tok",
            ])
            .assert()
            .failure()
            .stderr(predicate::str::contains("File not found"));
    }

    #[test]
    fn package_missing_source_dir_fails() {
        let temp = TempDir::new().unwrap();
        let config = write_config(temp.path());

        pkgflow()
            .args([
                "--config",
                config.to_str().unwrap(),
                "package",
                "--target",
                "ubuntu-22.04",
                "--name",
                "demo",
                "--pkg-version",
                "1.0.0",
                "--pkgr-version",
                "1.4.0",
                "--path",
                temp.path().join("nope").to_str().unwrap(),
            ])
            .assert()
            .failure()
            .stderr(predicate::str::contains("File not found"));
    }

    #[cfg(unix)]
    #[test]
    fn package_with_stub_runtime() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let config = write_config(temp.path());
        let app = temp.path().join("app");
        std::fs::create_dir_all(&app).unwrap();
        let outputs = temp.path().join("github_output");

        // Stands in for docker: writes a package into the output mount
        let runtime = temp.path().join("fake-docker");
        std::fs::write(
            &runtime,
            r#"#!/bin/sh
while [ $# -gt 0 ]; do
  if [ "$1" = "-v" ]; then
    case "$2" in *:/pkgr/output) out="${2%:/pkgr/output}";; esac
    shift
  fi
  shift
done
echo "packaging into $out"
printf 'deb' > "$out/demo_1.0.0-1_amd64.deb"
"#,
        )
        .unwrap();
        std::fs::set_permissions(&runtime, std::fs::Permissions::from_mode(0o755)).unwrap();

        pkgflow()
            .args([
                "--config",
                config.to_str().unwrap(),
                "package",
                "--target",
                "ubuntu-22.04",
                "--name",
                "demo",
                "--pkg-version",
                "1.0.0",
                "--pkgr-version",
                "1.4.0",
                "--path",
                app.to_str().unwrap(),
                "--revision",
                "0123456789abcdef",
                "--workspace",
                temp.path().join("ws").to_str().unwrap(),
                "--runtime",
                runtime.to_str().unwrap(),
                "--output-file",
                outputs.to_str().unwrap(),
            ])
            .assert()
            .success()
            .stdout(predicate::str::contains("package_name=demo_1.0.0-1_amd64.deb"))
            .stdout(predicate::str::contains("package_type=deb"))
            .stdout(predicate::str::contains("package_size=3"));

        let written = std::fs::read_to_string(&outputs).unwrap();
        assert!(written.contains("iteration="));
        assert!(written.contains(".ubuntu\n"));

        // Cache saved under the primary key
        let saved: Vec<_> = std::fs::read_dir(temp.path().join("cache-store"))
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(saved.len(), 1);
        assert!(saved[0].contains("0123456789abcdef"));
    }

    #[cfg(unix)]
    #[test]
    fn package_surfaces_tool_failure() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let config = write_config(temp.path());
        let runtime = temp.path().join("failing-docker");
        std::fs::write(&runtime, "#!/bin/sh\necho 'E: missing build dependency' >&2\nexit 4\n")
            .unwrap();
        std::fs::set_permissions(&runtime, std::fs::Permissions::from_mode(0o755)).unwrap();

        pkgflow()
            .args([
                "--config",
                config.to_str().unwrap(),
                "package",
                "--target",
                "debian-12",
                "--name",
                "demo",
                "--pkg-version",
                "1.0.0",
                "--pkgr-version",
                "1.4.0",
                "--path",
                temp.path().to_str().unwrap(),
                "--workspace",
                temp.path().join("ws").to_str().unwrap(),
                "--runtime",
                runtime.to_str().unwrap(),
                "--no-cache",
            ])
            .assert()
            .failure()
            .stderr(predicate::str::contains("exited with code 4"))
            .stderr(predicate::str::contains("E: missing build dependency"));
    }
}

mod publish_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use httptest::{matchers::*, responders::*, Expectation, Server};
    use predicates::prelude::*;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    struct Fixture {
        _temp: TempDir,
        config: PathBuf,
        file: PathBuf,
        outputs: PathBuf,
    }

    fn fixture() -> Fixture {
        let temp = TempDir::new().unwrap();
        let config = temp.path().join("config.toml");
        std::fs::write(&config, "[upload]\nbase_delay_secs = 0\n").unwrap();
        let file = temp.path().join("demo_1.0.0_amd64.deb");
        std::fs::write(&file, b"!<arch>\ndebian-binary").unwrap();
        let outputs = temp.path().join("github_output");
        Fixture {
            _temp: temp,
            config,
            file,
            outputs,
        }
    }

    fn publish(fixture: &Fixture, url: &str, token: &str) -> Command {
        let mut cmd = cargo_bin_cmd!("pkgflow");
        cmd.env_remove("GITHUB_OUTPUT").env_remove("PKGFLOW_CONFIG");
        cmd.args([
            "--config",
            path_str(&fixture.config),
            "publish",
            "--file",
            path_str(&fixture.file),
            "--target",
            "ubuntu-22.04",
            "--repository",
            "acme/tools",
            "--channel",
            "main",
            "--token",
            token,
            "--url",
            url,
            "--output-file",
            path_str(&fixture.outputs),
        ]);
        cmd
    }

    fn path_str(path: &Path) -> &str {
        path.to_str().unwrap()
    }

    #[test]
    fn publish_prints_uuid() {
        let server = Server::run();
        server.expect(
            Expectation::matching(all_of![
                request::method_path("POST", "/api/upload"),
                request::body(matches("name=\"repo\"")),
                request::body(matches("demo_1.0.0_amd64.deb")),
            ])
            .respond_with(status_code(201).body(
                r#"{"package":{"uuid":"5f0c","name":"demo","version":"1.0.0","architecture":"amd64"}}"#,
            )),
        );

        let fixture = fixture();
        publish(&fixture, &server.url_str(""), "tok")
            .assert()
            .success()
            .stdout(predicate::str::contains("uuid=5f0c"));

        let written = std::fs::read_to_string(&fixture.outputs).unwrap();
        assert_eq!(written, "uuid=5f0c\n");
    }

    #[test]
    fn publish_retries_then_reports_last_error() {
        let server = Server::run();
        server.expect(
            Expectation::matching(request::method_path("POST", "/api/upload"))
                .times(3)
                .respond_with(status_code(503).body(r#"{"message":"maintenance"}"#)),
        );

        let fixture = fixture();
        publish(&fixture, &server.url_str(""), "tok")
            .assert()
            .failure()
            .stderr(predicate::str::contains("Upload failed (503): maintenance"))
            .stderr(predicate::str::contains("re-running may succeed"));
        assert!(!fixture.outputs.exists());
    }

    #[test]
    fn publish_stops_on_missing_uuid() {
        let server = Server::run();
        server.expect(
            Expectation::matching(request::method_path("POST", "/api/upload"))
                .times(1)
                .respond_with(status_code(201).body(r#"{"package":{}}"#)),
        );

        let fixture = fixture();
        publish(&fixture, &server.url_str(""), "tok")
            .assert()
            .failure()
            .stderr(predicate::str::contains("No UUID returned in response"));
    }

    #[test]
    fn token_never_printed() {
        let server = Server::run();
        server.expect(
            Expectation::matching(request::method_path("POST", "/api/upload"))
                .times(1)
                .respond_with(status_code(401).body("token sekret-value rejected")),
        );

        let fixture = fixture();
        publish(&fixture, &server.url_str(""), "sekret-value")
            .args(["--max-attempts", "1", "-vv"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("token *** rejected"))
            .stderr(predicate::str::contains("sekret-value").not());
    }
}
