//! Integration tests for proxy-cache

mod resolver;

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn proxy_cache(temp: &Path) -> Command {
        let mut cmd = cargo_bin_cmd!("proxy-cache");
        cmd.env_remove("PROXY_CACHE_DIR")
            .env_remove("PROXY_CACHE_CONFIG")
            .arg("--config")
            .arg(temp.join("config.toml"))
            .arg("--cache-dir")
            .arg(temp.join("cache"));
        cmd
    }

    fn write_manifest(temp: &Path, version_code: i64, last_update_time: i64) -> std::path::PathBuf {
        let path = temp.join("package.json");
        fs::write(
            &path,
            format!(
                r#"{{"version_code": {}, "last_update_time": {}}}"#,
                version_code, last_update_time
            ),
        )
        .unwrap();
        path
    }

    #[test]
    fn help_displays() {
        let temp = TempDir::new().unwrap();
        proxy_cache(temp.path())
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("proxy artifact cache"));
    }

    #[test]
    fn version_displays() {
        let temp = TempDir::new().unwrap();
        proxy_cache(temp.path())
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("proxy-cache"));
    }

    #[test]
    fn config_path() {
        let temp = TempDir::new().unwrap();
        proxy_cache(temp.path())
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("config.toml"));
    }

    #[test]
    fn config_init_then_show() {
        let temp = TempDir::new().unwrap();
        proxy_cache(temp.path())
            .args(["config", "init"])
            .assert()
            .success();
        assert!(temp.path().join("config.toml").exists());

        proxy_cache(temp.path())
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[cache]"))
            .stdout(predicate::str::contains("proxyThumb"));
    }

    #[test]
    fn status_without_thumbprint() {
        let temp = TempDir::new().unwrap();
        proxy_cache(temp.path())
            .arg("status")
            .assert()
            .success()
            .stdout(predicate::str::contains("No thumbprint recorded"));
    }

    #[test]
    fn list_empty_json() {
        let temp = TempDir::new().unwrap();
        proxy_cache(temp.path())
            .args(["list", "--format", "json"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[]"));
    }

    #[test]
    fn purge_requires_manifest() {
        let temp = TempDir::new().unwrap();
        proxy_cache(temp.path())
            .arg("purge")
            .assert()
            .failure()
            .stderr(predicate::str::contains("Hint:"));
    }

    #[test]
    fn purge_records_thumbprint_and_removes_stale_files() {
        let temp = TempDir::new().unwrap();
        let secondary = temp.path().join("cache").join("secondary");
        fs::create_dir_all(secondary.join("optimized")).unwrap();
        fs::write(secondary.join("proxyThumb"), "50-1\n").unwrap();
        fs::write(secondary.join("a.B-C-50-1.dex"), b"old").unwrap();
        fs::write(secondary.join("optimized").join("a.B-C-50-1.odex"), b"old").unwrap();
        fs::write(secondary.join("a.B-C-100-2.dex"), b"new").unwrap();

        let manifest = write_manifest(temp.path(), 2, 100);
        proxy_cache(temp.path())
            .arg("purge")
            .arg("--manifest")
            .arg(&manifest)
            .assert()
            .success()
            .stdout(predicate::str::contains("removed 2 file(s)"));

        assert!(!secondary.join("a.B-C-50-1.dex").exists());
        assert!(!secondary.join("optimized").join("a.B-C-50-1.odex").exists());
        assert!(secondary.join("a.B-C-100-2.dex").exists());

        proxy_cache(temp.path())
            .args(["status", "--manifest"])
            .arg(&manifest)
            .assert()
            .success()
            .stdout(predicate::str::contains("Persisted: 100-2"))
            .stdout(predicate::str::contains("up to date"));
    }

    #[test]
    fn purge_all_with_yes() {
        let temp = TempDir::new().unwrap();
        let secondary = temp.path().join("cache").join("secondary");
        fs::create_dir_all(&secondary).unwrap();
        fs::write(secondary.join("a.B-C-1-1.jar"), b"x").unwrap();

        proxy_cache(temp.path())
            .args(["purge", "--all", "--yes"])
            .assert()
            .success();

        assert!(!secondary.join("a.B-C-1-1.jar").exists());
        assert!(secondary.is_dir());
    }

    #[test]
    fn list_plain_shows_files() {
        let temp = TempDir::new().unwrap();
        let secondary = temp.path().join("cache").join("secondary");
        fs::create_dir_all(&secondary).unwrap();
        fs::write(secondary.join("a.B-C-1-1.dex"), b"x").unwrap();

        proxy_cache(temp.path())
            .args(["list", "--format", "plain"])
            .assert()
            .success()
            .stdout(predicate::str::contains("a.B-C-1-1.dex"));
    }
}
