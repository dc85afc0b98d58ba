//! Integration tests for primecache

mod engine_tests {
    use primecache::config::Config;
    use primecache::engine::{Engine, GenerateOptions, Method};
    use primecache::primes::sieve_up_to;
    use primecache::resources::{GIB, Resources};
    use primecache::storage::{IncrementalCacheStore, STORE_FILE_NAME};
    use primecache::verify::VerifyOptions;
    use std::fs;
    use tempfile::TempDir;

    fn engine(dir: &TempDir) -> Engine {
        let store = IncrementalCacheStore::new(dir.path().join(STORE_FILE_NAME));
        Engine::new(store, &Config::default())
            .with_resources(Resources::from_readings(Some(8), Some(4), Some(16 * GIB)))
    }

    #[test]
    fn repeated_request_is_served_from_cache() {
        let dir = TempDir::new().unwrap();
        let engine = engine(&dir);
        let first = engine.ensure_primes_up_to(50_000, &GenerateOptions::default()).unwrap();
        assert!(first.computed.is_some());
        let bytes = fs::read(engine.store().path()).unwrap();

        let second = engine.ensure_primes_up_to(50_000, &GenerateOptions::default()).unwrap();
        assert!(second.computed.is_none());
        assert_eq!(first.primes, second.primes);
        assert_eq!(fs::read(engine.store().path()).unwrap(), bytes);
    }

    #[test]
    fn smaller_request_returns_subset_without_writing() {
        let dir = TempDir::new().unwrap();
        let engine = engine(&dir);
        engine.ensure_primes_up_to(100, &GenerateOptions::default()).unwrap();
        let modified = fs::metadata(engine.store().path()).unwrap().modified().unwrap();

        let view = engine.ensure_primes_up_to(50, &GenerateOptions::default()).unwrap();
        assert_eq!(
            view.primes.as_slice(),
            &[2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37, 41, 43, 47]
        );
        assert_eq!(view.max_checked, 50);
        assert!(view.computed.is_none());

        let stored = engine.store().load();
        assert_eq!(stored.max_checked, 100);
        assert_eq!(stored.primes.len(), 25);
        assert_eq!(fs::metadata(engine.store().path()).unwrap().modified().unwrap(), modified);
    }

    #[test]
    fn stepwise_extension_matches_direct_computation() {
        let stepped_dir = TempDir::new().unwrap();
        let direct_dir = TempDir::new().unwrap();
        let stepped = engine(&stepped_dir);
        let direct = engine(&direct_dir);

        for bound in [10, 1_000, 1_500, 40_000, 250_000] {
            stepped.ensure_primes_up_to(bound, &GenerateOptions::default()).unwrap();
        }
        let direct_view = direct.ensure_primes_up_to(250_000, &GenerateOptions::default()).unwrap();

        let stored = stepped.store().load();
        assert_eq!(stored.primes, direct_view.primes);
        assert_eq!(stored.max_checked, 250_000);
        assert_eq!(stored.primes.len(), 22_044);
    }

    #[test]
    fn parallel_matches_single_worker() {
        let single_dir = TempDir::new().unwrap();
        let parallel_dir = TempDir::new().unwrap();

        let single = GenerateOptions {
            worker_count: Some(1),
            segment_size: Some(65_536),
            method: Method::Sieve,
            ..GenerateOptions::default()
        };
        let parallel = GenerateOptions {
            worker_count: Some(4),
            segment_size: Some(65_536),
            method: Method::Sieve,
            ..GenerateOptions::default()
        };
        let a = engine(&single_dir).ensure_primes_up_to(2_000_000, &single).unwrap();
        let b = engine(&parallel_dir).ensure_primes_up_to(2_000_000, &parallel).unwrap();
        assert_eq!(a.primes.len(), 148_933);
        assert_eq!(a.primes, b.primes);
    }

    #[test]
    fn corrupt_store_is_rebuilt() {
        let dir = TempDir::new().unwrap();
        let engine = engine(&dir);
        engine.ensure_primes_up_to(1_000, &GenerateOptions::default()).unwrap();

        let mut bytes = fs::read(engine.store().path()).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xff;
        fs::write(engine.store().path(), &bytes).unwrap();

        assert!(!engine.verify_cache(&VerifyOptions::default()).is_ok());
        let view = engine.ensure_primes_up_to(1_000, &GenerateOptions::default()).unwrap();
        assert!(view.computed.is_some());
        assert_eq!(view.primes.as_slice(), sieve_up_to(1_000).as_slice());
        assert!(engine.verify_cache(&VerifyOptions::default()).is_ok());
    }

    #[test]
    fn force_rebuild_recomputes() {
        let dir = TempDir::new().unwrap();
        let engine = engine(&dir);
        engine.ensure_primes_up_to(5_000, &GenerateOptions::default()).unwrap();

        let opts = GenerateOptions {
            force_rebuild: true,
            ..GenerateOptions::default()
        };
        let view = engine.ensure_primes_up_to(3_000, &opts).unwrap();
        let run = view.computed.unwrap();
        assert_eq!(run.start, 1);
        assert_eq!(engine.store().load().max_checked, 3_000);
    }

    #[test]
    fn execution_log_records_generations() {
        let dir = TempDir::new().unwrap();
        let engine = engine(&dir);
        engine.ensure_primes_up_to(1_000, &GenerateOptions::default()).unwrap();
        engine.ensure_primes_up_to(1_000, &GenerateOptions::default()).unwrap();

        let log = fs::read_to_string(engine.store().execution_log_path()).unwrap();
        assert_eq!(log.lines().count(), 1);
        assert!(log.contains("| generate | 1000 | plain |"));
    }
}

mod cli_tests {
    use assert_cmd::{Command, cargo::cargo_bin_cmd};
    use predicates::prelude::*;
    use tempfile::TempDir;

    fn primecache(dir: &TempDir) -> Command {
        let mut cmd = cargo_bin_cmd!("primecache");
        cmd.arg("--store")
            .arg(dir.path().join("primes.bin"))
            .arg("--config")
            .arg(dir.path().join("config.toml"));
        cmd
    }

    #[test]
    fn help_displays() {
        cargo_bin_cmd!("primecache")
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("Incremental prime cache"));
    }

    #[test]
    fn generate_then_list() {
        let dir = TempDir::new().unwrap();
        primecache(&dir)
            .args(["generate", "30"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Total: 10 primes up to 30"));

        primecache(&dir)
            .args(["list", "--up-to", "12"])
            .assert()
            .success()
            .stdout("2\n3\n5\n7\n11\n");
    }

    #[test]
    fn second_generate_is_cached() {
        let dir = TempDir::new().unwrap();
        primecache(&dir).args(["generate", "1000"]).assert().success();
        primecache(&dir)
            .args(["generate", "500"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Already cached"));
    }

    #[test]
    fn stats_and_verify() {
        let dir = TempDir::new().unwrap();
        primecache(&dir)
            .arg("stats")
            .assert()
            .success()
            .stdout(predicate::str::contains("No prime cache"));
        primecache(&dir).arg("verify").assert().failure();

        primecache(&dir)
            .args(["generate", "10000", "--workers", "2", "--segment", "1000"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Segments: 10"));
        primecache(&dir)
            .arg("stats")
            .assert()
            .success()
            .stdout(predicate::str::contains("Primes:       1229"));
        primecache(&dir)
            .arg("verify")
            .assert()
            .success()
            .stdout(predicate::str::contains("Result:       OK"));
    }

    #[test]
    fn import_extends_cache() {
        let dir = TempDir::new().unwrap();
        let list = dir.path().join("primes.txt");
        let text = "The First 15 Primes\n2 3 5 7 11\n13 17 19 23 29\n31 37 41 43 47\n";
        std::fs::write(&list, text).unwrap();

        primecache(&dir)
            .arg("import")
            .arg(&list)
            .args(["--verified-up-to", "50"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Added 15 primes"));
        primecache(&dir)
            .args(["list"])
            .assert()
            .success()
            .stdout(predicate::str::ends_with("43\n47\n"));
    }

    #[test]
    fn import_rejects_composites() {
        let dir = TempDir::new().unwrap();
        let list = dir.path().join("bad.txt");
        std::fs::write(&list, "2 3 5 7 9\n").unwrap();

        primecache(&dir)
            .arg("import")
            .arg(&list)
            .args(["--verified-up-to", "10"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid import"));
    }

    #[test]
    fn unreadable_import_is_retryable() {
        let dir = TempDir::new().unwrap();
        primecache(&dir)
            .arg("import")
            .arg(dir.path().join("missing.txt"))
            .args(["--verified-up-to", "100"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("run the command again"));
    }

    #[test]
    fn bad_config_reports_hint() {
        let dir = TempDir::new().unwrap();
        let config = "[planner]\nplain_max = \"lots\"\n";
        std::fs::write(dir.path().join("config.toml"), config).unwrap();
        primecache(&dir)
            .arg("stats")
            .assert()
            .failure()
            .stderr(predicate::str::contains("Hint:"));
    }
}
