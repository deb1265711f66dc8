//! # Integration Flows
//!
//! The registry, router and bootstrap loader wired together exactly as the
//! server wires them, minus the transport.
//!
//! Most flows run on [`ExactSetFilter`](crate::fixtures::ExactSetFilter) so
//! negative membership answers are exact; persistence flows run on the real
//! [`PersistentFilter`](nsbloom_filters::PersistentFilter).

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::fs;
    use std::sync::Barrier;

    use axum::http::Method;
    use nsbloom_core::{MetricsSnapshot, Namespace, Reply, RequestParams, ServerContext};
    use nsbloom_filters::{MembershipFilter, PersistentFilter};
    use parking_lot::Mutex;
    use rand::distributions::Alphanumeric;
    use rand::Rng;

    use crate::fixtures::{bloom_dir, ExactSetFilter};

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    fn request(key: &str, ns: &str) -> RequestParams {
        RequestParams {
            key: Some(key.into()),
            ns: Some(ns.into()),
            metrics: None,
        }
    }

    fn metrics_request() -> RequestParams {
        RequestParams {
            metrics: Some("1".into()),
            ..RequestParams::default()
        }
    }

    fn add<F: MembershipFilter>(context: &ServerContext<F>, key: &str, ns: &str) -> Reply {
        context.router().handle(&Method::POST, &request(key, ns))
    }

    fn query<F: MembershipFilter>(context: &ServerContext<F>, key: &str, ns: &str) -> Reply {
        context.router().handle(&Method::GET, &request(key, ns))
    }

    fn namespace(raw: &str) -> Namespace {
        Namespace::parse(raw, 200).unwrap()
    }

    fn random_key(rng: &mut impl Rng) -> String {
        rng.sample_iter(&Alphanumeric)
            .take(24)
            .map(char::from)
            .collect()
    }

    // =============================================================================
    // NAMESPACES
    // =============================================================================

    #[test]
    fn test_namespaces_never_share_keys() {
        let (_dir, config) = bloom_dir();
        let context = ServerContext::<ExactSetFilter>::bootstrap(config).unwrap();
        let mut rng = rand::thread_rng();

        let keys: Vec<String> = (0..50).map(|_| random_key(&mut rng)).collect();
        for key in &keys {
            assert!(matches!(add(&context, key, "a"), Reply::Added(_)));
        }

        for key in &keys {
            assert_eq!(query(&context, key, "a"), Reply::Member(true));
            assert_eq!(query(&context, key, "b"), Reply::Member(false));
            assert_eq!(query(&context, key, ""), Reply::Member(false));
            assert_eq!(query(&context, key, "global"), Reply::Member(false));
        }
    }

    #[test]
    fn test_global_is_the_default_namespace() {
        let (dir, config) = bloom_dir();
        let context = ServerContext::<ExactSetFilter>::bootstrap(config).unwrap();

        assert_eq!(add(&context, "foo", "global"), Reply::Added(0));
        assert_eq!(add(&context, "foo", ""), Reply::Exists);
        assert_eq!(query(&context, "foo", ""), Reply::Member(true));

        assert_eq!(context.registry().len(), 1);
        assert!(dir.path().join("global.bf").is_file());
    }

    #[test]
    fn test_add_is_idempotent() {
        let (_dir, config) = bloom_dir();
        let context = ServerContext::<ExactSetFilter>::bootstrap(config).unwrap();

        assert_eq!(add(&context, "foo", "users"), Reply::Added(0));
        for _ in 0..5 {
            assert_eq!(add(&context, "foo", "users"), Reply::Exists);
        }

        assert_eq!(context.metrics().snapshot().additions, 1);
        // Duplicates never consume an id
        assert_eq!(add(&context, "bar", "users"), Reply::Added(1));
    }

    #[test]
    fn test_rejected_requests_create_nothing() {
        let (dir, config) = bloom_dir();
        let context = ServerContext::<ExactSetFilter>::bootstrap(config).unwrap();

        let long = "k".repeat(257);
        assert_eq!(add(&context, &long, "fresh"), Reply::KeyTooLong);
        assert_eq!(add(&context, "foo", "a/b"), Reply::InvalidNamespace);
        assert_eq!(add(&context, "foo", ".."), Reply::InvalidNamespace);

        assert_eq!(context.registry().len(), 1);
        let files: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(files.len(), 1);
    }

    // =============================================================================
    // CONCURRENCY
    // =============================================================================

    #[test]
    fn test_concurrent_adds_of_one_key_succeed_once() {
        const THREADS: usize = 16;
        let (dir, config) = bloom_dir();
        let context = ServerContext::<ExactSetFilter>::bootstrap(config).unwrap();
        let barrier = Barrier::new(THREADS);
        let replies = Mutex::new(Vec::new());

        std::thread::scope(|s| {
            for _ in 0..THREADS {
                s.spawn(|| {
                    barrier.wait();
                    let reply = add(&context, "contended", "race");
                    replies.lock().push(reply);
                });
            }
        });

        let replies = replies.into_inner();
        let added = replies
            .iter()
            .filter(|r| matches!(r, Reply::Added(_)))
            .count();
        assert_eq!(added, 1);
        assert_eq!(
            replies.iter().filter(|r| **r == Reply::Exists).count(),
            THREADS - 1
        );

        // The namespace was created exactly once
        assert_eq!(context.registry().len(), 2);
        let mut files: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        files.sort();
        assert_eq!(files, ["global.bf", "race.bf"]);
        assert_eq!(context.metrics().snapshot().namespaces, 2);
        assert_eq!(context.metrics().snapshot().additions, 1);
    }

    #[test]
    fn test_concurrent_adds_get_unique_ids() {
        const THREADS: usize = 8;
        const PER_THREAD: usize = 100;
        let (_dir, config) = bloom_dir();
        let context = ServerContext::<ExactSetFilter>::bootstrap(config).unwrap();
        let barrier = Barrier::new(THREADS);
        let ids = Mutex::new(Vec::new());

        std::thread::scope(|s| {
            for t in 0..THREADS {
                let (context, barrier, ids) = (&context, &barrier, &ids);
                s.spawn(move || {
                    barrier.wait();
                    for i in 0..PER_THREAD {
                        // Spread writers over a few namespaces sharing one counter
                        let ns = format!("ns{}", (t + i) % 3);
                        match add(context, &format!("t{t}-k{i}"), &ns) {
                            Reply::Added(id) => ids.lock().push(id),
                            other => panic!("unexpected reply {other:?}"),
                        }
                    }
                });
            }
        });

        let ids = ids.into_inner();
        let unique: HashSet<u64> = ids.iter().copied().collect();
        assert_eq!(ids.len(), THREADS * PER_THREAD);
        assert_eq!(unique.len(), ids.len());
        assert_eq!(unique, (0..(THREADS * PER_THREAD) as u64).collect());
    }

    // =============================================================================
    // METRICS
    // =============================================================================

    #[test]
    fn test_metrics_account_for_every_request() {
        let (_dir, config) = bloom_dir();
        let context = ServerContext::<ExactSetFilter>::bootstrap(config).unwrap();

        add(&context, "a", "");
        add(&context, "b", "");
        add(&context, "a", "");
        add(&context, "a", "other");

        query(&context, "a", "");
        query(&context, "b", "");
        query(&context, "c", "");
        query(&context, "a", "other");
        query(&context, "b", "other");

        // Rejections are not counted as queries
        query(&context, &"k".repeat(300), "");

        let expected = MetricsSnapshot {
            queries: 5,
            hits: 3,
            misses: 2,
            additions: 3,
            namespaces: 2,
        };
        assert_eq!(
            context.router().handle(&Method::GET, &metrics_request()),
            Reply::Metrics(expected)
        );
    }

    // =============================================================================
    // BOOTSTRAP
    // =============================================================================

    #[test]
    fn test_bootstrap_loads_every_filter_file() {
        let (dir, config) = bloom_dir();
        for (ns, key) in [("a", "apple"), ("b", "banana"), ("global", "grape")] {
            let path = dir.path().join(format!("{ns}.bf"));
            let mut filter = ExactSetFilter::create(&path, &config.filter).unwrap();
            filter.add(key.as_bytes(), 0);
            filter.flush().unwrap();
        }
        // Ignored: wrong extension, directories, invalid namespace stems
        fs::write(dir.path().join("notes.txt"), b"not a filter").unwrap();
        fs::create_dir(dir.path().join("nested.bf")).unwrap();
        fs::write(dir.path().join("bad name.bf"), b"").unwrap();

        let context = ServerContext::<ExactSetFilter>::bootstrap(config).unwrap();

        assert_eq!(
            context.registry().namespaces(),
            vec![Namespace::default(), namespace("a"), namespace("b")]
        );
        assert_eq!(context.metrics().snapshot().namespaces, 3);

        assert_eq!(query(&context, "apple", "a"), Reply::Member(true));
        assert_eq!(query(&context, "banana", "b"), Reply::Member(true));
        assert_eq!(query(&context, "grape", ""), Reply::Member(true));
        assert_eq!(query(&context, "apple", "b"), Reply::Member(false));
    }

    #[test]
    fn test_bootstrap_recreates_damaged_filters() {
        let (dir, config) = bloom_dir();
        let damaged = dir.path().join("damaged.bf");
        fs::write(&damaged, b"NSBF\x01").unwrap();

        let context = ServerContext::<PersistentFilter>::bootstrap(config.clone()).unwrap();
        assert!(context.registry().contains(&namespace("damaged")));
        assert_eq!(query(&context, "anything", "damaged"), Reply::Member(false));

        // The recreated file is valid again
        assert!(PersistentFilter::open(&damaged, &config.filter).is_ok());
    }

    #[test]
    fn test_bootstrap_word_list_fills_default_namespace() {
        let (dir, mut config) = bloom_dir();
        let words = dir.path().join("words.txt");
        fs::write(&words, "alpha\r\nbeta\n\ngamma\n").unwrap();
        config.bootstrap = Some(words);

        let context = ServerContext::<ExactSetFilter>::bootstrap(config).unwrap();

        for word in ["alpha", "beta", "gamma"] {
            assert_eq!(query(&context, word, ""), Reply::Member(true));
            assert_eq!(query(&context, word, "other"), Reply::Member(false));
        }
        // Word list entries do not draw from the insertion counter
        assert_eq!(add(&context, "delta", ""), Reply::Added(0));
    }

    #[test]
    fn test_missing_word_list_is_not_fatal() {
        let (dir, mut config) = bloom_dir();
        config.bootstrap = Some(dir.path().join("absent.txt"));

        let context = ServerContext::<ExactSetFilter>::bootstrap(config).unwrap();
        assert_eq!(add(&context, "foo", ""), Reply::Added(0));
    }

    #[test]
    fn test_stress_mode_advances_insertion_ids() {
        let (_dir, mut config) = bloom_dir();
        config.stress.enabled = true;
        config.stress.keys = 50;

        let context = ServerContext::<ExactSetFilter>::bootstrap(config).unwrap();

        assert_eq!(query(&context, "word0", ""), Reply::Member(true));
        assert_eq!(query(&context, "word49", ""), Reply::Member(true));
        assert_eq!(query(&context, "word50", ""), Reply::Member(false));
        assert_eq!(add(&context, "fresh", "users"), Reply::Added(50));
    }

    // =============================================================================
    // PERSISTENCE
    // =============================================================================

    #[test]
    fn test_keys_survive_restart() {
        let (_dir, config) = bloom_dir();
        let keys = ["alice", "bob", "carol"];

        {
            let context = ServerContext::<PersistentFilter>::bootstrap(config.clone()).unwrap();
            for key in keys {
                assert!(matches!(add(&context, key, "users"), Reply::Added(_)));
            }
            add(&context, "root", "");
            assert_eq!(context.registry().close(), 0);
        }

        let context = ServerContext::<PersistentFilter>::bootstrap(config).unwrap();
        assert_eq!(context.registry().len(), 2);
        for key in keys {
            assert_eq!(query(&context, key, "users"), Reply::Member(true));
            assert_eq!(add(&context, key, "users"), Reply::Exists);
        }
        assert_eq!(query(&context, "root", ""), Reply::Member(true));
    }

    #[test]
    fn test_close_persists_exact_filters() {
        let (dir, config) = bloom_dir();
        let context = ServerContext::<ExactSetFilter>::bootstrap(config.clone()).unwrap();
        add(&context, "k1", "set");
        add(&context, "k2", "set");

        let handle = context.registry().resolve(&namespace("set")).unwrap();
        assert!(handle.is_dirty());
        assert_eq!(context.registry().close(), 0);
        assert!(!handle.is_dirty());

        let reopened = ExactSetFilter::open(&dir.path().join("set.bf"), &config.filter).unwrap();
        assert_eq!(reopened.len(), 2);
        assert!(reopened.check(b"k1"));
    }
}
