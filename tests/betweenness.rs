use distbc::bc;
use distbc::builder::PartitionBuilder;
use distbc::generator::Generator;
use distbc::graph::PartitionedGraph;
use distbc::types::EdgeList;
use distbc::{BcConfig, Cluster, ClusterConfig, Error, PartitionPolicy, SourceRange};
use proptest::prelude::*;

const POLICIES: [PartitionPolicy; 2] = [PartitionPolicy::EdgeCut, PartitionPolicy::VertexCut];

fn cluster(edges: &EdgeList, num_nodes: usize, config: ClusterConfig) -> Cluster {
    let builder = PartitionBuilder::new(config.hosts, config.partition).with_num_nodes(num_nodes);
    Cluster::with_builder(config, &builder, edges).unwrap()
}

fn betweenness(edges: &EdgeList, num_nodes: usize, config: ClusterConfig, bc_config: &BcConfig) -> Vec<f32> {
    cluster(edges, num_nodes, config).betweenness(bc_config).unwrap()
}

fn assert_close(got: &[f32], want: &[f64]) {
    assert_eq!(got.len(), want.len());
    for (node, (&g, &w)) in got.iter().zip(want).enumerate() {
        assert!(
            (f64::from(g) - w).abs() <= 1e-4 * w.abs().max(1.0),
            "node {}: got {}, want {}",
            node,
            g,
            w
        );
    }
}

/// Every combination of host count, partition policy, executor and filtering.
fn configurations() -> Vec<(ClusterConfig, BcConfig)> {
    let mut all = Vec::new();
    for hosts in 1..=4 {
        for policy in POLICIES {
            for threads in [None, Some(2)] {
                for dirty_bitsets in [true, false] {
                    let mut cluster = ClusterConfig::new(hosts, policy);
                    cluster.threads_per_host = threads;
                    let bc = BcConfig {
                        dirty_bitsets,
                        ..BcConfig::default()
                    };
                    all.push((cluster, bc));
                }
            }
        }
    }
    all
}

#[test]
fn single_source_on_a_directed_path() {
    // s -> a -> b -> c: dependencies are 2 for a and 1 for b.
    let edges = vec![(0, 1), (1, 2), (2, 3)];
    let config = BcConfig::default().with_sources(SourceRange::Single { source: 0 });
    for (cluster_config, _) in configurations() {
        let scores = betweenness(&edges, 4, cluster_config, &config);
        assert_eq!(scores, vec![0.0, 2.0, 1.0, 0.0]);
    }
}

#[test]
fn diamond_splits_credit_between_both_paths() {
    let edges = vec![(0, 1), (0, 2), (1, 3), (2, 3)];
    let config = BcConfig::default().with_sources(SourceRange::Single { source: 0 });
    for (cluster_config, _) in configurations() {
        let scores = betweenness(&edges, 4, cluster_config, &config);
        assert_eq!(scores, vec![0.0, 0.5, 0.5, 0.0]);
    }
}

#[test]
fn single_edge_gives_no_centrality() {
    let edges = vec![(0, 1)];
    for (cluster_config, bc_config) in configurations() {
        assert_eq!(betweenness(&edges, 2, cluster_config, &bc_config), vec![0.0, 0.0]);
    }
}

#[test]
fn undirected_path_matches_reference() {
    let edges = vec![(0, 1), (1, 2), (2, 3), (3, 4)];
    let builder = PartitionBuilder::new(1, PartitionPolicy::EdgeCut).symmetrize(true);
    let reference = bc::brandes(5, &builder.squish(&edges), 0..5);
    assert_eq!(reference, vec![0.0, 6.0, 8.0, 6.0, 0.0]);

    for (cluster_config, bc_config) in configurations() {
        let builder = PartitionBuilder::new(cluster_config.hosts, cluster_config.partition).symmetrize(true);
        let cluster = Cluster::with_builder(cluster_config, &builder, &edges).unwrap();
        assert_close(&cluster.betweenness(&bc_config).unwrap(), &reference);
    }
}

#[test]
fn unreachable_and_isolated_nodes_stay_at_zero() {
    // 4 and 5 form a separate component; 6 and 7 have no edges at all.
    let edges = vec![(0, 1), (1, 2), (4, 5)];
    let reference = bc::brandes(8, &edges, 0..8);
    for (cluster_config, bc_config) in configurations() {
        let scores = betweenness(&edges, 8, cluster_config, &bc_config);
        assert_close(&scores, &reference);
        assert_eq!(&scores[3..], &[0.0; 5]);
    }
}

#[test]
fn random_graph_matches_reference_everywhere() {
    let generator = Generator::new(6, 3).with_seed(11);
    let edges = generator.generate_edge_list();
    let squished = PartitionBuilder::new(1, PartitionPolicy::EdgeCut).squish(&edges);
    let reference = bc::brandes(64, &squished, 0..64);

    for (cluster_config, bc_config) in configurations() {
        let scores = betweenness(&edges, 64, cluster_config, &bc_config);
        assert_close(&scores, &reference);
        assert!(bc::verifier(64, &squished, 0..64, &scores));
    }
}

#[test]
fn splitting_the_source_range_does_not_change_scores() {
    let edges = Generator::new(5, 3).with_seed(3).generate_edge_list();
    for policy in POLICIES {
        let cluster = cluster(&edges, 32, ClusterConfig::new(3, policy));
        let whole = cluster.betweenness(&BcConfig::default()).unwrap();

        let split = cluster
            .run(|graph, exec| {
                bc::reset(graph, exec);
                for (start, count) in [(20, 12), (0, 7), (7, 13)] {
                    let config = BcConfig::default().with_sources(SourceRange::Count { start, count });
                    bc::compute_bc(graph, exec, &config)?;
                }
                Ok(bc::scores(graph))
            })
            .unwrap();

        let mut scores = vec![0.0; 32];
        for (node, score) in split.into_iter().flatten() {
            scores[node] = score;
        }
        let whole: Vec<f64> = whole.into_iter().map(f64::from).collect();
        assert_close(&scores, &whole);
    }
}

#[test]
fn reset_makes_runs_repeatable() {
    let edges = Generator::new(5, 2).with_seed(9).generate_edge_list();
    let cluster = cluster(&edges, 32, ClusterConfig::new(2, PartitionPolicy::VertexCut).with_threads(2));
    let config = BcConfig::default();

    let first = cluster.betweenness(&config).unwrap();
    let second = cluster.betweenness(&config).unwrap();
    assert_eq!(first, second);

    // Without a reset, a second run over the same sources doubles every score.
    let doubled = cluster
        .run(|graph, exec| {
            bc::reset(graph, exec);
            bc::compute_bc(graph, exec, &config)?;
            Ok(bc::compute_bc(graph, exec, &config)?.scores)
        })
        .unwrap();
    for (node, score) in doubled.into_iter().flatten() {
        assert!((score - 2.0 * first[node]).abs() <= 1e-3 * first[node].max(1.0));
    }
}

#[test]
fn reports_cover_owned_nodes_and_count_rounds() {
    let edges = vec![(0, 1), (1, 2), (2, 3), (3, 4), (4, 5)];
    let reports = cluster(&edges, 6, ClusterConfig::new(3, PartitionPolicy::EdgeCut))
        .reports(&BcConfig::default().with_sources(SourceRange::Single { source: 0 }))
        .unwrap();

    assert_eq!(reports.len(), 3);
    let owned: usize = reports.iter().map(|r| r.scores.len()).sum();
    assert_eq!(owned, 6);
    for (host, report) in reports.iter().enumerate() {
        assert_eq!(report.host, host);
        assert_eq!(report.sources, 1);
        assert!(!report.round_limit_hit);
        assert!(report.bfs_rounds > 0 && report.path_rounds > 0 && report.dependency_rounds > 0);
    }
    // Every host sees the same number of rounds.
    assert!(reports.windows(2).all(|w| w[0].bfs_rounds == w[1].bfs_rounds
        && w[0].path_rounds == w[1].path_rounds
        && w[0].dependency_rounds == w[1].dependency_rounds));
}

#[test]
fn round_limit_is_reported_not_fatal() {
    let edges: EdgeList = (0..10).map(|n| (n, n + 1)).collect();
    let config = BcConfig {
        max_rounds: 2,
        ..BcConfig::default().with_sources(SourceRange::Single { source: 0 })
    };
    for policy in POLICIES {
        let reports = cluster(&edges, 11, ClusterConfig::new(2, policy))
            .reports(&config)
            .unwrap();
        assert!(reports.iter().all(|r| r.round_limit_hit));
    }
}

#[test]
fn out_of_range_source_fails_every_host() {
    let edges = vec![(0, 1), (1, 2)];
    let config = BcConfig::default().with_sources(SourceRange::Single { source: 3 });
    let err = cluster(&edges, 3, ClusterConfig::new(2, PartitionPolicy::EdgeCut))
        .betweenness(&config)
        .unwrap_err();
    assert!(matches!(err, Error::SourceOutOfRange { node: 3, total: 3 }));
}

#[test]
fn a_failing_host_unblocks_its_peers() {
    let edges = vec![(0, 1), (1, 2), (2, 3)];
    let err = cluster(&edges, 4, ClusterConfig::new(3, PartitionPolicy::EdgeCut))
        .run(|graph, exec| {
            if graph.host_id() == 1 {
                return Err(Error::Config("host 1 gave up".into()));
            }
            bc::compute_bc(graph, exec, &BcConfig::default())
        })
        .unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}

#[test]
fn empty_graph_runs_no_sources() {
    let scores = Cluster::new(ClusterConfig::new(2, PartitionPolicy::EdgeCut), &Vec::new())
        .unwrap()
        .betweenness(&BcConfig::default())
        .unwrap();
    assert!(scores.is_empty());
}

fn small_graph() -> impl Strategy<Value = (usize, EdgeList)> {
    (2usize..14).prop_flat_map(|n| (Just(n), prop::collection::vec((0..n, 0..n), 0..(3 * n))))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn matches_sequential_brandes(
        (n, edges) in small_graph(),
        hosts in 1usize..5,
        vertex_cut in any::<bool>(),
        dirty_bitsets in any::<bool>(),
    ) {
        let policy = if vertex_cut { PartitionPolicy::VertexCut } else { PartitionPolicy::EdgeCut };
        let config = BcConfig { dirty_bitsets, ..BcConfig::default() };
        let scores = betweenness(&edges, n, ClusterConfig::new(hosts, policy), &config);
        let reference = bc::brandes(n, &edges, 0..n);
        prop_assert_eq!(scores.len(), n);
        for (node, (&got, &want)) in scores.iter().zip(&reference).enumerate() {
            prop_assert!(
                (f64::from(got) - want).abs() <= 1e-4 * want.abs().max(1.0),
                "node {}: got {}, want {}", node, got, want
            );
        }
    }
}
